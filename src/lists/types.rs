use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Compliance category of a mailing list. Stored as a fixed string; rows
/// edited by hand may carry values outside this set, so parsing returns an
/// Option and every policy decision has an explicit unknown arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListCategory {
    Marketing,
    Transactional,
    Legal,
    Service,
}

impl ListCategory {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "marketing" => Some(Self::Marketing),
            "transactional" => Some(Self::Transactional),
            "legal" => Some(Self::Legal),
            "service" => Some(Self::Service),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Marketing => "marketing",
            Self::Transactional => "transactional",
            Self::Legal => "legal",
            Self::Service => "service",
        }
    }
}

/// How a subscriber came to be on a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentType {
    ExplicitOptin,
    LegitimateInterest,
    Contractual,
    Imported,
}

impl ConsentType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "explicit_optin" => Some(Self::ExplicitOptin),
            "legitimate_interest" => Some(Self::LegitimateInterest),
            "contractual" => Some(Self::Contractual),
            "imported" => Some(Self::Imported),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExplicitOptin => "explicit_optin",
            Self::LegitimateInterest => "legitimate_interest",
            Self::Contractual => "contractual",
            Self::Imported => "imported",
        }
    }
}

#[derive(Debug, Clone, Serialize, Queryable, Selectable)]
#[diesel(table_name = crate::shared::models::schema::lists)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct List {
    pub id: i32,
    pub uuid: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub optin: String,
    pub status: String,
    pub description: String,

    /// marketing, transactional, legal or service.
    pub category: String,
    /// Only consulted for service lists.
    pub no_unsubscribe: bool,
    /// Disables tracking pixels and link tracking.
    pub no_tracking: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The three booleans the send pipeline evaluates before composing a
/// message for a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListPolicy {
    pub allows_unsubscribe: bool,
    pub allows_tracking: bool,
    pub requires_logging: bool,
}

/// Consent provenance attached to a (subscriber, list) membership.
/// Fields mirror the subscriber_lists columns; consent_type is kept as the
/// raw stored string on read and validated against ConsentType on write.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Queryable)]
pub struct ConsentRecord {
    pub consent_type: Option<String>,
    pub consent_source: Option<String>,
    pub consent_ip: Option<String>,
    pub consent_user_agent: Option<String>,
    pub consent_admin_id: Option<i32>,
}
