use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Nullable, Text, Timestamptz};
use serde::{Deserialize, Serialize};

/// Outcome of one send attempt. Stored as a fixed string; validated on
/// every write so manual data edits cannot introduce stray values through
/// this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    Bounced,
}

impl DeliveryStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            "bounced" => Some(Self::Bounced),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Bounced => "bounced",
        }
    }
}

/// One immutable audit row per send attempt.
#[derive(Debug, Clone, Serialize, QueryableByName)]
pub struct DeliveryLog {
    #[diesel(sql_type = BigInt)]
    pub id: i64,
    #[diesel(sql_type = Nullable<Integer>)]
    pub campaign_id: Option<i32>,
    #[diesel(sql_type = Nullable<Integer>)]
    pub subscriber_id: Option<i32>,
    #[diesel(sql_type = Nullable<Integer>)]
    pub list_id: Option<i32>,

    #[diesel(sql_type = Text)]
    pub from_email: String,
    #[diesel(sql_type = Text)]
    pub to_email: String,
    #[diesel(sql_type = Text)]
    pub subject: String,

    #[diesel(sql_type = Text)]
    pub message_id: String,
    #[diesel(sql_type = Text)]
    pub smtp_response: String,
    #[diesel(sql_type = Integer)]
    pub smtp_code: i32,

    #[diesel(sql_type = Text)]
    pub status: String,
    #[diesel(sql_type = Nullable<Text>)]
    pub error: Option<String>,

    #[diesel(sql_type = Timestamptz)]
    pub sent_at: DateTime<Utc>,
    #[diesel(sql_type = Timestamptz)]
    pub created_at: DateTime<Utc>,
}

/// Insert model handed over by the send pipeline once an SMTP transaction
/// has completed.
#[derive(Debug, Clone)]
pub struct NewDeliveryLog {
    pub campaign_id: Option<i32>,
    pub subscriber_id: Option<i32>,
    pub list_id: Option<i32>,
    pub from_email: String,
    pub to_email: String,
    pub subject: String,
    pub message_id: String,
    pub smtp_response: String,
    pub smtp_code: i32,
    pub status: DeliveryStatus,
    pub error: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// Denormalized export row: display names reflect campaign/subscriber/list
/// state at export time and are NULL where the weak reference was nulled
/// by a cascade.
#[derive(Debug, Clone, QueryableByName)]
pub struct DeliveryLogExport {
    #[diesel(sql_type = BigInt)]
    pub id: i64,
    #[diesel(sql_type = Nullable<Integer>)]
    pub campaign_id: Option<i32>,
    #[diesel(sql_type = Nullable<Text>)]
    pub campaign_name: Option<String>,
    #[diesel(sql_type = Nullable<Integer>)]
    pub subscriber_id: Option<i32>,
    #[diesel(sql_type = Nullable<Text>)]
    pub subscriber_name: Option<String>,
    #[diesel(sql_type = Nullable<Integer>)]
    pub list_id: Option<i32>,
    #[diesel(sql_type = Nullable<Text>)]
    pub list_name: Option<String>,
    #[diesel(sql_type = Text)]
    pub from_email: String,
    #[diesel(sql_type = Text)]
    pub to_email: String,
    #[diesel(sql_type = Text)]
    pub subject: String,
    #[diesel(sql_type = Text)]
    pub message_id: String,
    #[diesel(sql_type = Text)]
    pub smtp_response: String,
    #[diesel(sql_type = Integer)]
    pub smtp_code: i32,
    #[diesel(sql_type = Text)]
    pub status: String,
    #[diesel(sql_type = Nullable<Text>)]
    pub error: Option<String>,
    #[diesel(sql_type = Timestamptz)]
    pub sent_at: DateTime<Utc>,
}

/// AND-combined optional filters shared by search and export.
#[derive(Debug, Clone, Default)]
pub struct DeliveryLogFilter {
    pub campaign_id: Option<i32>,
    pub subscriber_id: Option<i32>,
    pub list_id: Option<i32>,
    pub status: Option<DeliveryStatus>,
    /// Case-insensitive substring match on to_email.
    pub email: Option<String>,
    pub sent_from: Option<DateTime<Utc>>,
    pub sent_to: Option<DateTime<Utc>>,
}

/// Raw query parameters at the HTTP boundary. Numeric fields are typed so
/// malformed input is rejected instead of silently ignored; status and the
/// date bounds are validated in the handler.
#[derive(Debug, Default, Deserialize)]
pub struct DeliveryLogListQuery {
    pub campaign_id: Option<i32>,
    pub subscriber_id: Option<i32>,
    pub list_id: Option<i32>,
    pub status: Option<String>,
    pub email: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct DeliveryLogPage {
    pub results: Vec<DeliveryLog>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}
