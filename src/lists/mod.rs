use crate::shared::error::AuditError;
use crate::shared::utils::DbPool;
use diesel::prelude::*;
use log::debug;
use uuid::Uuid;

pub mod types;

pub use types::{ConsentRecord, ConsentType, List, ListCategory, ListPolicy};

impl List {
    /// Whether subscribers may remove themselves from this list.
    /// Transactional and legal lists never expose unsubscribe; only
    /// service lists consult the no_unsubscribe flag.
    pub fn allows_unsubscribe(&self) -> bool {
        match ListCategory::parse(&self.category) {
            Some(ListCategory::Marketing) => true,
            Some(ListCategory::Transactional) | Some(ListCategory::Legal) => false,
            Some(ListCategory::Service) => !self.no_unsubscribe,
            // Unrecognized category strings fall back to the
            // subscriber-safe default.
            None => true,
        }
    }

    /// Whether every send to this list must produce a delivery log row.
    pub fn requires_delivery_logging(&self) -> bool {
        matches!(
            ListCategory::parse(&self.category),
            Some(ListCategory::Legal | ListCategory::Transactional)
        )
    }

    /// Whether tracking pixels and link tracking may be injected.
    pub fn allows_tracking(&self) -> bool {
        if self.no_tracking {
            return false;
        }
        !matches!(
            ListCategory::parse(&self.category),
            Some(ListCategory::Transactional | ListCategory::Legal)
        )
    }

    /// Derive the full policy for this list. Evaluated per send, never
    /// cached, since the category and flags can change between sends.
    pub fn policy(&self) -> ListPolicy {
        ListPolicy {
            allows_unsubscribe: self.allows_unsubscribe(),
            allows_tracking: self.allows_tracking(),
            requires_logging: self.requires_delivery_logging(),
        }
    }
}

/// Whether sends to a list of this category should be backed by
/// contractual or legitimate-interest consent. Enforcement is the send
/// pipeline's responsibility.
pub fn requires_contractual_consent(category: &str) -> bool {
    matches!(
        ListCategory::parse(category),
        Some(ListCategory::Legal | ListCategory::Transactional)
    )
}

/// Whether a membership's consent satisfies the category's requirement.
pub fn consent_permits_send(category: &str, consent: Option<ConsentType>) -> bool {
    if !requires_contractual_consent(category) {
        return true;
    }
    matches!(
        consent,
        Some(ConsentType::Contractual | ConsentType::LegitimateInterest)
    )
}

pub fn get_list(pool: &DbPool, id: i32) -> Result<List, AuditError> {
    use crate::shared::models::schema::lists::dsl;

    let mut conn = pool.get()?;
    dsl::lists
        .filter(dsl::id.eq(id))
        .select(List::as_select())
        .first(&mut conn)
        .optional()?
        .ok_or(AuditError::NotFound("list"))
}

pub fn get_list_by_uuid(pool: &DbPool, list_uuid: Uuid) -> Result<List, AuditError> {
    use crate::shared::models::schema::lists::dsl;

    let mut conn = pool.get()?;
    dsl::lists
        .filter(dsl::uuid.eq(list_uuid))
        .select(List::as_select())
        .first(&mut conn)
        .optional()?
        .ok_or(AuditError::NotFound("list"))
}

/// Attach consent provenance to an existing membership. Write-once: every
/// consent column COALESCEs with the stored value, so a second call can
/// never overwrite what was recorded at subscription time.
pub fn record_consent(
    pool: &DbPool,
    subscriber_id: i32,
    list_id: i32,
    record: &ConsentRecord,
) -> Result<(), AuditError> {
    if let Some(ref t) = record.consent_type {
        if ConsentType::parse(t).is_none() {
            return Err(AuditError::validation(
                "consent_type",
                format!("unknown consent type {:?}", t),
            ));
        }
    }

    let mut conn = pool.get()?;
    let affected = diesel::sql_query(
        r"UPDATE subscriber_lists SET
               consent_type = COALESCE(consent_type, $3),
               consent_source = COALESCE(consent_source, $4),
               consent_ip = COALESCE(consent_ip, $5),
               consent_user_agent = COALESCE(consent_user_agent, $6),
               consent_admin_id = COALESCE(consent_admin_id, $7),
               updated_at = NOW()
           WHERE subscriber_id = $1 AND list_id = $2",
    )
    .bind::<diesel::sql_types::Integer, _>(subscriber_id)
    .bind::<diesel::sql_types::Integer, _>(list_id)
    .bind::<diesel::sql_types::Nullable<diesel::sql_types::Text>, _>(record.consent_type.as_deref())
    .bind::<diesel::sql_types::Nullable<diesel::sql_types::Text>, _>(
        record.consent_source.as_deref(),
    )
    .bind::<diesel::sql_types::Nullable<diesel::sql_types::Text>, _>(record.consent_ip.as_deref())
    .bind::<diesel::sql_types::Nullable<diesel::sql_types::Text>, _>(
        record.consent_user_agent.as_deref(),
    )
    .bind::<diesel::sql_types::Nullable<diesel::sql_types::Integer>, _>(record.consent_admin_id)
    .execute(&mut conn)?;

    if affected == 0 {
        return Err(AuditError::NotFound("membership"));
    }

    debug!(
        "recorded consent for subscriber {} on list {}",
        subscriber_id, list_id
    );
    Ok(())
}

pub fn get_consent(
    pool: &DbPool,
    subscriber_id: i32,
    list_id: i32,
) -> Result<ConsentRecord, AuditError> {
    use crate::shared::models::schema::subscriber_lists::dsl;

    let mut conn = pool.get()?;
    dsl::subscriber_lists
        .filter(dsl::subscriber_id.eq(subscriber_id))
        .filter(dsl::list_id.eq(list_id))
        .select((
            dsl::consent_type,
            dsl::consent_source,
            dsl::consent_ip,
            dsl::consent_user_agent,
            dsl::consent_admin_id,
        ))
        .first::<ConsentRecord>(&mut conn)
        .optional()?
        .ok_or(AuditError::NotFound("membership"))
}
