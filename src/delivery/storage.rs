use crate::delivery::types::{
    DeliveryLog, DeliveryLogExport, DeliveryLogFilter, DeliveryStatus, NewDeliveryLog,
};
use crate::shared::error::AuditError;
use crate::shared::utils::DbPool;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Nullable, Text, Timestamptz};
use log::{debug, error};

// Optional filters are expressed with sentinel binds (0 for ids, '' for
// strings, NULL for dates) so the bind list stays fixed. All filtered
// queries share this WHERE clause.
const FILTER_CLAUSE: &str = r"($1 = 0 OR campaign_id = $1)
           AND ($2 = 0 OR subscriber_id = $2)
           AND ($3 = 0 OR list_id = $3)
           AND ($4 = '' OR status = $4)
           AND ($5 = '' OR to_email ILIKE '%' || $5 || '%')
           AND ($6::timestamptz IS NULL OR sent_at >= $6)
           AND ($7::timestamptz IS NULL OR sent_at <= $7)";

const LOG_COLUMNS: &str = "id, campaign_id, subscriber_id, list_id, from_email, to_email, \
     subject, message_id, smtp_response, smtp_code, status, error, sent_at, created_at";

#[derive(QueryableByName)]
struct IdRow {
    #[diesel(sql_type = BigInt)]
    id: i64,
}

#[derive(QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

fn validate_new_log(log: &NewDeliveryLog) -> Result<(), AuditError> {
    if log.from_email.trim().is_empty() {
        return Err(AuditError::validation("from_email", "must not be empty"));
    }
    if log.to_email.trim().is_empty() {
        return Err(AuditError::validation("to_email", "must not be empty"));
    }
    if log.subject.trim().is_empty() {
        return Err(AuditError::validation("subject", "must not be empty"));
    }
    Ok(())
}

/// Append one delivery log row and return its generated id.
pub fn insert_delivery_log(pool: &DbPool, log: &NewDeliveryLog) -> Result<i64, AuditError> {
    validate_new_log(log)?;

    let mut conn = pool.get()?;
    let row: IdRow = diesel::sql_query(
        r"INSERT INTO delivery_logs
               (campaign_id, subscriber_id, list_id, from_email, to_email, subject,
                message_id, smtp_response, smtp_code, status, error, sent_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
           RETURNING id",
    )
    .bind::<Nullable<Integer>, _>(log.campaign_id)
    .bind::<Nullable<Integer>, _>(log.subscriber_id)
    .bind::<Nullable<Integer>, _>(log.list_id)
    .bind::<Text, _>(&log.from_email)
    .bind::<Text, _>(&log.to_email)
    .bind::<Text, _>(&log.subject)
    .bind::<Text, _>(&log.message_id)
    .bind::<Text, _>(&log.smtp_response)
    .bind::<Integer, _>(log.smtp_code)
    .bind::<Text, _>(log.status.as_str())
    .bind::<Nullable<Text>, _>(log.error.as_deref())
    .bind::<Timestamptz, _>(log.sent_at)
    .get_result(&mut conn)?;

    debug!("inserted delivery log {} for {}", row.id, log.to_email);
    Ok(row.id)
}

/// Entry point for the send pipeline, called once per completed SMTP
/// transaction. A failure here is an operational alert for the caller to
/// report; the send itself already happened and must not be rolled back
/// or retried because of it.
#[allow(clippy::too_many_arguments)]
pub fn record_delivery(
    pool: &DbPool,
    campaign_id: Option<i32>,
    subscriber_id: Option<i32>,
    list_id: Option<i32>,
    from_email: &str,
    to_email: &str,
    subject: &str,
    message_id: &str,
    smtp_response: &str,
    smtp_code: i32,
    status: DeliveryStatus,
    error_msg: Option<String>,
    sent_at: DateTime<Utc>,
) -> Result<i64, AuditError> {
    let log = NewDeliveryLog {
        campaign_id,
        subscriber_id,
        list_id,
        from_email: from_email.to_string(),
        to_email: to_email.to_string(),
        subject: subject.to_string(),
        message_id: message_id.to_string(),
        smtp_response: smtp_response.to_string(),
        smtp_code,
        status,
        error: error_msg,
        sent_at,
    };

    insert_delivery_log(pool, &log).inspect_err(|e| {
        error!(
            "failed to record delivery audit row for {} (message_id {:?}): {}",
            to_email, message_id, e
        );
    })
}

pub fn get_delivery_log(pool: &DbPool, id: i64) -> Result<DeliveryLog, AuditError> {
    let mut conn = pool.get()?;
    diesel::sql_query(format!(
        "SELECT {} FROM delivery_logs WHERE id = $1",
        LOG_COLUMNS
    ))
    .bind::<BigInt, _>(id)
    .get_result(&mut conn)
    .optional()?
    .ok_or(AuditError::NotFound("delivery log"))
}

/// All rows sharing a provider message-id, used for bounce correlation.
pub fn get_delivery_logs_by_message_id(
    pool: &DbPool,
    message_id: &str,
) -> Result<Vec<DeliveryLog>, AuditError> {
    let mut conn = pool.get()?;
    let rows = diesel::sql_query(format!(
        "SELECT {} FROM delivery_logs WHERE message_id = $1 ORDER BY sent_at DESC, id DESC",
        LOG_COLUMNS
    ))
    .bind::<Text, _>(message_id)
    .load(&mut conn)?;
    Ok(rows)
}

/// Filtered, paginated search. The total is counted independently of the
/// page window; ordering is sent_at DESC, id DESC so pages stay stable
/// under concurrent inserts.
pub fn search_delivery_logs(
    pool: &DbPool,
    filter: &DeliveryLogFilter,
    offset: i64,
    limit: i64,
) -> Result<(Vec<DeliveryLog>, i64), AuditError> {
    let mut conn = pool.get()?;

    let count: CountRow = diesel::sql_query(format!(
        "SELECT COUNT(*) AS count FROM delivery_logs WHERE {}",
        FILTER_CLAUSE
    ))
    .bind::<Integer, _>(filter.campaign_id.unwrap_or(0))
    .bind::<Integer, _>(filter.subscriber_id.unwrap_or(0))
    .bind::<Integer, _>(filter.list_id.unwrap_or(0))
    .bind::<Text, _>(filter.status.map(|s| s.as_str()).unwrap_or(""))
    .bind::<Text, _>(filter.email.as_deref().unwrap_or(""))
    .bind::<Nullable<Timestamptz>, _>(filter.sent_from)
    .bind::<Nullable<Timestamptz>, _>(filter.sent_to)
    .get_result(&mut conn)?;

    if count.count == 0 {
        return Ok((Vec::new(), 0));
    }

    let rows = diesel::sql_query(format!(
        "SELECT {} FROM delivery_logs WHERE {} ORDER BY sent_at DESC, id DESC OFFSET $8 LIMIT $9",
        LOG_COLUMNS, FILTER_CLAUSE
    ))
    .bind::<Integer, _>(filter.campaign_id.unwrap_or(0))
    .bind::<Integer, _>(filter.subscriber_id.unwrap_or(0))
    .bind::<Integer, _>(filter.list_id.unwrap_or(0))
    .bind::<Text, _>(filter.status.map(|s| s.as_str()).unwrap_or(""))
    .bind::<Text, _>(filter.email.as_deref().unwrap_or(""))
    .bind::<Nullable<Timestamptz>, _>(filter.sent_from)
    .bind::<Nullable<Timestamptz>, _>(filter.sent_to)
    .bind::<BigInt, _>(offset)
    .bind::<BigInt, _>(limit)
    .load(&mut conn)?;

    Ok((rows, count.count))
}

/// Unpaginated export joined with current campaign/subscriber/list display
/// names. The joins are best effort: weak references nulled by a cascade
/// simply export with empty names.
pub fn export_delivery_logs(
    pool: &DbPool,
    filter: &DeliveryLogFilter,
) -> Result<Vec<DeliveryLogExport>, AuditError> {
    let mut conn = pool.get()?;
    let rows = diesel::sql_query(format!(
        r"SELECT dl.id, dl.campaign_id, c.name AS campaign_name,
                 dl.subscriber_id, s.name AS subscriber_name,
                 dl.list_id, l.name AS list_name,
                 dl.from_email, dl.to_email, dl.subject,
                 dl.message_id, dl.smtp_response, dl.smtp_code,
                 dl.status, dl.error, dl.sent_at
           FROM delivery_logs dl
               LEFT JOIN campaigns c ON dl.campaign_id = c.id
               LEFT JOIN subscribers s ON dl.subscriber_id = s.id
               LEFT JOIN lists l ON dl.list_id = l.id
           WHERE {}
           ORDER BY dl.sent_at DESC, dl.id DESC",
        // The shared clause references unqualified columns; qualify them
        // against the log table for the join.
        FILTER_CLAUSE
            .replace("campaign_id", "dl.campaign_id")
            .replace("subscriber_id", "dl.subscriber_id")
            .replace("list_id", "dl.list_id")
            .replace("status", "dl.status")
            .replace("to_email", "dl.to_email")
            .replace("sent_at", "dl.sent_at")
    ))
    .bind::<Integer, _>(filter.campaign_id.unwrap_or(0))
    .bind::<Integer, _>(filter.subscriber_id.unwrap_or(0))
    .bind::<Integer, _>(filter.list_id.unwrap_or(0))
    .bind::<Text, _>(filter.status.map(|s| s.as_str()).unwrap_or(""))
    .bind::<Text, _>(filter.email.as_deref().unwrap_or(""))
    .bind::<Nullable<Timestamptz>, _>(filter.sent_from)
    .bind::<Nullable<Timestamptz>, _>(filter.sent_to)
    .load(&mut conn)?;
    Ok(rows)
}

/// The only permitted post-insert mutation, used by asynchronous bounce
/// handling. An empty error message clears the stored error. Last writer
/// wins; there is no concurrency token.
pub fn update_delivery_log_status(
    pool: &DbPool,
    id: i64,
    status: DeliveryStatus,
    error_msg: &str,
) -> Result<(), AuditError> {
    let error_value = if error_msg.is_empty() {
        None
    } else {
        Some(error_msg)
    };

    let mut conn = pool.get()?;
    let affected = diesel::sql_query(
        "UPDATE delivery_logs SET status = $2, error = $3 WHERE id = $1",
    )
    .bind::<BigInt, _>(id)
    .bind::<Text, _>(status.as_str())
    .bind::<Nullable<Text>, _>(error_value)
    .execute(&mut conn)?;

    if affected == 0 {
        return Err(AuditError::NotFound("delivery log"));
    }
    Ok(())
}

/// Retention purge: irreversibly delete all rows with sent_at before the
/// cutoff and return how many were removed.
pub fn purge_delivery_logs_before(
    pool: &DbPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, AuditError> {
    let mut conn = pool.get()?;
    let deleted = diesel::sql_query("DELETE FROM delivery_logs WHERE sent_at < $1")
        .bind::<Timestamptz, _>(cutoff)
        .execute(&mut conn)?;

    debug!("purged {} delivery logs older than {}", deleted, cutoff);
    Ok(deleted as u64)
}
