use crate::config::PaginationConfig;
use crate::delivery::storage;
use crate::delivery::types::{
    DeliveryLog, DeliveryLogExport, DeliveryLogFilter, DeliveryLogListQuery, DeliveryLogPage,
    DeliveryStatus,
};
use crate::shared::error::AuditError;
use crate::shared::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use log::info;
use std::sync::Arc;

/// Parse an RFC3339 date filter. Malformed input is rejected rather than
/// silently treated as "no filter": an audit query that quietly drops a
/// bound would misrepresent the record set.
fn parse_date(field: &'static str, value: &str) -> Result<DateTime<Utc>, AuditError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| AuditError::validation(field, format!("{:?} is not RFC3339: {}", value, e)))
}

fn parse_filter(query: &DeliveryLogListQuery) -> Result<DeliveryLogFilter, AuditError> {
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(s) => Some(DeliveryStatus::parse(s).ok_or_else(|| {
            AuditError::validation("status", format!("unknown status {:?}", s))
        })?),
    };

    let sent_from = match query.from.as_deref() {
        None | Some("") => None,
        Some(s) => Some(parse_date("from", s)?),
    };
    let sent_to = match query.to.as_deref() {
        None | Some("") => None,
        Some(s) => Some(parse_date("to", s)?),
    };

    Ok(DeliveryLogFilter {
        campaign_id: query.campaign_id,
        subscriber_id: query.subscriber_id,
        list_id: query.list_id,
        status,
        email: query.email.clone().filter(|e| !e.is_empty()),
        sent_from,
        sent_to,
    })
}

/// Default and clamp pagination parameters.
fn clamp_paging(
    page: Option<i64>,
    per_page: Option<i64>,
    config: &PaginationConfig,
) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page
        .unwrap_or(config.default_per_page)
        .clamp(1, config.max_per_page);
    (page, per_page)
}

pub async fn list_delivery_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DeliveryLogListQuery>,
) -> Result<Json<DeliveryLogPage>, AuditError> {
    let filter = parse_filter(&query)?;
    let (page, per_page) = clamp_paging(query.page, query.per_page, &state.config.pagination);
    let offset = (page - 1) * per_page;

    let conn = state.conn.clone();
    let (results, total) = tokio::task::spawn_blocking(move || {
        storage::search_delivery_logs(&conn, &filter, offset, per_page)
    })
    .await??;

    Ok(Json(DeliveryLogPage {
        results,
        total,
        page,
        per_page,
    }))
}

pub async fn get_delivery_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<DeliveryLog>, AuditError> {
    if id < 1 {
        return Err(AuditError::validation("id", "must be a positive integer"));
    }

    let conn = state.conn.clone();
    let log = tokio::task::spawn_blocking(move || storage::get_delivery_log(&conn, id)).await??;

    Ok(Json(log))
}

pub async fn export_delivery_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DeliveryLogListQuery>,
) -> Result<Response, AuditError> {
    let filter = parse_filter(&query)?;

    let conn = state.conn.clone();
    let rows =
        tokio::task::spawn_blocking(move || storage::export_delivery_logs(&conn, &filter))
            .await??;

    info!("exporting {} delivery logs as CSV", rows.len());
    let body = write_csv(&rows)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=delivery-logs-{}.csv",
                    Utc::now().format("%Y-%m-%d")
                ),
            ),
        ],
        body,
    )
        .into_response())
}

pub const EXPORT_HEADER: [&str; 16] = [
    "ID",
    "Campaign ID",
    "Campaign Name",
    "Subscriber ID",
    "Subscriber Name",
    "List ID",
    "List Name",
    "From Email",
    "To Email",
    "Subject",
    "Message ID",
    "SMTP Response",
    "SMTP Code",
    "Status",
    "Error",
    "Sent At",
];

/// Serialize export rows to CSV with the fixed 16-column header. Nulled
/// weak references and missing names become empty cells.
pub fn write_csv(rows: &[DeliveryLogExport]) -> Result<Vec<u8>, AuditError> {
    let mut writer = csv::Writer::from_writer(vec![]);

    writer
        .write_record(EXPORT_HEADER)
        .map_err(|e| AuditError::Persistence(format!("csv write: {}", e)))?;

    for row in rows {
        writer
            .write_record([
                row.id.to_string(),
                row.campaign_id.map(|v| v.to_string()).unwrap_or_default(),
                row.campaign_name.clone().unwrap_or_default(),
                row.subscriber_id.map(|v| v.to_string()).unwrap_or_default(),
                row.subscriber_name.clone().unwrap_or_default(),
                row.list_id.map(|v| v.to_string()).unwrap_or_default(),
                row.list_name.clone().unwrap_or_default(),
                row.from_email.clone(),
                row.to_email.clone(),
                row.subject.clone(),
                row.message_id.clone(),
                row.smtp_response.clone(),
                row.smtp_code.to_string(),
                row.status.clone(),
                row.error.clone().unwrap_or_default(),
                row.sent_at.to_rfc3339(),
            ])
            .map_err(|e| AuditError::Persistence(format!("csv write: {}", e)))?;
    }

    writer
        .into_inner()
        .map_err(|e| AuditError::Persistence(format!("csv flush: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pagination() -> PaginationConfig {
        PaginationConfig {
            default_per_page: 20,
            max_per_page: 100,
        }
    }

    fn export_row(id: i64, status: &str) -> DeliveryLogExport {
        DeliveryLogExport {
            id,
            campaign_id: Some(7),
            campaign_name: Some("July invoices".into()),
            subscriber_id: None,
            subscriber_name: None,
            list_id: Some(3),
            list_name: Some("Billing".into()),
            from_email: "billing@example.com".into(),
            to_email: "person@example.com".into(),
            subject: "Your invoice".into(),
            message_id: "msg-1@mx.example.com".into(),
            smtp_response: "250 2.0.0 OK".into(),
            smtp_code: 250,
            status: status.into(),
            error: None,
            sent_at: DateTime::parse_from_rfc3339("2024-06-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn paging_defaults_and_clamps() {
        let cfg = pagination();
        assert_eq!(clamp_paging(None, None, &cfg), (1, 20));
        assert_eq!(clamp_paging(Some(0), Some(0), &cfg), (1, 1));
        assert_eq!(clamp_paging(Some(-3), Some(500), &cfg), (1, 100));
        assert_eq!(clamp_paging(Some(3), Some(50), &cfg), (3, 50));
    }

    #[test]
    fn rejects_unknown_status_filter() {
        let query = DeliveryLogListQuery {
            status: Some("delivered".into()),
            ..Default::default()
        };
        assert!(matches!(
            parse_filter(&query),
            Err(AuditError::Validation { field: "status", .. })
        ));
    }

    #[test]
    fn rejects_malformed_date_filter() {
        let query = DeliveryLogListQuery {
            from: Some("yesterday".into()),
            ..Default::default()
        };
        assert!(matches!(
            parse_filter(&query),
            Err(AuditError::Validation { field: "from", .. })
        ));
    }

    #[test]
    fn empty_filter_strings_mean_no_filter() {
        let query = DeliveryLogListQuery {
            status: Some(String::new()),
            email: Some(String::new()),
            from: Some(String::new()),
            ..Default::default()
        };
        let filter = parse_filter(&query).unwrap();
        assert!(filter.status.is_none());
        assert!(filter.email.is_none());
        assert!(filter.sent_from.is_none());
    }

    #[test]
    fn parses_rfc3339_bounds() {
        let query = DeliveryLogListQuery {
            from: Some("2024-01-01T00:00:00Z".into()),
            to: Some("2024-12-31T23:59:59+01:00".into()),
            status: Some("bounced".into()),
            ..Default::default()
        };
        let filter = parse_filter(&query).unwrap();
        assert_eq!(filter.status, Some(DeliveryStatus::Bounced));
        assert_eq!(filter.sent_from.unwrap().to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert!(filter.sent_to.is_some());
    }

    #[test]
    fn csv_has_fixed_header_and_one_line_per_row() {
        let rows = vec![export_row(1, "bounced"), export_row(2, "bounced")];
        let bytes = write_csv(&rows).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], EXPORT_HEADER.join(","));
        assert!(lines[1].starts_with("1,7,July invoices,,,3,Billing,"));
        assert!(lines[1].contains("250 2.0.0 OK"));
        assert!(lines[1].ends_with("2024-06-01T10:00:00+00:00"));
    }

    #[test]
    fn csv_of_no_rows_is_just_the_header() {
        let bytes = write_csv(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
