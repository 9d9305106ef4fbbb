use crate::shared::state::AppState;
use axum::{routing::get, Router};
use std::sync::Arc;

pub mod handlers;
pub mod storage;
pub mod types;

pub use storage::{
    export_delivery_logs, get_delivery_log, get_delivery_logs_by_message_id, insert_delivery_log,
    purge_delivery_logs_before, record_delivery, search_delivery_logs, update_delivery_log_status,
};
pub use types::{
    DeliveryLog, DeliveryLogExport, DeliveryLogFilter, DeliveryLogPage, DeliveryStatus,
    NewDeliveryLog,
};

/// Configure delivery log API routes
pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/delivery-logs", get(handlers::list_delivery_logs))
        .route(
            "/api/delivery-logs/export",
            get(handlers::export_delivery_logs),
        )
        .route("/api/delivery-logs/{id}", get(handlers::get_delivery_log))
}
