use axum::{response::IntoResponse, Json};
use log::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    /// A coupled multi-statement write failed partway (e.g. the unique key
    /// backstop fired under a concurrent race). Retrying the whole command
    /// is safe.
    #[error("Atomic write failed: {0}")]
    Atomicity(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        match &self {
            Self::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": msg })),
            )
                .into_response(),
            Self::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": msg })),
            )
                .into_response(),
            Self::Conflict(msg) => (
                StatusCode::CONFLICT,
                Json(serde_json::json!({ "error": msg })),
            )
                .into_response(),
            Self::Atomicity(msg) => {
                error!("atomic write failure: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({
                        "error": "internal error",
                        "retryable": true,
                    })),
                )
                    .into_response()
            }
            Self::Database(msg) | Self::Internal(msg) => {
                // Full detail stays in the log; callers get a generic body.
                error!("internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "internal error" })),
                )
                    .into_response()
            }
        }
    }
}

/// Turn an optional lookup result into the entity or a 404. Query and
/// connection failures must be surfaced separately (`.optional()?`) so an
/// outage is not reported as a missing record.
pub fn found_or_404<T>(row: Option<T>, what: &str) -> Result<T, ApiError> {
    row.ok_or_else(|| ApiError::NotFound(format!("{what} not found")))
}

impl From<diesel::result::Error> for ApiError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};
        match err {
            Error::NotFound => ApiError::NotFound("record not found".to_string()),
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                ApiError::Atomicity(info.message().to_string())
            }
            other => ApiError::Database(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for ApiError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        ApiError::Database(format!("connection pool: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::result::Error;

    #[test]
    fn diesel_not_found_maps_to_not_found() {
        let err: ApiError = Error::NotFound.into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn other_diesel_errors_map_to_database() {
        let err: ApiError = Error::RollbackTransaction.into();
        assert!(matches!(err, ApiError::Database(_)));
    }

    #[test]
    fn lookups_report_404_only_for_absent_rows() {
        assert!(matches!(
            found_or_404::<u32>(None, "Client"),
            Err(ApiError::NotFound(_))
        ));
        assert_eq!(found_or_404(Some(7), "Client").unwrap(), 7);

        // A failed query propagates as Database (500), never NotFound.
        let outage: Result<Option<u32>, Error> = Err(Error::RollbackTransaction);
        let err: ApiError = outage.unwrap_err().into();
        assert!(matches!(err, ApiError::Database(_)));
    }
}
