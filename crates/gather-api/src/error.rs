use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Request-scoped failure taxonomy. Every variant maps to a status code and
/// a short message; internal failures are logged here and surface as a
/// generic 500 so repository/storage detail never reaches clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("not authorized to modify this resource")]
    Forbidden,
    #[error("resource not found")]
    NotFound,
    #[error("username or email already in use")]
    Conflict,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("event already saved")]
    AlreadySaved,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthenticated | ApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            ApiError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Conflict => (StatusCode::CONFLICT, self.to_string()),
            ApiError::AlreadySaved | ApiError::Validation(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::Internal(e) => {
                error!("internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Re-map a unique-index violation to `Conflict`. The register and
/// username-change paths pre-check uniqueness, but a concurrent write can
/// slip between the check and the insert; the index error that results is a
/// conflict, not a server fault.
pub(crate) fn map_unique_conflict(err: ApiError) -> ApiError {
    match err {
        ApiError::Internal(e) if gather_db::is_unique_violation(&e) => ApiError::Conflict,
        other => other,
    }
}

/// Run blocking repository work off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task join error: {e}")))?
        .map_err(ApiError::Internal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gather_db::Database;

    #[test]
    fn unique_violation_surfaces_as_conflict() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "alice", "alice@example.com", "digest")
            .unwrap();

        // The pre-check lost the race; the unique index fires instead.
        let err = db
            .create_user("u2", "alice", "other@example.com", "digest")
            .unwrap_err();
        assert!(matches!(
            map_unique_conflict(ApiError::Internal(err)),
            ApiError::Conflict
        ));
    }

    #[test]
    fn other_errors_pass_through_unchanged() {
        assert!(matches!(
            map_unique_conflict(ApiError::NotFound),
            ApiError::NotFound
        ));
        assert!(matches!(
            map_unique_conflict(ApiError::Internal(anyhow::anyhow!("disk on fire"))),
            ApiError::Internal(_)
        ));
    }
}
