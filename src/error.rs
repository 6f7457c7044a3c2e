use actix_web::{HttpResponse, http::StatusCode};
use thiserror::Error;

/// Result type alias for attendance operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Server-side error taxonomy. State conflicts are definitive outcomes the
/// caller must not retry; store failures are infrastructure problems and are
/// never reported as conflicts.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Already checked in today")]
    AlreadyCheckedIn,

    #[error("Already checked out today")]
    AlreadyCheckedOut,

    #[error("No active check-in found for today")]
    NotCheckedIn,

    #[error("Invalid request: {0}")]
    Validation(String),

    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl actix_web::ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::AlreadyCheckedIn | Error::AlreadyCheckedOut | Error::NotCheckedIn => {
                StatusCode::CONFLICT
            }
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            Error::Database(e) => {
                tracing::error!(error = %e, "attendance store failure");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "message": message
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;

    #[test]
    fn conflict_errors_map_to_409() {
        assert_eq!(Error::AlreadyCheckedIn.status_code(), StatusCode::CONFLICT);
        assert_eq!(Error::AlreadyCheckedOut.status_code(), StatusCode::CONFLICT);
        assert_eq!(Error::NotCheckedIn.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn validation_maps_to_400() {
        let err = Error::Validation("username is required".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Invalid request: username is required");
    }

    #[test]
    fn database_maps_to_500_without_leaking_detail() {
        let err = Error::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn conflict_messages_match_api_contract() {
        assert_eq!(Error::AlreadyCheckedIn.to_string(), "Already checked in today");
        assert_eq!(
            Error::NotCheckedIn.to_string(),
            "No active check-in found for today"
        );
    }
}
