//! services/api/src/error.rs
//!
//! Defines the primary error type for the API service and the mapping of
//! core errors onto HTTP responses.

use crate::config::ConfigError;
use axum::http::StatusCode;
use tracing::error;
use vocab_exam_core::ExamError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Converts a core error into the `(StatusCode, String)` pair handlers return.
pub fn exam_error_response(err: ExamError) -> (StatusCode, String) {
    match err {
        ExamError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
        ExamError::EmptyWordSet(_) => (
            StatusCode::BAD_REQUEST,
            "No words found for this word set".to_string(),
        ),
        ExamError::Session(e) => (StatusCode::BAD_REQUEST, e.to_string()),
        ExamError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        ExamError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        ExamError::Collaborator(msg) => {
            error!("Collaborator failure: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong, please try again".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn core_errors_map_to_status_codes() {
        let status = |e| exam_error_response(e).0;
        assert_eq!(status(ExamError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(ExamError::EmptyWordSet(Uuid::nil())), StatusCode::BAD_REQUEST);
        assert_eq!(status(ExamError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(ExamError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(ExamError::Collaborator("db down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn collaborator_details_are_not_leaked() {
        let (_, body) = exam_error_response(ExamError::Collaborator("password=hunter2".into()));
        assert!(!body.contains("hunter2"));
    }
}
