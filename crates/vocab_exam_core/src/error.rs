//! crates/vocab_exam_core/src/error.rs
//!
//! The error taxonomy surfaced to users of the core operations.

use crate::ports::PortError;
use crate::session::SessionError;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ExamError {
    /// Bad user input; the caller keeps the input around for correction.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Word set {0} has no words")]
    EmptyWordSet(Uuid),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    /// A failed call to the database or another external collaborator.
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl From<PortError> for ExamError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(what) => ExamError::NotFound(what),
            PortError::Unauthorized => ExamError::Unauthorized,
            PortError::Conflict(what) => ExamError::Validation(what),
            PortError::Unexpected(what) => ExamError::Collaborator(what),
        }
    }
}

pub type ExamResult<T> = Result<T, ExamError>;
