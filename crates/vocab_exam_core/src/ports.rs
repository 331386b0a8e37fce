//! crates/vocab_exam_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture: persistence,
//! authentication sessions and realtime change notifications all live behind
//! them, so the exam logic never talks to a concrete database.

use crate::domain::{
    Exam, ExamAnswer, ExamSummary, NewExamAnswer, Teacher, TeacherCredentials, Word, WordSet,
    WordSetSummary,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::pin::Pin;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Persistence Port
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Teachers & Auth Sessions ---
    async fn create_teacher(
        &self,
        email: &str,
        full_name: &str,
        hashed_password: &str,
    ) -> PortResult<Teacher>;

    async fn get_teacher_credentials_by_email(&self, email: &str) -> PortResult<TeacherCredentials>;

    async fn get_teacher_by_id(&self, teacher_id: Uuid) -> PortResult<Teacher>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        teacher_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the teacher owning a live (unexpired) session.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Word Sets ---
    async fn list_word_sets(&self) -> PortResult<Vec<WordSetSummary>>;

    /// Newest first.
    async fn list_word_sets_for_teacher(&self, teacher_id: Uuid) -> PortResult<Vec<WordSet>>;

    async fn count_word_sets_for_teacher(&self, teacher_id: Uuid) -> PortResult<u32>;

    async fn get_word_set(&self, word_set_id: Uuid) -> PortResult<WordSet>;

    async fn create_word_set(
        &self,
        teacher_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> PortResult<WordSet>;

    async fn update_word_set(
        &self,
        word_set_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> PortResult<WordSet>;

    /// Removes the set together with its words, exams and answers.
    async fn delete_word_set(&self, word_set_id: Uuid) -> PortResult<()>;

    // --- Words ---
    /// Ordered by `order_index` ascending.
    async fn list_words(&self, word_set_id: Uuid) -> PortResult<Vec<Word>>;

    /// Appends the word at the end of the set.
    async fn add_word(
        &self,
        word_set_id: Uuid,
        text: &str,
        time_limit_seconds: u32,
    ) -> PortResult<Word>;

    async fn get_word(&self, word_id: Uuid) -> PortResult<Word>;

    /// Removes the word and closes the gap it leaves in `order_index`.
    async fn delete_word(&self, word_id: Uuid) -> PortResult<()>;

    // --- Exams ---
    async fn create_exam(
        &self,
        word_set_id: Uuid,
        student_name: &str,
        total_words: u32,
        started_at: DateTime<Utc>,
    ) -> PortResult<Exam>;

    async fn get_exam(&self, exam_id: Uuid) -> PortResult<Exam>;

    /// Fails with `Conflict` when the exam is already completed.
    async fn complete_exam(&self, exam_id: Uuid, completed_at: DateTime<Utc>) -> PortResult<Exam>;

    /// Every exam taken on one of the teacher's word sets, completed or not.
    async fn list_exams_for_teacher(&self, teacher_id: Uuid) -> PortResult<Vec<Exam>>;

    /// Completed exams only, most recently completed first.
    async fn list_completed_exams_for_teacher(
        &self,
        teacher_id: Uuid,
    ) -> PortResult<Vec<ExamSummary>>;

    async fn set_exam_score(&self, exam_id: Uuid, total_score: u32) -> PortResult<()>;

    // --- Exam Answers ---
    /// Stores one answer per (exam, word). Saving the same pair again overwrites the
    /// sentence and timing of the existing row. Fails with `Conflict` once the exam is completed.
    async fn save_exam_answer(&self, answer: NewExamAnswer) -> PortResult<ExamAnswer>;

    /// Ordered by `submitted_at` ascending.
    async fn list_answers_for_exam(&self, exam_id: Uuid) -> PortResult<Vec<ExamAnswer>>;

    async fn get_answer(&self, answer_id: Uuid) -> PortResult<ExamAnswer>;

    async fn grade_answer(
        &self,
        answer_id: Uuid,
        is_correct: bool,
        feedback: Option<&str>,
        checked_at: DateTime<Utc>,
    ) -> PortResult<ExamAnswer>;

    async fn count_correct_answers(&self, exam_id: Uuid) -> PortResult<u32>;
}

//=========================================================================================
// Realtime Port
//=========================================================================================

/// A row-level change on the exams table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamChange {
    Inserted { exam_id: Uuid, word_set_id: Uuid },
    Completed { exam_id: Uuid, word_set_id: Uuid },
}

/// A standing subscription. Dropping the stream releases it.
pub type ExamChangeStream = Pin<Box<dyn Stream<Item = ExamChange> + Send>>;

/// Pushes exam changes to subscribed dashboards. Subscribers should treat every
/// item as "something changed" and re-query rather than apply the payload.
pub trait ExamNotifier: Send + Sync {
    fn notify(&self, change: ExamChange);

    fn subscribe(&self) -> ExamChangeStream;
}
