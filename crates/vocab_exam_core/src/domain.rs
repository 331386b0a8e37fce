//! crates/vocab_exam_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! Apart from `Word`, which travels inside the serializable exam session,
//! these structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shortest time limit a teacher may give a word.
pub const MIN_TIME_LIMIT_SECONDS: u32 = 10;
/// Longest time limit a teacher may give a word.
pub const MAX_TIME_LIMIT_SECONDS: u32 = 300;
/// Time limit used when a teacher does not pick one.
pub const DEFAULT_TIME_LIMIT_SECONDS: u32 = 60;
/// Sentence stored when a student submits (or times out) with an empty draft.
pub const NO_ANSWER_PLACEHOLDER: &str = "[No answer]";

/// A teacher account - used throughout the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Teacher {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct TeacherCredentials {
    pub teacher_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// An ordered collection of vocabulary words authored by a teacher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSet {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What a student sees when picking a word set: the set and who owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSetSummary {
    pub id: Uuid,
    pub name: String,
    pub teacher_name: String,
}

/// A single word of a word set. `order_index` is zero-based and dense within the set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub id: Uuid,
    pub word_set_id: Uuid,
    pub text: String,
    pub time_limit_seconds: u32,
    pub order_index: u32,
}

/// One student's attempt at a word set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exam {
    pub id: Uuid,
    pub word_set_id: Uuid,
    pub student_name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_words: u32,
    pub total_score: Option<u32>,
}

impl Exam {
    /// An exam is terminal once its completion timestamp is set.
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// A completed exam as listed on the grading view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamSummary {
    pub id: Uuid,
    pub student_name: String,
    pub word_set_name: String,
    pub completed_at: DateTime<Utc>,
    pub total_words: u32,
    pub total_score: Option<u32>,
}

/// The data needed to persist a student's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExamAnswer {
    pub exam_id: Uuid,
    pub word_id: Uuid,
    pub word_text: String,
    pub student_sentence: String,
    pub time_taken_seconds: u32,
    pub submitted_at: DateTime<Utc>,
}

/// A student's sentence for one word. `is_correct == None` means ungraded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamAnswer {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub word_id: Uuid,
    pub word_text: String,
    pub student_sentence: String,
    pub time_taken_seconds: u32,
    pub submitted_at: DateTime<Utc>,
    pub is_correct: Option<bool>,
    pub teacher_feedback: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
}

impl ExamAnswer {
    pub fn is_graded(&self) -> bool {
        self.is_correct.is_some()
    }
}
