//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use vocab_exam_core::domain::{
    Exam, ExamAnswer, ExamSummary, NewExamAnswer, Teacher, TeacherCredentials, Word, WordSet,
    WordSetSummary,
};
use vocab_exam_core::ports::{DatabaseService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// Error Mapping
//=========================================================================================

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

fn pg_code(e: &sqlx::Error) -> Option<String> {
    e.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code.into_owned())
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(e: sqlx::Error, what: String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct TeacherRecord {
    id: Uuid,
    email: String,
    full_name: String,
    created_at: DateTime<Utc>,
}
impl TeacherRecord {
    fn to_domain(self) -> Teacher {
        Teacher {
            id: self.id,
            email: self.email,
            full_name: self.full_name,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> TeacherCredentials {
        TeacherCredentials {
            teacher_id: self.id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct WordSetRecord {
    id: Uuid,
    teacher_id: Uuid,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}
impl WordSetRecord {
    fn to_domain(self) -> WordSet {
        WordSet {
            id: self.id,
            teacher_id: self.teacher_id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct WordSetSummaryRecord {
    id: Uuid,
    name: String,
    teacher_name: String,
}
impl WordSetSummaryRecord {
    fn to_domain(self) -> WordSetSummary {
        WordSetSummary {
            id: self.id,
            name: self.name,
            teacher_name: self.teacher_name,
        }
    }
}

#[derive(FromRow)]
struct WordRecord {
    id: Uuid,
    word_set_id: Uuid,
    word_text: String,
    time_limit_seconds: i32,
    order_index: i32,
}
impl WordRecord {
    fn to_domain(self) -> Word {
        Word {
            id: self.id,
            word_set_id: self.word_set_id,
            text: self.word_text,
            time_limit_seconds: self.time_limit_seconds.max(0) as u32,
            order_index: self.order_index.max(0) as u32,
        }
    }
}

#[derive(FromRow)]
struct ExamRecord {
    id: Uuid,
    word_set_id: Uuid,
    student_name: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    total_words: i32,
    total_score: Option<i32>,
}
impl ExamRecord {
    fn to_domain(self) -> Exam {
        Exam {
            id: self.id,
            word_set_id: self.word_set_id,
            student_name: self.student_name,
            started_at: self.started_at,
            completed_at: self.completed_at,
            total_words: self.total_words.max(0) as u32,
            total_score: self.total_score.map(|s| s.max(0) as u32),
        }
    }
}

#[derive(FromRow)]
struct ExamSummaryRecord {
    id: Uuid,
    student_name: String,
    word_set_name: String,
    completed_at: DateTime<Utc>,
    total_words: i32,
    total_score: Option<i32>,
}
impl ExamSummaryRecord {
    fn to_domain(self) -> ExamSummary {
        ExamSummary {
            id: self.id,
            student_name: self.student_name,
            word_set_name: self.word_set_name,
            completed_at: self.completed_at,
            total_words: self.total_words.max(0) as u32,
            total_score: self.total_score.map(|s| s.max(0) as u32),
        }
    }
}

#[derive(FromRow)]
struct ExamAnswerRecord {
    id: Uuid,
    exam_id: Uuid,
    word_id: Uuid,
    word_text: String,
    student_sentence: String,
    time_taken_seconds: i32,
    submitted_at: DateTime<Utc>,
    is_correct: Option<bool>,
    teacher_feedback: Option<String>,
    checked_at: Option<DateTime<Utc>>,
}
impl ExamAnswerRecord {
    fn to_domain(self) -> ExamAnswer {
        ExamAnswer {
            id: self.id,
            exam_id: self.exam_id,
            word_id: self.word_id,
            word_text: self.word_text,
            student_sentence: self.student_sentence,
            time_taken_seconds: self.time_taken_seconds.max(0) as u32,
            submitted_at: self.submitted_at,
            is_correct: self.is_correct,
            teacher_feedback: self.teacher_feedback,
            checked_at: self.checked_at,
        }
    }
}

const WORD_SET_COLUMNS: &str = "id, teacher_id, name, description, created_at";
const WORD_COLUMNS: &str = "id, word_set_id, word_text, time_limit_seconds, order_index";
const EXAM_COLUMNS: &str =
    "id, word_set_id, student_name, started_at, completed_at, total_words, total_score";
const ANSWER_COLUMNS: &str = "id, exam_id, word_id, word_text, student_sentence, \
     time_taken_seconds, submitted_at, is_correct, teacher_feedback, checked_at";

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_teacher(
        &self,
        email: &str,
        full_name: &str,
        hashed_password: &str,
    ) -> PortResult<Teacher> {
        let record = sqlx::query_as::<_, TeacherRecord>(
            "INSERT INTO teachers (id, email, full_name, hashed_password) VALUES ($1, $2, $3, $4) \
             RETURNING id, email, full_name, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(full_name)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match pg_code(&e).as_deref() {
            Some(UNIQUE_VIOLATION) => {
                PortError::Conflict(format!("Email {} is already registered", email))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_teacher_credentials_by_email(&self, email: &str) -> PortResult<TeacherCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, hashed_password FROM teachers WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Teacher {} not found", email)))?;
        Ok(record.to_domain())
    }

    async fn get_teacher_by_id(&self, teacher_id: Uuid) -> PortResult<Teacher> {
        let record = sqlx::query_as::<_, TeacherRecord>(
            "SELECT id, email, full_name, created_at FROM teachers WHERE id = $1",
        )
        .bind(teacher_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Teacher {} not found", teacher_id)))?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        teacher_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, teacher_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(teacher_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT teacher_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, "Auth session not found".to_string()))
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_word_sets(&self) -> PortResult<Vec<WordSetSummary>> {
        let records = sqlx::query_as::<_, WordSetSummaryRecord>(
            "SELECT ws.id, ws.name, t.full_name AS teacher_name \
             FROM word_sets ws JOIN teachers t ON t.id = ws.teacher_id \
             ORDER BY t.full_name ASC, ws.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_word_sets_for_teacher(&self, teacher_id: Uuid) -> PortResult<Vec<WordSet>> {
        let records = sqlx::query_as::<_, WordSetRecord>(&format!(
            "SELECT {WORD_SET_COLUMNS} FROM word_sets WHERE teacher_id = $1 ORDER BY created_at DESC"
        ))
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn count_word_sets_for_teacher(&self, teacher_id: Uuid) -> PortResult<u32> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM word_sets WHERE teacher_id = $1")
            .bind(teacher_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(count as u32)
    }

    async fn get_word_set(&self, word_set_id: Uuid) -> PortResult<WordSet> {
        let record = sqlx::query_as::<_, WordSetRecord>(&format!(
            "SELECT {WORD_SET_COLUMNS} FROM word_sets WHERE id = $1"
        ))
        .bind(word_set_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Word set {} not found", word_set_id)))?;
        Ok(record.to_domain())
    }

    async fn create_word_set(
        &self,
        teacher_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> PortResult<WordSet> {
        let record = sqlx::query_as::<_, WordSetRecord>(&format!(
            "INSERT INTO word_sets (id, teacher_id, name, description) VALUES ($1, $2, $3, $4) \
             RETURNING {WORD_SET_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(teacher_id)
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_word_set(
        &self,
        word_set_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> PortResult<WordSet> {
        let record = sqlx::query_as::<_, WordSetRecord>(&format!(
            "UPDATE word_sets SET name = $2, description = $3 WHERE id = $1 \
             RETURNING {WORD_SET_COLUMNS}"
        ))
        .bind(word_set_id)
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Word set {} not found", word_set_id)))?;
        Ok(record.to_domain())
    }

    async fn delete_word_set(&self, word_set_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM word_sets WHERE id = $1")
            .bind(word_set_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Word set {} not found", word_set_id)));
        }
        Ok(())
    }

    async fn list_words(&self, word_set_id: Uuid) -> PortResult<Vec<Word>> {
        let records = sqlx::query_as::<_, WordRecord>(&format!(
            "SELECT {WORD_COLUMNS} FROM words WHERE word_set_id = $1 ORDER BY order_index ASC"
        ))
        .bind(word_set_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn add_word(
        &self,
        word_set_id: Uuid,
        text: &str,
        time_limit_seconds: u32,
    ) -> PortResult<Word> {
        // The next index is the current word count, which keeps the order dense.
        let record = sqlx::query_as::<_, WordRecord>(&format!(
            "INSERT INTO words (id, word_set_id, word_text, time_limit_seconds, order_index) \
             SELECT $1, $2, $3, $4, COUNT(*)::INT4 FROM words WHERE word_set_id = $2 \
             RETURNING {WORD_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(word_set_id)
        .bind(text)
        .bind(time_limit_seconds as i32)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match pg_code(&e).as_deref() {
            Some(FOREIGN_KEY_VIOLATION) => {
                PortError::NotFound(format!("Word set {} not found", word_set_id))
            }
            Some(UNIQUE_VIOLATION) => {
                PortError::Conflict("The word list changed, please try again".to_string())
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_word(&self, word_id: Uuid) -> PortResult<Word> {
        let record = sqlx::query_as::<_, WordRecord>(&format!(
            "SELECT {WORD_COLUMNS} FROM words WHERE id = $1"
        ))
        .bind(word_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Word {} not found", word_id)))?;
        Ok(record.to_domain())
    }

    async fn delete_word(&self, word_id: Uuid) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let (word_set_id, order_index) = sqlx::query_as::<_, (Uuid, i32)>(
            "DELETE FROM words WHERE id = $1 RETURNING word_set_id, order_index",
        )
        .bind(word_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match pg_code(&e).as_deref() {
            Some(FOREIGN_KEY_VIOLATION) => PortError::Conflict(
                "This word has already been answered in an exam".to_string(),
            ),
            _ => not_found_or_unexpected(e, format!("Word {} not found", word_id)),
        })?;

        sqlx::query(
            "UPDATE words SET order_index = order_index - 1 \
             WHERE word_set_id = $1 AND order_index > $2",
        )
        .bind(word_set_id)
        .bind(order_index)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn create_exam(
        &self,
        word_set_id: Uuid,
        student_name: &str,
        total_words: u32,
        started_at: DateTime<Utc>,
    ) -> PortResult<Exam> {
        let record = sqlx::query_as::<_, ExamRecord>(&format!(
            "INSERT INTO exams (id, word_set_id, student_name, total_words, started_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {EXAM_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(word_set_id)
        .bind(student_name)
        .bind(total_words as i32)
        .bind(started_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match pg_code(&e).as_deref() {
            Some(FOREIGN_KEY_VIOLATION) => {
                PortError::NotFound(format!("Word set {} not found", word_set_id))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_exam(&self, exam_id: Uuid) -> PortResult<Exam> {
        let record = sqlx::query_as::<_, ExamRecord>(&format!(
            "SELECT {EXAM_COLUMNS} FROM exams WHERE id = $1"
        ))
        .bind(exam_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Exam {} not found", exam_id)))?;
        Ok(record.to_domain())
    }

    async fn complete_exam(&self, exam_id: Uuid, completed_at: DateTime<Utc>) -> PortResult<Exam> {
        let record = sqlx::query_as::<_, ExamRecord>(&format!(
            "UPDATE exams SET completed_at = $2 WHERE id = $1 AND completed_at IS NULL \
             RETURNING {EXAM_COLUMNS}"
        ))
        .bind(exam_id)
        .bind(completed_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        match record {
            Some(record) => Ok(record.to_domain()),
            None => {
                // Distinguish a missing exam from one that is already terminal.
                self.get_exam(exam_id).await?;
                Err(PortError::Conflict(format!("Exam {} is already completed", exam_id)))
            }
        }
    }

    async fn list_exams_for_teacher(&self, teacher_id: Uuid) -> PortResult<Vec<Exam>> {
        let records = sqlx::query_as::<_, ExamRecord>(
            "SELECT e.id, e.word_set_id, e.student_name, e.started_at, e.completed_at, \
                    e.total_words, e.total_score \
             FROM exams e JOIN word_sets ws ON ws.id = e.word_set_id \
             WHERE ws.teacher_id = $1 ORDER BY e.started_at DESC",
        )
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_completed_exams_for_teacher(
        &self,
        teacher_id: Uuid,
    ) -> PortResult<Vec<ExamSummary>> {
        let records = sqlx::query_as::<_, ExamSummaryRecord>(
            "SELECT e.id, e.student_name, ws.name AS word_set_name, e.completed_at, \
                    e.total_words, e.total_score \
             FROM exams e JOIN word_sets ws ON ws.id = e.word_set_id \
             WHERE ws.teacher_id = $1 AND e.completed_at IS NOT NULL \
             ORDER BY e.completed_at DESC",
        )
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn set_exam_score(&self, exam_id: Uuid, total_score: u32) -> PortResult<()> {
        let result = sqlx::query("UPDATE exams SET total_score = $2 WHERE id = $1")
            .bind(exam_id)
            .bind(total_score as i32)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Exam {} not found", exam_id)));
        }
        Ok(())
    }

    async fn save_exam_answer(&self, answer: NewExamAnswer) -> PortResult<ExamAnswer> {
        let exam_id = answer.exam_id;
        let word_id = answer.word_id;
        // One row per (exam, word): a retried submission overwrites the earlier attempt.
        let record = sqlx::query_as::<_, ExamAnswerRecord>(&format!(
            "INSERT INTO exam_answers \
                (id, exam_id, word_id, word_text, student_sentence, time_taken_seconds, submitted_at) \
             SELECT $1, $2, $3, $4, $5, $6, $7 \
             WHERE EXISTS (SELECT 1 FROM exams WHERE id = $2 AND completed_at IS NULL) \
             ON CONFLICT (exam_id, word_id) DO UPDATE SET \
                student_sentence = EXCLUDED.student_sentence, \
                time_taken_seconds = EXCLUDED.time_taken_seconds, \
                submitted_at = EXCLUDED.submitted_at \
             RETURNING {ANSWER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(answer.exam_id)
        .bind(answer.word_id)
        .bind(&answer.word_text)
        .bind(&answer.student_sentence)
        .bind(answer.time_taken_seconds as i32)
        .bind(answer.submitted_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match pg_code(&e).as_deref() {
            // The word was deleted after the exam started.
            Some(FOREIGN_KEY_VIOLATION) => {
                PortError::NotFound(format!("Word {} not found", word_id))
            }
            _ => unexpected(e),
        })?;

        match record {
            Some(record) => Ok(record.to_domain()),
            None => {
                self.get_exam(exam_id).await?;
                Err(PortError::Conflict(format!("Exam {} is already completed", exam_id)))
            }
        }
    }

    async fn list_answers_for_exam(&self, exam_id: Uuid) -> PortResult<Vec<ExamAnswer>> {
        let records = sqlx::query_as::<_, ExamAnswerRecord>(&format!(
            "SELECT {ANSWER_COLUMNS} FROM exam_answers WHERE exam_id = $1 ORDER BY submitted_at ASC"
        ))
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_answer(&self, answer_id: Uuid) -> PortResult<ExamAnswer> {
        let record = sqlx::query_as::<_, ExamAnswerRecord>(&format!(
            "SELECT {ANSWER_COLUMNS} FROM exam_answers WHERE id = $1"
        ))
        .bind(answer_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Answer {} not found", answer_id)))?;
        Ok(record.to_domain())
    }

    async fn grade_answer(
        &self,
        answer_id: Uuid,
        is_correct: bool,
        feedback: Option<&str>,
        checked_at: DateTime<Utc>,
    ) -> PortResult<ExamAnswer> {
        let record = sqlx::query_as::<_, ExamAnswerRecord>(&format!(
            "UPDATE exam_answers SET is_correct = $2, teacher_feedback = $3, checked_at = $4 \
             WHERE id = $1 RETURNING {ANSWER_COLUMNS}"
        ))
        .bind(answer_id)
        .bind(is_correct)
        .bind(feedback)
        .bind(checked_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Answer {} not found", answer_id)))?;
        Ok(record.to_domain())
    }

    async fn count_correct_answers(&self, exam_id: Uuid) -> PortResult<u32> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM exam_answers WHERE exam_id = $1 AND is_correct IS TRUE",
        )
        .bind(exam_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(count as u32)
    }
}
