//! crates/vocab_exam_core/src/grading.rs
//!
//! Teacher-side grading of completed exams.

use crate::domain::{Exam, ExamAnswer, ExamSummary};
use crate::error::{ExamError, ExamResult};
use crate::ports::DatabaseService;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// The answers of one exam, split by grading status. Both halves keep submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradingSheet {
    pub exam: Exam,
    pub ungraded: Vec<ExamAnswer>,
    pub graded: Vec<ExamAnswer>,
}

/// The outcome of grading a single answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeResult {
    pub answer: ExamAnswer,
    pub total_score: u32,
}

#[derive(Clone)]
pub struct Grader {
    db: Arc<dyn DatabaseService>,
}

impl Grader {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    pub async fn list_exams(&self, teacher_id: Uuid) -> ExamResult<Vec<ExamSummary>> {
        Ok(self.db.list_completed_exams_for_teacher(teacher_id).await?)
    }

    pub async fn exam_answers(&self, teacher_id: Uuid, exam_id: Uuid) -> ExamResult<GradingSheet> {
        let exam = self.owned_exam(teacher_id, exam_id).await?;
        let (graded, ungraded): (Vec<ExamAnswer>, Vec<ExamAnswer>) = self
            .db
            .list_answers_for_exam(exam.id)
            .await?
            .into_iter()
            .partition(ExamAnswer::is_graded);
        Ok(GradingSheet {
            exam,
            ungraded,
            graded,
        })
    }

    /// Grades one answer, then recounts the exam's score from the stored answers.
    pub async fn grade(
        &self,
        teacher_id: Uuid,
        answer_id: Uuid,
        is_correct: bool,
        feedback: Option<&str>,
    ) -> ExamResult<GradeResult> {
        let answer = self.db.get_answer(answer_id).await?;
        let exam = self.owned_exam(teacher_id, answer.exam_id).await?;
        if !exam.is_completed() {
            return Err(ExamError::Validation(
                "Only completed exams can be graded".to_string(),
            ));
        }

        let feedback = feedback.map(str::trim).filter(|f| !f.is_empty());
        let answer = self
            .db
            .grade_answer(answer_id, is_correct, feedback, Utc::now())
            .await?;

        let total_score = self.db.count_correct_answers(exam.id).await?;
        self.db.set_exam_score(exam.id, total_score).await?;
        info!(
            "Answer {} graded {} (exam {} score {})",
            answer_id,
            if is_correct { "correct" } else { "incorrect" },
            exam.id,
            total_score
        );

        Ok(GradeResult {
            answer,
            total_score,
        })
    }

    // Foreign exams are reported as missing so their existence does not leak.
    async fn owned_exam(&self, teacher_id: Uuid, exam_id: Uuid) -> ExamResult<Exam> {
        let exam = self.db.get_exam(exam_id).await?;
        let word_set = self.db.get_word_set(exam.word_set_id).await?;
        if word_set.teacher_id != teacher_id {
            return Err(ExamError::NotFound(format!("Exam {} not found", exam_id)));
        }
        Ok(exam)
    }
}
