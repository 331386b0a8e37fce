//! crates/vocab_exam_core/src/analytics.rs
//!
//! Aggregate statistics shown on the teacher dashboard.

use crate::domain::Exam;
use crate::error::ExamResult;
use crate::ports::DatabaseService;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct TeacherStats {
    pub word_sets: u32,
    pub completed_exams: u32,
    pub total_exams: u32,
    /// Mean `total_score` over completed exams, one decimal place. Unscored exams count as 0.
    pub average_score: f64,
    /// Completed exams as a whole percentage of all exams; 0 when there are none.
    pub completion_rate: u32,
}

impl TeacherStats {
    pub fn from_exams(word_sets: u32, exams: &[Exam]) -> Self {
        let completed: Vec<&Exam> = exams.iter().filter(|e| e.is_completed()).collect();
        let total_exams = exams.len() as u32;
        let completed_exams = completed.len() as u32;

        let average_score = if completed.is_empty() {
            0.0
        } else {
            let sum: u32 = completed.iter().map(|e| e.total_score.unwrap_or(0)).sum();
            let avg = f64::from(sum) / f64::from(completed_exams);
            (avg * 10.0).round() / 10.0
        };
        let completion_rate = if total_exams == 0 {
            0
        } else {
            (f64::from(completed_exams) / f64::from(total_exams) * 100.0).round() as u32
        };

        Self {
            word_sets,
            completed_exams,
            total_exams,
            average_score,
            completion_rate,
        }
    }
}

pub async fn teacher_stats(db: &dyn DatabaseService, teacher_id: Uuid) -> ExamResult<TeacherStats> {
    let word_sets = db.count_word_sets_for_teacher(teacher_id).await?;
    let exams = db.list_exams_for_teacher(teacher_id).await?;
    Ok(TeacherStats::from_exams(word_sets, &exams))
}
