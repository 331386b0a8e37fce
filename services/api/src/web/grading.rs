//! services/api/src/web/grading.rs
//!
//! Teacher handlers for reviewing completed exams, grading answers and the
//! dashboard statistics.

use crate::error::exam_error_response;
use crate::web::{middleware::TeacherId, rest::ExamSummaryResponse, state::AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use vocab_exam_core::{teacher_stats, Exam, ExamAnswer, TeacherStats};

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ExamResponse {
    pub id: Uuid,
    pub word_set_id: Uuid,
    pub student_name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_words: u32,
    pub total_score: Option<u32>,
}

impl From<Exam> for ExamResponse {
    fn from(e: Exam) -> Self {
        Self {
            id: e.id,
            word_set_id: e.word_set_id,
            student_name: e.student_name,
            started_at: e.started_at,
            completed_at: e.completed_at,
            total_words: e.total_words,
            total_score: e.total_score,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AnswerResponse {
    pub id: Uuid,
    pub word_id: Uuid,
    pub word_text: String,
    pub student_sentence: String,
    pub time_taken_seconds: u32,
    pub submitted_at: DateTime<Utc>,
    pub is_correct: Option<bool>,
    pub teacher_feedback: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
}

impl From<ExamAnswer> for AnswerResponse {
    fn from(a: ExamAnswer) -> Self {
        Self {
            id: a.id,
            word_id: a.word_id,
            word_text: a.word_text,
            student_sentence: a.student_sentence,
            time_taken_seconds: a.time_taken_seconds,
            submitted_at: a.submitted_at,
            is_correct: a.is_correct,
            teacher_feedback: a.teacher_feedback,
            checked_at: a.checked_at,
        }
    }
}

/// An exam's answers split into those still waiting for a grade and those already graded.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct GradingSheetResponse {
    pub exam: ExamResponse,
    pub ungraded: Vec<AnswerResponse>,
    pub graded: Vec<AnswerResponse>,
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct GradeRequest {
    pub is_correct: bool,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct GradeResponse {
    pub answer: AnswerResponse,
    /// The exam's score recounted after this grade.
    pub total_score: u32,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    pub word_sets: u32,
    pub completed_exams: u32,
    pub total_exams: u32,
    pub average_score: f64,
    /// Whole percentage of started exams that were completed.
    pub completion_rate: u32,
}

impl From<TeacherStats> for StatsResponse {
    fn from(s: TeacherStats) -> Self {
        Self {
            word_sets: s.word_sets,
            completed_exams: s.completed_exams,
            total_exams: s.total_exams,
            average_score: s.average_score,
            completion_rate: s.completion_rate,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List the teacher's completed exams, most recently completed first.
#[utoipa::path(
    get,
    path = "/teacher/exams",
    responses(
        (status = 200, description = "Completed exams", body = [ExamSummaryResponse]),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn list_exams_handler(
    State(state): State<Arc<AppState>>,
    Extension(TeacherId(teacher_id)): Extension<TeacherId>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let exams = state
        .grader()
        .list_exams(teacher_id)
        .await
        .map_err(exam_error_response)?;
    Ok(Json(
        exams
            .into_iter()
            .map(ExamSummaryResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    get,
    path = "/teacher/exams/{id}/answers",
    params(("id" = Uuid, Path, description = "The exam.")),
    responses(
        (status = 200, description = "The exam and its answers", body = GradingSheetResponse),
        (status = 404, description = "No such exam for this teacher")
    )
)]
pub async fn exam_answers_handler(
    State(state): State<Arc<AppState>>,
    Extension(TeacherId(teacher_id)): Extension<TeacherId>,
    Path(exam_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let sheet = state
        .grader()
        .exam_answers(teacher_id, exam_id)
        .await
        .map_err(exam_error_response)?;
    Ok(Json(GradingSheetResponse {
        exam: sheet.exam.into(),
        ungraded: sheet.ungraded.into_iter().map(AnswerResponse::from).collect(),
        graded: sheet.graded.into_iter().map(AnswerResponse::from).collect(),
    }))
}

/// Grade one answer. Regrading overwrites the previous grade.
#[utoipa::path(
    post,
    path = "/teacher/answers/{id}/grade",
    request_body = GradeRequest,
    params(("id" = Uuid, Path, description = "The answer to grade.")),
    responses(
        (status = 200, description = "Answer graded", body = GradeResponse),
        (status = 400, description = "The exam is not completed yet"),
        (status = 404, description = "No such answer for this teacher")
    )
)]
pub async fn grade_answer_handler(
    State(state): State<Arc<AppState>>,
    Extension(TeacherId(teacher_id)): Extension<TeacherId>,
    Path(answer_id): Path<Uuid>,
    Json(req): Json<GradeRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let result = state
        .grader()
        .grade(teacher_id, answer_id, req.is_correct, req.feedback.as_deref())
        .await
        .map_err(exam_error_response)?;
    Ok(Json(GradeResponse {
        answer: result.answer.into(),
        total_score: result.total_score,
    }))
}

#[utoipa::path(
    get,
    path = "/teacher/stats",
    responses(
        (status = 200, description = "Dashboard statistics", body = StatsResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(TeacherId(teacher_id)): Extension<TeacherId>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let stats = teacher_stats(state.db.as_ref(), teacher_id)
        .await
        .map_err(exam_error_response)?;
    Ok(Json(StatsResponse::from(stats)))
}

#[cfg(test)]
mod tests {
    use crate::web::test_support::{self, logged_in_teacher, setup_test_context};
    use axum::http::{Method, StatusCode};
    use chrono::Utc;
    use serde_json::json;
    use tower::ServiceExt;
    use uuid::Uuid;
    use vocab_exam_core::ports::DatabaseService;
    use vocab_exam_core::testing::InMemoryDatabase;
    use vocab_exam_core::NewExamAnswer;

    /// A completed three-word exam; returns the exam id and its answer ids in order.
    async fn completed_exam(db: &InMemoryDatabase, teacher_id: Uuid) -> (Uuid, Vec<Uuid>) {
        let set = db.create_word_set(teacher_id, "Week 1", None).await.unwrap();
        let mut words = Vec::new();
        for text in ["dog", "run", "sky"] {
            words.push(db.add_word(set.id, text, 30).await.unwrap());
        }
        let exam = db.create_exam(set.id, "Ana", 3, Utc::now()).await.unwrap();
        let mut answer_ids = Vec::new();
        for word in &words {
            let answer = db
                .save_exam_answer(NewExamAnswer {
                    exam_id: exam.id,
                    word_id: word.id,
                    word_text: word.text.clone(),
                    student_sentence: format!("A sentence with {}.", word.text),
                    time_taken_seconds: 12,
                    submitted_at: Utc::now(),
                })
                .await
                .unwrap();
            answer_ids.push(answer.id);
        }
        db.complete_exam(exam.id, Utc::now()).await.unwrap();
        (exam.id, answer_ids)
    }

    #[tokio::test]
    async fn grading_recounts_the_score_from_stored_answers() {
        let ctx = setup_test_context();
        let (teacher_id, cookie) = logged_in_teacher(&ctx.db, "t@example.com", "T").await;
        let (exam_id, answers) = completed_exam(&ctx.db, teacher_id).await;

        let mut last_score = None;
        for (answer_id, is_correct) in answers.iter().zip([true, false, true]) {
            let response = ctx
                .app
                .clone()
                .oneshot(test_support::json_request(
                    Method::POST,
                    &format!("/teacher/answers/{answer_id}/grade"),
                    Some(&cookie),
                    Some(json!({ "is_correct": is_correct, "feedback": "  " })),
                ))
                .await
                .expect("grade answer");
            let status = response.status();
            let graded = test_support::read_json(response).await;
            assert_eq!(status, StatusCode::OK, "response: {graded}");
            assert_eq!(graded["answer"]["teacher_feedback"], serde_json::Value::Null);
            last_score = graded["total_score"].as_u64();
        }
        assert_eq!(last_score, Some(2));

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                &format!("/teacher/exams/{exam_id}/answers"),
                Some(&cookie),
                None,
            ))
            .await
            .expect("exam answers");
        let sheet = test_support::read_json(response).await;
        assert_eq!(sheet["exam"]["total_score"], 2);
        assert_eq!(sheet["graded"].as_array().map(Vec::len), Some(3));
        assert_eq!(sheet["ungraded"].as_array().map(Vec::len), Some(0));

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::GET,
                "/teacher/exams",
                Some(&cookie),
                None,
            ))
            .await
            .expect("list exams");
        let exams = test_support::read_json(response).await;
        assert_eq!(exams[0]["id"], exam_id.to_string());
        assert_eq!(exams[0]["total_score"], 2);
    }

    #[tokio::test]
    async fn stats_cover_all_of_the_teachers_exams() {
        let ctx = setup_test_context();
        let (teacher_id, cookie) = logged_in_teacher(&ctx.db, "t@example.com", "T").await;
        let (exam_id, answers) = completed_exam(&ctx.db, teacher_id).await;
        ctx.db
            .grade_answer(answers[0], true, None, Utc::now())
            .await
            .unwrap();
        ctx.db.set_exam_score(exam_id, 1).await.unwrap();
        let set_id = ctx.db.get_exam(exam_id).await.unwrap().word_set_id;
        ctx.db.create_exam(set_id, "Ben", 3, Utc::now()).await.unwrap();

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::GET,
                "/teacher/stats",
                Some(&cookie),
                None,
            ))
            .await
            .expect("stats");
        let status = response.status();
        let stats = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {stats}");
        assert_eq!(stats["word_sets"], 1);
        assert_eq!(stats["total_exams"], 2);
        assert_eq!(stats["completed_exams"], 1);
        assert_eq!(stats["completion_rate"], 50);
        assert_eq!(stats["average_score"], 1.0);
    }

    #[tokio::test]
    async fn foreign_answers_cannot_be_graded() {
        let ctx = setup_test_context();
        let (owner_id, _) = logged_in_teacher(&ctx.db, "owner@example.com", "Owner").await;
        let (_, intruder) = logged_in_teacher(&ctx.db, "other@example.com", "Other").await;
        let (_, answers) = completed_exam(&ctx.db, owner_id).await;

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/teacher/answers/{}/grade", answers[0]),
                Some(&intruder),
                Some(json!({ "is_correct": true })),
            ))
            .await
            .expect("grade answer");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let answer = ctx.db.get_answer(answers[0]).await.unwrap();
        assert_eq!(answer.is_correct, None);
    }
}
