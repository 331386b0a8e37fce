//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for word-set authoring, the public word-set
//! listing used by students, and the master definition for the OpenAPI specification.

use crate::error::exam_error_response;
use crate::web::{
    auth, grading,
    middleware::TeacherId,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;
use vocab_exam_core::domain::DEFAULT_TIME_LIMIT_SECONDS;
use vocab_exam_core::{ExamSummary, Word, WordSet, WordSetSummary};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        available_word_sets_handler,
        list_word_sets_handler,
        create_word_set_handler,
        update_word_set_handler,
        delete_word_set_handler,
        list_words_handler,
        add_word_handler,
        delete_word_handler,
        grading::list_exams_handler,
        grading::exam_answers_handler,
        grading::grade_answer_handler,
        grading::stats_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            WordSetSummaryResponse,
            WordSetRequest,
            WordSetResponse,
            AddWordRequest,
            WordResponse,
            ExamSummaryResponse,
            grading::ExamResponse,
            grading::AnswerResponse,
            grading::GradingSheetResponse,
            grading::GradeRequest,
            grading::GradeResponse,
            grading::StatsResponse,
        )
    ),
    tags(
        (name = "Vocabulary Exam API", description = "Word-set authoring, grading and analytics for timed vocabulary exams.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A word set as listed for students picking an exam.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct WordSetSummaryResponse {
    pub id: Uuid,
    pub name: String,
    pub teacher_name: String,
}

impl From<WordSetSummary> for WordSetSummaryResponse {
    fn from(s: WordSetSummary) -> Self {
        Self {
            id: s.id,
            name: s.name,
            teacher_name: s.teacher_name,
        }
    }
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct WordSetRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct WordSetResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<WordSet> for WordSetResponse {
    fn from(s: WordSet) -> Self {
        Self {
            id: s.id,
            name: s.name,
            description: s.description,
            created_at: s.created_at,
        }
    }
}

/// A new word. The time limit defaults to 60 seconds and must lie within 10..=300.
#[derive(Deserialize, Serialize, ToSchema)]
pub struct AddWordRequest {
    pub word_text: String,
    #[serde(default)]
    pub time_limit_seconds: Option<u32>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct WordResponse {
    pub id: Uuid,
    pub word_set_id: Uuid,
    pub word_text: String,
    pub time_limit_seconds: u32,
    pub order_index: u32,
}

impl From<Word> for WordResponse {
    fn from(w: Word) -> Self {
        Self {
            id: w.id,
            word_set_id: w.word_set_id,
            word_text: w.text,
            time_limit_seconds: w.time_limit_seconds,
            order_index: w.order_index,
        }
    }
}

/// A completed exam as shown in the teacher's grading list.
#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct ExamSummaryResponse {
    pub id: Uuid,
    pub student_name: String,
    pub word_set_name: String,
    pub completed_at: DateTime<Utc>,
    pub total_words: u32,
    pub total_score: Option<u32>,
}

impl From<ExamSummary> for ExamSummaryResponse {
    fn from(e: ExamSummary) -> Self {
        Self {
            id: e.id,
            student_name: e.student_name,
            word_set_name: e.word_set_name,
            completed_at: e.completed_at,
            total_words: e.total_words,
            total_score: e.total_score,
        }
    }
}

//=========================================================================================
// Public Handlers
//=========================================================================================

/// List every word set with its teacher's name, for students picking an exam.
#[utoipa::path(
    get,
    path = "/word-sets",
    responses(
        (status = 200, description = "All word sets", body = [WordSetSummaryResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn available_word_sets_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let sets = state
        .word_sets()
        .available()
        .await
        .map_err(exam_error_response)?;
    Ok(Json(
        sets.into_iter()
            .map(WordSetSummaryResponse::from)
            .collect::<Vec<_>>(),
    ))
}

//=========================================================================================
// Teacher Word-Set Handlers
//=========================================================================================

/// List the current teacher's word sets, newest first.
#[utoipa::path(
    get,
    path = "/teacher/word-sets",
    responses(
        (status = 200, description = "The teacher's word sets", body = [WordSetResponse]),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn list_word_sets_handler(
    State(state): State<Arc<AppState>>,
    Extension(TeacherId(teacher_id)): Extension<TeacherId>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let sets = state
        .word_sets()
        .list(teacher_id)
        .await
        .map_err(exam_error_response)?;
    Ok(Json(
        sets.into_iter().map(WordSetResponse::from).collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    post,
    path = "/teacher/word-sets",
    request_body = WordSetRequest,
    responses(
        (status = 201, description = "Word set created", body = WordSetResponse),
        (status = 400, description = "Missing name"),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn create_word_set_handler(
    State(state): State<Arc<AppState>>,
    Extension(TeacherId(teacher_id)): Extension<TeacherId>,
    Json(req): Json<WordSetRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let set = state
        .word_sets()
        .create(teacher_id, &req.name, req.description.as_deref())
        .await
        .map_err(exam_error_response)?;
    Ok((StatusCode::CREATED, Json(WordSetResponse::from(set))))
}

#[utoipa::path(
    put,
    path = "/teacher/word-sets/{id}",
    request_body = WordSetRequest,
    params(("id" = Uuid, Path, description = "The word set to rename.")),
    responses(
        (status = 200, description = "Word set updated", body = WordSetResponse),
        (status = 400, description = "Missing name"),
        (status = 404, description = "No such word set for this teacher")
    )
)]
pub async fn update_word_set_handler(
    State(state): State<Arc<AppState>>,
    Extension(TeacherId(teacher_id)): Extension<TeacherId>,
    Path(word_set_id): Path<Uuid>,
    Json(req): Json<WordSetRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let set = state
        .word_sets()
        .update(teacher_id, word_set_id, &req.name, req.description.as_deref())
        .await
        .map_err(exam_error_response)?;
    Ok(Json(WordSetResponse::from(set)))
}

/// Delete a word set together with its words and every exam taken on it.
#[utoipa::path(
    delete,
    path = "/teacher/word-sets/{id}",
    params(("id" = Uuid, Path, description = "The word set to delete.")),
    responses(
        (status = 204, description = "Word set deleted"),
        (status = 404, description = "No such word set for this teacher")
    )
)]
pub async fn delete_word_set_handler(
    State(state): State<Arc<AppState>>,
    Extension(TeacherId(teacher_id)): Extension<TeacherId>,
    Path(word_set_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .word_sets()
        .delete(teacher_id, word_set_id)
        .await
        .map_err(exam_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// List a word set's words in exam order.
#[utoipa::path(
    get,
    path = "/teacher/word-sets/{id}/words",
    params(("id" = Uuid, Path, description = "The word set.")),
    responses(
        (status = 200, description = "Words in order", body = [WordResponse]),
        (status = 404, description = "No such word set for this teacher")
    )
)]
pub async fn list_words_handler(
    State(state): State<Arc<AppState>>,
    Extension(TeacherId(teacher_id)): Extension<TeacherId>,
    Path(word_set_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let words = state
        .word_sets()
        .words(teacher_id, word_set_id)
        .await
        .map_err(exam_error_response)?;
    Ok(Json(
        words.into_iter().map(WordResponse::from).collect::<Vec<_>>(),
    ))
}

/// Append a word to the end of a word set.
#[utoipa::path(
    post,
    path = "/teacher/word-sets/{id}/words",
    request_body = AddWordRequest,
    params(("id" = Uuid, Path, description = "The word set.")),
    responses(
        (status = 201, description = "Word added", body = WordResponse),
        (status = 400, description = "Missing word or time limit out of range"),
        (status = 404, description = "No such word set for this teacher")
    )
)]
pub async fn add_word_handler(
    State(state): State<Arc<AppState>>,
    Extension(TeacherId(teacher_id)): Extension<TeacherId>,
    Path(word_set_id): Path<Uuid>,
    Json(req): Json<AddWordRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let word = state
        .word_sets()
        .add_word(
            teacher_id,
            word_set_id,
            &req.word_text,
            req.time_limit_seconds.unwrap_or(DEFAULT_TIME_LIMIT_SECONDS),
        )
        .await
        .map_err(exam_error_response)?;
    Ok((StatusCode::CREATED, Json(WordResponse::from(word))))
}

/// Remove a word. The remaining words close the gap in their order.
#[utoipa::path(
    delete,
    path = "/teacher/words/{id}",
    params(("id" = Uuid, Path, description = "The word to delete.")),
    responses(
        (status = 204, description = "Word deleted"),
        (status = 400, description = "The word has already been answered in an exam"),
        (status = 404, description = "No such word for this teacher")
    )
)]
pub async fn delete_word_handler(
    State(state): State<Arc<AppState>>,
    Extension(TeacherId(teacher_id)): Extension<TeacherId>,
    Path(word_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .word_sets()
        .delete_word(teacher_id, word_id)
        .await
        .map_err(exam_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}
