pub mod auth;
pub mod dashboard;
pub mod grading;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

#[cfg(test)]
pub(crate) mod test_support;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

pub use dashboard::dashboard_ws_handler;
pub use middleware::require_auth;
pub use state::AppState;
pub use ws_handler::exam_ws_handler;

/// Builds every API route. CORS and the Swagger UI are layered on by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/word-sets", get(rest::available_word_sets_handler))
        .route("/exam/ws", get(exam_ws_handler));

    // Teacher routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route(
            "/teacher/word-sets",
            get(rest::list_word_sets_handler).post(rest::create_word_set_handler),
        )
        .route(
            "/teacher/word-sets/{id}",
            put(rest::update_word_set_handler).delete(rest::delete_word_set_handler),
        )
        .route(
            "/teacher/word-sets/{id}/words",
            get(rest::list_words_handler).post(rest::add_word_handler),
        )
        .route("/teacher/words/{id}", delete(rest::delete_word_handler))
        .route("/teacher/exams", get(grading::list_exams_handler))
        .route("/teacher/exams/{id}/answers", get(grading::exam_answers_handler))
        .route("/teacher/answers/{id}/grade", post(grading::grade_answer_handler))
        .route("/teacher/stats", get(grading::stats_handler))
        .route("/teacher/ws", get(dashboard_ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
