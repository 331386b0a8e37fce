//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for teacher signup, login, logout and the current
//! session lookup. Students never authenticate.

use crate::web::middleware::{session_cookie, TeacherId, SESSION_COOKIE};
use crate::web::state::AppState;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;
use vocab_exam_core::ports::PortError;

const MIN_PASSWORD_LENGTH: usize = 6;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub teacher_id: Uuid,
    pub email: String,
    pub full_name: String,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn validate_signup(req: &SignupRequest) -> Result<(String, String), (StatusCode, String)> {
    let email = req.email.trim().to_lowercase();
    if !EMAIL_PATTERN.is_match(&email) {
        return Err((StatusCode::BAD_REQUEST, "Please enter a valid email".to_string()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
        ));
    }
    let full_name = req.full_name.trim();
    if full_name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Please enter your full name".to_string()));
    }
    Ok((email, full_name.to_string()))
}

/// Creates an auth session for the teacher and returns the `Set-Cookie` value.
async fn open_auth_session(
    state: &AppState,
    teacher_id: Uuid,
) -> Result<String, (StatusCode, String)> {
    let auth_session_id = Uuid::new_v4().to_string();
    let lifetime = Duration::days(state.config.auth_session_days);

    state
        .db
        .create_auth_session(&auth_session_id, teacher_id, Utc::now() + lifetime)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session".to_string())
        })?;

    Ok(format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        auth_session_id,
        lifetime.num_seconds()
    ))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new teacher account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Teacher created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let (email, full_name) = validate_signup(&req)?;

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password".to_string())
        })?
        .to_string();

    let teacher = state
        .db
        .create_teacher(&email, &full_name, &password_hash)
        .await
        .map_err(|e| match e {
            PortError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            e => {
                error!("Failed to create teacher: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create account".to_string())
            }
        })?;
    info!("Teacher {} signed up", teacher.id);

    let cookie = open_auth_session(&state, teacher.id).await?;
    let response = AuthResponse {
        teacher_id: teacher.id,
        email: teacher.email,
        full_name: teacher.full_name,
    };

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(response),
    ))
}

/// POST /auth/login - Login with an existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let invalid = || (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string());

    let email = req.email.trim().to_lowercase();
    let creds = state
        .db
        .get_teacher_credentials_by_email(&email)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => invalid(),
            e => {
                error!("Failed to look up teacher: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
            }
        })?;

    let parsed_hash = PasswordHash::new(&creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
    })?;
    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(invalid());
    }

    let teacher = state.db.get_teacher_by_id(creds.teacher_id).await.map_err(|e| {
        error!("Failed to load teacher {}: {:?}", creds.teacher_id, e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
    })?;
    let cookie = open_auth_session(&state, teacher.id).await?;
    info!("Teacher {} logged in", teacher.id);

    let response = AuthResponse {
        teacher_id: teacher.id,
        email: teacher.email,
        full_name: teacher.full_name,
    };

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /auth/logout - Logout and invalidate the session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let auth_session_id = session_cookie(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    state
        .db
        .delete_auth_session(&auth_session_id)
        .await
        .map_err(|e| {
            error!("Failed to delete auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to logout".to_string())
        })?;

    let cookie = format!(
        "{}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0",
        SESSION_COOKIE
    );
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]))
}

/// GET /auth/me - The teacher behind the current session
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current teacher", body = AuthResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(TeacherId(teacher_id)): Extension<TeacherId>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let teacher = state.db.get_teacher_by_id(teacher_id).await.map_err(|e| match e {
        PortError::NotFound(_) => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        e => {
            error!("Failed to load teacher {}: {:?}", teacher_id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load account".to_string())
        }
    })?;

    Ok(Json(AuthResponse {
        teacher_id: teacher.id,
        email: teacher.email,
        full_name: teacher.full_name,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::test_support::{self, setup_test_context};
    use axum::http::Method;
    use serde_json::json;
    use tower::ServiceExt;

    fn session_from(response: &axum::response::Response) -> String {
        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .expect("session cookie")
            .to_string()
    }

    fn signup(email: &str, password: &str, full_name: &str) -> SignupRequest {
        SignupRequest {
            email: email.to_string(),
            password: password.to_string(),
            full_name: full_name.to_string(),
        }
    }

    #[test]
    fn signup_normalizes_email_and_name() {
        let (email, name) =
            validate_signup(&signup("  Ms.T@School.EDU ", "secret1", "  Ms. T ")).unwrap();
        assert_eq!(email, "ms.t@school.edu");
        assert_eq!(name, "Ms. T");
    }

    #[test]
    fn signup_rejects_bad_input() {
        let status = |req: SignupRequest| validate_signup(&req).unwrap_err().0;
        assert_eq!(status(signup("not-an-email", "secret1", "T")), StatusCode::BAD_REQUEST);
        assert_eq!(status(signup("t@school.edu", "short", "T")), StatusCode::BAD_REQUEST);
        assert_eq!(status(signup("t@school.edu", "secret1", "   ")), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn signup_login_me_and_logout() {
        let ctx = setup_test_context();

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/auth/signup",
                None,
                Some(json!({
                    "email": "rivera@school.edu",
                    "password": "secret1",
                    "full_name": "Ms. Rivera"
                })),
            ))
            .await
            .expect("signup");
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": "rivera@school.edu", "password": "wrong-password" })),
            ))
            .await
            .expect("login");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": "Rivera@School.edu", "password": "secret1" })),
            ))
            .await
            .expect("login");
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_from(&response);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::GET, "/auth/me", Some(&cookie), None))
            .await
            .expect("me");
        let status = response.status();
        let me = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {me}");
        assert_eq!(me["full_name"], "Ms. Rivera");

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/auth/logout",
                Some(&cookie),
                None,
            ))
            .await
            .expect("logout");
        assert_eq!(response.status(), StatusCode::OK);

        let response = ctx
            .app
            .oneshot(test_support::json_request(Method::GET, "/auth/me", Some(&cookie), None))
            .await
            .expect("me");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn duplicate_signup_conflicts() {
        let ctx = setup_test_context();
        let body = json!({
            "email": "rivera@school.edu",
            "password": "secret1",
            "full_name": "Ms. Rivera"
        });

        let first = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/auth/signup",
                None,
                Some(body.clone()),
            ))
            .await
            .expect("signup");
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = ctx
            .app
            .oneshot(test_support::json_request(Method::POST, "/auth/signup", None, Some(body)))
            .await
            .expect("signup");
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }
}
