//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting teacher routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::web::state::AppState;

/// The name of the cookie carrying the auth session id.
pub const SESSION_COOKIE: &str = "session";

/// The authenticated teacher, inserted into request extensions by `require_auth`.
#[derive(Clone, Copy, Debug)]
pub struct TeacherId(pub Uuid);

/// Reads the auth session id out of the `Cookie` header, if present.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| {
            c.trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Middleware that validates the auth session cookie and extracts the teacher id.
///
/// If valid, inserts a `TeacherId` and the raw session id into request extensions.
/// If invalid, expired or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_session_id = session_cookie(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    let teacher_id = state
        .db
        .validate_auth_session(&auth_session_id)
        .await
        .map_err(|e| {
            warn!("Rejected auth session: {}", e);
            StatusCode::UNAUTHORIZED
        })?;

    req.extensions_mut().insert(TeacherId(teacher_id));
    req.extensions_mut().insert(AuthSession(auth_session_id));

    Ok(next.run(req).await)
}

/// The validated auth session id, for handlers that must re-check it later.
#[derive(Clone, Debug)]
pub struct AuthSession(pub String);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn finds_the_session_among_other_cookies() {
        assert_eq!(
            session_cookie(&headers("theme=dark; session=abc123; lang=en")),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn ignores_similarly_named_and_empty_cookies() {
        assert_eq!(session_cookie(&headers("sessionid=zzz")), None);
        assert_eq!(session_cookie(&headers("session=")), None);
        assert_eq!(session_cookie(&HeaderMap::new()), None);
    }
}
