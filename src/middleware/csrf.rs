use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::error::AppError;
use crate::session::{tokens_match, Session, CSRF_TOKEN_KEY, SESSION_COOKIE};
use crate::AppState;

pub const CSRF_HEADER: &str = "x-csrf-token";

/// CSRF middleware.
/// State-changing requests must echo the session's token in `X-CSRF-Token`.
pub async fn csrf_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.config.session.csrf_enabled
        || matches!(*request.method(), Method::GET | Method::HEAD | Method::OPTIONS)
    {
        return Ok(next.run(request).await);
    }

    let session_id = CookieJar::from_headers(request.headers())
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string());
    let session = Session::new(session_id, state.sessions.clone());

    let expected = session.get(CSRF_TOKEN_KEY).await?;
    let presented = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|h| h.to_str().ok());

    match (expected, presented) {
        (Some(expected), Some(presented)) if tokens_match(&expected, presented) => {
            Ok(next.run(request).await)
        }
        _ => {
            tracing::debug!("Rejected {} {} with missing or stale CSRF token", request.method(), request.uri());
            Err(AppError::Forbidden("Invalid CSRF token".to_string()))
        }
    }
}
