use axum::{extract::State, response::IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;

use crate::error::Result;
use crate::models::CsrfTokenResponse;
use crate::session::{random_token, Session, CSRF_TOKEN_KEY};
use crate::AppState;

/// Issue a CSRF token bound to the caller's session
/// GET /api/csrf-token
pub async fn csrf_token(
    State(state): State<AppState>,
    jar: CookieJar,
    mut session: Session,
) -> Result<impl IntoResponse> {
    let (session_id, is_new) = session.ensure_id();
    let token = random_token();
    session.set(CSRF_TOKEN_KEY, token.clone()).await?;

    let jar = if is_new {
        tracing::debug!("Started new session");
        jar.add(Session::cookie(session_id, state.config.session.cookie_secure))
    } else {
        jar
    };

    Ok((
        jar,
        Json(CsrfTokenResponse {
            csrf_token: token,
            message: "CSRF token generated successfully".to_string(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use crate::services::archive::tests::build_zip;
    use crate::tests::{read_json, test_state};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn csrf_state() -> crate::AppState {
        let mut state = test_state();
        let mut config = (*state.config).clone();
        config.session.csrf_enabled = true;
        state.config = Arc::new(config);
        state
    }

    fn upload(cookie: Option<&str>, token: Option<&str>) -> Request<Body> {
        let zip = build_zip(&[("index.html", b"<html></html>")]);
        let mut body = b"--b\r\nContent-Disposition: form-data; name=\"zipFile\"; filename=\"s.zip\"\r\nContent-Type: application/zip\r\n\r\n".to_vec();
        body.extend_from_slice(&zip);
        body.extend_from_slice(b"\r\n--b--\r\n");

        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=b");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        if let Some(token) = token {
            builder = builder.header("x-csrf-token", token);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn test_csrf_round_trip() {
        let app = crate::create_router(csrf_state());

        let resp = app
            .clone()
            .oneshot(Request::get("/api/csrf-token").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let set_cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.contains("HttpOnly"));
        let cookie = set_cookie.split(';').next().unwrap().to_string();
        let token = read_json(resp).await["csrfToken"].as_str().unwrap().to_string();
        assert_eq!(token.len(), 64);

        let resp = app.clone().oneshot(upload(Some(&cookie), Some(&token))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app.clone().oneshot(upload(Some(&cookie), Some("wrong"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = app.clone().oneshot(upload(None, Some(&token))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(read_json(resp).await["error"], "Invalid CSRF token");
    }

    #[tokio::test]
    async fn test_existing_session_keeps_cookie() {
        let app = crate::create_router(csrf_state());
        let first = app
            .clone()
            .oneshot(Request::get("/api/csrf-token").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie = first.headers()[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();

        let second = app
            .oneshot(
                Request::get("/api/csrf-token")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        assert!(second.headers().get(header::SET_COOKIE).is_none());
    }
}
