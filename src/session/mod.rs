//! Request-scoped session context.
//!
//! Handlers never touch global state: the `Session` extractor resolves the
//! session id from the cookie and carries a handle to the injected store.

pub mod store;

pub use store::*;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::AppState;

pub const SESSION_COOKIE: &str = "zd_session";
pub const CSRF_TOKEN_KEY: &str = "csrf_token";

/// 32 random bytes, hex encoded
pub fn random_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub struct Session {
    id: Option<String>,
    store: Arc<dyn SessionStore>,
}

impl Session {
    pub fn new(id: Option<String>, store: Arc<dyn SessionStore>) -> Self {
        Self { id, store }
    }

    /// Return the current session id, starting a new session if there is none.
    /// The bool is true when the caller must send the cookie.
    pub fn ensure_id(&mut self) -> (String, bool) {
        match &self.id {
            Some(id) => (id.clone(), false),
            None => {
                let id = random_token();
                self.id = Some(id.clone());
                (id, true)
            }
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        match &self.id {
            Some(id) => self.store.get(id, key).await,
            None => Ok(None),
        }
    }

    pub async fn set(&mut self, key: &str, value: String) -> Result<()> {
        let (id, _) = self.ensure_id();
        self.store.set(&id, key, value).await
    }

    pub fn cookie(id: String, secure: bool) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, id))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure)
            .path("/")
            .build()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let jar = CookieJar::from_headers(&parts.headers);
        let id = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty());
        Ok(Session::new(id, state.sessions.clone()))
    }
}

/// Compare without short-circuiting on the first differing byte
pub fn tokens_match(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_random_token_shape() {
        let token = random_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, random_token());
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("abc", "abc"));
        assert!(!tokens_match("abc", "abd"));
        assert!(!tokens_match("abc", "abcd"));
    }

    #[tokio::test]
    async fn test_set_starts_session() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(Duration::hours(1)));
        let mut session = Session::new(None, store.clone());
        assert_eq!(session.get(CSRF_TOKEN_KEY).await.unwrap(), None);

        session.set(CSRF_TOKEN_KEY, "t".into()).await.unwrap();
        let (id, is_new) = session.ensure_id();
        assert!(!is_new);
        assert_eq!(store.get(&id, CSRF_TOKEN_KEY).await.unwrap().as_deref(), Some("t"));
    }
}
