use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::Result;

/// Key/value storage scoped by session id
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>>;

    async fn set(&self, session_id: &str, key: &str, value: String) -> Result<()>;

    async fn delete(&self, session_id: &str, key: &str) -> Result<()>;

    /// Drop sessions idle for longer than the TTL
    async fn purge_expired(&self) -> Result<usize>;
}

struct SessionData {
    values: HashMap<String, String>,
    touched_at: DateTime<Utc>,
}

/// In-process session store with idle expiry
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionData>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .filter(|s| s.touched_at + self.ttl > Utc::now())
            .and_then(|s| s.values.get(key).cloned()))
    }

    async fn set(&self, session_id: &str, key: &str, value: String) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionData {
                values: HashMap::new(),
                touched_at: Utc::now(),
            });
        session.values.insert(key.to_string(), value);
        session.touched_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, session_id: &str, key: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(session_id) {
            session.values.remove(key);
            if session.values.is_empty() {
                sessions.remove(session_id);
            }
        }
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let now = Utc::now();
        sessions.retain(|_, s| s.touched_at + self.ttl > now);
        Ok(before - sessions.len())
    }
}
