//! Server-side session storage
//!
//! The browser only holds an opaque session id cookie; the [`SessionData`]
//! document lives in Redis (or in memory for tests) and expires with the
//! session lifetime.

use async_trait::async_trait;
use rand::{Rng, distributions::Alphanumeric};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::info;

use common::{
    cache::RedisPool,
    error::{DatabaseError, DatabaseResult},
};

use crate::models::SessionData;

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "folio_session";

const SESSION_ID_LEN: usize = 32;

/// Generate a fresh random session id
pub fn new_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}

/// Whether `raw` has the shape of an id produced by [`new_session_id`]
pub fn is_valid_session_id(raw: &str) -> bool {
    raw.len() == SESSION_ID_LEN && raw.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Session documents keyed by session id
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session; an unknown id yields an empty document
    async fn load(&self, id: &str) -> DatabaseResult<SessionData>;

    /// Persist a session; saving an empty document removes it
    async fn save(&self, id: &str, data: &SessionData) -> DatabaseResult<()>;

    /// Forget everything about a session
    async fn clear(&self, id: &str) -> DatabaseResult<()>;
}

/// Sessions in Redis, one JSON document per session
#[derive(Clone)]
pub struct RedisSessionStore {
    redis: RedisPool,
    ttl_seconds: u64,
}

impl RedisSessionStore {
    pub fn new(redis: RedisPool, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds }
    }

    fn key(id: &str) -> String {
        format!("session:{}", id)
    }
}

fn cache_error(e: impl std::fmt::Display) -> DatabaseError {
    DatabaseError::Cache(e.to_string())
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, id: &str) -> DatabaseResult<SessionData> {
        let raw = self.redis.get(&Self::key(id)).await.map_err(cache_error)?;
        match raw {
            Some(json) => serde_json::from_str(&json).map_err(cache_error),
            None => Ok(SessionData::default()),
        }
    }

    async fn save(&self, id: &str, data: &SessionData) -> DatabaseResult<()> {
        if data.is_empty() {
            return self.clear(id).await;
        }

        let json = serde_json::to_string(data).map_err(cache_error)?;
        self.redis
            .set(&Self::key(id), &json, Some(self.ttl_seconds))
            .await
            .map_err(cache_error)
    }

    async fn clear(&self, id: &str) -> DatabaseResult<()> {
        info!("Clearing session");
        self.redis
            .delete(&Self::key(id))
            .await
            .map(|_| ())
            .map_err(cache_error)
    }
}

/// Sessions held in process memory
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> DatabaseResult<SessionData> {
        Ok(self
            .sessions
            .read()
            .await
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, id: &str, data: &SessionData) -> DatabaseResult<()> {
        let mut sessions = self.sessions.write().await;
        if data.is_empty() {
            sessions.remove(id);
        } else {
            sessions.insert(id.to_string(), data.clone());
        }
        Ok(())
    }

    async fn clear(&self, id: &str) -> DatabaseResult<()> {
        self.sessions.write().await.remove(id);
        Ok(())
    }
}
