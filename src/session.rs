//! In-memory store for generated itineraries, keyed by thread id.
//!
//! A session lives until it is emailed or until the periodic sweep in
//! `main` finds it older than the retention window.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct TravelSession {
    pub query: String,
    pub metadata: Value,
    pub travel_info: String,
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
}

impl TravelSession {
    pub fn new(user_id: Uuid, query: String, metadata: Value, travel_info: String) -> Self {
        Self {
            query,
            metadata,
            travel_info,
            created_at: Utc::now(),
            user_id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, TravelSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, thread_id: Uuid, session: TravelSession) {
        self.sessions.write().await.insert(thread_id, session);
        debug!("Stored session {}", thread_id);
    }

    pub async fn get(&self, thread_id: &Uuid) -> Option<TravelSession> {
        self.sessions.read().await.get(thread_id).cloned()
    }

    pub async fn remove(&self, thread_id: &Uuid) -> bool {
        let removed = self.sessions.write().await.remove(thread_id).is_some();
        if removed {
            debug!("Removed session {}", thread_id);
        }
        removed
    }

    /// Drops sessions created strictly before `now - max_age` and returns
    /// how many were dropped.
    pub async fn purge_older_than(&self, max_age: Duration, now: DateTime<Utc>) -> usize {
        let cutoff = now - max_age;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.created_at >= cutoff);
        let purged = before - sessions.len();
        if purged > 0 {
            info!("Purged {} expired sessions, {} remain", purged, sessions.len());
        }
        purged
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
