//! In-memory session store, used when no `DATABASE_URL` is configured and in tests.

use crate::domain::session::{Rotation, Session, SessionStore, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    sessions: HashMap<Uuid, Session>,
}

/// A `SessionStore` backed by two hash maps behind one lock.
#[derive(Default)]
pub struct MemorySessionStore {
    tables: RwLock<Tables>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, live or not.
    pub async fn session_count(&self) -> usize {
        self.tables.read().await.sessions.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> anyhow::Result<bool> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.email == user.email) {
            return Ok(false);
        }
        t.users.insert(user.id, user.clone());
        Ok(true)
    }

    async fn user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.email == email).cloned())
    }

    async fn user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn insert_session(&self, session: &Session) -> anyhow::Result<()> {
        let mut t = self.tables.write().await;
        t.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn session_by_access_hash(&self, access_hash: &str) -> anyhow::Result<Option<Session>> {
        let t = self.tables.read().await;
        Ok(t.sessions
            .values()
            .find(|s| s.access_hash == access_hash)
            .cloned())
    }

    async fn session_by_refresh_hash(&self, refresh_hash: &str) -> anyhow::Result<Option<Session>> {
        let t = self.tables.read().await;
        Ok(t.sessions
            .values()
            .find(|s| s.refresh_hash == refresh_hash)
            .cloned())
    }

    async fn session_by_previous_refresh_hash(
        &self,
        refresh_hash: &str,
    ) -> anyhow::Result<Option<Session>> {
        let t = self.tables.read().await;
        Ok(t.sessions
            .values()
            .find(|s| s.previous_refresh_hash.as_deref() == Some(refresh_hash))
            .cloned())
    }

    async fn rotate_session(
        &self,
        session_id: Uuid,
        expected_refresh_hash: &str,
        rotation: &Rotation,
    ) -> anyhow::Result<bool> {
        let mut t = self.tables.write().await;
        let Some(s) = t.sessions.get_mut(&session_id) else {
            return Ok(false);
        };
        if s.revoked_at.is_some() || s.refresh_hash != expected_refresh_hash {
            return Ok(false);
        }
        s.previous_refresh_hash = Some(std::mem::replace(
            &mut s.refresh_hash,
            rotation.refresh_hash.clone(),
        ));
        s.access_hash = rotation.access_hash.clone();
        s.access_expires_at = rotation.access_expires_at;
        s.refresh_expires_at = rotation.refresh_expires_at;
        s.last_refreshed_at = Some(rotation.refreshed_at);
        Ok(true)
    }

    async fn revoke_session(&self, session_id: Uuid, at: DateTime<Utc>) -> anyhow::Result<()> {
        let mut t = self.tables.write().await;
        if let Some(s) = t.sessions.get_mut(&session_id) {
            s.revoked_at.get_or_insert(at);
        }
        Ok(())
    }

    async fn revoke_user_sessions(&self, user_id: Uuid, at: DateTime<Utc>) -> anyhow::Result<u64> {
        let mut t = self.tables.write().await;
        let mut revoked = 0;
        for s in t.sessions.values_mut() {
            if s.user_id == user_id && s.revoked_at.is_none() {
                if s.is_live(at) {
                    revoked += 1;
                }
                s.revoked_at = Some(at);
            }
        }
        Ok(revoked)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let mut t = self.tables.write().await;
        let before = t.sessions.len();
        t.sessions.retain(|_, s| s.is_live(now));
        Ok((before - t.sessions.len()) as u64)
    }
}
