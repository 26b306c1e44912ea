//! Session domain: users, sessions, and the storage contract the service is written against.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod model;

pub use model::{IssuedSession, Rotation, Session, User, UserProfile};

/// Storage contract for users and sessions.
///
/// Implementations must make `rotate_session` atomic: it only applies when the stored
/// refresh digest still equals `expected_refresh_hash` and the session is not revoked.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Cheap connectivity check for `/health`.
    async fn ping(&self) -> anyhow::Result<()>;

    /// Inserts a user. Returns `false` if the email is already taken.
    async fn insert_user(&self, user: &User) -> anyhow::Result<bool>;

    async fn user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    async fn user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    async fn insert_session(&self, session: &Session) -> anyhow::Result<()>;

    async fn session_by_access_hash(&self, access_hash: &str) -> anyhow::Result<Option<Session>>;

    /// Looks up by the *current* refresh digest.
    async fn session_by_refresh_hash(&self, refresh_hash: &str) -> anyhow::Result<Option<Session>>;

    /// Looks up by the refresh digest a session has already rotated away from.
    async fn session_by_previous_refresh_hash(
        &self,
        refresh_hash: &str,
    ) -> anyhow::Result<Option<Session>>;

    /// Compare-and-swap rotation. Returns `false` if another refresh won the race.
    async fn rotate_session(
        &self,
        session_id: Uuid,
        expected_refresh_hash: &str,
        rotation: &Rotation,
    ) -> anyhow::Result<bool>;

    async fn revoke_session(&self, session_id: Uuid, at: DateTime<Utc>) -> anyhow::Result<()>;

    /// Revokes every unrevoked session of a user; returns how many of them were still live.
    async fn revoke_user_sessions(&self, user_id: Uuid, at: DateTime<Utc>) -> anyhow::Result<u64>;

    /// Deletes sessions that are revoked or whose refresh token expired before `now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> anyhow::Result<u64>;
}
