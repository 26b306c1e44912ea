use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// A registered account.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    /// Trimmed and lowercased; unique across users.
    pub email: String,
    pub name: Option<String>,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
        }
    }
}

/// Public view of a user (never carries the password hash).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A login session. Only digests of the tokens are kept.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub access_hash: String,
    pub refresh_hash: String,
    /// Digest of the refresh token this session rotated away from, kept for reuse detection.
    pub previous_refresh_hash: Option<String>,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Not revoked and the refresh token has not expired.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.refresh_expires_at > now
    }

    /// Live and the access token has not expired.
    pub fn access_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_live(now) && self.access_expires_at > now
    }
}

/// New token digests and expiries applied by a refresh.
#[derive(Debug, Clone)]
pub struct Rotation {
    pub access_hash: String,
    pub refresh_hash: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub refreshed_at: DateTime<Utc>,
}

/// Plaintext tokens handed to the caller once, on login, register or refresh.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IssuedSession {
    pub session_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(now: DateTime<Utc>) -> Session {
        Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            access_hash: "a".into(),
            refresh_hash: "r".into(),
            previous_refresh_hash: None,
            access_expires_at: now + Duration::minutes(15),
            refresh_expires_at: now + Duration::days(30),
            created_at: now,
            last_refreshed_at: None,
            revoked_at: None,
        }
    }

    #[test]
    fn expired_access_keeps_session_live() {
        let now = Utc::now();
        let mut s = session(now);
        s.access_expires_at = now - Duration::seconds(1);
        assert!(s.is_live(now));
        assert!(!s.access_valid(now));
    }

    #[test]
    fn revoked_session_is_dead() {
        let now = Utc::now();
        let mut s = session(now);
        s.revoked_at = Some(now);
        assert!(!s.is_live(now));
        assert!(!s.access_valid(now));
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let now = Utc::now();
        let mut s = session(now);
        s.refresh_expires_at = now;
        assert!(!s.is_live(now));
    }
}
