//! The session service.
//!
//! Sits between the HTTP handlers and the `SessionStore`. It is responsible for:
//! 1.  Creating accounts and verifying passwords.
//! 2.  Issuing sessions (opaque access + refresh tokens, only digests persisted).
//! 3.  Authenticating access tokens.
//! 4.  Refreshing sessions with token rotation and refresh-token reuse detection.
//! 5.  Revoking sessions on logout.

use crate::crypto::hashing::{hash_password, hash_token, new_token, verify_password, TokenKind};
use crate::domain::error::{AppError, AppResult};
use crate::domain::session::{IssuedSession, Rotation, Session, SessionStore, User};
use crate::domain::validation::{normalize_email, validate_login, validate_registration};
use crate::infra::config::MAX_DURATION_SECS;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const INVALID_CREDENTIALS: &str = "invalid email or password";
const INVALID_SESSION: &str = "session expired or invalid";

/// Token lifetimes.
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

/// Whole seconds as a `Duration`, capped at `MAX_DURATION_SECS`.
fn capped_seconds(secs: u64) -> Duration {
    let secs = secs.min(MAX_DURATION_SECS) as i64;
    Duration::try_seconds(secs).unwrap_or(Duration::MAX)
}

impl SessionPolicy {
    /// Lifetimes beyond `MAX_DURATION_SECS` are capped; `ServerConfig` rejects them before this.
    pub fn from_secs(access_ttl_secs: u64, refresh_ttl_secs: u64) -> Self {
        Self {
            access_ttl: capped_seconds(access_ttl_secs),
            refresh_ttl: capped_seconds(refresh_ttl_secs),
        }
    }
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> AppResult<DateTime<Utc>> {
    now.checked_add_signed(ttl)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("token lifetime {} overflows", ttl)))
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self::from_secs(
            crate::infra::config::DEFAULT_ACCESS_TOKEN_TTL_SECS,
            crate::infra::config::DEFAULT_REFRESH_TOKEN_TTL_SECS,
        )
    }
}

/// A request that passed authentication.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: User,
    pub session: Session,
}

pub struct SessionService {
    store: Arc<dyn SessionStore>,
    policy: SessionPolicy,
}

/// Plaintext tokens plus the digests/expiries that go to the store.
struct Minted {
    issued: IssuedSession,
    access_hash: String,
    refresh_hash: String,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>, policy: SessionPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    fn mint(&self, session_id: Uuid, now: DateTime<Utc>) -> AppResult<Minted> {
        let access_expires_at = expiry(now, self.policy.access_ttl)?;
        let refresh_expires_at = expiry(now, self.policy.refresh_ttl)?;
        let access_token = new_token(TokenKind::Access);
        let refresh_token = new_token(TokenKind::Refresh);
        Ok(Minted {
            access_hash: hash_token(TokenKind::Access, &access_token),
            refresh_hash: hash_token(TokenKind::Refresh, &refresh_token),
            issued: IssuedSession {
                session_id,
                access_token,
                refresh_token,
                access_expires_at,
                refresh_expires_at,
            },
        })
    }

    async fn start_session(&self, user: &User) -> AppResult<IssuedSession> {
        let now = Utc::now();
        let minted = self.mint(Uuid::new_v4(), now)?;
        let session = Session {
            id: minted.issued.session_id,
            user_id: user.id,
            access_hash: minted.access_hash,
            refresh_hash: minted.refresh_hash,
            previous_refresh_hash: None,
            access_expires_at: minted.issued.access_expires_at,
            refresh_expires_at: minted.issued.refresh_expires_at,
            created_at: now,
            last_refreshed_at: None,
            revoked_at: None,
        };
        self.store.insert_session(&session).await?;
        info!(user_id = %user.id, session_id = %session.id, "session started");
        Ok(minted.issued)
    }

    /// Creates an account and signs it in.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> AppResult<(User, IssuedSession)> {
        let email = normalize_email(email);
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        validate_registration(&email, password, name)?;

        let user = User {
            id: Uuid::new_v4(),
            email,
            name: name.map(str::to_string),
            password_hash: hash_password(password)?,
            created_at: Utc::now(),
        };
        if !self.store.insert_user(&user).await? {
            return Err(AppError::Conflict(format!(
                "an account with email '{}' already exists",
                user.email
            )));
        }
        info!(user_id = %user.id, "user registered");

        let issued = self.start_session(&user).await?;
        Ok((user, issued))
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<(User, IssuedSession)> {
        let email = normalize_email(email);
        validate_login(&email, password)?;

        let Some(user) = self.store.user_by_email(&email).await? else {
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        };
        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "login rejected: wrong password");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }

        let issued = self.start_session(&user).await?;
        Ok((user, issued))
    }

    /// Resolves an access token to its user and session.
    pub async fn authenticate(&self, access_token: &str) -> AppResult<Authenticated> {
        let digest = hash_token(TokenKind::Access, access_token);
        let now = Utc::now();
        let session = match self.store.session_by_access_hash(&digest).await? {
            Some(s) if s.access_valid(now) => s,
            _ => return Err(AppError::unauthorized(INVALID_SESSION)),
        };
        let user = self
            .store
            .user_by_id(session.user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized(INVALID_SESSION))?;
        Ok(Authenticated { user, session })
    }

    /// Exchanges a refresh token for a new token pair.
    ///
    /// The presented token is single-use. Presenting a token the session already rotated away
    /// from revokes the whole session.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<(User, IssuedSession)> {
        let digest = hash_token(TokenKind::Refresh, refresh_token);
        let now = Utc::now();

        let session = match self.store.session_by_refresh_hash(&digest).await? {
            Some(s) if s.is_live(now) => s,
            Some(_) => return Err(AppError::unauthorized(INVALID_SESSION)),
            None => {
                if let Some(reused) = self.store.session_by_previous_refresh_hash(&digest).await? {
                    if reused.is_live(now) {
                        warn!(
                            session_id = %reused.id,
                            user_id = %reused.user_id,
                            "rotated refresh token presented again; revoking session"
                        );
                        self.store.revoke_session(reused.id, now).await?;
                    }
                }
                return Err(AppError::unauthorized(INVALID_SESSION));
            }
        };

        let user = self
            .store
            .user_by_id(session.user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized(INVALID_SESSION))?;

        let minted = self.mint(session.id, now)?;
        let rotation = Rotation {
            access_hash: minted.access_hash,
            refresh_hash: minted.refresh_hash,
            access_expires_at: minted.issued.access_expires_at,
            refresh_expires_at: minted.issued.refresh_expires_at,
            refreshed_at: now,
        };
        if !self
            .store
            .rotate_session(session.id, &digest, &rotation)
            .await?
        {
            warn!(session_id = %session.id, "refresh lost a concurrent rotation");
            return Err(AppError::unauthorized(INVALID_SESSION));
        }

        info!(user_id = %user.id, session_id = %session.id, "session refreshed");
        Ok((user, minted.issued))
    }

    pub async fn logout(&self, session_id: Uuid) -> AppResult<()> {
        self.store.revoke_session(session_id, Utc::now()).await?;
        info!(session_id = %session_id, "session revoked");
        Ok(())
    }

    /// Revokes every session of `user_id`; returns how many were live.
    pub async fn logout_all(&self, user_id: Uuid) -> AppResult<u64> {
        let revoked = self.store.revoke_user_sessions(user_id, Utc::now()).await?;
        info!(user_id = %user_id, revoked, "all sessions revoked");
        Ok(revoked)
    }
}
