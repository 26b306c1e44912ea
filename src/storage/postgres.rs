//! Persistent session store implementation using PostgreSQL.

use crate::domain::session::{Rotation, Session, SessionStore, User};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

const SESSION_COLUMNS: &str = "id, user_id, access_hash, refresh_hash, previous_refresh_hash, \
     access_expires_at, refresh_expires_at, created_at, last_refreshed_at, revoked_at";

/// A `SessionStore` that uses a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    /// Connects and makes sure the `users` and `sessions` tables exist.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                name TEXT,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                access_hash TEXT NOT NULL UNIQUE,
                refresh_hash TEXT NOT NULL UNIQUE,
                previous_refresh_hash TEXT,
                access_expires_at TIMESTAMPTZ NOT NULL,
                refresh_expires_at TIMESTAMPTZ NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                last_refreshed_at TIMESTAMPTZ,
                revoked_at TIMESTAMPTZ
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS sessions_previous_refresh_hash_idx
             ON sessions (previous_refresh_hash)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS sessions_user_id_idx ON sessions (user_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn session_where(&self, column: &str, value: &str) -> Result<Option<Session>> {
        let sql = format!(
            "SELECT {} FROM sessions WHERE {} = $1",
            SESSION_COLUMNS, column
        );
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| session_from_row(&r)).transpose()
    }
}

fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
    })
}

fn session_from_row(row: &PgRow) -> Result<Session> {
    Ok(Session {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        access_hash: row.try_get("access_hash")?,
        refresh_hash: row.try_get("refresh_hash")?,
        previous_refresh_hash: row.try_get("previous_refresh_hash")?,
        access_expires_at: row.try_get("access_expires_at")?,
        refresh_expires_at: row.try_get("refresh_expires_at")?,
        created_at: row.try_get("created_at")?,
        last_refreshed_at: row.try_get("last_refreshed_at")?,
        revoked_at: row.try_get("revoked_at")?,
    })
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO users (id, email, name, password_hash, created_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (email) DO NOTHING",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, name, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| user_from_row(&r)).transpose()
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, name, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| user_from_row(&r)).transpose()
    }

    async fn insert_session(&self, session: &Session) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, access_hash, refresh_hash, previous_refresh_hash,
                access_expires_at, refresh_expires_at, created_at, last_refreshed_at, revoked_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.access_hash)
        .bind(&session.refresh_hash)
        .bind(&session.previous_refresh_hash)
        .bind(session.access_expires_at)
        .bind(session.refresh_expires_at)
        .bind(session.created_at)
        .bind(session.last_refreshed_at)
        .bind(session.revoked_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn session_by_access_hash(&self, access_hash: &str) -> Result<Option<Session>> {
        self.session_where("access_hash", access_hash).await
    }

    async fn session_by_refresh_hash(&self, refresh_hash: &str) -> Result<Option<Session>> {
        self.session_where("refresh_hash", refresh_hash).await
    }

    async fn session_by_previous_refresh_hash(&self, refresh_hash: &str) -> Result<Option<Session>> {
        self.session_where("previous_refresh_hash", refresh_hash).await
    }

    async fn rotate_session(
        &self,
        session_id: Uuid,
        expected_refresh_hash: &str,
        rotation: &Rotation,
    ) -> Result<bool> {
        // The WHERE clause is the compare-and-swap: only one concurrent refresh can match.
        let result = sqlx::query(
            "UPDATE sessions SET
                previous_refresh_hash = refresh_hash,
                refresh_hash = $3,
                access_hash = $4,
                access_expires_at = $5,
                refresh_expires_at = $6,
                last_refreshed_at = $7
             WHERE id = $1 AND refresh_hash = $2 AND revoked_at IS NULL",
        )
        .bind(session_id)
        .bind(expected_refresh_hash)
        .bind(&rotation.refresh_hash)
        .bind(&rotation.access_hash)
        .bind(rotation.access_expires_at)
        .bind(rotation.refresh_expires_at)
        .bind(rotation.refreshed_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn revoke_session(&self, session_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE sessions SET revoked_at = $2 WHERE id = $1 AND revoked_at IS NULL")
            .bind(session_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_user_sessions(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<u64> {
        // Expired-but-unrevoked rows are closed too; only the live ones are counted.
        let live: i64 = sqlx::query_scalar(
            "WITH revoked AS ( \
                UPDATE sessions SET revoked_at = $2 \
                WHERE user_id = $1 AND revoked_at IS NULL \
                RETURNING refresh_expires_at \
             ) \
             SELECT COUNT(*) FROM revoked WHERE refresh_expires_at > $2",
        )
        .bind(user_id)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;
        Ok(live.max(0) as u64)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM sessions WHERE revoked_at IS NOT NULL OR refresh_expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
