//! Centralized configuration (environment variables + defaults).

use anyhow::Context;
use std::str::FromStr;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 15 * 60;
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: u64 = 30 * 24 * 60 * 60;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5 * 60;
/// Upper bound for every duration setting (ten years).
pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Reads `name`, falling back to `default` when unset. A set-but-unparseable value is an error.
fn env_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

/// Rejects durations outside `1..=MAX_DURATION_SECS`.
fn check_secs(name: &str, value: u64) -> anyhow::Result<u64> {
    if value == 0 {
        anyhow::bail!("{} must be at least 1 second", name);
    }
    if value > MAX_DURATION_SECS {
        anyhow::bail!(
            "{} is {} seconds; the maximum is {} (ten years)",
            name,
            value,
            MAX_DURATION_SECS
        );
    }
    Ok(value)
}

/// A duration in whole seconds from `name`, `default` when unset.
fn env_secs(name: &str, default: u64) -> anyhow::Result<u64> {
    check_secs(name, env_or(name, default)?)
}

/// Address the API server listens on.
pub fn bind_addr() -> String {
    std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
}

/// Database URL. When unset the server runs on the in-memory session store.
pub fn database_url() -> Option<String> {
    std::env::var("DATABASE_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
}

/// Base URL the probe/preflight binaries talk to.
pub fn api_base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string())
}

pub fn access_token_ttl_secs() -> anyhow::Result<u64> {
    env_secs("ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TOKEN_TTL_SECS)
}

pub fn refresh_token_ttl_secs() -> anyhow::Result<u64> {
    env_secs("REFRESH_TOKEN_TTL_SECS", DEFAULT_REFRESH_TOKEN_TTL_SECS)
}

/// Whether session cookies carry the `Secure` attribute.
pub fn cookie_secure() -> anyhow::Result<bool> {
    env_or("COOKIE_SECURE", false)
}

pub fn sweep_interval_secs() -> anyhow::Result<u64> {
    env_secs("SESSION_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)
}

/// Everything the server needs, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    pub cookie_secure: bool,
    pub sweep_interval_secs: u64,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            bind_addr: bind_addr(),
            database_url: database_url(),
            access_token_ttl_secs: access_token_ttl_secs()?,
            refresh_token_ttl_secs: refresh_token_ttl_secs()?,
            cookie_secure: cookie_secure()?,
            sweep_interval_secs: sweep_interval_secs()?,
        })
    }
}
