//! Authenticated API client.
//!
//! Every call goes through [`ApiClient::execute`]: credentials are attached, and a `401` on a
//! first attempt (other than the refresh endpoint itself) triggers one shared refresh followed by a
//! single replay of the original request. A replay never refreshes again.

use crate::client::credentials::{AuthState, CredentialStore, Credentials};
use crate::client::error::{ClientError, ClientResult, RefreshFailure};
use crate::client::refresh::{RefreshGate, RefreshOutcome};
use crate::client::request::RequestSpec;
use crate::client::types::{
    Envelope, LoginBody, LogoutAllInfo, RefreshBody, RegisterBody, SessionInfo, UserInfo,
};
use futures::FutureExt;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub const DEFAULT_REFRESH_PATH: &str = "/api/auth/refresh";
pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REGISTER_PATH: &str = "/api/auth/register";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const LOGOUT_ALL_PATH: &str = "/api/auth/logout-all";
pub const ME_PATH: &str = "/api/auth/me";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub refresh_path: String,
    pub timeout: Duration,
    pub credentials: Option<Credentials>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            timeout: DEFAULT_TIMEOUT,
            credentials: None,
        }
    }

    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

fn normalize_base_url(raw: &str) -> ClientResult<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ClientError::InvalidUrl("base url must not be empty".into()));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ClientError::InvalidUrl(format!(
            "base url must start with http:// or https://: {}",
            trimmed
        )));
    }
    Ok(trimmed.to_string())
}

struct Inner {
    http: reqwest::Client,
    base_url: String,
    refresh_path: String,
    credentials: CredentialStore,
    gate: RefreshGate,
    refresh_attempts: AtomicU64,
}

/// Cheap to clone; clones share credentials and the refresh gate.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .build()?;
        Self::with_http(http, config)
    }

    /// Uses a caller-built `reqwest::Client` (its cookie/timeout settings are kept as-is).
    pub fn with_http(http: reqwest::Client, config: ClientConfig) -> ClientResult<Self> {
        let base_url = normalize_base_url(&config.base_url)?;
        let refresh_path = if config.refresh_path.starts_with('/') {
            config.refresh_path
        } else {
            format!("/{}", config.refresh_path)
        };
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url,
                refresh_path,
                credentials: CredentialStore::new(config.credentials),
                gate: RefreshGate::new(),
                refresh_attempts: AtomicU64::new(0),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.inner.credentials.snapshot().0
    }

    pub fn set_credentials(&self, credentials: Credentials) {
        self.inner.credentials.set(credentials);
    }

    pub fn clear_credentials(&self) {
        self.inner.credentials.clear();
    }

    /// Watch this to send the user to the login screen once a refresh fails.
    pub fn auth_state(&self) -> watch::Receiver<AuthState> {
        self.inner.credentials.subscribe()
    }

    pub fn current_auth_state(&self) -> AuthState {
        self.inner.credentials.state()
    }

    /// How many refresh calls this client has actually sent.
    pub fn refresh_attempts(&self) -> u64 {
        self.inner.refresh_attempts.load(Ordering::Relaxed)
    }

    /// Whether a session refresh is in flight right now.
    pub fn refresh_in_flight(&self) -> bool {
        self.inner.gate.in_flight()
    }

    fn is_refresh_path(&self, path: &str) -> bool {
        let path = path.split('?').next().unwrap_or(path);
        path == self.inner.refresh_path
    }

    /// Sends `spec`, refreshing the session and replaying once on a first-attempt `401`.
    ///
    /// Returns the raw response; non-success statuses other than the handled `401` are not errors
    /// here. Use the `*_json` helpers for envelope decoding and status mapping.
    pub async fn execute(&self, spec: RequestSpec) -> ClientResult<Response> {
        let (credentials, generation) = self.inner.credentials.snapshot();
        let response = self.inner.send(&spec, credentials.as_ref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED
            || !spec.retry
            || self.is_refresh_path(&spec.path)
        {
            return Ok(response);
        }

        let inner = self.inner.clone();
        let joined = self
            .inner
            .gate
            .run_unless(
                || self.inner.credentials.generation() != generation,
                move || async move { inner.perform_refresh().await }.boxed(),
            )
            .await;
        match joined {
            Some(outcome) => {
                debug!(path = %spec.path, ok = outcome.is_ok(), "got 401; refresh settled");
                outcome?;
            }
            None if self.inner.credentials.state() == AuthState::SignedOut => {
                // Another caller's refresh already failed for this batch.
                return Err(ClientError::Unauthorized("session expired".into()));
            }
            None => {
                debug!(path = %spec.path, "got 401 but credentials changed in flight; replaying");
            }
        }

        let replay = spec.without_retry();
        let (credentials, _) = self.inner.credentials.snapshot();
        self.inner.send(&replay, credentials.as_ref()).await
    }

    /// Refreshes the session, joining an in-flight refresh if there is one.
    pub async fn refresh(&self) -> Result<(), RefreshFailure> {
        let inner = self.inner.clone();
        self.inner
            .gate
            .run(move || async move { inner.perform_refresh().await }.boxed())
            .await
    }

    /// `execute` + envelope decoding + status mapping.
    pub async fn request_json<T: DeserializeOwned>(&self, spec: RequestSpec) -> ClientResult<T> {
        let response = self.execute(spec).await?;
        decode(response).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.request_json(RequestSpec::get(path)).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let spec = RequestSpec::post(path)
            .json(body)
            .map_err(|e| ClientError::Decode(format!("failed to encode request body: {}", e)))?;
        self.request_json(spec).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let spec = RequestSpec::put(path)
            .json(body)
            .map_err(|e| ClientError::Decode(format!("failed to encode request body: {}", e)))?;
        self.request_json(spec).await
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.request_json(RequestSpec::delete(path)).await
    }

    /// Signs in and stores the returned credentials. A wrong password surfaces as `Unauthorized`
    /// without a refresh attempt.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<SessionInfo> {
        let spec = RequestSpec::post(LOGIN_PATH)
            .json(&LoginBody { email, password })
            .map_err(|e| ClientError::Decode(e.to_string()))?
            .without_retry();
        let session: SessionInfo = self.request_json(spec).await?;
        self.inner.credentials.set(session.credentials());
        info!(base_url = %self.inner.base_url, "signed in");
        Ok(session)
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> ClientResult<SessionInfo> {
        let spec = RequestSpec::post(REGISTER_PATH)
            .json(&RegisterBody {
                email,
                password,
                name,
            })
            .map_err(|e| ClientError::Decode(e.to_string()))?
            .without_retry();
        let session: SessionInfo = self.request_json(spec).await?;
        self.inner.credentials.set(session.credentials());
        Ok(session)
    }

    pub async fn me(&self) -> ClientResult<UserInfo> {
        self.get_json(ME_PATH).await
    }

    /// Revokes the current session server-side. Local credentials are dropped either way.
    pub async fn logout(&self) -> ClientResult<()> {
        let result: ClientResult<JsonValue> = self.request_json(RequestSpec::post(LOGOUT_PATH)).await;
        self.inner.credentials.clear();
        result.map(|_| ())
    }

    pub async fn logout_all(&self) -> ClientResult<u64> {
        let result: ClientResult<LogoutAllInfo> =
            self.request_json(RequestSpec::post(LOGOUT_ALL_PATH)).await;
        self.inner.credentials.clear();
        result.map(|info| info.revoked)
    }
}

impl Inner {
    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn send(
        &self,
        spec: &RequestSpec,
        credentials: Option<&Credentials>,
    ) -> ClientResult<Response> {
        let mut builder = self
            .http
            .request(spec.method.clone(), self.url(&spec.path));
        if let Some(c) = credentials {
            builder = builder.bearer_auth(&c.access_token);
        }
        if let Some(body) = &spec.body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }

    /// The refresh call itself. Runs at most once per burst, behind the gate.
    async fn perform_refresh(&self) -> RefreshOutcome {
        self.refresh_attempts.fetch_add(1, Ordering::Relaxed);
        let body = RefreshBody {
            refresh_token: self.credentials.refresh_token(),
        };
        let result = self
            .http
            .post(self.url(&self.refresh_path))
            .json(&body)
            .send()
            .await;

        let outcome = match result {
            Ok(response) => match decode::<SessionInfo>(response).await {
                Ok(session) => {
                    self.credentials.set(session.credentials());
                    info!("session refreshed");
                    return Ok(());
                }
                Err(e) => RefreshFailure(e.to_string()),
            },
            Err(e) => RefreshFailure(format!("refresh request failed: {}", e)),
        };

        warn!(reason = %outcome, "session refresh failed; signing out");
        self.credentials.clear();
        Err(outcome)
    }
}

/// Maps status to error and unwraps the envelope's `data` into `T`.
async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<Envelope<JsonValue>>(&text)
            .ok()
            .and_then(|env| env.error)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        return Err(ClientError::from_status(status, message));
    }

    let envelope: Envelope<T> = serde_json::from_str(&text)
        .map_err(|e| ClientError::Decode(format!("{} (body: {})", e, truncate(&text))))?;
    match envelope.data {
        Some(data) => Ok(data),
        // Lets `()`/`Option<_>` callers accept envelopes without data.
        None => T::deserialize(JsonValue::Null)
            .map_err(|_| ClientError::Decode("response envelope has no data".into())),
    }
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(200) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(
            normalize_base_url(" http://localhost:3000/ ").unwrap(),
            "http://localhost:3000"
        );
        assert!(normalize_base_url("").is_err());
        assert!(normalize_base_url("localhost:3000").is_err());
    }

    #[test]
    fn refresh_path_detection_ignores_query() {
        let client = ApiClient::new(ClientConfig::new("http://localhost:3000")).unwrap();
        assert!(client.is_refresh_path("/api/auth/refresh"));
        assert!(client.is_refresh_path("/api/auth/refresh?x=1"));
        assert!(!client.is_refresh_path("/api/auth/me"));
    }

    #[test]
    fn relative_refresh_path_gets_a_slash() {
        let client = ApiClient::new(
            ClientConfig::new("http://localhost:3000").refresh_path("session/refresh"),
        )
        .unwrap();
        assert!(client.is_refresh_path("/session/refresh"));
    }

    #[test]
    fn initial_credentials_sign_in() {
        let client = ApiClient::new(ClientConfig::new("http://localhost:3000").credentials(
            Credentials {
                access_token: "a".into(),
                refresh_token: None,
            },
        ))
        .unwrap();
        assert_eq!(client.current_auth_state(), AuthState::SignedIn);
        assert_eq!(client.credentials().unwrap().access_token, "a");
    }

    #[test]
    fn truncate_is_char_safe() {
        let long = "é".repeat(300);
        assert_eq!(truncate(&long).chars().count(), 200);
        assert_eq!(truncate("short"), "short");
    }
}
