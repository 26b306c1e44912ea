//! Client error types.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced to callers of `ApiClient`.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The session is gone and could not be refreshed; the caller should send the user to sign in.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// 4xx other than 401.
    #[error("request rejected ({status}): {message}")]
    Api { status: StatusCode, message: String },

    /// 5xx.
    #[error("server error ({status}): {message}")]
    Server { status: StatusCode, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Maps a non-success status and its server message to an error.
    pub fn from_status(status: StatusCode, message: String) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            ClientError::Unauthorized(message)
        } else if status.is_server_error() {
            ClientError::Server { status, message }
        } else {
            ClientError::Api { status, message }
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED),
            ClientError::Api { status, .. } | ClientError::Server { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }
}

/// Why a refresh did not produce new credentials. Cloneable so one outcome can fan out to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct RefreshFailure(pub String);

impl From<RefreshFailure> for ClientError {
    fn from(f: RefreshFailure) -> Self {
        ClientError::Unauthorized(f.0)
    }
}
