//! HTTP client for the session API with single-flight session refresh.

pub mod api;
pub mod credentials;
pub mod error;
pub mod refresh;
pub mod request;
pub mod types;

pub use api::{ApiClient, ClientConfig, DEFAULT_REFRESH_PATH};
pub use credentials::{AuthState, Credentials};
pub use error::{ClientError, ClientResult, RefreshFailure};
pub use refresh::RefreshGate;
pub use request::RequestSpec;
pub use types::{SessionInfo, UserInfo};
