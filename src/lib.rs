pub mod app;
pub mod client;
pub mod crypto;
pub mod domain;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::{SessionPolicy, SessionService, SessionSweeper};
pub use client::{ApiClient, AuthState, ClientConfig, ClientError, Credentials, RequestSpec};
pub use domain::session::SessionStore;
pub use domain::{AppError, ValidationError};
pub use storage::{MemorySessionStore, PostgresSessionStore};
