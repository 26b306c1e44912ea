pub mod cookies;
pub mod error;
pub mod extract;
pub mod router;
pub mod types;
pub mod handlers {
    pub mod auth;
    pub mod health;
}

pub use cookies::CookiePolicy;
pub use router::{create_router, ApiDoc, REFRESH_PATH};
pub use types::AppState;
