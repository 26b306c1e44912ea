use crate::domain::error::FieldError;
use crate::domain::session::UserProfile;
use crate::transport::http::handlers::{auth, health};
use crate::transport::http::types::{
    ApiResponse, LoginRequest, LogoutAllResponse, RefreshRequest, RegisterRequest,
    SessionResponse,
};
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// Path of the session-refresh endpoint; the client's default refresh path matches it.
pub const REFRESH_PATH: &str = "/api/auth/refresh";

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        auth::register_handler,
        auth::login_handler,
        auth::refresh_handler,
        auth::logout_handler,
        auth::logout_all_handler,
        auth::me_handler
    ),
    components(schemas(
        ApiResponse,
        RegisterRequest,
        LoginRequest,
        RefreshRequest,
        SessionResponse,
        LogoutAllResponse,
        UserProfile,
        FieldError
    ))
)]
pub struct ApiDoc;

pub fn create_router(app_state: crate::transport::http::types::AppState) -> Router {
    Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route(REFRESH_PATH, post(auth::refresh_handler))
        .route("/api/auth/logout", post(auth::logout_handler))
        .route("/api/auth/logout-all", post(auth::logout_all_handler))
        .route("/api/auth/me", get(auth::me_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
