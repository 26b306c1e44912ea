use crate::app::SessionService;
use crate::domain::session::{IssuedSession, UserProfile};
use crate::transport::http::cookies::CookiePolicy;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionService>,
    pub cookies: CookiePolicy,
}

/// Envelope every endpoint answers with.
#[derive(Serialize, Debug, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok<T: Serialize>(data: T) -> Self {
        match serde_json::to_value(data) {
            Ok(v) => Self {
                success: true,
                data: Some(v),
                error: None,
            },
            Err(e) => Self::failure(format!("failed to encode response: {}", e)),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct RefreshRequest {
    /// Optional when the `refresh_token` cookie is sent instead.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Returned by register, login and refresh.
#[derive(Serialize, Debug, ToSchema)]
pub struct SessionResponse {
    pub user: UserProfile,
    pub session_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl SessionResponse {
    pub fn new(user: UserProfile, issued: IssuedSession) -> Self {
        Self {
            user,
            session_id: issued.session_id,
            access_token: issued.access_token,
            refresh_token: issued.refresh_token,
            access_expires_at: issued.access_expires_at,
            refresh_expires_at: issued.refresh_expires_at,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct LogoutAllResponse {
    pub revoked: u64,
}

pub fn json_422(err: JsonRejection, expected: &str) -> (StatusCode, Json<ApiResponse>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ApiResponse::failure(format!(
            "Invalid JSON body: {} (expected: {})",
            err, expected
        ))),
    )
}
