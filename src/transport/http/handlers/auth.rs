use crate::domain::error::AppError;
use crate::transport::http::cookies::REFRESH_COOKIE;
use crate::transport::http::extract::AuthUser;
use crate::transport::http::types::{
    json_422, ApiResponse, AppState, LoginRequest, LogoutAllResponse, RefreshRequest,
    RegisterRequest, SessionResponse,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created and signed in", body = ApiResponse),
        (status = 400, description = "Validation failed", body = ApiResponse),
        (status = 409, description = "Email already registered", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn register_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Result<Json<RegisterRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(r) => r,
        Err(e) => return json_422(e, "{ email, password, name? }").into_response(),
    };

    match state
        .sessions
        .register(&request.email, &request.password, request.name.as_deref())
        .await
    {
        Ok((user, issued)) => {
            let jar = state.cookies.set_session(jar, &issued);
            let body = SessionResponse::new(user.profile(), issued);
            (StatusCode::CREATED, jar, Json(ApiResponse::ok(body))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = ApiResponse),
        (status = 400, description = "Validation failed", body = ApiResponse),
        (status = 401, description = "Invalid email or password", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(r) => r,
        Err(e) => return json_422(e, "{ email, password }").into_response(),
    };

    match state.sessions.login(&request.email, &request.password).await {
        Ok((user, issued)) => {
            let jar = state.cookies.set_session(jar, &issued);
            let body = SessionResponse::new(user.profile(), issued);
            (StatusCode::OK, jar, Json(ApiResponse::ok(body))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// The session-refresh endpoint. Accepts the refresh token in the body or the refresh cookie.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body(content = RefreshRequest, description = "Optional when the refresh cookie is sent"),
    responses(
        (status = 200, description = "Session rotated", body = ApiResponse),
        (status = 401, description = "Refresh token missing, expired, revoked or reused", body = ApiResponse)
    )
)]
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Result<Json<RefreshRequest>, JsonRejection>,
) -> Response {
    let from_body = request
        .ok()
        .and_then(|Json(r)| r.refresh_token)
        .filter(|t| !t.trim().is_empty());
    let token = from_body.or_else(|| jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()));

    let Some(token) = token else {
        debug!("refresh called without a refresh token");
        let jar = state.cookies.clear_session(jar);
        return (jar, AppError::unauthorized("refresh token required")).into_response();
    };

    match state.sessions.refresh(token.trim()).await {
        Ok((user, issued)) => {
            let jar = state.cookies.set_session(jar, &issued);
            let body = SessionResponse::new(user.profile(), issued);
            (StatusCode::OK, jar, Json(ApiResponse::ok(body))).into_response()
        }
        Err(e) => {
            let jar = state.cookies.clear_session(jar);
            (jar, e).into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Current session revoked", body = ApiResponse),
        (status = 401, description = "Not signed in", body = ApiResponse)
    )
)]
pub async fn logout_handler(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    jar: CookieJar,
) -> Response {
    match state.sessions.logout(auth.session.id).await {
        Ok(()) => {
            let jar = state.cookies.clear_session(jar);
            (
                jar,
                Json(ApiResponse::ok(serde_json::json!({ "session_id": auth.session.id }))),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/logout-all",
    responses(
        (status = 200, description = "Every session of the user revoked", body = ApiResponse),
        (status = 401, description = "Not signed in", body = ApiResponse)
    )
)]
pub async fn logout_all_handler(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    jar: CookieJar,
) -> Response {
    match state.sessions.logout_all(auth.user.id).await {
        Ok(revoked) => {
            let jar = state.cookies.clear_session(jar);
            (jar, Json(ApiResponse::ok(LogoutAllResponse { revoked }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "The signed-in user", body = ApiResponse),
        (status = 401, description = "Not signed in", body = ApiResponse)
    )
)]
pub async fn me_handler(AuthUser(auth): AuthUser) -> Response {
    Json(ApiResponse::ok(auth.user.profile())).into_response()
}
