use crate::domain::error::AppError;
use crate::transport::http::types::ApiResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation(v) => ApiResponse {
                success: false,
                data: Some(serde_json::json!({ "fields": v.fields })),
                error: Some(v.to_string()),
            },
            AppError::Internal(e) => {
                error!(error = ?e, "internal error while handling request");
                ApiResponse::failure("internal server error")
            }
            other => ApiResponse::failure(other.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ValidationError;
    use axum::body::to_bytes;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_carries_fields() {
        let mut v = ValidationError::new();
        v.push("email", "must not be empty");
        let resp = AppError::from(v).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["data"]["fields"][0]["field"], "email");
    }

    #[tokio::test]
    async fn internal_errors_are_not_leaked() {
        let resp = AppError::Internal(anyhow::anyhow!("db password is hunter2")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "internal server error");
    }

    #[tokio::test]
    async fn unauthorized_keeps_message() {
        let resp = AppError::unauthorized("session expired or invalid").into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["error"], "session expired or invalid");
    }

    #[tokio::test]
    async fn not_found_and_conflict_map_to_their_statuses() {
        let resp = AppError::NotFound("session not found".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["error"], "session not found");

        let resp = AppError::Conflict("email already registered".into()).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(resp).await["success"], false);
    }
}
