use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("Invalid argument: {0}")] InvalidArgument(String),
    #[error("Not found: {0}")] NotFound(String),
    #[error("Superseded: {0}")] Superseded(String),
    #[error("Generation unavailable: {0}")] GenerationUnavailable(String),
    #[error("Render failed: {0}")] Render(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    code: u16,
}

impl PatternError {
    pub fn status(&self) -> StatusCode {
        match self {
            PatternError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            PatternError::NotFound(_) => StatusCode::NOT_FOUND,
            PatternError::Superseded(_) => StatusCode::CONFLICT,
            PatternError::GenerationUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PatternError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            PatternError::InvalidArgument(_) => "invalid_argument",
            PatternError::NotFound(_) => "not_found",
            PatternError::Superseded(_) => "superseded",
            PatternError::GenerationUnavailable(_) => "generation_unavailable",
            PatternError::Render(_) => "render_failed",
        }
    }
}

impl IntoResponse for PatternError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("❌ {}", self);
        } else {
            tracing::warn!("⚠️ {}", self);
        }
        let body = ErrorBody { error: self.kind(), message: self.to_string(), code: status.as_u16() };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_each_kind_to_its_status() {
        assert_eq!(PatternError::InvalidArgument("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(PatternError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(PatternError::Superseded("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(PatternError::GenerationUnavailable("x".into()).status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(PatternError::Render("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn render_failure_is_a_json_server_error() {
        let response = PatternError::Render("disk full".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "render_failed");
        assert_eq!(body["code"], 500);
    }
}
