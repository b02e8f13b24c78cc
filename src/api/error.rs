/// HTTP-facing errors for the Monday webhook routes

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid_json")]
    InvalidJson,

    #[error("missing_item_id")]
    MissingItemId,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidJson | ApiError::MissingItemId => StatusCode::BAD_REQUEST,
            ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::warn!("⚠️ Webhook rejected ({}): {}", status, self);
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(ApiError::InvalidJson.to_string(), "invalid_json");
        assert_eq!(ApiError::MissingItemId.to_string(), "missing_item_id");
        assert_eq!(
            ApiError::from(ConfigError::Missing("MONDAY_FILE_COLUMN_ID")).to_string(),
            "MONDAY_FILE_COLUMN_ID missing/invalid"
        );
    }

    #[test]
    fn test_error_status() {
        assert_eq!(ApiError::InvalidJson.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::MissingItemId.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Config(ConfigError::Missing("MONDAY_API_TOKEN")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
