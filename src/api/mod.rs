/// HTTP API layer
///
/// Routes for the Monday.com integration: the export webhook, the app
/// subscribe/unsubscribe lifecycle hooks and a health probe.

pub mod error;
pub mod monday;
pub mod payload;

pub use error::ApiError;

use crate::config::Config;
use crate::export::ExportService;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub const EXPORT_WEBHOOK_PATH: &str = "/monday/webhook/export-eob";

/// Shared request state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Export pipeline, holding the pooled HTTP client
    pub export: ExportService,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        Ok(Self {
            export: ExportService::from_config(Arc::clone(&config))?,
            config,
        })
    }
}

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(monday::health))
        .route("/monday/subscribe", post(monday::subscribe))
        .route("/monday/unsubscribe", post(monday::unsubscribe))
        .route(EXPORT_WEBHOOK_PATH, post(monday::export_eob))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    fn app(config: Config) -> Router {
        create_routes().with_state(AppState::new(config).unwrap())
    }

    fn configured() -> Config {
        config(&[
            ("MONDAY_API_TOKEN", "tok"),
            ("MONDAY_FILE_COLUMN_ID", "files"),
            // nothing listens on the discard port
            ("MONDAY_API_URL", "http://127.0.0.1:9/v2"),
            ("MONDAY_FILE_API_URL", "http://127.0.0.1:9/v2/file"),
        ])
    }

    async fn post(app: Router, uri: &str, payload: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_challenge_echo_without_config() {
        let (status, body) = post(
            app(config(&[])),
            EXPORT_WEBHOOK_PATH,
            r#"{"challenge":"abc"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"challenge": "abc"}));
    }

    #[tokio::test]
    async fn test_challenge_echo_preserves_value() {
        let tokens = [
            "",
            "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P",
            "ünïcødé \"quoted\"",
        ];
        for token in tokens {
            let payload = json!({"challenge": token, "event": {"itemId": 1}}).to_string();
            let (status, body) = post(app(configured()), EXPORT_WEBHOOK_PATH, &payload).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["challenge"].as_str(), Some(token));
        }
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let (status, body) = post(app(configured()), EXPORT_WEBHOOK_PATH, "not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "invalid_json"}));
    }

    #[tokio::test]
    async fn test_missing_config() {
        let (status, body) = post(
            app(config(&[("MONDAY_API_TOKEN", "tok")])),
            EXPORT_WEBHOOK_PATH,
            r#"{"event":{"itemId":5}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "MONDAY_FILE_COLUMN_ID missing/invalid"}));

        let (status, body) = post(
            app(config(&[("MONDAY_FILE_COLUMN_ID", "files")])),
            EXPORT_WEBHOOK_PATH,
            r#"{"event":{"itemId":5}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "MONDAY_API_TOKEN missing/invalid"}));
    }

    #[tokio::test]
    async fn test_missing_item_id() {
        let (status, body) = post(
            app(configured()),
            EXPORT_WEBHOOK_PATH,
            r#"{"event":{"boardId":99}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "missing_item_id"}));
    }

    #[tokio::test]
    async fn test_pipeline_failure_still_200() {
        let (status, body) = post(
            app(configured()),
            EXPORT_WEBHOOK_PATH,
            r#"{"event":{"itemId":"42"}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], json!(true));
        assert_eq!(body["uploaded"], json!(false));
        assert_eq!(body["itemId"], json!(42));
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
    }

    #[tokio::test]
    async fn test_subscribe_and_unsubscribe() {
        for uri in ["/monday/subscribe", "/monday/unsubscribe"] {
            let (status, body) =
                post(app(config(&[])), uri, r#"{"payload":{"webhookId":1}}"#).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({"ok": true}));
        }
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(config(&[]))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!({"ok": true}));
    }
}
