/// Monday.com webhook endpoints
///
/// `POST /monday/webhook/export-eob` answers the subscription handshake and, for real
/// events, exports the referenced item's EOB workbook back to the board.

use super::error::ApiError;
use super::payload::{challenge, find_item_id};
use super::AppState;
use axum::{extract::State, response::Json};
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

fn log_event(kind: &str, body: &str) {
    match serde_json::from_str::<Value>(body) {
        Ok(json) => tracing::info!("📥 Monday {} event: {}", kind, json),
        Err(_) => tracing::info!("📥 Monday {} event (raw): {}", kind, body),
    }
}

pub async fn subscribe(body: String) -> Json<Value> {
    log_event("subscribe", &body);
    Json(json!({ "ok": true }))
}

pub async fn unsubscribe(body: String) -> Json<Value> {
    log_event("unsubscribe", &body);
    Json(json!({ "ok": true }))
}

/// Handshake echo, then export of the item the event points at
///
/// Pipeline failures still answer 200 so Monday does not keep retrying the event.
pub async fn export_eob(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<Value>, ApiError> {
    let payload: Value = serde_json::from_str(&body).map_err(|e| {
        tracing::warn!("❌ Invalid JSON payload for export webhook: {}", e);
        ApiError::InvalidJson
    })?;
    tracing::info!("📥 Export webhook received: {}", payload);

    if let Some(token) = challenge(&payload) {
        tracing::info!("🤝 Answering Monday webhook challenge");
        return Ok(Json(json!({ "challenge": token })));
    }

    let column_id = state.config.monday.require_file_column()?;
    state.config.monday.require_token()?;

    let item_id = find_item_id(&payload).ok_or(ApiError::MissingItemId)?;
    tracing::info!("🔗 Export requested for item {}", item_id);

    match state.export.export_item(item_id, column_id).await {
        Ok(outcome) => Ok(Json(json!({
            "ok": true,
            "uploaded": true,
            "itemId": outcome.item_id,
            "mode": outcome.mode,
            "filename": outcome.filename,
            "dropboxPath": outcome.dropbox_path,
        }))),
        Err(e) => {
            let message = format!("{e:#}");
            tracing::error!("❌ Export failed for item {}: {}", item_id, message);
            Ok(Json(json!({
                "ok": true,
                "uploaded": false,
                "itemId": item_id,
                "error": message,
            })))
        }
    }
}
