//! Outbound send routes.

use std::path::{Path, PathBuf};

use {
    axum::{
        Json,
        extract::{State, rejection::JsonRejection},
        response::IntoResponse,
    },
    satele_channels::{OutboundContent, StatusSnapshot},
    serde::Deserialize,
    tracing::{info, warn},
};

use crate::{
    error::{GatewayError, Result},
    server::GatewayState,
};

#[derive(Debug, Default, Deserialize)]
pub struct SendRequest {
    pub to: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMediaRequest {
    pub to: Option<String>,
    pub file_path: Option<String>,
    pub caption: Option<String>,
}

/// MIME type announced for an outbound file, by extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg" | "png") => "image/jpeg",
        Some("mp4") => "video/mp4",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(GatewayError::MissingParams(name))
}

fn sent() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "sent" }))
}

/// `POST /send`
pub async fn send_text(
    State(state): State<GatewayState>,
    body: std::result::Result<Json<SendRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(body) = body.map_err(|_| GatewayError::MissingParams("to, text"))?;
    let to = required(body.to, "to")?;
    let text = required(body.text, "text")?;

    let session = state.slot.require().await?;
    session
        .send(&to, OutboundContent::Text { text })
        .await
        .inspect_err(|e| warn!(to = %to, error = %e, "send failed"))?;
    info!(to = %to, "text sent");
    Ok(sent())
}

/// `POST /send-media`
pub async fn send_media(
    State(state): State<GatewayState>,
    body: std::result::Result<Json<SendMediaRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(body) = body.map_err(|_| GatewayError::MissingParams("to, filePath"))?;
    let to = required(body.to, "to")?;
    let file_path = required(body.file_path, "filePath")?;

    let path = PathBuf::from(&file_path);
    if !tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
        return Err(GatewayError::NotFound(file_path));
    }

    let session = state.slot.require().await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.clone());
    let content = OutboundContent::Document {
        mimetype: mime_for_path(&path).to_string(),
        file_name,
        caption: body.caption,
        path,
    };
    session
        .send(&to, content)
        .await
        .inspect_err(|e| warn!(to = %to, error = %e, "media send failed"))?;
    info!(to = %to, file_path = %file_path, "media sent");
    Ok(sent())
}

/// `GET /status`
pub async fn status(State(state): State<GatewayState>) -> Json<StatusSnapshot> {
    Json(state.status.snapshot())
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
