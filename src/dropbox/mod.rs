/// Dropbox upload of exported workbooks
///
/// Optional second destination for the workbook, gated by `DROPBOX_ENABLE` and restricted
/// to an allow-listed root folder.

pub mod client;
pub mod paths;

pub use client::{DropboxClient, DropboxError};

use crate::config::DropboxConfig;
use paths::{build_target_folder, is_within_root, norm_path};

/// Where an exported workbook goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget<'a> {
    pub client_name: &'a str,
    pub year: &'a str,
    pub property_address: &'a str,
}

/// Upload the workbook under the client's folder
///
/// Returns `Ok(None)` when uploads are disabled, unconfigured or the target would leave the
/// allowed root; `Ok(Some(path))` with Dropbox's display path after an upload.
pub async fn upload_eob_workbook(
    http: &reqwest::Client,
    config: &DropboxConfig,
    target: &UploadTarget<'_>,
    filename: &str,
    bytes: Vec<u8>,
) -> Result<Option<String>, DropboxError> {
    if !config.enabled {
        tracing::info!("📦 Dropbox disabled: set DROPBOX_ENABLE=1 to enable upload");
        return Ok(None);
    }
    let Some(token) = config.access_token.as_deref() else {
        tracing::warn!("⚠️ Dropbox upload skipped: DROPBOX_ACCESS_TOKEN not set");
        return Ok(None);
    };

    let allowed_root = norm_path(&config.allowed_root);
    let folder = build_target_folder(
        &allowed_root,
        target.client_name,
        target.year,
        target.property_address,
    );
    tracing::info!("📁 Dropbox target folder: {}", folder);

    if !is_within_root(&folder, &allowed_root) {
        tracing::warn!(
            "🚫 Refusing Dropbox upload outside allowed root. allowed={} got={}",
            allowed_root,
            folder
        );
        return Ok(None);
    }

    let client = DropboxClient::new(
        http.clone(),
        token,
        config.api_url.clone(),
        config.content_url.clone(),
    )?;
    let meta = client.upload_bytes(&folder, filename, bytes, true).await?;
    let path = meta["path_display"]
        .as_str()
        .or_else(|| meta["path_lower"].as_str())
        .map(str::to_string);
    tracing::info!("✅ Dropbox upload OK: {}", path.as_deref().unwrap_or("<unknown>"));
    Ok(path)
}
