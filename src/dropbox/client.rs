/// Dropbox API v2 client
///
/// Team accounts keep shared folders under the team root namespace, so the namespace is
/// resolved once per client and sent on every call as `Dropbox-API-Path-Root`.

use super::paths::{norm_path, sanitize_component};
use reqwest::RequestBuilder;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::OnceCell;

const BODY_PREVIEW: usize = 500;

#[derive(Debug, Error)]
pub enum DropboxError {
    #[error("missing Dropbox access token")]
    MissingToken,
    #[error("dropbox request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{op} failed ({status}): {body}")]
    Api {
        op: &'static str,
        status: u16,
        body: String,
    },
    #[error("create_folder conflict at {path}: {body}")]
    Conflict { path: String, body: String },
    #[error("invalid dropbox response: {0}")]
    Decode(#[from] serde_json::Error),
}

fn preview(text: &str) -> String {
    text.chars().take(BODY_PREVIEW).collect()
}

/// Header values must be ASCII; anything else goes as JSON `\u` escapes
fn header_safe_json(value: &Value) -> String {
    let mut out = String::new();
    for c in value.to_string().chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}

#[derive(Debug)]
pub struct DropboxClient {
    http: reqwest::Client,
    token: String,
    api_url: String,
    content_url: String,
    root_namespace: OnceCell<Option<String>>,
}

impl DropboxClient {
    pub fn new(
        http: reqwest::Client,
        token: impl Into<String>,
        api_url: impl Into<String>,
        content_url: impl Into<String>,
    ) -> Result<Self, DropboxError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(DropboxError::MissingToken);
        }
        Ok(Self {
            http,
            token: token.trim().to_string(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            content_url: content_url.into().trim_end_matches('/').to_string(),
            root_namespace: OnceCell::new(),
        })
    }

    async fn check(response: reqwest::Response, op: &'static str) -> Result<Value, DropboxError> {
        let status = response.status().as_u16();
        let text = response.text().await?;
        if status >= 400 {
            return Err(DropboxError::Api {
                op,
                status,
                body: preview(&text),
            });
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn fetch_root_namespace(&self) -> Result<Option<String>, DropboxError> {
        let response = self
            .http
            .post(format!("{}/users/get_current_account", self.api_url))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let account = Self::check(response, "get_current_account").await?;

        tracing::info!(
            "🔐 Dropbox identity: email={} name={}",
            account["email"].as_str().unwrap_or("unknown"),
            account["name"]["display_name"].as_str().unwrap_or("unknown")
        );
        Ok(account["root_info"]["root_namespace_id"]
            .as_str()
            .map(str::to_string))
    }

    /// Root namespace id, resolved on first use
    pub async fn root_namespace(&self) -> Result<Option<&str>, DropboxError> {
        let ns = self
            .root_namespace
            .get_or_try_init(|| self.fetch_root_namespace())
            .await?;
        Ok(ns.as_deref())
    }

    async fn authorized(&self, url: String) -> Result<RequestBuilder, DropboxError> {
        let mut request = self.http.post(url).bearer_auth(&self.token);
        if let Some(ns) = self.root_namespace().await? {
            request = request.header(
                "Dropbox-API-Path-Root",
                json!({ ".tag": "root", "root": ns }).to_string(),
            );
        }
        Ok(request)
    }

    async fn rpc(&self, endpoint: &str, body: Value) -> Result<reqwest::Response, DropboxError> {
        let request = self
            .authorized(format!("{}/{}", self.api_url, endpoint))
            .await?;
        Ok(request.json(&body).send().await?)
    }

    pub async fn get_metadata(&self, path: &str) -> Result<Value, DropboxError> {
        let path = norm_path(path);
        let response = self
            .rpc(
                "files/get_metadata",
                json!({ "path": path, "include_deleted": false }),
            )
            .await?;
        Self::check(response, "get_metadata").await
    }

    /// Create one folder; an existing folder at the path counts as success
    pub async fn create_folder(&self, path: &str) -> Result<(), DropboxError> {
        let path = norm_path(path);
        let response = self
            .rpc(
                "files/create_folder_v2",
                json!({ "path": path, "autorename": false }),
            )
            .await?;

        if response.status().as_u16() == 409 {
            let body = preview(&response.text().await?);
            return match self.get_metadata(&path).await {
                Ok(meta) if meta[".tag"] == "folder" => Ok(()),
                _ => Err(DropboxError::Conflict { path, body }),
            };
        }
        Self::check(response, "create_folder").await.map(|_| ())
    }

    /// Create every prefix of `folder`, top down
    pub async fn ensure_parents(&self, folder: &str) -> Result<(), DropboxError> {
        let folder = norm_path(folder);
        let mut current = String::new();
        for part in folder.split('/').filter(|p| !p.is_empty()) {
            current.push('/');
            current.push_str(part);
            self.create_folder(&current).await?;
        }
        Ok(())
    }

    /// Upload into `folder`, creating it first; returns the file metadata
    pub async fn upload_bytes(
        &self,
        folder: &str,
        filename: &str,
        content: Vec<u8>,
        overwrite: bool,
    ) -> Result<Value, DropboxError> {
        let folder = norm_path(folder);
        let full_path = norm_path(&format!("{}/{}", folder, sanitize_component(filename)));
        self.ensure_parents(&folder).await?;

        let arg = json!({
            "path": full_path,
            "mode": if overwrite { "overwrite" } else { "add" },
            "autorename": false,
            "mute": false,
            "strict_conflict": false,
        });
        let response = self
            .authorized(format!("{}/files/upload", self.content_url))
            .await?
            .header("Content-Type", "application/octet-stream")
            .header("Dropbox-API-Arg", header_safe_json(&arg))
            .body(content)
            .send()
            .await?;
        Self::check(response, "upload").await
    }
}
