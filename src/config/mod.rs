/// Configuration management for the EOB bridge
///
/// Everything comes from environment variables (a `.env` file is loaded first when present).
/// Server settings fall back to defaults; integration secrets stay optional here and are
/// validated where they are used.

use crate::eob::BonusSchedule;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MONDAY_API_URL: &str = "https://api.monday.com/v2";
pub const DEFAULT_MONDAY_FILE_API_URL: &str = "https://api.monday.com/v2/file";
pub const DEFAULT_DROPBOX_API_URL: &str = "https://api.dropboxapi.com/2";
pub const DEFAULT_DROPBOX_CONTENT_URL: &str = "https://content.dropboxapi.com/2";
pub const DEFAULT_DROPBOX_ALLOWED_ROOT: &str = "/CostSeg Team Folder/Mark/Test Client Master";
pub const DEFAULT_GUIDELINES_PATH: &str = "templates/commercial_guidelines.json";
pub const DEFAULT_OUTPUT_DIR: &str = "outputs";

/// A required setting that is absent or unusable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} missing/invalid")]
    Missing(&'static str),
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub monday: MondayConfig,
    pub dropbox: DropboxConfig,
    pub export: ExportConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address, `127.0.0.1` unless HOST says otherwise
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MondayConfig {
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    pub board_id: Option<u64>,
    /// File column the exported workbook is attached to
    pub file_column_id: Option<String>,
    pub api_url: String,
    pub file_api_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropboxConfig {
    pub enabled: bool,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    /// Uploads outside this folder are refused
    pub allowed_root: String,
    pub api_url: String,
    pub content_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Fixed upload filename; derived from the property address when unset
    pub filename: Option<String>,
    pub guidelines_path: PathBuf,
    pub bonus: BonusSchedule,
    pub output_dir: PathBuf,
}

fn truthy(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

impl Config {
    /// Load `.env` (if any) and read the process environment
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("📄 Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let bonus = match get("EOB_BONUS_SCHEDULE") {
            None => BonusSchedule::default(),
            Some(raw) => BonusSchedule::parse(&raw).unwrap_or_else(|| {
                tracing::warn!("⚠️ Ignoring invalid EOB_BONUS_SCHEDULE '{}'", raw);
                BonusSchedule::default()
            }),
        };

        Self {
            server: ServerConfig {
                host: get_or("HOST", DEFAULT_HOST),
                port: get("PORT")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(DEFAULT_PORT),
            },
            monday: MondayConfig {
                api_token: get("MONDAY_API_TOKEN"),
                board_id: get("MONDAY_BOARD_ID").and_then(|b| b.parse().ok()),
                file_column_id: get("MONDAY_FILE_COLUMN_ID"),
                api_url: get_or("MONDAY_API_URL", DEFAULT_MONDAY_API_URL),
                file_api_url: get_or("MONDAY_FILE_API_URL", DEFAULT_MONDAY_FILE_API_URL),
            },
            dropbox: DropboxConfig {
                enabled: get("DROPBOX_ENABLE").is_some_and(|v| truthy(&v)),
                access_token: get("DROPBOX_ACCESS_TOKEN"),
                allowed_root: get_or("DROPBOX_ALLOWED_ROOT", DEFAULT_DROPBOX_ALLOWED_ROOT),
                api_url: get_or("DROPBOX_API_URL", DEFAULT_DROPBOX_API_URL),
                content_url: get_or("DROPBOX_CONTENT_URL", DEFAULT_DROPBOX_CONTENT_URL),
            },
            export: ExportConfig {
                filename: get("EXPORT_FILENAME"),
                guidelines_path: PathBuf::from(get_or(
                    "EOB_GUIDELINES_PATH",
                    DEFAULT_GUIDELINES_PATH,
                )),
                bonus,
                output_dir: PathBuf::from(get_or("EOB_OUTPUT_DIR", DEFAULT_OUTPUT_DIR)),
            },
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Config {
    /// Process environment only, no `.env`
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl MondayConfig {
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.api_token
            .as_deref()
            .ok_or(ConfigError::Missing("MONDAY_API_TOKEN"))
    }

    pub fn require_file_column(&self) -> Result<&str, ConfigError> {
        self.file_column_id
            .as_deref()
            .ok_or(ConfigError::Missing("MONDAY_FILE_COLUMN_ID"))
    }

    pub fn require_board(&self) -> Result<u64, ConfigError> {
        self.board_id.ok_or(ConfigError::Missing("MONDAY_BOARD_ID"))
    }
}
