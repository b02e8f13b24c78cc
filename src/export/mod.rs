/// Export pipeline: board item -> estimate -> workbook -> Monday file column (+ Dropbox)
///
/// Shared by the webhook handler and the CLI. One `reqwest::Client` is reused for every
/// outbound call.

use crate::config::{Config, ConfigError};
use crate::dropbox::{upload_eob_workbook, UploadTarget};
use crate::eob::inputs::cells_from_fields;
use crate::eob::workbook::render_workbook;
use crate::eob::{generate, Cells, Guidelines, Mode};
use crate::monday::{
    decide_mode, find_missing, item_to_field_inputs, normalize_fields, required_fields,
    FieldInputs, MondayClient,
};
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use tracing::Instrument;
use uuid::Uuid;

const UNKNOWN_ADDRESS: &str = "Unknown Address";
const UNKNOWN_CLIENT: &str = "Unknown Client";
const CLIENT_FIELDS: [&str; 3] = ["Name", "Client Name", "Client"];
const YEAR_FIELDS: [&str; 5] = [
    "Date Placed in Service",
    "In-Service Date",
    "Tax Year of CSS",
    "Study Tax Year",
    "Tax Year",
];

fn filename_illegal() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("valid filename regex"))
}

fn field<'a>(fields: &'a FieldInputs, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// `EOB <address>.xlsx` with characters Windows rejects removed
pub fn export_filename(fields: &FieldInputs) -> String {
    let raw = field(fields, "Property Address").unwrap_or(UNKNOWN_ADDRESS);
    let cleaned = filename_illegal().replace_all(raw, "");
    let cleaned = cleaned.trim();
    let address = if cleaned.is_empty() {
        UNKNOWN_ADDRESS
    } else {
        cleaned
    };
    format!("EOB {address}.xlsx")
}

pub fn client_name(fields: &FieldInputs) -> &str {
    CLIENT_FIELDS
        .iter()
        .find_map(|k| field(fields, k))
        .unwrap_or(UNKNOWN_CLIENT)
}

/// Year folder: first four digits of the first date/year field that has them
pub fn folder_year(fields: &FieldInputs, today: NaiveDate) -> String {
    YEAR_FIELDS
        .iter()
        .filter_map(|k| field(fields, k))
        .find_map(|v| {
            let prefix: String = v.chars().take(4).collect();
            (prefix.len() == 4 && prefix.chars().all(|c| c.is_ascii_digit())).then_some(prefix)
        })
        .unwrap_or_else(|| today.year().to_string())
}

/// An item's inputs, ready for the estimator
#[derive(Debug, Clone, Serialize)]
pub struct PreparedItem {
    pub item_id: u64,
    pub name: String,
    pub mode: Mode,
    pub fields: FieldInputs,
    pub cells: Cells,
    pub missing: Vec<String>,
}

/// Result of a successful export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportOutcome {
    pub item_id: u64,
    pub mode: Mode,
    pub filename: String,
    pub dropbox_path: Option<String>,
}

/// Turn fetched field inputs into estimator inputs
pub fn prepare_fields(item_id: u64, name: String, mut fields: FieldInputs) -> PreparedItem {
    let mode = decide_mode(&fields);
    normalize_fields(&mut fields, mode);
    let missing = find_missing(&fields, required_fields(mode));
    let cells = cells_from_fields(mode, &fields);
    PreparedItem {
        item_id,
        name,
        mode,
        fields,
        cells,
        missing,
    }
}

#[derive(Clone)]
pub struct ExportService {
    config: Arc<Config>,
    http: reqwest::Client,
}

impl ExportService {
    pub fn new(config: Arc<Config>, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    /// Service with its own pooled HTTP client
    pub fn from_config(config: Arc<Config>) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("eob-bridge/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::new(config, http))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn monday(&self) -> Result<MondayClient, ConfigError> {
        MondayClient::from_config(self.http.clone(), &self.config.monday)
    }

    /// Fetch an item and map its columns to estimator inputs
    pub async fn prepare_item(&self, item_id: u64) -> Result<PreparedItem> {
        let item = self.monday()?.fetch_item(item_id).await?;
        let fields = item_to_field_inputs(&item);
        let prepared = prepare_fields(item_id, item.name, fields);
        tracing::info!(
            "🧾 Item {} ({}) prepared as {} with {} fields",
            item_id,
            prepared.name,
            prepared.mode,
            prepared.fields.len()
        );
        if !prepared.missing.is_empty() {
            tracing::warn!(
                "⚠️ Item {} is missing required fields: {}",
                item_id,
                prepared.missing.join(", ")
            );
        }
        Ok(prepared)
    }

    fn guidelines_for(&self, mode: Mode) -> Result<Option<Guidelines>> {
        if mode != Mode::Commercial {
            return Ok(None);
        }
        let path = &self.config.export.guidelines_path;
        let guidelines = Guidelines::load(path)
            .with_context(|| format!("loading commercial guidelines from {}", path.display()))?;
        Ok(Some(guidelines))
    }

    /// Run the estimator and render the workbook in memory
    pub fn build_workbook(&self, prepared: &PreparedItem, today: NaiveDate) -> Result<Vec<u8>> {
        let guidelines = self.guidelines_for(prepared.mode)?;
        let payload = generate(
            prepared.mode,
            &prepared.cells,
            guidelines.as_ref(),
            self.config.export.bonus,
            today,
        )?;
        Ok(render_workbook(&payload)?)
    }

    pub fn filename_for(&self, prepared: &PreparedItem) -> String {
        self.config
            .export
            .filename
            .clone()
            .unwrap_or_else(|| export_filename(&prepared.fields))
    }

    /// Dropbox failures are logged, never propagated
    pub async fn upload_to_dropbox(
        &self,
        fields: &FieldInputs,
        filename: &str,
        bytes: Vec<u8>,
        today: NaiveDate,
    ) -> Option<String> {
        let year = folder_year(fields, today);
        let target = UploadTarget {
            client_name: client_name(fields),
            year: &year,
            property_address: field(fields, "Property Address").unwrap_or(UNKNOWN_ADDRESS),
        };
        match upload_eob_workbook(&self.http, &self.config.dropbox, &target, filename, bytes).await
        {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("⚠️ Dropbox upload failed: {}", e);
                None
            }
        }
    }

    /// Full webhook export for one item into `column_id`
    pub async fn export_item(&self, item_id: u64, column_id: &str) -> Result<ExportOutcome> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("export", %run_id, item_id);
        async move {
            let today = chrono::Local::now().date_naive();
            let prepared = self.prepare_item(item_id).await?;
            let bytes = self.build_workbook(&prepared, today)?;
            let filename = self.filename_for(&prepared);

            let result = self
                .monday()?
                .upload_file_to_column(item_id, column_id, bytes.clone(), &filename)
                .await?;
            tracing::info!(
                "✅ Uploaded {} to item {} column {}: {}",
                filename,
                item_id,
                column_id,
                result
            );

            let dropbox_path = self
                .upload_to_dropbox(&prepared.fields, &filename, bytes, today)
                .await;

            Ok(ExportOutcome {
                item_id,
                mode: prepared.mode,
                filename,
                dropbox_path,
            })
        }
        .instrument(span)
        .await
    }
}
