/// Estimator input loading
///
/// Inputs end up keyed by the legacy spreadsheet cell names (`B1`, `B31`, ...) so the
/// calculators line up with the estimator workbooks. Three JSON shapes are accepted:
/// - cell-keyed: `{ "B31": "SFR$$", "B1": 1620 }`
/// - field-keyed: `{ "Tier": "SFR$$", "Interior SF": 1620 }`
/// - wrapped: `{ "inputs": { ... } }` or `{ "cells": { ... } }`
///
/// Spreadsheet-looking strings are normalised on the way in: `"60%"` becomes `0.6`,
/// `"$2,750,000"` becomes `2750000`, `"(1234)"` becomes `-1234` and blanks become null.

use super::{Cells, Mode};
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

/// Human field names (normalised) to residential cells
const RESIDENTIAL_FIELD_TO_CELL: &[(&str, &str)] = &[
    ("tier", "B31"),
    ("property tier", "B31"),
    ("interior sf", "B1"),
    ("site acres", "B2"),
    ("bed cnt", "B3"),
    ("bath cnt", "B4"),
    ("tenant cnt", "B5"),
    ("flooring (sans tile) %", "B6"),
    ("flooring (sans tile)", "B6"),
    ("landscape %", "B7"),
    ("hardscape %", "B8"),
    ("parking lot %", "B9"),
    ("solar cnt", "B10"),
    ("basis", "B12"),
    ("national avg $/sf (res.)", "B28"),
    ("national avg $/sf (res)", "B28"),
    ("date placed in service", "B32"),
    ("in-service date", "B32"),
    ("study tax year", "B34"),
];

/// Human field names (normalised) to commercial cells
const COMMERCIAL_FIELD_TO_CELL: &[(&str, &str)] = &[
    ("basis", "B1"),
    ("property type", "B2"),
    ("in-service date", "B32"),
    ("in service date", "B32"),
    ("date placed in service", "B32"),
    ("study tax year", "B34"),
];

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read input file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),
    #[error("JSON input must be an object, optionally wrapped in 'inputs' or 'cells'")]
    NotAnObject,
    #[error("unsupported input format: {0}. Use .json (preferred) or .txt (legacy)")]
    UnsupportedFormat(String),
}

fn cell_regex() -> &'static Regex {
    static CELL_RE: OnceLock<Regex> = OnceLock::new();
    CELL_RE.get_or_init(|| Regex::new(r"^[A-Z]{1,3}\d{1,5}$").expect("valid cell regex"))
}

/// `B12`-style spreadsheet cell reference
pub(crate) fn is_cell_ref(key: &str) -> bool {
    cell_regex().is_match(key)
}

fn legacy_cell_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.*)\s+([A-Z]{1,3}\d{1,5})\s*,\s*(.*)$").expect("valid legacy regex")
    })
}

fn legacy_field_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*)\s*,\s*(.*)$").expect("valid legacy regex"))
}

fn plain_number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-+]?\d+(\.\d+)?$").expect("valid number regex"))
}

/// Lowercase and collapse internal whitespace
fn norm_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn float_value(x: f64) -> Value {
    Number::from_f64(x).map(Value::Number).unwrap_or(Value::Null)
}

/// Map a human field name to its cell for the given estimator
pub fn field_to_cell(mode: Mode, field: &str) -> Option<&'static str> {
    let table = match mode {
        Mode::Residential => RESIDENTIAL_FIELD_TO_CELL,
        Mode::Commercial => COMMERCIAL_FIELD_TO_CELL,
    };
    let key = norm_key(field);
    table
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, cell)| *cell)
}

/// Parse a spreadsheet-like scalar
///
/// Non-numeric strings are kept as-is, so dates and property types survive.
pub fn parse_scalar(value: &Value) -> Value {
    let s = match value {
        Value::String(s) => s.trim(),
        other => return other.clone(),
    };
    if s.is_empty() {
        return Value::Null;
    }

    if let Some(pct) = s.strip_suffix('%') {
        let num = pct.trim().replace([',', '$'], "");
        return match num.parse::<f64>() {
            Ok(n) => float_value(n / 100.0),
            Err(_) => value.clone(),
        };
    }

    let mut cleaned = s.replace([',', '$'], "");
    if cleaned.starts_with('(') && cleaned.ends_with(')') && cleaned.len() >= 2 {
        cleaned = format!("-{}", cleaned[1..cleaned.len() - 1].trim());
    }

    if plain_number_regex().is_match(&cleaned) {
        if let Ok(n) = cleaned.parse::<f64>() {
            return float_value(n);
        }
    }
    value.clone()
}

fn extract_payload(raw: &Value) -> Option<&Map<String, Value>> {
    let obj = raw.as_object()?;
    for wrapper in ["inputs", "cells"] {
        if let Some(Value::Object(inner)) = obj.get(wrapper) {
            return Some(inner);
        }
    }
    Some(obj)
}

/// Convert a JSON input document into cells
///
/// Unknown fields are kept under their field name (the workbook uses
/// `Property Address` that way).
pub fn cells_from_json(mode: Mode, raw: &Value) -> Result<Cells, InputError> {
    let payload = extract_payload(raw).ok_or(InputError::NotAnObject)?;

    let mut cells = Cells::new();
    for (key, value) in payload {
        let key = key.trim();
        let parsed = parse_scalar(value);
        if cell_regex().is_match(key) {
            cells.insert(key.to_string(), parsed);
        } else if let Some(cell) = field_to_cell(mode, key) {
            cells.insert(cell.to_string(), parsed);
        } else {
            cells.insert(key.to_string(), parsed);
        }
    }
    Ok(cells)
}

/// Convert human field inputs (as collected from a board item) into cells
pub fn cells_from_fields<'a>(
    mode: Mode,
    fields: impl IntoIterator<Item = (&'a String, &'a String)>,
) -> Cells {
    let raw: Map<String, Value> = fields
        .into_iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    // A plain object of strings always converts
    cells_from_json(mode, &Value::Object(raw)).unwrap_or_default()
}

fn read_file(path: &Path) -> Result<String, InputError> {
    std::fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Load a JSON input file
pub fn load_inputs_from_json(mode: Mode, path: &Path) -> Result<Cells, InputError> {
    let raw: Value = serde_json::from_str(&read_file(path)?)?;
    cells_from_json(mode, &raw)
}

/// Parse the legacy text format
///
/// ```text
/// SFR$$
/// Interior SF B1, 1620
/// Flooring (Sans Tile) % B6, 100%
/// Study Tax Year, 2025
/// ```
pub fn parse_legacy_text(mode: Mode, text: &str) -> Cells {
    let mut lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let mut cells = Cells::new();
    if lines.is_empty() {
        return cells;
    }

    // Residential files often open with the tier on a line of its own
    if mode == Mode::Residential && !lines[0].contains(',') && !lines[0].contains('B') {
        cells.insert("B31".to_string(), Value::String(lines[0].to_string()));
        lines.remove(0);
    }

    for line in lines {
        if let Some(caps) = legacy_cell_line_regex().captures(line) {
            let field = caps[1].trim();
            let cell = caps[2].trim().to_string();
            let value = parse_scalar(&Value::String(caps[3].trim().to_string()));
            cells.insert(cell, value.clone());
            if let Some(mapped) = field_to_cell(mode, field) {
                cells.entry(mapped.to_string()).or_insert(value);
            }
            continue;
        }

        if let Some(caps) = legacy_field_line_regex().captures(line) {
            let field = caps[1].trim();
            let value = parse_scalar(&Value::String(caps[2].trim().to_string()));
            let key = field_to_cell(mode, field)
                .map(str::to_string)
                .unwrap_or_else(|| field.to_string());
            cells.insert(key, value);
        }
    }
    cells
}

/// Load a legacy text input file
pub fn load_inputs_from_legacy_text(mode: Mode, path: &Path) -> Result<Cells, InputError> {
    Ok(parse_legacy_text(mode, &read_file(path)?))
}

/// Pick the loader by extension; no path means calculator defaults
pub fn load_inputs(mode: Mode, path: Option<&Path>) -> Result<Cells, InputError> {
    let Some(path) = path else {
        return Ok(Cells::new());
    };
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "json" => load_inputs_from_json(mode, path),
        "txt" => load_inputs_from_legacy_text(mode, path),
        _ => Err(InputError::UnsupportedFormat(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        )),
    }
}

/// Minimal example document for each estimator
pub fn example_inputs(mode: Mode) -> Value {
    match mode {
        Mode::Residential => serde_json::json!({
            "Tier": "SFR$$",
            "Interior SF": 1620,
            "Site Acres": 0.26,
            "Bed Cnt": 4,
            "Bath Cnt": 2,
            "Tenant Cnt": 1,
            "Flooring (Sans Tile) %": "100%",
            "Landscape %": "60%",
            "Hardscape %": "10%",
            "Parking Lot %": "0%",
            "Solar Cnt": 0,
            "Basis": 700000,
            "National Avg $/SF (Res.)": 130,
            "Date Placed in Service": "2021-01-01",
            "Study Tax Year": 2025
        }),
        Mode::Commercial => serde_json::json!({
            "Basis": "2,750,000",
            "Property Type": "Medical Center",
            "In-Service Date": "2018-06-15",
            "Study Tax Year": 2025
        }),
    }
}
