/// Commercial property-type guidelines
///
/// The guideline table maps a property type to the share of basis that typically lands in
/// each recovery class. It is exported from the estimator's default-settings sheet as a JSON
/// array of row objects; header names vary between exports, so columns are matched loosely.

use super::common::{as_number, clamp01};
use serde_json::{Map, Value};
use std::path::Path;
use thiserror::Error;

const PROPERTY_TYPE_COLUMNS: [&str; 2] = ["property type", "property type guideline"];
const DEP_LIFE_COLUMNS: [&str; 4] = [
    "dep. life",
    "dep life",
    "dep. life (yrs)",
    "dep. life (years)",
];
const P39_COLUMNS: [&str; 3] = ["39-yr", "39 yr", "39"];
const P15_COLUMNS: [&str; 3] = ["15-yr", "15 yr", "15"];
const P7_COLUMNS: [&str; 3] = ["7-yr", "7 yr", "7"];
const P5_COLUMNS: [&str; 3] = ["5-yr", "5 yr", "5"];
const ACCEL_COLUMNS: [&str; 2] = ["total accelerated", "total accelerated %"];

#[derive(Debug, Error)]
pub enum GuidelineError {
    #[error("failed to read guidelines {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid guidelines JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("guidelines must be a JSON array of row objects")]
    NotAnArray,
    #[error("guideline file missing Property Type column")]
    MissingPropertyTypeColumn,
}

/// One property type's recovery-class fractions
#[derive(Debug, Clone, PartialEq)]
pub struct GuidelineRow {
    pub property_type: String,
    pub dep_life: Option<Value>,
    pub p39: f64,
    pub p15: f64,
    pub p7: f64,
    pub p5: f64,
    pub total_accelerated: f64,
}

impl GuidelineRow {
    /// Row with fractions given directly, accelerated share derived
    pub fn new(property_type: impl Into<String>, p39: f64, p15: f64, p7: f64, p5: f64) -> Self {
        Self {
            property_type: property_type.into(),
            dep_life: None,
            p39: clamp01(p39),
            p15: clamp01(p15),
            p7: clamp01(p7),
            p5: clamp01(p5),
            total_accelerated: clamp01(p5 + p7 + p15),
        }
    }
}

/// Guideline table in source order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Guidelines {
    rows: Vec<GuidelineRow>,
}

fn column<'a>(row: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    row.iter()
        .find(|(k, _)| names.contains(&k.trim().to_lowercase().as_str()))
        .map(|(_, v)| v)
}

fn fraction(row: &Map<String, Value>, names: &[&str]) -> Option<f64> {
    column(row, names).and_then(as_number)
}

impl Guidelines {
    pub fn new(rows: Vec<GuidelineRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[GuidelineRow] {
        &self.rows
    }

    /// Parse a JSON array of row objects; fully empty rows are skipped
    pub fn from_json(raw: &Value) -> Result<Self, GuidelineError> {
        let rows = raw.as_array().ok_or(GuidelineError::NotAnArray)?;
        let mut parsed = Vec::new();
        for row in rows {
            let Some(obj) = row.as_object() else {
                continue;
            };
            if obj.values().all(Value::is_null) {
                continue;
            }
            let property_type = column(obj, &PROPERTY_TYPE_COLUMNS)
                .ok_or(GuidelineError::MissingPropertyTypeColumn)?;
            let property_type = match property_type {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };

            let p39 = clamp01(fraction(obj, &P39_COLUMNS).unwrap_or(0.0));
            let p15 = clamp01(fraction(obj, &P15_COLUMNS).unwrap_or(0.0));
            let p7 = clamp01(fraction(obj, &P7_COLUMNS).unwrap_or(0.0));
            let p5 = clamp01(fraction(obj, &P5_COLUMNS).unwrap_or(0.0));
            let total_accelerated =
                clamp01(fraction(obj, &ACCEL_COLUMNS).unwrap_or(p5 + p7 + p15));

            parsed.push(GuidelineRow {
                property_type,
                dep_life: column(obj, &DEP_LIFE_COLUMNS).cloned(),
                p39,
                p15,
                p7,
                p5,
                total_accelerated,
            });
        }
        Ok(Self { rows: parsed })
    }

    pub fn load(path: &Path) -> Result<Self, GuidelineError> {
        let text = std::fs::read_to_string(path).map_err(|source| GuidelineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&serde_json::from_str(&text)?)
    }

    /// Match a property type: exact (case-insensitive) first, then substring, table order
    pub fn match_property_type(&self, property_type: &str) -> Option<&GuidelineRow> {
        let query = property_type.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }
        self.rows
            .iter()
            .find(|r| r.property_type.to_lowercase() == query)
            .or_else(|| {
                self.rows
                    .iter()
                    .find(|r| r.property_type.to_lowercase().contains(&query))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Guidelines {
        Guidelines::from_json(&json!([
            {"Property Type": "Bank", "Dep. Life": 39, "39-yr": 0.7, "15-yr": 0.1, "7-yr": 0.05, "5-yr": 0.15},
            {"Property Type": "Medical Center", "39-yr": "72%", "15-yr": "8%", "7-yr": "5%", "5-yr": "15%", "Total Accelerated": 0.28},
            {"Property Type": null, "39-yr": null},
            {"Property Type": "Bank Branch", "39-yr": 0.8, "15-yr": 0.1, "7-yr": 0.0, "5-yr": 0.1}
        ]))
        .unwrap()
    }

    #[test]
    fn test_parse_rows() {
        let g = sample();
        assert_eq!(g.rows().len(), 3);
        let bank = &g.rows()[0];
        assert_eq!(bank.p39, 0.7);
        assert_eq!(bank.dep_life, Some(json!(39)));
        assert!((bank.total_accelerated - 0.3).abs() < 1e-9);
        let medical = &g.rows()[1];
        assert!((medical.p39 - 0.72).abs() < 1e-9);
        assert_eq!(medical.total_accelerated, 0.28);
    }

    #[test]
    fn test_match_exact_before_contains() {
        let g = sample();
        assert_eq!(g.match_property_type("bank").unwrap().property_type, "Bank");
        assert_eq!(g.match_property_type(" BRANCH ").unwrap().property_type, "Bank Branch");
        assert_eq!(g.match_property_type("medical").unwrap().property_type, "Medical Center");
        assert!(g.match_property_type("Hotel").is_none());
        assert!(g.match_property_type("  ").is_none());
    }

    #[test]
    fn test_missing_property_type_column() {
        let err = Guidelines::from_json(&json!([{"Name": "Bank", "39-yr": 1.0}])).unwrap_err();
        assert!(matches!(err, GuidelineError::MissingPropertyTypeColumn));
        assert!(matches!(
            Guidelines::from_json(&json!({"rows": []})),
            Err(GuidelineError::NotAnArray)
        ));
    }
}
