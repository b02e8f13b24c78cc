/// Board item to estimator field inputs
///
/// Field inputs are keyed by column title (`Basis`, `Tier`, `Property Address`, ...) and are
/// converted to cells by the EOB engine afterwards.

use super::types::Item;
use crate::eob::Mode;
use std::collections::BTreeMap;

pub type FieldInputs = BTreeMap<String, String>;

pub const DEFAULT_RESIDENTIAL_TIER: &str = "SFR$$";

const STUDY_YEAR_ALIASES: [&str; 2] = ["Tax Year of CSS", "Tax Year"];
const RESIDENTIAL_DATE: &str = "Date Placed in Service";
const COMMERCIAL_DATE: &str = "In-Service Date";
const RESIDENTIAL_HINTS: [&str; 6] = [
    "residential",
    "single family",
    "single-family",
    "multi family",
    "multi-family",
    "duplex",
];

/// `Name` is the item name; column values with non-empty text keyed by column title
pub fn item_to_field_inputs(item: &Item) -> FieldInputs {
    let mut fields = FieldInputs::new();
    if !item.name.trim().is_empty() {
        fields.insert("Name".to_string(), item.name.trim().to_string());
    }
    for value in &item.column_values {
        let Some(text) = value.text.as_deref().map(str::trim) else {
            continue;
        };
        if text.is_empty() {
            continue;
        }
        fields.insert(value.title().trim().to_string(), text.to_string());
    }
    fields
}

fn non_empty<'a>(fields: &'a FieldInputs, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Residential for SFR/MFR tiers or residential property types, commercial for any other
/// property type, residential when nothing says otherwise
pub fn decide_mode(fields: &FieldInputs) -> Mode {
    if let Some(tier) = non_empty(fields, "Tier") {
        let tier = tier.to_uppercase();
        if tier.starts_with("SFR") || tier.starts_with("MFR") {
            return Mode::Residential;
        }
    }
    if let Some(property_type) = non_empty(fields, "Property Type") {
        let lowered = property_type.to_lowercase();
        if RESIDENTIAL_HINTS.iter().any(|h| lowered.contains(h)) {
            return Mode::Residential;
        }
        return Mode::Commercial;
    }
    Mode::Residential
}

/// Fill aliases and defaults so the estimator sees the names it expects
pub fn normalize_fields(fields: &mut FieldInputs, mode: Mode) {
    if non_empty(fields, "Study Tax Year").is_none() {
        let alias = STUDY_YEAR_ALIASES
            .iter()
            .find_map(|k| non_empty(fields, k))
            .map(str::to_string);
        if let Some(year) = alias {
            fields.insert("Study Tax Year".to_string(), year);
        }
    }

    let (wanted, other) = match mode {
        Mode::Residential => (RESIDENTIAL_DATE, COMMERCIAL_DATE),
        Mode::Commercial => (COMMERCIAL_DATE, RESIDENTIAL_DATE),
    };
    if non_empty(fields, wanted).is_none() {
        if let Some(date) = non_empty(fields, other).map(str::to_string) {
            fields.insert(wanted.to_string(), date);
        }
    }

    if mode == Mode::Residential && non_empty(fields, "Tier").is_none() {
        tracing::info!(
            "ℹ️ Tier missing from item fields, using default '{}'",
            DEFAULT_RESIDENTIAL_TIER
        );
        fields.insert("Tier".to_string(), DEFAULT_RESIDENTIAL_TIER.to_string());
    }
}

/// Minimal fields for a non-empty schedule
pub fn required_fields(mode: Mode) -> &'static [&'static str] {
    match mode {
        Mode::Residential => &["Basis", RESIDENTIAL_DATE, "Study Tax Year", "Tier"],
        Mode::Commercial => &["Basis", COMMERCIAL_DATE, "Study Tax Year", "Property Type"],
    }
}

/// Required fields that are absent or blank
pub fn find_missing(fields: &FieldInputs, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|k| non_empty(fields, k).is_none())
        .map(|k| k.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monday::types::{ColumnRef, ColumnValue};

    fn fields(pairs: &[(&str, &str)]) -> FieldInputs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn column(id: &str, title: &str, text: Option<&str>) -> ColumnValue {
        ColumnValue {
            id: id.to_string(),
            text: text.map(str::to_string),
            column: Some(ColumnRef {
                title: title.to_string(),
            }),
        }
    }

    #[test]
    fn test_item_to_field_inputs() {
        let item = Item {
            id: "1".into(),
            name: " Jane Doe ".into(),
            column_values: vec![
                column("text1", "Property Address", Some("12 Elm St")),
                column("num", "Basis", Some("  ")),
                column("tier", "Tier", None),
                ColumnValue {
                    id: "status".into(),
                    text: Some("Done".into()),
                    column: None,
                },
            ],
        };
        let f = item_to_field_inputs(&item);
        assert_eq!(
            f,
            fields(&[
                ("Name", "Jane Doe"),
                ("Property Address", "12 Elm St"),
                ("status", "Done"),
            ])
        );
    }

    #[test]
    fn test_decide_mode() {
        assert_eq!(decide_mode(&fields(&[])), Mode::Residential);
        assert_eq!(decide_mode(&fields(&[("Tier", "mfr$")])), Mode::Residential);
        assert_eq!(
            decide_mode(&fields(&[("Property Type", "Single Family Rental")])),
            Mode::Residential
        );
        assert_eq!(
            decide_mode(&fields(&[("Property Type", "Duplex")])),
            Mode::Residential
        );
        assert_eq!(
            decide_mode(&fields(&[("Property Type", "Medical Center")])),
            Mode::Commercial
        );
        assert_eq!(
            decide_mode(&fields(&[("Tier", "SFR$$"), ("Property Type", "Bank")])),
            Mode::Residential
        );
    }

    #[test]
    fn test_normalize_residential() {
        let mut f = fields(&[("Tax Year of CSS", "2025"), ("In-Service Date", "2021-05-01")]);
        normalize_fields(&mut f, Mode::Residential);
        assert_eq!(f["Study Tax Year"], "2025");
        assert_eq!(f["Date Placed in Service"], "2021-05-01");
        assert_eq!(f["Tier"], DEFAULT_RESIDENTIAL_TIER);
        assert_eq!(
            find_missing(&f, required_fields(Mode::Residential)),
            vec!["Basis".to_string()]
        );
    }

    #[test]
    fn test_normalize_commercial_keeps_existing() {
        let mut f = fields(&[
            ("Study Tax Year", "2024"),
            ("Tax Year", "2019"),
            ("Property Type", "Bank"),
        ]);
        normalize_fields(&mut f, Mode::Commercial);
        assert_eq!(f["Study Tax Year"], "2024");
        assert!(!f.contains_key("Tier"));
        assert_eq!(
            find_missing(&f, required_fields(Mode::Commercial)),
            vec!["Basis".to_string(), "In-Service Date".to_string()]
        );
    }
}
