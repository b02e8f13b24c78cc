/// EOB (Estimate of Benefits) engine
///
/// Pure calculators for residential and commercial cost-segregation estimates, the MACRS
/// lookback, input normalisation and the xlsx writer. Nothing in here touches the network.

pub mod commercial;
pub mod common;
pub mod guidelines;
pub mod inputs;
pub mod macrs;
pub mod payload;
pub mod residential;
pub mod workbook;

use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub use guidelines::Guidelines;
pub use macrs::BonusSchedule;
pub use payload::EstimatorPayload;

/// Estimator inputs keyed by spreadsheet cell (`B1`, `B31`, ...)
pub type Cells = BTreeMap<String, Value>;

/// Which estimator runs
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Residential,
    Commercial,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Residential => "residential",
            Mode::Commercial => "commercial",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "residential" => Ok(Mode::Residential),
            "commercial" => Ok(Mode::Commercial),
            other => Err(anyhow!("unknown mode: {other}")),
        }
    }
}

/// Largest magnitude accepted for a numeric estimator input
pub const MAX_INPUT: f64 = 1e12;

/// Reject numeric cells no real property could have
pub fn check_input_range(cells: &Cells) -> Result<()> {
    for (cell, value) in cells.iter().filter(|(k, _)| inputs::is_cell_ref(k)) {
        if let Some(x) = common::as_number(value) {
            if !x.is_finite() || x.abs() > MAX_INPUT {
                bail!("input {cell} is out of range: {value}");
            }
        }
    }
    Ok(())
}

/// Run the calculator for `mode` and shape the result for the workbook
///
/// Commercial estimates need the guideline table; residential ones ignore it. Inputs outside
/// `±MAX_INPUT` are an error rather than a nonsense estimate.
pub fn generate(
    mode: Mode,
    cells: &Cells,
    guidelines: Option<&Guidelines>,
    bonus: BonusSchedule,
    today: NaiveDate,
) -> Result<EstimatorPayload> {
    check_input_range(cells)?;
    match mode {
        Mode::Residential => {
            let result = residential::compute_residential(cells, bonus, today);
            Ok(payload::from_residential(&result))
        }
        Mode::Commercial => {
            let guidelines = guidelines
                .ok_or_else(|| anyhow!("commercial estimates need a guideline table"))?;
            let result = commercial::compute_commercial(cells, guidelines, bonus);
            Ok(payload::from_commercial(&result))
        }
    }
}
