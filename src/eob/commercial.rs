/// Commercial EOB calculator
///
/// Allocates the basis to 39/15/7/5-year property using the guideline fractions for the
/// property type, rounds each share Excel-style and pushes the rounding residual into the
/// 39-year amount so the shares add back up to the basis exactly.

use super::common::{as_number, parse_date, parse_year, round_dollars};
use super::guidelines::Guidelines;
use super::macrs::{compute_lookback, AssetClass, BonusSchedule, LookbackResult, LookbackTotals};
use super::Cells;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use serde_json::{json, Value};

fn default_cells() -> Cells {
    [("B1", json!(1_000_000.0)), ("B2", json!("Bank"))]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Guideline fractions (p) and rounded dollar amounts (A) per recovery class
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassSplit {
    pub p39: f64,
    pub p15: f64,
    pub p7: f64,
    pub p5: f64,
    pub p_accel: f64,
    pub a39: i64,
    pub a15: i64,
    pub a7: i64,
    pub a5: i64,
    /// Effective shares after rounding (s = A / basis)
    pub s39: f64,
    pub s15: f64,
    pub s7: f64,
    pub s5: f64,
    pub s_accel: f64,
}

impl ClassSplit {
    pub fn accelerated(&self) -> i64 {
        self.a15 + self.a7 + self.a5
    }

    pub fn total(&self) -> i64 {
        self.a39 + self.accelerated()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommercialLookback {
    pub in_service: NaiveDate,
    pub study_year: i32,
    pub years_in_service: i32,
    pub building: LookbackResult,
    pub fifteen_year: LookbackResult,
    pub seven_year: LookbackResult,
    pub five_year: LookbackResult,
    pub totals: LookbackTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommercialResult {
    pub inputs: Cells,
    pub basis: f64,
    pub lookup_failed: bool,
    pub matched_property_type: Option<String>,
    pub dep_life: Option<Value>,
    pub split: ClassSplit,
    pub lookback: Option<CommercialLookback>,
}

fn merge_defaults(inputs: &Cells) -> Cells {
    let mut merged = default_cells();
    for (k, v) in inputs {
        if v.is_null() && merged.contains_key(k) {
            continue;
        }
        merged.insert(k.clone(), v.clone());
    }
    merged
}

/// Commercial lookback needs both the in-service date and the study year
fn commercial_lookback_window(cells: &Cells) -> Option<(NaiveDate, i32)> {
    let in_service = cells.get("B32").and_then(parse_date)?;
    let study_year = cells.get("B34").and_then(parse_year)?;
    Some((in_service, study_year))
}

/// Compute the commercial estimate
///
/// An unknown or blank property type yields an all-zero result with `lookup_failed` set.
pub fn compute_commercial(
    inputs: &Cells,
    guidelines: &Guidelines,
    bonus: BonusSchedule,
) -> CommercialResult {
    let b = merge_defaults(inputs);
    let basis = b.get("B1").and_then(as_number).unwrap_or(0.0).max(0.0);
    let property_type = match b.get("B2") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let Some(row) = guidelines.match_property_type(&property_type) else {
        tracing::warn!("⚠️ No guideline row for property type '{}'", property_type);
        return CommercialResult {
            inputs: b,
            basis,
            lookup_failed: true,
            matched_property_type: None,
            dep_life: None,
            split: ClassSplit::default(),
            lookback: None,
        };
    };

    let a5 = round_dollars(basis * row.p5);
    let a7 = round_dollars(basis * row.p7);
    let a15 = round_dollars(basis * row.p15);
    let mut a39 = round_dollars(basis * row.p39);
    let residual = round_dollars(basis - (a5 + a7 + a15 + a39) as f64);
    a39 += residual;

    let share = |amount: i64| if basis > 0.0 { amount as f64 / basis } else { 0.0 };
    let split = ClassSplit {
        p39: row.p39,
        p15: row.p15,
        p7: row.p7,
        p5: row.p5,
        p_accel: row.total_accelerated,
        a39,
        a15,
        a7,
        a5,
        s39: share(a39),
        s15: share(a15),
        s7: share(a7),
        s5: share(a5),
        s_accel: share(a5) + share(a7) + share(a15),
    };

    let lookback = commercial_lookback_window(&b).map(|(in_service, study_year)| {
        let years_in_service = (study_year - in_service.year() + 1).max(0);
        let run = |amount: i64, asset: AssetClass| {
            compute_lookback(amount as f64, in_service, study_year, asset, bonus)
        };
        let building = run(split.a39, AssetClass::Building { residential: false });
        let fifteen_year = run(split.a15, AssetClass::FifteenYear);
        let seven_year = run(split.a7, AssetClass::SevenYear);
        let five_year = run(split.a5, AssetClass::FiveYear);
        let totals = LookbackTotals::from_results(
            [&building, &fifteen_year, &seven_year, &five_year],
            years_in_service,
        );
        CommercialLookback {
            in_service,
            study_year,
            years_in_service,
            building,
            fifteen_year,
            seven_year,
            five_year,
            totals,
        }
    });

    CommercialResult {
        inputs: b,
        basis,
        lookup_failed: false,
        matched_property_type: Some(row.property_type.clone()),
        dep_life: row.dep_life.clone(),
        split,
        lookback,
    }
}
