/// Estimator payload: the summary block and the yearly depreciation table the workbook shows

use super::commercial::CommercialResult;
use super::common::as_number;
use super::macrs::LookbackResult;
use super::residential::ResidentialResult;
use super::Cells;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

pub const TAX_RATE: f64 = 0.40;
pub const LAND_ALLOCATION_TEXT: &str = "Per Depreciation Schedule";

const ADDRESS_KEYS: [&str; 3] = ["Property Address", "property_address", "Address"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateSummary {
    pub property_address: String,
    pub building_use: String,
    pub date_placed_in_service: Option<NaiveDate>,
    pub cost_basis: f64,
    pub land_allocation_text: Option<String>,
    pub land_allocation_amount: Option<f64>,
    pub building_basis: i64,
    pub improvements_included: i64,
    pub basis_for_cost_segregation: i64,
    pub total_accelerated: i64,
    pub tax_savings_40pct_total_accel: f64,
    pub estimated_additional_depr: i64,
    pub tax_savings_40pct_addl_depr: f64,
}

/// One calendar year of the depreciation table
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct YearRow {
    #[serde(rename = "5yr")]
    pub five_year: i64,
    #[serde(rename = "7yr")]
    pub seven_year: i64,
    #[serde(rename = "15yr")]
    pub fifteen_year: i64,
    pub long: i64,
    pub with_css: i64,
    pub without_css: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimatorPayload {
    pub summary: EstimateSummary,
    pub yearly: BTreeMap<i32, YearRow>,
}

impl EstimatorPayload {
    /// First table year: the in-service year, else the earliest scheduled year
    pub fn start_year(&self) -> Option<i32> {
        self.summary
            .date_placed_in_service
            .map(|d| d.year())
            .or_else(|| self.yearly.keys().next().copied())
    }
}

#[derive(Clone, Copy)]
enum Column {
    FiveYear,
    SevenYear,
    FifteenYear,
    Long,
}

/// Accumulates lookback schedules into the yearly table
#[derive(Default)]
struct YearlyTable {
    rows: BTreeMap<i32, YearRow>,
}

impl YearlyTable {
    /// Add one schedule; the bonus lands in the in-service year
    ///
    /// The table shows the full depreciation schedule, so year 1 carries the bonus on top of
    /// that year's MACRS amount, unlike the per-year rows of a `LookbackResult`.
    fn add(&mut self, column: Column, lookback: &LookbackResult) {
        for (i, row) in lookback.year_by_year.iter().enumerate() {
            let amount = if i == 0 {
                row.depreciation + lookback.bonus_amount
            } else {
                row.depreciation
            };
            let entry = self.rows.entry(row.calendar_year).or_default();
            match column {
                Column::FiveYear => entry.five_year += amount,
                Column::SevenYear => entry.seven_year += amount,
                Column::FifteenYear => entry.fifteen_year += amount,
                Column::Long => entry.long += amount,
            }
        }
    }

    fn finish(mut self) -> BTreeMap<i32, YearRow> {
        for row in self.rows.values_mut() {
            row.with_css = row.five_year + row.seven_year + row.fifteen_year + row.long;
            row.without_css = row.long;
        }
        self.rows
    }
}

fn property_address(inputs: &Cells) -> String {
    ADDRESS_KEYS
        .iter()
        .filter_map(|k| inputs.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

fn tax_savings(amount: i64) -> f64 {
    amount as f64 * TAX_RATE
}

fn summary_totals(current_year: i64, prior_years: i64) -> (i64, f64, i64, f64) {
    (
        current_year,
        tax_savings(current_year),
        prior_years,
        tax_savings(prior_years),
    )
}

pub fn from_residential(result: &ResidentialResult) -> EstimatorPayload {
    let inputs = &result.inputs;
    let lookback = result.lookback.as_ref();
    let totals = lookback.map(|lb| lb.totals).unwrap_or_default();
    let (total_accelerated, savings_total, additional, savings_additional) =
        summary_totals(totals.current_year, totals.prior_years);

    let allocation = &result.allocation;
    let summary = EstimateSummary {
        property_address: property_address(inputs),
        building_use: result.building_type.display_name().to_string(),
        date_placed_in_service: lookback.map(|lb| lb.in_service),
        cost_basis: result.basis,
        land_allocation_text: Some(LAND_ALLOCATION_TEXT.to_string()),
        land_allocation_amount: None,
        building_basis: allocation.building,
        improvements_included: allocation.five_year + allocation.fifteen_year,
        basis_for_cost_segregation: allocation.building
            + allocation.five_year
            + allocation.fifteen_year,
        total_accelerated,
        tax_savings_40pct_total_accel: savings_total,
        estimated_additional_depr: additional,
        tax_savings_40pct_addl_depr: savings_additional,
    };

    let mut table = YearlyTable::default();
    if let Some(lb) = lookback {
        table.add(Column::Long, &lb.building);
        table.add(Column::FiveYear, &lb.five_year);
        table.add(Column::FifteenYear, &lb.fifteen_year);
    }

    EstimatorPayload {
        summary,
        yearly: table.finish(),
    }
}

pub fn from_commercial(result: &CommercialResult) -> EstimatorPayload {
    let inputs = &result.inputs;
    let lookback = result.lookback.as_ref();
    let totals = lookback.map(|lb| lb.totals).unwrap_or_default();
    let (total_accelerated, savings_total, additional, savings_additional) =
        summary_totals(totals.current_year, totals.prior_years);

    let split = &result.split;
    let summary = EstimateSummary {
        property_address: property_address(inputs),
        building_use: result
            .matched_property_type
            .clone()
            .unwrap_or_else(|| "Commercial".to_string()),
        date_placed_in_service: lookback.map(|lb| lb.in_service),
        cost_basis: inputs.get("B1").and_then(as_number).unwrap_or(result.basis),
        land_allocation_text: Some(LAND_ALLOCATION_TEXT.to_string()),
        land_allocation_amount: None,
        building_basis: split.a39,
        improvements_included: split.accelerated(),
        basis_for_cost_segregation: split.total(),
        total_accelerated,
        tax_savings_40pct_total_accel: savings_total,
        estimated_additional_depr: additional,
        tax_savings_40pct_addl_depr: savings_additional,
    };

    let mut table = YearlyTable::default();
    if let Some(lb) = lookback {
        table.add(Column::Long, &lb.building);
        table.add(Column::FifteenYear, &lb.fifteen_year);
        table.add(Column::SevenYear, &lb.seven_year);
        table.add(Column::FiveYear, &lb.five_year);
    }

    EstimatorPayload {
        summary,
        yearly: table.finish(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eob::commercial::compute_commercial;
    use crate::eob::guidelines::{GuidelineRow, Guidelines};
    use crate::eob::macrs::BonusSchedule;
    use crate::eob::residential::compute_residential;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    #[test]
    fn test_residential_without_lookback_has_empty_table() {
        let result = compute_residential(&Cells::new(), BonusSchedule::default(), today());
        let payload = from_residential(&result);
        assert!(payload.yearly.is_empty());
        assert_eq!(payload.start_year(), None);
        assert_eq!(payload.summary.building_use, "Single Family Residence");
        assert_eq!(payload.summary.cost_basis, 300_000.0);
        assert_eq!(payload.summary.total_accelerated, 0);
        assert_eq!(
            payload.summary.basis_for_cost_segregation,
            payload.summary.building_basis + payload.summary.improvements_included
        );
    }

    #[test]
    fn test_residential_table_and_savings() {
        let mut inputs = Cells::new();
        inputs.insert("B32".into(), json!("2022-04-01"));
        inputs.insert("B34".into(), json!(2025));
        inputs.insert("Property Address".into(), json!(" 12 Elm St "));
        let result = compute_residential(&inputs, BonusSchedule::default(), today());
        let payload = from_residential(&result);
        let lb = result.lookback.as_ref().unwrap();

        assert_eq!(payload.summary.property_address, "12 Elm St");
        assert_eq!(payload.start_year(), Some(2022));
        assert_eq!(payload.yearly.len(), 4);

        let first = payload.yearly[&2022];
        assert_eq!(
            first.five_year,
            lb.five_year.year_by_year[0].depreciation + lb.five_year.bonus_amount
        );
        assert_eq!(first.without_css, first.long);
        assert_eq!(
            first.with_css,
            first.five_year + first.seven_year + first.fifteen_year + first.long
        );
        assert_eq!(first.seven_year, 0);

        assert_eq!(payload.summary.total_accelerated, lb.totals.current_year);
        assert_eq!(payload.summary.estimated_additional_depr, lb.totals.prior_years);
        assert!(
            (payload.summary.tax_savings_40pct_total_accel - lb.totals.current_year as f64 * 0.4)
                .abs()
                < 1e-6
        );
    }

    #[test]
    fn test_commercial_summary_lines() {
        let guidelines = Guidelines::new(vec![GuidelineRow::new("Bank", 0.7, 0.1, 0.05, 0.15)]);
        let mut inputs = Cells::new();
        inputs.insert("B32".into(), json!("2020-01-15"));
        inputs.insert("B34".into(), json!(2024));
        let result = compute_commercial(&inputs, &guidelines, BonusSchedule::default());
        let payload = from_commercial(&result);

        assert_eq!(payload.summary.building_use, "Bank");
        assert_eq!(payload.summary.building_basis, 700_000);
        assert_eq!(payload.summary.improvements_included, 300_000);
        assert_eq!(payload.summary.basis_for_cost_segregation, 1_000_000);
        assert_eq!(payload.yearly.len(), 5);
        let row = payload.yearly[&2021];
        assert!(row.seven_year > 0);
        assert!(row.long > 0);
    }

    #[test]
    fn test_year_row_serialises_with_short_keys() {
        let row = YearRow {
            five_year: 1,
            seven_year: 2,
            fifteen_year: 3,
            long: 4,
            with_css: 10,
            without_css: 4,
        };
        let value = serde_json::to_value(row).unwrap();
        assert_eq!(value["5yr"], 1);
        assert_eq!(value["7yr"], 2);
        assert_eq!(value["15yr"], 3);
        assert_eq!(value["with_css"], 10);
    }
}
