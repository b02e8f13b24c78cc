/// MACRS depreciation tables, bonus depreciation and lookback schedules
///
/// The lookback replays depreciation from the year an asset was placed in service up to
/// the study tax year, so an estimate can show the catch-up a cost segregation study unlocks.
/// Rates come from the IRS MACRS tables: half-year convention for 5/7/15-year property and
/// mid-month convention for buildings.

use super::common::round_dollars;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// 5-year property, 200% declining balance, half-year convention
const MACRS_5_YEAR: [f64; 6] = [0.2000, 0.3200, 0.1920, 0.1152, 0.1152, 0.0576];

/// 7-year property, 200% declining balance, half-year convention
const MACRS_7_YEAR: [f64; 8] = [
    0.1429, 0.2449, 0.1749, 0.1249, 0.0893, 0.0892, 0.0893, 0.0446,
];

/// 15-year property, 150% declining balance, half-year convention
const MACRS_15_YEAR: [f64; 16] = [
    0.0500, 0.0950, 0.0855, 0.0770, 0.0693, 0.0623, 0.0590, 0.0590, 0.0591, 0.0590, 0.0591,
    0.0590, 0.0591, 0.0590, 0.0591, 0.0295,
];

/// 27.5-year residential rental property, mid-month convention: first year by month
const RESIDENTIAL_FIRST_YEAR: [f64; 12] = [
    0.03485, 0.03182, 0.02879, 0.02576, 0.02273, 0.01970, 0.01667, 0.01364, 0.01061, 0.00758,
    0.00455, 0.00152,
];
const RESIDENTIAL_FULL_YEAR: f64 = 0.03636;
const RESIDENTIAL_YEAR_28: [f64; 12] = [
    0.01970, 0.02273, 0.02576, 0.02879, 0.03182, 0.03485, 0.03636, 0.03636, 0.03636, 0.03636,
    0.03636, 0.03636,
];
const RESIDENTIAL_YEAR_29: [f64; 12] = [
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.00152, 0.00455, 0.00758, 0.01061, 0.01364, 0.01667,
];

/// 39-year nonresidential real property, mid-month convention
const NONRESIDENTIAL_FIRST_YEAR: [f64; 12] = [
    0.02461, 0.02247, 0.02033, 0.01819, 0.01605, 0.01391, 0.01177, 0.00963, 0.00749, 0.00535,
    0.00321, 0.00107,
];
const NONRESIDENTIAL_FULL_YEAR: f64 = 0.02564;
const NONRESIDENTIAL_YEAR_40: [f64; 12] = [
    0.00107, 0.00321, 0.00535, 0.00749, 0.00963, 0.01177, 0.01391, 0.01605, 0.01819, 0.02033,
    0.02247, 0.02461,
];

/// Statutory bonus depreciation windows (inclusive start, inclusive end, rate)
const STATUTORY_BONUS: [((i32, u32, u32), (i32, u32, u32), f64); 12] = [
    ((1900, 1, 1), (2001, 9, 10), 0.0),
    ((2001, 9, 11), (2003, 5, 5), 0.30),
    ((2003, 5, 6), (2004, 12, 31), 0.50),
    ((2005, 1, 1), (2007, 12, 31), 0.0),
    ((2008, 1, 1), (2010, 9, 8), 0.50),
    ((2010, 9, 9), (2011, 12, 31), 1.0),
    ((2012, 1, 1), (2017, 9, 27), 0.50),
    ((2017, 9, 28), (2022, 12, 31), 1.0),
    ((2023, 1, 1), (2023, 12, 31), 0.80),
    ((2024, 1, 1), (2024, 12, 31), 0.60),
    ((2025, 1, 1), (2025, 1, 19), 0.40),
    ((2025, 1, 20), (2099, 12, 31), 0.0),
];

/// Flat bonus rate used by the legacy estimator workbooks
pub const DEFAULT_FLAT_BONUS: f64 = 0.8;

/// How bonus depreciation is chosen for 5/7/15-year property
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rate", rename_all = "lowercase")]
pub enum BonusSchedule {
    /// Same rate regardless of the in-service date
    Flat(f64),
    /// Rate looked up from the statutory in-service windows
    Statutory,
}

impl Default for BonusSchedule {
    fn default() -> Self {
        BonusSchedule::Flat(DEFAULT_FLAT_BONUS)
    }
}

impl BonusSchedule {
    /// Parse `statutory`, `flat` or a bare rate such as `0.6`
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_lowercase();
        match raw.as_str() {
            "statutory" => Some(BonusSchedule::Statutory),
            "flat" | "" => Some(BonusSchedule::default()),
            other => other
                .parse::<f64>()
                .ok()
                .filter(|r| (0.0..=1.0).contains(r))
                .map(BonusSchedule::Flat),
        }
    }

    /// Bonus rate for property placed in service on `date`
    pub fn rate_for(&self, date: NaiveDate) -> f64 {
        match self {
            BonusSchedule::Flat(rate) => *rate,
            BonusSchedule::Statutory => STATUTORY_BONUS
                .iter()
                .find(|(start, end, _)| {
                    let start = NaiveDate::from_ymd_opt(start.0, start.1, start.2);
                    let end = NaiveDate::from_ymd_opt(end.0, end.1, end.2);
                    matches!((start, end), (Some(s), Some(e)) if s <= date && date <= e)
                })
                .map(|(_, _, rate)| *rate)
                .unwrap_or(0.0),
        }
    }
}

/// Recovery class of an allocated amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetClass {
    /// Real property on the mid-month tables (27.5-year if residential, else 39-year)
    Building { residential: bool },
    FiveYear,
    SevenYear,
    FifteenYear,
}

impl AssetClass {
    /// Number of calendar years carrying depreciation
    pub fn recovery_rows(&self) -> u32 {
        match self {
            AssetClass::Building { residential: true } => 29,
            AssetClass::Building { residential: false } => 40,
            AssetClass::FiveYear => MACRS_5_YEAR.len() as u32,
            AssetClass::SevenYear => MACRS_7_YEAR.len() as u32,
            AssetClass::FifteenYear => MACRS_15_YEAR.len() as u32,
        }
    }

    /// Depreciation rate for the 1-based recovery year
    pub fn rate(&self, year_index: u32, in_service_month: u32) -> f64 {
        match self {
            AssetClass::Building { residential } => {
                building_rate(year_index, in_service_month, *residential)
            }
            AssetClass::FiveYear => table_rate(&MACRS_5_YEAR, year_index),
            AssetClass::SevenYear => table_rate(&MACRS_7_YEAR, year_index),
            AssetClass::FifteenYear => table_rate(&MACRS_15_YEAR, year_index),
        }
    }

    fn takes_bonus(&self) -> bool {
        !matches!(self, AssetClass::Building { .. })
    }
}

fn table_rate(table: &[f64], year_index: u32) -> f64 {
    if year_index == 0 {
        return 0.0;
    }
    table.get(year_index as usize - 1).copied().unwrap_or(0.0)
}

/// Mid-month building rate for a recovery year and in-service month
pub fn building_rate(year_index: u32, in_service_month: u32, residential: bool) -> f64 {
    let m = in_service_month.clamp(1, 12) as usize - 1;
    if residential {
        match year_index {
            1 => RESIDENTIAL_FIRST_YEAR[m],
            2..=27 => RESIDENTIAL_FULL_YEAR,
            28 => RESIDENTIAL_YEAR_28[m],
            29 => RESIDENTIAL_YEAR_29[m],
            _ => 0.0,
        }
    } else {
        match year_index {
            1 => NONRESIDENTIAL_FIRST_YEAR[m],
            2..=39 => NONRESIDENTIAL_FULL_YEAR,
            40 => NONRESIDENTIAL_YEAR_40[m],
            _ => 0.0,
        }
    }
}

/// One calendar year of a lookback schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookbackYearRow {
    pub calendar_year: i32,
    pub depreciation_year: u32,
    pub rate: f64,
    pub depreciation: i64,
    pub cumulative: i64,
}

/// Depreciation replayed from the in-service year to the study year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookbackResult {
    pub original_basis: i64,
    pub bonus_rate: f64,
    pub bonus_amount: i64,
    pub depreciable_basis: i64,
    pub current_year_depreciation: i64,
    pub cumulative_depreciation: i64,
    pub net_book_value: i64,
    pub year_by_year: Vec<LookbackYearRow>,
}

impl LookbackResult {
    fn empty(basis: i64) -> Self {
        Self {
            original_basis: basis,
            bonus_rate: 0.0,
            bonus_amount: 0,
            depreciable_basis: basis.max(0),
            current_year_depreciation: 0,
            cumulative_depreciation: 0,
            net_book_value: basis,
            year_by_year: Vec::new(),
        }
    }
}

/// Replay depreciation for one allocated amount
///
/// Bonus applies to 5/7/15-year property only and lands in the in-service year.
/// Each annual amount is ROUND(depreciable_basis * rate); the cumulative total
/// includes the bonus.
pub fn compute_lookback(
    basis: f64,
    in_service: NaiveDate,
    study_year: i32,
    asset: AssetClass,
    bonus: BonusSchedule,
) -> LookbackResult {
    let basis = round_dollars(basis);
    if basis <= 0 || study_year < in_service.year() {
        return LookbackResult::empty(basis);
    }

    let (bonus_rate, bonus_amount) = if asset.takes_bonus() {
        let rate = bonus.rate_for(in_service);
        (rate, round_dollars(basis as f64 * rate))
    } else {
        (0.0, 0)
    };
    let depreciable_basis = basis - bonus_amount;

    let mut cumulative = bonus_amount;
    let mut current_year_depreciation = 0;
    let mut rows = Vec::new();

    for (offset, calendar_year) in (in_service.year()..=study_year).enumerate() {
        let year_index = offset as u32 + 1;
        if year_index > asset.recovery_rows() {
            break;
        }
        let rate = asset.rate(year_index, in_service.month());
        let depreciation = round_dollars(depreciable_basis as f64 * rate);
        cumulative += depreciation;
        if calendar_year == study_year {
            current_year_depreciation = depreciation;
        }
        rows.push(LookbackYearRow {
            calendar_year,
            depreciation_year: year_index,
            rate,
            depreciation,
            cumulative,
        });
    }

    LookbackResult {
        original_basis: basis,
        bonus_rate,
        bonus_amount,
        depreciable_basis,
        current_year_depreciation,
        cumulative_depreciation: cumulative,
        net_book_value: basis - cumulative,
        year_by_year: rows,
    }
}

/// Sum of current-year, cumulative and prior-year depreciation across asset classes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LookbackTotals {
    pub current_year: i64,
    pub cumulative: i64,
    pub prior_years: i64,
}

impl LookbackTotals {
    /// Prior-year catch-up only exists once the asset has been in service more than a year
    pub fn from_results<'a>(
        results: impl IntoIterator<Item = &'a LookbackResult>,
        years_in_service: i32,
    ) -> Self {
        let (current_year, cumulative) = results.into_iter().fold((0, 0), |(cur, cum), r| {
            (
                cur + r.current_year_depreciation,
                cum + r.cumulative_depreciation,
            )
        });
        let prior_years = if years_in_service > 1 {
            cumulative - current_year
        } else {
            0
        };
        Self {
            current_year,
            cumulative,
            prior_years,
        }
    }
}
