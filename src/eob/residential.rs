/// Residential EOB calculator
///
/// Reproduces the residential estimator workbook section by section:
/// 1. site breakdown (flooring, landscape/hardscape/parking with a 70% site cap)
/// 2. allocation of the basis across building, 5-year and 15-year property
/// 3. 5-year property dollars by tier
/// 4. 15-year site improvement dollars
/// 5. building replacement cost
///
/// plus the optional depreciation lookback. Rounding order matters: every intermediate that
/// the workbook rounds is rounded here at the same step.

use super::common::{as_number, clamp01, excel_round, parse_date, parse_year, round_dollars};
use super::macrs::{compute_lookback, AssetClass, BonusSchedule, LookbackResult, LookbackTotals};
use super::Cells;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use serde_json::{json, Value};

const SQFT_PER_ACRE: f64 = 43_560.0;
const SITE_CAP: f64 = 0.70;
const MFR_NATIONAL_AVG_PER_SF: f64 = 200.0;

/// Per-tier unit rates for section 3 (D17..D21)
#[derive(Debug, Clone, Copy)]
struct TierRates {
    per_tenant: f64,
    per_bedroom: f64,
    per_bathroom: f64,
    per_flooring_sf: f64,
    per_solar: f64,
}

fn tier_rates(tier: &str) -> Option<TierRates> {
    let (per_tenant, per_flooring_sf) = match tier {
        "SFR$" => (21_638.0, 4.0),
        "SFR$$" => (28_565.0, 11.0),
        "SFR$$$" => (32_691.0, 11.0),
        _ => return None,
    };
    Some(TierRates {
        per_tenant,
        per_bedroom: 257.0,
        per_bathroom: 283.0,
        per_flooring_sf,
        per_solar: 15_300.0,
    })
}

const MFR_TIERS: [&str; 3] = ["MFR$", "MFR$$", "MFR$$$"];

fn default_cells() -> Cells {
    [
        ("B1", json!(2000.0)),
        ("B2", json!(0.22)),
        ("B3", json!(3.0)),
        ("B4", json!(2.0)),
        ("B5", json!(1.0)),
        ("B6", json!(1.0)),
        ("B7", json!(0.60)),
        ("B8", json!(0.10)),
        ("B9", json!(0.00)),
        ("B10", json!(0.00)),
        ("B11", json!(0.00)),
        ("B12", json!(300_000.0)),
        ("B28", json!(130.0)),
        ("B31", json!("SFR$")),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuildingType {
    #[serde(rename = "SFR")]
    SingleFamily,
    #[serde(rename = "MFR")]
    MultiFamily,
}

impl BuildingType {
    pub fn display_name(&self) -> &'static str {
        match self {
            BuildingType::SingleFamily => "Single Family Residence",
            BuildingType::MultiFamily => "Multi-Family Residence",
        }
    }
}

/// Section 1: site areas
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteBreakdown {
    /// C6: flooring square feet (interior SF x flooring fraction)
    pub flooring_sf: i64,
    pub area_sf: i64,
    pub landscape_ac: f64,
    pub hardscape_ac: f64,
    pub parking_ac: f64,
    pub landscape_sf: i64,
    pub hardscape_sf: i64,
    pub parking_sf: i64,
}

/// Section 3: 5-year property dollars (D17..D22)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiveYearProperty {
    pub tenant: i64,
    pub bedrooms: i64,
    pub bathrooms: i64,
    pub flooring: i64,
    pub solar: i64,
    pub total: i64,
}

/// Section 4: 15-year property dollars (D23..D27)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FifteenYearProperty {
    pub other: i64,
    pub landscape: i64,
    pub hardscape: i64,
    pub parking: i64,
    pub total: i64,
}

/// Section 5: building (D28..D30)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingCost {
    pub replacement: i64,
    pub less_five_year: i64,
    pub net: i64,
}

/// Section 2: allocation of the basis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    /// B13..B16: estimator-dollar weights
    pub building_weight: i64,
    pub five_year_weight: i64,
    pub fifteen_year_weight: i64,
    pub total_weight: i64,
    /// C13..C16: percentages, two decimals
    pub building_pct: f64,
    pub five_year_pct: f64,
    pub fifteen_year_pct: f64,
    pub accelerated_pct: f64,
    /// D13..D16: basis dollars per class
    pub building: i64,
    pub five_year: i64,
    pub fifteen_year: i64,
    pub accelerated: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidentialLookback {
    pub in_service: NaiveDate,
    pub study_year: i32,
    pub years_in_service: i32,
    pub building: LookbackResult,
    pub five_year: LookbackResult,
    pub fifteen_year: LookbackResult,
    pub totals: LookbackTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidentialResult {
    /// Effective cells after defaults and tier logic
    pub inputs: Cells,
    pub tier_display: String,
    pub building_type: BuildingType,
    pub basis: f64,
    pub site: SiteBreakdown,
    pub five_year: FiveYearProperty,
    pub fifteen_year: FifteenYearProperty,
    pub building: BuildingCost,
    pub allocation: Allocation,
    pub lookback: Option<ResidentialLookback>,
}

/// Normalise the tier; MFR tiers reuse the SFR rates at a higher $/SF
fn apply_tier_logic(cells: &mut Cells) -> (String, BuildingType) {
    let raw = match cells.get("B31") {
        Some(Value::String(s)) => s.trim().to_uppercase(),
        Some(Value::Null) | None => "SFR$".to_string(),
        Some(other) => other.to_string().to_uppercase(),
    };

    if MFR_TIERS.contains(&raw.as_str()) {
        let suffix = &raw[3..];
        cells.insert("B31".to_string(), json!(format!("SFR{suffix}")));
        cells.insert("B28".to_string(), json!(MFR_NATIONAL_AVG_PER_SF));
        (raw, BuildingType::MultiFamily)
    } else if tier_rates(&raw).is_none() {
        cells.insert("B31".to_string(), json!("SFR$"));
        ("SFR$".to_string(), BuildingType::SingleFamily)
    } else {
        cells.insert("B31".to_string(), json!(raw.clone()));
        (raw, BuildingType::SingleFamily)
    }
}

fn number(cells: &Cells, key: &str) -> f64 {
    cells.get(key).and_then(as_number).unwrap_or(0.0)
}

/// Merge inputs over defaults; explicit nulls do not erase a default
fn merge_defaults(defaults: Cells, inputs: &Cells) -> Cells {
    let mut merged = defaults;
    for (k, v) in inputs {
        if v.is_null() && merged.contains_key(k) {
            continue;
        }
        merged.insert(k.clone(), v.clone());
    }
    merged
}

/// Resolve lookback dates: active when either a date or a study year is given
fn residential_lookback_window(cells: &Cells, today: NaiveDate) -> Option<(NaiveDate, i32)> {
    let in_service = cells.get("B32").and_then(parse_date);
    let study_year = cells.get("B34").and_then(parse_year);
    match (in_service, study_year) {
        (None, None) => None,
        (Some(d), Some(y)) => Some((d, y)),
        (Some(d), None) => Some((d, today.year())),
        (None, Some(y)) => NaiveDate::from_ymd_opt(y, 1, 1).map(|d| (d, y)),
    }
}

/// Compute the residential estimate
///
/// `today` supplies the study year when only an in-service date is given.
pub fn compute_residential(
    inputs: &Cells,
    bonus: BonusSchedule,
    today: NaiveDate,
) -> ResidentialResult {
    let mut b = merge_defaults(default_cells(), inputs);
    let (tier_display, building_type) = apply_tier_logic(&mut b);

    let interior_sf = number(&b, "B1");
    let site_acres = number(&b, "B2");
    let bedrooms = number(&b, "B3");
    let bathrooms = number(&b, "B4");
    let tenants = number(&b, "B5");
    let flooring_frac = clamp01(number(&b, "B6"));
    let landscape_frac = clamp01(number(&b, "B7"));
    let hardscape_frac = clamp01(number(&b, "B8"));
    let parking_frac = clamp01(number(&b, "B9"));
    let solar = number(&b, "B10");
    let basis = number(&b, "B12");
    let national_avg = number(&b, "B28");

    // Section 1
    let flooring_sf = round_dollars(interior_sf * flooring_frac);

    let site_sum = landscape_frac + hardscape_frac + parking_frac;
    let (p7, p8, p9) = if site_sum <= SITE_CAP + 1e-12 {
        (landscape_frac, hardscape_frac, parking_frac)
    } else {
        let f = SITE_CAP / site_sum;
        (landscape_frac * f, hardscape_frac * f, parking_frac * f)
    };

    let area_sf = round_dollars(site_acres * SQFT_PER_ACRE);
    let site = SiteBreakdown {
        flooring_sf,
        area_sf,
        landscape_ac: excel_round(p7 * site_acres, 2),
        hardscape_ac: excel_round(p8 * site_acres, 2),
        parking_ac: excel_round(p9 * site_acres, 2),
        landscape_sf: round_dollars(p7 * area_sf as f64),
        hardscape_sf: round_dollars(p8 * area_sf as f64),
        parking_sf: round_dollars(p9 * area_sf as f64),
    };

    // Section 3
    let tier = b.get("B31").and_then(Value::as_str).unwrap_or("SFR$");
    let rates = tier_rates(tier).or_else(|| tier_rates("SFR$"));
    let five_year = match rates {
        Some(r) => {
            let tenant = round_dollars(r.per_tenant * tenants);
            let bedrooms = round_dollars(r.per_bedroom * bedrooms);
            let bathrooms = round_dollars(r.per_bathroom * bathrooms);
            let flooring = round_dollars(r.per_flooring_sf * flooring_sf as f64);
            let solar = round_dollars(r.per_solar * solar);
            FiveYearProperty {
                tenant,
                bedrooms,
                bathrooms,
                flooring,
                solar,
                total: tenant + bedrooms + bathrooms + flooring + solar,
            }
        }
        None => FiveYearProperty {
            tenant: 0,
            bedrooms: 0,
            bathrooms: 0,
            flooring: 0,
            solar: 0,
            total: 0,
        },
    };

    // Section 4: rounded square feet first, then rate, then ROUND
    let landscape = round_dollars(2.786 * site.landscape_sf as f64);
    let hardscape = round_dollars(8.0 * site.hardscape_sf as f64);
    let parking = round_dollars(7.87 * site.parking_sf as f64);
    let fifteen_year = FifteenYearProperty {
        other: 0,
        landscape,
        hardscape,
        parking,
        total: landscape + hardscape + parking,
    };

    // Section 5
    let replacement = round_dollars(national_avg * interior_sf);
    let building = BuildingCost {
        replacement,
        less_five_year: -five_year.total,
        net: replacement - five_year.total,
    };

    // Section 2
    let building_weight = building.net;
    let five_year_weight = five_year.total;
    let fifteen_year_weight = fifteen_year.total;
    let total_weight = building_weight + five_year_weight + fifteen_year_weight;

    let (c13, c14, c15) = if total_weight > 0 {
        let t = total_weight as f64;
        (
            building_weight as f64 / t,
            five_year_weight as f64 / t,
            fifteen_year_weight as f64 / t,
        )
    } else {
        (0.0, 0.0, 0.0)
    };
    let c16 = c14 + c15;

    let d14 = round_dollars(c14 * basis);
    let d15 = round_dollars(c15 * basis);
    let allocation = Allocation {
        building_weight,
        five_year_weight,
        fifteen_year_weight,
        total_weight,
        building_pct: excel_round(c13 * 100.0, 2),
        five_year_pct: excel_round(c14 * 100.0, 2),
        fifteen_year_pct: excel_round(c15 * 100.0, 2),
        accelerated_pct: excel_round(c16 * 100.0, 2),
        building: round_dollars(c13 * basis),
        five_year: d14,
        fifteen_year: d15,
        accelerated: d14 + d15,
    };

    let lookback = residential_lookback_window(&b, today).map(|(in_service, study_year)| {
        let years_in_service = (study_year - in_service.year() + 1).max(0);
        let run = |amount: i64, asset: AssetClass| {
            compute_lookback(amount as f64, in_service, study_year, asset, bonus)
        };
        let building_lb = run(allocation.building, AssetClass::Building { residential: true });
        let five_lb = run(allocation.five_year, AssetClass::FiveYear);
        let fifteen_lb = run(allocation.fifteen_year, AssetClass::FifteenYear);
        let totals =
            LookbackTotals::from_results([&building_lb, &five_lb, &fifteen_lb], years_in_service);
        ResidentialLookback {
            in_service,
            study_year,
            years_in_service,
            building: building_lb,
            five_year: five_lb,
            fifteen_year: fifteen_lb,
            totals,
        }
    });

    ResidentialResult {
        inputs: b,
        tier_display,
        building_type,
        basis,
        site,
        five_year,
        fifteen_year,
        building,
        allocation,
        lookback,
    }
}
