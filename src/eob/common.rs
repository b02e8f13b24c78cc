/// Shared numeric and date helpers for the EOB calculators
///
/// Every amount in the estimator follows spreadsheet semantics, so rounding here is
/// Excel's ROUND (halves away from zero), never banker's rounding.

use chrono::{Duration, NaiveDate};
use serde_json::Value;

/// Day zero of the Excel serial date system (1900 leap-year bug included)
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Largest whole-dollar amount the calculators carry; sums of a few stay inside `i64`
pub const MAX_DOLLARS: f64 = 1e15;

/// Excel serial for 9999-12-31, the last date a workbook can hold
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Date formats accepted for placed-in-service dates, tried in order
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y", "%d/%m/%Y"];

/// Excel-style ROUND(x, ndigits)
///
/// Halves round away from zero. Non-finite inputs collapse to 0.
pub fn excel_round(x: f64, ndigits: i32) -> f64 {
    if !x.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(ndigits);
    let y = x * factor;
    let rounded = if y >= 0.0 {
        (y + 0.5).floor()
    } else {
        (y - 0.5).ceil()
    };
    rounded / factor
}

/// ROUND(x, 0) as a whole dollar amount, clamped to `±MAX_DOLLARS`
pub fn round_dollars(x: f64) -> i64 {
    excel_round(x, 0).clamp(-MAX_DOLLARS, MAX_DOLLARS) as i64
}

/// Clamp a fraction into [0, 1]; NaN becomes 0
pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Interpret a cell value as a number
///
/// Numbers pass through, numeric strings (commas, `$`, `%`) are parsed,
/// anything else is `None`.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(_) => match crate::eob::inputs::parse_scalar(value) {
            Value::Number(n) => n.as_f64(),
            _ => None,
        },
        _ => None,
    }
}

/// Parse a placed-in-service date
///
/// Accepts ISO and US/EU slash/dash strings, or an Excel serial number.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Number(n) => {
            let serial = n
                .as_f64()
                .filter(|f| f.is_finite() && f.abs() <= MAX_EXCEL_SERIAL)?;
            let (y, m, d) = EXCEL_EPOCH;
            NaiveDate::from_ymd_opt(y, m, d)?
                .checked_add_signed(Duration::try_days(serial.trunc() as i64)?)
        }
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        }
        _ => None,
    }
}

/// Parse a study tax year such as `2025`, `"2025"` or `"2,025"`
pub fn parse_year(value: &Value) -> Option<i32> {
    let year = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let cleaned = s.trim().replace(',', "");
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse::<f64>().ok()?
        }
        _ => return None,
    };
    (year.is_finite() && (1.0..10_000.0).contains(&year)).then(|| year.trunc() as i32)
}
