/// Workbook writer: renders an estimator payload as a single-sheet xlsx

use super::payload::EstimatorPayload;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::path::Path;
use thiserror::Error;

pub const SHEET_NAME: &str = "EOB Estimator";

/// Last calendar year the depreciation table runs to
pub const TABLE_LAST_YEAR: i32 = 2052;

/// Zero-based (row, column) of a summary cell
type CellRef = (u32, u16);

const PROPERTY_ADDRESS: CellRef = (8, 6); // G9
const BUILDING_USE: CellRef = (9, 6); // G10
const DATE_IN_SERVICE: CellRef = (10, 5); // F11
const COST_BASIS: CellRef = (11, 6); // G12
const LAND_ALLOCATION_TEXT: CellRef = (12, 3); // D13
const LAND_ALLOCATION_AMOUNT: CellRef = (12, 6); // G13
const BUILDING_BASIS: CellRef = (13, 6); // G14
const IMPROVEMENTS_INCLUDED: CellRef = (14, 6); // G15
const BASIS_FOR_COST_SEG: CellRef = (15, 6); // G16
const TOTAL_ACCELERATED: CellRef = (18, 6); // G19
const TAX_SAVINGS_TOTAL: CellRef = (19, 6); // G20
const ESTIMATED_ADDL_DEPR: CellRef = (21, 6); // G22
const TAX_SAVINGS_ADDL: CellRef = (22, 6); // G23

/// Row 27 in the sheet
const TABLE_START_ROW: u32 = 26;
const TABLE_HEADER_ROW: u32 = TABLE_START_ROW - 1;
const COL_YEAR: u16 = 1; // B
const COL_5YR: u16 = 2;
const COL_7YR: u16 = 3;
const COL_15YR: u16 = 4;
const COL_LONG: u16 = 5;
const COL_WITH_CSS: u16 = 6;
const COL_WITHOUT_CSS: u16 = 7; // H

const LABEL_COL: u16 = 1;

const SUMMARY_LABELS: [(u32, &str); 12] = [
    (8, "Property Address"),
    (9, "Building Use"),
    (10, "Date Placed in Service"),
    (11, "Cost Basis"),
    (12, "Land Allocation"),
    (13, "Building Basis"),
    (14, "Improvements Included"),
    (15, "Basis for Cost Segregation"),
    (18, "Total Accelerated Depreciation"),
    (19, "Tax Savings (40%)"),
    (21, "Estimated Additional Depreciation"),
    (22, "Tax Savings (40%)"),
];

const TABLE_HEADERS: [(u16, &str); 7] = [
    (COL_YEAR, "Year"),
    (COL_5YR, "5-Year"),
    (COL_7YR, "7-Year"),
    (COL_15YR, "15-Year"),
    (COL_LONG, "27.5/39-Year"),
    (COL_WITH_CSS, "With Cost Seg"),
    (COL_WITHOUT_CSS, "Without Cost Seg"),
];

#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("failed to build workbook: {0}")]
    Xlsx(#[from] XlsxError),
    #[error("failed to write workbook {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn write_money(
    ws: &mut Worksheet,
    cell: CellRef,
    value: f64,
    format: &Format,
) -> Result<(), XlsxError> {
    ws.write_number_with_format(cell.0, cell.1, value, format)?;
    Ok(())
}

fn fill_summary(ws: &mut Worksheet, payload: &EstimatorPayload) -> Result<(), XlsxError> {
    let bold = Format::new().set_bold();
    let money = Format::new().set_num_format("$#,##0");
    let summary = &payload.summary;

    ws.write_string_with_format(1, LABEL_COL, "Estimate of Benefits", &bold)?;
    for (row, label) in SUMMARY_LABELS {
        ws.write_string_with_format(row, LABEL_COL, label, &bold)?;
    }

    ws.write_string(PROPERTY_ADDRESS.0, PROPERTY_ADDRESS.1, &summary.property_address)?;
    ws.write_string(BUILDING_USE.0, BUILDING_USE.1, &summary.building_use)?;
    if let Some(date) = summary.date_placed_in_service {
        ws.write_string(
            DATE_IN_SERVICE.0,
            DATE_IN_SERVICE.1,
            date.format("%Y-%m-%d").to_string(),
        )?;
    }
    write_money(ws, COST_BASIS, summary.cost_basis, &money)?;
    if let Some(text) = &summary.land_allocation_text {
        ws.write_string(LAND_ALLOCATION_TEXT.0, LAND_ALLOCATION_TEXT.1, text)?;
    }
    if let Some(amount) = summary.land_allocation_amount {
        write_money(ws, LAND_ALLOCATION_AMOUNT, amount, &money)?;
    }
    write_money(ws, BUILDING_BASIS, summary.building_basis as f64, &money)?;
    write_money(
        ws,
        IMPROVEMENTS_INCLUDED,
        summary.improvements_included as f64,
        &money,
    )?;
    write_money(
        ws,
        BASIS_FOR_COST_SEG,
        summary.basis_for_cost_segregation as f64,
        &money,
    )?;
    write_money(ws, TOTAL_ACCELERATED, summary.total_accelerated as f64, &money)?;
    write_money(
        ws,
        TAX_SAVINGS_TOTAL,
        summary.tax_savings_40pct_total_accel,
        &money,
    )?;
    write_money(
        ws,
        ESTIMATED_ADDL_DEPR,
        summary.estimated_additional_depr as f64,
        &money,
    )?;
    write_money(ws, TAX_SAVINGS_ADDL, summary.tax_savings_40pct_addl_depr, &money)?;
    Ok(())
}

/// Yearly table from the start year through the last table year; missing years are zero
fn fill_table(ws: &mut Worksheet, payload: &EstimatorPayload) -> Result<(), XlsxError> {
    let bold = Format::new().set_bold();
    let money = Format::new().set_num_format("$#,##0");

    for (col, header) in TABLE_HEADERS {
        ws.write_string_with_format(TABLE_HEADER_ROW, col, header, &bold)?;
    }

    let Some(start_year) = payload.start_year() else {
        return Ok(());
    };
    if payload.yearly.is_empty() {
        return Ok(());
    }

    for (offset, year) in (start_year..=TABLE_LAST_YEAR).enumerate() {
        let row = TABLE_START_ROW + offset as u32;
        let values = payload.yearly.get(&year).copied().unwrap_or_default();
        ws.write_number(row, COL_YEAR, year as f64)?;
        for (col, amount) in [
            (COL_5YR, values.five_year),
            (COL_7YR, values.seven_year),
            (COL_15YR, values.fifteen_year),
            (COL_LONG, values.long),
            (COL_WITH_CSS, values.with_css),
            (COL_WITHOUT_CSS, values.without_css),
        ] {
            ws.write_number_with_format(row, col, amount as f64, &money)?;
        }
    }
    Ok(())
}

fn build(payload: &EstimatorPayload) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let ws = workbook.add_worksheet();
    ws.set_name(SHEET_NAME)?;
    ws.set_column_width(LABEL_COL, 34)?;
    for col in COL_5YR..=COL_WITHOUT_CSS {
        ws.set_column_width(col, 16)?;
    }
    fill_summary(ws, payload)?;
    fill_table(ws, payload)?;
    Ok(workbook)
}

/// Render the workbook into memory
pub fn render_workbook(payload: &EstimatorPayload) -> Result<Vec<u8>, WorkbookError> {
    let mut workbook = build(payload)?;
    Ok(workbook.save_to_buffer()?)
}

/// Render and write the workbook, creating parent directories
pub fn write_workbook(payload: &EstimatorPayload, path: &Path) -> Result<(), WorkbookError> {
    let bytes = render_workbook(payload)?;
    let io_err = |source| WorkbookError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, bytes).map_err(io_err)?;
    Ok(())
}
