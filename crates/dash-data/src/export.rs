//! CSV export of ticket tables.
//!
//! Cells are written with their display form: text as-is, numbers in
//! shortest round-trip form, timestamps as `%Y-%m-%d %H:%M:%S` (plus
//! fractional seconds when present) and nulls as empty fields. Loading and
//! cleaning an export yields the same table.

use std::io::Write;
use std::path::Path;

use chrono::NaiveDateTime;
use dash_core::error::{DashboardError, Result};
use dash_core::models::Table;
use tracing::info;

/// Write `table` as CSV, header first, columns in table order.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(table.columns())?;
    for row in table.rows() {
        wtr.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Render `table` as a CSV string.
pub fn to_csv_string(table: &Table) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf)?;
    String::from_utf8(buf).map_err(|e| DashboardError::Config(format!("CSV output is not UTF-8: {e}")))
}

/// Write `table` to the file at `path`, replacing any existing file.
pub fn export_csv(table: &Table, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_csv(table, file)?;
    info!("Exported {} tickets to {}", table.len(), path.display());
    Ok(())
}

/// Default download name for an export taken at `now`,
/// e.g. `connectwise_tickets_20240115_093000.csv`.
pub fn export_filename(now: NaiveDateTime) -> String {
    format!("connectwise_tickets_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
