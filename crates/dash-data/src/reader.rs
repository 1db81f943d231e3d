//! CSV loading for helpdesk ticket exports.
//!
//! Every field is loaded as raw text (empty fields as null); typing happens
//! in the [`cleaner`](crate::cleaner). Structural CSV problems are fatal for
//! the whole file, there is no partial output.

use std::io::Read;
use std::path::Path;

use dash_core::error::{DashboardError, Result};
use dash_core::models::{Cell, Table};
use tracing::{debug, info};

use crate::cleaner::TableCleaner;

const BOM: char = '\u{feff}';

// ── Public API ────────────────────────────────────────────────────────────────

/// Load the export at `path` into a raw [`Table`].
pub fn load_table(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).map_err(|source| DashboardError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let table = read_table(file)?;
    info!("Loaded {} tickets from {}", table.len(), path.display());
    Ok(table)
}

/// Read a CSV document with a header row from any reader.
///
/// A leading UTF-8 byte-order mark is dropped from the first header. Rows
/// shorter than the header are padded with nulls; extra fields are ignored.
pub fn read_table<R: Read>(reader: R) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches(BOM).to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(DashboardError::MissingHeader);
    }

    let mut table = Table::new(headers);
    let mut ragged = 0usize;
    for record in rdr.records() {
        let record = record?;
        if record.len() != table.columns().len() {
            ragged += 1;
        }
        table.push_row(record.iter().map(Cell::from_raw).collect());
    }

    if ragged > 0 {
        debug!("{} rows did not match the header width", ragged);
    }

    Ok(table)
}

/// Load `path` and run it through `cleaner`.
pub fn load_and_clean(path: &Path, cleaner: &TableCleaner) -> Result<Table> {
    let raw = load_table(path)?;
    Ok(cleaner.clean(&raw))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
