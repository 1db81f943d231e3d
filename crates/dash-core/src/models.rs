use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DashboardError;

/// Display / export format for timestamp cells. `%.f` writes fractional
/// seconds only when they are non-zero.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Timestamps shown to people, truncated to whole seconds.
pub const SECONDS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ── Column names ──────────────────────────────────────────────────────────────

/// Header names used by the helpdesk export and by the derived bucket columns.
pub mod columns {
    pub const TICKET: &str = "Ticket #";
    pub const SUMMARY: &str = "Summary Description";
    /// Older exports use a bare `Summary` header.
    pub const SUMMARY_SHORT: &str = "Summary";
    pub const STATUS: &str = "Status";
    pub const PRIORITY: &str = "Priority";
    pub const COMPANY: &str = "Company";
    pub const RESOURCES: &str = "Resources";
    pub const TEAM: &str = "Team";
    pub const SUBTYPE: &str = "Subtype";
    pub const LAST_UPDATE: &str = "Last Update";
    pub const AGE: &str = "Age";
    pub const SLA_STATUS: &str = "SLA Status";
    pub const SCHEDULE: &str = "Schedule";
    pub const DUE_DATE: &str = "Due Date";
    pub const NEXT_DATE: &str = "Next Date";
    pub const TOTAL_HOURS: &str = "Total Hours";
    pub const BUDGET: &str = "Budget";

    /// Columns coerced to timestamps by the cleaner.
    pub const DATE_COLUMNS: &[&str] = &[LAST_UPDATE, DUE_DATE, NEXT_DATE];
    /// Columns coerced to floats by the cleaner.
    pub const NUMERIC_COLUMNS: &[&str] = &[TOTAL_HOURS, BUDGET];

    // Columns appended by the time bucketer.
    pub const DATE: &str = "date";
    pub const DAY: &str = "day";
    pub const WEEK: &str = "week";
    pub const MONTH: &str = "month";
    pub const YEAR: &str = "year";
    pub const TIME_GROUP: &str = "time_group";
}

// ── Cell ──────────────────────────────────────────────────────────────────────

/// A single value in a [`Table`].
///
/// Raw CSV loads produce only `Null` and `Text`; the cleaner introduces
/// `Number` and `Timestamp` for the columns it recognises.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Number(f64),
    Timestamp(NaiveDateTime),
    Text(String),
}

impl Cell {
    /// Build a cell from a raw CSV field. Empty fields become `Null`.
    pub fn from_raw(raw: &str) -> Self {
        if raw.is_empty() {
            Cell::Null
        } else {
            Cell::Text(raw.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// `true` for null cells and for text that is empty after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Grouping label for the cell, or `None` when it is null.
    pub fn label(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<NaiveDateTime> for Cell {
    fn from(value: NaiveDateTime) -> Self {
        Cell::Timestamp(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Null)
    }
}

// ── Table ─────────────────────────────────────────────────────────────────────

/// An in-memory, column-named ticket table.
///
/// Every row holds exactly `columns().len()` cells; short rows are padded
/// with `Null` and long rows truncated on insertion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Create an empty table with the given header.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Create a table from a header and a set of rows.
    pub fn from_rows<I, S>(columns: I, rows: Vec<Vec<Cell>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first column named `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Append a row, normalising it to the header width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Null);
        self.rows.push(row);
    }

    /// Iterate the cells of column `name`, top to bottom.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Cell> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// The cell at `row` in column `name`.
    pub fn cell(&self, row: usize, name: &str) -> Option<&Cell> {
        let idx = self.column_index(name)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Rewrite every cell of column `name` in place.
    ///
    /// Returns `false` (and does nothing) when the column is absent.
    pub fn map_column(&mut self, name: &str, mut f: impl FnMut(&Cell) -> Cell) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        true
    }

    /// Replace column `name` with `values`, appending it when absent.
    ///
    /// `values` must hold one cell per row; missing trailing cells are null.
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) {
        let idx = match self.column_index(name) {
            Some(idx) => idx,
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(Cell::Null);
                }
                self.columns.len() - 1
            }
        };
        let mut values = values.into_iter();
        for row in &mut self.rows {
            row[idx] = values.next().unwrap_or(Cell::Null);
        }
    }

    /// A new table with the same header and only the rows at `indices`,
    /// in the order given.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    /// A new table keeping the rows for which `keep` returns `true`.
    pub fn filter_rows(&self, mut keep: impl FnMut(RowRef<'_>) -> bool) -> Table {
        let indices: Vec<usize> = (0..self.rows.len())
            .filter(|&i| keep(RowRef { table: self, index: i }))
            .collect();
        self.select_rows(&indices)
    }

    /// Borrowed view of row `index`.
    pub fn row(&self, index: usize) -> Option<RowRef<'_>> {
        (index < self.rows.len()).then_some(RowRef { table: self, index })
    }
}

/// A borrowed row that can look cells up by column name.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> RowRef<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get(&self, column: &str) -> Option<&'a Cell> {
        self.table.cell(self.index, column)
    }

    pub fn cells(&self) -> &'a [Cell] {
        &self.table.rows[self.index]
    }
}

// ── Granularity ───────────────────────────────────────────────────────────────

/// Width of the time buckets used for trend counts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    /// Capitalised name used in report titles, e.g. `"Weekly"`.
    pub fn title(&self) -> &'static str {
        match self {
            Granularity::Daily => "Daily",
            Granularity::Weekly => "Weekly",
            Granularity::Monthly => "Monthly",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
        })
    }
}

impl FromStr for Granularity {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Granularity::Daily),
            "weekly" => Ok(Granularity::Weekly),
            "monthly" => Ok(Granularity::Monthly),
            _ => Err(DashboardError::InvalidGranularity(s.to_string())),
        }
    }
}

// ── Derived views ─────────────────────────────────────────────────────────────

/// A `(label, count)` pair produced by every grouping view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

impl LabelCount {
    pub fn new(label: impl Into<String>, count: usize) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

/// Result of a view that depends on a specific column.
///
/// A missing column is not an error: the view is reported as unavailable and
/// the remaining views are still built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "lowercase")]
pub enum View<T> {
    Available(T),
    Unavailable { column: String },
}

impl<T> View<T> {
    pub fn unavailable(column: &str) -> Self {
        View::Unavailable {
            column: column.to_string(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, View::Available(_))
    }

    pub fn as_ref(&self) -> View<&T> {
        match self {
            View::Available(v) => View::Available(v),
            View::Unavailable { column } => View::Unavailable {
                column: column.clone(),
            },
        }
    }

    pub fn available(self) -> Option<T> {
        match self {
            View::Available(v) => Some(v),
            View::Unavailable { .. } => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> View<U> {
        match self {
            View::Available(v) => View::Available(f(v)),
            View::Unavailable { column } => View::Unavailable { column },
        }
    }
}

// ── Filters ───────────────────────────────────────────────────────────────────

/// Row filters chosen for one dashboard request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    /// Keep only rows whose `Status` equals this value.
    pub status: Option<String>,
    /// Keep only rows whose `Company` equals this value.
    pub company: Option<String>,
    /// Inclusive lower bound on the `Last Update` date.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the `Last Update` date.
    pub date_to: Option<NaiveDate>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.company.is_none()
            && self.date_from.is_none()
            && self.date_to.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            ["Status", "Company"],
            vec![
                vec![Cell::from("New"), Cell::from("Acme")],
                vec![Cell::from("Closed")],
                vec![
                    Cell::from("New"),
                    Cell::from("Globex"),
                    Cell::from("extra"),
                ],
            ],
        )
    }

    #[test]
    fn test_from_raw_empty_is_null() {
        assert_eq!(Cell::from_raw(""), Cell::Null);
        assert_eq!(Cell::from_raw("x"), Cell::Text("x".to_string()));
    }

    #[test]
    fn test_cell_display() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap();
        assert_eq!(Cell::Timestamp(ts).to_string(), "2024-03-01 09:05:00");
        let ms = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_milli_opt(9, 5, 0, 250)
            .unwrap();
        assert_eq!(Cell::Timestamp(ms).to_string(), "2024-03-01 09:05:00.250");
        assert_eq!(Cell::Number(12.5).to_string(), "12.5");
        assert_eq!(Cell::Number(7.0).to_string(), "7");
        assert_eq!(Cell::Null.to_string(), "");
    }

    #[test]
    fn test_cell_is_blank() {
        assert!(Cell::Null.is_blank());
        assert!(Cell::from("   ").is_blank());
        assert!(!Cell::from("Jane").is_blank());
        assert!(!Cell::Number(0.0).is_blank());
    }

    #[test]
    fn test_rows_are_normalised_to_header_width() {
        let table = sample();
        assert_eq!(table.len(), 3);
        assert!(table.rows().iter().all(|r| r.len() == 2));
        assert_eq!(table.cell(1, "Company"), Some(&Cell::Null));
    }

    #[test]
    fn test_map_column_missing_is_noop() {
        let mut table = sample();
        let before = table.clone();
        assert!(!table.map_column("Priority", |_| Cell::Null));
        assert_eq!(table, before);
    }

    #[test]
    fn test_set_column_appends() {
        let mut table = sample();
        table.set_column("time_group", vec![Cell::from("a"), Cell::from("b")]);
        assert_eq!(table.columns().last().unwrap(), "time_group");
        assert_eq!(table.cell(0, "time_group"), Some(&Cell::from("a")));
        assert_eq!(table.cell(2, "time_group"), Some(&Cell::Null));
    }

    #[test]
    fn test_filter_rows() {
        let table = sample();
        let new_only = table.filter_rows(|row| row.get("Status") == Some(&Cell::from("New")));
        assert_eq!(new_only.len(), 2);
        assert_eq!(new_only.columns(), table.columns());
    }

    #[test]
    fn test_granularity_from_str() {
        assert_eq!("Weekly".parse::<Granularity>().unwrap(), Granularity::Weekly);
        assert!("hourly".parse::<Granularity>().is_err());
        assert_eq!(Granularity::Monthly.to_string(), "monthly");
    }

    #[test]
    fn test_view_serializes_state() {
        let view: View<usize> = View::unavailable("Status");
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["state"], "unavailable");
        assert_eq!(json["data"]["column"], "Status");
    }
}
