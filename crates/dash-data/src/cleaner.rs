//! Normalisation of raw export columns into canonical typed cells.
//!
//! The cleaner never removes rows or columns. Each recognised column is
//! rewritten cell by cell; a cell that cannot be interpreted degrades to
//! null (dates, numbers, ages) or passes through unchanged (labels).

use std::collections::BTreeMap;

use dash_core::data_processors::{
    has_icon_path, AgeExtractor, NumberParser, RuleSet, TimestampProcessor, PRIORITY_ICONS,
    SCHEDULE_ICONS, SLA_STATUS_RULES,
};
use dash_core::models::{columns, Cell, Table};
use dash_core::time_utils::TimezoneHandler;
use tracing::debug;

// ── CleaningReport ────────────────────────────────────────────────────────────

/// What a cleaning pass touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningReport {
    /// Recognised columns that were present and rewritten, in table order.
    pub columns_cleaned: Vec<String>,
    /// Per column, how many non-null cells could not be interpreted and
    /// became null.
    pub nulled_cells: BTreeMap<String, usize>,
}

impl CleaningReport {
    pub fn total_nulled(&self) -> usize {
        self.nulled_cells.values().sum()
    }
}

// ── TableCleaner ──────────────────────────────────────────────────────────────

/// Rewrites the recognised columns of a ticket table.
#[derive(Debug, Clone, Default)]
pub struct TableCleaner {
    timezone: TimezoneHandler,
}

impl TableCleaner {
    /// `timezone` is used for timestamps that carry an explicit offset.
    pub fn new(timezone: TimezoneHandler) -> Self {
        Self { timezone }
    }

    /// Clean `table`, returning a new table. The input is not modified.
    pub fn clean(&self, table: &Table) -> Table {
        self.clean_with_report(table).0
    }

    /// Same as [`TableCleaner::clean`], also reporting what changed.
    pub fn clean_with_report(&self, table: &Table) -> (Table, CleaningReport) {
        let mut cleaned = table.clone();
        let mut report = CleaningReport::default();

        let mut apply = |name: &str, f: &dyn Fn(&Cell) -> Cell| {
            let mut nulled = 0usize;
            let present = cleaned.map_column(name, |cell| {
                let out = f(cell);
                if out.is_null() && !cell.is_null() {
                    nulled += 1;
                }
                out
            });
            if present {
                report.columns_cleaned.push(name.to_string());
                if nulled > 0 {
                    report.nulled_cells.insert(name.to_string(), nulled);
                }
            }
        };

        apply(columns::PRIORITY, &clean_priority);
        apply(columns::SCHEDULE, &clean_schedule);
        apply(columns::AGE, &clean_age);
        apply(columns::SLA_STATUS, &clean_sla_status);
        for &name in columns::DATE_COLUMNS {
            apply(name, &|cell| clean_date(cell, &self.timezone));
        }
        for &name in columns::NUMERIC_COLUMNS {
            apply(name, &clean_number);
        }

        // Keep the report in table column order.
        report
            .columns_cleaned
            .sort_by_key(|name| cleaned.column_index(name));

        debug!(
            "Cleaned {} columns over {} rows, {} cells coerced to null",
            report.columns_cleaned.len(),
            cleaned.len(),
            report.total_nulled()
        );

        (cleaned, report)
    }
}

/// Clean `table` with timestamps interpreted as UTC.
pub fn clean_table(table: &Table) -> Table {
    TableCleaner::default().clean(table)
}

// ── Per-cell rules ────────────────────────────────────────────────────────────

/// Map an icon path through `rules`; everything else passes through.
fn clean_icon(cell: &Cell, rules: &RuleSet) -> Cell {
    match cell {
        Cell::Text(s) if has_icon_path(s) => rules
            .classify(Some(s))
            .map(Cell::from)
            .unwrap_or_else(|| cell.clone()),
        _ => cell.clone(),
    }
}

/// `…/common/images/orange.gif` → `High`.
pub fn clean_priority(cell: &Cell) -> Cell {
    clean_icon(cell, &PRIORITY_ICONS)
}

/// `…/schedule-today.gif` → `Today`.
pub fn clean_schedule(cell: &Cell) -> Cell {
    clean_icon(cell, &SCHEDULE_ICONS)
}

/// First decimal numeral in the cell's text, as a non-negative number.
pub fn clean_age(cell: &Cell) -> Cell {
    match cell {
        Cell::Null => Cell::Null,
        Cell::Number(n) if n.is_finite() => Cell::Number(n.abs()),
        Cell::Number(_) => Cell::Null,
        other => AgeExtractor::extract(&other.to_string()).into(),
    }
}

/// Collapse SLA free text to `No SLA` / `Planned` / `Needs Resolution` /
/// `Waiting`, passing anything else through verbatim.
pub fn clean_sla_status(cell: &Cell) -> Cell {
    let text = match cell {
        Cell::Null => None,
        Cell::Text(s) => Some(s.clone()),
        other => Some(other.to_string()),
    };
    match SLA_STATUS_RULES.classify(text.as_deref()) {
        Some(label) => Cell::from(label),
        None => cell.clone(),
    }
}

/// Parse text into a timestamp; anything unparseable becomes null.
pub fn clean_date(cell: &Cell, timezone: &TimezoneHandler) -> Cell {
    match cell {
        Cell::Timestamp(_) => cell.clone(),
        Cell::Text(s) => TimestampProcessor::parse(s, timezone).into(),
        _ => Cell::Null,
    }
}

/// Parse text into a float; anything unparseable becomes null.
pub fn clean_number(cell: &Cell) -> Cell {
    match cell {
        Cell::Number(n) if n.is_finite() => cell.clone(),
        Cell::Text(s) => NumberParser::parse(s).into(),
        _ => Cell::Null,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn raw_table() -> Table {
        Table::from_rows(
            [
                "Ticket #",
                "Priority",
                "Schedule",
                "Age",
                "SLA Status",
                "Last Update",
                "Total Hours",
                "Team",
            ],
            vec![
                vec![
                    "1".into(),
                    "/v4_6_release/common/images/lime.gif".into(),
                    "/common/images/schedule-future.gif".into(),
                    "12.5 days".into(),
                    Cell::Null,
                    "2024-01-15 10:30:00".into(),
                    "1.5".into(),
                    "Service".into(),
                ],
                vec![
                    "2".into(),
                    "High".into(),
                    "/common/images/noperson.gif".into(),
                    "N/A".into(),
                    "Resolve by 2024-01-01".into(),
                    "not a date".into(),
                    "lots".into(),
                    Cell::Null,
                ],
                vec![
                    "3".into(),
                    "/common/images/purple.gif".into(),
                    "Later".into(),
                    "7".into(),
                    "Plan by tomorrow".into(),
                    Cell::Null,
                    Cell::Null,
                    "Projects".into(),
                ],
            ],
        )
    }

    // ── Priority / Schedule ──────────────────────────────────────────────────

    #[test]
    fn test_priority_icon_mapping() {
        assert_eq!(clean_priority(&"lime.gif".into()), Cell::from("Low"));
        assert_eq!(
            clean_priority(&"/common/images/purple.gif".into()),
            Cell::from("Urgent")
        );
        assert_eq!(clean_priority(&"High".into()), Cell::from("High"));
        assert_eq!(clean_priority(&Cell::Null), Cell::Null);
    }

    #[test]
    fn test_priority_unknown_icon_passes_through() {
        let cell = Cell::from("/common/images/red.gif");
        assert_eq!(clean_priority(&cell), cell);
    }

    #[test]
    fn test_schedule_icon_mapping() {
        assert_eq!(
            clean_schedule(&"/common/images/schedule-today.gif".into()),
            Cell::from("Today")
        );
        assert_eq!(
            clean_schedule(&"/common/images/noperson.gif".into()),
            Cell::from("Unassigned")
        );
        assert_eq!(clean_schedule(&"Later".into()), Cell::from("Later"));
    }

    // ── Age ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_age_extraction() {
        assert_eq!(clean_age(&"12.5 days".into()), Cell::Number(12.5));
        assert_eq!(clean_age(&"N/A".into()), Cell::Null);
        assert_eq!(clean_age(&"7".into()), Cell::Number(7.0));
        assert_eq!(clean_age(&Cell::Number(4.0)), Cell::Number(4.0));
        assert_eq!(clean_age(&Cell::Null), Cell::Null);
    }

    #[test]
    fn test_age_is_never_negative() {
        assert_eq!(clean_age(&"-3 days".into()), Cell::Number(3.0));
        assert_eq!(clean_age(&Cell::Number(-2.5)), Cell::Number(2.5));
        assert_eq!(clean_age(&Cell::Number(f64::NAN)), Cell::Null);
    }

    // ── SLA ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_sla_classification() {
        assert_eq!(clean_sla_status(&"".into()), Cell::from("No SLA"));
        assert_eq!(clean_sla_status(&Cell::Null), Cell::from("No SLA"));
        assert_eq!(clean_sla_status(&"nan".into()), Cell::from("No SLA"));
        assert_eq!(
            clean_sla_status(&"Resolve by 2024-01-01".into()),
            Cell::from("Needs Resolution")
        );
        assert_eq!(
            clean_sla_status(&"Plan by tomorrow".into()),
            Cell::from("Planned")
        );
        assert_eq!(
            clean_sla_status(&"Waiting on customer".into()),
            Cell::from("Waiting")
        );
        assert_eq!(
            clean_sla_status(&"Responded".into()),
            Cell::from("Responded")
        );
    }

    // ── Dates / numbers ──────────────────────────────────────────────────────

    #[test]
    fn test_date_coercion() {
        let tz = TimezoneHandler::utc();
        let cell = clean_date(&"2024-01-15 10:30:00".into(), &tz);
        let ts = cell.as_timestamp().unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(ts.minute(), 30);
        assert_eq!(clean_date(&"not a date".into(), &tz), Cell::Null);
        assert_eq!(clean_date(&Cell::Number(5.0), &tz), Cell::Null);
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(clean_number(&"1.5".into()), Cell::Number(1.5));
        assert_eq!(clean_number(&"lots".into()), Cell::Null);
        assert_eq!(clean_number(&Cell::Null), Cell::Null);
    }

    // ── Whole table ──────────────────────────────────────────────────────────

    #[test]
    fn test_clean_preserves_shape() {
        let raw = raw_table();
        let cleaned = clean_table(&raw);

        assert_eq!(cleaned.len(), raw.len());
        assert_eq!(cleaned.columns(), raw.columns());
    }

    #[test]
    fn test_clean_does_not_mutate_input() {
        let raw = raw_table();
        let snapshot = raw.clone();
        let _ = clean_table(&raw);
        assert_eq!(raw, snapshot);
    }

    #[test]
    fn test_clean_rewrites_recognised_columns() {
        let cleaned = clean_table(&raw_table());

        assert_eq!(cleaned.cell(0, "Priority"), Some(&Cell::from("Low")));
        assert_eq!(cleaned.cell(2, "Priority"), Some(&Cell::from("Urgent")));
        assert_eq!(cleaned.cell(1, "Schedule"), Some(&Cell::from("Unassigned")));
        assert_eq!(cleaned.cell(0, "SLA Status"), Some(&Cell::from("No SLA")));
        assert_eq!(cleaned.cell(2, "SLA Status"), Some(&Cell::from("Planned")));
        assert_eq!(cleaned.cell(1, "Last Update"), Some(&Cell::Null));
        assert_eq!(cleaned.cell(0, "Total Hours"), Some(&Cell::Number(1.5)));
        // Unrecognised columns are untouched.
        assert_eq!(cleaned.cell(0, "Team"), Some(&Cell::from("Service")));
    }

    #[test]
    fn test_clean_is_idempotent() {
        let once = clean_table(&raw_table());
        let twice = clean_table(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_clean_missing_columns_are_skipped() {
        let raw = Table::from_rows(["Status"], vec![vec!["New".into()]]);
        let (cleaned, report) = TableCleaner::default().clean_with_report(&raw);
        assert_eq!(cleaned, raw);
        assert!(report.columns_cleaned.is_empty());
    }

    #[test]
    fn test_cleaning_report_counts_nulled_cells() {
        let (_, report) = TableCleaner::default().clean_with_report(&raw_table());

        assert_eq!(
            report.columns_cleaned,
            vec![
                "Priority",
                "Schedule",
                "Age",
                "SLA Status",
                "Last Update",
                "Total Hours"
            ]
        );
        assert_eq!(report.nulled_cells.get("Age"), Some(&1));
        assert_eq!(report.nulled_cells.get("Last Update"), Some(&1));
        assert_eq!(report.nulled_cells.get("Total Hours"), Some(&1));
        assert_eq!(report.total_nulled(), 3);
    }
}
