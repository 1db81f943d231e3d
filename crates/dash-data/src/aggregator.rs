//! Time bucketing of tickets into daily, weekly and monthly periods.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDateTime};
use dash_core::models::{columns, Cell, Granularity, LabelCount, Table, View};
use serde::Serialize;
use tracing::warn;

// ── TrendSeries ───────────────────────────────────────────────────────────────

/// Ticket counts per time bucket, ascending by bucket key.
///
/// The series is a plain derived value: iterate it as often as needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendSeries {
    pub granularity: Granularity,
    pub points: Vec<LabelCount>,
}

impl TrendSeries {
    pub fn iter(&self) -> std::slice::Iter<'_, LabelCount> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sum of all bucket counts.
    pub fn total(&self) -> usize {
        self.points.iter().map(|p| p.count).sum()
    }
}

impl<'a> IntoIterator for &'a TrendSeries {
    type Item = &'a LabelCount;
    type IntoIter = std::slice::Iter<'a, LabelCount>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

// ── TicketAggregator ──────────────────────────────────────────────────────────

/// Stateless helper that groups tickets by time period.
pub struct TicketAggregator;

impl TicketAggregator {
    /// Bucket key for `ts`.
    ///
    /// * daily   → `"2024-01-15"`
    /// * weekly  → `"2024-W03"` (ISO week and ISO week-year)
    /// * monthly → `"2024-01"`
    ///
    /// All keys are zero-padded so lexicographic order is chronological.
    pub fn bucket_key(ts: NaiveDateTime, granularity: Granularity) -> String {
        match granularity {
            Granularity::Daily => ts.format("%Y-%m-%d").to_string(),
            Granularity::Weekly => {
                let week = ts.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Granularity::Monthly => format!("{}-{:02}", ts.year(), ts.month()),
        }
    }

    /// Timestamps used for bucketing, one per row.
    ///
    /// Rows without a valid `Last Update` are assigned `now`. This keeps them
    /// in the counts but inflates the most recent bucket; the number of
    /// substituted rows is logged so the skew is visible. The table itself
    /// is never changed.
    ///
    /// Returns `None` when the table has no `Last Update` column.
    pub fn effective_timestamps(table: &Table, now: NaiveDateTime) -> Option<Vec<NaiveDateTime>> {
        let column = table.column(columns::LAST_UPDATE)?;
        let mut substituted = 0usize;
        let stamps: Vec<NaiveDateTime> = column
            .map(|cell| {
                cell.as_timestamp().unwrap_or_else(|| {
                    substituted += 1;
                    now
                })
            })
            .collect();

        if substituted > 0 {
            warn!(
                "{} of {} tickets have no valid Last Update; bucketing them at {}",
                substituted,
                stamps.len(),
                now.format("%Y-%m-%d %H:%M")
            );
        }
        Some(stamps)
    }

    /// Append the calendar component columns (`date`, `day`, `week`,
    /// `month`, `year`) and the `time_group` bucket key column.
    ///
    /// Row count and existing columns are preserved; `Last Update` keeps its
    /// null cells. A table without `Last Update` is returned unchanged.
    pub fn add_time_buckets(table: &Table, granularity: Granularity, now: NaiveDateTime) -> Table {
        let mut bucketed = table.clone();
        let Some(stamps) = Self::effective_timestamps(table, now) else {
            return bucketed;
        };

        let component = |f: &dyn Fn(&NaiveDateTime) -> Cell| -> Vec<Cell> {
            stamps.iter().map(f).collect()
        };

        bucketed.set_column(
            columns::DATE,
            component(&|ts| Cell::from(ts.format("%Y-%m-%d").to_string())),
        );
        bucketed.set_column(columns::DAY, component(&|ts| Cell::Number(ts.day() as f64)));
        bucketed.set_column(
            columns::WEEK,
            component(&|ts| Cell::Number(ts.iso_week().week() as f64)),
        );
        bucketed.set_column(columns::MONTH, component(&|ts| Cell::Number(ts.month() as f64)));
        bucketed.set_column(columns::YEAR, component(&|ts| Cell::Number(ts.year() as f64)));
        bucketed.set_column(
            columns::TIME_GROUP,
            component(&|ts| Cell::from(Self::bucket_key(*ts, granularity))),
        );

        bucketed
    }

    /// Count tickets per bucket of an already bucketed table.
    pub fn trend_from_buckets(bucketed: &Table, granularity: Granularity) -> View<TrendSeries> {
        let Some(keys) = bucketed.column(columns::TIME_GROUP) else {
            return View::unavailable(columns::LAST_UPDATE);
        };

        // BTreeMap keeps the keys sorted.
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for key in keys.filter_map(Cell::label) {
            *counts.entry(key).or_default() += 1;
        }

        View::Available(TrendSeries {
            granularity,
            points: counts
                .into_iter()
                .map(|(label, count)| LabelCount { label, count })
                .collect(),
        })
    }

    /// Bucket `table` and count tickets per bucket in one step.
    pub fn trend(table: &Table, granularity: Granularity, now: NaiveDateTime) -> View<TrendSeries> {
        if !table.has_column(columns::LAST_UPDATE) {
            return View::unavailable(columns::LAST_UPDATE);
        }
        let bucketed = Self::add_time_buckets(table, granularity, now);
        Self::trend_from_buckets(&bucketed, granularity)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn table_with_dates(dates: &[Option<NaiveDateTime>]) -> Table {
        Table::from_rows(
            ["Ticket #", "Last Update"],
            dates
                .iter()
                .enumerate()
                .map(|(i, d)| vec![Cell::from(i.to_string()), Cell::from(*d)])
                .collect(),
        )
    }

    // ── bucket_key ───────────────────────────────────────────────────────────

    #[test]
    fn test_bucket_key_daily() {
        assert_eq!(
            TicketAggregator::bucket_key(ts(2024, 1, 5), Granularity::Daily),
            "2024-01-05"
        );
    }

    #[test]
    fn test_bucket_key_monthly() {
        assert_eq!(
            TicketAggregator::bucket_key(ts(2024, 3, 31), Granularity::Monthly),
            "2024-03"
        );
    }

    #[test]
    fn test_bucket_key_weekly_uses_iso_year() {
        // 2024-12-30 is a Monday in ISO week 1 of 2025.
        assert_eq!(
            TicketAggregator::bucket_key(ts(2024, 12, 30), Granularity::Weekly),
            "2025-W01"
        );
        // 2021-01-03 is a Sunday in ISO week 53 of 2020.
        assert_eq!(
            TicketAggregator::bucket_key(ts(2021, 1, 3), Granularity::Weekly),
            "2020-W53"
        );
        assert_eq!(
            TicketAggregator::bucket_key(ts(2024, 1, 10), Granularity::Weekly),
            "2024-W02"
        );
    }

    #[test]
    fn test_bucket_keys_sort_chronologically() {
        let stamps = [
            ts(2023, 12, 31),
            ts(2024, 1, 1),
            ts(2024, 2, 9),
            ts(2024, 10, 1),
            ts(2025, 1, 2),
        ];
        for granularity in [Granularity::Daily, Granularity::Weekly, Granularity::Monthly] {
            let keys: Vec<String> = stamps
                .iter()
                .map(|t| TicketAggregator::bucket_key(*t, granularity))
                .collect();
            let mut sorted = keys.clone();
            sorted.sort();
            assert_eq!(keys, sorted, "{} keys out of order", granularity);
        }
    }

    // ── add_time_buckets ─────────────────────────────────────────────────────

    #[test]
    fn test_add_time_buckets_appends_columns() {
        let table = table_with_dates(&[Some(ts(2024, 1, 15)), Some(ts(2024, 2, 1))]);
        let now = ts(2024, 6, 1);
        let bucketed = TicketAggregator::add_time_buckets(&table, Granularity::Monthly, now);

        assert_eq!(bucketed.len(), 2);
        assert_eq!(
            &bucketed.columns()[2..],
            &["date", "day", "week", "month", "year", "time_group"]
        );
        assert_eq!(bucketed.cell(0, "time_group"), Some(&Cell::from("2024-01")));
        assert_eq!(bucketed.cell(1, "day"), Some(&Cell::Number(1.0)));
        assert_eq!(bucketed.cell(0, "week"), Some(&Cell::Number(3.0)));
    }

    #[test]
    fn test_missing_dates_bucketed_at_now_without_touching_table() {
        let table = table_with_dates(&[Some(ts(2024, 1, 15)), None, None]);
        let now = ts(2024, 6, 1);
        let bucketed = TicketAggregator::add_time_buckets(&table, Granularity::Daily, now);

        assert_eq!(bucketed.len(), 3);
        assert_eq!(bucketed.cell(1, "Last Update"), Some(&Cell::Null));
        assert_eq!(bucketed.cell(1, "time_group"), Some(&Cell::from("2024-06-01")));
        assert_eq!(bucketed.cell(2, "time_group"), Some(&Cell::from("2024-06-01")));
    }

    #[test]
    fn test_add_time_buckets_without_date_column() {
        let table = Table::from_rows(["Status"], vec![vec![Cell::from("New")]]);
        let bucketed = TicketAggregator::add_time_buckets(&table, Granularity::Daily, ts(2024, 1, 1));
        assert_eq!(bucketed, table);
    }

    // ── trend ────────────────────────────────────────────────────────────────

    #[test]
    fn test_trend_counts_sorted() {
        let table = table_with_dates(&[
            Some(ts(2024, 1, 20)),
            Some(ts(2024, 1, 10)),
            Some(ts(2024, 1, 20)),
            Some(ts(2024, 1, 15)),
        ]);
        let series = TicketAggregator::trend(&table, Granularity::Daily, ts(2024, 2, 1))
            .available()
            .unwrap();

        let points: Vec<(&str, usize)> = series
            .iter()
            .map(|p| (p.label.as_str(), p.count))
            .collect();
        assert_eq!(
            points,
            vec![("2024-01-10", 1), ("2024-01-15", 1), ("2024-01-20", 2)]
        );
        assert_eq!(series.total(), 4);
    }

    #[test]
    fn test_trend_is_restartable() {
        let table = table_with_dates(&[Some(ts(2024, 1, 1)), Some(ts(2024, 3, 1))]);
        let series = TicketAggregator::trend(&table, Granularity::Monthly, ts(2024, 4, 1))
            .available()
            .unwrap();

        let first: Vec<&LabelCount> = series.iter().collect();
        let second: Vec<&LabelCount> = (&series).into_iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_trend_unavailable_without_date_column() {
        let table = Table::from_rows(["Status"], vec![vec![Cell::from("New")]]);
        let view = TicketAggregator::trend(&table, Granularity::Weekly, ts(2024, 1, 1));
        assert_eq!(view, View::unavailable("Last Update"));
    }

    #[test]
    fn test_trend_empty_table() {
        let table = table_with_dates(&[]);
        let series = TicketAggregator::trend(&table, Granularity::Daily, ts(2024, 1, 1))
            .available()
            .unwrap();
        assert!(series.is_empty());
    }
}
