//! Dashboard pipeline for a cleaned ticket table.
//!
//! Applies the request filters, buckets the remaining tickets by time and
//! builds every summary view, returning a [`Dashboard`] ready for rendering
//! or JSON export.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use dash_core::formatting::percentage;
use dash_core::models::{columns, Cell, Filters, Granularity, LabelCount, Table, View};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregator::{TicketAggregator, TrendSeries};
use crate::summaries::{self, AgeHistogram, PriorityDistribution, TOP_N};

static SLA_ISSUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)late|overdue").expect("SLA issue regex is valid"));

// ── Public types ──────────────────────────────────────────────────────────────

/// A count and its share of the ticket total, in percent to one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Share {
    pub count: usize,
    pub percent: f64,
}

impl Share {
    pub fn of(count: usize, total: usize) -> Self {
        Self {
            count,
            percent: percentage(count as f64, total as f64, 1),
        }
    }
}

/// Headline numbers for the filtered ticket set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub total_tickets: usize,
    /// Mean age in days; `None` when no ticket has an age.
    pub average_age: View<Option<f64>>,
    /// Tickets with no resource assigned.
    pub unassigned: View<Share>,
    /// Tickets whose SLA status reads late or overdue.
    pub sla_issues: View<Share>,
}

/// Choices offered to the user for narrowing the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    /// Distinct statuses, sorted.
    pub statuses: Vec<String>,
    /// Busiest companies, sorted by name.
    pub companies: Vec<String>,
    /// Earliest and latest valid `Last Update` dates.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

/// Everything needed to build one dashboard.
#[derive(Debug, Clone)]
pub struct DashboardRequest {
    /// Cleaned, unfiltered tickets.
    pub table: Table,
    pub granularity: Granularity,
    pub filters: Filters,
}

impl DashboardRequest {
    pub fn new(table: Table, granularity: Granularity, filters: Filters) -> Self {
        Self {
            table,
            granularity,
            filters,
        }
    }
}

/// The complete output of [`build_dashboard`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub generated_at: NaiveDateTime,
    pub granularity: Granularity,
    pub filters: Filters,
    /// Options computed from the unfiltered table.
    pub filter_options: FilterOptions,
    pub metrics: SummaryMetrics,
    pub trend: View<TrendSeries>,
    pub status: View<Vec<LabelCount>>,
    pub priority: View<PriorityDistribution>,
    pub age: View<AgeHistogram>,
    pub companies: View<Vec<LabelCount>>,
    pub resources: View<Vec<LabelCount>>,
    pub oldest: View<Table>,
    pub alerts: View<Table>,
    /// Filtered tickets with the time bucket columns appended.
    pub table: Table,
}

// ── Metrics ───────────────────────────────────────────────────────────────────

impl SummaryMetrics {
    pub fn compute(table: &Table) -> Self {
        let total = table.len();

        let average_age = match table.column(columns::AGE) {
            Some(cells) => {
                let ages: Vec<f64> = cells.filter_map(Cell::as_number).collect();
                View::Available(
                    (!ages.is_empty()).then(|| ages.iter().sum::<f64>() / ages.len() as f64),
                )
            }
            None => View::unavailable(columns::AGE),
        };

        let unassigned = match table.column(columns::RESOURCES) {
            Some(cells) => View::Available(Share::of(cells.filter(|c| c.is_blank()).count(), total)),
            None => View::unavailable(columns::RESOURCES),
        };

        let sla_issues = match table.column(columns::SLA_STATUS) {
            Some(cells) => {
                let count = cells
                    .filter_map(Cell::label)
                    .filter(|s| SLA_ISSUE_RE.is_match(s))
                    .count();
                View::Available(Share::of(count, total))
            }
            None => View::unavailable(columns::SLA_STATUS),
        };

        Self {
            total_tickets: total,
            average_age,
            unassigned,
            sla_issues,
        }
    }
}

// ── Filters ───────────────────────────────────────────────────────────────────

fn text_matches(cell: Option<&Cell>, wanted: &str) -> bool {
    cell.and_then(Cell::label).is_some_and(|v| v == wanted)
}

/// Keep the rows matching every filter that is set.
///
/// Status and company match exactly. The date range is inclusive and
/// applies to the `Last Update` date; tickets without a valid date are kept.
/// A filter naming a column the table lacks is ignored.
pub fn apply_filters(table: &Table, filters: &Filters) -> Table {
    if filters.is_empty() {
        return table.clone();
    }

    let status = filters
        .status
        .as_deref()
        .filter(|_| table.has_column(columns::STATUS));
    let company = filters
        .company
        .as_deref()
        .filter(|_| table.has_column(columns::COMPANY));

    let filtered = table.filter_rows(|row| {
        if let Some(wanted) = status {
            if !text_matches(row.get(columns::STATUS), wanted) {
                return false;
            }
        }
        if let Some(wanted) = company {
            if !text_matches(row.get(columns::COMPANY), wanted) {
                return false;
            }
        }
        let Some(date) = row
            .get(columns::LAST_UPDATE)
            .and_then(Cell::as_timestamp)
            .map(|ts| ts.date())
        else {
            return true;
        };
        filters.date_from.map_or(true, |from| date >= from)
            && filters.date_to.map_or(true, |to| date <= to)
    });

    debug!("Filters kept {} of {} tickets", filtered.len(), table.len());
    filtered
}

impl FilterOptions {
    pub fn from_table(table: &Table) -> Self {
        let statuses = table
            .column(columns::STATUS)
            .map(|cells| {
                cells
                    .filter_map(Cell::label)
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            })
            .unwrap_or_default();

        let mut companies: Vec<String> = summaries::company_ranking(table)
            .available()
            .unwrap_or_default()
            .into_iter()
            .take(TOP_N)
            .map(|c| c.label)
            .collect();
        companies.sort();

        let date_range = table.column(columns::LAST_UPDATE).and_then(|cells| {
            let dates: Vec<NaiveDate> = cells
                .filter_map(Cell::as_timestamp)
                .map(|ts| ts.date())
                .collect();
            let min = dates.iter().min()?;
            let max = dates.iter().max()?;
            Some((*min, *max))
        });

        Self {
            statuses,
            companies,
            date_range,
        }
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Build the dashboard for `request`.
///
/// `now` is the local wall-clock time; tickets without a valid
/// `Last Update` are bucketed at it.
pub fn build_dashboard(request: &DashboardRequest, now: NaiveDateTime) -> Dashboard {
    let filter_options = FilterOptions::from_table(&request.table);
    let filtered = apply_filters(&request.table, &request.filters);
    let bucketed = TicketAggregator::add_time_buckets(&filtered, request.granularity, now);

    let trend = if bucketed.has_column(columns::TIME_GROUP) {
        TicketAggregator::trend_from_buckets(&bucketed, request.granularity)
    } else {
        View::unavailable(columns::LAST_UPDATE)
    };

    let dashboard = Dashboard {
        generated_at: now,
        granularity: request.granularity,
        filters: request.filters.clone(),
        filter_options,
        metrics: SummaryMetrics::compute(&filtered),
        trend,
        status: summaries::status_distribution(&filtered),
        priority: summaries::priority_distribution(&filtered),
        age: summaries::age_distribution(&filtered),
        companies: summaries::company_ranking(&filtered),
        resources: summaries::resource_ranking(&filtered),
        oldest: summaries::oldest_tickets(&filtered),
        alerts: summaries::alert_tickets(&filtered),
        table: bucketed,
    };

    info!(
        "Built {} dashboard over {} tickets ({} before filters)",
        request.granularity,
        dashboard.metrics.total_tickets,
        request.table.len()
    );
    dashboard
}

// ── Tests ─────────────────────────────────────────────────────────────────────
