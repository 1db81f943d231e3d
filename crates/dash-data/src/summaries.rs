//! Grouping and ranking views over a cleaned ticket table.
//!
//! Every view is a pure function of the table. A view whose column is
//! missing returns [`View::Unavailable`] instead of failing.

use std::collections::HashMap;
use std::sync::LazyLock;

use dash_core::data_processors::PRIORITY_ORDER;
use dash_core::models::{columns, Cell, LabelCount, Table, View};
use regex::Regex;
use serde::Serialize;

/// Entries kept by the ranking and row views.
pub const TOP_N: usize = 10;

/// Upper bound on histogram bins; ages beyond the last bin are counted in it.
pub const MAX_AGE_BINS: usize = 200;

/// Label used for tickets without an assigned resource.
pub const UNASSIGNED: &str = "Unassigned";

/// Keywords that flag a ticket summary for the alert view.
pub const ALERT_KEYWORDS: &[&str] = &[
    "Alert",
    "Warning",
    "Critical",
    "Urgent",
    "Emergency",
    "Endgame",
];

static ALERT_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = ALERT_KEYWORDS
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i){}", alternation)).expect("alert regex is valid")
});

// ── Counting helpers ──────────────────────────────────────────────────────────

/// Count labels in first-seen order.
fn count_first_seen<I>(labels: I) -> Vec<LabelCount>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: Vec<LabelCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for label in labels {
        match index.get(&label) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(label.clone(), counts.len());
                counts.push(LabelCount::new(label, 1));
            }
        }
    }
    counts
}

/// Descending count, ties by label ascending.
fn sort_by_count_then_label(counts: &mut [LabelCount]) {
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
}

/// Descending count, ties keep first-seen order (the sort is stable).
fn rank_top(mut counts: Vec<LabelCount>, n: usize) -> Vec<LabelCount> {
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(n);
    counts
}

/// Count the non-null values of `column`, most frequent first.
pub fn value_counts(table: &Table, column: &str) -> View<Vec<LabelCount>> {
    let Some(cells) = table.column(column) else {
        return View::unavailable(column);
    };
    let mut counts = count_first_seen(cells.filter_map(Cell::label));
    sort_by_count_then_label(&mut counts);
    View::Available(counts)
}

// ── Status / priority ─────────────────────────────────────────────────────────

/// Ticket count per status, no cap.
pub fn status_distribution(table: &Table) -> View<Vec<LabelCount>> {
    value_counts(table, columns::STATUS)
}

/// Ticket count per priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorityDistribution {
    /// Most frequent first.
    pub counts: Vec<LabelCount>,
}

impl PriorityDistribution {
    /// `Low, Medium, High, Urgent` first (those present), then any other
    /// labels in count order.
    pub fn semantic_order(&self) -> Vec<LabelCount> {
        let mut ordered: Vec<LabelCount> = PRIORITY_ORDER
            .iter()
            .filter_map(|p| self.counts.iter().find(|c| c.label == *p).cloned())
            .collect();
        ordered.extend(
            self.counts
                .iter()
                .filter(|c| !PRIORITY_ORDER.contains(&c.label.as_str()))
                .cloned(),
        );
        ordered
    }
}

pub fn priority_distribution(table: &Table) -> View<PriorityDistribution> {
    value_counts(table, columns::PRIORITY).map(|counts| PriorityDistribution { counts })
}

// ── Age histogram ─────────────────────────────────────────────────────────────

/// One histogram bin covering `[start, end)` days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Distribution of ticket ages in days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeHistogram {
    pub bin_width: f64,
    /// Largest observed age, `None` when no ticket has an age.
    pub max_age: Option<f64>,
    pub bins: Vec<AgeBin>,
}

impl AgeHistogram {
    /// Bin width for the observed maximum: 1 up to 10 days, 2 up to 30,
    /// 5 beyond.
    pub fn bin_width_for(max_age: f64) -> f64 {
        if max_age <= 10.0 {
            1.0
        } else if max_age <= 30.0 {
            2.0
        } else {
            5.0
        }
    }

    /// Build the histogram from non-negative ages.
    ///
    /// The bin count is `ceil(max / width) + 1` so the maximum always falls
    /// inside the last bin, capped at [`MAX_AGE_BINS`]. When capped, the last
    /// bin also holds every older ticket.
    pub fn from_ages(ages: &[f64]) -> Self {
        let Some(max_age) = ages.iter().copied().reduce(f64::max) else {
            return Self {
                bin_width: 1.0,
                max_age: None,
                bins: Vec::new(),
            };
        };

        let width = Self::bin_width_for(max_age);
        let bin_count = Self::bin_count(max_age, width);
        let mut bins: Vec<AgeBin> = (0..bin_count)
            .map(|i| AgeBin {
                start: i as f64 * width,
                end: (i + 1) as f64 * width,
                count: 0,
            })
            .collect();

        for &age in ages {
            let idx = ((age / width).floor() as usize).min(bin_count - 1);
            bins[idx].count += 1;
        }

        Self {
            bin_width: width,
            max_age: Some(max_age),
            bins,
        }
    }

    fn bin_count(max_age: f64, width: f64) -> usize {
        let needed = (max_age / width).ceil();
        if !needed.is_finite() || needed >= (MAX_AGE_BINS - 1) as f64 {
            return MAX_AGE_BINS;
        }
        needed as usize + 1
    }

    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }
}

pub fn age_distribution(table: &Table) -> View<AgeHistogram> {
    let Some(cells) = table.column(columns::AGE) else {
        return View::unavailable(columns::AGE);
    };
    let ages: Vec<f64> = cells
        .filter_map(Cell::as_number)
        .filter(|a| a.is_finite() && *a >= 0.0)
        .collect();
    View::Available(AgeHistogram::from_ages(&ages))
}

// ── Rankings ──────────────────────────────────────────────────────────────────

/// Top companies by ticket count; ties keep first-seen order.
pub fn company_ranking(table: &Table) -> View<Vec<LabelCount>> {
    let Some(cells) = table.column(columns::COMPANY) else {
        return View::unavailable(columns::COMPANY);
    };
    View::Available(rank_top(count_first_seen(cells.filter_map(Cell::label)), TOP_N))
}

/// Top resources by ticket count. Null and blank resources are counted
/// together as [`UNASSIGNED`] before ranking.
pub fn resource_ranking(table: &Table) -> View<Vec<LabelCount>> {
    let Some(cells) = table.column(columns::RESOURCES) else {
        return View::unavailable(columns::RESOURCES);
    };
    let labels = cells.map(|cell| {
        if cell.is_blank() {
            UNASSIGNED.to_string()
        } else {
            cell.to_string()
        }
    });
    View::Available(rank_top(count_first_seen(labels), TOP_N))
}

// ── Row views ─────────────────────────────────────────────────────────────────

/// The oldest tickets by numeric age, oldest first. Tickets without an age
/// are left out; equal ages keep table order.
pub fn oldest_tickets(table: &Table) -> View<Table> {
    let Some(cells) = table.column(columns::AGE) else {
        return View::unavailable(columns::AGE);
    };
    let mut aged: Vec<(usize, f64)> = cells
        .enumerate()
        .filter_map(|(i, cell)| cell.as_number().map(|age| (i, age)))
        .collect();
    aged.sort_by(|a, b| b.1.total_cmp(&a.1));

    let indices: Vec<usize> = aged.into_iter().take(TOP_N).map(|(i, _)| i).collect();
    View::Available(table.select_rows(&indices))
}

/// Column holding the ticket summary text.
fn summary_column(table: &Table) -> Option<&'static str> {
    [columns::SUMMARY, columns::SUMMARY_SHORT]
        .into_iter()
        .find(|c| table.has_column(c))
}

/// `true` when `text` mentions any alert keyword, ignoring case.
pub fn is_alert_text(text: &str) -> bool {
    ALERT_RE.is_match(text)
}

/// The first tickets, in table order, whose summary mentions an alert
/// keyword.
pub fn alert_tickets(table: &Table) -> View<Table> {
    let Some(column) = summary_column(table) else {
        return View::unavailable(columns::SUMMARY);
    };
    let indices: Vec<usize> = (0..table.len())
        .filter(|&i| {
            table
                .cell(i, column)
                .and_then(Cell::label)
                .is_some_and(|text| is_alert_text(&text))
        })
        .take(TOP_N)
        .collect();
    View::Available(table.select_rows(&indices))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
