//! Plain-text report rendering of a [`Dashboard`].
//!
//! The report is a sequence of fixed-height pages separated by form feeds.
//! Each page starts with a header line carrying the title and page number.

use dash_core::formatting::{fit_width, format_count, format_number, format_share};
use dash_core::models::{columns, Cell, LabelCount, Table, View, SECONDS_FORMAT};

use crate::analysis::{Dashboard, Share};

/// Page separator.
pub const FORM_FEED: char = '\x0c';

const LABEL_WIDTH: usize = 28;
const BAR_WIDTH: usize = 30;
const RULE: &str = "--------------------------------------------------------------------------";

// ── Options ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Lines per page, including the page header.
    pub page_height: usize,
    pub title: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            page_height: 60,
            title: "Ticket Dashboard".to_string(),
        }
    }
}

// ── Rendering ─────────────────────────────────────────────────────────────────

/// Render `dashboard` as a paginated text report.
pub fn render_report(dashboard: &Dashboard, options: &ReportOptions) -> String {
    let mut body = Vec::new();

    body.push(format!(
        "Generated {}  |  {} view",
        dashboard.generated_at.format(SECONDS_FORMAT),
        dashboard.granularity.title()
    ));
    body.extend(filter_lines(dashboard));
    body.push(String::new());

    section(&mut body, "Summary");
    body.extend(metric_lines(dashboard));

    section(
        &mut body,
        &format!("{} ticket trend", dashboard.granularity.title()),
    );
    body.extend(view_lines(dashboard.trend.as_ref(), |series| {
        bar_lines(&series.points)
    }));

    section(&mut body, "Tickets by status");
    body.extend(view_lines(dashboard.status.as_ref(), |counts| {
        bar_lines(counts)
    }));

    section(&mut body, "Tickets by priority");
    body.extend(view_lines(dashboard.priority.as_ref(), |dist| {
        bar_lines(&dist.semantic_order())
    }));

    section(&mut body, "Ticket age distribution (days)");
    body.extend(view_lines(dashboard.age.as_ref(), |hist| {
        let counts: Vec<LabelCount> = hist
            .bins
            .iter()
            .map(|b| {
                LabelCount::new(
                    format!("{} - {}", format_number(b.start, 0), format_number(b.end, 0)),
                    b.count,
                )
            })
            .collect();
        bar_lines(&counts)
    }));

    section(&mut body, "Top companies");
    body.extend(view_lines(dashboard.companies.as_ref(), |counts| {
        bar_lines(counts)
    }));

    section(&mut body, "Top resources");
    body.extend(view_lines(dashboard.resources.as_ref(), |counts| {
        bar_lines(counts)
    }));

    section(&mut body, "Oldest tickets");
    body.extend(view_lines(dashboard.oldest.as_ref(), |table| {
        ticket_lines(table, columns::AGE)
    }));

    section(&mut body, "Alert tickets");
    body.extend(view_lines(dashboard.alerts.as_ref(), |table| {
        ticket_lines(table, columns::STATUS)
    }));

    paginate(&body, options)
}

/// Split `body` into pages of `page_height` lines, each with a header.
fn paginate(body: &[String], options: &ReportOptions) -> String {
    // Header line plus a blank line.
    let per_page = options.page_height.saturating_sub(2).max(1);
    let chunks: Vec<&[String]> = if body.is_empty() {
        vec![&[]]
    } else {
        body.chunks(per_page).collect()
    };
    let total = chunks.len();

    chunks
        .iter()
        .enumerate()
        .map(|(i, lines)| {
            let mut page = format!("{}    Page {} of {}\n\n", options.title, i + 1, total);
            for line in lines.iter() {
                page.push_str(line);
                page.push('\n');
            }
            page
        })
        .collect::<Vec<_>>()
        .join(&FORM_FEED.to_string())
}

fn section(body: &mut Vec<String>, title: &str) {
    body.push(String::new());
    body.push(title.to_string());
    body.push(RULE[..title.len().min(RULE.len())].to_string());
}

fn filter_lines(dashboard: &Dashboard) -> Vec<String> {
    let f = &dashboard.filters;
    let mut lines = Vec::new();
    if let Some(status) = &f.status {
        lines.push(format!("Status filter: {}", status));
    }
    if let Some(company) = &f.company {
        lines.push(format!("Company filter: {}", company));
    }
    if f.date_from.is_some() || f.date_to.is_some() {
        let bound = |d: Option<chrono::NaiveDate>| {
            d.map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "*".to_string())
        };
        lines.push(format!(
            "Date filter: {} to {}",
            bound(f.date_from),
            bound(f.date_to)
        ));
    }
    lines
}

fn metric_lines(dashboard: &Dashboard) -> Vec<String> {
    let m = &dashboard.metrics;
    let share = |view: &View<Share>| match view {
        View::Available(s) => format_share(s.count, s.percent),
        View::Unavailable { column } => unavailable(column),
    };
    let average = match &m.average_age {
        View::Available(Some(avg)) => format!("{} days", format_number(*avg, 1)),
        View::Available(None) => "n/a".to_string(),
        View::Unavailable { column } => unavailable(column),
    };

    vec![
        format!("{}{}", fit_width("Total tickets", LABEL_WIDTH), format_count(m.total_tickets)),
        format!("{}{}", fit_width("Average age", LABEL_WIDTH), average),
        format!("{}{}", fit_width("Unassigned tickets", LABEL_WIDTH), share(&m.unassigned)),
        format!("{}{}", fit_width("SLA issues", LABEL_WIDTH), share(&m.sla_issues)),
    ]
}

fn unavailable(column: &str) -> String {
    format!("unavailable (no '{}' column)", column)
}

fn view_lines<T>(view: View<&T>, render: impl FnOnce(&T) -> Vec<String>) -> Vec<String> {
    match view {
        View::Available(value) => {
            let lines = render(value);
            if lines.is_empty() {
                vec!["(no tickets)".to_string()]
            } else {
                lines
            }
        }
        View::Unavailable { column } => vec![unavailable(&column)],
    }
}

/// One line per label with a bar scaled to the largest count.
fn bar_lines(counts: &[LabelCount]) -> Vec<String> {
    let max = counts.iter().map(|c| c.count).max().unwrap_or(0);
    counts
        .iter()
        .map(|c| {
            let len = if max == 0 {
                0
            } else {
                (c.count * BAR_WIDTH).div_ceil(max)
            };
            format!(
                "{}{:>7}  {}",
                fit_width(&c.label, LABEL_WIDTH),
                format_count(c.count),
                "#".repeat(len)
            )
        })
        .collect()
}

/// `Ticket #`, summary and one extra column per row.
fn ticket_lines(table: &Table, extra: &str) -> Vec<String> {
    let summary = [columns::SUMMARY, columns::SUMMARY_SHORT]
        .into_iter()
        .find(|c| table.has_column(c));
    let text = |row: usize, column: Option<&str>| {
        column
            .and_then(|c| table.cell(row, c))
            .map(Cell::to_string)
            .unwrap_or_default()
    };

    (0..table.len())
        .map(|row| {
            format!(
                "{} {} {}",
                fit_width(&text(row, Some(columns::TICKET)), 10),
                fit_width(&text(row, summary), 44),
                text(row, Some(extra))
            )
            .trim_end()
            .to_string()
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
