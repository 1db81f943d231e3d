use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use tracing::debug;

use crate::time_utils::TimezoneHandler;

// ── TimestampProcessor ────────────────────────────────────────────────────────

/// Parses the timestamp spellings found in helpdesk exports.
pub struct TimestampProcessor;

impl TimestampProcessor {
    const DATETIME_FORMATS: &'static [&'static str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %I:%M:%S %p",
        "%m/%d/%Y %I:%M %p",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];

    const DATE_FORMATS: &'static [&'static str] =
        &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d-%b-%Y", "%b %d, %Y"];

    /// Parse `s` into a naive wall-clock timestamp.
    ///
    /// Strings with an explicit offset (RFC 3339, RFC 2822) are converted to
    /// the handler's zone first. Date-only strings resolve to midnight.
    /// Returns `None` for blank, `nan`/`NaT` and unrecognised strings.
    pub fn parse(s: &str, tz: &TimezoneHandler) -> Option<NaiveDateTime> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("nat") {
            return None;
        }

        let normalised = match s.strip_suffix('Z') {
            Some(stripped) => format!("{}+00:00", stripped),
            None => s.to_string(),
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Some(tz.to_local(dt.with_timezone(&Utc)));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Some(tz.to_local(dt.with_timezone(&Utc)));
        }

        for fmt in Self::DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(naive);
            }
        }
        for fmt in Self::DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return date.and_hms_opt(0, 0, 0);
            }
        }

        debug!("TimestampProcessor: could not parse timestamp \"{}\"", s);
        None
    }
}

// ── NumberParser ──────────────────────────────────────────────────────────────

/// Strict numeric coercion for columns such as `Total Hours` and `Budget`.
pub struct NumberParser;

impl NumberParser {
    /// Parse the whole (trimmed) string as a finite float.
    pub fn parse(s: &str) -> Option<f64> {
        s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

// ── AgeExtractor ──────────────────────────────────────────────────────────────

static NUMERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.?\d*)").expect("numeral regex is valid"));

/// Pulls the first decimal numeral out of free text such as `"12.5 days"`.
pub struct AgeExtractor;

impl AgeExtractor {
    pub fn extract(s: &str) -> Option<f64> {
        let caps = NUMERAL_RE.captures(s)?;
        caps[1].trim_end_matches('.').parse::<f64>().ok()
    }
}

// ── Classification rules ──────────────────────────────────────────────────────

/// Test applied to a cell's text by a [`Rule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// Missing, empty after trimming, or `nan` in any case.
    Blank,
    /// Case-sensitive substring match.
    Contains(&'static str),
}

impl Predicate {
    pub fn matches(&self, text: Option<&str>) -> bool {
        match (self, text) {
            (Predicate::Blank, None) => true,
            (Predicate::Blank, Some(t)) => {
                let t = t.trim();
                t.is_empty() || t.eq_ignore_ascii_case("nan")
            }
            (Predicate::Contains(_), None) => false,
            (Predicate::Contains(needle), Some(t)) => t.contains(needle),
        }
    }
}

/// A `(predicate, label)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub predicate: Predicate,
    pub label: &'static str,
}

impl Rule {
    pub const fn contains(needle: &'static str, label: &'static str) -> Self {
        Self {
            predicate: Predicate::Contains(needle),
            label,
        }
    }

    pub const fn blank(label: &'static str) -> Self {
        Self {
            predicate: Predicate::Blank,
            label,
        }
    }
}

/// Ordered rules evaluated top to bottom; the first match wins.
#[derive(Debug, Clone, Copy)]
pub struct RuleSet {
    rules: &'static [Rule],
}

impl RuleSet {
    pub const fn new(rules: &'static [Rule]) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &'static [Rule] {
        self.rules
    }

    /// Label of the first matching rule, if any.
    pub fn classify(&self, text: Option<&str>) -> Option<&'static str> {
        self.rules
            .iter()
            .find(|rule| rule.predicate.matches(text))
            .map(|rule| rule.label)
    }
}

/// Priority icons in the export's `Priority` column.
pub const PRIORITY_ICONS: RuleSet = RuleSet::new(&[
    Rule::contains("lime.gif", "Low"),
    Rule::contains("yellow.gif", "Medium"),
    Rule::contains("orange.gif", "High"),
    Rule::contains("purple.gif", "Urgent"),
]);

/// Schedule icons in the export's `Schedule` column.
pub const SCHEDULE_ICONS: RuleSet = RuleSet::new(&[
    Rule::contains("schedule-future.gif", "Future"),
    Rule::contains("schedule-today.gif", "Today"),
    Rule::contains("schedule-past.gif", "Past"),
    Rule::contains("noperson.gif", "Unassigned"),
]);

/// Free-text SLA descriptions collapsed to a small vocabulary.
pub const SLA_STATUS_RULES: RuleSet = RuleSet::new(&[
    Rule::blank("No SLA"),
    Rule::contains("Plan by", "Planned"),
    Rule::contains("Resolve by", "Needs Resolution"),
    Rule::contains("Waiting", "Waiting"),
]);

/// Canonical priority labels in their semantic order.
pub const PRIORITY_ORDER: &[&str] = &["Low", "Medium", "High", "Urgent"];

/// `true` when `text` looks like an exported icon path rather than a label.
pub fn has_icon_path(text: &str) -> bool {
    text.contains("common/images") || text.contains(".gif")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
