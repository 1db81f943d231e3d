use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::error::{DashboardError, Result};

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Uses the `iana-time-zone` crate directly – no subprocess calls.
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// The wall-clock timezone ticket timestamps are expressed in.
///
/// Export files carry naive local timestamps, so every timestamp the pipeline
/// stores is naive. Offset-bearing inputs and the processing instant are
/// converted into this zone before the offset is dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimezoneHandler {
    tz: Tz,
}

impl TimezoneHandler {
    /// Create a handler for `tz_name`.
    ///
    /// `"auto"` resolves to the system timezone. An unrecognised name falls
    /// back to UTC and logs a warning.
    pub fn new(tz_name: &str) -> Self {
        let resolved = if tz_name.eq_ignore_ascii_case("auto") {
            get_system_timezone()
        } else {
            tz_name.to_string()
        };
        let tz = resolved.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "TimezoneHandler: unrecognised timezone \"{}\", falling back to UTC",
                resolved
            );
            Tz::UTC
        });
        Self { tz }
    }

    pub fn utc() -> Self {
        Self { tz: Tz::UTC }
    }

    /// Validate that `tz_name` is a recognised IANA timezone identifier.
    pub fn validate_timezone(tz_name: &str) -> bool {
        tz_name.parse::<Tz>().is_ok()
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Convert a UTC instant into naive wall-clock time in this zone.
    pub fn to_local(&self, dt: DateTime<Utc>) -> NaiveDateTime {
        dt.with_timezone(&self.tz).naive_local()
    }

    /// The processing instant as naive wall-clock time in this zone.
    pub fn now_local(&self) -> NaiveDateTime {
        self.to_local(Utc::now())
    }
}

impl Default for TimezoneHandler {
    fn default() -> Self {
        Self::utc()
    }
}

// ── Date arguments ────────────────────────────────────────────────────────────

/// Parse a `YYYY-MM-DD` date as used by the date-range filters.
pub fn parse_date_arg(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| DashboardError::DateParse(s.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
