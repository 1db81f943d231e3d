//! Number and column formatting for the text report.

/// Format `value` with `decimals` fixed decimal places and comma-grouped
/// thousands.
///
/// ```
/// use dash_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5, 1), "1,234.5");
/// assert_eq!(format_number(7.0, 0), "7");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let fixed = format!("{:.*}", decimals as usize, value.abs());
    let (whole, fraction) = match fixed.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::new();
    if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    out.push_str(&group_thousands(whole));
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

/// `part` as a percentage of `whole`, rounded to `decimal_places`.
/// An empty whole gives `0.0`.
///
/// ```
/// use dash_core::formatting::percentage;
///
/// assert_eq!(percentage(3.0, 10.0, 1), 30.0);
/// assert_eq!(percentage(5.0, 0.0, 1), 0.0);
/// ```
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    let scale = 10_f64.powi(decimal_places as i32);
    (part * 100.0 / whole * scale).round() / scale
}

/// Format a ticket count with thousands separators.
///
/// ```
/// use dash_core::formatting::format_count;
///
/// assert_eq!(format_count(1578), "1,578");
/// ```
pub fn format_count(count: usize) -> String {
    group_thousands(&count.to_string())
}

/// Format a count together with its share of the total, e.g. `"12 (8.5%)"`.
pub fn format_share(count: usize, percent: f64) -> String {
    format!("{} ({}%)", format_count(count), format_number(percent, 1))
}

/// Left-align `text` in a column of exactly `width` characters.
///
/// Longer text is cut and ends with `~` so report columns stay aligned.
pub fn fit_width(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len <= width {
        format!("{:<width$}", text, width = width)
    } else if width == 0 {
        String::new()
    } else {
        let mut cut: String = text.chars().take(width - 1).collect();
        cut.push('~');
        cut
    }
}

/// Comma-group an unsigned run of digits: `"1234567"` → `"1,234,567"`.
fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

// ── Tests ──────────────────────────────────────────────────────────────────────
