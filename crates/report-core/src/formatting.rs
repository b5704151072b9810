use crate::models::Metric;

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use report_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Nudge by a relative epsilon so exact binary midpoints round up.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let grouped = group_thousands(&(rounded.trunc() as u64).to_string());

    let result = if decimals == 0 {
        grouped
    } else {
        let frac_str = format!("{:.prec$}", rounded.fract(), prec = decimals as usize);
        // "0.50" -> ".50"
        format!("{}{}", grouped, &frac_str[1..])
    };

    if negative && result.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", result)
    } else {
        result
    }
}

/// Format a monetary amount in dollars, dropping the cents when they are zero.
///
/// Mirrors how payment totals are shown on the chart: whole-dollar amounts
/// read `"$1,200"`, fractional ones `"$1,200.50"`.
///
/// # Examples
///
/// ```
/// use report_core::formatting::format_currency;
///
/// assert_eq!(format_currency(1234.56), "$1,234.56");
/// assert_eq!(format_currency(1200.0),  "$1,200");
/// assert_eq!(format_currency(-9.5),    "-$9.50");
/// ```
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let body = if cents % 100 == 0 {
        format_number(amount.abs(), 0)
    } else {
        format_number(amount.abs(), 2)
    };
    if amount < 0.0 && cents != 0 {
        format!("-${}", body)
    } else {
        format!("${}", body)
    }
}

/// Format a renewal count with thousands separators.
pub fn format_count(count: f64) -> String {
    format_number(count, 0)
}

/// Format a series value according to the metric it belongs to.
pub fn format_metric_value(metric: Metric, value: f64) -> String {
    match metric {
        Metric::Payments => format_currency(value),
        Metric::Counts => format_count(value),
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = s.len() % 3;
    for (i, c) in s.chars().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────
