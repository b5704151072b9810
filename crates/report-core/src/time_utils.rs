use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone as _, Utc,
};
use chrono_tz::Tz;
use tracing::debug;

use crate::error::{ReportError, Result};

/// Timezone the membership system reports in.
pub const DEFAULT_REPORT_TIMEZONE: &str = "America/Los_Angeles";

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Uses the `iana-time-zone` crate directly – no subprocess calls.
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

// ── Report date parsing ───────────────────────────────────────────────────────

/// Date-only layouts seen in exports.  chrono accepts unpadded month/day for
/// `%m` / `%d`, so `"1/5/2024"` and `"2024-2-1"` both parse.  `%Y` also takes
/// `"24"` as year 24, so four-digit layouts come first and two-digit years are
/// left to `%y`.
const DATE_FMTS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d", "%m/%d/%y"];

/// Layouts that carry a time component; only the calendar day is kept.
const DATETIME_FMTS: &[&str] = &[
    "%m/%d/%Y, %I:%M:%S %p",
    "%m/%d/%Y, %I:%M %p",
    "%m/%d/%Y, %H:%M:%S",
    "%m/%d/%Y, %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Years below this are a short year read by a four-digit layout.
const MIN_REPORT_YEAR: i32 = 1000;

/// Parse the `Date` column of a report row into a calendar day.
///
/// Returns `None` for empty or unrecognised strings.
pub fn parse_report_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let plausible = |date: NaiveDate| date.year() >= MIN_REPORT_YEAR;

    let parsed = DATE_FMTS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .chain(
            DATETIME_FMTS
                .iter()
                .filter_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date()),
        )
        .chain(DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        .find(|date| plausible(*date));

    if parsed.is_none() {
        debug!("could not parse report date \"{}\"", s);
    }
    parsed
}

/// Format a day the way the export endpoint expects it: `M/D/YYYY`, unpadded.
pub fn format_report_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.month(), date.day(), date.year())
}

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// Converts between calendar days in the report timezone and UTC instants.
#[derive(Debug, Clone, Copy)]
pub struct TimezoneHandler {
    tz: Tz,
}

impl TimezoneHandler {
    /// Create a handler for an IANA timezone name; `"auto"` means the system
    /// timezone.
    pub fn new(tz_name: &str) -> Result<Self> {
        let resolved = if tz_name == "auto" {
            get_system_timezone()
        } else {
            tz_name.to_string()
        };
        let tz = resolved
            .parse::<Tz>()
            .map_err(|_| ReportError::Config(format!("unknown timezone \"{resolved}\"")))?;
        Ok(Self { tz })
    }

    /// Validate that `tz_name` is a recognised IANA timezone identifier.
    pub fn validate_timezone(tz_name: &str) -> bool {
        tz_name == "auto" || tz_name.parse::<Tz>().is_ok()
    }

    /// The configured timezone.
    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// IANA name of the configured timezone.
    pub fn name(&self) -> &'static str {
        self.tz.name()
    }

    /// The instant at which `date` begins in this timezone.
    ///
    /// When midnight falls inside a DST gap the first valid instant after it
    /// is used; when it is ambiguous the earlier instant wins.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        let mut local = midnight;
        for _ in 0..4 {
            if let Some(dt) = self.tz.from_local_datetime(&local).earliest() {
                return dt.with_timezone(&Utc);
            }
            local += Duration::minutes(30);
        }
        // No zone has a gap longer than two hours; treat the wall clock as UTC.
        midnight.and_utc()
    }

    /// Calendar day of `now` in this timezone.
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.tz).date_naive()
    }

    /// Inclusive `[start, end]` day range ending at today, `days` long.
    pub fn lookback_window(&self, now: DateTime<Utc>, days: u32) -> (NaiveDate, NaiveDate) {
        let end = self.local_date(now);
        let start = end - Duration::days(i64::from(days));
        (start, end)
    }

    /// Format a UTC instant in this timezone with a chrono format string.
    pub fn format_local(&self, dt: DateTime<Utc>, fmt: &str) -> String {
        dt.with_timezone(&self.tz).format(fmt).to_string()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
