//! Daily and cumulative aggregation of membership changes.
//!
//! Records are bucketed by calendar day, each bucket carrying an explicit
//! value for every tracked [`MembershipType`].  A single fold over the sorted
//! buckets then produces the cumulative payment and count series, so both
//! share the same date axis.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use report_core::error::{ReportError, Result};
use report_core::models::{
    CountEntry, DailyBucket, PaymentEntry, SeriesEntry, TransactionRecord, TypeValues,
};
use report_core::time_utils::TimezoneHandler;
use tracing::debug;

// ── Cost coercion ─────────────────────────────────────────────────────────────

fn leading_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("valid cost regex")
    })
}

/// Coerce a raw cost column to dollars.
///
/// The longest leading decimal number is used (`"12.50 USD"` is 12.5);
/// anything without one, or anything non-finite, counts as zero.
pub fn parse_cost(raw: &str) -> f64 {
    leading_number()
        .find(raw.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

// ── Daily buckets ─────────────────────────────────────────────────────────────

/// Bucket `records` by calendar day, ascending.
///
/// Every day present in the input gets a bucket, even when all of its records
/// have untracked types; such records add nothing to the bucket.
pub fn aggregate_daily(records: &[TransactionRecord]) -> Vec<DailyBucket> {
    // BTreeMap keeps days in calendar order.
    let mut days: BTreeMap<NaiveDate, DailyBucket> = BTreeMap::new();

    for record in records {
        let bucket = days
            .entry(record.date)
            .or_insert_with(|| DailyBucket::empty(record.date));

        let Some(membership_type) = record.membership_type() else {
            continue;
        };

        bucket.payments[membership_type] += parse_cost(&record.cost);
        bucket.counts[membership_type] += 1;
    }

    days.into_values().collect()
}

// ── Cumulative series ─────────────────────────────────────────────────────────

/// Running totals over `daily`, for payments and counts in one pass.
///
/// The first entry is the first bucket unchanged; every later entry adds that
/// day's values to the previous entry.  Fails with [`ReportError::NoRecords`]
/// when there is no first day.
pub fn accumulate(
    daily: &[DailyBucket],
    timezone: &TimezoneHandler,
) -> Result<(Vec<PaymentEntry>, Vec<CountEntry>)> {
    let (first, rest) = daily.split_first().ok_or(ReportError::NoRecords)?;

    let mut payments = Vec::with_capacity(daily.len());
    let mut counts = Vec::with_capacity(daily.len());

    let mut running_payments = first.payments;
    let mut running_counts = first.counts;
    let mut push = |date: NaiveDate, p: TypeValues<f64>, c: TypeValues<u32>| {
        let date = timezone.start_of_day(date);
        payments.push(SeriesEntry { date, values: p });
        counts.push(SeriesEntry { date, values: c });
    };

    push(first.date, running_payments, running_counts);
    for bucket in rest {
        running_payments = running_payments + bucket.payments;
        running_counts = running_counts + bucket.counts;
        push(bucket.date, running_payments, running_counts);
    }

    Ok((payments, counts))
}

// ── MembershipAggregator ──────────────────────────────────────────────────────

/// Everything one aggregation run produces.
#[derive(Debug, Clone)]
pub struct AggregatedReport {
    /// Per-day totals (not persisted).
    pub daily: Vec<DailyBucket>,
    /// Cumulative payment amount per type.
    pub payments: Vec<PaymentEntry>,
    /// Cumulative renewal count per type.
    pub counts: Vec<CountEntry>,
    /// Records whose destination type is tracked.
    pub tracked_records: usize,
    /// Records ignored because their destination type is not tracked.
    pub dropped_records: usize,
}

/// Turns a snapshot of report records into cumulative series.
#[derive(Debug, Clone, Copy)]
pub struct MembershipAggregator {
    timezone: TimezoneHandler,
}

impl MembershipAggregator {
    /// Series timestamps are the start of each day in `timezone`.
    pub fn new(timezone: TimezoneHandler) -> Self {
        Self { timezone }
    }

    /// Aggregate `records` into daily buckets and both cumulative series.
    pub fn aggregate(&self, records: &[TransactionRecord]) -> Result<AggregatedReport> {
        if records.is_empty() {
            return Err(ReportError::NoRecords);
        }

        let tracked_records = records
            .iter()
            .filter(|r| r.membership_type().is_some())
            .count();
        let dropped_records = records.len() - tracked_records;

        let daily = aggregate_daily(records);
        let (payments, counts) = accumulate(&daily, &self.timezone)?;

        debug!(
            days = daily.len(),
            tracked = tracked_records,
            dropped = dropped_records,
            "aggregated membership changes"
        );

        Ok(AggregatedReport {
            daily,
            payments,
            counts,
            tracked_records,
            dropped_records,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use report_core::models::MembershipType;

    fn record(date: &str, to: &str, cost: &str) -> TransactionRecord {
        TransactionRecord {
            date: report_core::time_utils::parse_report_date(date).unwrap(),
            from_type: String::new(),
            to_type: to.to_string(),
            cost: cost.to_string(),
        }
    }

    fn utc_aggregator() -> MembershipAggregator {
        MembershipAggregator::new(TimezoneHandler::new("UTC").unwrap())
    }

    fn scenario() -> Vec<TransactionRecord> {
        vec![
            record("1/1/2024", "Flexible", "10"),
            record("1/1/2024", "Flexible", "abc"),
            record("1/2/2024", "Flexible", "5"),
            record("1/2/2024", "Unknown", "999"),
        ]
    }

    fn mixed_records() -> Vec<TransactionRecord> {
        vec![
            record("10/1/2024", "Standard (Annual)", "120"),
            record("2/1/2024", "Flexible", "15.5"),
            record("2/1/2024", "regular", "0"),
            record("3/15/2024", "Sustaining (Annual)", "250"),
            record("2/1/2024", "Standard (Monthly)", "12"),
            record("3/15/2024", "Gold", "1000"),
            record("10/1/2024", "Flexible", "n/a"),
            record("3/15/2024", "Standard (Monthly)", "12"),
        ]
    }

    // ── parse_cost ────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_cost_plain_numbers() {
        assert_eq!(parse_cost("10"), 10.0);
        assert_eq!(parse_cost("12.50"), 12.5);
        assert_eq!(parse_cost("-3"), -3.0);
        assert_eq!(parse_cost(".5"), 0.5);
        assert_eq!(parse_cost("1e2"), 100.0);
    }

    #[test]
    fn test_parse_cost_uses_leading_number() {
        assert_eq!(parse_cost("  12.50 USD"), 12.5);
        assert_eq!(parse_cost("7abc"), 7.0);
    }

    #[test]
    fn test_parse_cost_invalid_is_zero() {
        assert_eq!(parse_cost(""), 0.0);
        assert_eq!(parse_cost("abc"), 0.0);
        assert_eq!(parse_cost("$10"), 0.0);
        assert_eq!(parse_cost("NaN"), 0.0);
        assert_eq!(parse_cost("1e999"), 0.0);
    }

    // ── aggregate_daily ───────────────────────────────────────────────────────

    #[test]
    fn test_scenario_daily_buckets() {
        let daily = aggregate_daily(&scenario());

        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].payments[MembershipType::Flexible], 10.0);
        assert_eq!(daily[0].counts[MembershipType::Flexible], 2);
        assert_eq!(daily[1].payments[MembershipType::Flexible], 5.0);
        assert_eq!(daily[1].counts[MembershipType::Flexible], 1);
    }

    #[test]
    fn test_daily_sorted_by_calendar_date() {
        let daily = aggregate_daily(&mixed_records());
        let dates: Vec<String> = daily.iter().map(|b| b.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-02-01", "2024-03-15", "2024-10-01"]);
    }

    #[test]
    fn test_daily_is_dense_with_explicit_zeros() {
        let records = vec![
            record("5/5/2024", "Flexible", "20"),
            record("5/5/2024", "Standard (Annual)", "0"),
        ];
        let daily = aggregate_daily(&records);

        assert_eq!(daily.len(), 1);
        let bucket = &daily[0];
        assert_eq!(bucket.payments[MembershipType::Flexible], 20.0);
        assert_eq!(bucket.payments[MembershipType::StandardAnnual], 0.0);
        assert_eq!(bucket.counts[MembershipType::StandardAnnual], 1);
        for t in [
            MembershipType::StandardMonthly,
            MembershipType::SustainingAnnual,
            MembershipType::Regular,
        ] {
            assert_eq!(bucket.payments[t], 0.0);
            assert_eq!(bucket.counts[t], 0);
        }
    }

    #[test]
    fn test_unparseable_cost_still_counts() {
        let daily = aggregate_daily(&[record("1/1/2024", "regular", "free")]);
        assert_eq!(daily[0].payments[MembershipType::Regular], 0.0);
        assert_eq!(daily[0].counts[MembershipType::Regular], 1);
    }

    #[test]
    fn test_untracked_only_day_still_has_zero_bucket() {
        let daily = aggregate_daily(&[record("1/3/2024", "Gold", "50")]);
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].payments.total(), 0.0);
        assert_eq!(daily[0].counts.total(), 0.0);
    }

    // ── accumulate ────────────────────────────────────────────────────────────

    #[test]
    fn test_scenario_cumulative() {
        let report = utc_aggregator().aggregate(&scenario()).unwrap();

        assert_eq!(report.payments.len(), 2);
        assert_eq!(report.payments[0].values[MembershipType::Flexible], 10.0);
        assert_eq!(report.counts[0].values[MembershipType::Flexible], 2);
        assert_eq!(report.payments[1].values[MembershipType::Flexible], 15.0);
        assert_eq!(report.counts[1].values[MembershipType::Flexible], 3);
        assert_eq!(report.tracked_records, 3);
        assert_eq!(report.dropped_records, 1);
    }

    #[test]
    fn test_first_cumulative_equals_first_daily() {
        let report = utc_aggregator().aggregate(&mixed_records()).unwrap();
        let tz = TimezoneHandler::new("UTC").unwrap();

        assert_eq!(report.payments[0].values, report.daily[0].payments);
        assert_eq!(report.counts[0].values, report.daily[0].counts);
        assert_eq!(report.payments[0].date, tz.start_of_day(report.daily[0].date));
    }

    #[test]
    fn test_cumulative_recurrence_holds_for_every_type() {
        let report = utc_aggregator().aggregate(&mixed_records()).unwrap();

        for i in 1..report.daily.len() {
            for t in MembershipType::ALL {
                let expected_payment =
                    report.payments[i - 1].values[t] + report.daily[i].payments[t];
                assert!((report.payments[i].values[t] - expected_payment).abs() < 1e-9);

                let expected_count = report.counts[i - 1].values[t] + report.daily[i].counts[t];
                assert_eq!(report.counts[i].values[t], expected_count);
            }
        }
    }

    #[test]
    fn test_cumulative_is_non_decreasing() {
        let report = utc_aggregator().aggregate(&mixed_records()).unwrap();

        for pair in report.payments.windows(2) {
            for t in MembershipType::ALL {
                assert!(pair[1].values[t] >= pair[0].values[t]);
            }
        }
        for pair in report.counts.windows(2) {
            for t in MembershipType::ALL {
                assert!(pair[1].values[t] >= pair[0].values[t]);
            }
        }
    }

    #[test]
    fn test_dates_strictly_ascending_and_shared() {
        let report = utc_aggregator().aggregate(&mixed_records()).unwrap();

        for pair in report.payments.windows(2) {
            assert!(pair[0].date < pair[1].date);
        }
        let payment_dates: Vec<_> = report.payments.iter().map(|e| e.date).collect();
        let count_dates: Vec<_> = report.counts.iter().map(|e| e.date).collect();
        assert_eq!(payment_dates, count_dates);
    }

    #[test]
    fn test_untracked_records_do_not_change_output() {
        let with_noise = mixed_records();
        let without_noise: Vec<_> = with_noise
            .iter()
            .filter(|r| r.membership_type().is_some())
            .cloned()
            .collect();

        let a = utc_aggregator().aggregate(&with_noise).unwrap();
        let b = utc_aggregator().aggregate(&without_noise).unwrap();

        assert_eq!(a.payments, b.payments);
        assert_eq!(a.counts, b.counts);
    }

    #[test]
    fn test_timestamps_are_local_midnight() {
        let aggregator =
            MembershipAggregator::new(TimezoneHandler::new("America/Los_Angeles").unwrap());
        let report = aggregator.aggregate(&scenario()).unwrap();

        // 2024-01-01T00:00:00-08:00
        assert_eq!(report.payments[0].date.timestamp_millis(), 1_704_096_000_000);
        assert_eq!(report.counts[1].date.timestamp_millis(), 1_704_182_400_000);
    }

    // ── empty input ───────────────────────────────────────────────────────────

    #[test]
    fn test_spellings_of_one_day_share_a_bucket() {
        let csv = "Date,From,To,Cost\n\
                   1/1/2024,,Flexible,10\n\
                   01/01/2024,,Flexible,5\n\
                   2024-01-01,,Regular,ignored\n\
                   2024-01-01,,regular,3\n\
                   \"1/1/2024, 9:15 AM\",,Flexible,1\n\
                   1/2/24,,Flexible,2\n";
        let records = crate::reader::parse_records_str(csv).unwrap();
        let report = utc_aggregator().aggregate(&records).unwrap();

        let dates: Vec<String> = report.daily.iter().map(|b| b.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-02"]);

        let first = &report.daily[0];
        assert_eq!(first.payments[MembershipType::Flexible], 16.0);
        assert_eq!(first.counts[MembershipType::Flexible], 3);
        assert_eq!(first.payments[MembershipType::Regular], 3.0);
        assert_eq!(first.counts[MembershipType::Regular], 1);

        assert_eq!(report.payments.len(), 2);
        assert_eq!(report.payments[1].values[MembershipType::Flexible], 18.0);
        assert_eq!(report.counts[1].values[MembershipType::Flexible], 4);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let err = utc_aggregator().aggregate(&[]).unwrap_err();
        assert!(matches!(err, ReportError::NoRecords));
    }

    #[test]
    fn test_accumulate_empty_is_an_error() {
        let tz = TimezoneHandler::new("UTC").unwrap();
        assert!(matches!(accumulate(&[], &tz), Err(ReportError::NoRecords)));
    }
}
