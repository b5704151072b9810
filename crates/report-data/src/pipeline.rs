//! Generation pipeline: records in, artifacts out.

use std::path::Path;

use chrono::{DateTime, Utc};
use report_core::error::Result;
use report_core::models::{GenerationMarker, TransactionRecord};
use report_core::settings::Settings;
use report_core::time_utils::TimezoneHandler;
use tracing::{info, warn};

use crate::aggregator::{AggregatedReport, MembershipAggregator};
use crate::artifacts::{write_artifacts, ReportArtifacts};
use crate::fetcher::{Credentials, ReportFetcher};
use crate::reader::read_records_file;

/// Summary of one generation run, for logging and the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationMetadata {
    pub total_records: usize,
    pub tracked_records: usize,
    pub dropped_records: usize,
    pub days: usize,
    pub generated_at: DateTime<Utc>,
}

/// Result of [`generate_report`].
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub artifacts: ReportArtifacts,
    pub metadata: GenerationMetadata,
}

/// Aggregate `records` and package the series with a marker for `now`.
pub fn generate_report(
    records: &[TransactionRecord],
    timezone: &TimezoneHandler,
    now: DateTime<Utc>,
) -> Result<GeneratedReport> {
    let AggregatedReport {
        daily,
        payments,
        counts,
        tracked_records,
        dropped_records,
    } = MembershipAggregator::new(*timezone).aggregate(records)?;

    if dropped_records > 0 {
        warn!(
            dropped = dropped_records,
            "ignored records with an untracked membership type"
        );
    }

    let metadata = GenerationMetadata {
        total_records: records.len(),
        tracked_records,
        dropped_records,
        days: daily.len(),
        generated_at: now,
    };

    Ok(GeneratedReport {
        artifacts: ReportArtifacts {
            payments,
            counts,
            marker: GenerationMarker { today: now },
        },
        metadata,
    })
}

/// [`generate_report`] followed by [`write_artifacts`] into `output_dir`.
pub fn generate_and_write(
    records: &[TransactionRecord],
    timezone: &TimezoneHandler,
    now: DateTime<Utc>,
    output_dir: &Path,
) -> Result<GenerationMetadata> {
    let report = generate_report(records, timezone, now)?;
    write_artifacts(output_dir, &report.artifacts)?;

    let m = &report.metadata;
    info!(
        records = m.total_records,
        tracked = m.tracked_records,
        days = m.days,
        dir = %output_dir.display(),
        "report generated"
    );
    Ok(report.metadata)
}

/// Records for a generation run: the `--input` file when given, otherwise a
/// fresh export covering the lookback window ending today.
pub async fn load_records(
    settings: &Settings,
    timezone: &TimezoneHandler,
    now: DateTime<Utc>,
) -> Result<Vec<TransactionRecord>> {
    if let Some(path) = &settings.input {
        info!(path = %path.display(), "reading report from file");
        return read_records_file(path);
    }

    let credentials = Credentials::new(settings.username.as_deref(), settings.password.as_deref())?;
    let fetcher = ReportFetcher::new(&settings.host, credentials, *timezone)?;
    let (start, end) = timezone.lookback_window(now, settings.lookback_days);
    info!(host = %settings.host, from = %start, to = %end, "fetching report");
    fetcher.fetch_records(start, end).await
}

// ── Tests ─────────────────────────────────────────────────────────────────────
