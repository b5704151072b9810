mod bootstrap;

use anyhow::Result;
use chrono::Utc;
use report_core::error::ReportError;
use report_core::settings::{LastUsedParams, Settings};
use report_core::time_utils::TimezoneHandler;
use report_data::artifacts::load_artifacts;
use report_data::pipeline::{generate_and_write, load_records};
use report_ui::app::App;
use report_ui::chart_view::ReportView;
use report_ui::state::ViewState;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();
    settings.validate()?;

    bootstrap::ensure_directories()?;
    // The viewer owns the terminal, so its logs go to a file by default.
    let log_file = settings
        .log_file
        .clone()
        .or_else(|| settings.views().then(bootstrap::default_log_file));
    bootstrap::setup_logging(&settings.log_level, log_file.as_deref())?;

    tracing::info!("Membership Report v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Mode: {}, Timezone: {}, Output: {}",
        settings.mode,
        settings.timezone,
        settings.output_dir.display()
    );

    let timezone = TimezoneHandler::new(&settings.timezone)?;

    if settings.generates() {
        let now = Utc::now();
        let records = load_records(&settings, &timezone, now).await?;
        let metadata = generate_and_write(&records, &timezone, now, &settings.output_dir)?;

        if !settings.views() {
            println!(
                "Wrote {} days ({} of {} records tracked) to {}",
                metadata.days,
                metadata.tracked_records,
                metadata.total_records,
                settings.output_dir.display()
            );
        }
    }

    if settings.views() {
        let artifacts = load_artifacts(&settings.output_dir)?;
        let view = ReportView::new(&artifacts.payments, &artifacts.counts, artifacts.marker);
        let state = ViewState::new(
            settings.selected_metric(),
            !settings.unstacked,
            &settings.hidden_types,
        );

        let app = App::new(&settings.theme, timezone, view, state);
        let final_state = app
            .run()
            .map_err(|e| ReportError::Terminal(e.to_string()))?;

        if !settings.clear {
            if let Err(e) = last_used_for(&settings, &final_state).save() {
                tracing::warn!("Failed to save view state: {e}");
            }
        }
    }

    Ok(())
}

/// Last-used parameters reflecting where the user left the viewer.
fn last_used_for(settings: &Settings, state: &ViewState) -> LastUsedParams {
    LastUsedParams {
        metric: Some(state.metric),
        stacked: Some(state.stacked),
        hidden_types: Some(state.hidden_types()),
        ..LastUsedParams::from(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use report_core::models::{MembershipType, Metric};

    #[test]
    fn test_last_used_for_takes_view_state() {
        let settings = Settings::parse_from([
            "membership-report",
            "--mode",
            "view",
            "--theme",
            "light",
            "--metric",
            "payments",
        ]);
        let state = ViewState::new(Metric::Counts, false, &[MembershipType::Regular]);

        let last = last_used_for(&settings, &state);

        assert_eq!(last.theme.as_deref(), Some("light"));
        assert_eq!(last.metric, Some(Metric::Counts));
        assert_eq!(last.stacked, Some(false));
        assert_eq!(last.hidden_types, Some(vec![MembershipType::Regular]));
        assert_eq!(last.output_dir, Some(settings.output_dir.clone()));
    }
}
