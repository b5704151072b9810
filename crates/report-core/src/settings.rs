use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ReportError, Result};
use crate::models::{MembershipType, Metric};
use crate::time_utils::{TimezoneHandler, DEFAULT_REPORT_TIMEZONE};

/// Host of the upstream membership system.
pub const DEFAULT_HOST: &str = "capitolhill.myturn.com";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Cumulative membership renewal report
#[derive(Parser, Debug, Clone)]
#[command(
    name = "membership-report",
    about = "Fetch the membership change report, build cumulative renewal series and chart them",
    version
)]
pub struct Settings {
    /// What to run: fetch + aggregate, view existing artifacts, or both
    #[arg(long, default_value = "generate", value_parser = ["generate", "view", "all"])]
    pub mode: String,

    /// Membership system host
    #[arg(long, env = "MYTURN_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Login user name
    #[arg(long, env = "MYTURN_USERNAME", hide_env_values = true)]
    pub username: Option<String>,

    /// Login password
    #[arg(long, env = "MYTURN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Days of history to request, ending today
    #[arg(long, default_value = "60", value_parser = clap::value_parser!(u32).range(1..=366))]
    pub lookback_days: u32,

    /// Timezone the report dates are in ("auto" for the system timezone)
    #[arg(long, default_value = DEFAULT_REPORT_TIMEZONE)]
    pub timezone: String,

    /// Directory the JSON artifacts are written to and read from
    #[arg(long, default_value = "report")]
    pub output_dir: PathBuf,

    /// Read the report from a local CSV file instead of fetching it
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Series shown first in the viewer
    #[arg(long, default_value = "payments", value_parser = ["payments", "counts"])]
    pub metric: String,

    /// Overlay series instead of stacking them
    #[arg(long)]
    pub unstacked: bool,

    /// Display theme
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "classic", "auto"])]
    pub theme: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,

    /// Membership types hidden in the viewer (restored from last use).
    #[arg(skip)]
    pub hidden_types: Vec<MembershipType>,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.membership-report/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden_types: Option<Vec<MembershipType>>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".membership-report").join("last_used.json")
    }

    /// Load persisted params from the default path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load persisted params from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to the default path.
    pub fn save(&self) -> std::result::Result<(), std::io::Error> {
        self.save_to(&Self::config_path())
    }

    /// Atomically write params to an explicit path, creating parent
    /// directories if needed.
    pub fn save_to(&self, path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments and merge with last-used params where no explicit
    /// CLI value was provided.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation – accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::resolve_auto_values(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins over persisted values.
        if !is_arg_explicitly_set(&matches, "theme") {
            if let Some(v) = last.theme {
                settings.theme = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(v) = last.timezone {
                settings.timezone = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "output_dir") {
            if let Some(v) = last.output_dir {
                settings.output_dir = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "metric") {
            if let Some(v) = last.metric {
                settings.metric = v.name().to_string();
            }
        }
        if !is_arg_explicitly_set(&matches, "unstacked") {
            if let Some(stacked) = last.stacked {
                settings.unstacked = !stacked;
            }
        }
        if let Some(hidden) = last.hidden_types {
            settings.hidden_types = hidden;
        }

        settings = Self::resolve_auto_values(settings);

        let _ = LastUsedParams::from(&settings).save_to(config_path);

        settings
    }

    /// Resolve the `"auto"` timezone and apply the `--debug` flag.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        if settings.timezone == "auto" {
            settings.timezone = crate::time_utils::get_system_timezone();
        }
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Check values clap cannot validate on its own.
    pub fn validate(&self) -> Result<()> {
        if !TimezoneHandler::validate_timezone(&self.timezone) {
            return Err(ReportError::Config(format!(
                "unknown timezone \"{}\"",
                self.timezone
            )));
        }
        Ok(())
    }

    /// Viewer metric selected on the command line.
    pub fn selected_metric(&self) -> Metric {
        Metric::from_name(&self.metric)
    }

    /// Whether the mode includes fetching and aggregating.
    pub fn generates(&self) -> bool {
        matches!(self.mode.as_str(), "generate" | "all")
    }

    /// Whether the mode includes the viewer.
    pub fn views(&self) -> bool {
        matches!(self.mode.as_str(), "view" | "all")
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            theme: Some(s.theme.clone()),
            timezone: Some(s.timezone.clone()),
            output_dir: Some(s.output_dir.clone()),
            metric: Some(s.selected_metric()),
            stacked: Some(!s.unstacked),
            hidden_types: Some(s.hidden_types.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tmp_config_path(tmp: &TempDir) -> PathBuf {
        LastUsedParams::config_path_in(tmp.path())
    }

    fn args(list: &[&str]) -> Vec<std::ffi::OsString> {
        list.iter().map(|s| (*s).into()).collect()
    }

    #[test]
    fn test_last_used_params_save_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        let params = LastUsedParams {
            theme: Some("dark".to_string()),
            timezone: Some("America/Denver".to_string()),
            output_dir: Some(PathBuf::from("/srv/report")),
            metric: Some(Metric::Counts),
            stacked: Some(false),
            hidden_types: Some(vec![MembershipType::Regular]),
        };

        params.save_to(&path).expect("save");
        let loaded = LastUsedParams::load_from(&path);

        assert_eq!(loaded, params);
    }

    #[test]
    fn test_last_used_params_clear() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);

        LastUsedParams::default().save_to(&path).expect("save");
        assert!(path.exists(), "file must exist after save");

        LastUsedParams::clear_at(&path).expect("clear");
        assert!(!path.exists(), "file must be gone after clear");
    }

    #[test]
    fn test_last_used_params_default_when_missing_or_corrupt() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        assert_eq!(LastUsedParams::load_from(&path), LastUsedParams::default());

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(LastUsedParams::load_from(&path), LastUsedParams::default());
    }

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["membership-report"]);

        assert_eq!(settings.mode, "generate");
        assert_eq!(settings.lookback_days, 60);
        assert_eq!(settings.timezone, "America/Los_Angeles");
        assert_eq!(settings.output_dir, PathBuf::from("report"));
        assert!(settings.input.is_none());
        assert_eq!(settings.metric, "payments");
        assert!(!settings.unstacked);
        assert_eq!(settings.theme, "auto");
        assert_eq!(settings.log_level, "INFO");
        assert!(!settings.debug);
        assert!(settings.hidden_types.is_empty());
        assert!(settings.generates());
        assert!(!settings.views());
    }

    #[test]
    fn test_settings_mode_all_generates_and_views() {
        let settings = Settings::parse_from(["membership-report", "--mode", "all"]);
        assert!(settings.generates());
        assert!(settings.views());
    }

    #[test]
    fn test_settings_rejects_out_of_range_lookback() {
        let result = Settings::try_parse_from(["membership-report", "--lookback-days", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_credentials_from_cli() {
        let settings = Settings::parse_from([
            "membership-report",
            "--username",
            "desk",
            "--password",
            "hunter2",
        ]);
        assert_eq!(settings.username.as_deref(), Some("desk"));
        assert_eq!(settings.password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn test_validate_rejects_unknown_timezone() {
        let settings = Settings::parse_from(["membership-report", "--timezone", "Nowhere/Land"]);
        assert!(settings.validate().is_err());

        let settings = Settings::parse_from(["membership-report"]);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_with_last_used_restores_view_state() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            theme: Some("classic".to_string()),
            metric: Some(Metric::Counts),
            stacked: Some(false),
            hidden_types: Some(vec![MembershipType::Flexible]),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings =
            Settings::load_with_last_used_impl(args(&["membership-report"]), &config_path);

        assert_eq!(settings.theme, "classic");
        assert_eq!(settings.metric, "counts");
        assert!(settings.unstacked);
        assert_eq!(settings.hidden_types, vec![MembershipType::Flexible]);
    }

    #[test]
    fn test_load_with_last_used_cli_overrides_persisted() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            theme: Some("dark".to_string()),
            metric: Some(Metric::Counts),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(
            args(&["membership-report", "--theme", "light", "--metric", "payments"]),
            &config_path,
        );
        assert_eq!(settings.theme, "light");
        assert_eq!(settings.metric, "payments");
    }

    #[test]
    fn test_load_with_last_used_clear_removes_file() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            theme: Some("classic".to_string()),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(
            args(&["membership-report", "--clear"]),
            &config_path,
        );

        assert!(!config_path.exists(), "file must be gone after --clear");
        assert_eq!(settings.theme, "auto");
    }

    #[test]
    fn test_load_with_last_used_debug_overrides_log_level() {
        let tmp = TempDir::new().expect("tempdir");
        let settings = Settings::load_with_last_used_impl(
            args(&["membership-report", "--debug"]),
            &tmp_config_path(&tmp),
        );
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_load_with_last_used_persists_after_run() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        Settings::load_with_last_used_impl(
            args(&["membership-report", "--metric", "counts"]),
            &config_path,
        );

        let loaded = LastUsedParams::load_from(&config_path);
        assert_eq!(loaded.metric, Some(Metric::Counts));
        assert_eq!(loaded.stacked, Some(true));
    }
}
