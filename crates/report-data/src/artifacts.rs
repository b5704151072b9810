//! Persisted report artifacts.
//!
//! A generation run leaves three JSON files in the output directory: the
//! cumulative payment series, the cumulative count series and a marker with
//! the generation time.  The viewer only ever reads these files.

use std::fs;
use std::path::{Path, PathBuf};

use report_core::error::{ReportError, Result};
use report_core::models::{CountEntry, GenerationMarker, PaymentEntry};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

pub const PAYMENTS_FILE: &str = "cum_payments.json";
pub const COUNTS_FILE: &str = "cum_counts.json";
pub const MARKER_FILE: &str = "today.json";

/// Contents of the three artifact files.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportArtifacts {
    pub payments: Vec<PaymentEntry>,
    pub counts: Vec<CountEntry>,
    pub marker: GenerationMarker,
}

/// Write all artifacts into `dir`, creating it if needed.
///
/// Every file is serialised and staged as a `.json.tmp` sibling before any
/// target is replaced.  If staging fails the staged files are removed and the
/// previous artifacts stay untouched.
pub fn write_artifacts(dir: &Path, artifacts: &ReportArtifacts) -> Result<()> {
    let files = [
        (PAYMENTS_FILE, to_pretty_json(&artifacts.payments)?),
        (COUNTS_FILE, to_pretty_json(&artifacts.counts)?),
        (MARKER_FILE, to_pretty_json(&artifacts.marker)?),
    ];

    fs::create_dir_all(dir)?;

    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(files.len());
    for (name, bytes) in &files {
        let target = dir.join(name);
        let tmp = target.with_extension("json.tmp");
        if let Err(e) = fs::write(&tmp, bytes) {
            warn!(path = %tmp.display(), "failed to stage artifact: {e}");
            discard_staged(&staged);
            return Err(e.into());
        }
        debug!(path = %tmp.display(), bytes = bytes.len(), "staged artifact");
        staged.push((tmp, target));
    }

    for (tmp, target) in &staged {
        fs::rename(tmp, target)?;
        debug!(path = %target.display(), "wrote artifact");
    }

    info!(
        dir = %dir.display(),
        days = artifacts.payments.len(),
        "report artifacts written"
    );
    Ok(())
}

fn discard_staged(staged: &[(PathBuf, PathBuf)]) {
    for (tmp, _) in staged {
        if let Err(e) = fs::remove_file(tmp) {
            warn!(path = %tmp.display(), "failed to remove staged artifact: {e}");
        }
    }
}

/// Load the artifacts from `dir`; series are returned in date order.
pub fn load_artifacts(dir: &Path) -> Result<ReportArtifacts> {
    let mut payments: Vec<PaymentEntry> = read_json(&dir.join(PAYMENTS_FILE))?;
    let mut counts: Vec<CountEntry> = read_json(&dir.join(COUNTS_FILE))?;
    let marker: GenerationMarker = read_json(&dir.join(MARKER_FILE))?;

    payments.sort_by_key(|e| e.date);
    counts.sort_by_key(|e| e.date);

    Ok(ReportArtifacts {
        payments,
        counts,
        marker,
    })
}

/// Paths of the three artifact files inside `dir`.
pub fn artifact_paths(dir: &Path) -> [PathBuf; 3] {
    [
        dir.join(PAYMENTS_FILE),
        dir.join(COUNTS_FILE),
        dir.join(MARKER_FILE),
    ]
}

fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(buf)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|source| ReportError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
