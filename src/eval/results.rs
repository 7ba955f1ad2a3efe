//! Persistence for evaluation results.
//!
//! Each stage writes its whole record list once, at the end of the run.
//! The file is written to a temporary name in the target directory and
//! renamed into place, so an aborted run never leaves a partial file.

use crate::error::{EvalError, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Filename prefix of runner output.
pub const RESPONSES_PREFIX: &str = "eval_responses_";

/// Filename prefix of grader output.
pub const GRADES_PREFIX: &str = "eval_grades_with_ground_truth_";

/// Run timestamp as embedded in result filenames.
pub fn run_timestamp(at: DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// `eval_responses_<timestamp>.json`
pub fn responses_filename(timestamp: &str) -> String {
    format!("{}{}.json", RESPONSES_PREFIX, timestamp)
}

/// Grades filename carrying over the timestamp of a responses file.
pub fn grades_filename_for(responses_path: &Path) -> String {
    let stem = responses_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let timestamp = stem.strip_prefix(RESPONSES_PREFIX).unwrap_or(stem);
    format!("{}{}.json", GRADES_PREFIX, timestamp)
}

/// Find a responses file given as-is or relative to `<results_dir>/responses`.
pub fn resolve_responses_path(arg: &Path, results_dir: &Path) -> Result<PathBuf> {
    if arg.exists() {
        return Ok(arg.to_path_buf());
    }

    let alt = results_dir.join("responses").join(arg);
    if alt.exists() {
        debug!(path = %alt.display(), "resolved responses file in results directory");
        return Ok(alt);
    }

    Err(EvalError::ResponsesNotFound(arg.to_path_buf()))
}

/// Save records as a pretty-printed JSON array.
pub fn save_records<T: Serialize>(records: &[T], path: &Path) -> Result<()> {
    // Ensure parent directory exists
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    if !parent.exists() {
        fs::create_dir_all(parent).map_err(|e| EvalError::io(parent, e))?;
    }

    let data = serde_json::to_string_pretty(records)
        .map_err(|e| EvalError::Serialization(e.to_string()))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| EvalError::Config(format!("Invalid output path: {}", path.display())))?;
    let tmp_path = parent.join(format!(".{}.tmp", file_name));

    let written = fs::write(&tmp_path, data)
        .map_err(|e| EvalError::io(&tmp_path, e))
        .and_then(|()| fs::rename(&tmp_path, path).map_err(|e| EvalError::io(path, e)));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    info!(count = records.len(), path = %path.display(), "saved records");
    Ok(())
}

/// Load a JSON array of records.
pub fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
    let records: Vec<T> = serde_json::from_str(&content).map_err(|e| {
        EvalError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    info!(count = records.len(), path = %path.display(), "loaded records");
    Ok(records)
}

/// Newest `*.json` file in a directory by modification time.
pub fn latest_results_file(dir: &Path) -> Result<Option<PathBuf>> {
    if !dir.exists() {
        return Ok(None);
    }

    let mut latest: Option<(std::time::SystemTime, PathBuf)> = None;

    for entry in fs::read_dir(dir).map_err(|e| EvalError::io(dir, e))? {
        let entry = entry.map_err(|e| EvalError::io(dir, e))?;
        let path = entry.path();

        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .map_err(|e| EvalError::io(&path, e))?;

        if latest.as_ref().is_none_or(|(t, _)| modified > *t) {
            latest = Some((modified, path));
        }
    }

    Ok(latest.map(|(_, path)| path))
}
