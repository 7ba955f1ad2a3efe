//! CSV data sources the chat agent answers from.
//!
//! The municipality publishes three tables: the official notice board,
//! news messages and website content. They are validated up front and
//! rendered into a text section of the agent's system prompt.

use crate::error::{EvalError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Marker appended when table text is cut at the size limit.
pub const TRUNCATION_MARKER: &str = "[... data zkrácena ...]";

/// Check that every CSV file exists, is a file and is readable.
///
/// Relative paths are resolved against `base_path` when one is given.
pub fn validate_csv_files(files: &[PathBuf], base_path: Option<&Path>) -> Result<Vec<PathBuf>> {
    let mut validated = Vec::with_capacity(files.len());

    for file in files {
        let full_path = match base_path {
            Some(base) if file.is_relative() => base.join(file),
            _ => file.clone(),
        };

        if !full_path.exists() {
            return Err(EvalError::DataSource(format!(
                "CSV file not found: {}",
                full_path.display()
            )));
        }

        if !full_path.is_file() {
            return Err(EvalError::DataSource(format!(
                "Path is not a file: {}",
                full_path.display()
            )));
        }

        let is_csv = full_path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if !is_csv {
            warn!(path = %full_path.display(), "file does not have .csv extension");
        }

        std::fs::File::open(&full_path).map_err(|e| {
            EvalError::DataSource(format!("Cannot read CSV file {}: {}", full_path.display(), e))
        })?;

        debug!(path = %full_path.display(), "validated CSV file");
        validated.push(full_path);
    }

    info!(count = validated.len(), "validated CSV files");
    Ok(validated)
}

/// One loaded CSV table.
#[derive(Debug, Clone)]
pub struct Table {
    /// Table name (file stem).
    pub name: String,
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Read a CSV file with a header row.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| {
                EvalError::DataSource(format!("Cannot open CSV file {}: {}", path.display(), e))
            })?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| {
                EvalError::DataSource(format!("Bad CSV header in {}: {}", path.display(), e))
            })?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows: Vec<Vec<String>> = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| {
                EvalError::DataSource(format!(
                    "Bad CSV record {} in {}: {}",
                    line + 1,
                    path.display(),
                    e
                ))
            })?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("table")
            .to_string();

        Ok(Self {
            name,
            path: path.to_path_buf(),
            headers,
            rows,
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// All tables available to the agent.
#[derive(Debug, Clone, Default)]
pub struct DataCatalog {
    pub tables: Vec<Table>,
}

impl DataCatalog {
    /// Load every table from already validated paths.
    pub fn load(paths: &[PathBuf]) -> Result<Self> {
        let tables = paths
            .iter()
            .map(|p| Table::load(p))
            .collect::<Result<Vec<_>>>()?;

        for table in &tables {
            debug!(
                table = %table.name,
                path = %table.path.display(),
                rows = table.row_count(),
                columns = table.headers.len(),
                "loaded table"
            );
        }

        Ok(Self { tables })
    }

    /// Render the tables as prompt text, cut at `max_chars` characters.
    pub fn render(&self, max_chars: usize) -> String {
        let mut out = String::new();

        for table in &self.tables {
            out.push_str(&format!(
                "### {} ({} řádků)\nSloupce: {}\n",
                table.name,
                table.row_count(),
                table.headers.join(" | ")
            ));
            for row in &table.rows {
                out.push_str(&row.join(" | "));
                out.push('\n');
            }
            out.push('\n');
        }

        if out.chars().count() <= max_chars {
            return out;
        }

        let mut truncated: String = out.chars().take(max_chars).collect();
        truncated.push('\n');
        truncated.push_str(TRUNCATION_MARKER);
        truncated
    }
}
