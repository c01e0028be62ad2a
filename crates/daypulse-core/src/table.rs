//! CSV table output for sampled metrics.
//!
//! Three table shapes exist:
//!
//! - per-day intraday series `{Time, Value}`, one file per day and activity,
//!   replaced on rewrite;
//! - per-day sleep stages `{Time, Level, Seconds}`, replaced on rewrite;
//! - the cumulative `daily_summary.csv` log `{Date, Category, Activity,
//!   Value}`, append-only and headerless. Re-sampling a date appends
//!   duplicate rows; consumers are expected to de-duplicate if they care.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// File name of the cumulative summary table.
pub const SUMMARY_FILE: &str = "daily_summary.csv";

/// Errors from table output.
#[derive(Debug, Error)]
pub enum TableError {
    /// The output directory could not be created.
    #[error("failed to create data directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A table file could not be opened.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing rows to a table file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Flushing a table file failed.
    #[error("failed to flush {path}: {source}")]
    Flush {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One `{Time, Value}` sample of an intraday series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeValueRow {
    pub time: String,
    pub value: String,
}

/// One `{Time, Level, Seconds}` sleep-stage interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SleepStageRow {
    pub time: String,
    pub level: String,
    pub seconds: u32,
}

/// One row of the cumulative daily summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub date: String,
    pub category: String,
    pub activity: String,
    pub value: String,
}

impl SummaryRow {
    /// Creates a summary row.
    pub fn new(
        date: impl Into<String>,
        category: impl Into<String>,
        activity: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            category: category.into(),
            activity: activity.into(),
            value: value.into(),
        }
    }
}

/// Output directory for sampled tables.
///
/// Constructing a `DataDir` creates the directory; the write methods derive
/// file names from the sampled date and activity.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Creates the output directory (and parents) and returns a handle to it.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, TableError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| TableError::CreateDir {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    /// Returns the directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path of the cumulative summary table.
    pub fn summary_path(&self) -> PathBuf {
        self.root.join(SUMMARY_FILE)
    }

    /// Writes `{date}_{activity}.csv` with a `Time,Value` header.
    ///
    /// Prior contents are replaced; sampling the same day twice rewrites the
    /// file rather than growing it.
    pub fn write_intraday(
        &self,
        date: NaiveDate,
        activity: &str,
        rows: &[TimeValueRow],
    ) -> Result<PathBuf, TableError> {
        let path = self.root.join(format!("{date}_{activity}.csv"));
        write_table(&path, &["Time", "Value"], rows)?;
        debug!("wrote {} intraday rows to {}", rows.len(), path.display());
        Ok(path)
    }

    /// Writes `{date}_sleep.csv` with a `Time,Level,Seconds` header.
    pub fn write_sleep(
        &self,
        date: NaiveDate,
        rows: &[SleepStageRow],
    ) -> Result<PathBuf, TableError> {
        let path = self.root.join(format!("{date}_sleep.csv"));
        write_table(&path, &["Time", "Level", "Seconds"], rows)?;
        debug!("wrote {} sleep rows to {}", rows.len(), path.display());
        Ok(path)
    }

    /// Appends rows to `daily_summary.csv`.
    ///
    /// The summary table never carries a header; rows accumulate across runs
    /// and duplicates from re-sampled dates are kept.
    pub fn append_summary(&self, rows: &[SummaryRow]) -> Result<(), TableError> {
        if rows.is_empty() {
            return Ok(());
        }
        let path = self.summary_path();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| TableError::Open {
                path: path.clone(),
                source,
            })?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        for row in rows {
            writer.serialize(row).map_err(|source| TableError::Write {
                path: path.clone(),
                source,
            })?;
        }
        writer.flush().map_err(|source| TableError::Flush {
            path: path.clone(),
            source,
        })?;
        debug!("appended {} summary rows to {}", rows.len(), path.display());
        Ok(())
    }
}

/// Writes a headed table, replacing any prior file.
///
/// The header is written explicitly so empty tables still produce a valid
/// file with column names.
fn write_table<R: Serialize>(
    path: &Path,
    header: &[&str],
    rows: &[R],
) -> Result<(), TableError> {
    let file = fs::File::create(path).map_err(|source| TableError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer
        .write_record(header)
        .map_err(|source| TableError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    for row in rows {
        writer.serialize(row).map_err(|source| TableError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    writer.flush().map_err(|source| TableError::Flush {
        path: path.to_path_buf(),
        source,
    })
}
