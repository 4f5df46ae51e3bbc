//! Incremental record of which queries already have a PDF on disk.
//!
//! The index lives next to the PDFs as `pdf_paths.csv` with the header
//! `query,pdf_path`. A successful query maps to the absolute path of its PDF;
//! a query that failed with an error maps to an empty path. Loading drops
//! both empty paths and paths whose file has since disappeared, so those
//! queries are retried on the next run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

/// File name of the index inside the output directory.
pub const INDEX_FILE_NAME: &str = "pdf_paths.csv";

/// Errors reading or writing the index file.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The index file could not be opened or created.
    #[error("IO error accessing index {path}: {source}")]
    Io {
        /// Index file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The index file is not valid CSV or lacks the expected columns.
    #[error("malformed index {path}: {source}")]
    Csv {
        /// Index file path.
        path: PathBuf,
        /// The underlying CSV error.
        #[source]
        source: csv::Error,
    },
}

impl IndexError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a CSV error.
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexRow {
    query: String,
    pdf_path: String,
}

/// Query → PDF path map backed by `pdf_paths.csv`.
///
/// Rows keep the order in which queries were first recorded; recording a
/// query again updates its row in place.
#[derive(Debug, Clone)]
pub struct PdfIndex {
    path: PathBuf,
    rows: Vec<IndexRow>,
    positions: HashMap<String, usize>,
}

impl PdfIndex {
    /// Creates an empty index that will be written to `output_dir`.
    #[must_use]
    pub fn empty(output_dir: &Path) -> Self {
        Self {
            path: output_dir.join(INDEX_FILE_NAME),
            rows: Vec::new(),
            positions: HashMap::new(),
        }
    }

    fn insert(&mut self, query: String, pdf_path: String) {
        if let Some(&position) = self.positions.get(&query) {
            self.rows[position].pdf_path = pdf_path;
        } else {
            self.positions.insert(query.clone(), self.rows.len());
            self.rows.push(IndexRow { query, pdf_path });
        }
    }

    /// Loads the index from `output_dir`, or returns an empty one if absent.
    ///
    /// Rows with an empty `pdf_path` and rows whose file no longer exists are
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if the file exists but cannot be read or parsed.
    #[instrument(skip_all, fields(dir = %output_dir.display()))]
    pub fn load(output_dir: &Path) -> Result<Self, IndexError> {
        let mut index = Self::empty(output_dir);
        if !index.path.is_file() {
            debug!("no existing index");
            return Ok(index);
        }

        let mut reader =
            csv::Reader::from_path(&index.path).map_err(|e| IndexError::csv(&index.path, e))?;
        let mut dropped = 0_usize;
        for row in reader.deserialize::<IndexRow>() {
            let row = row.map_err(|e| IndexError::csv(&index.path, e))?;
            if !row.pdf_path.is_empty() && Path::new(&row.pdf_path).is_file() {
                index.insert(row.query, row.pdf_path);
            } else {
                dropped += 1;
            }
        }

        debug!(
            entries = index.rows.len(),
            dropped, "loaded existing index"
        );
        Ok(index)
    }

    /// Returns the queries that have no entry yet, keeping their order.
    #[must_use]
    pub fn exclude_existing(&self, queries: Vec<String>) -> Vec<String> {
        queries
            .into_iter()
            .filter(|query| !self.positions.contains_key(query))
            .collect()
    }

    /// Records the saved PDF for `query`.
    pub fn record_success(&mut self, query: impl Into<String>, pdf_path: &Path) {
        self.insert(query.into(), pdf_path.to_string_lossy().into_owned());
    }

    /// Records that `query` failed with an error.
    pub fn record_failure(&mut self, query: impl Into<String>) {
        self.insert(query.into(), String::new());
    }

    /// Returns the recorded path for `query`; empty for a recorded failure.
    #[must_use]
    pub fn get(&self, query: &str) -> Option<&str> {
        self.positions
            .get(query)
            .map(|&position| self.rows[position].pdf_path.as_str())
    }

    /// Returns `true` if `query` has an entry.
    #[must_use]
    pub fn contains(&self, query: &str) -> bool {
        self.positions.contains_key(query)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the index has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Location of the index file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the index back to disk.
    ///
    /// An empty index is not written. Returns whether a file was written.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if the file cannot be created or written.
    #[instrument(skip_all, fields(path = %self.path.display(), entries = self.rows.len()))]
    pub fn save(&self) -> Result<bool, IndexError> {
        if self.rows.is_empty() {
            debug!("index empty, not writing");
            return Ok(false);
        }

        let mut writer =
            csv::Writer::from_path(&self.path).map_err(|e| IndexError::csv(&self.path, e))?;
        for row in &self.rows {
            writer
                .serialize(row)
                .map_err(|e| IndexError::csv(&self.path, e))?;
        }
        writer.flush().map_err(|e| IndexError::io(&self.path, e))?;

        info!("saved index");
        Ok(true)
    }
}
