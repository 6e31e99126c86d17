//! Error types for the paperdb pipeline.

use std::path::PathBuf;

/// Errors that can occur while ingesting, merging, or exporting records.
#[derive(Debug, thiserror::Error)]
pub enum PaperDbError {
    /// A raw input item is missing required fields (title, source discriminant).
    ///
    /// Policy: callers skip the record, log it, and continue the batch.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// The `source` discriminant is not one of the supported APIs.
    #[error("unknown source '{0}' (expected one of: s2, arxiv, openalex, crossref)")]
    UnknownSource(String),

    /// A line in a JSONL file is not valid JSON. Fatal for that input file.
    #[error("{}:{}: invalid JSON: {source}", .path.display(), .line)]
    InvalidLine {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    /// Filesystem error reading or writing a database file.
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A record has neither authors nor a title, so no citation key can be
    /// derived. The record is excluded from BibTeX output but kept in JSONL.
    #[error("record {index}: cannot derive a citation key (no authors, no title)")]
    UnkeyableRecord { index: usize },

    /// Configuration error (e.g., an invalid venue tier table).
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for Results using [`PaperDbError`].
pub type Result<T> = std::result::Result<T, PaperDbError>;

impl PaperDbError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
