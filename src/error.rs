//! Error types for the merge pipeline.

use std::path::PathBuf;
use thiserror::Error;

use crate::feed::FeedError;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a run.
///
/// Transient feed failures are not represented here: the feed controller
/// absorbs them and retries, so only archive loading can surface a
/// [`FeedError`].
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding or encoding error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Input files disagree on their header row.
    #[error("File: {} has mismatched field names (expected {expected:?}, found {found:?})", path.display())]
    FieldMismatch { path: PathBuf, expected: Vec<String>, found: Vec<String> },

    /// Input file lacks a column the merge depends on.
    #[error("File: {} has no '{column}' column", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    /// A row whose id or date cannot be parsed.
    #[error("{source_label}, line {line}: {reason}")]
    InvalidRecord { source_label: String, line: u64, reason: String },

    /// A date given on the command line or in config.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Feed error outside the retry loop.
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
}
