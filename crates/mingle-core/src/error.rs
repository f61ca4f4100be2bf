//! Errors raised at the file boundaries.
//!
//! The allocator itself has no error path: soft-constraint conflicts are
//! resolved by the fallback, and capacity is validated before it is called.

use std::io;
use std::path::PathBuf;

/// Failures while reading the input roster.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    /// The roster file could not be opened.
    #[error("failed to open roster {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The header row lacks a column every record needs.
    #[error("roster header is missing the required `{0}` column")]
    MissingColumn(&'static str),

    /// The underlying reader failed (I/O or an unreadable header row).
    #[error("failed to read roster: {0}")]
    Csv(#[from] csv::Error),
}

/// Failures while writing the assignment file.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The output file could not be created.
    #[error("failed to create output file {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A row could not be encoded or written.
    #[error("failed to write assignment row: {0}")]
    Csv(#[from] csv::Error),

    /// Flushing buffered output failed.
    #[error("failed to flush assignment file: {0}")]
    Io(#[from] io::Error),
}
