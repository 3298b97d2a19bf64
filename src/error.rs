//! Fatal error taxonomy.
//!
//! Operations in this crate return [`anyhow::Result`]. Failures that must abort a run
//! before any processing happens are raised as an [`EtlError`] inside the
//! `anyhow::Error`, so callers can tell them apart with `downcast_ref::<EtlError>()`.
//!
//! Rejected rows (duplicates, missing barcodes) are *not* errors; they are reported
//! through [`crate::validation`] and the [`crate::reject_log::RejectLog`].

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum EtlError {
    /// An input path does not exist, cannot be opened, or a glob matched nothing.
    #[error("input not found: {path}")]
    InputNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// A required column is absent from an input header.
    #[error("schema error in {path}: missing required column `{column}` (found: {found})")]
    Schema {
        path: PathBuf,
        column: String,
        found: String,
    },

    /// A row could not be parsed.
    #[error("malformed CSV in {path} at line {line}: {source}")]
    Csv {
        path: PathBuf,
        line: u64,
        #[source]
        source: csv::Error,
    },
}

impl EtlError {
    /// Build an [`EtlError::InputNotFound`] for a path that could not be opened.
    pub fn not_found(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::InputNotFound {
            path: path.into(),
            source: Some(source),
        }
    }

    /// `true` for errors that mean an input was missing or unreadable.
    #[must_use]
    pub const fn is_input_not_found(&self) -> bool {
        matches!(self, Self::InputNotFound { .. })
    }

    /// `true` for header/column errors.
    #[must_use]
    pub const fn is_schema(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }
}
