//! Record-level validation rules and rejection bookkeeping.
//!
//! Two things can get a barcode row rejected:
//! - it is an exact repeat of an earlier row ([`RejectionKind::Duplicate`])
//! - its barcode is missing or blank ([`RejectionKind::NullBarcode`])
//!
//! Per-record rules are expressed through the [`Validate`] trait; duplicate
//! detection needs the whole dataset and lives in [`crate::validator`].
//! Rejections never abort a run. They are collected as [`RejectedRow`]s, written to
//! the [`RejectLog`](crate::reject_log::RejectLog), and summarized in a
//! [`RejectionSummary`].

use crate::record::BarcodeRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for validation operations.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Trait for types that can be validated in isolation.
pub trait Validate {
    /// Validate this instance and return a list of errors if invalid.
    fn validate(&self) -> ValidationResult;
}

/// A single validation error with context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// The field that failed validation (optional)
    pub field: Option<String>,
    /// Human-readable error message
    pub message: String,
    /// Error code for categorization (optional)
    pub code: Option<String>,
}

impl ValidationError {
    /// Create a validation error for a specific field.
    pub fn field<S: Into<String>, M: Into<String>>(field: S, message: M) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
            code: None,
        }
    }

    /// Attach an error code.
    #[must_use]
    pub fn with_code<S: Into<String>>(mut self, code: S) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref field) = self.field {
            write!(f, "[{}] {}", field, self.message)?;
        } else {
            write!(f, "{}", self.message)?;
        }
        if let Some(ref code) = self.code {
            write!(f, " (code: {})", code)?;
        }
        Ok(())
    }
}

/// Validation helpers for common patterns.
pub mod validators {
    use super::{ValidationError, ValidationResult};

    /// Validate that an optional string is present and not blank.
    pub fn present(field: &str, value: Option<&str>) -> ValidationResult {
        match value {
            Some(v) if !v.trim().is_empty() => Ok(()),
            _ => Err(vec![
                ValidationError::field(field, "must not be null or empty").with_code("null"),
            ]),
        }
    }
}

impl Validate for BarcodeRecord {
    fn validate(&self) -> ValidationResult {
        validators::present("barcode", self.barcode.as_deref())
    }
}

/// Why a row was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    Duplicate,
    NullBarcode,
}

impl RejectionKind {
    /// Header line used for this category in the reject log.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Duplicate => "The duplicated rows:",
            Self::NullBarcode => "The following rows' barcode is NaN:",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Duplicate => "duplicate",
            Self::NullBarcode => "null_barcode",
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected input row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRow {
    /// Global 0-based row number in the barcode input (header excluded).
    pub row: u64,
    pub record: BarcodeRecord,
    pub kind: RejectionKind,
}

/// Counts of rejected rows per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionSummary {
    pub duplicates: u64,
    pub null_barcodes: u64,
}

impl RejectionSummary {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.duplicates + self.null_barcodes
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for RejectionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} duplicate rows, {} rows without barcode",
            self.duplicates, self.null_barcodes
        )
    }
}
