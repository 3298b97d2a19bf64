//! Input path expansion.
//!
//! Input paths may be plain file paths or glob patterns (`data/barcodes-*.csv`,
//! `exports/**/orders.csv`). A pattern is expanded into a sorted list of files that is
//! then treated as one logical dataset, in that order.
//!
//! # Examples
//!
//! ```no_run
//! use barcode_join::io::glob::expand_input;
//!
//! // A single file
//! let files = expand_input("data/orders.csv")?;
//!
//! // Every daily barcode export
//! let files = expand_input("data/barcodes/day=*/part-*.csv")?;
//! # use anyhow::Error; Ok::<(), Error>(())
//! ```

use crate::error::EtlError;
use anyhow::{Context, Result};
use glob::glob;
use std::path::{Path, PathBuf};

/// `true` if `pattern` contains glob metacharacters.
#[must_use]
pub fn is_pattern(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Expand a glob pattern into a sorted vector of matching files.
///
/// Directories are skipped. Zero matches yields an empty vector.
///
/// # Errors
/// Returns an error if the pattern is invalid or a matched entry cannot be read.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;

    let mut result = Vec::new();
    for entry in paths {
        let path =
            entry.with_context(|| format!("error reading glob entry for pattern: {pattern}"))?;
        if path.is_file() {
            result.push(path);
        }
    }

    result.sort();
    Ok(result)
}

/// Resolve an input argument to the list of files it names.
///
/// * A glob pattern must match at least one file.
/// * A plain path must exist and be a file.
///
/// # Errors
/// Returns [`EtlError::InputNotFound`] when nothing matches, and the underlying error
/// for invalid patterns.
pub fn expand_input(input: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let input = input.as_ref();
    let text = input.to_string_lossy();
    if is_pattern(&text) {
        let files = expand_glob(&text)?;
        if files.is_empty() {
            return Err(EtlError::InputNotFound {
                path: input.to_path_buf(),
                source: None,
            }
            .into());
        }
        return Ok(files);
    }
    match std::fs::metadata(input) {
        Ok(meta) if meta.is_file() => Ok(vec![input.to_path_buf()]),
        Ok(_) => Err(EtlError::InputNotFound {
            path: input.to_path_buf(),
            source: None,
        }
        .into()),
        Err(e) => Err(EtlError::not_found(input, e).into()),
    }
}
