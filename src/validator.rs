//! Barcode validation: global de-duplication followed by a null-barcode filter.
//!
//! # Algorithm
//! 1. Every partition is de-duplicated locally, in parallel. A row that repeats an
//!    earlier row of the same partition is rejected as a duplicate.
//! 2. Local survivors are merged in partition order against a global set of rows
//!    already kept. A survivor that was kept by an earlier partition is rejected as a
//!    duplicate too, so duplicates spanning partitions are caught and the *first*
//!    occurrence in source order always wins.
//! 3. Rows that survive de-duplication but have no barcode are rejected as nulls.
//! 4. Everything else is appended to a spill file, which becomes the
//!    [`CleanBarcodes`] source that reporting and aggregation re-scan.
//!
//! Rejected rows are written to the [`RejectLog`] as one block per category.
//!
//! The global set holds one entry per distinct row, so memory grows with the
//! number of distinct barcode rows, not with the size of the input.

use crate::io::csv::{SpillWriter, SpilledCsv};
use crate::record::{BARCODE_COLUMNS, BarcodeRecord};
use crate::reject_log::RejectLog;
use crate::runner::Runner;
use crate::source::{Partition, Source};
use crate::validation::{RejectedRow, RejectionKind, RejectionSummary, Validate};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct ValidatorConfig {
    /// Partition size of the cleaned output.
    pub rows_per_partition: usize,
    /// Directory for the cleaned-set spill file; system temp dir when `None`.
    pub spill_dir: Option<PathBuf>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            rows_per_partition: 100_000,
            spill_dir: None,
        }
    }
}

/// The validated barcode set, persisted to a spill file.
///
/// Invariants: no two rows are identical and every row has a barcode.
pub struct CleanBarcodes {
    spill: SpilledCsv<BarcodeRecord>,
}

impl CleanBarcodes {
    /// Location of the spill file backing this set.
    pub fn path(&self) -> &Path {
        self.spill.path()
    }
}

impl Source<BarcodeRecord> for CleanBarcodes {
    fn total_rows(&self) -> u64 {
        self.spill.total_rows()
    }

    fn partition_count(&self) -> usize {
        self.spill.partition_count()
    }

    fn read_partition(&self, index: usize) -> Result<Partition<BarcodeRecord>> {
        self.spill.read_partition(index)
    }
}

/// Outcome of [`validate`].
pub struct Validation {
    pub clean: CleanBarcodes,
    /// Dropped duplicates, in input row order.
    pub duplicates: Vec<RejectedRow>,
    /// Dropped rows without barcode, in input row order.
    pub nulls: Vec<RejectedRow>,
    /// Rows read from the input.
    pub input_rows: u64,
}

impl Validation {
    #[must_use]
    pub fn summary(&self) -> RejectionSummary {
        RejectionSummary {
            duplicates: self.duplicates.len() as u64,
            null_barcodes: self.nulls.len() as u64,
        }
    }
}

struct LocalDedup {
    survivors: Vec<(u64, BarcodeRecord)>,
    duplicates: Vec<RejectedRow>,
}

fn dedup_partition(part: Partition<BarcodeRecord>) -> LocalDedup {
    let mut seen: HashSet<BarcodeRecord> = HashSet::with_capacity(part.len());
    let mut survivors = Vec::with_capacity(part.len());
    let mut duplicates = Vec::new();
    for (row, record) in part.into_numbered() {
        if seen.contains(&record) {
            duplicates.push(RejectedRow {
                row,
                record,
                kind: RejectionKind::Duplicate,
            });
        } else {
            seen.insert(record.clone());
            survivors.push((row, record));
        }
    }
    LocalDedup {
        survivors,
        duplicates,
    }
}

/// Validate `source`, writing rejected rows to `log`.
///
/// # Errors
/// Returns an error if the source cannot be read, or the spill file or log cannot
/// be written. Rejected rows are not errors.
pub fn validate<S, W>(
    runner: &Runner,
    source: &S,
    log: &mut RejectLog<W>,
    config: &ValidatorConfig,
) -> Result<Validation>
where
    S: Source<BarcodeRecord> + ?Sized,
    W: Write,
{
    let mut spill = SpillWriter::<BarcodeRecord>::create(config.spill_dir.as_deref())?;
    let mut kept: HashSet<BarcodeRecord> = HashSet::new();
    let mut duplicates: Vec<RejectedRow> = Vec::new();
    let mut nulls: Vec<RejectedRow> = Vec::new();

    runner.for_each_wave(
        source,
        |part| Ok(dedup_partition(part)),
        |local| {
            duplicates.extend(local.duplicates);
            for (row, record) in local.survivors {
                if kept.contains(&record) {
                    duplicates.push(RejectedRow {
                        row,
                        record,
                        kind: RejectionKind::Duplicate,
                    });
                    continue;
                }
                kept.insert(record.clone());
                if let Err(errors) = record.validate() {
                    for e in &errors {
                        debug!(row, order_id = %record.order_id, error = %e, "barcode row rejected");
                    }
                    nulls.push(RejectedRow {
                        row,
                        record,
                        kind: RejectionKind::NullBarcode,
                    });
                } else {
                    spill.push(&record)?;
                }
            }
            Ok(())
        },
    )?;
    drop(kept);

    duplicates.sort_by_key(|r| r.row);
    nulls.sort_by_key(|r| r.row);

    for (kind, rows) in [
        (RejectionKind::Duplicate, &duplicates),
        (RejectionKind::NullBarcode, &nulls),
    ] {
        info!(category = %kind, rows = rows.len(), "validation category checked");
        if !rows.is_empty() {
            warn!(category = %kind, rows = rows.len(), "dropped {} rows: {}", rows.len(), kind.message());
        }
        log.write_block(kind, rows)
            .with_context(|| format!("log {kind} rejections"))?;
    }

    let clean = CleanBarcodes {
        spill: spill.finish(&BARCODE_COLUMNS, config.rows_per_partition)?,
    };
    info!(
        input_rows = source.total_rows(),
        clean_rows = clean.total_rows(),
        partitions = clean.partition_count(),
        "barcode validation complete"
    );

    Ok(Validation {
        clean,
        duplicates,
        nulls,
        input_rows: source.total_rows(),
    })
}
