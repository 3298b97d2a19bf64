//! Run configuration and command-line arguments.

use crate::aggregate::DEFAULT_TOP;
use crate::runner::{ExecMode, Runner};
use crate::validator::ValidatorConfig;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Default log file for rejected rows.
pub const DEFAULT_LOG_FILE: &str = "monitor.log";

/// Default shard size, in rows.
pub const DEFAULT_ROWS_PER_PARTITION: usize = 100_000;

#[derive(Clone, Debug)]
pub struct EtlConfig {
    /// Orders input: a CSV path or glob pattern.
    pub orders: PathBuf,
    /// Barcodes input: a CSV path or glob pattern.
    pub barcodes: PathBuf,
    /// Reject log, truncated on every run.
    pub log_file: PathBuf,
    pub rows_per_partition: usize,
    /// Worker threads; `None` uses rayon's global pool.
    pub threads: Option<usize>,
    /// Run every stage on the calling thread.
    pub sequential: bool,
    /// Maximum partitions resident at once; defaults to twice the worker count.
    pub wave_width: Option<usize>,
    /// Number of customers in the ranking.
    pub top: usize,
    /// Directory for the cleaned-barcode spill file.
    pub spill_dir: Option<PathBuf>,
    /// Where to write the JSON run summary, if anywhere.
    pub summary_json: Option<PathBuf>,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            orders: PathBuf::from("data").join("orders.csv"),
            barcodes: PathBuf::from("data").join("barcodes.csv"),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            rows_per_partition: DEFAULT_ROWS_PER_PARTITION,
            threads: None,
            sequential: false,
            wave_width: None,
            top: DEFAULT_TOP,
            spill_dir: None,
            summary_json: None,
        }
    }
}

impl EtlConfig {
    /// Config for the given inputs with every other setting at its default.
    pub fn new(orders: impl Into<PathBuf>, barcodes: impl Into<PathBuf>) -> Self {
        Self {
            orders: orders.into(),
            barcodes: barcodes.into(),
            ..Default::default()
        }
    }

    /// Build the runner described by this config.
    ///
    /// # Errors
    /// Returns an error if a dedicated thread pool cannot be created.
    pub fn runner(&self) -> Result<Runner> {
        if self.sequential {
            return Ok(Runner::sequential());
        }
        let workers = self.threads.unwrap_or_else(num_cpus::get).max(1);
        let width = self.wave_width.unwrap_or(2 * workers);
        Runner::new(
            ExecMode::Parallel {
                threads: self.threads,
            },
            width,
        )
    }

    #[must_use]
    pub fn validator(&self) -> ValidatorConfig {
        ValidatorConfig {
            rows_per_partition: self.rows_per_partition,
            spill_dir: self.spill_dir.clone(),
        }
    }
}

/// Validate, join and rank order and barcode CSV files.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Input order CSV file path or glob pattern
    #[arg(long, alias = "input_order", default_value = "data/orders.csv")]
    pub input_order: PathBuf,

    /// Input barcode CSV file path or glob pattern
    #[arg(long, alias = "input_barcode", default_value = "data/barcodes.csv")]
    pub input_barcode: PathBuf,

    /// Log file receiving rejected rows (overwritten on every run)
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Rows per partition
    #[arg(long, default_value_t = DEFAULT_ROWS_PER_PARTITION)]
    pub rows_per_partition: usize,

    /// Worker threads (defaults to one per CPU)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Process everything on a single thread
    #[arg(long, conflicts_with = "threads")]
    pub sequential: bool,

    /// Maximum number of partitions held in memory at once
    #[arg(long)]
    pub wave_width: Option<usize>,

    /// Number of customers to rank
    #[arg(long, default_value_t = DEFAULT_TOP)]
    pub top: usize,

    /// Directory for temporary spill files
    #[arg(long)]
    pub spill_dir: Option<PathBuf>,

    /// Write a JSON run summary to this path
    #[arg(long)]
    pub summary_json: Option<PathBuf>,
}

impl From<Args> for EtlConfig {
    fn from(a: Args) -> Self {
        Self {
            orders: a.input_order,
            barcodes: a.input_barcode,
            log_file: a.log_file,
            rows_per_partition: a.rows_per_partition.max(1),
            threads: a.threads,
            sequential: a.sequential,
            wave_width: a.wave_width,
            top: a.top,
            spill_dir: a.spill_dir,
            summary_json: a.summary_json,
        }
    }
}
