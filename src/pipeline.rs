//! End-to-end run: validate barcodes, print the order report, rank customers and
//! count unused barcodes.
//!
//! [`Pipeline::run`] writes the user-facing output to a caller-supplied writer
//! (stdout in the binary) in this order:
//!
//! ```text
//! <order_id>, <customer_id>, [<barcode>, ...]     one line per order
//! Top 5 customers
//! <customer_id>, <ticket_count>                   up to 5 lines
//! Unused barcodes count is: <n>
//! ```
//!
//! Rejected barcode rows go to the reject log; progress goes through `tracing`.

use crate::aggregate::{self, CustomerRanking, JoinStats};
use crate::config::EtlConfig;
use crate::io::csv::CsvSource;
use crate::join::{self, BarcodeIndex, OrderIndex, ReportStats};
use crate::record::{BARCODE_COLUMNS, BarcodeRecord, ORDER_COLUMNS, OrderRecord};
use crate::reject_log::RejectLog;
use crate::source::Source;
use crate::validation::RejectionSummary;
use crate::validator::validate;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Machine-readable outcome of one run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub order_rows: u64,
    pub order_partitions: usize,
    /// Distinct non-empty order ids.
    pub orders: u64,
    pub barcode_rows: u64,
    pub barcode_partitions: usize,
    pub rejected: RejectionSummary,
    /// Rows left after validation.
    pub clean_barcodes: u64,
    pub report: ReportStats,
    pub top_customers: Vec<CustomerRanking>,
    pub join: JoinStats,
    pub unused_barcodes: u64,
}

pub struct Pipeline {
    config: EtlConfig,
}

impl Pipeline {
    pub fn new(config: EtlConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    /// Execute the run, writing the report to `out`.
    ///
    /// Both inputs are opened and their headers checked before anything is
    /// written, so a missing file or column aborts the run with no output and an
    /// untouched reject log.
    ///
    /// # Errors
    /// Returns an error (usually wrapping an [`EtlError`](crate::error::EtlError))
    /// if an input is missing or malformed, or if `out`, the reject log or the
    /// spill file cannot be written.
    pub fn run<W: Write + ?Sized>(&self, out: &mut W) -> Result<RunSummary> {
        let started = Instant::now();
        let cfg = &self.config;
        let runner = cfg.runner()?;
        info!(?runner, "starting run");

        let orders: CsvSource<OrderRecord> =
            CsvSource::open(&cfg.orders, &ORDER_COLUMNS, cfg.rows_per_partition)?;
        let barcodes: CsvSource<BarcodeRecord> =
            CsvSource::open(&cfg.barcodes, &BARCODE_COLUMNS, cfg.rows_per_partition)?;
        info!(
            rows = orders.total_rows(),
            partitions = orders.partition_count(),
            files = orders.paths().len(),
            "orders opened"
        );
        info!(
            rows = barcodes.total_rows(),
            partitions = barcodes.partition_count(),
            files = barcodes.paths().len(),
            "barcodes opened"
        );

        let mut log = RejectLog::create(&cfg.log_file)?;
        let validation = validate(&runner, &barcodes, &mut log, &cfg.validator())?;
        let blocks = log.blocks();
        log.finish()?;
        info!(path = %cfg.log_file.display(), blocks, "reject log written");
        let clean = &validation.clean;

        let order_index = OrderIndex::build(&runner, &orders)?;
        let barcode_index = BarcodeIndex::build(&runner, clean)?;
        info!(
            orders = order_index.len(),
            orders_with_barcodes = barcode_index.orders(),
            "indexes built"
        );

        let report = join::report(&runner, &orders, &order_index, &barcode_index, out)?;
        drop(barcode_index);

        let top = aggregate::top_customers(&runner, &order_index, clean, cfg.top)?;
        write_ranking(out, cfg.top, &top)?;

        let stats = aggregate::join_stats(&runner, &order_index, clean)?;
        writeln!(out, "Unused barcodes count is: {}", stats.unused).context("write unused count")?;
        out.flush().context("flush output")?;

        let summary = RunSummary {
            order_rows: orders.total_rows(),
            order_partitions: orders.partition_count(),
            orders: order_index.len() as u64,
            barcode_rows: validation.input_rows,
            barcode_partitions: barcodes.partition_count(),
            rejected: validation.summary(),
            clean_barcodes: clean.total_rows(),
            report,
            top_customers: top,
            join: stats,
            unused_barcodes: stats.unused,
        };
        if let Some(path) = &cfg.summary_json {
            write_summary(path, &summary)?;
        }
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            rejected = summary.rejected.total(),
            unused = summary.unused_barcodes,
            "run complete"
        );
        Ok(summary)
    }
}

fn write_ranking<W: Write + ?Sized>(out: &mut W, k: usize, top: &[CustomerRanking]) -> Result<()> {
    let mut buf = format!("Top {k} customers\n");
    for c in top {
        buf.push_str(&format!("{}, {}\n", c.customer_id, c.ticket_count));
    }
    out.write_all(buf.as_bytes()).context("write customer ranking")
}

/// Write `summary` as pretty JSON to `path`.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, summary)
        .with_context(|| format!("serialize run summary to {}", path.display()))?;
    w.write_all(b"\n")?;
    w.flush()?;
    Ok(())
}
