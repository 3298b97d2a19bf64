//! # barcode-join
//!
//! A batch job that validates a barcode dataset, joins it with an orders dataset and
//! reports per-order barcode lists, a top-customer ranking and the number of
//! barcodes that belong to no order.
//!
//! ## Inputs
//!
//! - **orders**: CSV with columns `customer_id`, `order_id`
//! - **barcodes**: CSV with columns `order_id`, `barcode` (`barcode` may be empty)
//!
//! Either input may be a single path or a glob pattern; matched files are read in
//! sorted order and behave as one dataset.
//!
//! ## Stages
//!
//! 1. [`validator::validate`] drops duplicate barcode rows (first occurrence wins),
//!    then rows without a barcode, and logs both categories to the
//!    [`reject_log::RejectLog`].
//! 2. [`join::report`] prints `order_id, customer_id, [barcodes]` for each order with
//!    at least one validated barcode.
//! 3. [`aggregate::top_customers`] ranks customers by matched ticket count.
//! 4. [`aggregate::unused_barcode_count`] counts validated barcodes with no order.
//!
//! [`pipeline::Pipeline`] runs all of them in order.
//!
//! ## Execution
//!
//! Inputs are split into row-count partitions ([`source::Source`]). The
//! [`runner::Runner`] processes a bounded wave of partitions at a time, on a rayon
//! pool or on the calling thread, and merges partition results in partition order.
//! Outputs do not depend on the execution mode, the thread count or the partition
//! size.
//!
//! ## Example
//!
//! ```no_run
//! use barcode_join::{EtlConfig, Pipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = EtlConfig::new("data/orders.csv", "data/barcodes.csv");
//! let summary = Pipeline::new(config).run(&mut std::io::stdout())?;
//! println!("{} unused barcodes", summary.unused_barcodes);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod combiners;
pub mod config;
pub mod error;
pub mod io;
pub mod join;
pub mod pipeline;
pub mod record;
pub mod reject_log;
pub mod runner;
pub mod source;
pub mod validation;
pub mod validator;

pub use aggregate::{CustomerRanking, JoinStats, top_customers, unused_barcode_count};
pub use combiners::{CombineFn, TopK};
pub use config::EtlConfig;
pub use error::EtlError;
pub use io::csv::CsvSource;
pub use join::{BarcodeIndex, OrderIndex, OrderReport};
pub use pipeline::{Pipeline, RunSummary};
pub use record::{BarcodeRecord, OrderRecord};
pub use reject_log::RejectLog;
pub use runner::{ExecMode, Runner};
pub use source::{Partition, Source, VecSource};
pub use validation::{RejectedRow, RejectionKind, RejectionSummary};
pub use validator::{CleanBarcodes, Validation, ValidatorConfig, validate};
