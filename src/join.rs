//! Hash join of orders and validated barcodes.
//!
//! Both indexes are built once, partition by partition, and merged in partition
//! order, which keeps every output deterministic for a fixed input:
//! - [`OrderIndex`]: `order_id -> (customer_id, first row)`; the first row of a
//!   repeated `order_id` wins.
//! - [`BarcodeIndex`]: `order_id -> [barcode, ...]` in cleaned-set order.
//!
//! The report then streams the orders once and probes the barcode index per order,
//! emitting one line per distinct `order_id` that has at least one barcode
//! (inner-join semantics). Orders without barcodes and barcodes without orders are
//! expected and silently absent from the report.
//!
//! An empty `order_id` never matches anything.

use crate::record::{BarcodeRecord, OrderRecord};
use crate::runner::Runner;
use crate::source::Source;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::io::Write;
use tracing::{info, warn};

/// Customer and first source row of each order.
#[derive(Clone, Debug, Default)]
pub struct OrderIndex {
    orders: HashMap<String, (String, u64)>,
    repeated: u64,
}

impl OrderIndex {
    /// Build the index from the orders source.
    ///
    /// # Errors
    /// Returns an error if the source cannot be read.
    pub fn build<S>(runner: &Runner, orders: &S) -> Result<Self>
    where
        S: Source<OrderRecord> + ?Sized,
    {
        let mut index = Self::default();
        runner.for_each_wave(
            orders,
            |part| {
                Ok(part
                    .into_numbered()
                    .filter(|(_, o)| !o.order_id.is_empty())
                    .collect::<Vec<_>>())
            },
            |rows| {
                for (row, order) in rows {
                    index.insert(order, row);
                }
                Ok(())
            },
        )?;
        if index.repeated > 0 {
            warn!(
                repeated = index.repeated,
                "order ids appear more than once; keeping the first row of each"
            );
        }
        Ok(index)
    }

    fn insert(&mut self, order: OrderRecord, row: u64) {
        match self.orders.entry(order.order_id) {
            Entry::Occupied(_) => self.repeated += 1,
            Entry::Vacant(v) => {
                v.insert((order.customer_id, row));
            }
        }
    }

    /// Customer owning `order_id`.
    #[must_use]
    pub fn customer(&self, order_id: &str) -> Option<&str> {
        self.orders.get(order_id).map(|(c, _)| c.as_str())
    }

    /// Row number of the first occurrence of `order_id`.
    #[must_use]
    pub fn first_row(&self, order_id: &str) -> Option<u64> {
        self.orders.get(order_id).map(|(_, r)| *r)
    }

    #[must_use]
    pub fn contains(&self, order_id: &str) -> bool {
        self.orders.contains_key(order_id)
    }

    /// Number of distinct orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Rows skipped because their `order_id` was already indexed.
    #[must_use]
    pub fn repeated(&self) -> u64 {
        self.repeated
    }
}

/// Barcodes of each order, in cleaned-set order.
#[derive(Clone, Debug, Default)]
pub struct BarcodeIndex {
    barcodes: HashMap<String, Vec<String>>,
    rows: u64,
}

impl BarcodeIndex {
    /// Build the multimap from validated barcodes.
    ///
    /// # Errors
    /// Returns an error if the source cannot be read.
    pub fn build<S>(runner: &Runner, clean: &S) -> Result<Self>
    where
        S: Source<BarcodeRecord> + ?Sized,
    {
        let mut index = Self::default();
        runner.for_each_wave(
            clean,
            |part| {
                let mut local: Vec<(String, Vec<String>)> = Vec::new();
                let mut slots: HashMap<String, usize> = HashMap::new();
                for rec in part.rows {
                    let Some(barcode) = rec.barcode.filter(|b| !b.is_empty()) else {
                        continue;
                    };
                    if rec.order_id.is_empty() {
                        continue;
                    }
                    match slots.entry(rec.order_id) {
                        Entry::Occupied(o) => local[*o.get()].1.push(barcode),
                        Entry::Vacant(v) => {
                            local.push((v.key().clone(), vec![barcode]));
                            v.insert(local.len() - 1);
                        }
                    }
                }
                Ok(local)
            },
            |local| {
                for (order_id, codes) in local {
                    index.rows += codes.len() as u64;
                    index.barcodes.entry(order_id).or_default().extend(codes);
                }
                Ok(())
            },
        )?;
        Ok(index)
    }

    /// Barcodes for `order_id`, or an empty slice.
    #[must_use]
    pub fn get(&self, order_id: &str) -> &[String] {
        self.barcodes
            .get(order_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of distinct order ids with at least one barcode.
    #[must_use]
    pub fn orders(&self) -> usize {
        self.barcodes.len()
    }

    /// Number of barcodes indexed.
    #[must_use]
    pub fn rows(&self) -> u64 {
        self.rows
    }
}

/// One report line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderReport {
    pub order_id: String,
    pub customer_id: String,
    pub barcodes: Vec<String>,
}

impl fmt::Display for OrderReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, [{}]",
            self.order_id,
            self.customer_id,
            self.barcodes.join(", ")
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReportStats {
    /// Lines written.
    pub lines: u64,
    /// Barcodes listed across all lines.
    pub barcodes: u64,
}

/// Stream report lines for every order with barcodes, calling `emit` in orders-file
/// order.
///
/// # Errors
/// Returns an error if the orders cannot be read or `emit` fails.
pub fn for_each_report<S, F>(
    runner: &Runner,
    orders: &S,
    order_index: &OrderIndex,
    barcodes: &BarcodeIndex,
    mut emit: F,
) -> Result<ReportStats>
where
    S: Source<OrderRecord> + ?Sized,
    F: FnMut(&OrderReport) -> Result<()>,
{
    let mut stats = ReportStats::default();
    runner.for_each_wave(
        orders,
        |part| {
            Ok(part
                .into_numbered()
                .filter_map(|(row, order)| {
                    // Only the first row of a repeated order id is reported.
                    if order_index.first_row(&order.order_id) != Some(row) {
                        return None;
                    }
                    let codes = barcodes.get(&order.order_id);
                    if codes.is_empty() {
                        return None;
                    }
                    Some(OrderReport {
                        order_id: order.order_id,
                        customer_id: order.customer_id,
                        barcodes: codes.to_vec(),
                    })
                })
                .collect::<Vec<_>>())
        },
        |lines| {
            for line in &lines {
                stats.lines += 1;
                stats.barcodes += line.barcodes.len() as u64;
                emit(line)?;
            }
            Ok(())
        },
    )?;
    Ok(stats)
}

/// Write the report to `out`, one `order_id, customer_id, [barcodes]` line per order.
///
/// Each line goes out in a single `write_all`, and `out` is flushed after every
/// line, so the report is observable while it is produced.
///
/// # Errors
/// Returns an error if the orders cannot be read or `out` fails.
pub fn report<S, W>(
    runner: &Runner,
    orders: &S,
    order_index: &OrderIndex,
    barcodes: &BarcodeIndex,
    out: &mut W,
) -> Result<ReportStats>
where
    S: Source<OrderRecord> + ?Sized,
    W: Write + ?Sized,
{
    let stats = for_each_report(runner, orders, order_index, barcodes, |line| {
        let mut buf = line.to_string();
        buf.push('\n');
        out.write_all(buf.as_bytes()).context("write report line")?;
        out.flush().context("flush report line")
    })?;
    info!(lines = stats.lines, barcodes = stats.barcodes, "report written");
    Ok(stats)
}
