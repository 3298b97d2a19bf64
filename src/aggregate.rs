//! Customer ranking and unused-barcode counting.
//!
//! Both aggregations stream the validated barcodes partition by partition and probe
//! the [`OrderIndex`]. Partition-local results are small (one entry per customer,
//! or two counters) and are merged with associative combiners, so the joined rows
//! are never materialized.
//!
//! # Ranking order
//! Customers are ranked by matched ticket count, descending. Ties go to the customer
//! whose first matched barcode appears earlier in the barcode input, then to the
//! smaller `customer_id`. The order is the same for every run on the same input.

use crate::combiners::{CombineFn, KeyedAcc, Tally, TicketCount, TopK};
use crate::join::OrderIndex;
use crate::record::BarcodeRecord;
use crate::runner::Runner;
use crate::source::Source;
use anyhow::Result;
use serde::Serialize;
use std::cmp::Reverse;
use tracing::info;

/// Number of customers printed by default.
pub const DEFAULT_TOP: usize = 5;

/// One entry of the customer ranking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CustomerRanking {
    pub customer_id: String,
    pub ticket_count: u64,
}

/// Total order used to rank customers; larger is better.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct RankKey {
    count: u64,
    first_row: Reverse<u64>,
    customer_id: Reverse<String>,
}

impl RankKey {
    fn new(customer_id: String, tally: Tally) -> Self {
        Self {
            count: tally.count,
            first_row: Reverse(tally.first_row),
            customer_id: Reverse(customer_id),
        }
    }
}

impl From<RankKey> for CustomerRanking {
    fn from(k: RankKey) -> Self {
        Self {
            customer_id: k.customer_id.0,
            ticket_count: k.count,
        }
    }
}

/// Matched ticket tally per customer, unordered.
///
/// # Errors
/// Returns an error if the barcode source cannot be read.
pub fn ticket_counts<S>(runner: &Runner, orders: &OrderIndex, clean: &S) -> Result<Vec<(String, Tally)>>
where
    S: Source<BarcodeRecord> + ?Sized,
{
    let comb = TicketCount;
    let acc = runner.fold(
        clean,
        KeyedAcc::<String, u64, Tally, Tally>::default(),
        |part| {
            let mut local = KeyedAcc::<String, u64, Tally, Tally>::default();
            for (row, rec) in part.numbered() {
                if !rec.has_barcode() {
                    continue;
                }
                if let Some(customer) = orders.customer(&rec.order_id) {
                    local.add(&comb, customer.to_string(), row);
                }
            }
            Ok(local)
        },
        |acc, local| acc.merge(&comb, local),
    )?;
    Ok(acc.finish(&comb))
}

/// The full customer ranking (not truncated).
///
/// # Errors
/// Returns an error if the barcode source cannot be read.
pub fn ranking<S>(runner: &Runner, orders: &OrderIndex, clean: &S) -> Result<Vec<CustomerRanking>>
where
    S: Source<BarcodeRecord> + ?Sized,
{
    let mut keys: Vec<RankKey> = ticket_counts(runner, orders, clean)?
        .into_iter()
        .map(|(c, t)| RankKey::new(c, t))
        .collect();
    keys.sort_unstable_by(|a, b| b.cmp(a));
    Ok(keys.into_iter().map(CustomerRanking::from).collect())
}

/// The `k` customers with the most matched tickets.
///
/// # Errors
/// Returns an error if the barcode source cannot be read.
pub fn top_customers<S>(
    runner: &Runner,
    orders: &OrderIndex,
    clean: &S,
    k: usize,
) -> Result<Vec<CustomerRanking>>
where
    S: Source<BarcodeRecord> + ?Sized,
{
    let top = TopK::<RankKey>::new(k);
    let mut heap = top.create();
    for (customer, tally) in ticket_counts(runner, orders, clean)? {
        top.add_input(&mut heap, RankKey::new(customer, tally));
    }
    let out: Vec<CustomerRanking> = top
        .finish(heap)
        .into_iter()
        .map(CustomerRanking::from)
        .collect();
    info!(k, customers = out.len(), "top customers ranked");
    Ok(out)
}

/// How validated barcodes split between matched and unmatched orders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct JoinStats {
    /// Barcodes whose order exists.
    pub matched: u64,
    /// Barcodes whose order does not exist.
    pub unused: u64,
    /// All validated barcodes.
    pub total: u64,
}

/// Count matched and unmatched barcodes in one pass.
///
/// # Errors
/// Returns an error if the barcode source cannot be read.
pub fn join_stats<S>(runner: &Runner, orders: &OrderIndex, clean: &S) -> Result<JoinStats>
where
    S: Source<BarcodeRecord> + ?Sized,
{
    runner.fold(
        clean,
        JoinStats::default(),
        |part| {
            let mut s = JoinStats::default();
            for rec in &part.rows {
                s.total += 1;
                if orders.contains(&rec.order_id) {
                    s.matched += 1;
                } else {
                    s.unused += 1;
                }
            }
            Ok(s)
        },
        |acc, s| {
            acc.matched += s.matched;
            acc.unused += s.unused;
            acc.total += s.total;
        },
    )
}

/// Number of validated barcodes whose `order_id` has no order (anti-join
/// cardinality).
///
/// # Errors
/// Returns an error if the barcode source cannot be read.
pub fn unused_barcode_count<S>(runner: &Runner, orders: &OrderIndex, clean: &S) -> Result<u64>
where
    S: Source<BarcodeRecord> + ?Sized,
{
    Ok(join_stats(runner, orders, clean)?.unused)
}
