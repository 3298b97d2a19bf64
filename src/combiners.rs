//! Associative combiners used to merge partition-local results.
//!
//! A [`CombineFn`] folds inputs into an accumulator, merges accumulators built on
//! different partitions, and finishes into an output. `merge` must be associative
//! and commutative so that local results can be combined in any grouping.
//!
//! - [`TicketCount`] - per-customer matched barcode count plus first matched row
//! - [`TopK`] - bounded selection of the `k` largest values

pub mod topk;

pub use topk::TopK;

use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;

/// An associative, commutative aggregation.
pub trait CombineFn<V, A, O>: Send + Sync + 'static {
    fn create(&self) -> A;
    fn add_input(&self, acc: &mut A, v: V);
    fn merge(&self, acc: &mut A, other: A);
    fn finish(&self, acc: A) -> O;
}

/* ===================== TicketCount ===================== */

/// Matched tickets of one customer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub count: u64,
    /// Smallest global barcode row that matched this customer.
    pub first_row: u64,
}

/// Counts inputs (global barcode row numbers) and remembers the smallest one.
#[derive(Clone, Copy, Debug, Default)]
pub struct TicketCount;

impl CombineFn<u64, Tally, Tally> for TicketCount {
    fn create(&self) -> Tally {
        Tally {
            count: 0,
            first_row: u64::MAX,
        }
    }

    fn add_input(&self, acc: &mut Tally, row: u64) {
        acc.count += 1;
        acc.first_row = acc.first_row.min(row);
    }

    fn merge(&self, acc: &mut Tally, other: Tally) {
        acc.count += other.count;
        acc.first_row = acc.first_row.min(other.first_row);
    }

    fn finish(&self, acc: Tally) -> Tally {
        acc
    }
}

/// Keyed accumulators of one combiner over inputs `V` and outputs `O`.
pub struct KeyedAcc<K, V, A, O> {
    groups: HashMap<K, A>,
    _m: PhantomData<fn(V) -> O>,
}

impl<K, V, A, O> Default for KeyedAcc<K, V, A, O> {
    fn default() -> Self {
        Self {
            groups: HashMap::new(),
            _m: PhantomData,
        }
    }
}

impl<K: Eq + Hash, V, A, O> KeyedAcc<K, V, A, O> {
    pub fn add<C: CombineFn<V, A, O>>(&mut self, comb: &C, key: K, v: V) {
        let acc = self.groups.entry(key).or_insert_with(|| comb.create());
        comb.add_input(acc, v);
    }

    pub fn merge<C: CombineFn<V, A, O>>(&mut self, comb: &C, other: Self) {
        for (k, a) in other.groups {
            match self.groups.get_mut(&k) {
                Some(acc) => comb.merge(acc, a),
                None => {
                    self.groups.insert(k, a);
                }
            }
        }
    }

    pub fn finish<C: CombineFn<V, A, O>>(self, comb: &C) -> Vec<(K, O)> {
        self.groups
            .into_iter()
            .map(|(k, a)| (k, comb.finish(a)))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
