//! Top-K combiner for selecting the largest values

use crate::combiners::CombineFn;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::marker::PhantomData;

/// The largest **K** values (requires `Ord`).
///
/// The accumulator maintains a **min-heap** (via `BinaryHeap<Reverse<T>>`) of
/// size ≤ `k`, so memory is bounded by `k`.
///
/// - Accumulator: `BinaryHeap<Reverse<T>>`
/// - Output: `Vec<T>` sorted descending.
///
/// `k == 0` always produces an empty vector. Values that compare equal are all
/// candidates; give `T` a total order if ties must resolve deterministically.
#[derive(Clone, Debug)]
pub struct TopK<T> {
    pub k: usize,
    _m: PhantomData<fn(T)>,
}

impl<T> TopK<T> {
    #[must_use]
    pub const fn new(k: usize) -> Self {
        Self { k, _m: PhantomData }
    }
}

impl<T> CombineFn<T, BinaryHeap<Reverse<T>>, Vec<T>> for TopK<T>
where
    T: Ord + Send + Sync + 'static,
{
    fn create(&self) -> BinaryHeap<Reverse<T>> {
        BinaryHeap::with_capacity(self.k.saturating_add(1).min(1024))
    }

    fn add_input(&self, acc: &mut BinaryHeap<Reverse<T>>, v: T) {
        if self.k == 0 {
            return;
        }
        acc.push(Reverse(v));
        if acc.len() > self.k {
            acc.pop();
        } // drop smallest
    }

    fn merge(&self, acc: &mut BinaryHeap<Reverse<T>>, other: BinaryHeap<Reverse<T>>) {
        for Reverse(v) in other {
            self.add_input(acc, v);
        }
    }

    fn finish(&self, acc: BinaryHeap<Reverse<T>>) -> Vec<T> {
        // into_sorted_vec on Reverse<T> is ascending in Reverse, i.e. descending in T
        acc.into_sorted_vec().into_iter().map(|Reverse(v)| v).collect()
    }
}
