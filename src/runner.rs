//! Wave executor over partitioned sources.
//!
//! The runner reads up to `wave_width` partitions at a time, applies a partition-local
//! function to each of them (on a rayon pool in [`ExecMode::Parallel`]), then hands the
//! local results to a merge closure strictly in partition order. Local functions never
//! share mutable state; everything that crosses partitions goes through `merge`, which
//! runs on the calling thread. Results are therefore identical in both modes.

use crate::source::{Partition, Source};
use anyhow::{Context, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecMode {
    Sequential,
    Parallel { threads: Option<usize> },
}

#[derive(Clone)]
pub struct Runner {
    pub mode: ExecMode,
    /// Maximum number of partitions resident at once.
    pub wave_width: usize,
    pool: Option<Arc<ThreadPool>>,
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            mode: ExecMode::Parallel { threads: None },
            wave_width: 2 * num_cpus::get().max(2),
            pool: None,
        }
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("mode", &self.mode)
            .field("wave_width", &self.wave_width)
            .finish_non_exhaustive()
    }
}

impl Runner {
    /// Build a runner. A dedicated pool is created when `threads` is given;
    /// otherwise parallel work runs on rayon's global pool.
    ///
    /// # Errors
    /// Returns an error if the thread pool cannot be built.
    pub fn new(mode: ExecMode, wave_width: usize) -> Result<Self> {
        let pool = match mode {
            ExecMode::Parallel { threads: Some(t) } => Some(Arc::new(
                ThreadPoolBuilder::new()
                    .num_threads(t.max(1))
                    .thread_name(|i| format!("barcode-join-{i}"))
                    .build()
                    .context("build rayon thread pool")?,
            )),
            _ => None,
        };
        Ok(Self {
            mode,
            wave_width: wave_width.max(1),
            pool,
        })
    }

    #[must_use]
    pub fn sequential() -> Self {
        Self {
            mode: ExecMode::Sequential,
            wave_width: 1,
            pool: None,
        }
    }

    /// Process every partition of `source`: `local` per partition (possibly in
    /// parallel), then `merge` on each local result in partition order.
    ///
    /// # Errors
    /// Stops at the first partition whose read, `local` or `merge` fails.
    pub fn for_each_wave<T, S, R, L, M>(&self, source: &S, local: L, mut merge: M) -> Result<()>
    where
        T: Send,
        S: Source<T> + ?Sized,
        R: Send,
        L: Fn(Partition<T>) -> Result<R> + Sync,
        M: FnMut(R) -> Result<()>,
    {
        let n = source.partition_count();
        let width = self.wave_width.max(1);
        let mut start = 0usize;
        while start < n {
            let end = (start + width).min(n);
            debug!(start, end, partitions = n, "processing wave");
            let results: Vec<Result<R>> = match self.mode {
                ExecMode::Sequential => (start..end)
                    .map(|i| source.read_partition(i).and_then(&local))
                    .collect(),
                ExecMode::Parallel { .. } => self.install(|| {
                    (start..end)
                        .into_par_iter()
                        .map(|i| source.read_partition(i).and_then(&local))
                        .collect()
                }),
            };
            for r in results {
                merge(r?)?;
            }
            start = end;
        }
        Ok(())
    }

    /// Map every partition with `local` and fold the results with an associative
    /// `combine`, starting from `init`.
    ///
    /// # Errors
    /// See [`Runner::for_each_wave`].
    pub fn fold<T, S, R, L, C>(&self, source: &S, init: R, local: L, mut combine: C) -> Result<R>
    where
        T: Send,
        S: Source<T> + ?Sized,
        R: Send,
        L: Fn(Partition<T>) -> Result<R> + Sync,
        C: FnMut(&mut R, R),
    {
        let mut acc = init;
        self.for_each_wave(source, local, |r| {
            combine(&mut acc, r);
            Ok(())
        })?;
        Ok(acc)
    }

    fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}
