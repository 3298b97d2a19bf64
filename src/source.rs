//! Partitioned record sources.
//!
//! A [`Source`] exposes a dataset as an ordered list of partitions that can be read
//! independently and any number of times. Nothing in the crate needs a whole dataset
//! resident at once: the [`Runner`](crate::runner::Runner) reads a bounded wave of
//! partitions, processes them in parallel, and folds the results in partition order.
//!
//! Two implementations ship with the crate:
//! - [`CsvSource`](crate::io::csv::CsvSource) - shards of one or more CSV files
//! - [`VecSource`] - contiguous chunks of an in-memory `Vec<T>`

/// One contiguous chunk of a dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition<T> {
    /// Position of this partition within its source.
    pub index: usize,
    /// Global 0-based row number of `rows[0]`.
    pub first_row: u64,
    pub rows: Vec<T>,
}

impl<T> Partition<T> {
    /// Iterate rows together with their global row numbers.
    pub fn numbered(&self) -> impl Iterator<Item = (u64, &T)> {
        (self.first_row..).zip(self.rows.iter())
    }

    /// Consuming variant of [`Partition::numbered`].
    pub fn into_numbered(self) -> impl Iterator<Item = (u64, T)> {
        (self.first_row..).zip(self.rows)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A re-scannable, partitioned dataset of `T`.
///
/// Implementations must return partitions whose `first_row` values are strictly
/// increasing with `index` and which together cover `0..total_rows()` without gaps.
pub trait Source<T>: Send + Sync {
    /// Number of data rows across all partitions.
    fn total_rows(&self) -> u64;

    /// Number of partitions; valid indexes are `0..partition_count()`.
    fn partition_count(&self) -> usize;

    /// Read partition `index`.
    ///
    /// # Errors
    /// Returns an error if the index is out of range or the backing storage
    /// cannot be read.
    fn read_partition(&self, index: usize) -> anyhow::Result<Partition<T>>;
}

/// In-memory source backed by a `Vec<T>`, split into chunks of `rows_per_partition`.
#[derive(Clone, Debug)]
pub struct VecSource<T> {
    data: Vec<T>,
    rows_per_partition: usize,
}

impl<T: Clone + Send + Sync> VecSource<T> {
    pub fn new(data: Vec<T>, rows_per_partition: usize) -> Self {
        Self {
            data,
            rows_per_partition: rows_per_partition.max(1),
        }
    }

    /// Source with all rows in a single partition.
    pub fn single(data: Vec<T>) -> Self {
        let n = data.len();
        Self::new(data, n)
    }
}

impl<T: Clone + Send + Sync> Source<T> for VecSource<T> {
    fn total_rows(&self) -> u64 {
        self.data.len() as u64
    }

    fn partition_count(&self) -> usize {
        self.data.len().div_ceil(self.rows_per_partition)
    }

    fn read_partition(&self, index: usize) -> anyhow::Result<Partition<T>> {
        let start = index * self.rows_per_partition;
        if start >= self.data.len() {
            anyhow::bail!(
                "partition {index} out of range ({} partitions)",
                self.partition_count()
            );
        }
        let end = (start + self.rows_per_partition).min(self.data.len());
        Ok(Partition {
            index,
            first_row: start as u64,
            rows: self.data[start..end].to_vec(),
        })
    }
}

/// Read every partition of `source` in order and concatenate the rows.
///
/// Meant for tests and small inputs; it defeats the point of partitioning on large data.
///
/// # Errors
/// Propagates the first partition read error.
pub fn collect_all<T, S>(source: &S) -> anyhow::Result<Vec<T>>
where
    S: Source<T> + ?Sized,
{
    let mut out = Vec::with_capacity(usize::try_from(source.total_rows()).unwrap_or(0));
    for i in 0..source.partition_count() {
        out.extend(source.read_partition(i)?.rows);
    }
    Ok(out)
}
