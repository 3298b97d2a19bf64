//! CSV sharding, partitioned reading and spill files.
//!
//! This module provides:
//! - **Sharding** of a CSV file into row ranges: [`CsvShards`], [`build_csv_shards`]
//! - **Shard reads** that seek straight to a shard's byte offset: [`read_csv_range`]
//! - **A [`Source`] over one or more files**: [`CsvSource`]
//! - **Spill files** that persist an intermediate dataset and re-open it as a
//!   source: [`SpillWriter`], [`SpilledCsv`]
//!
//! # Design notes
//! - Rows are deserialized with Serde by header **name**, so column order does not
//!   matter and extra columns are ignored. Fields are trimmed; empty or absent
//!   trailing fields read as `None` for `Option<String>` columns.
//! - Sharding is **row-count based** (header excluded). Building the shards costs
//!   one sequential scan that records the CSV byte position at every shard start;
//!   afterwards each shard read seeks directly to its start.

use crate::error::EtlError;
use crate::io::glob::expand_input;
use crate::source::{Partition, Source};
use anyhow::{Context, Result, anyhow};
use csv::{ByteRecord, Position, ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{File, create_dir_all};
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};

fn reader_builder() -> ReaderBuilder {
    let mut b = ReaderBuilder::new();
    // Short rows are allowed; their missing trailing fields read as `None`.
    b.has_headers(true).flexible(true).trim(Trim::All);
    b
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| EtlError::not_found(path, e).into())
}

fn csv_error(path: &Path, err: csv::Error) -> anyhow::Error {
    let line = err.position().map_or(0, Position::line);
    EtlError::Csv {
        path: path.to_path_buf(),
        line,
        source: err,
    }
    .into()
}

/// One contiguous row range of a CSV file.
#[derive(Clone, Debug)]
pub struct Shard {
    /// Reader position of the shard's first record.
    pub start: Position,
    /// Number of data rows in the shard.
    pub rows: u64,
}

/// Sharding metadata for a single CSV file.
///
/// Construct with [`build_csv_shards`] and read shards with [`read_csv_range`].
#[derive(Clone, Debug)]
pub struct CsvShards {
    /// Source file path.
    pub path: PathBuf,
    /// Header row as found in the file (trimmed).
    pub headers: StringRecord,
    /// Shards in file order.
    pub shards: Vec<Shard>,
    /// Total number of data rows (excluding header).
    pub total_rows: u64,
}

/// Check that every column in `required` is present in `headers`.
///
/// # Errors
/// Returns [`EtlError::Schema`] naming the first missing column.
pub fn check_headers(path: &Path, headers: &StringRecord, required: &[&str]) -> Result<()> {
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(EtlError::Schema {
                path: path.to_path_buf(),
                column: (*column).to_string(),
                found: headers.iter().collect::<Vec<_>>().join(","),
            }
            .into());
        }
    }
    Ok(())
}

/// Build [`CsvShards`] by scanning the file once and slicing it into shards of
/// `rows_per_shard` rows.
///
/// * The header must contain every column in `required`.
/// * A file with a header and no data rows, or a zero-byte file, yields
///   `CsvShards` with no shards.
///
/// # Errors
/// Returns [`EtlError::InputNotFound`] if the file cannot be opened,
/// [`EtlError::Schema`] if a required column is missing, and [`EtlError::Csv`] if
/// the file is not valid CSV.
pub fn build_csv_shards(
    path: impl AsRef<Path>,
    required: &[&str],
    rows_per_shard: usize,
) -> Result<CsvShards> {
    let path = path.as_ref().to_path_buf();
    let mut rdr = reader_builder().from_reader(open(&path)?);
    let headers = rdr.headers().map_err(|e| csv_error(&path, e))?.clone();
    if headers.is_empty() {
        // Zero-byte file: no header, no rows.
        return Ok(CsvShards {
            path,
            headers,
            shards: Vec::new(),
            total_rows: 0,
        });
    }
    check_headers(&path, &headers, required)?;

    let rps = rows_per_shard.max(1) as u64;
    let mut shards: Vec<Shard> = Vec::new();
    let mut total: u64 = 0;
    let mut rec = ByteRecord::new();
    loop {
        let pos = rdr.position().clone();
        if !rdr
            .read_byte_record(&mut rec)
            .map_err(|e| csv_error(&path, e))?
        {
            break;
        }
        if total % rps == 0 {
            shards.push(Shard {
                start: pos,
                rows: 0,
            });
        }
        if let Some(last) = shards.last_mut() {
            last.rows += 1;
        }
        total += 1;
    }

    Ok(CsvShards {
        path,
        headers,
        shards,
        total_rows: total,
    })
}

/// Read shard `shard` of `src` into typed rows.
///
/// # Errors
/// Returns an error if the shard index is out of range, the file cannot be opened,
/// or a row fails to deserialize into `T`.
pub fn read_csv_range<T: DeserializeOwned>(src: &CsvShards, shard: usize) -> Result<Vec<T>> {
    let s = src.shards.get(shard).ok_or_else(|| {
        anyhow!(
            "shard {shard} out of range for {} ({} shards)",
            src.path.display(),
            src.shards.len()
        )
    })?;
    let mut rdr = reader_builder().from_reader(open(&src.path)?);
    // Reads the header first, then jumps to the shard.
    rdr.seek(s.start.clone())
        .map_err(|e| csv_error(&src.path, e))?;

    let mut out = Vec::<T>::with_capacity(usize::try_from(s.rows).unwrap_or(0));
    for rec in rdr.deserialize::<T>().take(usize::try_from(s.rows).unwrap_or(usize::MAX)) {
        out.push(rec.map_err(|e| csv_error(&src.path, e))?);
    }
    Ok(out)
}

/// A [`Source`] over one or more CSV files sharing the same required columns.
///
/// Partitions are the shards of every file, in file order. Global row numbers run
/// continuously across files.
pub struct CsvSource<T> {
    files: Vec<CsvShards>,
    /// `(file, shard, first_row)` per partition.
    index: Vec<(usize, usize, u64)>,
    total_rows: u64,
    _t: PhantomData<fn() -> T>,
}

impl<T> Clone for CsvSource<T> {
    fn clone(&self) -> Self {
        Self {
            files: self.files.clone(),
            index: self.index.clone(),
            total_rows: self.total_rows,
            _t: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for CsvSource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvSource")
            .field("files", &self.paths())
            .field("partitions", &self.index.len())
            .field("total_rows", &self.total_rows)
            .finish()
    }
}

impl<T> CsvSource<T> {
    /// Open `input` (a path or glob pattern), checking each file's header against
    /// `required`.
    ///
    /// # Errors
    /// See [`expand_input`] and [`build_csv_shards`].
    pub fn open(input: impl AsRef<Path>, required: &[&str], rows_per_partition: usize) -> Result<Self> {
        let input = input.as_ref();
        let files = expand_input(input)?
            .into_iter()
            .map(|p| build_csv_shards(p, required, rows_per_partition))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("open CSV input {}", input.display()))?;
        Ok(Self::from_shards(files))
    }

    /// Assemble a source from already-built shards.
    pub fn from_shards(files: Vec<CsvShards>) -> Self {
        let mut index = Vec::new();
        let mut next_row = 0u64;
        for (fi, file) in files.iter().enumerate() {
            for (si, shard) in file.shards.iter().enumerate() {
                index.push((fi, si, next_row));
                next_row += shard.rows;
            }
        }
        Self {
            files,
            index,
            total_rows: next_row,
            _t: PhantomData,
        }
    }

    /// Files backing this source, in read order.
    pub fn paths(&self) -> Vec<&Path> {
        self.files.iter().map(|f| f.path.as_path()).collect()
    }
}

impl<T: DeserializeOwned> Source<T> for CsvSource<T> {
    fn total_rows(&self) -> u64 {
        self.total_rows
    }

    fn partition_count(&self) -> usize {
        self.index.len()
    }

    fn read_partition(&self, index: usize) -> Result<Partition<T>> {
        let &(file, shard, first_row) = self
            .index
            .get(index)
            .ok_or_else(|| anyhow!("partition {index} out of range ({} partitions)", self.index.len()))?;
        let rows = read_csv_range::<T>(&self.files[file], shard)?;
        Ok(Partition {
            index,
            first_row,
            rows,
        })
    }
}

/// Streams rows into a temporary CSV file that is deleted once the resulting
/// [`SpilledCsv`] is dropped.
pub struct SpillWriter<T> {
    writer: csv::Writer<BufWriter<File>>,
    path: TempPath,
    rows: u64,
    _t: PhantomData<fn(T)>,
}

impl<T: Serialize> SpillWriter<T> {
    /// Create a spill file inside `dir` (or the system temp directory).
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be created.
    pub fn create(dir: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("barcode-join-spill-").suffix(".csv");
        let file: NamedTempFile = match dir {
            Some(dir) => {
                create_dir_all(dir).with_context(|| format!("mkdir -p {}", dir.display()))?;
                builder.tempfile_in(dir)
            }
            None => builder.tempfile(),
        }
        .context("create spill file")?;
        let (file, path) = file.into_parts();
        let writer = WriterBuilder::new()
            .has_headers(true)
            .from_writer(BufWriter::new(file));
        Ok(Self {
            writer,
            path,
            rows: 0,
            _t: PhantomData,
        })
    }

    /// Append one row.
    ///
    /// # Errors
    /// Returns an error if the row cannot be serialized or written.
    pub fn push(&mut self, row: &T) -> Result<()> {
        self.writer
            .serialize(row)
            .with_context(|| format!("serialize spill row #{}", self.rows + 1))?;
        self.rows += 1;
        Ok(())
    }

    /// Number of rows written so far.
    #[must_use]
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush the file and re-open it as a partitioned source.
    ///
    /// An empty spill has no header row; it becomes a source with no partitions.
    ///
    /// # Errors
    /// Returns an error if flushing or re-reading the spill fails.
    pub fn finish(self, required: &[&str], rows_per_partition: usize) -> Result<SpilledCsv<T>> {
        let mut inner = self
            .writer
            .into_inner()
            .map_err(|e| anyhow!("flush spill file: {}", e.error()))?;
        inner.flush().context("flush spill file")?;
        drop(inner);

        let source = if self.rows == 0 {
            CsvSource::from_shards(Vec::new())
        } else {
            CsvSource::from_shards(vec![build_csv_shards(
                &self.path,
                required,
                rows_per_partition,
            )?])
        };
        Ok(SpilledCsv {
            source,
            path: self.path,
        })
    }
}

/// A dataset persisted to a temporary CSV file.
pub struct SpilledCsv<T> {
    source: CsvSource<T>,
    path: TempPath,
}

impl<T> SpilledCsv<T> {
    /// Location of the spill file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: DeserializeOwned> Source<T> for SpilledCsv<T> {
    fn total_rows(&self) -> u64 {
        self.source.total_rows()
    }

    fn partition_count(&self) -> usize {
        self.source.partition_count()
    }

    fn read_partition(&self, index: usize) -> Result<Partition<T>> {
        self.source.read_partition(index)
    }
}
