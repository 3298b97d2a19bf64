//! The reject log: a single-owner sink for rows dropped by validation.
//!
//! The driver creates one [`RejectLog`] per run (the file is truncated on open),
//! lends it `&mut` to the validator, and calls [`RejectLog::finish`] once validation
//! is complete. Because the log is owned by one caller, blocks can never interleave.
//!
//! Each non-empty rejection category becomes one block:
//!
//! ```text
//! ERROR: The duplicated rows: (2 rows)
//! ERROR: row order_id barcode
//!   1       O1      B1
//!   7       O4      B9
//! ```

use crate::validation::{RejectedRow, RejectionKind};
use anyhow::{Context, Result};
use std::fs::{File, create_dir_all};
use std::io::{self, BufWriter, Write};
use std::path::Path;

const NULL: &str = "NaN";

pub struct RejectLog<W: Write> {
    out: W,
    blocks: usize,
}

impl RejectLog<BufWriter<File>> {
    /// Open `path` for writing, truncating any previous log.
    ///
    /// # Errors
    /// Returns an error if the file or its parent directories cannot be created.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
        }
        let f = File::create(path).with_context(|| format!("create log {}", path.display()))?;
        Ok(Self::new(BufWriter::new(f)))
    }
}

impl<W: Write> RejectLog<W> {
    pub fn new(out: W) -> Self {
        Self { out, blocks: 0 }
    }

    /// Write one ERROR block for `kind` listing `rows`. Empty `rows` writes nothing.
    ///
    /// Column widths are computed in a first pass over `rows`; the table is then
    /// streamed to the writer row by row.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_block(&mut self, kind: RejectionKind, rows: &[RejectedRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        write_block_to(&mut self.out, kind, rows)
            .with_context(|| format!("write {kind} block to reject log"))?;
        self.blocks += 1;
        Ok(())
    }

    /// Number of blocks written so far.
    #[must_use]
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    /// Flush and hand back the underlying writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn finish(mut self) -> Result<W> {
        self.out.flush().context("flush reject log")?;
        Ok(self.out)
    }
}

const HEADER: [&str; 3] = ["row", "order_id", "barcode"];

fn digits(n: u64) -> usize {
    n.checked_ilog10().map_or(1, |d| d as usize + 1)
}

fn column_widths(rows: &[RejectedRow]) -> [usize; 3] {
    let mut widths = HEADER.map(str::len);
    for r in rows {
        let cells = [
            digits(r.row),
            r.record.order_id.chars().count(),
            r.record.barcode.as_deref().unwrap_or(NULL).chars().count(),
        ];
        for (w, c) in widths.iter_mut().zip(cells) {
            *w = (*w).max(c);
        }
    }
    widths
}

fn write_block_to<W: Write + ?Sized>(
    out: &mut W,
    kind: RejectionKind,
    rows: &[RejectedRow],
) -> io::Result<()> {
    write!(out, "ERROR: {} ({} rows)\nERROR: ", kind.message(), rows.len())?;
    write_table(out, rows)?;
    out.write_all(b"\n")
}

/// Write `rows` as a right-aligned table under a header line, without a
/// trailing newline.
fn write_table<W: Write + ?Sized>(out: &mut W, rows: &[RejectedRow]) -> io::Result<()> {
    let [r, o, b] = column_widths(rows);
    write!(out, "{:>r$} {:>o$} {:>b$}", HEADER[0], HEADER[1], HEADER[2])?;
    for row in rows {
        write!(
            out,
            "\n{:>r$} {:>o$} {:>b$}",
            row.row,
            row.record.order_id,
            row.record.barcode.as_deref().unwrap_or(NULL)
        )?;
    }
    Ok(())
}
