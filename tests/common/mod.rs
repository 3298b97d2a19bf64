//! Fixture helpers shared by the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// Write `body` under a `header` line to `dir/name` and return the path.
pub fn write_csv(dir: &Path, name: &str, header: &str, rows: &[&str]) -> anyhow::Result<PathBuf> {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut body = String::from(header);
    body.push('\n');
    for r in rows {
        body.push_str(r);
        body.push('\n');
    }
    fs::write(&path, body)?;
    Ok(path)
}

pub fn orders_csv(dir: &Path, rows: &[&str]) -> anyhow::Result<PathBuf> {
    write_csv(dir, "orders.csv", "customer_id,order_id", rows)
}

pub fn barcodes_csv(dir: &Path, rows: &[&str]) -> anyhow::Result<PathBuf> {
    write_csv(dir, "barcodes.csv", "order_id,barcode", rows)
}
