mod common;

use barcode_join::config::EtlConfig;
use barcode_join::error::EtlError;
use barcode_join::pipeline::Pipeline;
use common::{barcodes_csv, orders_csv, write_csv};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn config(dir: &Path, orders: &Path, barcodes: &Path) -> EtlConfig {
    EtlConfig {
        log_file: dir.join("logs").join("monitor.log"),
        spill_dir: Some(dir.join("spill")),
        ..EtlConfig::new(orders, barcodes)
    }
}

fn run(cfg: EtlConfig) -> anyhow::Result<(String, barcode_join::RunSummary)> {
    let mut out = Vec::<u8>::new();
    let summary = Pipeline::new(cfg).run(&mut out)?;
    Ok((String::from_utf8(out)?, summary))
}

fn scenario(dir: &Path) -> anyhow::Result<EtlConfig> {
    let orders = orders_csv(dir, &["C1,O1", "C2,O2"])?;
    let barcodes = barcodes_csv(dir, &["O1,B1", "O1,B1", "O1,B2", "O2,", "O3,B3"])?;
    Ok(config(dir, &orders, &barcodes))
}

#[test]
fn end_to_end_scenario() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let cfg = scenario(dir.path())?;
    let log_file = cfg.log_file.clone();
    let (out, summary) = run(cfg)?;

    assert_eq!(
        out,
        "O1, C1, [B1, B2]\nTop 5 customers\nC1, 2\nUnused barcodes count is: 1\n"
    );
    assert_eq!(summary.rejected.duplicates, 1);
    assert_eq!(summary.rejected.null_barcodes, 1);
    assert_eq!(summary.clean_barcodes, 3);
    assert_eq!(summary.unused_barcodes, 1);
    assert_eq!(summary.join.matched, 2);

    let log = fs::read_to_string(log_file)?;
    assert!(log.contains("ERROR: The duplicated rows: (1 rows)"));
    assert!(log.contains("ERROR: The following rows' barcode is NaN: (1 rows)"));
    Ok(())
}

#[test]
fn short_barcode_row_is_rejected_as_null() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let orders = orders_csv(dir.path(), &["C1,O1", "C2,O2"])?;
    let barcodes = barcodes_csv(dir.path(), &["O1,B1", "O2", "O1,B2"])?;
    let cfg = config(dir.path(), &orders, &barcodes);
    let log_file = cfg.log_file.clone();
    let (out, summary) = run(cfg)?;

    assert_eq!(
        out,
        "O1, C1, [B1, B2]\nTop 5 customers\nC1, 2\nUnused barcodes count is: 0\n"
    );
    assert_eq!(summary.rejected.null_barcodes, 1);
    assert_eq!(summary.rejected.duplicates, 0);

    let log = fs::read_to_string(log_file)?;
    let expected = "ERROR: The following rows' barcode is NaN: (1 rows)\n\
ERROR: row order_id barcode
  1       O2     NaN
";
    assert_eq!(log, expected);
    Ok(())
}

#[test]
fn padded_fields_are_duplicates_of_trimmed_ones() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let orders = orders_csv(dir.path(), &["C1,O1"])?;
    let barcodes = barcodes_csv(dir.path(), &["O1,B1", " O1 , B1 "])?;
    let (out, summary) = run(config(dir.path(), &orders, &barcodes))?;

    assert_eq!(out, "O1, C1, [B1]\nTop 5 customers\nC1, 1\nUnused barcodes count is: 0\n");
    assert_eq!(summary.rejected.duplicates, 1);
    assert_eq!(summary.clean_barcodes, 1);
    Ok(())
}

#[test]
fn empty_barcode_file() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let orders = orders_csv(dir.path(), &["C1,O1"])?;
    let barcodes = barcodes_csv(dir.path(), &[])?;
    let (out, summary) = run(config(dir.path(), &orders, &barcodes))?;
    assert_eq!(out, "Top 5 customers\nUnused barcodes count is: 0\n");
    assert!(summary.top_customers.is_empty());
    assert_eq!(summary.report.lines, 0);
    Ok(())
}

#[test]
fn log_is_truncated_between_runs() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let cfg = scenario(dir.path())?;
    let log_file = cfg.log_file.clone();
    run(cfg.clone())?;
    let first = fs::read_to_string(&log_file)?;
    run(cfg)?;
    assert_eq!(fs::read_to_string(&log_file)?, first);
    Ok(())
}

#[test]
fn execution_settings_do_not_change_results() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut order_rows = Vec::new();
    for i in 0..60 {
        order_rows.push(format!("C{},O{i}", i % 11));
    }
    let mut barcode_rows = Vec::new();
    for i in 0..400 {
        barcode_rows.push(format!("O{},B{}", (i * 3) % 70, i % 150));
        if i % 17 == 0 {
            barcode_rows.push(format!("O{i},"));
        }
    }
    let o: Vec<&str> = order_rows.iter().map(String::as_str).collect();
    let b: Vec<&str> = barcode_rows.iter().map(String::as_str).collect();
    let orders = orders_csv(dir.path(), &o)?;
    let barcodes = barcodes_csv(dir.path(), &b)?;

    let base = config(dir.path(), &orders, &barcodes);
    let sequential = EtlConfig {
        sequential: true,
        rows_per_partition: 1_000,
        ..base.clone()
    };
    let (expected_out, expected) = run(sequential)?;

    for (threads, rows, width) in [(Some(1), 7, Some(1)), (Some(4), 13, Some(3)), (None, 50, None)] {
        let cfg = EtlConfig {
            threads,
            rows_per_partition: rows,
            wave_width: width,
            ..base.clone()
        };
        let (out, mut summary) = run(cfg)?;
        assert_eq!(out, expected_out, "threads={threads:?} rows={rows}");
        assert!(summary.barcode_partitions > expected.barcode_partitions);
        summary.order_partitions = expected.order_partitions;
        summary.barcode_partitions = expected.barcode_partitions;
        assert_eq!(summary, expected);
    }
    Ok(())
}

#[test]
fn glob_inputs_and_summary_json() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let orders = orders_csv(dir.path(), &["C1,O1", "C2,O2"])?;
    write_csv(dir.path(), "in/barcodes-1.csv", "order_id,barcode", &["O1,B1", "O2,B2"])?;
    write_csv(dir.path(), "in/barcodes-2.csv", "order_id,barcode", &["O1,B1", "O9,B9"])?;
    let summary_path = dir.path().join("summary.json");

    let cfg = EtlConfig {
        summary_json: Some(summary_path.clone()),
        top: 1,
        ..config(dir.path(), &orders, &dir.path().join("in").join("barcodes-*.csv"))
    };
    let (out, summary) = run(cfg)?;
    assert_eq!(
        out,
        "O1, C1, [B1]\nO2, C2, [B2]\nTop 1 customers\nC1, 1\nUnused barcodes count is: 1\n"
    );
    assert_eq!(summary.rejected.duplicates, 1);

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(summary_path)?)?;
    assert_eq!(json["unused_barcodes"], 1);
    assert_eq!(json["top_customers"][0]["customer_id"], "C1");
    assert_eq!(json["rejected"]["duplicates"], 1);
    Ok(())
}

#[test]
fn missing_input_aborts_before_any_output() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let orders = orders_csv(dir.path(), &["C1,O1"])?;
    let cfg = config(dir.path(), &orders, &dir.path().join("missing.csv"));
    let log_file = cfg.log_file.clone();

    let mut out = Vec::<u8>::new();
    let err = Pipeline::new(cfg).run(&mut out).unwrap_err();
    let etl = err
        .chain()
        .find_map(|e| e.downcast_ref::<EtlError>())
        .expect("EtlError in chain");
    assert!(etl.is_input_not_found());
    assert!(out.is_empty());
    assert!(!log_file.exists());
    Ok(())
}

#[test]
fn bad_header_is_a_schema_error() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let orders = write_csv(dir.path(), "orders.csv", "customer,order_id", &["C1,O1"])?;
    let barcodes = barcodes_csv(dir.path(), &["O1,B1"])?;
    let err = run(config(dir.path(), &orders, &barcodes)).unwrap_err();
    let etl = err
        .chain()
        .find_map(|e| e.downcast_ref::<EtlError>())
        .expect("EtlError in chain");
    assert!(etl.is_schema());
    Ok(())
}
