use barcode_join::record::BarcodeRecord;
use barcode_join::reject_log::RejectLog;
use barcode_join::runner::{ExecMode, Runner};
use barcode_join::source::{Source, VecSource, collect_all};
use barcode_join::validation::{RejectedRow, RejectionKind, Validate};
use barcode_join::validator::{ValidatorConfig, validate};

fn b(order: &str, barcode: &str) -> BarcodeRecord {
    BarcodeRecord::new(order, barcode)
}

fn scenario() -> Vec<BarcodeRecord> {
    vec![
        b("O1", "B1"),
        b("O1", "B1"),
        b("O1", "B2"),
        BarcodeRecord::missing("O2"),
        b("O3", "B3"),
    ]
}

fn run(
    runner: &Runner,
    data: Vec<BarcodeRecord>,
    rows_per_partition: usize,
) -> anyhow::Result<(Vec<BarcodeRecord>, Vec<RejectedRow>, Vec<RejectedRow>, String)> {
    let source = VecSource::new(data, rows_per_partition);
    let mut log = RejectLog::new(Vec::<u8>::new());
    let v = validate(runner, &source, &mut log, &ValidatorConfig::default())?;
    let text = String::from_utf8(log.finish()?)?;
    Ok((collect_all(&v.clean)?, v.duplicates, v.nulls, text))
}

#[test]
fn record_rule_rejects_missing_and_blank_barcodes() {
    assert!(b("O1", "B1").validate().is_ok());
    assert!(BarcodeRecord::missing("O1").validate().is_err());
    let errs = b("O1", "  ").validate().unwrap_err();
    assert_eq!(errs[0].field.as_deref(), Some("barcode"));
    assert_eq!(errs[0].code.as_deref(), Some("null"));
}

#[test]
fn drops_duplicates_then_nulls() -> anyhow::Result<()> {
    let (clean, dups, nulls, _) = run(&Runner::sequential(), scenario(), 100)?;
    assert_eq!(clean, vec![b("O1", "B1"), b("O1", "B2"), b("O3", "B3")]);
    assert_eq!(dups.iter().map(|r| r.row).collect::<Vec<_>>(), vec![1]);
    assert_eq!(nulls.iter().map(|r| r.row).collect::<Vec<_>>(), vec![3]);
    assert!(dups.iter().all(|r| r.kind == RejectionKind::Duplicate));
    assert!(nulls.iter().all(|r| r.kind == RejectionKind::NullBarcode));
    Ok(())
}

#[test]
fn duplicates_spanning_partitions_are_caught() -> anyhow::Result<()> {
    // One row per partition: every duplicate is in a different partition than its original.
    let (clean, dups, _, _) = run(&Runner::default(), scenario(), 1)?;
    assert_eq!(clean, vec![b("O1", "B1"), b("O1", "B2"), b("O3", "B3")]);
    assert_eq!(dups.len(), 1);
    assert_eq!(dups[0].row, 1);
    Ok(())
}

#[test]
fn repeated_null_rows_count_once_as_null() -> anyhow::Result<()> {
    let data = vec![
        BarcodeRecord::missing("O2"),
        BarcodeRecord::missing("O2"),
        BarcodeRecord::missing("O9"),
    ];
    let (clean, dups, nulls, _) = run(&Runner::sequential(), data, 2)?;
    assert!(clean.is_empty());
    assert_eq!(dups.len(), 1);
    assert_eq!(nulls.len(), 2);
    Ok(())
}

#[test]
fn all_duplicate_file_keeps_one_row_per_distinct_value() -> anyhow::Result<()> {
    let data = vec![b("O1", "B1"); 4]
        .into_iter()
        .chain(vec![b("O2", "B2"); 3])
        .collect();
    let (clean, dups, nulls, log) = run(&Runner::default(), data, 3)?;
    assert_eq!(clean, vec![b("O1", "B1"), b("O2", "B2")]);
    assert_eq!(dups.len(), 5);
    assert!(nulls.is_empty());
    assert_eq!(log.matches("ERROR: The duplicated rows: (5 rows)").count(), 1);
    assert!(!log.contains("NaN:"));
    Ok(())
}

#[test]
fn validation_is_idempotent() -> anyhow::Result<()> {
    let (clean, ..) = run(&Runner::sequential(), scenario(), 2)?;
    let (again, dups, nulls, log) = run(&Runner::sequential(), clean.clone(), 2)?;
    assert_eq!(again, clean);
    assert!(dups.is_empty());
    assert!(nulls.is_empty());
    assert!(log.is_empty());
    Ok(())
}

#[test]
fn parallel_and_sequential_agree() -> anyhow::Result<()> {
    let mut data = Vec::new();
    for i in 0..500 {
        data.push(b(&format!("O{}", i % 37), &format!("B{}", i % 91)));
        if i % 13 == 0 {
            data.push(BarcodeRecord::missing(format!("O{i}")));
        }
    }
    let seq = run(&Runner::sequential(), data.clone(), 7)?;
    let par = run(&Runner::new(ExecMode::Parallel { threads: Some(4) }, 3)?, data, 7)?;
    assert_eq!(seq, par);
    Ok(())
}

#[test]
fn log_blocks_list_rejected_rows() -> anyhow::Result<()> {
    let (_, _, _, log) = run(&Runner::sequential(), scenario(), 100)?;
    let expected = "\
ERROR: The duplicated rows: (1 rows)
ERROR: row order_id barcode
  1       O1      B1
ERROR: The following rows' barcode is NaN: (1 rows)
ERROR: row order_id barcode
  3       O2     NaN
";
    assert_eq!(log, expected);
    Ok(())
}

#[test]
fn log_table_aligns_wide_values() -> anyhow::Result<()> {
    let rows = vec![RejectedRow {
        row: 12,
        record: b("ORDER-0001", "9"),
        kind: RejectionKind::Duplicate,
    }];
    let mut log = RejectLog::new(Vec::<u8>::new());
    log.write_block(RejectionKind::Duplicate, &rows)?;
    assert_eq!(log.blocks(), 1);
    assert_eq!(
        String::from_utf8(log.finish()?)?,
        "ERROR: The duplicated rows: (1 rows)\nERROR: row   order_id barcode\n 12 ORDER-0001       9\n"
    );
    Ok(())
}

#[test]
fn large_blocks_are_aligned_on_the_widest_row() -> anyhow::Result<()> {
    let rows: Vec<RejectedRow> = (0..12_000u64)
        .map(|i| RejectedRow {
            row: i,
            record: BarcodeRecord::missing(format!("O{}", i % 7)),
            kind: RejectionKind::NullBarcode,
        })
        .collect();
    let mut log = RejectLog::new(Vec::<u8>::new());
    log.write_block(RejectionKind::NullBarcode, &rows)?;
    let text = String::from_utf8(log.finish()?)?;

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2 + rows.len());
    assert_eq!(lines[1], "ERROR:   row order_id barcode");
    assert_eq!(lines[2], "    0       O0     NaN");
    assert_eq!(lines.last().copied(), Some("11999       O1     NaN"));
    assert!(lines[2..].iter().all(|l| l.len() == 22));
    Ok(())
}

#[test]
fn validation_error_display_names_field_and_code() {
    let errs = BarcodeRecord::missing("O1").validate().unwrap_err();
    assert_eq!(errs[0].to_string(), "[barcode] must not be null or empty (code: null)");
}

#[test]
fn empty_input_writes_no_blocks() -> anyhow::Result<()> {
    let (clean, dups, nulls, log) = run(&Runner::default(), Vec::new(), 10)?;
    assert!(clean.is_empty() && dups.is_empty() && nulls.is_empty());
    assert!(log.is_empty());
    Ok(())
}

#[test]
fn clean_set_is_repartitioned() -> anyhow::Result<()> {
    let data: Vec<_> = (0..10).map(|i| b("O1", &format!("B{i}"))).collect();
    let source = VecSource::single(data);
    let mut log = RejectLog::new(Vec::<u8>::new());
    let cfg = ValidatorConfig {
        rows_per_partition: 4,
        spill_dir: None,
    };
    let v = validate(&Runner::sequential(), &source, &mut log, &cfg)?;
    assert_eq!(v.clean.total_rows(), 10);
    assert_eq!(v.clean.partition_count(), 3);
    assert!(v.summary().is_empty());
    assert!(v.clean.path().exists());
    Ok(())
}
