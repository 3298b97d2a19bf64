use anyhow::Result;
use barcode_join::runner::{ExecMode, Runner};
use barcode_join::source::{Source, VecSource};

/// Merge sees partitions in order no matter how the work is scheduled.
#[test]
fn merge_runs_in_partition_order() -> Result<()> {
    let source = VecSource::new((0u32..103).collect(), 5);
    for runner in [
        Runner::sequential(),
        Runner::default(),
        Runner::new(ExecMode::Parallel { threads: Some(3) }, 2)?,
    ] {
        let mut seen = Vec::new();
        runner.for_each_wave(
            &source,
            |part| Ok((part.index, part.first_row, part.rows.iter().sum::<u32>())),
            |r| {
                seen.push(r);
                Ok(())
            },
        )?;
        assert_eq!(seen.len(), source.partition_count());
        assert!(seen.windows(2).all(|w| w[0].0 + 1 == w[1].0));
        assert_eq!(seen.iter().map(|r| r.2).sum::<u32>(), (0..103).sum::<u32>());
        assert_eq!(seen[20].1, 100);
    }
    Ok(())
}

#[test]
fn fold_matches_across_modes() -> Result<()> {
    let source = VecSource::new((1u64..=1000).collect(), 64);
    let seq = Runner::sequential().fold(&source, 0u64, |p| Ok(p.rows.iter().sum()), |a, b| *a += b)?;
    let par = Runner::default().fold(&source, 0u64, |p| Ok(p.rows.iter().sum()), |a, b| *a += b)?;
    assert_eq!(seq, 500_500);
    assert_eq!(seq, par);
    Ok(())
}

#[test]
fn local_error_stops_the_run() {
    let source = VecSource::new((0u32..10).collect(), 2);
    let mut merged = 0;
    let res = Runner::default().for_each_wave(
        &source,
        |p| {
            if p.index == 2 {
                anyhow::bail!("boom in partition {}", p.index);
            }
            Ok(())
        },
        |()| {
            merged += 1;
            Ok(())
        },
    );
    let err = res.unwrap_err();
    assert!(err.to_string().contains("boom in partition 2"));
    assert!(merged <= 2);
}

#[test]
fn empty_source_never_calls_merge() -> Result<()> {
    let source = VecSource::<u8>::single(Vec::new());
    assert_eq!(source.partition_count(), 0);
    Runner::default().for_each_wave(&source, |_| Ok(()), |()| -> Result<()> {
        panic!("merge called on empty source")
    })?;
    Ok(())
}

#[test]
fn out_of_range_partition_is_an_error() {
    let source = VecSource::new(vec![1, 2, 3], 2);
    assert!(source.read_partition(1).is_ok());
    assert!(source.read_partition(2).is_err());
}

#[test]
fn wave_width_is_at_least_one() -> Result<()> {
    let runner = Runner::new(ExecMode::Parallel { threads: None }, 0)?;
    assert_eq!(runner.wave_width, 1);
    Ok(())
}
