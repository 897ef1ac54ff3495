// tests/partition_bounds.rs
use anyhow::Result;
use std::time::Duration;
use windowflow::summarize::Count;
use windowflow::testing::*;
use windowflow::*;

fn bounded(
    bound: PartitionEviction,
    time: &ManualTimeSource,
) -> Result<(WindowEngine<&'static str, u32>, EventLog<&'static str, u32, ()>)> {
    let listener = RecordingListener::new();
    let log = listener.log();
    let engine = WindowEngine::builder(PolicySpec::tumbling(EvictionPolicy::Punctuation).with_partition_eviction(bound))
        .listener(listener)
        .time_source(time.clone())
        .build()?;
    Ok((engine, log))
}

#[test]
fn partition_count_evicts_least_recently_active() -> Result<()> {
    let time = ManualTimeSource::new(0);
    let (engine, log) = bounded(PartitionEviction::PartitionCount(2), &time)?;

    engine.insert(1, "a")?;
    time.set(1);
    engine.insert(2, "b")?;
    time.set(2);
    engine.insert(3, "a")?;
    time.set(3);
    engine.insert(4, "c")?;

    assert_eq!(log.evicted_partitions(), vec![("b", PartitionEvictionReason::TooManyPartitions)]);
    assert_eq!(engine.partition_count(), 2);
    assert_eq!(engine.evictions_total(), 1);
    assert_eq!(engine.contents(&"b"), None);

    let evicted = log.events().into_iter().find_map(|e| match e {
        RecordedEvent::PartitionEvicted { tuples, .. } => Some(tuples),
        _ => None,
    });
    assert_eq!(evicted, Some(vec![2]));
    Ok(())
}

#[test]
fn existing_partition_never_triggers_count_eviction() -> Result<()> {
    let time = ManualTimeSource::new(0);
    let (engine, log) = bounded(PartitionEviction::PartitionCount(1), &time)?;

    for v in 0..5 {
        engine.insert(v, "only")?;
    }
    assert!(log.evicted_partitions().is_empty());
    assert_eq!(engine.contents(&"only"), Some(vec![0, 1, 2, 3, 4]));
    Ok(())
}

#[test]
fn partition_age_evicts_idle_partitions_on_tick() -> Result<()> {
    let time = ManualTimeSource::new(0);
    let (engine, log) = bounded(PartitionEviction::PartitionAge(Duration::from_millis(100)), &time)?;

    engine.insert(1, "a")?;
    time.set(50);
    engine.insert(2, "b")?;

    time.set(120);
    engine.tick();
    assert_eq!(log.evicted_partitions(), vec![("a", PartitionEvictionReason::Idle)]);

    time.set(200);
    engine.tick();
    assert_eq!(engine.partition_count(), 0);
    assert_eq!(log.evicted_partitions().len(), 2);
    // eviction is not a flush
    assert!(log.flushes().is_empty());
    Ok(())
}

#[test]
fn partition_age_applies_on_insert_too() -> Result<()> {
    let time = ManualTimeSource::new(0);
    let (engine, log) = bounded(PartitionEviction::PartitionAge(Duration::from_millis(100)), &time)?;

    engine.insert(1, "a")?;
    time.set(500);
    engine.insert(2, "b")?;

    assert_eq!(log.evicted_partitions(), vec![("a", PartitionEvictionReason::Idle)]);
    assert_eq!(engine.partition_count(), 1);
    Ok(())
}

#[test]
fn stale_partition_is_not_revived_by_a_late_tuple() -> Result<()> {
    let time = ManualTimeSource::new(0);
    let (engine, log) = bounded(PartitionEviction::PartitionAge(Duration::from_millis(100)), &time)?;

    engine.insert(1, "a")?;
    time.set(1_000);
    engine.insert(2, "a")?;

    assert_eq!(log.evicted_partitions(), vec![("a", PartitionEvictionReason::Idle)]);
    assert_eq!(engine.contents(&"a"), Some(vec![2]));
    assert_eq!(engine.evictions_total(), 1);

    let mut created = None;
    engine.for_each_partition(|_, _, p| created = Some(p.created_at()));
    assert_eq!(created, Some(1_000));
    Ok(())
}

#[test]
fn tuple_count_evicts_smallest_partition_first() -> Result<()> {
    let time = ManualTimeSource::new(0);
    let (engine, log) = bounded(PartitionEviction::TupleCount(3), &time)?;

    engine.insert(1, "a")?;
    time.set(1);
    engine.insert(2, "b")?;
    engine.insert(3, "b")?;
    time.set(2);
    engine.insert(4, "c")?;

    assert_eq!(log.evicted_partitions(), vec![("a", PartitionEvictionReason::TooManyTuples)]);
    assert_eq!(engine.contents(&"b"), Some(vec![2, 3]));
    assert_eq!(engine.contents(&"c"), Some(vec![4]));
    Ok(())
}

#[test]
fn tuple_count_cannot_shrink_the_receiving_partition() -> Result<()> {
    let time = ManualTimeSource::new(0);
    let (engine, log) = bounded(PartitionEviction::TupleCount(2), &time)?;

    for v in 0..4 {
        engine.insert(v, "hot")?;
    }
    // the partition being inserted into is never a victim
    assert!(log.evicted_partitions().is_empty());
    assert_eq!(engine.contents(&"hot").map(|t| t.len()), Some(4));
    Ok(())
}

#[test]
fn evicted_summarized_partition_carries_its_summary() -> Result<()> {
    let listener = RecordingListener::new();
    let log = listener.log();
    let time = ManualTimeSource::new(0);
    let engine = WindowEngine::summarizing_builder(
        PolicySpec::tumbling(EvictionPolicy::Punctuation)
            .with_partition_eviction(PartitionEviction::PartitionCount(1))
            .summarizing(),
        AggregateSink::new(|v: &u32| *v, Count),
    )
    .listener(listener)
    .time_source(time.clone())
    .build()?;

    engine.insert(7, "a")?;
    engine.insert(8, "a")?;
    time.set(10);
    engine.insert(9, "b")?;

    let evicted: Vec<_> = log
        .events()
        .into_iter()
        .filter_map(|e| match e {
            RecordedEvent::PartitionEvicted { key, summary, .. } => Some((key, summary)),
            _ => None,
        })
        .collect();
    assert_eq!(evicted, vec![("a", Some(2))]);

    engine.shutdown();
    assert_eq!(log.summaries(), vec![("b", 1)]);
    Ok(())
}
