// tests/tumbling.rs
use anyhow::Result;
use std::time::Duration;
use windowflow::summarize::{Count, Sum};
use windowflow::testing::*;
use windowflow::*;

type Log = EventLog<&'static str, i32, ()>;

fn punctuated() -> Result<(WindowEngine<&'static str, i32>, Log)> {
    let listener = RecordingListener::new();
    let log = listener.log();
    let engine = WindowEngine::builder(PolicySpec::tumbling(EvictionPolicy::Punctuation).partitioned())
        .name("punctuated")
        .listener(listener)
        .build()?;
    Ok((engine, log))
}

#[test]
fn window_marker_flushes_each_key_in_arrival_order() -> Result<()> {
    let (engine, log) = punctuated()?;

    engine.insert(1, "x")?;
    engine.insert(2, "y")?;
    engine.insert(3, "x")?;
    assert_eq!(engine.partition_count(), 2);

    engine.insert_punctuation(Punctuation::WindowMarker)?;

    assert_eq!(log.flushes(), vec![("x", None, vec![1, 3]), ("y", None, vec![2])]);
    assert_flushes_balanced(&log);
    assert_eq!(engine.partition_count(), 0);
    assert_eq!(engine.flushes_total(), 2);
    Ok(())
}

#[test]
fn tuple_after_flush_starts_a_new_partition() -> Result<()> {
    let (engine, log) = punctuated()?;

    engine.insert(1, "x")?;
    engine.insert_punctuation(Punctuation::WindowMarker)?;
    engine.insert(4, "x")?;

    assert_eq!(engine.partition_count(), 1);
    assert_eq!(engine.contents(&"x"), Some(vec![4]));

    engine.insert_punctuation(Punctuation::FinalMarker)?;
    assert_flushed_tuples(&log, &[vec![1], vec![4]]);
    Ok(())
}

#[test]
fn marker_on_empty_window_is_reported_once() -> Result<()> {
    let (engine, log) = punctuated()?;

    engine.insert_punctuation(Punctuation::WindowMarker)?;
    assert_eq!(log.empty_puncts(), vec![Punctuation::WindowMarker]);
    assert!(log.flushes().is_empty());

    // flushing leaves the store empty, so the next marker is empty as well
    engine.insert(9, "z")?;
    engine.insert_punctuation(Punctuation::WindowMarker)?;
    engine.insert_punctuation(Punctuation::FinalMarker)?;
    assert_eq!(log.empty_puncts(), vec![Punctuation::WindowMarker, Punctuation::FinalMarker]);
    assert_eq!(log.flushes().len(), 1);
    Ok(())
}

#[test]
fn insert_callbacks_bracket_each_tuple() -> Result<()> {
    let (engine, log) = punctuated()?;
    engine.insert(5, "k")?;

    assert_eq!(
        log.events(),
        vec![
            RecordedEvent::BeforeInsert { key: "k", tuple: 5 },
            RecordedEvent::AfterInsert { key: "k", tuple: 5 },
        ]
    );
    Ok(())
}

#[test]
fn count_windows_close_at_exactly_n() -> Result<()> {
    let listener = RecordingListener::new();
    let log = listener.log();
    let engine = WindowEngine::builder(PolicySpec::tumbling(EvictionPolicy::Count(3)).partitioned())
        .listener(listener)
        .build()?;

    for (v, k) in [(1, "a"), (2, "b"), (3, "a"), (4, "a"), (5, "b"), (6, "a")] {
        engine.insert(v, k)?;
    }

    // "a" filled at 4; "b" holds two tuples, "a" one more
    assert_eq!(log.flushes(), vec![("a", None, vec![1, 3, 4])]);
    assert_eq!(engine.contents(&"a"), Some(vec![6]));
    assert_eq!(engine.contents(&"b"), Some(vec![2, 5]));
    Ok(())
}

#[test]
fn time_windows_flush_on_tick_by_age() -> Result<()> {
    let time = ManualTimeSource::new(1_000);
    let listener = RecordingListener::new();
    let log = listener.log();
    let engine = WindowEngine::builder(PolicySpec::tumbling(EvictionPolicy::Time(Duration::from_millis(500))).partitioned())
        .listener(listener)
        .time_source(time.clone())
        .build()?;

    engine.insert(1, "a")?;
    time.advance(Duration::from_millis(200));
    engine.insert(2, "b")?;
    engine.insert(3, "a")?;

    time.advance(Duration::from_millis(299));
    engine.tick();
    assert!(log.flushes().is_empty());

    time.advance(Duration::from_millis(1));
    engine.tick();
    assert_eq!(log.flushes(), vec![("a", None, vec![1, 3])]);

    engine.insert(4, "a")?;
    time.advance(Duration::from_millis(200));
    engine.tick();
    assert_eq!(log.flushes().len(), 2);
    assert_eq!(engine.contents(&"a"), Some(vec![4]));
    Ok(())
}

#[test]
fn delta_windows_close_when_far_from_first_tuple() -> Result<()> {
    let listener = RecordingListener::new();
    let log = listener.log();
    let spec = PolicySpec::tumbling(EvictionPolicy::Delta {
        selector: Selector::new(|t: &(u8, f64)| t.1),
        threshold: 1.0,
    })
    .partitioned();
    let engine = WindowEngine::builder(spec).listener(listener).build()?;

    engine.insert((1, 20.0), "room")?;
    engine.insert((2, 20.5), "room")?;
    engine.insert((3, 21.0), "room")?;
    engine.insert((4, 21.5), "room")?;

    let flushes = log.flushes();
    assert_eq!(flushes.len(), 1);
    assert_eq!(flushes[0].2, vec![(1, 20.0), (2, 20.5), (3, 21.0)]);
    assert_eq!(engine.contents(&"room"), Some(vec![(4, 21.5)]));
    Ok(())
}

#[test]
fn summarizing_window_reports_summaries_not_tuples() -> Result<()> {
    let listener = RecordingListener::new();
    let log = listener.log();
    let sink = AggregateSink::new(|v: &i64| *v, Sum::<i64>::new());
    let engine = WindowEngine::summarizing_builder(
        PolicySpec::tumbling(EvictionPolicy::Count(3)).partitioned().summarizing(),
        sink,
    )
    .listener(listener)
    .build()?;

    for (v, k) in [(1, "a"), (2, "a"), (10, "b"), (3, "a")] {
        engine.insert(v, k)?;
    }
    assert_eq!(log.summaries(), vec![("a", 6)]);
    assert_eq!(log.flushes(), vec![("a", None, vec![])]);
    // summarized partitions keep no tuples
    assert_eq!(engine.contents(&"b"), Some(vec![]));

    engine.insert_punctuation(Punctuation::FinalMarker)?;
    assert_eq!(log.summaries(), vec![("a", 6), ("b", 10)]);
    assert_flushes_balanced(&log);
    Ok(())
}

#[test]
fn summary_starts_fresh_after_flush() -> Result<()> {
    let listener = RecordingListener::new();
    let log = listener.log();
    let engine = WindowEngine::summarizing_builder(
        PolicySpec::tumbling(EvictionPolicy::Punctuation).summarizing(),
        AggregateSink::new(|v: &u32| *v, Count),
    )
    .listener(listener)
    .build()?;

    engine.insert(1, ())?;
    engine.insert(1, ())?;
    engine.insert_punctuation(Punctuation::WindowMarker)?;
    engine.insert(1, ())?;
    engine.insert_punctuation(Punctuation::WindowMarker)?;

    assert_eq!(log.summaries(), vec![((), 2), ((), 1)]);
    Ok(())
}

#[test]
fn top_k_summary_over_float_readings() -> Result<()> {
    use ordered_float::OrderedFloat;
    use windowflow::summarize::TopK;

    let listener = RecordingListener::new();
    let log = listener.log();
    let engine = WindowEngine::summarizing_builder(
        PolicySpec::tumbling(EvictionPolicy::Count(4)).summarizing(),
        AggregateSink::new(|t: &f64| OrderedFloat(*t), TopK::new(2)),
    )
    .listener(listener)
    .build()?;

    for t in [0.5, 2.25, -1.0, 1.75] {
        engine.insert(t, ())?;
    }
    assert_eq!(log.summaries(), vec![((), vec![OrderedFloat(2.25), OrderedFloat(1.75)])]);
    Ok(())
}

#[test]
fn expired_time_window_closes_on_insert_without_a_tick() -> Result<()> {
    let time = ManualTimeSource::new(0);
    let listener = RecordingListener::new();
    let log = listener.log();
    let engine = WindowEngine::builder(PolicySpec::tumbling(EvictionPolicy::Time(Duration::from_millis(100))))
        .listener(listener)
        .time_source(time.clone())
        .build()?;

    engine.insert(1, ())?;
    time.set(50);
    engine.insert(2, ())?;
    time.set(500);
    engine.insert(3, ())?;

    assert_eq!(log.flushes(), vec![((), None, vec![1, 2])]);
    assert_eq!(engine.contents(&()), Some(vec![3]));
    Ok(())
}
