// tests/checkpoint.rs
#![cfg(feature = "checkpointing")]

use anyhow::Result;
use std::time::Duration;
use windowflow::testing::*;
use windowflow::*;

fn sliding() -> PolicySpec<i32> {
    PolicySpec::sliding(EvictionPolicy::Count(3), TriggerPolicy::Count(2)).partitioned()
}

#[test]
fn restored_window_continues_where_it_left_off() -> Result<()> {
    let original = WindowEngine::builder(sliding()).name("readings").build()?;
    for (k, v) in [("a", 1), ("a", 2), ("b", 9), ("a", 3), ("a", 4)] {
        original.insert(v, k.to_string())?;
    }
    let snap = original.snapshot();
    assert_eq!(snap.window, "readings");
    assert_eq!(snap.partition_count(), 2);
    assert_eq!(snap.tuple_count(), 4);

    let bytes = snap.encode()?;

    let listener = RecordingListener::new();
    let log = listener.log();
    let restored = WindowEngine::builder(sliding()).listener(listener).build()?;
    restored.restore(WindowSnapshot::decode(&bytes)?)?;
    assert_eq!(restored.partition_count(), 2);
    assert_eq!(restored.contents(&"a".to_string()), Some(vec![2, 3, 4]));

    // trigger state survives: "a" fired at 2 and 4, so the next fire is two inserts away
    restored.insert(5, "a".to_string())?;
    assert!(log.triggers().is_empty());
    restored.insert(6, "a".to_string())?;
    assert_eq!(log.triggers(), vec![("a".to_string(), vec![4, 5, 6])]);
    Ok(())
}

#[test]
fn snapshot_preserves_store_order() -> Result<()> {
    let engine = WindowEngine::builder(PolicySpec::tumbling(EvictionPolicy::Punctuation).partitioned()).build()?;
    for k in ["z", "a", "m"] {
        engine.insert(0u8, k.to_string())?;
    }
    let keys: Vec<_> = engine.snapshot().partitions.into_iter().map(|r| r.key).collect();
    assert_eq!(keys, vec!["z", "a", "m"]);

    let mut visited = Vec::new();
    engine.for_each_partition(|k, pane, p| visited.push((k.clone(), pane, p.tuple_count())));
    assert_eq!(visited[0], ("z".to_string(), None, 1));
    Ok(())
}

#[test]
fn bucket_watermark_survives_restore() -> Result<()> {
    let spec = || {
        PolicySpec::bucket(BucketSpec::new(
            EventTime::new(|t: &(i64, u8)| t.0),
            Duration::from_millis(100),
        ))
    };
    let original = WindowEngine::builder(spec()).build()?;
    original.insert((10, 1), ())?;
    original.insert((250, 2), ())?;

    let listener = RecordingListener::new();
    let log = listener.log();
    let restored = WindowEngine::builder(spec()).listener(listener).build()?;
    restored.restore(WindowSnapshot::decode(&original.snapshot().encode()?)?)?;

    assert_eq!(restored.watermark(), Some(250));
    restored.insert((20, 3), ())?;
    assert_eq!(restored.counters().late_dropped, 1);

    restored.insert_punctuation(Punctuation::FinalMarker)?;
    assert_eq!(log.flushes(), vec![((), Some(Window::new(200, 300)), vec![(250, 2)])]);
    Ok(())
}

#[test]
fn tampered_bytes_are_rejected() -> Result<()> {
    let engine = WindowEngine::builder(sliding()).build()?;
    engine.insert(1, "a".to_string())?;
    let mut bytes = engine.snapshot().encode()?;
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0x55;

    let res = WindowSnapshot::<String, i32>::decode(&bytes);
    assert!(matches!(res, Err(WindowError::Checkpoint(_))));
    Ok(())
}
