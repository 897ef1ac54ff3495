// tests/metrics.rs
use anyhow::Result;
use serde_json::json;
use windowflow::metrics::Metric;
use windowflow::*;

#[test]
fn counters_track_window_activity() -> Result<()> {
    let engine = WindowEngine::builder(
        PolicySpec::sliding(EvictionPolicy::Count(2), TriggerPolicy::Count(3)).partitioned(),
    )
    .name("counted")
    .build()?;

    for (k, v) in [("a", 1), ("a", 2), ("a", 3), ("b", 4)] {
        engine.insert(v, k)?;
    }
    engine.shutdown();

    let c = engine.counters();
    assert_eq!(c.tuples_inserted, 4);
    assert_eq!(c.evictions_total, 1);
    assert_eq!(c.triggers_total, 1);
    assert_eq!(c.flushes_total, 2);
    assert_eq!(c.partition_count, 0);
    Ok(())
}

#[test]
fn metric_handle_reads_live_counters() -> Result<()> {
    let engine = WindowEngine::builder(PolicySpec::tumbling(EvictionPolicy::Count(2))).build()?;
    let metric = WindowCounters::metric(&engine.counters_handle(), "pairs");

    engine.insert(1u8, ())?;
    assert_eq!(metric.value()["partition_count"], json!(1));
    engine.insert(2u8, ())?;
    assert_eq!(metric.value()["partition_count"], json!(0));
    assert_eq!(metric.value()["flushes_total"], json!(1));
    assert_eq!(metric.name(), "pairs");
    Ok(())
}

#[test]
fn registry_aggregates_counters_by_name() -> Result<()> {
    let registry = WindowRegistry::new();
    let orders = std::sync::Arc::new(
        WindowEngine::builder(PolicySpec::tumbling(EvictionPolicy::Punctuation).partitioned()).build()?,
    );
    orders.insert(10u32, "eu")?;
    orders.insert(11u32, "us")?;
    registry.register("orders", orders.clone());

    registry.start_all()?;
    assert_eq!(registry.counters()["orders"].partition_count, 2);

    registry.shutdown_all();
    let snapshot = registry.counters()["orders"];
    assert_eq!(snapshot.flushes_total, 2);
    assert_eq!(snapshot.to_json()["flushes_total"], json!(2));
    assert!(!orders.is_running());
    Ok(())
}
