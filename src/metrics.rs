//! Read-only window counters for external metrics collectors.
//!
//! Counters are updated by the engine while it holds its lock and can be read
//! from any thread without taking it. Nothing is pushed anywhere: a collector
//! polls [`WindowCounters::snapshot`] or a [`Metric`] handle.
//!
//! # Example
//!
//! ```
//! use windowflow::metrics::{Metric, WindowCounters};
//! use std::sync::Arc;
//!
//! let counters = Arc::new(WindowCounters::default());
//! let metric = WindowCounters::metric(&counters, "orders_window");
//! assert_eq!(metric.name(), "orders_window");
//! assert_eq!(metric.value()["flushes_total"], 0);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Trait for pollable metrics.
pub trait Metric: Send + Sync {
    /// The name of this metric (e.g., `orders_window`).
    fn name(&self) -> &str;

    /// The current value of this metric as a JSON value.
    fn value(&self) -> Value;

    /// Optional description of what this metric measures.
    fn description(&self) -> Option<&str> {
        None
    }
}

/// Live counters for one window engine.
#[derive(Debug, Default)]
pub struct WindowCounters {
    partition_count: AtomicUsize,
    tuples_inserted: AtomicU64,
    evictions_total: AtomicU64,
    partitions_evicted: AtomicU64,
    flushes_total: AtomicU64,
    triggers_total: AtomicU64,
    late_dropped: AtomicU64,
}

impl WindowCounters {
    pub fn partition_count(&self) -> usize {
        self.partition_count.load(Ordering::Relaxed)
    }

    /// Tuples and partitions removed by eviction policies.
    pub fn evictions_total(&self) -> u64 {
        self.evictions_total.load(Ordering::Relaxed)
    }

    pub fn flushes_total(&self) -> u64 {
        self.flushes_total.load(Ordering::Relaxed)
    }

    pub(crate) fn set_partitions(&self, n: usize) {
        self.partition_count.store(n, Ordering::Relaxed);
    }

    pub(crate) fn inserted(&self) {
        self.tuples_inserted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn tuple_evicted(&self) {
        self.evictions_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn partition_evicted(&self) {
        self.evictions_total.fetch_add(1, Ordering::Relaxed);
        self.partitions_evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn flushed(&self) {
        self.flushes_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn triggered(&self) {
        self.triggers_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dropped_late(&self) {
        self.late_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            partition_count: self.partition_count(),
            tuples_inserted: self.tuples_inserted.load(Ordering::Relaxed),
            evictions_total: self.evictions_total(),
            partitions_evicted: self.partitions_evicted.load(Ordering::Relaxed),
            flushes_total: self.flushes_total(),
            triggers_total: self.triggers_total.load(Ordering::Relaxed),
            late_dropped: self.late_dropped.load(Ordering::Relaxed),
        }
    }

    /// A named [`Metric`] handle over shared counters.
    pub fn metric(counters: &Arc<Self>, name: impl Into<String>) -> CountersMetric {
        CountersMetric { name: name.into(), counters: Arc::clone(counters) }
    }
}

/// Point-in-time copy of [`WindowCounters`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountersSnapshot {
    pub partition_count: usize,
    pub tuples_inserted: u64,
    pub evictions_total: u64,
    pub partitions_evicted: u64,
    pub flushes_total: u64,
    pub triggers_total: u64,
    pub late_dropped: u64,
}

impl CountersSnapshot {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// [`Metric`] view of a window's counters.
#[derive(Clone, Debug)]
pub struct CountersMetric {
    name: String,
    counters: Arc<WindowCounters>,
}

impl Metric for CountersMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> Value {
        self.counters.snapshot().to_json()
    }

    fn description(&self) -> Option<&str> {
        Some("window partition, eviction and flush counters")
    }
}
