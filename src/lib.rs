//! # Windowflow
//!
//! The **window-management engine** of a streaming dataflow runtime. A window
//! groups a keyed tuple stream into bounded, per-key buffers and tells the
//! owning operator when a buffer is complete (a *flush*), when it should be
//! reported without being emptied (a *trigger*), and when tuples or whole
//! partitions are dropped by policy.
//!
//! ## Key Features
//!
//! - **Tumbling, sliding and bucket windows** - count, time, delta and punctuation policies
//! - **Partitioned state** - one buffer per key, bounded by age, partition count or tuple count
//! - **Event-time buckets** - interval panes with watermark-driven closing and late-tuple discard
//! - **Summarization** - fold tuples into running aggregates instead of buffering them
//! - **Background eviction clock** - time policies evaluated off the data path
//! - **Checkpointing** - postcard snapshots with SHA-256 verification (feature `checkpointing`)
//! - **Metrics** - lock-free counters readable from any thread
//!
//! ## Quick Start
//!
//! ```
//! use windowflow::*;
//! use windowflow::testing::RecordingListener;
//!
//! # fn main() -> windowflow::Result<()> {
//! // keep the last 3 readings per sensor, report every 2 arrivals
//! let listener = RecordingListener::new();
//! let log = listener.log();
//! let engine = WindowEngine::builder(
//!     PolicySpec::sliding(EvictionPolicy::Count(3), TriggerPolicy::Count(2)).partitioned(),
//! )
//! .name("sensors")
//! .listener(listener)
//! .build()?;
//!
//! for (sensor, reading) in [("s1", 10), ("s1", 11), ("s2", 5), ("s1", 12), ("s1", 13)] {
//!     engine.insert(reading, sensor)?;
//! }
//!
//! assert_eq!(log.triggers(), vec![("s1", vec![10, 11]), ("s1", vec![11, 12, 13])]);
//! engine.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Policies
//!
//! A [`PolicySpec`] describes a window clause. [`PolicySpec::validate`] checks it
//! and produces a [`WindowPolicy`]; engines are always built from validated
//! policies, so malformed combinations are rejected before any tuple arrives.
//!
//! ### Partitions
//!
//! Each key owns a [`Partition`] inside a [`PartitionStore`]. Partitions are
//! created lazily by the first tuple for their key and removed when flushed or
//! evicted.
//!
//! ### Listeners
//!
//! The operator observes the window through a [`WindowListener`]. Callbacks are
//! invoked synchronously, under the engine lock, in the order things happen.
//!
//! ### Time
//!
//! Processing time comes from a [`TimeSource`]. Time-driven policies are
//! re-evaluated by an [`EvictionClock`] thread started with
//! [`WindowEngine::start`]; tests use [`ManualTimeSource`] and
//! [`WindowEngine::tick`] instead.
//!
//! ## Configuration
//!
//! [`EngineConfig`] carries the window name and clock tick interval. The tick
//! can be overridden with the `WINDOWFLOW_TICK_MS` environment variable via
//! [`EngineConfig::from_env`].
//!
//! ## Feature Flags
//!
//! - `checkpointing` (default) - [`WindowSnapshot::encode`] / [`WindowSnapshot::decode`]
//! - `parallel-shutdown` (default) - [`WindowRegistry::shutdown_all`] flushes windows on the rayon pool

pub mod checkpoint;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod listener;
pub mod metrics;
pub mod partition;
pub mod policy;
pub mod registry;
pub mod summarize;
pub mod testing;
pub mod time;
pub mod window;

pub use checkpoint::WindowSnapshot;
pub use clock::EvictionClock;
pub use config::EngineConfig;
pub use engine::{PartitionKey, PartitionRecord, Tuple, WindowEngine, WindowEngineBuilder};
pub use error::{Result, WindowError};
pub use listener::{NoopListener, Punctuation, WindowContents, WindowListener, WindowView};
pub use metrics::{CountersSnapshot, Metric, WindowCounters};
pub use partition::{Entry, Partition, PartitionEvictionReason, PartitionStore};
pub use policy::{
    BucketSpec, EventTime, EvictionPolicy, PartitionEviction, PolicySpec, Selector, TriggerPolicy, WindowKind,
    WindowPolicy, WindowShape,
};
pub use registry::{ManagedWindow, WindowRegistry};
pub use summarize::{AggregateSink, SummarizationSink};
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use window::{TimestampMs, Window};
