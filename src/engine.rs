//! The window engine: insertion, policy evaluation and flush emission.
//!
//! A [`WindowEngine`] owns one validated [`WindowPolicy`], one
//! [`PartitionStore`], an optional [`SummarizationSink`] and the operator's
//! [`WindowListener`]. All of it lives behind a single lock, so tuple
//! inserts, punctuation and eviction-clock ticks on the same window are
//! mutually exclusive and callbacks are emitted in one linear sequence.
//!
//! Per-partition lifecycle: a partition is created by the first tuple for its
//! key, may lose individual tuples to the eviction policy (sliding windows),
//! is flushed when its window closes (`before_flush`, clear, `after_flush`)
//! and is then removed, or is evicted outright by the partition-eviction
//! policy. A tuple arriving after its partition was removed starts a new one.
//!
//! # Example
//!
//! ```
//! use windowflow::*;
//! use windowflow::testing::RecordingListener;
//!
//! # fn main() -> windowflow::Result<()> {
//! let listener = RecordingListener::new();
//! let log = listener.log();
//! let engine = WindowEngine::builder(PolicySpec::tumbling(EvictionPolicy::Punctuation).partitioned())
//!     .listener(listener)
//!     .build()?;
//!
//! engine.insert(1, "x")?;
//! engine.insert(2, "y")?;
//! engine.insert(3, "x")?;
//! engine.insert_punctuation(Punctuation::FinalMarker)?;
//!
//! assert_eq!(log.flushes(), vec![("x", None, vec![1, 3]), ("y", None, vec![2])]);
//! assert_eq!(engine.partition_count(), 0);
//! # Ok(())
//! # }
//! ```

use crate::checkpoint::WindowSnapshot;
use crate::clock::EvictionClock;
use crate::config::EngineConfig;
use crate::error::{Result, WindowError};
use crate::listener::{NoopListener, Punctuation, WindowListener, WindowView};
use crate::metrics::{CountersSnapshot, WindowCounters};
use crate::partition::{Entry, EvictedPartition, PaneKey, Partition, PartitionStore, Slot};
use crate::policy::{
    BucketSpec, EvictionPolicy, PartitionEviction, PolicySpec, TriggerPolicy, WindowPolicy, WindowShape, as_ms,
};
use crate::summarize::SummarizationSink;
use crate::time::{SystemTimeSource, TimeSource};
use crate::window::{TimestampMs, Window};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Bounds every partition key must satisfy.
pub trait PartitionKey: Hash + Eq + Clone + Send + 'static {}
impl<K: Hash + Eq + Clone + Send + 'static> PartitionKey for K {}

/// Bounds every tuple type must satisfy.
pub trait Tuple: Clone + Send + 'static {}
impl<T: Clone + Send + 'static> Tuple for T {}

type Listener<K, T, S> = Box<dyn WindowListener<K, T, S>>;
type Sink<K, T, S> = Box<dyn SummarizationSink<K, T, Summary = S>>;

/// One partition as exposed to checkpointing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PartitionRecord<K, T> {
    pub key: K,
    pub pane: Option<Window>,
    pub partition: Partition<T>,
}

/* ===================== Emitter ===================== */

/// Callback side of the engine: listener, summarizer and counters.
struct Emitter<K, T, S> {
    listener: Listener<K, T, S>,
    sink: Option<Sink<K, T, S>>,
    counters: Arc<WindowCounters>,
}

fn view<'a, K, T, S>(sink: &Option<Sink<K, T, S>>, pk: &PaneKey<K>, p: &'a Partition<T>) -> WindowView<'a, T, S> {
    match sink {
        Some(sink) => WindowView::summarized(pk.pane, sink.snapshot(&pk.key)),
        None => WindowView::tuples(pk.pane, p),
    }
}

impl<K, T, S> Emitter<K, T, S> {
    fn flush(&mut self, pk: &PaneKey<K>, p: &mut Partition<T>) {
        {
            let v = view(&self.sink, pk, p);
            self.listener.before_flush(&pk.key, &v);
        }
        p.clear();
        self.listener.after_flush(&pk.key, pk.pane);
        if let Some(sink) = self.sink.as_mut() {
            sink.reset(&pk.key);
        }
        self.counters.flushed();
    }

    fn trigger(&mut self, pk: &PaneKey<K>, p: &Partition<T>) {
        let v = view(&self.sink, pk, p);
        self.listener.on_trigger(&pk.key, &v);
        self.counters.triggered();
    }

    fn initial_full(&mut self, pk: &PaneKey<K>, p: &Partition<T>) {
        let v = view(&self.sink, pk, p);
        self.listener.on_initial_full(&pk.key, &v);
    }

    fn tuple_evicted(&mut self, key: &K, e: &Entry<T>) {
        self.listener.on_tuple_evicted(key, e);
        self.counters.tuple_evicted();
    }

    fn partition_evicted(&mut self, ev: EvictedPartition<PaneKey<K>, T>) {
        {
            let v = view(&self.sink, &ev.key, &ev.partition);
            self.listener.on_partition_evicted(&ev.key.key, ev.reason, &v);
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.reset(&ev.key.key);
        }
        self.counters.partition_evicted();
    }
}

fn evict_older_than<K, T, S>(out: &mut Emitter<K, T, S>, pk: &PaneKey<K>, p: &mut Partition<T>, cutoff: TimestampMs) {
    while p.front().is_some_and(|e| e.arrived_at <= cutoff) {
        let Some(e) = p.pop_front() else { break };
        out.tuple_evicted(&pk.key, &e);
    }
}

/* ===================== Core ===================== */

/// Everything guarded by the engine lock.
struct Core<K, T, S> {
    name: String,
    policy: Arc<WindowPolicy<T>>,
    store: PartitionStore<PaneKey<K>, T>,
    out: Emitter<K, T, S>,
    time: Arc<dyn TimeSource>,
    watermark: Option<TimestampMs>,
    closed: bool,
}

impl<K: PartitionKey, T: Tuple, S: Send + 'static> Core<K, T, S> {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(WindowError::Closed { name: self.name.clone() });
        }
        Ok(())
    }

    fn sync_partition_count(&self) {
        self.out.counters.set_partitions(self.store.len());
    }

    fn insert(&mut self, tuple: T, key: K) -> Result<()> {
        self.ensure_open()?;
        let now = self.time.now_ms();
        let policy = Arc::clone(&self.policy);
        let result = match &policy.shape {
            WindowShape::Tumbling { eviction } => self.insert_tumbling(tuple, key, eviction, now),
            WindowShape::Sliding { eviction, trigger } => self.insert_sliding(tuple, key, eviction, trigger, now),
            WindowShape::Bucket(bucket) => self.insert_bucket(tuple, key, bucket, now),
        };
        self.sync_partition_count();
        result
    }

    /// Route one tuple into the partition for `pk`, creating it if needed.
    fn append(&mut self, pk: &PaneKey<K>, tuple: T, now: TimestampMs) -> Result<()> {
        let summarized = self.policy.summarizing;
        let Slot { partition, evicted, .. } = self.store.partition_for(pk, now, summarized)?;
        for ev in evicted {
            self.out.partition_evicted(ev);
        }

        self.out.listener.before_insert(&pk.key, &tuple);
        match self.out.sink.as_mut() {
            Some(sink) => {
                sink.accumulate(&pk.key, &tuple);
                self.out.listener.after_insert(&pk.key, &tuple);
                partition.push(Entry { tuple, arrived_at: now })?;
            }
            None => {
                partition.push(Entry { tuple, arrived_at: now })?;
                if let Some(last) = partition.back() {
                    self.out.listener.after_insert(&pk.key, &last.tuple);
                }
            }
        }
        self.out.counters.inserted();
        Ok(())
    }

    fn flush_and_remove(&mut self, pk: &PaneKey<K>) {
        if let Some(mut p) = self.store.remove(pk) {
            self.out.flush(pk, &mut p);
        }
    }

    fn insert_tumbling(&mut self, tuple: T, key: K, eviction: &EvictionPolicy<T>, now: TimestampMs) -> Result<()> {
        let pk = PaneKey::whole(key);
        let delta = match eviction {
            EvictionPolicy::Delta { selector, threshold } => Some((selector.select(&tuple), *threshold)),
            _ => None,
        };

        // an expired window is closed before the tuple can land in it
        if let EvictionPolicy::Time(d) = eviction {
            let expired = self
                .store
                .get(&pk)
                .is_some_and(|p| now.saturating_sub(p.created_at()) >= as_ms(*d));
            if expired {
                self.flush_and_remove(&pk);
            }
        }

        // a tuple too far from the window's first tuple closes the window
        // and opens the next one
        if let Some((v, threshold)) = delta {
            let crossed = self
                .store
                .get(&pk)
                .and_then(|p| p.trigger.reference)
                .is_some_and(|first| (v - first).abs() > threshold);
            if crossed {
                trace!(window = %self.name, "delta bound crossed; closing tumbling window");
                self.flush_and_remove(&pk);
            }
        }

        self.append(&pk, tuple, now)?;

        let Some(p) = self.store.get_mut(&pk) else { return Ok(()) };
        if let Some((v, _)) = delta {
            if p.trigger.reference.is_none() {
                p.trigger.reference = Some(v);
            }
        }
        if let EvictionPolicy::Count(n) = eviction {
            if p.tuple_count() >= *n {
                self.flush_and_remove(&pk);
            }
        }
        Ok(())
    }

    fn insert_sliding(
        &mut self,
        tuple: T,
        key: K,
        eviction: &EvictionPolicy<T>,
        trigger: &TriggerPolicy<T>,
        now: TimestampMs,
    ) -> Result<()> {
        let pk = PaneKey::whole(key);
        let delta_trigger = match trigger {
            TriggerPolicy::Delta { selector, threshold } => Some((selector.select(&tuple), *threshold)),
            _ => None,
        };

        // delta triggers report the window as it was before the new tuple
        if let Some((v, threshold)) = delta_trigger {
            if let Some(p) = self.store.get_mut(&pk) {
                if p.trigger.reference.is_some_and(|r| (v - r).abs() > threshold) {
                    p.trigger.reference = Some(v);
                    p.trigger.last_trigger_at = now;
                    self.out.trigger(&pk, p);
                }
            }
        }

        self.append(&pk, tuple, now)?;

        let Some(p) = self.store.get_mut(&pk) else { return Ok(()) };
        match eviction {
            EvictionPolicy::Count(n) => {
                while p.tuple_count() > *n {
                    let Some(e) = p.pop_front() else { break };
                    self.out.tuple_evicted(&pk.key, &e);
                }
                if !p.initial_full && p.tuple_count() == *n {
                    p.initial_full = true;
                    self.out.initial_full(&pk, p);
                }
            }
            EvictionPolicy::Time(d) => evict_older_than(&mut self.out, &pk, p, now.saturating_sub(as_ms(*d))),
            EvictionPolicy::Delta { selector, threshold } => {
                if let Some(newest) = p.back().map(|e| selector.select(&e.tuple)) {
                    while p
                        .front()
                        .is_some_and(|e| (newest - selector.select(&e.tuple)).abs() > *threshold)
                    {
                        let Some(e) = p.pop_front() else { break };
                        self.out.tuple_evicted(&pk.key, &e);
                    }
                }
            }
            EvictionPolicy::Punctuation => {}
        }

        match trigger {
            TriggerPolicy::Count(n) => {
                p.trigger.since_trigger += 1;
                if p.trigger.since_trigger >= *n {
                    p.trigger.since_trigger = 0;
                    p.trigger.last_trigger_at = now;
                    self.out.trigger(&pk, p);
                }
            }
            TriggerPolicy::Delta { .. } => {
                if p.trigger.reference.is_none() {
                    p.trigger.reference = delta_trigger.map(|(v, _)| v);
                }
            }
            TriggerPolicy::Time(_) | TriggerPolicy::Punctuation => {}
        }
        Ok(())
    }

    fn insert_bucket(&mut self, tuple: T, key: K, bucket: &BucketSpec<T>, now: TimestampMs) -> Result<()> {
        let et = bucket.event_time.of(&tuple);
        let discard = bucket.discard_age_ms();
        let prev = self.watermark;

        let mut panes = Vec::new();
        for w in Window::containing(et, bucket.duration_ms(), bucket.period_ms(), bucket.offset_ms()) {
            if prev.is_some_and(|wm| w.end.saturating_add(discard) <= wm) {
                self.out.counters.dropped_late();
            } else {
                panes.push(w);
            }
        }

        match panes.split_last() {
            Some((last, rest)) => {
                for w in rest {
                    self.append(&PaneKey::interval(key.clone(), *w), tuple.clone(), now)?;
                }
                self.append(&PaneKey::interval(key, *last), tuple, now)?;
            }
            None => trace!(window = %self.name, event_time = et, "tuple assigned to no interval"),
        }

        let wm = prev.map_or(et, |wm| wm.max(et));
        self.watermark = Some(wm);
        self.close_panes(wm);
        Ok(())
    }

    /// Flush and remove every interval that ends at or before `wm`.
    fn close_panes(&mut self, wm: TimestampMs) {
        let due = self.store.keys_where(|pk, _| pk.pane.is_some_and(|w| w.end <= wm));
        for pk in due {
            self.flush_and_remove(&pk);
        }
    }

    fn punctuate(&mut self, punct: Punctuation) -> Result<()> {
        self.ensure_open()?;
        self.apply_punctuation(punct);
        self.sync_partition_count();
        Ok(())
    }

    fn apply_punctuation(&mut self, punct: Punctuation) {
        if let Punctuation::Other(kind) = punct {
            trace!(window = %self.name, kind, "ignoring punctuation");
            return;
        }
        if self.store.is_empty() {
            self.out.listener.on_empty_window_punct(punct);
            return;
        }
        if punct == Punctuation::WindowMarker && self.policy.marker_triggers() {
            let now = self.time.now_ms();
            for (pk, p) in self.store.iter_mut() {
                p.trigger.last_trigger_at = now;
                self.out.trigger(pk, p);
            }
            return;
        }

        debug!(window = %self.name, partitions = self.store.len(), ?punct, "flushing all partitions");
        // each partition leaves the store before its flush events fire
        while let Some((pk, mut p)) = self.store.pop_front() {
            self.sync_partition_count();
            self.out.flush(&pk, &mut p);
        }
    }

    fn tick(&mut self) {
        if self.closed {
            return;
        }
        let now = self.time.now_ms();

        if let Some(PartitionEviction::PartitionAge(max_age)) = self.policy.partition_eviction {
            for ev in self.store.evict_idle(now.saturating_sub(as_ms(max_age))) {
                self.out.partition_evicted(ev);
            }
        }

        let policy = Arc::clone(&self.policy);
        match &policy.shape {
            WindowShape::Tumbling { eviction: EvictionPolicy::Time(d) } => {
                let d = as_ms(*d);
                let due = self.store.keys_where(|_, p| now.saturating_sub(p.created_at()) >= d);
                for pk in due {
                    self.flush_and_remove(&pk);
                }
            }
            WindowShape::Sliding { eviction, trigger } => {
                let cutoff = match eviction {
                    EvictionPolicy::Time(d) => Some(now.saturating_sub(as_ms(*d))),
                    _ => None,
                };
                let every = match trigger {
                    TriggerPolicy::Time(d) => Some(as_ms(*d)),
                    _ => None,
                };
                for (pk, p) in self.store.iter_mut() {
                    if let Some(cutoff) = cutoff {
                        evict_older_than(&mut self.out, pk, p, cutoff);
                    }
                    if let Some(every) = every {
                        if now.saturating_sub(p.trigger.last_trigger_at) >= every {
                            p.trigger.last_trigger_at = now;
                            if !p.is_empty() {
                                self.out.trigger(pk, p);
                            }
                        }
                    }
                }
            }
            WindowShape::Tumbling { .. } | WindowShape::Bucket(_) => {}
        }
        self.sync_partition_count();
    }

    /// Final flush pass. Returns false if already closed.
    fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.apply_punctuation(Punctuation::FinalMarker);
        self.closed = true;
        self.sync_partition_count();
        true
    }

    fn records(&self) -> Vec<PartitionRecord<K, T>> {
        self.store
            .iter()
            .map(|(pk, p)| PartitionRecord { key: pk.key.clone(), pane: pk.pane, partition: p.clone() })
            .collect()
    }

    fn replace_all(&mut self, records: Vec<PartitionRecord<K, T>>) -> Result<()> {
        let entries = records
            .into_iter()
            .map(|r| (PaneKey { key: r.key, pane: r.pane }, r.partition))
            .collect();
        self.store.replace_all(entries)?;
        self.sync_partition_count();
        Ok(())
    }
}

/* ===================== Engine ===================== */

/// A window over a partitioned tuple stream.
///
/// `K` is the partition key (use `()` for unpartitioned windows), `T` the
/// tuple type, `S` the summary type of summarizing windows.
pub struct WindowEngine<K, T, S = ()> {
    name: String,
    policy: Arc<WindowPolicy<T>>,
    core: Arc<Mutex<Core<K, T, S>>>,
    clock: Mutex<EvictionClock>,
    counters: Arc<WindowCounters>,
}

impl<K: PartitionKey, T: Tuple> WindowEngine<K, T> {
    /// Start building a window that keeps raw tuples.
    pub fn builder(spec: PolicySpec<T>) -> WindowEngineBuilder<K, T, ()> {
        WindowEngineBuilder::new(spec, None)
    }
}

impl<K: PartitionKey, T: Tuple, S: Send + 'static> WindowEngine<K, T, S> {
    /// Start building a summarizing window fed into `sink`.
    pub fn summarizing_builder(
        spec: PolicySpec<T>,
        sink: impl SummarizationSink<K, T, Summary = S> + 'static,
    ) -> WindowEngineBuilder<K, T, S> {
        WindowEngineBuilder::new(spec, Some(Box::new(sink)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &WindowPolicy<T> {
        &self.policy
    }

    /// Spawn the eviction clock if the policy is time-driven. Calling it
    /// again while the clock runs does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::Closed`] after shutdown, or
    /// [`WindowError::ClockSpawn`] if the clock thread cannot be created.
    pub fn start(&self) -> Result<()> {
        // lock order is clock, then core; shutdown holds the clock lock until closed
        let mut clock = self.clock.lock();
        self.core.lock().ensure_open()?;
        if !self.policy.is_time_driven() {
            debug!(window = %self.name, "policy is not time-driven; no eviction clock");
            return Ok(());
        }
        let core = Arc::clone(&self.core);
        clock.start(move || core.lock().tick())
    }

    /// Insert one tuple into the partition for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::Closed`] after shutdown and
    /// [`WindowError::AllocationFailure`] if window state cannot grow.
    pub fn insert(&self, tuple: T, key: K) -> Result<()> {
        self.core.lock().insert(tuple, key)
    }

    /// Deliver a punctuation. Only window and final markers have an effect.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::Closed`] after shutdown.
    pub fn insert_punctuation(&self, punct: Punctuation) -> Result<()> {
        self.core.lock().punctuate(punct)
    }

    /// Run the time-driven checks now. This is what each clock tick does.
    pub fn tick(&self) {
        self.core.lock().tick();
    }

    /// Stop the clock and flush every remaining partition. Idempotent.
    pub fn shutdown(&self) {
        let mut clock = self.clock.lock();
        clock.stop();
        if self.core.lock().close() {
            info!(window = %self.name, "window shut down");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.core.lock().closed
    }

    /// True while the eviction clock thread is alive.
    pub fn is_clock_running(&self) -> bool {
        self.clock.lock().is_running()
    }

    /// False once a clock tick has panicked; tuple-driven paths still work.
    pub fn is_clock_healthy(&self) -> bool {
        self.clock.lock().is_healthy()
    }

    pub fn tick_interval(&self) -> Duration {
        self.clock.lock().tick_interval()
    }

    /// Largest event time seen by a bucket window.
    pub fn watermark(&self) -> Option<TimestampMs> {
        self.core.lock().watermark
    }

    pub fn partition_count(&self) -> usize {
        self.counters.partition_count()
    }

    pub fn evictions_total(&self) -> u64 {
        self.counters.evictions_total()
    }

    pub fn flushes_total(&self) -> u64 {
        self.counters.flushes_total()
    }

    pub fn counters(&self) -> CountersSnapshot {
        self.counters.snapshot()
    }

    /// Shared handle for metrics collectors.
    pub fn counters_handle(&self) -> Arc<WindowCounters> {
        Arc::clone(&self.counters)
    }

    /// Buffered tuples of the non-bucket partition for `key`, oldest first.
    pub fn contents(&self, key: &K) -> Option<Vec<T>> {
        let core = self.core.lock();
        core.store
            .get(&PaneKey::whole(key.clone()))
            .map(|p| p.tuples().cloned().collect())
    }

    /// Visit every partition in store order while holding the engine lock.
    pub fn for_each_partition(&self, mut f: impl FnMut(&K, Option<Window>, &Partition<T>)) {
        let core = self.core.lock();
        for (pk, p) in core.store.iter() {
            f(&pk.key, pk.pane, p);
        }
    }

    /// Replace the whole partition store, e.g. when restoring a checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::AllocationFailure`] if the store cannot be sized.
    pub fn replace_all(&self, records: Vec<PartitionRecord<K, T>>) -> Result<()> {
        self.core.lock().replace_all(records)
    }

    /// Stable-ordered copy of the window state.
    pub fn snapshot(&self) -> WindowSnapshot<K, T> {
        let core = self.core.lock();
        WindowSnapshot {
            window: self.name.clone(),
            watermark: core.watermark,
            partitions: core.records(),
        }
    }

    /// Repopulate the window from a snapshot before normal operation resumes.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::AllocationFailure`] if the store cannot be sized.
    pub fn restore(&self, snapshot: WindowSnapshot<K, T>) -> Result<()> {
        let mut core = self.core.lock();
        core.replace_all(snapshot.partitions)?;
        core.watermark = snapshot.watermark;
        info!(window = %self.name, partitions = core.store.len(), "window restored");
        Ok(())
    }
}

/* ===================== Builder ===================== */

pub struct WindowEngineBuilder<K, T, S> {
    spec: PolicySpec<T>,
    config: EngineConfig,
    listener: Option<Listener<K, T, S>>,
    sink: Option<Sink<K, T, S>>,
    time: Option<Arc<dyn TimeSource>>,
}

impl<K: PartitionKey, T: Tuple, S: Send + 'static> WindowEngineBuilder<K, T, S> {
    fn new(spec: PolicySpec<T>, sink: Option<Sink<K, T, S>>) -> Self {
        Self { spec, config: EngineConfig::default(), listener: None, sink, time: None }
    }

    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    #[must_use]
    pub fn tick_interval(mut self, tick: Duration) -> Self {
        self.config.tick_interval = tick;
        self
    }

    #[must_use]
    pub fn listener(mut self, listener: impl WindowListener<K, T, S> + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    #[must_use]
    pub fn time_source(mut self, time: impl TimeSource + 'static) -> Self {
        self.time = Some(Arc::new(time));
        self
    }

    /// Validate the policy and configuration and create the engine.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::InvalidPolicy`] for a malformed policy, a zero
    /// tick interval, or a summarizer/summarizing mismatch.
    pub fn build(self) -> Result<WindowEngine<K, T, S>> {
        self.config.validate()?;
        let policy = Arc::new(self.spec.validate()?);
        match (policy.summarizing, self.sink.is_some()) {
            (true, false) => return Err(WindowError::invalid("summarizing window requires a summarizer")),
            (false, true) => {
                return Err(WindowError::invalid("summarizer supplied for a window that keeps tuples"));
            }
            _ => {}
        }

        let EngineConfig { name, tick_interval } = self.config;
        let counters = Arc::new(WindowCounters::default());
        let core = Core {
            name: name.clone(),
            policy: Arc::clone(&policy),
            store: PartitionStore::new(policy.partition_eviction),
            out: Emitter {
                listener: self.listener.unwrap_or_else(|| Box::new(NoopListener)),
                sink: self.sink,
                counters: Arc::clone(&counters),
            },
            time: self.time.unwrap_or_else(|| Arc::new(SystemTimeSource)),
            watermark: None,
            closed: false,
        };
        info!(window = %name, kind = ?policy.kind(), time_driven = policy.is_time_driven(), "window engine created");

        Ok(WindowEngine {
            clock: Mutex::new(EvictionClock::new(name.clone(), tick_interval)),
            name,
            policy,
            core: Arc::new(Mutex::new(core)),
            counters,
        })
    }
}
