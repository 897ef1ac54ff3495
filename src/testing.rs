//! Testing utilities for windowflow users.
//!
//! [`RecordingListener`] captures every window callback as an owned
//! [`RecordedEvent`] so tests can assert on exactly what an engine emitted and
//! in which order. Pair it with [`ManualTimeSource`](crate::ManualTimeSource)
//! and [`WindowEngine::tick`](crate::WindowEngine::tick) to drive
//! time-based policies deterministically.
//!
//! # Quick Start
//!
//! ```
//! use windowflow::*;
//! use windowflow::testing::*;
//!
//! # fn main() -> windowflow::Result<()> {
//! let listener = RecordingListener::new();
//! let log = listener.log();
//! let engine = WindowEngine::builder(PolicySpec::tumbling(EvictionPolicy::Count(2)))
//!     .listener(listener)
//!     .build()?;
//!
//! for v in 1..=4 {
//!     engine.insert(v, ())?;
//! }
//! assert_flushed_tuples(&log, &[vec![1, 2], vec![3, 4]]);
//! assert_flushes_balanced(&log);
//! # Ok(())
//! # }
//! ```

use crate::listener::{Punctuation, WindowListener, WindowView};
use crate::partition::{Entry, PartitionEvictionReason};
use crate::window::Window;
use parking_lot::Mutex;
use std::fmt::Debug;
use std::sync::Arc;

/// One captured callback.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedEvent<K, T, S> {
    BeforeInsert { key: K, tuple: T },
    AfterInsert { key: K, tuple: T },
    BeforeFlush { key: K, pane: Option<Window>, tuples: Vec<T>, summary: Option<S> },
    AfterFlush { key: K, pane: Option<Window> },
    EmptyWindowPunct(Punctuation),
    Trigger { key: K, pane: Option<Window>, tuples: Vec<T> },
    InitialFull { key: K, tuples: Vec<T> },
    TupleEvicted { key: K, tuple: T },
    PartitionEvicted { key: K, reason: PartitionEvictionReason, tuples: Vec<T>, summary: Option<S> },
}

/// Shared, cloneable handle on the events a [`RecordingListener`] captured.
pub struct EventLog<K, T, S>(Arc<Mutex<Vec<RecordedEvent<K, T, S>>>>);

impl<K, T, S> Clone for EventLog<K, T, S> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<K: Clone, T: Clone, S: Clone> EventLog<K, T, S> {
    pub fn events(&self) -> Vec<RecordedEvent<K, T, S>> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }

    fn collect<R>(&self, f: impl FnMut(&RecordedEvent<K, T, S>) -> Option<R>) -> Vec<R> {
        self.0.lock().iter().filter_map(f).collect()
    }

    /// `(key, pane, tuples)` for every flush, in emission order.
    pub fn flushes(&self) -> Vec<(K, Option<Window>, Vec<T>)> {
        self.collect(|e| match e {
            RecordedEvent::BeforeFlush { key, pane, tuples, .. } => Some((key.clone(), *pane, tuples.clone())),
            _ => None,
        })
    }

    /// `(key, summary)` for every flush of a summarizing window.
    pub fn summaries(&self) -> Vec<(K, S)> {
        self.collect(|e| match e {
            RecordedEvent::BeforeFlush { key, summary: Some(s), .. } => Some((key.clone(), s.clone())),
            _ => None,
        })
    }

    pub fn triggers(&self) -> Vec<(K, Vec<T>)> {
        self.collect(|e| match e {
            RecordedEvent::Trigger { key, tuples, .. } => Some((key.clone(), tuples.clone())),
            _ => None,
        })
    }

    pub fn initial_full(&self) -> Vec<(K, Vec<T>)> {
        self.collect(|e| match e {
            RecordedEvent::InitialFull { key, tuples } => Some((key.clone(), tuples.clone())),
            _ => None,
        })
    }

    pub fn evicted_tuples(&self) -> Vec<(K, T)> {
        self.collect(|e| match e {
            RecordedEvent::TupleEvicted { key, tuple } => Some((key.clone(), tuple.clone())),
            _ => None,
        })
    }

    pub fn evicted_partitions(&self) -> Vec<(K, PartitionEvictionReason)> {
        self.collect(|e| match e {
            RecordedEvent::PartitionEvicted { key, reason, .. } => Some((key.clone(), *reason)),
            _ => None,
        })
    }

    pub fn empty_puncts(&self) -> Vec<Punctuation> {
        self.collect(|e| match e {
            RecordedEvent::EmptyWindowPunct(p) => Some(*p),
            _ => None,
        })
    }
}

/// Listener that records every callback into an [`EventLog`].
pub struct RecordingListener<K, T, S = ()> {
    log: EventLog<K, T, S>,
}

impl<K, T, S> RecordingListener<K, T, S> {
    #[must_use]
    pub fn new() -> Self {
        Self { log: EventLog(Arc::new(Mutex::new(Vec::new()))) }
    }

    /// Handle that stays readable after the listener moves into an engine.
    pub fn log(&self) -> EventLog<K, T, S> {
        self.log.clone()
    }

    fn push(&self, event: RecordedEvent<K, T, S>) {
        self.log.0.lock().push(event);
    }
}

impl<K, T, S> Default for RecordingListener<K, T, S> {
    fn default() -> Self {
        Self::new()
    }
}

fn owned<T: Clone, S: Clone>(window: &WindowView<'_, T, S>) -> (Vec<T>, Option<S>) {
    (window.iter().cloned().collect(), window.summary().cloned())
}

impl<K, T, S> WindowListener<K, T, S> for RecordingListener<K, T, S>
where
    K: Clone + Send,
    T: Clone + Send,
    S: Clone + Send,
{
    fn before_insert(&mut self, key: &K, tuple: &T) {
        self.push(RecordedEvent::BeforeInsert { key: key.clone(), tuple: tuple.clone() });
    }

    fn after_insert(&mut self, key: &K, tuple: &T) {
        self.push(RecordedEvent::AfterInsert { key: key.clone(), tuple: tuple.clone() });
    }

    fn before_flush(&mut self, key: &K, window: &WindowView<'_, T, S>) {
        let (tuples, summary) = owned(window);
        self.push(RecordedEvent::BeforeFlush { key: key.clone(), pane: window.pane(), tuples, summary });
    }

    fn after_flush(&mut self, key: &K, pane: Option<Window>) {
        self.push(RecordedEvent::AfterFlush { key: key.clone(), pane });
    }

    fn on_empty_window_punct(&mut self, punct: Punctuation) {
        self.push(RecordedEvent::EmptyWindowPunct(punct));
    }

    fn on_trigger(&mut self, key: &K, window: &WindowView<'_, T, S>) {
        let tuples = window.iter().cloned().collect();
        self.push(RecordedEvent::Trigger { key: key.clone(), pane: window.pane(), tuples });
    }

    fn on_initial_full(&mut self, key: &K, window: &WindowView<'_, T, S>) {
        let tuples = window.iter().cloned().collect();
        self.push(RecordedEvent::InitialFull { key: key.clone(), tuples });
    }

    fn on_tuple_evicted(&mut self, key: &K, evicted: &Entry<T>) {
        self.push(RecordedEvent::TupleEvicted { key: key.clone(), tuple: evicted.tuple.clone() });
    }

    fn on_partition_evicted(&mut self, key: &K, reason: PartitionEvictionReason, window: &WindowView<'_, T, S>) {
        let (tuples, summary) = owned(window);
        self.push(RecordedEvent::PartitionEvicted { key: key.clone(), reason, tuples, summary });
    }
}

/// Assert the tuple lists of all flushes, in order, ignoring keys.
///
/// # Panics
///
/// Panics if the flushed tuples differ from `expected`.
pub fn assert_flushed_tuples<K, T, S>(log: &EventLog<K, T, S>, expected: &[Vec<T>])
where
    K: Clone,
    T: Clone + Debug + PartialEq,
    S: Clone,
{
    let actual: Vec<Vec<T>> = log.flushes().into_iter().map(|(_, _, t)| t).collect();
    assert_eq!(
        actual.len(),
        expected.len(),
        "Flush count mismatch:\n  Expected flushes: {}\n  Actual flushes: {}\n  Expected: {expected:?}\n  Actual: {actual:?}",
        expected.len(),
        actual.len()
    );
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert_eq!(a, e, "Flush {i} mismatch:\n  Expected: {e:?}\n  Actual: {a:?}\n  All flushes: {actual:?}");
    }
}

/// Assert every `before_flush` is immediately followed by the matching
/// `after_flush`.
///
/// # Panics
///
/// Panics on an unpaired or interleaved flush event.
pub fn assert_flushes_balanced<K, T, S>(log: &EventLog<K, T, S>)
where
    K: Clone + Debug + PartialEq,
    T: Clone + Debug,
    S: Clone + Debug,
{
    let events = log.events();
    for (i, e) in events.iter().enumerate() {
        match e {
            RecordedEvent::BeforeFlush { key, pane, .. } => match events.get(i + 1) {
                Some(RecordedEvent::AfterFlush { key: k, pane: p }) if k == key && p == pane => {}
                other => panic!("before_flush at {i} for {key:?} not followed by its after_flush, got {other:?}"),
            },
            RecordedEvent::AfterFlush { key, .. } => {
                assert!(
                    matches!(events.get(i.wrapping_sub(1)), Some(RecordedEvent::BeforeFlush { .. })),
                    "after_flush at {i} for {key:?} without a preceding before_flush"
                );
            }
            _ => {}
        }
    }
}
