//! Callbacks an operator registers to observe window activity.
//!
//! All callbacks run on the thread that drove the engine (the inserting
//! thread, or the eviction clock thread for time-driven work) while the
//! engine lock is held. They must not call back into the same engine.

use crate::partition::{Entry, Partition, PartitionEvictionReason};
use crate::window::Window;
use serde::{Deserialize, Serialize};

/// Out-of-band markers delivered alongside tuples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Punctuation {
    /// Closes the current window.
    WindowMarker,
    /// No more tuples will arrive on this port.
    FinalMarker,
    /// Any other marker; windows ignore these.
    Other(u32),
}

/// What a flushed or triggered window held.
#[derive(Debug)]
pub enum WindowContents<'a, T, S> {
    Tuples(&'a Partition<T>),
    Summary(S),
}

/// Read-only view of one partition handed to flush and trigger callbacks.
#[derive(Debug)]
pub struct WindowView<'a, T, S> {
    pane: Option<Window>,
    contents: WindowContents<'a, T, S>,
}

impl<'a, T, S> WindowView<'a, T, S> {
    pub(crate) fn tuples(pane: Option<Window>, partition: &'a Partition<T>) -> Self {
        Self { pane, contents: WindowContents::Tuples(partition) }
    }

    pub(crate) fn summarized(pane: Option<Window>, summary: S) -> Self {
        Self { pane, contents: WindowContents::Summary(summary) }
    }

    /// The event-time interval, for bucket windows.
    pub fn pane(&self) -> Option<Window> {
        self.pane
    }

    pub fn contents(&self) -> &WindowContents<'a, T, S> {
        &self.contents
    }

    /// Buffered tuples, oldest first. Empty for summarized windows.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries().map(|e| &e.tuple)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry<T>> {
        match &self.contents {
            WindowContents::Tuples(p) => Some(p.entries()),
            WindowContents::Summary(_) => None,
        }
        .into_iter()
        .flatten()
    }

    pub fn len(&self) -> usize {
        match &self.contents {
            WindowContents::Tuples(p) => usize::try_from(p.tuple_count()).unwrap_or(usize::MAX),
            WindowContents::Summary(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self) -> Option<&S> {
        match &self.contents {
            WindowContents::Summary(s) => Some(s),
            WindowContents::Tuples(_) => None,
        }
    }
}

/// Window event callbacks. Every method has a no-op default.
///
/// `K` is the partition key, `T` the tuple type and `S` the summary type
/// produced by the window's summarizer (unit for raw windows).
pub trait WindowListener<K, T, S = ()>: Send {
    fn before_insert(&mut self, _key: &K, _tuple: &T) {}

    fn after_insert(&mut self, _key: &K, _tuple: &T) {}

    /// The window for `key` is about to be emptied.
    fn before_flush(&mut self, _key: &K, _window: &WindowView<'_, T, S>) {}

    /// The window for `key` has been emptied.
    fn after_flush(&mut self, _key: &K, _pane: Option<Window>) {}

    /// A window punctuation arrived while no partition existed.
    fn on_empty_window_punct(&mut self, _punct: Punctuation) {}

    /// A sliding-window trigger fired; contents are kept.
    fn on_trigger(&mut self, _key: &K, _window: &WindowView<'_, T, S>) {}

    /// A count-evicted sliding window reached its size for the first time.
    fn on_initial_full(&mut self, _key: &K, _window: &WindowView<'_, T, S>) {}

    /// A single tuple was removed by the eviction policy.
    fn on_tuple_evicted(&mut self, _key: &K, _evicted: &Entry<T>) {}

    /// A whole partition was removed by the partition-eviction policy.
    fn on_partition_evicted(&mut self, _key: &K, _reason: PartitionEvictionReason, _window: &WindowView<'_, T, S>) {}
}

/// Listener that ignores every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopListener;

impl<K, T, S> WindowListener<K, T, S> for NoopListener {}
