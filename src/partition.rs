//! Per-key window state and the store that owns it.
//!
//! [`PartitionStore`] maps a key to its [`Partition`] in insertion order and
//! enforces the policy's [`PartitionEviction`] bound whenever a partition is
//! looked up for an insert. Partitions are owned by value inside the store;
//! callers only ever see borrows scoped to a single engine call, or the owned
//! value once it has been removed.

use crate::error::{Result, WindowError};
use crate::policy::{PartitionEviction, as_ms};
use crate::window::{TimestampMs, Window};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::hash::Hash;
use tracing::trace;

/// A buffered tuple and the processing time it arrived at.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry<T> {
    pub tuple: T,
    pub arrived_at: TimestampMs,
}

/// Store key: the partition key plus, for bucket windows, the interval.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaneKey<K> {
    pub key: K,
    pub pane: Option<Window>,
}

impl<K> PaneKey<K> {
    pub fn whole(key: K) -> Self {
        Self { key, pane: None }
    }

    pub fn interval(key: K, pane: Window) -> Self {
        Self { key, pane: Some(pane) }
    }
}

/// Partition contents: raw tuples, or nothing when an external summarizer
/// keeps the running aggregate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Buffer<T> {
    Tuples(VecDeque<Entry<T>>),
    Summarized,
}

/// Bookkeeping for sliding-window triggers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TriggerState {
    pub since_trigger: u64,
    pub last_trigger_at: TimestampMs,
    /// Attribute value the next delta trigger is measured against.
    pub reference: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Partition<T> {
    buffer: Buffer<T>,
    tuple_count: u64,
    created_at: TimestampMs,
    last_activity: TimestampMs,
    pub(crate) trigger: TriggerState,
    pub(crate) initial_full: bool,
}

impl<T> Partition<T> {
    pub fn new(now: TimestampMs, summarized: bool) -> Self {
        let buffer = if summarized { Buffer::Summarized } else { Buffer::Tuples(VecDeque::new()) };
        Self {
            buffer,
            tuple_count: 0,
            created_at: now,
            last_activity: now,
            trigger: TriggerState { last_trigger_at: now, ..TriggerState::default() },
            initial_full: false,
        }
    }

    /// Tuples currently attributed to this partition.
    pub fn tuple_count(&self) -> u64 {
        self.tuple_count
    }

    pub fn is_empty(&self) -> bool {
        self.tuple_count == 0
    }

    pub fn created_at(&self) -> TimestampMs {
        self.created_at
    }

    pub fn last_activity(&self) -> TimestampMs {
        self.last_activity
    }

    pub fn is_summarized(&self) -> bool {
        matches!(self.buffer, Buffer::Summarized)
    }

    pub fn buffer(&self) -> &Buffer<T> {
        &self.buffer
    }

    /// Buffered entries, oldest first. Empty for summarized partitions.
    pub fn entries(&self) -> impl Iterator<Item = &Entry<T>> {
        match &self.buffer {
            Buffer::Tuples(q) => Some(q.iter()),
            Buffer::Summarized => None,
        }
        .into_iter()
        .flatten()
    }

    pub fn tuples(&self) -> impl Iterator<Item = &T> {
        self.entries().map(|e| &e.tuple)
    }

    pub fn front(&self) -> Option<&Entry<T>> {
        match &self.buffer {
            Buffer::Tuples(q) => q.front(),
            Buffer::Summarized => None,
        }
    }

    pub fn back(&self) -> Option<&Entry<T>> {
        match &self.buffer {
            Buffer::Tuples(q) => q.back(),
            Buffer::Summarized => None,
        }
    }

    pub(crate) fn touch(&mut self, now: TimestampMs) {
        self.last_activity = self.last_activity.max(now);
    }

    /// Append a tuple, or just count it when summarized.
    pub(crate) fn push(&mut self, entry: Entry<T>) -> Result<()> {
        if let Buffer::Tuples(q) = &mut self.buffer {
            q.try_reserve(1).map_err(|e| WindowError::alloc("partition buffer", e))?;
            q.push_back(entry);
        }
        self.tuple_count += 1;
        Ok(())
    }

    pub(crate) fn pop_front(&mut self) -> Option<Entry<T>> {
        let Buffer::Tuples(q) = &mut self.buffer else {
            return None;
        };
        let popped = q.pop_front();
        if popped.is_some() {
            self.tuple_count -= 1;
        }
        popped
    }

    pub(crate) fn clear(&mut self) {
        if let Buffer::Tuples(q) = &mut self.buffer {
            q.clear();
        }
        self.tuple_count = 0;
    }
}

/// Why a whole partition was removed by the partition-eviction policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartitionEvictionReason {
    Idle,
    TooManyPartitions,
    TooManyTuples,
}

/// A partition removed by the partition-eviction policy.
#[derive(Debug)]
pub struct EvictedPartition<K, T> {
    pub key: K,
    pub partition: Partition<T>,
    pub reason: PartitionEvictionReason,
}

/// Result of [`PartitionStore::partition_for`].
pub struct Slot<'a, K, T> {
    pub partition: &'a mut Partition<T>,
    /// Partitions evicted to make room, in eviction order.
    pub evicted: Vec<EvictedPartition<K, T>>,
    pub created: bool,
}

/// Insertion-ordered mapping from key to partition.
#[derive(Debug)]
pub struct PartitionStore<K, T> {
    map: IndexMap<K, Partition<T>>,
    bound: Option<PartitionEviction>,
}

impl<K: Hash + Eq + Clone, T> PartitionStore<K, T> {
    pub fn new(bound: Option<PartitionEviction>) -> Self {
        Self { map: IndexMap::new(), bound }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&Partition<T>> {
        self.map.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut Partition<T>> {
        self.map.get_mut(key)
    }

    pub fn total_tuples(&self) -> u64 {
        self.map.values().map(Partition::tuple_count).sum()
    }

    /// Return the partition for `key`, creating it if needed, after applying
    /// the partition-eviction bound. `last_activity` is refreshed.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::AllocationFailure`] if the map cannot grow.
    pub fn partition_for(&mut self, key: &K, now: TimestampMs, summarized: bool) -> Result<Slot<'_, K, T>> {
        let evicted = self.make_room(key, now);
        let exists = self.map.contains_key(key);

        if !exists {
            self.map.try_reserve(1).map_err(|e| WindowError::alloc("partition map", e))?;
        }
        let entry = self.map.entry(key.clone());
        let created = !exists;
        let partition = entry.or_insert_with(|| Partition::new(now, summarized));
        partition.touch(now);
        Ok(Slot { partition, evicted, created })
    }

    fn make_room(&mut self, key: &K, now: TimestampMs) -> Vec<EvictedPartition<K, T>> {
        let mut evicted = Vec::new();
        match self.bound {
            None => {}
            // a stale receiving partition goes too; the tuple starts a fresh one
            Some(PartitionEviction::PartitionAge(max_age)) => {
                evicted.extend(self.evict_idle(now.saturating_sub(as_ms(max_age))));
            }
            Some(PartitionEviction::PartitionCount(max)) => {
                if !self.map.contains_key(key) {
                    while self.map.len() >= max {
                        let Some(gone) = self
                            .least_recently_active(key)
                            .and_then(|victim| self.evict(&victim, PartitionEvictionReason::TooManyPartitions))
                        else {
                            break;
                        };
                        evicted.push(gone);
                    }
                }
            }
            Some(PartitionEviction::TupleCount(max)) => {
                let mut total = self.total_tuples();
                while total + 1 > max {
                    let Some(gone) = self
                        .smallest(key)
                        .and_then(|victim| self.evict(&victim, PartitionEvictionReason::TooManyTuples))
                    else {
                        break;
                    };
                    total -= gone.partition.tuple_count();
                    evicted.push(gone);
                }
            }
        }
        evicted
    }

    /// Evict every partition idle since before `cutoff`, in store order.
    pub fn evict_idle(&mut self, cutoff: TimestampMs) -> Vec<EvictedPartition<K, T>> {
        let stale = self.keys_where(|_, p| p.last_activity < cutoff);
        stale
            .iter()
            .filter_map(|k| self.evict(k, PartitionEvictionReason::Idle))
            .collect()
    }

    fn least_recently_active(&self, keep: &K) -> Option<K> {
        self.map
            .iter()
            .filter(|(k, _)| *k != keep)
            .min_by_key(|(_, p)| (p.last_activity, p.created_at))
            .map(|(k, _)| k.clone())
    }

    fn smallest(&self, keep: &K) -> Option<K> {
        self.map
            .iter()
            .filter(|(k, _)| *k != keep)
            .min_by_key(|(_, p)| (p.tuple_count, p.created_at))
            .map(|(k, _)| k.clone())
    }

    fn evict(&mut self, key: &K, reason: PartitionEvictionReason) -> Option<EvictedPartition<K, T>> {
        let partition = self.map.shift_remove(key)?;
        trace!(?reason, tuples = partition.tuple_count, "evicting partition");
        Some(EvictedPartition { key: key.clone(), partition, reason })
    }

    /// Remove a partition outright.
    pub fn remove(&mut self, key: &K) -> Option<Partition<T>> {
        self.map.shift_remove(key)
    }

    /// Remove and return the oldest-inserted partition.
    pub fn pop_front(&mut self) -> Option<(K, Partition<T>)> {
        self.map.shift_remove_index(0)
    }

    /// Visit every key in insertion order.
    pub fn for_each_key(&self, mut f: impl FnMut(&K)) {
        self.map.keys().for_each(|k| f(k));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &Partition<T>)> {
        self.map.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut Partition<T>)> {
        self.map.iter_mut()
    }

    /// Keys (in store order) whose partition matches `pred`.
    pub fn keys_where(&self, mut pred: impl FnMut(&K, &Partition<T>) -> bool) -> Vec<K> {
        self.map
            .iter()
            .filter(|(k, p)| pred(k, p))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Replace the whole store, keeping the given order.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::AllocationFailure`] if the map cannot be sized.
    pub fn replace_all(&mut self, partitions: Vec<(K, Partition<T>)>) -> Result<()> {
        let mut map = IndexMap::new();
        map.try_reserve(partitions.len()).map_err(|e| WindowError::alloc("partition map", e))?;
        map.extend(partitions);
        self.map = map;
        Ok(())
    }
}
