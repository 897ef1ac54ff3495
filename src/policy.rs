//! Window policy descriptors.
//!
//! A [`PolicySpec`] is the raw description a compiler produces for a window
//! clause: its kind, eviction and trigger policies, partition bounds and
//! whether it summarizes. [`PolicySpec::validate`] turns it into a
//! [`WindowPolicy`], a closed form in which invalid combinations (a trigger
//! on a tumbling window, a zero count bound, ...) cannot be expressed. The
//! engine only ever works with the validated form.
//!
//! # Example
//!
//! ```
//! use windowflow::policy::{EvictionPolicy, PartitionEviction, PolicySpec, TriggerPolicy};
//! use std::time::Duration;
//!
//! // sliding window: keep the last 10 tuples, fire every 2 inserts
//! let spec: PolicySpec<u32> = PolicySpec::sliding(EvictionPolicy::Count(10), TriggerPolicy::Count(2))
//!     .partitioned()
//!     .with_partition_eviction(PartitionEviction::PartitionAge(Duration::from_secs(60)));
//! let policy = spec.validate().unwrap();
//! assert!(policy.is_time_driven());
//! ```

use crate::error::{Result, WindowError};
use crate::window::TimestampMs;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Opaque numeric attribute extractor used by delta policies.
///
/// The engine never looks inside the closure; it only compares the values it
/// returns.
pub struct Selector<T>(Arc<dyn Fn(&T) -> f64 + Send + Sync>);

impl<T> Selector<T> {
    pub fn new(f: impl Fn(&T) -> f64 + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    #[inline]
    pub fn select(&self, tuple: &T) -> f64 {
        (self.0)(tuple)
    }
}

impl<T> Clone for Selector<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for Selector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Selector(..)")
    }
}

/// Event-time extractor used by bucket windows.
pub struct EventTime<T>(Arc<dyn Fn(&T) -> TimestampMs + Send + Sync>);

impl<T> EventTime<T> {
    pub fn new(f: impl Fn(&T) -> TimestampMs + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    #[inline]
    pub fn of(&self, tuple: &T) -> TimestampMs {
        (self.0)(tuple)
    }
}

impl<T> Clone for EventTime<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for EventTime<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventTime(..)")
    }
}

/// Shape of the window as declared in the source clause.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowKind {
    Tumbling,
    Sliding,
    Bucket,
}

/// Rule governing removal of individual tuples from a partition.
#[derive(Clone, Debug)]
pub enum EvictionPolicy<T> {
    /// Keep at most `n` tuples (sliding) / close after `n` tuples (tumbling).
    Count(u64),
    /// Keep tuples younger than the duration (sliding) / close the partition
    /// once it is that old (tumbling).
    Time(Duration),
    /// Keep tuples whose selected attribute is within `threshold` of the newest.
    Delta { selector: Selector<T>, threshold: f64 },
    /// Close on window punctuation.
    Punctuation,
}

/// Rule deciding when a sliding window reports its contents.
#[derive(Clone, Debug)]
pub enum TriggerPolicy<T> {
    Count(u64),
    Time(Duration),
    Delta { selector: Selector<T>, threshold: f64 },
    Punctuation,
}

/// Rule bounding the number or age of live partitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartitionEviction {
    /// Evict partitions idle for longer than the duration.
    PartitionAge(Duration),
    /// Keep at most `n` partitions, evicting the least recently active.
    PartitionCount(usize),
    /// Keep at most `n` tuples across all partitions, evicting the smallest
    /// partitions first.
    TupleCount(u64),
}

/// Event-time interval refinement for [`WindowKind::Bucket`].
#[derive(Clone, Debug)]
pub struct BucketSpec<T> {
    pub event_time: EventTime<T>,
    pub interval_duration: Duration,
    /// Distance between the starts of consecutive intervals; unset or zero
    /// means `interval_duration` (non-overlapping intervals).
    pub creation_period: Option<Duration>,
    /// How long after an interval closes late tuples are still accepted.
    pub discard_age: Option<Duration>,
    pub interval_offset: Option<Duration>,
}

impl<T> BucketSpec<T> {
    pub fn new(event_time: EventTime<T>, interval_duration: Duration) -> Self {
        Self {
            event_time,
            interval_duration,
            creation_period: None,
            discard_age: None,
            interval_offset: None,
        }
    }

    #[must_use]
    pub fn with_creation_period(mut self, period: Duration) -> Self {
        self.creation_period = Some(period);
        self
    }

    #[must_use]
    pub fn with_discard_age(mut self, age: Duration) -> Self {
        self.discard_age = Some(age);
        self
    }

    #[must_use]
    pub fn with_offset(mut self, offset: Duration) -> Self {
        self.interval_offset = Some(offset);
        self
    }

    pub fn duration_ms(&self) -> i64 {
        as_ms(self.interval_duration)
    }

    pub fn period_ms(&self) -> i64 {
        match self.creation_period {
            Some(p) if !p.is_zero() => as_ms(p),
            _ => self.duration_ms(),
        }
    }

    pub fn discard_age_ms(&self) -> i64 {
        self.discard_age.map_or(0, as_ms)
    }

    pub fn offset_ms(&self) -> i64 {
        self.interval_offset.map_or(0, as_ms)
    }
}

/// Raw, unvalidated window description.
#[derive(Clone, Debug)]
pub struct PolicySpec<T> {
    pub kind: WindowKind,
    pub eviction: Option<EvictionPolicy<T>>,
    pub trigger: Option<TriggerPolicy<T>>,
    pub bucket: Option<BucketSpec<T>>,
    pub partitioned: bool,
    pub partition_eviction: Option<PartitionEviction>,
    pub summarizing: bool,
}

impl<T> PolicySpec<T> {
    pub fn tumbling(eviction: EvictionPolicy<T>) -> Self {
        Self::raw(WindowKind::Tumbling, Some(eviction), None, None)
    }

    pub fn sliding(eviction: EvictionPolicy<T>, trigger: TriggerPolicy<T>) -> Self {
        Self::raw(WindowKind::Sliding, Some(eviction), Some(trigger), None)
    }

    pub fn bucket(bucket: BucketSpec<T>) -> Self {
        Self::raw(WindowKind::Bucket, None, None, Some(bucket))
    }

    fn raw(
        kind: WindowKind,
        eviction: Option<EvictionPolicy<T>>,
        trigger: Option<TriggerPolicy<T>>,
        bucket: Option<BucketSpec<T>>,
    ) -> Self {
        Self {
            kind,
            eviction,
            trigger,
            bucket,
            partitioned: false,
            partition_eviction: None,
            summarizing: false,
        }
    }

    #[must_use]
    pub fn partitioned(mut self) -> Self {
        self.partitioned = true;
        self
    }

    /// Bound live partitions. Implies `partitioned`.
    #[must_use]
    pub fn with_partition_eviction(mut self, pe: PartitionEviction) -> Self {
        self.partitioned = true;
        self.partition_eviction = Some(pe);
        self
    }

    #[must_use]
    pub fn summarizing(mut self) -> Self {
        self.summarizing = true;
        self
    }

    /// Check the descriptor and convert it to its closed form.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::InvalidPolicy`] describing the first violated rule.
    pub fn validate(self) -> Result<WindowPolicy<T>> {
        if self.trigger.is_some() && self.kind != WindowKind::Sliding {
            return Err(WindowError::invalid(format!(
                "trigger policy is only valid on sliding windows, not {:?}",
                self.kind
            )));
        }
        if self.partition_eviction.is_some() && !self.partitioned {
            return Err(WindowError::invalid(
                "partition eviction requires a partitioned window",
            ));
        }
        if self.summarizing && self.kind != WindowKind::Tumbling {
            return Err(WindowError::invalid(
                "summarization is only supported on tumbling windows",
            ));
        }
        if let Some(pe) = &self.partition_eviction {
            check_partition_eviction(pe)?;
        }

        let shape = match self.kind {
            WindowKind::Tumbling => {
                if self.bucket.is_some() {
                    return Err(WindowError::invalid("bucket refinement on a tumbling window"));
                }
                let eviction = self
                    .eviction
                    .ok_or_else(|| WindowError::invalid("tumbling window requires an eviction policy"))?;
                check_eviction(&eviction)?;
                WindowShape::Tumbling { eviction }
            }
            WindowKind::Sliding => {
                if self.bucket.is_some() {
                    return Err(WindowError::invalid("bucket refinement on a sliding window"));
                }
                let eviction = self
                    .eviction
                    .ok_or_else(|| WindowError::invalid("sliding window requires an eviction policy"))?;
                let trigger = self
                    .trigger
                    .ok_or_else(|| WindowError::invalid("sliding window requires a trigger policy"))?;
                check_eviction(&eviction)?;
                check_trigger(&trigger)?;
                if matches!(eviction, EvictionPolicy::Punctuation)
                    && matches!(trigger, TriggerPolicy::Punctuation)
                {
                    return Err(WindowError::invalid(
                        "punctuation trigger combined with punctuation eviction is ambiguous",
                    ));
                }
                WindowShape::Sliding { eviction, trigger }
            }
            WindowKind::Bucket => {
                if self.eviction.is_some() {
                    return Err(WindowError::invalid(
                        "bucket windows are closed by event time, not an eviction policy",
                    ));
                }
                let bucket = self
                    .bucket
                    .ok_or_else(|| WindowError::invalid("bucket window requires interval settings"))?;
                if bucket.interval_duration.is_zero() {
                    return Err(WindowError::invalid("bucket interval duration must be > 0"));
                }
                WindowShape::Bucket(bucket)
            }
        };

        Ok(WindowPolicy {
            shape,
            partition_eviction: self.partition_eviction,
            summarizing: self.summarizing,
        })
    }
}

fn check_eviction<T>(e: &EvictionPolicy<T>) -> Result<()> {
    match e {
        EvictionPolicy::Count(0) => Err(WindowError::invalid("count eviction must be > 0")),
        EvictionPolicy::Time(d) if d.is_zero() => {
            Err(WindowError::invalid("time eviction must be > 0"))
        }
        EvictionPolicy::Delta { threshold, .. } => check_threshold(*threshold),
        _ => Ok(()),
    }
}

fn check_trigger<T>(t: &TriggerPolicy<T>) -> Result<()> {
    match t {
        TriggerPolicy::Count(0) => Err(WindowError::invalid("count trigger must be > 0")),
        TriggerPolicy::Time(d) if d.is_zero() => {
            Err(WindowError::invalid("time trigger must be > 0"))
        }
        TriggerPolicy::Delta { threshold, .. } => check_threshold(*threshold),
        _ => Ok(()),
    }
}

fn check_partition_eviction(pe: &PartitionEviction) -> Result<()> {
    match pe {
        PartitionEviction::PartitionAge(d) if d.is_zero() => {
            Err(WindowError::invalid("partition age bound must be > 0"))
        }
        PartitionEviction::PartitionCount(0) => {
            Err(WindowError::invalid("partition count bound must be > 0"))
        }
        PartitionEviction::TupleCount(0) => {
            Err(WindowError::invalid("tuple count bound must be > 0"))
        }
        _ => Ok(()),
    }
}

fn check_threshold(threshold: f64) -> Result<()> {
    if threshold.is_finite() && threshold >= 0.0 {
        Ok(())
    } else {
        Err(WindowError::invalid(format!(
            "delta threshold must be finite and non-negative, got {threshold}"
        )))
    }
}

/// Validated window shape. Every decision point in the engine matches on this.
#[derive(Clone, Debug)]
pub enum WindowShape<T> {
    Tumbling { eviction: EvictionPolicy<T> },
    Sliding { eviction: EvictionPolicy<T>, trigger: TriggerPolicy<T> },
    Bucket(BucketSpec<T>),
}

/// A validated policy, shared immutably by the engine.
#[derive(Clone, Debug)]
pub struct WindowPolicy<T> {
    pub shape: WindowShape<T>,
    pub partition_eviction: Option<PartitionEviction>,
    pub summarizing: bool,
}

impl<T> WindowPolicy<T> {
    pub fn kind(&self) -> WindowKind {
        match self.shape {
            WindowShape::Tumbling { .. } => WindowKind::Tumbling,
            WindowShape::Sliding { .. } => WindowKind::Sliding,
            WindowShape::Bucket(_) => WindowKind::Bucket,
        }
    }

    /// True when some part of the policy needs periodic wall-clock checks.
    pub fn is_time_driven(&self) -> bool {
        let shape_timed = match &self.shape {
            WindowShape::Tumbling { eviction } => matches!(eviction, EvictionPolicy::Time(_)),
            WindowShape::Sliding { eviction, trigger } => {
                matches!(eviction, EvictionPolicy::Time(_)) || matches!(trigger, TriggerPolicy::Time(_))
            }
            WindowShape::Bucket(_) => false,
        };
        shape_timed || matches!(self.partition_eviction, Some(PartitionEviction::PartitionAge(_)))
    }

    /// True when a window marker fires triggers instead of flushing.
    pub(crate) fn marker_triggers(&self) -> bool {
        matches!(
            self.shape,
            WindowShape::Sliding { trigger: TriggerPolicy::Punctuation, .. }
        )
    }
}

#[allow(clippy::cast_possible_truncation)]
pub(crate) fn as_ms(d: Duration) -> i64 {
    d.as_millis().min(i64::MAX as u128) as i64
}
