use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Milliseconds since UNIX epoch (UTC).
pub type TimestampMs = i64;

/// A closed-open time range: [start, end).
///
/// Used as the pane identifier of bucket (event-time interval) windows.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, Eq)]
pub struct Window {
    pub start: TimestampMs,
    pub end: TimestampMs,
}

impl Window {
    #[inline]
    pub fn new(start: TimestampMs, end: TimestampMs) -> Self {
        debug_assert!(end >= start);
        Self { start, end }
    }

    /// Every interval of length `size_ms` starting at `offset_ms + k * period_ms`
    /// that contains `ts`, earliest first. Interval bounds saturate at the
    /// ends of the timestamp range.
    pub fn containing(
        ts: TimestampMs,
        size_ms: i64,
        period_ms: i64,
        offset_ms: i64,
    ) -> impl Iterator<Item = Window> {
        debug_assert!(size_ms > 0 && period_ms > 0);
        let rel = ts.saturating_sub(offset_ms);
        // start <= ts  <=>  k <= floor(rel / period)
        // ts < start + size  <=>  k > floor((rel - size) / period)
        let last = div_floor(rel, period_ms);
        let first = div_floor(rel.saturating_sub(size_ms), period_ms) + 1;
        (first..=last).map(move |k| {
            let start = k.saturating_mul(period_ms).saturating_add(offset_ms);
            Window { start, end: start.saturating_add(size_ms) }
        })
    }

    #[inline]
    pub fn contains(&self, ts: TimestampMs) -> bool {
        self.start <= ts && ts < self.end
    }
}

/// Floor division for i64 (unlike `/` which truncates toward zero).
#[inline]
fn div_floor(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if (r != 0) && ((r > 0) != (b > 0)) { q - 1 } else { q }
}

// Hash/Ord so Windows can be used as keys and sorted deterministically.
impl PartialEq for Window {
    #[inline] fn eq(&self, other: &Self) -> bool { self.start == other.start && self.end == other.end }
}
impl Hash for Window {
    #[inline] fn hash<H: Hasher>(&self, state: &mut H) { self.start.hash(state); self.end.hash(state); }
}
impl Ord for Window {
    #[inline] fn cmp(&self, o: &Self) -> std::cmp::Ordering {
        self.start.cmp(&o.start).then(self.end.cmp(&o.end))
    }
}
impl PartialOrd for Window {
    #[inline] fn partial_cmp(&self, o: &Self) -> Option<std::cmp::Ordering> { Some(self.cmp(o)) }
}
