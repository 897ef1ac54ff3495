//! Incremental summaries for non-materializing windows.
//!
//! A summarizing window keeps no tuples. Each insert is folded into a running
//! aggregate held by a [`SummarizationSink`]; at flush time the engine takes a
//! [`snapshot`](SummarizationSink::snapshot), hands it to `before_flush`, and
//! [`reset`](SummarizationSink::reset)s the key. The engine never looks inside
//! the summary.
//!
//! [`AggregateSink`] adapts any [`Aggregate`] (the built-ins below or your own)
//! into a sink by extracting a value from every tuple.
//!
//! ```
//! use windowflow::summarize::{AggregateSink, SummarizationSink, Sum};
//!
//! let mut sink = AggregateSink::new(|t: &(String, i64)| t.1, Sum::<i64>::new());
//! let key = "k".to_string();
//! sink.accumulate(&key, &("k".into(), 2));
//! sink.accumulate(&key, &("k".into(), 5));
//! assert_eq!(sink.snapshot(&key), 7);
//! sink.reset(&key);
//! assert_eq!(sink.snapshot(&key), 0);
//! ```

use indexmap::IndexMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::hash::Hash;
use std::marker::PhantomData;
use std::mem::take;
use std::ops::Add;

/// Capability interface for per-key running summaries.
pub trait SummarizationSink<K, T>: Send {
    type Summary;

    /// Fold one tuple into the summary for `key`.
    fn accumulate(&mut self, key: &K, tuple: &T);

    /// Current summary for `key` (the empty summary if nothing was folded in).
    fn snapshot(&self, key: &K) -> Self::Summary;

    /// Forget everything accumulated for `key`.
    fn reset(&mut self, key: &K);
}

/// An incremental aggregation over values of type `V`.
pub trait Aggregate<V>: Send + Sync + 'static {
    type Acc: Send;
    type Output;

    fn create(&self) -> Self::Acc;
    fn add(&self, acc: &mut Self::Acc, v: V);
    fn output(&self, acc: &Self::Acc) -> Self::Output;
}

/* ===================== Count ===================== */

#[derive(Clone, Copy, Debug, Default)]
pub struct Count;

impl<V> Aggregate<V> for Count {
    type Acc = u64;
    type Output = u64;

    fn create(&self) -> u64 { 0 }
    fn add(&self, acc: &mut u64, _v: V) { *acc += 1; }
    fn output(&self, acc: &u64) -> u64 { *acc }
}

/* ===================== Sum<V> ===================== */

/// Sum of values. Requires `V: Add<Output=V> + Default`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sum<V>(pub PhantomData<V>);

impl<V> Sum<V> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<V> Aggregate<V> for Sum<V>
where
    V: Add<Output = V> + Default + Clone + Send + Sync + 'static,
{
    type Acc = V;
    type Output = V;

    fn create(&self) -> V {
        V::default()
    }

    fn add(&self, acc: &mut V, v: V) {
        *acc = take(acc) + v;
    }

    fn output(&self, acc: &V) -> V {
        acc.clone()
    }
}

/* ===================== Min<V> / Max<V> ===================== */

/// Minimum value; `None` for an empty window.
#[derive(Clone, Copy, Debug, Default)]
pub struct Min<V>(pub PhantomData<V>);

impl<V> Min<V> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<V> Aggregate<V> for Min<V>
where
    V: Ord + Clone + Send + Sync + 'static,
{
    type Acc = Option<V>;
    type Output = Option<V>;

    fn create(&self) -> Option<V> {
        None
    }

    fn add(&self, acc: &mut Option<V>, v: V) {
        match acc {
            Some(cur) if *cur <= v => {}
            _ => *acc = Some(v),
        }
    }

    fn output(&self, acc: &Option<V>) -> Option<V> {
        acc.clone()
    }
}

/// Maximum value; `None` for an empty window.
#[derive(Clone, Copy, Debug, Default)]
pub struct Max<V>(pub PhantomData<V>);

impl<V> Max<V> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<V> Aggregate<V> for Max<V>
where
    V: Ord + Clone + Send + Sync + 'static,
{
    type Acc = Option<V>;
    type Output = Option<V>;

    fn create(&self) -> Option<V> {
        None
    }

    fn add(&self, acc: &mut Option<V>, v: V) {
        match acc {
            Some(cur) if *cur >= v => {}
            _ => *acc = Some(v),
        }
    }

    fn output(&self, acc: &Option<V>) -> Option<V> {
        acc.clone()
    }
}

/* ===================== Mean ===================== */

/// Arithmetic mean of `f64` values; `None` for an empty window.
#[derive(Clone, Copy, Debug, Default)]
pub struct Mean;

impl Aggregate<f64> for Mean {
    type Acc = (f64, u64);
    type Output = Option<f64>;

    fn create(&self) -> (f64, u64) {
        (0.0, 0)
    }

    fn add(&self, acc: &mut (f64, u64), v: f64) {
        acc.0 += v;
        acc.1 += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    fn output(&self, acc: &(f64, u64)) -> Option<f64> {
        (acc.1 > 0).then(|| acc.0 / acc.1 as f64)
    }
}

/* ===================== TopK<V> ===================== */

/// The `k` largest values, sorted descending.
///
/// Keeps a min-heap of size ≤ `k`, so memory per key is bounded by `k`.
#[derive(Clone, Debug)]
pub struct TopK<V> {
    pub k: usize,
    _m: PhantomData<V>,
}

impl<V> TopK<V> {
    #[must_use]
    pub const fn new(k: usize) -> Self {
        Self { k, _m: PhantomData }
    }
}

impl<V> Aggregate<V> for TopK<V>
where
    V: Ord + Clone + Send + Sync + 'static,
{
    type Acc = BinaryHeap<Reverse<V>>;
    type Output = Vec<V>;

    fn create(&self) -> BinaryHeap<Reverse<V>> {
        BinaryHeap::new()
    }

    fn add(&self, acc: &mut BinaryHeap<Reverse<V>>, v: V) {
        acc.push(Reverse(v));
        if acc.len() > self.k {
            acc.pop();
        } // drop smallest
    }

    fn output(&self, acc: &BinaryHeap<Reverse<V>>) -> Vec<V> {
        let mut out: Vec<V> = acc.iter().map(|Reverse(v)| v.clone()).collect();
        out.sort_unstable_by(|a, b| b.cmp(a));
        out
    }
}

/* ===================== AggregateSink ===================== */

type Extract<T, V> = Box<dyn Fn(&T) -> V + Send>;

/// Sink that keeps one [`Aggregate`] accumulator per key.
pub struct AggregateSink<K, T, V, A: Aggregate<V>> {
    extract: Extract<T, V>,
    agg: A,
    accs: IndexMap<K, A::Acc>,
}

impl<K, T, V, A> AggregateSink<K, T, V, A>
where
    K: Hash + Eq,
    A: Aggregate<V>,
{
    pub fn new(extract: impl Fn(&T) -> V + Send + 'static, agg: A) -> Self {
        Self { extract: Box::new(extract), agg, accs: IndexMap::new() }
    }

    /// Number of keys with a live accumulator.
    pub fn live_keys(&self) -> usize {
        self.accs.len()
    }
}

impl<K, T, V, A> SummarizationSink<K, T> for AggregateSink<K, T, V, A>
where
    K: Hash + Eq + Clone + Send,
    A: Aggregate<V>,
{
    type Summary = A::Output;

    fn accumulate(&mut self, key: &K, tuple: &T) {
        let v = (self.extract)(tuple);
        let agg = &self.agg;
        let acc = self.accs.entry(key.clone()).or_insert_with(|| agg.create());
        agg.add(acc, v);
    }

    fn snapshot(&self, key: &K) -> A::Output {
        match self.accs.get(key) {
            Some(acc) => self.agg.output(acc),
            None => self.agg.output(&self.agg.create()),
        }
    }

    fn reset(&mut self, key: &K) {
        self.accs.shift_remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold<V, A: Aggregate<V>>(agg: &A, vs: impl IntoIterator<Item = V>) -> A::Output {
        let mut acc = agg.create();
        for v in vs {
            agg.add(&mut acc, v);
        }
        agg.output(&acc)
    }

    #[test]
    fn builtins() {
        assert_eq!(fold(&Count, ["a", "b", "c"]), 3);
        assert_eq!(fold(&Sum::<i64>::new(), [1, 2, 3]), 6);
        assert_eq!(fold(&Min::<i32>::new(), [4, -2, 9]), Some(-2));
        assert_eq!(fold(&Max::<i32>::new(), [4, -2, 9]), Some(9));
        assert_eq!(fold(&Max::<i32>::new(), Vec::<i32>::new()), None);
        assert_eq!(fold(&Mean, [1.0, 2.0, 6.0]), Some(3.0));
        assert_eq!(fold(&Mean, Vec::<f64>::new()), None);
        assert_eq!(fold(&TopK::new(2), [5, 1, 9, 7]), vec![9, 7]);
        assert!(fold(&TopK::<u8>::new(0), [1, 2]).is_empty());
    }

    #[test]
    fn sink_keeps_keys_apart() {
        let mut sink = AggregateSink::new(|t: &(u8, i64)| t.1, Count);
        sink.accumulate(&1u8, &(1, 10));
        sink.accumulate(&2u8, &(2, 10));
        sink.accumulate(&1u8, &(1, 11));
        assert_eq!(sink.snapshot(&1), 2);
        assert_eq!(sink.snapshot(&2), 1);
        assert_eq!(sink.live_keys(), 2);

        sink.reset(&1);
        assert_eq!(sink.snapshot(&1), 0);
        assert_eq!(sink.live_keys(), 1);
    }
}
