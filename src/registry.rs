//! Lifecycle management for every window an operator graph owns.
//!
//! Windows never share state, so the registry only needs to start them and
//! shut them down together. With the `parallel-shutdown` feature the final
//! flushes run on the rayon pool.

use crate::engine::{PartitionKey, Tuple, WindowEngine};
use crate::error::Result;
use crate::metrics::CountersSnapshot;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

#[cfg(feature = "parallel-shutdown")]
use rayon::prelude::*;

/// Type-erased window lifecycle.
pub trait ManagedWindow: Send + Sync {
    fn name(&self) -> &str;
    fn start(&self) -> Result<()>;
    fn shutdown(&self);
    fn counters(&self) -> CountersSnapshot;
}

impl<K, T, S> ManagedWindow for WindowEngine<K, T, S>
where
    K: PartitionKey,
    T: Tuple,
    S: Send + 'static,
{
    fn name(&self) -> &str {
        WindowEngine::name(self)
    }

    fn start(&self) -> Result<()> {
        WindowEngine::start(self)
    }

    fn shutdown(&self) {
        WindowEngine::shutdown(self);
    }

    fn counters(&self) -> CountersSnapshot {
        WindowEngine::counters(self)
    }
}

/// Named collection of windows, in registration order.
#[derive(Default)]
pub struct WindowRegistry {
    windows: RwLock<IndexMap<String, Arc<dyn ManagedWindow>>>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `window` under `name`, returning any window it replaced.
    pub fn register(&self, name: impl Into<String>, window: Arc<dyn ManagedWindow>) -> Option<Arc<dyn ManagedWindow>> {
        self.windows.write().insert(name.into(), window)
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<dyn ManagedWindow>> {
        self.windows.write().shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ManagedWindow>> {
        self.windows.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.windows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.read().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.windows.read().keys().cloned().collect()
    }

    /// Start every registered window in registration order.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first window's start error.
    pub fn start_all(&self) -> Result<()> {
        for w in self.snapshot() {
            w.start()?;
        }
        Ok(())
    }

    /// Shut down every registered window, flushing what each still holds.
    pub fn shutdown_all(&self) {
        let windows = self.snapshot();
        info!(windows = windows.len(), "shutting down all windows");

        #[cfg(feature = "parallel-shutdown")]
        windows.par_iter().for_each(|w| w.shutdown());

        #[cfg(not(feature = "parallel-shutdown"))]
        windows.iter().for_each(|w| w.shutdown());
    }

    /// Counters for every window, keyed by registered name.
    pub fn counters(&self) -> IndexMap<String, CountersSnapshot> {
        self.windows
            .read()
            .iter()
            .map(|(name, w)| (name.clone(), w.counters()))
            .collect()
    }

    // callbacks run during shutdown must not deadlock against register()
    fn snapshot(&self) -> Vec<Arc<dyn ManagedWindow>> {
        self.windows.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{EvictionPolicy, PolicySpec};

    fn window(name: &str) -> Arc<WindowEngine<(), u32>> {
        Arc::new(
            WindowEngine::builder(PolicySpec::tumbling(EvictionPolicy::Punctuation))
                .name(name)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn register_replace_and_unregister() {
        let reg = WindowRegistry::new();
        assert!(reg.register("a", window("a")).is_none());
        assert!(reg.register("b", window("b")).is_none());
        assert!(reg.register("a", window("a2")).is_some());
        assert_eq!(reg.names(), vec!["a", "b"]);
        assert_eq!(reg.get("a").unwrap().name(), "a2");

        assert!(reg.unregister("a").is_some());
        assert!(reg.unregister("a").is_none());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn shutdown_all_flushes_every_window() {
        let reg = WindowRegistry::new();
        let a = window("a");
        let b = window("b");
        a.insert(1, ()).unwrap();
        b.insert(2, ()).unwrap();
        b.insert(3, ()).unwrap();
        reg.register("a", a.clone());
        reg.register("b", b.clone());

        reg.start_all().unwrap();
        reg.shutdown_all();

        assert!(!a.is_running() && !b.is_running());
        let counters = reg.counters();
        assert_eq!(counters["a"].flushes_total, 1);
        assert_eq!(counters["b"].flushes_total, 1);
        assert_eq!(counters["b"].partition_count, 0);
    }
}
