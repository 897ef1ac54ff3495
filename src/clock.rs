//! Background timer for time-driven eviction.
//!
//! An [`EvictionClock`] owns at most one thread. The thread sleeps on a stop
//! channel with a timeout of `tick_interval`; each timeout runs the callback,
//! and a stop request (or the sender being dropped) wakes it immediately.
//! A panicking callback is caught here, logged, and ends the thread with the
//! health flag cleared; tuple-driven paths keep working.

use crate::error::Result;
use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub struct EvictionClock {
    name: String,
    tick_interval: Duration,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    healthy: Arc<AtomicBool>,
}

impl EvictionClock {
    pub fn new(name: impl Into<String>, tick_interval: Duration) -> Self {
        Self {
            name: name.into(),
            tick_interval,
            stop_tx: None,
            handle: None,
            healthy: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Spawn the clock thread, invoking `callback` once per tick until
    /// [`stop`](Self::stop). Calling `start` on a running clock does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::ClockSpawn`](crate::WindowError::ClockSpawn) if
    /// the thread cannot be created.
    pub fn start<F>(&mut self, mut callback: F) -> Result<()>
    where
        F: FnMut() + Send + 'static,
    {
        if self.handle.is_some() {
            warn!(clock = %self.name, "eviction clock already running");
            return Ok(());
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let tick = self.tick_interval;
        let healthy = Arc::clone(&self.healthy);
        let name = self.name.clone();
        healthy.store(true, Ordering::Release);

        let handle = thread::Builder::new()
            .name(format!("windowflow-clock-{}", self.name))
            .spawn(move || {
                info!(clock = %name, tick_ms = tick.as_millis() as u64, "eviction clock started");
                loop {
                    match stop_rx.recv_timeout(tick) {
                        Err(RecvTimeoutError::Timeout) => {
                            if catch_unwind(AssertUnwindSafe(&mut callback)).is_err() {
                                error!(clock = %name, "eviction tick panicked; time-based eviction stopped");
                                healthy.store(false, Ordering::Release);
                                break;
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                            debug!(clock = %name, "eviction clock received stop");
                            break;
                        }
                    }
                }
                info!(clock = %name, "eviction clock exited");
            })?;

        self.stop_tx = Some(stop_tx);
        self.handle = Some(handle);
        Ok(())
    }

    /// Request cancellation and wait for the thread to return. Idempotent.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            // a full channel means a stop is already pending
            let _ = tx.try_send(());
        }
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            warn!(clock = %self.name, "eviction clock stopped from its own tick; not joining");
            return;
        }
        if handle.join().is_err() {
            error!(clock = %self.name, "eviction clock thread terminated abnormally");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// False once a tick callback has panicked.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }
}

impl Drop for EvictionClock {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    #[mark_flaky_tests::flaky]
    #[test]
    fn ticks_until_stopped() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&ticks);
        let mut clock = EvictionClock::new("t", Duration::from_millis(5));
        clock.start(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while ticks.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        clock.stop();
        let after_stop = ticks.load(Ordering::SeqCst);
        assert!(after_stop >= 3);
        assert!(!clock.is_running());

        thread::sleep(Duration::from_millis(30));
        assert_eq!(ticks.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn stop_is_prompt_and_idempotent() {
        let mut clock = EvictionClock::new("slow", Duration::from_secs(3600));
        clock.start(|| {}).unwrap();
        let started = Instant::now();
        clock.stop();
        clock.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(clock.is_healthy());
    }

    #[mark_flaky_tests::flaky]
    #[test]
    fn panicking_tick_clears_health() {
        let mut clock = EvictionClock::new("boom", Duration::from_millis(1));
        clock.start(|| panic!("tick failure")).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while clock.is_healthy() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        assert!(!clock.is_healthy());
        clock.stop();
    }
}
