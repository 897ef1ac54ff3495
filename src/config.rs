//! Engine-level settings that are independent of the window policy.

use crate::error::{Result, WindowError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding [`EngineConfig::tick_interval`], in milliseconds.
pub const TICK_ENV_VAR: &str = "WINDOWFLOW_TICK_MS";

/// Configuration for a [`WindowEngine`](crate::WindowEngine).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name used in logs, clock thread names and registry lookups.
    pub name: String,
    /// How often the eviction clock re-evaluates time-based policies.
    #[serde(rename = "tick_interval_ms", with = "millis")]
    pub tick_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "window".to_string(),
            tick_interval: Duration::from_millis(100),
        }
    }
}

impl EngineConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Defaults, with the tick interval taken from `WINDOWFLOW_TICK_MS` when
    /// it is set to a valid number.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(ms) = std::env::var(TICK_ENV_VAR).ok().and_then(|v| v.trim().parse::<u64>().ok()) {
            cfg.tick_interval = Duration::from_millis(ms);
        }
        cfg
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_tick_interval(mut self, tick: Duration) -> Self {
        self.tick_interval = tick;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(WindowError::invalid("tick interval must be > 0"));
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
