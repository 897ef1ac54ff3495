//! Error types for windowflow.
//!
//! Eviction is never an error: tuples and partitions removed by a policy are
//! reported through [`WindowListener`](crate::WindowListener) callbacks. The
//! variants below cover construction-time rejection and unrecoverable
//! resource exhaustion.

use thiserror::Error;

/// Result type alias for windowflow operations.
pub type Result<T> = std::result::Result<T, WindowError>;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for window construction and operation.
#[derive(Error, Debug)]
pub enum WindowError {
    /// A malformed policy descriptor or engine configuration. Only produced
    /// while building an engine.
    #[error("Invalid window policy: {0}")]
    InvalidPolicy(String),

    /// Growing a partition buffer or the partition map failed. Fatal for the
    /// owning operator.
    #[error("Allocation failed while growing {what}: {source}")]
    AllocationFailure {
        what: &'static str,
        #[source]
        source: BoxedSource,
    },

    /// The engine has been shut down and accepts no further input.
    #[error("Window '{name}' is shut down")]
    Closed { name: String },

    /// The operating system refused to spawn the eviction clock thread.
    #[error("Failed to spawn eviction clock thread: {0}")]
    ClockSpawn(#[from] std::io::Error),

    /// A window snapshot could not be decoded or failed verification.
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),
}

impl WindowError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        WindowError::InvalidPolicy(msg.into())
    }

    pub(crate) fn alloc(what: &'static str, source: impl Into<BoxedSource>) -> Self {
        WindowError::AllocationFailure { what, source: source.into() }
    }

    /// Returns true for errors that must terminate the owning operator.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WindowError::AllocationFailure { .. })
    }
}
