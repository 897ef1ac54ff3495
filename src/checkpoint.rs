//! Window state snapshots for restart recovery.
//!
//! A [`WindowSnapshot`] is a stable-ordered copy of every partition in a
//! window plus the bucket watermark. Take one with
//! [`WindowEngine::snapshot`](crate::WindowEngine::snapshot) and feed it back
//! through [`WindowEngine::restore`](crate::WindowEngine::restore) before the
//! engine resumes normal operation.
//!
//! With the `checkpointing` feature, snapshots encode to a compact postcard
//! payload guarded by a SHA-256 checksum. Where the bytes are stored is up to
//! the caller.
//!
//! # Usage
//!
//! ```
//! use windowflow::*;
//!
//! # fn main() -> windowflow::Result<()> {
//! let engine = WindowEngine::builder(PolicySpec::tumbling(EvictionPolicy::Count(10)).partitioned())
//!     .build()?;
//! engine.insert(1u32, "a".to_string())?;
//! engine.insert(2u32, "b".to_string())?;
//!
//! let bytes = engine.snapshot().encode()?;
//!
//! let restored = WindowEngine::builder(PolicySpec::tumbling(EvictionPolicy::Count(10)).partitioned())
//!     .build()?;
//! restored.restore(WindowSnapshot::decode(&bytes)?)?;
//! assert_eq!(restored.contents(&"a".to_string()), Some(vec![1]));
//! # Ok(())
//! # }
//! ```

use crate::engine::PartitionRecord;
use crate::window::TimestampMs;
use serde::{Deserialize, Serialize};

#[cfg(feature = "checkpointing")]
use crate::error::{Result, WindowError};
#[cfg(feature = "checkpointing")]
use serde::de::DeserializeOwned;
#[cfg(feature = "checkpointing")]
use sha2::{Digest, Sha256};

/// Serializable copy of one window's state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WindowSnapshot<K, T> {
    /// Name of the window the snapshot was taken from.
    pub window: String,
    /// Largest event time seen (bucket windows only).
    pub watermark: Option<TimestampMs>,
    /// Partitions in store order.
    pub partitions: Vec<PartitionRecord<K, T>>,
}

impl<K, T> WindowSnapshot<K, T> {
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn tuple_count(&self) -> u64 {
        self.partitions.iter().map(|r| r.partition.tuple_count()).sum()
    }
}

/// On-the-wire framing: checksum over the encoded payload.
#[cfg(feature = "checkpointing")]
#[derive(Serialize, Deserialize)]
struct Envelope {
    checksum: String,
    payload: Vec<u8>,
}

#[cfg(feature = "checkpointing")]
impl<K: Serialize, T: Serialize> WindowSnapshot<K, T> {
    /// Encode the snapshot and its checksum.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::Checkpoint`] if a key or tuple fails to serialize.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = postcard::to_allocvec(self)
            .map_err(|e| WindowError::Checkpoint(format!("failed to serialize snapshot: {e}")))?;
        let envelope = Envelope { checksum: compute_checksum(&payload), payload };
        postcard::to_allocvec(&envelope)
            .map_err(|e| WindowError::Checkpoint(format!("failed to frame snapshot: {e}")))
    }
}

#[cfg(feature = "checkpointing")]
impl<K: DeserializeOwned, T: DeserializeOwned> WindowSnapshot<K, T> {
    /// Verify and decode bytes produced by [`encode`](Self::encode).
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::Checkpoint`] if the bytes are malformed or the
    /// checksum does not match.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let envelope: Envelope = postcard::from_bytes(bytes)
            .map_err(|e| WindowError::Checkpoint(format!("failed to read snapshot frame: {e}")))?;
        if compute_checksum(&envelope.payload) != envelope.checksum {
            return Err(WindowError::Checkpoint(
                "snapshot integrity check failed: checksum mismatch".to_string(),
            ));
        }
        postcard::from_bytes(&envelope.payload)
            .map_err(|e| WindowError::Checkpoint(format!("failed to deserialize snapshot: {e}")))
    }
}

/// Compute SHA-256 checksum of data.
#[cfg(feature = "checkpointing")]
#[must_use]
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
