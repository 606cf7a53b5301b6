//! Snapshot and restore of a model instance.
//!
//! A snapshot is the postcard encoding of the instance state followed by a
//! 32-byte BLAKE3 digest of that encoding:
//!
//! ```text
//! +----------------------------+------------------+
//! | postcard(SnapshotBody)     | blake3(body)     |
//! +----------------------------+------------------+
//! ```
//!
//! Restoring replaces the live state wholesale, or not at all.

use bytes::Bytes;
use cosim_types::{TypeTag, ValueReference};
use serde::{Deserialize, Serialize};

use crate::clock::ClockEntry;
use crate::instance::{ExperimentSetup, KernelOptions, ModelInstance};
use crate::lifecycle::LifecycleState;
use crate::store::VariableValue;

const FORMAT_VERSION: u16 = 1;
const DIGEST_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SlotState {
    reference: ValueReference,
    type_tag: TypeTag,
    value: VariableValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SnapshotBody {
    format_version: u16,
    lifecycle: LifecycleState,
    setup: Option<ExperimentSetup>,
    slots: Vec<SlotState>,
    clocks: Vec<ClockEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to encode snapshot: {0}")]
    Encode(String),

    #[error("failed to decode snapshot: {0}")]
    Decode(String),

    #[error("snapshot of {len} bytes is shorter than its digest")]
    Truncated { len: usize },

    #[error("snapshot digest does not match its contents")]
    DigestMismatch,

    #[error("snapshot of {len} bytes exceeds the limit of {max} bytes")]
    TooLarge { len: usize, max: usize },

    #[error("snapshot format version {0} is not supported")]
    UnsupportedVersion(u16),

    #[error("snapshot does not fit this model: {0}")]
    ShapeMismatch(String),
}

impl ModelInstance {
    /// Captures lifecycle state, every slot value and every clock entry.
    ///
    /// A snapshot larger than `options.max_snapshot_bytes` is refused here, so
    /// every snapshot handed out can be restored by an instance with the same
    /// options.
    pub fn serialize_state(&self, options: &KernelOptions) -> Result<Bytes, SnapshotError> {
        let body = SnapshotBody {
            format_version: FORMAT_VERSION,
            lifecycle: self.lifecycle,
            setup: self.setup,
            slots: self
                .store
                .iter()
                .map(|slot| SlotState {
                    reference: slot.reference(),
                    type_tag: slot.type_tag(),
                    value: slot.value().clone(),
                })
                .collect(),
            clocks: self.clocks.entries().copied().collect(),
        };

        let mut encoded =
            postcard::to_allocvec(&body).map_err(|e| SnapshotError::Encode(e.to_string()))?;
        let digest = blake3::hash(&encoded);
        encoded.extend_from_slice(digest.as_bytes());
        if encoded.len() > options.max_snapshot_bytes {
            return Err(SnapshotError::TooLarge {
                len: encoded.len(),
                max: options.max_snapshot_bytes,
            });
        }

        // Postcondition: digest trailer present
        debug_assert!(encoded.len() >= DIGEST_LEN);
        Ok(Bytes::from(encoded))
    }

    /// Replaces the live state with a snapshot taken from an instance of the
    /// same model. On error nothing is changed.
    pub fn deserialize_state(
        &mut self,
        snapshot: &[u8],
        options: &KernelOptions,
    ) -> Result<(), SnapshotError> {
        if snapshot.len() > options.max_snapshot_bytes {
            return Err(SnapshotError::TooLarge {
                len: snapshot.len(),
                max: options.max_snapshot_bytes,
            });
        }
        let Some(body_len) = snapshot.len().checked_sub(DIGEST_LEN) else {
            return Err(SnapshotError::Truncated {
                len: snapshot.len(),
            });
        };
        let (encoded, digest) = snapshot.split_at(body_len);
        if options.verify_snapshot_digest && blake3::hash(encoded).as_bytes() != digest {
            return Err(SnapshotError::DigestMismatch);
        }

        let body: SnapshotBody =
            postcard::from_bytes(encoded).map_err(|e| SnapshotError::Decode(e.to_string()))?;
        if body.format_version != FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(body.format_version));
        }

        for (slot, state) in self.store.iter().zip(&body.slots) {
            if slot.reference() != state.reference || slot.type_tag() != state.type_tag {
                return Err(SnapshotError::ShapeMismatch(format!(
                    "expected {} of type {}, found {} of type {}",
                    slot.reference(),
                    slot.type_tag(),
                    state.reference,
                    state.type_tag
                )));
            }
        }

        // Stage on copies so a late failure leaves the live state untouched.
        let mut store = self.store.clone();
        store
            .replace_values(
                body.slots
                    .into_iter()
                    .map(|state| (state.reference, state.value))
                    .collect(),
            )
            .map_err(|e| SnapshotError::ShapeMismatch(e.to_string()))?;
        let mut clocks = self.clocks.clone();
        clocks
            .replace_entries(body.clocks)
            .map_err(|e| SnapshotError::ShapeMismatch(e.to_string()))?;

        self.store = store;
        self.clocks = clocks;
        self.lifecycle = body.lifecycle;
        self.setup = body.setup;
        Ok(())
    }
}
