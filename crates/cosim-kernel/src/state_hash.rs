//! Deterministic state hashing for model instances.
//!
//! The hash covers everything a snapshot restores and nothing else:
//! - the lifecycle state
//! - every slot (sorted by reference), with its type tag and value
//! - every clock entry (sorted by reference)
//!
//! Two instances with equal hashes answer every `get` identically and are in
//! the same lifecycle state. Floats are hashed by their bit pattern.

use blake3::Hasher;
use cosim_types::Value;

use crate::instance::ModelInstance;
use crate::store::VariableValue;

impl ModelInstance {
    /// Computes a 32-byte BLAKE3 digest of the observable instance state.
    pub fn compute_state_hash(&self) -> [u8; 32] {
        let mut hasher = Hasher::new();

        hasher.update(&[self.lifecycle as u8]);

        // Slots iterate in reference order
        hasher.update(&(self.store.len() as u64).to_le_bytes());
        for slot in self.store.iter() {
            hasher.update(&slot.reference().as_u32().to_le_bytes());
            hasher.update(&[slot.type_tag() as u8]);
            match slot.value() {
                VariableValue::Scalar(value) => {
                    hasher.update(&[0u8]);
                    hash_value(&mut hasher, value);
                }
                VariableValue::Array(values) => {
                    hasher.update(&[1u8]);
                    hasher.update(&(values.len() as u64).to_le_bytes());
                    for value in values {
                        hash_value(&mut hasher, value);
                    }
                }
            }
        }

        // Clock entries (BTreeMap is sorted)
        let entries: Vec<_> = self.clocks.entries().collect();
        hasher.update(&(entries.len() as u64).to_le_bytes());
        for entry in entries {
            hasher.update(&entry.reference.as_u32().to_le_bytes());
            match entry.interval {
                Some(interval) => {
                    hasher.update(&[1u8]);
                    hasher.update(&interval.to_bits().to_le_bytes());
                }
                None => {
                    hasher.update(&[0u8]);
                }
            }
            hasher.update(&entry.shift.to_bits().to_le_bytes());
        }

        *hasher.finalize().as_bytes()
    }
}

fn hash_value(hasher: &mut Hasher, value: &Value) {
    match value {
        Value::Float32(v) => hasher.update(&v.to_bits().to_le_bytes()),
        Value::Float64(v) => hasher.update(&v.to_bits().to_le_bytes()),
        Value::Int8(v) => hasher.update(&v.to_le_bytes()),
        Value::UInt8(v) => hasher.update(&v.to_le_bytes()),
        Value::Int16(v) => hasher.update(&v.to_le_bytes()),
        Value::UInt16(v) => hasher.update(&v.to_le_bytes()),
        Value::Int32(v) => hasher.update(&v.to_le_bytes()),
        Value::UInt32(v) => hasher.update(&v.to_le_bytes()),
        Value::Int64(v) => hasher.update(&v.to_le_bytes()),
        Value::UInt64(v) => hasher.update(&v.to_le_bytes()),
        Value::Boolean(v) | Value::Clock(v) => hasher.update(&[u8::from(*v)]),
        Value::String(v) => {
            hasher.update(&(v.len() as u64).to_le_bytes());
            hasher.update(v.as_bytes())
        }
        Value::Binary(v) => {
            hasher.update(&(v.len() as u64).to_le_bytes());
            hasher.update(v)
        }
    };
}
