//! Typed values and typed value batches.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::TypeTag;

/// A single typed value held by a slot.
///
/// The variant always agrees with the slot's [`TypeTag`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Float32(f32),
    Float64(f64),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Boolean(bool),
    String(String),
    Binary(Bytes),
    Clock(bool),
}

impl Value {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Float32(_) => TypeTag::Float32,
            Value::Float64(_) => TypeTag::Float64,
            Value::Int8(_) => TypeTag::Int8,
            Value::UInt8(_) => TypeTag::UInt8,
            Value::Int16(_) => TypeTag::Int16,
            Value::UInt16(_) => TypeTag::UInt16,
            Value::Int32(_) => TypeTag::Int32,
            Value::UInt32(_) => TypeTag::UInt32,
            Value::Int64(_) => TypeTag::Int64,
            Value::UInt64(_) => TypeTag::UInt64,
            Value::Boolean(_) => TypeTag::Boolean,
            Value::String(_) => TypeTag::String,
            Value::Binary(_) => TypeTag::Binary,
            Value::Clock(_) => TypeTag::Clock,
        }
    }

    /// The zero value of a type: numeric zero, `false`, empty string, and a
    /// single zero byte for binaries.
    pub fn zero(tag: TypeTag) -> Value {
        match tag {
            TypeTag::Float32 => Value::Float32(0.0),
            TypeTag::Float64 => Value::Float64(0.0),
            TypeTag::Int8 => Value::Int8(0),
            TypeTag::UInt8 => Value::UInt8(0),
            TypeTag::Int16 => Value::Int16(0),
            TypeTag::UInt16 => Value::UInt16(0),
            TypeTag::Int32 => Value::Int32(0),
            TypeTag::UInt32 => Value::UInt32(0),
            TypeTag::Int64 => Value::Int64(0),
            TypeTag::UInt64 => Value::UInt64(0),
            TypeTag::Boolean => Value::Boolean(false),
            TypeTag::String => Value::String(String::new()),
            TypeTag::Binary => Value::Binary(Bytes::from_static(&[0])),
            TypeTag::Clock => Value::Clock(false),
        }
    }

    /// Returns the unsigned integer content, if this is a `UInt64`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt64(v) => Some(*v),
            _ => None,
        }
    }
}

/// A homogeneous batch of values, as carried by typed get and set operations.
///
/// Each variant corresponds to one [`TypeTag`]. Binary entries carry their
/// own length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Values {
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Int8(Vec<i8>),
    UInt8(Vec<u8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    Boolean(Vec<bool>),
    String(Vec<String>),
    Binary(Vec<Bytes>),
    Clock(Vec<bool>),
}

impl Values {
    /// Creates an empty batch of the given type.
    pub fn empty(tag: TypeTag) -> Values {
        match tag {
            TypeTag::Float32 => Values::Float32(Vec::new()),
            TypeTag::Float64 => Values::Float64(Vec::new()),
            TypeTag::Int8 => Values::Int8(Vec::new()),
            TypeTag::UInt8 => Values::UInt8(Vec::new()),
            TypeTag::Int16 => Values::Int16(Vec::new()),
            TypeTag::UInt16 => Values::UInt16(Vec::new()),
            TypeTag::Int32 => Values::Int32(Vec::new()),
            TypeTag::UInt32 => Values::UInt32(Vec::new()),
            TypeTag::Int64 => Values::Int64(Vec::new()),
            TypeTag::UInt64 => Values::UInt64(Vec::new()),
            TypeTag::Boolean => Values::Boolean(Vec::new()),
            TypeTag::String => Values::String(Vec::new()),
            TypeTag::Binary => Values::Binary(Vec::new()),
            TypeTag::Clock => Values::Clock(Vec::new()),
        }
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            Values::Float32(_) => TypeTag::Float32,
            Values::Float64(_) => TypeTag::Float64,
            Values::Int8(_) => TypeTag::Int8,
            Values::UInt8(_) => TypeTag::UInt8,
            Values::Int16(_) => TypeTag::Int16,
            Values::UInt16(_) => TypeTag::UInt16,
            Values::Int32(_) => TypeTag::Int32,
            Values::UInt32(_) => TypeTag::UInt32,
            Values::Int64(_) => TypeTag::Int64,
            Values::UInt64(_) => TypeTag::UInt64,
            Values::Boolean(_) => TypeTag::Boolean,
            Values::String(_) => TypeTag::String,
            Values::Binary(_) => TypeTag::Binary,
            Values::Clock(_) => TypeTag::Clock,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Values::Float32(v) => v.len(),
            Values::Float64(v) => v.len(),
            Values::Int8(v) => v.len(),
            Values::UInt8(v) => v.len(),
            Values::Int16(v) => v.len(),
            Values::UInt16(v) => v.len(),
            Values::Int32(v) => v.len(),
            Values::UInt32(v) => v.len(),
            Values::Int64(v) => v.len(),
            Values::UInt64(v) => v.len(),
            Values::Boolean(v) | Values::Clock(v) => v.len(),
            Values::String(v) => v.len(),
            Values::Binary(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a value of the batch's type.
    ///
    /// Returns the value back if its type does not match the batch.
    pub fn push(&mut self, value: Value) -> Result<(), Value> {
        match (self, value) {
            (Values::Float32(v), Value::Float32(x)) => v.push(x),
            (Values::Float64(v), Value::Float64(x)) => v.push(x),
            (Values::Int8(v), Value::Int8(x)) => v.push(x),
            (Values::UInt8(v), Value::UInt8(x)) => v.push(x),
            (Values::Int16(v), Value::Int16(x)) => v.push(x),
            (Values::UInt16(v), Value::UInt16(x)) => v.push(x),
            (Values::Int32(v), Value::Int32(x)) => v.push(x),
            (Values::UInt32(v), Value::UInt32(x)) => v.push(x),
            (Values::Int64(v), Value::Int64(x)) => v.push(x),
            (Values::UInt64(v), Value::UInt64(x)) => v.push(x),
            (Values::Boolean(v), Value::Boolean(x)) | (Values::Clock(v), Value::Clock(x)) => {
                v.push(x);
            }
            (Values::String(v), Value::String(x)) => v.push(x),
            (Values::Binary(v), Value::Binary(x)) => v.push(x),
            (_, other) => return Err(other),
        }
        Ok(())
    }

    /// Splits the batch into individually typed values, preserving order.
    pub fn into_values(self) -> Vec<Value> {
        match self {
            Values::Float32(v) => v.into_iter().map(Value::Float32).collect(),
            Values::Float64(v) => v.into_iter().map(Value::Float64).collect(),
            Values::Int8(v) => v.into_iter().map(Value::Int8).collect(),
            Values::UInt8(v) => v.into_iter().map(Value::UInt8).collect(),
            Values::Int16(v) => v.into_iter().map(Value::Int16).collect(),
            Values::UInt16(v) => v.into_iter().map(Value::UInt16).collect(),
            Values::Int32(v) => v.into_iter().map(Value::Int32).collect(),
            Values::UInt32(v) => v.into_iter().map(Value::UInt32).collect(),
            Values::Int64(v) => v.into_iter().map(Value::Int64).collect(),
            Values::UInt64(v) => v.into_iter().map(Value::UInt64).collect(),
            Values::Boolean(v) => v.into_iter().map(Value::Boolean).collect(),
            Values::String(v) => v.into_iter().map(Value::String).collect(),
            Values::Binary(v) => v.into_iter().map(Value::Binary).collect(),
            Values::Clock(v) => v.into_iter().map(Value::Clock).collect(),
        }
    }

    /// Byte lengths of a binary batch, reported alongside the bytes.
    pub fn binary_sizes(&self) -> Option<Vec<usize>> {
        match self {
            Values::Binary(v) => Some(v.iter().map(Bytes::len).collect()),
            _ => None,
        }
    }
}
