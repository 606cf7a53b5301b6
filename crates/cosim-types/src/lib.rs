//! # cosim-types: Core types for `cosim`
//!
//! This crate contains the vocabulary shared by the kernel and its hosts:
//! - Variable identity ([`ValueReference`])
//! - Variable classification ([`TypeTag`], [`Causality`])
//! - Protocol outcomes ([`Status`])
//! - Typed values and typed batches ([`Value`], [`Values`])
//! - Exact clock arithmetic ([`Fraction`], [`decimal_to_fraction`], [`fraction_to_decimal`])
//! - Log categories ([`LogCategory`])

use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

mod fraction;
mod log_category;
mod value;

pub use fraction::{ConversionError, Fraction, decimal_to_fraction, fraction_to_decimal};
pub use log_category::LogCategory;
pub use value::{Value, Values};

// ============================================================================
// Variable Identity
// ============================================================================

/// Stable integer identifying one variable slot of a model instance.
///
/// References are assigned when the model description is written and never
/// change for the lifetime of an instance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct ValueReference(u32);

impl ValueReference {
    pub const fn new(reference: u32) -> Self {
        Self(reference)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl Display for ValueReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}#", self.0)
    }
}

impl From<u32> for ValueReference {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<ValueReference> for u32 {
    fn from(reference: ValueReference) -> Self {
        reference.0
    }
}

/// Converts a list of raw integers into value references.
pub fn refs(raw: &[u32]) -> Vec<ValueReference> {
    raw.iter().copied().map(ValueReference::from).collect()
}

// ============================================================================
// Variable Classification
// ============================================================================

/// The value type of a slot. Fixed when the slot is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TypeTag {
    Float32 = 0,
    Float64 = 1,
    Int8 = 2,
    UInt8 = 3,
    Int16 = 4,
    UInt16 = 5,
    Int32 = 6,
    UInt32 = 7,
    Int64 = 8,
    UInt64 = 9,
    Boolean = 10,
    String = 11,
    Binary = 12,
    Clock = 13,
}

impl TypeTag {
    /// Every type tag, in declaration order.
    pub const ALL: [TypeTag; 14] = [
        TypeTag::Float32,
        TypeTag::Float64,
        TypeTag::Int8,
        TypeTag::UInt8,
        TypeTag::Int16,
        TypeTag::UInt16,
        TypeTag::Int32,
        TypeTag::UInt32,
        TypeTag::Int64,
        TypeTag::UInt64,
        TypeTag::Boolean,
        TypeTag::String,
        TypeTag::Binary,
        TypeTag::Clock,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Float32 => "float32",
            TypeTag::Float64 => "float64",
            TypeTag::Int8 => "int8",
            TypeTag::UInt8 => "uint8",
            TypeTag::Int16 => "int16",
            TypeTag::UInt16 => "uint16",
            TypeTag::Int32 => "int32",
            TypeTag::UInt32 => "uint32",
            TypeTag::Int64 => "int64",
            TypeTag::UInt64 => "uint64",
            TypeTag::Boolean => "boolean",
            TypeTag::String => "string",
            TypeTag::Binary => "binary",
            TypeTag::Clock => "clock",
        }
    }
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The role a variable plays in the model interface.
///
/// Causality decides in which lifecycle windows a slot may be read or
/// written without a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Causality {
    /// Plain input, readable and writable in every mode.
    Input,
    /// Computed by the model, read-only to callers.
    Output,
    /// Settable only during initialization.
    Parameter,
    /// Settable in initialization or event-processing windows.
    TunableParameter,
    /// Settable in configuration windows; may change the shape of other variables.
    TunableStructuralParameter,
    /// Value sampled at a clock tick.
    ClockedVariable,
    /// The clock itself: an edge indicator.
    ClockTick,
}

impl Causality {
    pub fn as_str(self) -> &'static str {
        match self {
            Causality::Input => "input",
            Causality::Output => "output",
            Causality::Parameter => "parameter",
            Causality::TunableParameter => "tunable parameter",
            Causality::TunableStructuralParameter => "tunable structural parameter",
            Causality::ClockedVariable => "clocked variable",
            Causality::ClockTick => "clock",
        }
    }
}

impl Display for Causality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Status
// ============================================================================

/// Outcome of a single protocol operation.
///
/// Discriminants match the wire numbering used by the simulation-interface
/// standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum Status {
    #[default]
    Ok = 0,
    Warning = 1,
    Discard = 2,
    Error = 3,
    Fatal = 4,
    Pending = 5,
}

impl Status {
    /// Severity rank used when combining statuses. `Pending` sits just above
    /// `Ok`: it is informational, any real problem outranks it.
    fn rank(self) -> u8 {
        match self {
            Status::Ok => 0,
            Status::Pending => 1,
            Status::Warning => 2,
            Status::Discard => 3,
            Status::Error => 4,
            Status::Fatal => 5,
        }
    }

    /// Returns the more severe of two statuses.
    ///
    /// # Examples
    ///
    /// ```
    /// # use cosim_types::Status;
    /// assert_eq!(Status::Ok.worst(Status::Warning), Status::Warning);
    /// assert_eq!(Status::Error.worst(Status::Warning), Status::Error);
    /// ```
    #[must_use]
    pub fn worst(self, other: Status) -> Status {
        if other.rank() > self.rank() { other } else { self }
    }

    /// True for `Error` and `Fatal`, the statuses that leave state untouched.
    pub fn is_failure(self) -> bool {
        matches!(self, Status::Error | Status::Fatal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Warning => "Warning",
            Status::Discard => "Discard",
            Status::Error => "Error",
            Status::Fatal => "Fatal",
            Status::Pending => "Pending",
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromIterator<Status> for Status {
    /// Folds statuses into the most severe one. An empty iterator is `Ok`.
    fn from_iter<I: IntoIterator<Item = Status>>(iter: I) -> Self {
        iter.into_iter().fold(Status::Ok, Status::worst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Status::Ok, Status::Ok => Status::Ok; "ok ok")]
    #[test_case(Status::Ok, Status::Pending => Status::Pending; "pending outranks ok")]
    #[test_case(Status::Pending, Status::Warning => Status::Warning; "warning outranks pending")]
    #[test_case(Status::Warning, Status::Discard => Status::Discard; "discard outranks warning")]
    #[test_case(Status::Error, Status::Discard => Status::Error; "error outranks discard")]
    #[test_case(Status::Fatal, Status::Error => Status::Fatal; "fatal outranks everything")]
    fn worst_status(a: Status, b: Status) -> Status {
        assert_eq!(a.worst(b), b.worst(a), "worst must be symmetric");
        a.worst(b)
    }

    #[test_case(Status::Ok => false; "ok")]
    #[test_case(Status::Warning => false; "warning")]
    #[test_case(Status::Discard => false; "discard")]
    #[test_case(Status::Pending => false; "pending")]
    #[test_case(Status::Error => true; "error")]
    #[test_case(Status::Fatal => true; "fatal")]
    fn failure_statuses(status: Status) -> bool {
        status.is_failure()
    }

    #[test]
    fn status_folds_from_iterator() {
        let folded: Status = [Status::Ok, Status::Warning, Status::Ok].into_iter().collect();
        assert_eq!(folded, Status::Warning);

        let empty: Status = std::iter::empty().collect();
        assert_eq!(empty, Status::Ok);
    }

    #[test]
    fn status_discriminants_follow_wire_numbering() {
        assert_eq!(Status::Ok as u8, 0);
        assert_eq!(Status::Warning as u8, 1);
        assert_eq!(Status::Discard as u8, 2);
        assert_eq!(Status::Error as u8, 3);
        assert_eq!(Status::Fatal as u8, 4);
        assert_eq!(Status::Pending as u8, 5);
    }

    #[test]
    fn value_reference_display_and_conversion() {
        let r = ValueReference::from(1001);
        assert_eq!(r.to_string(), "#1001#");
        assert_eq!(u32::from(r), 1001);
        assert_eq!(refs(&[1, 2]), vec![ValueReference::new(1), ValueReference::new(2)]);
    }

    #[test]
    fn type_tag_serde_roundtrip() {
        for tag in TypeTag::ALL {
            let json = serde_json::to_string(&tag).expect("serialize");
            let back: TypeTag = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(tag, back);
        }
    }
}
