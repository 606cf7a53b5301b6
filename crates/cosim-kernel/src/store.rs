//! The variable store: typed, causality-classified slots indexed by reference.
//!
//! Slots live in an arena ordered by reference, with a `BTreeMap` from
//! [`ValueReference`] to arena position. The store knows nothing about the
//! lifecycle; mode-gated access is decided by the dispatcher before it calls
//! [`VariableStore::get`] or [`VariableStore::set`].
//!
//! Batched operations process references strictly in input order. A repeated
//! reference is read or written once per occurrence; the last write wins.

use std::collections::BTreeMap;

use cosim_types::{Causality, TypeTag, Value, ValueReference, Values};
use serde::{Deserialize, Serialize};

/// Upper bound on the element count of an array slot after a structural resize.
pub const MAX_ARRAY_LEN: usize = 1 << 20;

// ============================================================================
// Values held by slots
// ============================================================================

/// The current content of a slot: a single value or a fixed-type array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VariableValue {
    Scalar(Value),
    Array(Vec<Value>),
}

impl VariableValue {
    /// Number of values a batched get yields for this slot.
    pub fn len(&self) -> usize {
        match self {
            VariableValue::Scalar(_) => 1,
            VariableValue::Array(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn elements(&self) -> &[Value] {
        match self {
            VariableValue::Scalar(value) => std::slice::from_ref(value),
            VariableValue::Array(values) => values,
        }
    }

    fn matches(&self, tag: TypeTag) -> bool {
        self.elements().iter().all(|v| v.type_tag() == tag)
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// Declaration of one variable, as provided by a model.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotDecl {
    pub reference: ValueReference,
    pub name: String,
    pub type_tag: TypeTag,
    pub causality: Causality,
    pub default: VariableValue,
    /// Structural parameter holding this array's length.
    pub dimension: Option<ValueReference>,
}

impl SlotDecl {
    /// Declares a scalar slot. The type is taken from the default value.
    pub fn scalar(
        reference: u32,
        name: impl Into<String>,
        causality: Causality,
        default: Value,
    ) -> Self {
        Self {
            reference: ValueReference::new(reference),
            name: name.into(),
            type_tag: default.type_tag(),
            causality,
            default: VariableValue::Scalar(default),
            dimension: None,
        }
    }

    /// Declares an array slot whose length follows the structural parameter
    /// at `dimension`.
    pub fn array(
        reference: u32,
        name: impl Into<String>,
        causality: Causality,
        type_tag: TypeTag,
        default: Vec<Value>,
        dimension: u32,
    ) -> Self {
        Self {
            reference: ValueReference::new(reference),
            name: name.into(),
            type_tag,
            causality,
            default: VariableValue::Array(default),
            dimension: Some(ValueReference::new(dimension)),
        }
    }
}

/// A declared slot together with its live value.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    decl: SlotDecl,
    value: VariableValue,
}

impl Slot {
    pub fn reference(&self) -> ValueReference {
        self.decl.reference
    }

    pub fn name(&self) -> &str {
        &self.decl.name
    }

    pub fn type_tag(&self) -> TypeTag {
        self.decl.type_tag
    }

    pub fn causality(&self) -> Causality {
        self.decl.causality
    }

    pub fn dimension(&self) -> Option<ValueReference> {
        self.decl.dimension
    }

    pub fn value(&self) -> &VariableValue {
        &self.value
    }

    pub fn default_value(&self) -> &VariableValue {
        &self.decl.default
    }

    /// Element used to pad an array at `index` when it grows: the declared
    /// default at that position, or the type's zero value beyond it.
    fn padding_at(&self, index: usize) -> Value {
        match &self.decl.default {
            VariableValue::Array(defaults) => defaults
                .get(index)
                .cloned()
                .unwrap_or_else(|| Value::zero(self.decl.type_tag)),
            VariableValue::Scalar(_) => Value::zero(self.decl.type_tag),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("unknown value reference {0}")]
    UnknownReference(ValueReference),

    #[error("{references} references address {expected} values, but {actual} were supplied")]
    LengthMismatch {
        references: usize,
        expected: usize,
        actual: usize,
    },

    #[error("variable {reference} has type {expected}, not {actual}")]
    TypeMismatch {
        reference: ValueReference,
        expected: TypeTag,
        actual: TypeTag,
    },

    #[error("variable {0} is not an array")]
    NotAnArray(ValueReference),

    #[error("variable {0} is an array and cannot be accessed as a scalar")]
    NotAScalar(ValueReference),

    #[error("value reference {0} is declared more than once")]
    DuplicateReference(ValueReference),

    #[error("dimension {dimension} of {reference} is not a uint64 structural parameter")]
    InvalidDimension {
        reference: ValueReference,
        dimension: ValueReference,
    },

    #[error("dimension of {reference} is {length}, above the limit of {max}", max = MAX_ARRAY_LEN)]
    DimensionTooLarge {
        reference: ValueReference,
        length: u64,
    },
}

// ============================================================================
// Store
// ============================================================================

/// All variable slots of one model instance.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableStore {
    slots: Vec<Slot>,
    index: BTreeMap<ValueReference, usize>,
}

impl VariableStore {
    /// Builds a store from declarations, every slot holding its default.
    ///
    /// Rejects duplicate references, defaults whose type disagrees with the
    /// declared tag, and array dimensions that do not name a `UInt64`
    /// structural parameter.
    pub fn new(decls: Vec<SlotDecl>) -> Result<Self, StoreError> {
        let mut decls = decls;
        decls.sort_by_key(|decl| decl.reference);

        let mut index = BTreeMap::new();
        let mut slots = Vec::with_capacity(decls.len());
        for decl in decls {
            if index.insert(decl.reference, slots.len()).is_some() {
                return Err(StoreError::DuplicateReference(decl.reference));
            }
            if let Some(wrong) = decl
                .default
                .elements()
                .iter()
                .find(|v| v.type_tag() != decl.type_tag)
            {
                return Err(StoreError::TypeMismatch {
                    reference: decl.reference,
                    expected: decl.type_tag,
                    actual: wrong.type_tag(),
                });
            }
            slots.push(Slot {
                value: decl.default.clone(),
                decl,
            });
        }

        let store = Self { slots, index };
        for slot in &store.slots {
            if let Some(dimension) = slot.dimension() {
                let valid = store.slot(dimension).is_ok_and(|dim| {
                    dim.causality() == Causality::TunableStructuralParameter
                        && dim.type_tag() == TypeTag::UInt64
                        && matches!(dim.value(), VariableValue::Scalar(_))
                });
                if !valid {
                    return Err(StoreError::InvalidDimension {
                        reference: slot.reference(),
                        dimension,
                    });
                }
            }
        }

        // Postcondition: index and arena agree
        debug_assert_eq!(store.index.len(), store.slots.len());
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterates slots in ascending reference order.
    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }

    pub fn contains(&self, reference: ValueReference) -> bool {
        self.index.contains_key(&reference)
    }

    pub fn slot(&self, reference: ValueReference) -> Result<&Slot, StoreError> {
        let position = self.position(reference)?;
        Ok(&self.slots[position])
    }

    pub fn causality(&self, reference: ValueReference) -> Result<Causality, StoreError> {
        self.slot(reference).map(Slot::causality)
    }

    pub fn has_causality(&self, causality: Causality) -> bool {
        self.slots.iter().any(|slot| slot.causality() == causality)
    }

    /// References of every slot with the given type, in reference order.
    pub fn references_of_type(&self, tag: TypeTag) -> Vec<ValueReference> {
        self.slots
            .iter()
            .filter(|slot| slot.type_tag() == tag)
            .map(Slot::reference)
            .collect()
    }

    /// Reads the given references as one flat batch, arrays expanded in place.
    pub fn get(&self, tag: TypeTag, refs: &[ValueReference]) -> Result<Values, StoreError> {
        let mut out = Values::empty(tag);
        for &reference in refs {
            let slot = self.typed_slot(reference, tag)?;
            for value in slot.value.elements() {
                // Slot values always carry the slot's tag
                let pushed = out.push(value.clone());
                debug_assert!(pushed.is_ok(), "slot {reference} holds a mistyped value");
            }
        }
        Ok(out)
    }

    /// Writes a flat batch into the given references.
    ///
    /// Each reference consumes as many values as its slot currently holds.
    /// The whole batch is validated before anything is written, so a failed
    /// set leaves the store untouched.
    pub fn set(&mut self, refs: &[ValueReference], values: Values) -> Result<(), StoreError> {
        let tag = values.type_tag();

        let mut targets = Vec::with_capacity(refs.len());
        let mut expected = 0;
        for &reference in refs {
            let position = self.position(reference)?;
            let slot = &self.slots[position];
            if slot.type_tag() != tag {
                return Err(StoreError::TypeMismatch {
                    reference,
                    expected: slot.type_tag(),
                    actual: tag,
                });
            }
            let width = slot.value.len();
            expected += width;
            targets.push((position, width));
        }
        if expected != values.len() {
            return Err(StoreError::LengthMismatch {
                references: refs.len(),
                expected,
                actual: values.len(),
            });
        }

        let mut incoming = values.into_values().into_iter();
        for (position, width) in targets {
            let slot = &mut self.slots[position];
            match &mut slot.value {
                VariableValue::Scalar(current) => {
                    if let Some(value) = incoming.next() {
                        *current = value;
                    }
                }
                VariableValue::Array(current) => {
                    current.clear();
                    current.extend(incoming.by_ref().take(width));
                }
            }
        }

        // Postcondition: every value was consumed
        debug_assert!(incoming.next().is_none());
        Ok(())
    }

    /// Reads a scalar slot.
    pub fn scalar(&self, reference: ValueReference) -> Result<&Value, StoreError> {
        match &self.slot(reference)?.value {
            VariableValue::Scalar(value) => Ok(value),
            VariableValue::Array(_) => Err(StoreError::NotAScalar(reference)),
        }
    }

    /// Overwrites a scalar slot. Used by models to publish computed outputs.
    pub fn write(&mut self, reference: ValueReference, value: Value) -> Result<(), StoreError> {
        let position = self.position(reference)?;
        let slot = &mut self.slots[position];
        if slot.type_tag() != value.type_tag() {
            return Err(StoreError::TypeMismatch {
                reference,
                expected: slot.type_tag(),
                actual: value.type_tag(),
            });
        }
        match &mut slot.value {
            VariableValue::Scalar(current) => {
                *current = value;
                Ok(())
            }
            VariableValue::Array(_) => Err(StoreError::NotAScalar(reference)),
        }
    }

    /// Current element count of an array slot.
    pub fn array_len(&self, reference: ValueReference) -> Result<usize, StoreError> {
        match &self.slot(reference)?.value {
            VariableValue::Array(values) => Ok(values.len()),
            VariableValue::Scalar(_) => Err(StoreError::NotAnArray(reference)),
        }
    }

    /// Restores every slot to its declared default.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.value = slot.decl.default.clone();
        }
    }

    /// Resizes every array slot to the current value of its structural
    /// parameter, truncating or padding as needed.
    ///
    /// All new lengths are validated before any slot is touched.
    pub fn resize_dependent_arrays(&mut self) -> Result<(), StoreError> {
        let mut plan = Vec::new();
        for (position, slot) in self.slots.iter().enumerate() {
            let Some(dimension) = slot.dimension() else {
                continue;
            };
            let length = self
                .scalar(dimension)?
                .as_u64()
                .ok_or(StoreError::InvalidDimension {
                    reference: slot.reference(),
                    dimension,
                })?;
            let new_len = usize::try_from(length)
                .ok()
                .filter(|len| *len <= MAX_ARRAY_LEN)
                .ok_or(StoreError::DimensionTooLarge {
                    reference: slot.reference(),
                    length,
                })?;
            plan.push((position, new_len));
        }

        for (position, new_len) in plan {
            let padding: Vec<Value> = {
                let slot = &self.slots[position];
                (slot.value.len()..new_len).map(|i| slot.padding_at(i)).collect()
            };
            if let VariableValue::Array(values) = &mut self.slots[position].value {
                values.truncate(new_len);
                values.extend(padding);
                debug_assert_eq!(values.len(), new_len);
            }
        }
        Ok(())
    }

    /// Replaces every slot value at once.
    ///
    /// `values` must list one entry per slot, in reference order, each
    /// matching its slot's type and shape. Nothing is written on failure.
    pub(crate) fn replace_values(
        &mut self,
        values: Vec<(ValueReference, VariableValue)>,
    ) -> Result<(), StoreError> {
        if values.len() != self.slots.len() {
            return Err(StoreError::LengthMismatch {
                references: self.slots.len(),
                expected: self.slots.len(),
                actual: values.len(),
            });
        }
        for (slot, (reference, value)) in self.slots.iter().zip(&values) {
            if slot.reference() != *reference {
                return Err(StoreError::UnknownReference(*reference));
            }
            let same_shape = matches!(
                (&slot.value, value),
                (VariableValue::Scalar(_), VariableValue::Scalar(_))
                    | (VariableValue::Array(_), VariableValue::Array(_))
            );
            if !same_shape {
                return Err(StoreError::NotAnArray(*reference));
            }
            if !value.matches(slot.type_tag()) {
                return Err(StoreError::TypeMismatch {
                    reference: *reference,
                    expected: slot.type_tag(),
                    actual: value
                        .elements()
                        .iter()
                        .map(Value::type_tag)
                        .find(|tag| *tag != slot.type_tag())
                        .unwrap_or(slot.type_tag()),
                });
            }
            if let VariableValue::Array(elements) = value
                && elements.len() > MAX_ARRAY_LEN
            {
                return Err(StoreError::DimensionTooLarge {
                    reference: *reference,
                    length: elements.len() as u64,
                });
            }
        }

        for (slot, (_, value)) in self.slots.iter_mut().zip(values) {
            slot.value = value;
        }
        Ok(())
    }

    fn position(&self, reference: ValueReference) -> Result<usize, StoreError> {
        self.index
            .get(&reference)
            .copied()
            .ok_or(StoreError::UnknownReference(reference))
    }

    fn typed_slot(&self, reference: ValueReference, tag: TypeTag) -> Result<&Slot, StoreError> {
        let slot = self.slot(reference)?;
        if slot.type_tag() != tag {
            return Err(StoreError::TypeMismatch {
                reference,
                expected: slot.type_tag(),
                actual: tag,
            });
        }
        Ok(slot)
    }
}
