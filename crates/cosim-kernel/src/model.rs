//! The pluggable model and the reference conformance model.
//!
//! A [`Model`] declares its variables and default clocks, and computes
//! derived values when the dispatcher asks it to. Hooks receive the live
//! [`VariableStore`] and publish results with [`VariableStore::write`]. A hook
//! returning `Err` is an irrecoverable model failure: the dispatcher answers
//! `Fatal` and the instance latches.

use bytes::Bytes;
use cosim_types::{Causality, Status, TypeTag, Value, ValueReference};

use crate::clock::ClockEntry;
use crate::instance::ExperimentSetup;
use crate::reply::{DiscreteStatesResult, DoStepResult};
use crate::store::{SlotDecl, StoreError, VariableStore};

/// Arguments of a communication step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepRequest {
    pub current_time: f64,
    pub step_size: f64,
    pub no_set_state_prior: bool,
}

pub trait Model {
    /// Every variable of the model. Called once at instantiation.
    fn variables(&self) -> Vec<SlotDecl>;

    /// Intervals and shifts the clock table starts with and resets to.
    fn default_clocks(&self) -> Vec<ClockEntry> {
        Vec::new()
    }

    /// Called when initialization begins.
    fn setup_experiment(&mut self, _setup: &ExperimentSetup) {}

    /// Recomputes outputs from inputs.
    fn update_outputs(&mut self, store: &mut VariableStore) -> Result<Status, StoreError>;

    /// Recomputes clocks derived from other clocks. Runs after every clock write.
    fn update_clocks(&mut self, _store: &mut VariableStore) -> Result<Status, StoreError> {
        Ok(Status::Ok)
    }

    /// Recomputes clocked outputs. Runs from discrete state updates only.
    fn update_clocked_outputs(&mut self, _store: &mut VariableStore) -> Result<Status, StoreError> {
        Ok(Status::Ok)
    }

    /// Advances the model by one communication step.
    ///
    /// The default completes the full step after recomputing outputs.
    fn do_step(
        &mut self,
        store: &mut VariableStore,
        step: StepRequest,
    ) -> Result<(Status, DoStepResult), StoreError> {
        let status = self.update_outputs(store)?;
        Ok((
            status,
            DoStepResult::completed(step.current_time, step.step_size),
        ))
    }

    fn update_discrete_states(
        &mut self,
        store: &mut VariableStore,
    ) -> Result<(Status, DiscreteStatesResult), StoreError> {
        let status = self.update_clocked_outputs(store)?;
        Ok((status, DiscreteStatesResult::default()))
    }

    /// Asks the model to abandon a step in progress.
    fn cancel_step(&mut self) -> Status {
        Status::Ok
    }
}

// ============================================================================
// Reference Model
// ============================================================================

/// Variable layout of the reference model.
pub mod layout {
    /// First reference of the `<type>_a`, `<type>_b`, `<type>_c` triples.
    /// Triple `k` occupies `3k`, `3k + 1` and `3k + 2`.
    pub const TRIPLES: u32 = 0;
    /// First tunable parameter; one per value type.
    pub const TUNABLE_PARAMETERS: u32 = 100;
    pub const STRUCTURAL_PARAMETER: u32 = 113;
    pub const DIMENSIONED_VECTOR: u32 = 114;
    pub const CLOCK_A: u32 = 1001;
    pub const CLOCK_B: u32 = 1002;
    pub const CLOCK_C: u32 = 1003;
    pub const CLOCKED_A: u32 = 1100;
    pub const CLOCKED_B: u32 = 1101;
    pub const CLOCKED_C: u32 = 1102;
}

/// Value types with an input/input/output triple, in reference order.
const TRIPLE_TYPES: [TypeTag; 13] = [
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
];

/// The conformance model.
///
/// Each output `<type>_c` combines its inputs `<type>_a` and `<type>_b`:
/// numbers add (integers wrap), booleans OR, strings concatenate and
/// binaries XOR byte-wise up to the shorter operand. `clock_c` is
/// `clock_a AND clock_b`, and `clocked_variable_c` accumulates
/// `clocked_variable_a + clocked_variable_b` on every discrete state update.
/// Both derived slots are outputs, so reading them never warns.
#[derive(Debug, Clone, Default)]
pub struct ReferenceModel;

impl ReferenceModel {
    pub fn new() -> Self {
        Self
    }
}

impl Model for ReferenceModel {
    fn variables(&self) -> Vec<SlotDecl> {
        use layout::{
            CLOCK_A, CLOCK_B, CLOCK_C, CLOCKED_A, CLOCKED_B, CLOCKED_C, DIMENSIONED_VECTOR,
            STRUCTURAL_PARAMETER, TRIPLES, TUNABLE_PARAMETERS,
        };

        let mut decls = Vec::new();
        for (k, tag) in (0u32..).zip(TRIPLE_TYPES) {
            let base = TRIPLES + 3 * k;
            for (offset, suffix, causality) in [
                (0, "a", Causality::Input),
                (1, "b", Causality::Input),
                (2, "c", Causality::Output),
            ] {
                decls.push(SlotDecl::scalar(
                    base + offset,
                    format!("{tag}_{suffix}"),
                    causality,
                    Value::zero(tag),
                ));
            }
            decls.push(SlotDecl::scalar(
                TUNABLE_PARAMETERS + k,
                format!("{tag}_tunable_parameter"),
                Causality::TunableParameter,
                Value::zero(tag),
            ));
        }

        decls.push(SlotDecl::scalar(
            STRUCTURAL_PARAMETER,
            "uint64_tunable_structural_parameter",
            Causality::TunableStructuralParameter,
            Value::UInt64(5),
        ));
        decls.push(SlotDecl::array(
            DIMENSIONED_VECTOR,
            "float32_vector_using_tunable_structural_parameter",
            Causality::TunableParameter,
            TypeTag::Float32,
            [0.1, 0.2, 0.3, 0.4, 0.5].into_iter().map(Value::Float32).collect(),
            STRUCTURAL_PARAMETER,
        ));

        for (reference, name, causality, default) in [
            (CLOCK_A, "clock_a", Causality::ClockTick, Value::Clock(false)),
            (CLOCK_B, "clock_b", Causality::ClockTick, Value::Clock(false)),
            (CLOCK_C, "clock_c", Causality::Output, Value::Clock(false)),
            (CLOCKED_A, "clocked_variable_a", Causality::ClockedVariable, Value::Int32(0)),
            (CLOCKED_B, "clocked_variable_b", Causality::ClockedVariable, Value::Int32(0)),
            (CLOCKED_C, "clocked_variable_c", Causality::Output, Value::Int32(0)),
        ] {
            decls.push(SlotDecl::scalar(reference, name, causality, default));
        }

        decls
    }

    fn default_clocks(&self) -> Vec<ClockEntry> {
        vec![ClockEntry::new(layout::CLOCK_A, 1.0, 1.0)]
    }

    fn update_outputs(&mut self, store: &mut VariableStore) -> Result<Status, StoreError> {
        for k in 0..TRIPLE_TYPES.len() as u32 {
            let base = layout::TRIPLES + 3 * k;
            let a = store.scalar(ValueReference::new(base))?;
            let b = store.scalar(ValueReference::new(base + 1))?;
            if let Some(c) = combine(a, b) {
                store.write(ValueReference::new(base + 2), c)?;
            }
        }
        Ok(Status::Ok)
    }

    fn update_clocks(&mut self, store: &mut VariableStore) -> Result<Status, StoreError> {
        let a = store.scalar(ValueReference::new(layout::CLOCK_A))?;
        let b = store.scalar(ValueReference::new(layout::CLOCK_B))?;
        if let Some(c) = combine(a, b) {
            store.write(ValueReference::new(layout::CLOCK_C), c)?;
        }
        Ok(Status::Ok)
    }

    fn update_clocked_outputs(&mut self, store: &mut VariableStore) -> Result<Status, StoreError> {
        let read = |reference: u32| match store.scalar(ValueReference::new(reference)) {
            Ok(Value::Int32(v)) => Ok(*v),
            Ok(other) => Err(StoreError::TypeMismatch {
                reference: ValueReference::new(reference),
                expected: TypeTag::Int32,
                actual: other.type_tag(),
            }),
            Err(e) => Err(e),
        };
        let sum = read(layout::CLOCKED_C)?
            .wrapping_add(read(layout::CLOCKED_A)?)
            .wrapping_add(read(layout::CLOCKED_B)?);
        store.write(ValueReference::new(layout::CLOCKED_C), Value::Int32(sum))?;
        Ok(Status::Ok)
    }

    fn update_discrete_states(
        &mut self,
        store: &mut VariableStore,
    ) -> Result<(Status, DiscreteStatesResult), StoreError> {
        let status = self.update_clocked_outputs(store)?;
        Ok((
            status,
            DiscreteStatesResult {
                next_event_time_defined: true,
                next_event_time: 1.0,
                ..DiscreteStatesResult::default()
            },
        ))
    }
}

/// Combines two inputs of the same type into the reference output.
fn combine(a: &Value, b: &Value) -> Option<Value> {
    let combined = match (a, b) {
        (Value::Float32(a), Value::Float32(b)) => Value::Float32(a + b),
        (Value::Float64(a), Value::Float64(b)) => Value::Float64(a + b),
        (Value::Int8(a), Value::Int8(b)) => Value::Int8(a.wrapping_add(*b)),
        (Value::UInt8(a), Value::UInt8(b)) => Value::UInt8(a.wrapping_add(*b)),
        (Value::Int16(a), Value::Int16(b)) => Value::Int16(a.wrapping_add(*b)),
        (Value::UInt16(a), Value::UInt16(b)) => Value::UInt16(a.wrapping_add(*b)),
        (Value::Int32(a), Value::Int32(b)) => Value::Int32(a.wrapping_add(*b)),
        (Value::UInt32(a), Value::UInt32(b)) => Value::UInt32(a.wrapping_add(*b)),
        (Value::Int64(a), Value::Int64(b)) => Value::Int64(a.wrapping_add(*b)),
        (Value::UInt64(a), Value::UInt64(b)) => Value::UInt64(a.wrapping_add(*b)),
        (Value::Boolean(a), Value::Boolean(b)) => Value::Boolean(*a || *b),
        (Value::String(a), Value::String(b)) => Value::String(format!("{a}{b}")),
        (Value::Binary(a), Value::Binary(b)) => {
            let xored: Vec<u8> = a.iter().zip(b.iter()).map(|(x, y)| x ^ y).collect();
            Value::Binary(Bytes::from(xored))
        }
        (Value::Clock(a), Value::Clock(b)) => Value::Clock(*a && *b),
        _ => return None,
    };
    Some(combined)
}
