//! Commands accepted by the dispatcher.
//!
//! The set is closed: the host's decoder resolves every incoming message to
//! exactly one variant, and the dispatcher matches on all of them.

use bytes::Bytes;
use cosim_types::{LogCategory, TypeTag, ValueReference, Values};
use serde::{Deserialize, Serialize};

use crate::lifecycle::Transition;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    // ========================================================================
    // Lifecycle
    // ========================================================================
    EnterInitializationMode {
        tolerance: Option<f64>,
        start_time: f64,
        stop_time: Option<f64>,
    },
    ExitInitializationMode,
    EnterEventMode,
    EnterStepMode,
    EnterConfigurationMode,
    ExitConfigurationMode,
    Terminate,
    Reset,
    /// Ends the instance. No reply is produced.
    FreeInstance,

    // ========================================================================
    // Logging
    // ========================================================================
    SetDebugLogging {
        logging_on: bool,
        categories: Vec<LogCategory>,
    },

    // ========================================================================
    // Variable Access
    // ========================================================================
    /// Writes a typed batch. The type is the batch's own.
    Set {
        refs: Vec<ValueReference>,
        values: Values,
    },
    Get {
        type_tag: TypeTag,
        refs: Vec<ValueReference>,
    },

    // ========================================================================
    // Clocks
    // ========================================================================
    SetIntervalDecimal {
        refs: Vec<ValueReference>,
        intervals: Vec<f64>,
    },
    SetIntervalFraction {
        refs: Vec<ValueReference>,
        counters: Vec<u64>,
        resolutions: Vec<u64>,
    },
    SetShiftDecimal {
        refs: Vec<ValueReference>,
        shifts: Vec<f64>,
    },
    SetShiftFraction {
        refs: Vec<ValueReference>,
        counters: Vec<u64>,
        resolutions: Vec<u64>,
    },
    GetIntervalDecimal {
        refs: Vec<ValueReference>,
    },
    GetIntervalFraction {
        refs: Vec<ValueReference>,
    },
    GetShiftDecimal {
        refs: Vec<ValueReference>,
    },
    GetShiftFraction {
        refs: Vec<ValueReference>,
    },

    // ========================================================================
    // Stepping
    // ========================================================================
    DoStep {
        current_time: f64,
        step_size: f64,
        no_set_state_prior: bool,
    },
    UpdateDiscreteStates,
    CancelStep,

    // ========================================================================
    // Snapshots
    // ========================================================================
    SerializeState,
    DeserializeState {
        state: Bytes,
    },
}

impl Command {
    /// Convenience constructor for a typed set.
    pub fn set(refs: &[u32], values: Values) -> Self {
        Command::Set {
            refs: cosim_types::refs(refs),
            values,
        }
    }

    /// Convenience constructor for a typed get.
    pub fn get(type_tag: TypeTag, refs: &[u32]) -> Self {
        Command::Get {
            type_tag,
            refs: cosim_types::refs(refs),
        }
    }

    /// Operation name, used in logs and spans.
    pub fn name(&self) -> &'static str {
        match self {
            Command::EnterInitializationMode { .. } => "EnterInitializationMode",
            Command::ExitInitializationMode => "ExitInitializationMode",
            Command::EnterEventMode => "EnterEventMode",
            Command::EnterStepMode => "EnterStepMode",
            Command::EnterConfigurationMode => "EnterConfigurationMode",
            Command::ExitConfigurationMode => "ExitConfigurationMode",
            Command::Terminate => "Terminate",
            Command::Reset => "Reset",
            Command::FreeInstance => "FreeInstance",
            Command::SetDebugLogging { .. } => "SetDebugLogging",
            Command::Set { .. } => "Set",
            Command::Get { .. } => "Get",
            Command::SetIntervalDecimal { .. } => "SetIntervalDecimal",
            Command::SetIntervalFraction { .. } => "SetIntervalFraction",
            Command::SetShiftDecimal { .. } => "SetShiftDecimal",
            Command::SetShiftFraction { .. } => "SetShiftFraction",
            Command::GetIntervalDecimal { .. } => "GetIntervalDecimal",
            Command::GetIntervalFraction { .. } => "GetIntervalFraction",
            Command::GetShiftDecimal { .. } => "GetShiftDecimal",
            Command::GetShiftFraction { .. } => "GetShiftFraction",
            Command::DoStep { .. } => "DoStep",
            Command::UpdateDiscreteStates => "UpdateDiscreteStates",
            Command::CancelStep => "CancelStep",
            Command::SerializeState => "SerializeState",
            Command::DeserializeState { .. } => "DeserializeState",
        }
    }

    /// The lifecycle transition this command requests, if any.
    pub fn transition(&self) -> Option<Transition> {
        match self {
            Command::EnterInitializationMode { .. } => Some(Transition::EnterInitializationMode),
            Command::ExitInitializationMode => Some(Transition::ExitInitializationMode),
            Command::EnterEventMode => Some(Transition::EnterEventMode),
            Command::EnterStepMode => Some(Transition::EnterStepMode),
            Command::EnterConfigurationMode => Some(Transition::EnterConfigurationMode),
            Command::ExitConfigurationMode => Some(Transition::ExitConfigurationMode),
            Command::Terminate => Some(Transition::Terminate),
            Command::Reset => Some(Transition::Reset),
            _ => None,
        }
    }

    /// Commands still honored after the instance has latched `Fatal`.
    pub fn survives_fatal(&self) -> bool {
        matches!(self, Command::Terminate | Command::FreeInstance)
    }
}
