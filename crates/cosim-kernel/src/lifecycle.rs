//! The lifecycle state machine.
//!
//! ```text
//! Instantiated --EnterInitializationMode--> InitializationMode
//! InitializationMode --ExitInitializationMode--> EventMode | StepMode
//! StepMode <--EnterEventMode / EnterStepMode--> EventMode
//! Instantiated --EnterConfigurationMode--> ConfigurationMode --Exit--> Instantiated
//! StepMode --EnterConfigurationMode--> ReconfigurationMode --Exit--> StepMode
//! Instantiated --Reset--> Instantiated
//! ```
//!
//! Every non-terminal state moves to `Terminated` on `Terminate`. `Reset` is
//! accepted from `Instantiated` only; from any other state it is refused with
//! the state and variables untouched. Anything not
//! listed in [`LifecycleState::apply`] is illegal and leaves the state as it
//! was.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum LifecycleState {
    #[default]
    Instantiated = 0,
    ConfigurationMode = 1,
    ReconfigurationMode = 2,
    InitializationMode = 3,
    EventMode = 4,
    StepMode = 5,
    Terminated = 6,
}

/// A lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transition {
    EnterInitializationMode,
    ExitInitializationMode,
    EnterEventMode,
    EnterStepMode,
    EnterConfigurationMode,
    ExitConfigurationMode,
    Terminate,
    /// Restores defaults. Legal from `Instantiated` only.
    Reset,
}

/// Instance properties that decide guarded transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransitionGuards {
    /// Initialization exits into event mode instead of step mode.
    pub event_mode_used: bool,
    /// At least one tunable structural parameter is declared.
    pub has_structural_parameters: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("{operation} is not allowed in {from}")]
    Illegal {
        from: LifecycleState,
        operation: Transition,
    },

    #[error("cannot enter configuration mode: the model declares no tunable structural parameters")]
    NoStructuralParameters,
}

impl LifecycleState {
    /// Computes the state reached by `transition`, or why it is refused.
    pub fn apply(
        self,
        transition: Transition,
        guards: TransitionGuards,
    ) -> Result<LifecycleState, TransitionError> {
        use LifecycleState as S;
        use Transition as T;

        let next = match (self, transition) {
            (S::Instantiated, T::EnterInitializationMode) => S::InitializationMode,
            (S::InitializationMode, T::ExitInitializationMode) => {
                if guards.event_mode_used {
                    S::EventMode
                } else {
                    S::StepMode
                }
            }
            (S::StepMode, T::EnterEventMode) => S::EventMode,
            (S::EventMode, T::EnterStepMode) => S::StepMode,
            (S::Instantiated | S::StepMode, T::EnterConfigurationMode)
                if !guards.has_structural_parameters =>
            {
                return Err(TransitionError::NoStructuralParameters);
            }
            (S::Instantiated, T::EnterConfigurationMode) => S::ConfigurationMode,
            (S::StepMode, T::EnterConfigurationMode) => S::ReconfigurationMode,
            (S::ConfigurationMode, T::ExitConfigurationMode) => S::Instantiated,
            (S::ReconfigurationMode, T::ExitConfigurationMode) => S::StepMode,
            (from, T::Terminate) if !from.is_terminal() => S::Terminated,
            (S::Instantiated, T::Reset) => S::Instantiated,
            (from, operation) => return Err(TransitionError::Illegal { from, operation }),
        };
        Ok(next)
    }

    /// True once `Terminate` has been applied.
    pub fn is_terminal(self) -> bool {
        self == LifecycleState::Terminated
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Instantiated => "instantiated",
            LifecycleState::ConfigurationMode => "configuration mode",
            LifecycleState::ReconfigurationMode => "reconfiguration mode",
            LifecycleState::InitializationMode => "initialization mode",
            LifecycleState::EventMode => "event mode",
            LifecycleState::StepMode => "step mode",
            LifecycleState::Terminated => "terminated",
        }
    }
}

impl Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Transition {
    pub fn as_str(self) -> &'static str {
        match self {
            Transition::EnterInitializationMode => "EnterInitializationMode",
            Transition::ExitInitializationMode => "ExitInitializationMode",
            Transition::EnterEventMode => "EnterEventMode",
            Transition::EnterStepMode => "EnterStepMode",
            Transition::EnterConfigurationMode => "EnterConfigurationMode",
            Transition::ExitConfigurationMode => "ExitConfigurationMode",
            Transition::Terminate => "Terminate",
            Transition::Reset => "Reset",
        }
    }
}

impl Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
