//! Replies produced by the dispatcher.

use bytes::Bytes;
use cosim_types::{Status, Values};
use serde::{Deserialize, Serialize};

use crate::clock::IntervalQualifier;

/// One reply per dispatched command: a status and an operation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub status: Status,
    pub payload: Payload,
}

impl Reply {
    pub fn new(status: Status, payload: Payload) -> Self {
        Self { status, payload }
    }

    /// A reply carrying only a status.
    pub fn status(status: Status) -> Self {
        Self::new(status, Payload::Empty)
    }

    pub fn ok() -> Self {
        Self::status(Status::Ok)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Empty,
    Values(Values),
    IntervalDecimal {
        intervals: Vec<f64>,
        qualifiers: Vec<IntervalQualifier>,
    },
    IntervalFraction {
        counters: Vec<u64>,
        resolutions: Vec<u64>,
        qualifiers: Vec<IntervalQualifier>,
    },
    ShiftDecimal {
        shifts: Vec<f64>,
    },
    ShiftFraction {
        counters: Vec<u64>,
        resolutions: Vec<u64>,
    },
    DoStep(DoStepResult),
    DiscreteStates(DiscreteStatesResult),
    State(Bytes),
}

/// Outcome of a communication step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoStepResult {
    pub event_handling_needed: bool,
    pub terminate_simulation: bool,
    /// The model stopped before `current_time + step_size`.
    pub early_return: bool,
    pub last_successful_time: f64,
}

impl DoStepResult {
    /// A step that reached `current_time + step_size` with no events.
    pub fn completed(current_time: f64, step_size: f64) -> Self {
        Self {
            event_handling_needed: false,
            terminate_simulation: false,
            early_return: false,
            last_successful_time: current_time + step_size,
        }
    }
}

/// Outcome of a discrete state update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscreteStatesResult {
    pub discrete_states_need_update: bool,
    pub terminate_simulation: bool,
    pub nominals_continuous_states_changed: bool,
    pub values_continuous_states_changed: bool,
    pub next_event_time_defined: bool,
    pub next_event_time: f64,
}

impl Default for DiscreteStatesResult {
    fn default() -> Self {
        Self {
            discrete_states_need_update: false,
            terminate_simulation: false,
            nominals_continuous_states_changed: false,
            values_continuous_states_changed: false,
            next_event_time_defined: false,
            next_event_time: 0.0,
        }
    }
}
