//! # cosim-kernel: Functional core of `cosim`
//!
//! The kernel executes simulation-interface commands against one model
//! instance: it owns the variable store, the clock table and the lifecycle
//! state, and answers each command with a status and a typed payload.
//!
//! ## Key Principles
//!
//! - **No IO**: The kernel never touches sockets, files or the environment
//! - **Single-threaded**: One command runs to completion before the next
//! - **Warn, don't refuse**: Out-of-window accesses are performed and flagged
//! - **Effects, not side effects**: Logging and shutdown are returned as
//!   [`Effect`]s and executed by the [`runtime`]
//!
//! ## Architecture
//!
//! - [`store`]: Typed, causality-classified slots indexed by reference
//! - [`clock`]: Clock intervals and shifts, decimal and fractional
//! - [`lifecycle`]: The mode state machine
//! - [`access`]: Mode-gated read/write policy
//! - [`kernel`]: The [`Dispatcher`] tying it all together
//! - [`snapshot`]: Serialize and restore instance state
//! - [`model`]: The pluggable [`Model`] trait and the [`ReferenceModel`]
//!
//! ## Example
//!
//! ```
//! use cosim_kernel::{Command, Dispatcher, KernelOptions, ModelInstanceConfig, ReferenceModel};
//! use cosim_kernel::reply::Payload;
//! use cosim_types::{Status, TypeTag, Values};
//!
//! let config = ModelInstanceConfig::new("adder", "token");
//! let mut d = Dispatcher::instantiate(config, ReferenceModel::new(), KernelOptions::default())
//!     .unwrap();
//!
//! d.dispatch(Command::set(&[3, 4], Values::Float64(vec![2.0, 3.0]))).unwrap();
//! d.dispatch(Command::EnterInitializationMode {
//!     tolerance: None,
//!     start_time: 0.0,
//!     stop_time: None,
//! })
//! .unwrap();
//! d.dispatch(Command::ExitInitializationMode).unwrap();
//!
//! let reply = d.dispatch(Command::get(TypeTag::Float64, &[5])).unwrap().reply.unwrap();
//! assert_eq!(reply.status, Status::Ok);
//! assert_eq!(reply.payload, Payload::Values(Values::Float64(vec![5.0])));
//! ```

pub mod access;
pub mod clock;
pub mod command;
pub mod effects;
pub mod instance;
pub mod kernel;
pub mod lifecycle;
pub mod log_filter;
pub mod model;
pub mod reply;
pub mod runtime;
pub mod snapshot;
pub mod state_hash;
pub mod store;

#[cfg(test)]
mod tests;

// Re-export commonly used items
pub use clock::{ClockEntry, ClockError, ClockTable, IntervalQualifier};
pub use command::Command;
pub use effects::Effect;
pub use instance::{ExperimentSetup, KernelOptions, ModelInstance, ModelInstanceConfig};
pub use kernel::{Dispatcher, KernelError, Outcome};
pub use lifecycle::{LifecycleState, Transition, TransitionError};
pub use model::{Model, ReferenceModel, StepRequest};
pub use reply::{DiscreteStatesResult, DoStepResult, Payload, Reply};
pub use runtime::{LogSink, NoOpSink, RecordingSink, Runtime};
pub use snapshot::SnapshotError;
pub use store::{SlotDecl, StoreError, VariableStore, VariableValue};
