//! # cosim
//!
//! Co-simulation model backend with a pure command kernel.
//!
//! A host (an FMI-style importer, or the transport process standing in for
//! one) feeds commands to a [`Backend`] one at a time and gets one reply per
//! command. The backend owns a single model instance: its variables, clocks
//! and lifecycle mode.
//!
//! # Architecture
//!
//! ```text
//! host ──Command──▶ Backend ──▶ Dispatcher (pure) ──▶ Reply
//!                                     │
//!                                  Effects ──▶ Runtime ──▶ tracing / LogSink
//! ```
//!
//! # Quick Start
//!
//! ```
//! use cosim::{Backend, BackendConfig, Command, ReferenceModel};
//! use cosim::kernel::{NoOpSink, Payload};
//! use cosim::types::{Status, TypeTag, Values};
//!
//! let config = BackendConfig::default();
//! let mut backend =
//!     Backend::with_defaults("adder", "token", ReferenceModel::new(), NoOpSink, &config)?;
//!
//! backend.handle(Command::set(&[3, 4], Values::Float64(vec![2.0, 3.0])))?;
//! backend.handle(Command::EnterInitializationMode {
//!     tolerance: None,
//!     start_time: 0.0,
//!     stop_time: None,
//! })?;
//! backend.handle(Command::ExitInitializationMode)?;
//!
//! let reply = backend.handle(Command::get(TypeTag::Float64, &[5]))?.expect("reply");
//! assert_eq!(reply.status, Status::Ok);
//! assert_eq!(reply.payload, Payload::Values(Values::Float64(vec![5.0])));
//! # Ok::<(), cosim::BackendError>(())
//! ```

mod backend;
mod error;
mod logging;

pub use backend::{Backend, decode_reply, encode_command, instance_config, kernel_options};
pub use error::{BackendError, BackendResult};
pub use logging::{build_filter, init_tracing};

// Re-export the layers underneath
pub use cosim_config as config;
pub use cosim_kernel as kernel;
pub use cosim_types as types;

pub use cosim_config::{BackendConfig, ConfigLoader};
pub use cosim_kernel::{Command, Model, ModelInstanceConfig, ReferenceModel, Reply};
