//! Effects produced by the dispatcher.
//!
//! The dispatcher never logs or signals the host directly. It returns
//! effects next to each reply, and the [`crate::runtime::Runtime`] executes
//! them.

use cosim_types::{LogCategory, Status};
use serde::{Deserialize, Serialize};

use crate::lifecycle::LifecycleState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// A message for the host's logger.
    Log {
        status: Status,
        category: LogCategory,
        message: String,
    },

    /// The lifecycle state changed.
    LifecycleChanged {
        from: LifecycleState,
        to: LifecycleState,
    },

    /// The instance was freed; the host must stop feeding commands.
    Shutdown,
}

impl Effect {
    /// A log message filed under the category of its status.
    pub fn log(status: Status, message: impl Into<String>) -> Self {
        Effect::Log {
            status,
            category: LogCategory::for_status(status),
            message: message.into(),
        }
    }
}
