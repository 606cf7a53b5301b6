//! Mode-gated access policy.
//!
//! [`classify`] decides whether reading or writing a slot of a given
//! causality is within its lifecycle window. Out-of-window accesses are not
//! refused: they classify as [`AccessClass::SoftWarn`], and the dispatcher
//! performs them anyway and reports `Warning`.

use cosim_types::{Causality, Status, ValueReference};

use crate::lifecycle::LifecycleState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
}

impl Access {
    fn verb(self) -> &'static str {
        match self {
            Access::Read => "get",
            Access::Write => "set",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessClass {
    Allowed,
    /// Outside the nominal window; performed and flagged.
    SoftWarn,
    /// Structural violation; refused with `Error` and nothing is changed.
    Rejected,
}

impl AccessClass {
    pub fn status(self) -> Status {
        match self {
            AccessClass::Allowed => Status::Ok,
            AccessClass::SoftWarn => Status::Warning,
            AccessClass::Rejected => Status::Error,
        }
    }
}

/// The lifecycle window in which an access is nominal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Window {
    Always,
    Never,
    Initialization,
    InitializationOrEvent,
    Configuration,
}

impl Window {
    fn contains(self, state: LifecycleState) -> bool {
        use LifecycleState as S;
        match self {
            Window::Always => true,
            Window::Never => false,
            Window::Initialization => state == S::InitializationMode,
            Window::InitializationOrEvent => {
                matches!(state, S::InitializationMode | S::EventMode)
            }
            Window::Configuration => {
                matches!(state, S::ConfigurationMode | S::ReconfigurationMode)
            }
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Window::Always => "any mode",
            Window::Never => "any mode: it is computed by the model",
            Window::Initialization => "initialization mode",
            Window::InitializationOrEvent => "initialization and event mode",
            Window::Configuration => "configuration and reconfiguration mode",
        }
    }
}

fn window(causality: Causality, access: Access) -> Window {
    match (causality, access) {
        (Causality::Input, _)
        | (Causality::Output | Causality::Parameter, Access::Read)
        | (Causality::TunableStructuralParameter, Access::Read) => Window::Always,
        (Causality::Output, Access::Write) => Window::Never,
        (Causality::Parameter, Access::Write) => Window::Initialization,
        (
            Causality::TunableParameter | Causality::ClockedVariable | Causality::ClockTick,
            _,
        ) => Window::InitializationOrEvent,
        (Causality::TunableStructuralParameter, Access::Write) => Window::Configuration,
    }
}

/// Classifies an access to a slot of `causality` while in `state`.
///
/// # Examples
///
/// ```
/// # use cosim_kernel::access::{Access, AccessClass, classify};
/// # use cosim_kernel::LifecycleState;
/// # use cosim_types::Causality;
/// assert_eq!(
///     classify(Causality::TunableParameter, Access::Write, LifecycleState::EventMode),
///     AccessClass::Allowed
/// );
/// assert_eq!(
///     classify(Causality::TunableParameter, Access::Write, LifecycleState::StepMode),
///     AccessClass::SoftWarn
/// );
/// ```
pub fn classify(causality: Causality, access: Access, state: LifecycleState) -> AccessClass {
    if window(causality, access).contains(state) {
        AccessClass::Allowed
    } else {
        AccessClass::SoftWarn
    }
}

/// Log message for a soft-warned access.
pub fn describe_violation(
    causality: Causality,
    access: Access,
    reference: ValueReference,
) -> String {
    format!(
        "{} {causality} {reference} outside {}",
        access.verb(),
        window(causality, access).describe()
    )
}
