//! The dispatcher: one command in, one reply and its effects out.
//!
//! Every command runs the same contract:
//!
//! 1. Consult the access policy for each addressed slot, collecting a
//!    `Warning` for every out-of-window access.
//! 2. Validate, then mutate. Validation failures become an `Error` reply and
//!    leave the instance untouched; soft-warned accesses are still performed.
//! 3. Run the model hooks the operation calls for (outputs after
//!    `ExitInitializationMode`, `DoStep` and `DeserializeState`; derived
//!    clocks after clock writes).
//!
//! The dispatcher performs no I/O. Log messages and the shutdown signal are
//! returned as [`Effect`]s for the runtime to execute.
//!
//! # Example
//!
//! ```
//! use cosim_kernel::{Command, Dispatcher, KernelOptions, ModelInstanceConfig, ReferenceModel};
//! use cosim_types::{Status, Values};
//!
//! let config = ModelInstanceConfig::new("demo", "token");
//! let mut dispatcher =
//!     Dispatcher::instantiate(config, ReferenceModel::new(), KernelOptions::default()).unwrap();
//!
//! let outcome = dispatcher
//!     .dispatch(Command::set(&[3, 4], Values::Float64(vec![2.0, 3.0])))
//!     .unwrap();
//! assert_eq!(outcome.reply.unwrap().status, Status::Ok);
//! ```

use cosim_types::{Status, TypeTag, ValueReference};

use crate::access::{Access, AccessClass, classify, describe_violation};
use crate::clock::ClockError;
use crate::command::Command;
use crate::effects::Effect;
use crate::instance::{ExperimentSetup, KernelOptions, ModelInstance, ModelInstanceConfig};
use crate::lifecycle::{LifecycleState, Transition, TransitionError};
use crate::model::{Model, StepRequest};
use crate::reply::{Payload, Reply};
use crate::snapshot::SnapshotError;
use crate::store::StoreError;

/// Result of dispatching one command.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// `None` only for `FreeInstance`.
    pub reply: Option<Reply>,
    /// Effects for the runtime, already passed through the log filter.
    pub effects: Vec<Effect>,
}

/// Owns one model instance and its model, and executes commands against them.
pub struct Dispatcher<M: Model> {
    instance: ModelInstance,
    model: M,
    options: KernelOptions,
    freed: bool,
}

impl<M: Model> Dispatcher<M> {
    /// Creates the instance from the model's declarations.
    pub fn instantiate(
        config: ModelInstanceConfig,
        model: M,
        options: KernelOptions,
    ) -> Result<Self, KernelError> {
        let instance = ModelInstance::new(config, model.variables(), model.default_clocks())?;
        Ok(Self {
            instance,
            model,
            options,
            freed: false,
        })
    }

    pub fn instance(&self) -> &ModelInstance {
        &self.instance
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn options(&self) -> &KernelOptions {
        &self.options
    }

    pub fn is_freed(&self) -> bool {
        self.freed
    }

    /// Executes one command.
    ///
    /// Failures are reported in the reply's status. The only `Err` is
    /// [`KernelError::InstanceFreed`], for commands arriving after
    /// `FreeInstance`.
    pub fn dispatch(&mut self, cmd: Command) -> Result<Outcome, KernelError> {
        if self.freed {
            return Err(KernelError::InstanceFreed);
        }

        let mut effects = Vec::new();

        if self.instance.poisoned && !cmd.survives_fatal() {
            effects.push(Effect::log(
                Status::Fatal,
                format!(
                    "{} refused: the instance has failed and only accepts Terminate and FreeInstance",
                    cmd.name()
                ),
            ));
            return Ok(self.finish(Some(Reply::status(Status::Fatal)), effects));
        }

        let name = cmd.name();
        let reply = match self.execute(cmd, &mut effects) {
            Ok(reply) => reply,
            Err(e) => {
                let status = e.status();
                effects.push(Effect::log(status, format!("{name} failed: {e}")));
                Some(Reply::status(status))
            }
        };

        if reply.as_ref().is_some_and(|r| r.status == Status::Fatal) {
            self.instance.poisoned = true;
        }
        Ok(self.finish(reply, effects))
    }

    fn finish(&self, reply: Option<Reply>, mut effects: Vec<Effect>) -> Outcome {
        let filter = &self.instance.log_filter;
        effects.retain(|effect| match effect {
            Effect::Log { category, .. } => filter.enabled(category),
            Effect::LifecycleChanged { .. } | Effect::Shutdown => true,
        });
        Outcome { reply, effects }
    }

    #[allow(clippy::too_many_lines)]
    fn execute(
        &mut self,
        cmd: Command,
        effects: &mut Vec<Effect>,
    ) -> Result<Option<Reply>, KernelError> {
        let reply = match cmd {
            // ================================================================
            // Lifecycle
            // ================================================================
            Command::EnterInitializationMode {
                tolerance,
                start_time,
                stop_time,
            } => {
                self.transition(Transition::EnterInitializationMode, effects)?;
                let setup = ExperimentSetup {
                    tolerance,
                    start_time,
                    stop_time,
                };
                self.model.setup_experiment(&setup);
                self.instance.setup = Some(setup);
                Reply::ok()
            }

            Command::ExitInitializationMode => {
                self.transition(Transition::ExitInitializationMode, effects)?;
                let status = self.update_outputs()?;
                Reply::status(status)
            }

            Command::EnterEventMode => {
                self.transition(Transition::EnterEventMode, effects)?;
                Reply::ok()
            }

            Command::EnterStepMode => {
                self.transition(Transition::EnterStepMode, effects)?;
                Reply::ok()
            }

            Command::EnterConfigurationMode => {
                self.transition(Transition::EnterConfigurationMode, effects)?;
                Reply::ok()
            }

            Command::ExitConfigurationMode => {
                // Check the transition before resizing so a refused exit
                // changes nothing.
                let from = self.instance.lifecycle;
                let to = from.apply(Transition::ExitConfigurationMode, self.instance.guards())?;
                self.instance.store.resize_dependent_arrays()?;
                self.enter(from, to, effects);
                Reply::ok()
            }

            Command::Terminate => {
                self.transition(Transition::Terminate, effects)?;
                Reply::ok()
            }

            Command::Reset => {
                self.transition(Transition::Reset, effects)?;
                self.instance.store.reset();
                self.instance.clocks.reset();
                self.instance.setup = None;
                Reply::ok()
            }

            Command::FreeInstance => {
                self.freed = true;
                effects.push(Effect::Shutdown);
                return Ok(None);
            }

            // ================================================================
            // Logging
            // ================================================================
            Command::SetDebugLogging {
                logging_on,
                categories,
            } => {
                self.instance.log_filter.apply(logging_on, categories);
                Reply::ok()
            }

            // ================================================================
            // Variable Access
            // ================================================================
            Command::Set { refs, values } => {
                let (status, warnings) = self.check_access(&refs, Access::Write)?;
                let writes_clocks = values.type_tag() == TypeTag::Clock;
                self.instance.store.set(&refs, values)?;
                effects.extend(warnings);

                let mut status = status;
                if writes_clocks {
                    status = status.worst(self.update_clocks()?);
                }
                Reply::status(status)
            }

            Command::Get { type_tag, refs } => {
                let (status, warnings) = self.check_access(&refs, Access::Read)?;
                let values = self.instance.store.get(type_tag, &refs)?;
                effects.extend(warnings);
                Reply::new(status, Payload::Values(values))
            }

            // ================================================================
            // Clocks
            // ================================================================
            Command::SetIntervalDecimal { refs, intervals } => {
                self.instance.clocks.set_interval_decimal(&refs, &intervals)?;
                Reply::ok()
            }

            Command::SetIntervalFraction {
                refs,
                counters,
                resolutions,
            } => {
                self.instance
                    .clocks
                    .set_interval_fraction(&refs, &counters, &resolutions)?;
                Reply::ok()
            }

            Command::SetShiftDecimal { refs, shifts } => {
                self.instance.clocks.set_shift_decimal(&refs, &shifts)?;
                Reply::ok()
            }

            Command::SetShiftFraction {
                refs,
                counters,
                resolutions,
            } => {
                self.instance
                    .clocks
                    .set_shift_fraction(&refs, &counters, &resolutions)?;
                Reply::ok()
            }

            Command::GetIntervalDecimal { refs } => {
                let (intervals, qualifiers) = self.instance.clocks.interval_decimal(&refs)?;
                Reply::new(
                    Status::Ok,
                    Payload::IntervalDecimal {
                        intervals,
                        qualifiers,
                    },
                )
            }

            Command::GetIntervalFraction { refs } => {
                let (counters, resolutions, qualifiers) =
                    self.instance.clocks.interval_fraction(&refs)?;
                Reply::new(
                    Status::Ok,
                    Payload::IntervalFraction {
                        counters,
                        resolutions,
                        qualifiers,
                    },
                )
            }

            Command::GetShiftDecimal { refs } => {
                let shifts = self.instance.clocks.shift_decimal(&refs)?;
                Reply::new(Status::Ok, Payload::ShiftDecimal { shifts })
            }

            Command::GetShiftFraction { refs } => {
                let (counters, resolutions) = self.instance.clocks.shift_fraction(&refs)?;
                Reply::new(
                    Status::Ok,
                    Payload::ShiftFraction {
                        counters,
                        resolutions,
                    },
                )
            }

            // ================================================================
            // Stepping
            // ================================================================
            Command::DoStep {
                current_time,
                step_size,
                no_set_state_prior,
            } => {
                if !current_time.is_finite() || !step_size.is_finite() || step_size < 0.0 {
                    return Err(KernelError::InvalidStep {
                        current_time,
                        step_size,
                    });
                }
                let step = StepRequest {
                    current_time,
                    step_size,
                    no_set_state_prior,
                };
                let (mut status, mut result) = self
                    .model
                    .do_step(&mut self.instance.store, step)
                    .map_err(KernelError::ModelFailure)?;

                let went_back = result.last_successful_time.is_nan()
                    || result.last_successful_time < current_time;
                if went_back {
                    effects.push(Effect::log(
                        Status::Warning,
                        format!(
                            "step reported last successful time {} before current time {current_time}",
                            result.last_successful_time
                        ),
                    ));
                    result.last_successful_time = current_time;
                    status = status.worst(Status::Warning);
                }
                if result.early_return && !self.instance.config.early_return_allowed {
                    effects.push(Effect::log(
                        Status::Warning,
                        format!(
                            "step returned early at {} although early return is not allowed",
                            result.last_successful_time
                        ),
                    ));
                    status = status.worst(Status::Warning);
                }

                // Postcondition: time never moves backwards
                debug_assert!(result.last_successful_time >= current_time);
                Reply::new(status, Payload::DoStep(result))
            }

            Command::UpdateDiscreteStates => {
                let (status, result) = self
                    .model
                    .update_discrete_states(&mut self.instance.store)
                    .map_err(KernelError::ModelFailure)?;
                Reply::new(status, Payload::DiscreteStates(result))
            }

            Command::CancelStep => Reply::status(self.model.cancel_step()),

            // ================================================================
            // Snapshots
            // ================================================================
            Command::SerializeState => {
                let state = self.instance.serialize_state(&self.options)?;
                Reply::new(Status::Ok, Payload::State(state))
            }

            Command::DeserializeState { state } => {
                let from = self.instance.lifecycle;
                self.instance.deserialize_state(&state, &self.options)?;
                let to = self.instance.lifecycle;
                if from != to {
                    effects.push(Effect::LifecycleChanged { from, to });
                }
                let status = self.update_outputs()?;
                Reply::status(status)
            }
        };

        Ok(Some(reply))
    }

    /// Classifies every addressed slot, returning the combined status and one
    /// warning per out-of-window access. Fails on unknown references.
    fn check_access(
        &self,
        refs: &[ValueReference],
        access: Access,
    ) -> Result<(Status, Vec<Effect>), KernelError> {
        let state = self.instance.lifecycle;
        let mut classes = Vec::with_capacity(refs.len());
        let mut warnings = Vec::new();
        for &reference in refs {
            let causality = self.instance.store.causality(reference)?;
            let class = classify(causality, access, state);
            if class == AccessClass::SoftWarn {
                warnings.push(Effect::log(
                    Status::Warning,
                    describe_violation(causality, access, reference),
                ));
            }
            classes.push(class);
        }
        let status: Status = classes.into_iter().map(AccessClass::status).collect();
        Ok((status, warnings))
    }

    fn transition(
        &mut self,
        transition: Transition,
        effects: &mut Vec<Effect>,
    ) -> Result<(), KernelError> {
        let from = self.instance.lifecycle;
        let to = from.apply(transition, self.instance.guards())?;
        self.enter(from, to, effects);
        Ok(())
    }

    fn enter(&mut self, from: LifecycleState, to: LifecycleState, effects: &mut Vec<Effect>) {
        self.instance.lifecycle = to;
        if from != to {
            effects.push(Effect::LifecycleChanged { from, to });
        }
    }

    fn update_outputs(&mut self) -> Result<Status, KernelError> {
        self.model
            .update_outputs(&mut self.instance.store)
            .map_err(KernelError::ModelFailure)
    }

    fn update_clocks(&mut self) -> Result<Status, KernelError> {
        self.model
            .update_clocks(&mut self.instance.store)
            .map_err(KernelError::ModelFailure)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Clock(#[from] ClockError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("invalid step: current time {current_time}, step size {step_size}")]
    InvalidStep { current_time: f64, step_size: f64 },

    #[error("model failure: {0}")]
    ModelFailure(StoreError),

    #[error("the instance has been freed")]
    InstanceFreed,
}

impl KernelError {
    /// Status reported for this error: `Fatal` for model failures, `Error`
    /// for everything the dispatcher refused before mutating.
    pub fn status(&self) -> Status {
        match self {
            KernelError::ModelFailure(_) | KernelError::InstanceFreed => Status::Fatal,
            KernelError::Transition(_) => AccessClass::Rejected.status(),
            _ => Status::Error,
        }
    }
}
