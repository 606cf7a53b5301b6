//! Unit tests for cosim-kernel
//!
//! The dispatcher is pure (no IO), so every command path is exercised here
//! against the reference model and a few scripted models.

use bytes::Bytes;
use cosim_types::{Causality, LogCategory, Status, TypeTag, Value, ValueReference, Values};

use crate::clock::IntervalQualifier;
use crate::command::Command;
use crate::effects::Effect;
use crate::instance::{KernelOptions, ModelInstanceConfig};
use crate::kernel::{Dispatcher, KernelError};
use crate::lifecycle::LifecycleState;
use crate::model::{Model, ReferenceModel, StepRequest, layout};
use crate::reply::{DoStepResult, Payload, Reply};
use crate::store::{SlotDecl, StoreError, VariableStore};

// ============================================================================
// Test Helpers
// ============================================================================

fn config() -> ModelInstanceConfig {
    ModelInstanceConfig::new("test-instance", "{token}")
}

fn reference() -> Dispatcher<ReferenceModel> {
    reference_with(config())
}

fn reference_with(config: ModelInstanceConfig) -> Dispatcher<ReferenceModel> {
    Dispatcher::instantiate(config, ReferenceModel::new(), KernelOptions::default())
        .expect("reference model instantiates")
}

fn reply<M: Model>(d: &mut Dispatcher<M>, cmd: Command) -> Reply {
    d.dispatch(cmd)
        .expect("instance is alive")
        .reply
        .expect("command produces a reply")
}

fn status<M: Model>(d: &mut Dispatcher<M>, cmd: Command) -> Status {
    reply(d, cmd).status
}

fn get<M: Model>(d: &mut Dispatcher<M>, tag: TypeTag, refs: &[u32]) -> (Status, Values) {
    let r = reply(d, Command::get(tag, refs));
    match r.payload {
        Payload::Values(values) => (r.status, values),
        other => panic!("expected values, got {other:?}"),
    }
}

fn enter_initialization() -> Command {
    Command::EnterInitializationMode {
        tolerance: None,
        start_time: 0.0,
        stop_time: None,
    }
}

/// Drives an instance from `Instantiated` through initialization.
fn initialize<M: Model>(d: &mut Dispatcher<M>) {
    assert_eq!(status(d, enter_initialization()), Status::Ok);
    assert_eq!(status(d, Command::ExitInitializationMode), Status::Ok);
}

fn do_step(current_time: f64, step_size: f64) -> Command {
    Command::DoStep {
        current_time,
        step_size,
        no_set_state_prior: false,
    }
}

fn log_messages(effects: &[Effect]) -> Vec<(Status, String)> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Log {
                status, message, ..
            } => Some((*status, message.clone())),
            _ => None,
        })
        .collect()
}

/// One input doubled into one output; no structural parameters.
struct Doubler;

impl Model for Doubler {
    fn variables(&self) -> Vec<SlotDecl> {
        vec![
            SlotDecl::scalar(0, "x", Causality::Input, Value::Float64(0.0)),
            SlotDecl::scalar(1, "y", Causality::Output, Value::Float64(0.0)),
        ]
    }

    fn update_outputs(&mut self, store: &mut VariableStore) -> Result<Status, StoreError> {
        let x = match store.scalar(ValueReference::new(0))? {
            Value::Float64(x) => *x,
            _ => 0.0,
        };
        store.write(ValueReference::new(1), Value::Float64(2.0 * x))?;
        Ok(Status::Ok)
    }
}

/// A value of type `tag` that differs for each `seed` and from the zero value.
fn sample(tag: TypeTag, seed: u8) -> Values {
    let value = match tag {
        TypeTag::Float32 => Value::Float32(f32::from(seed) + 0.5),
        TypeTag::Float64 => Value::Float64(f64::from(seed) + 0.25),
        TypeTag::Int8 => Value::Int8(-i8::try_from(seed).expect("small seed")),
        TypeTag::UInt8 => Value::UInt8(seed),
        TypeTag::Int16 => Value::Int16(-300 * i16::from(seed)),
        TypeTag::UInt16 => Value::UInt16(300 * u16::from(seed)),
        TypeTag::Int32 => Value::Int32(-70_000 * i32::from(seed)),
        TypeTag::UInt32 => Value::UInt32(1_000_000_000 * u32::from(seed)),
        TypeTag::Int64 => Value::Int64(-i64::from(seed) << 40),
        TypeTag::UInt64 => Value::UInt64(u64::from(seed) << 50),
        TypeTag::Boolean => Value::Boolean(seed % 2 == 1),
        TypeTag::String => Value::String(format!("value {seed}")),
        TypeTag::Binary => Value::Binary(Bytes::from(vec![seed; 3])),
        TypeTag::Clock => Value::Clock(true),
    };
    let mut values = Values::empty(tag);
    values.push(value).expect("sample matches its tag");
    values
}

/// `y = k * u`, with `k` a plain parameter.
struct Gain;

impl Model for Gain {
    fn variables(&self) -> Vec<SlotDecl> {
        vec![
            SlotDecl::scalar(0, "k", Causality::Parameter, Value::Float64(1.0)),
            SlotDecl::scalar(1, "u", Causality::Input, Value::Float64(0.0)),
            SlotDecl::scalar(2, "y", Causality::Output, Value::Float64(0.0)),
        ]
    }

    fn update_outputs(&mut self, store: &mut VariableStore) -> Result<Status, StoreError> {
        let mut product = 1.0;
        for reference in [0, 1] {
            if let Value::Float64(v) = store.scalar(ValueReference::new(reference))? {
                product *= v;
            }
        }
        store.write(ValueReference::new(2), Value::Float64(product))?;
        Ok(Status::Ok)
    }
}

/// A model whose output update always fails.
struct Broken;

impl Model for Broken {
    fn variables(&self) -> Vec<SlotDecl> {
        vec![SlotDecl::scalar(0, "x", Causality::Input, Value::Float64(0.0))]
    }

    fn update_outputs(&mut self, _store: &mut VariableStore) -> Result<Status, StoreError> {
        Err(StoreError::UnknownReference(ValueReference::new(42)))
    }
}

/// A model whose steps end at `current_time + progress * step_size`.
struct Partial {
    status: Status,
    progress: f64,
}

impl Model for Partial {
    fn variables(&self) -> Vec<SlotDecl> {
        Doubler.variables()
    }

    fn update_outputs(&mut self, store: &mut VariableStore) -> Result<Status, StoreError> {
        Doubler.update_outputs(store)
    }

    fn do_step(
        &mut self,
        _store: &mut VariableStore,
        step: StepRequest,
    ) -> Result<(Status, DoStepResult), StoreError> {
        Ok((
            self.status,
            DoStepResult {
                event_handling_needed: false,
                terminate_simulation: false,
                early_return: self.progress < 1.0,
                last_successful_time: step.current_time + self.progress * step.step_size,
            },
        ))
    }
}

fn partial(
    status: Status,
    progress: f64,
    config: ModelInstanceConfig,
) -> Dispatcher<Partial> {
    Dispatcher::instantiate(
        config,
        Partial { status, progress },
        KernelOptions::default(),
    )
    .expect("partial model instantiates")
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[test]
fn initialization_exits_to_step_mode_by_default() {
    let mut d = reference();
    initialize(&mut d);
    assert_eq!(d.instance().lifecycle(), LifecycleState::StepMode);
}

#[test]
fn initialization_exits_to_event_mode_when_used() {
    let mut d = reference_with(config().with_event_mode_used(true));
    initialize(&mut d);
    assert_eq!(d.instance().lifecycle(), LifecycleState::EventMode);
}

#[test]
fn lifecycle_changes_are_reported_as_effects() {
    let mut d = reference();
    let outcome = d.dispatch(enter_initialization()).expect("alive");
    assert_eq!(
        outcome.effects,
        vec![Effect::LifecycleChanged {
            from: LifecycleState::Instantiated,
            to: LifecycleState::InitializationMode,
        }]
    );
}

#[test]
fn illegal_transition_is_an_error_and_keeps_state() {
    let mut d = reference();
    assert_eq!(status(&mut d, Command::EnterStepMode), Status::Error);
    assert_eq!(d.instance().lifecycle(), LifecycleState::Instantiated);
}

#[test]
fn configuration_without_structural_parameters_is_an_error() {
    let mut d = Dispatcher::instantiate(config(), Doubler, KernelOptions::default())
        .expect("doubler instantiates");
    assert_eq!(status(&mut d, Command::EnterConfigurationMode), Status::Error);
    assert_eq!(d.instance().lifecycle(), LifecycleState::Instantiated);
}

#[test]
fn required_intermediate_variables_must_be_declared() {
    let declared = config().with_required_intermediate_variables(cosim_types::refs(&[3, 5]));
    assert!(
        Dispatcher::instantiate(declared, ReferenceModel::new(), KernelOptions::default()).is_ok()
    );

    let unknown = config().with_required_intermediate_variables(cosim_types::refs(&[5, 999]));
    assert_eq!(
        Dispatcher::instantiate(unknown, ReferenceModel::new(), KernelOptions::default()).err(),
        Some(KernelError::Store(StoreError::UnknownReference(
            ValueReference::new(999)
        )))
    );
}

#[test]
fn initialization_records_experiment_setup() {
    let mut d = reference();
    let cmd = Command::EnterInitializationMode {
        tolerance: Some(1e-6),
        start_time: 2.0,
        stop_time: Some(10.0),
    };
    assert_eq!(status(&mut d, cmd), Status::Ok);
    let setup = d.instance().setup().expect("setup recorded");
    assert_eq!(setup.tolerance, Some(1e-6));
    assert_eq!(setup.start_time, 2.0);
    assert_eq!(setup.stop_time, Some(10.0));
}

#[test]
fn terminate_from_step_mode() {
    let mut d = reference();
    initialize(&mut d);
    assert_eq!(status(&mut d, Command::Terminate), Status::Ok);
    assert_eq!(d.instance().lifecycle(), LifecycleState::Terminated);
    assert_eq!(status(&mut d, Command::Terminate), Status::Error);
}

#[test]
fn free_instance_signals_shutdown_without_reply() {
    let mut d = reference();
    let outcome = d.dispatch(Command::FreeInstance).expect("alive");
    assert_eq!(outcome.reply, None);
    assert_eq!(outcome.effects, vec![Effect::Shutdown]);
    assert!(d.is_freed());
    assert_eq!(
        d.dispatch(Command::get(TypeTag::Float64, &[3])),
        Err(KernelError::InstanceFreed)
    );
}

// ============================================================================
// Variable Access Tests
// ============================================================================

#[test]
fn numeric_outputs_are_sums_after_initialization() {
    let mut d = reference();
    assert_eq!(
        status(&mut d, Command::set(&[3, 4], Values::Float64(vec![2.0, 3.0]))),
        Status::Ok
    );
    initialize(&mut d);
    assert_eq!(
        get(&mut d, TypeTag::Float64, &[5]),
        (Status::Ok, Values::Float64(vec![5.0]))
    );
}

#[test]
fn boolean_string_and_binary_outputs() {
    let mut d = reference();
    status(&mut d, Command::set(&[30, 31], Values::Boolean(vec![true, false])));
    status(
        &mut d,
        Command::set(&[33, 34], Values::String(vec!["co".into(), "sim".into()])),
    );
    status(
        &mut d,
        Command::set(
            &[36, 37],
            Values::Binary(vec![
                Bytes::from_static(&[0b1010, 0b1111, 0xFF]),
                Bytes::from_static(&[0b0110, 0b0000]),
            ]),
        ),
    );
    initialize(&mut d);

    assert_eq!(get(&mut d, TypeTag::Boolean, &[32]).1, Values::Boolean(vec![true]));
    assert_eq!(
        get(&mut d, TypeTag::String, &[35]).1,
        Values::String(vec!["cosim".into()])
    );
    let (_, binary) = get(&mut d, TypeTag::Binary, &[38]);
    assert_eq!(binary.binary_sizes(), Some(vec![2]));
    assert_eq!(
        binary,
        Values::Binary(vec![Bytes::from_static(&[0b1100, 0b1111])])
    );
}

#[test]
fn outputs_update_on_step() {
    let mut d = reference();
    initialize(&mut d);
    status(&mut d, Command::set(&[18, 19], Values::Int32(vec![i32::MAX, 1])));
    assert_eq!(get(&mut d, TypeTag::Int32, &[20]).1, Values::Int32(vec![0]));
    status(&mut d, do_step(0.0, 0.1));
    assert_eq!(get(&mut d, TypeTag::Int32, &[20]).1, Values::Int32(vec![i32::MIN]));
}

#[test]
fn tunable_write_in_step_mode_warns_and_applies() {
    let mut d = reference_with(config().with_logging_on(true));
    initialize(&mut d);

    let outcome = d
        .dispatch(Command::set(&[101], Values::Float64(vec![2.5])))
        .expect("alive");
    assert_eq!(outcome.reply.map(|r| r.status), Some(Status::Warning));
    assert_eq!(
        outcome.effects,
        vec![Effect::Log {
            status: Status::Warning,
            category: LogCategory::StatusWarning,
            message: "set tunable parameter #101# outside initialization and event mode"
                .to_string(),
        }]
    );

    assert_eq!(
        get(&mut d, TypeTag::Float64, &[101]),
        (Status::Warning, Values::Float64(vec![2.5]))
    );
}

#[test]
fn clocked_write_in_step_mode_warns_and_applies() {
    let mut d = reference();
    initialize(&mut d);
    assert_eq!(
        status(&mut d, Command::set(&[layout::CLOCKED_A], Values::Int32(vec![7]))),
        Status::Warning
    );
    assert_eq!(
        get(&mut d, TypeTag::Int32, &[layout::CLOCKED_A]),
        (Status::Warning, Values::Int32(vec![7]))
    );
}

#[test]
fn tunable_write_in_event_mode_is_allowed() {
    let mut d = reference_with(config().with_event_mode_used(true));
    initialize(&mut d);
    assert_eq!(
        status(&mut d, Command::set(&[106], Values::Int32(vec![9]))),
        Status::Ok
    );
}

#[test]
fn output_write_warns_and_applies() {
    let mut d = reference();
    assert_eq!(
        status(&mut d, Command::set(&[5], Values::Float64(vec![1.0]))),
        Status::Warning
    );
    assert_eq!(get(&mut d, TypeTag::Float64, &[5]).1, Values::Float64(vec![1.0]));
}

#[test]
fn length_mismatch_is_an_error_without_mutation() {
    let mut d = reference();
    let before = d.instance().compute_state_hash();
    assert_eq!(
        status(&mut d, Command::set(&[3, 4], Values::Float64(vec![1.0]))),
        Status::Error
    );
    assert_eq!(d.instance().compute_state_hash(), before);
}

#[test]
fn unknown_reference_is_an_error_without_mutation() {
    let mut d = reference_with(config().with_logging_on(true));
    let before = d.instance().compute_state_hash();
    let outcome = d
        .dispatch(Command::set(&[3, 999], Values::Float64(vec![1.0, 2.0])))
        .expect("alive");
    assert_eq!(outcome.reply.map(|r| r.status), Some(Status::Error));
    assert_eq!(
        log_messages(&outcome.effects),
        vec![(
            Status::Error,
            "Set failed: unknown value reference #999#".to_string()
        )]
    );
    assert_eq!(d.instance().compute_state_hash(), before);
}

#[test]
fn wrong_type_is_an_error() {
    let mut d = reference();
    assert_eq!(
        status(&mut d, Command::set(&[3], Values::Int32(vec![1]))),
        Status::Error
    );
    let r = reply(&mut d, Command::get(TypeTag::Boolean, &[3]));
    assert_eq!(r.status, Status::Error);
    assert_eq!(r.payload, Payload::Empty);
}

#[test]
fn parameter_write_is_nominal_only_in_initialization() {
    let mut d = Dispatcher::instantiate(config(), Gain, KernelOptions::default())
        .expect("gain instantiates");

    assert_eq!(
        status(&mut d, Command::set(&[0], Values::Float64(vec![2.0]))),
        Status::Warning
    );
    assert_eq!(
        get(&mut d, TypeTag::Float64, &[0]),
        (Status::Ok, Values::Float64(vec![2.0]))
    );

    assert_eq!(status(&mut d, enter_initialization()), Status::Ok);
    assert_eq!(
        status(&mut d, Command::set(&[0, 1], Values::Float64(vec![3.0, 4.0]))),
        Status::Ok
    );
    assert_eq!(status(&mut d, Command::ExitInitializationMode), Status::Ok);
    assert_eq!(get(&mut d, TypeTag::Float64, &[2]).1, Values::Float64(vec![12.0]));

    // Step mode: applied, flagged.
    assert_eq!(
        status(&mut d, Command::set(&[0], Values::Float64(vec![5.0]))),
        Status::Warning
    );
    assert_eq!(
        get(&mut d, TypeTag::Float64, &[0]),
        (Status::Ok, Values::Float64(vec![5.0]))
    );

    assert_eq!(status(&mut d, Command::EnterEventMode), Status::Ok);
    assert_eq!(
        status(&mut d, Command::set(&[0], Values::Float64(vec![6.0]))),
        Status::Warning
    );
    assert_eq!(get(&mut d, TypeTag::Float64, &[0]).1, Values::Float64(vec![6.0]));
}

/// The tunable parameters and the clocked variables of the reference model,
/// with their types and causalities.
fn event_window_slots(d: &Dispatcher<ReferenceModel>) -> Vec<(u32, TypeTag, Causality)> {
    let tunables = layout::TUNABLE_PARAMETERS..layout::STRUCTURAL_PARAMETER;
    let clocked = layout::CLOCKED_A..=layout::CLOCKED_C;
    d.instance()
        .store()
        .iter()
        .map(|s| (s.reference().as_u32(), s.type_tag(), s.causality()))
        .filter(|(r, ..)| tunables.contains(r) || clocked.contains(r))
        .collect()
}

#[test]
fn every_tunable_and_clocked_slot_follows_its_window() {
    let mut d = reference_with(config().with_event_mode_used(true));
    let slots = event_window_slots(&d);
    assert_eq!(slots.len(), 16);

    initialize(&mut d);
    assert_eq!(d.instance().lifecycle(), LifecycleState::EventMode);
    for &(r, tag, causality) in &slots {
        // clocked_variable_c is computed: writing it is always out of window.
        let (write, read) = if causality == Causality::Output {
            (Status::Warning, Status::Ok)
        } else {
            (Status::Ok, Status::Ok)
        };
        assert_eq!(
            status(&mut d, Command::set(&[r], sample(tag, 1))),
            write,
            "set #{r}# in event mode"
        );
        assert_eq!(get(&mut d, tag, &[r]), (read, sample(tag, 1)), "get #{r}#");
    }

    assert_eq!(status(&mut d, Command::EnterStepMode), Status::Ok);
    for &(r, tag, causality) in &slots {
        let read = if causality == Causality::Output {
            Status::Ok
        } else {
            Status::Warning
        };
        assert_eq!(
            status(&mut d, Command::set(&[r], sample(tag, 2))),
            Status::Warning,
            "set #{r}# in step mode"
        );
        assert_eq!(get(&mut d, tag, &[r]), (read, sample(tag, 2)), "get #{r}#");
    }
}

#[test]
fn batched_get_keeps_order_and_repeats() {
    let mut d = reference();
    status(&mut d, Command::set(&[3, 4], Values::Float64(vec![1.0, 2.0])));
    assert_eq!(
        get(&mut d, TypeTag::Float64, &[4, 3, 4]).1,
        Values::Float64(vec![2.0, 1.0, 2.0])
    );
}

// ============================================================================
// Structural Parameter Tests
// ============================================================================

#[test]
fn structural_parameter_resizes_vector_on_configuration_exit() {
    let mut d = reference();
    assert_eq!(status(&mut d, Command::EnterConfigurationMode), Status::Ok);
    assert_eq!(
        status(
            &mut d,
            Command::set(&[layout::STRUCTURAL_PARAMETER], Values::UInt64(vec![3]))
        ),
        Status::Ok
    );
    assert_eq!(status(&mut d, Command::ExitConfigurationMode), Status::Ok);
    assert_eq!(d.instance().lifecycle(), LifecycleState::Instantiated);

    let (_, vector) = get(&mut d, TypeTag::Float32, &[layout::DIMENSIONED_VECTOR]);
    assert_eq!(vector, Values::Float32(vec![0.1, 0.2, 0.3]));
}

#[test]
fn reconfiguration_from_step_mode() {
    let mut d = reference();
    initialize(&mut d);
    assert_eq!(status(&mut d, Command::EnterConfigurationMode), Status::Ok);
    assert_eq!(d.instance().lifecycle(), LifecycleState::ReconfigurationMode);
    status(
        &mut d,
        Command::set(&[layout::STRUCTURAL_PARAMETER], Values::UInt64(vec![7])),
    );
    assert_eq!(status(&mut d, Command::ExitConfigurationMode), Status::Ok);
    assert_eq!(d.instance().lifecycle(), LifecycleState::StepMode);

    let (_, vector) = get(&mut d, TypeTag::Float32, &[layout::DIMENSIONED_VECTOR]);
    assert_eq!(vector.len(), 7);
}

#[test]
fn structural_write_outside_configuration_warns() {
    let mut d = reference();
    assert_eq!(
        status(
            &mut d,
            Command::set(&[layout::STRUCTURAL_PARAMETER], Values::UInt64(vec![2]))
        ),
        Status::Warning
    );
}

#[test]
fn oversized_dimension_refuses_configuration_exit() {
    let mut d = reference();
    status(&mut d, Command::EnterConfigurationMode);
    status(
        &mut d,
        Command::set(&[layout::STRUCTURAL_PARAMETER], Values::UInt64(vec![u64::MAX])),
    );
    assert_eq!(status(&mut d, Command::ExitConfigurationMode), Status::Error);
    assert_eq!(d.instance().lifecycle(), LifecycleState::ConfigurationMode);
}

#[test]
fn vector_set_consumes_its_full_length() {
    let mut d = reference_with(config().with_event_mode_used(true));
    initialize(&mut d);
    assert_eq!(
        status(
            &mut d,
            Command::set(
                &[layout::DIMENSIONED_VECTOR, 100],
                Values::Float32(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            )
        ),
        Status::Ok
    );
    assert_eq!(
        get(&mut d, TypeTag::Float32, &[100]).1,
        Values::Float32(vec![6.0])
    );
}

// ============================================================================
// Clock Tests
// ============================================================================

#[test]
fn clock_write_updates_derived_clock() {
    let mut d = reference_with(config().with_event_mode_used(true));
    initialize(&mut d);
    assert_eq!(
        status(
            &mut d,
            Command::set(
                &[layout::CLOCK_A, layout::CLOCK_B],
                Values::Clock(vec![true, true])
            )
        ),
        Status::Ok
    );
    assert_eq!(
        get(&mut d, TypeTag::Clock, &[layout::CLOCK_C]).1,
        Values::Clock(vec![true])
    );
}

#[test]
fn derived_clock_and_clocked_output_read_without_warning() {
    let mut d = reference();
    initialize(&mut d);
    assert_eq!(d.instance().lifecycle(), LifecycleState::StepMode);
    assert_eq!(
        get(&mut d, TypeTag::Clock, &[layout::CLOCK_C]),
        (Status::Ok, Values::Clock(vec![false]))
    );
    assert_eq!(
        get(&mut d, TypeTag::Int32, &[layout::CLOCKED_C]),
        (Status::Ok, Values::Int32(vec![0]))
    );
    assert_eq!(
        get(&mut d, TypeTag::Clock, &[layout::CLOCK_A]).0,
        Status::Warning
    );
}

#[test]
fn interval_decimal_reads_back_as_fraction() {
    let mut d = reference();
    let set = Command::SetIntervalDecimal {
        refs: cosim_types::refs(&[layout::CLOCK_B]),
        intervals: vec![1.25],
    };
    assert_eq!(status(&mut d, set), Status::Ok);

    let r = reply(
        &mut d,
        Command::GetIntervalFraction {
            refs: cosim_types::refs(&[layout::CLOCK_B]),
        },
    );
    assert_eq!(
        r.payload,
        Payload::IntervalFraction {
            counters: vec![5],
            resolutions: vec![4],
            qualifiers: vec![IntervalQualifier::Changed],
        }
    );
}

#[test]
fn shift_fraction_reads_back_as_decimal() {
    let mut d = reference();
    let set = Command::SetShiftFraction {
        refs: cosim_types::refs(&[layout::CLOCK_A]),
        counters: vec![1],
        resolutions: vec![4],
    };
    assert_eq!(status(&mut d, set), Status::Ok);
    let r = reply(
        &mut d,
        Command::GetShiftDecimal {
            refs: cosim_types::refs(&[layout::CLOCK_A]),
        },
    );
    assert_eq!(r.payload, Payload::ShiftDecimal { shifts: vec![0.25] });
}

#[test]
fn default_clock_table() {
    let mut d = reference();
    let r = reply(
        &mut d,
        Command::GetIntervalDecimal {
            refs: cosim_types::refs(&[layout::CLOCK_A, layout::CLOCK_B]),
        },
    );
    assert_eq!(
        r.payload,
        Payload::IntervalDecimal {
            intervals: vec![1.0, 0.0],
            qualifiers: vec![IntervalQualifier::Changed, IntervalQualifier::NotYetKnown],
        }
    );
    let r = reply(
        &mut d,
        Command::GetShiftFraction {
            refs: cosim_types::refs(&[layout::CLOCK_A]),
        },
    );
    assert_eq!(
        r.payload,
        Payload::ShiftFraction {
            counters: vec![1],
            resolutions: vec![1],
        }
    );
}

#[test]
fn interval_on_non_clock_is_an_error() {
    let mut d = reference();
    let set = Command::SetIntervalDecimal {
        refs: cosim_types::refs(&[3]),
        intervals: vec![1.0],
    };
    assert_eq!(status(&mut d, set), Status::Error);
}

// ============================================================================
// Stepping Tests
// ============================================================================

#[test]
fn full_step_reaches_communication_point() {
    let mut d = reference();
    initialize(&mut d);
    let r = reply(&mut d, do_step(1.0, 0.5));
    assert_eq!(r.status, Status::Ok);
    assert_eq!(r.payload, Payload::DoStep(DoStepResult::completed(1.0, 0.5)));
}

#[test]
fn invalid_step_is_an_error() {
    let mut d = reference();
    initialize(&mut d);
    assert_eq!(status(&mut d, do_step(0.0, -1.0)), Status::Error);
    assert_eq!(status(&mut d, do_step(f64::NAN, 1.0)), Status::Error);
}

#[test]
fn discrete_state_update_accumulates_clocked_output() {
    let mut d = reference_with(config().with_event_mode_used(true));
    initialize(&mut d);
    status(
        &mut d,
        Command::set(&[layout::CLOCKED_A, layout::CLOCKED_B], Values::Int32(vec![1, 2])),
    );
    reply(&mut d, Command::UpdateDiscreteStates);
    let r = reply(&mut d, Command::UpdateDiscreteStates);
    let Payload::DiscreteStates(result) = r.payload else {
        panic!("expected discrete states, got {:?}", r.payload);
    };
    assert!(result.next_event_time_defined);
    assert_eq!(result.next_event_time, 1.0);
    assert!(!result.discrete_states_need_update);
    assert_eq!(
        get(&mut d, TypeTag::Int32, &[layout::CLOCKED_C]).1,
        Values::Int32(vec![6])
    );
}

#[test]
fn cancel_step_completes_immediately() {
    let mut d = reference();
    initialize(&mut d);
    assert_eq!(status(&mut d, Command::CancelStep), Status::Ok);
}

#[test]
fn early_return_allowed_is_ok() {
    let mut d = partial(Status::Ok, 0.5, config().with_early_return_allowed(true));
    initialize(&mut d);
    let r = reply(&mut d, do_step(2.0, 1.0));
    assert_eq!(r.status, Status::Ok);
    let Payload::DoStep(result) = r.payload else {
        panic!("expected step result");
    };
    assert!(result.early_return);
    assert_eq!(result.last_successful_time, 2.5);
}

#[test]
fn early_return_not_allowed_warns() {
    let mut d = partial(Status::Ok, 0.5, config().with_logging_on(true));
    initialize(&mut d);
    let outcome = d.dispatch(do_step(2.0, 1.0)).expect("alive");
    assert_eq!(outcome.reply.map(|r| r.status), Some(Status::Warning));
    assert_eq!(log_messages(&outcome.effects).len(), 1);
}

#[test]
fn step_never_moves_time_backwards() {
    let mut d = partial(Status::Ok, -1.0, config().with_early_return_allowed(true));
    initialize(&mut d);
    let r = reply(&mut d, do_step(3.0, 1.0));
    assert_eq!(r.status, Status::Warning);
    let Payload::DoStep(result) = r.payload else {
        panic!("expected step result");
    };
    assert_eq!(result.last_successful_time, 3.0);
}

#[test]
fn discard_and_pending_propagate() {
    for model_status in [Status::Discard, Status::Pending] {
        let mut d = partial(model_status, 1.0, config());
        initialize(&mut d);
        assert_eq!(status(&mut d, do_step(0.0, 1.0)), model_status);
    }
}

// ============================================================================
// Fatal Latch Tests
// ============================================================================

#[test]
fn model_failure_is_fatal_and_latches() {
    let mut d = Dispatcher::instantiate(config(), Broken, KernelOptions::default())
        .expect("broken model instantiates");
    assert_eq!(status(&mut d, enter_initialization()), Status::Ok);
    assert_eq!(status(&mut d, Command::ExitInitializationMode), Status::Fatal);
    assert!(d.instance().is_poisoned());

    assert_eq!(status(&mut d, Command::get(TypeTag::Float64, &[0])), Status::Fatal);
    assert_eq!(status(&mut d, Command::EnterEventMode), Status::Fatal);
    assert_eq!(status(&mut d, Command::Terminate), Status::Ok);

    let outcome = d.dispatch(Command::FreeInstance).expect("free is accepted");
    assert_eq!(outcome.reply, None);
}

// ============================================================================
// Logging Tests
// ============================================================================

#[test]
fn logging_off_filters_warnings() {
    let mut d = reference();
    initialize(&mut d);
    let outcome = d
        .dispatch(Command::set(&[101], Values::Float64(vec![1.0])))
        .expect("alive");
    assert_eq!(outcome.reply.map(|r| r.status), Some(Status::Warning));
    assert!(log_messages(&outcome.effects).is_empty());
}

#[test]
fn debug_logging_enables_selected_categories() {
    let mut d = reference();
    initialize(&mut d);
    let enable = Command::SetDebugLogging {
        logging_on: true,
        categories: vec![LogCategory::StatusError],
    };
    assert_eq!(status(&mut d, enable), Status::Ok);

    let warned = d
        .dispatch(Command::set(&[101], Values::Float64(vec![1.0])))
        .expect("alive");
    assert!(log_messages(&warned.effects).is_empty());

    let failed = d
        .dispatch(Command::set(&[999], Values::Float64(vec![1.0])))
        .expect("alive");
    assert_eq!(log_messages(&failed.effects).len(), 1);
}

#[test]
fn debug_logging_switches_everything() {
    let mut d = reference_with(config().with_logging_on(true));
    initialize(&mut d);
    let disable = Command::SetDebugLogging {
        logging_on: false,
        categories: Vec::new(),
    };
    assert_eq!(status(&mut d, disable), Status::Ok);
    let outcome = d
        .dispatch(Command::set(&[999], Values::Float64(vec![1.0])))
        .expect("alive");
    assert!(log_messages(&outcome.effects).is_empty());
}

// ============================================================================
// Reset and Snapshot Tests
// ============================================================================

#[test]
fn reset_restores_defaults() {
    let mut d = reference();
    let pristine = d.instance().compute_state_hash();
    status(&mut d, Command::set(&[3, 4], Values::Float64(vec![9.0, 8.0])));
    status(&mut d, Command::set(&[33], Values::String(vec!["x".into()])));
    status(
        &mut d,
        Command::SetIntervalDecimal {
            refs: cosim_types::refs(&[layout::CLOCK_A]),
            intervals: vec![0.5],
        },
    );
    assert_ne!(d.instance().compute_state_hash(), pristine);

    assert_eq!(status(&mut d, Command::Reset), Status::Ok);
    assert_eq!(d.instance().lifecycle(), LifecycleState::Instantiated);
    for slot in d.instance().store().iter() {
        assert_eq!(slot.value(), slot.default_value(), "slot {}", slot.name());
    }
    assert_eq!(d.instance().compute_state_hash(), pristine);
}

#[test]
fn reset_outside_instantiated_is_an_error() {
    let mut d = reference();
    initialize(&mut d);
    assert_eq!(status(&mut d, Command::Reset), Status::Error);
    assert_eq!(d.instance().lifecycle(), LifecycleState::StepMode);
}

fn snapshot<M: Model>(d: &mut Dispatcher<M>) -> Bytes {
    match reply(d, Command::SerializeState).payload {
        Payload::State(state) => state,
        other => panic!("expected state, got {other:?}"),
    }
}

#[test]
fn snapshot_restores_state_and_lifecycle() {
    let mut source = reference();
    initialize(&mut source);
    status(&mut source, Command::set(&[3, 4], Values::Float64(vec![1.5, 2.5])));
    status(&mut source, do_step(0.0, 1.0));
    let state = snapshot(&mut source);

    let mut target = reference();
    let outcome = target
        .dispatch(Command::DeserializeState { state })
        .expect("alive");
    assert_eq!(outcome.reply.map(|r| r.status), Some(Status::Ok));
    assert!(outcome.effects.contains(&Effect::LifecycleChanged {
        from: LifecycleState::Instantiated,
        to: LifecycleState::StepMode,
    }));
    assert_eq!(
        target.instance().compute_state_hash(),
        source.instance().compute_state_hash()
    );
    assert_eq!(get(&mut target, TypeTag::Float64, &[5]).1, Values::Float64(vec![4.0]));
}

#[test]
fn restore_recomputes_outputs() {
    let mut d = reference();
    status(&mut d, Command::set(&[18, 19], Values::Int32(vec![2, 3])));
    let state = snapshot(&mut d);
    assert_eq!(status(&mut d, Command::DeserializeState { state }), Status::Ok);
    assert_eq!(get(&mut d, TypeTag::Int32, &[20]).1, Values::Int32(vec![5]));
}

#[test]
fn corrupt_snapshot_is_an_error_without_mutation() {
    let mut d = reference();
    initialize(&mut d);
    let mut state = snapshot(&mut d).to_vec();
    let last = state.len() - 1;
    state[last] ^= 0x01;

    let mut target = reference();
    let before = target.instance().compute_state_hash();
    assert_eq!(
        status(
            &mut target,
            Command::DeserializeState {
                state: Bytes::from(state)
            }
        ),
        Status::Error
    );
    assert_eq!(target.instance().compute_state_hash(), before);
}

#[test]
fn snapshot_over_the_limit_is_refused_when_taken() {
    let options = KernelOptions {
        max_snapshot_bytes: 4096,
        verify_snapshot_digest: true,
    };
    let mut d = Dispatcher::instantiate(config(), ReferenceModel::new(), options)
        .expect("reference model instantiates");

    // Within the limit: whatever is taken can be restored.
    let state = snapshot(&mut d);
    assert!(state.len() <= 4096);
    assert_eq!(status(&mut d, Command::DeserializeState { state }), Status::Ok);

    let big = "x".repeat(4096);
    status(
        &mut d,
        Command::set(&[33, 34], Values::String(vec![big.clone(), big])),
    );
    initialize(&mut d);
    let before = d.instance().compute_state_hash();
    let r = reply(&mut d, Command::SerializeState);
    assert_eq!(r.status, Status::Error);
    assert_eq!(r.payload, Payload::Empty);
    assert_eq!(d.instance().compute_state_hash(), before);
    assert_eq!(d.instance().lifecycle(), LifecycleState::StepMode);
    assert!(!d.instance().is_poisoned());
}

#[test]
fn snapshot_of_other_model_is_rejected() {
    let mut doubler = Dispatcher::instantiate(config(), Doubler, KernelOptions::default())
        .expect("doubler instantiates");
    let state = snapshot(&mut doubler);
    let mut d = reference();
    assert_eq!(status(&mut d, Command::DeserializeState { state }), Status::Error);
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Operations that keep outputs consistent with inputs once followed by
    /// a step.
    #[derive(Debug, Clone)]
    enum Op {
        Float64(u32, f64),
        Int32(u32, i32),
        Str(u32, String),
        Tunable(f64),
        Clocks(bool, bool),
        Clocked(i32, i32),
        Discrete,
        Interval(u32),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (3u32..5, -1e6f64..1e6).prop_map(|(r, v)| Op::Float64(r, v)),
            (18u32..20, any::<i32>()).prop_map(|(r, v)| Op::Int32(r, v)),
            (33u32..35, "[a-z]{0,8}").prop_map(|(r, v)| Op::Str(r, v)),
            (-1e3f64..1e3).prop_map(Op::Tunable),
            (any::<bool>(), any::<bool>()).prop_map(|(a, b)| Op::Clocks(a, b)),
            (any::<i32>(), any::<i32>()).prop_map(|(a, b)| Op::Clocked(a, b)),
            Just(Op::Discrete),
            (1u32..1000).prop_map(Op::Interval),
        ]
    }

    fn apply(d: &mut Dispatcher<ReferenceModel>, op: Op) {
        let cmd = match op {
            Op::Float64(r, v) => Command::set(&[r], Values::Float64(vec![v])),
            Op::Int32(r, v) => Command::set(&[r], Values::Int32(vec![v])),
            Op::Str(r, v) => Command::set(&[r], Values::String(vec![v])),
            Op::Tunable(v) => Command::set(&[101], Values::Float64(vec![v])),
            Op::Clocks(a, b) => {
                Command::set(&[layout::CLOCK_A, layout::CLOCK_B], Values::Clock(vec![a, b]))
            }
            Op::Clocked(a, b) => Command::set(
                &[layout::CLOCKED_A, layout::CLOCKED_B],
                Values::Int32(vec![a, b]),
            ),
            Op::Discrete => Command::UpdateDiscreteStates,
            Op::Interval(millis) => Command::SetIntervalDecimal {
                refs: cosim_types::refs(&[layout::CLOCK_B]),
                intervals: vec![f64::from(millis) / 1000.0],
            },
        };
        let s = status(d, cmd);
        assert!(!s.is_failure(), "operation failed with {s}");
    }

    /// Every slot read through the dispatcher, in reference order.
    fn observe(d: &mut Dispatcher<ReferenceModel>) -> Vec<Values> {
        let slots: Vec<(u32, TypeTag)> = d
            .instance()
            .store()
            .iter()
            .map(|s| (s.reference().as_u32(), s.type_tag()))
            .collect();
        slots
            .into_iter()
            .map(|(r, tag)| get(d, tag, &[r]).1)
            .collect()
    }

    proptest! {
        #[test]
        fn snapshot_roundtrip_is_observationally_equal(
            ops in prop::collection::vec(op(), 0..20),
            step in 0.0f64..10.0,
        ) {
            let mut source = reference();
            initialize(&mut source);
            for op in ops {
                apply(&mut source, op);
            }
            status(&mut source, do_step(0.0, step));

            let state = snapshot(&mut source);
            let mut restored = reference();
            prop_assert_eq!(
                status(&mut restored, Command::DeserializeState { state }),
                Status::Ok
            );

            prop_assert_eq!(
                restored.instance().compute_state_hash(),
                source.instance().compute_state_hash()
            );
            prop_assert_eq!(restored.instance().lifecycle(), source.instance().lifecycle());
            prop_assert_eq!(observe(&mut restored), observe(&mut source));
        }

        #[test]
        fn full_steps_advance_exactly(
            current_time in 0.0f64..1e6,
            step_size in 0.0f64..100.0,
        ) {
            let mut d = reference();
            initialize(&mut d);
            let r = reply(&mut d, do_step(current_time, step_size));
            let Payload::DoStep(result) = r.payload else {
                panic!("expected step result");
            };
            prop_assert!(result.last_successful_time >= current_time);
            prop_assert!(!result.early_return);
            prop_assert_eq!(result.last_successful_time, current_time + step_size);
        }

        #[test]
        fn partial_steps_never_go_backwards(
            current_time in 0.0f64..1e6,
            step_size in 0.0f64..100.0,
            progress in -1.0f64..1.0,
        ) {
            let mut d = partial(Status::Ok, progress, config().with_early_return_allowed(true));
            initialize(&mut d);
            let r = reply(&mut d, do_step(current_time, step_size));
            let Payload::DoStep(result) = r.payload else {
                panic!("expected step result");
            };
            prop_assert!(result.last_successful_time >= current_time);
        }

        #[test]
        fn batched_set_last_write_wins(
            writes in prop::collection::vec((3u32..5, -1e3f64..1e3), 1..10),
        ) {
            let mut d = reference();
            let (refs, values): (Vec<u32>, Vec<f64>) = writes.iter().copied().unzip();
            prop_assert_eq!(
                status(&mut d, Command::set(&refs, Values::Float64(values))),
                Status::Ok
            );
            for r in [3u32, 4] {
                let (_, got) = get(&mut d, TypeTag::Float64, &[r]);
                match writes.iter().rev().find(|(wr, _)| *wr == r) {
                    Some((_, v)) => prop_assert_eq!(got, Values::Float64(vec![*v])),
                    None => prop_assert_eq!(got, Values::Float64(vec![0.0])),
                }
            }
        }
    }
}
