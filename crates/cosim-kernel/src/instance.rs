//! Model instance state and its configuration.

use std::path::PathBuf;

use cosim_types::{Causality, TypeTag, ValueReference};
use serde::{Deserialize, Serialize};

use crate::clock::{ClockEntry, ClockTable};
use crate::kernel::KernelError;
use crate::lifecycle::{LifecycleState, TransitionGuards};
use crate::log_filter::CategoryFilter;
use crate::store::{SlotDecl, VariableStore};

/// Default upper bound on an accepted snapshot, in bytes.
pub const DEFAULT_MAX_SNAPSHOT_BYTES: usize = 16 * 1024 * 1024;

// ============================================================================
// Configuration
// ============================================================================

/// Fixed properties of a model instance, supplied by the host at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInstanceConfig {
    pub instance_name: String,
    pub instantiation_token: String,
    pub resource_path: Option<PathBuf>,
    /// The host asked for an interactive presentation. Recorded only.
    pub visible: bool,
    pub logging_on: bool,
    pub event_mode_used: bool,
    pub early_return_allowed: bool,
    /// Variables the host wants readable during intermediate updates. Each
    /// must be declared by the model.
    pub required_intermediate_variables: Vec<ValueReference>,
}

impl ModelInstanceConfig {
    pub fn new(instance_name: impl Into<String>, instantiation_token: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
            instantiation_token: instantiation_token.into(),
            resource_path: None,
            visible: false,
            logging_on: false,
            event_mode_used: false,
            early_return_allowed: false,
            required_intermediate_variables: Vec::new(),
        }
    }

    pub fn with_resource_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.resource_path = Some(path.into());
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_logging_on(mut self, logging_on: bool) -> Self {
        self.logging_on = logging_on;
        self
    }

    pub fn with_event_mode_used(mut self, event_mode_used: bool) -> Self {
        self.event_mode_used = event_mode_used;
        self
    }

    pub fn with_early_return_allowed(mut self, early_return_allowed: bool) -> Self {
        self.early_return_allowed = early_return_allowed;
        self
    }

    pub fn with_required_intermediate_variables(mut self, refs: Vec<ValueReference>) -> Self {
        self.required_intermediate_variables = refs;
        self
    }
}

/// Host-side limits for the kernel. The kernel never reads these from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelOptions {
    /// Larger snapshots are neither produced by `SerializeState` nor
    /// accepted by `DeserializeState`.
    pub max_snapshot_bytes: usize,
    pub verify_snapshot_digest: bool,
}

impl Default for KernelOptions {
    fn default() -> Self {
        Self {
            max_snapshot_bytes: DEFAULT_MAX_SNAPSHOT_BYTES,
            verify_snapshot_digest: true,
        }
    }
}

/// Experiment parameters recorded when initialization begins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ExperimentSetup {
    pub tolerance: Option<f64>,
    pub start_time: f64,
    pub stop_time: Option<f64>,
}

// ============================================================================
// Instance
// ============================================================================

/// All mutable state of one model instantiation.
///
/// Created together at instantiation, mutated only by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInstance {
    pub(crate) config: ModelInstanceConfig,
    pub(crate) store: VariableStore,
    pub(crate) clocks: ClockTable,
    pub(crate) lifecycle: LifecycleState,
    pub(crate) log_filter: CategoryFilter,
    pub(crate) setup: Option<ExperimentSetup>,
    /// Set once a `Fatal` status has been reported.
    pub(crate) poisoned: bool,
}

impl ModelInstance {
    /// Creates an instance in `Instantiated`, every slot and clock at its
    /// default. Every slot of type `Clock` gets a clock table entry.
    ///
    /// Fails if a required intermediate variable is not declared.
    pub fn new(
        config: ModelInstanceConfig,
        variables: Vec<SlotDecl>,
        default_clocks: Vec<ClockEntry>,
    ) -> Result<Self, KernelError> {
        let store = VariableStore::new(variables)?;
        let clocks = ClockTable::new(store.references_of_type(TypeTag::Clock), default_clocks)?;
        for &reference in &config.required_intermediate_variables {
            store.slot(reference)?;
        }
        let log_filter = CategoryFilter::new(config.logging_on);

        Ok(Self {
            config,
            store,
            clocks,
            lifecycle: LifecycleState::Instantiated,
            log_filter,
            setup: None,
            poisoned: false,
        })
    }

    pub fn config(&self) -> &ModelInstanceConfig {
        &self.config
    }

    pub fn store(&self) -> &VariableStore {
        &self.store
    }

    pub fn clocks(&self) -> &ClockTable {
        &self.clocks
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn log_filter(&self) -> &CategoryFilter {
        &self.log_filter
    }

    pub fn setup(&self) -> Option<&ExperimentSetup> {
        self.setup.as_ref()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub(crate) fn guards(&self) -> TransitionGuards {
        TransitionGuards {
            event_mode_used: self.config.event_mode_used,
            has_structural_parameters: self
                .store
                .has_causality(Causality::TunableStructuralParameter),
        }
    }
}
