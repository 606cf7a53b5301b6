//! Runtime layer that executes dispatcher effects.
//!
//! The dispatcher is pure and produces effects. The runtime forwards log
//! effects to `tracing` and to a pluggable [`LogSink`] (the host's logging
//! callback), and records the shutdown signal.
//!
//! ## Example
//!
//! ```
//! use cosim_kernel::{Command, Dispatcher, KernelOptions, ModelInstanceConfig, ReferenceModel};
//! use cosim_kernel::runtime::{RecordingSink, Runtime};
//! use cosim_types::Values;
//!
//! let config = ModelInstanceConfig::new("demo", "token").with_logging_on(true);
//! let mut dispatcher =
//!     Dispatcher::instantiate(config, ReferenceModel::new(), KernelOptions::default()).unwrap();
//! let mut runtime = Runtime::new("demo", RecordingSink::default());
//!
//! // Tunable parameters are nominally set in initialization or event mode.
//! let outcome = dispatcher
//!     .dispatch(Command::set(&[100], Values::Float32(vec![1.0])))
//!     .unwrap();
//! runtime.execute_effects(outcome.effects);
//! assert_eq!(runtime.sink().records().len(), 1);
//! ```

use cosim_types::{LogCategory, Status};

use crate::effects::Effect;

/// Receiver for log messages that passed the category filter.
pub trait LogSink {
    fn log(&mut self, instance: &str, status: Status, category: &LogCategory, message: &str);
}

/// Discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSink;

impl LogSink for NoOpSink {
    fn log(&mut self, _instance: &str, _status: Status, _category: &LogCategory, _message: &str) {}
}

/// One message captured by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub instance: String,
    pub status: Status,
    pub category: LogCategory,
    pub message: String,
}

/// Keeps every message in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    records: Vec<LogRecord>,
}

impl RecordingSink {
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl LogSink for RecordingSink {
    fn log(&mut self, instance: &str, status: Status, category: &LogCategory, message: &str) {
        self.records.push(LogRecord {
            instance: instance.to_string(),
            status,
            category: category.clone(),
            message: message.to_string(),
        });
    }
}

/// Executes effects for one instance.
pub struct Runtime<S: LogSink> {
    instance_name: String,
    sink: S,
    shutdown: bool,
}

impl<S: LogSink> Runtime<S> {
    pub fn new(instance_name: impl Into<String>, sink: S) -> Self {
        Self {
            instance_name: instance_name.into(),
            sink,
            shutdown: false,
        }
    }

    /// Executes a single effect.
    pub fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Log {
                status,
                category,
                message,
            } => {
                let instance = self.instance_name.as_str();
                match status {
                    Status::Warning | Status::Discard => tracing::warn!(
                        instance,
                        status = %status,
                        category = %category,
                        "{message}"
                    ),
                    Status::Error | Status::Fatal => tracing::error!(
                        instance,
                        status = %status,
                        category = %category,
                        "{message}"
                    ),
                    Status::Ok | Status::Pending => tracing::info!(
                        instance,
                        status = %status,
                        category = %category,
                        "{message}"
                    ),
                }
                self.sink.log(instance, status, &category, &message);
            }

            Effect::LifecycleChanged { from, to } => {
                tracing::debug!(instance = %self.instance_name, %from, %to, "lifecycle state changed");
            }

            Effect::Shutdown => {
                tracing::info!(instance = %self.instance_name, "instance freed");
                self.shutdown = true;
            }
        }
    }

    /// Executes all effects in order.
    pub fn execute_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    /// True once a shutdown effect has been executed.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
