//! The host-facing backend: one dispatcher plus the runtime executing its
//! effects.
//!
//! This is the core path: command → dispatcher → effects → tracing and the
//! host's log sink. Commands may arrive decoded ([`Backend::handle`]) or as
//! postcard frames ([`Backend::handle_encoded`]). A frame that does not decode
//! to a known command is a fatal protocol failure: it is logged as `Fatal`,
//! the backend shuts down, and the host is expected to exit.

use std::path::Path;

use bytes::Bytes;
use cosim_config::BackendConfig;
use cosim_kernel::{
    Command, Dispatcher, Effect, KernelOptions, LogSink, Model, ModelInstance,
    ModelInstanceConfig, NoOpSink, Reply, Runtime,
};
use cosim_types::Status;

use crate::error::{BackendError, BackendResult};

/// Kernel limits taken from the `[snapshot]` section.
pub fn kernel_options(config: &BackendConfig) -> KernelOptions {
    KernelOptions {
        max_snapshot_bytes: config.snapshot.max_bytes,
        verify_snapshot_digest: config.snapshot.verify_digest,
    }
}

/// Instance flags taken from the `[instance]` section.
pub fn instance_config(
    instance_name: impl Into<String>,
    instantiation_token: impl Into<String>,
    config: &BackendConfig,
) -> ModelInstanceConfig {
    ModelInstanceConfig::new(instance_name, instantiation_token)
        .with_logging_on(config.instance.logging_on)
        .with_event_mode_used(config.instance.event_mode_used)
        .with_early_return_allowed(config.instance.early_return_allowed)
}

/// Encodes a command the way [`Backend::handle_encoded`] expects it.
pub fn encode_command(cmd: &Command) -> BackendResult<Bytes> {
    postcard::to_allocvec(cmd)
        .map(Bytes::from)
        .map_err(|e| BackendError::Encode(e.to_string()))
}

/// Decodes a reply produced by [`Backend::handle_encoded`].
pub fn decode_reply(frame: &[u8]) -> BackendResult<Reply> {
    postcard::from_bytes(frame).map_err(|e| BackendError::Decode(e.to_string()))
}

fn encode_reply(reply: &Reply) -> BackendResult<Bytes> {
    postcard::to_allocvec(reply)
        .map(Bytes::from)
        .map_err(|e| BackendError::Encode(e.to_string()))
}

/// One model instance behind a command interface.
pub struct Backend<M: Model, S: LogSink = NoOpSink> {
    dispatcher: Dispatcher<M>,
    runtime: Runtime<S>,
}

impl<M: Model, S: LogSink> Backend<M, S> {
    /// Instantiates `model` with explicit instance flags.
    pub fn new(
        instance: ModelInstanceConfig,
        model: M,
        sink: S,
        config: &BackendConfig,
    ) -> BackendResult<Self> {
        config.validate()?;
        let runtime = Runtime::new(instance.instance_name.clone(), sink);
        let dispatcher = Dispatcher::instantiate(instance, model, kernel_options(config))?;

        let created = dispatcher.instance().config();
        tracing::info!(
            instance = runtime.instance_name(),
            variables = dispatcher.instance().store().len(),
            visible = created.visible,
            required_intermediate = created.required_intermediate_variables.len(),
            "instance created"
        );

        Ok(Self {
            dispatcher,
            runtime,
        })
    }

    /// Instantiates `model` with the instance flags from `config`.
    pub fn with_defaults(
        instance_name: impl Into<String>,
        instantiation_token: impl Into<String>,
        model: M,
        sink: S,
        config: &BackendConfig,
    ) -> BackendResult<Self> {
        let instance = instance_config(instance_name, instantiation_token, config);
        Self::new(instance, model, sink, config)
    }

    /// Loads configuration from `resource_dir` (and the usual other sources)
    /// and instantiates `model` with it.
    pub fn load(
        instance_name: impl Into<String>,
        instantiation_token: impl Into<String>,
        resource_dir: impl AsRef<Path>,
        model: M,
        sink: S,
    ) -> BackendResult<Self> {
        let resource_dir = resource_dir.as_ref();
        let config = BackendConfig::load_from_dir(resource_dir)?;
        let instance = instance_config(instance_name, instantiation_token, &config)
            .with_resource_path(resource_dir);
        Self::new(instance, model, sink, &config)
    }

    /// Executes one command and its effects.
    ///
    /// Returns `Ok(None)` for `FreeInstance`, after which every call fails
    /// with [`BackendError::Shutdown`].
    pub fn handle(&mut self, cmd: Command) -> BackendResult<Option<Reply>> {
        if self.runtime.is_shutdown() {
            return Err(BackendError::Shutdown);
        }

        let span = tracing::debug_span!(
            "command",
            instance = self.runtime.instance_name(),
            command = cmd.name()
        );
        let _entered = span.enter();

        let outcome = self.dispatcher.dispatch(cmd)?;
        self.runtime.execute_effects(outcome.effects);

        match &outcome.reply {
            Some(reply) if reply.status.is_failure() => {
                tracing::warn!(status = %reply.status, "command failed");
            }
            Some(reply) => tracing::debug!(status = %reply.status, "replied"),
            None => {}
        }
        Ok(outcome.reply)
    }

    /// Decodes a postcard-encoded command, executes it and encodes the reply.
    pub fn handle_encoded(&mut self, frame: &[u8]) -> BackendResult<Option<Bytes>> {
        if self.runtime.is_shutdown() {
            return Err(BackendError::Shutdown);
        }

        let cmd: Command = match postcard::from_bytes(frame) {
            Ok(cmd) => cmd,
            Err(e) => {
                let message = format!("undecodable command of {} bytes: {e}", frame.len());
                self.runtime
                    .execute_effect(Effect::log(Status::Fatal, message.clone()));
                self.runtime.execute_effect(Effect::Shutdown);
                return Err(BackendError::Decode(message));
            }
        };

        self.handle(cmd)?.as_ref().map(encode_reply).transpose()
    }

    /// True once the instance was freed or a frame failed to decode.
    pub fn is_shutdown(&self) -> bool {
        self.runtime.is_shutdown()
    }

    pub fn instance(&self) -> &ModelInstance {
        self.dispatcher.instance()
    }

    pub fn dispatcher(&self) -> &Dispatcher<M> {
        &self.dispatcher
    }

    pub fn sink(&self) -> &S {
        self.runtime.sink()
    }

    pub fn sink_mut(&mut self) -> &mut S {
        self.runtime.sink_mut()
    }
}
