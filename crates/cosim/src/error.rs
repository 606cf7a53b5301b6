//! Backend error types.

use cosim_config::ConfigError;
use cosim_kernel::KernelError;
use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors surfaced to the host.
///
/// Command failures are not errors: they come back as a reply status. These
/// are the cases where no reply can be produced.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Load(#[from] anyhow::Error),

    /// The kernel refused to create or drive the instance.
    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    /// An encoded command could not be decoded. The backend is shut down.
    #[error("malformed command: {0}")]
    Decode(String),

    /// A reply could not be encoded.
    #[error("failed to encode reply: {0}")]
    Encode(String),

    /// The log filter directive is invalid.
    #[error("invalid log filter {filter:?}: {reason}")]
    InvalidFilter { filter: String, reason: String },

    /// A global tracing subscriber is already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Tracing(String),

    /// The instance was freed; no further commands are processed.
    #[error("backend shut down")]
    Shutdown,
}
