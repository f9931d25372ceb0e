//! Renderer error types

use sprig_core::ReactiveError;
use thiserror::Error;

use crate::vnode::Key;

/// A host adapter operation that failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Host operation `{op}` failed: {message}")]
pub struct HostError {
    pub op: &'static str,
    pub message: String,
}

impl HostError {
    pub fn new(op: &'static str, message: impl Into<String>) -> Self {
        Self {
            op,
            message: message.into(),
        }
    }
}

/// Errors raised while rendering
#[derive(Error, Debug)]
pub enum RenderError {
    /// A node expected to be mounted has no host handle
    #[error("{0} node has no host handle")]
    MissingHostNode(&'static str),

    /// Two siblings share a key under `DuplicateKeyPolicy::Reject`
    #[error("Duplicate sibling key: {0}")]
    DuplicateKey(Key),

    /// A component was rendered outside of a mount
    #[error("Component `{0}` is not mounted")]
    ComponentNotMounted(String),

    /// The host adapter rejected an operation
    #[error(transparent)]
    Host(#[from] HostError),

    /// The reactive runtime failed
    #[error("Reactive runtime error: {0}")]
    Reactive(#[from] ReactiveError),

    /// Configuration could not be parsed
    #[error("Invalid renderer configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type for renderer operations
pub type Result<T> = std::result::Result<T, RenderError>;

/// Result type for host adapter operations
pub type HostResult<T> = std::result::Result<T, HostError>;
