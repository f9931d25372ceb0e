//! Reactive runtime error types

use thiserror::Error;

use crate::effect::EffectId;

/// Errors raised by the reactive runtime
#[derive(Error, Debug)]
pub enum ReactiveError {
    /// The effect was stopped or never existed
    #[error("Unknown or stopped effect: {0:?}")]
    UnknownEffect(EffectId),

    /// The effect is already executing further up the stack
    #[error("Effect {0:?} is already running")]
    Reentrant(EffectId),

    /// An update kept re-queueing itself within one flush
    #[error("Update {effect:?} was queued more than {limit} times in one flush")]
    RecursiveUpdateLimit { effect: EffectId, limit: u32 },

    /// Configuration could not be parsed
    #[error("Invalid reactive configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type for reactive operations
pub type Result<T> = std::result::Result<T, ReactiveError>;
