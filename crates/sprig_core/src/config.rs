//! Runtime configuration
//!
//! Can be built in code or loaded from a TOML table:
//!
//! ```toml
//! sweep_interval = 512
//! max_recursive_updates = 50
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tuning knobs for the reactive runtime
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReactiveConfig {
    /// Sweep dropped targets out of the registry after this many new target
    /// registrations. `0` disables automatic sweeping.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: usize,
    /// How many times one update may be queued within a single flush before
    /// the flush is aborted
    #[serde(default = "default_max_recursive_updates")]
    pub max_recursive_updates: u32,
}

fn default_sweep_interval() -> usize {
    256
}

fn default_max_recursive_updates() -> u32 {
    100
}

impl Default for ReactiveConfig {
    fn default() -> Self {
        Self {
            sweep_interval: default_sweep_interval(),
            max_recursive_updates: default_max_recursive_updates(),
        }
    }
}

impl ReactiveConfig {
    /// Parse from TOML. Missing fields take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn with_sweep_interval(mut self, interval: usize) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_max_recursive_updates(mut self, limit: u32) -> Self {
        self.max_recursive_updates = limit;
        self
    }
}
