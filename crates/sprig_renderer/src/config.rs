//! Renderer configuration
//!
//! ```toml
//! duplicate_keys = "reject"
//!
//! [reactive]
//! max_recursive_updates = 20
//! ```

use serde::{Deserialize, Serialize};
use sprig_core::ReactiveConfig;

use crate::error::Result;

/// What the keyed diff does when new siblings share a key
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateKeyPolicy {
    /// Log a warning; the last sibling with the key wins the match
    #[default]
    Warn,
    /// Fail the render with `RenderError::DuplicateKey`
    Reject,
    /// Last sibling wins, silently
    Ignore,
}

/// Renderer settings
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RendererConfig {
    #[serde(default)]
    pub duplicate_keys: DuplicateKeyPolicy,
    /// Settings for the runtime the renderer creates
    #[serde(default)]
    pub reactive: ReactiveConfig,
}

impl RendererConfig {
    /// Parse from TOML. Missing fields take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn with_duplicate_keys(mut self, policy: DuplicateKeyPolicy) -> Self {
        self.duplicate_keys = policy;
        self
    }

    pub fn with_reactive(mut self, reactive: ReactiveConfig) -> Self {
        self.reactive = reactive;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_warns() {
        assert_eq!(RendererConfig::default().duplicate_keys, DuplicateKeyPolicy::Warn);
    }

    #[test]
    fn test_from_toml() {
        let config = RendererConfig::from_toml_str(
            r#"
            duplicate_keys = "reject"

            [reactive]
            max_recursive_updates = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.duplicate_keys, DuplicateKeyPolicy::Reject);
        assert_eq!(config.reactive.max_recursive_updates, 20);
        assert_eq!(config.reactive.sweep_interval, 256);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(RendererConfig::from_toml_str("").unwrap(), RendererConfig::default());
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        assert!(RendererConfig::from_toml_str("duplicate_keys = \"panic\"").is_err());
    }
}
