//! Registry sizing knobs.
//!
//! Every field has a default, so a JSON document only needs the keys it wants
//! to change:
//!
//! ```
//! use arbor::config::RegistryConfig;
//!
//! let config = RegistryConfig::from_json(r#"{ "hierarchy_grow": 64 }"#).unwrap();
//! assert_eq!(config.hierarchy_grow, 64);
//! assert_eq!(config.component_grow, 128);
//! ```

use serde::{Deserialize, Serialize};

/// Sizing configuration for a [`Registry`](crate::ecs::registry::Registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Upper bound on entity indices. Creating past it panics.
    pub max_entities: u32,
    /// Dense slots a component pool adds each time it fills up.
    pub component_grow: usize,
    /// Hierarchy columns reserve capacity in multiples of this.
    pub hierarchy_grow: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_entities: 1 << 20,
            component_grow: 128,
            hierarchy_grow: 16,
        }
    }
}

impl RegistryConfig {
    /// Parse a config from JSON, filling missing keys with defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    /// Clamp grow sizes to at least one element.
    pub(crate) fn sanitized(mut self) -> Self {
        self.component_grow = self.component_grow.max(1);
        self.hierarchy_grow = self.hierarchy_grow.max(1);
        self
    }
}
