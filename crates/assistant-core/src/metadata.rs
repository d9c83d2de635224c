//! Tool Metadata
//!
//! Read-only metadata maps handed to the tool-invocation host. Each capability
//! owns one immutable map, built once at startup and looked up by name.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::error::{CoreError, Result};

/// Capability exposing the UI template reference
pub const OUTPUT_TEMPLATE: &str = "output_template";

/// Capability exposing widget rendering hints
pub const WIDGET: &str = "widget";

/// Values the metadata maps are built from
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Opaque UI reference, e.g. `ui://widget/context.html`
    pub output_template: String,

    /// Origin the widget is served from
    pub widget_domain: String,

    /// Whether the host should draw a border around the widget
    #[serde(default = "default_prefers_border")]
    pub widget_prefers_border: bool,
}

const fn default_prefers_border() -> bool {
    true
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            output_template: "ui://widget/context.html".into(),
            widget_domain: "https://localhost:3000".into(),
            widget_prefers_border: true,
        }
    }
}

/// Registry of metadata maps keyed by capability name
#[derive(Clone, Debug, Default)]
pub struct MetadataRegistry {
    entries: BTreeMap<String, Map<String, Value>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard capabilities from configuration
    pub fn from_config(config: &MetadataConfig) -> Result<Self> {
        if config.output_template.trim().is_empty() {
            return Err(CoreError::Config("output template must not be empty".into()));
        }
        if config.widget_domain.trim().is_empty() {
            return Err(CoreError::Config("widget domain must not be empty".into()));
        }

        let mut registry = Self::new();
        registry.register(
            OUTPUT_TEMPLATE,
            json!({ "outputTemplate": config.output_template }),
        );
        registry.register(
            WIDGET,
            json!({
                "widgetPrefersBorder": config.widget_prefers_border,
                "widgetDomain": config.widget_domain,
            }),
        );
        Ok(registry)
    }

    /// Register a capability. Non-object values are stored as an empty map.
    pub fn register(&mut self, capability: impl Into<String>, metadata: Value) {
        let map = match metadata {
            Value::Object(map) => map,
            other => {
                tracing::warn!(value = %other, "Ignoring non-object capability metadata");
                Map::new()
            }
        };
        self.entries.insert(capability.into(), map);
    }

    /// Look up a capability's metadata
    pub fn get(&self, capability: &str) -> Result<&Map<String, Value>> {
        self.entries
            .get(capability)
            .ok_or_else(|| CoreError::UnknownCapability(capability.to_string()))
    }

    /// Capability names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// All capabilities merged into one object, for hosts that want a single map
    pub fn merged(&self) -> Map<String, Value> {
        self.entries
            .values()
            .flat_map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_capabilities() {
        let config = MetadataConfig {
            output_template: "ui://widget/board.html".into(),
            widget_domain: "https://widgets.example.com".into(),
            widget_prefers_border: true,
        };
        let registry = MetadataRegistry::from_config(&config).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec![OUTPUT_TEMPLATE, WIDGET]);

        let template = registry.get(OUTPUT_TEMPLATE).unwrap();
        assert_eq!(template["outputTemplate"], "ui://widget/board.html");

        let widget = registry.get(WIDGET).unwrap();
        assert_eq!(widget["widgetPrefersBorder"], true);
        assert_eq!(widget["widgetDomain"], "https://widgets.example.com");
    }

    #[test]
    fn test_unknown_capability() {
        let registry = MetadataRegistry::from_config(&MetadataConfig::default()).unwrap();
        assert!(matches!(
            registry.get("billing"),
            Err(CoreError::UnknownCapability(name)) if name == "billing"
        ));
    }

    #[test]
    fn test_empty_domain_rejected() {
        let config = MetadataConfig {
            widget_domain: "  ".into(),
            ..MetadataConfig::default()
        };
        assert!(matches!(
            MetadataRegistry::from_config(&config),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn test_merged_view() {
        let registry = MetadataRegistry::from_config(&MetadataConfig::default()).unwrap();
        let merged = registry.merged();
        assert_eq!(merged.len(), 3);
        assert!(merged.contains_key("outputTemplate"));
        assert!(merged.contains_key("widgetDomain"));
    }
}
