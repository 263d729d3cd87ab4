//! Default protocol properties.

use std::collections::BTreeMap;

/// Supplies default property values per protocol name.
pub trait DefaultsProvider: Send + Sync {
    /// Default properties of a protocol; empty if none are registered.
    fn properties(&self, protocol: &str) -> BTreeMap<String, String>;
}

/// Defaults held in memory.
#[derive(Clone, Debug, Default)]
pub struct StaticDefaults {
    defaults: BTreeMap<String, BTreeMap<String, String>>,
}

impl StaticDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, protocol: &str, name: &str, value: &str) -> Self {
        self.insert(protocol, name, value);
        self
    }

    pub fn insert(&mut self, protocol: &str, name: &str, value: &str) {
        self.defaults
            .entry(protocol.to_string())
            .or_default()
            .insert(name.to_string(), value.to_string());
    }
}

impl From<BTreeMap<String, BTreeMap<String, String>>> for StaticDefaults {
    fn from(defaults: BTreeMap<String, BTreeMap<String, String>>) -> Self {
        Self { defaults }
    }
}

impl DefaultsProvider for StaticDefaults {
    fn properties(&self, protocol: &str) -> BTreeMap<String, String> {
        self.defaults.get(protocol).cloned().unwrap_or_default()
    }
}
