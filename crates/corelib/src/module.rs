//! Live protocol modules.
//!
//! The behavior of individual modules (discovery, failure detection,
//! retransmission, ...) is opaque here. A module is known by its name and by
//! the set of properties it declares, its [`ProtocolSchema`].

use crate::error::{Error, Result};
use crate::properties::TRANSPORT_PROPERTIES;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

/// Declared property names of one protocol module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolSchema {
    name: String,
    properties: BTreeSet<String>,
    transport: bool,
    timer_field: bool,
}

impl ProtocolSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeSet::new(),
            transport: false,
            timer_field: false,
        }
    }

    /// Schema of a transport module; declares the properties every
    /// transport carries.
    pub fn transport(name: impl Into<String>) -> Self {
        let mut schema = Self::new(name);
        schema.transport = true;
        schema
            .properties
            .extend(TRANSPORT_PROPERTIES.iter().map(|p| p.to_string()));
        schema
    }

    pub fn property(mut self, name: impl Into<String>) -> Self {
        self.properties.insert(name.into());
        self
    }

    pub fn properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties.extend(names.into_iter().map(Into::into));
        self
    }

    /// Marks the transport as exposing an assignable timer field.
    pub fn with_timer_field(mut self) -> Self {
        self.timer_field = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains(name)
    }

    pub fn declared(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(String::as_str)
    }

    pub fn is_transport(&self) -> bool {
        self.transport
    }

    pub fn has_timer_field(&self) -> bool {
        self.timer_field
    }
}

/// Looks up protocol schemas by name.
pub trait SchemaSource: Send + Sync {
    fn schema(&self, name: &str) -> Option<std::sync::Arc<ProtocolSchema>>;
}

/// A live protocol module in a stack.
pub trait Protocol: Send + Sync + Debug {
    /// Protocol name; unique within one stack.
    fn name(&self) -> &str;

    /// True if the module declares this property.
    fn has_property(&self, name: &str) -> bool;

    /// Assign a property by name.
    ///
    /// # Errors
    /// - [`Error::UnknownProperty`] if the module does not declare it
    /// - [`Error::InvalidProperty`] if the value cannot be converted
    fn set_property(&mut self, name: &str, value: &str) -> Result<()>;

    /// Initialize the module once all properties are set.
    fn init(&mut self) -> Result<()>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Schema-driven module holding its properties as strings.
#[derive(Clone, Debug)]
pub struct GenericProtocol {
    schema: std::sync::Arc<ProtocolSchema>,
    values: BTreeMap<String, String>,
    initialized: bool,
}

impl GenericProtocol {
    pub fn new(schema: std::sync::Arc<ProtocolSchema>) -> Self {
        Self {
            schema,
            values: BTreeMap::new(),
            initialized: false,
        }
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl Protocol for GenericProtocol {
    fn name(&self) -> &str {
        self.schema.name()
    }

    fn has_property(&self, name: &str) -> bool {
        self.schema.has_property(name)
    }

    fn set_property(&mut self, name: &str, value: &str) -> Result<()> {
        if !self.schema.has_property(name) {
            return Err(Error::UnknownProperty {
                protocol: self.name().to_string(),
                property: name.to_string(),
            });
        }
        self.values.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn init(&mut self) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
