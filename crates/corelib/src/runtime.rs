//! Module runtime.
//!
//! Turns resolved protocol configurations into live modules. The
//! [`ModuleRegistry`] is the schema-driven implementation: it knows the
//! declared properties of every registered module, and it hands out one
//! shared transport per singleton name.

use crate::error::{Error, Result, Stage};
use crate::module::{GenericProtocol, Protocol, ProtocolSchema, SchemaSource};
use crate::resolver::ResolvedProtocol;
use crate::stack::ProtocolStack;
use crate::transport::Transport;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Constructs live modules by name.
pub trait ModuleRuntime: Send + Sync {
    /// Construct, or reuse if shared, the transport.
    fn create_transport(&self, config: &ResolvedProtocol) -> Result<Arc<Transport>>;

    /// Construct a module with all its properties assigned.
    fn create_protocol(&self, config: &ResolvedProtocol) -> Result<Box<dyn Protocol>>;

    /// Materialize a live stack from a resolved list, transport first.
    ///
    /// Every module is initialized bottom to top.
    ///
    /// # Errors
    /// Staged [`Error::Creation`] naming the transport or protocol step.
    fn materialize(&self, configs: &[ResolvedProtocol]) -> Result<ProtocolStack> {
        let (transport, protocols) = configs
            .split_first()
            .ok_or_else(|| Error::Config("empty protocol stack".to_string()).at(Stage::Transport))?;

        let transport = self
            .create_transport(transport)
            .and_then(|t| t.init().map(|_| t))
            .map_err(|e| e.at(Stage::Transport))?;

        let mut stack = ProtocolStack::new(transport);
        for config in protocols {
            let mut protocol = self
                .create_protocol(config)
                .map_err(|e| e.at(Stage::Protocol))?;
            protocol.init().map_err(|e| e.at(Stage::Protocol))?;
            stack.add_protocol(protocol);
        }
        Ok(stack)
    }
}

/// Schema registry and module runtime.
#[derive(Default)]
pub struct ModuleRegistry {
    schemas: HashMap<String, Arc<ProtocolSchema>>,
    singletons: DashMap<String, Arc<Transport>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module schema, replacing any previous one of that name.
    pub fn register(&mut self, schema: ProtocolSchema) -> Arc<ProtocolSchema> {
        let schema = Arc::new(schema);
        self.schemas
            .insert(schema.name().to_string(), Arc::clone(&schema));
        schema
    }

    pub fn with(mut self, schema: ProtocolSchema) -> Self {
        self.register(schema);
        self
    }

    /// Look up a schema, failing on unknown names.
    pub fn require(&self, name: &str) -> Result<Arc<ProtocolSchema>> {
        self.schema(name)
            .ok_or_else(|| Error::UnknownProtocol(name.to_string()))
    }

    /// Number of live singleton transports.
    pub fn singleton_count(&self) -> usize {
        self.singletons.len()
    }

    fn build_transport(
        &self,
        schema: &ProtocolSchema,
        config: &ResolvedProtocol,
    ) -> Result<Arc<Transport>> {
        if !schema.is_transport() {
            return Err(Error::Config(format!("{} is not a transport", schema.name())));
        }
        Ok(Arc::new(Transport::new(schema, config.properties().clone())?))
    }
}

impl SchemaSource for ModuleRegistry {
    fn schema(&self, name: &str) -> Option<Arc<ProtocolSchema>> {
        self.schemas.get(name).cloned()
    }
}

impl ModuleRuntime for ModuleRegistry {
    fn create_transport(&self, config: &ResolvedProtocol) -> Result<Arc<Transport>> {
        let schema = self.require(config.name())?;
        let Some(singleton) = config.property(crate::properties::SINGLETON_NAME) else {
            return self.build_transport(&schema, config);
        };

        match self.singletons.entry(singleton.to_string()) {
            Entry::Occupied(entry) => {
                let existing = entry.get();
                if existing.name() != config.name() {
                    return Err(Error::Config(format!(
                        "shared transport {singleton} is a {}, not a {}",
                        existing.name(),
                        config.name()
                    )));
                }
                debug!(singleton, "reusing shared transport");
                Ok(Arc::clone(existing))
            }
            Entry::Vacant(entry) => {
                let transport = self.build_transport(&schema, config)?;
                debug!(singleton, transport = %transport.name(), "created shared transport");
                Ok(Arc::clone(entry.insert(transport).value()))
            }
        }
    }

    fn create_protocol(&self, config: &ResolvedProtocol) -> Result<Box<dyn Protocol>> {
        let schema = self.require(config.name())?;
        if schema.is_transport() {
            return Err(Error::Config(format!(
                "transport {} cannot be placed above the bottom of a stack",
                schema.name()
            )));
        }
        let mut protocol = GenericProtocol::new(schema);
        for (name, value) in config.properties() {
            protocol.set_property(name, value)?;
        }
        Ok(Box::new(protocol))
    }
}
