//! The fork module.
//!
//! Sits on top of every channel created by the factory and lets several
//! light-weight fork channels share the one main channel. Fork channels are
//! registered by fork stack id and channel id; the module itself carries no
//! configuration.

use corelib::properties::FORK;
use corelib::{Error, Protocol, ProtocolStack, Result};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Default)]
pub struct ForkProtocol {
    channels: Mutex<BTreeSet<(String, String)>>,
    initialized: bool,
}

impl ForkProtocol {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fork channel.
    ///
    /// Returns false if a channel with the same ids is already registered.
    pub fn register_fork_channel(&self, stack_id: &str, channel_id: &str) -> bool {
        let inserted = self
            .channels
            .lock()
            .insert((stack_id.to_string(), channel_id.to_string()));
        if inserted {
            debug!(fork_stack = %stack_id, fork_channel = %channel_id, "registered fork channel");
        }
        inserted
    }

    pub fn unregister_fork_channel(&self, stack_id: &str, channel_id: &str) -> bool {
        self.channels
            .lock()
            .remove(&(stack_id.to_string(), channel_id.to_string()))
    }

    pub fn fork_channel_count(&self) -> usize {
        self.channels.lock().len()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Push an initialized fork module on top of the stack.
    pub fn install(stack: &mut ProtocolStack) -> Result<()> {
        let mut fork = Self::new();
        fork.init()?;
        stack.add_protocol(Box::new(fork));
        Ok(())
    }
}

impl Protocol for ForkProtocol {
    fn name(&self) -> &str {
        FORK
    }

    fn has_property(&self, _name: &str) -> bool {
        false
    }

    fn set_property(&mut self, name: &str, _value: &str) -> Result<()> {
        Err(Error::UnknownProperty {
            protocol: FORK.to_string(),
            property: name.to_string(),
        })
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
