//! Live protocol stacks.
//!
//! A stack is the ordered pipeline of one channel: the transport at the
//! bottom, then every other module upwards. Order is bottom-to-top.

use crate::module::Protocol;
use crate::transport::Transport;
use std::sync::Arc;

/// Ordered modules of one channel.
#[derive(Debug)]
pub struct ProtocolStack {
    transport: Arc<Transport>,
    protocols: Vec<Box<dyn Protocol>>,
}

impl ProtocolStack {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self {
            transport,
            protocols: Vec::new(),
        }
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    /// Push a module on top of the stack.
    pub fn add_protocol(&mut self, protocol: Box<dyn Protocol>) {
        self.protocols.push(protocol);
    }

    /// Remove the topmost module with the given name.
    pub fn remove_protocol(&mut self, name: &str) -> Option<Box<dyn Protocol>> {
        let index = self.protocols.iter().rposition(|p| p.name() == name)?;
        Some(self.protocols.remove(index))
    }

    pub fn find_protocol(&self, name: &str) -> Option<&dyn Protocol> {
        self.protocols
            .iter()
            .rev()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    pub fn find_protocol_mut(&mut self, name: &str) -> Option<&mut (dyn Protocol + 'static)> {
        self.protocols
            .iter_mut()
            .rev()
            .find(|p| p.name() == name)
            .map(|p| p.as_mut())
    }

    /// Downcast the topmost module with the given name.
    pub fn find<T: Protocol + 'static>(&self, name: &str) -> Option<&T> {
        self.find_protocol(name)?.as_any().downcast_ref::<T>()
    }

    pub fn top(&self) -> Option<&dyn Protocol> {
        self.protocols.last().map(|p| p.as_ref())
    }

    /// Module names from bottom to top, transport first.
    pub fn protocol_names(&self) -> Vec<&str> {
        std::iter::once(self.transport.name())
            .chain(self.protocols.iter().map(|p| p.name()))
            .collect()
    }

    /// Number of modules, transport included.
    pub fn len(&self) -> usize {
        self.protocols.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}
