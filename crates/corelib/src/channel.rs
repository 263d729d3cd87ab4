//! Channels.
//!
//! A channel is the object applications talk to: a named stack of live
//! modules plus the means of generating its member address.

use crate::node::{ChannelAddress, NodeId};
use crate::stack::ProtocolStack;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// A channel shared between owners, e.g. a site channel reused as a relay
/// bridge.
pub type SharedChannel = Arc<Mutex<Channel>>;

/// Generates the address a channel joins its cluster with.
pub trait AddressGenerator: Send + Sync {
    fn generate_address(&self, name: Option<&str>) -> ChannelAddress;
}

/// A constructed channel.
pub struct Channel {
    name: Option<String>,
    stack: ProtocolStack,
    address_generator: Option<Box<dyn AddressGenerator>>,
}

impl Channel {
    pub fn new(stack: ProtocolStack) -> Self {
        Self {
            name: None,
            stack,
            address_generator: None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn protocol_stack(&self) -> &ProtocolStack {
        &self.stack
    }

    pub fn protocol_stack_mut(&mut self) -> &mut ProtocolStack {
        &mut self.stack
    }

    pub fn set_address_generator(&mut self, generator: Box<dyn AddressGenerator>) {
        self.address_generator = Some(generator);
    }

    pub fn has_address_generator(&self) -> bool {
        self.address_generator.is_some()
    }

    /// Generate a member address, through the installed generator if any.
    pub fn generate_address(&self) -> ChannelAddress {
        match &self.address_generator {
            Some(generator) => generator.generate_address(self.name()),
            None => ChannelAddress::new(
                NodeId::generate(self.name().unwrap_or_default()),
                self.name.clone(),
            ),
        }
    }

    /// Wrap this channel for shared ownership.
    pub fn into_shared(self) -> SharedChannel {
        Arc::new(Mutex::new(self))
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("stack", &self.stack.protocol_names())
            .field("address_generator", &self.address_generator.is_some())
            .finish()
    }
}
