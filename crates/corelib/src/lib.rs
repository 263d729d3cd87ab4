//! Core library for protocol-stack assembly.
//!
//! This crate provides the fundamental abstractions for assembling the
//! protocol stack of a group-communication channel:
//! - Declarative stack configuration and JSON descriptors
//! - Socket bindings and default properties
//! - Property resolution and stack assembly
//! - Live modules, transports, stacks and channels
//! - The module runtime that materializes stacks

pub mod assembler;
pub mod binding;
pub mod channel;
pub mod config;
pub mod defaults;
pub mod descriptor;
pub mod diagnostics;
pub mod error;
pub mod module;
pub mod node;
pub mod properties;
pub mod resolver;
pub mod runtime;
pub mod stack;
pub mod topology;
pub mod transport;

pub use assembler::StackAssembler;
pub use binding::{SocketBinding, SocketBindingProvider, StaticBindings};
pub use channel::{AddressGenerator, Channel, SharedChannel};
pub use config::{
    Environment, ProtocolConfiguration, RelayConfiguration, RemoteSiteConfiguration,
    SiteChannelProvider, StackConfiguration, TransportConfiguration,
};
pub use defaults::{DefaultsProvider, StaticDefaults};
pub use descriptor::StackDescriptor;
pub use diagnostics::{Diagnostic, DiagnosticSink, RecordingSink, TracingSink};
pub use error::{Error, Result, Stage};
pub use module::{GenericProtocol, Protocol, ProtocolSchema, SchemaSource};
pub use node::{ChannelAddress, NodeId};
pub use resolver::{PropertyResolver, ResolvedProtocol};
pub use runtime::{ModuleRegistry, ModuleRuntime};
pub use stack::ProtocolStack;
pub use topology::Topology;
pub use transport::Transport;
