//! Property resolution.
//!
//! # Algorithm
//!
//! For each protocol:
//!
//! 1. Start from the defaults registered for the protocol name
//! 2. Overlay the explicit properties of the configuration
//! 3. Snapshot the merged map as the "original" properties
//! 4. Inject socket-binding values for declared properties only, refusing
//!    to replace any key present in the snapshot
//!
//! Protocols with their own binding get bind address, bind port, start port
//! and the multicast pair. Protocols without one inherit only the bind
//! address of the transport's binding. On stacks whose transport does not
//! declare a multicast address, multicast retransmission is switched off on
//! every protocol declaring the switch.

use crate::binding::SocketBinding;
use crate::config::{ProtocolConfiguration, StackConfiguration};
use crate::defaults::DefaultsProvider;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::properties::{BIND_ADDR, BIND_PORT, MCAST_ADDR, MCAST_PORT, START_PORT, USE_MCAST_XMIT};
use std::collections::BTreeMap;

/// A protocol with its final properties, ready to be materialized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedProtocol {
    name: String,
    properties: BTreeMap<String, String>,
    original: BTreeMap<String, String>,
}

impl ResolvedProtocol {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Defaults merged with explicit properties, before any socket-binding
    /// injection.
    pub fn original_properties(&self) -> &BTreeMap<String, String> {
        &self.original
    }

    /// Put a property unconditionally.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }
}

/// Merges defaults, explicit properties and socket bindings.
pub struct PropertyResolver<'a> {
    defaults: &'a dyn DefaultsProvider,
    sink: &'a dyn DiagnosticSink,
}

impl<'a> PropertyResolver<'a> {
    pub fn new(defaults: &'a dyn DefaultsProvider, sink: &'a dyn DiagnosticSink) -> Self {
        Self { defaults, sink }
    }

    /// Merge defaults with explicit properties; explicit values win.
    pub fn resolve(&self, protocol: &ProtocolConfiguration) -> ResolvedProtocol {
        let mut properties = self.defaults.properties(protocol.name());
        properties.extend(
            protocol
                .explicit_properties()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        ResolvedProtocol {
            name: protocol.name().to_string(),
            original: properties.clone(),
            properties,
        }
    }

    /// Resolve every non-transport protocol of a stack, in order.
    pub fn resolve_protocols(&self, stack: &StackConfiguration) -> Vec<ResolvedProtocol> {
        let transport = stack.transport();
        let supports_multicast = transport.protocol().has_property(MCAST_ADDR);

        stack
            .protocols()
            .iter()
            .map(|protocol| {
                let mut resolved = self.resolve(protocol);
                if let Some(binding) = protocol.binding() {
                    self.bind_address(protocol, &mut resolved, binding);
                    self.server_port(protocol, &mut resolved, BIND_PORT, binding);
                    self.server_port(protocol, &mut resolved, START_PORT, binding);
                    self.multicast(protocol, &mut resolved, MCAST_ADDR, MCAST_PORT, binding);
                } else if let Some(binding) = transport.binding() {
                    // Bind address only; ports stay with the protocol.
                    self.bind_address(protocol, &mut resolved, binding);
                }
                if !supports_multicast {
                    self.disable_multicast_retransmission(protocol, &mut resolved);
                }
                resolved
            })
            .collect()
    }

    /// Inject the binding's address as `bind_addr`.
    pub fn bind_address(
        &self,
        protocol: &ProtocolConfiguration,
        resolved: &mut ResolvedProtocol,
        binding: &SocketBinding,
    ) {
        let address = binding.socket_address().ip().to_string();
        self.set_no_override(protocol, resolved, BIND_ADDR, address);
    }

    /// Inject the binding's port under `property`.
    pub fn server_port(
        &self,
        protocol: &ProtocolConfiguration,
        resolved: &mut ResolvedProtocol,
        property: &str,
        binding: &SocketBinding,
    ) {
        let port = binding.socket_address().port().to_string();
        self.set_no_override(protocol, resolved, property, port);
    }

    /// Inject the binding's multicast address and port.
    ///
    /// A binding without multicast is reported and skipped, but only for
    /// protocols declaring either property.
    pub fn multicast(
        &self,
        protocol: &ProtocolConfiguration,
        resolved: &mut ResolvedProtocol,
        address_property: &str,
        port_property: &str,
        binding: &SocketBinding,
    ) {
        if !protocol.has_property(address_property) && !protocol.has_property(port_property) {
            return;
        }
        match binding.multicast_socket_address() {
            Ok(multicast) => {
                let address = multicast.ip().to_string();
                self.set_no_override(protocol, resolved, address_property, address);
                let port = multicast.port().to_string();
                self.set_no_override(protocol, resolved, port_property, port);
            }
            Err(_) => {
                self.sink.report(Diagnostic::MulticastUnavailable {
                    protocol: protocol.name().to_string(),
                    address_property: address_property.to_string(),
                    port_property: port_property.to_string(),
                    binding: binding.name().to_string(),
                });
            }
        }
    }

    /// Force multicast retransmission off if the protocol declares it.
    pub fn disable_multicast_retransmission(
        &self,
        protocol: &ProtocolConfiguration,
        resolved: &mut ResolvedProtocol,
    ) {
        if protocol.has_property(USE_MCAST_XMIT) {
            resolved.insert(USE_MCAST_XMIT, false.to_string());
        }
    }

    fn set_no_override(
        &self,
        protocol: &ProtocolConfiguration,
        resolved: &mut ResolvedProtocol,
        name: &str,
        value: String,
    ) {
        if !protocol.has_property(name) {
            return;
        }
        if let Some(existing) = resolved.original.get(name) {
            self.sink.report(Diagnostic::OverrideRefused {
                protocol: protocol.name().to_string(),
                property: name.to_string(),
                attempted: value,
                existing: existing.clone(),
            });
            return;
        }
        resolved.properties.insert(name.to_string(), value);
    }
}
