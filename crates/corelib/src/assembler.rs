//! Stack assembly.
//!
//! Produces the ordered list of resolved protocols for a stack. The
//! transport always comes first; the configured protocols follow in their
//! declared order. The list is bottom-to-top placement of the live modules.

use crate::config::StackConfiguration;
use crate::diagnostics::DiagnosticSink;
use crate::properties::{
    BIND_PORT, DIAGNOSTICS_ADDR, DIAGNOSTICS_PORT, ENABLE_DIAGNOSTICS, MCAST_ADDR, MCAST_PORT,
    SINGLETON_NAME,
};
use crate::resolver::{PropertyResolver, ResolvedProtocol};
use tracing::debug;

/// Assembles the resolved protocol list of one stack.
pub struct StackAssembler<'a> {
    configuration: &'a StackConfiguration,
    sink: &'a dyn DiagnosticSink,
}

impl<'a> StackAssembler<'a> {
    pub fn new(configuration: &'a StackConfiguration, sink: &'a dyn DiagnosticSink) -> Self {
        Self {
            configuration,
            sink,
        }
    }

    /// Resolve the transport and every protocol, transport first.
    pub fn assemble(&self) -> Vec<ResolvedProtocol> {
        let resolver = PropertyResolver::new(self.configuration.defaults(), self.sink);

        let mut stack = Vec::with_capacity(self.configuration.protocols().len() + 1);
        stack.push(self.transport(&resolver));
        stack.extend(resolver.resolve_protocols(self.configuration));

        debug!(
            stack = %self.configuration.name(),
            protocols = ?stack.iter().map(ResolvedProtocol::name).collect::<Vec<_>>(),
            "assembled protocol stack"
        );
        stack
    }

    fn transport(&self, resolver: &PropertyResolver<'_>) -> ResolvedProtocol {
        let transport = self.configuration.transport();
        let protocol = transport.protocol();
        let mut resolved = resolver.resolve(protocol);

        if transport.is_shared() {
            resolved.insert(SINGLETON_NAME, self.configuration.name());
        }

        if let Some(binding) = transport.binding() {
            resolver.bind_address(protocol, &mut resolved, binding);
            resolver.server_port(protocol, &mut resolved, BIND_PORT, binding);
            resolver.multicast(protocol, &mut resolved, MCAST_ADDR, MCAST_PORT, binding);
        }

        let diagnostics = transport.diagnostics_binding();
        resolved.insert(ENABLE_DIAGNOSTICS, diagnostics.is_some().to_string());
        if let Some(binding) = diagnostics {
            resolver.multicast(
                protocol,
                &mut resolved,
                DIAGNOSTICS_ADDR,
                DIAGNOSTICS_PORT,
                binding,
            );
        }

        if !protocol.has_property(MCAST_ADDR) {
            resolver.disable_multicast_retransmission(protocol, &mut resolved);
        }

        resolved
    }
}
