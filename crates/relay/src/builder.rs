//! Relay assembly.
//!
//! # Algorithm
//!
//! 1. Site list: the local site first, then every remote site in declared
//!    order, each name once
//! 2. Bridge map keyed by cluster name; a later remote site with the same
//!    cluster name replaces the earlier bridge's channel supplier
//! 3. One site config per site; the local site's config gets every bridge
//! 4. Relay properties are assigned by name; unknown names are reported
//!    and skipped
//! 5. The relay is pushed on the live stack and initialized
//!
//! Bridge channels are the pre-existing channels of the remote sites with
//! the fork module stripped: a bridge must not carry the multiplexing
//! layer, or relay and fork channels would see inconsistent views.

use crate::protocol::RelayProtocol;
use crate::site::{BridgeConfig, SiteConfig};
use corelib::properties::{FORK, RELAY};
use corelib::{
    Diagnostic, DiagnosticSink, Error, Protocol, ProtocolStack, RelayConfiguration,
    RemoteSiteConfiguration, Result, SharedChannel, Stage,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Builds the relay module of a stack from its relay configuration.
pub struct RelayBuilder<'a> {
    configuration: &'a RelayConfiguration,
    sink: &'a dyn DiagnosticSink,
}

impl<'a> RelayBuilder<'a> {
    pub fn new(configuration: &'a RelayConfiguration, sink: &'a dyn DiagnosticSink) -> Self {
        Self {
            configuration,
            sink,
        }
    }

    /// Site names, local site first, each once.
    pub fn sites(&self) -> Vec<&'a str> {
        let configuration = self.configuration;
        let mut sites = vec![configuration.site_name()];
        for remote in configuration.remote_sites() {
            if !sites.contains(&remote.name()) {
                sites.push(remote.name());
            }
        }
        sites
    }

    /// Bridges keyed by cluster name.
    pub fn bridges(&self) -> BTreeMap<String, BridgeConfig> {
        let mut bridges = BTreeMap::new();
        for remote in self.configuration.remote_sites() {
            let cluster = remote.cluster_name().to_string();
            let bridge = BridgeConfig::new(cluster.clone(), bridge_supplier(remote.clone()));
            bridges.insert(cluster, bridge);
        }
        bridges
    }

    /// Construct and configure the relay module without installing it.
    ///
    /// # Errors
    /// [`Error::InvalidProperty`] if a known field gets an unparsable value.
    pub fn build(&self) -> Result<RelayProtocol> {
        let local = self.configuration.site_name();
        let bridges = self.bridges();

        let mut relay = RelayProtocol::new(local);
        for site in self.sites() {
            let mut config = SiteConfig::new(site);
            if site == local {
                for bridge in bridges.values() {
                    config.add_bridge(bridge.clone());
                }
            }
            relay.add_site(config);
        }

        for (name, value) in self.configuration.properties() {
            match relay.set_property(name, value) {
                Ok(()) => debug!(protocol = RELAY, property = %name, %value, "set relay property"),
                Err(Error::UnknownProperty { protocol, property }) => {
                    self.sink.report(Diagnostic::UnsupportedField {
                        protocol,
                        field: property,
                        value: value.clone(),
                    })
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            site = %local,
            sites = relay.sites().len(),
            bridges = bridges.len(),
            "built relay"
        );
        Ok(relay)
    }

    /// Build the relay, push it on top of the stack and initialize it.
    pub fn install(&self, stack: &mut ProtocolStack) -> Result<()> {
        let mut relay = self.build()?;
        relay.init()?;
        stack.add_protocol(Box::new(relay));
        Ok(())
    }
}

/// Supplier handing out a remote site's channel without its fork module.
fn bridge_supplier(remote: RemoteSiteConfiguration) -> crate::site::ChannelSupplier {
    Arc::new(move || -> Result<SharedChannel> {
        let channel = remote.channel().map_err(|e| {
            Error::SiteChannel {
                site: remote.name().to_string(),
                reason: e.to_string(),
            }
            .at(Stage::Bridge)
        })?;
        let mut removed = 0;
        {
            let mut guard = channel.lock();
            while guard.protocol_stack_mut().remove_protocol(FORK).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(
                site = %remote.name(),
                cluster = %remote.cluster_name(),
                removed,
                "removed fork from bridge channel"
            );
        }
        Ok(channel)
    })
}
