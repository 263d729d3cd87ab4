//! Declarative stack configuration.
//!
//! Configuration objects are built once when the cluster configuration is
//! loaded and are read-only afterwards. A [`StackConfiguration`] owns its
//! transport, its ordered protocols, its defaults and an optional relay.
//!
//! # Invariants
//!
//! - Protocol names are unique within a stack, transport included
//! - `RELAY2` and `FORK` are reserved for the modules the factory appends
//! - Protocol order is stack order, bottom to top, and is preserved exactly

use crate::binding::SocketBinding;
use crate::channel::SharedChannel;
use crate::defaults::{DefaultsProvider, StaticDefaults};
use crate::error::{Error, Result};
use crate::module::ProtocolSchema;
use crate::properties::{FORK, RELAY};
use crate::topology::Topology;
use crate::transport::{Executor, ScheduledExecutor, ThreadFactory};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Modules appended by the channel factory, never declared by a stack.
const RESERVED_PROTOCOLS: [&str; 2] = [RELAY, FORK];

/// One protocol of a stack: name, explicit properties, optional binding.
#[derive(Clone, Debug)]
pub struct ProtocolConfiguration {
    schema: Arc<ProtocolSchema>,
    properties: BTreeMap<String, String>,
    socket_binding: Option<SocketBinding>,
}

impl ProtocolConfiguration {
    pub fn new(schema: Arc<ProtocolSchema>) -> Self {
        Self {
            schema,
            properties: BTreeMap::new(),
            socket_binding: None,
        }
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn properties<I, K, V>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.properties
            .extend(properties.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn socket_binding(mut self, binding: SocketBinding) -> Self {
        self.socket_binding = Some(binding);
        self
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn schema(&self) -> &Arc<ProtocolSchema> {
        &self.schema
    }

    /// Properties set explicitly on this protocol.
    pub fn explicit_properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn binding(&self) -> Option<&SocketBinding> {
        self.socket_binding.as_ref()
    }

    /// True if the protocol module declares this property.
    pub fn has_property(&self, name: &str) -> bool {
        self.schema.has_property(name)
    }
}

/// The transport of a stack and the resources handed to it.
#[derive(Clone)]
pub struct TransportConfiguration {
    protocol: ProtocolConfiguration,
    diagnostics_socket_binding: Option<SocketBinding>,
    shared: bool,
    default_executor: Option<Arc<dyn Executor>>,
    oob_executor: Option<Arc<dyn Executor>>,
    timer_executor: Option<Arc<dyn ScheduledExecutor>>,
    thread_factory: Option<Arc<dyn ThreadFactory>>,
    topology: Option<Topology>,
}

impl TransportConfiguration {
    pub fn new(protocol: ProtocolConfiguration) -> Self {
        Self {
            protocol,
            diagnostics_socket_binding: None,
            shared: false,
            default_executor: None,
            oob_executor: None,
            timer_executor: None,
            thread_factory: None,
            topology: None,
        }
    }

    pub fn diagnostics_socket_binding(mut self, binding: SocketBinding) -> Self {
        self.diagnostics_socket_binding = Some(binding);
        self
    }

    pub fn shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }

    pub fn default_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.default_executor = Some(executor);
        self
    }

    pub fn oob_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.oob_executor = Some(executor);
        self
    }

    pub fn timer_executor(mut self, executor: Arc<dyn ScheduledExecutor>) -> Self {
        self.timer_executor = Some(executor);
        self
    }

    pub fn thread_factory(mut self, factory: Arc<dyn ThreadFactory>) -> Self {
        self.thread_factory = Some(factory);
        self
    }

    pub fn topology(mut self, topology: Topology) -> Self {
        self.topology = Some(topology);
        self
    }

    /// The transport viewed as a protocol of the stack.
    pub fn protocol(&self) -> &ProtocolConfiguration {
        &self.protocol
    }

    pub fn name(&self) -> &str {
        self.protocol.name()
    }

    pub fn binding(&self) -> Option<&SocketBinding> {
        self.protocol.binding()
    }

    pub fn diagnostics_binding(&self) -> Option<&SocketBinding> {
        self.diagnostics_socket_binding.as_ref()
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn get_default_executor(&self) -> Option<&Arc<dyn Executor>> {
        self.default_executor.as_ref()
    }

    pub fn get_oob_executor(&self) -> Option<&Arc<dyn Executor>> {
        self.oob_executor.as_ref()
    }

    pub fn get_timer_executor(&self) -> Option<&Arc<dyn ScheduledExecutor>> {
        self.timer_executor.as_ref()
    }

    pub fn get_thread_factory(&self) -> Option<&Arc<dyn ThreadFactory>> {
        self.thread_factory.as_ref()
    }

    pub fn get_topology(&self) -> Option<&Topology> {
        self.topology.as_ref()
    }
}

impl fmt::Debug for TransportConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfiguration")
            .field("protocol", &self.protocol)
            .field("diagnostics_socket_binding", &self.diagnostics_socket_binding)
            .field("shared", &self.shared)
            .field("default_executor", &self.default_executor.is_some())
            .field("oob_executor", &self.oob_executor.is_some())
            .field("timer_executor", &self.timer_executor.is_some())
            .field("thread_factory", &self.thread_factory.is_some())
            .field("topology", &self.topology)
            .finish()
    }
}

/// Hands out the already-constructed channel of a site.
pub trait SiteChannelProvider: Send + Sync {
    fn channel(&self, site: &str) -> Result<SharedChannel>;
}

impl<F> SiteChannelProvider for F
where
    F: Fn(&str) -> Result<SharedChannel> + Send + Sync,
{
    fn channel(&self, site: &str) -> Result<SharedChannel> {
        self(site)
    }
}

/// A remote site reached through a bridge cluster.
#[derive(Clone)]
pub struct RemoteSiteConfiguration {
    name: String,
    cluster_name: String,
    provider: Arc<dyn SiteChannelProvider>,
}

impl RemoteSiteConfiguration {
    pub fn new(
        name: impl Into<String>,
        cluster_name: impl Into<String>,
        provider: Arc<dyn SiteChannelProvider>,
    ) -> Self {
        Self {
            name: name.into(),
            cluster_name: cluster_name.into(),
            provider,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the bridge cluster joining this site.
    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// The channel this site is reached through.
    pub fn channel(&self) -> Result<SharedChannel> {
        self.provider.channel(&self.name)
    }
}

impl fmt::Debug for RemoteSiteConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSiteConfiguration")
            .field("name", &self.name)
            .field("cluster_name", &self.cluster_name)
            .finish_non_exhaustive()
    }
}

/// Multi-site relay settings: the local site and its remote sites.
#[derive(Clone, Debug)]
pub struct RelayConfiguration {
    site: String,
    remote_sites: Vec<RemoteSiteConfiguration>,
    properties: BTreeMap<String, String>,
}

impl RelayConfiguration {
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            remote_sites: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn remote_site(mut self, site: RemoteSiteConfiguration) -> Self {
        self.remote_sites.push(site);
        self
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Name of the local site.
    pub fn site_name(&self) -> &str {
        &self.site
    }

    pub fn remote_sites(&self) -> &[RemoteSiteConfiguration] {
        &self.remote_sites
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }
}

/// Environment of the local node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Environment {
    node_name: String,
}

impl Environment {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }
}

/// A complete, immutable stack configuration.
#[derive(Clone)]
pub struct StackConfiguration {
    name: String,
    transport: TransportConfiguration,
    protocols: Vec<ProtocolConfiguration>,
    defaults: Arc<dyn DefaultsProvider>,
    relay: Option<RelayConfiguration>,
    environment: Environment,
}

impl StackConfiguration {
    pub fn builder(
        name: impl Into<String>,
        transport: TransportConfiguration,
    ) -> StackConfigurationBuilder {
        StackConfigurationBuilder {
            name: name.into(),
            transport,
            protocols: Vec::new(),
            defaults: Arc::new(StaticDefaults::default()),
            relay: None,
            environment: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transport(&self) -> &TransportConfiguration {
        &self.transport
    }

    /// Protocols above the transport, bottom to top.
    pub fn protocols(&self) -> &[ProtocolConfiguration] {
        &self.protocols
    }

    pub fn defaults(&self) -> &dyn DefaultsProvider {
        self.defaults.as_ref()
    }

    pub fn relay(&self) -> Option<&RelayConfiguration> {
        self.relay.as_ref()
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Every socket binding used by this stack, deduplicated by name.
    ///
    /// Order: transport, diagnostics, then protocol bindings bottom to top.
    pub fn socket_bindings(&self) -> Vec<SocketBinding> {
        let mut seen = HashSet::new();
        self.transport
            .binding()
            .into_iter()
            .chain(self.transport.diagnostics_binding())
            .chain(self.protocols.iter().filter_map(|p| p.binding()))
            .filter(|b| seen.insert(b.name().to_string()))
            .cloned()
            .collect()
    }
}

impl fmt::Debug for StackConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackConfiguration")
            .field("name", &self.name)
            .field("transport", &self.transport)
            .field("protocols", &self.protocols)
            .field("relay", &self.relay)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

/// Builder for [`StackConfiguration`].
pub struct StackConfigurationBuilder {
    name: String,
    transport: TransportConfiguration,
    protocols: Vec<ProtocolConfiguration>,
    defaults: Arc<dyn DefaultsProvider>,
    relay: Option<RelayConfiguration>,
    environment: Option<Environment>,
}

impl StackConfigurationBuilder {
    /// Append a protocol on top of those added so far.
    pub fn protocol(mut self, protocol: ProtocolConfiguration) -> Self {
        self.protocols.push(protocol);
        self
    }

    pub fn defaults(mut self, defaults: Arc<dyn DefaultsProvider>) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn relay(mut self, relay: RelayConfiguration) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Validate and freeze the configuration.
    ///
    /// # Errors
    /// [`Error::Config`] if a protocol name repeats, names a module the
    /// channel factory installs itself, or the stack name is empty.
    pub fn build(self) -> Result<StackConfiguration> {
        if self.name.is_empty() {
            return Err(Error::Config("stack name must not be empty".to_string()));
        }

        let mut names = HashSet::new();
        let all = std::iter::once(self.transport.protocol()).chain(self.protocols.iter());
        for protocol in all {
            if RESERVED_PROTOCOLS.contains(&protocol.name()) {
                return Err(Error::Config(format!(
                    "protocol {} is reserved and cannot be declared in stack {}",
                    protocol.name(),
                    self.name
                )));
            }
            if !names.insert(protocol.name()) {
                return Err(Error::Config(format!(
                    "duplicate protocol {} in stack {}",
                    protocol.name(),
                    self.name
                )));
            }
        }

        let environment = self
            .environment
            .unwrap_or_else(|| Environment::new(self.name.clone()));

        Ok(StackConfiguration {
            name: self.name,
            transport: self.transport,
            protocols: self.protocols,
            defaults: self.defaults,
            relay: self.relay,
            environment,
        })
    }
}
