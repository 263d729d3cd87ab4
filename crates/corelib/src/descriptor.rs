//! JSON stack descriptors.
//!
//! A descriptor is the serialized form of a stack configuration, as loaded
//! from a cluster configuration file. It names modules and socket bindings
//! as strings; [`StackDescriptor::build`] resolves them into a
//! [`StackConfiguration`].
//!
//! ```json
//! {
//!   "name": "udp",
//!   "node_name": "node1",
//!   "socket_bindings": {
//!     "jgroups-udp": { "address": "10.0.0.1", "port": 55200,
//!                      "multicast_address": "230.0.0.4", "multicast_port": 45688 }
//!   },
//!   "transport": { "type": "UDP", "socket_binding": "jgroups-udp", "shared": true },
//!   "protocols": [ { "type": "PING" }, { "type": "MERGE3" } ]
//! }
//! ```

use crate::binding::{SocketBinding, SocketBindingProvider, StaticBindings};
use crate::config::{
    Environment, ProtocolConfiguration, RelayConfiguration, RemoteSiteConfiguration,
    SiteChannelProvider, StackConfiguration, TransportConfiguration,
};
use crate::defaults::StaticDefaults;
use crate::error::{Error, Result};
use crate::module::{ProtocolSchema, SchemaSource};
use crate::topology::Topology;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;

/// A module known to the runtime and the properties it declares.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub name: String,
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default)]
    pub transport: bool,
    #[serde(default)]
    pub timer_field: bool,
}

impl ModuleDescriptor {
    pub fn to_schema(&self) -> ProtocolSchema {
        let schema = if self.transport {
            ProtocolSchema::transport(self.name.as_str())
        } else {
            ProtocolSchema::new(self.name.as_str())
        }
        .properties(self.properties.iter().cloned());
        if self.timer_field {
            schema.with_timer_field()
        } else {
            schema
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketBindingDescriptor {
    pub address: IpAddr,
    pub port: u16,
    #[serde(default)]
    pub multicast_address: Option<IpAddr>,
    #[serde(default)]
    pub multicast_port: Option<u16>,
}

impl SocketBindingDescriptor {
    pub fn to_binding(&self, name: &str) -> Result<SocketBinding> {
        let binding = SocketBinding::new(name, SocketAddr::new(self.address, self.port));
        match (self.multicast_address, self.multicast_port) {
            (Some(address), Some(port)) => {
                Ok(binding.with_multicast(SocketAddr::new(address, port)))
            }
            (None, None) => Ok(binding),
            _ => Err(Error::Config(format!(
                "socket binding {name} needs both multicast_address and multicast_port"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolDescriptor {
    #[serde(rename = "type")]
    pub name: String,
    #[serde(default)]
    pub socket_binding: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportDescriptor {
    #[serde(flatten)]
    pub protocol: ProtocolDescriptor,
    #[serde(default)]
    pub diagnostics_socket_binding: Option<String>,
    #[serde(default)]
    pub shared: bool,
    #[serde(default)]
    pub topology: Option<Topology>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSiteDescriptor {
    pub name: String,
    pub cluster: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayDescriptor {
    pub site: String,
    #[serde(default)]
    pub remote_sites: Vec<RemoteSiteDescriptor>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// Serialized stack configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDescriptor {
    pub name: String,
    #[serde(default)]
    pub node_name: Option<String>,
    #[serde(default)]
    pub modules: Vec<ModuleDescriptor>,
    #[serde(default)]
    pub socket_bindings: BTreeMap<String, SocketBindingDescriptor>,
    #[serde(default)]
    pub defaults: BTreeMap<String, BTreeMap<String, String>>,
    pub transport: TransportDescriptor,
    #[serde(default)]
    pub protocols: Vec<ProtocolDescriptor>,
    #[serde(default)]
    pub relay: Option<RelayDescriptor>,
}

impl StackDescriptor {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("json: {e}")))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Config(format!("json: {e}")))
    }

    /// Schemas of the modules catalogued in this descriptor.
    pub fn schemas(&self) -> impl Iterator<Item = ProtocolSchema> + '_ {
        self.modules.iter().map(ModuleDescriptor::to_schema)
    }

    /// Socket bindings declared in this descriptor.
    pub fn bindings(&self) -> Result<StaticBindings> {
        let mut bindings = StaticBindings::new();
        for (name, descriptor) in &self.socket_bindings {
            bindings.insert(descriptor.to_binding(name)?);
        }
        Ok(bindings)
    }

    /// Build the stack configuration.
    ///
    /// # Arguments
    /// * `schemas` - module schemas, usually the module registry
    /// * `sites` - channel provider for remote sites; required when a relay
    ///   with remote sites is described
    ///
    /// # Errors
    /// [`Error::UnknownProtocol`], [`Error::UnknownSocketBinding`] or
    /// [`Error::Config`] on inconsistent descriptors.
    pub fn build(
        &self,
        schemas: &dyn SchemaSource,
        sites: Option<Arc<dyn SiteChannelProvider>>,
    ) -> Result<StackConfiguration> {
        let bindings = self.bindings()?;

        let transport_protocol = protocol(&self.transport.protocol, schemas, &bindings)?;
        let mut transport =
            TransportConfiguration::new(transport_protocol).shared(self.transport.shared);
        if let Some(name) = &self.transport.diagnostics_socket_binding {
            transport = transport.diagnostics_socket_binding(bindings.resolve(name)?);
        }
        if let Some(topology) = &self.transport.topology {
            transport = transport.topology(topology.clone());
        }

        let mut builder = StackConfiguration::builder(self.name.as_str(), transport)
            .defaults(Arc::new(StaticDefaults::from(self.defaults.clone())))
            .environment(Environment::new(
                self.node_name.clone().unwrap_or_else(|| self.name.clone()),
            ));
        for descriptor in &self.protocols {
            builder = builder.protocol(protocol(descriptor, schemas, &bindings)?);
        }

        if let Some(relay) = &self.relay {
            let mut configuration = RelayConfiguration::new(relay.site.as_str());
            for (name, value) in &relay.properties {
                configuration = configuration.property(name.as_str(), value.as_str());
            }
            for site in &relay.remote_sites {
                let provider = sites.clone().ok_or_else(|| {
                    Error::Config(format!("no channel provider for remote site {}", site.name))
                })?;
                configuration = configuration.remote_site(RemoteSiteConfiguration::new(
                    site.name.as_str(),
                    site.cluster.as_str(),
                    provider,
                ));
            }
            builder = builder.relay(configuration);
        }

        builder.build()
    }
}

fn protocol(
    descriptor: &ProtocolDescriptor,
    schemas: &dyn SchemaSource,
    bindings: &StaticBindings,
) -> Result<ProtocolConfiguration> {
    let schema = schemas
        .schema(&descriptor.name)
        .ok_or_else(|| Error::UnknownProtocol(descriptor.name.clone()))?;
    let mut protocol = ProtocolConfiguration::new(schema).properties(descriptor.properties.clone());
    if let Some(name) = &descriptor.socket_binding {
        protocol = protocol.socket_binding(bindings.resolve(name)?);
    }
    Ok(protocol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::DefaultsProvider;
    use crate::runtime::ModuleRegistry;

    const UDP_STACK: &str = r#"{
        "name": "udp",
        "node_name": "node1",
        "modules": [
            { "name": "UDP", "transport": true, "properties": ["mcast_addr", "mcast_port"] },
            { "name": "PING" },
            { "name": "FD_SOCK", "properties": ["bind_addr", "start_port"] }
        ],
        "socket_bindings": {
            "jgroups-udp": { "address": "10.0.0.1", "port": 55200,
                             "multicast_address": "230.0.0.4", "multicast_port": 45688 },
            "jgroups-udp-fd": { "address": "10.0.0.1", "port": 54200 }
        },
        "defaults": { "PING": { "timeout": "3000" } },
        "transport": {
            "type": "UDP", "socket_binding": "jgroups-udp", "shared": true,
            "topology": { "site": "s1", "rack": "r1" }
        },
        "protocols": [
            { "type": "PING" },
            { "type": "FD_SOCK", "socket_binding": "jgroups-udp-fd" }
        ]
    }"#;

    fn registry(descriptor: &StackDescriptor) -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        for schema in descriptor.schemas() {
            registry.register(schema);
        }
        registry
    }

    #[test]
    fn test_build_from_json() {
        let descriptor = StackDescriptor::from_json(UDP_STACK).unwrap();
        let stack = descriptor.build(&registry(&descriptor), None).unwrap();

        assert_eq!(stack.name(), "udp");
        assert_eq!(stack.environment().node_name(), "node1");
        assert!(stack.transport().is_shared());
        assert_eq!(stack.transport().binding().unwrap().socket_address().port(), 55200);
        assert_eq!(
            stack.transport().get_topology().and_then(|t| t.site.as_deref()),
            Some("s1")
        );
        let names: Vec<_> = stack.protocols().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["PING", "FD_SOCK"]);
        let ping = stack.defaults().properties("PING");
        assert_eq!(ping.get("timeout").map(String::as_str), Some("3000"));
    }

    #[test]
    fn test_unknown_binding_rejected() {
        let mut descriptor = StackDescriptor::from_json(UDP_STACK).unwrap();
        descriptor.protocols[1].socket_binding = Some("missing".to_string());

        let err = descriptor.build(&registry(&descriptor), None).unwrap_err();
        assert!(matches!(err, Error::UnknownSocketBinding(name) if name == "missing"));
    }

    #[test]
    fn test_relay_requires_site_provider() {
        let mut descriptor = StackDescriptor::from_json(UDP_STACK).unwrap();
        descriptor.relay = Some(RelayDescriptor {
            site: "LON".to_string(),
            remote_sites: vec![RemoteSiteDescriptor {
                name: "NYC".to_string(),
                cluster: "bridge".to_string(),
            }],
            properties: BTreeMap::new(),
        });

        let err = descriptor.build(&registry(&descriptor), None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_half_multicast_rejected() {
        let descriptor = SocketBindingDescriptor {
            address: "10.0.0.1".parse().unwrap(),
            port: 7600,
            multicast_address: Some("230.0.0.4".parse().unwrap()),
            multicast_port: None,
        };
        assert!(descriptor.to_binding("jgroups-tcp").is_err());
    }
}
