//! Socket bindings.
//!
//! Network addresses and ports are allocated outside this crate. A socket
//! binding is the resolved form: a bind address and port, and optionally a
//! multicast address and port. A binding without multicast is a valid
//! state; asking it for a multicast address yields [`Error::NoMulticast`].

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::net::SocketAddr;

/// A resolved socket binding.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SocketBinding {
    name: String,
    address: SocketAddr,
    multicast: Option<SocketAddr>,
}

impl SocketBinding {
    pub fn new(name: impl Into<String>, address: SocketAddr) -> Self {
        Self {
            name: name.into(),
            address,
            multicast: None,
        }
    }

    /// Attach a multicast address and port.
    pub fn with_multicast(mut self, multicast: SocketAddr) -> Self {
        self.multicast = Some(multicast);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved bind address and port.
    pub fn socket_address(&self) -> SocketAddr {
        self.address
    }

    /// Resolved multicast address and port.
    ///
    /// # Errors
    /// [`Error::NoMulticast`] if the binding has no multicast configured.
    pub fn multicast_socket_address(&self) -> Result<SocketAddr> {
        self.multicast
            .ok_or_else(|| Error::NoMulticast(self.name.clone()))
    }
}

/// Resolves socket bindings by name.
pub trait SocketBindingProvider: Send + Sync {
    fn resolve(&self, name: &str) -> Result<SocketBinding>;
}

/// Socket bindings held in memory, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct StaticBindings {
    bindings: BTreeMap<String, SocketBinding>,
}

impl StaticBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, binding: SocketBinding) {
        self.bindings.insert(binding.name().to_string(), binding);
    }

    pub fn with(mut self, binding: SocketBinding) -> Self {
        self.insert(binding);
        self
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl SocketBindingProvider for StaticBindings {
    fn resolve(&self, name: &str) -> Result<SocketBinding> {
        self.bindings
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownSocketBinding(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multicast_unavailable() {
        let binding = SocketBinding::new("jgroups-tcp", "10.0.0.1:7600".parse().unwrap());
        assert!(matches!(
            binding.multicast_socket_address(),
            Err(Error::NoMulticast(name)) if name == "jgroups-tcp"
        ));

        let binding = binding.with_multicast("230.0.0.4:45688".parse().unwrap());
        assert_eq!(
            binding.multicast_socket_address().unwrap(),
            "230.0.0.4:45688".parse().unwrap()
        );
    }

    #[test]
    fn test_static_bindings_resolve() {
        let bindings = StaticBindings::new()
            .with(SocketBinding::new("jgroups-udp", "10.0.0.1:55200".parse().unwrap()));

        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings.resolve("jgroups-udp").unwrap().socket_address().port(), 55200);
        assert!(matches!(
            bindings.resolve("missing"),
            Err(Error::UnknownSocketBinding(_))
        ));
    }
}
