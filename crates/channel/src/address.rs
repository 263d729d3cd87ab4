//! Topology-aware address generation.

use corelib::{AddressGenerator, ChannelAddress, NodeId, Topology};

/// Tags every generated address with the transport's topology.
#[derive(Clone, Debug)]
pub struct TopologyAddressGenerator {
    topology: Topology,
}

impl TopologyAddressGenerator {
    pub fn new(topology: Topology) -> Self {
        Self { topology }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }
}

impl AddressGenerator for TopologyAddressGenerator {
    fn generate_address(&self, name: Option<&str>) -> ChannelAddress {
        ChannelAddress::with_topology(
            NodeId::generate(name.unwrap_or_default()),
            name.map(str::to_string),
            self.topology.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_carries_topology() {
        let topology = Topology::new(Some("s1".to_string()), Some("r1".to_string()), None);
        let generator = TopologyAddressGenerator::new(topology.clone());

        let first = generator.generate_address(Some("node1"));
        let second = generator.generate_address(Some("node1"));

        assert_eq!(first.topology.as_ref(), Some(&topology));
        assert_eq!(first.name.as_deref(), Some("node1"));
        assert_ne!(first.id, second.id);
    }
}
