//! Node identity for channel members.
//!
//! Every channel gets an address when it joins a cluster. Addresses are
//! identified by a compact `NodeId` that is cheap to compare and hash, and
//! optionally carry the logical node name and a topology.

use crate::topology::Topology;
use siphasher::sip::SipHasher13;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Compact identifier for a channel member.
///
/// Newtype over `u128` so comparisons and hashing are very fast while giving
/// plenty of space for uniqueness.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(pub u128);

impl NodeId {
    /// Generate a fresh identifier seeded by a logical name.
    ///
    /// Two SipHash-1-3 digests over the seed, the wall clock and a process
    /// wide sequence number form the two halves of the id.
    pub fn generate(seed: &str) -> Self {
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();

        let mut high = SipHasher13::new_with_keys(0x6e6f6465, sequence);
        (seed, nanos).hash(&mut high);
        let mut low = SipHasher13::new_with_keys(sequence, 0x61646472);
        (nanos, seed, sequence).hash(&mut low);

        NodeId((u128::from(high.finish()) << 64) | u128::from(low.finish()))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Address of a channel member.
///
/// Keep this struct small and cheap to clone.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChannelAddress {
    pub id: NodeId,
    /// Logical name of the member, usually the node name.
    pub name: Option<String>,
    /// Optional placement labels for topology-aware protocols.
    pub topology: Option<Topology>,
}

impl ChannelAddress {
    /// Construct a plain address without topology.
    pub fn new(id: NodeId, name: impl Into<Option<String>>) -> Self {
        Self {
            id,
            name: name.into(),
            topology: None,
        }
    }

    pub fn with_topology(id: NodeId, name: impl Into<Option<String>>, topology: Topology) -> Self {
        Self {
            id,
            name: name.into(),
            topology: Some(topology),
        }
    }
}

impl fmt::Display for ChannelAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}", name)?,
            None => write!(f, "{}", self.id)?,
        }
        if let Some(topology) = &self.topology {
            write!(f, "@{}", topology)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_differ() {
        let first = NodeId::generate("node1");
        let second = NodeId::generate("node1");
        assert_ne!(first, second);
    }

    #[test]
    fn test_address_display() {
        let address = ChannelAddress::with_topology(
            NodeId(1),
            Some("node1".to_string()),
            Topology::new(Some("s1".to_string()), None, Some("m1".to_string())),
        );
        assert_eq!(address.to_string(), "node1@s1/-/m1");
        assert_eq!(ChannelAddress::new(NodeId(1), None).to_string(), format!("{:032x}", 1));
    }
}
