//! Network topology labels.
//!
//! A topology places a member of the cluster in a site, a rack and a
//! machine. Transports carry an optional topology; when present, every
//! address generated for a channel is tagged with it so that placement-aware
//! protocols above can tell failure domains apart.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Site / rack / machine labels for one member.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topology {
    /// Optional site (data center) label.
    #[serde(default)]
    pub site: Option<String>,
    /// Optional rack label.
    #[serde(default)]
    pub rack: Option<String>,
    /// Optional machine (host) label.
    #[serde(default)]
    pub machine: Option<String>,
}

impl Topology {
    pub fn new(
        site: impl Into<Option<String>>,
        rack: impl Into<Option<String>>,
        machine: impl Into<Option<String>>,
    ) -> Self {
        Self {
            site: site.into(),
            rack: rack.into(),
            machine: machine.into(),
        }
    }

    /// True if no label is set.
    pub fn is_empty(&self) -> bool {
        self.site.is_none() && self.rack.is_none() && self.machine.is_none()
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "{}/{}/{}",
            label(&self.site),
            label(&self.rack),
            label(&self.machine)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_display() {
        let topology = Topology::new(Some("nyc".to_string()), Some("r1".to_string()), None);
        assert_eq!(topology.to_string(), "nyc/r1/-");
        assert!(!topology.is_empty());
        assert!(Topology::default().is_empty());
    }
}
