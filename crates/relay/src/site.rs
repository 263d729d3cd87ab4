//! Site and bridge configuration of the relay module.

use corelib::{Result, SharedChannel};
use std::fmt;
use std::sync::Arc;

/// Callback producing the channel of a bridge.
pub type ChannelSupplier = Arc<dyn Fn() -> Result<SharedChannel> + Send + Sync>;

/// A bridge cluster joining the local site to remote sites.
///
/// The bridge channel is obtained lazily through a callback captured when
/// the bridge is built.
#[derive(Clone)]
pub struct BridgeConfig {
    cluster_name: String,
    supplier: ChannelSupplier,
}

impl BridgeConfig {
    pub fn new(cluster_name: impl Into<String>, supplier: ChannelSupplier) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            supplier,
        }
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// Obtain the bridge channel.
    pub fn create_channel(&self) -> Result<SharedChannel> {
        (self.supplier)()
    }
}

impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("cluster_name", &self.cluster_name)
            .finish_non_exhaustive()
    }
}

/// Configuration of one site known to the relay.
#[derive(Clone, Debug)]
pub struct SiteConfig {
    name: String,
    bridges: Vec<BridgeConfig>,
}

impl SiteConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bridges: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_bridge(&mut self, bridge: BridgeConfig) {
        self.bridges.push(bridge);
    }

    pub fn bridges(&self) -> &[BridgeConfig] {
        &self.bridges
    }
}
