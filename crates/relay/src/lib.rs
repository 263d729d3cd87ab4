//! Multi-site relay for assembled stacks.
//!
//! This crate builds the relay module that joins independently clustered
//! sites into one logical group:
//! - Which sites the relay knows about
//! - Which bridge clusters connect them
//! - How bridge channels are obtained from remote sites

pub mod builder;
pub mod protocol;
pub mod site;

pub use builder::RelayBuilder;
pub use protocol::RelayProtocol;
pub use site::{BridgeConfig, ChannelSupplier, SiteConfig};
