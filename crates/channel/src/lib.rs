//! Channel creation for assembled protocol stacks.
//!
//! This crate turns a stack configuration into ready channels:
//! - Managed transport adapters and their idempotent installation
//! - The fork module placed on top of every channel
//! - Topology-tagged address generation
//! - The channel factory tying assembly, runtime and relay together

pub mod adapters;
pub mod address;
pub mod factory;
pub mod fork;
pub mod init;
pub mod telemetry;

pub use adapters::{
    ManagedExecutor, ManagedScheduledExecutor, ManagedSocketFactory, ThreadFactoryAdapter,
    TimerSchedulerAdapter,
};
pub use address::TopologyAddressGenerator;
pub use factory::ChannelFactory;
pub use fork::ForkProtocol;
pub use init::TransportInitializer;
