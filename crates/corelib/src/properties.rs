//! Well-known protocol and property names.

/// Name of the channel-multiplexing module.
pub const FORK: &str = "FORK";

/// Name of the multi-site relay module.
pub const RELAY: &str = "RELAY2";

pub const BIND_ADDR: &str = "bind_addr";
pub const BIND_PORT: &str = "bind_port";
pub const START_PORT: &str = "start_port";
pub const MCAST_ADDR: &str = "mcast_addr";
pub const MCAST_PORT: &str = "mcast_port";
pub const DIAGNOSTICS_ADDR: &str = "diagnostics_addr";
pub const DIAGNOSTICS_PORT: &str = "diagnostics_port";
pub const ENABLE_DIAGNOSTICS: &str = "enable_diagnostics";
pub const SINGLETON_NAME: &str = "singleton_name";

/// Multicast retransmission switch, forced off on stacks without multicast.
pub const USE_MCAST_XMIT: &str = "use_mcast_xmit";

/// Field holding the transport's timer.
pub const TIMER: &str = "timer";

/// Properties every transport declares.
pub const TRANSPORT_PROPERTIES: &[&str] = &[
    BIND_ADDR,
    BIND_PORT,
    DIAGNOSTICS_ADDR,
    DIAGNOSTICS_PORT,
    ENABLE_DIAGNOSTICS,
    SINGLETON_NAME,
];
