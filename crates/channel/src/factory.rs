//! Channel factory.
//!
//! One factory per configured stack. Every call to
//! [`ChannelFactory::create_channel`] builds a fresh channel:
//!
//! 1. Materialize the live stack from the assembled protocol list
//! 2. Install managed adapters on the transport
//! 3. Install the relay, if configured
//! 4. Install the fork module
//! 5. Name the channel after the node and tag its address with the
//!    transport topology, if any
//!
//! Channel creation is synchronous and may run on many threads at once,
//! including for channels that share one singleton transport.

use crate::address::TopologyAddressGenerator;
use crate::fork::ForkProtocol;
use crate::init::TransportInitializer;
use crate::telemetry::{record_channel_created, record_channel_failure};
use corelib::{
    Channel, DiagnosticSink, ModuleRuntime, ProtocolStack, ResolvedProtocol, Result,
    StackAssembler, StackConfiguration, Stage, TracingSink,
};
use relay::RelayBuilder;
use std::sync::Arc;
use tracing::{debug, debug_span, warn};

/// Creates channels for one stack configuration.
#[derive(Clone)]
pub struct ChannelFactory {
    configuration: Arc<StackConfiguration>,
    runtime: Arc<dyn ModuleRuntime>,
    sink: Arc<dyn DiagnosticSink>,
}

impl ChannelFactory {
    /// Create a factory reporting diagnostics through `tracing`.
    pub fn new(configuration: Arc<StackConfiguration>, runtime: Arc<dyn ModuleRuntime>) -> Self {
        Self::with_diagnostics(configuration, runtime, Arc::new(TracingSink))
    }

    pub fn with_diagnostics(
        configuration: Arc<StackConfiguration>,
        runtime: Arc<dyn ModuleRuntime>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            configuration,
            runtime,
            sink,
        }
    }

    pub fn configuration(&self) -> &StackConfiguration {
        &self.configuration
    }

    /// The resolved protocol list, transport first.
    pub fn protocol_stack(&self) -> Vec<ResolvedProtocol> {
        StackAssembler::new(&self.configuration, self.sink.as_ref()).assemble()
    }

    /// Build a ready channel.
    ///
    /// # Arguments
    /// * `id` - identifier of the requesting service, for logging only
    ///
    /// # Errors
    /// [`corelib::Error::Creation`] naming the stage that failed; errors
    /// raised outside any module step are attributed to the channel stage.
    pub fn create_channel(&self, id: &str) -> Result<Channel> {
        let stack = self.configuration.name();
        let _span = debug_span!("create_channel", %stack, %id).entered();

        match self.build(id).map_err(|e| e.at(Stage::Channel)) {
            Ok(channel) => {
                record_channel_created(stack);
                debug!(
                    protocols = ?channel.protocol_stack().protocol_names(),
                    "created channel"
                );
                Ok(channel)
            }
            Err(e) => {
                record_channel_failure(stack, e.stage());
                warn!(error = %e, "channel creation failed");
                Err(e)
            }
        }
    }

    fn build(&self, id: &str) -> Result<Channel> {
        let mut stack = self.runtime.materialize(&self.protocol_stack())?;

        TransportInitializer::new(&self.configuration, self.sink.as_ref())
            .initialize(stack.transport());

        if let Some(relay) = self.configuration.relay() {
            RelayBuilder::new(relay, self.sink.as_ref())
                .install(&mut stack)
                .map_err(|e| e.at(Stage::Relay))?;
        }

        ForkProtocol::install(&mut stack).map_err(|e| e.at(Stage::Fork))?;

        let channel = self.channel(stack);
        debug!(%id, name = ?channel.name(), "channel identity set");
        Ok(channel)
    }

    fn channel(&self, stack: ProtocolStack) -> Channel {
        let mut channel = Channel::new(stack);
        channel.set_name(self.configuration.environment().node_name());
        if let Some(topology) = self.configuration.transport().get_topology() {
            let generator = TopologyAddressGenerator::new(topology.clone());
            channel.set_address_generator(Box::new(generator));
        }
        channel
    }
}

impl std::fmt::Debug for ChannelFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelFactory")
            .field("stack", &self.configuration.name())
            .finish_non_exhaustive()
    }
}
