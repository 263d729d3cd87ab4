//! Transport initialization.
//!
//! Installs the managed adapters of a stack configuration on a live
//! transport. Installation is idempotent: an adapter slot already holding a
//! managed wrapper is left alone, so a shared transport is wrapped once no
//! matter how many channels are created on it.
//!
//! # Thread Safety
//!
//! For a singleton transport the whole installation runs under
//! [`Transport::lock_initialization`]. The lock belongs to the transport
//! instance, so channels on different transports never contend.

use crate::adapters::{
    ManagedExecutor, ManagedScheduledExecutor, ManagedSocketFactory, ThreadFactoryAdapter,
    TimerSchedulerAdapter,
};
use corelib::properties::TIMER;
use corelib::{Diagnostic, DiagnosticSink, StackConfiguration, Transport};
use std::sync::Arc;
use tracing::{debug, trace};

/// Installs managed adapters on a transport.
pub struct TransportInitializer<'a> {
    configuration: &'a StackConfiguration,
    sink: &'a dyn DiagnosticSink,
}

impl<'a> TransportInitializer<'a> {
    pub fn new(configuration: &'a StackConfiguration, sink: &'a dyn DiagnosticSink) -> Self {
        Self {
            configuration,
            sink,
        }
    }

    /// Install every configured adapter not already installed.
    ///
    /// # Returns
    /// The number of adapters installed by this call.
    pub fn initialize(&self, transport: &Transport) -> usize {
        if transport.is_singleton() {
            let _guard = transport.lock_initialization();
            self.install(transport)
        } else {
            self.install(transport)
        }
    }

    fn install(&self, transport: &Transport) -> usize {
        let config = self.configuration.transport();
        let mut installed = 0;

        if config.binding().is_some() {
            let current = transport.socket_factory();
            if !current.is_managed() {
                let factory =
                    ManagedSocketFactory::new(current, self.configuration.socket_bindings());
                transport.set_socket_factory(Arc::new(factory));
                installed += 1;
            }
        }

        if let Some(factory) = config.get_thread_factory() {
            if !transport.thread_factory().is_managed() {
                let adapter = ThreadFactoryAdapter::new(Arc::clone(factory));
                transport.set_thread_factory(Arc::new(adapter));
                installed += 1;
            }
        }

        if let Some(executor) = config.get_default_executor() {
            if !transport.default_thread_pool().is_managed() {
                let pool = ManagedExecutor::new(Arc::clone(executor));
                transport.set_default_thread_pool(Arc::new(pool));
                installed += 1;
            }
        }

        if let Some(executor) = config.get_oob_executor() {
            if !transport.oob_thread_pool().is_managed() {
                transport.set_oob_thread_pool(Arc::new(ManagedExecutor::new(Arc::clone(executor))));
                installed += 1;
            }
        }

        if let Some(executor) = config.get_timer_executor() {
            if !transport.timer().is_managed() {
                let executor = ManagedScheduledExecutor::new(Arc::clone(executor));
                let timer = TimerSchedulerAdapter::new(executor);
                match transport.set_timer(Arc::new(timer)) {
                    Ok(()) => installed += 1,
                    Err(e) => {
                        trace!(transport = %transport.name(), error = %e, "timer not assignable");
                        self.sink.report(Diagnostic::UnsupportedField {
                            protocol: transport.name().to_string(),
                            field: TIMER.to_string(),
                            value: "managed scheduled executor".to_string(),
                        });
                    }
                }
            }
        }

        debug!(
            stack = %self.configuration.name(),
            transport = %transport.name(),
            singleton = ?transport.singleton_name(),
            installed,
            "initialized transport adapters"
        );
        installed
    }
}
