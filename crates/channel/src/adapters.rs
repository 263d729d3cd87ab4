//! Managed transport adapters.
//!
//! Wrappers installed on a transport in place of its own socket factory,
//! thread factory, executors and timer. Each reports `is_managed() == true`,
//! which is how installation recognizes a transport that was already
//! initialized.

use corelib::transport::{
    Executor, ScheduledExecutor, SocketFactory, Task, ThreadFactory, TimeScheduler,
};
use corelib::{Result, SocketBinding};
use std::collections::BTreeMap;
use std::io;
use std::net::{SocketAddr, TcpListener, UdpSocket};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::debug;

/// Socket factory bound to the socket bindings of a stack.
///
/// A socket requested under a service name that matches a configured
/// binding is bound to that binding's address; anything else goes to the
/// wrapped factory unchanged.
pub struct ManagedSocketFactory {
    delegate: Arc<dyn SocketFactory>,
    bindings: BTreeMap<String, SocketBinding>,
}

impl ManagedSocketFactory {
    pub fn new(
        delegate: Arc<dyn SocketFactory>,
        bindings: impl IntoIterator<Item = SocketBinding>,
    ) -> Self {
        Self {
            delegate,
            bindings: bindings
                .into_iter()
                .map(|b| (b.name().to_string(), b))
                .collect(),
        }
    }

    pub fn delegate(&self) -> &Arc<dyn SocketFactory> {
        &self.delegate
    }

    pub fn binding(&self, service: &str) -> Option<&SocketBinding> {
        self.bindings.get(service)
    }

    fn address(&self, service: &str, requested: SocketAddr) -> SocketAddr {
        match self.bindings.get(service) {
            Some(binding) => {
                debug!(%service, binding = %binding.name(), "using managed socket binding");
                binding.socket_address()
            }
            None => requested,
        }
    }
}

impl SocketFactory for ManagedSocketFactory {
    fn create_datagram_socket(&self, service: &str, bind: SocketAddr) -> io::Result<UdpSocket> {
        self.delegate
            .create_datagram_socket(service, self.address(service, bind))
    }

    fn create_server_socket(&self, service: &str, bind: SocketAddr) -> io::Result<TcpListener> {
        self.delegate
            .create_server_socket(service, self.address(service, bind))
    }

    fn is_managed(&self) -> bool {
        true
    }
}

/// Thread factory supplied by the hosting environment.
pub struct ThreadFactoryAdapter {
    factory: Arc<dyn ThreadFactory>,
}

impl ThreadFactoryAdapter {
    pub fn new(factory: Arc<dyn ThreadFactory>) -> Self {
        Self { factory }
    }

    pub fn delegate(&self) -> &Arc<dyn ThreadFactory> {
        &self.factory
    }
}

impl ThreadFactory for ThreadFactoryAdapter {
    fn new_thread(&self, name: &str, task: Task) -> io::Result<JoinHandle<()>> {
        self.factory.new_thread(name, task)
    }

    fn is_managed(&self) -> bool {
        true
    }
}

/// Executor supplied by the hosting environment.
pub struct ManagedExecutor {
    executor: Arc<dyn Executor>,
}

impl ManagedExecutor {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }

    pub fn delegate(&self) -> &Arc<dyn Executor> {
        &self.executor
    }
}

impl Executor for ManagedExecutor {
    fn execute(&self, task: Task) -> Result<()> {
        self.executor.execute(task)
    }

    fn is_managed(&self) -> bool {
        true
    }
}

/// Scheduled executor supplied by the hosting environment.
pub struct ManagedScheduledExecutor {
    executor: Arc<dyn ScheduledExecutor>,
}

impl ManagedScheduledExecutor {
    pub fn new(executor: Arc<dyn ScheduledExecutor>) -> Self {
        Self { executor }
    }

    pub fn delegate(&self) -> &Arc<dyn ScheduledExecutor> {
        &self.executor
    }
}

impl Executor for ManagedScheduledExecutor {
    fn execute(&self, task: Task) -> Result<()> {
        self.executor.execute(task)
    }

    fn is_managed(&self) -> bool {
        true
    }
}

impl ScheduledExecutor for ManagedScheduledExecutor {
    fn schedule(&self, task: Task, delay: Duration) -> Result<()> {
        self.executor.schedule(task, delay)
    }
}

/// Timer backed by a managed scheduled executor.
pub struct TimerSchedulerAdapter {
    executor: ManagedScheduledExecutor,
}

impl TimerSchedulerAdapter {
    pub fn new(executor: ManagedScheduledExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &ManagedScheduledExecutor {
        &self.executor
    }
}

impl TimeScheduler for TimerSchedulerAdapter {
    fn schedule(&self, task: Task, delay: Duration) -> Result<()> {
        self.executor.schedule(task, delay)
    }

    fn is_managed(&self) -> bool {
        true
    }
}
