//! The live transport module and its adapters.
//!
//! The transport sits at the bottom of every stack. It owns the resources
//! the stack runs on: a socket factory, a thread factory, a default and an
//! out-of-band executor, and a timer. These adapters can be inspected and
//! replaced after construction. A transport with a singleton name is shared
//! by every channel of that stack and outlives any single channel.
//!
//! # Thread Safety
//!
//! Adapters sit behind a `RwLock`, so readers never observe a half-installed
//! set. Callers that need check-then-replace semantics across several
//! adapters hold [`Transport::lock_initialization`] for the duration.

use crate::error::{Error, Result};
use crate::module::ProtocolSchema;
use crate::properties::{SINGLETON_NAME, TIMER};
use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};
use priority_queue::PriorityQueue;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::net::{SocketAddr, TcpListener, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::debug;

/// A unit of work handed to an executor.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Creates the sockets a transport listens and sends on.
pub trait SocketFactory: Send + Sync {
    /// Create a datagram socket for the named service.
    fn create_datagram_socket(&self, service: &str, bind: SocketAddr) -> io::Result<UdpSocket>;

    /// Create a listening socket for the named service.
    fn create_server_socket(&self, service: &str, bind: SocketAddr) -> io::Result<TcpListener>;

    /// True for wrappers installed by the stack assembly.
    fn is_managed(&self) -> bool {
        false
    }
}

/// Creates the threads a transport runs its loops on.
pub trait ThreadFactory: Send + Sync {
    fn new_thread(&self, name: &str, task: Task) -> io::Result<JoinHandle<()>>;

    fn is_managed(&self) -> bool {
        false
    }
}

/// Runs tasks, possibly on other threads.
pub trait Executor: Send + Sync {
    fn execute(&self, task: Task) -> Result<()>;

    fn is_managed(&self) -> bool {
        false
    }
}

/// An executor that can also defer tasks.
pub trait ScheduledExecutor: Executor {
    fn schedule(&self, task: Task, delay: Duration) -> Result<()>;
}

/// Timer used by the protocols of a stack.
pub trait TimeScheduler: Send + Sync {
    fn schedule(&self, task: Task, delay: Duration) -> Result<()>;

    fn is_managed(&self) -> bool {
        false
    }
}

/// Binds sockets directly with the standard library.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSocketFactory;

impl SocketFactory for DefaultSocketFactory {
    fn create_datagram_socket(&self, _service: &str, bind: SocketAddr) -> io::Result<UdpSocket> {
        UdpSocket::bind(bind)
    }

    fn create_server_socket(&self, _service: &str, bind: SocketAddr) -> io::Result<TcpListener> {
        TcpListener::bind(bind)
    }
}

/// Spawns named OS threads with a common prefix.
#[derive(Debug, Clone)]
pub struct DefaultThreadFactory {
    prefix: String,
}

impl DefaultThreadFactory {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl ThreadFactory for DefaultThreadFactory {
    fn new_thread(&self, name: &str, task: Task) -> io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name(format!("{}-{}", self.prefix, name))
            .spawn(task)
    }
}

/// Runs every task on a fresh thread from a thread factory.
#[derive(Clone)]
pub struct ThreadPerTaskExecutor {
    name: String,
    threads: Arc<dyn ThreadFactory>,
}

impl ThreadPerTaskExecutor {
    pub fn new(name: impl Into<String>, threads: Arc<dyn ThreadFactory>) -> Self {
        Self {
            name: name.into(),
            threads,
        }
    }
}

impl Executor for ThreadPerTaskExecutor {
    fn execute(&self, task: Task) -> Result<()> {
        self.threads
            .new_thread(&self.name, task)
            .map(|_| ())
            .map_err(|e| Error::Rejected(e.to_string()))
    }
}

/// Runs delayed tasks in due order on one scheduler thread.
///
/// The thread is started on demand and exits once the queue drains.
#[derive(Clone)]
pub struct DefaultTimer {
    threads: Arc<dyn ThreadFactory>,
    shared: Arc<TimerShared>,
}

struct TimerShared {
    queue: Mutex<TimerQueue>,
    ready: Condvar,
}

#[derive(Default)]
struct TimerQueue {
    order: PriorityQueue<u64, Reverse<(Instant, u64)>>,
    tasks: HashMap<u64, Task>,
    sequence: u64,
    running: bool,
}

impl DefaultTimer {
    pub fn new(threads: Arc<dyn ThreadFactory>) -> Self {
        Self {
            threads,
            shared: Arc::new(TimerShared {
                queue: Mutex::new(TimerQueue::default()),
                ready: Condvar::new(),
            }),
        }
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().order.len()
    }

    fn run(shared: Arc<TimerShared>) {
        let mut queue = shared.queue.lock();
        loop {
            let due = match queue.order.peek() {
                Some((_, Reverse((due, _)))) => *due,
                None => {
                    queue.running = false;
                    return;
                }
            };
            if due > Instant::now() {
                shared.ready.wait_until(&mut queue, due);
                continue;
            }
            let Some((id, _)) = queue.order.pop() else {
                continue;
            };
            if let Some(task) = queue.tasks.remove(&id) {
                MutexGuard::unlocked(&mut queue, task);
            }
        }
    }
}

impl TimeScheduler for DefaultTimer {
    fn schedule(&self, task: Task, delay: Duration) -> Result<()> {
        let mut queue = self.shared.queue.lock();
        if !queue.running {
            let shared = Arc::clone(&self.shared);
            self.threads
                .new_thread("timer", Box::new(move || Self::run(shared)))
                .map_err(|e| Error::Rejected(e.to_string()))?;
            queue.running = true;
        }
        queue.sequence += 1;
        let id = queue.sequence;
        queue.tasks.insert(id, task);
        queue.order.push(id, Reverse((Instant::now() + delay, id)));
        self.shared.ready.notify_one();
        Ok(())
    }
}

struct Adapters {
    socket_factory: Arc<dyn SocketFactory>,
    thread_factory: Arc<dyn ThreadFactory>,
    default_pool: Arc<dyn Executor>,
    oob_pool: Arc<dyn Executor>,
    timer: Arc<dyn TimeScheduler>,
}

/// The live transport module.
pub struct Transport {
    name: String,
    singleton_name: Option<String>,
    properties: BTreeMap<String, String>,
    timer_field: bool,
    adapters: RwLock<Adapters>,
    init_lock: Mutex<()>,
    initialized: AtomicBool,
}

impl Transport {
    /// Construct a transport from its schema and resolved properties, with
    /// default adapters installed.
    ///
    /// # Errors
    /// [`Error::UnknownProperty`] if a property is not declared by the schema.
    pub fn new(schema: &ProtocolSchema, properties: BTreeMap<String, String>) -> Result<Self> {
        if let Some(undeclared) = properties.keys().find(|k| !schema.has_property(k)) {
            return Err(Error::UnknownProperty {
                protocol: schema.name().to_string(),
                property: undeclared.clone(),
            });
        }

        let singleton_name = properties.get(SINGLETON_NAME).cloned();
        let prefix = singleton_name
            .clone()
            .unwrap_or_else(|| schema.name().to_lowercase());
        let threads: Arc<dyn ThreadFactory> = Arc::new(DefaultThreadFactory::new(prefix));
        let adapters = Adapters {
            socket_factory: Arc::new(DefaultSocketFactory),
            thread_factory: Arc::clone(&threads),
            default_pool: Arc::new(ThreadPerTaskExecutor::new("default", Arc::clone(&threads))),
            oob_pool: Arc::new(ThreadPerTaskExecutor::new("oob", Arc::clone(&threads))),
            timer: Arc::new(DefaultTimer::new(threads)),
        };

        Ok(Self {
            name: schema.name().to_string(),
            singleton_name,
            properties,
            timer_field: schema.has_timer_field(),
            adapters: RwLock::new(adapters),
            init_lock: Mutex::new(()),
            initialized: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn singleton_name(&self) -> Option<&str> {
        self.singleton_name.as_deref()
    }

    /// True if this transport is shared by several channels.
    pub fn is_singleton(&self) -> bool {
        self.singleton_name.is_some()
    }

    /// Serializes adapter installation on this transport instance.
    pub fn lock_initialization(&self) -> MutexGuard<'_, ()> {
        self.init_lock.lock()
    }

    /// Initialize the transport. Repeated calls are no-ops.
    pub fn init(&self) -> Result<()> {
        if !self.initialized.swap(true, Ordering::AcqRel) {
            debug!(
                transport = %self.name,
                singleton = ?self.singleton_name,
                "transport initialized"
            );
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn socket_factory(&self) -> Arc<dyn SocketFactory> {
        Arc::clone(&self.adapters.read().socket_factory)
    }

    pub fn set_socket_factory(&self, factory: Arc<dyn SocketFactory>) {
        self.adapters.write().socket_factory = factory;
    }

    pub fn thread_factory(&self) -> Arc<dyn ThreadFactory> {
        Arc::clone(&self.adapters.read().thread_factory)
    }

    pub fn set_thread_factory(&self, factory: Arc<dyn ThreadFactory>) {
        self.adapters.write().thread_factory = factory;
    }

    pub fn default_thread_pool(&self) -> Arc<dyn Executor> {
        Arc::clone(&self.adapters.read().default_pool)
    }

    pub fn set_default_thread_pool(&self, pool: Arc<dyn Executor>) {
        self.adapters.write().default_pool = pool;
    }

    pub fn oob_thread_pool(&self) -> Arc<dyn Executor> {
        Arc::clone(&self.adapters.read().oob_pool)
    }

    pub fn set_oob_thread_pool(&self, pool: Arc<dyn Executor>) {
        self.adapters.write().oob_pool = pool;
    }

    pub fn timer(&self) -> Arc<dyn TimeScheduler> {
        Arc::clone(&self.adapters.read().timer)
    }

    /// True if the timer can be replaced on this transport.
    pub fn has_timer_field(&self) -> bool {
        self.timer_field
    }

    /// Replace the timer.
    ///
    /// # Errors
    /// [`Error::UnknownProperty`] if this transport has no assignable timer
    /// field.
    pub fn set_timer(&self, timer: Arc<dyn TimeScheduler>) -> Result<()> {
        if !self.timer_field {
            return Err(Error::UnknownProperty {
                protocol: self.name.clone(),
                property: TIMER.to_string(),
            });
        }
        self.adapters.write().timer = timer;
        Ok(())
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("name", &self.name)
            .field("singleton_name", &self.singleton_name)
            .field("properties", &self.properties)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}
