//! Polling coordinator.
//!
//! Owns the five samplers, fires a trigger immediately on `start()` and then
//! every second, and hands each assembled snapshot to the registered
//! subscribers. Triggers come from a ticker task on a small owned Tokio
//! runtime; each cycle runs on the blocking pool so a slow cycle never delays
//! the ticker. A tick that arrives while the previous cycle is still running
//! is skipped.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Runtime;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::core::config::MonitorConfig;
use crate::error::{MonitorError, Result};

use super::metrics::MonitorSnapshot;
use super::sampler::{panic_message, SamplerSet};

/// Fixed polling period
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

type Callback = Arc<dyn Fn(MonitorSnapshot) + Send + Sync>;

#[derive(Default)]
struct SubscriberRegistry {
    next_id: AtomicU64,
    callbacks: RwLock<Vec<(u64, Callback)>>,
}

impl SubscriberRegistry {
    fn insert(&self, callback: Callback) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.callbacks.write().push((id, callback));
        id
    }

    fn remove(&self, id: u64) {
        self.callbacks.write().retain(|(existing, _)| *existing != id);
    }

    fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    /// Callbacks run outside the lock so they may (un)subscribe themselves.
    ///
    /// `is_live` is re-checked before every callback; delivery stops at the
    /// first callback reached after it turns false.
    fn publish(&self, snapshot: MonitorSnapshot, is_live: impl Fn() -> bool) {
        let callbacks: Vec<Callback> = self
            .callbacks
            .read()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in callbacks {
            if !is_live() {
                log::debug!("Coordinator stopped during delivery, dropping snapshot");
                return;
            }
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(snapshot))) {
                log::error!(
                    "Snapshot subscriber panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

/// Handle returned by [`MonitorCoordinator::subscribe`].
///
/// Delivery stops when the handle is dropped or `unsubscribe` is called.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

struct Shared {
    samplers: SamplerSet,
    subscribers: Arc<SubscriberRegistry>,
    running: AtomicBool,
    // Bumped on every start/stop; a cycle only publishes under its own epoch
    epoch: AtomicU64,
    in_flight: AtomicBool,
}

impl Shared {
    fn is_current(&self, epoch: u64) -> bool {
        self.running.load(Ordering::SeqCst) && self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn run_cycle(&self, epoch: u64) -> Option<MonitorSnapshot> {
        if !self.is_current(epoch) {
            return None;
        }

        let snapshot = match panic::catch_unwind(AssertUnwindSafe(|| self.samplers.assemble())) {
            Ok(snapshot) => snapshot,
            Err(payload) => {
                log::error!(
                    "Snapshot assembly failed, skipping cycle: {}",
                    panic_message(payload.as_ref())
                );
                return None;
            }
        };

        if !self.is_current(epoch) {
            log::debug!("Coordinator stopped during poll, dropping snapshot");
            return None;
        }

        self.subscribers.publish(snapshot, || self.is_current(epoch));
        Some(snapshot)
    }
}

/// Reentrancy guard: at most one cycle runs at a time
struct InFlightGuard {
    shared: Arc<Shared>,
}

impl InFlightGuard {
    fn try_acquire(shared: &Arc<Shared>) -> Option<Self> {
        shared
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                shared: Arc::clone(shared),
            })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.shared.in_flight.store(false, Ordering::Release);
    }
}

struct Ticker {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

/// Drives the samplers and publishes one [`MonitorSnapshot`] per cycle.
///
/// `start()` and `stop()` are idempotent and may be called from any thread.
/// Subscribers are invoked synchronously on the polling thread; marshaling
/// onto a UI thread is up to them.
pub struct MonitorCoordinator {
    shared: Arc<Shared>,
    runtime: Option<Runtime>,
    ticker: Mutex<Option<Ticker>>,
}

impl MonitorCoordinator {
    pub fn new(samplers: SamplerSet) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(2)
            .enable_time()
            .thread_name("monitor-worker")
            .build()
            .map_err(|e| {
                MonitorError::runtime(format!("Failed to build monitor runtime: {}", e))
            })?;

        Ok(Self {
            shared: Arc::new(Shared {
                samplers,
                subscribers: Arc::new(SubscriberRegistry::default()),
                running: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
                in_flight: AtomicBool::new(false),
            }),
            runtime: Some(runtime),
            ticker: Mutex::new(None),
        })
    }

    /// Coordinator over samplers backed by the host platform
    pub fn from_host(config: &MonitorConfig) -> Result<Self> {
        Self::new(SamplerSet::from_host(config))
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(MonitorSnapshot) + Send + Sync + 'static,
    {
        let id = self.shared.subscribers.insert(Arc::new(callback));
        Subscription {
            id,
            registry: Arc::downgrade(&self.shared.subscribers),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.len()
    }

    pub fn start(&self) {
        let mut ticker = self.ticker.lock();
        if ticker.is_some() {
            log::debug!("Monitor coordinator already running");
            return;
        }

        let Some(runtime) = self.runtime.as_ref() else {
            return;
        };

        let epoch = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.running.store(true, Ordering::SeqCst);

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = runtime.spawn(ticker_task(Arc::clone(&self.shared), epoch, shutdown_rx));

        *ticker = Some(Ticker { shutdown_tx, task });
        log::info!("Monitor coordinator started");
    }

    /// Stop polling. Does not wait for a cycle in flight: that cycle finishes
    /// its reads, and delivery of its snapshot stops at the first subscriber
    /// not yet reached. A callback already running is allowed to return.
    pub fn stop(&self) {
        let mut ticker = self.ticker.lock();
        let Some(Ticker { shutdown_tx, task }) = ticker.take() else {
            return;
        };

        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);

        // send() only fails if the ticker already exited
        let _ = shutdown_tx.send(());
        task.abort();

        log::info!("Monitor coordinator stopped");
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Run one cycle on the calling thread, outside the timer.
    ///
    /// Same rules as a timer trigger: does nothing when stopped or when a
    /// cycle is already in flight.
    pub fn trigger(&self) -> Option<MonitorSnapshot> {
        let epoch = self.shared.epoch.load(Ordering::SeqCst);
        let guard = InFlightGuard::try_acquire(&self.shared)?;
        guard.shared.run_cycle(epoch)
    }
}

impl Drop for MonitorCoordinator {
    fn drop(&mut self) {
        self.stop();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

async fn ticker_task(shared: Arc<Shared>, epoch: u64, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !shared.is_current(epoch) {
                    break;
                }

                let Some(guard) = InFlightGuard::try_acquire(&shared) else {
                    log::debug!("Previous poll still in flight, skipping tick");
                    continue;
                };

                tokio::task::spawn_blocking(move || {
                    let guard = guard;
                    guard.shared.run_cycle(epoch);
                });
            }
            _ = shutdown.recv() => {
                break;
            }
        }
    }
}
