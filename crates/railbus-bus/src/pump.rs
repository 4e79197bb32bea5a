//! Subscriber registry and the fixed-cadence notification pump.
//!
//! Each tick drains the incoming queue and hands every frame to every
//! subscriber in registration order. A subscriber that returns an error or
//! panics is logged and skipped; the remaining subscribers and the pump are
//! unaffected.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use railbus_frame::Frame;
use tracing::{debug, trace, warn};

use crate::config::PumpConfig;
use crate::error::{BusError, Result};
use crate::queue::MessageBus;

/// Error type subscriber callbacks may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type Callback = Arc<dyn Fn(&Frame) -> std::result::Result<(), BoxError> + Send + Sync>;

/// Identifier of one registration. Ids increase monotonically and are
/// never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of handing one frame to every subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fanout {
    pub delivered: usize,
    pub failed: usize,
}

/// Concurrency-safe map of subscriber callbacks, keyed by id.
///
/// Independent of the queue locks; callbacks are invoked on a snapshot
/// taken outside the registry lock, so a callback may subscribe or
/// unsubscribe without deadlocking.
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    subscribers: RwLock<BTreeMap<SubscriptionId, Callback>>,
}

impl SubscriberRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            subscribers: RwLock::new(BTreeMap::new()),
        })
    }

    /// Register a callback. The returned handle removes it when dropped or
    /// when [`Subscription::unsubscribe`] is called.
    pub fn subscribe<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(&Frame) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(callback));
        debug!(subscriber = %id, "subscriber registered");

        Subscription {
            id,
            registry: Arc::downgrade(self),
            active: true,
        }
    }

    /// Remove a registration. Returns whether it was present.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();
        if removed {
            debug!(subscriber = %id, "subscriber removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hand `frame` to every current subscriber, in registration order.
    pub fn publish(&self, frame: &Frame) -> Fanout {
        let snapshot: Vec<(SubscriptionId, Callback)> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, callback)| (*id, Arc::clone(callback)))
            .collect();

        let mut fanout = Fanout::default();
        for (id, callback) in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(frame))) {
                Ok(Ok(())) => fanout.delivered += 1,
                Ok(Err(err)) => {
                    warn!(subscriber = %id, error = %err, "subscriber failed");
                    fanout.failed += 1;
                }
                Err(_) => {
                    warn!(subscriber = %id, "subscriber panicked");
                    fanout.failed += 1;
                }
            }
        }
        fanout
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &self.len())
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}

/// Handle to one registration.
#[must_use = "dropping a Subscription unsubscribes it"]
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    registry: Weak<SubscriberRegistry>,
    active: bool,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the registration now.
    pub fn unsubscribe(mut self) {
        self.remove();
    }

    /// Keep the registration for the lifetime of the registry.
    pub fn detach(mut self) -> SubscriptionId {
        self.active = false;
        self.id
    }

    fn remove(&mut self) {
        if !std::mem::replace(&mut self.active, false) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.unsubscribe(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Drain the incoming queue and publish every frame. Returns the number of
/// frames drained.
pub fn deliver_pending(bus: &MessageBus, registry: &SubscriberRegistry) -> usize {
    let mut drained = 0usize;
    while let Some(frame) = bus.incoming().try_dequeue() {
        let fanout = registry.publish(&frame);
        trace!(
            len = frame.len(),
            delivered = fanout.delivered,
            failed = fanout.failed,
            "published frame"
        );
        drained += 1;
    }
    drained
}

/// Periodic timer that fans inbound frames out to subscribers.
///
/// Runs on its own thread, independent of the transport worker's poll
/// interval.
pub struct NotificationPump {
    bus: Arc<MessageBus>,
    registry: Arc<SubscriberRegistry>,
    config: PumpConfig,
    timer: Option<Timer>,
}

struct Timer {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl NotificationPump {
    pub fn new(bus: Arc<MessageBus>, registry: Arc<SubscriberRegistry>, config: PumpConfig) -> Self {
        Self {
            bus,
            registry,
            config,
            timer: None,
        }
    }

    /// Start ticking. The first tick runs immediately. Restarts the timer
    /// if it is already running.
    pub fn start(&mut self) -> Result<()> {
        self.stop();

        let (stop, stop_rx) = mpsc::channel::<()>();
        let bus = Arc::clone(&self.bus);
        let registry = Arc::clone(&self.registry);
        let period = self.config.period;

        let handle = thread::Builder::new()
            .name("railbus-pump".to_string())
            .spawn(move || {
                let mut next_tick = Instant::now();
                loop {
                    deliver_pending(&bus, &registry);

                    let Some(deadline) = next_tick.checked_add(period) else {
                        // No representable next tick: idle until stopped.
                        let _ = stop_rx.recv();
                        break;
                    };
                    let now = Instant::now();
                    next_tick = deadline.max(now);
                    match stop_rx.recv_timeout(next_tick - now) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(|source| BusError::Spawn {
                name: "notification pump",
                source,
            })?;

        debug!(period = ?period, "notification pump started");
        self.timer = Some(Timer { stop, handle });
        Ok(())
    }

    /// Stop ticking and wait for the current tick to finish.
    pub fn stop(&mut self) {
        let Some(timer) = self.timer.take() else {
            return;
        };
        let _ = timer.stop.send(());
        if timer.handle.join().is_err() {
            warn!("notification pump panicked");
        }
        debug!("notification pump stopped");
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Run one tick on the caller's thread.
    pub fn tick(&self) -> usize {
        deliver_pending(&self.bus, &self.registry)
    }
}

impl Drop for NotificationPump {
    fn drop(&mut self) {
        self.stop();
    }
}
