//! Serial transport worker, message queues and subscriber fan-out.
//!
//! This is the "just works" layer. A [`Bridge`] owns one hardware link:
//! outbound frames queued with [`Bridge::send`] are written by a dedicated
//! worker thread, inbound bytes are split into frames and queued, and a
//! fixed-cadence pump hands every inbound frame to the registered
//! subscribers.
//!
//! ```text
//!  send() ─▶ outgoing ─▶ ┌────────┐ ─▶ link
//!                        │ worker │
//!  pump ◀── incoming ◀── └────────┘ ◀── link
//!    │
//!    └─▶ subscribers (registration order)
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod pump;
pub mod queue;
pub mod worker;

pub use bridge::Bridge;
pub use config::{
    BridgeConfig, PumpConfig, WorkerConfig, DEFAULT_FANOUT_PERIOD, DEFAULT_POLL_INTERVAL,
};
pub use error::{BusError, Result};
pub use pump::{
    deliver_pending, BoxError, Fanout, NotificationPump, SubscriberRegistry, Subscription,
    SubscriptionId,
};
pub use queue::{MessageBus, MessageQueue};
pub use worker::Transport;
