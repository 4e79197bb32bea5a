//! The public entry point: one transport, one bus, one pump.

use std::sync::Arc;

use railbus_frame::Frame;
use railbus_transport::{Link, SerialConfig};
use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::pump::{BoxError, NotificationPump, SubscriberRegistry, Subscription};
use crate::queue::MessageBus;
use crate::worker::Transport;

/// Serial bridge to a block controller.
///
/// `send` only enqueues; the worker thread performs the write. Inbound
/// frames are handed to subscribers by the notification pump, or can be
/// pulled directly with [`Bridge::try_receive`]. Direct pulls compete with
/// the pump for the same queue.
///
/// # Example
///
/// ```no_run
/// use railbus_bus::Bridge;
/// use railbus_frame::block_speed;
///
/// let mut bridge = Bridge::new();
/// bridge.open("/dev/ttyUSB0", 115_200)?;
/// let _sub = bridge.subscribe(|frame| {
///     println!("{}", frame.to_hex());
///     Ok(())
/// });
/// bridge.send(block_speed(2, 120));
/// # Ok::<(), railbus_bus::BusError>(())
/// ```
pub struct Bridge {
    bus: Arc<MessageBus>,
    registry: Arc<SubscriberRegistry>,
    transport: Transport,
    pump: NotificationPump,
    config: BridgeConfig,
}

impl Bridge {
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    pub fn with_config(config: BridgeConfig) -> Self {
        let bus = Arc::new(MessageBus::new());
        let registry = SubscriberRegistry::new();
        let transport = Transport::with_config(Arc::clone(&bus), config.worker.clone());
        let pump = NotificationPump::new(Arc::clone(&bus), Arc::clone(&registry), config.pump);

        Self {
            bus,
            registry,
            transport,
            pump,
            config,
        }
    }

    /// Open `port` at `baud_rate`, start the worker and the pump.
    ///
    /// Anything already open is closed first. On failure nothing is left
    /// running.
    pub fn open(&mut self, port: &str, baud_rate: u32) -> Result<()> {
        self.close();
        let serial = SerialConfig {
            baud_rate,
            ..self.config.serial.clone()
        };
        self.transport.open_with_config(port, &serial)?;
        self.start_pump()?;
        info!(port, baud_rate, "bridge open");
        Ok(())
    }

    /// Run the bridge over an already-connected link.
    pub fn attach(&mut self, link: Box<dyn Link>) -> Result<()> {
        self.close();
        let name = link.name().to_string();
        self.transport.attach(link)?;
        self.start_pump()?;
        info!(link = %name, "bridge attached");
        Ok(())
    }

    /// Stop fan-out, then stop the worker and release the link. Idempotent.
    ///
    /// Frames still queued in either direction stay queued.
    pub fn close(&mut self) {
        if !self.is_open() {
            return;
        }
        self.pump.stop();
        self.transport.close();
        debug!("bridge closed");
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Name of the open link, if any.
    pub fn link_name(&self) -> Option<&str> {
        self.transport.link_name()
    }

    /// Queue one frame for transmission. Never blocks on the link.
    pub fn send(&self, frame: Frame) {
        self.bus.outgoing().enqueue(frame);
    }

    /// Queue several frames, preserving their order.
    pub fn send_all<I>(&self, frames: I)
    where
        I: IntoIterator<Item = Frame>,
    {
        for frame in frames {
            self.send(frame);
        }
    }

    pub fn has_incoming(&self) -> bool {
        !self.bus.incoming().is_empty()
    }

    /// Take the oldest inbound frame, if any.
    pub fn try_receive(&self) -> Option<Frame> {
        self.bus.incoming().try_dequeue()
    }

    /// Register a callback for every inbound frame.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Frame) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.registry.subscribe(callback)
    }

    pub fn incoming_count(&self) -> usize {
        self.bus.incoming().len()
    }

    pub fn outgoing_count(&self) -> usize {
        self.bus.outgoing().len()
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    fn start_pump(&mut self) -> Result<()> {
        if let Err(err) = self.pump.start() {
            self.transport.close();
            return Err(err);
        }
        Ok(())
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("link", &self.link_name())
            .field("incoming", &self.incoming_count())
            .field("outgoing", &self.outgoing_count())
            .field("subscribers", &self.registry.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use railbus_frame::block_speed;
    use railbus_transport::TransportError;

    use super::*;
    use crate::error::BusError;

    #[test]
    fn send_only_enqueues() {
        let bridge = Bridge::new();
        bridge.send(block_speed(1, 10));
        bridge.send_all([block_speed(2, 20), block_speed(3, 30)]);
        assert_eq!(bridge.outgoing_count(), 3);
        assert!(!bridge.is_open());

        let first = bridge.bus().outgoing().try_dequeue().unwrap();
        assert_eq!(first.as_bytes(), &[1, 0, 0x41, 1, 10, 0xFF]);
    }

    #[test]
    fn try_receive_on_empty_bus() {
        let bridge = Bridge::new();
        assert!(!bridge.has_incoming());
        assert!(bridge.try_receive().is_none());

        bridge.bus().incoming().enqueue(Frame::from(vec![9]));
        assert!(bridge.has_incoming());
        assert_eq!(bridge.incoming_count(), 1);
        assert_eq!(bridge.try_receive().unwrap().as_bytes(), &[9]);
    }

    #[test]
    fn close_without_open_is_noop() {
        let mut bridge = Bridge::new();
        bridge.close();
        bridge.close();
        assert!(!bridge.is_open());
    }

    #[test]
    fn open_failure_leaves_bridge_closed() {
        let mut bridge = Bridge::new();
        let err = bridge.open("/dev/railbus-no-such-port", 9600).unwrap_err();
        assert!(matches!(
            err,
            BusError::Transport(TransportError::Open { .. })
        ));
        assert!(!bridge.is_open());
    }

    #[test]
    fn subscriptions_register_on_shared_registry() {
        let bridge = Bridge::new();
        let sub = bridge.subscribe(|_| Ok(()));
        assert_eq!(bridge.registry().len(), 1);
        drop(sub);
        assert!(bridge.registry().is_empty());
    }
}
