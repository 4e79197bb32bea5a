use std::time::Duration;

use railbus_frame::FrameConfig;
use railbus_transport::SerialConfig;

/// Idle sleep of the transport worker when a pass moved no data.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Period of the notification pump.
pub const DEFAULT_FANOUT_PERIOD: Duration = Duration::from_millis(200);

/// Transport worker settings.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Sleep between passes that moved no data. Default: 100 ms.
    pub poll_interval: Duration,
    /// Inbound framing settings.
    pub frame: FrameConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            frame: FrameConfig::default(),
        }
    }
}

/// Notification pump settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpConfig {
    /// Time between fan-out passes. Default: 200 ms.
    pub period: Duration,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_FANOUT_PERIOD,
        }
    }
}

/// Everything a [`crate::Bridge`] needs.
#[derive(Debug, Clone, Default)]
pub struct BridgeConfig {
    /// Line settings used when opening a serial port. The baud rate passed
    /// to [`crate::Bridge::open`] overrides `serial.baud_rate`.
    pub serial: SerialConfig,
    pub worker: WorkerConfig,
    pub pump: PumpConfig,
}
