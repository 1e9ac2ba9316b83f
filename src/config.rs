//! Station runtime configuration.

use std::time::Duration;

/// Default IEC 104 port.
pub const DEFAULT_PORT: u16 = 2404;

/// Default T3 timeout (test frame) in seconds.
pub const DEFAULT_T3_TIMEOUT: u64 = 20;

/// Default tick period of the control loop in milliseconds.
pub const DEFAULT_TICK_MS: u64 = 1000;

/// Default delay before the verification read of a command in milliseconds.
pub const DEFAULT_SETTLE_MS: u64 = 500;

/// Common address of the polled station in the client role.
pub const DEFAULT_CLIENT_COMMON_ADDRESS: u16 = 1;

/// Common address of the simulated station in the server role.
pub const DEFAULT_SERVER_COMMON_ADDRESS: u16 = 47;

/// Runtime configuration for either role.
#[derive(Debug, Clone, PartialEq)]
pub struct StationConfig {
    /// Peer address (client) or bind address (server), host:port
    pub address: String,
    /// Common address of the station
    pub common_address: u16,
    /// Control loop period
    pub tick_interval: Duration,
    /// T3 timeout: silence tolerated before a test frame is sent
    pub t3_timeout: Duration,
    /// Delay before a command's verification read
    pub settle_delay: Duration,
}

impl StationConfig {
    /// Create a configuration with the given address and common address.
    pub fn new(address: impl Into<String>, common_address: u16) -> Self {
        Self {
            address: address.into(),
            common_address,
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
            t3_timeout: Duration::from_secs(DEFAULT_T3_TIMEOUT),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_MS),
        }
    }

    /// Defaults of the controlling station.
    pub fn client() -> Self {
        Self::new(
            format!("192.168.71.87:{}", DEFAULT_PORT),
            DEFAULT_CLIENT_COMMON_ADDRESS,
        )
    }

    /// Defaults of the controlled station.
    pub fn server() -> Self {
        Self::new(
            format!("0.0.0.0:{}", DEFAULT_PORT),
            DEFAULT_SERVER_COMMON_ADDRESS,
        )
    }

    /// Set the peer or bind address.
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Set the common address.
    pub fn common_address(mut self, common_address: u16) -> Self {
        self.common_address = common_address;
        self
    }

    /// Set the tick period.
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set T3 timeout.
    pub fn t3_timeout(mut self, timeout: Duration) -> Self {
        self.t3_timeout = timeout;
        self
    }

    /// Set the verification settle delay.
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self::client()
    }
}
