//! Transport capability.
//!
//! The station core never touches APDUs. It declares points on a transport,
//! reads their cached values and asks the transport to send writes as
//! commands or spontaneous reports. Framing, sequence numbers and the TCP
//! session all live behind this trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::link::LinkState;
use crate::types::{Cp56Time2a, PointValue, TypeId};

mod memory;

pub use memory::{MemoryTransport, WriteRecord};

/// Largest information object address (3 octets).
pub const MAX_IOA: u32 = 0x00FF_FFFF;

/// Opaque handle for a point declared on a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportHandle(pub u32);

/// Parameters of a point declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointSpec {
    /// Common address of the station
    pub common_address: u16,
    /// Information object address
    pub io_address: u32,
    /// Type identification
    pub type_id: TypeId,
    /// Periodic report interval, 0 = report on change or on demand
    pub report_interval_ms: u32,
}

/// Capability object provided by the protocol stack.
///
/// Implementations may run their own I/O concurrently. Every method must be
/// callable from the tick loop.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Establish the connection. Returns once the link is usable.
    async fn connect(&self) -> Result<()>;

    /// Close the connection.
    async fn disconnect(&self) -> Result<()>;

    /// Declare a point. Fails if the parameters are invalid for the wire protocol.
    fn declare_point(&self, spec: &PointSpec) -> Result<TransportHandle>;

    /// Last known value of a point, `None` if nothing was received or written yet.
    fn read_value(&self, handle: TransportHandle) -> Option<PointValue>;

    /// Store a value and send it as a command or spontaneous report.
    async fn write_value(&self, handle: TransportHandle, value: PointValue) -> Result<()>;

    /// Issue a clock synchronization through `handle`.
    ///
    /// The timestamp is carried out of band. The default sends a plain
    /// activation on the point.
    async fn write_clock(&self, handle: TransportHandle, _time: Cp56Time2a) -> Result<()> {
        self.write_value(handle, PointValue::Single(true)).await
    }

    /// Register the link state refreshed on every inbound frame.
    fn attach_link(&self, _link: LinkState) {}
}
