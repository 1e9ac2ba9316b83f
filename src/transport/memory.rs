//! In-process transport.
//!
//! Keeps a value table per declared point and a journal of every write.
//! Inbound traffic (reports from the remote station, commands from a
//! controlling station) is simulated with [`MemoryTransport::inject`].

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{PointSpec, Transport, TransportHandle, MAX_IOA};
use crate::error::{Result, StationError};
use crate::link::LinkState;
use crate::types::{Cp56Time2a, Direction, PointValue};

/// A write handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteRecord {
    /// Value sent as command or spontaneous report
    Value {
        /// Target address
        io_address: u32,
        /// Value written
        value: PointValue,
    },
    /// Clock synchronization
    Clock {
        /// Target address
        io_address: u32,
        /// Timestamp handed to the transport
        time: Cp56Time2a,
    },
}

impl WriteRecord {
    /// Information object address the write targeted.
    pub fn io_address(&self) -> u32 {
        match self {
            Self::Value { io_address, .. } | Self::Clock { io_address, .. } => *io_address,
        }
    }
}

#[derive(Debug)]
struct Slot {
    spec: PointSpec,
    value: Mutex<Option<PointValue>>,
}

#[derive(Debug, Default)]
struct State {
    connected: bool,
    fail_connect: bool,
    fail_writes: bool,
    journal: Vec<WriteRecord>,
    link: Option<LinkState>,
}

/// Transport keeping all point values in memory.
#[derive(Debug)]
pub struct MemoryTransport {
    address: String,
    slots: Mutex<Vec<Arc<Slot>>>,
    state: Mutex<State>,
}

impl MemoryTransport {
    /// Create a transport labelled with the peer address.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            slots: Mutex::new(Vec::new()),
            state: Mutex::new(State::default()),
        }
    }

    /// Make subsequent `connect` calls fail.
    pub fn set_fail_connect(&self, fail: bool) {
        self.state.lock().fail_connect = fail;
    }

    /// Make subsequent writes fail with a transport error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Whether the transport is connected.
    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// All writes issued so far, oldest first.
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.state.lock().journal.clone()
    }

    /// Forget the write journal.
    pub fn clear_writes(&self) {
        self.state.lock().journal.clear();
    }

    /// Specs of all declared points.
    pub fn declared(&self) -> Vec<PointSpec> {
        self.slots.lock().iter().map(|s| s.spec.clone()).collect()
    }

    /// Simulate an inbound frame updating the point at `io_address`.
    ///
    /// Counts as link activity.
    pub fn inject(&self, direction: Direction, io_address: u32, value: PointValue) -> Result<()> {
        let slot = self
            .slots
            .lock()
            .iter()
            .find(|s| s.spec.io_address == io_address && s.spec.type_id.direction() == direction)
            .cloned()
            .ok_or_else(|| StationError::UnknownPoint(format!("IOA {}", io_address)))?;

        if !value.matches(slot.spec.type_id) {
            return Err(StationError::invalid_value(
                format!("IOA {}", io_address),
                format!("{:?} does not fit {}", value, slot.spec.type_id),
            ));
        }

        *slot.value.lock() = Some(value);
        if let Some(link) = &self.state.lock().link {
            link.touch();
        }
        Ok(())
    }

    fn slot(&self, handle: TransportHandle) -> Option<Arc<Slot>> {
        self.slots.lock().get(handle.0 as usize).cloned()
    }

    fn record(&self, record: WriteRecord) -> Result<()> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(StationError::NotConnected);
        }
        if state.fail_writes {
            return Err(StationError::transport(format!(
                "write to IOA {} rejected",
                record.io_address()
            )));
        }
        state.journal.push(record);
        Ok(())
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_connect {
            return Err(StationError::transport(format!(
                "connection to {} refused",
                self.address
            )));
        }
        state.connected = true;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.state.lock().connected = false;
        Ok(())
    }

    fn declare_point(&self, spec: &PointSpec) -> Result<TransportHandle> {
        if spec.io_address > MAX_IOA {
            return Err(StationError::transport(format!(
                "IOA {} exceeds 3 octets",
                spec.io_address
            )));
        }

        let mut slots = self.slots.lock();
        let handle = TransportHandle(slots.len() as u32);
        slots.push(Arc::new(Slot {
            spec: spec.clone(),
            value: Mutex::new(None),
        }));
        Ok(handle)
    }

    fn read_value(&self, handle: TransportHandle) -> Option<PointValue> {
        self.slot(handle).and_then(|s| *s.value.lock())
    }

    async fn write_value(&self, handle: TransportHandle, value: PointValue) -> Result<()> {
        let slot = self
            .slot(handle)
            .ok_or_else(|| StationError::transport(format!("unknown handle {}", handle.0)))?;

        self.record(WriteRecord::Value {
            io_address: slot.spec.io_address,
            value,
        })?;
        *slot.value.lock() = Some(value);
        Ok(())
    }

    async fn write_clock(&self, handle: TransportHandle, time: Cp56Time2a) -> Result<()> {
        let slot = self
            .slot(handle)
            .ok_or_else(|| StationError::transport(format!("unknown handle {}", handle.0)))?;

        self.record(WriteRecord::Clock {
            io_address: slot.spec.io_address,
            time,
        })
    }

    fn attach_link(&self, link: LinkState) {
        self.state.lock().link = Some(link);
    }
}
