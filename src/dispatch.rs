//! Remote-control operations.
//!
//! Every operation catches its own failure: the error is logged with the
//! operation name and returned to the caller, which may ignore it. A failed
//! command never takes the tick loop down.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info, Span};

use crate::catalog::{PointCatalog, PointHandle, PointKey};
use crate::error::{Result, StationError};
use crate::link::LinkState;
use crate::transport::Transport;
use crate::types::{Cp56Time2a, PointCategory, PointValue, RawValue, TypeId};

/// Highest interrogation group (INRO16).
pub const MAX_INTERROGATION_GROUP: u8 = 16;

/// Command points used for group interrogation, one per group.
///
/// Built once at startup so the catalog never grows at runtime.
#[derive(Debug, Clone, Default)]
pub struct GroupTable {
    points: [Option<PointHandle>; MAX_INTERROGATION_GROUP as usize],
}

impl GroupTable {
    /// A table without group points.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Declare the command point of every group at `ioAddress = group`.
    pub fn declare<T: Transport>(catalog: &mut PointCatalog<T>) -> Result<Self> {
        let mut table = Self::empty();
        for group in 1..=MAX_INTERROGATION_GROUP {
            let handle = catalog.declare_named(
                format!("INRO{}", group),
                PointCategory::Command,
                group as u32,
                TypeId::SingleCommand,
                0,
            )?;
            table.points[group as usize - 1] = Some(handle);
        }
        Ok(table)
    }

    /// Handle of the point for `group`.
    pub fn get(&self, group: u8) -> Option<PointHandle> {
        if (1..=MAX_INTERROGATION_GROUP).contains(&group) {
            self.points[group as usize - 1]
        } else {
            None
        }
    }
}

/// A control write in flight.
#[derive(Debug, Clone)]
pub struct PendingCommand {
    /// Target point
    pub point: PointHandle,
    /// Name of the target point
    pub name: String,
    /// Requested value, before coercion
    pub requested: RawValue,
    /// When the command was issued
    pub issued_at: Instant,
    /// When the verification read happens
    pub verify_at: Option<Instant>,
}

impl PendingCommand {
    fn issue(point: PointHandle, name: String, requested: RawValue, settle: Duration) -> Self {
        let issued_at = Instant::now();
        Self {
            point,
            name,
            requested,
            issued_at,
            verify_at: (!settle.is_zero()).then(|| issued_at + settle),
        }
    }

    async fn settle(&self) {
        if let Some(deadline) = self.verify_at {
            tokio::time::sleep_until(deadline).await;
        }
    }
}

/// Issues interrogations, clock synchronization, test frames and commands.
pub struct CommandDispatcher<T: Transport> {
    catalog: Arc<PointCatalog<T>>,
    link: LinkState,
    groups: GroupTable,
    settle_delay: Duration,
    span: Span,
}

impl<T: Transport> CommandDispatcher<T> {
    /// Create a dispatcher without group points, logging under the current span.
    pub fn new(catalog: Arc<PointCatalog<T>>, link: LinkState, settle_delay: Duration) -> Self {
        Self {
            catalog,
            link,
            groups: GroupTable::empty(),
            settle_delay,
            span: Span::current(),
        }
    }

    /// Use `groups` for group interrogation.
    pub fn with_groups(mut self, groups: GroupTable) -> Self {
        self.groups = groups;
        self
    }

    /// Log under `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// The catalog commands are issued against.
    pub fn catalog(&self) -> &Arc<PointCatalog<T>> {
        &self.catalog
    }

    /// Request all points of the remote station.
    pub async fn general_interrogation(&self) -> Result<()> {
        info!(parent: &self.span, "Initiating general interrogation");
        let result = self
            .catalog
            .set(self.catalog.station_control(), true)
            .await
            .map(|_| info!(parent: &self.span, "General interrogation command sent"));
        self.report("general interrogation", result)
    }

    /// Request the points of interrogation group `group` (1-16).
    pub async fn group_interrogation(&self, group: u8) -> Result<()> {
        let result = async {
            if !(1..=MAX_INTERROGATION_GROUP).contains(&group) {
                return Err(StationError::InvalidGroup(group));
            }
            let handle = self
                .groups
                .get(group)
                .ok_or_else(|| StationError::UnknownPoint(format!("INRO{}", group)))?;

            info!(parent: &self.span, group, "Initiating group interrogation");
            self.catalog.set(handle, true).await.map(|_| ())
        }
        .await;
        self.report("group interrogation", result)
    }

    /// Synchronize the remote clock to the current local time.
    pub async fn sync_clock(&self) -> Result<Cp56Time2a> {
        let now = chrono::Local::now();
        let time = Cp56Time2a::from_datetime(&now);
        info!(parent: &self.span, "Synchronizing clock to {}", now);

        let result = self
            .catalog
            .write_clock(self.catalog.station_control(), time)
            .await
            .map(|_| time);
        self.report("clock synchronization", result)
    }

    /// Send a test frame and count it as link activity.
    pub async fn send_test_frame(&self) -> Result<()> {
        info!(parent: &self.span, "Sending test frame (TESTFR act)");
        let result = self
            .catalog
            .set(self.catalog.station_control(), true)
            .await
            .map(|_| {
                self.link.touch();
                info!(parent: &self.span, "Test frame sent");
            });
        self.report("test frame", result)
    }

    /// Write `value` to a point and read it back after the settle delay.
    ///
    /// Returns the value observed by the verification read. The observed
    /// value is logged, not compared with the request.
    pub async fn send_command<'a>(
        &self,
        key: impl Into<PointKey<'a>>,
        value: impl Into<RawValue>,
    ) -> Result<Option<PointValue>> {
        let key = key.into();
        let value = value.into();
        info!(parent: &self.span, point = %key, %value, "Sending command");

        let result = async {
            let handle = self.catalog.resolve(key)?;
            let name = self.catalog.point(handle)?.name.clone();
            let pending = PendingCommand::issue(handle, name, value.clone(), self.settle_delay);

            self.catalog.set(pending.point, pending.requested.clone()).await?;
            pending.settle().await;

            let observed = self.catalog.get(pending.point)?;
            info!(
                parent: &self.span,
                elapsed_ms = pending.issued_at.elapsed().as_millis() as u64,
                "Verification - {} current value: {}",
                pending.name,
                observed.map_or_else(|| "None".to_owned(), |v| v.to_string())
            );
            Ok::<_, StationError>(observed)
        }
        .await;
        self.report("command", result)
    }

    fn report<R>(&self, operation: &'static str, result: Result<R>) -> Result<R> {
        if let Err(e) = &result {
            error!(parent: &self.span, operation, error = %e, "Error during {}", operation);
        }
        result
    }
}
