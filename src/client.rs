//! Controlling-station runtime.
//!
//! Polls a remote station: on connect it synchronizes the remote clock and
//! requests a general interrogation, then every tick it checks the link and
//! logs the current value of every monitoring point.

use std::ops::RangeInclusive;
use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Span};

use crate::catalog::PointCatalog;
use crate::config::StationConfig;
use crate::dispatch::{CommandDispatcher, GroupTable};
use crate::error::Result;
use crate::link::{LinkState, LinkSupervisor};
use crate::transport::Transport;
use crate::types::{Direction, PointCategory, PointValue, TypeId};

/// Single status points of the polled station.
pub const SINGLE_STATUS_RANGE: RangeInclusive<u32> = 1..=2;

/// Double status points of the polled station.
pub const DOUBLE_STATUS_RANGE: RangeInclusive<u32> = 200..=203;

/// Normalized measurements of the polled station.
pub const NORMALIZED_RANGE: RangeInclusive<u32> = 1793..=1800;

/// Runtime lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeState {
    /// No connection
    #[default]
    Disconnected,
    /// Connection being established
    Connecting,
    /// Connected and ticking
    Connected,
}

impl std::fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
        }
    }
}

/// Values seen by one poll, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollSnapshot {
    /// Point names and values
    pub values: Vec<(String, PointValue)>,
}

impl PollSnapshot {
    /// Value of the named point, if it had one.
    pub fn get(&self, name: &str) -> Option<PointValue> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Number of points with a value.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no point had a value.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Declare the points of the polled station.
pub fn declare_points<T: Transport>(catalog: &mut PointCatalog<T>) -> Result<()> {
    catalog.declare_range(
        PointCategory::SingleStatus,
        SINGLE_STATUS_RANGE,
        TypeId::SinglePoint,
        0,
    )?;
    catalog.declare_range(
        PointCategory::DoubleStatus,
        DOUBLE_STATUS_RANGE,
        TypeId::DoublePoint,
        0,
    )?;
    catalog.declare_range(
        PointCategory::Measurement,
        NORMALIZED_RANGE,
        TypeId::MeasuredNormalized,
        0,
    )?;
    Ok(())
}

/// Client runtime polling one remote station.
pub struct ClientRuntime<T: Transport> {
    config: StationConfig,
    transport: Arc<T>,
    dispatcher: Arc<CommandDispatcher<T>>,
    supervisor: LinkSupervisor<T>,
    state: RuntimeState,
    span: Span,
}

impl<T: Transport> ClientRuntime<T> {
    /// Build the catalog and wire the components on `transport`.
    ///
    /// Fails with a fatal error if the point layout is invalid.
    pub fn new(config: StationConfig, transport: Arc<T>) -> Result<Self> {
        let span = info_span!("client", ca = config.common_address);

        let mut catalog = PointCatalog::with_span(
            config.common_address,
            transport.clone(),
            info_span!(parent: &span, "catalog"),
        )?;
        declare_points(&mut catalog)?;
        let groups = GroupTable::declare(&mut catalog)?;
        info!(parent: &span, points = catalog.len(), "Point catalog ready");

        let link = LinkState::new(config.t3_timeout);
        transport.attach_link(link.clone());

        let dispatcher = Arc::new(
            CommandDispatcher::new(Arc::new(catalog), link.clone(), config.settle_delay)
                .with_groups(groups)
                .with_span(info_span!(parent: &span, "dispatch")),
        );
        let supervisor =
            LinkSupervisor::new(link, dispatcher.clone(), info_span!(parent: &span, "link"));

        Ok(Self {
            config,
            transport,
            dispatcher,
            supervisor,
            state: RuntimeState::Disconnected,
            span,
        })
    }

    /// Get the current lifecycle state.
    pub fn state(&self) -> RuntimeState {
        self.state
    }

    /// Runtime configuration.
    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    /// Dispatcher for client-initiated commands.
    pub fn dispatcher(&self) -> &Arc<CommandDispatcher<T>> {
        &self.dispatcher
    }

    /// Point catalog of the polled station.
    pub fn catalog(&self) -> &Arc<PointCatalog<T>> {
        self.dispatcher.catalog()
    }

    /// Link supervisor.
    pub fn supervisor(&self) -> &LinkSupervisor<T> {
        &self.supervisor
    }

    /// Connect, then synchronize the clock and request a general interrogation.
    ///
    /// Failures of the two startup commands are logged by the dispatcher and
    /// do not fail the connect.
    pub async fn start(&mut self) -> Result<()> {
        if self.state == RuntimeState::Connected {
            return Ok(());
        }

        self.state = RuntimeState::Connecting;
        info!(parent: &self.span, "Connecting to {}", self.config.address);
        if let Err(e) = self.transport.connect().await {
            self.state = RuntimeState::Disconnected;
            warn!(parent: &self.span, error = %e, "Connection failed");
            return Err(e);
        }

        self.state = RuntimeState::Connected;
        self.supervisor.reset();
        info!(parent: &self.span, "Connected to {}", self.config.address);

        self.dispatcher.sync_clock().await.ok();
        self.dispatcher.general_interrogation().await.ok();
        Ok(())
    }

    /// Run one steady-state tick: supervise the link, then poll.
    ///
    /// Reconnects first if the runtime is not connected.
    pub async fn tick(&mut self) -> Result<PollSnapshot> {
        if self.state != RuntimeState::Connected {
            self.start().await?;
        }
        self.supervisor.check().await;
        Ok(self.poll())
    }

    /// Log the current value of every monitoring point that has one.
    pub fn poll(&self) -> PollSnapshot {
        let catalog = self.catalog();
        let mut snapshot = PollSnapshot::default();
        for (handle, point) in catalog.points() {
            if point.direction() != Direction::Monitoring {
                continue;
            }
            if let Ok(Some(value)) = catalog.get(handle) {
                info!(parent: &self.span, "{}: {}", point.name, value);
                snapshot.values.push((point.name.clone(), value));
            }
        }
        snapshot
    }

    /// Start, then tick until `shutdown` is cancelled, then stop.
    ///
    /// A tick that is in progress when `shutdown` fires completes first.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        if let Err(e) = self.start().await {
            warn!(parent: &self.span, error = %e, "Initial connect failed, retrying every tick");
        }

        let mut interval = tokio::time::interval(self.config.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(parent: &self.span, "Received stop signal");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!(parent: &self.span, error = %e, "Tick failed");
                    }
                }
            }
        }

        self.stop().await
    }

    /// Close the transport. Does nothing if already disconnected.
    pub async fn stop(&mut self) -> Result<()> {
        if self.state == RuntimeState::Disconnected {
            return Ok(());
        }

        let result = self.transport.disconnect().await;
        self.state = RuntimeState::Disconnected;
        info!(parent: &self.span, "Client stopped");
        result
    }
}
