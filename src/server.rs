//! Controlled-station runtime.
//!
//! Serves a simulated process. Each tick supervises the link, reads the
//! command values written by the controlling station since the previous
//! tick, advances the simulation and reports the new measurements.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Span};

use crate::catalog::{PointCatalog, PointHandle};
use crate::client::RuntimeState;
use crate::config::StationConfig;
use crate::dispatch::CommandDispatcher;
use crate::error::Result;
use crate::link::{LinkState, LinkSupervisor};
use crate::simulation::{Simulation, SimulationInputs, SimulationOutputs};
use crate::transport::Transport;
use crate::types::{PointCategory, PointValue, TypeId};

/// Report interval of the simulated measurements in milliseconds.
pub const REPORT_INTERVAL_MS: u32 = 1000;

/// Handles of the simulated station's points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerPoints {
    /// `temp`, float measurement at IOA 11
    pub temperature: PointHandle,
    /// `pressure`, float measurement at IOA 12
    pub pressure: PointHandle,
    /// `status`, single point at IOA 21
    pub status: PointHandle,
    /// `control`, single command at IOA 31
    pub control: PointHandle,
    /// `setpoint`, float setpoint at IOA 32
    pub setpoint: PointHandle,
}

impl ServerPoints {
    /// Declare the points of the simulated station.
    pub fn declare<T: Transport>(catalog: &mut PointCatalog<T>) -> Result<Self> {
        Ok(Self {
            temperature: catalog.declare_named(
                "temp",
                PointCategory::Measurement,
                11,
                TypeId::MeasuredFloat,
                REPORT_INTERVAL_MS,
            )?,
            pressure: catalog.declare_named(
                "pressure",
                PointCategory::Measurement,
                12,
                TypeId::MeasuredFloat,
                REPORT_INTERVAL_MS,
            )?,
            status: catalog.declare_named(
                "status",
                PointCategory::SingleStatus,
                21,
                TypeId::SinglePoint,
                REPORT_INTERVAL_MS,
            )?,
            control: catalog.declare_named(
                "control",
                PointCategory::Command,
                31,
                TypeId::SingleCommand,
                0,
            )?,
            setpoint: catalog.declare_named(
                "setpoint",
                PointCategory::Setpoint,
                32,
                TypeId::SetpointFloat,
                0,
            )?,
        })
    }
}

/// Server runtime simulating one station.
pub struct ServerRuntime<T: Transport> {
    config: StationConfig,
    transport: Arc<T>,
    catalog: Arc<PointCatalog<T>>,
    points: ServerPoints,
    supervisor: LinkSupervisor<T>,
    simulation: Simulation<StdRng>,
    state: RuntimeState,
    span: Span,
}

impl<T: Transport> ServerRuntime<T> {
    /// Build the simulated station on `transport`.
    pub fn new(config: StationConfig, transport: Arc<T>) -> Result<Self> {
        Self::with_simulation(config, transport, Simulation::new(StdRng::from_entropy()))
    }

    /// Build the simulated station with a reproducible random source.
    pub fn with_seed(config: StationConfig, transport: Arc<T>, seed: u64) -> Result<Self> {
        Self::with_simulation(
            config,
            transport,
            Simulation::new(StdRng::seed_from_u64(seed)),
        )
    }

    /// Build the simulated station around an explicit simulation.
    pub fn with_simulation(
        config: StationConfig,
        transport: Arc<T>,
        simulation: Simulation<StdRng>,
    ) -> Result<Self> {
        let span = info_span!("server", ca = config.common_address);

        let mut catalog = PointCatalog::with_span(
            config.common_address,
            transport.clone(),
            info_span!(parent: &span, "catalog"),
        )?;
        let points = ServerPoints::declare(&mut catalog)?;
        let catalog = Arc::new(catalog);

        let link = LinkState::new(config.t3_timeout);
        transport.attach_link(link.clone());

        let dispatcher = Arc::new(
            CommandDispatcher::new(catalog.clone(), link.clone(), config.settle_delay)
                .with_span(info_span!(parent: &span, "dispatch")),
        );
        let supervisor = LinkSupervisor::new(link, dispatcher, info_span!(parent: &span, "link"));

        Ok(Self {
            config,
            transport,
            catalog,
            points,
            supervisor,
            simulation,
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

    /// Point catalog of the simulated station.
    pub fn catalog(&self) -> &Arc<PointCatalog<T>> {
        &self.catalog
    }

    /// Handles of the simulated points.
    pub fn points(&self) -> &ServerPoints {
        &self.points
    }

    /// Link supervisor.
    pub fn supervisor(&self) -> &LinkSupervisor<T> {
        &self.supervisor
    }

    /// Start serving.
    pub async fn start(&mut self) -> Result<()> {
        if self.state == RuntimeState::Connected {
            return Ok(());
        }

        self.state = RuntimeState::Connecting;
        info!(parent: &self.span, "Starting IEC104 server on {}", self.config.address);
        if let Err(e) = self.transport.connect().await {
            self.state = RuntimeState::Disconnected;
            error!(parent: &self.span, error = %e, "Server error");
            return Err(e);
        }

        self.state = RuntimeState::Connected;
        self.supervisor.reset();
        info!(parent: &self.span, "Server started successfully");
        Ok(())
    }

    /// Run one tick: supervise the link, read the command values, then
    /// simulate and report the measurements.
    ///
    /// A failed measurement write is logged and the remaining writes still
    /// happen.
    pub async fn tick(&mut self) -> Result<SimulationOutputs> {
        if self.state != RuntimeState::Connected {
            self.start().await?;
        }
        self.supervisor.check().await;

        let inputs = self.read_inputs();
        let outputs = self.simulation.step(inputs);

        let writes = [
            (self.points.temperature, PointValue::Float(outputs.temperature)),
            (self.points.pressure, PointValue::Float(outputs.pressure)),
            (self.points.status, PointValue::Single(outputs.status)),
        ];
        for (handle, value) in writes {
            if let Err(e) = self.catalog.set(handle, value).await {
                error!(parent: &self.span, error = %e, "Error updating data");
            }
        }

        debug!(
            parent: &self.span,
            temperature = outputs.temperature,
            pressure = outputs.pressure,
            status = outputs.status,
            "Measurements updated"
        );
        Ok(outputs)
    }

    fn read_inputs(&self) -> SimulationInputs {
        let read = |handle: PointHandle| match self.catalog.get(handle) {
            Ok(value) => value,
            Err(e) => {
                error!(parent: &self.span, error = %e, "Error checking control values");
                None
            }
        };

        let control = read(self.points.control);
        let setpoint = read(self.points.setpoint);
        let temperature = read(self.points.temperature);
        debug!(
            parent: &self.span,
            "Control status: {}, setpoint: {}",
            fmt_value(control),
            fmt_value(setpoint)
        );

        SimulationInputs {
            control: control.and_then(|v| v.as_bool()).unwrap_or(false),
            setpoint: setpoint.and_then(|v| v.as_f64()).unwrap_or(0.0) as f32,
            temperature: temperature.and_then(|v| v.as_f64()).map(|t| t as f32),
        }
    }

    /// Start, then tick until `shutdown` is cancelled, then stop.
    ///
    /// A failed start is retried on every tick.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        if let Err(e) = self.start().await {
            warn!(parent: &self.span, error = %e, "Initial start failed, retrying every tick");
        }

        let mut interval = tokio::time::interval(self.config.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

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

    /// Stop serving. Does nothing if already stopped.
    pub async fn stop(&mut self) -> Result<()> {
        if self.state == RuntimeState::Disconnected {
            return Ok(());
        }

        let result = self.transport.disconnect().await;
        self.state = RuntimeState::Disconnected;
        match &result {
            Ok(()) => info!(parent: &self.span, "Server stopped"),
            Err(e) => error!(parent: &self.span, error = %e, "Error stopping server"),
        }
        result
    }
}

fn fmt_value(value: Option<PointValue>) -> String {
    value.map_or_else(|| "None".to_owned(), |v| v.to_string())
}
