//! Point catalog of a station.
//!
//! The catalog owns every point of one station. Points are declared once
//! at startup; afterwards the catalog is shared read-only and values move
//! through the transport.
//!
//! Monitoring and control points have separate address spaces. Address 0
//! is reserved in both: the catalog declares the station-control point
//! there itself, and interrogation, clock synchronization and test frames
//! are all issued through it.

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

use tracing::{debug, Span};

use crate::error::{Result, StationError};
use crate::transport::{PointSpec, Transport, TransportHandle};
use crate::types::{Cp56Time2a, Direction, PointCategory, PointValue, RawValue, TypeId};

/// Reserved address for interrogation, clock sync and test frames.
pub const RESERVED_ADDRESS: u32 = 0;

/// Name of the station-control point at the reserved address.
pub const STATION_CONTROL: &str = "station_control";

/// Handle returned when a point is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointHandle(usize);

impl PointHandle {
    /// Position of the point in declaration order.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Ways to look up a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKey<'a> {
    /// Handle from declaration
    Handle(PointHandle),
    /// Human-facing name
    Name(&'a str),
    /// Address within one direction
    Address(Direction, u32),
}

impl From<PointHandle> for PointKey<'_> {
    fn from(handle: PointHandle) -> Self {
        Self::Handle(handle)
    }
}

impl<'a> From<&'a str> for PointKey<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a String> for PointKey<'a> {
    fn from(name: &'a String) -> Self {
        Self::Name(name.as_str())
    }
}

impl std::fmt::Display for PointKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Handle(h) => write!(f, "#{}", h.0),
            Self::Name(name) => f.write_str(name),
            Self::Address(Direction::Monitoring, addr) => write!(f, "monitoring IOA {}", addr),
            Self::Address(Direction::Control, addr) => write!(f, "control IOA {}", addr),
        }
    }
}

/// A declared point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    /// Human-facing name
    pub name: String,
    /// Information object address
    pub io_address: u32,
    /// Semantic category
    pub category: PointCategory,
    /// Type identification
    pub type_id: TypeId,
    /// Periodic report interval, 0 = on change or on demand
    pub report_interval_ms: u32,
    transport: TransportHandle,
}

impl Point {
    /// Address space of the point.
    pub fn direction(&self) -> Direction {
        self.type_id.direction()
    }
}

/// Catalog of all points of one station.
pub struct PointCatalog<T: Transport> {
    common_address: u16,
    transport: Arc<T>,
    points: Vec<Point>,
    by_address: HashMap<(Direction, u32), PointHandle>,
    by_name: HashMap<String, PointHandle>,
    station_control: PointHandle,
    span: Span,
}

impl<T: Transport> PointCatalog<T> {
    /// Create the catalog under the current span and declare the station-control point.
    pub fn new(common_address: u16, transport: Arc<T>) -> Result<Self> {
        Self::with_span(common_address, transport, Span::current())
    }

    /// Create the catalog logging under `span`.
    pub fn with_span(common_address: u16, transport: Arc<T>, span: Span) -> Result<Self> {
        let mut catalog = Self {
            common_address,
            transport,
            points: Vec::new(),
            by_address: HashMap::new(),
            by_name: HashMap::new(),
            station_control: PointHandle(0),
            span,
        };
        catalog.station_control = catalog.insert(
            STATION_CONTROL.to_owned(),
            PointCategory::Command,
            RESERVED_ADDRESS,
            TypeId::SingleCommand,
            0,
        )?;
        Ok(catalog)
    }

    /// Common address of the station.
    pub fn common_address(&self) -> u16 {
        self.common_address
    }

    /// The transport the points are declared on.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Handle of the station-control point at address 0.
    pub fn station_control(&self) -> PointHandle {
        self.station_control
    }

    /// Declare a point named after its category and address (e.g. `SPI_1`).
    pub fn declare(
        &mut self,
        category: PointCategory,
        io_address: u32,
        type_id: TypeId,
        report_interval_ms: u32,
    ) -> Result<PointHandle> {
        let name = format!("{}_{}", name_prefix(category, type_id), io_address);
        self.declare_named(name, category, io_address, type_id, report_interval_ms)
    }

    /// Declare a point under an explicit name.
    ///
    /// Fails with `InvalidType` if `type_id` does not belong to `category`,
    /// with `DuplicateAddress` if the address is reserved or taken in the
    /// point's direction, and with `DuplicateName` if the name is taken.
    pub fn declare_named(
        &mut self,
        name: impl Into<String>,
        category: PointCategory,
        io_address: u32,
        type_id: TypeId,
        report_interval_ms: u32,
    ) -> Result<PointHandle> {
        if !category.accepts(type_id) {
            return Err(StationError::InvalidType { category, type_id });
        }
        if io_address == RESERVED_ADDRESS {
            return Err(StationError::DuplicateAddress {
                station: self.common_address,
                address: io_address,
            });
        }
        self.insert(name.into(), category, io_address, type_id, report_interval_ms)
    }

    /// Declare one point per address in `addresses`.
    pub fn declare_range(
        &mut self,
        category: PointCategory,
        addresses: RangeInclusive<u32>,
        type_id: TypeId,
        report_interval_ms: u32,
    ) -> Result<Vec<PointHandle>> {
        addresses
            .map(|addr| self.declare(category, addr, type_id, report_interval_ms))
            .collect()
    }

    fn insert(
        &mut self,
        name: String,
        category: PointCategory,
        io_address: u32,
        type_id: TypeId,
        report_interval_ms: u32,
    ) -> Result<PointHandle> {
        let key = (type_id.direction(), io_address);
        if self.by_address.contains_key(&key) {
            return Err(StationError::DuplicateAddress {
                station: self.common_address,
                address: io_address,
            });
        }
        if self.by_name.contains_key(&name) {
            return Err(StationError::DuplicateName(name));
        }

        let spec = PointSpec {
            common_address: self.common_address,
            io_address,
            type_id,
            report_interval_ms,
        };
        let transport = self.transport.declare_point(&spec)?;

        let handle = PointHandle(self.points.len());
        debug!(
            parent: &self.span,
            point = %name,
            ioa = io_address,
            type_id = %type_id,
            report_ms = report_interval_ms,
            "Point declared"
        );
        self.by_address.insert(key, handle);
        self.by_name.insert(name.clone(), handle);
        self.points.push(Point {
            name,
            io_address,
            category,
            type_id,
            report_interval_ms,
            transport,
        });
        Ok(handle)
    }

    /// Resolve a key to a handle.
    pub fn resolve<'a>(&self, key: impl Into<PointKey<'a>>) -> Result<PointHandle> {
        let key = key.into();
        let handle = match key {
            PointKey::Handle(h) => (h.0 < self.points.len()).then_some(h),
            PointKey::Name(name) => self.by_name.get(name).copied(),
            PointKey::Address(direction, addr) => self.by_address.get(&(direction, addr)).copied(),
        };
        handle.ok_or_else(|| StationError::UnknownPoint(key.to_string()))
    }

    /// Look up a point.
    pub fn point<'a>(&self, key: impl Into<PointKey<'a>>) -> Result<&Point> {
        let handle = self.resolve(key)?;
        Ok(&self.points[handle.0])
    }

    /// Current value of a point, `None` if no value was received yet.
    pub fn get<'a>(&self, key: impl Into<PointKey<'a>>) -> Result<Option<PointValue>> {
        let point = self.point(key)?;
        Ok(self.transport.read_value(point.transport))
    }

    /// Coerce `value` to the point's type and write it through the transport.
    ///
    /// Command and setpoint points are sent as commands, monitoring points
    /// as spontaneous reports. Returns the value actually written.
    pub async fn set<'a>(
        &self,
        key: impl Into<PointKey<'a>>,
        value: impl Into<RawValue>,
    ) -> Result<PointValue> {
        let point = self.point(key)?;
        let value = value.into().coerce(point.type_id, &point.name)?;

        self.transport.write_value(point.transport, value).await?;
        debug!(
            parent: &self.span,
            point = %point.name,
            ioa = point.io_address,
            %value,
            command = point.category.is_command(),
            "Point written"
        );
        Ok(value)
    }

    /// Hand a clock synchronization to the transport through a command point.
    pub async fn write_clock<'a>(
        &self,
        key: impl Into<PointKey<'a>>,
        time: Cp56Time2a,
    ) -> Result<()> {
        let point = self.point(key)?;
        self.transport.write_clock(point.transport, time).await
    }

    /// All points in declaration order, starting with the station-control point.
    pub fn points(&self) -> impl Iterator<Item = (PointHandle, &Point)> {
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| (PointHandle(i), p))
    }

    /// Points of one category in declaration order.
    pub fn points_in(&self, category: PointCategory) -> impl Iterator<Item = (PointHandle, &Point)> {
        self.points()
            .filter(move |(h, p)| p.category == category && *h != self.station_control)
    }

    /// Number of declared points, including the station-control point.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether only the station-control point is declared.
    pub fn is_empty(&self) -> bool {
        self.points.len() <= 1
    }
}

fn name_prefix(category: PointCategory, type_id: TypeId) -> &'static str {
    match (category, type_id) {
        (PointCategory::SingleStatus, _) => "SPI",
        (PointCategory::DoubleStatus, _) => "DPI",
        (PointCategory::Measurement, TypeId::MeasuredNormalized) => "NVA",
        (PointCategory::Measurement, _) => "MFV",
        (PointCategory::Command, _) => "SCO",
        (PointCategory::Setpoint, _) => "SPC",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryTransport, WriteRecord};
    use tokio_test::{assert_err, assert_ok};

    fn catalog() -> (Arc<MemoryTransport>, PointCatalog<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new("127.0.0.1:2404"));
        let catalog = PointCatalog::new(1, transport.clone()).unwrap();
        (transport, catalog)
    }

    #[test]
    fn test_station_control_reserved() {
        let (transport, catalog) = catalog();
        let control = catalog.point(catalog.station_control()).unwrap();
        assert_eq!(control.io_address, RESERVED_ADDRESS);
        assert_eq!(control.type_id, TypeId::SingleCommand);
        assert_eq!(control.name, STATION_CONTROL);
        assert_eq!(transport.declared().len(), 1);
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_declare_names_points() {
        let (_, mut catalog) = catalog();
        let spi = catalog
            .declare(PointCategory::SingleStatus, 1, TypeId::SinglePoint, 0)
            .unwrap();
        let nva = catalog
            .declare(PointCategory::Measurement, 1793, TypeId::MeasuredNormalized, 0)
            .unwrap();

        assert_eq!(catalog.point(spi).unwrap().name, "SPI_1");
        assert_eq!(catalog.point(nva).unwrap().name, "NVA_1793");
        assert_eq!(catalog.resolve("NVA_1793").unwrap(), nva);
        assert_eq!(
            catalog
                .resolve(PointKey::Address(Direction::Monitoring, 1))
                .unwrap(),
            spi
        );
    }

    #[test]
    fn test_duplicate_address_rejected() {
        let (transport, mut catalog) = catalog();
        catalog
            .declare(PointCategory::DoubleStatus, 200, TypeId::DoublePoint, 0)
            .unwrap();

        let err = catalog
            .declare(PointCategory::SingleStatus, 200, TypeId::SinglePoint, 0)
            .unwrap_err();
        assert_eq!(
            err,
            StationError::DuplicateAddress {
                station: 1,
                address: 200
            }
        );
        assert!(err.is_fatal());
        assert_eq!(transport.declared().len(), 2);
    }

    #[test]
    fn test_reserved_address_rejected() {
        let (_, mut catalog) = catalog();
        for (category, type_id) in [
            (PointCategory::SingleStatus, TypeId::SinglePoint),
            (PointCategory::Command, TypeId::SingleCommand),
        ] {
            let err = catalog.declare(category, 0, type_id, 0).unwrap_err();
            assert!(matches!(err, StationError::DuplicateAddress { address: 0, .. }));
        }
    }

    #[test]
    fn test_directions_have_separate_address_spaces() {
        let (_, mut catalog) = catalog();
        assert_ok!(catalog.declare(PointCategory::SingleStatus, 1, TypeId::SinglePoint, 0));
        assert_ok!(catalog.declare(PointCategory::Command, 1, TypeId::SingleCommand, 0));
        assert_err!(catalog.declare(PointCategory::Setpoint, 1, TypeId::SetpointFloat, 0));
    }

    #[test]
    fn test_overlapping_ranges_rejected() {
        let (_, mut catalog) = catalog();
        assert_ok!(catalog.declare_range(PointCategory::SingleStatus, 1..=2, TypeId::SinglePoint, 0));
        let err = catalog
            .declare_range(PointCategory::DoubleStatus, 2..=4, TypeId::DoublePoint, 0)
            .unwrap_err();
        assert!(matches!(err, StationError::DuplicateAddress { address: 2, .. }));
    }

    #[test]
    fn test_invalid_type_for_category() {
        let (transport, mut catalog) = catalog();
        let err = catalog
            .declare(PointCategory::Setpoint, 32, TypeId::MeasuredFloat, 0)
            .unwrap_err();
        assert_eq!(
            err,
            StationError::InvalidType {
                category: PointCategory::Setpoint,
                type_id: TypeId::MeasuredFloat
            }
        );
        assert_eq!(transport.declared().len(), 1);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let (_, mut catalog) = catalog();
        assert_ok!(catalog.declare_named("temp", PointCategory::Measurement, 11, TypeId::MeasuredFloat, 1000));
        let err = catalog
            .declare_named("temp", PointCategory::Measurement, 12, TypeId::MeasuredFloat, 1000)
            .unwrap_err();
        assert_eq!(err, StationError::DuplicateName("temp".into()));
    }

    #[test]
    fn test_get_distinguishes_no_data() {
        let (transport, mut catalog) = catalog();
        let spi = catalog
            .declare(PointCategory::SingleStatus, 1, TypeId::SinglePoint, 0)
            .unwrap();
        assert_eq!(catalog.get(spi).unwrap(), None);

        transport
            .inject(Direction::Monitoring, 1, PointValue::Single(false))
            .unwrap();
        assert_eq!(catalog.get("SPI_1").unwrap(), Some(PointValue::Single(false)));

        assert!(matches!(
            catalog.get("SPI_9"),
            Err(StationError::UnknownPoint(_))
        ));
    }

    #[tokio::test]
    async fn test_set_coerces_setpoint_to_float() {
        let (transport, mut catalog) = catalog();
        catalog
            .declare_named("setpoint", PointCategory::Setpoint, 32, TypeId::SetpointFloat, 0)
            .unwrap();
        transport.connect().await.unwrap();

        let written = catalog.set("setpoint", 7).await.unwrap();
        assert_eq!(written, PointValue::Float(7.0));
        assert_eq!(
            transport.writes(),
            vec![WriteRecord::Value {
                io_address: 32,
                value: PointValue::Float(7.0)
            }]
        );
        assert_eq!(catalog.get("setpoint").unwrap(), Some(PointValue::Float(7.0)));
    }

    #[tokio::test]
    async fn test_set_invalid_value_skips_transport() {
        let (transport, mut catalog) = catalog();
        catalog
            .declare_named("setpoint", PointCategory::Setpoint, 32, TypeId::SetpointFloat, 0)
            .unwrap();
        transport.connect().await.unwrap();

        let err = catalog.set("setpoint", "high").await.unwrap_err();
        assert!(matches!(err, StationError::InvalidValue { .. }));
        assert!(transport.writes().is_empty());
    }

    #[tokio::test]
    async fn test_set_unknown_point() {
        let (transport, catalog) = catalog();
        transport.connect().await.unwrap();

        let err = catalog.set("control", true).await.unwrap_err();
        assert_eq!(err, StationError::UnknownPoint("control".into()));
        assert!(transport.writes().is_empty());
    }

    #[test]
    fn test_points_in_category() {
        let (_, mut catalog) = catalog();
        catalog
            .declare_range(PointCategory::SingleStatus, 1..=2, TypeId::SinglePoint, 0)
            .unwrap();
        catalog
            .declare(PointCategory::Command, 5, TypeId::SingleCommand, 0)
            .unwrap();

        let names: Vec<_> = catalog
            .points_in(PointCategory::SingleStatus)
            .map(|(_, p)| p.name.as_str())
            .collect();
        assert_eq!(names, ["SPI_1", "SPI_2"]);

        // the station-control point is not listed with regular commands
        assert_eq!(catalog.points_in(PointCategory::Command).count(), 1);
        assert_eq!(catalog.len(), 4);
    }
}
