//! IEC 60870-5-104 Type Identification for supervised points.
//!
//! Only the types a station declares are modelled here. Encoding them on
//! the wire is the transport's concern.

/// Type identification of a supervised point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeId {
    // ============================================
    // Process information in monitoring direction
    // ============================================
    /// Single-point information (M_SP_NA_1)
    SinglePoint = 1,

    /// Double-point information (M_DP_NA_1)
    DoublePoint = 3,

    /// Measured value, normalized (M_ME_NA_1)
    MeasuredNormalized = 9,

    /// Measured value, short floating point (M_ME_NC_1)
    MeasuredFloat = 13,

    // ============================================
    // Process information in control direction
    // ============================================
    /// Single command (C_SC_NA_1)
    SingleCommand = 45,

    /// Set-point command, short floating point (C_SE_NC_1)
    SetpointFloat = 50,
}

impl TypeId {
    /// Convert to raw byte value.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if this type is in the monitoring direction (from RTU to master).
    #[inline]
    pub const fn is_monitoring(&self) -> bool {
        matches!(self.as_u8(), 1..=44)
    }

    /// Check if this type is in the control direction (from master to RTU).
    #[inline]
    pub const fn is_control(&self) -> bool {
        matches!(self.as_u8(), 45..=69)
    }

    /// Direction of the address space this type lives in.
    #[inline]
    pub const fn direction(&self) -> Direction {
        if self.is_control() {
            Direction::Control
        } else {
            Direction::Monitoring
        }
    }

    /// Get the IEC standard name (e.g., "M_SP_NA_1").
    #[inline]
    pub const fn standard_name(&self) -> &'static str {
        match self {
            Self::SinglePoint => "M_SP_NA_1",
            Self::DoublePoint => "M_DP_NA_1",
            Self::MeasuredNormalized => "M_ME_NA_1",
            Self::MeasuredFloat => "M_ME_NC_1",
            Self::SingleCommand => "C_SC_NA_1",
            Self::SetpointFloat => "C_SE_NC_1",
        }
    }
}

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.standard_name())
    }
}

/// Semantic grouping of points within a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointCategory {
    /// Single status (M_SP)
    SingleStatus,
    /// Double status (M_DP)
    DoubleStatus,
    /// Measured values, normalized or floating point (M_ME)
    Measurement,
    /// Single commands (C_SC)
    Command,
    /// Set-point commands (C_SE)
    Setpoint,
}

impl PointCategory {
    /// Check if `type_id` may be declared under this category.
    pub const fn accepts(&self, type_id: TypeId) -> bool {
        matches!(
            (self, type_id),
            (Self::SingleStatus, TypeId::SinglePoint)
                | (Self::DoubleStatus, TypeId::DoublePoint)
                | (Self::Measurement, TypeId::MeasuredNormalized)
                | (Self::Measurement, TypeId::MeasuredFloat)
                | (Self::Command, TypeId::SingleCommand)
                | (Self::Setpoint, TypeId::SetpointFloat)
        )
    }

    /// Whether writes to points of this category are sent as commands.
    pub const fn is_command(&self) -> bool {
        matches!(self, Self::Command | Self::Setpoint)
    }

    /// Short lowercase name used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SingleStatus => "single status",
            Self::DoubleStatus => "double status",
            Self::Measurement => "measurement",
            Self::Command => "command",
            Self::Setpoint => "setpoint",
        }
    }
}

impl std::fmt::Display for PointCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Address space of a point.
///
/// Monitoring and control points are keyed separately, so a command at
/// IOA 1 does not collide with a status point at IOA 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Monitoring direction (RTU to master)
    Monitoring,
    /// Control direction (master to RTU)
    Control,
}
