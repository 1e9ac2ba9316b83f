//! Point values and input coercion.
//!
//! `PointValue` is what the transport stores and transmits for a point.
//! `RawValue` is loosely typed operator input, coerced against the point's
//! `TypeId` before anything reaches the transport.

use super::TypeId;
use crate::error::{Result, StationError};

/// Double-point information value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoublePointValue {
    /// Intermediate state (00)
    Intermediate = 0,
    /// Determined OFF (01)
    Off = 1,
    /// Determined ON (10)
    On = 2,
    /// Indeterminate (11)
    Indeterminate = 3,
}

impl DoublePointValue {
    /// Parse from byte (lower 2 bits).
    pub fn from_u8(value: u8) -> Self {
        match value & 0x03 {
            0 => Self::Intermediate,
            1 => Self::Off,
            2 => Self::On,
            _ => Self::Indeterminate,
        }
    }

    /// Map a boolean onto the determined states.
    pub const fn from_bool(value: bool) -> Self {
        if value {
            Self::On
        } else {
            Self::Off
        }
    }
}

impl std::fmt::Display for DoublePointValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Intermediate => "INTERMEDIATE",
            Self::Off => "OFF",
            Self::On => "ON",
            Self::Indeterminate => "INDETERMINATE",
        };
        f.write_str(s)
    }
}

/// Value held by a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointValue {
    /// Single-point information or single command state
    Single(bool),

    /// Double-point information
    Double(DoublePointValue),

    /// Normalized value -1.0 to +1.0 (M_ME_NA_1)
    Normalized(f32),

    /// Short floating point (M_ME_NC_1, C_SE_NC_1)
    Float(f32),
}

impl PointValue {
    /// Convert to f64 if numeric.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Normalized(v) | Self::Float(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Convert to bool if boolean type.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Single(v) => Some(*v),
            Self::Double(DoublePointValue::On) => Some(true),
            Self::Double(DoublePointValue::Off) => Some(false),
            _ => None,
        }
    }

    /// Check if this value can be stored in a point of `type_id`.
    pub const fn matches(&self, type_id: TypeId) -> bool {
        matches!(
            (self, type_id),
            (Self::Single(_), TypeId::SinglePoint | TypeId::SingleCommand)
                | (Self::Double(_), TypeId::DoublePoint)
                | (Self::Normalized(_), TypeId::MeasuredNormalized)
                | (Self::Float(_), TypeId::MeasuredFloat | TypeId::SetpointFloat)
        )
    }
}

impl std::fmt::Display for PointValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::Normalized(v) => write!(f, "{:.4}", v),
            Self::Float(v) => write!(f, "{:.2}", v),
        }
    }
}

/// Untyped input for a point write.
///
/// Built from plain Rust values (`true`, `7`, `49.5`, `"on"`) and checked
/// against the target type by [`RawValue::coerce`].
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// Double-point state
    Double(DoublePointValue),
    /// Text, parsed as boolean-like or numeric on coercion
    Text(String),
}

impl RawValue {
    /// Coerce into a value for a point of `type_id`.
    ///
    /// Setpoints and measurements accept any numeric input as float.
    /// Status and command points accept boolean-like input only.
    pub fn coerce(self, type_id: TypeId, point: &str) -> Result<PointValue> {
        match type_id {
            TypeId::SinglePoint | TypeId::SingleCommand => {
                self.as_bool_like().map(PointValue::Single).ok_or_else(|| {
                    StationError::invalid_value(point, format!("{} is not boolean-like", self))
                })
            }
            TypeId::DoublePoint => match self {
                Self::Double(v) => Ok(PointValue::Double(v)),
                Self::Int(v @ 0..=3) => Ok(PointValue::Double(DoublePointValue::from_u8(v as u8))),
                other => other
                    .as_bool_like()
                    .map(|b| PointValue::Double(DoublePointValue::from_bool(b)))
                    .ok_or_else(|| {
                        StationError::invalid_value(
                            point,
                            format!("{} is not a double-point state", other),
                        )
                    }),
            },
            TypeId::MeasuredNormalized => {
                let v = self.as_numeric(point)?;
                if !(-1.0..=1.0).contains(&v) {
                    return Err(StationError::invalid_value(
                        point,
                        format!("{} is outside the normalized range [-1.0, 1.0]", v),
                    ));
                }
                Ok(PointValue::Normalized(v))
            }
            TypeId::MeasuredFloat | TypeId::SetpointFloat => {
                self.as_numeric(point).map(PointValue::Float)
            }
        }
    }

    fn as_bool_like(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(0) => Some(false),
            Self::Int(1) => Some(true),
            Self::Double(DoublePointValue::On) => Some(true),
            Self::Double(DoublePointValue::Off) => Some(false),
            Self::Text(s) => {
                if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("on") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("false") || s.eq_ignore_ascii_case("off") {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Numeric value narrowed to the wire width; must stay finite after narrowing.
    fn as_numeric(&self, point: &str) -> Result<f32> {
        let v = match self {
            Self::Int(v) => *v as f64,
            Self::Float(v) => *v,
            Self::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                StationError::invalid_value(point, format!("{:?} is not numeric", s))
            })?,
            other => {
                return Err(StationError::invalid_value(
                    point,
                    format!("{} is not numeric", other),
                ))
            }
        };
        let narrowed = v as f32;
        if !narrowed.is_finite() {
            return Err(StationError::invalid_value(
                point,
                format!("{} is not a finite 32-bit float", v),
            ));
        }
        Ok(narrowed)
    }
}

impl std::fmt::Display for RawValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for RawValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for RawValue {
    fn from(v: f32) -> Self {
        Self::Float(v as f64)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<DoublePointValue> for RawValue {
    fn from(v: DoublePointValue) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<PointValue> for RawValue {
    fn from(v: PointValue) -> Self {
        match v {
            PointValue::Single(b) => Self::Bool(b),
            PointValue::Double(d) => Self::Double(d),
            PointValue::Normalized(f) | PointValue::Float(f) => Self::Float(f as f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setpoint_integer_coerced_to_float() {
        let v = RawValue::from(7).coerce(TypeId::SetpointFloat, "setpoint").unwrap();
        assert_eq!(v, PointValue::Float(7.0));
    }

    #[test]
    fn test_setpoint_rejects_non_numeric() {
        let err = RawValue::from("warm")
            .coerce(TypeId::SetpointFloat, "setpoint")
            .unwrap_err();
        assert!(matches!(err, StationError::InvalidValue { .. }));

        let err = RawValue::from(true)
            .coerce(TypeId::SetpointFloat, "setpoint")
            .unwrap_err();
        assert!(matches!(err, StationError::InvalidValue { .. }));

        assert!(RawValue::from(f64::NAN)
            .coerce(TypeId::SetpointFloat, "setpoint")
            .is_err());
    }

    #[test]
    fn test_setpoint_rejects_values_beyond_f32() {
        for raw in [
            RawValue::from(1e300_f64),
            RawValue::from(-1e39_f64),
            RawValue::from("3.5e38"),
        ] {
            let err = raw
                .coerce(TypeId::SetpointFloat, "setpoint")
                .unwrap_err();
            assert!(matches!(err, StationError::InvalidValue { .. }));
        }

        let err = RawValue::from(1e300_f64)
            .coerce(TypeId::MeasuredFloat, "temp")
            .unwrap_err();
        assert!(matches!(err, StationError::InvalidValue { .. }));

        let v = RawValue::from(f32::MAX as f64)
            .coerce(TypeId::SetpointFloat, "setpoint")
            .unwrap();
        assert_eq!(v, PointValue::Float(f32::MAX));
    }

    #[test]
    fn test_numeric_text_is_parsed() {
        let v = RawValue::from(" 49.5 ")
            .coerce(TypeId::SetpointFloat, "setpoint")
            .unwrap();
        assert_eq!(v, PointValue::Float(49.5));
    }

    #[test]
    fn test_single_accepts_boolean_like() {
        for (raw, expected) in [
            (RawValue::from(true), true),
            (RawValue::from(0), false),
            (RawValue::from(1), true),
            (RawValue::from("ON"), true),
            (RawValue::from("false"), false),
        ] {
            let v = raw.coerce(TypeId::SingleCommand, "control").unwrap();
            assert_eq!(v, PointValue::Single(expected));
        }
    }

    #[test]
    fn test_single_rejects_other_input() {
        assert!(RawValue::from(2).coerce(TypeId::SinglePoint, "SPI_1").is_err());
        assert!(RawValue::from(0.5).coerce(TypeId::SinglePoint, "SPI_1").is_err());
        assert!(RawValue::from("maybe").coerce(TypeId::SinglePoint, "SPI_1").is_err());
    }

    #[test]
    fn test_double_point_coercion() {
        let v = RawValue::from(true).coerce(TypeId::DoublePoint, "DPI_200").unwrap();
        assert_eq!(v, PointValue::Double(DoublePointValue::On));

        let v = RawValue::from(3).coerce(TypeId::DoublePoint, "DPI_200").unwrap();
        assert_eq!(v, PointValue::Double(DoublePointValue::Indeterminate));

        let v = RawValue::from(DoublePointValue::Intermediate)
            .coerce(TypeId::DoublePoint, "DPI_200")
            .unwrap();
        assert_eq!(v, PointValue::Double(DoublePointValue::Intermediate));

        assert!(RawValue::from(4).coerce(TypeId::DoublePoint, "DPI_200").is_err());
    }

    #[test]
    fn test_normalized_range() {
        let v = RawValue::from(-0.25)
            .coerce(TypeId::MeasuredNormalized, "NVA_1793")
            .unwrap();
        assert_eq!(v, PointValue::Normalized(-0.25));

        assert!(RawValue::from(1.5)
            .coerce(TypeId::MeasuredNormalized, "NVA_1793")
            .is_err());
    }

    #[test]
    fn test_point_value_accessors() {
        assert_eq!(PointValue::Float(99.5).as_f64(), Some(99.5));
        assert_eq!(PointValue::Single(true).as_f64(), None);
        assert_eq!(PointValue::Single(true).as_bool(), Some(true));
        assert_eq!(PointValue::Double(DoublePointValue::Off).as_bool(), Some(false));
        assert_eq!(
            PointValue::Double(DoublePointValue::Indeterminate).as_bool(),
            None
        );
    }

    #[test]
    fn test_point_value_matches_type() {
        assert!(PointValue::Float(1.0).matches(TypeId::SetpointFloat));
        assert!(PointValue::Single(false).matches(TypeId::SingleCommand));
        assert!(!PointValue::Float(1.0).matches(TypeId::MeasuredNormalized));
        assert!(!PointValue::Single(true).matches(TypeId::DoublePoint));
    }

    #[test]
    fn test_double_point_from_u8() {
        assert_eq!(DoublePointValue::from_u8(0), DoublePointValue::Intermediate);
        assert_eq!(DoublePointValue::from_u8(1), DoublePointValue::Off);
        assert_eq!(DoublePointValue::from_u8(2), DoublePointValue::On);
        assert_eq!(DoublePointValue::from_u8(0xFF), DoublePointValue::Indeterminate);
    }
}
