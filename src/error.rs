//! Error types for station supervision.

use thiserror::Error;

use crate::types::{PointCategory, TypeId};

/// Result type alias for station operations.
pub type Result<T> = std::result::Result<T, StationError>;

/// Station supervision error types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StationError {
    /// Address already registered (or reserved) within the station
    #[error("Duplicate address {address} on station {station}")]
    DuplicateAddress { station: u16, address: u32 },

    /// Point name already registered within the station
    #[error("Duplicate point name {0:?}")]
    DuplicateName(String),

    /// Type not valid for the requested category
    #[error("Type {type_id} is not valid for category {category}")]
    InvalidType {
        category: PointCategory,
        type_id: TypeId,
    },

    /// No point registered under the given key
    #[error("Unknown point: {0}")]
    UnknownPoint(String),

    /// Value cannot be coerced to the point's type
    #[error("Invalid value for {point}: {reason}")]
    InvalidValue { point: String, reason: String },

    /// Interrogation group outside 1..=16
    #[error("Invalid interrogation group {0} (expected 1-16)")]
    InvalidGroup(u8),

    /// Failure reported by the transport
    #[error("Transport error: {0}")]
    Transport(String),

    /// Operation requires an established connection
    #[error("Not connected")]
    NotConnected,
}

impl StationError {
    /// Create a transport error with a message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an invalid value error.
    pub fn invalid_value(point: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            point: point.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error invalidates the station configuration.
    ///
    /// Raised while declaring the catalog at startup, these abort the runtime.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DuplicateAddress { .. } | Self::DuplicateName(_) | Self::InvalidType { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StationError::NotConnected;
        assert_eq!(err.to_string(), "Not connected");

        let err = StationError::InvalidGroup(17);
        assert_eq!(err.to_string(), "Invalid interrogation group 17 (expected 1-16)");

        let err = StationError::DuplicateAddress {
            station: 1,
            address: 200,
        };
        assert_eq!(err.to_string(), "Duplicate address 200 on station 1");

        let err = StationError::InvalidType {
            category: PointCategory::Setpoint,
            type_id: TypeId::SinglePoint,
        };
        assert_eq!(
            err.to_string(),
            "Type M_SP_NA_1 is not valid for category setpoint"
        );
    }

    #[test]
    fn test_is_fatal() {
        assert!(StationError::DuplicateAddress {
            station: 1,
            address: 0
        }
        .is_fatal());
        assert!(StationError::InvalidType {
            category: PointCategory::Command,
            type_id: TypeId::MeasuredFloat,
        }
        .is_fatal());
        assert!(StationError::DuplicateName("temp".into()).is_fatal());
        assert!(!StationError::UnknownPoint("SPI_9".into()).is_fatal());
        assert!(!StationError::transport("closed").is_fatal());
        assert!(!StationError::NotConnected.is_fatal());
        assert!(!StationError::InvalidGroup(0).is_fatal());
        assert!(!StationError::invalid_value("setpoint", "not numeric").is_fatal());
    }
}
