//! Point type definitions.
//!
//! - `TypeId` - Type identification (M_SP_NA_1, etc.)
//! - `PointCategory` - Semantic grouping of points within a station
//! - `PointValue` - Value held by a point
//! - `RawValue` - Untyped input, coerced per `TypeId`
//! - `Cp56Time2a` - Clock synchronization timestamp

mod time;
mod type_id;
mod value;

pub use time::*;
pub use type_id::*;
pub use value::*;
