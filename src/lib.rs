//! # voltage_iec104_station
//!
//! Supervisory layer for IEC 60870-5-104 stations.
//!
//! This crate sits on top of an IEC 104 protocol stack and provides the
//! station logic around it: a typed point catalog, t3 link supervision,
//! remote-control commands, and client/server runtimes driving them from
//! a fixed-period tick loop.
//!
//! ## Features
//!
//! - **Typed points**: Handles instead of string lookups, per-type value coercion
//! - **Link supervision**: Test frame after t3 of silence
//! - **Commands**: General/group interrogation, clock sync, verified commands
//! - **Runtimes**: Polling client, simulated server, cooperative shutdown
//! - **Pluggable transport**: Framing and TCP live behind the [`Transport`] trait
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use voltage_iec104_station::{ClientRuntime, MemoryTransport, StationConfig};
//!
//! #[tokio::main]
//! async fn main() -> voltage_iec104_station::Result<()> {
//!     let config = StationConfig::client().address("192.168.1.100:2404");
//!     let transport = Arc::new(MemoryTransport::new(config.address.clone()));
//!     let mut client = ClientRuntime::new(config, transport)?;
//!
//!     // Connect, sync the clock and request a general interrogation
//!     client.start().await?;
//!
//!     // Request interrogation group 3
//!     client.dispatcher().group_interrogation(3).await?;
//!
//!     client.run(CancellationToken::new()).await
//! }
//! ```
//!
//! ## Address Spaces
//!
//! Monitoring and control points are addressed independently. Address 0 is
//! reserved for the station-control point:
//!
//! ```text
//! monitoring: 1..=2 SPI | 200..=203 DPI | 1793..=1800 NVA
//! control:    0 station control | 1..=16 group interrogation
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod catalog;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod link;
pub mod server;
pub mod simulation;
pub mod transport;
pub mod types;

// Re-export main types
pub use catalog::{Point, PointCatalog, PointHandle, PointKey};
pub use client::{ClientRuntime, PollSnapshot, RuntimeState};
pub use config::StationConfig;
pub use dispatch::{CommandDispatcher, GroupTable};
pub use error::{Result, StationError};
pub use link::{LinkState, LinkStatus, LinkSupervisor};
pub use server::ServerRuntime;
pub use transport::{MemoryTransport, Transport};
pub use types::*;
