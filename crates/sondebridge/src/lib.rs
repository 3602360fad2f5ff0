//! `sondebridge` - Horus radiosonde telemetry to SBS BaseStation bridge
//!
//! This library receives Horus UDP payload summaries, assigns every radiosonde
//! a persistent synthetic Mode-S identifier, derives a smoothed climb rate and
//! writes BaseStation `MSG,3` lines to a TCP consumer such as Virtual Radar
//! Server.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod bridge;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod entity;
pub mod error;
pub mod format;
pub mod identifier;
pub mod listener;
pub mod logging;
pub mod shutdown;
pub mod sink;
pub mod telemetry;

pub use bridge::{Bridge, BridgeStats, Outcome};
pub use config::Config;
pub use entity::{EntityState, EntityStore};
pub use error::{Error, Result};
pub use identifier::{Identifier, IdentifierCache, IdentifierRecord};
pub use logging::init_logging;
pub use shutdown::Shutdown;
pub use sink::{LineSink, TcpSink};
pub use telemetry::TelemetryRecord;
