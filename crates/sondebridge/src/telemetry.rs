//! Inbound telemetry records.
//!
//! Horus ground stations broadcast JSON datagrams over UDP. Only payload
//! summaries carry a position; every other packet type is ignored.

use serde::{Deserialize, Serialize};

/// Value of the `type` field identifying payload summary packets.
pub const PAYLOAD_SUMMARY: &str = "PAYLOAD_SUMMARY";

/// A decoded position report for one radiosonde.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Callsign (serial) of the radiosonde.
    pub callsign: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in meters.
    pub altitude: f64,
    /// Ground speed in km/h.
    pub speed: f64,
    /// Heading in degrees.
    pub heading: f64,
}

/// Why a datagram did not yield a [`TelemetryRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Not JSON, or a payload summary missing required fields.
    Malformed(String),
    /// Valid JSON without a `type` field.
    Untyped,
    /// A packet type other than payload summary.
    OtherType(String),
    /// A payload summary with an empty callsign.
    EmptyCallsign,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(reason) => write!(f, "malformed packet: {reason}"),
            Self::Untyped => write!(f, "packet has no type"),
            Self::OtherType(kind) => write!(f, "ignored packet type {kind}"),
            Self::EmptyCallsign => write!(f, "payload summary without callsign"),
        }
    }
}

/// Parse a raw datagram into a telemetry record.
///
/// # Errors
///
/// Returns a [`Rejection`] describing why the packet was discarded. Rejections
/// are routine and never surfaced beyond debug logging.
pub fn parse_packet(datagram: &[u8]) -> std::result::Result<TelemetryRecord, Rejection> {
    let value: serde_json::Value =
        serde_json::from_slice(datagram).map_err(|e| Rejection::Malformed(e.to_string()))?;

    match value.get("type").and_then(serde_json::Value::as_str) {
        Some(PAYLOAD_SUMMARY) => {}
        Some(other) => return Err(Rejection::OtherType(other.to_string())),
        None => return Err(Rejection::Untyped),
    }

    let record: TelemetryRecord =
        serde_json::from_value(value).map_err(|e| Rejection::Malformed(e.to_string()))?;

    if record.callsign.trim().is_empty() {
        return Err(Rejection::EmptyCallsign);
    }

    Ok(record)
}
