//! SBS BaseStation message formatting.
//!
//! Each telemetry record becomes one `MSG,3` (airborne position) line:
//!
//! ```text
//! MSG,3,,,<id>,,<date>,<time>,<date>,<time>,<callsign>,<alt_ft>,<speed_kn>,<heading>,<lat>,<lon>,<vrate>,,,,,
//! ```
//!
//! Generated and logged date/time pairs are both the processing time.

use chrono::NaiveDateTime;

use crate::error::{Error, Result};
use crate::identifier::Identifier;

/// Feet per meter, as used by the Horus to BaseStation bridge.
pub const FEET_PER_METER: f64 = 3.281;

/// Kilometers per hour in one knot.
pub const KPH_PER_KNOT: f64 = 1.852;

const DATE_FORMAT: &str = "%Y/%m/%d";
const TIME_FORMAT: &str = "%H:%M:%S.000";

/// Convert meters to whole feet, truncating toward zero.
///
/// # Errors
///
/// Returns a formatting error if the input is not finite or the result does
/// not fit an `i64`.
#[allow(clippy::cast_possible_truncation)]
pub fn meters_to_feet(meters: f64) -> Result<i64> {
    let feet = finite("altitude", meters)? * FEET_PER_METER;
    truncate("altitude", feet)
}

/// Convert km/h to knots.
///
/// # Errors
///
/// Returns a formatting error if the input is not finite.
pub fn kph_to_knots(kph: f64) -> Result<f64> {
    Ok(finite("speed", kph)? / KPH_PER_KNOT)
}

/// Render a climb rate as whole units per minute, truncating toward zero.
///
/// # Errors
///
/// Returns a formatting error if the rate is not finite or out of range.
pub fn climb_rate_to_int(rate: f64) -> Result<i64> {
    truncate("vertical_rate", finite("vertical_rate", rate)?)
}

/// One BaseStation position message before rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionMessage<'a> {
    /// Synthetic aircraft identifier.
    pub identifier: &'a Identifier,
    /// Radiosonde callsign.
    pub callsign: &'a str,
    /// Processing time.
    pub timestamp: NaiveDateTime,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in feet.
    pub altitude_ft: i64,
    /// Ground speed in knots.
    pub speed_kn: f64,
    /// Heading in degrees.
    pub heading: f64,
    /// Smoothed vertical rate in feet per minute, if known.
    pub climb_rate: Option<f64>,
}

impl PositionMessage<'_> {
    /// Render the message as one line, without the trailing newline.
    ///
    /// # Errors
    ///
    /// Returns a formatting error for non-finite coordinates, speed, heading
    /// or climb rate.
    pub fn to_line(&self) -> Result<String> {
        let date = self.timestamp.format(DATE_FORMAT);
        let time = self.timestamp.format(TIME_FORMAT);

        let latitude = finite("latitude", self.latitude)?;
        let longitude = finite("longitude", self.longitude)?;
        let speed = finite("speed", self.speed_kn)?;
        let heading = finite("heading", self.heading)?;
        let climb = match self.climb_rate {
            Some(rate) => climb_rate_to_int(rate)?.to_string(),
            None => String::new(),
        };

        Ok(format!(
            "MSG,3,,,{id},,{date},{time},{date},{time},{callsign},{alt},{speed},{heading},{latitude},{longitude},{climb},,,,,",
            id = self.identifier,
            callsign = self.callsign,
            alt = self.altitude_ft,
            speed = decimal(speed),
            latitude = decimal(latitude),
            longitude = decimal(longitude),
        ))
    }
}

/// Shortest representation that round-trips, always with a fractional part.
fn decimal(value: f64) -> String {
    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

fn finite(field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::format(field, format!("{value} is not a finite number")))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn truncate(field: &'static str, value: f64) -> Result<i64> {
    let value = value.trunc();
    if value < i64::MIN as f64 || value >= i64::MAX as f64 {
        return Err(Error::format(field, format!("{value} is out of range")));
    }
    Ok(value as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap()
    }

    fn message(identifier: &Identifier) -> PositionMessage<'_> {
        PositionMessage {
            identifier,
            callsign: "SONDE1",
            timestamp: timestamp(),
            latitude: 10.0,
            longitude: 20.0,
            altitude_ft: 3281,
            speed_kn: 10.0,
            heading: 90.0,
            climb_rate: None,
        }
    }

    #[test]
    fn test_meters_to_feet_truncates() {
        assert_eq!(meters_to_feet(1000.0).unwrap(), 3281);
        assert_eq!(meters_to_feet(0.5).unwrap(), 1);
        assert_eq!(meters_to_feet(0.3).unwrap(), 0);
        assert_eq!(meters_to_feet(-10.0).unwrap(), -32);
    }

    #[test]
    fn test_meters_to_feet_rejects_non_finite() {
        assert!(meters_to_feet(f64::NAN).is_err());
        assert!(meters_to_feet(f64::INFINITY).is_err());
        assert!(meters_to_feet(f64::MAX).is_err());
    }

    #[test]
    fn test_kph_to_knots() {
        assert!((kph_to_knots(18.52).unwrap() - 10.0).abs() < 1e-9);
        assert!((kph_to_knots(0.0).unwrap()).abs() < f64::EPSILON);
        assert!(kph_to_knots(f64::NAN).is_err());
    }

    #[test]
    fn test_climb_rate_to_int() {
        assert_eq!(climb_rate_to_int(1234.9).unwrap(), 1234);
        assert_eq!(climb_rate_to_int(-56.7).unwrap(), -56);
        assert!(climb_rate_to_int(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_line_without_climb_rate() {
        let id = Identifier::from("BD0000");
        let line = message(&id).to_line().unwrap();
        assert_eq!(
            line,
            "MSG,3,,,BD0000,,2024/05/01,07:08:09.000,2024/05/01,07:08:09.000,SONDE1,3281,10.0,90,10.0,20.0,,,,,,"
        );
    }

    #[test]
    fn test_line_with_climb_rate() {
        let id = Identifier::from("BD0007");
        let mut msg = message(&id);
        msg.climb_rate = Some(984.3);
        msg.heading = 271.5;
        msg.latitude = -34.123456;

        let line = msg.to_line().unwrap();
        let fields: Vec<_> = line.split(',').collect();
        assert_eq!(fields.len(), 22);
        assert_eq!(fields[4], "BD0007");
        assert_eq!(fields[13], "271.5");
        assert_eq!(fields[14], "-34.123456");
        assert_eq!(fields[16], "984");
    }

    #[test]
    fn test_line_field_positions() {
        let id = Identifier::from("BD0000");
        let line = message(&id).to_line().unwrap();
        let fields: Vec<_> = line.split(',').collect();

        assert_eq!(fields.len(), 22);
        assert_eq!(fields[0], "MSG");
        assert_eq!(fields[1], "3");
        assert_eq!(fields[6], fields[8]);
        assert_eq!(fields[7], fields[9]);
        assert_eq!(fields[10], "SONDE1");
        assert_eq!(fields[11], "3281");
        assert_eq!(fields[12], "10.0");
        assert_eq!(fields[16], "");
    }

    #[test]
    fn test_line_keeps_full_precision() {
        let id = Identifier::from("BD0000");
        let mut msg = message(&id);
        msg.latitude = -34.948_712_3;
        msg.longitude = 138.520_345_67;
        msg.speed_kn = kph_to_knots(40.1).unwrap();

        let line = msg.to_line().unwrap();
        let fields: Vec<_> = line.split(',').collect();
        assert_eq!(fields[14], "-34.9487123");
        assert_eq!(fields[15], "138.52034567");
        assert_eq!(
            fields[12].parse::<f64>().unwrap().to_bits(),
            (40.1 / KPH_PER_KNOT).to_bits()
        );
        assert!(fields[12].len() > 4);
    }

    #[test]
    fn test_decimal_rendering() {
        assert_eq!(decimal(10.0), "10.0");
        assert_eq!(decimal(-3.0), "-3.0");
        assert_eq!(decimal(18.52), "18.52");
        assert_eq!(decimal(0.000_001), "0.000001");
    }

    #[test]
    fn test_line_rejects_nan_latitude() {
        let id = Identifier::from("BD0000");
        let mut msg = message(&id);
        msg.latitude = f64::NAN;

        let err = msg.to_line().unwrap_err();
        assert!(err.is_format_error());
        assert!(err.to_string().contains("latitude"));
    }

    #[test]
    fn test_line_rejects_infinite_climb_rate() {
        let id = Identifier::from("BD0000");
        let mut msg = message(&id);
        msg.climb_rate = Some(f64::INFINITY);
        assert!(msg.to_line().is_err());
    }
}
