//! Core data types for fixes and position records

use serde::{Deserialize, Serialize};

/// A single raw reading as reported by the platform location provider.
///
/// Fields the platform cannot report on every version are optional; the
/// sample builder decides which of them reach the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius (meters)
    pub accuracy: f32,
    /// Altitude above the WGS84 ellipsoid (meters)
    pub altitude: f64,
    /// Ground speed (m/s)
    pub speed: f32,
    /// Bearing (degrees)
    pub bearing: f32,
    /// Wall-clock time of the fix (milliseconds since epoch)
    pub time_ms: i64,
    pub provider: String,
    pub vertical_accuracy: Option<f32>,
    pub bearing_accuracy: Option<f32>,
    pub speed_accuracy: Option<f32>,
    pub elapsed_realtime_nanos: Option<u64>,
    pub elapsed_realtime_uncertainty_nanos: Option<f64>,
    /// Satellite count taken from the fix extras, when present
    pub satellites: Option<u32>,
    pub from_mock_provider: bool,
}

impl RawFix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: 0.0,
            altitude: 0.0,
            speed: 0.0,
            bearing: 0.0,
            time_ms: 0,
            provider: "gps".to_string(),
            vertical_accuracy: None,
            bearing_accuracy: None,
            speed_accuracy: None,
            elapsed_realtime_nanos: None,
            elapsed_realtime_uncertainty_nanos: None,
            satellites: None,
            from_mock_provider: false,
        }
    }

    pub fn with_accuracy(mut self, accuracy: f32) -> Self {
        self.accuracy = accuracy;
        self
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = altitude;
        self
    }

    pub fn with_motion(mut self, speed: f32, bearing: f32) -> Self {
        self.speed = speed;
        self.bearing = bearing;
        self
    }

    pub fn with_time(mut self, time_ms: i64) -> Self {
        self.time_ms = time_ms;
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Attach the accuracy estimates newer platforms report
    pub fn with_accuracies(mut self, vertical: f32, bearing: f32, speed: f32) -> Self {
        self.vertical_accuracy = Some(vertical);
        self.bearing_accuracy = Some(bearing);
        self.speed_accuracy = Some(speed);
        self
    }

    pub fn with_elapsed_realtime(mut self, nanos: u64, uncertainty_nanos: Option<f64>) -> Self {
        self.elapsed_realtime_nanos = Some(nanos);
        self.elapsed_realtime_uncertainty_nanos = uncertainty_nanos;
        self
    }

    pub fn with_satellites(mut self, satellites: u32) -> Self {
        self.satellites = Some(satellites);
        self
    }

    pub fn from_mock(mut self) -> Self {
        self.from_mock_provider = true;
        self
    }
}

/// Normalized position delivered to callers.
///
/// Serializes to the map shape the transport layer forwards, with absent
/// optional fields omitted rather than zeroed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub vertical_accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub heading_accuracy: Option<f64>,
    pub altitude: f64,
    pub speed: f64,
    #[serde(rename = "speed_accuracy", skip_serializing_if = "Option::is_none", default)]
    pub speed_accuracy: Option<f64>,
    pub heading: f64,
    pub provider: String,
    /// Milliseconds since epoch
    pub time: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub elapsed_realtime_nanos: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub satellite_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub elapsed_realtime_uncertainty_nanos: Option<f64>,
    pub is_mock: bool,
}

impl PositionRecord {
    /// Serialize into the transport map shape
    pub fn to_json(&self) -> serde_json::Value {
        // Every field is a plain number, string or bool
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_fix_builder() {
        let fix = RawFix::new(48.1, 11.5)
            .with_accuracy(4.0)
            .with_altitude(520.0)
            .with_satellites(9)
            .from_mock();

        assert_eq!(fix.accuracy, 4.0);
        assert_eq!(fix.altitude, 520.0);
        assert_eq!(fix.satellites, Some(9));
        assert!(fix.from_mock_provider);
        assert!(fix.vertical_accuracy.is_none());
    }

    #[test]
    fn test_record_json_omits_absent_fields() {
        let record = PositionRecord {
            latitude: 1.0,
            longitude: 2.0,
            accuracy: 3.0,
            vertical_accuracy: None,
            heading_accuracy: None,
            altitude: 10.0,
            speed: 0.5,
            speed_accuracy: Some(0.1),
            heading: 90.0,
            provider: "gps".to_string(),
            time: 1_700_000_000_000,
            elapsed_realtime_nanos: None,
            satellite_number: Some(7),
            elapsed_realtime_uncertainty_nanos: None,
            is_mock: false,
        };

        let json = record.to_json();
        assert!(json.get("verticalAccuracy").is_none());
        assert_eq!(json["speed_accuracy"], 0.1);
        assert_eq!(json["satelliteNumber"], 7);
        assert_eq!(json["isMock"], false);
        assert_eq!(json["time"], 1_700_000_000_000i64);
    }
}
