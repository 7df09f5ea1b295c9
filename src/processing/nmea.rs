//! Mean-sea-level altitude tracking from the auxiliary NMEA feed
//!
//! Positioning fixes report altitude above the ellipsoid. GGA sentences
//! carry the altitude above mean sea level, which is what callers expect,
//! so the most recent one is kept and preferred when building records.

use crate::core::constants::{GGA_ALTITUDE_FIELD, GGA_SENTENCE_TYPE};

/// Holds the latest sea-level altitude seen on the sentence feed.
///
/// The value is only ever overwritten, never cleared, for the lifetime of
/// the tracker.
#[derive(Debug, Clone, Default)]
pub struct NmeaAltitudeTracker {
    last_msl_altitude: Option<f64>,
}

impl NmeaAltitudeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn altitude(&self) -> Option<f64> {
        self.last_msl_altitude
    }

    /// Feed one sentence. Returns true when the tracked altitude changed.
    ///
    /// Anything that is not a GGA sentence with a parsable altitude field is
    /// ignored: the feed is lossy and a bad sentence is not an error.
    pub fn consume(&mut self, sentence: &str) -> bool {
        match parse_gga_altitude(sentence) {
            Some(altitude) => {
                self.last_msl_altitude = Some(altitude);
                true
            }
            None => false,
        }
    }
}

fn is_gga(sentence_type: &str) -> bool {
    // "$" + two-letter talker + "GGA", e.g. $GPGGA or $GNGGA
    let bytes = sentence_type.as_bytes();
    bytes.len() >= 6
        && bytes[1..3].iter().all(u8::is_ascii_alphabetic)
        && bytes[3..].starts_with(GGA_SENTENCE_TYPE.as_bytes())
}

fn parse_gga_altitude(sentence: &str) -> Option<f64> {
    if !sentence.starts_with('$') {
        return None;
    }

    let mut fields = sentence.trim_end().split(',');
    if !is_gga(fields.next()?) {
        return None;
    }

    let altitude = fields.nth(GGA_ALTITUDE_FIELD - 1)?;
    if altitude.is_empty() {
        return None;
    }
    altitude.parse::<f64>().ok().filter(|value| value.is_finite())
}
