//! Capability descriptor for optional platform fields

use crate::core::constants::api_level;
use serde::{Deserialize, Serialize};

/// Optional fields and behaviours the running platform supports.
///
/// Resolved once at startup and handed to the sample builder, so no other
/// code needs to know about platform versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityTier {
    pub vertical_accuracy: bool,
    pub heading_accuracy: bool,
    pub speed_accuracy: bool,
    pub elapsed_realtime: bool,
    pub elapsed_realtime_uncertainty: bool,
    pub mock_detection: bool,
    /// Auxiliary NMEA sentence feed is available
    pub nmea: bool,
}

impl CapabilityTier {
    pub fn from_api_level(level: u32) -> Self {
        Self {
            vertical_accuracy: level >= api_level::OREO,
            heading_accuracy: level >= api_level::OREO,
            speed_accuracy: level >= api_level::OREO,
            elapsed_realtime: level >= api_level::JELLY_BEAN_MR2,
            elapsed_realtime_uncertainty: level >= api_level::Q,
            mock_detection: level >= api_level::JELLY_BEAN_MR2,
            nmea: level >= api_level::NOUGAT,
        }
    }

    pub fn full() -> Self {
        Self {
            vertical_accuracy: true,
            heading_accuracy: true,
            speed_accuracy: true,
            elapsed_realtime: true,
            elapsed_realtime_uncertainty: true,
            mock_detection: true,
            nmea: true,
        }
    }

    pub fn minimal() -> Self {
        Self {
            vertical_accuracy: false,
            heading_accuracy: false,
            speed_accuracy: false,
            elapsed_realtime: false,
            elapsed_realtime_uncertainty: false,
            mock_detection: false,
            nmea: false,
        }
    }
}

impl Default for CapabilityTier {
    fn default() -> Self {
        Self::full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_level_thresholds() {
        let old = CapabilityTier::from_api_level(17);
        assert_eq!(old, CapabilityTier::minimal());

        let nougat = CapabilityTier::from_api_level(24);
        assert!(nougat.nmea);
        assert!(nougat.mock_detection);
        assert!(!nougat.vertical_accuracy);

        let oreo = CapabilityTier::from_api_level(26);
        assert!(oreo.speed_accuracy);
        assert!(!oreo.elapsed_realtime_uncertainty);

        assert_eq!(CapabilityTier::from_api_level(33), CapabilityTier::full());
    }
}
