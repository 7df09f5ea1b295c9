//! Raw fix to position record conversion

use crate::core::{CapabilityTier, PositionRecord, RawFix};

/// Build the record delivered to callers from a raw fix.
///
/// The NMEA sea-level altitude replaces the raw altitude only when the tier
/// has an NMEA feed. Tier-gated fields are left out when unsupported; the
/// mock flag alone falls back to `false`.
pub fn build_position_record(
    fix: &RawFix,
    msl_altitude: Option<f64>,
    tier: &CapabilityTier,
) -> PositionRecord {
    let altitude = match msl_altitude {
        Some(altitude) if tier.nmea => altitude,
        _ => fix.altitude,
    };

    PositionRecord {
        latitude: fix.latitude,
        longitude: fix.longitude,
        accuracy: fix.accuracy as f64,
        vertical_accuracy: fix.vertical_accuracy.filter(|_| tier.vertical_accuracy).map(f64::from),
        heading_accuracy: fix.bearing_accuracy.filter(|_| tier.heading_accuracy).map(f64::from),
        altitude,
        speed: fix.speed as f64,
        speed_accuracy: fix.speed_accuracy.filter(|_| tier.speed_accuracy).map(f64::from),
        heading: fix.bearing as f64,
        provider: fix.provider.clone(),
        time: fix.time_ms,
        elapsed_realtime_nanos: fix.elapsed_realtime_nanos.filter(|_| tier.elapsed_realtime),
        satellite_number: fix.satellites,
        elapsed_realtime_uncertainty_nanos: fix
            .elapsed_realtime_uncertainty_nanos
            .filter(|_| tier.elapsed_realtime_uncertainty),
        is_mock: tier.mock_detection && fix.from_mock_provider,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detailed_fix() -> RawFix {
        RawFix::new(52.52, 13.405)
            .with_accuracy(3.5)
            .with_altitude(80.0)
            .with_motion(1.5, 270.0)
            .with_time(1_700_000_000_000)
            .with_accuracies(2.0, 10.0, 0.5)
            .with_elapsed_realtime(42_000_000, Some(1000.0))
            .with_satellites(11)
            .from_mock()
    }

    #[test]
    fn test_full_tier_keeps_everything() {
        let record = build_position_record(&detailed_fix(), None, &CapabilityTier::full());

        assert_eq!(record.latitude, 52.52);
        assert_eq!(record.accuracy, 3.5);
        assert_eq!(record.vertical_accuracy, Some(2.0));
        assert_eq!(record.heading_accuracy, Some(10.0));
        assert_eq!(record.speed_accuracy, Some(0.5));
        assert_eq!(record.elapsed_realtime_nanos, Some(42_000_000));
        assert_eq!(record.elapsed_realtime_uncertainty_nanos, Some(1000.0));
        assert_eq!(record.satellite_number, Some(11));
        assert_eq!(record.heading, 270.0);
        assert!(record.is_mock);
        assert_eq!(record.altitude, 80.0);
    }

    #[test]
    fn test_minimal_tier_omits_optional_fields() {
        let record = build_position_record(&detailed_fix(), Some(45.0), &CapabilityTier::minimal());

        assert_eq!(record.vertical_accuracy, None);
        assert_eq!(record.heading_accuracy, None);
        assert_eq!(record.speed_accuracy, None);
        assert_eq!(record.elapsed_realtime_nanos, None);
        assert_eq!(record.elapsed_realtime_uncertainty_nanos, None);
        assert!(!record.is_mock);
        // No NMEA feed on this tier, so the raw altitude wins
        assert_eq!(record.altitude, 80.0);
    }

    #[test]
    fn test_nmea_altitude_preferred() {
        let record = build_position_record(&detailed_fix(), Some(45.0), &CapabilityTier::full());
        assert_eq!(record.altitude, 45.0);
    }

    #[test]
    fn test_absent_raw_fields_stay_absent() {
        let fix = RawFix::new(0.0, 0.0);
        let record = build_position_record(&fix, None, &CapabilityTier::full());
        assert_eq!(record.vertical_accuracy, None);
        assert_eq!(record.satellite_number, None);
        assert!(!record.is_mock);
    }
}
