//! Fix processing: NMEA altitude tracking and record building

pub mod nmea;
pub mod sample;

pub use nmea::NmeaAltitudeTracker;
pub use sample::build_position_record;
