//! Platform defaults and protocol constants

/// Default interval between location updates (milliseconds)
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 5000;

/// Default fastest interval the provider may deliver at (milliseconds)
pub const DEFAULT_MIN_UPDATE_INTERVAL_MS: u64 = DEFAULT_UPDATE_INTERVAL_MS / 2;

/// Default minimum displacement between updates (meters)
pub const DEFAULT_DISTANCE_FILTER_M: f32 = 0.0;

/// Sentence type suffix for GPS fix data
pub const GGA_SENTENCE_TYPE: &str = "GGA";

/// Comma-separated index of the mean-sea-level altitude in a GGA sentence
pub const GGA_ALTITUDE_FIELD: usize = 9;

/// Platform API levels at which optional location fields appear
pub mod api_level {
    pub const JELLY_BEAN_MR2: u32 = 18;
    pub const NOUGAT: u32 = 24;
    pub const OREO: u32 = 26;
    pub const Q: u32 = 29;
}
