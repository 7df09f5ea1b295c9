//! Location Coordinator
//!
//! Coordinates location permission, location-service enablement and
//! position delivery (one-shot and streaming) between callers and the
//! host platform's capability interfaces.

pub mod core;
pub mod platform;
pub mod processing;
pub mod utils;
pub mod api;

// Re-export commonly used types
pub use core::{CapabilityTier, PositionRecord, RawFix};
pub use platform::{
    HostContext, LocationProvider, PermissionGate, PlatformError, PlatformResult, ServiceEnabler,
};
pub use processing::{build_position_record, NmeaAltitudeTracker};
pub use utils::{ConfigError, CoordinatorConfig, LocationSettings, ServiceDialogText};
pub use api::{
    ErrorCode, LocationCoordinator, LocationError, LocationResult, PendingRequest, PermissionStatus,
    PlatformEvent, ServiceStatus,
};
