//! Caller-facing API
//!
//! The [`LocationCoordinator`] is the single entry point. Callers hand it
//! closures; every closure is invoked exactly once (or, for a stream, until
//! the stream ends) after the host has delivered the platform callbacks
//! through [`LocationCoordinator::process_events`].

pub mod types;
pub mod events;
pub mod ledger;
pub mod coordinator;

// Re-export commonly used API types
pub use types::{
    ErrorClass, ErrorCode, LocationError, LocationResult, PermissionStatus, ServiceStatus,
    StreamSink, Waiter,
};
pub use events::{PlatformEvent, RegistrationId, RequestToken};
pub use ledger::{PendingRequest, RequestLedger};
pub use coordinator::LocationCoordinator;
