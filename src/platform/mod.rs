//! Capability interfaces implemented by the embedding host
//!
//! The coordinator never talks to permission prompts, settings dialogs or
//! the positioning subsystem directly. It calls into these traits and hands
//! them callbacks; the callbacks only enqueue events for the coordinator to
//! process on its own timeline.

pub mod error;
pub mod permission;
pub mod service;
pub mod provider;
pub mod host;
pub mod mock;

pub use error::{PlatformError, PlatformResult, RecoveryStrategy};
pub use permission::PermissionGate;
pub use service::ServiceEnabler;
pub use provider::LocationProvider;
pub use host::HostContext;
pub use mock::{MockHost, MockLocationProvider, MockPermissionGate, MockServiceEnabler};

use crate::core::RawFix;

/// Invoked once with `true` when the user granted the permission
pub type PermissionCallback = Box<dyn FnOnce(bool) + Send>;

/// Invoked once with `true` when the user enabled the location service
pub type DialogCallback = Box<dyn FnOnce(bool) + Send>;

/// Invoked for every fix while a registration is alive
pub type FixCallback = Box<dyn FnMut(RawFix) + Send>;

/// Invoked for every sentence on the auxiliary NMEA feed
pub type SentenceCallback = Box<dyn FnMut(String) + Send>;
