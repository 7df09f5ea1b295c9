//! Common API types: statuses, error codes and caller callbacks

use crate::core::PositionRecord;
use crate::platform::PlatformError;
use crate::utils::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for caller-facing operations
pub type LocationResult<T> = Result<T, LocationError>;

/// Receives exactly one result for a request
pub type Waiter<T> = Box<dyn FnOnce(LocationResult<T>) + Send>;

/// Receives every record of a streaming subscription, then at most one error
pub type StreamSink = Box<dyn FnMut(LocationResult<PositionRecord>) + Send>;

/// Outcome of a permission request, with its transport value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionStatus {
    Denied = 0,
    Granted = 1,
    DeniedForever = 2,
}

impl PermissionStatus {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn is_granted(self) -> bool {
        self == PermissionStatus::Granted
    }

    /// The error location requests receive for this outcome
    pub fn error(self) -> Option<LocationError> {
        match self {
            PermissionStatus::Granted => None,
            PermissionStatus::Denied => Some(LocationError::permission_denied()),
            PermissionStatus::DeniedForever => Some(LocationError::permission_denied_forever()),
        }
    }
}

/// Outcome of a service-enable request, with its transport value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceStatus {
    Disabled = 0,
    Enabled = 1,
}

impl ServiceStatus {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<bool> for ServiceStatus {
    fn from(enabled: bool) -> Self {
        if enabled {
            ServiceStatus::Enabled
        } else {
            ServiceStatus::Disabled
        }
    }
}

/// Error codes surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    PermissionDenied,
    PermissionDeniedNeverAsk,
    MissingHostContext,
    ServiceStatusDisabled,
    ServiceStatusError,
    AlreadyPending,
    InvalidSettings,
}

/// Broad classes of failure and who can fix them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The caller must fix its request (attach a host, wait, fix settings)
    CallerPrecondition,
    /// The user has to grant the permission
    Permission,
    /// The location service is off or its state is unknown
    ServiceStatus,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::PermissionDeniedNeverAsk => "PERMISSION_DENIED_NEVER_ASK",
            ErrorCode::MissingHostContext => "MISSING_HOST_CONTEXT",
            ErrorCode::ServiceStatusDisabled => "SERVICE_STATUS_DISABLED",
            ErrorCode::ServiceStatusError => "SERVICE_STATUS_ERROR",
            ErrorCode::AlreadyPending => "ALREADY_PENDING",
            ErrorCode::InvalidSettings => "INVALID_SETTINGS",
        }
    }

    pub fn class(self) -> ErrorClass {
        match self {
            ErrorCode::MissingHostContext | ErrorCode::AlreadyPending | ErrorCode::InvalidSettings => {
                ErrorClass::CallerPrecondition
            }
            ErrorCode::PermissionDenied | ErrorCode::PermissionDeniedNeverAsk => ErrorClass::Permission,
            ErrorCode::ServiceStatusDisabled | ErrorCode::ServiceStatusError => ErrorClass::ServiceStatus,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error delivered to a waiting caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct LocationError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<serde_json::Value>,
}

impl LocationError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn permission_denied() -> Self {
        Self::new(ErrorCode::PermissionDenied, "Location permission denied")
    }

    pub fn permission_denied_forever() -> Self {
        Self::new(
            ErrorCode::PermissionDeniedNeverAsk,
            "Location permission denied forever - please open app settings",
        )
    }

    pub fn missing_host_context(operation: &str) -> Self {
        Self::new(
            ErrorCode::MissingHostContext,
            format!("{} needs an interactive host context, none is attached", operation),
        )
        .with_details(serde_json::json!({ "operation": operation }))
    }

    pub fn service_disabled() -> Self {
        Self::new(
            ErrorCode::ServiceStatusDisabled,
            "Failed to get location. Location services disabled",
        )
    }

    pub fn service_status_error(cause: Option<&PlatformError>) -> Self {
        let error = Self::new(
            ErrorCode::ServiceStatusError,
            "Location service status couldn't be determined",
        );
        match cause {
            Some(cause) => error.with_details(serde_json::json!({ "cause": cause.to_string() })),
            None => error,
        }
    }

    pub fn already_pending(category: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::AlreadyPending,
            format!("A {} request is already in flight", category),
        )
    }

    pub fn class(&self) -> ErrorClass {
        self.code.class()
    }
}

impl From<ConfigError> for LocationError {
    fn from(error: ConfigError) -> Self {
        LocationError::new(ErrorCode::InvalidSettings, error.to_string())
    }
}
