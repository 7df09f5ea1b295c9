//! Collaborator error types and recovery classification

use thiserror::Error;

/// Faults raised by host-implemented capability interfaces
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlatformError {
    /// The platform service could not be reached
    #[error("platform service unavailable: {service}")]
    Unavailable { service: String },
    /// The host refused to run the operation
    #[error("host rejected {operation}")]
    HostRejected { operation: String },
    /// The location provider failed to accept a registration
    #[error("location provider {provider} failed: {reason}")]
    ProviderFailure { provider: String, reason: String },
}

/// Result type for capability interface calls
pub type PlatformResult<T> = Result<T, PlatformError>;

/// How a caller may recover from a platform fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Transient fault, the same request may succeed later
    Retry,
    /// The user has to change something outside the app
    UserAction,
    /// Give up
    Fail,
}

impl PlatformError {
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            PlatformError::Unavailable { .. } => RecoveryStrategy::Retry,
            PlatformError::HostRejected { .. } => RecoveryStrategy::UserAction,
            PlatformError::ProviderFailure { .. } => RecoveryStrategy::Fail,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        !matches!(self.recovery_strategy(), RecoveryStrategy::Fail)
    }
}
