//! Platform callback events and the tokens that key them

use crate::core::RawFix;

/// Identifies one permission prompt or enable-service dialog round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u32);

impl RequestToken {
    pub(crate) fn new(id: u32) -> Self {
        RequestToken(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

/// Identifies one provider registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(u32);

impl RegistrationId {
    pub(crate) fn new(id: u32) -> Self {
        RegistrationId(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

/// A platform callback, queued for the coordinator to process in order
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    /// The permission prompt was answered
    PermissionResult { token: RequestToken, granted: bool },
    /// An enable-service dialog was closed
    ServiceDialogClosed { token: RequestToken, enabled: bool },
    /// The provider reported a fix
    LocationFix { registration: RegistrationId, fix: RawFix },
    /// A sentence arrived on the auxiliary NMEA feed
    NmeaSentence { sentence: String },
}
