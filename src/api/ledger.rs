//! Bookkeeping for callers waiting on asynchronous results
//!
//! The ledger is the only place that knows who is waiting for what. Each
//! request category has a single slot; a slot is filled when a request
//! starts its round trip and emptied exactly once, when the result or an
//! error is delivered. Late or duplicate callbacks find the slot empty and
//! do nothing.

use crate::api::events::RequestToken;
use crate::api::types::{LocationError, PermissionStatus, ServiceStatus, StreamSink, Waiter};
use crate::core::PositionRecord;
use crate::utils::config::LocationSettings;
use std::fmt;

/// Which round trip a ledger slot belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingRequest {
    AwaitingPermission,
    AwaitingServiceEnable,
    /// Enable dialog raised on behalf of a stream or one-shot request
    AwaitingServiceEnableForStream,
    AwaitingFix,
    ActiveSubscription,
}

impl fmt::Display for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PendingRequest::AwaitingPermission => "permission",
            PendingRequest::AwaitingServiceEnable => "service enable",
            PendingRequest::AwaitingServiceEnableForStream => "location service gate",
            PendingRequest::AwaitingFix => "one-shot location",
            PendingRequest::ActiveSubscription => "location stream",
        };
        f.write_str(name)
    }
}

/// A platform round trip keyed by its token, optionally with a caller
/// waiting for the outcome
pub struct RoundTrip<T> {
    pub token: RequestToken,
    pub waiter: Option<Waiter<T>>,
}

impl<T> RoundTrip<T> {
    pub fn new(token: RequestToken, waiter: Waiter<T>) -> Self {
        Self {
            token,
            waiter: Some(waiter),
        }
    }

    /// A round trip nobody outside the coordinator is waiting on
    pub fn unattended(token: RequestToken) -> Self {
        Self { token, waiter: None }
    }

    pub fn resolve(self, value: T) {
        if let Some(waiter) = self.waiter {
            waiter(Ok(value));
        }
    }

    pub fn fail(self, error: LocationError) {
        if let Some(waiter) = self.waiter {
            waiter(Err(error));
        }
    }
}

/// A single-occupancy slot for one request category
pub struct LedgerSlot<T> {
    category: PendingRequest,
    entry: Option<T>,
}

impl<T> LedgerSlot<T> {
    pub fn new(category: PendingRequest) -> Self {
        Self { category, entry: None }
    }

    pub fn category(&self) -> PendingRequest {
        self.category
    }

    pub fn is_pending(&self) -> bool {
        self.entry.is_some()
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.entry.as_mut()
    }

    /// Occupy the slot. If it is already occupied the entry is handed back
    /// untouched so its waiter can be told.
    pub fn set_pending(&mut self, entry: T) -> Result<(), T> {
        if self.entry.is_some() {
            return Err(entry);
        }
        self.entry = Some(entry);
        Ok(())
    }

    /// Empty the slot, returning whatever was pending
    pub fn take(&mut self) -> Option<T> {
        self.entry.take()
    }
}

impl<T> LedgerSlot<Waiter<T>> {
    /// Deliver `value` and clear the slot. False if nothing was pending.
    pub fn resolve(&mut self, value: T) -> bool {
        match self.entry.take() {
            Some(waiter) => {
                waiter(Ok(value));
                true
            }
            None => false,
        }
    }

    /// Deliver `error` and clear the slot. False if nothing was pending.
    pub fn fail(&mut self, error: LocationError) -> bool {
        match self.entry.take() {
            Some(waiter) => {
                waiter(Err(error));
                true
            }
            None => false,
        }
    }
}

impl<T> LedgerSlot<RoundTrip<T>> {
    pub fn token(&self) -> Option<RequestToken> {
        self.entry.as_ref().map(|trip| trip.token)
    }

    /// Clear the slot only if it is waiting on `token`
    pub fn take_matching(&mut self, token: RequestToken) -> Option<RoundTrip<T>> {
        if self.token() == Some(token) {
            self.entry.take()
        } else {
            None
        }
    }

    /// Deliver `value` to the round trip keyed by `token` and clear the
    /// slot. False for stale or unknown tokens.
    pub fn resolve(&mut self, token: RequestToken, value: T) -> bool {
        match self.take_matching(token) {
            Some(trip) => {
                trip.resolve(value);
                true
            }
            None => false,
        }
    }

    /// Fail whichever round trip is pending and clear the slot
    pub fn fail(&mut self, error: LocationError) -> bool {
        match self.entry.take() {
            Some(trip) => {
                trip.fail(error);
                true
            }
            None => false,
        }
    }
}

/// A live streaming session
pub struct ActiveSubscription {
    pub settings: LocationSettings,
    sink: StreamSink,
}

impl ActiveSubscription {
    pub fn new(settings: LocationSettings, sink: StreamSink) -> Self {
        Self { settings, sink }
    }

    pub fn emit(&mut self, record: PositionRecord) {
        (self.sink)(Ok(record));
    }

    /// Deliver a terminal error; the subscription is consumed
    pub fn fail(mut self, error: LocationError) {
        (self.sink)(Err(error));
    }
}

/// Every pending result slot the coordinator owns
pub struct RequestLedger {
    pub permission: LedgerSlot<RoundTrip<PermissionStatus>>,
    pub service_enable: LedgerSlot<RoundTrip<ServiceStatus>>,
    pub location_gate: LedgerSlot<RoundTrip<()>>,
    pub one_shot: LedgerSlot<Waiter<PositionRecord>>,
    pub subscription: Option<ActiveSubscription>,
}

impl RequestLedger {
    pub fn new() -> Self {
        Self {
            permission: LedgerSlot::new(PendingRequest::AwaitingPermission),
            service_enable: LedgerSlot::new(PendingRequest::AwaitingServiceEnable),
            location_gate: LedgerSlot::new(PendingRequest::AwaitingServiceEnableForStream),
            one_shot: LedgerSlot::new(PendingRequest::AwaitingFix),
            subscription: None,
        }
    }

    /// Categories with something in flight
    pub fn pending(&self) -> Vec<PendingRequest> {
        let mut pending = Vec::new();
        if self.permission.is_pending() {
            pending.push(PendingRequest::AwaitingPermission);
        }
        if self.service_enable.is_pending() {
            pending.push(PendingRequest::AwaitingServiceEnable);
        }
        if self.location_gate.is_pending() {
            pending.push(PendingRequest::AwaitingServiceEnableForStream);
        }
        if self.one_shot.is_pending() {
            pending.push(PendingRequest::AwaitingFix);
        }
        if self.subscription.is_some() {
            pending.push(PendingRequest::ActiveSubscription);
        }
        pending
    }

    pub fn is_idle(&self) -> bool {
        self.pending().is_empty()
    }

    /// Whether anyone would receive the next fix
    pub fn has_location_waiters(&self) -> bool {
        self.one_shot.is_pending() || self.subscription.is_some()
    }

    /// Fail the one-shot request and end the stream. Returns how many
    /// callers were told.
    pub fn fail_location_waiters(&mut self, error: LocationError) -> usize {
        let mut failed = 0;
        if self.one_shot.fail(error.clone()) {
            failed += 1;
        }
        if let Some(subscription) = self.subscription.take() {
            subscription.fail(error);
            failed += 1;
        }
        failed
    }

    /// Fail every slot, leaving the ledger idle
    pub fn fail_all(&mut self, error: LocationError) -> usize {
        let mut failed = 0;
        for done in [
            self.permission.fail(error.clone()),
            self.service_enable.fail(error.clone()),
            self.location_gate.fail(error.clone()),
        ] {
            if done {
                failed += 1;
            }
        }
        failed + self.fail_location_waiters(error)
    }
}

impl Default for RequestLedger {
    fn default() -> Self {
        Self::new()
    }
}
