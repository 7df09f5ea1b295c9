//! Location request coordinator
//!
//! Mediates between caller intents (permission, service enable, one-shot
//! and streaming location) and the host's capability interfaces. Platform
//! callbacks arrive as [`PlatformEvent`]s on an internal queue; the host
//! drives [`LocationCoordinator::process_events`] from its callback loop so
//! every callback is handled on one sequential timeline.

use crate::api::events::{PlatformEvent, RegistrationId, RequestToken};
use crate::api::ledger::{ActiveSubscription, PendingRequest, RequestLedger, RoundTrip};
use crate::api::types::{
    LocationError, LocationResult, PermissionStatus, ServiceStatus, StreamSink, Waiter,
};
use crate::core::{PositionRecord, RawFix};
use crate::platform::{
    DialogCallback, FixCallback, HostContext, LocationProvider, PermissionCallback,
    PermissionGate, SentenceCallback, ServiceEnabler,
};
use crate::processing::{build_position_record, NmeaAltitudeTracker};
use crate::utils::config::{CoordinatorConfig, LocationSettings};
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info, warn};

/// Coordination state machine for one location session
pub struct LocationCoordinator {
    /// Permission prompt
    permissions: Box<dyn PermissionGate>,
    /// Location service switch and enable dialog
    service: Box<dyn ServiceEnabler>,
    /// Positioning subsystem
    provider: Box<dyn LocationProvider>,
    /// Interactive host, when one is attached
    host: Option<Box<dyn HostContext>>,
    config: CoordinatorConfig,
    /// Settings for the current or next provider registration
    settings: LocationSettings,
    ledger: RequestLedger,
    altitude: NmeaAltitudeTracker,
    /// The live provider registration; only this struct registers
    registration: Option<RegistrationId>,
    auxiliary_feed: bool,
    events_tx: Sender<PlatformEvent>,
    events_rx: Receiver<PlatformEvent>,
    /// Token counter shared by round trips and registrations
    token_counter: u32,
}

impl LocationCoordinator {
    /// Create a coordinator with no host attached
    pub fn new(
        config: CoordinatorConfig,
        permissions: Box<dyn PermissionGate>,
        service: Box<dyn ServiceEnabler>,
        provider: Box<dyn LocationProvider>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            permissions,
            service,
            provider,
            host: None,
            settings: config.settings.clone(),
            config,
            ledger: RequestLedger::new(),
            altitude: NmeaAltitudeTracker::new(),
            registration: None,
            auxiliary_feed: false,
            events_tx,
            events_rx,
            token_counter: 0,
        }
    }

    pub fn attach_host(&mut self, host: Box<dyn HostContext>) {
        self.host = Some(host);
        debug!("host context attached");
    }

    /// Drop the host. Provider registrations are torn down and every
    /// pending caller is failed with `MISSING_HOST_CONTEXT`.
    pub fn detach_host(&mut self) {
        self.host = None;
        self.deregister();
        let failed = self
            .ledger
            .fail_all(LocationError::missing_host_context("host detached"));
        info!(failed, "host context detached");
    }

    pub fn ledger(&self) -> &RequestLedger {
        &self.ledger
    }

    pub fn settings(&self) -> &LocationSettings {
        &self.settings
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Latest sea-level altitude seen on the NMEA feed
    pub fn tracked_altitude(&self) -> Option<f64> {
        self.altitude.altitude()
    }

    pub fn is_registered(&self) -> bool {
        self.registration.is_some()
    }

    /// Sender for hosts that deliver platform callbacks themselves
    pub fn event_sender(&self) -> Sender<PlatformEvent> {
        self.events_tx.clone()
    }

    // Caller operations

    pub fn check_permission(&self) -> bool {
        self.permissions.check()
    }

    pub fn request_permission<F>(&mut self, on_result: F)
    where
        F: FnOnce(LocationResult<PermissionStatus>) + Send + 'static,
    {
        let waiter: Waiter<PermissionStatus> = Box::new(on_result);

        if !self.host_bound() {
            waiter(Err(LocationError::missing_host_context("requestPermission")));
            return;
        }
        if self.permissions.check() {
            waiter(Ok(PermissionStatus::Granted));
            return;
        }

        if let Some(trip) = self.ledger.permission.get_mut() {
            if trip.waiter.is_some() {
                waiter(Err(LocationError::already_pending(PendingRequest::AwaitingPermission)));
                return;
            }
            // A location request already raised the prompt; ride along
            debug!(token = trip.token.id(), "joining in-flight permission prompt");
            trip.waiter = Some(waiter);
            return;
        }
        self.prompt_permission(Some(waiter));
    }

    pub fn check_service_enabled(&self) -> LocationResult<bool> {
        self.service
            .is_enabled()
            .map_err(|e| LocationError::service_status_error(Some(&e)))
    }

    pub fn request_service_enable<F>(&mut self, on_result: F)
    where
        F: FnOnce(LocationResult<ServiceStatus>) + Send + 'static,
    {
        let waiter: Waiter<ServiceStatus> = Box::new(on_result);

        match self.service.is_enabled() {
            Ok(true) => {
                waiter(Ok(ServiceStatus::Enabled));
                return;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "location service status check failed");
                waiter(Err(LocationError::service_status_error(Some(&e))));
                return;
            }
        }

        if !self.host_bound() {
            waiter(Err(LocationError::missing_host_context("requestService")));
            return;
        }

        let token = self.next_token();
        if let Err(rejected) = self.ledger.service_enable.set_pending(RoundTrip::new(token, waiter)) {
            rejected.fail(LocationError::already_pending(PendingRequest::AwaitingServiceEnable));
            return;
        }
        self.present_enable_dialog(token);
    }

    /// Request a single position. Reuses a running stream's registration;
    /// `settings` only apply when nothing is registered yet.
    pub fn get_location<F>(&mut self, settings: Option<LocationSettings>, on_result: F)
    where
        F: FnOnce(LocationResult<PositionRecord>) + Send + 'static,
    {
        let waiter: Waiter<PositionRecord> = Box::new(on_result);

        if let Some(Err(e)) = settings.as_ref().map(LocationSettings::validate) {
            waiter(Err(e.into()));
            return;
        }
        if !self.host_bound() {
            waiter(Err(LocationError::missing_host_context("getLocation")));
            return;
        }
        if let Err(rejected) = self.ledger.one_shot.set_pending(waiter) {
            rejected(Err(LocationError::already_pending(PendingRequest::AwaitingFix)));
            return;
        }

        if self.registration.is_some() {
            debug!("one-shot request served by existing registration");
            return;
        }
        if let Some(settings) = settings {
            if self.ledger.subscription.is_none() {
                self.settings = settings;
            }
        }
        self.ensure_location_updates();
    }

    /// Start a streaming subscription. Only one may be active at a time.
    pub fn start_location_stream<F>(&mut self, settings: Option<LocationSettings>, sink: F)
    where
        F: FnMut(LocationResult<PositionRecord>) + Send + 'static,
    {
        let mut sink: StreamSink = Box::new(sink);
        let settings = settings.unwrap_or_else(|| self.settings.clone());

        if let Err(e) = settings.validate() {
            sink(Err(e.into()));
            return;
        }
        if !self.host_bound() {
            sink(Err(LocationError::missing_host_context("startLocationStream")));
            return;
        }
        if self.ledger.subscription.is_some() {
            sink(Err(LocationError::already_pending(PendingRequest::ActiveSubscription)));
            return;
        }

        let settings_changed = settings != self.settings;
        self.settings = settings.clone();
        self.ledger.subscription = Some(ActiveSubscription::new(settings, sink));

        if self.registration.is_some() {
            // Registered for a one-shot request; adopt the stream's settings
            if settings_changed {
                self.reregister();
            }
            return;
        }
        self.ensure_location_updates();
    }

    /// Replace the session settings. A live registration is torn down and
    /// recreated, so fixes still in flight under the old settings are dropped.
    pub fn change_settings(&mut self, settings: LocationSettings) -> LocationResult<()> {
        settings.validate()?;

        self.settings = settings.clone();
        if let Some(subscription) = self.ledger.subscription.as_mut() {
            subscription.settings = settings;
        }
        if self.registration.is_some() {
            self.reregister();
        }
        Ok(())
    }

    /// End the streaming subscription. A pending one-shot request keeps
    /// the registration alive until it is served.
    pub fn cancel_updates(&mut self) {
        if self.ledger.subscription.take().is_some() {
            debug!("location stream cancelled");
        }
        if self.ledger.one_shot.is_pending() {
            debug!("keeping registration for pending one-shot request");
            return;
        }
        self.deregister();
    }

    // Event processing

    /// Process every queued platform callback in delivery order. Call this
    /// from the host's callback loop.
    pub fn process_events(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.dispatch(event);
            processed += 1;
        }
        processed
    }

    pub fn dispatch(&mut self, event: PlatformEvent) {
        match event {
            PlatformEvent::PermissionResult { token, granted } => self.on_permission_result(token, granted),
            PlatformEvent::ServiceDialogClosed { token, enabled } => self.on_service_dialog_closed(token, enabled),
            PlatformEvent::LocationFix { registration, fix } => self.on_fix(registration, fix),
            PlatformEvent::NmeaSentence { sentence } => self.on_nmea_sentence(&sentence),
        }
    }

    fn on_permission_result(&mut self, token: RequestToken, granted: bool) {
        let Some(trip) = self.ledger.permission.take_matching(token) else {
            debug!(token = token.id(), "dropping stale permission result");
            return;
        };

        if granted {
            info!("location permission granted");
            if self.ledger.has_location_waiters() {
                self.start_requesting_location();
            }
            trip.resolve(PermissionStatus::Granted);
            return;
        }

        let forever = match self.permissions.should_show_rationale() {
            Ok(rationale) => !rationale,
            Err(e) => {
                warn!(error = %e, "rationale check failed, treating denial as permanent");
                true
            }
        };
        let status = if forever {
            PermissionStatus::DeniedForever
        } else {
            PermissionStatus::Denied
        };
        info!(?status, "location permission denied");

        if let Some(error) = status.error() {
            self.fail_location_waiters(error);
        }
        trip.resolve(status);
    }

    fn on_service_dialog_closed(&mut self, token: RequestToken, enabled: bool) {
        if self.ledger.service_enable.resolve(token, ServiceStatus::from(enabled)) {
            info!(enabled, "service enable request answered");
            return;
        }

        if self.ledger.location_gate.take_matching(token).is_some() {
            if !enabled {
                self.fail_location_waiters(LocationError::service_disabled());
            } else if self.ledger.has_location_waiters() {
                self.start_requesting_location();
            }
            return;
        }

        debug!(token = token.id(), "dropping stale service dialog result");
    }

    fn on_fix(&mut self, registration: RegistrationId, fix: RawFix) {
        if self.registration != Some(registration) {
            debug!(registration = registration.id(), "dropping fix from retired registration");
            return;
        }

        let record = build_position_record(&fix, self.altitude.altitude(), &self.config.capabilities);
        if let Some(subscription) = self.ledger.subscription.as_mut() {
            self.ledger.one_shot.resolve(record.clone());
            subscription.emit(record);
            return;
        }

        // No stream listening: serve the one-shot request and release the provider
        self.ledger.one_shot.resolve(record);
        self.deregister();
    }

    fn on_nmea_sentence(&mut self, sentence: &str) {
        if self.altitude.consume(sentence) {
            debug!(altitude = ?self.altitude.altitude(), "sea-level altitude updated");
        }
    }

    // Platform round trips

    fn ensure_location_updates(&mut self) {
        if self.permissions.check() {
            self.start_requesting_location();
            return;
        }
        if self.ledger.permission.is_pending() {
            debug!("waiting on in-flight permission prompt");
            return;
        }
        self.prompt_permission(None);
    }

    fn start_requesting_location(&mut self) {
        if !self.host_bound() {
            self.fail_location_waiters(LocationError::missing_host_context("requestLocation"));
            return;
        }

        match self.service.is_enabled() {
            Ok(true) => self.register(),
            Ok(false) => self.present_location_gate(),
            Err(e) => {
                warn!(error = %e, "location service status check failed");
                self.fail_location_waiters(LocationError::service_status_error(Some(&e)));
            }
        }
    }

    fn prompt_permission(&mut self, waiter: Option<Waiter<PermissionStatus>>) {
        let token = self.next_token();
        let trip = RoundTrip { token, waiter };
        if let Err(rejected) = self.ledger.permission.set_pending(trip) {
            rejected.fail(LocationError::already_pending(PendingRequest::AwaitingPermission));
            return;
        }

        let tx = self.events_tx.clone();
        let on_result: PermissionCallback = Box::new(move |granted| {
            let _ = tx.send(PlatformEvent::PermissionResult { token, granted });
        });
        debug!(token = token.id(), "showing permission prompt");
        self.permissions.request(on_result);
    }

    fn present_location_gate(&mut self) {
        let token = self.next_token();
        if self
            .ledger
            .location_gate
            .set_pending(RoundTrip::unattended(token))
            .is_err()
        {
            debug!("enable dialog for location request already showing");
            return;
        }
        self.present_enable_dialog(token);
    }

    fn present_enable_dialog(&mut self, token: RequestToken) {
        let tx = self.events_tx.clone();
        let on_result: DialogCallback = Box::new(move |enabled| {
            let _ = tx.send(PlatformEvent::ServiceDialogClosed { token, enabled });
        });
        debug!(token = token.id(), "showing enable-service dialog");
        self.service.present_enable_ui(&self.config.service_dialog, on_result);
    }

    // Provider registration

    fn register(&mut self) {
        if self.registration.is_some() {
            return;
        }

        let id = RegistrationId::new(self.next_id());
        let tx = self.events_tx.clone();
        let on_fix: FixCallback = Box::new(move |fix| {
            let _ = tx.send(PlatformEvent::LocationFix { registration: id, fix });
        });

        match self.provider.register(&self.settings, on_fix) {
            Ok(()) => {
                info!(
                    registration = id.id(),
                    interval_ms = self.settings.update_interval_ms,
                    distance_filter_m = self.settings.distance_filter_m,
                    "location updates registered"
                );
                self.registration = Some(id);
                self.start_auxiliary_feed();
            }
            Err(e) => {
                warn!(error = %e, "location provider rejected registration");
                self.fail_location_waiters(LocationError::service_status_error(Some(&e)));
            }
        }
    }

    fn start_auxiliary_feed(&mut self) {
        if !self.config.capabilities.nmea || self.auxiliary_feed {
            return;
        }

        let tx = self.events_tx.clone();
        let on_sentence: SentenceCallback = Box::new(move |sentence| {
            let _ = tx.send(PlatformEvent::NmeaSentence { sentence });
        });
        match self.provider.register_auxiliary_feed(on_sentence) {
            Ok(()) => self.auxiliary_feed = true,
            Err(e) => warn!(error = %e, "NMEA feed unavailable, using raw altitude"),
        }
    }

    fn reregister(&mut self) {
        self.deregister();
        self.register();
    }

    fn deregister(&mut self) {
        if let Some(id) = self.registration.take() {
            self.provider.unregister();
            info!(registration = id.id(), "location updates unregistered");
        }
        if self.auxiliary_feed {
            self.provider.unregister_auxiliary_feed();
            self.auxiliary_feed = false;
        }
    }

    /// Fail everyone waiting on a position, then release the provider
    fn fail_location_waiters(&mut self, error: LocationError) {
        let failed = self.ledger.fail_location_waiters(error);
        if failed > 0 {
            debug!(failed, "location request failed");
        }
        self.deregister();
    }

    fn host_bound(&self) -> bool {
        self.host.as_ref().is_some_and(|host| host.is_bound())
    }

    fn next_token(&mut self) -> RequestToken {
        RequestToken::new(self.next_id())
    }

    fn next_id(&mut self) -> u32 {
        self.token_counter += 1;
        self.token_counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::ErrorCode;
    use crate::core::CapabilityTier;
    use crate::platform::{MockHost, MockLocationProvider, MockPermissionGate, MockServiceEnabler};
    use std::sync::mpsc::Receiver;

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

    struct Harness {
        coordinator: LocationCoordinator,
        gate: MockPermissionGate,
        service: MockServiceEnabler,
        provider: MockLocationProvider,
        host: MockHost,
    }

    fn harness(granted: bool, enabled: bool) -> Harness {
        harness_with(CoordinatorConfig::default(), granted, enabled)
    }

    fn harness_with(config: CoordinatorConfig, granted: bool, enabled: bool) -> Harness {
        let gate = MockPermissionGate::new(granted);
        let service = MockServiceEnabler::new(enabled);
        let provider = MockLocationProvider::new();
        let host = MockHost::new(true);
        let mut coordinator = LocationCoordinator::new(
            config,
            Box::new(gate.clone()),
            Box::new(service.clone()),
            Box::new(provider.clone()),
        );
        coordinator.attach_host(Box::new(host.clone()));
        Harness {
            coordinator,
            gate,
            service,
            provider,
            host,
        }
    }

    fn collector<T: Send + 'static>() -> (impl FnMut(LocationResult<T>) + Send + 'static, Receiver<LocationResult<T>>) {
        let (tx, rx) = mpsc::channel();
        (
            move |result: LocationResult<T>| {
                let _ = tx.send(result);
            },
            rx,
        )
    }

    fn drain<T>(rx: &Receiver<LocationResult<T>>) -> Vec<LocationResult<T>> {
        rx.try_iter().collect()
    }

    fn fix(latitude: f64) -> RawFix {
        RawFix::new(latitude, 11.5).with_accuracy(5.0).with_altitude(600.0)
    }

    #[test]
    fn test_check_permission_is_pure_query() {
        let h = harness(false, true);
        assert!(!h.coordinator.check_permission());
        h.gate.set_granted(true);
        assert!(h.coordinator.check_permission());
        assert_eq!(h.gate.prompt_count(), 0);
    }

    #[test]
    fn test_request_permission_without_host() {
        let mut h = harness(false, true);
        h.host.set_bound(false);
        let (cb, rx) = collector();

        h.coordinator.request_permission(cb);

        let results = drain(&rx);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap_err().code, ErrorCode::MissingHostContext);
        assert_eq!(h.gate.prompt_count(), 0);
        assert!(h.coordinator.ledger().is_idle());
    }

    #[test]
    fn test_request_permission_already_granted() {
        let mut h = harness(true, true);
        let (cb, rx) = collector();

        h.coordinator.request_permission(cb);

        assert_eq!(drain(&rx), vec![Ok(PermissionStatus::Granted)]);
        assert_eq!(h.gate.prompt_count(), 0);
    }

    #[test]
    fn test_request_permission_granted_by_prompt() {
        let mut h = harness(false, true);
        let (cb, rx) = collector();

        h.coordinator.request_permission(cb);
        assert_eq!(h.gate.prompt_count(), 1);
        assert!(drain(&rx).is_empty());
        assert_eq!(h.coordinator.ledger().pending(), vec![PendingRequest::AwaitingPermission]);

        h.gate.answer(true);
        assert_eq!(h.coordinator.process_events(), 1);

        assert_eq!(drain(&rx), vec![Ok(PermissionStatus::Granted)]);
        assert!(h.coordinator.ledger().is_idle());
        // Nobody asked for a position
        assert!(!h.provider.is_registered());
    }

    #[test]
    fn test_denial_classification() {
        for (rationale, expected) in [
            (true, PermissionStatus::Denied),
            (false, PermissionStatus::DeniedForever),
        ] {
            let mut h = harness(false, true);
            h.gate.set_rationale(rationale);
            let (cb, rx) = collector();

            h.coordinator.request_permission(cb);
            h.gate.answer(false);
            h.coordinator.process_events();

            assert_eq!(drain(&rx), vec![Ok(expected)]);
        }
    }

    #[test]
    fn test_denial_resolved_when_rationale_check_fails() {
        let mut h = harness(false, true);
        h.gate.fail_rationale();
        let (cb, rx) = collector();
        let (loc_cb, loc_rx) = collector();

        h.coordinator.get_location(None, loc_cb);
        h.coordinator.request_permission(cb);
        h.gate.answer(false);
        h.coordinator.process_events();

        assert_eq!(drain(&rx), vec![Ok(PermissionStatus::DeniedForever)]);
        let location = drain(&loc_rx);
        assert_eq!(location[0].as_ref().unwrap_err().code, ErrorCode::PermissionDeniedNeverAsk);
        assert!(h.coordinator.ledger().is_idle());
    }

    #[test]
    fn test_second_permission_request_rejected_while_pending() {
        let mut h = harness(false, true);
        let (first, first_rx) = collector();
        let (second, second_rx) = collector();

        h.coordinator.request_permission(first);
        h.coordinator.request_permission(second);

        let rejected = drain(&second_rx);
        assert_eq!(rejected[0].as_ref().unwrap_err().code, ErrorCode::AlreadyPending);
        assert_eq!(h.gate.prompt_count(), 1);

        h.gate.answer(true);
        h.coordinator.process_events();
        assert_eq!(drain(&first_rx), vec![Ok(PermissionStatus::Granted)]);
    }

    #[test]
    fn test_duplicate_grant_resumes_once() {
        let mut h = harness(false, true);
        let (cb, rx) = collector();
        let (loc_cb, _loc_rx) = collector();

        h.coordinator.start_location_stream(None, loc_cb);
        h.coordinator.request_permission(cb);
        assert_eq!(h.gate.prompt_count(), 1);
        let token = h.coordinator.ledger().permission.token().unwrap();

        h.gate.answer(true);
        h.coordinator.process_events();
        h.coordinator.dispatch(PlatformEvent::PermissionResult { token, granted: true });

        assert_eq!(drain(&rx), vec![Ok(PermissionStatus::Granted)]);
        assert_eq!(h.provider.registration_count(), 1);
        assert_eq!(h.provider.overlapping_registrations(), 0);
    }

    #[test]
    fn test_get_location_chains_through_permission() {
        let mut h = harness(false, true);
        let (cb, rx) = collector();

        h.coordinator.get_location(None, cb);
        assert_eq!(h.gate.prompt_count(), 1);
        assert!(!h.provider.is_registered());

        h.gate.answer(true);
        h.coordinator.process_events();
        assert!(h.provider.is_registered());

        h.provider.emit_fix(fix(48.1));
        h.coordinator.process_events();

        let results = drain(&rx);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap().latitude, 48.1);
        // One-shot with no stream releases the provider right away
        assert!(!h.provider.is_registered());
        assert!(!h.coordinator.is_registered());
        assert!(h.coordinator.ledger().is_idle());
    }

    #[test]
    fn test_permission_denied_fails_location_requests() {
        let mut h = harness(false, true);
        let (one_shot, one_shot_rx) = collector();
        let (stream, stream_rx) = collector();

        h.coordinator.get_location(None, one_shot);
        h.coordinator.start_location_stream(None, stream);
        assert_eq!(h.gate.prompt_count(), 1);

        h.gate.answer(false);
        h.coordinator.process_events();

        assert_eq!(drain(&one_shot_rx)[0].as_ref().unwrap_err().code, ErrorCode::PermissionDenied);
        assert_eq!(drain(&stream_rx)[0].as_ref().unwrap_err().code, ErrorCode::PermissionDenied);
        assert!(h.coordinator.ledger().is_idle());
        assert!(!h.provider.is_registered());
    }

    #[test]
    fn test_one_shot_with_active_stream_keeps_registration() {
        let mut h = harness(true, true);
        let (stream, stream_rx) = collector();
        let (one_shot, one_shot_rx) = collector();

        h.coordinator.start_location_stream(None, stream);
        assert!(h.provider.is_registered());
        h.coordinator.get_location(None, one_shot);

        h.provider.emit_fix(fix(1.0));
        h.coordinator.process_events();

        assert_eq!(drain(&one_shot_rx).len(), 1);
        assert_eq!(drain(&stream_rx).len(), 1);
        assert!(h.provider.is_registered());
        assert_eq!(h.provider.registration_count(), 1);

        h.provider.emit_fix(fix(2.0));
        h.coordinator.process_events();
        assert!(drain(&one_shot_rx).is_empty());
        assert_eq!(drain(&stream_rx)[0].as_ref().unwrap().latitude, 2.0);
    }

    #[test]
    fn test_stream_delivers_until_cancelled() {
        let mut h = harness(true, true);
        let (stream, rx) = collector();

        h.coordinator.start_location_stream(Some(LocationSettings::with_interval(1000)), stream);
        assert_eq!(h.provider.active_settings().unwrap().update_interval_ms, 1000);

        for i in 0..3 {
            h.provider.emit_fix(fix(i as f64));
        }
        assert_eq!(h.coordinator.process_events(), 3);
        assert_eq!(drain(&rx).len(), 3);

        h.coordinator.cancel_updates();
        assert!(!h.provider.is_registered());
        assert!(h.coordinator.ledger().subscription.is_none());
        assert!(!h.provider.emit_fix(fix(9.0)));
    }

    #[test]
    fn test_cancel_keeps_pending_one_shot_alive() {
        let mut h = harness(true, true);
        let (stream, _stream_rx) = collector();
        let (one_shot, one_shot_rx) = collector();

        h.coordinator.start_location_stream(None, stream);
        h.coordinator.get_location(None, one_shot);
        h.coordinator.cancel_updates();
        assert!(h.provider.is_registered());

        h.provider.emit_fix(fix(3.0));
        h.coordinator.process_events();

        assert_eq!(drain(&one_shot_rx).len(), 1);
        assert!(!h.provider.is_registered());
    }

    #[test]
    fn test_second_stream_rejected() {
        let mut h = harness(true, true);
        let (first, _first_rx) = collector();
        let (second, second_rx) = collector();

        h.coordinator.start_location_stream(None, first);
        h.coordinator.start_location_stream(None, second);

        assert_eq!(drain(&second_rx)[0].as_ref().unwrap_err().code, ErrorCode::AlreadyPending);
        assert_eq!(h.provider.registration_count(), 1);
    }

    #[test]
    fn test_change_settings_reregisters_once() {
        let mut h = harness(true, true);
        let (stream, rx) = collector();

        h.coordinator.start_location_stream(None, stream);
        let old_registration = h.coordinator.registration.unwrap();

        let new_settings = LocationSettings::new(2000, 1000, 10.0);
        h.coordinator.change_settings(new_settings.clone()).unwrap();

        assert_eq!(h.provider.registration_count(), 2);
        assert_eq!(h.provider.unregistration_count(), 1);
        assert_eq!(h.provider.overlapping_registrations(), 0);
        assert_eq!(h.provider.active_settings(), Some(new_settings.clone()));
        assert_eq!(h.coordinator.ledger().subscription.as_ref().unwrap().settings, new_settings);

        // A fix queued under the old registration is discarded
        h.coordinator.dispatch(PlatformEvent::LocationFix {
            registration: old_registration,
            fix: fix(1.0),
        });
        assert!(drain(&rx).is_empty());

        h.provider.emit_fix(fix(2.0));
        h.coordinator.process_events();
        assert_eq!(drain(&rx).len(), 1);
    }

    #[test]
    fn test_change_settings_without_registration() {
        let mut h = harness(true, true);
        let settings = LocationSettings::with_interval(800);

        h.coordinator.change_settings(settings.clone()).unwrap();

        assert_eq!(h.coordinator.settings(), &settings);
        assert_eq!(h.provider.registration_count(), 0);
    }

    #[test]
    fn test_change_settings_rejects_invalid() {
        let mut h = harness(true, true);
        let (stream, _rx) = collector();
        h.coordinator.start_location_stream(None, stream);

        let err = h.coordinator.change_settings(LocationSettings::new(0, 0, 0.0)).unwrap_err();

        assert_eq!(err.code, ErrorCode::InvalidSettings);
        assert_eq!(h.provider.registration_count(), 1);
        assert!(h.provider.is_registered());
    }

    #[test]
    fn test_stream_service_gate_accepted() {
        let mut h = harness(true, false);
        let (stream, rx) = collector();

        h.coordinator.start_location_stream(None, stream);
        assert_eq!(h.service.dialogs_shown(), 1);
        assert_eq!(h.service.last_text(), Some(h.coordinator.config().service_dialog.clone()));
        assert_eq!(
            h.coordinator.ledger().pending(),
            vec![PendingRequest::AwaitingServiceEnableForStream, PendingRequest::ActiveSubscription]
        );

        h.service.answer(true);
        h.coordinator.process_events();
        assert!(h.provider.is_registered());

        h.provider.emit_fix(fix(4.0));
        h.coordinator.process_events();
        assert_eq!(drain(&rx).len(), 1);
    }

    #[test]
    fn test_stream_service_gate_declined() {
        let mut h = harness(true, false);
        let (stream, rx) = collector();

        h.coordinator.start_location_stream(None, stream);
        h.service.answer(false);
        h.coordinator.process_events();

        let results = drain(&rx);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap_err().code, ErrorCode::ServiceStatusDisabled);
        assert!(h.coordinator.ledger().is_idle());
        assert!(!h.provider.is_registered());
    }

    #[test]
    fn test_request_service_enable_flows() {
        let mut h = harness(true, true);
        let (cb, rx) = collector();
        h.coordinator.request_service_enable(cb);
        assert_eq!(drain(&rx), vec![Ok(ServiceStatus::Enabled)]);
        assert_eq!(h.service.dialogs_shown(), 0);

        h.service.set_enabled(false);
        h.host.set_bound(false);
        let (cb, rx) = collector();
        h.coordinator.request_service_enable(cb);
        assert_eq!(drain(&rx)[0].as_ref().unwrap_err().code, ErrorCode::MissingHostContext);

        h.host.set_bound(true);
        let (cb, rx) = collector();
        h.coordinator.request_service_enable(cb);
        assert_eq!(h.service.dialogs_shown(), 1);
        h.service.answer(false);
        h.coordinator.process_events();
        assert_eq!(drain(&rx), vec![Ok(ServiceStatus::Disabled)]);
        assert!(h.coordinator.ledger().is_idle());
    }

    #[test]
    fn test_request_service_enable_status_error() {
        let mut h = harness(true, false);
        h.service.set_check_fails(true);
        let (cb, rx) = collector();

        h.coordinator.request_service_enable(cb);

        assert_eq!(drain(&rx)[0].as_ref().unwrap_err().code, ErrorCode::ServiceStatusError);
        assert!(h.coordinator.ledger().is_idle());
        assert!(h.coordinator.check_service_enabled().is_err());
    }

    #[test]
    fn test_enable_flows_run_independently() {
        let mut h = harness(true, false);
        let (enable_cb, enable_rx) = collector();
        let (stream, stream_rx) = collector();

        h.coordinator.request_service_enable(enable_cb);
        h.coordinator.start_location_stream(None, stream);
        assert_eq!(h.service.pending_dialogs(), 2);

        // The caller's dialog closes first; the stream's gate is untouched
        h.service.answer(true);
        h.coordinator.process_events();
        assert_eq!(drain(&enable_rx), vec![Ok(ServiceStatus::Enabled)]);
        assert!(h.coordinator.ledger().location_gate.is_pending());
        assert!(!h.provider.is_registered());

        h.service.answer(true);
        h.coordinator.process_events();
        assert!(h.provider.is_registered());
        assert!(drain(&stream_rx).is_empty());
    }

    #[test]
    fn test_stale_dialog_result_ignored() {
        let mut h = harness(true, false);
        let (cb, rx) = collector();
        h.coordinator.request_service_enable(cb);
        let token = h.coordinator.ledger().service_enable.token().unwrap();

        h.coordinator.dispatch(PlatformEvent::ServiceDialogClosed {
            token: RequestToken::new(token.id() + 100),
            enabled: true,
        });
        assert!(drain(&rx).is_empty());

        h.coordinator.dispatch(PlatformEvent::ServiceDialogClosed { token, enabled: true });
        h.coordinator.dispatch(PlatformEvent::ServiceDialogClosed { token, enabled: false });
        assert_eq!(drain(&rx), vec![Ok(ServiceStatus::Enabled)]);
    }

    #[test]
    fn test_nmea_altitude_applies_to_later_fixes() {
        let mut h = harness(true, true);
        let (stream, rx) = collector();
        h.coordinator.start_location_stream(None, stream);
        assert!(h.provider.has_auxiliary_feed());

        h.provider.emit_sentence(GGA);
        h.provider.emit_fix(fix(1.0));
        h.provider.emit_sentence("$GPGGA,,,,,,,,,,");
        h.provider.emit_fix(fix(2.0));
        h.coordinator.process_events();

        let records: Vec<_> = drain(&rx).into_iter().map(Result::unwrap).collect();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|record| record.altitude == 545.4));
        assert_eq!(h.coordinator.tracked_altitude(), Some(545.4));
    }

    #[test]
    fn test_no_nmea_feed_without_capability() {
        let config = CoordinatorConfig {
            capabilities: CapabilityTier::from_api_level(23),
            ..Default::default()
        };
        let mut h = harness_with(config, true, true);
        let (stream, rx) = collector();

        h.coordinator.start_location_stream(None, stream);
        assert!(!h.provider.has_auxiliary_feed());

        h.coordinator.dispatch(PlatformEvent::NmeaSentence { sentence: GGA.to_string() });
        h.provider.emit_fix(fix(1.0));
        h.coordinator.process_events();

        assert_eq!(drain(&rx)[0].as_ref().unwrap().altitude, 600.0);
    }

    #[test]
    fn test_detach_host_fails_pending_and_deregisters() {
        let mut h = harness(true, true);
        let (stream, stream_rx) = collector();
        let (one_shot, one_shot_rx) = collector();

        h.coordinator.start_location_stream(None, stream);
        h.coordinator.get_location(None, one_shot);
        h.coordinator.detach_host();

        assert!(!h.provider.is_registered());
        assert!(!h.provider.has_auxiliary_feed());
        assert_eq!(drain(&stream_rx)[0].as_ref().unwrap_err().code, ErrorCode::MissingHostContext);
        assert_eq!(drain(&one_shot_rx)[0].as_ref().unwrap_err().code, ErrorCode::MissingHostContext);
        assert!(h.coordinator.ledger().is_idle());

        let (cb, rx) = collector();
        h.coordinator.get_location(None, cb);
        assert_eq!(drain(&rx)[0].as_ref().unwrap_err().code, ErrorCode::MissingHostContext);
    }

    #[test]
    fn test_registration_failure_reported() {
        let mut h = harness(true, true);
        h.provider.fail_next_register();
        let (cb, rx) = collector();

        h.coordinator.get_location(None, cb);

        let err = drain(&rx).remove(0).unwrap_err();
        assert_eq!(err.code, ErrorCode::ServiceStatusError);
        assert!(err.details.is_some());
        assert!(h.coordinator.ledger().is_idle());
    }

    #[test]
    fn test_get_location_rejects_invalid_settings() {
        let mut h = harness(true, true);
        let (cb, rx) = collector();

        h.coordinator.get_location(Some(LocationSettings::new(100, 500, 0.0)), cb);

        assert_eq!(drain(&rx)[0].as_ref().unwrap_err().code, ErrorCode::InvalidSettings);
        assert!(h.coordinator.ledger().is_idle());
    }

    #[test]
    fn test_denied_then_granted_externally() {
        let mut h = harness(false, true);
        h.gate.set_rationale(true);

        let (cb, rx) = collector();
        h.coordinator.request_permission(cb);
        h.gate.answer(false);
        h.coordinator.process_events();
        let status = drain(&rx).remove(0).unwrap();
        assert_eq!(status, PermissionStatus::Denied);
        assert_eq!(status.error().map(|e| e.code), Some(ErrorCode::PermissionDenied));

        h.gate.set_granted(true);
        let (cb, rx) = collector();
        h.coordinator.request_permission(cb);

        assert_eq!(drain(&rx), vec![Ok(PermissionStatus::Granted)]);
        assert_eq!(h.gate.prompt_count(), 1);
    }
}
