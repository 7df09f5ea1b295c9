//! Mock collaborators for testing and development
//!
//! Each mock is a cheap clonable handle over shared state, so a test can
//! hand one clone to the coordinator and keep another to play the user or
//! the positioning hardware.

use crate::core::RawFix;
use crate::platform::{
    DialogCallback, FixCallback, HostContext, LocationProvider, PermissionCallback,
    PermissionGate, PlatformError, PlatformResult, SentenceCallback, ServiceEnabler,
};
use crate::utils::config::{LocationSettings, ServiceDialogText};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct PermissionState {
    granted: bool,
    rationale: bool,
    rationale_fails: bool,
    prompts: u32,
    pending: VecDeque<PermissionCallback>,
}

/// Mock permission prompt
#[derive(Clone)]
pub struct MockPermissionGate {
    state: Arc<Mutex<PermissionState>>,
}

impl MockPermissionGate {
    pub fn new(granted: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(PermissionState {
                granted,
                rationale: true,
                rationale_fails: false,
                prompts: 0,
                pending: VecDeque::new(),
            })),
        }
    }

    /// Change the permission outside of any prompt (e.g. in system settings)
    pub fn set_granted(&self, granted: bool) {
        lock(&self.state).granted = granted;
    }

    pub fn set_rationale(&self, rationale: bool) {
        lock(&self.state).rationale = rationale;
    }

    /// Make the rationale query fail
    pub fn fail_rationale(&self) {
        lock(&self.state).rationale_fails = true;
    }

    /// Number of prompts shown so far
    pub fn prompt_count(&self) -> u32 {
        lock(&self.state).prompts
    }

    pub fn has_pending_prompt(&self) -> bool {
        !lock(&self.state).pending.is_empty()
    }

    /// Answer the oldest open prompt. Returns false if none is open.
    pub fn answer(&self, granted: bool) -> bool {
        let callback = {
            let mut state = lock(&self.state);
            if granted {
                state.granted = true;
            }
            state.pending.pop_front()
        };
        match callback {
            Some(callback) => {
                callback(granted);
                true
            }
            None => false,
        }
    }
}

impl PermissionGate for MockPermissionGate {
    fn check(&self) -> bool {
        lock(&self.state).granted
    }

    fn request(&mut self, on_result: PermissionCallback) {
        let mut state = lock(&self.state);
        state.prompts += 1;
        state.pending.push_back(on_result);
    }

    fn should_show_rationale(&self) -> PlatformResult<bool> {
        let state = lock(&self.state);
        if state.rationale_fails {
            return Err(PlatformError::HostRejected {
                operation: "rationale query".to_string(),
            });
        }
        Ok(state.rationale)
    }
}

struct ServiceState {
    enabled: bool,
    check_fails: bool,
    dialogs_shown: u32,
    last_text: Option<ServiceDialogText>,
    pending: VecDeque<DialogCallback>,
}

/// Mock location-service switch and settings dialog
#[derive(Clone)]
pub struct MockServiceEnabler {
    state: Arc<Mutex<ServiceState>>,
}

impl MockServiceEnabler {
    pub fn new(enabled: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(ServiceState {
                enabled,
                check_fails: false,
                dialogs_shown: 0,
                last_text: None,
                pending: VecDeque::new(),
            })),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        lock(&self.state).enabled = enabled;
    }

    /// Make the status query fail until called again with `false`
    pub fn set_check_fails(&self, fails: bool) {
        lock(&self.state).check_fails = fails;
    }

    pub fn dialogs_shown(&self) -> u32 {
        lock(&self.state).dialogs_shown
    }

    pub fn pending_dialogs(&self) -> usize {
        lock(&self.state).pending.len()
    }

    pub fn last_text(&self) -> Option<ServiceDialogText> {
        lock(&self.state).last_text.clone()
    }

    /// Close the oldest open dialog. Accepting switches the service on.
    pub fn answer(&self, enable: bool) -> bool {
        let callback = {
            let mut state = lock(&self.state);
            if enable {
                state.enabled = true;
            }
            state.pending.pop_front()
        };
        match callback {
            Some(callback) => {
                callback(enable);
                true
            }
            None => false,
        }
    }
}

impl ServiceEnabler for MockServiceEnabler {
    fn is_enabled(&self) -> PlatformResult<bool> {
        let state = lock(&self.state);
        if state.check_fails {
            return Err(PlatformError::Unavailable {
                service: "location".to_string(),
            });
        }
        Ok(state.enabled)
    }

    fn present_enable_ui(&mut self, text: &ServiceDialogText, on_result: DialogCallback) {
        let mut state = lock(&self.state);
        state.dialogs_shown += 1;
        state.last_text = Some(text.clone());
        state.pending.push_back(on_result);
    }
}

struct ProviderState {
    registration: Option<(LocationSettings, FixCallback)>,
    auxiliary: Option<SentenceCallback>,
    registrations: u32,
    unregistrations: u32,
    overlapping: u32,
    fail_next_register: bool,
}

/// Mock positioning subsystem
#[derive(Clone)]
pub struct MockLocationProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl MockLocationProvider {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ProviderState {
                registration: None,
                auxiliary: None,
                registrations: 0,
                unregistrations: 0,
                overlapping: 0,
                fail_next_register: false,
            })),
        }
    }

    /// Reject the next registration attempt
    pub fn fail_next_register(&self) {
        lock(&self.state).fail_next_register = true;
    }

    pub fn is_registered(&self) -> bool {
        lock(&self.state).registration.is_some()
    }

    pub fn has_auxiliary_feed(&self) -> bool {
        lock(&self.state).auxiliary.is_some()
    }

    pub fn active_settings(&self) -> Option<LocationSettings> {
        lock(&self.state).registration.as_ref().map(|(settings, _)| settings.clone())
    }

    pub fn registration_count(&self) -> u32 {
        lock(&self.state).registrations
    }

    pub fn unregistration_count(&self) -> u32 {
        lock(&self.state).unregistrations
    }

    /// Registrations made while another one was still alive
    pub fn overlapping_registrations(&self) -> u32 {
        lock(&self.state).overlapping
    }

    /// Deliver a fix to the live registration. Returns false if none.
    pub fn emit_fix(&self, fix: RawFix) -> bool {
        let mut state = lock(&self.state);
        match state.registration.as_mut() {
            Some((_, callback)) => {
                callback(fix);
                true
            }
            None => false,
        }
    }

    /// Deliver a sentence on the auxiliary feed. Returns false if none.
    pub fn emit_sentence(&self, sentence: &str) -> bool {
        let mut state = lock(&self.state);
        match state.auxiliary.as_mut() {
            Some(callback) => {
                callback(sentence.to_string());
                true
            }
            None => false,
        }
    }
}

impl Default for MockLocationProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationProvider for MockLocationProvider {
    fn register(&mut self, settings: &LocationSettings, on_fix: FixCallback) -> PlatformResult<()> {
        let mut state = lock(&self.state);
        if state.fail_next_register {
            state.fail_next_register = false;
            return Err(PlatformError::ProviderFailure {
                provider: "gps".to_string(),
                reason: "simulated registration failure".to_string(),
            });
        }
        if state.registration.is_some() {
            state.overlapping += 1;
        }
        state.registrations += 1;
        state.registration = Some((settings.clone(), on_fix));
        Ok(())
    }

    fn unregister(&mut self) {
        let mut state = lock(&self.state);
        if state.registration.take().is_some() {
            state.unregistrations += 1;
        }
    }

    fn register_auxiliary_feed(&mut self, on_sentence: SentenceCallback) -> PlatformResult<()> {
        lock(&self.state).auxiliary = Some(on_sentence);
        Ok(())
    }

    fn unregister_auxiliary_feed(&mut self) {
        lock(&self.state).auxiliary = None;
    }
}

/// Mock interactive host
#[derive(Clone)]
pub struct MockHost {
    bound: Arc<AtomicBool>,
}

impl MockHost {
    pub fn new(bound: bool) -> Self {
        Self {
            bound: Arc::new(AtomicBool::new(bound)),
        }
    }

    pub fn set_bound(&self, bound: bool) {
        self.bound.store(bound, Ordering::SeqCst);
    }
}

impl HostContext for MockHost {
    fn is_bound(&self) -> bool {
        self.bound.load(Ordering::SeqCst)
    }
}
