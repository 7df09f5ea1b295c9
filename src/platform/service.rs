//! Location service enablement interface

use crate::platform::{DialogCallback, PlatformResult};
use crate::utils::config::ServiceDialogText;

pub trait ServiceEnabler: Send {
    /// Query the provider registry for the GPS provider state
    fn is_enabled(&self) -> PlatformResult<bool>;

    /// Present the enable-service affordance; `on_result` fires once with
    /// `true` when the user came back with the service switched on
    fn present_enable_ui(&mut self, text: &ServiceDialogText, on_result: DialogCallback);
}
