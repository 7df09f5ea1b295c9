//! Location permission prompt interface

use crate::platform::{PermissionCallback, PlatformResult};

pub trait PermissionGate: Send {
    /// Whether fine location permission is currently granted. Never blocks.
    fn check(&self) -> bool;

    /// Show the permission prompt. `on_result` fires once with the outcome.
    fn request(&mut self, on_result: PermissionCallback);

    /// Whether the platform would show a rationale before prompting again.
    /// `false` after a denial means the user chose "don't ask again".
    fn should_show_rationale(&self) -> PlatformResult<bool>;
}
