//! Location provider registration interface

use crate::platform::{FixCallback, PlatformResult, SentenceCallback};
use crate::utils::config::LocationSettings;

/// The underlying positioning subsystem.
///
/// At most one registration is alive at a time; registering again without
/// unregistering first is a caller bug.
pub trait LocationProvider: Send {
    fn register(&mut self, settings: &LocationSettings, on_fix: FixCallback) -> PlatformResult<()>;

    fn unregister(&mut self);

    fn register_auxiliary_feed(&mut self, on_sentence: SentenceCallback) -> PlatformResult<()>;

    fn unregister_auxiliary_feed(&mut self);
}
