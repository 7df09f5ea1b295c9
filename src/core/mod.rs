//! Core types and constants for the location coordinator

pub mod types;
pub mod capability;
pub mod constants;

pub use types::*;
pub use capability::CapabilityTier;
pub use constants::*;
