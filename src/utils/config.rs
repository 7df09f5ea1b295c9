use crate::core::constants::{
    DEFAULT_DISTANCE_FILTER_M, DEFAULT_MIN_UPDATE_INTERVAL_MS, DEFAULT_UPDATE_INTERVAL_MS,
};
use crate::core::CapabilityTier;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Parameters for a streaming session, supplied before each session starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationSettings {
    /// Desired interval between updates (milliseconds)
    pub update_interval_ms: u64,
    /// Fastest interval the provider may deliver at (milliseconds)
    pub min_update_interval_ms: u64,
    /// Minimum displacement between updates (meters)
    pub distance_filter_m: f32,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            min_update_interval_ms: DEFAULT_MIN_UPDATE_INTERVAL_MS,
            distance_filter_m: DEFAULT_DISTANCE_FILTER_M,
        }
    }
}

impl LocationSettings {
    pub fn new(update_interval_ms: u64, min_update_interval_ms: u64, distance_filter_m: f32) -> Self {
        Self {
            update_interval_ms,
            min_update_interval_ms,
            distance_filter_m,
        }
    }

    /// Settings with the given interval and the fastest interval at half of it
    pub fn with_interval(update_interval_ms: u64) -> Self {
        Self {
            update_interval_ms,
            min_update_interval_ms: update_interval_ms / 2,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.update_interval_ms == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "update_interval_ms".to_string(),
                value: self.update_interval_ms.to_string(),
                reason: "update interval must be positive".to_string(),
            });
        }
        if self.min_update_interval_ms > self.update_interval_ms {
            return Err(ConfigError::InvalidParameter {
                parameter: "min_update_interval_ms".to_string(),
                value: self.min_update_interval_ms.to_string(),
                reason: format!("must not exceed update interval of {}ms", self.update_interval_ms),
            });
        }
        if !self.distance_filter_m.is_finite() || self.distance_filter_m < 0.0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "distance_filter_m".to_string(),
                value: self.distance_filter_m.to_string(),
                reason: "distance filter must be a non-negative number of meters".to_string(),
            });
        }
        Ok(())
    }
}

/// Copy shown by the enable-location-service affordance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceDialogText {
    pub title: String,
    pub message: String,
    pub confirm_label: String,
}

impl Default for ServiceDialogText {
    fn default() -> Self {
        Self {
            title: "Location services disabled".to_string(),
            message: "Your precise location is needed to record your activity.".to_string(),
            confirm_label: "Go to Settings".to_string(),
        }
    }
}

/// Coordinator configuration resolved once per session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Settings used until a caller supplies its own
    pub settings: LocationSettings,
    pub capabilities: CapabilityTier,
    pub service_dialog: ServiceDialogText,
}

impl CoordinatorConfig {
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: CoordinatorConfig = serde_json::from_str(content).map_err(|e| {
            ConfigError::SerializationError {
                message: format!("Failed to parse config: {}", e),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.settings.validate()?;
        if self.service_dialog.confirm_label.trim().is_empty() {
            return Err(ConfigError::MissingParameter {
                parameter: "service_dialog.confirm_label".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid parameter {parameter} = {value}: {reason}")]
    InvalidParameter { parameter: String, value: String, reason: String },
    #[error("Missing required parameter: {parameter}")]
    MissingParameter { parameter: String },
    #[error("I/O error: {message}")]
    IoError { message: String },
    #[error("Serialization error: {message}")]
    SerializationError { message: String },
}
