use serde::Deserialize;
use wastebin_common::EntityId;
use wastebin_kernel::{ConfigError, SystemConfig};

/// Errors that leave the waste bin unconfigured.
#[derive(Debug, thiserror::Error)]
pub enum WasteBinError {
    #[error("entity {0} is not a model")]
    NotAModel(EntityId),
    #[error("delay must be a finite, non-negative number of seconds, got {0}")]
    InvalidDelay(f64),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Waste bin parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct WasteBinConfig {
    /// Continuous contact time, in seconds, before touching models are
    /// removed. Zero removes on the step after first contact.
    #[serde(default)]
    pub delay: f64,
}

impl WasteBinConfig {
    pub fn from_system_config(config: &SystemConfig) -> Result<Self, WasteBinError> {
        let delay = config.get::<f64>("delay")?.unwrap_or_default();
        if !delay.is_finite() || delay < 0.0 {
            return Err(WasteBinError::InvalidDelay(delay));
        }
        Ok(Self { delay })
    }
}
