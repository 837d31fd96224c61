use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::drivers::{LinkError, ValidationLimits, VoltageFilterConfig};
/// Runtime settings for the ingestion pipeline. Every field has a default,
/// so a config file only needs the values it changes.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Samples averaged by one zero-point calibration run.
    pub calibration_samples: u32,
    /// Engine sleep when the source has nothing to deliver.
    pub idle_poll_ms: u64,
    pub voltage: VoltageFilterConfig,
    pub limits: ValidationLimits,
}
impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            // two seconds at the firmware's 50 Hz
            calibration_samples: 100,
            idle_poll_ms: 5,
            voltage: VoltageFilterConfig::default(),
            limits: ValidationLimits::default(),
        }
    }
}
impl PipelineConfig {
    pub fn from_json_str(text: &str) -> Result<Self, LinkError> {
        let config: PipelineConfig = serde_json::from_str(text)?;
        config.validated()
    }
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LinkError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms.max(1))
    }
    fn validated(self) -> Result<Self, LinkError> {
        if self.calibration_samples == 0 {
            return Err(LinkError::Config(
                "calibration_samples must be greater than zero".into(),
            ));
        }
        if self.limits.min_volts > self.limits.max_volts {
            return Err(LinkError::Config(format!(
                "battery range is empty: {} V > {} V",
                self.limits.min_volts, self.limits.max_volts
            )));
        }
        if self.voltage.min_volts > self.voltage.max_volts {
            return Err(LinkError::Config(format!(
                "voltage filter window is empty: {} V > {} V",
                self.voltage.min_volts, self.voltage.max_volts
            )));
        }
        Ok(self)
    }
}
