use log::warn;
use serde::{Deserialize, Serialize};
use crate::drivers::codec::INVALID_VOLTAGE;
use crate::drivers::sample::Sample;
/// Plausibility bounds for a swinging racket on a 3.7 V LiPo cell.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationLimits {
    pub max_accel_g: f32,
    pub max_gyro_dps: f32,
    pub min_volts: f32,
    pub max_volts: f32,
    /// Below this a reading points at USB power or a misconfigured ADC.
    pub usb_suspect_volts: f32,
}
impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_accel_g: 20.0,
            max_gyro_dps: 2500.0,
            min_volts: 2.5,
            max_volts: 4.5,
            usb_suspect_volts: 1.0,
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum VoltageStatus {
    Nominal,
    /// The codec's 0.0 sentinel: no usable reading this sample.
    Invalid,
    SuspiciouslyLow,
    OutOfRange,
}
/// Outcome of range-checking one sample. Informational only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub accel_in_range: bool,
    pub gyro_in_range: bool,
    pub voltage: VoltageStatus,
}
impl Validation {
    pub fn is_valid(&self) -> bool {
        self.accel_in_range && self.gyro_in_range && self.voltage == VoltageStatus::Nominal
    }
}
#[derive(Clone, Debug, Default)]
pub struct SampleValidator {
    limits: ValidationLimits,
}
impl SampleValidator {
    pub fn new(limits: ValidationLimits) -> Self {
        Self { limits }
    }
    pub fn limits(&self) -> &ValidationLimits {
        &self.limits
    }
    pub fn validate(&self, sample: &Sample) -> bool {
        self.classify(sample).is_valid()
    }
    pub fn classify(&self, sample: &Sample) -> Validation {
        let accel_in_range = sample.accel.within(self.limits.max_accel_g);
        let gyro_in_range = sample.gyro.within(self.limits.max_gyro_dps);
        let voltage = self.voltage_status(sample.voltage);
        if !accel_in_range {
            warn!(
                "acceleration out of range: [{}, {}, {}] g",
                sample.accel.x, sample.accel.y, sample.accel.z
            );
        }
        if !gyro_in_range {
            warn!(
                "angular rate out of range: [{}, {}, {}] dps",
                sample.gyro.x, sample.gyro.y, sample.gyro.z
            );
        }
        match voltage {
            VoltageStatus::SuspiciouslyLow => warn!(
                "battery reading {} V is very low (USB power or ADC misconfiguration?)",
                sample.voltage
            ),
            VoltageStatus::OutOfRange => warn!("battery reading anomaly: {} V", sample.voltage),
            VoltageStatus::Nominal | VoltageStatus::Invalid => {}
        }
        Validation {
            accel_in_range,
            gyro_in_range,
            voltage,
        }
    }
    fn voltage_status(&self, volts: f32) -> VoltageStatus {
        if volts == INVALID_VOLTAGE {
            VoltageStatus::Invalid
        } else if volts < self.limits.usb_suspect_volts {
            VoltageStatus::SuspiciouslyLow
        } else if !volts.is_finite()
            || volts < self.limits.min_volts
            || volts > self.limits.max_volts
        {
            VoltageStatus::OutOfRange
        } else {
            VoltageStatus::Nominal
        }
    }
}
