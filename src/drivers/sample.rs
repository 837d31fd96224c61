use std::fmt;
use std::ops::Sub;
use std::time::Instant;
use serde::Serialize;
/// Three-axis reading (x, y, z).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}
impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
    /// True when every axis satisfies `|v| <= limit`. NaN never does.
    pub fn within(&self, limit: f32) -> bool {
        self.iter().all(|v| v.abs() <= limit)
    }
    pub fn iter(&self) -> impl Iterator<Item = f32> {
        [self.x, self.y, self.z].into_iter()
    }
}
impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}
/// One decoded IMU report.
///
/// `timestamp_ms` is the device's free-running counter (no epoch, wraps at
/// 2^32). `received_at` is the local capture instant and is what consumers
/// should use for ordering across a reconnect.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp_ms: u32,
    /// Acceleration in g.
    pub accel: Vec3,
    /// Angular rate in degrees per second.
    pub gyro: Vec3,
    /// Battery voltage in volts; exactly 0.0 marks "no valid reading".
    pub voltage: f32,
    #[serde(skip)]
    pub received_at: Instant,
}
impl Sample {
    pub fn with_motion(self, accel: Vec3, gyro: Vec3) -> Self {
        Self {
            accel,
            gyro,
            ..self
        }
    }
}
impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={}ms accel=[{:.3}, {:.3}, {:.3}]g gyro=[{:.2}, {:.2}, {:.2}]dps v={:.3}V",
            self.timestamp_ms,
            self.accel.x,
            self.accel.y,
            self.accel.z,
            self.gyro.x,
            self.gyro.y,
            self.gyro.z,
            self.voltage
        )
    }
}
/// Per-axis zero offsets produced by a completed calibration run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CalibrationOffsets {
    pub accel_offset: Vec3,
    pub gyro_offset: Vec3,
    pub sample_count: u32,
}
impl fmt::Display for CalibrationOffsets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "accel offset [{:.4}, {:.4}, {:.4}]g, gyro offset [{:.3}, {:.3}, {:.3}]dps over {} samples",
            self.accel_offset.x,
            self.accel_offset.y,
            self.accel_offset.z,
            self.gyro_offset.x,
            self.gyro_offset.y,
            self.gyro_offset.z,
            self.sample_count
        )
    }
}
