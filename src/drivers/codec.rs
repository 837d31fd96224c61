//! Decoder for the racket firmware's 30-byte IMU report.
//!
//! Layout (little-endian):
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     timestamp (u32, device ms counter)
//! 4       12    accel x/y/z (f32, g)
//! 16      12    gyro x/y/z (f32, deg/s)
//! 28      2     battery ADC code (u16, 10-bit or 12-bit)
//! ```
//!
//! The layout is shared with the sensor firmware and cannot change on one side only.
use std::time::Instant;
use log::{debug, warn};
use crate::drivers::reassembler::{Frame, FRAME_LEN};
use crate::drivers::sample::{Sample, Vec3};
/// Battery divider calibration constant, fitted against a multimeter
/// (raw 2092 at 12 bit reads 4.14 V).
pub const VOLTAGE_K: f32 = 8.11;
/// Full scale of the 12-bit SAADC.
pub const ADC_FULL_SCALE: f32 = 4096.0;
/// Codes at or below this are 10-bit readings.
pub const MAX_10BIT_CODE: u16 = 1023;
/// Anything above this can only come from USB power or a bad read.
pub const MAX_PLAUSIBLE_VOLTS: f32 = 5.0;
/// Value stored in `Sample::voltage` when the reading is unusable.
pub const INVALID_VOLTAGE: f32 = 0.0;
const TIMESTAMP_AT: usize = 0;
const ACCEL_AT: usize = 4;
const GYRO_AT: usize = 16;
const VOLTAGE_AT: usize = 28;
/// Decodes a complete frame. Never fails: every 30-byte pattern maps to a sample.
pub fn decode(frame: &Frame, received_at: Instant) -> Sample {
    let bytes = frame.as_bytes();
    let timestamp_ms = read_u32(bytes, TIMESTAMP_AT);
    let accel = read_vec3(bytes, ACCEL_AT);
    let gyro = read_vec3(bytes, GYRO_AT);
    let voltage_raw = read_u16(bytes, VOLTAGE_AT);
    if timestamp_ms % 100 == 0 {
        debug!(
            "decoded t={} accel=[{:.3}, {:.3}, {:.3}] gyro=[{:.2}, {:.2}, {:.2}] adc={}",
            timestamp_ms, accel.x, accel.y, accel.z, gyro.x, gyro.y, gyro.z, voltage_raw
        );
    }
    Sample {
        timestamp_ms,
        accel,
        gyro,
        voltage: voltage_from_raw(voltage_raw),
        received_at,
    }
}
/// Widens a 10-bit code to its 12-bit equivalent; 12-bit codes pass through.
pub fn to_12bit(voltage_raw: u16) -> u32 {
    if voltage_raw <= MAX_10BIT_CODE {
        voltage_raw as u32 * 4
    } else {
        voltage_raw as u32
    }
}
/// Converts an ADC code to battery volts, mapping implausible readings to
/// [`INVALID_VOLTAGE`].
pub fn voltage_from_raw(voltage_raw: u16) -> f32 {
    let raw12 = to_12bit(voltage_raw);
    let volts = raw12 as f32 * VOLTAGE_K / ADC_FULL_SCALE;
    if volts > MAX_PLAUSIBLE_VOLTS {
        warn!(
            "battery reading {:.3} V (adc {}) is above {} V, likely USB power; marking invalid",
            volts, voltage_raw, MAX_PLAUSIBLE_VOLTS
        );
        return INVALID_VOLTAGE;
    }
    volts
}
/// Builds a frame the way the firmware does. Used by the simulator and tests.
pub fn encode(timestamp_ms: u32, accel: Vec3, gyro: Vec3, voltage_raw: u16) -> Frame {
    let mut bytes = [0u8; FRAME_LEN];
    bytes[TIMESTAMP_AT..TIMESTAMP_AT + 4].copy_from_slice(&timestamp_ms.to_le_bytes());
    write_vec3(&mut bytes, ACCEL_AT, accel);
    write_vec3(&mut bytes, GYRO_AT, gyro);
    bytes[VOLTAGE_AT..VOLTAGE_AT + 2].copy_from_slice(&voltage_raw.to_le_bytes());
    Frame::from_bytes(bytes)
}
fn read_u16(bytes: &[u8; FRAME_LEN], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}
fn read_u32(bytes: &[u8; FRAME_LEN], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
fn read_f32(bytes: &[u8; FRAME_LEN], at: usize) -> f32 {
    f32::from_bits(read_u32(bytes, at))
}
fn read_vec3(bytes: &[u8; FRAME_LEN], at: usize) -> Vec3 {
    Vec3::new(
        read_f32(bytes, at),
        read_f32(bytes, at + 4),
        read_f32(bytes, at + 8),
    )
}
fn write_vec3(bytes: &mut [u8; FRAME_LEN], at: usize, v: Vec3) {
    for (i, value) in v.iter().enumerate() {
        let start = at + i * 4;
        bytes[start..start + 4].copy_from_slice(&value.to_le_bytes());
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn round_trip_is_exact() {
        let accel = Vec3::new(0.012, -0.98, 15.25);
        let gyro = Vec3::new(-2499.5, 0.0, 1.0e-3);
        let frame = encode(u32::MAX - 3, accel, gyro, 2048);
        let sample = decode(&frame, Instant::now());
        assert_eq!(sample.timestamp_ms, u32::MAX - 3);
        assert_eq!(sample.accel, accel);
        assert_eq!(sample.gyro, gyro);
    }
    #[test]
    fn field_offsets_match_firmware_layout() {
        let frame = encode(0x0403_0201, Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO, 0xBBAA);
        let bytes = frame.as_bytes();
        assert_eq!(&bytes[0..4], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&bytes[4..8], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[28..30], &[0xAA, 0xBB]);
    }
    #[test]
    fn ten_bit_code_is_scaled() {
        assert_eq!(to_12bit(511), 2044);
        let v = voltage_from_raw(511);
        assert!((v - 511.0 * 4.0 * 8.11 / 4096.0).abs() < 1e-5);
        assert!((v - 4.047).abs() < 1e-3);
    }
    #[test]
    fn twelve_bit_code_is_used_as_is() {
        assert_eq!(to_12bit(2048), 2048);
        assert!((voltage_from_raw(2048) - 4.055).abs() < 1e-4);
    }
    #[test]
    fn boundary_code_1023_is_ten_bit() {
        assert_eq!(to_12bit(1023), 4092);
        assert_eq!(to_12bit(1024), 1024);
    }
    #[test]
    fn implausible_voltage_becomes_sentinel() {
        // 4095 * 8.11 / 4096 = 8.108 V
        assert_eq!(voltage_from_raw(4095), INVALID_VOLTAGE);
        // 1000 (10-bit) -> 4000 -> 7.92 V
        assert_eq!(voltage_from_raw(1000), INVALID_VOLTAGE);
        let frame = encode(1, Vec3::ZERO, Vec3::ZERO, 4095);
        assert_eq!(decode(&frame, Instant::now()).voltage, 0.0);
    }
    #[test]
    fn zero_code_decodes_to_zero_volts() {
        assert_eq!(voltage_from_raw(0), 0.0);
    }
}
