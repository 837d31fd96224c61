//! Zero-point calibration.
//!
//! A run averages `total` raw samples per axis while the racket lies still and
//! stores the means as offsets that are then subtracted from every reading.
//! Nothing here checks that the racket actually is still; the caller's
//! workflow guarantees it.
use log::{debug, info};
use crate::drivers::error::CalibrationError;
use crate::drivers::sample::{CalibrationOffsets, Sample, Vec3};
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CalibrationState {
    Idle,
    Collecting { progress: u32, total: u32 },
    Computed(CalibrationOffsets),
}
/// What a call to [`CalibrationEngine::add_sample`] did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CalibrationStep {
    /// No run is collecting; the sample was not used.
    Ignored,
    Progress { current: u32, total: u32 },
    Complete(CalibrationOffsets),
}
/// Running per-axis sums. f64 keeps the mean of identical f32 inputs exact.
#[derive(Clone, Copy, Debug, Default)]
struct AxisSums {
    accel: [f64; 3],
    gyro: [f64; 3],
}
impl AxisSums {
    fn add(&mut self, sample: &Sample) {
        for (sum, v) in self.accel.iter_mut().zip(sample.accel.iter()) {
            *sum += v as f64;
        }
        for (sum, v) in self.gyro.iter_mut().zip(sample.gyro.iter()) {
            *sum += v as f64;
        }
    }
    fn mean(sums: &[f64; 3], count: u32) -> Vec3 {
        let n = count as f64;
        Vec3::new(
            (sums[0] / n) as f32,
            (sums[1] / n) as f32,
            (sums[2] / n) as f32,
        )
    }
    fn offsets(&self, count: u32) -> CalibrationOffsets {
        CalibrationOffsets {
            accel_offset: Self::mean(&self.accel, count),
            gyro_offset: Self::mean(&self.gyro, count),
            sample_count: count,
        }
    }
}
#[derive(Clone, Debug)]
pub struct CalibrationEngine {
    state: CalibrationState,
    sums: AxisSums,
    active: Option<CalibrationOffsets>,
}
impl Default for CalibrationEngine {
    fn default() -> Self {
        Self::new()
    }
}
impl CalibrationEngine {
    pub fn new() -> Self {
        Self {
            state: CalibrationState::Idle,
            sums: AxisSums::default(),
            active: None,
        }
    }
    pub fn state(&self) -> CalibrationState {
        self.state
    }
    pub fn is_collecting(&self) -> bool {
        matches!(self.state, CalibrationState::Collecting { .. })
    }
    /// Offsets currently subtracted by [`apply`](Self::apply).
    pub fn offsets(&self) -> Option<CalibrationOffsets> {
        self.active
    }
    pub fn start(&mut self, total: u32) -> Result<(), CalibrationError> {
        if let CalibrationState::Collecting { progress, total: running } = self.state {
            return Err(CalibrationError::AlreadyRunning {
                progress,
                total: running,
            });
        }
        if total == 0 {
            return Err(CalibrationError::EmptyRun);
        }
        info!("calibration started: collecting {total} samples, keep the racket still");
        self.sums = AxisSums::default();
        self.state = CalibrationState::Collecting { progress: 0, total };
        Ok(())
    }
    /// Feeds one raw (uncorrected) sample into the running collection.
    pub fn add_sample(&mut self, sample: &Sample) -> CalibrationStep {
        let CalibrationState::Collecting { progress, total } = self.state else {
            return CalibrationStep::Ignored;
        };
        self.sums.add(sample);
        let current = progress + 1;
        if current < total {
            debug!("calibration progress {current}/{total}");
            self.state = CalibrationState::Collecting {
                progress: current,
                total,
            };
            return CalibrationStep::Progress { current, total };
        }
        let offsets = self.sums.offsets(current);
        info!("calibration complete: {offsets}");
        self.sums = AxisSums::default();
        self.active = Some(offsets);
        self.state = CalibrationState::Computed(offsets);
        CalibrationStep::Complete(offsets)
    }
    /// Abandons a run in progress and returns to `Idle`. Offsets from an
    /// earlier run stay active.
    pub fn cancel(&mut self) -> Result<(), CalibrationError> {
        let CalibrationState::Collecting { progress, total } = self.state else {
            return Err(CalibrationError::NotCollecting);
        };
        info!("calibration cancelled at {progress}/{total}");
        self.sums = AxisSums::default();
        self.state = CalibrationState::Idle;
        Ok(())
    }
    /// Forgets any offsets and stops a run in progress.
    pub fn clear(&mut self) {
        self.sums = AxisSums::default();
        self.active = None;
        self.state = CalibrationState::Idle;
    }
    pub fn apply(&self, sample: Sample) -> Sample {
        match self.active {
            Some(offsets) => sample.with_motion(
                sample.accel - offsets.accel_offset,
                sample.gyro - offsets.gyro_offset,
            ),
            None => sample,
        }
    }
}
