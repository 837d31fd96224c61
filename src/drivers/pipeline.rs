use std::time::Instant;
use log::{debug, info};
use crate::config::PipelineConfig;
use crate::drivers::calibration::{CalibrationEngine, CalibrationState, CalibrationStep};
use crate::drivers::codec;
use crate::drivers::error::{CalibrationError, LinkError};
use crate::drivers::reassembler::{FrameReassembler, ReassemblyStats};
use crate::drivers::sample::{CalibrationOffsets, Sample};
use crate::drivers::source::{ChunkSource, TransportEvent};
use crate::drivers::validator::{SampleValidator, Validation};
use crate::drivers::voltage_filter::VoltageFilter;
/// Receiver for everything the pipeline produces.
///
/// Only `on_sample` is required; lifecycle callbacks default to no-ops.
pub trait SampleSink {
    fn on_sample(&mut self, sample: Sample, validation: Validation);
    fn on_calibration_progress(&mut self, _current: u32, _total: u32) {}
    fn on_calibration_complete(&mut self, _offsets: CalibrationOffsets) {}
    fn on_calibration_error(&mut self, _error: CalibrationError) {}
    fn on_disconnected(&mut self) {}
}
/// Owned record of one sink callback.
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineEvent {
    Sample {
        sample: Sample,
        validation: Validation,
    },
    CalibrationProgress {
        current: u32,
        total: u32,
    },
    CalibrationComplete(CalibrationOffsets),
    CalibrationError(CalibrationError),
    Disconnected,
}
impl SampleSink for Vec<PipelineEvent> {
    fn on_sample(&mut self, sample: Sample, validation: Validation) {
        self.push(PipelineEvent::Sample { sample, validation });
    }
    fn on_calibration_progress(&mut self, current: u32, total: u32) {
        self.push(PipelineEvent::CalibrationProgress { current, total });
    }
    fn on_calibration_complete(&mut self, offsets: CalibrationOffsets) {
        self.push(PipelineEvent::CalibrationComplete(offsets));
    }
    fn on_calibration_error(&mut self, error: CalibrationError) {
        self.push(PipelineEvent::CalibrationError(error));
    }
    fn on_disconnected(&mut self) {
        self.push(PipelineEvent::Disconnected);
    }
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub samples: u64,
    pub flagged: u64,
    pub disconnects: u64,
    pub reassembly: ReassemblyStats,
}
/// Reassembly, decoding, validation and calibration for one racket link.
///
/// Every stage is owned here and mutated through `&mut self` only, so a
/// caller that feeds chunks from several threads must serialize the calls.
pub struct ImuPipeline {
    reassembler: FrameReassembler,
    validator: SampleValidator,
    calibration: CalibrationEngine,
    voltage: VoltageFilter,
    samples: u64,
    flagged: u64,
    disconnects: u64,
}
impl Default for ImuPipeline {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}
impl ImuPipeline {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            reassembler: FrameReassembler::new(),
            validator: SampleValidator::new(config.limits),
            calibration: CalibrationEngine::new(),
            voltage: VoltageFilter::new(config.voltage),
            samples: 0,
            flagged: 0,
            disconnects: 0,
        }
    }
    /// Feeds one notification payload; completed frames reach `sink` in order.
    pub fn on_chunk(&mut self, chunk: &[u8], sink: &mut impl SampleSink) {
        for frame in self.reassembler.accept(chunk) {
            let sample = codec::decode(&frame, Instant::now());
            let validation = self.validator.classify(&sample);
            if !validation.is_valid() {
                self.flagged += 1;
            }
            match self.calibration.add_sample(&sample) {
                CalibrationStep::Ignored => {}
                CalibrationStep::Progress { current, total } => {
                    sink.on_calibration_progress(current, total)
                }
                CalibrationStep::Complete(offsets) => {
                    sink.on_calibration_progress(offsets.sample_count, offsets.sample_count);
                    sink.on_calibration_complete(offsets);
                }
            }
            self.samples += 1;
            sink.on_sample(self.calibration.apply(sample), validation);
        }
    }
    /// Drops partial frame bytes and the smoothing history. A run that was
    /// collecting is abandoned, since the racket may have moved meanwhile.
    pub fn on_disconnected(&mut self, sink: &mut impl SampleSink) {
        info!("link disconnected, resetting reassembly and voltage filter");
        self.disconnects += 1;
        self.reassembler.reset();
        self.voltage.reset();
        if let CalibrationState::Collecting { progress, total } = self.calibration.state() {
            if self.calibration.cancel().is_ok() {
                sink.on_calibration_error(CalibrationError::ConnectionLost { progress, total });
            }
        }
        sink.on_disconnected();
    }
    pub fn start_calibration(&mut self, total: u32, sink: &mut impl SampleSink) {
        if let Err(e) = self.calibration.start(total) {
            info!("calibration request refused: {e}");
            sink.on_calibration_error(e);
        }
    }
    /// Returns whether a run was actually cancelled.
    pub fn cancel_calibration(&mut self) -> bool {
        match self.calibration.cancel() {
            Ok(()) => true,
            Err(e) => {
                debug!("cancel ignored: {e}");
                false
            }
        }
    }
    pub fn clear_calibration(&mut self) {
        info!("calibration offsets cleared");
        self.calibration.clear();
    }
    pub fn calibration(&self) -> &CalibrationEngine {
        &self.calibration
    }
    /// Display smoothing of a sample's voltage. Not applied to the sample itself.
    pub fn smooth_voltage(&mut self, volts: f32) -> f32 {
        self.voltage.add_sample(volts)
    }
    pub fn voltage_filter(&self) -> &VoltageFilter {
        &self.voltage
    }
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            samples: self.samples,
            flagged: self.flagged,
            disconnects: self.disconnects,
            reassembly: self.reassembler.stats(),
        }
    }
}
/// Pairs a transport source with the processing core.
pub struct SensorPipeline<S: ChunkSource> {
    source: S,
    core: ImuPipeline,
}
impl<S: ChunkSource> SensorPipeline<S> {
    pub fn new(source: S, config: &PipelineConfig) -> Self {
        Self {
            source,
            core: ImuPipeline::new(config),
        }
    }
    /// Pulls one transport event through the core. `Ok(false)` when the source
    /// had nothing to deliver.
    pub fn pump_once(&mut self, sink: &mut impl SampleSink) -> Result<bool, LinkError> {
        let Some(event) = self.source.next_event()? else {
            return Ok(false);
        };
        match event {
            TransportEvent::Chunk(bytes) => self.core.on_chunk(&bytes, sink),
            TransportEvent::Disconnected => self.core.on_disconnected(sink),
        }
        Ok(true)
    }
    /// Pumps until the source reports nothing pending.
    pub fn drain(&mut self, sink: &mut impl SampleSink) -> Result<usize, LinkError> {
        let mut events = 0;
        while self.pump_once(sink)? {
            events += 1;
        }
        Ok(events)
    }
    pub fn core(&self) -> &ImuPipeline {
        &self.core
    }
    pub fn core_mut(&mut self) -> &mut ImuPipeline {
        &mut self.core
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::codec::encode;
    use crate::drivers::sample::Vec3;
    use crate::drivers::source::ManualSource;
    use crate::drivers::validator::VoltageStatus;
    fn stream(count: u32, accel: Vec3, gyro: Vec3, voltage_raw: u16) -> Vec<u8> {
        (0..count)
            .flat_map(|i| encode(i * 20, accel, gyro, voltage_raw).as_bytes().to_vec())
            .collect()
    }
    fn samples(events: &[PipelineEvent]) -> Vec<Sample> {
        events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::Sample { sample, .. } => Some(*sample),
                _ => None,
            })
            .collect()
    }
    #[test]
    fn pipeline_decodes_fragmented_stream() {
        let bytes = stream(4, Vec3::new(0.0, 0.0, 1.0), Vec3::ZERO, 2048);
        let source = ManualSource::from_stream(&bytes, 7);
        let mut pipeline = SensorPipeline::new(source, &PipelineConfig::default());
        let mut events: Vec<PipelineEvent> = Vec::new();
        pipeline.drain(&mut events).unwrap();
        let out = samples(&events);
        assert_eq!(out.len(), 4);
        assert_eq!(
            out.iter().map(|s| s.timestamp_ms).collect::<Vec<_>>(),
            vec![0, 20, 40, 60]
        );
        assert_eq!(pipeline.core().stats().samples, 4);
    }
    #[test]
    fn flagged_samples_are_still_forwarded() {
        let mut core = ImuPipeline::default();
        let mut events: Vec<PipelineEvent> = Vec::new();
        core.on_chunk(&stream(1, Vec3::new(25.0, 0.0, 0.0), Vec3::ZERO, 4095), &mut events);
        let PipelineEvent::Sample { sample, validation } = &events[0] else {
            panic!("expected a sample");
        };
        assert_eq!(sample.accel.x, 25.0);
        assert_eq!(sample.voltage, 0.0);
        assert!(!validation.accel_in_range);
        assert_eq!(validation.voltage, VoltageStatus::Invalid);
        assert_eq!(core.stats().flagged, 1);
    }
    #[test]
    fn calibration_run_corrects_following_samples() {
        let mut core = ImuPipeline::default();
        let mut events: Vec<PipelineEvent> = Vec::new();
        let bias_a = Vec3::new(0.02, -0.01, 1.0);
        let bias_g = Vec3::new(0.8, -0.5, 0.25);
        core.start_calibration(5, &mut events);
        for chunk in stream(5, bias_a, bias_g, 2048).chunks(30) {
            core.on_chunk(chunk, &mut events);
        }
        let progress: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::CalibrationProgress { current, .. } => Some(*current),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![1, 2, 3, 4, 5]);
        assert!(events.iter().any(|e| {
            matches!(e, PipelineEvent::CalibrationComplete(o) if o.accel_offset == bias_a)
        }));
        events.clear();
        core.on_chunk(&stream(1, bias_a, bias_g, 2048), &mut events);
        let corrected = samples(&events)[0];
        assert_eq!(corrected.accel, Vec3::ZERO);
        assert_eq!(corrected.gyro, Vec3::ZERO);
    }
    #[test]
    fn disconnect_resets_partial_frame_and_aborts_run() {
        let mut core = ImuPipeline::default();
        let mut events: Vec<PipelineEvent> = Vec::new();
        core.smooth_voltage(3.9);
        core.start_calibration(10, &mut events);
        let bytes = stream(2, Vec3::ZERO, Vec3::ZERO, 2048);
        core.on_chunk(&bytes[..30], &mut events);
        core.on_chunk(&bytes[30..45], &mut events);
        assert_eq!(core.stats().reassembly.discarded_bytes, 0);
        core.on_disconnected(&mut events);
        assert_eq!(core.stats().reassembly.discarded_bytes, 15);
        assert!(events.contains(&PipelineEvent::CalibrationError(
            CalibrationError::ConnectionLost { progress: 1, total: 10 }
        )));
        assert_eq!(events.last(), Some(&PipelineEvent::Disconnected));
        assert_eq!(core.voltage_filter().current(), None);
        assert!(!core.calibration().is_collecting());
        // the stale 15 bytes must not be glued onto the next session's frame
        events.clear();
        core.on_chunk(&bytes[30..], &mut events);
        assert_eq!(samples(&events).len(), 1);
        assert_eq!(samples(&events)[0].timestamp_ms, 20);
    }
    #[test]
    fn duplicate_start_reports_error() {
        let mut core = ImuPipeline::default();
        let mut events: Vec<PipelineEvent> = Vec::new();
        core.start_calibration(3, &mut events);
        core.start_calibration(3, &mut events);
        assert_eq!(
            events,
            vec![PipelineEvent::CalibrationError(CalibrationError::AlreadyRunning {
                progress: 0,
                total: 3
            })]
        );
        assert!(core.cancel_calibration());
        assert!(!core.cancel_calibration());
    }
}
