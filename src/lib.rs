//! Ingestion core for the smart racket's IMU link: reassembles BLE
//! notification chunks into 30-byte reports, decodes and range-checks them,
//! applies zero-point calibration and smooths the battery voltage for display.
pub mod config;
pub mod drivers;
pub mod engine;
pub mod types;
pub use config::PipelineConfig;
pub use drivers::{
    CalibrationEngine, CalibrationOffsets, ChunkSource, FrameReassembler, ImuPipeline,
    LinkError, PipelineEvent, Sample, SampleSink, SampleValidator, SensorPipeline, Validation,
    Vec3, VoltageFilter,
};
pub use engine::{spawn, EngineHandle};
pub use types::{Command, EngineMessage};
