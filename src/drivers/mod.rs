// src/drivers/mod.rs
// 声明同级目录下的子模块文件
pub mod calibration;
pub mod codec;
pub mod error;
pub mod pipeline;
pub mod reassembler;
pub mod sample;
pub mod sim;
pub mod source;
pub mod validator;
pub mod voltage_filter;
// 公开导出这些模块里的结构体，方便外部调用
pub use calibration::{CalibrationEngine, CalibrationState, CalibrationStep};
pub use codec::{decode, encode, voltage_from_raw, INVALID_VOLTAGE};
pub use error::{CalibrationError, LinkError};
pub use pipeline::{ImuPipeline, PipelineEvent, PipelineStats, SampleSink, SensorPipeline};
pub use reassembler::{Frame, FrameReassembler, ReassemblyStats, FRAME_LEN};
pub use sample::{CalibrationOffsets, Sample, Vec3};
pub use sim::SimulatedRacket;
pub use source::{ChunkSource, ManualSource, SerialSource, TransportEvent};
pub use validator::{SampleValidator, Validation, ValidationLimits, VoltageStatus};
pub use voltage_filter::{VoltageFilter, VoltageFilterConfig};
