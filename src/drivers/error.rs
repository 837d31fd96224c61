use thiserror::Error;
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("transport source is closed")]
    SourceClosed,
    #[error("serial link error: {0}")]
    Serial(String),
    #[error("i/o error on transport: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("engine thread is gone")]
    EngineGone,
}
impl From<serialport::Error> for LinkError {
    fn from(value: serialport::Error) -> Self {
        LinkError::Serial(value.to_string())
    }
}
impl From<serde_json::Error> for LinkError {
    fn from(value: serde_json::Error) -> Self {
        LinkError::Config(value.to_string())
    }
}
/// Reasons a calibration request was refused. None of these are fatal.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("a calibration run is already collecting ({progress}/{total})")]
    AlreadyRunning { progress: u32, total: u32 },
    #[error("a calibration run needs at least one sample")]
    EmptyRun,
    #[error("no calibration run is collecting")]
    NotCollecting,
    #[error("connection lost during calibration after {progress}/{total} samples")]
    ConnectionLost { progress: u32, total: u32 },
}
