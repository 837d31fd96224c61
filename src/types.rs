// src/types.rs
use crate::drivers::{PipelineEvent, PipelineStats};

// 前端发给采集线程的命令
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    StartCalibration(u32),
    CancelCalibration,
    ClearCalibration,
    // 请求一次统计快照
    ReportStats,
    Shutdown,
}

// 采集线程发给前端的消息
#[derive(Clone, Debug, PartialEq)]
pub enum EngineMessage {
    Event(PipelineEvent),
    // 平滑后的电池电压 (仅用于显示)
    BatteryVoltage(f32),
    Stats(PipelineStats),
    // 线程退出; 附带错误原因 (如果有)
    Stopped(Option<String>),
}
