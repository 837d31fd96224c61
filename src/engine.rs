// src/engine.rs
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use log::{debug, error, info};
use crate::config::PipelineConfig;
use crate::drivers::{ChunkSource, LinkError, PipelineEvent, SensorPipeline};
use crate::types::{Command, EngineMessage};

/// Front-end side of a running ingestion thread.
pub struct EngineHandle {
    commands: Sender<Command>,
    messages: Receiver<EngineMessage>,
    thread: Option<JoinHandle<()>>,
}

impl EngineHandle {
    pub fn send(&self, cmd: Command) -> Result<(), LinkError> {
        self.commands.send(cmd).map_err(|_| LinkError::EngineGone)
    }
    pub fn messages(&self) -> &Receiver<EngineMessage> {
        &self.messages
    }
    /// Asks the thread to stop and waits for it.
    pub fn shutdown(mut self) {
        self.commands.send(Command::Shutdown).ok();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("ingestion thread panicked");
            }
        }
    }
}

/// Starts the ingestion thread. All pipeline state lives on that thread;
/// the front end talks to it only through the two channels.
pub fn spawn<S>(source: S, config: PipelineConfig) -> EngineHandle
where
    S: ChunkSource + Send + 'static,
{
    let (tx_cmd, rx_cmd) = mpsc::channel();
    let (tx, rx) = mpsc::channel();
    let thread = spawn_thread(source, config, tx, rx_cmd);
    EngineHandle {
        commands: tx_cmd,
        messages: rx,
        thread: Some(thread),
    }
}

pub fn spawn_thread<S>(
    source: S,
    config: PipelineConfig,
    tx: Sender<EngineMessage>,
    rx_cmd: Receiver<Command>,
) -> JoinHandle<()>
where
    S: ChunkSource + Send + 'static,
{
    thread::spawn(move || {
        info!("ingestion engine ready");
        let mut pipeline = SensorPipeline::new(source, &config);
        let mut events: Vec<PipelineEvent> = Vec::new();
        loop {
            // 1. 处理前端命令
            for _ in 0..10 {
                let cmd = match rx_cmd.try_recv() {
                    Ok(cmd) => cmd,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        info!("command channel closed, ingestion engine stopping");
                        return;
                    }
                };
                debug!("command: {cmd:?}");
                match cmd {
                    Command::StartCalibration(total) => {
                        pipeline.core_mut().start_calibration(total, &mut events)
                    }
                    Command::CancelCalibration => {
                        pipeline.core_mut().cancel_calibration();
                    }
                    Command::ClearCalibration => pipeline.core_mut().clear_calibration(),
                    Command::ReportStats => {
                        if tx.send(EngineMessage::Stats(pipeline.core().stats())).is_err() {
                            return;
                        }
                    }
                    Command::Shutdown => {
                        info!("ingestion engine stopping");
                        tx.send(EngineMessage::Stopped(None)).ok();
                        return;
                    }
                }
            }

            // 2. 数据流
            let delivered = match pipeline.pump_once(&mut events) {
                Ok(delivered) => delivered,
                Err(e) => {
                    error!("transport failed: {e}");
                    forward(&mut events, &mut pipeline, &tx);
                    tx.send(EngineMessage::Stopped(Some(e.to_string()))).ok();
                    return;
                }
            };

            // 3. 发送事件和显示电压
            if !forward(&mut events, &mut pipeline, &tx) {
                info!("front end hung up, ingestion engine stopping");
                return;
            }
            if !delivered {
                thread::sleep(config.idle_poll());
            }
        }
    })
}

/// Sends buffered events to the front end. Returns false once nobody listens.
fn forward<S: ChunkSource>(
    events: &mut Vec<PipelineEvent>,
    pipeline: &mut SensorPipeline<S>,
    tx: &Sender<EngineMessage>,
) -> bool {
    for event in events.drain(..) {
        let volts = match &event {
            PipelineEvent::Sample { sample, .. } => Some(sample.voltage),
            _ => None,
        };
        if tx.send(EngineMessage::Event(event)).is_err() {
            return false;
        }
        if let Some(volts) = volts {
            let smoothed = pipeline.core_mut().smooth_voltage(volts);
            if pipeline.core().voltage_filter().current().is_some()
                && tx.send(EngineMessage::BatteryVoltage(smoothed)).is_err()
            {
                return false;
            }
        }
    }
    true
}
