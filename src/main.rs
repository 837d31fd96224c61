// src/main.rs
use std::time::Duration;
use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use serde::Serialize;
use racket_imu::drivers::{
    ChunkSource, PipelineEvent, Sample, SerialSource, SimulatedRacket, Validation,
};
use racket_imu::{spawn, Command, EngineMessage, PipelineConfig};

/// Live IMU stream from the smart racket.
#[derive(Parser)]
#[command(name = "racket-imu", about = "Decode, calibrate and display the racket's IMU stream")]
struct Cli {
    /// Serial device of the BLE-UART bridge (e.g. /dev/ttyACM0).
    #[arg(long, conflicts_with = "simulate")]
    port: Option<String>,

    #[arg(long, default_value_t = 115_200)]
    baud: u32,

    /// Use the built-in racket emulator instead of hardware.
    #[arg(long)]
    simulate: bool,

    /// Emulator seed.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// JSON pipeline configuration.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Start a zero-point calibration run right away (keep the racket still).
    #[arg(long)]
    calibrate: bool,

    /// Print one JSON object per sample instead of a text line.
    #[arg(long)]
    json: bool,

    /// Stop after this many samples.
    #[arg(long)]
    limit: Option<u64>,
}

#[derive(Serialize)]
struct SampleLine<'a> {
    #[serde(flatten)]
    sample: &'a Sample,
    validation: &'a Validation,
    display_voltage: Option<f32>,
}

fn open_source(cli: &Cli) -> Result<Box<dyn ChunkSource + Send>> {
    match &cli.port {
        Some(path) => {
            let source = SerialSource::open(path, cli.baud, Duration::from_millis(50))
                .with_context(|| format!("failed to open serial bridge {path}"))?;
            Ok(Box::new(source))
        }
        None => {
            if !cli.simulate {
                info!("no --port given, using the racket emulator");
            }
            Ok(Box::new(SimulatedRacket::new(cli.seed).paced()))
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let source = open_source(&cli)?;
    let engine = spawn(source, config);
    if cli.calibrate {
        engine.send(Command::StartCalibration(config.calibration_samples))?;
    }

    let mut delivered = 0u64;
    let mut display_voltage = None;
    let mut failure = None;
    let mut stopping = false;
    for msg in engine.messages().iter() {
        match msg {
            EngineMessage::Event(PipelineEvent::Sample { sample, validation }) => {
                delivered += 1;
                if cli.json {
                    let line = SampleLine {
                        sample: &sample,
                        validation: &validation,
                        display_voltage,
                    };
                    println!("{}", serde_json::to_string(&line)?);
                } else {
                    let flag = if validation.is_valid() { "" } else { " [flagged]" };
                    match display_voltage {
                        Some(v) => println!("{sample} battery={v:.2}V{flag}"),
                        None => println!("{sample} battery=--{flag}"),
                    }
                }
                if !stopping && cli.limit.is_some_and(|limit| delivered >= limit) {
                    stopping = true;
                    engine.send(Command::ReportStats)?;
                    engine.send(Command::Shutdown)?;
                }
            }
            EngineMessage::Event(PipelineEvent::CalibrationProgress { current, total }) => {
                if current == total || current % 10 == 0 {
                    eprintln!("calibrating... {current}/{total}");
                }
            }
            EngineMessage::Event(PipelineEvent::CalibrationComplete(offsets)) => {
                eprintln!("calibration complete: {offsets}");
            }
            EngineMessage::Event(PipelineEvent::CalibrationError(e)) => {
                warn!("calibration failed: {e}");
            }
            EngineMessage::Event(PipelineEvent::Disconnected) => {
                display_voltage = None;
                eprintln!("racket disconnected");
            }
            EngineMessage::BatteryVoltage(v) => display_voltage = Some(v),
            EngineMessage::Stats(stats) => {
                eprintln!(
                    "samples={} flagged={} frames={} oversized={} overflow_resets={} disconnects={}",
                    stats.samples,
                    stats.flagged,
                    stats.reassembly.frames(),
                    stats.reassembly.oversized_chunks,
                    stats.reassembly.overflow_resets,
                    stats.disconnects
                );
            }
            EngineMessage::Stopped(reason) => {
                failure = reason;
                break;
            }
        }
    }
    engine.shutdown();
    if let Some(reason) = failure {
        bail!("ingestion stopped: {reason}");
    }
    Ok(())
}
