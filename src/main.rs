use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tab_compressor::sim::{SimulatedCapture, SimulatedEngine, SimulatedTabCapture};
use tab_compressor::{CompressorSettings, Config, ControlPanel, Extension, SettingsForm};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Run the coordinator, audio host and control panel against simulated capture
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Config file (without extension)
    #[arg(long)]
    config: Option<String>,

    #[arg(long, default_value_t = -24.0, allow_hyphen_values = true)]
    threshold: f32,

    #[arg(long, default_value_t = 4.0)]
    ratio: f32,

    #[arg(long, default_value_t = 0.01)]
    attack: f32,

    #[arg(long, default_value_t = 0.2)]
    release: f32,

    #[arg(long, default_value_t = 1.0)]
    gain: f32,

    /// Level of the simulated tab audio in dB
    #[arg(long, default_value_t = -6.0, allow_hyphen_values = true)]
    input_level: f32,

    /// How long to show telemetry before exiting
    #[arg(long, default_value_t = 2)]
    seconds: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let cfg = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    info!("Tab compressor v{}", env!("CARGO_PKG_VERSION"));
    info!("Control port: {}", cfg.coordinator.control_port_name);
    info!("Telemetry every {}ms", cfg.host.telemetry_interval_ms);

    let extension = Extension::start(
        &cfg,
        Arc::new(SimulatedCapture::new()),
        Arc::new(SimulatedEngine::new(args.input_level)),
    );

    let mut panel = ControlPanel::open(
        extension.handle.clone(),
        Arc::new(SimulatedTabCapture::new()),
        1,
        &cfg,
    )
    .await?;

    let form = SettingsForm::from(CompressorSettings {
        threshold: args.threshold,
        ratio: args.ratio,
        attack: args.attack,
        release: args.release,
        gain: args.gain,
    });
    panel.on_apply(&form).await?;

    let mut readout = panel.watch_readout();
    let deadline = tokio::time::sleep(Duration::from_secs(args.seconds));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            changed = readout.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(text) = readout.borrow_and_update().clone() {
                    info!("Gain reduction: {}", text);
                }
            }
        }
    }

    let snapshot = extension.coordinator.snapshot().await;
    info!("Session: {}", serde_json::to_string(&snapshot)?);

    drop(panel);
    extension.shutdown().await;
    Ok(())
}
