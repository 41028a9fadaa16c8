// End-to-end tests driving the control panel against a live coordinator and audio host

mod common;

use anyhow::Result;
use common::{eventually, fast_config, wait_for_session};
use std::sync::Arc;
use std::time::Duration;
use tab_compressor::sim::{SimulatedCapture, SimulatedEngine, SimulatedTabCapture};
use tab_compressor::{AudioParam, ControlPanel, Extension, SettingsForm};

fn form(threshold: &str, ratio: &str, gain: &str) -> SettingsForm {
    SettingsForm {
        threshold: threshold.to_string(),
        ratio: ratio.to_string(),
        attack: "0.01".to_string(),
        release: "0.2".to_string(),
        gain: gain.to_string(),
    }
}

struct Harness {
    ext: Extension,
    capture: Arc<SimulatedCapture>,
    engine: SimulatedEngine,
    tabs: Arc<SimulatedTabCapture>,
    panel: ControlPanel,
}

async fn harness(capture: SimulatedCapture) -> Result<Harness> {
    let config = fast_config();
    let capture = Arc::new(capture);
    let engine = SimulatedEngine::new(-6.0);
    let tabs = Arc::new(SimulatedTabCapture::new());

    let ext = Extension::start(&config, capture.clone(), Arc::new(engine.clone()));
    let panel = ControlPanel::open(ext.handle.clone(), tabs.clone(), 42, &config).await?;

    Ok(Harness {
        ext,
        capture,
        engine,
        tabs,
        panel,
    })
}

#[tokio::test]
async fn test_first_and_second_apply() -> Result<()> {
    let mut h = harness(SimulatedCapture::new()).await?;

    // First click: capture id, start-streaming, then settings
    h.panel.on_apply(&form("-24", "4", "1")).await?;

    assert!(h.panel.stream_sent());
    assert_eq!(h.tabs.issued(), 1);
    assert!(h.ext.coordinator.snapshot().await.stream_initialized);
    eventually(|| h.engine.last_param(AudioParam::Threshold) == Some(-24.0)).await;
    assert_eq!(h.engine.last_param(AudioParam::Ratio), Some(4.0));

    // Second click: settings only
    h.panel.on_apply(&form("-30", "8", "0.5")).await?;

    eventually(|| h.engine.last_param(AudioParam::Threshold) == Some(-30.0)).await;
    assert_eq!(h.engine.last_param(AudioParam::Ratio), Some(8.0));
    assert_eq!(h.engine.last_param(AudioParam::Gain), Some(0.5));
    assert_eq!(h.tabs.issued(), 1, "No new capture id on second apply");
    assert_eq!(h.capture.captures(), 1);
    assert_eq!(h.engine.contexts_created(), 1);
    Ok(())
}

#[tokio::test]
async fn test_failed_start_aborts_apply_and_allows_retry() -> Result<()> {
    let mut h = harness(SimulatedCapture::denying()).await?;

    let err = h.panel.on_apply(&form("-24", "4", "1")).await.unwrap_err();
    assert!(err.to_string().contains("Failed to start streaming"));
    assert!(format!("{:#}", err).contains("Permission denied"));
    assert!(!h.panel.stream_sent());
    assert!(!h.ext.coordinator.snapshot().await.stream_initialized);
    assert_eq!(h.engine.last_param(AudioParam::Threshold), None);

    h.capture.set_denied(false);
    h.panel.on_apply(&form("-24", "4", "1")).await?;

    assert!(h.panel.stream_sent());
    assert_eq!(h.tabs.issued(), 2);
    eventually(|| h.engine.last_param(AudioParam::Threshold) == Some(-24.0)).await;
    Ok(())
}

#[tokio::test]
async fn test_invalid_form_sends_nothing() -> Result<()> {
    let mut h = harness(SimulatedCapture::new()).await?;

    let err = h.panel.on_apply(&form("-24", "four", "1")).await.unwrap_err();
    assert!(err.to_string().contains("ratio"));
    assert_eq!(h.tabs.issued(), 0);
    assert!(!h.panel.stream_sent());
    Ok(())
}

#[tokio::test]
async fn test_readout_shows_latest_reduction() -> Result<()> {
    let mut h = harness(SimulatedCapture::new()).await?;
    assert_eq!(h.panel.readout(), None);

    h.panel.on_apply(&form("-24", "4", "1")).await?;

    let mut readout = h.panel.watch_readout();
    tokio::time::timeout(
        Duration::from_secs(2),
        readout.wait_for(|text| text.as_deref() == Some("-13.5 dB")),
    )
    .await??;
    assert_eq!(h.panel.readout().as_deref(), Some("-13.5 dB"));
    Ok(())
}

#[tokio::test]
async fn test_host_exists_follows_provisioning() -> Result<()> {
    let mut h = harness(SimulatedCapture::new()).await?;

    assert!(!h.panel.host_exists().await?);
    h.panel.on_apply(&form("-24", "4", "1")).await?;
    assert!(h.panel.host_exists().await?);
    Ok(())
}

#[tokio::test]
async fn test_closing_panel_detaches_control_connection() -> Result<()> {
    let h = harness(SimulatedCapture::new()).await?;
    wait_for_session(&h.ext.coordinator, |s| s.control_attached).await;

    drop(h.panel);

    wait_for_session(&h.ext.coordinator, |s| !s.control_attached).await;
    Ok(())
}
