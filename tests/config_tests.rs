use anyhow::Result;
use std::fs;
use tab_compressor::Config;
use tempfile::TempDir;

#[test]
fn test_config_defaults() {
    let config = Config::default();

    assert_eq!(config.coordinator.control_port_name, "panel-control");
    assert_eq!(config.coordinator.ready_timeout_ms, 10_000);
    assert_eq!(config.host.telemetry_interval_ms, 100);
    assert_eq!(config.host.reasons, vec!["AUDIO_PLAYBACK".to_string()]);
    assert_eq!(config.panel.reduction_unit, "dB");
}

#[test]
fn test_config_load_overrides_and_fills_defaults() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("tab-compressor.toml");
    fs::write(
        &path,
        r#"
[coordinator]
ready_timeout_ms = 250

[host]
telemetry_interval_ms = 50
"#,
    )?;

    let config = Config::load(path.to_str().unwrap())?;

    assert_eq!(config.coordinator.ready_timeout_ms, 250);
    assert_eq!(config.coordinator.control_port_name, "panel-control");
    assert_eq!(config.host.telemetry_interval_ms, 50);
    assert_eq!(config.host.document_url, "audio-host.html");
    assert_eq!(config.panel.reduction_unit, "dB");
    Ok(())
}

#[test]
fn test_shipped_config_loads() -> Result<()> {
    let config = Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config/tab-compressor"))?;

    assert_eq!(config.coordinator.channel_capacity, 64);
    assert_eq!(config.host.justification, "Required for audio compression.");
    Ok(())
}

#[test]
fn test_missing_config_is_an_error() {
    assert!(Config::load("/nonexistent/tab-compressor").is_err());
}

fn load_from(contents: &str) -> Result<Config> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("tab-compressor.toml");
    fs::write(&path, contents)?;
    Config::load(path.to_str().unwrap())
}

#[test]
fn test_zero_channel_capacity_is_rejected() {
    let err = load_from("[coordinator]\nchannel_capacity = 0\n").unwrap_err();
    assert!(err.to_string().contains("channel_capacity"), "{}", err);
}

#[test]
fn test_zero_telemetry_interval_is_rejected() {
    let err = load_from("[host]\ntelemetry_interval_ms = 0\n").unwrap_err();
    assert!(err.to_string().contains("telemetry_interval_ms"), "{}", err);
}

#[test]
fn test_zero_ready_timeout_is_rejected() {
    let err = load_from("[coordinator]\nready_timeout_ms = 0\n").unwrap_err();
    assert!(err.to_string().contains("ready_timeout_ms"), "{}", err);
}
