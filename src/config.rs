use anyhow::{bail, Result};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub coordinator: CoordinatorConfig,
    pub host: HostConfig,
    pub panel: PanelConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Name a control panel must connect with to receive telemetry
    pub control_port_name: String,
    /// How long a caller waits for the audio host's readiness signal
    pub ready_timeout_ms: u64,
    /// Capacity of every message channel
    pub channel_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            control_port_name: "panel-control".to_string(),
            ready_timeout_ms: 10_000,
            channel_capacity: 64,
        }
    }
}

impl CoordinatorConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub document_url: String,
    pub reasons: Vec<String>,
    pub justification: String,
    /// Period of gain-reduction telemetry
    pub telemetry_interval_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            document_url: "audio-host.html".to_string(),
            reasons: vec!["AUDIO_PLAYBACK".to_string()],
            justification: "Required for audio compression.".to_string(),
            telemetry_interval_ms: 100,
        }
    }
}

impl HostConfig {
    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Suffix appended to the gain-reduction readout
    pub reduction_unit: String,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            reduction_unit: "dB".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the runtime cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.coordinator.channel_capacity == 0 {
            bail!("coordinator.channel_capacity must be greater than zero");
        }
        if self.coordinator.ready_timeout_ms == 0 {
            bail!("coordinator.ready_timeout_ms must be greater than zero");
        }
        if self.host.telemetry_interval_ms == 0 {
            bail!("host.telemetry_interval_ms must be greater than zero");
        }
        Ok(())
    }
}
