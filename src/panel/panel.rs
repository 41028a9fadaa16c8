use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::form::SettingsForm;
use crate::config::Config;
use crate::runtime::{CoordinatorHandle, PortSender, Response, RuntimeMessage};

/// Tab-capture id issuance capability
#[async_trait::async_trait]
pub trait TabCapture: Send + Sync {
    /// Stream id that lets the audio host capture `target_tab`'s audio
    async fn get_capture_stream_id(&self, target_tab: u32) -> Result<String>;
}

/// Format a gain-reduction sample for display
pub fn format_reduction(reduction: f32, unit: &str) -> String {
    format!("{:.1} {}", reduction, unit)
}

/// User-facing control surface
///
/// Starts the capture on the first apply, forwards settings over the control
/// connection and keeps the latest telemetry readout.
pub struct ControlPanel {
    coordinator: CoordinatorHandle,
    tab_capture: Arc<dyn TabCapture>,
    target_tab: u32,
    port: PortSender,
    stream_sent: bool,
    readout: watch::Receiver<Option<String>>,
    listener: JoinHandle<()>,
}

impl ControlPanel {
    /// Connect to the coordinator and start listening for telemetry
    pub async fn open(
        coordinator: CoordinatorHandle,
        tab_capture: Arc<dyn TabCapture>,
        target_tab: u32,
        config: &Config,
    ) -> Result<Self> {
        let port = coordinator
            .connect(&config.coordinator.control_port_name)
            .await
            .context("Failed to open control connection")?;
        info!("Control panel opened for tab {}", target_tab);

        let (port, inbound) = port.split();
        let (readout_tx, readout) = watch::channel(None);
        let listener = tokio::spawn(Self::listen(
            inbound,
            readout_tx,
            config.panel.reduction_unit.clone(),
        ));

        Ok(Self {
            coordinator,
            tab_capture,
            target_tab,
            port,
            stream_sent: false,
            readout,
            listener,
        })
    }

    async fn listen(
        mut inbound: mpsc::Receiver<RuntimeMessage>,
        readout: watch::Sender<Option<String>>,
        unit: String,
    ) {
        while let Some(message) = inbound.recv().await {
            match message {
                RuntimeMessage::GainReductionUpdate(sample) => {
                    readout.send_replace(Some(format_reduction(sample.reduction, &unit)));
                }
                other => debug!("Message from coordinator: {}", other),
            }
        }
        debug!("Control connection closed by coordinator");
    }

    /// Apply the form: start the stream on first use, then send the settings
    pub async fn on_apply(&mut self, form: &SettingsForm) -> Result<()> {
        info!("Apply requested");
        let result = self.apply(form).await;
        if let Err(e) = &result {
            error!("Apply failed: {:#}", e);
        }
        result
    }

    async fn apply(&mut self, form: &SettingsForm) -> Result<()> {
        let settings = form.parse()?;

        if !self.stream_sent {
            info!("Capturing media stream...");
            let stream_id = self
                .tab_capture
                .get_capture_stream_id(self.target_tab)
                .await
                .context("Failed to obtain capture stream id")?;
            info!("Stream id captured: {}", stream_id);

            let response = self
                .coordinator
                .request(RuntimeMessage::start_streaming(stream_id))
                .await?;
            if !response.is_success() {
                bail!(
                    "Failed to start streaming: {}",
                    response.error().unwrap_or("no response received")
                );
            }

            info!("Streaming started successfully");
            self.stream_sent = true;
        }

        debug!("Sending updated compressor settings: {:?}", settings);
        self.port
            .post(RuntimeMessage::UpdateSettings(settings))
            .await
    }

    /// Ask the coordinator whether an audio host exists
    pub async fn host_exists(&self) -> Result<bool> {
        match self
            .coordinator
            .request(RuntimeMessage::CheckHostExists)
            .await?
        {
            Response::Exists { ready } => Ok(ready),
            other => bail!(
                "Unexpected reply to check-host-exists: {}",
                other.error().unwrap_or("no status")
            ),
        }
    }

    pub fn stream_sent(&self) -> bool {
        self.stream_sent
    }

    /// Latest formatted telemetry readout
    pub fn readout(&self) -> Option<String> {
        self.readout.borrow().clone()
    }

    pub fn watch_readout(&self) -> watch::Receiver<Option<String>> {
        self.readout.clone()
    }
}

impl Drop for ControlPanel {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_reduction_one_decimal() {
        assert_eq!(format_reduction(-13.46, "dB"), "-13.5 dB");
        assert_eq!(format_reduction(0.0, "dB"), "0.0 dB");
    }
}
