use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::capability::{AudioEngine, MediaCapture};
use super::graph::AudioGraph;
use crate::config::HostConfig;
use crate::error::ProtocolError;
use crate::runtime::{
    CompressorSettings, CoordinatorHandle, Envelope, GainReduction, Response, RuntimeMessage,
};

/// Isolated context owning the live audio graph
///
/// Commands arrive one at a time from the coordinator. The host keeps its own
/// guard against building the graph twice and streams gain-reduction samples
/// back to the coordinator while a graph exists.
pub struct AudioHost {
    coordinator: CoordinatorHandle,
    capture: Arc<dyn MediaCapture>,
    engine: Arc<dyn AudioEngine>,
    telemetry_interval: Duration,

    /// Shared with the telemetry task, which only reads the reduction
    graph: Arc<Mutex<Option<AudioGraph>>>,

    /// One task per constructed graph
    telemetry_task: Option<JoinHandle<()>>,
}

impl AudioHost {
    pub fn new(
        coordinator: CoordinatorHandle,
        capture: Arc<dyn MediaCapture>,
        engine: Arc<dyn AudioEngine>,
        config: &HostConfig,
    ) -> Self {
        Self {
            coordinator,
            capture,
            engine,
            telemetry_interval: config.telemetry_interval(),
            graph: Arc::new(Mutex::new(None)),
            telemetry_task: None,
        }
    }

    /// Run the host on its own task; returns its command sender
    pub fn spawn(self, capacity: usize) -> (mpsc::Sender<Envelope>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = tokio::spawn(self.run(rx));
        (tx, handle)
    }

    /// Announce readiness, then handle commands until the inbox closes
    pub async fn run(mut self, mut inbox: mpsc::Receiver<Envelope>) {
        info!("Audio host initialized");

        if let Err(e) = self.announce_ready().await {
            error!("Failed to report readiness: {:#}", e);
        }

        while let Some(Envelope { message, reply }) = inbox.recv().await {
            debug!("Audio host received {}", message);
            let response = self.handle(message).await;
            Envelope::respond(reply, response);
        }

        info!("Audio host inbox closed, shutting down");
        self.stop_processing().await;
    }

    pub async fn announce_ready(&self) -> Result<()> {
        self.coordinator
            .send(RuntimeMessage::HostReady)
            .await
            .context("Failed to send host-ready")?;
        info!("Audio host reported ready");
        Ok(())
    }

    pub async fn handle(&mut self, message: RuntimeMessage) -> Response {
        match message {
            RuntimeMessage::ProcessStream(req) => self.process_stream(&req.stream_id).await.into(),
            RuntimeMessage::UpdateSettings(settings) => {
                self.update_settings(&settings).await.into()
            }
            RuntimeMessage::StopProcessing => {
                self.stop_processing().await;
                Response::ok()
            }
            other => {
                warn!("Unknown message type received in audio host: {}", other);
                Response::failure(ProtocolError::UnknownMessage(other.kind().to_string()))
            }
        }
    }

    /// Capture the stream and build the graph, unless one already exists
    pub async fn process_stream(&mut self, stream_id: &str) -> Result<()> {
        if self.has_graph().await {
            warn!("Audio graph already exists. Skipping re-initialization.");
            return Ok(());
        }

        info!("Accessing media stream with id: {}", stream_id);
        let media = self
            .capture
            .capture_media_stream(stream_id)
            .await
            .map_err(|e| {
                error!("Media capture failed: {:#}", e);
                ProtocolError::Capture(format!("{:#}", e))
            })?;

        let graph = AudioGraph::build(self.engine.as_ref(), &media)?;
        *self.graph.lock().await = Some(graph);
        info!("Audio nodes connected. Compression ready.");

        self.start_telemetry();
        Ok(())
    }

    pub async fn update_settings(&self, settings: &CompressorSettings) -> Result<()> {
        let mut guard = self.graph.lock().await;
        let Some(graph) = guard.as_mut() else {
            error!("Compressor not initialized yet. Cannot apply settings.");
            return Err(ProtocolError::NotInitialized.into());
        };

        info!("Updating compressor settings: {:?}", settings);
        graph.apply(settings)?;
        Ok(())
    }

    /// Stop telemetry and tear the graph down
    pub async fn stop_processing(&mut self) {
        if let Some(task) = self.telemetry_task.take() {
            task.abort();
        }
        if let Some(graph) = self.graph.lock().await.take() {
            graph.close();
            info!("Audio graph torn down");
        }
    }

    pub async fn has_graph(&self) -> bool {
        self.graph.lock().await.is_some()
    }

    /// Node parameters as currently applied
    pub async fn current_settings(&self) -> Option<CompressorSettings> {
        self.graph.lock().await.as_ref().and_then(AudioGraph::settings)
    }

    pub fn telemetry_running(&self) -> bool {
        self.telemetry_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    fn start_telemetry(&mut self) {
        if self.telemetry_running() {
            return;
        }

        let graph = Arc::clone(&self.graph);
        let coordinator = self.coordinator.clone();
        let period = self.telemetry_interval;

        self.telemetry_task = Some(tokio::spawn(async move {
            debug!("Telemetry task started ({:?} period)", period);
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                let reduction = graph.lock().await.as_ref().map(AudioGraph::reduction);
                let Some(reduction) = reduction else {
                    continue;
                };

                let sample = RuntimeMessage::GainReductionUpdate(GainReduction { reduction });
                if coordinator.send(sample).await.is_err() {
                    debug!("Coordinator gone, telemetry task exiting");
                    break;
                }
            }
        }));
    }
}

impl Drop for AudioHost {
    fn drop(&mut self) {
        if let Some(task) = self.telemetry_task.take() {
            task.abort();
        }
    }
}
