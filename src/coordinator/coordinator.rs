use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::provision::{HostDocumentSpec, HostDocuments};
use super::session::{ControlConnection, Session, SessionSnapshot};
use crate::config::{Config, CoordinatorConfig};
use crate::error::ProtocolError;
use crate::runtime::{
    CompressorSettings, CoordinatorHandle, CoordinatorInbox, CoordinatorInput, Envelope,
    GainReduction, HostLink, PortEndpoint, Response, RuntimeMessage,
};

/// Long-lived hub between the control panel and the audio host
///
/// Owns the session, provisions the audio host on demand and relays commands
/// one way and telemetry the other. Inbound messages are handled in order;
/// work that has to wait on the audio host runs on its own task so the inbox
/// keeps draining (the readiness signal arrives through that same inbox).
pub struct Coordinator {
    config: CoordinatorConfig,
    document: HostDocumentSpec,
    documents: Arc<dyn HostDocuments>,
    host: HostLink,
    handle: CoordinatorHandle,
    session: Mutex<Session>,

    /// Serializes provisioning so concurrent callers share one creation
    provision_lock: Mutex<()>,

    /// Serializes start/stop so a stream is only requested once
    stream_lock: Mutex<()>,
}

impl Coordinator {
    pub fn new(
        config: &Config,
        documents: Arc<dyn HostDocuments>,
        host: HostLink,
        handle: CoordinatorHandle,
    ) -> Arc<Self> {
        Arc::new(Self {
            config: config.coordinator.clone(),
            document: HostDocumentSpec::from(&config.host),
            documents,
            host,
            handle,
            session: Mutex::new(Session::new()),
            provision_lock: Mutex::new(()),
            stream_lock: Mutex::new(()),
        })
    }

    pub fn spawn(self: &Arc<Self>, inbox: CoordinatorInbox) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run(inbox))
    }

    /// Handle inbound messages until every handle is dropped
    pub async fn run(self: Arc<Self>, mut inbox: CoordinatorInbox) {
        info!("Coordinator started");

        while let Some(input) = inbox.recv().await {
            match input {
                CoordinatorInput::Message(Envelope { message, reply }) => {
                    self.dispatch(message, reply).await
                }
                CoordinatorInput::Connect { name, port } => self.attach_control(name, port).await,
                CoordinatorInput::Port {
                    connection,
                    message,
                } => self.handle_port_message(connection, message).await,
                CoordinatorInput::Disconnect { connection } => {
                    self.detach_control(connection).await
                }
            }
        }

        info!("Coordinator inbox closed");
    }

    async fn dispatch(
        self: &Arc<Self>,
        message: RuntimeMessage,
        reply: Option<tokio::sync::oneshot::Sender<Response>>,
    ) {
        debug!("Coordinator received {}", message);

        match message {
            RuntimeMessage::HostReady => {
                self.handle_readiness_signal().await;
                Envelope::respond(reply, Response::ok());
            }
            RuntimeMessage::GainReductionUpdate(sample) => {
                self.handle_telemetry(sample).await;
                Envelope::respond(reply, Response::ok());
            }
            RuntimeMessage::CheckHostExists => {
                let this = Arc::clone(self);
                tokio::spawn(async move {
                    let response = match this.handle_existence_query().await {
                        Ok(exists) => Response::exists(exists),
                        Err(e) => Response::failure(format!("{:#}", e)),
                    };
                    Envelope::respond(reply, response);
                });
            }
            RuntimeMessage::StartStreaming(req) => {
                let this = Arc::clone(self);
                tokio::spawn(async move {
                    let response = this.handle_start_streaming(&req.stream_id).await;
                    Envelope::respond(reply, response);
                });
            }
            RuntimeMessage::UpdateSettings(settings) => match reply {
                Some(reply) => {
                    let this = Arc::clone(self);
                    tokio::spawn(async move {
                        let response = this.handle_settings_update_confirmed(settings).await;
                        Envelope::respond(Some(reply), response);
                    });
                }
                None => self.handle_settings_update(settings).await,
            },
            RuntimeMessage::StopProcessing => {
                let this = Arc::clone(self);
                tokio::spawn(async move {
                    let response = this.handle_stop_processing().await;
                    Envelope::respond(reply, response);
                });
            }
            other => {
                warn!("Unknown message type received in coordinator: {}", other);
                Envelope::respond(
                    reply,
                    Response::failure(ProtocolError::UnknownMessage(other.kind().to_string())),
                );
            }
        }
    }

    /// Make sure an audio host exists and has reported ready
    pub async fn ensure_audio_host(&self) -> Result<()> {
        let _provisioning = self.provision_lock.lock().await;

        let exists = self
            .documents
            .exists()
            .await
            .map_err(|e| ProtocolError::Provisioning(format!("{:#}", e)))?;
        info!("Checking audio host status: exists={}", exists);

        if !exists {
            self.session.lock().await.clear_ready();

            info!("Creating audio host...");
            if let Err(e) = self.documents.create(&self.document).await {
                error!("Failed to create audio host: {:#}", e);
                return Err(ProtocolError::Provisioning(format!("{:#}", e)).into());
            }

            info!("Audio host created. Waiting for it to report readiness...");
            self.wait_until_ready().await?;
            info!("Audio host is fully ready");
        } else if !self.session.lock().await.audio_host_ready() {
            info!("Audio host exists but is not marked ready yet. Waiting...");
            self.wait_until_ready().await?;
        } else {
            debug!("Audio host already exists and is ready");
        }

        Ok(())
    }

    async fn wait_until_ready(&self) -> Result<()> {
        let mut ready = self.session.lock().await.subscribe_ready();
        let deadline = self.config.ready_timeout();

        let outcome = tokio::time::timeout(deadline, ready.wait_for(|ready| *ready))
            .await
            .map(|seen| seen.map(|_| ()));

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(ProtocolError::ChannelClosed("readiness").into()),
            Err(_) => {
                error!("Audio host did not report ready within {:?}", deadline);
                Err(ProtocolError::ReadyTimeout(deadline).into())
            }
        }
    }

    pub async fn handle_readiness_signal(&self) {
        let session = self.session.lock().await;
        if !session.audio_host_ready() {
            info!("Audio host reports READY");
        }
        session.mark_ready();
    }

    /// Live existence check, independent of the cached readiness flag
    pub async fn handle_existence_query(&self) -> Result<bool> {
        let exists = self.documents.exists().await?;
        let ready = self.session.lock().await.audio_host_ready();
        info!("check-host-exists → exists: {}, ready flag: {}", exists, ready);
        Ok(exists)
    }

    pub async fn handle_start_streaming(&self, stream_id: &str) -> Response {
        let _stream = self.stream_lock.lock().await;

        if self.session.lock().await.stream_initialized {
            warn!("Stream already initialized. Ignoring duplicate request.");
            return Response::ok();
        }

        if let Err(e) = self.ensure_audio_host().await {
            error!("Error initializing stream: {:#}", e);
            return Response::failure(format!("{:#}", e));
        }

        info!("Forwarding process-stream to audio host: {}", stream_id);
        match self
            .host
            .request(RuntimeMessage::process_stream(stream_id))
            .await
        {
            Ok(response) if response.is_success() => {
                self.session.lock().await.stream_initialized = true;
                info!("Streaming successfully started");
                Response::ok()
            }
            Ok(response) => {
                let reason = response
                    .error()
                    .unwrap_or("audio host failed to process stream")
                    .to_string();
                error!("Audio host failed to process stream: {}", reason);
                Response::failure(reason)
            }
            Err(e) => {
                error!("Error initializing stream: {:#}", e);
                Response::failure(format!("{:#}", e))
            }
        }
    }

    /// Fire-and-forget relay used by the control connection
    pub async fn handle_settings_update(&self, settings: CompressorSettings) {
        info!("Forwarding compressor settings to audio host: {:?}", settings);
        if let Err(e) = self
            .host
            .post(RuntimeMessage::UpdateSettings(settings))
            .await
        {
            warn!("Could not forward compressor settings: {:#}", e);
        }
    }

    /// Relay that waits for the audio host's answer
    pub async fn handle_settings_update_confirmed(&self, settings: CompressorSettings) -> Response {
        info!("Forwarding compressor settings to audio host: {:?}", settings);
        self.host
            .request(RuntimeMessage::UpdateSettings(settings))
            .await
            .unwrap_or_else(|e| Response::failure(format!("{:#}", e)))
    }

    /// Tear down the audio graph so a new stream can be started
    pub async fn handle_stop_processing(&self) -> Response {
        let _stream = self.stream_lock.lock().await;

        let response = self
            .host
            .request(RuntimeMessage::StopProcessing)
            .await
            .unwrap_or_else(|e| Response::failure(format!("{:#}", e)));

        if response.is_success() {
            self.session.lock().await.stream_initialized = false;
            info!("Audio processing stopped");
        }
        response
    }

    /// Push a sample to the attached panel, or drop it
    pub async fn handle_telemetry(&self, sample: GainReduction) {
        let session = self.session.lock().await;
        let Some(connection) = session.control.as_ref() else {
            return;
        };

        if let Err(e) = connection
            .outbound
            .try_send(RuntimeMessage::GainReductionUpdate(sample))
        {
            debug!("Dropping telemetry sample: {}", e);
        }
    }

    async fn attach_control(&self, name: String, port: PortEndpoint) {
        if name != self.config.control_port_name {
            warn!("Refusing connection with unexpected name: {}", name);
            return;
        }

        let PortEndpoint {
            mut inbound,
            outbound,
        } = port;
        let id = Uuid::new_v4();

        {
            let mut session = self.session.lock().await;
            if let Some(previous) = session.control.replace(ControlConnection { id, outbound }) {
                warn!("Replacing control connection {}", previous.id);
            }
        }
        info!("Control panel connected ({})", id);

        let handle = self.handle.clone();
        tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                let input = CoordinatorInput::Port {
                    connection: id,
                    message,
                };
                if handle.input(input).await.is_err() {
                    return;
                }
            }
            let _ = handle
                .input(CoordinatorInput::Disconnect { connection: id })
                .await;
        });
    }

    async fn handle_port_message(&self, connection: Uuid, message: RuntimeMessage) {
        match message {
            RuntimeMessage::UpdateSettings(settings) => self.handle_settings_update(settings).await,
            other => warn!("Ignoring {} on control connection {}", other, connection),
        }
    }

    async fn detach_control(&self, connection: Uuid) {
        let mut session = self.session.lock().await;
        if session.control.as_ref().is_some_and(|c| c.id == connection) {
            session.control = None;
            info!("Control panel disconnected ({})", connection);
        } else {
            debug!("Stale control connection {} closed", connection);
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }

    /// Return the session to its startup state
    pub async fn reset(&self) {
        self.session.lock().await.reset();
        info!("Session reset");
    }
}
