use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::HostConfig;
use crate::error::ProtocolError;
use crate::host::{AudioEngine, AudioHost, MediaCapture};
use crate::runtime::{CoordinatorHandle, HostLink};

/// What the runtime needs to create the audio host document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostDocumentSpec {
    pub url: String,
    pub reasons: Vec<String>,
    pub justification: String,
}

impl From<&HostConfig> for HostDocumentSpec {
    fn from(config: &HostConfig) -> Self {
        Self {
            url: config.document_url.clone(),
            reasons: config.reasons.clone(),
            justification: config.justification.clone(),
        }
    }
}

/// Host-document provisioning capability
#[async_trait::async_trait]
pub trait HostDocuments: Send + Sync {
    /// Whether an audio host document currently exists
    async fn exists(&self) -> Result<bool>;

    /// Create the audio host document; it reports readiness on its own
    async fn create(&self, spec: &HostDocumentSpec) -> Result<()>;
}

/// Provisions the audio host as a task in this process
pub struct LocalHostDocuments {
    link: HostLink,
    coordinator: CoordinatorHandle,
    capture: Arc<dyn MediaCapture>,
    engine: Arc<dyn AudioEngine>,
    config: HostConfig,
    capacity: usize,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LocalHostDocuments {
    pub fn new(
        link: HostLink,
        coordinator: CoordinatorHandle,
        capture: Arc<dyn MediaCapture>,
        engine: Arc<dyn AudioEngine>,
        config: HostConfig,
        capacity: usize,
    ) -> Self {
        Self {
            link,
            coordinator,
            capture,
            engine,
            config,
            capacity,
            task: Mutex::new(None),
        }
    }

    /// Shut the audio host down; a later `create` starts a fresh one
    pub async fn close(&self) {
        self.link.detach().await;
        if let Some(task) = self.task.lock().await.take() {
            task.abort();
            info!("Audio host document closed");
        }
    }
}

#[async_trait::async_trait]
impl HostDocuments for LocalHostDocuments {
    async fn exists(&self) -> Result<bool> {
        Ok(self.link.is_attached().await)
    }

    async fn create(&self, spec: &HostDocumentSpec) -> Result<()> {
        if self.link.is_attached().await {
            return Err(ProtocolError::Provisioning(format!(
                "a document for {} already exists",
                spec.url
            ))
            .into());
        }

        info!(
            "Creating audio host document {} (reasons: {:?})",
            spec.url, spec.reasons
        );

        let host = AudioHost::new(
            self.coordinator.clone(),
            Arc::clone(&self.capture),
            Arc::clone(&self.engine),
            &self.config,
        );
        let (sender, task) = host.spawn(self.capacity);
        self.link.attach(sender).await;

        if let Some(previous) = self.task.lock().await.replace(task) {
            previous.abort();
        }
        Ok(())
    }
}
