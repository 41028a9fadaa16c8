use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::coordinator::{Coordinator, LocalHostDocuments};
use crate::host::{AudioEngine, MediaCapture};
use crate::runtime::{self, CoordinatorHandle, HostLink};

/// A running coordinator with an in-process audio host provisioner
pub struct Extension {
    pub coordinator: Arc<Coordinator>,
    pub handle: CoordinatorHandle,
    pub documents: Arc<LocalHostDocuments>,
    task: JoinHandle<()>,
}

impl Extension {
    /// Wire the coordinator and start its inbox loop
    pub fn start(
        config: &Config,
        capture: Arc<dyn MediaCapture>,
        engine: Arc<dyn AudioEngine>,
    ) -> Self {
        let capacity = config.coordinator.channel_capacity;
        let (handle, inbox) = runtime::channel(capacity);
        let link = HostLink::new();

        let documents = Arc::new(LocalHostDocuments::new(
            link.clone(),
            handle.clone(),
            capture,
            engine,
            config.host.clone(),
            capacity,
        ));

        let coordinator = Coordinator::new(config, documents.clone(), link, handle.clone());
        let task = coordinator.spawn(inbox);

        Self {
            coordinator,
            handle,
            documents,
            task,
        }
    }

    /// Close the audio host and stop the coordinator
    pub async fn shutdown(self) {
        self.documents.close().await;
        self.task.abort();
    }
}
