// Shared fakes and helpers for integration tests

#![allow(dead_code)]

use anyhow::{bail, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tab_compressor::runtime::CoordinatorHandle;
use tab_compressor::{
    CompressorSettings, Config, Coordinator, HostDocumentSpec, HostDocuments, RuntimeMessage,
    SessionSnapshot,
};

/// Config with short intervals so tests run quickly
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.coordinator.ready_timeout_ms = 2_000;
    config.host.telemetry_interval_ms = 10;
    config
}

pub fn reference_settings() -> CompressorSettings {
    CompressorSettings {
        threshold: -24.0,
        ratio: 4.0,
        attack: 0.01,
        release: 0.2,
        gain: 1.0,
    }
}

/// Poll a synchronous condition until it holds or two seconds pass
pub async fn eventually(check: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !check() {
        assert!(Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll the coordinator's session until `check` holds or two seconds pass
pub async fn wait_for_session(
    coordinator: &Arc<Coordinator>,
    check: impl Fn(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let snapshot = coordinator.snapshot().await;
        if check(&snapshot) {
            return snapshot;
        }
        assert!(Instant::now() < deadline, "session never reached expected state");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Provisioner whose create call always fails
#[derive(Default)]
pub struct FailingDocuments {
    pub creates: AtomicUsize,
}

#[async_trait::async_trait]
impl HostDocuments for FailingDocuments {
    async fn exists(&self) -> Result<bool> {
        Ok(false)
    }

    async fn create(&self, _spec: &HostDocumentSpec) -> Result<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        bail!("offscreen documents are not supported")
    }
}

/// Provisioner whose document exists after creation but never reports ready
#[derive(Default)]
pub struct SilentDocuments {
    created: AtomicBool,
}

#[async_trait::async_trait]
impl HostDocuments for SilentDocuments {
    async fn exists(&self) -> Result<bool> {
        Ok(self.created.load(Ordering::SeqCst))
    }

    async fn create(&self, _spec: &HostDocumentSpec) -> Result<()> {
        self.created.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Provisioner whose document reports ready after a delay
pub struct DelayedDocuments {
    coordinator: CoordinatorHandle,
    delay: Duration,
    created: AtomicBool,
    pub creates: AtomicUsize,
}

impl DelayedDocuments {
    pub fn new(coordinator: CoordinatorHandle, delay: Duration) -> Self {
        Self {
            coordinator,
            delay,
            created: AtomicBool::new(false),
            creates: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl HostDocuments for DelayedDocuments {
    async fn exists(&self) -> Result<bool> {
        Ok(self.created.load(Ordering::SeqCst))
    }

    async fn create(&self, _spec: &HostDocumentSpec) -> Result<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.created.store(true, Ordering::SeqCst);

        let coordinator = self.coordinator.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = coordinator.send(RuntimeMessage::HostReady).await;
        });
        Ok(())
    }
}

/// Counts create calls made through another provisioner
pub struct CountingDocuments {
    inner: Arc<dyn HostDocuments>,
    pub creates: AtomicUsize,
}

impl CountingDocuments {
    pub fn new(inner: Arc<dyn HostDocuments>) -> Self {
        Self {
            inner,
            creates: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl HostDocuments for CountingDocuments {
    async fn exists(&self) -> Result<bool> {
        self.inner.exists().await
    }

    async fn create(&self, spec: &HostDocumentSpec) -> Result<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create(spec).await
    }
}
