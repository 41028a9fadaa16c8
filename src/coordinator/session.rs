use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::runtime::RuntimeMessage;

/// The attached control panel's connection
#[derive(Debug)]
pub struct ControlConnection {
    pub id: Uuid,
    pub outbound: mpsc::Sender<RuntimeMessage>,
}

/// Coordinator session state
///
/// Only the coordinator mutates it, one inbound message at a time.
#[derive(Debug)]
pub struct Session {
    /// Set once the audio host has built a graph for this session
    pub stream_initialized: bool,

    /// Currently attached control connection, if any
    pub control: Option<ControlConnection>,

    /// Audio host readiness, observable by waiters
    ready: watch::Sender<bool>,

    created_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            stream_initialized: false,
            control: None,
            ready,
            created_at: Utc::now(),
        }
    }

    pub fn audio_host_ready(&self) -> bool {
        *self.ready.borrow()
    }

    pub fn mark_ready(&self) {
        self.ready.send_replace(true);
    }

    /// Forget readiness ahead of a new host creation
    pub fn clear_ready(&self) {
        self.ready.send_replace(false);
    }

    pub fn subscribe_ready(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    /// Return to the startup state, dropping any control connection
    ///
    /// Readiness is kept: it belongs to the audio host, which outlives the
    /// session and will not announce itself again.
    pub fn reset(&mut self) {
        self.stream_initialized = false;
        self.control = None;
        self.created_at = Utc::now();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            stream_initialized: self.stream_initialized,
            audio_host_ready: self.audio_host_ready(),
            control_attached: self.control.is_some(),
            control_connection: self.control.as_ref().map(|c| c.id),
            created_at: self.created_at,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub stream_initialized: bool,
    pub audio_host_ready: bool,
    pub control_attached: bool,
    pub control_connection: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_idle() {
        let session = Session::new();
        let snapshot = session.snapshot();

        assert!(!snapshot.stream_initialized);
        assert!(!snapshot.audio_host_ready);
        assert!(!snapshot.control_attached);
        assert!(snapshot.control_connection.is_none());
    }

    #[test]
    fn test_ready_flag_is_observable() {
        let session = Session::new();
        let rx = session.subscribe_ready();

        session.mark_ready();
        assert!(session.audio_host_ready());
        assert!(*rx.borrow());

        session.clear_ready();
        assert!(!*rx.borrow());
    }

    #[test]
    fn test_reset_clears_session_but_keeps_readiness() {
        let mut session = Session::new();
        let (tx, _rx) = mpsc::channel(1);
        session.stream_initialized = true;
        session.control = Some(ControlConnection {
            id: Uuid::new_v4(),
            outbound: tx,
        });
        session.mark_ready();

        session.reset();

        let snapshot = session.snapshot();
        assert!(!snapshot.stream_initialized);
        assert!(snapshot.audio_host_ready);
        assert!(!snapshot.control_attached);
    }
}
