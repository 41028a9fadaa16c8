//! Coordinator context
//!
//! This module provides the `Coordinator` hub that manages:
//! - Session state (stream initialized, audio host ready, control connection)
//! - Lazy provisioning of the audio host and its readiness handshake
//! - Duplicate start-streaming suppression
//! - Relaying settings to the audio host and telemetry to the control panel

mod coordinator;
mod provision;
mod session;

pub use coordinator::Coordinator;
pub use provision::{HostDocumentSpec, HostDocuments, LocalHostDocuments};
pub use session::{ControlConnection, Session, SessionSnapshot};
