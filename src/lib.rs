pub mod config;
pub mod coordinator;
pub mod error;
pub mod extension;
pub mod host;
pub mod panel;
pub mod runtime;
pub mod sim;

pub use config::Config;
pub use coordinator::{
    Coordinator, HostDocumentSpec, HostDocuments, LocalHostDocuments, Session, SessionSnapshot,
};
pub use error::ProtocolError;
pub use extension::Extension;
pub use host::{AudioContext, AudioEngine, AudioGraph, AudioHost, AudioParam, MediaCapture, MediaHandle};
pub use panel::{ControlPanel, SettingsForm, TabCapture};
pub use runtime::{CompressorSettings, CoordinatorHandle, GainReduction, Response, RuntimeMessage};
