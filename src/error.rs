use std::time::Duration;
use thiserror::Error;

/// Failures that can be reported across a message channel
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The audio host document could not be created
    #[error("failed to provision audio host: {0}")]
    Provisioning(String),

    /// Media capture was refused or the stream id was invalid
    #[error("media capture failed: {0}")]
    Capture(String),

    /// Settings arrived before any audio graph was built
    #[error("Compressor not initialized")]
    NotInitialized,

    /// A context received a message it does not handle
    #[error("Unknown message type: {0}")]
    UnknownMessage(String),

    /// The audio host never reported ready within the deadline
    #[error("audio host did not report ready within {0:?}")]
    ReadyTimeout(Duration),

    /// The named channel's other end went away
    #[error("{0} channel closed")]
    ChannelClosed(&'static str),
}
