pub mod channel;
pub mod messages;

pub use channel::{
    channel, ControlPort, CoordinatorHandle, CoordinatorInbox, CoordinatorInput, Envelope,
    HostLink, PortEndpoint, PortSender,
};
pub use messages::{CompressorSettings, GainReduction, Response, RuntimeMessage, StreamRequest};
