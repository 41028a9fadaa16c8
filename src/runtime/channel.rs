// Message transport between the three contexts
//
// Every context only holds channel endpoints. Requests carry a oneshot reply
// slot, so each reply is paired with the request that produced it.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::debug;
use uuid::Uuid;

use super::messages::{Response, RuntimeMessage};
use crate::error::ProtocolError;

/// A message plus an optional reply slot
#[derive(Debug)]
pub struct Envelope {
    pub message: RuntimeMessage,
    pub reply: Option<oneshot::Sender<Response>>,
}

impl Envelope {
    /// One-way message, nobody waits for the answer
    pub fn notify(message: RuntimeMessage) -> Self {
        Self {
            message,
            reply: None,
        }
    }

    pub fn request(message: RuntimeMessage) -> (Self, oneshot::Receiver<Response>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                message,
                reply: Some(tx),
            },
            rx,
        )
    }

    /// Deliver a reply if the sender asked for one
    pub fn respond(reply: Option<oneshot::Sender<Response>>, response: Response) {
        if let Some(tx) = reply {
            if tx.send(response).is_err() {
                debug!("Requester went away before the reply was delivered");
            }
        }
    }
}

/// Coordinator's half of a control connection
#[derive(Debug)]
pub struct PortEndpoint {
    /// Messages posted by the panel
    pub inbound: mpsc::Receiver<RuntimeMessage>,
    /// Messages pushed to the panel
    pub outbound: mpsc::Sender<RuntimeMessage>,
}

/// Everything the coordinator's inbox can receive
#[derive(Debug)]
pub enum CoordinatorInput {
    Message(Envelope),
    Connect { name: String, port: PortEndpoint },
    Port { connection: Uuid, message: RuntimeMessage },
    Disconnect { connection: Uuid },
}

pub type CoordinatorInbox = mpsc::Receiver<CoordinatorInput>;

/// Create the coordinator's inbox and the handle every other context uses to reach it
pub fn channel(capacity: usize) -> (CoordinatorHandle, CoordinatorInbox) {
    let (tx, rx) = mpsc::channel(capacity);
    (CoordinatorHandle { tx, capacity }, rx)
}

/// Address of the coordinator
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<CoordinatorInput>,
    capacity: usize,
}

impl CoordinatorHandle {
    /// Send a one-way message
    pub async fn send(&self, message: RuntimeMessage) -> Result<()> {
        self.input(CoordinatorInput::Message(Envelope::notify(message)))
            .await
    }

    /// Send a request and wait for its reply
    pub async fn request(&self, message: RuntimeMessage) -> Result<Response> {
        let (envelope, reply) = Envelope::request(message);
        self.input(CoordinatorInput::Message(envelope)).await?;
        Ok(reply
            .await
            .map_err(|_| ProtocolError::ChannelClosed("coordinator reply"))?)
    }

    /// Open a named persistent connection
    pub async fn connect(&self, name: &str) -> Result<ControlPort> {
        let (to_coordinator, inbound) = mpsc::channel(self.capacity);
        let (outbound, from_coordinator) = mpsc::channel(self.capacity);

        self.input(CoordinatorInput::Connect {
            name: name.to_string(),
            port: PortEndpoint { inbound, outbound },
        })
        .await?;

        Ok(ControlPort {
            name: name.to_string(),
            tx: to_coordinator,
            rx: from_coordinator,
        })
    }

    pub(crate) async fn input(&self, input: CoordinatorInput) -> Result<()> {
        self.tx
            .send(input)
            .await
            .map_err(|_| ProtocolError::ChannelClosed("coordinator"))?;
        Ok(())
    }
}

/// Panel's half of a control connection; dropping it disconnects
#[derive(Debug)]
pub struct ControlPort {
    name: String,
    tx: mpsc::Sender<RuntimeMessage>,
    rx: mpsc::Receiver<RuntimeMessage>,
}

impl ControlPort {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn post(&self, message: RuntimeMessage) -> Result<()> {
        self.tx
            .send(message)
            .await
            .map_err(|_| ProtocolError::ChannelClosed("control port"))?;
        Ok(())
    }

    /// Next message pushed by the coordinator, `None` once the port is closed
    pub async fn recv(&mut self) -> Option<RuntimeMessage> {
        self.rx.recv().await
    }

    /// Separate the posting half from the receiving half
    pub fn split(self) -> (PortSender, mpsc::Receiver<RuntimeMessage>) {
        (PortSender { tx: self.tx }, self.rx)
    }
}

/// Posting half of a split [`ControlPort`]
#[derive(Debug, Clone)]
pub struct PortSender {
    tx: mpsc::Sender<RuntimeMessage>,
}

impl PortSender {
    pub async fn post(&self, message: RuntimeMessage) -> Result<()> {
        self.tx
            .send(message)
            .await
            .map_err(|_| ProtocolError::ChannelClosed("control port"))?;
        Ok(())
    }
}

/// The coordinator's route to the audio host, filled in once the host is provisioned
#[derive(Debug, Clone, Default)]
pub struct HostLink {
    sender: Arc<RwLock<Option<mpsc::Sender<Envelope>>>>,
}

impl HostLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn attach(&self, sender: mpsc::Sender<Envelope>) {
        *self.sender.write().await = Some(sender);
    }

    pub async fn detach(&self) {
        self.sender.write().await.take();
    }

    /// Whether a live audio host is listening
    pub async fn is_attached(&self) -> bool {
        matches!(&*self.sender.read().await, Some(tx) if !tx.is_closed())
    }

    /// Forward without waiting for the host's answer
    pub async fn post(&self, message: RuntimeMessage) -> Result<()> {
        let sender = self.current().await?;
        sender
            .send(Envelope::notify(message))
            .await
            .map_err(|_| ProtocolError::ChannelClosed("audio host"))?;
        Ok(())
    }

    pub async fn request(&self, message: RuntimeMessage) -> Result<Response> {
        let sender = self.current().await?;
        let (envelope, reply) = Envelope::request(message);
        sender
            .send(envelope)
            .await
            .map_err(|_| ProtocolError::ChannelClosed("audio host"))?;
        Ok(reply
            .await
            .map_err(|_| ProtocolError::ChannelClosed("audio host reply"))?)
    }

    async fn current(&self) -> Result<mpsc::Sender<Envelope>> {
        self.sender
            .read()
            .await
            .clone()
            .ok_or_else(|| ProtocolError::ChannelClosed("audio host").into())
    }
}
