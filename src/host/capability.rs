use anyhow::Result;
use std::fmt;

/// Handle to a captured tab media stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle {
    /// Stream id the capture was scoped to
    pub stream_id: String,
    /// Human-readable track label
    pub label: String,
}

/// Turns a tab-capture stream id into a live media stream
///
/// Implementations:
/// - Browser runtime: `getUserMedia` with a tab media source
/// - Simulated: [`crate::sim::SimulatedCapture`] (demo and tests)
#[async_trait::async_trait]
pub trait MediaCapture: Send + Sync {
    async fn capture_media_stream(&self, stream_id: &str) -> Result<MediaHandle>;
}

/// Node within an [`AudioContext`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// Automatable node parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioParam {
    Threshold,
    Ratio,
    Attack,
    Release,
    Gain,
}

impl fmt::Display for AudioParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Threshold => "threshold",
            Self::Ratio => "ratio",
            Self::Attack => "attack",
            Self::Release => "release",
            Self::Gain => "gain",
        };
        f.write_str(name)
    }
}

/// Audio pipeline primitives of the host runtime
pub trait AudioContext: Send {
    fn create_media_stream_source(&mut self, media: &MediaHandle) -> Result<NodeId>;

    fn create_dynamics_compressor(&mut self) -> Result<NodeId>;

    fn create_gain(&mut self) -> Result<NodeId>;

    /// Output node of the context
    fn destination(&self) -> NodeId;

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<()>;

    fn set_param(&mut self, node: NodeId, param: AudioParam, value: f32) -> Result<()>;

    fn param(&self, node: NodeId, param: AudioParam) -> Option<f32>;

    /// Instantaneous gain reduction of a compressor node (dB, <= 0)
    fn reduction(&self, compressor: NodeId) -> f32;

    /// Release the context and everything connected to it
    fn close(&mut self);
}

/// Constructs audio contexts
pub trait AudioEngine: Send + Sync {
    fn create_context(&self) -> Result<Box<dyn AudioContext>>;
}
