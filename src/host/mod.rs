//! Audio host context
//!
//! Owns the capture → compressor → gain → destination graph, applies
//! settings to it and emits periodic gain-reduction telemetry.

mod audio_host;
mod capability;
mod graph;

pub use audio_host::AudioHost;
pub use capability::{AudioContext, AudioEngine, AudioParam, MediaCapture, MediaHandle, NodeId};
pub use graph::AudioGraph;
