use anyhow::{Context, Result};
use tracing::debug;

use super::capability::{AudioContext, AudioEngine, AudioParam, MediaHandle, NodeId};
use crate::runtime::CompressorSettings;

/// Live capture → compressor → gain → destination chain
pub struct AudioGraph {
    context: Box<dyn AudioContext>,
    source: NodeId,
    compressor: NodeId,
    gain: NodeId,
}

impl AudioGraph {
    /// Build and wire the chain for a captured stream
    pub fn build(engine: &dyn AudioEngine, media: &MediaHandle) -> Result<Self> {
        let mut context = engine
            .create_context()
            .context("Failed to create audio context")?;

        let source = context.create_media_stream_source(media)?;
        let compressor = context.create_dynamics_compressor()?;
        let gain = context.create_gain()?;
        let destination = context.destination();

        context.connect(source, compressor)?;
        context.connect(compressor, gain)?;
        context
            .connect(gain, destination)
            .context("Failed to connect audio nodes")?;

        debug!(
            "Audio graph wired for {}: {:?} -> {:?} -> {:?} -> {:?}",
            media.stream_id, source, compressor, gain, destination
        );

        Ok(Self {
            context,
            source,
            compressor,
            gain,
        })
    }

    /// Write every settings field to its node parameter
    pub fn apply(&mut self, settings: &CompressorSettings) -> Result<()> {
        let compressor = self.compressor;
        let ctx = &mut self.context;
        ctx.set_param(compressor, AudioParam::Threshold, settings.threshold)?;
        ctx.set_param(compressor, AudioParam::Ratio, settings.ratio)?;
        ctx.set_param(compressor, AudioParam::Attack, settings.attack)?;
        ctx.set_param(compressor, AudioParam::Release, settings.release)?;
        ctx.set_param(self.gain, AudioParam::Gain, settings.gain)?;
        Ok(())
    }

    /// Read the current node parameters back
    pub fn settings(&self) -> Option<CompressorSettings> {
        let ctx = &self.context;
        Some(CompressorSettings {
            threshold: ctx.param(self.compressor, AudioParam::Threshold)?,
            ratio: ctx.param(self.compressor, AudioParam::Ratio)?,
            attack: ctx.param(self.compressor, AudioParam::Attack)?,
            release: ctx.param(self.compressor, AudioParam::Release)?,
            gain: ctx.param(self.gain, AudioParam::Gain)?,
        })
    }

    pub fn reduction(&self) -> f32 {
        self.context.reduction(self.compressor)
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn close(mut self) {
        self.context.close();
    }
}
