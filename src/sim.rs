// Simulated host capabilities
//
// Stand-ins for the browser runtime's capture and audio primitives, used by
// the demo binary and the tests. The compressor only models a static curve
// so that there is a reduction value to report.

use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::host::{AudioContext, AudioEngine, AudioParam, MediaCapture, MediaHandle, NodeId};
use crate::panel::TabCapture;

#[derive(Debug, Default)]
struct EngineState {
    contexts_created: usize,
    open_contexts: usize,
    /// Last value written to each parameter across all contexts
    last_params: HashMap<AudioParam, f32>,
}

/// Audio engine whose contexts live in memory
#[derive(Debug, Clone)]
pub struct SimulatedEngine {
    state: Arc<Mutex<EngineState>>,
    input_level_db: f32,
}

impl SimulatedEngine {
    /// Engine whose sources play a constant level of `input_level_db`
    pub fn new(input_level_db: f32) -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineState::default())),
            input_level_db,
        }
    }

    pub fn contexts_created(&self) -> usize {
        lock(&self.state).contexts_created
    }

    pub fn open_contexts(&self) -> usize {
        lock(&self.state).open_contexts
    }

    pub fn last_param(&self, param: AudioParam) -> Option<f32> {
        lock(&self.state).last_params.get(&param).copied()
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new(-12.0)
    }
}

impl AudioEngine for SimulatedEngine {
    fn create_context(&self) -> Result<Box<dyn AudioContext>> {
        {
            let mut state = lock(&self.state);
            state.contexts_created += 1;
            state.open_contexts += 1;
        }

        Ok(Box::new(SimulatedContext {
            nodes: vec![SimNode::new(NodeKind::Destination)],
            edges: Vec::new(),
            state: Arc::clone(&self.state),
            input_level_db: self.input_level_db,
            closed: false,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Destination,
    Source,
    Compressor,
    Gain,
}

#[derive(Debug)]
struct SimNode {
    kind: NodeKind,
    params: HashMap<AudioParam, f32>,
}

impl SimNode {
    fn new(kind: NodeKind) -> Self {
        // Web Audio defaults
        let params = match kind {
            NodeKind::Compressor => HashMap::from([
                (AudioParam::Threshold, -24.0),
                (AudioParam::Ratio, 12.0),
                (AudioParam::Attack, 0.003),
                (AudioParam::Release, 0.25),
            ]),
            NodeKind::Gain => HashMap::from([(AudioParam::Gain, 1.0)]),
            NodeKind::Destination | NodeKind::Source => HashMap::new(),
        };
        Self { kind, params }
    }
}

pub struct SimulatedContext {
    nodes: Vec<SimNode>,
    edges: Vec<(NodeId, NodeId)>,
    state: Arc<Mutex<EngineState>>,
    input_level_db: f32,
    closed: bool,
}

impl SimulatedContext {
    fn add(&mut self, kind: NodeKind) -> Result<NodeId> {
        if self.closed {
            bail!("audio context is closed");
        }
        self.nodes.push(SimNode::new(kind));
        Ok(NodeId(self.nodes.len() - 1))
    }

    fn node(&self, id: NodeId) -> Result<&SimNode> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| anyhow!("no audio node {:?}", id))
    }
}

impl AudioContext for SimulatedContext {
    fn create_media_stream_source(&mut self, media: &MediaHandle) -> Result<NodeId> {
        debug!("Simulated source for {}", media.label);
        self.add(NodeKind::Source)
    }

    fn create_dynamics_compressor(&mut self) -> Result<NodeId> {
        self.add(NodeKind::Compressor)
    }

    fn create_gain(&mut self) -> Result<NodeId> {
        self.add(NodeKind::Gain)
    }

    fn destination(&self) -> NodeId {
        NodeId(0)
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.node(from)?;
        if self.node(to)?.kind == NodeKind::Source {
            bail!("cannot connect into a source node");
        }
        self.edges.push((from, to));
        Ok(())
    }

    fn set_param(&mut self, node: NodeId, param: AudioParam, value: f32) -> Result<()> {
        let target = self
            .nodes
            .get_mut(node.0)
            .ok_or_else(|| anyhow!("no audio node {:?}", node))?;

        match target.params.get_mut(&param) {
            Some(slot) => *slot = value,
            None => bail!("{:?} node has no {} parameter", target.kind, param),
        }

        lock(&self.state).last_params.insert(param, value);
        Ok(())
    }

    fn param(&self, node: NodeId, param: AudioParam) -> Option<f32> {
        self.nodes.get(node.0)?.params.get(&param).copied()
    }

    fn reduction(&self, compressor: NodeId) -> f32 {
        let fed = self.edges.iter().any(|(_, to)| *to == compressor);
        let (Some(threshold), Some(ratio)) = (
            self.param(compressor, AudioParam::Threshold),
            self.param(compressor, AudioParam::Ratio),
        ) else {
            return 0.0;
        };
        if !fed || ratio <= 0.0 {
            return 0.0;
        }

        let over = self.input_level_db - threshold;
        if over <= 0.0 {
            0.0
        } else {
            -(over - over / ratio)
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            lock(&self.state).open_contexts -= 1;
        }
    }
}

impl Drop for SimulatedContext {
    fn drop(&mut self) {
        self.close();
    }
}

/// Media capture that grants every non-empty stream id unless told to deny
#[derive(Debug, Default)]
pub struct SimulatedCapture {
    deny: AtomicBool,
    captures: AtomicUsize,
}

impl SimulatedCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture that refuses every request, like a revoked permission
    pub fn denying() -> Self {
        let capture = Self::default();
        capture.set_denied(true);
        capture
    }

    pub fn set_denied(&self, deny: bool) {
        self.deny.store(deny, Ordering::SeqCst);
    }

    /// Number of successful captures
    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MediaCapture for SimulatedCapture {
    async fn capture_media_stream(&self, stream_id: &str) -> Result<MediaHandle> {
        if self.deny.load(Ordering::SeqCst) {
            bail!("Permission denied");
        }
        if stream_id.trim().is_empty() {
            bail!("Invalid stream id");
        }

        self.captures.fetch_add(1, Ordering::SeqCst);
        Ok(MediaHandle {
            stream_id: stream_id.to_string(),
            label: format!("Tab audio ({})", stream_id),
        })
    }
}

/// Issues a fresh stream id per request
#[derive(Debug, Default)]
pub struct SimulatedTabCapture {
    issued: AtomicUsize,
}

impl SimulatedTabCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TabCapture for SimulatedTabCapture {
    async fn get_capture_stream_id(&self, target_tab: u32) -> Result<String> {
        self.issued.fetch_add(1, Ordering::SeqCst);
        Ok(format!("tab-{}-{}", target_tab, uuid::Uuid::new_v4().simple()))
    }
}

fn lock(state: &Mutex<EngineState>) -> MutexGuard<'_, EngineState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
