//! Compiled render schedule for the real-time path.
//!
//! A [`RenderSchedule`] is an immutable snapshot produced by the
//! [`GraphProcessor`](super::GraphProcessor) after every structural mutation.
//! It lists the nodes in execution order together with the buffer routing
//! each one needs, and is published to the render path through an `ArcSwap`,
//! so the render path sees either the complete old topology or the complete
//! new one.

use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};

use crate::plugin::PluginHandle;

use super::node::NodeId;

/// One node's work in the schedule.
pub struct RenderStep {
    /// Node this step renders.
    pub(crate) node: NodeId,
    /// Shared handle to the node's plugin.
    pub(crate) plugin: PluginHandle,
    /// First buffer slot holding this node's audio outputs.
    pub(crate) output_base: usize,
    /// Number of audio output channels (consecutive slots from `output_base`).
    pub(crate) audio_outputs: usize,
    /// For each audio input channel, the buffer slots summed into it.
    pub(crate) inputs: Vec<Vec<usize>>,
}

impl RenderStep {
    /// Node this step renders.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Number of audio input channels.
    pub fn audio_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Number of audio output channels.
    pub fn audio_outputs(&self) -> usize {
        self.audio_outputs
    }

    /// Buffer slots feeding audio input `channel`.
    pub fn sources(&self, channel: usize) -> &[usize] {
        self.inputs.get(channel).map_or(&[], Vec::as_slice)
    }
}

/// Immutable snapshot of the topology as seen by the render path.
///
/// Steps are in topological order: every node appears after all nodes that
/// feed it, so each step only reads buffer slots written by earlier steps.
pub struct RenderSchedule {
    pub(crate) steps: Vec<RenderStep>,
    /// Total number of audio output slots.
    pub(crate) buffer_count: usize,
    /// Largest audio input count of any step.
    pub(crate) max_inputs: usize,
    /// Processor revision this snapshot was compiled from.
    pub(crate) revision: u64,
}

impl RenderSchedule {
    /// An empty schedule (no nodes).
    pub(crate) fn empty() -> Self {
        Self {
            steps: Vec::new(),
            buffer_count: 0,
            max_inputs: 0,
            revision: 0,
        }
    }

    /// Returns the steps in execution order.
    pub fn steps(&self) -> &[RenderStep] {
        &self.steps
    }

    /// Returns the node IDs in execution order.
    pub fn order(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.steps.iter().map(|s| s.node)
    }

    /// Returns the number of steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Returns the number of audio buffer slots required.
    pub fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    /// Returns the processor revision this snapshot reflects.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the step for `node`, if it is scheduled.
    pub fn step_for(&self, node: NodeId) -> Option<&RenderStep> {
        self.steps.iter().find(|s| s.node == node)
    }
}

/// Read side of the published schedule.
///
/// Cheap to clone and safe to move to the render thread. Loads are wait-free.
#[derive(Clone)]
pub struct GraphSnapshot {
    pub(crate) shared: Arc<ArcSwap<RenderSchedule>>,
}

impl GraphSnapshot {
    /// Borrows the current schedule for the duration of the guard.
    pub fn load(&self) -> Guard<Arc<RenderSchedule>> {
        self.shared.load()
    }

    /// Takes a full reference to the current schedule.
    pub fn load_full(&self) -> Arc<RenderSchedule> {
        self.shared.load_full()
    }
}
