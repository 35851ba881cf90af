//! Render path: executes the published schedule block by block.
//!
//! [`GraphRenderer`] lives on the render thread. Each block it takes the
//! latest [`RenderSchedule`] from its [`GraphSnapshot`], mixes the source
//! buffers feeding every audio input, and runs each plugin in schedule order.
//!
//! The renderer never waits on the owner thread: schedule loads are
//! wait-free, and a plugin whose lock is held (e.g. during a state save)
//! renders silence for that block instead of blocking.

use std::sync::Arc;

use super::node::NodeId;
use super::schedule::{GraphSnapshot, RenderSchedule};

/// Executes the processing graph on the render thread.
pub struct GraphRenderer {
    snapshot: GraphSnapshot,
    current: Arc<RenderSchedule>,
    /// One buffer per audio output slot of the current schedule.
    pool: Vec<Vec<f32>>,
    /// Mixed audio inputs for the step being rendered.
    scratch: Vec<Vec<f32>>,
    block_size: usize,
}

impl GraphRenderer {
    /// Creates a renderer reading from `snapshot`.
    ///
    /// Buffers are sized for the schedule published at construction time;
    /// a later schedule that needs more slots grows the pool once, on the
    /// first block that uses it.
    pub fn new(snapshot: GraphSnapshot, block_size: usize) -> Self {
        let current = snapshot.load_full();
        let mut renderer = Self {
            snapshot,
            current,
            pool: Vec::new(),
            scratch: Vec::new(),
            block_size,
        };
        renderer.fit_buffers();
        renderer
    }

    /// Returns the maximum block size.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the revision of the schedule used for the last block.
    pub fn revision(&self) -> u64 {
        self.current.revision()
    }

    /// Renders one block of `frames` samples.
    ///
    /// `frames` is clamped to the block size.
    pub fn process(&mut self, frames: usize) {
        let frames = frames.min(self.block_size);

        let latest = self.snapshot.load();
        if !Arc::ptr_eq(&*latest, &self.current) {
            self.current = Arc::clone(&*latest);
            drop(latest);
            self.fit_buffers();
        }

        for step in &self.current.steps {
            let inputs = step.inputs.len();
            for (ch, sources) in step.inputs.iter().enumerate() {
                let dest = &mut self.scratch[ch][..frames];
                dest.fill(0.0);
                for &slot in sources {
                    for (d, s) in dest.iter_mut().zip(&self.pool[slot][..frames]) {
                        *d += *s;
                    }
                }
            }

            let outputs = &mut self.pool[step.output_base..step.output_base + step.audio_outputs];
            if let Some(mut plugin) = step.plugin.try_lock() {
                plugin.process(&self.scratch[..inputs], outputs, frames);
            } else {
                for buf in outputs.iter_mut() {
                    buf[..frames].fill(0.0);
                }
            }
        }
    }

    /// Returns the last rendered audio output `channel` of `node`.
    pub fn output(&self, node: NodeId, channel: usize) -> Option<&[f32]> {
        let step = self.current.step_for(node)?;
        if channel >= step.audio_outputs {
            return None;
        }
        self.pool.get(step.output_base + channel).map(Vec::as_slice)
    }

    /// Grows the buffer pool and scratch space to fit the current schedule.
    fn fit_buffers(&mut self) {
        let block = self.block_size;
        if self.pool.len() < self.current.buffer_count {
            self.pool.resize_with(self.current.buffer_count, || vec![0.0; block]);
        }
        if self.scratch.len() < self.current.max_inputs {
            self.scratch.resize_with(self.current.max_inputs, || vec![0.0; block]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphProcessor;
    use crate::plugin::Plugin;
    use crate::port::PortCount;

    /// Emits a constant on every output.
    struct Dc(f32);

    impl Plugin for Dc {
        fn name(&self) -> &str {
            "Dc"
        }
        fn port_count(&self) -> PortCount {
            PortCount::audio(0, 2)
        }
        fn process(&mut self, _: &[Vec<f32>], outputs: &mut [Vec<f32>], frames: usize) {
            for out in outputs {
                out[..frames].fill(self.0);
            }
        }
    }

    /// Multiplies each input channel into the matching output.
    struct Gain(f32);

    impl Plugin for Gain {
        fn name(&self) -> &str {
            "Gain"
        }
        fn port_count(&self) -> PortCount {
            PortCount::audio(2, 2)
        }
        fn process(&mut self, inputs: &[Vec<f32>], outputs: &mut [Vec<f32>], frames: usize) {
            for (inp, out) in inputs.iter().zip(outputs.iter_mut()) {
                for (o, i) in out[..frames].iter_mut().zip(&inp[..frames]) {
                    *o = *i * self.0;
                }
            }
        }
    }

    #[test]
    fn test_chain_renders_in_order() {
        let mut graph = GraphProcessor::new(48000.0, 8);
        graph.add_node(Box::new(Gain(3.0)), NodeId(2));
        graph.add_node(Box::new(Dc(0.5)), NodeId(1));
        // Dc out 0 (port 0) → Gain in 0 (port 0)
        assert!(graph.add_connection(NodeId(1), 0, NodeId(2), 0));

        let mut renderer = GraphRenderer::new(graph.snapshot(), 8);
        renderer.process(8);

        assert_eq!(renderer.output(NodeId(1), 0).unwrap(), &[0.5; 8]);
        assert_eq!(renderer.output(NodeId(2), 0).unwrap(), &[1.5; 8]);
        assert_eq!(renderer.output(NodeId(2), 1).unwrap(), &[0.0; 8]);
        assert!(renderer.output(NodeId(2), 2).is_none());
    }

    #[test]
    fn test_fan_in_sums() {
        let mut graph = GraphProcessor::new(48000.0, 4);
        graph.add_node(Box::new(Dc(0.25)), NodeId(1));
        graph.add_node(Box::new(Dc(0.5)), NodeId(2));
        graph.add_node(Box::new(Gain(1.0)), NodeId(3));
        graph.add_connection(NodeId(1), 0, NodeId(3), 0);
        graph.add_connection(NodeId(2), 0, NodeId(3), 0);

        let mut renderer = GraphRenderer::new(graph.snapshot(), 4);
        renderer.process(4);
        assert_eq!(renderer.output(NodeId(3), 0).unwrap(), &[0.75; 4]);
    }

    #[test]
    fn test_picks_up_new_topology() {
        let mut graph = GraphProcessor::new(48000.0, 4);
        let mut renderer = GraphRenderer::new(graph.snapshot(), 4);
        renderer.process(4);
        assert!(renderer.output(NodeId(1), 0).is_none());

        graph.add_node(Box::new(Dc(1.0)), NodeId(1));
        renderer.process(4);
        assert_eq!(renderer.revision(), graph.revision());
        assert_eq!(renderer.output(NodeId(1), 0).unwrap(), &[1.0; 4]);
    }

    #[test]
    fn test_locked_plugin_renders_silence() {
        let mut graph = GraphProcessor::new(48000.0, 4);
        graph.add_node(Box::new(Dc(1.0)), NodeId(1));
        let mut renderer = GraphRenderer::new(graph.snapshot(), 4);

        let node = graph.node_for_id(NodeId(1)).unwrap();
        let guard = node.lock_plugin();
        renderer.process(4);
        drop(guard);
        assert_eq!(renderer.output(NodeId(1), 0).unwrap(), &[0.0; 4]);

        renderer.process(4);
        assert_eq!(renderer.output(NodeId(1), 0).unwrap(), &[1.0; 4]);
    }

    #[test]
    fn test_render_on_another_thread() {
        let mut graph = GraphProcessor::new(48000.0, 16);
        graph.add_node(Box::new(Dc(1.0)), NodeId(1));
        let snapshot = graph.snapshot();

        let handle = std::thread::spawn(move || {
            let mut renderer = GraphRenderer::new(snapshot, 16);
            for _ in 0..100 {
                renderer.process(16);
            }
            renderer.output(NodeId(1), 0).map(<[f32]>::to_vec)
        });

        for id in 2..20 {
            graph.add_node(Box::new(Gain(1.0)), NodeId(id));
            graph.add_connection(NodeId(1), 0, NodeId(id), 0);
        }

        let out = handle.join().unwrap();
        assert_eq!(out, Some(vec![1.0; 16]));
    }
}
