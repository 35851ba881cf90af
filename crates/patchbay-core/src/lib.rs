//! Patchbay Core - routable signal graph for hosted audio/MIDI plugins
//!
//! This crate provides the building blocks shared by the patchbay host: the
//! port model, graph nodes wrapping plugin instances, and the processing
//! graph that validates topology and publishes it to the render thread.
//!
//! # Core Abstractions
//!
//! ## Port Model
//!
//! - [`PortType`] - Channel kinds (audio, control, CV, atom, event, MIDI)
//! - [`PortCount`] - Per-type input/output counts of a node
//! - [`Port`] - One addressable channel, produced by [`PortCount::to_ports`]
//!
//! ## Plugins
//!
//! - [`Plugin`] - Object-safe trait implemented by hosted instances
//! - [`PluginHandle`] - Shared, lockable handle held by nodes and schedules
//!
//! ## Graph
//!
//! - [`GraphProcessor`] - Owns nodes and connections, validates and publishes
//! - [`GraphNode`] - One plugin instance with a stable [`NodeId`]
//! - [`GraphRenderer`] - Executes the published schedule on the render thread
//!
//! # Example
//!
//! ```rust
//! use patchbay_core::{GraphProcessor, NodeId, Plugin, PortCount};
//!
//! struct Silence;
//!
//! impl Plugin for Silence {
//!     fn name(&self) -> &str { "Silence" }
//!     fn port_count(&self) -> PortCount { PortCount::audio(0, 2) }
//!     fn process(&mut self, _: &[Vec<f32>], outputs: &mut [Vec<f32>], frames: usize) {
//!         for out in outputs {
//!             out[..frames].fill(0.0);
//!         }
//!     }
//! }
//!
//! let mut graph = GraphProcessor::new(48000.0, 256);
//! graph.add_node(Box::new(Silence), NodeId(1));
//! assert_eq!(graph.num_nodes(), 1);
//! assert_eq!(graph.execution_order(), vec![NodeId(1)]);
//! ```

pub mod graph;
pub mod plugin;
pub mod port;

pub use graph::{
    Connection, GraphError, GraphNode, GraphProcessor, GraphRenderer, GraphSnapshot, NodeId,
    Property, RenderSchedule, RenderStep, keys,
};
pub use plugin::{Plugin, PluginHandle, into_handle};
pub use port::{Port, PortCount, PortType};
