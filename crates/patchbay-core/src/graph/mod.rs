//! Real-time processing graph for hosted plugins.
//!
//! The graph module keeps the editable topology and the executable one apart:
//! edit the graph on the owner thread (add/remove nodes, connect ports), and
//! every structural change is compiled into an immutable [`RenderSchedule`]
//! that the render thread picks up atomically.
//!
//! # Architecture
//!
//! - [`GraphProcessor`] — owned by the control thread. Holds the nodes and
//!   connections, validates every connection request and republishes the
//!   schedule after each mutation. NOT touched by the render thread.
//! - [`RenderSchedule`] — immutable snapshot: nodes in topological order plus
//!   the buffer routing between them. Published through `ArcSwap`, so the
//!   render thread sees the complete old topology or the complete new one.
//! - [`GraphRenderer`] — owned by the render thread. Loads the latest
//!   schedule each block and runs it without blocking.
//!
//! # Cycle Detection
//!
//! Connections are checked at insertion time with a depth-first reachability
//! search from the destination node back to the source node. A request that
//! would close a loop (including a node feeding itself) is rejected, so every
//! published topology has a valid execution order.
//!
//! # Example
//!
//! ```rust,ignore
//! use patchbay_core::graph::{GraphProcessor, GraphRenderer, NodeId};
//!
//! let mut graph = GraphProcessor::new(48000.0, 256);
//! graph.add_node(Box::new(tone), NodeId(1));
//! graph.add_node(Box::new(gain), NodeId(2));
//! graph.add_connection(NodeId(1), 0, NodeId(2), 0);
//!
//! let mut renderer = GraphRenderer::new(graph.snapshot(), 256);
//! std::thread::spawn(move || loop { renderer.process(256); });
//! ```

pub mod connection;
pub mod node;
mod processor;
mod render;
pub mod schedule;

pub use connection::Connection;
pub use node::{GraphNode, NodeId, Property, keys};
pub use processor::{GraphError, GraphProcessor};
pub use render::GraphRenderer;
pub use schedule::{GraphSnapshot, RenderSchedule, RenderStep};
