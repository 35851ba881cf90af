//! Session layer for patchbay: the graph controller and its persisted model.
//!
//! This crate keeps a serializable [`GraphModel`] in lockstep with the live
//! [`GraphProcessor`](patchbay_core::GraphProcessor) from `patchbay-core`.
//!
//! # Features
//!
//! - **Graph Controller**: ID allocation, node creation through a
//!   [`PluginFactory`], connection edits and full-graph reloads
//! - **Persisted Model**: TOML and JSON graph documents with base64 plugin state
//! - **Change Events**: one [`GraphEvent`] per mutation, delivered over channels
//! - **Error Reporting**: user-facing failures through a [`Notifier`]
//!
//! # Example
//!
//! ```rust
//! use patchbay_core::{GraphProcessor, NodeId, Plugin, PortCount};
//! use patchbay_session::{GraphController, PluginDescription};
//!
//! struct Thru;
//!
//! impl Plugin for Thru {
//!     fn name(&self) -> &str { "Thru" }
//!     fn port_count(&self) -> PortCount { PortCount::audio(1, 1) }
//!     fn process(&mut self, i: &[Vec<f32>], o: &mut [Vec<f32>], n: usize) {
//!         o[0][..n].copy_from_slice(&i[0][..n]);
//!     }
//! }
//!
//! fn factory(_: &PluginDescription) -> Result<Box<dyn Plugin>, String> {
//!     Ok(Box::new(Thru))
//! }
//!
//! let mut controller = GraphController::new(GraphProcessor::new(48000.0, 256), factory);
//! let thru = PluginDescription::new("Thru", "example", "thru");
//!
//! let a = controller.add_filter(&thru, 0.0, 0.0, NodeId::INVALID);
//! let b = controller.add_filter(&thru, 200.0, 0.0, NodeId::INVALID);
//! assert!(controller.add_connection(a, 1, b, 0));
//!
//! let toml = controller.model().to_toml().unwrap();
//! assert!(toml.contains("sourceNode = 1"));
//! ```

pub mod controller;
pub mod error;
pub mod factory;
pub mod model;
pub mod notify;

pub use controller::{GraphController, LoadReport};
pub use error::SessionError;
pub use factory::PluginFactory;
pub use model::{ArcEntry, GraphModel, NodeEntry, PluginDescription};
pub use notify::{GraphEvent, LogNotifier, Notifier};
