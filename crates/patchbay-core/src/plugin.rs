//! The plugin instance interface hosted by graph nodes.
//!
//! A [`Plugin`] is one instantiated processor. Hosts obtain plugins from an
//! external factory and hand them to the
//! [`GraphProcessor`](crate::GraphProcessor), which wraps each one in a
//! [`GraphNode`](crate::GraphNode).
//!
//! ## Design Decisions
//!
//! - **Object-safe**: nodes hold `Box<dyn Plugin>`, so formats of any origin
//!   can share a graph.
//! - **Audio-only rendering**: [`process()`](Plugin::process) receives one
//!   buffer per audio port. Other port types are routed and validated by the
//!   graph but carry no sample data through the renderer.
//! - **Opaque state**: [`state()`](Plugin::state) and
//!   [`set_state()`](Plugin::set_state) exchange raw bytes; encoding them for
//!   storage is the session layer's concern.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::port::PortCount;

/// Core trait for hosted plugin instances.
///
/// # Example
///
/// ```rust
/// use patchbay_core::{Plugin, PortCount};
///
/// struct Thru;
///
/// impl Plugin for Thru {
///     fn name(&self) -> &str {
///         "Thru"
///     }
///
///     fn port_count(&self) -> PortCount {
///         PortCount::audio(1, 1)
///     }
///
///     fn process(&mut self, inputs: &[Vec<f32>], outputs: &mut [Vec<f32>], frames: usize) {
///         outputs[0][..frames].copy_from_slice(&inputs[0][..frames]);
///     }
/// }
/// ```
pub trait Plugin: Send {
    /// Display name of the instance.
    fn name(&self) -> &str;

    /// Current channel layout.
    ///
    /// May change between calls (e.g. after a host-driven bus change); the
    /// graph re-reads it whenever it needs the port list.
    fn port_count(&self) -> PortCount;

    /// Prepare for playback at the given sample rate and maximum block size.
    ///
    /// Called on the owner thread before the plugin becomes visible to the
    /// render path, and again whenever the graph is re-prepared.
    fn prepare(&mut self, sample_rate: f32, block_size: usize) {
        let _ = (sample_rate, block_size);
    }

    /// Render one block.
    ///
    /// `inputs` holds one buffer per audio input port, `outputs` one buffer
    /// per audio output port. Every buffer is at least `frames` long; only
    /// the first `frames` samples are meaningful.
    fn process(&mut self, inputs: &[Vec<f32>], outputs: &mut [Vec<f32>], frames: usize);

    /// Serialize the current state.
    ///
    /// An empty vector means "nothing to persist".
    fn state(&self) -> Vec<u8> {
        Vec::new()
    }

    /// Restore state previously produced by [`state()`](Self::state).
    ///
    /// Returns a message describing why the data was rejected; the instance
    /// must be left in a usable state either way.
    fn set_state(&mut self, data: &[u8]) -> Result<(), String> {
        let _ = data;
        Ok(())
    }

    /// Clear internal processing state without changing parameters.
    fn reset(&mut self) {}
}

/// Shared, lockable handle to a plugin instance.
///
/// The owning [`GraphNode`](crate::GraphNode) and any published render
/// schedule hold clones of the same handle. The owner thread locks it for
/// parameter/state access; the render path only ever uses `try_lock`.
pub type PluginHandle = Arc<Mutex<Box<dyn Plugin>>>;

/// Wraps a boxed plugin in a [`PluginHandle`].
pub fn into_handle(plugin: Box<dyn Plugin>) -> PluginHandle {
    Arc::new(Mutex::new(plugin))
}
