//! Shared helpers for loading and saving graph files.

use std::path::Path;

use anyhow::Context;
use patchbay_core::GraphProcessor;
use patchbay_registry::PluginRegistry;
use patchbay_session::{GraphController, GraphModel, LoadReport};

/// Sample rate used when a command does not ask for one.
pub const DEFAULT_SAMPLE_RATE: f32 = 48000.0;

/// Block size used when a command does not ask for one.
pub const DEFAULT_BLOCK_SIZE: usize = 256;

/// Builds a controller backed by the built-in registry.
pub fn controller(sample_rate: f32, block_size: usize) -> GraphController {
    GraphController::new(
        GraphProcessor::new(sample_rate, block_size),
        PluginRegistry::new(),
    )
}

/// Loads `path` into a fresh controller and warns about anything that
/// could not be restored.
pub fn open(path: &Path, sample_rate: f32, block_size: usize) -> anyhow::Result<GraphController> {
    let model = GraphModel::load(path)
        .with_context(|| format!("failed to load graph '{}'", path.display()))?;
    let mut controller = controller(sample_rate, block_size);
    let report = controller.set_node_model(model);
    warn_report(&report);
    Ok(controller)
}

/// Like [`open`], but starts an empty graph when `path` does not exist.
pub fn open_or_create(path: &Path) -> anyhow::Result<GraphController> {
    if path.exists() {
        return open(path, DEFAULT_SAMPLE_RATE, DEFAULT_BLOCK_SIZE);
    }
    let mut controller = controller(DEFAULT_SAMPLE_RATE, DEFAULT_BLOCK_SIZE);
    let name = path
        .file_stem()
        .map_or_else(|| "Untitled".to_string(), |s| s.to_string_lossy().into_owned());
    controller.set_node_model(GraphModel::new(name));
    Ok(controller)
}

/// Captures plugin state and writes the document back to `path`.
pub fn save(controller: &mut GraphController, path: &Path) -> anyhow::Result<()> {
    controller.save_plugin_states();
    controller
        .model()
        .save(path)
        .with_context(|| format!("failed to save graph '{}'", path.display()))
}

fn warn_report(report: &LoadReport) {
    for id in &report.pruned {
        eprintln!("warning: {id} could not be instantiated and was dropped");
    }
    for arc in &report.dropped_arcs {
        eprintln!("warning: connection {} could not be restored", arc.connection());
    }
    for id in &report.bad_state {
        eprintln!("warning: {id} loaded with default state");
    }
}
