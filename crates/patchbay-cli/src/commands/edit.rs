//! Graph editing commands: add, connect, disconnect, remove.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use patchbay_core::{GraphNode, NodeId};
use patchbay_registry::PluginRegistry;
use patchbay_session::GraphController;

use super::common;

#[derive(Args)]
pub struct AddArgs {
    /// Graph file to edit
    pub file: PathBuf,

    /// Built-in plugin ID (see `patchbay plugins`)
    pub plugin: String,

    /// Node ID to use instead of the next free one
    #[arg(long)]
    pub id: Option<u32>,

    /// Horizontal layout position
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub x: f64,

    /// Vertical layout position
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub y: f64,
}

#[derive(Args)]
pub struct ConnectArgs {
    /// Graph file to edit
    pub file: PathBuf,

    /// Source node ID
    pub source: u32,

    /// Source port, by index or symbol (e.g. `2` or `audio_out_1`)
    pub source_port: String,

    /// Destination node ID
    pub dest: u32,

    /// Destination port, by index or symbol
    pub dest_port: String,
}

#[derive(Args)]
pub struct DisconnectArgs {
    /// Graph file to edit
    pub file: PathBuf,

    /// Remove every connection of this node
    #[arg(long, conflicts_with_all = ["source", "source_port", "dest", "dest_port"])]
    pub node: Option<u32>,

    /// Source node ID
    #[arg(required_unless_present = "node")]
    pub source: Option<u32>,

    /// Source port, by index or symbol
    #[arg(required_unless_present = "node")]
    pub source_port: Option<String>,

    /// Destination node ID
    #[arg(required_unless_present = "node")]
    pub dest: Option<u32>,

    /// Destination port, by index or symbol
    #[arg(required_unless_present = "node")]
    pub dest_port: Option<String>,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// Graph file to edit
    pub file: PathBuf,

    /// Node ID to remove
    pub id: u32,
}

/// Run the add command.
pub fn add(args: AddArgs) -> anyhow::Result<()> {
    let registry = PluginRegistry::new();
    let description = registry
        .description(&args.plugin)
        .ok_or_else(|| anyhow::anyhow!("Unknown plugin: {}", args.plugin))?;

    let mut controller = common::open_or_create(&args.file)?;
    let requested = args.id.map_or(NodeId::INVALID, NodeId);
    let id = controller.add_filter(&description, args.x, args.y, requested);
    if !id.is_valid() {
        anyhow::bail!("could not add '{}' to the graph", args.plugin);
    }

    common::save(&mut controller, &args.file)?;
    println!("Added {} as node {}", description.name, id.get());
    Ok(())
}

/// Run the connect command.
pub fn connect(args: ConnectArgs) -> anyhow::Result<()> {
    let mut controller = open(&args.file)?;
    let source = NodeId(args.source);
    let dest = NodeId(args.dest);
    let source_port = resolve_port(&controller, source, &args.source_port)?;
    let dest_port = resolve_port(&controller, dest, &args.dest_port)?;

    controller
        .connect(source, source_port, dest, dest_port)
        .with_context(|| "connection rejected")?;

    common::save(&mut controller, &args.file)?;
    println!(
        "Connected {}:{} → {}:{}",
        args.source, source_port, args.dest, dest_port
    );
    Ok(())
}

/// Run the disconnect command.
pub fn disconnect(args: DisconnectArgs) -> anyhow::Result<()> {
    let mut controller = open(&args.file)?;

    if let Some(node) = args.node {
        if !controller.disconnect_filter(NodeId(node)) {
            println!("Node {node} has no connections");
            return Ok(());
        }
        common::save(&mut controller, &args.file)?;
        println!("Disconnected node {node}");
        return Ok(());
    }

    // clap guarantees these when --node is absent
    let (Some(source), Some(source_port), Some(dest), Some(dest_port)) =
        (args.source, args.source_port, args.dest, args.dest_port)
    else {
        anyhow::bail!("expected SOURCE SOURCE_PORT DEST DEST_PORT or --node");
    };
    let source = NodeId(source);
    let dest = NodeId(dest);
    let source_port = resolve_port(&controller, source, &source_port)?;
    let dest_port = resolve_port(&controller, dest, &dest_port)?;

    if !controller.remove_connection_between(source, source_port, dest, dest_port) {
        anyhow::bail!(
            "no connection {}:{} → {}:{}",
            source.get(),
            source_port,
            dest.get(),
            dest_port
        );
    }
    common::save(&mut controller, &args.file)?;
    println!(
        "Disconnected {}:{} → {}:{}",
        source.get(),
        source_port,
        dest.get(),
        dest_port
    );
    Ok(())
}

/// Run the remove command.
pub fn remove(args: RemoveArgs) -> anyhow::Result<()> {
    let mut controller = open(&args.file)?;
    if !controller.remove_filter(NodeId(args.id)) {
        anyhow::bail!("node {} not found", args.id);
    }
    common::save(&mut controller, &args.file)?;
    println!("Removed node {}", args.id);
    Ok(())
}

fn open(file: &std::path::Path) -> anyhow::Result<GraphController> {
    common::open(file, common::DEFAULT_SAMPLE_RATE, common::DEFAULT_BLOCK_SIZE)
}

/// Accepts a port index or a port symbol such as `audio_in_2`.
fn resolve_port(controller: &GraphController, node: NodeId, port: &str) -> anyhow::Result<u32> {
    if let Ok(index) = port.parse::<u32>() {
        return Ok(index);
    }
    let node: &GraphNode = controller
        .node_for_id(node)
        .ok_or_else(|| anyhow::anyhow!("node {} not found", node.get()))?;
    node.ports()
        .into_iter()
        .find(|p| p.symbol == port)
        .map(|p| p.index)
        .ok_or_else(|| anyhow::anyhow!("node {} has no port '{port}'", node.id().get()))
}
