//! Display the contents of a graph file.

use std::path::PathBuf;

use clap::Args;
use patchbay_core::GraphNode;

use super::common;

/// Display graph information.
#[derive(Args)]
pub struct InfoArgs {
    /// Path to the graph file
    pub file: PathBuf,

    /// Also list every port of every node
    #[arg(long)]
    pub ports: bool,
}

/// Run the info command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let controller = common::open(
        &args.file,
        common::DEFAULT_SAMPLE_RATE,
        common::DEFAULT_BLOCK_SIZE,
    )?;
    let model = controller.model();

    println!("Graph:       {}", model.name);
    println!("Nodes:       {}", controller.num_filters());
    println!("Connections: {}", controller.num_connections());
    println!();

    for entry in &model.nodes {
        let Some(node) = controller.node_for_id(entry.node_id()) else {
            continue;
        };
        let count = node.port_count();
        println!(
            "  [{}] {:12} {}:{}  ({} in / {} out)  at ({}, {})",
            entry.id,
            node.name(),
            entry.plugin.format,
            entry.plugin.identifier,
            count.total_inputs(),
            count.total_outputs(),
            entry.x,
            entry.y
        );
        if args.ports {
            for port in node.ports() {
                println!("        {:3}  {}", port.index, port.symbol);
            }
        }
    }

    if controller.num_connections() > 0 {
        println!();
        println!("Connections:");
        for c in controller.processor().connections() {
            let from = port_label(controller.node_for_id(c.source_node), c.source_port);
            let to = port_label(controller.node_for_id(c.dest_node), c.dest_port);
            println!("  {} → {}", from, to);
        }
    }

    let order: Vec<String> = controller
        .processor()
        .execution_order()
        .iter()
        .map(|id| id.get().to_string())
        .collect();
    println!();
    println!("Execution order: {}", order.join(" → "));

    Ok(())
}

fn port_label(node: Option<&GraphNode>, port: u32) -> String {
    let Some(node) = node else {
        return format!("?:{port}");
    };
    let symbol = node
        .ports()
        .into_iter()
        .nth(port as usize)
        .map_or_else(|| port.to_string(), |p| p.symbol);
    format!("{}:{}", node.id().get(), symbol)
}
