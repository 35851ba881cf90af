//! Built-in plugin listing.

use clap::Args;
use patchbay_registry::PluginRegistry;

#[derive(Args)]
pub struct PluginsArgs {
    /// Show the port list for a specific plugin
    #[arg(value_name = "PLUGIN")]
    plugin: Option<String>,
}

pub fn run(args: PluginsArgs) -> anyhow::Result<()> {
    let registry = PluginRegistry::new();

    if let Some(id) = &args.plugin {
        let descriptor = registry
            .get(id)
            .ok_or_else(|| anyhow::anyhow!("Unknown plugin: {id}"))?;

        println!("{}", descriptor.name);
        println!("{}", "=".repeat(descriptor.name.len()));
        println!();
        println!("{}", descriptor.description);
        println!();
        println!("Ports:");
        for port in descriptor.ports.to_ports() {
            println!("  {:3}  {:14}  {}", port.index, port.symbol, port.name);
        }
        return Ok(());
    }

    println!("Available Plugins");
    println!("=================");
    println!();
    for descriptor in registry.all_plugins() {
        println!(
            "  {:10}  {:10}  {:2} in / {:2} out  {}",
            descriptor.id,
            descriptor.category.name(),
            descriptor.ports.total_inputs(),
            descriptor.ports.total_outputs(),
            descriptor.description
        );
    }
    println!();
    println!("Add one with: patchbay add <graph.toml> <plugin>");

    Ok(())
}
