//! Patchbay CLI - inspect, edit and render plugin graph documents.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "patchbay")]
#[command(author, version, about = "Patchbay plugin graph CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List built-in plugins
    Plugins(commands::plugins::PluginsArgs),

    /// Show nodes, ports and connections of a graph file
    Info(commands::info::InfoArgs),

    /// Add a plugin node to a graph file (created if missing)
    Add(commands::edit::AddArgs),

    /// Connect an output port to an input port
    Connect(commands::edit::ConnectArgs),

    /// Remove one connection, or every connection of a node
    Disconnect(commands::edit::DisconnectArgs),

    /// Remove a node and its connections
    Remove(commands::edit::RemoveArgs),

    /// Render a graph offline and report output levels
    Render(commands::render::RenderArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Plugins(args) => commands::plugins::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Add(args) => commands::edit::add(args),
        Commands::Connect(args) => commands::edit::connect(args),
        Commands::Disconnect(args) => commands::edit::disconnect(args),
        Commands::Remove(args) => commands::edit::remove(args),
        Commands::Render(args) => commands::render::run(args),
    }
}
