//! PlayerSync CLI
//!
//! Debug console for the PlayerSync data store, running against an
//! in-process reference backend.
//!
//! # Commands
//!
//! - `console` - Interactive console reading commands from stdin
//! - `script` - Run console commands from a file
//! - `run` - Invoke registered commands by name, in order

mod backend;
mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// PlayerSync debug console.
#[derive(Parser)]
#[command(name = "playersync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Player id (a random guest id if omitted)
    #[arg(global = true, short, long)]
    player: Option<String>,

    /// Session token sent with every request
    #[arg(global = true, short, long)]
    token: Option<String>,

    /// API key required by the backend and sent by the client
    #[arg(global = true, short, long)]
    api_key: Option<String>,

    /// Leave PartitionKey, RowKey and Timestamp out of loads
    #[arg(global = true, long)]
    no_metadata: bool,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive console reading commands from stdin
    Console,

    /// Run console commands from a file, one per line
    Script {
        /// Script file; blank lines and lines starting with '#' are skipped
        file: PathBuf,
    },

    /// Invoke registered commands by name, in order
    Run {
        /// Command names, e.g. "Add 100 Coins" Save Dump
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let options = backend::Options {
        player: cli.player,
        token: cli.token,
        api_key: cli.api_key,
        stamp_metadata: !cli.no_metadata,
        quiet: false,
    };
    let shell = commands::console::Shell::new(backend::connect(options));

    match cli.command.unwrap_or(Commands::Console) {
        Commands::Console => commands::console::run_interactive(&shell).await?,
        Commands::Script { file } => commands::script::run(&shell, &file).await?,
        Commands::Run { names } => commands::run::run(&shell, &names).await?,
    }

    Ok(())
}
