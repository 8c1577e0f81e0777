//! Airlift CLI - Command-line interface
//!
//! This binary fronts the Airlift library: key generation and manifest
//! publishing on the server side, plan inspection and sandbox
//! synchronization on the client side. All engine behavior lives in the
//! `airlift` crate; this layer only parses arguments, loads the config
//! file, and renders progress.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;

/// Airlift update synchronization.
#[derive(Debug, Parser)]
#[command(name = "airlift", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate a manifest signing key pair
    Keygen(commands::keygen::KeygenArgs),

    /// Hash and sign a content root into a wire manifest
    Publish(commands::publish::PublishArgs),

    /// Show the sync plan for a sandbox without changing it
    Diff(commands::diff::DiffArgs),

    /// Synchronize a sandbox root against a wire manifest
    Sync(commands::sync::SyncArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Keygen(args) => commands::keygen::run(args),
        Commands::Publish(args) => commands::publish::run(args),
        Commands::Diff(args) => commands::diff::run(args),
        Commands::Sync(args) => commands::sync::run(args),
    };

    if let Err(error) = result {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
