//! microros-build CLI - builds the micro-ROS static library

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("microros_build=debug")
    } else {
        EnvFilter::new("microros_build=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    // Execute command
    let flags = cli.flags();
    match cli.command {
        Commands::Build(args) => commands::build::execute(flags, args),
        Commands::Clean(args) => commands::clean::execute(flags, args),
        Commands::Sources(args) => commands::sources::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
