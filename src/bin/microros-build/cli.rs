//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// microros-build - assembles the micro-ROS static library for embedded
/// targets
#[derive(Parser)]
#[command(name = "microros-build")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Global output flags, extracted before the subcommand is taken apart.
#[derive(Debug, Clone, Copy)]
pub struct GlobalFlags {
    pub verbose: bool,
    pub quiet: bool,
    pub no_color: bool,
}

impl Cli {
    /// Snapshot the global flags.
    pub fn flags(&self) -> GlobalFlags {
        GlobalFlags {
            verbose: self.verbose,
            quiet: self.quiet,
            no_color: self.no_color,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, build, and merge the library
    Build(BuildArgs),

    /// Remove build trees and artifacts
    Clean(CleanArgs),

    /// List the catalog sources of a distro
    Sources(SourcesArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Project directory (defaults to the current directory)
    #[arg(long)]
    pub project_dir: Option<PathBuf>,

    /// Target distro (overrides microros.toml)
    #[arg(long)]
    pub distro: Option<String>,

    /// Additional packages to ignore
    #[arg(long = "ignore", value_name = "PACKAGE")]
    pub ignores: Vec<String>,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Project directory (defaults to the current directory)
    #[arg(long)]
    pub project_dir: Option<PathBuf>,

    /// Also remove the final library and include tree
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct SourcesArgs {
    /// Distro to list
    pub distro: String,

    /// Restrict the listing to one stage ("dev" or "mcu")
    #[arg(long)]
    pub stage: Option<String>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
