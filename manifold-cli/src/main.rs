//! Manifold: render manifest pipelines from the command line.
//!
//! # Usage
//!
//! ```text
//! manifold render <pipeline.yaml> [--env ENV] [--set path=value]... [-f values.yaml]... [-o yaml|json] [--summary]
//! manifold diff <pipeline.yaml> <previous.yaml> [--env ENV] [--set path=value]...
//! manifold kinds
//! ```

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{diff::DiffArgs, render::RenderArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "manifold",
    version,
    about = "Render, filter and apply-order manifests from charts and static sources",
    long_about = None,
)]
struct Cli {
    /// Log pipeline stages to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a pipeline and print the resulting manifests.
    Render(RenderArgs),

    /// Show a unified diff between a previous render and the current one.
    Diff(DiffArgs),

    /// List the apply-order kind ranking.
    Kinds,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Render(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Kinds => commands::kinds::run(),
    }
}
