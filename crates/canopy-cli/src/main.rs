#![warn(clippy::pedantic)]
//! # Canopy CLI
//!
//! Thin driver binary over the `canopy-*` library crates: a convenience
//! harness for running the pipeline from a terminal, not part of the core
//! itself.
//!
//! ## Subcommands
//!
//! - `check` - Run the full pipeline over a file and print its diagnostics
//! - `emit-ir` - Run the pipeline and print each tree's C11 S-expression form
//! - `layout` - Run the pipeline and print each tree's C13 layout projection

mod commands;
mod errors;
mod pipeline;
mod report;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{check, emit_ir, layout};

/// Command-line driver for the Canopy compilation pipeline.
#[derive(Parser)]
#[command(name = "canopy", author, version, about = "Canopy behavior-tree DSL compiler pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the pipeline over a file and print its diagnostics.
    Check(check::CheckArgs),

    /// Run the pipeline and print each tree's S-expression IR.
    #[command(name = "emit-ir")]
    EmitIr(emit_ir::EmitIrArgs),

    /// Run the pipeline and print each tree's layout projection.
    Layout(layout::LayoutArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Check(args) => check::execute(&args),
        Commands::EmitIr(args) => emit_ir::execute(&args),
        Commands::Layout(args) => layout::execute(&args),
    }
}
