//! `canopy check` — lexes, parses, resolves, type-checks and lowers a
//! single file, printing every diagnostic the pipeline collects.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::errors::CliError;
use crate::{pipeline, report};

/// Arguments for the `check` command.
#[derive(Args)]
pub struct CheckArgs {
    /// Path to the `.bt` source file to check.
    pub path: PathBuf,

    /// Fully qualified name of the method's declaring (context) type.
    #[clap(long = "context-type")]
    pub context_type: String,

    /// Path to a JSON file describing the host type metadata provider
    /// (see `canopy_sema::StaticHostTypeProvider`).
    #[clap(long = "context-type-json")]
    pub context_type_json: PathBuf,
}

pub fn execute(args: &CheckArgs) -> Result<()> {
    let mut loaded = pipeline::load(&args.path, &args.context_type, &args.context_type_json)?;
    let diagnostics = loaded.db.all_diagnostics(&loaded.file)?;
    let file_label = args.path.display().to_string();
    report::print(&file_label, &diagnostics);

    let errors = report::error_count(&diagnostics);
    if errors > 0 {
        return Err(CliError::HasErrors { count: errors }.into());
    }
    Ok(())
}
