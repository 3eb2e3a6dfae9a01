//! `canopy emit-ir` — runs the full pipeline and prints each tree's C11
//! S-expression form, refusing to print IR suppressed by upstream errors.

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Result;
use clap::Args;

use canopy_ir::IrNode;

use crate::errors::CliError;
use crate::{pipeline, report};

#[derive(Args)]
pub struct EmitIrArgs {
    /// Path to the `.bt` source file to lower.
    pub path: PathBuf,

    /// Fully qualified name of the method's declaring (context) type.
    #[clap(long = "context-type")]
    pub context_type: String,

    /// Path to a JSON file describing the host type metadata provider.
    #[clap(long = "context-type-json")]
    pub context_type_json: PathBuf,
}

pub fn execute(args: &EmitIrArgs) -> Result<()> {
    let mut loaded = pipeline::load(&args.path, &args.context_type, &args.context_type_json)?;
    let emitted = loaded.db.emit_ir(&loaded.file)?;
    let file_label = args.path.display().to_string();

    if emitted.suppressed {
        report::print(&file_label, &emitted.diagnostics);
        let all = loaded.db.all_diagnostics(&loaded.file)?;
        return Err(CliError::HasErrors { count: report::error_count(&all) }.into());
    }

    for tree in &emitted.trees {
        let wrapped = IrNode::Tree(Rc::new(tree.clone()));
        println!("{}", canopy_ir::serialize_node(&wrapped));
    }
    Ok(())
}
