//! `canopy layout` — runs the pipeline and prints each tree's C13 layout
//! projection as an indented outline, one line per node.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use canopy_layout::LayoutNode;

use crate::errors::CliError;
use crate::{pipeline, report};

#[derive(Args)]
pub struct LayoutArgs {
    /// Path to the `.bt` source file to project.
    pub path: PathBuf,

    /// Fully qualified name of the method's declaring (context) type.
    #[clap(long = "context-type")]
    pub context_type: String,

    /// Path to a JSON file describing the host type metadata provider.
    #[clap(long = "context-type-json")]
    pub context_type_json: PathBuf,
}

fn print_node(node: &LayoutNode, depth: usize) {
    let indent = "  ".repeat(depth);
    let label = node.label.as_deref().unwrap_or("");
    let ty = node.resolved_type.as_ref().map_or(String::new(), |t| format!(" : {t}"));
    println!("{indent}#{} {}{label}{ty} @{}", node.id, node.node_type_tag, node.origin);
    for diag in &node.diagnostics {
        println!("{indent}  ! {}[{}]: {}", diag.severity, diag.code, diag.code.message(&diag.message_args));
    }
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

pub fn execute(args: &LayoutArgs) -> Result<()> {
    let mut loaded = pipeline::load(&args.path, &args.context_type, &args.context_type_json)?;
    let emitted = loaded.db.emit_ir(&loaded.file)?;
    let all = loaded.db.all_diagnostics(&loaded.file)?;

    for tree in &emitted.trees {
        let layout = canopy_layout::build_layout(tree, &all);
        println!("tree {}", layout.name);
        print_node(&layout.root, 1);
    }

    let errors = report::error_count(&all);
    if errors > 0 {
        return Err(CliError::HasErrors { count: errors }.into());
    }
    Ok(())
}
