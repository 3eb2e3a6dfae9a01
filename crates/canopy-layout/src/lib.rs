#![warn(clippy::pedantic)]
//! Projects an IR tree into a neutral, editor-facing layout model (C13,
//! spec.md §4.11): `(id, node_type_tag, label?, origin_span,
//! resolved_type?, children[])`, with diagnostics bundled onto the node
//! whose origin most tightly contains them.

mod layout;
mod print;

pub use layout::{build_layout, LayoutNode, LayoutTree};
pub use print::{format_action_label, format_expr};
