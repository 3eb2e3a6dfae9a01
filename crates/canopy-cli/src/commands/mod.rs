//! Subcommand implementations for the `canopy` CLI.

pub mod check;
pub mod emit_ir;
pub mod layout;
