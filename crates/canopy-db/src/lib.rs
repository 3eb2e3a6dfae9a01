#![warn(clippy::pedantic)]
//! The incremental query engine coordinating C1-C9 into a single
//! revision-tracked pipeline (C10, spec.md §4.10).

pub mod db;
pub mod revision;

pub use db::{
    DbError, EmitIrResult, LexResult, LowerResult, ParseResult, QueryDb, ResolveResult, TypeCheckResult,
};
pub use revision::Revision;

/// Opaque key identifying a source file to the query database. Inline
/// sources (a single behavior-tree method body) use
/// `inline://<qualified-type>/<method>`; external files use their path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileId(pub String);

impl FileId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn inline(qualified_type: &str, method: &str) -> Self {
        Self(format!("inline://{qualified_type}/{method}"))
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
