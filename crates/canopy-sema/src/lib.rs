#![warn(clippy::pedantic)]
//! Name resolution, type checking, generics and nullable-flow analysis
//! (C5-C7). Each pass is independently usable (see the module-level docs
//! on `symbol`, `types`, `typecheck`, `generics`, `nullable`); [`analyze`]
//! runs the full pipeline in the order C5 depends on nothing, C6 depends
//! on C5's [`symbol::SymbolTable`], and C7's two sub-passes each depend on
//! C6's outputs independently of each other.

pub mod generics;
pub mod host;
pub mod nullable;
pub mod symbol;
pub mod typecheck;
pub mod types;

use canopy_ast::ast::Program;
use canopy_diagnostics::DiagnosticBag;

pub use host::{GenericError, HostEnum, HostMember, HostMethod, HostTypeProvider, Nullability, StaticHostTypeProvider, TypeRef};
pub use symbol::{ResolvedSymbol, SymbolTable};
pub use typecheck::TypeCheckResult;
pub use types::{PromotionTable, TypeTable};

pub struct AnalysisResult {
    pub symbols: SymbolTable,
    pub types: TypeTable,
    pub promotions: PromotionTable,
}

#[must_use]
pub fn analyze(program: &Program, host: &dyn HostTypeProvider, context_type: &str) -> (AnalysisResult, DiagnosticBag) {
    let mut diagnostics = DiagnosticBag::new();

    let (symbols, resolve_diags) = symbol::resolve(program, host, context_type);
    diagnostics.extend(resolve_diags);

    let (type_result, typecheck_diags) = typecheck::check(program, &symbols);
    diagnostics.extend(typecheck_diags);

    let generics_diags = generics::check(program, &type_result.types, context_type, host);
    diagnostics.extend(generics_diags);

    let nullable_diags = nullable::check(program, &symbols);
    diagnostics.extend(nullable_diags);

    (
        AnalysisResult {
            symbols,
            types: type_result.types,
            promotions: type_result.promotions,
        },
        diagnostics,
    )
}
