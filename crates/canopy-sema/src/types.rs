//! Type representation for C6, grounded on
//! `core/type-checker/src/type_info.rs`'s `TypeInfo`/`TypeInfoKind` split,
//! narrowed from the host language's primitive/struct/enum universe to
//! Canopy's smaller DSL type set (spec.md §3/§4.6): `int`, `float`, `bool`,
//! `string`, `null`, and host reference types reported by the provider.
//!
//! The one behavioral difference from the teacher: `TypeInfo` here *is*
//! [`crate::host::TypeRef`] (re-exported), since spec.md's promotion table
//! and cascade-suppression sentinel are fully expressible over that type
//! already — a second parallel type representation would just be
//! indirection with no added meaning.

use rustc_hash::{FxHashMap, FxHashSet};

use canopy_ast::ast::NodeId;

pub use crate::host::TypeRef;

pub type TypeTable = FxHashMap<NodeId, TypeRef>;

/// Nodes whose binary operation promotes an int operand to float (spec.md
/// §4.6's "Implicit conversion insertion... decided here"). Read by C8 to
/// insert an explicit `Convert` on the int side.
pub type PromotionTable = FxHashSet<NodeId>;

#[must_use]
pub fn is_numeric(t: &TypeRef) -> bool {
    matches!(t, TypeRef::Int | TypeRef::Float)
}

/// Per spec.md §4.6's comparison rule: operands are comparable if they are
/// identical, numeric-promotable, or one side is `null` and the other a
/// reference/nullable type. `TypeRef::Host` is treated as reference-typed.
#[must_use]
pub fn comparable(lhs: &TypeRef, rhs: &TypeRef) -> bool {
    if lhs == rhs {
        return true;
    }
    if is_numeric(lhs) && is_numeric(rhs) {
        return true;
    }
    matches!((lhs, rhs), (TypeRef::Null, TypeRef::Host(_)) | (TypeRef::Host(_), TypeRef::Null))
}

/// The int/int, float/float, or int/float promotion result for an
/// arithmetic binary op, or `None` if the pair is not arithmetic-typed
/// (string/bool operands to `+ - * / %` are a type error, not a promotion).
#[must_use]
pub fn arithmetic_result(lhs: &TypeRef, rhs: &TypeRef) -> Option<TypeRef> {
    match (lhs, rhs) {
        (TypeRef::Int, TypeRef::Int) => Some(TypeRef::Int),
        (TypeRef::Float, TypeRef::Float) | (TypeRef::Int, TypeRef::Float) | (TypeRef::Float, TypeRef::Int) => {
            Some(TypeRef::Float)
        }
        _ => None,
    }
}
