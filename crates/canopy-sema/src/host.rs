//! The context-type metadata provider (spec.md §6): the one trait through
//! which name resolution, type checking and generics reach "the host
//! language". No reflection lives in this crate itself — everything it
//! needs about a host type is asked of this trait.

use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullability {
    NotNull,
    Nullable,
}

/// A resolved type reference. Canopy's own primitive types are spelled out;
/// anything else names a host type by its fully-qualified name, matching
/// spec.md §3's `type-ref = fully-qualified-name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Int,
    Float,
    Bool,
    String,
    Null,
    /// The cascade-suppression sentinel (spec.md §4.6). Never produced by
    /// the host provider; only by the type checker itself.
    Error,
    Host(String),
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeRef::Int => write!(f, "int"),
            TypeRef::Float => write!(f, "float"),
            TypeRef::Bool => write!(f, "bool"),
            TypeRef::String => write!(f, "string"),
            TypeRef::Null => write!(f, "null"),
            TypeRef::Error => write!(f, "<error>"),
            TypeRef::Host(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct HostMember {
    pub name: String,
    #[serde(rename = "type", deserialize_with = "deserialize_type_ref")]
    pub type_ref: TypeRef,
    #[serde(default, rename = "nullable", deserialize_with = "deserialize_nullability")]
    pub nullability: Nullability,
    #[serde(default)]
    pub obsolete: bool,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct HostMethod {
    pub name: String,
    #[serde(default)]
    pub declaring_type: String,
    #[serde(default, rename = "params", deserialize_with = "deserialize_type_refs")]
    pub param_types: Vec<TypeRef>,
    #[serde(rename = "return", deserialize_with = "deserialize_type_ref")]
    pub return_type: TypeRef,
    #[serde(default)]
    pub is_async: bool,
    /// True if `return_type` is the runtime node type rather than the
    /// runtime status type (spec.md §4.8: such a call lowers to a
    /// subtree action).
    #[serde(default)]
    pub returns_node: bool,
    #[serde(default)]
    pub obsolete: bool,
}

#[derive(Debug, Clone)]
pub struct HostEnum {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GenericError {
    pub type_arg: String,
    pub constraint: String,
}

/// Capability set injected into C5-C7 (spec.md §6). Implementations must be
/// reference-equatable so the query engine (C10) can treat "same
/// `context_type` input" as a pointer comparison rather than a deep `Eq`.
pub trait HostTypeProvider {
    fn members(&self, type_name: &str) -> &[HostMember];
    fn methods(&self, type_name: &str) -> &[HostMethod];
    fn implements(&self, type_name: &str, interface: &str) -> bool;
    fn resolve_enum(&self, type_name: &str) -> Option<&HostEnum>;
    fn nullability(&self, type_name: &str, member: &str) -> Nullability;
    fn is_obsolete(&self, type_name: &str, member: &str) -> bool;
    fn close_generic(&self, open: &str, args: &[TypeRef]) -> Result<TypeRef, GenericError>;
    /// Type parameters declared by an open generic type, or empty if
    /// `type_name` is not generic. Used by C7's generics pass to decide
    /// whether the pass has anything to do for a given context type.
    fn type_params(&self, type_name: &str) -> &[String];
}

fn deserialize_type_ref<'de, D>(deserializer: D) -> Result<TypeRef, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(parse_type_ref(&s))
}

fn deserialize_type_refs<'de, D>(deserializer: D) -> Result<Vec<TypeRef>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let strings = Vec::<String>::deserialize(deserializer)?;
    Ok(strings.iter().map(|s| parse_type_ref(s)).collect())
}

fn deserialize_nullability<'de, D>(deserializer: D) -> Result<Nullability, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let nullable = bool::deserialize(deserializer)?;
    Ok(if nullable { Nullability::Nullable } else { Nullability::NotNull })
}

fn parse_type_ref(s: &str) -> TypeRef {
    match s {
        "int" => TypeRef::Int,
        "float" => TypeRef::Float,
        "bool" => TypeRef::Bool,
        "string" => TypeRef::String,
        "null" => TypeRef::Null,
        other => TypeRef::Host(other.to_string()),
    }
}

/// A simple in-memory provider built from a fixture, deserializable with
/// `serde`, used by `canopy-cli`'s `--context-type-json` flag and by tests.
#[derive(Debug, Default, serde::Deserialize)]
pub struct StaticHostTypeProvider {
    #[serde(default)]
    types: FxHashMap<String, StaticTypeEntry>,
    #[serde(skip)]
    enums: FxHashMap<String, HostEnum>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct StaticTypeEntry {
    #[serde(default)]
    members: Vec<HostMember>,
    #[serde(default)]
    methods: Vec<HostMethod>,
    #[serde(default)]
    interfaces: Vec<String>,
    #[serde(default)]
    r#enum: Vec<String>,
    #[serde(default)]
    type_params: Vec<String>,
}

impl StaticHostTypeProvider {
    #[must_use]
    pub fn from_json(json: &str) -> Result<Rc<Self>, serde_json::Error> {
        let mut provider: StaticHostTypeProvider = serde_json::from_str(json)?;
        provider.enums = provider
            .types
            .iter()
            .filter(|(_, entry)| !entry.r#enum.is_empty())
            .map(|(name, entry)| {
                (
                    name.clone(),
                    HostEnum {
                        name: name.clone(),
                        members: entry.r#enum.clone(),
                    },
                )
            })
            .collect();
        Ok(Rc::new(provider))
    }
}

impl HostTypeProvider for StaticHostTypeProvider {
    fn members(&self, type_name: &str) -> &[HostMember] {
        self.types.get(type_name).map_or(&[], |t| t.members.as_slice())
    }

    fn methods(&self, type_name: &str) -> &[HostMethod] {
        self.types.get(type_name).map_or(&[], |t| t.methods.as_slice())
    }

    fn implements(&self, type_name: &str, interface: &str) -> bool {
        self.types
            .get(type_name)
            .is_some_and(|t| t.interfaces.iter().any(|i| i == interface))
    }

    fn resolve_enum(&self, type_name: &str) -> Option<&HostEnum> {
        self.enums.get(type_name)
    }

    fn nullability(&self, type_name: &str, member: &str) -> Nullability {
        self.members(type_name)
            .iter()
            .find(|m| m.name == member)
            .map_or(Nullability::NotNull, |m| m.nullability)
    }

    fn is_obsolete(&self, type_name: &str, member: &str) -> bool {
        self.members(type_name).iter().any(|m| m.name == member && m.obsolete)
            || self.methods(type_name).iter().any(|m| m.name == member && m.obsolete)
    }

    fn close_generic(&self, open: &str, args: &[TypeRef]) -> Result<TypeRef, GenericError> {
        let expected = self.type_params(open).len();
        if args.len() != expected {
            return Err(GenericError {
                type_arg: open.to_string(),
                constraint: format!("expected {expected} type argument(s)"),
            });
        }
        Ok(TypeRef::Host(open.to_string()))
    }

    fn type_params(&self, type_name: &str) -> &[String] {
        self.types.get(type_name).map_or(&[], |t| t.type_params.as_slice())
    }
}
