//! Target-neutral type descriptors.
//!
//! `TypeRef` is the only way the IR talks about types. It never embeds a
//! model body: named models are referred to by name and looked up in the
//! model set, which is what lets recursive models terminate.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Scalar kinds understood by every emission target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    String,
    Integer,
    Float,
    Bool,
    /// Arbitrary-precision decimal (`type: number, format: decimal`).
    Decimal,
    Bytes,
}

impl ScalarKind {
    /// Short lowercase name, as used in `Display`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Integer => "int",
            ScalarKind::Float => "float",
            ScalarKind::Bool => "bool",
            ScalarKind::Decimal => "decimal",
            ScalarKind::Bytes => "bytes",
        }
    }
}

/// Reference to a type.
///
/// Build values through [`TypeRef::optional`] and [`TypeRef::union`] rather
/// than the raw variants: those constructors keep the invariants that
/// `Optional` never nests and that union members are flat, unique and in
/// first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum TypeRef {
    /// Unconstrained value (schema without any type information).
    Any,
    Scalar(ScalarKind),
    /// Named model in the model set.
    Reference(String),
    List(Box<TypeRef>),
    /// String-keyed map.
    Dict(Box<TypeRef>),
    Optional(Box<TypeRef>),
    Union(Vec<TypeRef>),
}

impl TypeRef {
    /// Reference to a named model.
    pub fn reference(name: impl Into<String>) -> Self {
        TypeRef::Reference(name.into())
    }

    /// `List(item)`.
    pub fn list(item: TypeRef) -> Self {
        TypeRef::List(Box::new(item))
    }

    /// `Dict(value)`.
    pub fn dict(value: TypeRef) -> Self {
        TypeRef::Dict(Box::new(value))
    }

    /// Wrap in `Optional`, collapsing repeated nullability into one wrapper.
    pub fn optional(inner: TypeRef) -> Self {
        match inner {
            TypeRef::Optional(_) => inner,
            other => TypeRef::Optional(Box::new(other)),
        }
    }

    /// Build a union from members.
    ///
    /// Nested unions are flattened, duplicates dropped (first occurrence
    /// wins its position), optional members are unwrapped and the whole
    /// union wrapped once instead. A single remaining member is returned
    /// as-is and an empty member list yields `Any`.
    pub fn union(members: impl IntoIterator<Item = TypeRef>) -> Self {
        let mut flat = Vec::new();
        let mut optional = false;
        for member in members {
            push_flat(member, &mut flat, &mut optional);
        }

        let core = if flat.len() == 1 {
            flat.pop().unwrap_or(TypeRef::Any)
        } else if flat.is_empty() {
            TypeRef::Any
        } else {
            TypeRef::Union(flat)
        };

        if optional {
            Self::optional(core)
        } else {
            core
        }
    }

    /// Whether the outermost layer is `Optional`.
    pub fn is_optional(&self) -> bool {
        matches!(self, TypeRef::Optional(_))
    }

    /// The type with one layer of `Optional` removed, if any.
    pub fn non_optional(&self) -> &TypeRef {
        match self {
            TypeRef::Optional(inner) => inner,
            other => other,
        }
    }

    /// Names of all models referenced anywhere inside this type, in
    /// depth-first order (duplicates preserved).
    pub fn referenced_models(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TypeRef::Any | TypeRef::Scalar(_) => {}
            TypeRef::Reference(name) => out.push(name),
            TypeRef::List(inner) | TypeRef::Dict(inner) | TypeRef::Optional(inner) => {
                inner.collect_references(out);
            }
            TypeRef::Union(members) => {
                for member in members {
                    member.collect_references(out);
                }
            }
        }
    }
}

fn push_flat(member: TypeRef, out: &mut Vec<TypeRef>, optional: &mut bool) {
    match member {
        TypeRef::Optional(inner) => {
            *optional = true;
            push_flat(*inner, out, optional);
        }
        TypeRef::Union(members) => {
            for m in members {
                push_flat(m, out, optional);
            }
        }
        other => {
            if !out.contains(&other) {
                out.push(other);
            }
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Any => f.write_str("any"),
            TypeRef::Scalar(kind) => f.write_str(kind.as_str()),
            TypeRef::Reference(name) => f.write_str(name),
            TypeRef::List(item) => write!(f, "list[{item}]"),
            TypeRef::Dict(value) => write!(f, "dict[string, {value}]"),
            TypeRef::Optional(inner) => write!(f, "optional[{inner}]"),
            TypeRef::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
        }
    }
}
