//! Resolved schema tree.
//!
//! Output of the resolver and merger, input of the type mapper. There is no
//! unresolved reference kind: a cycle is represented by [`SchemaKind::BackRef`]
//! naming the component being built.

use std::rc::Rc;

use clientgen_ir::ScalarKind;
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

/// Shared handle to a resolved node. Repeated references to one component
/// yield the same allocation.
pub type NodeRef = Rc<SchemaNode>;

/// A resolved schema fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    pub nullable: bool,
    /// Component name when this node is the body of a named component.
    pub name: Option<String>,
    pub description: Option<String>,
    pub default: Option<Value>,
}

impl SchemaNode {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            nullable: false,
            name: None,
            description: None,
            default: None,
        }
    }

    pub fn any() -> Self {
        Self::new(SchemaKind::Any)
    }

    pub fn scalar(scalar: ScalarKind) -> Self {
        Self::new(SchemaKind::Scalar {
            scalar,
            format: None,
        })
    }

    /// Property map, for object nodes.
    pub fn properties(&self) -> Option<&IndexMap<String, NodeRef>> {
        match &self.kind {
            SchemaKind::Object { properties, .. } => Some(properties),
            _ => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self.kind, SchemaKind::Object { .. })
    }

    /// Single literal value this node admits, from a one-element `enum` or
    /// a `const`.
    pub fn single_literal(&self) -> Option<&Value> {
        match &self.kind {
            SchemaKind::Enum { values } if values.len() == 1 => values.first(),
            _ => None,
        }
    }
}

/// Shape of a resolved node.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    /// No type constraint.
    Any,
    /// Only `null`; folded into nullability wherever it appears in a union.
    Null,
    Scalar {
        scalar: ScalarKind,
        format: Option<String>,
    },
    Object {
        /// Declaration order is field order.
        properties: IndexMap<String, NodeRef>,
        required: IndexSet<String>,
        /// `None` for closed objects, `Some(Any)` for `additionalProperties: true`.
        additional: Option<NodeRef>,
    },
    Array {
        items: NodeRef,
    },
    /// Raw values, case preserved.
    Enum {
        values: Vec<Value>,
    },
    Union {
        variants: Vec<NodeRef>,
        tagging: Tagging,
    },
    /// Reference to a named component that was still being resolved.
    BackRef(String),
}

/// How a union picks its variant at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tagging {
    /// `anyOf`, or `oneOf` without a discriminator.
    Untagged,
    /// `oneOf` with a discriminator; `tags[i]` selects `variants[i]`.
    Tagged { property: String, tags: Vec<String> },
}
