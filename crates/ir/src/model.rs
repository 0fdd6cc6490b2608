//! Named, emittable model definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::TypeRef;

/// A named type produced by the schema graph builder.
///
/// Models are immutable once the IR is handed out; other types refer to
/// them through [`TypeRef::Reference`] by `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    /// Sanitized, unique model name.
    pub name: String,
    /// Component name in the source document; `None` for models
    /// synthesized from inline schemas.
    pub source_name: Option<String>,
    /// Source `description`, if any.
    pub docstring: Option<String>,
    pub kind: ModelKind,
    /// Tagged unions this model is a member of, in discovery order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variant_of: Vec<VariantOf>,
}

impl ModelDefinition {
    /// Object fields, or an empty slice for non-object models.
    pub fn fields(&self) -> &[FieldDefinition] {
        match &self.kind {
            ModelKind::Object { fields, .. } => fields,
            _ => &[],
        }
    }

    /// Look up a field by its sanitized name.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields().iter().find(|f| f.name == name)
    }
}

/// Shape of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelKind {
    /// Record with ordered fields.
    Object {
        fields: Vec<FieldDefinition>,
        /// Value type of extra keys when the object is also open-ended.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        additional_properties: Option<TypeRef>,
    },
    /// Enumeration keyed by the raw values.
    Enum { members: Vec<EnumMember> },
    /// Union of variants; tagged when `discriminator` is set.
    Union {
        variants: Vec<UnionVariant>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        discriminator: Option<String>,
    },
    /// Named alias of another type (scalar, list or map component).
    Alias { target: TypeRef },
}

/// One field of an object model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Sanitized field name.
    pub name: String,
    /// Property name as it appears on the wire.
    pub wire_name: String,
    pub ty: TypeRef,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// One member of an enumeration model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    /// Sanitized member name.
    pub name: String,
    /// Raw value, case preserved.
    pub value: Value,
}

/// One variant of a union model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionVariant {
    pub ty: TypeRef,
    /// Discriminator value selecting this variant (tagged unions only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Membership of a model in a tagged union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantOf {
    /// Name of the union model.
    pub union: String,
    /// Discriminator property name.
    pub property: String,
    /// Tag value for this model.
    pub tag: String,
}
