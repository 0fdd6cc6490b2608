//! Type mapper.
//!
//! Converts resolved nodes into [`TypeRef`]s. Named components become
//! references; inline objects, enums and tagged unions are registered as
//! synthesized models named from their context, so no model body is ever
//! inlined.

use std::rc::Rc;

use clientgen_ir::{
    EnumMember, FieldDefinition, ModelKind, ScalarKind, TypeRef, UnionVariant,
};
use heck::ToUpperCamelCase;

use crate::diagnostics::{Diagnostics, escape_token};
use crate::graph::ModelRegistry;
use crate::naming::{Case, NameScope, Namer};
use crate::schema::{NodeRef, SchemaKind, SchemaNode, Tagging};

/// Scalar kind after format overrides.
///
/// `number` + `format: decimal` is an arbitrary-precision decimal, never a
/// float. `binary`/`byte` strings are raw bytes.
pub fn map_scalar(scalar: ScalarKind, format: Option<&str>) -> ScalarKind {
    match (scalar, format) {
        (ScalarKind::Float, Some("decimal")) => ScalarKind::Decimal,
        (ScalarKind::String, Some("binary" | "byte")) => ScalarKind::Bytes,
        (scalar, _) => scalar,
    }
}

/// Maps nodes to types, registering synthesized models as it goes.
#[derive(Debug)]
pub struct TypeMapper<'c> {
    registry: &'c mut ModelRegistry,
    namer: &'c Namer,
    diagnostics: &'c mut Diagnostics,
}

impl<'c> TypeMapper<'c> {
    pub fn new(
        registry: &'c mut ModelRegistry,
        namer: &'c Namer,
        diagnostics: &'c mut Diagnostics,
    ) -> Self {
        Self {
            registry,
            namer,
            diagnostics,
        }
    }

    pub fn namer(&self) -> &'c Namer {
        self.namer
    }

    pub fn diagnostics(&mut self) -> &mut Diagnostics {
        self.diagnostics
    }

    /// Type of a use site. `hint` names any model synthesized for an inline
    /// node; `location` is where collisions are reported.
    pub fn map(&mut self, node: &NodeRef, hint: &str, location: &str) -> TypeRef {
        let model = node
            .name
            .as_deref()
            .and_then(|component| self.registry.component_model(component))
            .map(TypeRef::reference);
        let ty = match model {
            Some(reference) => reference,
            None => self.shape(node, hint, location),
        };
        if node.nullable {
            TypeRef::optional(ty)
        } else {
            ty
        }
    }

    /// Fill the body of a named component's model.
    pub fn component_body(&mut self, component: &str, node: &SchemaNode, location: &str) {
        let Some(model_name) = self
            .registry
            .component_model(component)
            .map(str::to_string)
        else {
            return;
        };
        let kind = self.model_kind(node, &model_name, location);
        self.registry
            .fill_component(component, node.description.clone(), kind);
    }

    /// Type of a node ignoring its name and nullability.
    fn shape(&mut self, node: &NodeRef, hint: &str, location: &str) -> TypeRef {
        match &node.kind {
            SchemaKind::Any => TypeRef::Any,
            SchemaKind::Null => TypeRef::optional(TypeRef::Any),
            SchemaKind::Scalar { scalar, format } => {
                TypeRef::Scalar(map_scalar(*scalar, format.as_deref()))
            }
            SchemaKind::Array { items } => {
                let item = self.map(items, &format!("{hint}Item"), &format!("{location}/items"));
                TypeRef::list(item)
            }
            SchemaKind::Object {
                properties,
                additional,
                ..
            } if properties.is_empty() => match additional {
                Some(value) => TypeRef::dict(self.map(
                    value,
                    &format!("{hint}Value"),
                    &format!("{location}/additionalProperties"),
                )),
                None => TypeRef::dict(TypeRef::Any),
            },
            SchemaKind::Object { .. }
            | SchemaKind::Enum { .. }
            | SchemaKind::Union {
                tagging: Tagging::Tagged { .. },
                ..
            } => self.inline_model(node, hint, location),
            SchemaKind::Union {
                variants,
                tagging: Tagging::Untagged,
            } => {
                let mut members = Vec::with_capacity(variants.len());
                for (index, variant) in variants.iter().enumerate() {
                    let member_hint = format!("{hint}Option{}", index + 1);
                    members.push(self.map(variant, &member_hint, location));
                }
                TypeRef::union(members)
            }
            SchemaKind::BackRef(component) => self
                .registry
                .component_model(component)
                .map_or(TypeRef::Any, TypeRef::reference),
        }
    }

    fn inline_model(&mut self, node: &NodeRef, hint: &str, location: &str) -> TypeRef {
        let (index, name, fresh) =
            self.registry
                .reserve_inline(node, hint, location, self.namer, self.diagnostics);
        if fresh {
            let kind = self.model_kind(node, &name, location);
            self.registry.fill(index, node.description.clone(), kind);
        }
        TypeRef::reference(name)
    }

    /// Model body for a node.
    fn model_kind(&mut self, node: &SchemaNode, model_name: &str, location: &str) -> ModelKind {
        match &node.kind {
            SchemaKind::Object {
                properties,
                required,
                additional,
            } if !properties.is_empty() => {
                let mut scope = NameScope::new(Case::Snake);
                let mut fields = Vec::with_capacity(properties.len());
                for (wire_name, property) in properties {
                    let at = format!("{location}/properties/{}", escape_token(wire_name));
                    let name = self
                        .namer
                        .allocate(&mut scope, wire_name, &at, self.diagnostics);
                    let hint = format!("{model_name}{}", wire_name.to_upper_camel_case());
                    let ty = self.map(property, &hint, &at);
                    fields.push(FieldDefinition {
                        name,
                        wire_name: wire_name.clone(),
                        ty,
                        required: required.contains(wire_name),
                        docstring: property
                            .name
                            .is_none()
                            .then(|| property.description.clone())
                            .flatten(),
                        default: property.default.clone(),
                    });
                }
                let additional_properties = additional.as_ref().map(|value| {
                    self.map(
                        value,
                        &format!("{model_name}Value"),
                        &format!("{location}/additionalProperties"),
                    )
                });
                ModelKind::Object {
                    fields,
                    additional_properties,
                }
            }
            SchemaKind::Enum { values } => {
                let mut scope = NameScope::new(Case::UpperCamel);
                let members = values
                    .iter()
                    .enumerate()
                    .map(|(index, value)| {
                        let raw = value
                            .as_str()
                            .map_or_else(|| value.to_string(), str::to_string);
                        let at = format!("{location}/enum/{index}");
                        EnumMember {
                            name: self.namer.allocate(&mut scope, &raw, &at, self.diagnostics),
                            value: value.clone(),
                        }
                    })
                    .collect();
                ModelKind::Enum { members }
            }
            SchemaKind::Union { variants, tagging }
                if variants.len() > 1 || matches!(tagging, Tagging::Tagged { .. }) =>
            {
                let (discriminator, tags) = match tagging {
                    Tagging::Tagged { property, tags } => (Some(property.clone()), Some(tags)),
                    Tagging::Untagged => (None, None),
                };
                let mut members = Vec::with_capacity(variants.len());
                for (index, variant) in variants.iter().enumerate() {
                    let hint = format!("{model_name}Option{}", index + 1);
                    members.push(UnionVariant {
                        ty: self.map(variant, &hint, location),
                        tag: tags.and_then(|tags| tags.get(index)).cloned(),
                    });
                }
                ModelKind::Union {
                    variants: members,
                    discriminator,
                }
            }
            _ => {
                let body = Rc::new(SchemaNode {
                    name: None,
                    nullable: false,
                    ..node.clone()
                });
                ModelKind::Alias {
                    target: self.shape(&body, model_name, location),
                }
            }
        }
    }
}
