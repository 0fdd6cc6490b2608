//! Schema graph builder.
//!
//! Model identity comes before model bodies: every component's model name
//! is reserved first, then bodies are built and may refer to any sibling by
//! name, including ones whose body does not exist yet.

use std::collections::HashMap;
use std::rc::Rc;

use clientgen_ir::{ModelDefinition, ModelKind, TypeRef, VariantOf};
use tracing::debug;

use crate::diagnostics::{Diagnostics, component_location};
use crate::document::Document;
use crate::error::CompileError;
use crate::mapper::TypeMapper;
use crate::naming::{Case, NameScope, Namer};
use crate::resolve::Resolver;
use crate::schema::{NodeRef, SchemaNode};

#[derive(Debug)]
struct Slot {
    name: String,
    source_name: Option<String>,
    docstring: Option<String>,
    /// `None` while the name is reserved but the body is not built yet.
    kind: Option<ModelKind>,
}

/// The model set under construction, in first-discovery order.
#[derive(Debug)]
pub struct ModelRegistry {
    scope: NameScope,
    slots: Vec<Slot>,
    components: HashMap<String, usize>,
    /// Inline nodes already registered, keyed by allocation. The `NodeRef`
    /// keeps the address alive.
    inline: HashMap<*const SchemaNode, (NodeRef, usize)>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            scope: NameScope::new(Case::UpperCamel),
            slots: Vec::new(),
            components: HashMap::new(),
            inline: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Reserve the model name for a component.
    pub fn reserve_component(
        &mut self,
        component: &str,
        namer: &Namer,
        diagnostics: &mut Diagnostics,
    ) -> String {
        if let Some(&index) = self.components.get(component) {
            return self.slots[index].name.clone();
        }
        let name = namer.allocate(
            &mut self.scope,
            component,
            &component_location(component),
            diagnostics,
        );
        self.components
            .insert(component.to_string(), self.slots.len());
        self.slots.push(Slot {
            name: name.clone(),
            source_name: Some(component.to_string()),
            docstring: None,
            kind: None,
        });
        name
    }

    /// Model name of a component, once reserved.
    pub fn component_model(&self, component: &str) -> Option<&str> {
        self.components
            .get(component)
            .map(|&index| self.slots[index].name.as_str())
    }

    /// Reserve a slot for an inline node. Returns the slot, its name and
    /// whether the body still has to be built.
    pub(crate) fn reserve_inline(
        &mut self,
        node: &NodeRef,
        hint: &str,
        location: &str,
        namer: &Namer,
        diagnostics: &mut Diagnostics,
    ) -> (usize, String, bool) {
        if let Some((_, index)) = self.inline.get(&Rc::as_ptr(node)) {
            return (*index, self.slots[*index].name.clone(), false);
        }
        let name = namer.allocate(&mut self.scope, hint, location, diagnostics);
        let index = self.slots.len();
        debug!(model = %name, location, "synthesized inline model");
        self.inline.insert(Rc::as_ptr(node), (Rc::clone(node), index));
        self.slots.push(Slot {
            name: name.clone(),
            source_name: None,
            docstring: None,
            kind: None,
        });
        (index, name, true)
    }

    pub(crate) fn fill(&mut self, index: usize, docstring: Option<String>, kind: ModelKind) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.docstring = docstring;
            slot.kind = Some(kind);
        }
    }

    pub(crate) fn fill_component(
        &mut self,
        component: &str,
        docstring: Option<String>,
        kind: ModelKind,
    ) {
        if let Some(&index) = self.components.get(component) {
            self.fill(index, docstring, kind);
        }
    }

    /// Freeze the set: record tagged-union memberships and hand out the
    /// models in discovery order.
    pub fn finish(self) -> Vec<ModelDefinition> {
        let mut models: Vec<ModelDefinition> = self
            .slots
            .into_iter()
            .map(|slot| ModelDefinition {
                name: slot.name,
                source_name: slot.source_name,
                docstring: slot.docstring,
                kind: slot.kind.unwrap_or(ModelKind::Alias {
                    target: TypeRef::Any,
                }),
                variant_of: Vec::new(),
            })
            .collect();

        let mut memberships = Vec::new();
        for model in &models {
            let ModelKind::Union {
                variants,
                discriminator: Some(property),
            } = &model.kind
            else {
                continue;
            };
            for variant in variants {
                if let (TypeRef::Reference(member), Some(tag)) =
                    (variant.ty.non_optional(), &variant.tag)
                {
                    memberships.push((
                        member.clone(),
                        VariantOf {
                            union: model.name.clone(),
                            property: property.clone(),
                            tag: tag.clone(),
                        },
                    ));
                }
            }
        }

        let positions: HashMap<String, usize> = models
            .iter()
            .enumerate()
            .map(|(index, model)| (model.name.clone(), index))
            .collect();
        for (member, membership) in memberships {
            if let Some(model) = positions.get(&member).and_then(|&i| models.get_mut(i)) {
                if !model.variant_of.contains(&membership) {
                    model.variant_of.push(membership);
                }
            }
        }

        models
    }
}

/// Build every component's model.
///
/// Pass 1 reserves a name for each component in document order. Pass 2
/// resolves each component and fills its body; inline models discovered
/// on the way are appended after the components.
pub fn build(
    document: &Document,
    resolver: &mut Resolver<'_>,
    registry: &mut ModelRegistry,
    namer: &Namer,
    diagnostics: &mut Diagnostics,
) -> Result<(), CompileError> {
    let schemas = &document.components.schemas;
    debug!(count = schemas.len(), "reserving component model names");
    for component in schemas.keys() {
        registry.reserve_component(component, namer, diagnostics);
    }

    let mut mapper = TypeMapper::new(registry, namer, diagnostics);
    for component in schemas.keys() {
        let node = resolver.resolve_component(component, mapper.diagnostics())?;
        mapper.component_body(component, &node, &component_location(component));
    }
    debug!(models = registry.len(), "component models built");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use clientgen_ir::{DiagnosticCode, ScalarKind};

    fn models(schemas: &str) -> (Vec<ModelDefinition>, Vec<clientgen_ir::Diagnostic>) {
        let document = Document::from_json_str(&format!(
            r##"{{ "components": {{ "schemas": {schemas} }} }}"##
        ))
        .unwrap();
        let mut resolver = Resolver::new(&document);
        let mut registry = ModelRegistry::new();
        let mut diagnostics = Diagnostics::new();
        build(
            &document,
            &mut resolver,
            &mut registry,
            &Namer::default(),
            &mut diagnostics,
        )
        .unwrap();
        (registry.finish(), diagnostics.into_vec())
    }

    #[test]
    fn test_component_is_reserved_once() {
        let namer = Namer::default();
        let mut diagnostics = Diagnostics::new();
        let mut registry = ModelRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(
            registry.reserve_component("pet", &namer, &mut diagnostics),
            "Pet"
        );
        assert_eq!(
            registry.reserve_component("pet", &namer, &mut diagnostics),
            "Pet"
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.component_model("pet"), Some("Pet"));
        assert!(diagnostics.is_empty());

        // A slot whose body was never filled still yields a model.
        let models = registry.finish();
        assert_eq!(
            models[0].kind,
            ModelKind::Alias {
                target: TypeRef::Any
            }
        );
    }

    #[test]
    fn test_mutually_recursive_models() {
        let (models, _) = models(
            r##"{
                "Author": {
                    "type": "object",
                    "properties": {
                        "books": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } }
                    }
                },
                "Book": {
                    "type": "object",
                    "required": ["author"],
                    "properties": { "author": { "$ref": "#/components/schemas/Author" } }
                }
            }"##,
        );
        let names: Vec<_> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Author", "Book"]);
        assert_eq!(
            models[0].field("books").unwrap().ty,
            TypeRef::list(TypeRef::reference("Book"))
        );
        let author = models[1].field("author").unwrap();
        assert_eq!(author.ty, TypeRef::reference("Author"));
        assert!(author.required);
    }

    #[test]
    fn test_inline_models_follow_components() {
        let (models, _) = models(
            r##"{
                "Pet": {
                    "type": "object",
                    "properties": {
                        "owner": {
                            "type": "object",
                            "properties": { "name": { "type": "string" } }
                        },
                        "status": { "type": "string", "enum": ["available", "sold"] }
                    }
                },
                "Tag": { "type": "string" }
            }"##,
        );
        let names: Vec<_> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Pet", "Tag", "PetOwner", "PetStatus"]);
        assert_eq!(models[2].source_name, None);
        assert_eq!(
            models[1].kind,
            ModelKind::Alias {
                target: TypeRef::Scalar(ScalarKind::String)
            }
        );
    }

    #[test]
    fn test_field_names_are_sanitized_per_model() {
        let (models, diagnostics) = models(
            r##"{
                "Item": {
                    "type": "object",
                    "properties": {
                        "type": { "type": "string" },
                        "itemId": { "type": "integer" },
                        "item_id": { "type": "integer" }
                    }
                }
            }"##,
        );
        let fields: Vec<_> = models[0]
            .fields()
            .iter()
            .map(|f| (f.name.as_str(), f.wire_name.as_str()))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("type_", "type"),
                ("item_id", "itemId"),
                ("item_id_2", "item_id")
            ]
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::NameCollision);
    }

    #[test]
    fn test_tagged_union_records_variant_of() {
        let (models, _) = models(
            r##"{
                "Pet": {
                    "oneOf": [
                        { "$ref": "#/components/schemas/Cat" },
                        { "$ref": "#/components/schemas/Dog" }
                    ],
                    "discriminator": { "propertyName": "kind" }
                },
                "Cat": {
                    "type": "object",
                    "properties": { "kind": { "type": "string", "enum": ["cat"] } }
                },
                "Dog": {
                    "type": "object",
                    "properties": { "kind": { "type": "string", "const": "dog" } }
                }
            }"##,
        );
        let ModelKind::Union {
            variants,
            discriminator,
        } = &models[0].kind
        else {
            panic!("expected union");
        };
        assert_eq!(discriminator.as_deref(), Some("kind"));
        assert_eq!(variants[0].ty, TypeRef::reference("Cat"));
        assert_eq!(variants[1].tag.as_deref(), Some("dog"));
        assert_eq!(
            models[1].variant_of,
            vec![VariantOf {
                union: "Pet".into(),
                property: "kind".into(),
                tag: "cat".into(),
            }]
        );
    }

    #[test]
    fn test_nullable_component_is_optional_at_use_sites() {
        let (models, _) = models(
            r##"{
                "Maybe": { "type": "object", "nullable": true, "properties": { "x": {} } },
                "Holder": {
                    "type": "object",
                    "properties": { "m": { "$ref": "#/components/schemas/Maybe" } }
                }
            }"##,
        );
        assert_eq!(
            models[1].field("m").unwrap().ty,
            TypeRef::optional(TypeRef::reference("Maybe"))
        );
        assert_eq!(models[0].field("x").unwrap().ty, TypeRef::Any);
    }
}
