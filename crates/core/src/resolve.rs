//! Reference resolver.
//!
//! Turns raw schemas and `$ref` pointers into [`SchemaNode`] trees. Pointers
//! are rooted at `#/components/schemas/` and may reach into a component
//! (`…/Pet/properties/owner`, `items`, `allOf/0`, `additionalProperties`).
//!
//! Completed resolutions are cached per pointer, so every reference to a
//! component yields the same `Rc`. A pointer that is still on the
//! resolution stack becomes a [`SchemaKind::BackRef`] when it names a
//! component, which is what lets recursive models terminate.
//!
//! `allOf` fragments written as `$ref` are expanded rather than referenced.
//! A fragment whose target is still in progress is expanded again outside
//! the cache; a target that is already part of the current composition
//! chain is a [`CompileError::CyclicComposition`].

use std::collections::HashMap;
use std::rc::Rc;

use clientgen_ir::ScalarKind;
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::compose::{self, DeclaredTag, UnionKind, Variant};
use crate::diagnostics::{Diagnostics, escape_token};
use crate::document::{AdditionalProperties, Document, Schema};
use crate::error::CompileError;
use crate::schema::{NodeRef, SchemaKind, SchemaNode, Tagging};

pub(crate) const COMPONENT_PREFIX: &str = "#/components/schemas/";

/// Pointer to a named component.
pub fn component_pointer(name: &str) -> String {
    format!("{COMPONENT_PREFIX}{}", escape_token(name))
}

/// Component name of a pointer that addresses a whole component, e.g.
/// `Pet` for `#/components/schemas/Pet`.
pub fn component_name(pointer: &str) -> Option<String> {
    let rest = pointer.strip_prefix(COMPONENT_PREFIX)?;
    if rest.is_empty() || rest.contains('/') {
        return None;
    }
    Some(unescape_token(rest))
}

fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Human readable form of a pointer for error chains.
fn display_name(pointer: &str) -> String {
    pointer
        .strip_prefix(COMPONENT_PREFIX)
        .map_or_else(|| pointer.to_string(), unescape_token)
}

#[derive(Debug)]
struct Frame {
    pointer: String,
    /// Entered as an `allOf` fragment of the frame below, while that frame
    /// was being composed.
    composition_link: bool,
    /// Expanded outside the cache because the pointer was already in
    /// progress.
    fresh: bool,
}

/// Raw schema a pointer addresses.
struct Target<'a> {
    component: String,
    /// Tokens after the component name; empty for a whole component.
    tokens: Vec<String>,
    schema: &'a Schema,
}

impl Target<'_> {
    fn is_component(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Resolver state for one document.
#[derive(Debug)]
pub struct Resolver<'a> {
    document: &'a Document,
    cache: HashMap<String, NodeRef>,
    stack: Vec<Frame>,
}

impl<'a> Resolver<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self {
            document,
            cache: HashMap::new(),
            stack: Vec::new(),
        }
    }

    /// Resolve a pointer to its node.
    pub fn resolve(
        &mut self,
        pointer: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<NodeRef, CompileError> {
        self.resolve_at(pointer, pointer, false, diagnostics)
    }

    /// Resolve a named component.
    pub fn resolve_component(
        &mut self,
        name: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<NodeRef, CompileError> {
        self.resolve(&component_pointer(name), diagnostics)
    }

    /// Resolve an inline schema found at `location` (parameter, body or
    /// response schemas). The result is not cached.
    pub fn resolve_schema(
        &mut self,
        schema: &Schema,
        location: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<NodeRef, CompileError> {
        self.build(schema, location, None, false, diagnostics)
    }

    fn in_progress(&self, pointer: &str) -> bool {
        self.stack.iter().any(|frame| frame.pointer == pointer)
    }

    fn target(&self, pointer: &str, location: &str) -> Result<Target<'a>, CompileError> {
        let broken = || CompileError::BrokenReference {
            pointer: pointer.to_string(),
            location: location.to_string(),
        };

        let Some(rest) = pointer.strip_prefix(COMPONENT_PREFIX) else {
            return Err(CompileError::UnsupportedReference {
                pointer: pointer.to_string(),
            });
        };

        let mut tokens = rest.split('/').map(unescape_token);
        let component = tokens.next().ok_or_else(broken)?;
        let document = self.document;
        let mut schema = document.schema(&component).ok_or_else(broken)?;
        let tokens: Vec<String> = tokens.collect();

        let mut walk = tokens.iter();
        while let Some(token) = walk.next() {
            let next = match token.as_str() {
                "properties" => walk.next().and_then(|name| schema.properties.get(name)),
                "items" => schema.items.as_deref(),
                "additionalProperties" => match &schema.additional_properties {
                    Some(AdditionalProperties::Schema(inner)) => Some(inner.as_ref()),
                    _ => None,
                },
                "allOf" | "oneOf" | "anyOf" => {
                    let list = match token.as_str() {
                        "allOf" => &schema.all_of,
                        "oneOf" => &schema.one_of,
                        _ => &schema.any_of,
                    };
                    walk.next()
                        .and_then(|index| index.parse::<usize>().ok())
                        .and_then(|index| list.get(index))
                }
                _ => None,
            };
            schema = next.ok_or_else(broken)?;
        }

        Ok(Target {
            component,
            tokens,
            schema,
        })
    }

    /// Resolve a plain reference: cached, back-referenced when in progress.
    fn resolve_at(
        &mut self,
        pointer: &str,
        location: &str,
        composition_link: bool,
        diagnostics: &mut Diagnostics,
    ) -> Result<NodeRef, CompileError> {
        let target = self.target(pointer, location)?;

        if let Some(node) = self.cache.get(pointer) {
            debug!(pointer, "schema cache hit");
            return Ok(Rc::clone(node));
        }

        if self.in_progress(pointer) {
            if !target.is_component() {
                return Err(CompileError::UnrepresentableCycle {
                    pointer: pointer.to_string(),
                });
            }
            debug!(pointer, "back-reference to in-progress component");
            let mut node = SchemaNode::new(SchemaKind::BackRef(target.component));
            node.nullable = target.schema.is_nullable();
            return Ok(Rc::new(node));
        }

        if !target.is_component() {
            let root = component_pointer(&target.component);
            if !self.in_progress(&root) {
                let root = self.resolve_at(&root, location, false, diagnostics)?;
                if let Some(node) = navigate(&root, &target.tokens) {
                    self.cache.insert(pointer.to_string(), Rc::clone(&node));
                    return Ok(node);
                }
            }
        }

        let node = self.expand(pointer, &target, composition_link, false, diagnostics)?;
        self.cache.insert(pointer.to_string(), Rc::clone(&node));
        Ok(node)
    }

    /// Resolve a `$ref` written as an `allOf` fragment. `spine` is set when
    /// the fragment belongs to the composition of the frame on top of the
    /// stack.
    fn resolve_fragment(
        &mut self,
        pointer: &str,
        location: &str,
        spine: bool,
        diagnostics: &mut Diagnostics,
    ) -> Result<NodeRef, CompileError> {
        let target = self.target(pointer, location)?;

        if spine {
            let mut chain = Vec::new();
            for frame in self.stack.iter().rev() {
                chain.push(frame.pointer.as_str());
                if !frame.composition_link {
                    break;
                }
            }
            if let Some(start) = chain.iter().position(|p| *p == pointer) {
                let mut names: Vec<String> =
                    chain[..=start].iter().rev().map(|p| display_name(p)).collect();
                names.push(display_name(pointer));
                return Err(CompileError::CyclicComposition { chain: names });
            }
        }

        if self.in_progress(pointer) {
            if self
                .stack
                .iter()
                .any(|frame| frame.pointer == pointer && frame.fresh)
            {
                return Err(CompileError::UnrepresentableCycle {
                    pointer: pointer.to_string(),
                });
            }
            debug!(pointer, "expanding in-progress allOf fragment");
            return self.expand(pointer, &target, spine, true, diagnostics);
        }

        self.resolve_at(pointer, location, spine, diagnostics)
    }

    fn expand(
        &mut self,
        pointer: &str,
        target: &Target<'a>,
        composition_link: bool,
        fresh: bool,
        diagnostics: &mut Diagnostics,
    ) -> Result<NodeRef, CompileError> {
        self.stack.push(Frame {
            pointer: pointer.to_string(),
            composition_link,
            fresh,
        });
        let name = target.is_component().then_some(target.component.as_str());
        let result = self.build(target.schema, pointer, name, true, diagnostics);
        self.stack.pop();
        result
    }

    /// Build the node for a raw schema.
    ///
    /// `name` is set when `schema` is the body of a named component. `spine`
    /// is set while walking the `allOf` composition of the top frame.
    fn build(
        &mut self,
        schema: &Schema,
        location: &str,
        name: Option<&str>,
        spine: bool,
        diagnostics: &mut Diagnostics,
    ) -> Result<NodeRef, CompileError> {
        if let Some(pointer) = &schema.ref_path {
            let target = self.resolve_at(pointer, location, false, diagnostics)?;
            return Ok(reference(target, schema, name));
        }

        if !schema.all_of.is_empty() {
            return self.all_of(schema, location, name, spine, diagnostics);
        }

        let union = if schema.one_of.is_empty() {
            (!schema.any_of.is_empty()).then_some((UnionKind::AnyOf, &schema.any_of))
        } else {
            Some((UnionKind::OneOf, &schema.one_of))
        };
        if let Some((kind, members)) = union {
            let mut variants = Vec::with_capacity(members.len());
            for (index, member) in members.iter().enumerate() {
                let at = format!("{location}/{}/{index}", kind.keyword());
                let node = self.build(member, &at, None, false, diagnostics)?;
                let mut variant =
                    Variant::new(node, member.ref_path.as_deref().and_then(component_name));
                if let (SchemaKind::BackRef(target), Some(discriminator)) =
                    (&variant.node.kind, &schema.discriminator)
                {
                    variant.declared =
                        Some(self.declared_tag(target, &discriminator.property_name));
                }
                variants.push(variant);
            }
            let node = compose::classify(
                kind,
                variants,
                schema.discriminator.as_ref(),
                location,
                diagnostics,
            )?;
            return Ok(Rc::new(annotate(node, schema, name)));
        }

        if let Some(values) = &schema.enum_values {
            return Ok(Rc::new(annotate(literals(values), schema, name)));
        }
        if let Some(value) = &schema.const_value {
            return Ok(Rc::new(annotate(
                literals(std::slice::from_ref(value)),
                schema,
                name,
            )));
        }

        let kind = match schema.type_names().as_slice() {
            [] if schema.is_null_type() => SchemaKind::Null,
            [] if !schema.properties.is_empty()
                || !schema.required.is_empty()
                || schema.additional_properties.is_some() =>
            {
                self.object(schema, location, diagnostics)?
            }
            [] if schema.items.is_some() => self.typed("array", schema, location, diagnostics)?,
            [] => SchemaKind::Any,
            [single] => self.typed(single, schema, location, diagnostics)?,
            many => {
                let mut variants = Vec::with_capacity(many.len());
                for type_name in many {
                    let kind = self.typed(type_name, schema, location, diagnostics)?;
                    variants.push(Rc::new(SchemaNode::new(kind)));
                }
                SchemaKind::Union {
                    variants,
                    tagging: Tagging::Untagged,
                }
            }
        };
        Ok(Rc::new(annotate(SchemaNode::new(kind), schema, name)))
    }

    /// Discriminator declaration of a component that is still in progress,
    /// read from its raw schema.
    fn declared_tag(&self, component: &str, property: &str) -> DeclaredTag {
        let document = self.document;
        let Some(schema) = document.schema(component) else {
            return DeclaredTag::Undeclared;
        };
        let mut seen = vec![component.to_string()];
        match raw_property(document, schema, property, &mut seen) {
            Some(declared) => raw_literal(document, declared, &mut Vec::new())
                .map_or(DeclaredTag::Open, DeclaredTag::Literal),
            None => DeclaredTag::Undeclared,
        }
    }

    fn all_of(
        &mut self,
        schema: &Schema,
        location: &str,
        name: Option<&str>,
        spine: bool,
        diagnostics: &mut Diagnostics,
    ) -> Result<NodeRef, CompileError> {
        let wrapped = match schema.all_of.as_slice() {
            [only] if name.is_none() && !spine && schema.properties.is_empty() => {
                only.ref_path.as_deref()
            }
            _ => None,
        };
        if let Some(pointer) = wrapped {
            let at = format!("{location}/allOf/0");
            let target = self.resolve_at(pointer, &at, false, diagnostics)?;
            return Ok(reference(target, schema, None));
        }

        let mut fragments = Vec::with_capacity(schema.all_of.len() + 1);
        for (index, fragment) in schema.all_of.iter().enumerate() {
            let at = format!("{location}/allOf/{index}");
            let node = match &fragment.ref_path {
                Some(pointer) => self.resolve_fragment(pointer, &at, spine, diagnostics)?,
                None => self.build(fragment, &at, None, spine, diagnostics)?,
            };
            fragments.push(node);
        }
        if !schema.properties.is_empty() || !schema.required.is_empty() {
            let own = self.object(schema, location, diagnostics)?;
            fragments.push(Rc::new(SchemaNode::new(own)));
        }

        let merged = compose::merge(&fragments, location, diagnostics);
        Ok(Rc::new(annotate(merged, schema, name)))
    }

    fn typed(
        &mut self,
        type_name: &str,
        schema: &Schema,
        location: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<SchemaKind, CompileError> {
        let scalar = |scalar| SchemaKind::Scalar {
            scalar,
            format: schema.format.clone(),
        };
        Ok(match type_name {
            "string" => scalar(ScalarKind::String),
            "integer" => scalar(ScalarKind::Integer),
            "number" => scalar(ScalarKind::Float),
            "boolean" => scalar(ScalarKind::Bool),
            "object" => self.object(schema, location, diagnostics)?,
            "array" => {
                let items = match &schema.items {
                    Some(items) => {
                        let at = format!("{location}/items");
                        self.build(items, &at, None, false, diagnostics)?
                    }
                    None => Rc::new(SchemaNode::any()),
                };
                SchemaKind::Array { items }
            }
            _ => SchemaKind::Any,
        })
    }

    fn object(
        &mut self,
        schema: &Schema,
        location: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<SchemaKind, CompileError> {
        let mut properties = IndexMap::with_capacity(schema.properties.len());
        for (key, property) in &schema.properties {
            let at = format!("{location}/properties/{}", escape_token(key));
            let node = self.build(property, &at, None, false, diagnostics)?;
            properties.insert(key.clone(), node);
        }

        let additional = match &schema.additional_properties {
            None | Some(AdditionalProperties::Bool(false)) => None,
            Some(AdditionalProperties::Bool(true)) => Some(Rc::new(SchemaNode::any())),
            Some(AdditionalProperties::Schema(inner)) => {
                let at = format!("{location}/additionalProperties");
                Some(self.build(inner, &at, None, false, diagnostics)?)
            }
        };

        Ok(SchemaKind::Object {
            properties,
            required: schema.required.iter().cloned().collect::<IndexSet<_>>(),
            additional,
        })
    }
}

/// `$ref` node, wrapped when it is the body of a component of its own or
/// carries a sibling `nullable`.
fn reference(target: NodeRef, schema: &Schema, name: Option<&str>) -> NodeRef {
    let nullable = schema.is_nullable();
    if name.is_none() && (!nullable || target.nullable) {
        return target;
    }
    let mut node = SchemaNode::new(SchemaKind::Union {
        variants: vec![target],
        tagging: Tagging::Untagged,
    });
    node.nullable = nullable;
    Rc::new(annotate(node, schema, name))
}

/// Raw declaration of `property`, looking through `$ref` and `allOf`.
/// Own properties act as the last fragment, and later fragments win.
fn raw_property<'s>(
    document: &'s Document,
    schema: &'s Schema,
    property: &str,
    seen: &mut Vec<String>,
) -> Option<&'s Schema> {
    if let Some(name) = schema.ref_path.as_deref().and_then(component_name) {
        if seen.contains(&name) {
            return None;
        }
        let target = document.schema(&name)?;
        seen.push(name);
        return raw_property(document, target, property, seen);
    }
    if let Some(own) = schema.properties.get(property) {
        return Some(own);
    }
    schema
        .all_of
        .iter()
        .rev()
        .find_map(|fragment| raw_property(document, fragment, property, seen))
}

/// The single non-null `enum`/`const` value of a raw schema.
fn raw_literal(
    document: &Document,
    schema: &Schema,
    seen: &mut Vec<String>,
) -> Option<serde_json::Value> {
    if let Some(name) = schema.ref_path.as_deref().and_then(component_name) {
        if seen.contains(&name) {
            return None;
        }
        let target = document.schema(&name)?;
        seen.push(name);
        return raw_literal(document, target, seen);
    }
    if let Some(values) = &schema.enum_values {
        let mut kept = values.iter().filter(|value| !value.is_null());
        return match (kept.next(), kept.next()) {
            (Some(value), None) => Some(value.clone()),
            _ => None,
        };
    }
    schema.const_value.clone().filter(|value| !value.is_null())
}

/// Node for an `enum`/`const` value list; `null` entries become
/// nullability.
fn literals(values: &[serde_json::Value]) -> SchemaNode {
    let mut nullable = false;
    let mut kept = Vec::with_capacity(values.len());
    for value in values {
        if value.is_null() {
            nullable = true;
        } else {
            kept.push(value.clone());
        }
    }
    let mut node = if kept.is_empty() {
        SchemaNode::new(SchemaKind::Null)
    } else {
        SchemaNode::new(SchemaKind::Enum { values: kept })
    };
    node.nullable = nullable;
    node
}

fn annotate(mut node: SchemaNode, schema: &Schema, name: Option<&str>) -> SchemaNode {
    node.nullable = node.nullable || schema.is_nullable();
    node.name = name.map(str::to_string);
    node.description.clone_from(&schema.description);
    node.default.clone_from(&schema.default);
    node
}

/// Follow pointer tokens through an already resolved tree.
fn navigate(root: &NodeRef, tokens: &[String]) -> Option<NodeRef> {
    let mut node = Rc::clone(root);
    let mut tokens = tokens.iter();
    while let Some(token) = tokens.next() {
        let next = match (&node.kind, token.as_str()) {
            (SchemaKind::Object { properties, .. }, "properties") => {
                properties.get(tokens.next()?.as_str()).cloned()
            }
            (SchemaKind::Object { additional, .. }, "additionalProperties") => additional.clone(),
            (SchemaKind::Array { items }, "items") => Some(Rc::clone(items)),
            _ => None,
        }?;
        node = next;
    }
    Some(node)
}
