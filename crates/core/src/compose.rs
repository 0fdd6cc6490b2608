//! Composition merger.
//!
//! `allOf` fragments are flattened into one object; `oneOf`/`anyOf`
//! variant lists become union nodes, tagged when a discriminator applies.

use std::rc::Rc;

use clientgen_ir::DiagnosticCode;
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use crate::diagnostics::Diagnostics;
use crate::document::Discriminator;
use crate::error::CompileError;
use crate::resolve::component_name;
use crate::schema::{NodeRef, SchemaKind, SchemaNode, Tagging};

/// Which union keyword produced a variant list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionKind {
    OneOf,
    AnyOf,
}

impl UnionKind {
    pub fn keyword(self) -> &'static str {
        match self {
            UnionKind::OneOf => "oneOf",
            UnionKind::AnyOf => "anyOf",
        }
    }
}

/// One resolved union member.
#[derive(Debug, Clone)]
pub struct Variant {
    pub node: NodeRef,
    /// Component name when the member was written as a `$ref`.
    pub component: Option<String>,
    /// Discriminator property as declared in the raw schema. Only set for
    /// back-reference variants, whose resolved body is not available yet.
    pub declared: Option<DeclaredTag>,
}

impl Variant {
    pub fn new(node: NodeRef, component: Option<String>) -> Self {
        Self {
            node,
            component,
            declared: None,
        }
    }

    /// How the variant declares the discriminator property.
    fn declared_tag(&self, property: &str) -> DeclaredTag {
        if matches!(self.node.kind, SchemaKind::BackRef(_)) {
            return self.declared.clone().unwrap_or(DeclaredTag::Undeclared);
        }
        match self
            .node
            .properties()
            .and_then(|properties| properties.get(property))
        {
            Some(declared) => declared
                .single_literal()
                .cloned()
                .map_or(DeclaredTag::Open, DeclaredTag::Literal),
            None => DeclaredTag::Undeclared,
        }
    }
}

/// A variant's declaration of the discriminator property.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredTag {
    /// The property is not declared.
    Undeclared,
    /// Declared without a single literal value.
    Open,
    /// Declared with exactly one `enum`/`const` value.
    Literal(Value),
}

/// Merge resolved `allOf` fragments into a single node.
///
/// Properties are concatenated in fragment order. A property declared
/// again keeps its first position and takes the later schema; a differing
/// redeclaration is reported as `AllOfConflict`. Required sets are unioned.
/// Fragments that are not objects are skipped (`Any` silently), unless no
/// fragment is an object and exactly one carries a type: that fragment is
/// the result.
pub fn merge(fragments: &[NodeRef], location: &str, diagnostics: &mut Diagnostics) -> SchemaNode {
    if !fragments.iter().any(|f| f.is_object()) {
        let mut typed = fragments
            .iter()
            .filter(|f| !matches!(f.kind, SchemaKind::Any));
        match (typed.next(), typed.next()) {
            (None, _) => return SchemaNode::any(),
            (Some(only), None) => {
                return SchemaNode {
                    nullable: only.nullable,
                    ..SchemaNode::new(only.kind.clone())
                };
            }
            _ => {}
        }
    }

    let mut properties: IndexMap<String, NodeRef> = IndexMap::new();
    let mut required = IndexSet::new();
    let mut additional = None;

    for (index, fragment) in fragments.iter().enumerate() {
        match &fragment.kind {
            SchemaKind::Object {
                properties: declared,
                required: declared_required,
                additional: extra,
            } => {
                for (key, schema) in declared {
                    if let Some(existing) = properties.get_mut(key) {
                        if !Rc::ptr_eq(existing, schema) && **existing != **schema {
                            let message = format!(
                                "property `{key}` is redeclared by fragment {index} \
                                 with a different schema; the later declaration wins"
                            );
                            diagnostics.warning(DiagnosticCode::AllOfConflict, location, message);
                        }
                        *existing = Rc::clone(schema);
                    } else {
                        properties.insert(key.clone(), Rc::clone(schema));
                    }
                }
                required.extend(declared_required.iter().cloned());
                if extra.is_some() {
                    additional.clone_from(extra);
                }
            }
            SchemaKind::Any => {}
            _ => diagnostics.warning(
                DiagnosticCode::AllOfNonObjectFragment,
                location,
                format!("fragment {index} is not an object and was not merged"),
            ),
        }
    }

    SchemaNode::new(SchemaKind::Object {
        properties,
        required,
        additional,
    })
}

/// Build a union node from resolved variants.
///
/// `null` members are removed and make the union nullable. A `oneOf` with
/// a discriminator is tagged; every remaining variant needs a tag.
pub fn classify(
    kind: UnionKind,
    variants: Vec<Variant>,
    discriminator: Option<&Discriminator>,
    location: &str,
    diagnostics: &mut Diagnostics,
) -> Result<SchemaNode, CompileError> {
    let mut nullable = false;
    let mut kept = Vec::with_capacity(variants.len());
    for variant in variants {
        if matches!(variant.node.kind, SchemaKind::Null) {
            nullable = true;
        } else {
            kept.push(variant);
        }
    }

    let tagging = match (kind, discriminator) {
        (_, None) => Tagging::Untagged,
        (UnionKind::AnyOf, Some(discriminator)) => {
            diagnostics.warning(
                DiagnosticCode::IgnoredDiscriminator,
                location,
                format!(
                    "discriminator `{}` on anyOf is ignored; the union stays untagged",
                    discriminator.property_name
                ),
            );
            Tagging::Untagged
        }
        (UnionKind::OneOf, Some(discriminator)) => {
            let tags = kept
                .iter()
                .enumerate()
                .map(|(index, variant)| infer_tag(index, variant, discriminator, location))
                .collect::<Result<Vec<_>, _>>()?;
            Tagging::Tagged {
                property: discriminator.property_name.clone(),
                tags,
            }
        }
    };

    let mut node = SchemaNode::new(SchemaKind::Union {
        variants: kept.into_iter().map(|v| v.node).collect(),
        tagging,
    });
    node.nullable = nullable;
    Ok(node)
}

/// Tag for one variant: an explicit mapping entry, then a single literal
/// on the discriminator property, then the component name when the
/// property is declared.
fn infer_tag(
    index: usize,
    variant: &Variant,
    discriminator: &Discriminator,
    location: &str,
) -> Result<String, CompileError> {
    if let Some(component) = &variant.component {
        let mapped = discriminator
            .mapping
            .iter()
            .find(|(_, target)| mapping_target(target) == *component);
        if let Some((tag, _)) = mapped {
            return Ok(tag.clone());
        }
    }

    match (variant.declared_tag(&discriminator.property_name), &variant.component) {
        (DeclaredTag::Literal(literal), _) => Ok(literal_tag(&literal)),
        (DeclaredTag::Open, Some(component)) => Ok(component.clone()),
        _ => Err(missing(index, variant, discriminator, location)),
    }
}

fn missing(
    index: usize,
    variant: &Variant,
    discriminator: &Discriminator,
    location: &str,
) -> CompileError {
    CompileError::MissingDiscriminator {
        location: location.to_string(),
        variant: variant
            .component
            .clone()
            .unwrap_or_else(|| format!("#{index}")),
        property: discriminator.property_name.clone(),
    }
}

/// Mapping values are either pointers or bare component names.
fn mapping_target(target: &str) -> String {
    component_name(target).unwrap_or_else(|| target.to_string())
}

fn literal_tag(value: &Value) -> String {
    value
        .as_str()
        .map_or_else(|| value.to_string(), str::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use clientgen_ir::ScalarKind;
    use serde_json::json;

    fn scalar(kind: ScalarKind) -> NodeRef {
        Rc::new(SchemaNode::scalar(kind))
    }

    fn object(props: &[(&str, NodeRef)], required: &[&str]) -> NodeRef {
        Rc::new(SchemaNode::new(SchemaKind::Object {
            properties: props
                .iter()
                .map(|(k, v)| ((*k).to_string(), Rc::clone(v)))
                .collect(),
            required: required.iter().map(|r| (*r).to_string()).collect(),
            additional: None,
        }))
    }

    fn literal(value: &str) -> NodeRef {
        Rc::new(SchemaNode::new(SchemaKind::Enum {
            values: vec![json!(value)],
        }))
    }

    fn keys(node: &SchemaNode) -> Vec<&str> {
        node.properties()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect()
    }

    #[test]
    fn test_merge_concatenates_in_fragment_order() {
        let mut diagnostics = Diagnostics::new();
        let merged = merge(
            &[
                object(&[("a", scalar(ScalarKind::Integer))], &["a"]),
                object(&[("b", scalar(ScalarKind::String))], &["b"]),
            ],
            "#/x",
            &mut diagnostics,
        );
        assert_eq!(keys(&merged), vec!["a", "b"]);
        let SchemaKind::Object { required, .. } = &merged.kind else {
            panic!("expected object");
        };
        assert_eq!(required.iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_merge_conflict_last_fragment_wins() {
        let mut diagnostics = Diagnostics::new();
        let merged = merge(
            &[
                object(
                    &[("a", scalar(ScalarKind::Integer)), ("b", scalar(ScalarKind::Bool))],
                    &[],
                ),
                object(&[("a", scalar(ScalarKind::String))], &[]),
            ],
            "#/x",
            &mut diagnostics,
        );
        assert_eq!(keys(&merged), vec!["a", "b"]);
        let a = &merged.properties().unwrap()["a"];
        assert_eq!(**a, SchemaNode::scalar(ScalarKind::String));
        let items = diagnostics.into_vec();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].code, DiagnosticCode::AllOfConflict);
    }

    #[test]
    fn test_identical_redeclaration_is_not_a_conflict() {
        let mut diagnostics = Diagnostics::new();
        merge(
            &[
                object(&[("id", scalar(ScalarKind::Integer))], &["id"]),
                object(&[("id", scalar(ScalarKind::Integer))], &[]),
            ],
            "#/x",
            &mut diagnostics,
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_non_object_fragments_are_skipped() {
        let mut diagnostics = Diagnostics::new();
        let merged = merge(
            &[
                object(&[("a", scalar(ScalarKind::Integer))], &[]),
                scalar(ScalarKind::String),
                Rc::new(SchemaNode::any()),
            ],
            "#/x",
            &mut diagnostics,
        );
        assert_eq!(keys(&merged), vec!["a"]);
        let items = diagnostics.into_vec();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].code, DiagnosticCode::AllOfNonObjectFragment);
    }

    #[test]
    fn test_single_typed_fragment_is_the_result() {
        let mut diagnostics = Diagnostics::new();
        let merged = merge(
            &[Rc::new(SchemaNode::any()), scalar(ScalarKind::String)],
            "#/x",
            &mut diagnostics,
        );
        assert_eq!(merged, SchemaNode::scalar(ScalarKind::String));
        assert!(diagnostics.is_empty());
    }

    fn discriminator(mapping: &[(&str, &str)]) -> Discriminator {
        Discriminator {
            property_name: "type".into(),
            mapping: mapping
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    fn variant(node: NodeRef, component: Option<&str>) -> Variant {
        Variant::new(node, component.map(str::to_string))
    }

    fn back_ref(component: &str, declared: DeclaredTag) -> Variant {
        Variant {
            declared: Some(declared),
            ..variant(
                Rc::new(SchemaNode::new(SchemaKind::BackRef(component.into()))),
                Some(component),
            )
        }
    }

    #[test]
    fn test_classify_infers_tags_in_priority_order() {
        let mut diagnostics = Diagnostics::new();
        let cat = object(&[("type", literal("cat"))], &["type"]);
        let dog = object(&[("type", scalar(ScalarKind::String))], &["type"]);
        let bird = object(&[("type", literal("bird"))], &["type"]);
        let node = classify(
            UnionKind::OneOf,
            vec![
                variant(cat, Some("Cat")),
                variant(dog, Some("Dog")),
                variant(bird, Some("Bird")),
            ],
            Some(&discriminator(&[("avian", "#/components/schemas/Bird")])),
            "#/components/schemas/Pet",
            &mut diagnostics,
        )
        .unwrap();
        let SchemaKind::Union { tagging, variants } = &node.kind else {
            panic!("expected union");
        };
        assert_eq!(variants.len(), 3);
        assert_eq!(
            *tagging,
            Tagging::Tagged {
                property: "type".into(),
                tags: vec!["cat".into(), "Dog".into(), "avian".into()],
            }
        );
    }

    #[test]
    fn test_classify_missing_discriminator_is_fatal() {
        let mut diagnostics = Diagnostics::new();
        let err = classify(
            UnionKind::OneOf,
            vec![variant(
                object(&[("name", scalar(ScalarKind::String))], &[]),
                Some("Fish"),
            )],
            Some(&discriminator(&[])),
            "#/components/schemas/Pet",
            &mut diagnostics,
        )
        .unwrap_err();
        assert_eq!(
            err,
            CompileError::MissingDiscriminator {
                location: "#/components/schemas/Pet".into(),
                variant: "Fish".into(),
                property: "type".into(),
            }
        );
    }

    #[test]
    fn test_classify_folds_null_into_nullability() {
        let mut diagnostics = Diagnostics::new();
        let node = classify(
            UnionKind::AnyOf,
            vec![
                variant(scalar(ScalarKind::String), None),
                variant(Rc::new(SchemaNode::new(SchemaKind::Null)), None),
            ],
            None,
            "#/x",
            &mut diagnostics,
        )
        .unwrap();
        assert!(node.nullable);
        let SchemaKind::Union { variants, tagging } = &node.kind else {
            panic!("expected union");
        };
        assert_eq!(variants.len(), 1);
        assert_eq!(*tagging, Tagging::Untagged);
    }

    #[test]
    fn test_any_of_discriminator_is_ignored() {
        let mut diagnostics = Diagnostics::new();
        let node = classify(
            UnionKind::AnyOf,
            vec![variant(object(&[], &[]), Some("A"))],
            Some(&discriminator(&[])),
            "#/x",
            &mut diagnostics,
        )
        .unwrap();
        assert!(matches!(
            node.kind,
            SchemaKind::Union {
                tagging: Tagging::Untagged,
                ..
            }
        ));
        assert_eq!(
            diagnostics.into_vec()[0].code,
            DiagnosticCode::IgnoredDiscriminator
        );
    }

    #[test]
    fn test_back_reference_variant_uses_declared_literal() {
        let mut diagnostics = Diagnostics::new();
        let node = classify(
            UnionKind::OneOf,
            vec![
                back_ref("BinOp", DeclaredTag::Literal(json!("binop"))),
                back_ref("Call", DeclaredTag::Open),
            ],
            Some(&discriminator(&[])),
            "#/components/schemas/Expr",
            &mut diagnostics,
        )
        .unwrap();
        let SchemaKind::Union { tagging, .. } = &node.kind else {
            panic!("expected union");
        };
        assert_eq!(
            *tagging,
            Tagging::Tagged {
                property: "type".into(),
                tags: vec!["binop".into(), "Call".into()],
            }
        );
    }

    #[test]
    fn test_back_reference_variant_without_property_is_fatal() {
        let mut diagnostics = Diagnostics::new();
        let err = classify(
            UnionKind::OneOf,
            vec![back_ref("Tree", DeclaredTag::Undeclared)],
            Some(&discriminator(&[])),
            "#/components/schemas/Tree",
            &mut diagnostics,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CompileError::MissingDiscriminator { ref variant, .. } if variant == "Tree"
        ));

        let mapped = classify(
            UnionKind::OneOf,
            vec![back_ref("Tree", DeclaredTag::Undeclared)],
            Some(&discriminator(&[("tree", "Tree")])),
            "#/components/schemas/Tree",
            &mut diagnostics,
        );
        assert!(mapped.is_ok());
    }
}
