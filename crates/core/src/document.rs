//! Normalized input document.
//!
//! A serde model of the subset of an OpenAPI 3.x document the compiler
//! reads. Every keyed table is an `IndexMap` so the loader's declaration
//! order survives decoding. Nothing here validates the document beyond its
//! shape.

use clientgen_ir::HttpMethod;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DocumentError;

/// Root document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub paths: IndexMap<String, PathItem>,
    pub components: Components,
}

impl Document {
    /// Decode a document from JSON text.
    pub fn from_json_str(source: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Decode a document from an already parsed JSON value.
    pub fn from_json_value(value: Value) -> Result<Self, DocumentError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Look up a component schema by name.
    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.components.schemas.get(name)
    }
}

/// Reusable components. Only schemas take part in compilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Components {
    pub schemas: IndexMap<String, Schema>,
}

/// Operations of one path template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Operation>,
    /// Path-level parameters shared by all operations.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
}

impl PathItem {
    /// Declared operations, in fixed method order.
    pub fn operations(&self) -> impl Iterator<Item = (HttpMethod, &Operation)> {
        HttpMethod::ALL
            .into_iter()
            .filter_map(|method| self.operation(method).map(|op| (method, op)))
    }

    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Trace => self.trace.as_ref(),
        }
    }
}

/// An API operation (endpoint).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Operation {
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub deprecated: bool,
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    pub responses: IndexMap<String, Response>,
}

/// A parameter (path, query, header or cookie).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    /// Parameter-level default; the schema's `default` applies otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
}

/// A request body definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestBody {
    pub required: bool,
    pub description: Option<String>,
    pub content: IndexMap<String, MediaType>,
}

/// A response definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Response {
    pub description: Option<String>,
    pub content: IndexMap<String, MediaType>,
}

/// Media type content (e.g. `application/json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaType {
    pub schema: Option<Schema>,
}

/// Raw JSON Schema as written in the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Schema {
    /// Single type name or a list of type names (3.1 nullable spelling).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,

    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub ref_path: Option<String>,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,

    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub const_value: Option<Value>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Schema>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Schema>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<Schema>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Discriminator>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// OpenAPI 3.0 nullable flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Schema {
    /// Declared type names other than `null`.
    pub fn type_names(&self) -> Vec<&str> {
        match &self.schema_type {
            Some(SchemaType::Single(t)) if t != "null" => vec![t.as_str()],
            None | Some(SchemaType::Single(_)) => Vec::new(),
            Some(SchemaType::Multiple(ts)) => ts
                .iter()
                .map(String::as_str)
                .filter(|t| *t != "null")
                .collect(),
        }
    }

    /// Whether the schema admits `null` through `nullable: true` or a
    /// `"null"` entry in its type list.
    pub fn is_nullable(&self) -> bool {
        if self.nullable == Some(true) {
            return true;
        }
        match &self.schema_type {
            Some(SchemaType::Multiple(ts)) => ts.iter().any(|t| t == "null"),
            _ => false,
        }
    }

    /// `{type: "null"}` and nothing else.
    pub fn is_null_type(&self) -> bool {
        match &self.schema_type {
            Some(SchemaType::Single(t)) => t == "null",
            Some(SchemaType::Multiple(ts)) => !ts.is_empty() && ts.iter().all(|t| t == "null"),
            None => false,
        }
    }
}

/// Discriminator for polymorphic `oneOf` schemas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discriminator {
    pub property_name: String,
    /// Tag value to schema pointer.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub mapping: IndexMap<String, String>,
}

/// `type` is either one name or a list of names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Multiple(Vec<String>),
}

/// `additionalProperties` is a boolean or a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Bool(bool),
    Schema(Box<Schema>),
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_preserves_declaration_order() {
        let doc = Document::from_json_str(
            r##"{
                "paths": {
                    "/zeta": { "get": { "responses": {} } },
                    "/alpha": { "post": { "responses": {} } }
                },
                "components": {
                    "schemas": {
                        "Zebra": { "type": "object", "properties": { "z": {}, "a": {} } },
                        "Aardvark": { "type": "string" }
                    }
                }
            }"##,
        )
        .unwrap();
        let paths: Vec<_> = doc.paths.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["/zeta", "/alpha"]);
        let schemas: Vec<_> = doc.components.schemas.keys().map(String::as_str).collect();
        assert_eq!(schemas, vec!["Zebra", "Aardvark"]);
        let props: Vec<_> = doc.schema("Zebra").unwrap().properties.keys().collect();
        assert_eq!(props, vec!["z", "a"]);
    }

    #[test]
    fn test_nullable_spellings() {
        let v30: Schema = serde_json::from_str(r#"{"type": "string", "nullable": true}"#).unwrap();
        let v31: Schema = serde_json::from_str(r#"{"type": ["string", "null"]}"#).unwrap();
        let plain: Schema = serde_json::from_str(r#"{"type": "string"}"#).unwrap();
        assert!(v30.is_nullable());
        assert!(v31.is_nullable());
        assert!(!plain.is_nullable());
        assert_eq!(v31.type_names(), vec!["string"]);

        let null: Schema = serde_json::from_str(r#"{"type": "null"}"#).unwrap();
        assert!(null.is_null_type());
        assert!(null.type_names().is_empty());
    }

    #[test]
    fn test_path_item_method_order() {
        let item: PathItem = serde_json::from_str(
            r#"{
                "patch": { "operationId": "patch" },
                "get": { "operationId": "get" },
                "delete": { "operationId": "delete" }
            }"#,
        )
        .unwrap();
        let methods: Vec<_> = item.operations().map(|(m, _)| m).collect();
        assert_eq!(
            methods,
            vec![HttpMethod::Get, HttpMethod::Delete, HttpMethod::Patch]
        );
    }

    #[test]
    fn test_additional_properties_forms() {
        let open: Schema = serde_json::from_str(r#"{"additionalProperties": true}"#).unwrap();
        assert_eq!(open.additional_properties, Some(AdditionalProperties::Bool(true)));

        let typed: Schema =
            serde_json::from_str(r#"{"additionalProperties": {"type": "integer"}}"#).unwrap();
        assert!(matches!(
            typed.additional_properties,
            Some(AdditionalProperties::Schema(_))
        ));
    }

    #[test]
    fn test_decode_error() {
        let err = Document::from_json_str(r#"{"paths": []}"#).unwrap_err();
        assert!(err.to_string().starts_with("failed to decode document"));
    }
}
