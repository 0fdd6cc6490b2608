//! Operation extractor.
//!
//! Walks the path table in document order and builds one
//! [`OperationDefinition`] per (path, method). Parameter problems only skip
//! the affected operation; a malformed path key fails the document.

use clientgen_ir::{
    DiagnosticCode, HttpMethod, OperationDefinition, ParamLocation, ParameterDefinition,
    ResponseStatus, ScalarKind, TypeRef,
};
use heck::ToUpperCamelCase;
use indexmap::IndexMap;
use tracing::debug;

use crate::config::MediaConfig;
use crate::diagnostics::{escape_token, operation_location};
use crate::document::{Document, MediaType, Operation, Parameter, PathItem, Schema};
use crate::error::{CompileError, OperationError};
use crate::mapper::TypeMapper;
use crate::naming::{Case, NameScope};
use crate::resolve::Resolver;

/// Placeholders of one path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    /// Distinct placeholder names in template order.
    pub placeholders: Vec<String>,
    /// First empty or invalid placeholder, if any.
    pub invalid: Option<String>,
}

impl PathTemplate {
    /// Parse a path key. Keys that do not start with `/` or have unbalanced
    /// braces are document-fatal.
    pub fn parse(path: &str) -> Result<Self, CompileError> {
        let malformed = |reason: &str| CompileError::MalformedPathTable {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        if !path.starts_with('/') {
            return Err(malformed("path must start with `/`"));
        }

        let mut placeholders: Vec<String> = Vec::new();
        let mut invalid = None;
        let mut open: Option<String> = None;
        for c in path.chars() {
            match c {
                '{' => {
                    if open.is_some() {
                        return Err(malformed("nested `{`"));
                    }
                    open = Some(String::new());
                }
                '}' => {
                    let Some(name) = open.take() else {
                        return Err(malformed("unmatched `}`"));
                    };
                    if name.is_empty() || name.contains('/') {
                        invalid.get_or_insert_with(|| format!("{{{name}}}"));
                    } else if !placeholders.contains(&name) {
                        placeholders.push(name);
                    }
                }
                c => {
                    if let Some(name) = open.as_mut() {
                        name.push(c);
                    }
                }
            }
        }
        if open.is_some() {
            return Err(malformed("unclosed `{`"));
        }

        Ok(Self {
            placeholders,
            invalid,
        })
    }
}

/// Parameters of a validated operation.
struct Plan<'d> {
    /// Call order: path parameters in template order, then required, then
    /// optional parameters.
    ordered: Vec<(&'d Parameter, ParamLocation)>,
    /// Parameters declared outside path/query/header, sent as query
    /// parameters.
    reclassified: Vec<&'d Parameter>,
}

/// Builds the operation set.
#[derive(Debug)]
pub struct OperationExtractor<'d> {
    document: &'d Document,
    media: &'d MediaConfig,
    callables: NameScope,
}

impl<'d> OperationExtractor<'d> {
    pub fn new(document: &'d Document, media: &'d MediaConfig) -> Self {
        Self {
            document,
            media,
            callables: NameScope::new(Case::Snake),
        }
    }

    pub fn extract(
        mut self,
        resolver: &mut Resolver<'_>,
        mapper: &mut TypeMapper<'_>,
    ) -> Result<Vec<OperationDefinition>, CompileError> {
        let document = self.document;
        let mut operations = Vec::new();
        let mut skipped = 0usize;

        for (path, item) in &document.paths {
            let template = PathTemplate::parse(path)?;
            for (method, op) in item.operations() {
                let location = operation_location(path, method.as_str());
                match validate(&template, item, op) {
                    Ok(plan) => {
                        let operation =
                            self.build(path, method, op, &plan, &location, resolver, mapper)?;
                        operations.push(operation);
                    }
                    Err(err) => {
                        skipped += 1;
                        mapper.diagnostics().error(
                            DiagnosticCode::SkippedOperation,
                            location,
                            format!("{method} {path} skipped: {err}"),
                        );
                    }
                }
            }
        }

        debug!(operations = operations.len(), skipped, "operations extracted");
        Ok(operations)
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        &mut self,
        path: &str,
        method: HttpMethod,
        op: &Operation,
        plan: &Plan<'_>,
        location: &str,
        resolver: &mut Resolver<'_>,
        mapper: &mut TypeMapper<'_>,
    ) -> Result<OperationDefinition, CompileError> {
        for param in &plan.reclassified {
            mapper.diagnostics().warning(
                DiagnosticCode::UnsupportedParameterLocation,
                format!("{location}/parameters/{}", escape_token(&param.name)),
                format!(
                    "parameter `{}` in `{}` is not supported and is sent as a query parameter",
                    param.name, param.location
                ),
            );
        }

        let raw_name = op
            .operation_id
            .clone()
            .unwrap_or_else(|| synthesize_name(method, path));
        let namer = mapper.namer();
        let name = namer.allocate(&mut self.callables, &raw_name, location, mapper.diagnostics());
        let prefix = name.to_upper_camel_case();

        let mut scope = NameScope::new(Case::Snake);
        let mut parameters = Vec::with_capacity(plan.ordered.len());
        for (param, param_location) in &plan.ordered {
            let at = format!("{location}/parameters/{}", escape_token(&param.name));
            let ty = match &param.schema {
                Some(schema) => {
                    let hint = format!("{prefix}{}", param.name.to_upper_camel_case());
                    map_schema(schema, &hint, &at, resolver, mapper)?
                }
                None => TypeRef::Scalar(ScalarKind::String),
            };
            parameters.push(ParameterDefinition {
                name: namer.allocate(&mut scope, &param.name, &at, mapper.diagnostics()),
                wire_name: param.name.clone(),
                location: *param_location,
                ty,
                required: param.required,
                default_value: param
                    .default
                    .clone()
                    .or_else(|| param.schema.as_ref().and_then(|s| s.default.clone())),
                description: param.description.clone(),
                deprecated: param.deprecated,
            });
        }

        let (request_body_type, request_body_required) = match &op.request_body {
            Some(body) => {
                let ty = match self.select_media(&body.content) {
                    Some((media, schema)) => {
                        let at = format!(
                            "{location}/requestBody/content/{}/schema",
                            escape_token(media)
                        );
                        Some(map_schema(
                            schema,
                            &format!("{prefix}Request"),
                            &at,
                            resolver,
                            mapper,
                        )?)
                    }
                    None => None,
                };
                (ty, body.required)
            }
            None => (None, false),
        };

        let mut response_map = IndexMap::with_capacity(op.responses.len());
        for (key, response) in &op.responses {
            let at = format!("{location}/responses/{}", escape_token(key));
            let status = match key.parse::<ResponseStatus>() {
                Ok(status) => status,
                Err(err) => {
                    mapper.diagnostics().warning(
                        DiagnosticCode::InvalidResponseStatus,
                        at,
                        format!("{err}; response ignored"),
                    );
                    continue;
                }
            };
            let ty = match self.select_media(&response.content) {
                Some((media, schema)) => {
                    let schema_at = format!("{at}/content/{}/schema", escape_token(media));
                    let hint = format!("{prefix}Response{}", key.to_upper_camel_case());
                    Some(map_schema(schema, &hint, &schema_at, resolver, mapper)?)
                }
                None => None,
            };
            response_map.insert(status, ty);
        }

        Ok(OperationDefinition {
            name,
            operation_id: op.operation_id.clone(),
            http_method: method,
            path_template: path.to_string(),
            parameters,
            request_body_type,
            request_body_required,
            response_map,
            deprecated: op.deprecated,
            summary: op.summary.clone(),
            description: op.description.clone(),
        })
    }

    /// Body schema by configured media preference, then the first media
    /// type that has a schema.
    fn select_media<'m>(
        &self,
        content: &'m IndexMap<String, MediaType>,
    ) -> Option<(&'m str, &'m Schema)> {
        let with_schema = |(media, entry): (&'m String, &'m MediaType)| {
            entry.schema.as_ref().map(|schema| (media.as_str(), schema))
        };
        self.media
            .preferred
            .iter()
            .find_map(|preferred| content.get_key_value(preferred).and_then(with_schema))
            .or_else(|| content.iter().find_map(with_schema))
    }
}

fn map_schema(
    schema: &Schema,
    hint: &str,
    location: &str,
    resolver: &mut Resolver<'_>,
    mapper: &mut TypeMapper<'_>,
) -> Result<TypeRef, CompileError> {
    let node = resolver.resolve_schema(schema, location, mapper.diagnostics())?;
    Ok(mapper.map(&node, hint, location))
}

/// Check one operation's parameters and compute their call order.
fn validate<'d>(
    template: &PathTemplate,
    item: &'d PathItem,
    op: &'d Operation,
) -> Result<Plan<'d>, OperationError> {
    if let Some(invalid) = &template.invalid {
        return Err(OperationError::InvalidPlaceholder(invalid.clone()));
    }
    check_duplicates(&item.parameters, "path-level parameters")?;
    check_duplicates(&op.parameters, "operation parameters")?;

    let mut merged: IndexMap<(&str, &str), &'d Parameter> = IndexMap::new();
    for param in item.parameters.iter().chain(&op.parameters) {
        merged.insert((param.name.as_str(), param.location.as_str()), param);
    }

    let mut path = Vec::new();
    let mut required = Vec::new();
    let mut optional = Vec::new();
    let mut reclassified = Vec::new();
    for param in merged.into_values() {
        let location = match param.location.as_str() {
            "path" => ParamLocation::Path,
            "header" => ParamLocation::Header,
            "query" => ParamLocation::Query,
            _ => {
                reclassified.push(param);
                ParamLocation::Query
            }
        };
        match location {
            ParamLocation::Path => {
                if !param.required {
                    return Err(OperationError::OptionalPathParameter(param.name.clone()));
                }
                if !template.placeholders.contains(&param.name) {
                    return Err(OperationError::PathParameterNotInTemplate(
                        param.name.clone(),
                    ));
                }
                path.push(param);
            }
            _ if param.required => required.push((param, location)),
            _ => optional.push((param, location)),
        }
    }

    let mut ordered = Vec::with_capacity(path.len() + required.len() + optional.len());
    for placeholder in &template.placeholders {
        let Some(param) = path.iter().find(|p| p.name == *placeholder) else {
            return Err(OperationError::UnboundPlaceholder(placeholder.clone()));
        };
        ordered.push((*param, ParamLocation::Path));
    }
    ordered.extend(required);
    ordered.extend(optional);

    Ok(Plan {
        ordered,
        reclassified,
    })
}

fn check_duplicates(params: &[Parameter], scope: &str) -> Result<(), OperationError> {
    let mut seen = std::collections::HashSet::new();
    for param in params {
        if !seen.insert((param.name.as_str(), param.location.as_str())) {
            return Err(OperationError::DuplicateParameter {
                name: param.name.clone(),
                location: scope.to_string(),
            });
        }
    }
    Ok(())
}

/// Callable name for an operation without `operationId`: the method plus
/// the literal path segments.
fn synthesize_name(method: HttpMethod, path: &str) -> String {
    let method = method.as_str().to_ascii_lowercase();
    let literal: Vec<&str> = path
        .split('/')
        .filter(|segment| !segment.is_empty() && !segment.contains('{'))
        .collect();
    if literal.is_empty() {
        method
    } else {
        format!("{method}_{}", literal.join("_"))
    }
}
