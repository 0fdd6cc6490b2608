//! Callable endpoint definitions.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::TypeRef;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    /// All methods in path-item visiting order.
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
        HttpMethod::Patch,
        HttpMethod::Trace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
}

/// Single parameter definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    /// Sanitized identifier, unique within the operation.
    pub name: String,
    /// Original name from the document (for URL and header building).
    pub wire_name: String,
    pub location: ParamLocation,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
}

/// Key of a response map entry: an exact status code, a `nXX` range or
/// `default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResponseStatus {
    Code(u16),
    /// Status class, e.g. `Range(2)` for `2XX`.
    Range(u8),
    Default,
}

/// A response key that is neither a status code, a range nor `default`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid response status `{0}`")]
pub struct InvalidResponseStatus(pub String);

impl FromStr for ResponseStatus {
    type Err = InvalidResponseStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "default" {
            return Ok(ResponseStatus::Default);
        }
        let bytes = s.as_bytes();
        if bytes.len() == 3 && (b'1'..=b'5').contains(&bytes[0]) {
            let class = bytes[0] - b'0';
            if bytes[1..].eq_ignore_ascii_case(b"XX") {
                return Ok(ResponseStatus::Range(class));
            }
            if let Ok(code) = s.parse::<u16>() {
                return Ok(ResponseStatus::Code(code));
            }
        }
        Err(InvalidResponseStatus(s.to_string()))
    }
}

impl TryFrom<String> for ResponseStatus {
    type Error = InvalidResponseStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResponseStatus> for String {
    fn from(value: ResponseStatus) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseStatus::Code(code) => write!(f, "{code}"),
            ResponseStatus::Range(class) => write!(f, "{class}XX"),
            ResponseStatus::Default => f.write_str("default"),
        }
    }
}

/// Result of selecting a response entry for an observed status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseLookup<'a> {
    /// The code maps to a typed body.
    Body(&'a TypeRef),
    /// The code is declared with an empty body.
    Empty,
    /// No entry covers the code; callers surface this as an error.
    Unmapped,
}

/// One callable endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDefinition {
    /// Sanitized callable name, unique across the document.
    pub name: String,
    /// Raw `operationId`, when the document declared one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    pub http_method: HttpMethod,
    /// Path with `{param}` placeholders.
    pub path_template: String,
    /// Parameters in emitted call order: required before optional, path
    /// parameters first in template order.
    pub parameters: Vec<ParameterDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body_type: Option<TypeRef>,
    #[serde(default)]
    pub request_body_required: bool,
    /// Status → body type; `None` marks a declared empty body.
    pub response_map: IndexMap<ResponseStatus, Option<TypeRef>>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OperationDefinition {
    /// Parameters in emitted call order.
    pub fn signature(&self) -> &[ParameterDefinition] {
        &self.parameters
    }

    /// Path parameters, in template order.
    pub fn path_params(&self) -> Vec<&ParameterDefinition> {
        self.params_in(ParamLocation::Path)
    }

    pub fn query_params(&self) -> Vec<&ParameterDefinition> {
        self.params_in(ParamLocation::Query)
    }

    pub fn header_params(&self) -> Vec<&ParameterDefinition> {
        self.params_in(ParamLocation::Header)
    }

    fn params_in(&self, location: ParamLocation) -> Vec<&ParameterDefinition> {
        self.parameters
            .iter()
            .filter(|p| p.location == location)
            .collect()
    }

    /// Select the response entry for an observed status code.
    ///
    /// Exact codes win over `nXX` ranges, which win over `default`.
    pub fn response_for(&self, code: u16) -> ResponseLookup<'_> {
        let class = (code / 100) as u8;
        let entry = self
            .response_map
            .get(&ResponseStatus::Code(code))
            .or_else(|| self.response_map.get(&ResponseStatus::Range(class)))
            .or_else(|| self.response_map.get(&ResponseStatus::Default));

        match entry {
            Some(Some(ty)) => ResponseLookup::Body(ty),
            Some(None) => ResponseLookup::Empty,
            None => ResponseLookup::Unmapped,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types::ScalarKind;

    #[test]
    fn test_parse_response_status() {
        assert_eq!("200".parse::<ResponseStatus>(), Ok(ResponseStatus::Code(200)));
        assert_eq!("2XX".parse::<ResponseStatus>(), Ok(ResponseStatus::Range(2)));
        assert_eq!("4xx".parse::<ResponseStatus>(), Ok(ResponseStatus::Range(4)));
        assert_eq!(
            "default".parse::<ResponseStatus>(),
            Ok(ResponseStatus::Default)
        );
        assert!("20".parse::<ResponseStatus>().is_err());
        assert!("700".parse::<ResponseStatus>().is_err());
        assert!("2X0".parse::<ResponseStatus>().is_err());
        assert!("ok".parse::<ResponseStatus>().is_err());
    }

    #[test]
    fn test_response_status_display_round_trips() {
        for raw in ["204", "5XX", "default"] {
            let status: ResponseStatus = raw.parse().unwrap();
            assert_eq!(status.to_string(), raw);
        }
    }

    fn op_with_responses(entries: Vec<(ResponseStatus, Option<TypeRef>)>) -> OperationDefinition {
        OperationDefinition {
            name: "get_pet".into(),
            operation_id: Some("getPet".into()),
            http_method: HttpMethod::Get,
            path_template: "/pets/{id}".into(),
            parameters: Vec::new(),
            request_body_type: None,
            request_body_required: false,
            response_map: entries.into_iter().collect(),
            deprecated: false,
            summary: None,
            description: None,
        }
    }

    #[test]
    fn test_response_for_distinguishes_empty_from_unmapped() {
        let op = op_with_responses(vec![
            (ResponseStatus::Code(200), Some(TypeRef::reference("Pet"))),
            (ResponseStatus::Code(204), None),
        ]);
        assert_eq!(
            op.response_for(200),
            ResponseLookup::Body(&TypeRef::reference("Pet"))
        );
        assert_eq!(op.response_for(204), ResponseLookup::Empty);
        assert_eq!(op.response_for(404), ResponseLookup::Unmapped);
    }

    #[test]
    fn test_response_for_falls_back_to_range_then_default() {
        let error = TypeRef::reference("Error");
        let op = op_with_responses(vec![
            (ResponseStatus::Default, Some(error.clone())),
            (
                ResponseStatus::Range(4),
                Some(TypeRef::Scalar(ScalarKind::String)),
            ),
            (ResponseStatus::Code(404), None),
        ]);
        assert_eq!(op.response_for(404), ResponseLookup::Empty);
        assert_eq!(
            op.response_for(409),
            ResponseLookup::Body(&TypeRef::Scalar(ScalarKind::String))
        );
        assert_eq!(op.response_for(500), ResponseLookup::Body(&error));
    }

    #[test]
    fn test_response_map_serializes_with_string_keys() {
        let op = op_with_responses(vec![
            (ResponseStatus::Code(200), Some(TypeRef::reference("Pet"))),
            (ResponseStatus::Default, None),
        ]);
        let json = serde_json::to_value(&op).unwrap();
        let keys: Vec<_> = json["response_map"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, vec!["200", "default"]);
        assert!(json["response_map"]["default"].is_null());
    }
}
