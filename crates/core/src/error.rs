//! Error types.
//!
//! `CompileError` aborts the whole document. `OperationError` only excludes
//! one operation and is turned into a diagnostic by the extractor.

use std::path::PathBuf;

use thiserror::Error;

/// Document-fatal compilation failure. No partial IR is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("broken reference `{pointer}` (at {location})")]
    BrokenReference { pointer: String, location: String },

    #[error("unsupported reference `{pointer}`: only `#/components/schemas/...` pointers resolve")]
    UnsupportedReference { pointer: String },

    #[error("cyclic allOf composition: {}", .chain.join(" -> "))]
    CyclicComposition { chain: Vec<String> },

    #[error("cycle through `{pointer}` cannot be represented as a named back-reference")]
    UnrepresentableCycle { pointer: String },

    #[error("variant `{variant}` of `{location}` has no value for discriminator `{property}`")]
    MissingDiscriminator {
        location: String,
        variant: String,
        property: String,
    },

    #[error("malformed path table entry `{path}`: {reason}")]
    MalformedPathTable { path: String, reason: String },
}

/// An invalid operation declaration. The operation is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("path parameter `{0}` must be required")]
    OptionalPathParameter(String),

    #[error("path parameter `{0}` does not appear in the path template")]
    PathParameterNotInTemplate(String),

    #[error("placeholder `{{{0}}}` has no matching path parameter")]
    UnboundPlaceholder(String),

    #[error("parameter `{name}` is declared more than once in {location}")]
    DuplicateParameter { name: String, location: String },

    #[error("path template contains an empty or invalid placeholder `{0}`")]
    InvalidPlaceholder(String),
}

/// Failure decoding the input document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to decode document: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failure loading compiler configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
