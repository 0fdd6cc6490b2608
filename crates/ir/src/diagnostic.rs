//! Non-fatal findings reported next to the IR.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Resolved by a deterministic policy; output is still complete.
    Warning,
    /// Something was left out of the output (e.g. a skipped operation).
    Error,
}

/// Machine-readable diagnostic category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    /// Two inputs sanitized to the same name; a numeric suffix was added.
    NameCollision,
    /// `allOf` fragments declared the same property differently.
    AllOfConflict,
    /// An `allOf` fragment was not an object and was not merged.
    AllOfNonObjectFragment,
    /// A discriminator on an untagged union was dropped.
    IgnoredDiscriminator,
    /// An operation failed validation and was excluded.
    SkippedOperation,
    /// A parameter used a location outside path/query/header.
    UnsupportedParameterLocation,
    /// A response key was not a status code, range or `default`.
    InvalidResponseStatus,
}

/// One diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    /// Pointer-like path into the source document.
    pub location: String,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(
        code: DiagnosticCode,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            location: location.into(),
            message: message.into(),
        }
    }

    pub fn error(
        code: DiagnosticCode,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Error,
            code,
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{level}: {} ({})", self.message, self.location)
    }
}
