//! Diagnostic collection.

use clientgen_ir::{Diagnostic, DiagnosticCode, Severity};
use tracing::{error, warn};

/// Ordered diagnostic list built up during one compilation.
///
/// Every recorded diagnostic is mirrored as a `tracing` event so hosts that
/// only look at logs still see it.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warning(
        &mut self,
        code: DiagnosticCode,
        location: impl Into<String>,
        message: impl Into<String>,
    ) {
        let diagnostic = Diagnostic::warning(code, location, message);
        warn!(code = ?diagnostic.code, location = %diagnostic.location, "{}", diagnostic.message);
        self.items.push(diagnostic);
    }

    pub fn error(
        &mut self,
        code: DiagnosticCode,
        location: impl Into<String>,
        message: impl Into<String>,
    ) {
        let diagnostic = Diagnostic::error(code, location, message);
        error!(code = ?diagnostic.code, location = %diagnostic.location, "{}", diagnostic.message);
        self.items.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.items.iter().filter(|d| d.severity == severity).count()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

/// Escape one JSON pointer token (`~` → `~0`, `/` → `~1`).
pub(crate) fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// `#/components/schemas/{name}`.
pub(crate) fn component_location(name: &str) -> String {
    format!("#/components/schemas/{}", escape_token(name))
}

/// `#/paths/{path}/{method}`.
pub(crate) fn operation_location(path: &str, method: &str) -> String {
    format!("#/paths/{}/{}", escape_token(path), method.to_ascii_lowercase())
}
