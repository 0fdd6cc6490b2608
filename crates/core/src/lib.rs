//! Compiles a normalized API description into a [`ClientIr`].
//!
//! The pipeline, leaves first:
//! - `resolve`: `$ref` resolution with cycle handling and per-pointer caching
//! - `compose`: `allOf` merging and `oneOf`/`anyOf` classification
//! - `mapper`: resolved nodes to `TypeRef`s, registering inline models
//! - `graph`: two-pass model construction (names, then bodies)
//! - `operations`: one `OperationDefinition` per path and method
//! - `naming`: keyword-safe, collision-free identifiers
//!
//! Compilation is synchronous and pure. The same document always compiles
//! to the same IR, down to model order and collision suffixes.

pub mod compose;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod graph;
pub mod mapper;
pub mod naming;
pub mod operations;
pub mod resolve;
pub mod schema;

use clientgen_ir::{ClientIr, Diagnostic, Severity};
use tracing::debug;

pub use config::CompilerConfig;
pub use document::Document;
pub use error::{CompileError, ConfigError, DocumentError, OperationError};

use crate::diagnostics::Diagnostics;
use crate::graph::ModelRegistry;
use crate::mapper::TypeMapper;
use crate::naming::Namer;
use crate::operations::OperationExtractor;
use crate::resolve::Resolver;

/// Result of a successful compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct Compilation {
    /// Models and operations.
    pub ir: ClientIr,
    /// Warnings and skipped operations, in the order they were found.
    pub diagnostics: Vec<Diagnostic>,
}

impl Compilation {
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }
}

/// Document compiler.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile a document. Broken references, unrepresentable cycles and a
    /// malformed path table fail the whole document; invalid operations are
    /// skipped and reported in the diagnostics.
    pub fn compile(&self, document: &Document) -> Result<Compilation, CompileError> {
        debug!(
            schemas = document.components.schemas.len(),
            paths = document.paths.len(),
            "compiling document"
        );

        let namer = Namer::new(&self.config.naming);
        let mut resolver = Resolver::new(document);
        let mut registry = ModelRegistry::new();
        let mut diagnostics = Diagnostics::new();

        graph::build(
            document,
            &mut resolver,
            &mut registry,
            &namer,
            &mut diagnostics,
        )?;

        let operations = {
            let mut mapper = TypeMapper::new(&mut registry, &namer, &mut diagnostics);
            OperationExtractor::new(document, &self.config.media)
                .extract(&mut resolver, &mut mapper)?
        };

        let ir = ClientIr {
            models: registry.finish(),
            operations,
        };
        debug!(
            models = ir.models.len(),
            operations = ir.operations.len(),
            diagnostics = diagnostics.len(),
            "compilation finished"
        );

        Ok(Compilation {
            ir,
            diagnostics: diagnostics.into_vec(),
        })
    }
}

/// Compile with the default configuration.
pub fn compile(document: &Document) -> Result<Compilation, CompileError> {
    Compiler::default().compile(document)
}
