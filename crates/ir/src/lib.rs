//! Language-neutral client intermediate representation.
//!
//! The IR is the hand-off point between the clientgen compiler and an
//! emission layer:
//! - `types`: `TypeRef`, the target-neutral type descriptor
//! - `model`: named model definitions (objects, enums, unions, aliases)
//! - `operation`: callable endpoints and their response maps
//! - `diagnostic`: warnings reported next to the IR
//!
//! Everything here is plain data. Emission layers read it and must not
//! mutate it; given the same input document the compiler produces an
//! identical `ClientIr`, so serializing it is byte-for-byte reproducible.

pub mod diagnostic;
pub mod model;
pub mod operation;
pub mod types;

use serde::{Deserialize, Serialize};

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};
pub use model::{
    EnumMember, FieldDefinition, ModelDefinition, ModelKind, UnionVariant, VariantOf,
};
pub use operation::{
    HttpMethod, InvalidResponseStatus, OperationDefinition, ParamLocation, ParameterDefinition,
    ResponseLookup, ResponseStatus,
};
pub use types::{ScalarKind, TypeRef};

/// The complete IR of one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientIr {
    /// Models in first-discovery order.
    pub models: Vec<ModelDefinition>,
    /// Operations in path-table order.
    pub operations: Vec<OperationDefinition>,
}

impl ClientIr {
    /// Look up a model by its sanitized name.
    pub fn model(&self, name: &str) -> Option<&ModelDefinition> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Look up an operation by its sanitized name.
    pub fn operation(&self, name: &str) -> Option<&OperationDefinition> {
        self.operations.iter().find(|o| o.name == name)
    }

    /// Model names in emission order.
    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }
}
