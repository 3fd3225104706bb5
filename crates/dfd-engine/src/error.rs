//! Error types for the DFD engine

use thiserror::Error;

/// Result type alias using DfdError
pub type Result<T> = std::result::Result<T, DfdError>;

/// Errors that can occur in the DFD engine
///
/// Every variant is recoverable by the caller. Mutating operations check
/// naming and type errors before they touch the hierarchy.
#[derive(Debug, Error)]
pub enum DfdError {
    /// A diagram or item name was blank
    #[error("Unable to have null or empty name")]
    EmptyName,

    /// A name is already used somewhere it must be unique
    #[error("'{name}' already exists in {diagram}")]
    DuplicateName { name: String, diagram: String },

    /// Diagram or item is absent
    #[error("Couldn't find {0}")]
    NotFound(String),

    /// A datastore was requested in the Context diagram
    #[error("A datastore id can't be created for the Context diagram")]
    RootDatastore,

    /// An item type that the query can't handle
    #[error("Invalid cell type: {0}. Must be one of entity, process, datastore, flow")]
    InvalidCellType(String),

    /// Structural validation failed
    #[error("Structural violation: {}", reasons.join("; "))]
    StructuralViolation { reasons: Vec<String> },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compression error
    #[error("Compression error: {0}")]
    Compression(String),
}

impl DfdError {
    /// Create a not found error for a diagram
    pub fn diagram_not_found(name: &str) -> Self {
        Self::NotFound(format!("diagram '{}' in hierarchy", name))
    }

    /// Create a not found error for an item inside a diagram
    pub fn item_not_found(item: &str, diagram: &str) -> Self {
        Self::NotFound(format!("item '{}' in diagram '{}'", item, diagram))
    }

    /// Create a duplicate name error
    pub fn duplicate(name: impl Into<String>, diagram: impl Into<String>) -> Self {
        Self::DuplicateName {
            name: name.into(),
            diagram: diagram.into(),
        }
    }
}
