//! Engine-wide constants
//!
//! Single source of truth for names and id formatting rules.

/// Default values for engine configuration
pub mod defaults {
    /// Name of the root diagram
    pub const CONTEXT_DIAGRAM_NAME: &str = "Context diagram";
    /// Identifier of the single process shown in the Context diagram
    pub const ROOT_PROCESS_ID: &str = "0";
    /// zstd level used by the compressed graph codec
    pub const COMPRESSION_LEVEL: i32 = 3;
}

/// Identifier formatting
pub mod ids {
    /// Prefix for datastore identifiers (`D1.2`)
    pub const DATASTORE_PREFIX: &str = "D";
    /// Separator between hierarchical id segments
    pub const SEPARATOR: &str = ".";
}

/// Prefixes for generated item ids
pub mod item_ids {
    pub const NODE: &str = "item";
    pub const FLOW: &str = "flow";
}
