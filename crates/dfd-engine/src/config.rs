//! Engine configuration
//!
//! Controls naming of the root diagram, identifier formatting and the
//! optional stricter validation rules.

use serde::{Deserialize, Serialize};

use crate::constants::defaults;
use crate::error::Result;

/// How identifiers are formatted one level below the Context diagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStyle {
    /// Always keep the parent prefix (`0.1`, `D0.1`)
    #[default]
    Qualified,
    /// Drop the root prefix at the first level (`1`, `D1`)
    Compact,
}

/// Configuration for a [`DfdSession`](crate::session::DfdSession)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name given to the root diagram of a new hierarchy
    pub context_diagram_name: String,
    /// Identifier of the Context diagram's process
    pub root_process_id: String,
    /// Identifier formatting below the root
    pub id_style: IdStyle,
    /// Require every process to have at least one inbound and one outbound flow
    pub require_process_io: bool,
    /// zstd level used by [`ZstdGraphCodec`](crate::snapshot::ZstdGraphCodec)
    pub compression_level: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            context_diagram_name: defaults::CONTEXT_DIAGRAM_NAME.to_string(),
            root_process_id: defaults::ROOT_PROCESS_ID.to_string(),
            id_style: IdStyle::default(),
            require_process_io: false,
            compression_level: defaults::COMPRESSION_LEVEL,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON, filling missing fields with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.context_diagram_name, "Context diagram");
        assert_eq!(config.root_process_id, "0");
        assert_eq!(config.id_style, IdStyle::Qualified);
        assert!(!config.require_process_io);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(r#"{"id_style": "compact"}"#).unwrap();
        assert_eq!(config.id_style, IdStyle::Compact);
        assert_eq!(config.context_diagram_name, "Context diagram");
        assert_eq!(config.compression_level, 3);
    }

    #[test]
    fn test_invalid_json() {
        assert!(EngineConfig::from_json("{not json").is_err());
    }
}
