//! Compiler configuration.
//!
//! ```toml
//! [naming]
//! keywords = ["rust", "python"]
//! extra_reserved = ["client"]
//!
//! [media]
//! preferred = ["application/json", "application/problem+json"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration for one compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    pub naming: NamingConfig,
    pub media: MediaConfig,
}

impl CompilerConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}

/// Keyword sets a sanitized identifier must avoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordSet {
    Rust,
    Python,
    Typescript,
}

/// `[naming]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamingConfig {
    pub keywords: Vec<KeywordSet>,
    /// Additional identifiers treated as reserved (compared after case
    /// conversion).
    pub extra_reserved: Vec<String>,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            keywords: vec![KeywordSet::Rust, KeywordSet::Python, KeywordSet::Typescript],
            extra_reserved: Vec::new(),
        }
    }
}

/// `[media]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediaConfig {
    /// Media types tried in order when picking a body schema.
    pub preferred: Vec<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            preferred: vec!["application/json".to_string()],
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = CompilerConfig::from_toml_str("").unwrap();
        assert_eq!(config, CompilerConfig::default());
        assert_eq!(config.naming.keywords.len(), 3);
        assert_eq!(config.media.preferred, vec!["application/json"]);
    }

    #[test]
    fn test_partial_sections() {
        let config = CompilerConfig::from_toml_str(
            r#"
            [naming]
            keywords = ["python"]
            "#,
        )
        .unwrap();
        assert_eq!(config.naming.keywords, vec![KeywordSet::Python]);
        assert!(config.naming.extra_reserved.is_empty());
        assert_eq!(config.media, MediaConfig::default());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = CompilerConfig::from_toml_str("[naming]\ncase = \"camel\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = CompilerConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }
}
