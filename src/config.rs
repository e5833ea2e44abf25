//! Configuration for building a range index from a mapping table

use crate::dataset::DatasetError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Environment variable naming the mapping table when no path is given
pub const SOURCE_ENV_VAR: &str = "ASN_IPV6_FILE";

/// Default cap on overlap resolution passes
pub const DEFAULT_MAX_MERGE_PASSES: usize = 64;

/// How raw rows are turned into ranges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStrategy {
    /// Truncate rows to 64-bit prefixes and merge overlapping intervals
    #[default]
    Merge,
    /// Decompose rows into CIDR blocks and flatten a prefix trie
    Trie,
}

impl fmt::Display for BuildStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStrategy::Merge => write!(f, "merge"),
            BuildStrategy::Trie => write!(f, "trie"),
        }
    }
}

/// Configuration for an index build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Mapping table to read; falls back to `ASN_IPV6_FILE`
    pub source: Option<PathBuf>,
    /// Build strategy (default: merge)
    pub strategy: BuildStrategy,
    /// Maximum number of merge passes (default: 64)
    pub max_merge_passes: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            source: None,
            strategy: BuildStrategy::default(),
            max_merge_passes: DEFAULT_MAX_MERGE_PASSES,
        }
    }
}

impl IndexConfig {
    /// Create a new IndexConfig builder
    pub fn builder() -> IndexConfigBuilder {
        IndexConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_merge_passes == 0 {
            return Err("max_merge_passes must be at least 1".to_string());
        }
        if matches!(&self.source, Some(path) if path.as_os_str().is_empty()) {
            return Err("source path must not be empty".to_string());
        }
        Ok(())
    }

    /// The mapping table to read
    ///
    /// An explicit `source` wins over the environment variable.
    pub fn resolve_source(&self) -> Result<PathBuf, DatasetError> {
        if let Some(path) = &self.source {
            return Ok(path.clone());
        }
        match std::env::var_os(SOURCE_ENV_VAR) {
            Some(value) if !value.is_empty() => Ok(PathBuf::from(value)),
            _ => Err(DatasetError::Config(format!(
                "no mapping table given and {} is not set",
                SOURCE_ENV_VAR
            ))),
        }
    }
}

/// Builder for IndexConfig
pub struct IndexConfigBuilder {
    config: IndexConfig,
}

impl IndexConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            config: IndexConfig::default(),
        }
    }

    /// Set the mapping table path
    pub fn source(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.source = Some(path.into());
        self
    }

    /// Set the build strategy
    pub fn strategy(mut self, strategy: BuildStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Set the maximum number of merge passes
    pub fn max_merge_passes(mut self, passes: usize) -> Self {
        self.config.max_merge_passes = passes;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<IndexConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for IndexConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = IndexConfig::default();
        assert_eq!(config.source, None);
        assert_eq!(config.strategy, BuildStrategy::Merge);
        assert_eq!(config.max_merge_passes, 64);
    }

    #[test]
    fn test_builder() {
        let config = IndexConfig::builder()
            .source("/tmp/ip2asn-v6.tsv")
            .strategy(BuildStrategy::Trie)
            .max_merge_passes(8)
            .build()
            .unwrap();
        assert_eq!(config.source, Some(PathBuf::from("/tmp/ip2asn-v6.tsv")));
        assert_eq!(config.strategy, BuildStrategy::Trie);
        assert_eq!(config.max_merge_passes, 8);
    }

    #[test]
    fn test_validation() {
        assert!(IndexConfig::builder().max_merge_passes(0).build().is_err());
        assert!(IndexConfig::builder().source("").build().is_err());
        assert!(IndexConfig::builder().build().is_ok());
    }

    #[test]
    fn test_strategy_serde() {
        assert_eq!(
            serde_json::to_string(&BuildStrategy::Trie).unwrap(),
            "\"trie\""
        );
        let config: IndexConfig = serde_json::from_str(
            r#"{"source":null,"strategy":"merge","max_merge_passes":3}"#,
        )
        .unwrap();
        assert_eq!(config.max_merge_passes, 3);

        let json = serde_json::to_value(IndexConfig::default()).unwrap();
        let mut keys: Vec<&str> = json
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, ["max_merge_passes", "source", "strategy"]);
    }

    #[test]
    #[serial]
    fn test_source_from_environment() {
        std::env::set_var(SOURCE_ENV_VAR, "/data/ip2asn-v6.tsv");
        let resolved = IndexConfig::default().resolve_source();
        std::env::remove_var(SOURCE_ENV_VAR);
        assert_eq!(resolved.unwrap(), PathBuf::from("/data/ip2asn-v6.tsv"));
    }

    #[test]
    #[serial]
    fn test_explicit_source_wins() {
        std::env::set_var(SOURCE_ENV_VAR, "/data/ignored.tsv");
        let resolved = IndexConfig::builder()
            .source("/data/chosen.tsv")
            .build()
            .unwrap()
            .resolve_source();
        std::env::remove_var(SOURCE_ENV_VAR);
        assert_eq!(resolved.unwrap(), PathBuf::from("/data/chosen.tsv"));
    }

    #[test]
    #[serial]
    fn test_missing_source() {
        std::env::remove_var(SOURCE_ENV_VAR);
        assert!(matches!(
            IndexConfig::default().resolve_source(),
            Err(DatasetError::Config(_))
        ));
    }
}
