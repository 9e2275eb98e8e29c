//! Error types for termap.

use thiserror::Error;

/// Main error type for termap operations.
#[derive(Error, Debug)]
pub enum TermapError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Mapper error: {0}")]
    Mapper(#[from] MapperError),

    #[error("Invalid filter configuration: {0}")]
    InvalidFilterConfiguration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Ontology source errors (fetching and parsing).
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Ontology source unreachable: {source_ref}: {reason}")]
    Unreachable { source_ref: String, reason: String },

    #[error("Failed to parse ontology {source_ref}: {reason}")]
    Parse { source_ref: String, reason: String },
}

impl SourceError {
    pub(crate) fn unreachable(source_ref: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unreachable {
            source_ref: source_ref.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn parse(source_ref: impl Into<String>, reason: impl ToString) -> Self {
        Self::Parse {
            source_ref: source_ref.into(),
            reason: reason.to_string(),
        }
    }
}

/// Term cache errors.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("No cache entry for ontology {0}")]
    Miss(String),

    #[error("Cache entry for ontology {acronym} is corrupt: {reason}")]
    Corrupt { acronym: String, reason: String },

    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Mapper errors.
#[derive(Error, Debug)]
pub enum MapperError {
    #[error("Remote service {service} unavailable: {reason}")]
    RemoteServiceUnavailable { service: String, reason: String },

    #[error("Mapper {mapper} cannot score against {target}")]
    UnsupportedTarget { mapper: String, target: String },
}

impl MapperError {
    pub(crate) fn unavailable(service: impl Into<String>, reason: impl ToString) -> Self {
        Self::RemoteServiceUnavailable {
            service: service.into(),
            reason: reason.to_string(),
        }
    }
}

impl TermapError {
    /// True for cache errors that a caller may recover from by collecting afresh.
    pub fn is_recoverable_cache_error(&self) -> bool {
        matches!(
            self,
            TermapError::Cache(CacheError::Miss(_)) | TermapError::Cache(CacheError::Corrupt { .. })
        )
    }
}

/// Result type alias for termap operations.
pub type Result<T> = std::result::Result<T, TermapError>;
