//! Configuration settings for termap.

use crate::error::{ConfigError, Result};
use crate::mapper::MapperKind;
use crate::ontology::TermType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub mapping: MappingConfig,
    pub remote: RemoteConfig,
    pub transport: TransportConfig,
    /// Ontology acronym to download location overrides.
    pub registry: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations or use defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            PathBuf::from("termap.toml"),
            PathBuf::from("config.toml"),
            dirs::config_dir()
                .map(|p| p.join("termap/config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".termap/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.is_file() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        if self.cache.base_dir.trim().is_empty() {
            return Err(ConfigError::MissingField("cache.base_dir".to_string()).into());
        }

        let min_score = self.mapping.min_score;
        if !min_score.is_finite() || !(0.0..=1.0).contains(&min_score) {
            return Err(
                ConfigError::Invalid("mapping.min_score must be within [0, 1]".to_string()).into(),
            );
        }

        if self.mapping.max_mappings == 0 {
            return Err(ConfigError::Invalid("mapping.max_mappings must be > 0".to_string()).into());
        }

        if self.mapping.concurrency == 0 {
            return Err(ConfigError::Invalid("mapping.concurrency must be > 0".to_string()).into());
        }

        if self.transport.fetch_timeout_secs == 0 {
            return Err(
                ConfigError::Invalid("transport.fetch_timeout_secs must be > 0".to_string()).into(),
            );
        }

        if self.remote.zooma_url.is_empty() {
            return Err(ConfigError::MissingField("remote.zooma_url".to_string()).into());
        }

        if self.remote.bioportal_url.is_empty() {
            return Err(ConfigError::MissingField("remote.bioportal_url".to_string()).into());
        }

        Ok(())
    }

    /// Expand the cache directory path.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache.base_path()
    }
}

/// Term cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root directory holding one folder per cached ontology
    pub base_dir: String,
    /// Number of loaded indexes kept in memory
    pub memory_entries: u64,
    /// TTL for in-memory indexes in seconds
    pub ttl_secs: u64,
}

impl CacheConfig {
    /// Create a configuration rooted at `base_dir` with default memory settings.
    pub fn at(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_string_lossy().to_string(),
            ..Self::default()
        }
    }

    /// The base directory with `~` expanded.
    pub fn base_path(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.base_dir);
        PathBuf::from(expanded.as_ref())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            base_dir: "cache".to_string(),
            memory_entries: 16,
            ttl_secs: 3600,
        }
    }
}

/// Default mapping options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Mapper used when none is given
    pub mapper: MapperKind,
    /// Minimum score for a candidate to be kept
    pub min_score: f64,
    /// Maximum candidates kept per phrase
    pub max_mappings: usize,
    /// Exclude deprecated terms
    pub excl_deprecated: bool,
    /// Emit a placeholder row for phrases without candidates
    pub incl_unmapped: bool,
    /// Which ontology entities to match against
    pub term_type: TermType,
    /// Phrases scored concurrently
    pub concurrency: usize,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            mapper: MapperKind::Tfidf,
            min_score: 0.3,
            max_mappings: 3,
            excl_deprecated: false,
            incl_unmapped: false,
            term_type: TermType::Class,
            concurrency: 8,
        }
    }
}

/// Remote annotation service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Zooma API base URL
    pub zooma_url: String,
    /// BioPortal API base URL
    pub bioportal_url: String,
    /// BioPortal API key (loaded from environment if not set)
    pub bioportal_api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl RemoteConfig {
    /// The BioPortal API key, falling back to `BIOPORTAL_API_KEY`.
    pub fn resolved_bioportal_key(&self) -> Option<String> {
        self.bioportal_api_key
            .clone()
            .or_else(|| std::env::var("BIOPORTAL_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Per-request timeout for remote services.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            zooma_url: "https://www.ebi.ac.uk/spot/zooma/v2/api".to_string(),
            bioportal_url: "https://data.bioontology.org".to_string(),
            bioportal_api_key: None,
            timeout_secs: 30,
        }
    }
}

/// HTTP transport options shared by ontology fetching and remote mappers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Skip TLS certificate validation (opt-in only)
    pub accept_invalid_certs: bool,
    /// Deadline for one ontology download in seconds
    pub fetch_timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            accept_invalid_certs: false,
            fetch_timeout_secs: 300,
        }
    }
}

impl TransportConfig {
    /// Build an HTTP client honoring these transport options.
    pub fn build_client(&self, timeout: Option<Duration>) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("termap/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(self.accept_invalid_certs);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        if self.accept_invalid_certs {
            tracing::warn!("TLS certificate validation is disabled for this client");
        }

        builder.build().map_err(|e| {
            ConfigError::Invalid(format!("Failed to create HTTP client: {}", e)).into()
        })
    }

    /// Deadline for ontology downloads.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
