//! Term cache for ontology indexes.
//!
//! Each cached ontology lives in its own directory under the base directory:
//!
//! ```text
//! <base>/<ACRONYM>/index.json
//! ```
//!
//! Loaded indexes are also kept in an in-memory layer so repeated loads in
//! one process skip the disk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::mapper::MapperKind;
use crate::mapping::{IndexSource, MappingEngine, MappingOptions, SourceTerm, TargetSpec};
use crate::metrics::get_metrics;
use crate::ontology::{OntologyReference, TermCollector, TermIndex, TermRecord, TermType};
use crate::output::MappingTable;

const ARTIFACT_VERSION: u32 = 1;
const ARTIFACT_FILE: &str = "index.json";

/// On-disk representation of a cached term index.
#[derive(Debug, Serialize, Deserialize)]
struct CacheArtifact {
    version: u32,
    acronym: String,
    source: String,
    created_at: DateTime<Utc>,
    term_type: TermType,
    #[serde(default)]
    base_iris: Vec<String>,
    term_count: usize,
    /// SHA-256 of the serialized `terms` array.
    checksum: String,
    terms: Vec<TermRecord>,
}

fn checksum<T: Serialize + ?Sized>(terms: &T) -> Result<String> {
    let bytes = serde_json::to_vec(terms)?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

/// What to remove from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearScope {
    /// A single ontology.
    Ontology(String),
    /// Every cached ontology.
    All,
}

/// Result of a clear request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared,
    /// Nothing was there to clear.
    NotFound,
}

/// Durable store of term indexes keyed by ontology acronym.
///
/// Cloning is cheap; clones share the base directory and memory layer.
#[derive(Clone)]
pub struct TermCache {
    base_dir: Arc<RwLock<PathBuf>>,
    /// Keyed by entry directory so handles on different base dirs can share it.
    memory: Cache<PathBuf, Arc<TermIndex>>,
}

impl TermCache {
    /// Create a cache from configuration. The base directory is created lazily.
    pub fn new(config: &CacheConfig) -> Self {
        let memory = Cache::builder()
            .max_capacity(config.memory_entries)
            .time_to_live(Duration::from_secs(config.ttl_secs))
            .build();

        Self {
            base_dir: Arc::new(RwLock::new(config.base_path())),
            memory,
        }
    }

    /// Current base directory.
    pub fn base_dir(&self) -> PathBuf {
        self.base_dir.read().clone()
    }

    /// Point this handle (and its clones) at a new base directory.
    ///
    /// The directory is created if missing. Existing entries are not moved.
    pub async fn set_base_dir(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(CacheError::Io)?;
        *self.base_dir.write() = path.clone();
        tracing::info!("Cache folder set to {}", path.display());
        Ok(path)
    }

    /// An independent handle rooted at `path`, sharing the memory layer.
    pub fn with_base_dir(&self, path: impl AsRef<Path>) -> Self {
        Self {
            base_dir: Arc::new(RwLock::new(path.as_ref().to_path_buf())),
            memory: self.memory.clone(),
        }
    }

    fn entry_dir(&self, acronym: &str) -> Result<PathBuf> {
        validate_key(acronym)?;
        Ok(self.base_dir().join(acronym))
    }

    /// Whether an entry exists for `acronym`.
    pub fn exists(&self, acronym: &str) -> bool {
        self.entry_dir(acronym)
            .map(|dir| dir.is_dir())
            .unwrap_or(false)
    }

    /// Persist `index` under `acronym`, replacing any previous entry.
    pub async fn store(&self, acronym: &str, source: &str, index: &TermIndex) -> Result<PathBuf> {
        let entry = self.entry_dir(acronym)?;
        let base = self.base_dir();
        tokio::fs::create_dir_all(&base)
            .await
            .map_err(CacheError::Io)?;

        let terms = index.sorted();
        let artifact = CacheArtifact {
            version: ARTIFACT_VERSION,
            acronym: acronym.to_string(),
            source: source.to_string(),
            created_at: Utc::now(),
            term_type: index.term_type(),
            base_iris: index.base_iris().to_vec(),
            term_count: terms.len(),
            checksum: checksum(&terms)?,
            terms: terms.into_iter().cloned().collect(),
        };
        let content = serde_json::to_vec_pretty(&artifact)?;

        if entry.is_dir() {
            // Replace in place: write to a temp file, then rename over the artifact
            let artifact_path = entry.join(ARTIFACT_FILE);
            let temp_path = artifact_path.with_extension("json.tmp");
            tokio::fs::write(&temp_path, &content)
                .await
                .map_err(CacheError::Io)?;
            tokio::fs::rename(&temp_path, &artifact_path)
                .await
                .map_err(CacheError::Io)?;
        } else {
            // New entry: build it in a hidden sibling directory, then rename into place
            let staging = base.join(format!(".{}.{}.tmp", acronym, uuid::Uuid::new_v4()));
            tokio::fs::create_dir(&staging)
                .await
                .map_err(CacheError::Io)?;
            let written = async {
                tokio::fs::write(staging.join(ARTIFACT_FILE), &content).await?;
                tokio::fs::rename(&staging, &entry).await
            }
            .await;
            if let Err(e) = written {
                let _ = tokio::fs::remove_dir_all(&staging).await;
                return Err(CacheError::Io(e).into());
            }
        }

        self.memory.invalidate(&entry).await;
        tracing::info!(
            "Cached {} terms for {} at {}",
            artifact.term_count,
            acronym,
            entry.display()
        );
        Ok(entry)
    }

    /// Load the index cached under `acronym`.
    pub async fn load(&self, acronym: &str) -> Result<Arc<TermIndex>> {
        let entry = self.entry_dir(acronym)?;
        let metrics = get_metrics();

        let artifact_path = entry.join(ARTIFACT_FILE);

        // Serve from memory only while the artifact is still on disk.
        if let Some(index) = self.memory.get(&entry).await {
            if artifact_path.is_file() {
                metrics.cache_hits_total.inc();
                tracing::debug!("Memory cache hit for {}", acronym);
                return Ok(index);
            }
            self.memory.invalidate(&entry).await;
            tracing::debug!("Dropping stale memory entry for {}", acronym);
        }

        let bytes = match tokio::fs::read(&artifact_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                metrics.cache_misses_total.inc();
                return Err(CacheError::Miss(acronym.to_string()).into());
            }
            Err(e) => return Err(CacheError::Io(e).into()),
        };

        let index = Arc::new(decode_artifact(acronym, &bytes)?);
        self.memory.insert(entry, Arc::clone(&index)).await;
        metrics.cache_hits_total.inc();
        tracing::info!("Loading cached ontology from: {}", artifact_path.display());
        Ok(index)
    }

    /// Remove one entry or all entries.
    ///
    /// A missing target is reported as [`ClearOutcome::NotFound`], not an error.
    pub async fn clear(&self, scope: ClearScope) -> Result<ClearOutcome> {
        match scope {
            ClearScope::Ontology(acronym) => {
                let entry = self.entry_dir(&acronym)?;
                self.memory.invalidate(&entry).await;
                if !entry.is_dir() {
                    tracing::warn!("Cache directory {} does not exist", entry.display());
                    return Ok(ClearOutcome::NotFound);
                }
                tokio::fs::remove_dir_all(&entry)
                    .await
                    .map_err(CacheError::Io)?;
                tracing::info!("Cleared cache for {}", acronym);
                Ok(ClearOutcome::Cleared)
            }
            ClearScope::All => {
                let base = self.base_dir();
                self.memory.invalidate_all();
                if !base.is_dir() {
                    tracing::warn!("Cache directory {} does not exist", base.display());
                    return Ok(ClearOutcome::NotFound);
                }
                let mut entries = tokio::fs::read_dir(&base).await.map_err(CacheError::Io)?;
                while let Some(entry) = entries.next_entry().await.map_err(CacheError::Io)? {
                    let path = entry.path();
                    let removed = if path.is_dir() {
                        tokio::fs::remove_dir_all(&path).await
                    } else {
                        tokio::fs::remove_file(&path).await
                    };
                    removed.map_err(CacheError::Io)?;
                }
                tracing::info!("Cleared cache at {}", base.display());
                Ok(ClearOutcome::Cleared)
            }
        }
    }

    /// Acronyms with a cache entry, sorted.
    pub async fn list(&self) -> Result<Vec<String>> {
        let base = self.base_dir();
        if !base.is_dir() {
            return Ok(Vec::new());
        }
        let mut acronyms = Vec::new();
        let mut entries = tokio::fs::read_dir(&base).await.map_err(CacheError::Io)?;
        while let Some(entry) = entries.next_entry().await.map_err(CacheError::Io)? {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with('.') && entry.path().is_dir() {
                acronyms.push(name);
            }
        }
        acronyms.sort();
        Ok(acronyms)
    }

    /// Collect every term of `source` and cache it under `acronym`.
    pub async fn cache_ontology(
        &self,
        collector: &TermCollector,
        source: &OntologyReference,
        acronym: &str,
    ) -> Result<CachedOntology> {
        validate_key(acronym)?;
        let index = collector
            .collect_as(source, acronym, TermType::Any, &[])
            .await?;
        self.store(acronym, &source.to_string(), &index).await?;
        Ok(CachedOntology {
            acronym: acronym.to_string(),
            cache: self.with_base_dir(self.base_dir()),
        })
    }

    /// Cache every registry entry. Failures are logged and reported, never fatal.
    pub async fn cache_all(&self, collector: &TermCollector, registry: &Registry) -> CacheReport {
        let mut report = CacheReport::default();
        for entry in registry.entries() {
            let source = OntologyReference::parse(&entry.source);
            match self.cache_ontology(collector, &source, &entry.acronym).await {
                Ok(cached) => report.cached.push(cached),
                Err(e) => {
                    tracing::error!("Could not cache ontology {} due to error: {}", entry.acronym, e);
                    report.failed.push((entry.acronym.clone(), e.to_string()));
                }
            }
        }
        report
    }
}

fn validate_key(acronym: &str) -> std::result::Result<(), CacheError> {
    let invalid = acronym.trim().is_empty()
        || acronym != acronym.trim()
        || acronym.starts_with('.')
        || acronym.contains(['/', '\\', '\0']);
    if invalid {
        return Err(CacheError::InvalidKey(acronym.to_string()));
    }
    Ok(())
}

fn decode_artifact(acronym: &str, bytes: &[u8]) -> Result<TermIndex> {
    let corrupt = |reason: String| CacheError::Corrupt {
        acronym: acronym.to_string(),
        reason,
    };

    let artifact: CacheArtifact =
        serde_json::from_slice(bytes).map_err(|e| corrupt(format!("invalid JSON: {}", e)))?;

    if artifact.version != ARTIFACT_VERSION {
        return Err(corrupt(format!("unsupported version {}", artifact.version)).into());
    }
    if artifact.term_count != artifact.terms.len() {
        return Err(corrupt(format!(
            "expected {} terms, found {}",
            artifact.term_count,
            artifact.terms.len()
        ))
        .into());
    }
    if checksum(&artifact.terms)? != artifact.checksum {
        return Err(corrupt("checksum mismatch".to_string()).into());
    }

    let mut seen = HashSet::new();
    for term in &artifact.terms {
        if term.iri().trim().is_empty() {
            return Err(corrupt("term with empty IRI".to_string()).into());
        }
        if !seen.insert(term.iri()) {
            return Err(corrupt(format!("duplicate IRI {}", term.iri())).into());
        }
        if !artifact.term_type.accepts(term.kind()) {
            return Err(corrupt(format!("term {} violates the index term type", term.iri())).into());
        }
    }

    Ok(TermIndex::from_records(
        acronym,
        artifact.term_type,
        artifact.base_iris,
        artifact.terms,
    ))
}

/// Handle to one cached ontology.
#[derive(Clone)]
pub struct CachedOntology {
    acronym: String,
    cache: TermCache,
}

impl CachedOntology {
    pub fn acronym(&self) -> &str {
        &self.acronym
    }

    pub fn base_dir(&self) -> PathBuf {
        self.cache.base_dir()
    }

    pub fn exists(&self) -> bool {
        self.cache.exists(&self.acronym)
    }

    pub async fn clear(&self) -> Result<ClearOutcome> {
        self.cache
            .clear(ClearScope::Ontology(self.acronym.clone()))
            .await
    }

    pub async fn load(&self) -> Result<Arc<TermIndex>> {
        self.cache.load(&self.acronym).await
    }

    /// Map phrases against this cached ontology only.
    pub async fn map_terms(
        &self,
        engine: &MappingEngine,
        source_terms: Vec<SourceTerm>,
        mapper: MapperKind,
        options: MappingOptions,
    ) -> Result<MappingTable> {
        let options = options
            .with_cache_dir(self.base_dir())
            .with_index_source(IndexSource::Cache);
        engine
            .map_terms(
                source_terms,
                &TargetSpec::new([self.acronym.as_str()]),
                mapper,
                &options,
            )
            .await
    }
}

impl std::fmt::Debug for CachedOntology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedOntology")
            .field("acronym", &self.acronym)
            .field("base_dir", &self.base_dir())
            .finish()
    }
}

/// Outcome of [`TermCache::cache_all`].
#[derive(Debug, Default)]
pub struct CacheReport {
    pub cached: Vec<CachedOntology>,
    /// Acronym and error message of each failed entry.
    pub failed: Vec<(String, String)>,
}

// ============================================================================
// Registry
// ============================================================================

/// One `acronym,source` row of an ontology registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub acronym: String,
    pub source: String,
}

/// A registry row that could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    pub line: usize,
    pub content: String,
    pub reason: String,
}

/// Ontologies to cache in bulk.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
    rejected: Vec<RejectedRow>,
}

impl Registry {
    /// Parse registry CSV text.
    ///
    /// Rows are `acronym,source`. A header row naming an `acronym` column and a
    /// `url`/`source` column selects columns by name. Blank lines and `#`
    /// comments are ignored; malformed rows are logged and skipped.
    pub fn parse(text: &str) -> Self {
        let mut registry = Registry::default();
        let mut columns: Option<(usize, usize)> = None;
        let mut seen_data = false;

        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields = split_fields(line);

            if !seen_data && columns.is_none() && fields[0].eq_ignore_ascii_case("acronym") {
                let source_col = fields.iter().position(|f| {
                    matches!(
                        f.to_ascii_lowercase().as_str(),
                        "url" | "source" | "location" | "iri"
                    )
                });
                columns = Some((0, source_col.unwrap_or(1)));
                continue;
            }
            seen_data = true;

            let (acronym_col, source_col) = columns.unwrap_or((0, 1));
            let acronym = fields.get(acronym_col).map(String::as_str).unwrap_or("");
            let source = fields.get(source_col).map(String::as_str).unwrap_or("");

            let reason = if acronym.is_empty() || source.is_empty() {
                Some("expected acronym and source".to_string())
            } else {
                validate_key(acronym).err().map(|e| e.to_string())
            };

            match reason {
                Some(reason) => {
                    tracing::warn!("Skipping registry line {}: {}", number + 1, reason);
                    registry.rejected.push(RejectedRow {
                        line: number + 1,
                        content: raw.to_string(),
                        reason,
                    });
                }
                None => registry.entries.push(RegistryEntry {
                    acronym: acronym.to_string(),
                    source: source.to_string(),
                }),
            }
        }

        registry
    }

    /// Read and parse a registry file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        Ok(Self::parse(&text))
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn rejected(&self) -> &[RejectedRow] {
        &self.rejected
    }
}

/// Split one CSV row into trimmed fields.
///
/// Double-quoted fields may contain commas, and `""` inside quotes is a
/// literal quote.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut field).trim().to_string()),
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());
    fields
}
