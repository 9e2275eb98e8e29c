//! The mapping engine: resolves target ontologies, runs a mapper over every
//! phrase and applies filtering, ranking and the unmapped policy.

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use super::preprocess::{prepare_terms, SourceTerm, TargetSpec};
use crate::cache::TermCache;
use crate::config::{Config, MappingConfig};
use crate::error::{CacheError, MapperError, Result, TermapError};
use crate::mapper::{create_mapper, Mapper, MapperKind, MappingCandidate, MappingTarget, TermPool};
use crate::metrics::{get_metrics, Metrics};
use crate::ontology::{OntologyReference, TermCollector, TermIndex, TermType};
use crate::output::{MappingTable, ResultAssembler};

/// Where term indexes for local mappers come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexSource {
    /// Collect from the ontology source on every call.
    #[default]
    Collect,
    /// Load from the term cache; a missing or corrupt entry fails the call.
    Cache,
    /// Load from the term cache, collecting when the entry is missing or corrupt.
    CacheOrCollect,
}

/// Options for one mapping call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingOptions {
    pub min_score: f64,
    pub max_mappings: usize,
    pub excl_deprecated: bool,
    pub incl_unmapped: bool,
    pub term_type: TermType,
    /// Allowed IRI prefixes; empty allows all.
    pub base_iris: Vec<String>,
    pub index_source: IndexSource,
    /// Overrides the engine's cache directory for this call.
    pub cache_dir: Option<PathBuf>,
    /// Phrases scored concurrently.
    pub concurrency: usize,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self::from(&MappingConfig::default())
    }
}

impl From<&MappingConfig> for MappingOptions {
    fn from(config: &MappingConfig) -> Self {
        Self {
            min_score: config.min_score,
            max_mappings: config.max_mappings,
            excl_deprecated: config.excl_deprecated,
            incl_unmapped: config.incl_unmapped,
            term_type: config.term_type,
            base_iris: Vec::new(),
            index_source: IndexSource::default(),
            cache_dir: None,
            concurrency: config.concurrency,
        }
    }
}

impl MappingOptions {
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_max_mappings(mut self, max_mappings: usize) -> Self {
        self.max_mappings = max_mappings;
        self
    }

    pub fn with_excl_deprecated(mut self, excl_deprecated: bool) -> Self {
        self.excl_deprecated = excl_deprecated;
        self
    }

    pub fn with_incl_unmapped(mut self, incl_unmapped: bool) -> Self {
        self.incl_unmapped = incl_unmapped;
        self
    }

    pub fn with_term_type(mut self, term_type: TermType) -> Self {
        self.term_type = term_type;
        self
    }

    pub fn with_base_iris(mut self, base_iris: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.base_iris = base_iris.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_index_source(mut self, index_source: IndexSource) -> Self {
        self.index_source = index_source;
        self
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Check the options against a target list before any I/O happens.
    pub fn validate(&self, target: &TargetSpec) -> Result<()> {
        if !self.min_score.is_finite() || !(0.0..=1.0).contains(&self.min_score) {
            return Err(TermapError::InvalidFilterConfiguration(format!(
                "min_score must be within [0, 1], got {}",
                self.min_score
            )));
        }
        if self.max_mappings == 0 {
            return Err(TermapError::InvalidFilterConfiguration(
                "max_mappings must be at least 1".to_string(),
            ));
        }
        if target.is_empty() {
            return Err(TermapError::InvalidFilterConfiguration(
                "at least one target ontology is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Maps source phrases to ontology terms.
pub struct MappingEngine {
    config: Config,
    collector: TermCollector,
    cache: TermCache,
    assembler: ResultAssembler,
}

impl MappingEngine {
    pub fn new(config: Config, collector: TermCollector, cache: TermCache) -> Self {
        Self {
            config,
            collector,
            cache,
            assembler: ResultAssembler::new(),
        }
    }

    /// Create an engine with the default loader and a cache rooted at `config.cache`.
    pub fn from_config(config: Config) -> Result<Self> {
        let collector = TermCollector::from_config(&config)?;
        let cache = TermCache::new(&config.cache);
        Ok(Self::new(config, collector, cache))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn collector(&self) -> &TermCollector {
        &self.collector
    }

    pub fn cache(&self) -> &TermCache {
        &self.cache
    }

    /// Options seeded from the `[mapping]` configuration.
    pub fn default_options(&self) -> MappingOptions {
        MappingOptions::from(&self.config.mapping)
    }

    /// Map phrases to terms of the target ontologies with a built-in mapper.
    pub async fn map_terms(
        &self,
        source_terms: Vec<SourceTerm>,
        target: &TargetSpec,
        mapper: MapperKind,
        options: &MappingOptions,
    ) -> Result<MappingTable> {
        options.validate(target)?;
        let mapper = create_mapper(mapper, &self.config)?;
        self.map_terms_with(source_terms, target, mapper.as_ref(), options)
            .await
    }

    /// Map phrases with any [`Mapper`] implementation.
    pub async fn map_terms_with(
        &self,
        source_terms: Vec<SourceTerm>,
        target: &TargetSpec,
        mapper: &dyn Mapper,
        options: &MappingOptions,
    ) -> Result<MappingTable> {
        options.validate(target)?;
        let metrics = get_metrics();
        let timer = Metrics::start_timer(&metrics.mapping_duration_seconds);

        let terms = prepare_terms(source_terms);

        let pool;
        let mapping_target = if mapper.kind().is_remote() {
            MappingTarget::Remote {
                ontologies: target.identifiers(),
                term_type: options.term_type,
            }
        } else {
            let indexes = self.resolve(target, options).await?;
            pool = TermPool::from_indexes(&indexes, options.term_type, &options.base_iris);
            MappingTarget::Pool(&pool)
        };

        tracing::info!(
            "Mapping {} phrases to {} using {}",
            terms.len(),
            mapping_target,
            mapper.kind()
        );

        let target_ref = &mapping_target;
        let ranked: Vec<Vec<MappingCandidate>> = stream::iter(terms.iter())
            .map(|term| map_phrase(mapper, term, target_ref, options))
            .buffered(options.concurrency.max(1))
            .try_collect()
            .await?;

        let mapped = ranked.iter().filter(|c| !c.is_empty()).count();
        metrics.phrases_mapped_total.inc_by(mapped as u64);
        metrics
            .phrases_unmapped_total
            .inc_by((ranked.len() - mapped) as u64);

        let table = self
            .assembler
            .assemble(ranked, &terms, options.incl_unmapped);
        tracing::info!(
            "Mapped {} of {} phrases ({} rows) in {:?}",
            mapped,
            terms.len(),
            table.len(),
            timer.elapsed()
        );
        Ok(table)
    }

    /// Resolve every target to a term index according to `options.index_source`.
    pub async fn resolve(
        &self,
        target: &TargetSpec,
        options: &MappingOptions,
    ) -> Result<Vec<Arc<TermIndex>>> {
        let cache = match &options.cache_dir {
            Some(dir) => self.cache.with_base_dir(dir),
            None => self.cache.clone(),
        };

        let mut indexes = Vec::with_capacity(target.len());
        for reference in target.references() {
            let index = match options.index_source {
                IndexSource::Collect => self.collect(&reference, options).await?,
                // Only acronyms have cache entries; a file or URL target is a miss.
                IndexSource::Cache => match reference.acronym() {
                    Some(acronym) => cache.load(acronym).await?,
                    None => return Err(CacheError::Miss(reference.to_string()).into()),
                },
                IndexSource::CacheOrCollect => match reference.acronym() {
                    Some(acronym) => match cache.load(acronym).await {
                        Ok(index) => index,
                        Err(e) if e.is_recoverable_cache_error() => {
                            tracing::warn!("{}; collecting {} instead", e, reference);
                            self.collect(&reference, options).await?
                        }
                        Err(e) => return Err(e),
                    },
                    None => self.collect(&reference, options).await?,
                },
            };
            indexes.push(index);
        }
        Ok(indexes)
    }

    async fn collect(
        &self,
        reference: &OntologyReference,
        options: &MappingOptions,
    ) -> Result<Arc<TermIndex>> {
        let index = self
            .collector
            .collect(reference, options.term_type, &options.base_iris)
            .await?;
        Ok(Arc::new(index))
    }
}

/// Score one phrase and rank the result.
///
/// An unavailable remote service yields no candidates for this phrase only.
async fn map_phrase(
    mapper: &dyn Mapper,
    term: &SourceTerm,
    target: &MappingTarget<'_>,
    options: &MappingOptions,
) -> Result<Vec<MappingCandidate>> {
    let candidates = match mapper.map_term(term, target).await {
        Ok(candidates) => candidates,
        Err(MapperError::RemoteServiceUnavailable { service, reason }) => {
            tracing::warn!(
                "Could not map '{}': {} unavailable: {}",
                term.phrase(),
                service,
                reason
            );
            get_metrics().record_remote_failure(&service);
            Vec::new()
        }
        Err(e) => return Err(e.into()),
    };
    Ok(rank_candidates(candidates, options))
}

/// Drop deprecated and low-scoring candidates, keep the best per IRI and cap.
pub(crate) fn rank_candidates(
    mut candidates: Vec<MappingCandidate>,
    options: &MappingOptions,
) -> Vec<MappingCandidate> {
    candidates.retain(|c| {
        !(options.excl_deprecated && c.term.is_deprecated()) && c.score >= options.min_score
    });
    candidates.sort_by(MappingCandidate::rank_cmp);

    let mut seen = HashSet::new();
    candidates.retain(|c| seen.insert(c.term.iri().to_string()));
    candidates.truncate(options.max_mappings);
    candidates
}
