//! CLI command handlers.

use anyhow::{bail, Context, Result};
use termap::{
    get_metrics,
    mapping::parse_source_terms,
    ClearScope, Config, IndexSource, MapperKind, MappingEngine, MappingMetadata,
    OntologyReference, Registry, SourceTerm, TargetSpec, TermCache, TermCollector, TermType,
};

use super::output;

/// Arguments of the `map` command.
#[derive(Debug, Clone)]
pub struct MapRequest {
    pub phrases: Vec<String>,
    pub source_terms: Option<String>,
    pub target: String,
    pub mapper: Option<MapperKind>,
    pub min_score: Option<f64>,
    pub max_mappings: Option<usize>,
    pub excl_deprecated: bool,
    pub incl_unmapped: bool,
    pub term_type: Option<TermType>,
    pub base_iris: Vec<String>,
    pub use_cache: bool,
    pub output: Option<String>,
    pub metadata: bool,
}

/// Run the map command.
pub async fn run_map(config: Config, request: MapRequest, json_output: bool) -> Result<()> {
    let mut terms: Vec<SourceTerm> = request
        .phrases
        .iter()
        .map(|p| SourceTerm::new(p.as_str()))
        .collect();
    if let Some(path) = &request.source_terms {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading source terms from {}", path))?;
        terms.extend(parse_source_terms(&text));
    }
    if terms.is_empty() {
        bail!("no phrases to map; pass phrases or --source-terms");
    }

    let engine = MappingEngine::from_config(config)?;
    let mapper = request.mapper.unwrap_or(engine.config().mapping.mapper);
    let target = TargetSpec::parse(&request.target);

    let mut options = engine.default_options();
    if let Some(min_score) = request.min_score {
        options.min_score = min_score;
    }
    if let Some(max_mappings) = request.max_mappings {
        options.max_mappings = max_mappings;
    }
    if let Some(term_type) = request.term_type {
        options.term_type = term_type;
    }
    options.excl_deprecated |= request.excl_deprecated;
    options.incl_unmapped |= request.incl_unmapped;
    options.base_iris = request.base_iris;
    if request.use_cache {
        options.index_source = IndexSource::CacheOrCollect;
    }

    let table = engine.map_terms(terms, &target, mapper, &options).await?;
    let metadata = request
        .metadata
        .then(|| MappingMetadata::new(mapper, &target, &options));

    match &request.output {
        Some(path) => {
            table.write_csv(path, metadata.as_ref()).await?;
            output::print_write_summary(&table, path, json_output)
        }
        None => output::print_mapping_table(&table, metadata.as_ref(), json_output),
    }
}

/// Run the cache command.
pub async fn run_cache(
    config: Config,
    source: String,
    acronym: Option<String>,
    json_output: bool,
) -> Result<()> {
    let reference = OntologyReference::parse(&source);
    let acronym = match acronym.or_else(|| reference.acronym().map(str::to_string)) {
        Some(acronym) => acronym,
        None => bail!("--acronym is required when caching from a file or URL"),
    };

    let collector = TermCollector::from_config(&config)?;
    let cache = TermCache::new(&config.cache);
    let cached = cache
        .cache_ontology(&collector, &reference, &acronym)
        .await?;
    let index = cached.load().await?;
    output::print_cached(&acronym, index.len(), &cached.base_dir(), json_output)
}

/// Run the cache-all command.
pub async fn run_cache_all(config: Config, registry: String, json_output: bool) -> Result<()> {
    let registry = Registry::from_file(&registry).await?;
    let collector = TermCollector::from_config(&config)?;
    let cache = TermCache::new(&config.cache);
    let report = cache.cache_all(&collector, &registry).await;
    output::print_cache_report(&report, registry.rejected(), json_output)
}

/// Run the clear command.
pub async fn run_clear(
    config: Config,
    acronym: Option<String>,
    all: bool,
    json_output: bool,
) -> Result<()> {
    let scope = match (acronym, all) {
        (_, true) => ClearScope::All,
        (Some(acronym), false) => ClearScope::Ontology(acronym),
        (None, false) => bail!("pass an acronym or --all"),
    };
    let cache = TermCache::new(&config.cache);
    let outcome = cache.clear(scope.clone()).await?;
    output::print_clear_outcome(&scope, outcome, json_output)
}

/// Run the exists command.
pub async fn run_exists(config: Config, acronym: String, json_output: bool) -> Result<()> {
    let cache = TermCache::new(&config.cache);
    let exists = cache.exists(&acronym);
    output::print_exists(&acronym, exists, json_output)
}

/// Run the list command.
pub async fn run_list(config: Config, json_output: bool) -> Result<()> {
    let cache = TermCache::new(&config.cache);
    let acronyms = cache.list().await?;
    output::print_cached_list(&acronyms, &cache.base_dir(), json_output)
}

/// Report the metrics this process collected, on stderr so command output stays clean.
pub fn report_metrics(json_output: bool) -> Result<()> {
    output::print_metrics(&get_metrics(), json_output)
}
