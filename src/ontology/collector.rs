//! Builds term indexes from ontology sources.

use regex::Regex;
use std::sync::{Arc, LazyLock};

use super::source::{HttpOntologyLoader, OntologyLoader, OntologyReference};
use super::types::{matches_base_iris, RawEntity, TermIndex, TermRecord, TermType};
use crate::config::Config;
use crate::error::Result;
use crate::metrics::{get_metrics, Metrics};

/// Extracts a [`TermIndex`] from an ontology source.
#[derive(Clone)]
pub struct TermCollector {
    loader: Arc<dyn OntologyLoader>,
}

impl TermCollector {
    /// Create a collector on top of an ontology loader.
    pub fn new(loader: Arc<dyn OntologyLoader>) -> Self {
        Self { loader }
    }

    /// Create a collector using the default HTTP/file loader.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpOntologyLoader::from_config(config)?)))
    }

    /// Collect terms from `source`, keeping those accepted by `term_type` and `base_iris`.
    ///
    /// The resulting index is named after the acronym when `source` is one,
    /// otherwise after the source string.
    pub async fn collect(
        &self,
        source: &OntologyReference,
        term_type: TermType,
        base_iris: &[String],
    ) -> Result<TermIndex> {
        let name = source.to_string();
        self.collect_named(source, &name, source.acronym(), term_type, base_iris)
            .await
    }

    /// Collect terms from `source` on behalf of a known ontology acronym.
    pub async fn collect_as(
        &self,
        source: &OntologyReference,
        acronym: &str,
        term_type: TermType,
        base_iris: &[String],
    ) -> Result<TermIndex> {
        self.collect_named(source, acronym, Some(acronym), term_type, base_iris)
            .await
    }

    async fn collect_named(
        &self,
        source: &OntologyReference,
        name: &str,
        acronym: Option<&str>,
        term_type: TermType,
        base_iris: &[String],
    ) -> Result<TermIndex> {
        let metrics = get_metrics();
        let timer = Metrics::start_timer(&metrics.collection_duration_seconds);

        tracing::info!("Collecting {} terms from {}", term_type, source);
        let entities = self.loader.load(source).await?;
        let index = build_index(name, acronym, entities, term_type, base_iris);

        metrics.terms_collected_total.inc_by(index.len() as u64);
        metrics.ontologies_collected_total.inc();
        tracing::info!(
            "Collected {} terms from {} in {:?}",
            index.len(),
            source,
            timer.elapsed()
        );

        Ok(index)
    }
}

/// Turn raw entities into an index: filter, derive CURIEs and merge duplicates.
pub(crate) fn build_index(
    name: &str,
    acronym: Option<&str>,
    entities: Vec<RawEntity>,
    term_type: TermType,
    base_iris: &[String],
) -> TermIndex {
    let total = entities.len();
    let mut records = Vec::with_capacity(total);

    for entity in entities {
        let Some(kind) = entity.kind.term_kind() else {
            tracing::debug!("Skipping non-term entity {}", entity.iri);
            continue;
        };
        if !term_type.accepts(kind) || !matches_base_iris(&entity.iri, base_iris) {
            continue;
        }

        let curie = entity
            .curie
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| curie_from_iri(&entity.iri, acronym));

        let Some(record) = TermRecord::new(entity.iri, kind) else {
            tracing::debug!("Skipping entity with empty IRI");
            continue;
        };

        let mut labels = entity.labels.into_iter().filter(|l| !l.trim().is_empty());
        let mut record = record
            .with_curie(curie)
            .with_label(labels.next().unwrap_or_default())
            .with_synonyms(labels)
            .with_synonyms(entity.synonyms)
            .with_deprecated(entity.deprecated);
        if let Some(definition) = entity.definition {
            record = record.with_definition(definition);
        }
        for parent in entity.parents {
            record = record.with_parent(parent);
        }
        records.push(record);
    }

    let kept = records.len();
    let index = TermIndex::from_records(name, term_type, base_iris.to_vec(), records);
    tracing::debug!(
        "Kept {} of {} entities from {} ({} after merging duplicates)",
        kept,
        total,
        name,
        index.len()
    );
    index
}

/// OBO local names: `PREFIX_ID`.
static OBO_LOCAL_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9]*)_([A-Za-z0-9]+)$").expect("Invalid regex")
});

/// Derive a compact identifier for an IRI.
///
/// OBO-style local names (`MONDO_0004979`) become `MONDO:0004979`. Otherwise
/// the local name is prefixed with `acronym` when known. Falls back to the IRI.
pub fn curie_from_iri(iri: &str, acronym: Option<&str>) -> String {
    let local = iri
        .rsplit(['#', '/'])
        .next()
        .filter(|local| !local.is_empty() && local.len() < iri.len())
        .unwrap_or("");

    if let Some(caps) = OBO_LOCAL_ID.captures(local) {
        return format!("{}:{}", &caps[1], &caps[2]);
    }

    match acronym {
        Some(acronym) if !local.is_empty() => format!("{}:{}", acronym.to_uppercase(), local),
        _ => iri.to_string(),
    }
}
