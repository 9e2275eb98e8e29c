//! Mapper trait and shared mapping types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use super::tfidf::TfidfModel;
use crate::error::MapperError;
use crate::mapping::{normalize, SourceTerm};
use crate::ontology::{TermIndex, TermRecord, TermType};

/// The available mapping strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapperKind {
    /// Character n-gram TF-IDF cosine similarity.
    #[default]
    Tfidf,
    /// Jaro-Winkler string similarity.
    JaroWinkler,
    /// Normalized Levenshtein similarity.
    Levenshtein,
    /// EBI Zooma annotation service.
    Zooma,
    /// NCBO BioPortal annotator.
    #[serde(rename = "bioportal")]
    BioPortal,
}

impl MapperKind {
    pub const ALL: [MapperKind; 5] = [
        MapperKind::Tfidf,
        MapperKind::JaroWinkler,
        MapperKind::Levenshtein,
        MapperKind::Zooma,
        MapperKind::BioPortal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MapperKind::Tfidf => "tfidf",
            MapperKind::JaroWinkler => "jaro_winkler",
            MapperKind::Levenshtein => "levenshtein",
            MapperKind::Zooma => "zooma",
            MapperKind::BioPortal => "bioportal",
        }
    }

    /// Whether this mapper queries a web service instead of a local term pool.
    pub fn is_remote(self) -> bool {
        matches!(self, MapperKind::Zooma | MapperKind::BioPortal)
    }
}

impl fmt::Display for MapperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapperKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        MapperKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown mapper '{}', expected one of: {}",
                    s,
                    MapperKind::ALL.map(MapperKind::as_str).join(", ")
                )
            })
    }
}

/// A term in a pool, tagged with the ontology it came from.
#[derive(Debug, Clone)]
pub struct PoolEntry {
    pub term: Arc<TermRecord>,
    pub ontology: String,
    /// Normalized label and synonyms.
    pub names: Vec<String>,
}

/// The union of filtered term indexes a mapping call scores against.
#[derive(Debug, Default)]
pub struct TermPool {
    entries: Vec<PoolEntry>,
    tfidf: OnceLock<TfidfModel>,
}

impl TermPool {
    /// Build a pool from indexes, keeping terms that pass `term_type` and `base_iris`.
    ///
    /// Entries are ordered by ontology position, then IRI.
    pub fn from_indexes(indexes: &[Arc<TermIndex>], term_type: TermType, base_iris: &[String]) -> Self {
        let mut entries = Vec::new();
        for index in indexes {
            let mut terms: Vec<&Arc<TermRecord>> = index.filtered(term_type, base_iris).collect();
            terms.sort_by(|a, b| a.iri().cmp(b.iri()));
            entries.extend(terms.into_iter().map(|term| PoolEntry {
                names: term.names().map(normalize).filter(|n| !n.is_empty()).collect(),
                term: Arc::clone(term),
                ontology: index.ontology().to_string(),
            }));
        }
        Self {
            entries,
            tfidf: OnceLock::new(),
        }
    }

    pub fn entries(&self) -> &[PoolEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// TF-IDF model over this pool, built on first use.
    pub(crate) fn tfidf(&self) -> &TfidfModel {
        self.tfidf.get_or_init(|| TfidfModel::fit(&self.entries))
    }
}

/// What a mapper scores a phrase against.
#[derive(Debug, Clone, Copy)]
pub enum MappingTarget<'a> {
    /// Locally collected or cached terms.
    Pool(&'a TermPool),
    /// Ontology acronyms known to a remote service.
    Remote {
        ontologies: &'a [String],
        term_type: TermType,
    },
}

impl fmt::Display for MappingTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingTarget::Pool(pool) => write!(f, "local pool of {} terms", pool.len()),
            MappingTarget::Remote { ontologies, .. } => {
                write!(f, "remote ontologies [{}]", ontologies.join(","))
            }
        }
    }
}

/// One scored match of a source phrase to an ontology term.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingCandidate {
    pub source_term: String,
    pub source_term_id: String,
    pub term: Arc<TermRecord>,
    /// Ontology acronym or source the term came from.
    pub ontology: String,
    /// Score in [0, 1].
    pub score: f64,
    pub mapper: MapperKind,
}

impl MappingCandidate {
    pub fn new(
        source: &SourceTerm,
        term: Arc<TermRecord>,
        ontology: impl Into<String>,
        score: f64,
        mapper: MapperKind,
    ) -> Self {
        Self {
            source_term: source.phrase().to_string(),
            source_term_id: source.id().to_string(),
            term,
            ontology: ontology.into(),
            score: score.clamp(0.0, 1.0),
            mapper,
        }
    }

    /// Ranking order: score descending, then label, then IRI.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.term.label().cmp(other.term.label()))
            .then_with(|| self.term.iri().cmp(other.term.iri()))
    }
}

/// Round a similarity to four decimals and clamp it into [0, 1].
pub(crate) fn round_score(score: f64) -> f64 {
    ((score * 10_000.0).round() / 10_000.0).clamp(0.0, 1.0)
}

/// A strategy that scores one source phrase against a target.
///
/// Mappers never threshold or cap results; the engine does.
#[async_trait]
pub trait Mapper: Send + Sync {
    /// Which strategy this is.
    fn kind(&self) -> MapperKind;

    /// Score `source` against `target`.
    async fn map_term(
        &self,
        source: &SourceTerm,
        target: &MappingTarget<'_>,
    ) -> Result<Vec<MappingCandidate>, MapperError>;
}
