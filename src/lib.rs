//! termap: map free-text phrases onto ontology terms.
//!
//! Terms are collected from OBO Graphs JSON or N-Triples ontologies, cached
//! on disk per ontology, and ranked against each phrase by a local
//! (TF-IDF, Jaro-Winkler, Levenshtein) or remote (Zooma, BioPortal) mapper.

pub mod cache;
pub mod config;
pub mod error;
pub mod mapper;
pub mod mapping;
pub mod metrics;
pub mod ontology;
pub mod output;

pub use cache::{
    CacheReport, CachedOntology, ClearOutcome, ClearScope, Registry, RegistryEntry, RejectedRow,
    TermCache,
};
pub use config::Config;
pub use error::{CacheError, ConfigError, MapperError, Result, SourceError, TermapError};
pub use mapper::{create_mapper, Mapper, MapperKind, MappingCandidate, MappingTarget, TermPool};
pub use mapping::{IndexSource, MappingEngine, MappingOptions, SourceTerm, TargetSpec};
pub use metrics::{get_metrics, Metrics, MetricsSnapshot};
pub use ontology::{
    OntologyLoader, OntologyReference, TermCollector, TermIndex, TermKind, TermRecord, TermType,
};
pub use output::{MappingMetadata, MappingRow, MappingTable, ResultAssembler};
