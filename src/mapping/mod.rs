//! Phrase mapping: preprocessing, ontology resolution, scoring and ranking.

mod engine;
mod preprocess;

pub use engine::{IndexSource, MappingEngine, MappingOptions};
pub use preprocess::{normalize, parse_source_terms, prepare_terms, SourceTerm, TargetSpec};
