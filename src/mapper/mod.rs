//! Mapping strategies.
//!
//! Every strategy implements [`Mapper`]: given one source phrase and a target
//! it returns scored candidates, unfiltered and uncapped.
//!
//! # Strategies
//!
//! - [`TfidfMapper`]: character n-gram TF-IDF over a local [`TermPool`].
//! - [`SyntacticMapper`]: Jaro-Winkler or normalized Levenshtein over a local pool.
//! - [`ZoomaMapper`]: EBI Zooma annotation service.
//! - [`BioPortalMapper`]: NCBO BioPortal annotator (needs an API key).

mod bioportal;
mod remote;
mod syntactic;
mod tfidf;
mod traits;
mod zooma;

pub use bioportal::BioPortalMapper;
pub use syntactic::{Similarity, SyntacticMapper};
pub use tfidf::{char_wb_ngrams, TfidfMapper, TfidfModel};
pub use traits::{Mapper, MapperKind, MappingCandidate, MappingTarget, PoolEntry, TermPool};
pub use zooma::ZoomaMapper;

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;

/// Create a mapper of the given kind from configuration.
pub fn create_mapper(kind: MapperKind, config: &Config) -> Result<Arc<dyn Mapper>> {
    match kind {
        MapperKind::Tfidf => Ok(Arc::new(TfidfMapper::new())),
        MapperKind::JaroWinkler => Ok(Arc::new(SyntacticMapper::jaro_winkler())),
        MapperKind::Levenshtein => Ok(Arc::new(SyntacticMapper::levenshtein())),
        MapperKind::Zooma => Ok(Arc::new(ZoomaMapper::from_config(config)?)),
        MapperKind::BioPortal => Ok(Arc::new(BioPortalMapper::from_config(config)?)),
    }
}
