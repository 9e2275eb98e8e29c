//! Edit-distance style mappers (Jaro-Winkler, Levenshtein).

use async_trait::async_trait;
use std::sync::Arc;

use super::traits::{round_score, Mapper, MapperKind, MappingCandidate, MappingTarget};
use crate::error::MapperError;
use crate::mapping::{normalize, SourceTerm};

/// String similarity measure used by [`SyntacticMapper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Similarity {
    JaroWinkler,
    Levenshtein,
}

impl Similarity {
    fn score(self, a: &str, b: &str) -> f64 {
        match self {
            Similarity::JaroWinkler => strsim::jaro_winkler(a, b),
            Similarity::Levenshtein => strsim::normalized_levenshtein(a, b),
        }
    }
}

/// Scores each pool term by its best label or synonym similarity to the phrase.
#[derive(Debug, Clone, Copy)]
pub struct SyntacticMapper {
    similarity: Similarity,
}

impl SyntacticMapper {
    pub fn new(similarity: Similarity) -> Self {
        Self { similarity }
    }

    pub fn jaro_winkler() -> Self {
        Self::new(Similarity::JaroWinkler)
    }

    pub fn levenshtein() -> Self {
        Self::new(Similarity::Levenshtein)
    }
}

#[async_trait]
impl Mapper for SyntacticMapper {
    fn kind(&self) -> MapperKind {
        match self.similarity {
            Similarity::JaroWinkler => MapperKind::JaroWinkler,
            Similarity::Levenshtein => MapperKind::Levenshtein,
        }
    }

    async fn map_term(
        &self,
        source: &SourceTerm,
        target: &MappingTarget<'_>,
    ) -> Result<Vec<MappingCandidate>, MapperError> {
        let MappingTarget::Pool(pool) = target else {
            return Err(MapperError::UnsupportedTarget {
                mapper: self.kind().to_string(),
                target: target.to_string(),
            });
        };

        let phrase = normalize(source.phrase());
        if phrase.is_empty() {
            return Ok(Vec::new());
        }

        let kind = self.kind();
        let candidates = pool
            .entries()
            .iter()
            .filter_map(|entry| {
                let best = entry
                    .names
                    .iter()
                    .map(|name| self.similarity.score(&phrase, name))
                    .fold(0.0_f64, f64::max);
                let score = round_score(best);
                (score > 0.0).then(|| {
                    MappingCandidate::new(
                        source,
                        Arc::clone(&entry.term),
                        entry.ontology.as_str(),
                        score,
                        kind,
                    )
                })
            })
            .collect();

        Ok(candidates)
    }
}
