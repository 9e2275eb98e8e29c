//! TF-IDF mapper over character n-grams.
//!
//! Each label and synonym of each pool term is one document. Features are
//! word-bounded character 2- and 3-grams; weights are raw counts times a
//! smoothed IDF, L2 normalized. A term scores the best cosine similarity of
//! any of its documents.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::traits::{
    round_score, Mapper, MapperKind, MappingCandidate, MappingTarget, PoolEntry,
};
use crate::error::MapperError;
use crate::mapping::{normalize, SourceTerm};

const NGRAM_RANGE: std::ops::RangeInclusive<usize> = 2..=3;

/// Fitted vocabulary and inverted index for one term pool.
#[derive(Debug, Default)]
pub struct TfidfModel {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    /// Feature id to (document, weight) postings.
    postings: Vec<Vec<(usize, f64)>>,
    /// Document to pool entry position.
    doc_entry: Vec<usize>,
}

impl TfidfModel {
    /// Fit a model over every name of every entry.
    pub fn fit(entries: &[PoolEntry]) -> Self {
        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: Vec<usize> = Vec::new();
        let mut doc_counts: Vec<HashMap<usize, usize>> = Vec::new();
        let mut doc_entry = Vec::new();

        for (position, entry) in entries.iter().enumerate() {
            for name in &entry.names {
                let mut counts: HashMap<usize, usize> = HashMap::new();
                for gram in char_wb_ngrams(name) {
                    let next_id = vocabulary.len();
                    let id = *vocabulary.entry(gram).or_insert(next_id);
                    if id == doc_freq.len() {
                        doc_freq.push(0);
                    }
                    *counts.entry(id).or_insert(0) += 1;
                }
                for id in counts.keys() {
                    doc_freq[*id] += 1;
                }
                doc_counts.push(counts);
                doc_entry.push(position);
            }
        }

        let num_docs = doc_counts.len() as f64;
        let idf: Vec<f64> = doc_freq
            .iter()
            .map(|&df| ((1.0 + num_docs) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        let mut postings: Vec<Vec<(usize, f64)>> = vec![Vec::new(); vocabulary.len()];
        for (doc, counts) in doc_counts.into_iter().enumerate() {
            let weights = weigh(counts, &idf);
            for (id, weight) in weights {
                postings[id].push((doc, weight));
            }
        }

        tracing::debug!(
            "Fitted TF-IDF model: {} documents, {} features",
            doc_entry.len(),
            vocabulary.len()
        );

        Self {
            vocabulary,
            idf,
            postings,
            doc_entry,
        }
    }

    pub fn num_documents(&self) -> usize {
        self.doc_entry.len()
    }

    pub fn num_features(&self) -> usize {
        self.vocabulary.len()
    }

    /// Best cosine similarity per pool entry for an already normalized phrase.
    ///
    /// Entries without any shared feature are omitted.
    pub fn score(&self, phrase: &str) -> HashMap<usize, f64> {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for gram in char_wb_ngrams(phrase) {
            if let Some(&id) = self.vocabulary.get(&gram) {
                *counts.entry(id).or_insert(0) += 1;
            }
        }

        let mut doc_scores: HashMap<usize, f64> = HashMap::new();
        for (id, weight) in weigh(counts, &self.idf) {
            for &(doc, doc_weight) in &self.postings[id] {
                *doc_scores.entry(doc).or_insert(0.0) += weight * doc_weight;
            }
        }

        let mut entry_scores: HashMap<usize, f64> = HashMap::new();
        for (doc, score) in doc_scores {
            let best = entry_scores.entry(self.doc_entry[doc]).or_insert(0.0);
            if score > *best {
                *best = score;
            }
        }
        entry_scores
    }
}

/// TF-IDF weights, L2 normalized.
fn weigh(counts: HashMap<usize, usize>, idf: &[f64]) -> Vec<(usize, f64)> {
    let mut weights: Vec<(usize, f64)> = counts
        .into_iter()
        .map(|(id, count)| (id, count as f64 * idf[id]))
        .collect();
    let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for (_, weight) in &mut weights {
            *weight /= norm;
        }
    }
    weights
}

/// Character n-grams of each whitespace token, padded with one space on each side.
///
/// Tokens shorter than `n` contribute themselves once.
pub fn char_wb_ngrams(text: &str) -> Vec<String> {
    let mut grams = Vec::new();
    for token in text.split_whitespace() {
        let padded: Vec<char> = std::iter::once(' ')
            .chain(token.chars())
            .chain(std::iter::once(' '))
            .collect();
        for n in NGRAM_RANGE {
            if padded.len() < n {
                grams.push(padded.iter().collect());
                continue;
            }
            grams.extend(padded.windows(n).map(|w| w.iter().collect::<String>()));
        }
    }
    grams
}

/// Scores phrases by TF-IDF cosine similarity against a local term pool.
#[derive(Debug, Default, Clone)]
pub struct TfidfMapper;

impl TfidfMapper {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mapper for TfidfMapper {
    fn kind(&self) -> MapperKind {
        MapperKind::Tfidf
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
        if phrase.is_empty() || pool.is_empty() {
            return Ok(Vec::new());
        }

        let entries = pool.entries();
        let candidates = pool
            .tfidf()
            .score(&phrase)
            .into_iter()
            .map(|(position, score)| (position, round_score(score)))
            .filter(|(_, score)| *score > 0.0)
            .map(|(position, score)| {
                let entry = &entries[position];
                MappingCandidate::new(
                    source,
                    Arc::clone(&entry.term),
                    entry.ontology.as_str(),
                    score,
                    MapperKind::Tfidf,
                )
            })
            .collect();

        Ok(candidates)
    }
}
