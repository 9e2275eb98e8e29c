//! Source phrases, target lists and text normalization.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ontology::OntologyReference;

/// A phrase to be mapped, with its identifier and tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTerm {
    phrase: String,
    id: String,
    #[serde(default)]
    tags: Vec<String>,
}

impl SourceTerm {
    /// A phrase with a freshly generated identifier and no tags.
    pub fn new(phrase: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            id: uuid::Uuid::new_v4().to_string(),
            tags: Vec::new(),
        }
    }

    /// Use a caller-supplied identifier instead of a generated one.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Attach tags. Blank and repeated tags are dropped; order is kept.
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for tag in tags {
            let tag = tag.into().trim().to_string();
            if !tag.is_empty() && !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
        self
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl From<&str> for SourceTerm {
    fn from(phrase: &str) -> Self {
        Self::new(phrase)
    }
}

impl From<String> for SourceTerm {
    fn from(phrase: String) -> Self {
        Self::new(phrase)
    }
}

/// Lowercase, collapse whitespace and strip surrounding punctuation.
pub fn normalize(text: &str) -> String {
    let collapsed = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed
        .trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .to_string()
}

/// Trim phrases and drop the empty ones.
pub fn prepare_terms(terms: Vec<SourceTerm>) -> Vec<SourceTerm> {
    terms
        .into_iter()
        .filter_map(|mut term| {
            let trimmed = term.phrase.trim();
            if trimmed.is_empty() {
                tracing::warn!("Skipping empty source phrase (id {})", term.id);
                return None;
            }
            if trimmed.len() != term.phrase.len() {
                term.phrase = trimmed.to_string();
            }
            Some(term)
        })
        .collect()
}

/// Parse a source terms file.
///
/// One phrase per line. An optional second tab-separated column holds
/// comma-separated tags and an optional third column a phrase identifier.
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_source_terms(text: &str) -> Vec<SourceTerm> {
    text.lines()
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(|line| {
            let mut columns = line.split('\t');
            let phrase = columns.next().unwrap_or_default().trim();
            let tags = columns
                .next()
                .map(|tags| tags.split(',').map(str::to_string).collect::<Vec<_>>())
                .unwrap_or_default();
            let term = SourceTerm::new(phrase).with_tags(tags);
            match columns.next().map(str::trim).filter(|id| !id.is_empty()) {
                Some(id) => term.with_id(id),
                None => term,
            }
        })
        .collect()
}

/// One or more target ontologies, as identifiers, file paths or URLs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TargetSpec {
    targets: Vec<String>,
}

impl TargetSpec {
    pub fn new(targets: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            targets: targets
                .into_iter()
                .map(Into::into)
                .map(|t: String| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated target list.
    pub fn parse(input: &str) -> Self {
        Self::new(input.split(','))
    }

    pub fn identifiers(&self) -> &[String] {
        &self.targets
    }

    pub fn references(&self) -> Vec<OntologyReference> {
        self.targets
            .iter()
            .map(|t| OntologyReference::parse(t))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }
}

impl FromStr for TargetSpec {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.targets.join(","))
    }
}
