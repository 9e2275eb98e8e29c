//! Core types for ontology term indexes.
//!
//! A [`TermIndex`] is the queryable snapshot of one ontology: a set of
//! [`TermRecord`]s keyed by IRI, built once by the collector or restored from
//! the term cache, and shared read-only between mapping calls.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// ============================================================================
// Term kinds and filters
// ============================================================================

/// The kind of a single ontology term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermKind {
    Class,
    Property,
}

/// Term-type filter applied when collecting or mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermType {
    /// Only classes.
    #[default]
    Class,
    /// Only properties.
    Property,
    /// Classes and properties.
    Any,
}

impl TermType {
    /// Whether a term of the given kind passes this filter.
    pub fn accepts(self, kind: TermKind) -> bool {
        match self {
            TermType::Any => true,
            TermType::Class => kind == TermKind::Class,
            TermType::Property => kind == TermKind::Property,
        }
    }

    /// Whether every term accepted by `narrower` is accepted by `self`.
    pub fn covers(self, narrower: TermType) -> bool {
        self == TermType::Any || self == narrower
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TermType::Class => "class",
            TermType::Property => "property",
            TermType::Any => "any",
        }
    }
}

impl fmt::Display for TermType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TermType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "class" | "classes" => Ok(TermType::Class),
            "property" | "properties" => Ok(TermType::Property),
            "any" | "all" => Ok(TermType::Any),
            other => Err(format!("unknown term type: {other}")),
        }
    }
}

/// Returns true when `iri` starts with one of `prefixes` (or `prefixes` is empty).
pub fn matches_base_iris(iri: &str, prefixes: &[String]) -> bool {
    prefixes.is_empty() || prefixes.iter().any(|prefix| iri.starts_with(prefix.as_str()))
}

// ============================================================================
// Raw entities
// ============================================================================

/// Kind of a raw entity as reported by an ontology loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Class,
    Property,
    /// Individuals and anything else that is never indexed.
    Other,
}

impl EntityKind {
    pub fn term_kind(self) -> Option<TermKind> {
        match self {
            EntityKind::Class => Some(TermKind::Class),
            EntityKind::Property => Some(TermKind::Property),
            EntityKind::Other => None,
        }
    }
}

/// An entity as produced by an ontology loader, before filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEntity {
    pub iri: String,
    #[serde(default)]
    pub curie: Option<String>,
    pub kind: EntityKind,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
}

impl RawEntity {
    pub fn new(iri: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            iri: iri.into(),
            curie: None,
            kind,
            labels: Vec::new(),
            synonyms: Vec::new(),
            definition: None,
            parents: Vec::new(),
            deprecated: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    pub fn with_synonym(mut self, synonym: impl Into<String>) -> Self {
        self.synonyms.push(synonym.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parents.push(parent.into());
        self
    }

    pub fn deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }
}

// ============================================================================
// Term records
// ============================================================================

/// One ontology class or property.
///
/// The IRI is fixed at construction and never empty. Labels and synonyms may
/// be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermRecord {
    iri: String,
    curie: String,
    label: String,
    #[serde(default)]
    synonyms: BTreeSet<String>,
    #[serde(default)]
    definition: Option<String>,
    #[serde(default)]
    parents: BTreeSet<String>,
    #[serde(default)]
    deprecated: bool,
    kind: TermKind,
}

impl TermRecord {
    /// Create a record. Returns `None` when `iri` is blank.
    pub fn new(iri: impl Into<String>, kind: TermKind) -> Option<Self> {
        let iri = iri.into();
        if iri.trim().is_empty() {
            return None;
        }
        Some(Self {
            curie: iri.clone(),
            iri,
            label: String::new(),
            synonyms: BTreeSet::new(),
            definition: None,
            parents: BTreeSet::new(),
            deprecated: false,
            kind,
        })
    }

    pub fn with_curie(mut self, curie: impl Into<String>) -> Self {
        self.curie = curie.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_synonym(mut self, synonym: impl Into<String>) -> Self {
        let synonym = synonym.into();
        if !synonym.trim().is_empty() {
            self.synonyms.insert(synonym);
        }
        self
    }

    pub fn with_synonyms(mut self, synonyms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for synonym in synonyms {
            self = self.with_synonym(synonym);
        }
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parents.insert(parent.into());
        self
    }

    pub fn with_deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }

    pub fn iri(&self) -> &str {
        &self.iri
    }

    pub fn curie(&self) -> &str {
        &self.curie
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn synonyms(&self) -> &BTreeSet<String> {
        &self.synonyms
    }

    pub fn definition(&self) -> Option<&str> {
        self.definition.as_deref()
    }

    /// Parent term IRIs. These are references only and may point outside the index.
    pub fn parents(&self) -> &BTreeSet<String> {
        &self.parents
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecated
    }

    pub fn kind(&self) -> TermKind {
        self.kind
    }

    /// The label followed by all synonyms, skipping blanks.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.label.as_str())
            .chain(self.synonyms.iter().map(String::as_str))
            .filter(|name| !name.trim().is_empty())
    }

    /// Merge another record with the same IRI into this one.
    pub(crate) fn absorb(&mut self, other: TermRecord) {
        debug_assert_eq!(self.iri, other.iri);
        if self.label.is_empty() {
            self.label = other.label;
        } else if !other.label.is_empty() && other.label != self.label {
            self.synonyms.insert(other.label);
        }
        if self.curie == self.iri && other.curie != other.iri {
            self.curie = other.curie;
        }
        self.synonyms.extend(other.synonyms);
        self.synonyms.remove(&self.label);
        if self.definition.is_none() {
            self.definition = other.definition;
        }
        self.parents.extend(other.parents);
        self.deprecated |= other.deprecated;
    }
}

// ============================================================================
// Term index
// ============================================================================

/// Immutable collection of term records for one ontology snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct TermIndex {
    ontology: String,
    term_type: TermType,
    base_iris: Vec<String>,
    terms: HashMap<String, Arc<TermRecord>>,
}

impl TermIndex {
    /// Build an index, keeping only records that pass `term_type` and `base_iris`.
    ///
    /// Records sharing an IRI are merged.
    pub fn from_records(
        ontology: impl Into<String>,
        term_type: TermType,
        base_iris: Vec<String>,
        records: impl IntoIterator<Item = TermRecord>,
    ) -> Self {
        let mut merged: HashMap<String, TermRecord> = HashMap::new();
        for record in records {
            if !term_type.accepts(record.kind) || !matches_base_iris(&record.iri, &base_iris) {
                continue;
            }
            match merged.get_mut(&record.iri) {
                Some(existing) => existing.absorb(record),
                None => {
                    merged.insert(record.iri.clone(), record);
                }
            }
        }

        Self {
            ontology: ontology.into(),
            term_type,
            base_iris,
            terms: merged
                .into_iter()
                .map(|(iri, record)| (iri, Arc::new(record)))
                .collect(),
        }
    }

    /// Acronym or source string this index was built from.
    pub fn ontology(&self) -> &str {
        &self.ontology
    }

    /// Term-type filter applied at construction.
    pub fn term_type(&self) -> TermType {
        self.term_type
    }

    /// Base IRI filter applied at construction.
    pub fn base_iris(&self) -> &[String] {
        &self.base_iris
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn get(&self, iri: &str) -> Option<&Arc<TermRecord>> {
        self.terms.get(iri)
    }

    pub fn contains(&self, iri: &str) -> bool {
        self.terms.contains_key(iri)
    }

    /// All records, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TermRecord>> {
        self.terms.values()
    }

    /// Records passing both a term-type filter and a base IRI filter.
    pub fn filtered<'a>(
        &'a self,
        term_type: TermType,
        base_iris: &'a [String],
    ) -> impl Iterator<Item = &'a Arc<TermRecord>> + 'a {
        self.terms.values().filter(move |record| {
            term_type.accepts(record.kind) && matches_base_iris(&record.iri, base_iris)
        })
    }

    /// Records sorted by IRI.
    pub fn sorted(&self) -> Vec<&TermRecord> {
        let mut records: Vec<&TermRecord> = self.terms.values().map(Arc::as_ref).collect();
        records.sort_by(|a, b| a.iri.cmp(&b.iri));
        records
    }

    /// Count of records per kind.
    pub fn stats(&self) -> IndexStats {
        let classes = self
            .terms
            .values()
            .filter(|t| t.kind == TermKind::Class)
            .count();
        let deprecated = self.terms.values().filter(|t| t.deprecated).count();
        IndexStats {
            terms: self.terms.len(),
            classes,
            properties: self.terms.len() - classes,
            deprecated,
        }
    }
}

/// Summary counts for a [`TermIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub terms: usize,
    pub classes: usize,
    pub properties: usize,
    pub deprecated: usize,
}
