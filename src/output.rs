//! Mapping result tables and their CSV / JSON renderings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::mapper::{MapperKind, MappingCandidate};
use crate::mapping::{MappingOptions, SourceTerm, TargetSpec};

/// Tag attached to placeholder rows for phrases without a mapping.
pub const UNMAPPED_TAG: &str = "unmapped";

/// Column headers, in output order.
pub const COLUMNS: [&str; 8] = [
    "Source Term",
    "Source Term ID",
    "Mapped Term Label",
    "Mapped Term CURIE",
    "Mapped Term IRI",
    "Mapping Score",
    "Tags",
    "Ontology",
];

/// One row of a mapping table.
///
/// Term fields are `None` on an unmapped placeholder row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRow {
    #[serde(rename = "Source Term")]
    pub source_term: String,
    #[serde(rename = "Source Term ID")]
    pub source_term_id: String,
    #[serde(rename = "Mapped Term Label")]
    pub mapped_term_label: Option<String>,
    #[serde(rename = "Mapped Term CURIE")]
    pub mapped_term_curie: Option<String>,
    #[serde(rename = "Mapped Term IRI")]
    pub mapped_term_iri: Option<String>,
    #[serde(rename = "Mapping Score")]
    pub mapping_score: Option<f64>,
    #[serde(rename = "Tags")]
    pub tags: Vec<String>,
    #[serde(rename = "Ontology")]
    pub ontology: Option<String>,
}

impl MappingRow {
    fn mapped(source: &SourceTerm, candidate: &MappingCandidate) -> Self {
        Self {
            source_term: source.phrase().to_string(),
            source_term_id: source.id().to_string(),
            mapped_term_label: Some(candidate.term.label().to_string()),
            mapped_term_curie: Some(candidate.term.curie().to_string()),
            mapped_term_iri: Some(candidate.term.iri().to_string()),
            mapping_score: Some(candidate.score),
            tags: source.tags().to_vec(),
            ontology: Some(candidate.ontology.clone()),
        }
    }

    fn unmapped(source: &SourceTerm) -> Self {
        let mut tags = source.tags().to_vec();
        if !tags.iter().any(|t| t == UNMAPPED_TAG) {
            tags.push(UNMAPPED_TAG.to_string());
        }
        Self {
            source_term: source.phrase().to_string(),
            source_term_id: source.id().to_string(),
            mapped_term_label: None,
            mapped_term_curie: None,
            mapped_term_iri: None,
            mapping_score: None,
            tags,
            ontology: None,
        }
    }

    pub fn is_unmapped(&self) -> bool {
        self.mapped_term_iri.is_none()
    }

    fn fields(&self) -> [String; 8] {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        [
            self.source_term.clone(),
            self.source_term_id.clone(),
            opt(&self.mapped_term_label),
            opt(&self.mapped_term_curie),
            opt(&self.mapped_term_iri),
            self.mapping_score
                .map(|s| format!("{:?}", s))
                .unwrap_or_default(),
            self.tags.join(";"),
            opt(&self.ontology),
        ]
    }
}

/// Provenance written as a comment header above CSV output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingMetadata {
    pub version: String,
    pub mapper: MapperKind,
    pub target: String,
    pub min_score: f64,
    pub max_mappings: usize,
    pub term_type: String,
    pub excl_deprecated: bool,
    pub base_iris: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl MappingMetadata {
    pub fn new(mapper: MapperKind, target: &TargetSpec, options: &MappingOptions) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            mapper,
            target: target.to_string(),
            min_score: options.min_score,
            max_mappings: options.max_mappings,
            term_type: options.term_type.to_string(),
            excl_deprecated: options.excl_deprecated,
            base_iris: options.base_iris.clone(),
            timestamp: Utc::now(),
        }
    }

    fn lines(&self) -> Vec<(&'static str, String)> {
        vec![
            ("termap_version", self.version.clone()),
            ("mapper", self.mapper.to_string()),
            ("target", self.target.clone()),
            ("min_score", self.min_score.to_string()),
            ("max_mappings", self.max_mappings.to_string()),
            ("term_type", self.term_type.clone()),
            ("excl_deprecated", self.excl_deprecated.to_string()),
            ("base_iris", self.base_iris.join(",")),
            ("timestamp", self.timestamp.to_rfc3339()),
        ]
    }
}

/// Fixed-schema mapping results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingTable {
    rows: Vec<MappingRow>,
}

impl MappingTable {
    pub fn rows(&self) -> &[MappingRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<MappingRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows for one source phrase identifier.
    pub fn rows_for(&self, source_term_id: &str) -> impl Iterator<Item = &MappingRow> {
        let id = source_term_id.to_string();
        self.rows.iter().filter(move |r| r.source_term_id == id)
    }

    /// Render as CSV, optionally preceded by `# key: value` metadata lines.
    pub fn to_csv(&self, metadata: Option<&MappingMetadata>) -> String {
        let mut out = String::new();
        if let Some(meta) = metadata {
            for (key, value) in meta.lines() {
                out.push_str(&format!("# {}: {}\n", key, value));
            }
        }
        push_record(&mut out, COLUMNS.iter().copied());
        for row in &self.rows {
            let fields = row.fields();
            push_record(&mut out, fields.iter().map(String::as_str));
        }
        out
    }

    /// Write CSV to `path` through a temporary sibling file.
    pub async fn write_csv(
        &self,
        path: impl AsRef<Path>,
        metadata: Option<&MappingMetadata>,
    ) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");

        tokio::fs::write(&tmp, self.to_csv(metadata)).await?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        tracing::info!("Wrote {} mapping rows to {}", self.rows.len(), path.display());
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn push_record<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        if field.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push('\n');
}

/// Turns ranked candidates into a [`MappingTable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAssembler;

impl ResultAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Build rows in phrase order. `candidates_by_phrase[i]` holds the ranked
    /// candidates for `source_terms[i]`.
    pub fn assemble(
        &self,
        candidates_by_phrase: Vec<Vec<MappingCandidate>>,
        source_terms: &[SourceTerm],
        include_unmapped: bool,
    ) -> MappingTable {
        let mut rows = Vec::new();
        for (source, candidates) in source_terms.iter().zip(candidates_by_phrase) {
            if candidates.is_empty() {
                if include_unmapped {
                    rows.push(MappingRow::unmapped(source));
                }
                continue;
            }
            rows.extend(candidates.iter().map(|c| MappingRow::mapped(source, c)));
        }
        MappingTable { rows }
    }
}
