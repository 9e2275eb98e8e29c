//! BioPortal annotator mapper.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::remote::{get_json, origin_ontology, remote_term};
use super::traits::{Mapper, MapperKind, MappingCandidate, MappingTarget};
use crate::config::{Config, TransportConfig};
use crate::error::{MapperError, Result};
use crate::mapping::SourceTerm;

const SERVICE: &str = "bioportal";
const PREFERRED_SCORE: f64 = 1.0;
const OTHER_SCORE: f64 = 0.8;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotatorResult {
    annotated_class: AnnotatedClass,
    #[serde(default)]
    annotations: Vec<Annotation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotatedClass {
    #[serde(rename = "@id")]
    id: String,
    #[serde(default)]
    pref_label: Option<String>,
    #[serde(default)]
    links: Option<Links>,
}

#[derive(Debug, Deserialize)]
struct Links {
    #[serde(default)]
    ontology: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Annotation {
    #[serde(default)]
    match_type: Option<String>,
}

impl AnnotatorResult {
    fn score(&self) -> f64 {
        let preferred = self
            .annotations
            .iter()
            .any(|a| a.match_type.as_deref() == Some("PREF"));
        if preferred {
            PREFERRED_SCORE
        } else {
            OTHER_SCORE
        }
    }

    /// Acronym from the last path segment of `links.ontology`.
    fn ontology_acronym(&self) -> Option<String> {
        let url = self.annotated_class.links.as_ref()?.ontology.as_deref()?;
        url.trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
    }
}

/// Queries the BioPortal annotator for each phrase.
///
/// Without an API key every phrase maps to nothing.
pub struct BioPortalMapper {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl BioPortalMapper {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        transport: &TransportConfig,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.is_none() {
            tracing::warn!("No BioPortal API key configured; BioPortal mappings will be empty");
        }
        Ok(Self {
            client: transport.build_client(Some(timeout))?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.remote.bioportal_url,
            config.remote.resolved_bioportal_key(),
            &config.transport,
            config.remote.timeout(),
        )
    }
}

#[async_trait]
impl Mapper for BioPortalMapper {
    fn kind(&self) -> MapperKind {
        MapperKind::BioPortal
    }

    async fn map_term(
        &self,
        source: &SourceTerm,
        target: &MappingTarget<'_>,
    ) -> std::result::Result<Vec<MappingCandidate>, MapperError> {
        let MappingTarget::Remote {
            ontologies,
            term_type,
        } = *target
        else {
            return Err(MapperError::UnsupportedTarget {
                mapper: SERVICE.to_string(),
                target: target.to_string(),
            });
        };

        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!(
                "Skipping BioPortal lookup for '{}': no API key",
                source.phrase()
            );
            return Ok(Vec::new());
        };

        let url = format!("{}/annotator", self.base_url);
        let request = self
            .client
            .get(&url)
            .header("Authorization", format!("apikey token={}", api_key))
            .query(&[
                ("text", source.phrase().to_string()),
                ("ontologies", ontologies.join(",")),
                ("longest_only", "true".to_string()),
                ("include", "prefLabel".to_string()),
            ]);

        let results: Vec<AnnotatorResult> = get_json(SERVICE, request, self.timeout).await?;

        let mut candidates = Vec::with_capacity(results.len());
        for result in &results {
            let class = &result.annotated_class;
            let label = class.pref_label.as_deref().unwrap_or_default();
            let Some(term) = remote_term(&class.id, label, term_type) else {
                continue;
            };
            let ontology = result
                .ontology_acronym()
                .unwrap_or_else(|| origin_ontology(&term, ontologies, SERVICE));
            candidates.push(MappingCandidate::new(
                source,
                term,
                ontology,
                result.score(),
                MapperKind::BioPortal,
            ));
        }

        Ok(candidates)
    }
}
