//! Zooma annotation service mapper.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::remote::{get_json, origin_ontology, remote_term};
use super::traits::{Mapper, MapperKind, MappingCandidate, MappingTarget};
use crate::config::{Config, TransportConfig};
use crate::error::{MapperError, Result};
use crate::mapping::SourceTerm;

const SERVICE: &str = "zooma";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Annotation {
    #[serde(default)]
    semantic_tags: Vec<String>,
    #[serde(default)]
    confidence: Option<String>,
    #[serde(default)]
    annotated_property: Option<AnnotatedProperty>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotatedProperty {
    #[serde(default)]
    property_value: Option<String>,
}

/// Map a Zooma confidence level to a score.
fn confidence_score(confidence: Option<&str>) -> f64 {
    match confidence.map(str::to_ascii_uppercase).as_deref() {
        Some("HIGH") => 1.0,
        Some("GOOD") => 0.75,
        Some("MEDIUM") => 0.5,
        _ => 0.25,
    }
}

/// Queries Zooma's annotate endpoint for each phrase.
pub struct ZoomaMapper {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ZoomaMapper {
    pub fn new(base_url: &str, transport: &TransportConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: transport.build_client(Some(timeout))?,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.remote.zooma_url,
            &config.transport,
            config.remote.timeout(),
        )
    }
}

/// The `filter` query value restricting results to the given ontologies.
fn filter_param(ontologies: &[String]) -> String {
    if ontologies.is_empty() {
        "required:[none]".to_string()
    } else {
        let list: Vec<String> = ontologies.iter().map(|o| o.to_lowercase()).collect();
        format!("required:[none],ontologies:[{}]", list.join(","))
    }
}

#[async_trait]
impl Mapper for ZoomaMapper {
    fn kind(&self) -> MapperKind {
        MapperKind::Zooma
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

        let url = format!("{}/services/annotate", self.base_url);
        let request = self.client.get(&url).query(&[
            ("propertyValue", source.phrase().to_string()),
            ("filter", filter_param(ontologies)),
        ]);

        let annotations: Vec<Annotation> = get_json(SERVICE, request, self.timeout).await?;
        tracing::debug!(
            "Zooma returned {} annotations for '{}'",
            annotations.len(),
            source.phrase()
        );

        let mut candidates = Vec::new();
        for annotation in annotations {
            let score = confidence_score(annotation.confidence.as_deref());
            let label = annotation
                .annotated_property
                .and_then(|p| p.property_value)
                .unwrap_or_default();
            for iri in &annotation.semantic_tags {
                let Some(term) = remote_term(iri, &label, term_type) else {
                    continue;
                };
                let ontology = origin_ontology(&term, ontologies, SERVICE);
                candidates.push(MappingCandidate::new(
                    source,
                    term,
                    ontology,
                    score,
                    MapperKind::Zooma,
                ));
            }
        }

        Ok(candidates)
    }
}
