//! Shared plumbing for mappers backed by web services.

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::error::MapperError;
use crate::ontology::{curie_from_iri, TermKind, TermRecord, TermType};

/// Send a GET request and decode the JSON body, bounded by `deadline`.
///
/// Connection errors, non-success statuses, malformed bodies and expired
/// deadlines all surface as [`MapperError::RemoteServiceUnavailable`].
pub(crate) async fn get_json<T: DeserializeOwned>(
    service: &str,
    request: RequestBuilder,
    deadline: Duration,
) -> Result<T, MapperError> {
    let call = async {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                MapperError::unavailable(service, "request timed out")
            } else if e.is_connect() {
                MapperError::unavailable(service, format!("connection failed: {}", e))
            } else {
                MapperError::unavailable(service, format!("request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MapperError::unavailable(
                service,
                format!("HTTP status {}", status),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| MapperError::unavailable(service, format!("malformed response: {}", e)))
    };

    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(MapperError::unavailable(
            service,
            format!("no response within {:?}", deadline),
        )),
    }
}

/// Build a term record for an IRI reported by a remote service.
pub(crate) fn remote_term(iri: &str, label: &str, term_type: TermType) -> Option<Arc<TermRecord>> {
    let kind = match term_type {
        TermType::Property => TermKind::Property,
        TermType::Class | TermType::Any => TermKind::Class,
    };
    let record = TermRecord::new(iri, kind)?
        .with_curie(curie_from_iri(iri, None))
        .with_label(label);
    Some(Arc::new(record))
}

/// Pick the ontology a remote hit belongs to.
///
/// Prefers a requested acronym matching the CURIE prefix, then the prefix
/// itself, then the single requested acronym.
pub(crate) fn origin_ontology(term: &TermRecord, requested: &[String], service: &str) -> String {
    let prefix = term
        .curie()
        .split_once(':')
        .map(|(prefix, _)| prefix)
        .filter(|_| term.curie() != term.iri());

    if let Some(prefix) = prefix {
        return requested
            .iter()
            .find(|acronym| acronym.eq_ignore_ascii_case(prefix))
            .cloned()
            .unwrap_or_else(|| prefix.to_uppercase());
    }

    match requested {
        [single] => single.clone(),
        _ => service.to_string(),
    }
}
