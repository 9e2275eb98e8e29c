//! Ontology sources: reference parsing, location resolution and loading.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::RawEntity;
use super::{obograph, rdf};
use crate::config::{Config, TransportConfig};
use crate::error::{Result, SourceError};

/// Where an ontology comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OntologyReference {
    /// An `http` or `https` URL.
    Url(String),
    /// A local file.
    File(PathBuf),
    /// A short name resolved through the registry.
    Acronym(String),
}

impl OntologyReference {
    /// Classify a user-supplied ontology identifier.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let lower = input.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return OntologyReference::Url(input.to_string());
        }
        if let Some(path) = input.strip_prefix("file://") {
            return OntologyReference::File(PathBuf::from(path));
        }
        if Path::new(input).exists() || OntologyFormat::from_path(input).is_some() {
            return OntologyReference::File(PathBuf::from(input));
        }
        OntologyReference::Acronym(input.to_string())
    }

    /// The acronym, when this reference is one.
    pub fn acronym(&self) -> Option<&str> {
        match self {
            OntologyReference::Acronym(acronym) => Some(acronym),
            _ => None,
        }
    }
}

impl fmt::Display for OntologyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OntologyReference::Url(url) => f.write_str(url),
            OntologyReference::File(path) => write!(f, "{}", path.display()),
            OntologyReference::Acronym(acronym) => f.write_str(acronym),
        }
    }
}

impl From<&str> for OntologyReference {
    fn from(input: &str) -> Self {
        Self::parse(input)
    }
}

/// Serialization formats the default loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OntologyFormat {
    OboGraphJson,
    NTriples,
    Turtle,
    /// RDF/XML, the usual `.owl` serialization.
    RdfXml,
}

impl OntologyFormat {
    /// Guess the format from a file name or URL path.
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let lower = path.to_ascii_lowercase();
        let extension = lower.rsplit_once('.').map(|(_, ext)| ext)?;
        match extension {
            "json" => Some(OntologyFormat::OboGraphJson),
            "nt" | "ntriples" => Some(OntologyFormat::NTriples),
            "ttl" => Some(OntologyFormat::Turtle),
            "owl" | "rdf" | "xml" => Some(OntologyFormat::RdfXml),
            _ => None,
        }
    }

    /// Guess the format from the document content.
    pub fn sniff(bytes: &[u8]) -> Self {
        let start = bytes
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(bytes.len());
        let head = &bytes[start..];
        let starts = |prefixes: &[&str]| prefixes.iter().any(|p| head.starts_with(p.as_bytes()));
        if starts(&["{"]) {
            OntologyFormat::OboGraphJson
        } else if starts(&["<?xml", "<rdf:RDF", "<!"]) {
            OntologyFormat::RdfXml
        } else if starts(&["@prefix", "@base", "PREFIX"]) {
            OntologyFormat::Turtle
        } else {
            OntologyFormat::NTriples
        }
    }

    fn parse(self, bytes: &[u8], source_ref: &str) -> std::result::Result<Vec<RawEntity>, SourceError> {
        let text = || std::str::from_utf8(bytes).map_err(|e| SourceError::parse(source_ref, e));
        let parsed = match self {
            OntologyFormat::OboGraphJson => {
                return obograph::parse(bytes).map_err(|e| SourceError::parse(source_ref, e));
            }
            OntologyFormat::NTriples => rdf::parse_ntriples(text()?),
            OntologyFormat::Turtle => rdf::parse_turtle(text()?),
            OntologyFormat::RdfXml => rdf::parse_rdfxml(text()?),
        };
        parsed.map_err(|e| SourceError::parse(source_ref, e))
    }
}

/// Fetches and parses an ontology into raw entities.
#[async_trait]
pub trait OntologyLoader: Send + Sync {
    /// Load every entity of the referenced ontology.
    async fn load(
        &self,
        reference: &OntologyReference,
    ) -> std::result::Result<Vec<RawEntity>, SourceError>;
}

/// Default loader: HTTP(S) downloads and local files in any [`OntologyFormat`].
pub struct HttpOntologyLoader {
    client: Client,
    registry: BTreeMap<String, String>,
    fetch_timeout: Duration,
}

impl HttpOntologyLoader {
    /// Create a loader with the given transport options and acronym registry.
    pub fn new(transport: &TransportConfig, registry: BTreeMap<String, String>) -> Result<Self> {
        let fetch_timeout = transport.fetch_timeout();
        Ok(Self {
            client: transport.build_client(Some(fetch_timeout))?,
            registry,
            fetch_timeout,
        })
    }

    /// Create a loader from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.transport, config.registry.clone())
    }

    /// Resolve a reference to a concrete URL or file.
    ///
    /// Acronyms are looked up in the registry (exact, then case-insensitive),
    /// falling back to the OBO Library PURL.
    pub fn resolve(
        &self,
        reference: &OntologyReference,
    ) -> std::result::Result<OntologyReference, SourceError> {
        let OntologyReference::Acronym(acronym) = reference else {
            return Ok(reference.clone());
        };

        let entry = self.registry.get(acronym).or_else(|| {
            self.registry
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(acronym))
                .map(|(_, value)| value)
        });

        match entry {
            Some(location) => match OntologyReference::parse(location) {
                OntologyReference::Acronym(_) => Err(SourceError::unreachable(
                    acronym.as_str(),
                    format!("registry entry '{location}' is not a URL or file"),
                )),
                resolved => Ok(resolved),
            },
            None => Ok(OntologyReference::Url(format!(
                "http://purl.obolibrary.org/obo/{}.json",
                acronym.to_lowercase()
            ))),
        }
    }

    async fn fetch(&self, location: &OntologyReference) -> std::result::Result<Vec<u8>, SourceError> {
        let source_ref = location.to_string();
        match location {
            OntologyReference::File(path) => tokio::fs::read(path)
                .await
                .map_err(|e| SourceError::unreachable(source_ref, e)),
            // The deadline covers connecting, headers and the whole body.
            OntologyReference::Url(url) => {
                tokio::time::timeout(self.fetch_timeout, self.download(url, &source_ref))
                    .await
                    .map_err(|_| {
                        tracing::warn!(
                            "Download of {} exceeded {:?}",
                            source_ref,
                            self.fetch_timeout
                        );
                        SourceError::unreachable(source_ref.as_str(), "request timed out")
                    })?
            }
            OntologyReference::Acronym(acronym) => Err(SourceError::unreachable(
                acronym.as_str(),
                "unresolved acronym",
            )),
        }
    }
}

impl HttpOntologyLoader {
    async fn download(
        &self,
        url: &str,
        source_ref: &str,
    ) -> std::result::Result<Vec<u8>, SourceError> {
        let timed_out = |e: reqwest::Error| {
            if e.is_timeout() {
                SourceError::unreachable(source_ref, "request timed out")
            } else {
                SourceError::unreachable(source_ref, e)
            }
        };

        let response = self.client.get(url).send().await.map_err(timed_out)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::unreachable(
                source_ref,
                format!("HTTP status {status}"),
            ));
        }

        let bytes = response.bytes().await.map_err(timed_out)?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl OntologyLoader for HttpOntologyLoader {
    async fn load(
        &self,
        reference: &OntologyReference,
    ) -> std::result::Result<Vec<RawEntity>, SourceError> {
        let location = self.resolve(reference)?;
        tracing::debug!("Fetching ontology {} from {}", reference, location);

        let bytes = self.fetch(&location).await?;
        let location_str = location.to_string();
        let format = OntologyFormat::from_path(&location_str)
            .unwrap_or_else(|| OntologyFormat::sniff(&bytes));

        format.parse(&bytes, &location_str)
    }
}

/// Loader serving pre-built entity lists, keyed by reference string.
///
/// Useful for tests and for embedding small vocabularies.
#[derive(Default)]
pub struct StaticOntologyLoader {
    sources: HashMap<String, Vec<RawEntity>>,
    loads: Mutex<HashMap<String, usize>>,
}

impl StaticOntologyLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register entities for `source`.
    pub fn with_source(mut self, source: impl Into<String>, entities: Vec<RawEntity>) -> Self {
        self.sources.insert(source.into(), entities);
        self
    }

    /// How many times `source` has been loaded.
    pub fn load_count(&self, source: &str) -> usize {
        self.loads.lock().get(source).copied().unwrap_or(0)
    }
}

#[async_trait]
impl OntologyLoader for StaticOntologyLoader {
    async fn load(
        &self,
        reference: &OntologyReference,
    ) -> std::result::Result<Vec<RawEntity>, SourceError> {
        let key = reference.to_string();
        let entities = self
            .sources
            .get(&key)
            .cloned()
            .ok_or_else(|| SourceError::unreachable(key.as_str(), "unknown ontology source"))?;
        *self.loads.lock().entry(key).or_default() += 1;
        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::EntityKind;

    #[test]
    fn test_parse_reference() {
        assert_eq!(
            OntologyReference::parse("https://example.org/efo.owl"),
            OntologyReference::Url("https://example.org/efo.owl".to_string())
        );
        assert_eq!(
            OntologyReference::parse("data/mondo.json"),
            OntologyReference::File(PathBuf::from("data/mondo.json"))
        );
        assert_eq!(
            OntologyReference::parse(" EFO "),
            OntologyReference::Acronym("EFO".to_string())
        );
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            OntologyFormat::from_path("http://x/onto.JSON?v=1"),
            Some(OntologyFormat::OboGraphJson)
        );
        assert_eq!(OntologyFormat::from_path("a.nt"), Some(OntologyFormat::NTriples));
        assert_eq!(OntologyFormat::from_path("data/efo.OWL"), Some(OntologyFormat::RdfXml));
        assert_eq!(OntologyFormat::from_path("a.ttl"), Some(OntologyFormat::Turtle));
        assert_eq!(OntologyFormat::from_path("a.obo"), None);
        assert_eq!(OntologyFormat::from_path("noextension"), None);
        assert_eq!(OntologyFormat::sniff(b"  {\"graphs\": []}"), OntologyFormat::OboGraphJson);
        assert_eq!(OntologyFormat::sniff(b"<a> <b> <c> ."), OntologyFormat::NTriples);
        assert_eq!(
            OntologyFormat::sniff(b"\n<?xml version=\"1.0\"?>\n<rdf:RDF/>"),
            OntologyFormat::RdfXml
        );
        assert_eq!(OntologyFormat::sniff(b"@prefix ex: <urn:x#> ."), OntologyFormat::Turtle);
    }

    #[test]
    fn test_resolve_acronym() {
        let mut registry = BTreeMap::new();
        registry.insert("efo".to_string(), "https://example.org/efo.json".to_string());
        registry.insert("BAD".to_string(), "notalocation".to_string());
        let loader = HttpOntologyLoader::new(&TransportConfig::default(), registry).unwrap();

        assert_eq!(
            loader.resolve(&OntologyReference::parse("EFO")).unwrap(),
            OntologyReference::Url("https://example.org/efo.json".to_string())
        );
        assert_eq!(
            loader.resolve(&OntologyReference::parse("MONDO")).unwrap(),
            OntologyReference::Url("http://purl.obolibrary.org/obo/mondo.json".to_string())
        );
        assert!(loader.resolve(&OntologyReference::parse("BAD")).is_err());
    }

    #[tokio::test]
    async fn test_load_local_ntriples_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tiny.nt");
        tokio::fs::write(
            &path,
            "<urn:x#A> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://www.w3.org/2002/07/owl#Class> .\n",
        )
        .await
        .unwrap();

        let loader =
            HttpOntologyLoader::new(&TransportConfig::default(), BTreeMap::new()).unwrap();
        let entities = loader
            .load(&OntologyReference::File(path))
            .await
            .unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].kind, EntityKind::Class);
    }

    #[tokio::test]
    async fn test_missing_file_is_unreachable() {
        let loader =
            HttpOntologyLoader::new(&TransportConfig::default(), BTreeMap::new()).unwrap();
        let err = loader
            .load(&OntologyReference::File(PathBuf::from("/nonexistent/onto.json")))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn test_stalled_download_times_out() {
        // Accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let transport = TransportConfig {
            fetch_timeout_secs: 1,
            ..TransportConfig::default()
        };
        let loader = HttpOntologyLoader::new(&transport, BTreeMap::new()).unwrap();
        let started = std::time::Instant::now();
        let err = loader
            .load(&OntologyReference::Url(format!("http://{addr}/slow.json")))
            .await
            .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(10));
        match err {
            SourceError::Unreachable { reason, .. } => assert!(reason.contains("timed out")),
            other => panic!("expected unreachable, got {other:?}"),
        }
        server.abort();
    }

    #[tokio::test]
    async fn test_unparseable_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let loader =
            HttpOntologyLoader::new(&TransportConfig::default(), BTreeMap::new()).unwrap();
        let err = loader.load(&OntologyReference::File(path)).await.unwrap_err();
        assert!(matches!(err, SourceError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_static_loader_counts_loads() {
        let loader = StaticOntologyLoader::new().with_source(
            "TINY",
            vec![RawEntity::new("urn:x#A", EntityKind::Class)],
        );
        let reference = OntologyReference::parse("TINY");
        loader.load(&reference).await.unwrap();
        loader.load(&reference).await.unwrap();
        assert_eq!(loader.load_count("TINY"), 2);
        assert!(loader.load(&OntologyReference::parse("OTHER")).await.is_err());
    }
}
