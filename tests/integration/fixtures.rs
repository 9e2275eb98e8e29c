//! Shared test ontologies and helpers.

use std::path::Path;
use std::sync::Arc;

use termap::config::{CacheConfig, Config};
use termap::ontology::{EntityKind, RawEntity, StaticOntologyLoader};
use termap::{MappingEngine, TermCache, TermCollector};

pub const TOY: &str = "TOY";

pub fn toy_entities() -> Vec<RawEntity> {
    vec![
        RawEntity::new("http://purl.obolibrary.org/obo/TOY_0001", EntityKind::Class)
            .with_label("asthma")
            .with_synonym("bronchial asthma"),
        RawEntity::new("http://purl.obolibrary.org/obo/TOY_0002", EntityKind::Class)
            .with_label("heart disease")
            .deprecated(true),
        RawEntity::new("http://purl.obolibrary.org/obo/TOY_0003", EntityKind::Class)
            .with_label("cardiovascular disease")
            .with_synonym("disease of the heart"),
        RawEntity::new("http://purl.obolibrary.org/obo/TOY_0004", EntityKind::Class)
            .with_label("eczema")
            .with_parent("http://purl.obolibrary.org/obo/TOY_0005"),
        RawEntity::new("http://purl.obolibrary.org/obo/TOY_0005", EntityKind::Class)
            .with_label("skin disease"),
        RawEntity::new("http://purl.obolibrary.org/obo/TOY_0100", EntityKind::Property)
            .with_label("has symptom"),
    ]
}

pub fn toy_loader() -> Arc<StaticOntologyLoader> {
    Arc::new(StaticOntologyLoader::new().with_source(TOY, toy_entities()))
}

pub fn test_config(cache_dir: &Path) -> Config {
    let mut config = Config::default();
    config.cache = CacheConfig::at(cache_dir);
    config
}

pub fn engine_with(config: Config, loader: Arc<StaticOntologyLoader>) -> MappingEngine {
    let cache = TermCache::new(&config.cache);
    MappingEngine::new(config, TermCollector::new(loader), cache)
}

pub fn toy_engine(cache_dir: &Path) -> MappingEngine {
    engine_with(test_config(cache_dir), toy_loader())
}

/// OBO Graphs JSON rendition of a two-class ontology.
pub const OBO_GRAPH_JSON: &str = r#"{
  "graphs": [{
    "id": "http://purl.obolibrary.org/obo/mini.owl",
    "nodes": [
      {
        "id": "http://purl.obolibrary.org/obo/MINI_0001",
        "lbl": "influenza",
        "type": "CLASS",
        "meta": {
          "synonyms": [{ "pred": "hasExactSynonym", "val": "flu" }],
          "definition": { "val": "A viral infection of the respiratory tract." }
        }
      },
      {
        "id": "http://purl.obolibrary.org/obo/MINI_0002",
        "lbl": "viral infectious disease",
        "type": "CLASS"
      },
      {
        "id": "http://purl.obolibrary.org/obo/MINI_0003",
        "lbl": "common cold",
        "type": "CLASS",
        "meta": { "deprecated": true }
      }
    ],
    "edges": [
      {
        "sub": "http://purl.obolibrary.org/obo/MINI_0001",
        "pred": "is_a",
        "obj": "http://purl.obolibrary.org/obo/MINI_0002"
      }
    ]
  }]
}"#;

/// N-Triples rendition of a small ontology with one class and one property.
pub const NTRIPLES: &str = r#"<http://example.org/onto#Fever> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://www.w3.org/2002/07/owl#Class> .
<http://example.org/onto#Fever> <http://www.w3.org/2000/01/rdf-schema#label> "fever"@en .
<http://example.org/onto#Fever> <http://www.geneontology.org/formats/oboInOwl#hasExactSynonym> "pyrexia" .
<http://example.org/onto#Cough> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://www.w3.org/2002/07/owl#Class> .
<http://example.org/onto#Cough> <http://www.w3.org/2000/01/rdf-schema#label> "cough" .
<http://example.org/onto#hasSeverity> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://www.w3.org/2002/07/owl#ObjectProperty> .
<http://example.org/onto#hasSeverity> <http://www.w3.org/2000/01/rdf-schema#label> "has severity" .
"#;

/// RDF/XML (OWL) rendition of a small disease ontology.
pub const OWL_XML: &str = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:owl="http://www.w3.org/2002/07/owl#"
     xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
     xmlns:rdfs="http://www.w3.org/2000/01/rdf-schema#"
     xmlns:oboInOwl="http://www.geneontology.org/formats/oboInOwl#">
    <owl:Ontology rdf:about="http://purl.obolibrary.org/obo/derm.owl"/>
    <owl:Class rdf:about="http://purl.obolibrary.org/obo/DERM_0001">
        <rdfs:label>atopic dermatitis</rdfs:label>
        <oboInOwl:hasExactSynonym>eczema</oboInOwl:hasExactSynonym>
        <rdfs:subClassOf rdf:resource="http://purl.obolibrary.org/obo/DERM_0002"/>
    </owl:Class>
    <owl:Class rdf:about="http://purl.obolibrary.org/obo/DERM_0002">
        <rdfs:label>skin disease</rdfs:label>
    </owl:Class>
    <owl:Class rdf:about="http://purl.obolibrary.org/obo/DERM_0003">
        <rdfs:label>obsolete rash</rdfs:label>
        <owl:deprecated rdf:datatype="http://www.w3.org/2001/XMLSchema#boolean">true</owl:deprecated>
    </owl:Class>
</rdf:RDF>
"#;
