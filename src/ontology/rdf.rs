//! RDF readers: N-Triples, Turtle and RDF/XML (OWL).
//!
//! Parsing is delegated to sophia; this module folds the resulting triples
//! into raw entities. Statements about blank nodes are skipped, and only
//! subjects declared as an OWL class, property or individual become entities.

use std::collections::HashMap;

use sophia_api::source::TripleSource;
use sophia_api::term::Term;
use sophia_api::triple::Triple;
use thiserror::Error;

use super::types::{EntityKind, RawEntity};

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const RDF_PROPERTY: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#Property";
const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
const RDFS_SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
const RDFS_SUBPROPERTY_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subPropertyOf";
const OWL: &str = "http://www.w3.org/2002/07/owl#";
const OWL_DEPRECATED: &str = "http://www.w3.org/2002/07/owl#deprecated";
const OBO_IN_OWL: &str = "http://www.geneontology.org/formats/oboInOwl#";
const OBO_IN_OWL_ID: &str = "http://www.geneontology.org/formats/oboInOwl#id";
const IAO_DEFINITION: &str = "http://purl.obolibrary.org/obo/IAO_0000115";
const SKOS: &str = "http://www.w3.org/2004/02/skos/core#";
const SKOS_DEFINITION: &str = "http://www.w3.org/2004/02/skos/core#definition";

/// A syntax error reported by the RDF parser.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct RdfError(String);

/// Parse an N-Triples document into raw entities, in first-seen order.
pub fn parse_ntriples(text: &str) -> Result<Vec<RawEntity>, RdfError> {
    read_triples(sophia_turtle::parser::nt::parse_str(text))
}

/// Parse a Turtle document into raw entities, in first-seen order.
pub fn parse_turtle(text: &str) -> Result<Vec<RawEntity>, RdfError> {
    read_triples(sophia_turtle::parser::turtle::parse_str(text))
}

/// Parse an RDF/XML document (the usual `.owl` serialization) into raw
/// entities, in first-seen order.
pub fn parse_rdfxml(text: &str) -> Result<Vec<RawEntity>, RdfError> {
    read_triples(sophia_xml::parser::parse_str(text))
}

fn read_triples<S: TripleSource>(mut source: S) -> Result<Vec<RawEntity>, RdfError> {
    let mut entities = EntityAccumulator::default();
    source
        .for_each_triple(|triple| entities.add(&triple))
        .map_err(|e| RdfError(e.to_string()))?;
    Ok(entities.finish())
}

enum Node {
    Iri(String),
    Literal(String),
    Other,
}

impl Node {
    fn from_term<T: Term>(term: T) -> Self {
        if let Some(iri) = term.iri() {
            Node::Iri(iri.as_str().to_string())
        } else if let Some(value) = term.lexical_form() {
            Node::Literal(value.to_string())
        } else {
            Node::Other
        }
    }
}

/// Folds annotation triples into entities keyed by subject IRI.
#[derive(Default)]
struct EntityAccumulator {
    order: Vec<String>,
    entities: HashMap<String, RawEntity>,
    typed: HashMap<String, EntityKind>,
}

impl EntityAccumulator {
    fn add<T: Triple>(&mut self, triple: &T) {
        let (s, p) = (triple.s(), triple.p());
        let (Some(subject), Some(predicate)) = (s.iri(), p.iri()) else {
            return;
        };
        self.insert(
            subject.as_str(),
            predicate.as_str(),
            Node::from_term(triple.o()),
        );
    }

    fn insert(&mut self, subject: &str, predicate: &str, object: Node) {
        if !self.entities.contains_key(subject) {
            self.order.push(subject.to_string());
            self.entities.insert(
                subject.to_string(),
                RawEntity::new(subject, EntityKind::Other),
            );
        }
        let Some(entity) = self.entities.get_mut(subject) else {
            return;
        };

        match (predicate, object) {
            (RDF_TYPE, Node::Iri(class)) => {
                if let Some(kind) = declared_kind(&class) {
                    // A class declaration wins over a later individual typing.
                    let current = self.typed.entry(subject.to_string()).or_insert(kind);
                    if *current == EntityKind::Other {
                        *current = kind;
                    }
                }
            }
            (RDFS_LABEL, Node::Literal(value)) => entity.labels.push(value),
            (RDFS_SUBCLASS_OF | RDFS_SUBPROPERTY_OF, Node::Iri(parent)) => {
                entity.parents.push(parent)
            }
            (OWL_DEPRECATED, Node::Literal(value)) => {
                entity.deprecated = value.eq_ignore_ascii_case("true") || value == "1"
            }
            (IAO_DEFINITION | SKOS_DEFINITION, Node::Literal(value)) => {
                entity.definition.get_or_insert(value);
            }
            (OBO_IN_OWL_ID, Node::Literal(value)) => entity.curie = Some(value),
            (p, Node::Literal(value)) if is_synonym_predicate(p) => entity.synonyms.push(value),
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<RawEntity> {
        self.order
            .into_iter()
            .filter_map(|iri| {
                let kind = *self.typed.get(&iri)?;
                let mut entity = self.entities.remove(&iri)?;
                entity.kind = kind;
                Some(entity)
            })
            .collect()
    }
}

fn declared_kind(class: &str) -> Option<EntityKind> {
    if class == RDF_PROPERTY {
        return Some(EntityKind::Property);
    }
    match class.strip_prefix(OWL)? {
        "Class" => Some(EntityKind::Class),
        "ObjectProperty" | "DatatypeProperty" | "AnnotationProperty" => {
            Some(EntityKind::Property)
        }
        "NamedIndividual" => Some(EntityKind::Other),
        _ => None,
    }
}

fn is_synonym_predicate(predicate: &str) -> bool {
    match predicate.strip_prefix(OBO_IN_OWL) {
        Some(local) => matches!(
            local,
            "hasExactSynonym" | "hasRelatedSynonym" | "hasBroadSynonym" | "hasNarrowSynonym"
        ),
        None => predicate.strip_prefix(SKOS) == Some("altLabel"),
    }
}
