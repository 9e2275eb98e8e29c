//! Ontology term collection.
//!
//! Turns an ontology source (URL, local file or registry acronym) into a
//! queryable [`TermIndex`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Ontology Layer                        │
//! │  ┌───────────────┐ ┌───────────────┐ ┌───────────────┐  │
//! │  │    Loader     │ │   Collector   │ │  Term Index   │  │
//! │  │ (fetch+parse) │→│   (filters)   │→│ (IRI → term)  │  │
//! │  └───────────────┘ └───────────────┘ └───────────────┘  │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod collector;
pub mod obograph;
pub mod rdf;
mod source;
mod types;

pub use collector::{curie_from_iri, TermCollector};
pub use source::{
    HttpOntologyLoader, OntologyFormat, OntologyLoader, OntologyReference, StaticOntologyLoader,
};
pub use types::*;
