//! OBO Graphs JSON reader.
//!
//! Reads the `{"graphs": [{"nodes": [...], "edges": [...]}]}` layout published
//! by the OBO Library. Only what the term index needs is extracted: labels,
//! synonyms, definitions, `is_a` parents and the deprecation flag.

use super::types::{EntityKind, RawEntity};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct GraphDocument {
    #[serde(default)]
    graphs: Vec<Graph>,
}

#[derive(Debug, Deserialize)]
struct Graph {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
struct Node {
    id: String,
    #[serde(default)]
    lbl: Option<String>,
    #[serde(default, rename = "type")]
    node_type: Option<String>,
    #[serde(default)]
    meta: Option<Meta>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Meta {
    #[serde(default)]
    definition: Option<ValueHolder>,
    #[serde(default)]
    synonyms: Vec<ValueHolder>,
    #[serde(default)]
    deprecated: bool,
    #[serde(default)]
    basic_property_values: Vec<PropertyValue>,
}

#[derive(Debug, Deserialize)]
struct ValueHolder {
    #[serde(default)]
    val: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PropertyValue {
    pred: String,
    #[serde(default)]
    val: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Edge {
    sub: String,
    pred: String,
    obj: String,
}

const OBO_ID_PREDICATE: &str = "http://www.geneontology.org/formats/oboInOwl#id";

/// Parse OBO Graphs JSON into raw entities, in node order.
pub fn parse(bytes: &[u8]) -> Result<Vec<RawEntity>, serde_json::Error> {
    let document: GraphDocument = serde_json::from_slice(bytes)?;

    let mut entities = Vec::new();
    for graph in document.graphs {
        let mut parents: HashMap<String, Vec<String>> = HashMap::new();
        for edge in graph.edges {
            if edge.pred == "is_a"
                || edge.pred == "http://www.w3.org/2000/01/rdf-schema#subClassOf"
                || edge.pred == "http://www.w3.org/2000/01/rdf-schema#subPropertyOf"
            {
                parents.entry(edge.sub).or_default().push(edge.obj);
            }
        }

        for node in graph.nodes {
            let kind = match node.node_type.as_deref() {
                Some("CLASS") => EntityKind::Class,
                Some("PROPERTY") => EntityKind::Property,
                _ => EntityKind::Other,
            };
            let meta = node.meta.unwrap_or_default();

            let mut entity = RawEntity::new(node.id, kind);
            entity.labels.extend(node.lbl);
            entity.synonyms = meta.synonyms.into_iter().filter_map(|s| s.val).collect();
            entity.definition = meta.definition.and_then(|d| d.val);
            entity.deprecated = meta.deprecated;
            entity.curie = meta
                .basic_property_values
                .into_iter()
                .find(|pv| pv.pred == OBO_ID_PREDICATE)
                .and_then(|pv| pv.val);
            entity.parents = parents.remove(&entity.iri).unwrap_or_default();
            entities.push(entity);
        }
    }

    Ok(entities)
}
