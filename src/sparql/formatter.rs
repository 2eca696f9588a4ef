//! Graph response formatting, per spec §4.9. `turtle` and
//! `simplified-json` are implemented in full; `json-ld` is a pluggable
//! seam — the actual Turtle→JSON-LD algorithm is an external
//! collaborator per spec §1's Non-goals, so this module only defines the
//! trait a caller's serializer must implement.

use indexmap::IndexMap;
use oxigraph::io::RdfFormat;
use oxigraph::model::{GraphNameRef, Term as OxTerm};
use oxigraph::store::Store;
use serde::Serialize;
use serde_json::Value as Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to parse turtle body: {0}")]
    InvalidTurtle(String),

    #[error("json-ld serializer unavailable")]
    SerializerUnavailable,

    #[error("json-ld serialization failed: {0}")]
    SerializerFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Turtle,
    JsonLd,
    SimplifiedJson,
}

/// The external collaborator this crate defers to for Turtle→JSON-LD
/// conversion (spec §1 Non-goals: "re-implementing the RDF parser").
/// Implementations typically wrap a crate like `json-ld` or `sophia`.
pub trait JsonLdSerializer {
    fn serialize(&self, turtle: &str) -> Result<Json, FormatError>;
}

/// A `JsonLdSerializer` that always fails — the default when no real
/// serializer has been wired in. Exists so `format_graph` has something
/// to call without forcing every caller to implement the trait just to
/// use `Turtle`/`SimplifiedJson`.
pub struct UnavailableJsonLdSerializer;

impl JsonLdSerializer for UnavailableJsonLdSerializer {
    fn serialize(&self, _turtle: &str) -> Result<Json, FormatError> {
        Err(FormatError::SerializerUnavailable)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FormattedGraph {
    Turtle(String),
    JsonLd(Json),
    SimplifiedJson(SimplifiedGraph),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropertyValue {
    pub value: String,
    pub datatype: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimplifiedNode {
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub rdf_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub labels: IndexMap<String, String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Vec<PropertyValue>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimplifiedEdge {
    pub source: String,
    pub target: String,
    pub predicate: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimplifiedGraph {
    pub nodes: Vec<SimplifiedNode>,
    pub edges: Vec<SimplifiedEdge>,
}

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";

pub struct GraphFormatter;

impl GraphFormatter {
    /// `format_graph(turtle, format, context?)`, per spec §4.9.
    pub fn format_graph(
        turtle: &str,
        format: GraphFormat,
        context: Option<Json>,
        serializer: &dyn JsonLdSerializer,
    ) -> Result<FormattedGraph, FormatError> {
        match format {
            GraphFormat::Turtle => Ok(FormattedGraph::Turtle(turtle.to_string())),
            GraphFormat::JsonLd => {
                let mut doc = serializer.serialize(turtle)?;
                if doc.is_array() {
                    let mut wrapped = serde_json::Map::new();
                    wrapped.insert("@graph".to_string(), doc);
                    doc = Json::Object(wrapped);
                }
                if let (Some(context), Json::Object(map)) = (context, &mut doc) {
                    map.insert("@context".to_string(), context);
                }
                Ok(FormattedGraph::JsonLd(doc))
            }
            GraphFormat::SimplifiedJson => {
                Ok(FormattedGraph::SimplifiedJson(Self::to_simplified_graph(turtle)?))
            }
        }
    }

    fn to_simplified_graph(turtle: &str) -> Result<SimplifiedGraph, FormatError> {
        let store = Store::new().map_err(|e| FormatError::InvalidTurtle(e.to_string()))?;
        store
            .load_from_reader(RdfFormat::Turtle, turtle.as_bytes())
            .map_err(|e| FormatError::InvalidTurtle(e.to_string()))?;

        let mut nodes: IndexMap<String, SimplifiedNode> = IndexMap::new();
        let mut edges = Vec::new();

        let quads = store.iter().filter_map(|q| q.ok());
        for quad in quads {
            if quad.graph_name != GraphNameRef::DefaultGraph {
                continue;
            }
            let subject = quad.subject.to_string();
            let predicate = quad.predicate.as_str().to_string();
            let node = nodes.entry(subject.clone()).or_insert_with(|| SimplifiedNode {
                id: subject.clone(),
                ..Default::default()
            });

            if predicate == RDF_TYPE {
                if let OxTerm::NamedNode(n) = &quad.object {
                    node.rdf_type = Some(n.as_str().to_string());
                }
                continue;
            }

            match &quad.object {
                OxTerm::NamedNode(n) => {
                    let target = n.as_str().to_string();
                    nodes.entry(target.clone()).or_insert_with(|| SimplifiedNode {
                        id: target.clone(),
                        ..Default::default()
                    });
                    edges.push(SimplifiedEdge {
                        source: subject,
                        target,
                        predicate,
                    });
                }
                OxTerm::Literal(lit) => {
                    let node = nodes.get_mut(&subject).expect("just inserted above");
                    if predicate == RDFS_LABEL {
                        match lit.language() {
                            Some(lang) => {
                                node.labels.insert(lang.to_string(), lit.value().to_string());
                                if node.label.is_none() {
                                    node.label = Some(lit.value().to_string());
                                }
                            }
                            None => node.label = Some(lit.value().to_string()),
                        }
                    } else {
                        const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
                        let datatype = if lit.language().is_some() || lit.datatype().as_str() == XSD_STRING {
                            None
                        } else {
                            Some(lit.datatype().as_str().to_string())
                        };
                        node.properties.entry(predicate).or_default().push(PropertyValue {
                            value: lit.value().to_string(),
                            datatype,
                            language: lit.language().map(str::to_string),
                        });
                    }
                }
                OxTerm::BlankNode(b) => {
                    let target = format!("_:{}", b.as_str());
                    edges.push(SimplifiedEdge {
                        source: subject,
                        target,
                        predicate,
                    });
                }
                #[allow(unreachable_patterns)]
                _ => {}
            }
        }

        Ok(SimplifiedGraph {
            nodes: nodes.into_values().collect(),
            edges,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TURTLE: &str = r#"
        @prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .
        @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
        @prefix ex: <http://ex/> .

        ex:alice rdf:type ex:Person ;
            rdfs:label "Alice"@en ;
            ex:knows ex:bob .
    "#;

    #[test]
    fn turtle_format_is_identity() {
        let out = GraphFormatter::format_graph(
            TURTLE,
            GraphFormat::Turtle,
            None,
            &UnavailableJsonLdSerializer,
        )
        .unwrap();
        assert_eq!(out, FormattedGraph::Turtle(TURTLE.to_string()));
    }

    #[test]
    fn json_ld_without_serializer_fails() {
        let err = GraphFormatter::format_graph(
            TURTLE,
            GraphFormat::JsonLd,
            None,
            &UnavailableJsonLdSerializer,
        )
        .unwrap_err();
        assert!(matches!(err, FormatError::SerializerUnavailable));
    }

    #[test]
    fn simplified_json_folds_type_into_node_no_edge() {
        let out = GraphFormatter::format_graph(
            TURTLE,
            GraphFormat::SimplifiedJson,
            None,
            &UnavailableJsonLdSerializer,
        )
        .unwrap();
        let FormattedGraph::SimplifiedJson(graph) = out else {
            panic!("expected simplified json");
        };
        let alice = graph
            .nodes
            .iter()
            .find(|n| n.id == "http://ex/alice")
            .unwrap();
        assert_eq!(alice.rdf_type.as_deref(), Some("http://ex/Person"));
        assert_eq!(alice.label.as_deref(), Some("Alice"));
        assert!(!graph.edges.iter().any(|e| e.predicate.contains("type")));
        assert!(graph
            .edges
            .iter()
            .any(|e| e.source == "http://ex/alice" && e.target == "http://ex/bob"));
    }
}
