//! The in-memory `RdfClient` test double, per spec §9: backs onto an
//! `oxigraph::store::Store` so unit tests exercise the executor, planner,
//! and projection against real SPARQL evaluation without a network round
//! trip.

use super::{ConstructResponse, HealthResult, RdfClient, SelectResponse, Stats, UpdateResponse};
use crate::error::ClientError;
use crate::sparql::result_mapper::RawBinding;
use async_trait::async_trait;
use oxigraph::io::{RdfFormat, RdfSerializer};
use oxigraph::model::Term as OxTerm;
use oxigraph::sparql::{Query, QueryResults, Update};
use oxigraph::store::Store;
use std::collections::HashMap;
use std::io::BufWriter;
use std::time::Duration;

const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

fn term_to_raw_binding(term: &OxTerm) -> RawBinding {
    match term {
        OxTerm::NamedNode(n) => RawBinding {
            binding_type: "uri".to_string(),
            value: n.as_str().to_string(),
            datatype: None,
            lang: None,
        },
        OxTerm::BlankNode(b) => RawBinding {
            binding_type: "bnode".to_string(),
            value: b.as_str().to_string(),
            datatype: None,
            lang: None,
        },
        OxTerm::Literal(lit) => RawBinding {
            binding_type: "literal".to_string(),
            value: lit.value().to_string(),
            datatype: (lit.language().is_none() && lit.datatype().as_str() != XSD_STRING)
                .then(|| lit.datatype().as_str().to_string()),
            lang: lit.language().map(str::to_string),
        },
        OxTerm::Triple(_) => RawBinding {
            binding_type: "triple".to_string(),
            value: term.to_string(),
            datatype: None,
            lang: None,
        },
    }
}

/// Wraps a fresh in-memory [`Store`] behind the [`RdfClient`] trait.
/// `load_turtle` seeds it for a test; `health` always reports reachable.
pub struct MemoryRdfClient {
    store: Store,
}

impl MemoryRdfClient {
    pub fn new() -> Result<Self, ClientError> {
        let store = Store::new().map_err(|e| ClientError::FusekiConnectError(e.to_string()))?;
        Ok(Self { store })
    }

    pub fn load_turtle(&self, turtle: &str) -> Result<(), ClientError> {
        self.store
            .load_from_reader(RdfFormat::Turtle, turtle.as_bytes())
            .map_err(|e| ClientError::BadRequest(e.to_string()))
    }

    pub fn triple_count(&self) -> usize {
        self.store.iter().filter_map(|q| q.ok()).count()
    }
}

impl Default for MemoryRdfClient {
    fn default() -> Self {
        Self::new().expect("in-memory oxigraph store never fails to open")
    }
}

#[async_trait]
impl RdfClient for MemoryRdfClient {
    async fn select(
        &self,
        query: &str,
        _timeout: Option<Duration>,
        _trace_id: Option<&str>,
    ) -> Result<SelectResponse, ClientError> {
        let parsed =
            Query::parse(query, None).map_err(|e| ClientError::BadRequest(e.to_string()))?;
        let results = self
            .store
            .query(parsed)
            .map_err(|e| ClientError::FusekiQueryError(e.to_string()))?;

        let (vars, bindings) = match results {
            QueryResults::Solutions(solutions) => {
                let vars: Vec<String> =
                    solutions.variables().iter().map(|v| v.as_str().to_string()).collect();
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(|e| ClientError::FusekiQueryError(e.to_string()))?;
                    let mut row = HashMap::new();
                    for var in &vars {
                        if let Some(term) = solution.get(var.as_str()) {
                            row.insert(var.clone(), term_to_raw_binding(term));
                        }
                    }
                    rows.push(row);
                }
                (vars, rows)
            }
            QueryResults::Boolean(result) => {
                let mut row = HashMap::new();
                row.insert(
                    "result".to_string(),
                    RawBinding {
                        binding_type: "literal".to_string(),
                        value: result.to_string(),
                        datatype: Some("http://www.w3.org/2001/XMLSchema#boolean".to_string()),
                        lang: None,
                    },
                );
                (vec!["result".to_string()], vec![row])
            }
            QueryResults::Graph(_) => {
                return Err(ClientError::BadRequest(
                    "select() was given a CONSTRUCT/DESCRIBE query".to_string(),
                ))
            }
        };

        Ok(SelectResponse {
            vars,
            bindings,
            stats: Stats { status: 200, duration_ms: 0 },
        })
    }

    async fn construct(
        &self,
        query: &str,
        _timeout: Option<Duration>,
        _trace_id: Option<&str>,
    ) -> Result<ConstructResponse, ClientError> {
        let parsed =
            Query::parse(query, None).map_err(|e| ClientError::BadRequest(e.to_string()))?;
        let results = self
            .store
            .query(parsed)
            .map_err(|e| ClientError::FusekiQueryError(e.to_string()))?;

        let QueryResults::Graph(triples) = results else {
            return Err(ClientError::BadRequest(
                "construct() was given a SELECT/ASK query".to_string(),
            ));
        };

        let mut buf = BufWriter::new(Vec::new());
        let mut serializer = RdfSerializer::from_format(RdfFormat::Turtle).serialize_to_write(&mut buf);
        for triple in triples {
            let triple = triple.map_err(|e| ClientError::FusekiQueryError(e.to_string()))?;
            serializer
                .serialize_triple(triple.as_ref())
                .map_err(|e| ClientError::FusekiQueryError(e.to_string()))?;
        }
        serializer
            .finish()
            .map_err(|e| ClientError::FusekiQueryError(e.to_string()))?;
        let bytes = buf
            .into_inner()
            .map_err(|e| ClientError::FusekiQueryError(e.to_string()))?;
        let turtle = String::from_utf8(bytes)
            .map_err(|e| ClientError::FusekiQueryError(format!("non-UTF-8 turtle output: {e}")))?;

        Ok(ConstructResponse {
            turtle,
            stats: Stats { status: 200, duration_ms: 0 },
        })
    }

    async fn update(
        &self,
        update: &str,
        _timeout: Option<Duration>,
        _trace_id: Option<&str>,
    ) -> Result<UpdateResponse, ClientError> {
        let parsed =
            Update::parse(update, None).map_err(|e| ClientError::BadRequest(e.to_string()))?;
        self.store
            .update(parsed)
            .map_err(|e| ClientError::FusekiQueryError(e.to_string()))?;
        Ok(UpdateResponse { status: 200, duration_ms: 0 })
    }

    async fn health(&self) -> Result<HealthResult, ClientError> {
        Ok(HealthResult { reachable: true, latency_ms: 0 })
    }
}
