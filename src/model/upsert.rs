//! Upsert request/plan types, per spec §3/§4.3.

use super::term::{GraphRef, Triple};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertKey {
    S,
    SP,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    Replace,
    Ignore,
    Append,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertRequest {
    pub graph: GraphRef,
    pub triples: Vec<Triple>,
    pub upsert_key: UpsertKey,
    #[serde(default)]
    pub custom_key_fields: Vec<String>,
    pub merge_strategy: MergeStrategy,
    pub provenance: Option<String>,
}

/// One statement inside an [`UpsertPlan`], per spec §4.3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertStatement {
    pub sparql: String,
    /// The group key this statement was emitted for, rendered for
    /// diagnostics (e.g. `"<http://ex/e1>"` or `"<http://ex/e1>|rdfs:label"`).
    pub key: String,
    pub strategy: MergeStrategy,
    pub triples: Vec<Triple>,
    /// True iff `strategy == Replace` — a DELETE may remove prior state,
    /// so the executor should consider capturing a pre-image.
    pub requires_snapshot: bool,
}

/// The compiled, content-addressable plan for an [`UpsertRequest`], per
/// spec §3/§4.3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertPlan {
    pub graph_iri: String,
    pub statements: Vec<UpsertStatement>,
    /// Stable digest over `(graph_iri, strategy, key_discipline, sorted
    /// canonical triples)` — identical inputs produce identical hashes.
    pub request_hash: String,
}
