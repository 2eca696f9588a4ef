//! Conditional-clear request/result types, per spec §3/§4.5.

use serde::{Deserialize, Serialize};

/// A triple pattern where any position may be absent — an absent
/// component becomes a fresh variable when rendered, per spec §3.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: Option<String>,
    pub predicate: Option<String>,
    pub object: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Iri,
    Literal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClearCondition {
    pub patterns: Vec<TriplePattern>,
    pub subject_prefix: Option<String>,
    #[serde(default)]
    pub predicate_whitelist: Vec<String>,
    pub object_type: Option<ObjectType>,
}

/// The result of a dry-run estimate, per spec §3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DryRunResult {
    pub graph_iri: String,
    pub estimated_deletes: u64,
    /// At most 10 sample triples, rendered as SPARQL-compatible strings.
    pub sample_triples: Vec<String>,
    pub estimate_ms: u64,
}

/// The result of an executed conditional clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearResult {
    pub deleted_count: u64,
    pub execution_time_ms: u64,
    pub executed: bool,
}
