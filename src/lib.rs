//! A SPARQL 1.1 Protocol anti-corruption layer: a typed DSL-to-SPARQL
//! compiler, an upsert planner with a transactional executor, named-graph
//! management with a conditional-clear engine, graph projection, a chunked
//! batch operator, and a resilient HTTP client wrapping retry and circuit
//! breaking — so application code never hand-builds a SPARQL string or
//! talks to a triple store directly.
//!
//! Configuration *loading* (files, env vars, flags) and log shipping are
//! the host application's concern; this crate only defines the typed
//! config surface ([`config`]) and the `tracing` instrumentation
//! ([`logging`]) the host wires up.

pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod model;
pub mod planner;
pub mod sparql;

pub use client::{
    http::HttpRdfClient, memory::MemoryRdfClient, ConstructResponse, HealthResult, RdfClient,
    SelectResponse, Stats, UpdateResponse,
};
pub use config::AclConfig;
pub use error::{AclError, ErrorInfo};
pub use executor::{
    BatchOperator, BatchOutcome, BatchTemplate, ClearOutcome, Conflict, Edge, GraphStatus,
    NamedGraphManager, Node, ProjectionConfig, ProjectionResult, ProjectionService,
    ProjectionSource, ProjectionStats, TransactionExecutor, UpsertOutcome,
};
pub use logging::{init_tracing, LogFormat};
pub use model::{
    ClearCondition, ClearResult, DryRunResult, GraphRef, ObjectType, QueryDsl, Triple,
    TriplePattern, UpsertPlan, UpsertRequest,
};
pub use planner::plan;
pub use sparql::{
    build_construct, build_select, build_select_with_cursor, decode_cursor, encode_cursor,
    GraphFormat, GraphFormatter, ResultMapper,
};
