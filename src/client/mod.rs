//! The resilient HTTP client boundary, per spec §4.8/§9: [`RdfClient`] is
//! the capability set `{select, construct, update, health}` — a trait with
//! one production implementation ([`http::HttpRdfClient`]) and one
//! in-memory test double ([`memory::MemoryRdfClient`]), so callers depend
//! on the trait rather than a concrete transport.

pub mod circuit_breaker;
pub mod http;
pub mod memory;
pub mod retry;

use crate::error::ClientError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::sparql::result_mapper::RawBinding;

/// `{status, durationMs}`, attached to every response per spec §4.8.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub status: u16,
    pub duration_ms: u64,
}

/// The normalised SELECT response, per spec §4.8.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectResponse {
    pub vars: Vec<String>,
    pub bindings: Vec<HashMap<String, RawBinding>>,
    pub stats: Stats,
}

/// The normalised CONSTRUCT response, per spec §4.8.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructResponse {
    pub turtle: String,
    pub stats: Stats,
}

/// The normalised UPDATE response, per spec §4.8.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub status: u16,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthResult {
    pub reachable: bool,
    pub latency_ms: u64,
}

/// The capability set every caller in this crate depends on, per spec §9:
/// "model as a capability set `{select, construct, update, health}`".
/// `trace_id`, when given, is echoed on the configured trace header.
#[async_trait]
pub trait RdfClient: Send + Sync {
    async fn select(
        &self,
        query: &str,
        timeout: Option<Duration>,
        trace_id: Option<&str>,
    ) -> Result<SelectResponse, ClientError>;

    async fn construct(
        &self,
        query: &str,
        timeout: Option<Duration>,
        trace_id: Option<&str>,
    ) -> Result<ConstructResponse, ClientError>;

    async fn update(
        &self,
        update: &str,
        timeout: Option<Duration>,
        trace_id: Option<&str>,
    ) -> Result<UpdateResponse, ClientError>;

    async fn health(&self) -> Result<HealthResult, ClientError>;
}
