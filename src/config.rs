//! Configuration surface for the SPARQL anti-corruption layer.
//!
//! Per spec §1, *loading* configuration (files, env vars, flags) is the
//! host application's concern. This module only defines the typed value
//! structs the host populates — one per concern, mirroring how the spec's
//! §6 configuration surface is itemised (`rdf.endpoint`, `rdf.timeout`,
//! `rdf.retries`, `rdf.circuit_breaker`, `security.trace_header`,
//! `graph.projection_profiles`, `graph.naming`). Every struct implements
//! `Default` with the values spec.md states explicitly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// `rdf.endpoint` / `rdf.dataset` / `rdf.auth`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RdfEndpointConfig {
    pub endpoint: String,
    pub dataset: String,
    pub auth: Option<BasicAuthConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicAuthConfig {
    pub username: String,
    pub password: String,
}

impl RdfEndpointConfig {
    /// `{endpoint}/{dataset}/query`, per spec §6.
    pub fn query_url(&self) -> String {
        format!(
            "{}/{}/query",
            self.endpoint.trim_end_matches('/'),
            self.dataset
        )
    }

    /// `{endpoint}/{dataset}/update`, per spec §6.
    pub fn update_url(&self) -> String {
        format!(
            "{}/{}/update",
            self.endpoint.trim_end_matches('/'),
            self.dataset
        )
    }
}

/// `rdf.timeout`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(with = "duration_secs")]
    pub default: Duration,
    #[serde(with = "duration_secs")]
    pub max: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default: Duration::from_secs(10),
            max: Duration::from_secs(60),
        }
    }
}

impl TimeoutConfig {
    /// Clamp a caller-supplied timeout to `max`, falling back to `default`
    /// when none was supplied.
    pub fn effective(&self, requested: Option<Duration>) -> Duration {
        requested.unwrap_or(self.default).min(self.max)
    }
}

/// `rdf.retries`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    #[serde(with = "duration_secs")]
    pub backoff: Duration,
    pub backoff_multiplier: f64,
    #[serde(with = "duration_secs")]
    pub jitter: Duration,
    pub retryable_status_codes: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            jitter: Duration::from_millis(100),
            retryable_status_codes: vec![429, 502, 503, 504],
        }
    }
}

/// `rdf.circuit_breaker`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    #[serde(with = "duration_secs")]
    pub recovery_timeout: Duration,
    /// When set, only timeouts (not HTTP 5xx) count as breaker failures.
    pub record_timeout_only: bool,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            record_timeout_only: false,
        }
    }
}

/// `security.trace_header`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub trace_header: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            trace_header: "X-Trace-Id".to_string(),
        }
    }
}

/// One entry of `graph.projection_profiles`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionProfile {
    pub limit: u64,
    pub include_literals: bool,
    pub directed: bool,
    pub edge_predicates: Vec<String>,
}

/// `graph.naming`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNamingConfig {
    /// e.g. `urn:{ns}:{model}:{version}:{env}[:{scenario_id}]`.
    pub graph_iri_template: String,
    /// e.g. `{graph}:snapshot:{timestamp}`.
    pub snapshot_format: String,
}

impl Default for GraphNamingConfig {
    fn default() -> Self {
        Self {
            graph_iri_template: "urn:{ns}:{model}:{version}:{env}".to_string(),
            snapshot_format: "{graph}:snapshot:{timestamp}".to_string(),
        }
    }
}

/// Top-level configuration the host assembles and hands to the client and
/// managers at construction time. No part of this crate mutates or loads
/// it — see the module docs.
#[derive(Debug, Clone)]
pub struct AclConfig {
    pub endpoint: RdfEndpointConfig,
    pub timeout: TimeoutConfig,
    pub retry: RetryConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub security: SecurityConfig,
    pub projection_profiles: HashMap<String, ProjectionProfile>,
    pub naming: GraphNamingConfig,
    /// Default batch size for `apply_template`, spec §4.7.
    pub batch_size: usize,
    /// `COPY GRAPH` pre-execution snapshots before `replace` upserts,
    /// spec §4.4 step 3 ("implementation-configurable").
    pub snapshot_before_replace: bool,
}

impl AclConfig {
    pub fn new(endpoint: RdfEndpointConfig) -> Self {
        Self {
            endpoint,
            timeout: TimeoutConfig::default(),
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            security: SecurityConfig::default(),
            projection_profiles: HashMap::new(),
            naming: GraphNamingConfig::default(),
            batch_size: 1000,
            snapshot_before_replace: false,
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
