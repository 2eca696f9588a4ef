//! The production [`RdfClient`]: a `reqwest`-based SPARQL 1.1 Protocol
//! client wiring together timeout resolution, retry, and the circuit
//! breaker, per spec §4.8/§6.

use super::circuit_breaker::{Admission, CircuitBreaker};
use super::retry::retry_with_policy;
use super::{ConstructResponse, HealthResult, RdfClient, SelectResponse, Stats, UpdateResponse};
use crate::config::AclConfig;
use crate::error::ClientError;
use crate::sparql::result_mapper::RawBinding;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Deserialize)]
struct SparqlJsonHead {
    vars: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SparqlJsonResults {
    bindings: Vec<HashMap<String, RawBinding>>,
}

#[derive(Debug, Deserialize)]
struct SparqlJsonResponse {
    head: SparqlJsonHead,
    results: SparqlJsonResults,
}

pub struct HttpRdfClient {
    http: reqwest::Client,
    config: AclConfig,
    breaker: CircuitBreaker,
}

impl HttpRdfClient {
    pub fn new(config: AclConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout.max)
            .build()
            .map_err(|e| ClientError::FusekiConnectError(e.to_string()))?;
        let breaker = CircuitBreaker::new(config.endpoint.dataset.clone(), config.circuit_breaker.clone());
        Ok(Self { http, config, breaker })
    }

    fn build_request(
        &self,
        url: &str,
        content_type: &str,
        accept: &str,
        body: String,
        trace_id: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let mut req = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::ACCEPT, accept)
            .body(body);
        if let Some(auth) = &self.config.endpoint.auth {
            req = req.basic_auth(&auth.username, Some(&auth.password));
        }
        if let Some(trace_id) = trace_id {
            req = req.header(self.config.security.trace_header.as_str(), trace_id);
        }
        req
    }

    /// Consults the breaker, runs `attempt` under the retry policy, then
    /// records the outcome — spec §4.8: "consult the breaker, submit,
    /// record outcome" wraps the whole (possibly retried) call.
    async fn with_resilience<T, F, Fut>(&self, attempt: F) -> Result<T, ClientError>
    where
        F: Fn(u32) -> Fut,
        Fut: std::future::Future<Output = Result<T, ClientError>>,
    {
        if self.breaker.admit() == Admission::Rejected {
            return Err(ClientError::FusekiCircuitOpen(self.breaker.name().to_string()));
        }
        let result = retry_with_policy(&self.config.retry, attempt).await;
        match &result {
            Ok(_) => self.breaker.record_success(),
            Err(err) => self.breaker.record_failure(matches!(err, ClientError::Timeout(_))),
        }
        result
    }

    async fn send(
        &self,
        url: String,
        content_type: &'static str,
        accept: &'static str,
        body: String,
        timeout: Duration,
        trace_id: Option<String>,
    ) -> Result<(u16, String, Duration), ClientError> {
        let started = Instant::now();
        let req = self.build_request(&url, content_type, accept, body, trace_id.as_deref());
        let response = tokio::time::timeout(timeout, req.send())
            .await
            .map_err(|_| ClientError::Timeout(timeout))?
            .map_err(|e| {
                if e.is_timeout() {
                    ClientError::Timeout(timeout)
                } else {
                    ClientError::FusekiConnectError(e.to_string())
                }
            })?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::FusekiConnectError(e.to_string()))?;
        let duration = started.elapsed();
        if !(200..300).contains(&status) {
            let snippet: String = text.chars().take(500).collect();
            return Err(ClientError::from_status(status, snippet));
        }
        Ok((status, text, duration))
    }
}

#[async_trait]
impl RdfClient for HttpRdfClient {
    async fn select(
        &self,
        query: &str,
        timeout: Option<Duration>,
        trace_id: Option<&str>,
    ) -> Result<SelectResponse, ClientError> {
        let effective_timeout = self.config.timeout.effective(timeout);
        let url = self.config.endpoint.query_url();
        let query = query.to_string();
        let trace_id = trace_id.map(str::to_string);

        let (status, body, duration) = self
            .with_resilience(|_attempt| {
                self.send(
                    url.clone(),
                    "application/sparql-query",
                    "application/sparql-results+json",
                    query.clone(),
                    effective_timeout,
                    trace_id.clone(),
                )
            })
            .await?;

        let parsed: SparqlJsonResponse =
            serde_json::from_str(&body).map_err(|e| ClientError::FusekiQueryError(e.to_string()))?;

        Ok(SelectResponse {
            vars: parsed.head.vars,
            bindings: parsed.results.bindings,
            stats: Stats { status, duration_ms: duration.as_millis() as u64 },
        })
    }

    async fn construct(
        &self,
        query: &str,
        timeout: Option<Duration>,
        trace_id: Option<&str>,
    ) -> Result<ConstructResponse, ClientError> {
        let effective_timeout = self.config.timeout.effective(timeout);
        let url = self.config.endpoint.query_url();
        let query = query.to_string();
        let trace_id = trace_id.map(str::to_string);

        let (status, turtle, duration) = self
            .with_resilience(|_attempt| {
                self.send(
                    url.clone(),
                    "application/sparql-query",
                    "text/turtle",
                    query.clone(),
                    effective_timeout,
                    trace_id.clone(),
                )
            })
            .await?;

        Ok(ConstructResponse {
            turtle,
            stats: Stats { status, duration_ms: duration.as_millis() as u64 },
        })
    }

    async fn update(
        &self,
        update: &str,
        timeout: Option<Duration>,
        trace_id: Option<&str>,
    ) -> Result<UpdateResponse, ClientError> {
        let effective_timeout = self.config.timeout.effective(timeout);
        let url = self.config.endpoint.update_url();
        let update = update.to_string();
        let trace_id = trace_id.map(str::to_string);

        let (status, _body, duration) = self
            .with_resilience(|_attempt| {
                self.send(
                    url.clone(),
                    "application/sparql-update",
                    "*/*",
                    update.clone(),
                    effective_timeout,
                    trace_id.clone(),
                )
            })
            .await?;

        Ok(UpdateResponse { status, duration_ms: duration.as_millis() as u64 })
    }

    async fn health(&self) -> Result<HealthResult, ClientError> {
        let started = Instant::now();
        let probe = self
            .select("SELECT * WHERE { ?s ?p ?o } LIMIT 1", Some(Duration::from_secs(5)), None)
            .await;
        Ok(HealthResult {
            reachable: probe.is_ok(),
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }
}
