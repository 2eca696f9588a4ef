//! [`HttpRdfClient`] against a mocked SPARQL 1.1 Protocol endpoint, per
//! spec §4.8/§9: a successful request, a non-retryable error surfacing
//! immediately, and the circuit breaker opening after repeated failures
//! and then rejecting without contacting the server (the S5 scenario).

use sparql_acl::config::{
    AclConfig, CircuitBreakerConfig, GraphNamingConfig, RdfEndpointConfig, RetryConfig,
    SecurityConfig, TimeoutConfig,
};
use sparql_acl::error::ClientError;
use sparql_acl::{HttpRdfClient, RdfClient};
use std::collections::HashMap;
use std::time::Duration;

fn config(server_url: &str, retry: RetryConfig, circuit_breaker: CircuitBreakerConfig) -> AclConfig {
    AclConfig {
        endpoint: RdfEndpointConfig {
            endpoint: server_url.to_string(),
            dataset: "ds".to_string(),
            auth: None,
        },
        timeout: TimeoutConfig::default(),
        retry,
        circuit_breaker,
        security: SecurityConfig::default(),
        projection_profiles: HashMap::new(),
        naming: GraphNamingConfig::default(),
        batch_size: 1000,
        snapshot_before_replace: false,
    }
}

fn no_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 1,
        backoff: Duration::from_millis(1),
        backoff_multiplier: 1.0,
        jitter: Duration::from_millis(0),
        retryable_status_codes: vec![429, 502, 503, 504],
    }
}

fn permissive_breaker() -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_threshold: 100,
        recovery_timeout: Duration::from_secs(30),
        record_timeout_only: false,
    }
}

#[tokio::test]
async fn select_succeeds_against_a_mocked_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/ds/query")
        .with_status(200)
        .with_header("content-type", "application/sparql-results+json")
        .with_body(r#"{"head":{"vars":["s"]},"results":{"bindings":[]}}"#)
        .create_async()
        .await;

    let client = HttpRdfClient::new(config(&server.url(), no_retry(), permissive_breaker())).unwrap();
    let resp = client.select("SELECT ?s WHERE { ?s ?p ?o }", None, Some("trace-http")).await.unwrap();
    assert_eq!(resp.vars, vec!["s"]);
    assert!(resp.bindings.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn a_400_response_surfaces_as_a_non_retryable_bad_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/ds/query")
        .with_status(400)
        .with_body("malformed query")
        .expect(1)
        .create_async()
        .await;

    let client = HttpRdfClient::new(config(&server.url(), no_retry(), permissive_breaker())).unwrap();
    let err = client.select("not sparql", None, None).await.unwrap_err();
    assert!(matches!(err, ClientError::BadRequest(_)));
    mock.assert_async().await;
}

#[tokio::test]
async fn s5_breaker_opens_after_threshold_and_then_rejects_without_a_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/ds/query")
        .with_status(503)
        .with_body("service unavailable")
        .expect(2)
        .create_async()
        .await;

    let breaker = CircuitBreakerConfig {
        failure_threshold: 2,
        recovery_timeout: Duration::from_secs(30),
        record_timeout_only: false,
    };
    let client = HttpRdfClient::new(config(&server.url(), no_retry(), breaker)).unwrap();

    for _ in 0..2 {
        let err = client.select("SELECT * WHERE { ?s ?p ?o }", None, None).await.unwrap_err();
        assert!(matches!(err, ClientError::FusekiQueryError(_)));
    }

    let err = client.select("SELECT * WHERE { ?s ?p ?o }", None, None).await.unwrap_err();
    assert!(matches!(err, ClientError::FusekiCircuitOpen(_)));

    mock.assert_async().await;
}
