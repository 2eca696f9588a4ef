//! The chunked batch operator, per spec §4.7: `apply_template` submits a
//! caller-supplied INSERT pattern against many binding sets at once,
//! falling back to per-item retries when a whole chunk fails.

use crate::client::RdfClient;
use crate::error::AclError;
use indexmap::IndexMap;
use std::time::{Duration, Instant};

/// `{pattern, bindings}`, per spec §4.7. `pattern` holds `{?var}`
/// placeholders; each entry of `bindings` supplies the values for one row.
/// Substitution is verbatim — making the substituted values SPARQL-safe is
/// the caller's responsibility (spec §4.7), typically by routing them
/// through [`crate::sparql::sanitizer`] before building the template.
#[derive(Debug, Clone)]
pub struct BatchTemplate {
    pub pattern: String,
    pub bindings: Vec<IndexMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub failed_items: Vec<IndexMap<String, String>>,
    pub duration_ms: u64,
}

/// Substitutes every `{?var}` in `pattern` with `binding["var"]`, per spec
/// §4.7 (the leading `?` inside the braces is dropped: `{?name}` reads
/// from the `name` key).
fn render_row(pattern: &str, binding: &IndexMap<String, String>) -> String {
    let mut out = pattern.to_string();
    for (key, value) in binding {
        out = out.replace(&format!("{{?{key}}}"), value);
    }
    out
}

fn render_chunk_body(pattern: &str, chunk: &[IndexMap<String, String>]) -> String {
    chunk.iter().map(|b| render_row(pattern, b)).collect::<Vec<_>>().join("\n")
}

/// Runs [`crate::executor::batch`]'s `apply_template` operation, per spec
/// §4.7, against a live [`RdfClient`].
pub struct BatchOperator<'a> {
    client: &'a dyn RdfClient,
    batch_size: usize,
    max_retries: u32,
}

impl<'a> BatchOperator<'a> {
    pub fn new(client: &'a dyn RdfClient, batch_size: usize, max_retries: u32) -> Self {
        Self { client, batch_size: batch_size.max(1), max_retries }
    }

    /// `apply_template(template, graph_iri, trace_id, dry_run?)`, per spec
    /// §4.7. `dry_run` reports what would be submitted (every row counted
    /// as `success`) without issuing any `UPDATE`.
    pub async fn apply_template(
        &self,
        template: &BatchTemplate,
        graph_iri: &str,
        trace_id: Option<&str>,
        dry_run: bool,
    ) -> Result<BatchOutcome, AclError> {
        let started = Instant::now();
        let total = template.bindings.len();

        if dry_run {
            return Ok(BatchOutcome {
                total,
                success: total,
                failed: 0,
                failed_items: Vec::new(),
                duration_ms: started.elapsed().as_millis() as u64,
            });
        }

        let mut success = 0usize;
        let mut failed_items = Vec::new();

        for chunk in template.bindings.chunks(self.batch_size) {
            let body = render_chunk_body(&template.pattern, chunk);
            let query = format!("INSERT DATA {{ GRAPH <{graph_iri}> {{ {body} }} }}");
            match self.client.update(&query, None, trace_id).await {
                Ok(_) => success += chunk.len(),
                Err(err) => {
                    tracing::warn!(error = %err, chunk_size = chunk.len(), "batch chunk failed, retrying per-item");
                    for binding in chunk {
                        if self.submit_with_retry(&template.pattern, binding, graph_iri, trace_id).await {
                            success += 1;
                        } else {
                            failed_items.push(binding.clone());
                        }
                    }
                }
            }
        }

        Ok(BatchOutcome {
            total,
            success,
            failed: failed_items.len(),
            failed_items,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Per-item fallback for a failed chunk, per spec §4.7: retries with
    /// exponential backoff `0.5s * 2^attempt`, up to `max_retries`.
    async fn submit_with_retry(
        &self,
        pattern: &str,
        binding: &IndexMap<String, String>,
        graph_iri: &str,
        trace_id: Option<&str>,
    ) -> bool {
        let row = render_row(pattern, binding);
        let query = format!("INSERT DATA {{ GRAPH <{graph_iri}> {{ {row} }} }}");
        for attempt in 0..=self.max_retries {
            match self.client.update(&query, None, trace_id).await {
                Ok(_) => return true,
                Err(err) if attempt < self.max_retries => {
                    let delay = Duration::from_millis(500).mul_f64(2f64.powi(attempt as i32));
                    tracing::debug!(attempt, ?delay, error = %err, "retrying failed batch item");
                    tokio::time::sleep(delay).await;
                }
                Err(_) => return false,
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::memory::MemoryRdfClient;

    fn binding(id: &str, label: &str) -> IndexMap<String, String> {
        let mut b = IndexMap::new();
        b.insert("id".to_string(), format!("<http://ex/{id}>"));
        b.insert("label".to_string(), format!("\"{label}\""));
        b
    }

    #[tokio::test]
    async fn applies_all_bindings_in_a_single_chunk() {
        let client = MemoryRdfClient::new().unwrap();
        let operator = BatchOperator::new(&client, 100, 2);
        let template = BatchTemplate {
            pattern: "{?id} <http://www.w3.org/2000/01/rdf-schema#label> {?label} .".to_string(),
            bindings: vec![binding("e1", "Alice"), binding("e2", "Bob")],
        };
        let outcome = operator.apply_template(&template, "http://ex/g", None, false).await.unwrap();
        assert_eq!(outcome.total, 2);
        assert_eq!(outcome.success, 2);
        assert_eq!(outcome.failed, 0);
        assert_eq!(client.triple_count(), 2);
    }

    #[tokio::test]
    async fn chunks_bindings_according_to_batch_size() {
        let client = MemoryRdfClient::new().unwrap();
        let operator = BatchOperator::new(&client, 1, 0);
        let template = BatchTemplate {
            pattern: "{?id} <http://www.w3.org/2000/01/rdf-schema#label> {?label} .".to_string(),
            bindings: vec![binding("e1", "Alice"), binding("e2", "Bob"), binding("e3", "Carol")],
        };
        let outcome = operator.apply_template(&template, "http://ex/g", None, false).await.unwrap();
        assert_eq!(outcome.success, 3);
        assert_eq!(client.triple_count(), 3);
    }

    #[tokio::test]
    async fn dry_run_reports_counts_without_mutating_store() {
        let client = MemoryRdfClient::new().unwrap();
        let operator = BatchOperator::new(&client, 100, 1);
        let template = BatchTemplate {
            pattern: "{?id} <http://www.w3.org/2000/01/rdf-schema#label> {?label} .".to_string(),
            bindings: vec![binding("e1", "Alice")],
        };
        let outcome = operator.apply_template(&template, "http://ex/g", None, true).await.unwrap();
        assert_eq!(outcome.success, 1);
        assert_eq!(client.triple_count(), 0);
    }

    #[test]
    fn render_row_substitutes_braced_placeholders() {
        let b = binding("e1", "Alice");
        let rendered = render_row("{?id} a {?label} .", &b);
        assert_eq!(rendered, "<http://ex/e1> a \"Alice\" .");
    }
}
