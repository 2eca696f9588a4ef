//! Named-graph management and the conditional-clear engine, per spec §4.5.

use crate::client::RdfClient;
use crate::error::{ClearError, SanitizeError};
use crate::model::clear::{ClearCondition, ClearResult, DryRunResult, ObjectType, TriplePattern};
use crate::model::term::Term;
use crate::sparql::sanitizer::{escape_iri, escape_literal, format_term};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::time::Instant;

use crate::client::SelectResponse;
use crate::sparql::result_mapper::RawBinding;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphStatus {
    Created,
    Exists,
}

/// Either half of [`NamedGraphManager::conditional_clear`]'s result, per
/// spec §4.5 step 2/3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearOutcome {
    DryRun(DryRunResult),
    Executed(ClearResult),
}

fn render_component(value: &Option<String>, fresh_var: &str) -> Result<String, SanitizeError> {
    let empty = IndexMap::new();
    match value {
        Some(iri) => Ok(format_term(&Term::iri(iri), &empty)?.to_string()),
        None => Ok(fresh_var.to_string()),
    }
}

/// Renders one `TriplePattern`: present components render as sanitised
/// IRIs, absent components become the fixed variables `?s`/`?p`/`?o` so
/// [`render_condition_filters`]'s `FILTER`s (which reference those exact
/// names per spec §4.5) bind to them.
fn render_pattern(pattern: &TriplePattern) -> Result<String, SanitizeError> {
    let s = render_component(&pattern.subject, "?s")?;
    let p = render_component(&pattern.predicate, "?p")?;
    let o = render_component(&pattern.object, "?o")?;
    Ok(format!("{s} {p} {o} .\n"))
}

fn render_patterns(patterns: &[TriplePattern]) -> Result<String, SanitizeError> {
    if patterns.is_empty() {
        return Ok("?s ?p ?o .\n".to_string());
    }
    patterns.iter().map(render_pattern).collect()
}

fn render_condition_filters(condition: &ClearCondition) -> Result<String, SanitizeError> {
    let mut out = String::new();
    if let Some(prefix) = &condition.subject_prefix {
        let escaped = escape_literal(prefix, None)?;
        out.push_str(&format!("FILTER(STRSTARTS(STR(?s), {escaped}))\n"));
    }
    if !condition.predicate_whitelist.is_empty() {
        let empty = IndexMap::new();
        let rendered: Result<Vec<String>, SanitizeError> = condition
            .predicate_whitelist
            .iter()
            .map(|p| Ok(format_term(&Term::iri(p), &empty)?.to_string()))
            .collect();
        out.push_str(&format!("FILTER(?p IN ({}))\n", rendered?.join(", ")));
    }
    if let Some(object_type) = condition.object_type {
        out.push_str(match object_type {
            ObjectType::Iri => "FILTER(isIRI(?o))\n",
            ObjectType::Literal => "FILTER(isLiteral(?o))\n",
        });
    }
    Ok(out)
}

/// Renders a value already bound by the sample query into triple-display
/// form: an IRI binding wraps in `<>`, anything else quotes as a literal.
fn render_bound(binding: &RawBinding) -> String {
    match binding.binding_type.as_str() {
        "uri" => format!("<{}>", binding.value),
        _ => format!("\"{}\"", binding.value.replace('"', "\\\"")),
    }
}

fn render_sample_row(row: &HashMap<String, RawBinding>) -> String {
    let part = |name: &str| {
        row.get(name)
            .map(render_bound)
            .unwrap_or_else(|| "?".to_string())
    };
    format!("{} {} {}", part("s"), part("p"), part("o"))
}

/// Creates, clears, merges, and snapshots named graphs, and runs the
/// conditional-clear engine, per spec §4.5. Holds no state of its own
/// beyond the snapshot naming convention — every operation is a single
/// SPARQL UPDATE (or, for the clear engine, a dry-run SELECT pair) issued
/// through `client`.
pub struct NamedGraphManager<'a> {
    client: &'a dyn RdfClient,
    snapshot_format: String,
}

impl<'a> NamedGraphManager<'a> {
    pub fn new(client: &'a dyn RdfClient, snapshot_format: impl Into<String>) -> Self {
        Self { client, snapshot_format: snapshot_format.into() }
    }

    /// Whether any triple is currently recorded in `g`. Used to report
    /// `create`'s `created`/`exists` status; an empty-but-declared named
    /// graph reads as absent by this check (see DESIGN.md).
    async fn graph_has_triples(&self, g: &str, trace_id: Option<&str>) -> Result<bool, ClearError> {
        let iri = escape_iri(g)?;
        let query = format!("SELECT * WHERE {{ GRAPH {iri} {{ ?s ?p ?o }} }} LIMIT 1");
        let resp: SelectResponse = self.client.select(&query, None, trace_id).await?;
        Ok(!resp.bindings.is_empty())
    }

    pub async fn create(&self, g: &str, trace_id: Option<&str>) -> Result<GraphStatus, ClearError> {
        let iri = escape_iri(g)?;
        let existed = self.graph_has_triples(g, trace_id).await?;
        self.client
            .update(&format!("CREATE SILENT GRAPH {iri}"), None, trace_id)
            .await?;
        Ok(if existed { GraphStatus::Exists } else { GraphStatus::Created })
    }

    pub async fn clear(&self, g: &str, trace_id: Option<&str>) -> Result<(), ClearError> {
        let iri = escape_iri(g)?;
        self.client.update(&format!("CLEAR GRAPH {iri}"), None, trace_id).await?;
        Ok(())
    }

    pub async fn merge(&self, src: &str, tgt: &str, trace_id: Option<&str>) -> Result<(), ClearError> {
        let src_iri = escape_iri(src)?;
        let tgt_iri = escape_iri(tgt)?;
        self.client
            .update(&format!("ADD SILENT GRAPH {src_iri} TO GRAPH {tgt_iri}"), None, trace_id)
            .await?;
        Ok(())
    }

    /// `COPY SILENT GRAPH <g> TO <g>:snapshot:<UTC-timestamp>`, per spec
    /// §4.5; returns the snapshot IRI.
    pub async fn snapshot(&self, g: &str, trace_id: Option<&str>) -> Result<String, ClearError> {
        let iri = escape_iri(g)?;
        let timestamp = chrono::Utc::now().to_rfc3339();
        let snapshot_iri_str = self
            .snapshot_format
            .replace("{graph}", g)
            .replace("{timestamp}", &timestamp);
        let snapshot_iri = escape_iri(&snapshot_iri_str)?;
        self.client
            .update(&format!("COPY SILENT GRAPH {iri} TO {snapshot_iri}"), None, trace_id)
            .await?;
        Ok(snapshot_iri_str)
    }

    async fn estimate(
        &self,
        g: &str,
        graph_iri: &str,
        body: &str,
        trace_id: Option<&str>,
    ) -> Result<DryRunResult, ClearError> {
        let started = Instant::now();
        let count_query = format!("SELECT (COUNT(*) AS ?n) WHERE {{ GRAPH {graph_iri} {{ {body} }} }}");
        let count_resp = self.client.select(&count_query, None, trace_id).await?;
        let estimated_deletes = count_resp
            .bindings
            .first()
            .and_then(|row| row.get("n"))
            .and_then(|b| b.value.parse::<u64>().ok())
            .unwrap_or(0);

        let sample_query = format!("SELECT * WHERE {{ GRAPH {graph_iri} {{ {body} }} }} LIMIT 10");
        let sample_resp = self.client.select(&sample_query, None, trace_id).await?;
        let sample_triples = sample_resp.bindings.iter().map(render_sample_row).collect();

        Ok(DryRunResult {
            graph_iri: g.to_string(),
            estimated_deletes,
            sample_triples,
            estimate_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// `conditional_clear(g, condition, dry_run, max_deletes)`, per spec
    /// §4.5: the dry-run estimate always precedes a destructive DELETE,
    /// and the ceiling check happens strictly between them (§5).
    pub async fn conditional_clear(
        &self,
        g: &str,
        condition: &ClearCondition,
        dry_run: bool,
        max_deletes: u64,
        trace_id: Option<&str>,
    ) -> Result<ClearOutcome, ClearError> {
        let graph_iri = escape_iri(g)?.to_string();
        let patterns_only = render_patterns(&condition.patterns)?;
        let filters = render_condition_filters(condition)?;
        let full_body = format!("{patterns_only}{filters}");

        let estimate = self.estimate(g, &graph_iri, &full_body, trace_id).await?;

        if dry_run {
            return Ok(ClearOutcome::DryRun(estimate));
        }

        if estimate.estimated_deletes > max_deletes {
            return Err(ClearError::DeleteCeilingExceeded {
                estimated: estimate.estimated_deletes,
                ceiling: max_deletes,
            });
        }

        let started = Instant::now();
        let delete_sparql = format!(
            "DELETE {{ GRAPH {graph_iri} {{ {patterns_only} }} }}\nWHERE {{ GRAPH {graph_iri} {{ {full_body} }} }}\n"
        );
        self.client.update(&delete_sparql, None, trace_id).await?;

        Ok(ClearOutcome::Executed(ClearResult {
            deleted_count: estimate.estimated_deletes,
            execution_time_ms: started.elapsed().as_millis() as u64,
            executed: true,
        }))
    }
}
