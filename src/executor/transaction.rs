//! The transactional `upsert` executor, per spec §4.4: plans, detects
//! `ignore`-strategy conflicts, optionally snapshots before a `replace`,
//! executes in plan order, and attempts best-effort rollback on failure.

use super::named_graph::NamedGraphManager;
use crate::client::RdfClient;
use crate::error::AclError;
use crate::model::term::{Term, Triple};
use crate::model::upsert::{MergeStrategy, UpsertRequest};
use crate::sparql::sanitizer::format_term;
use indexmap::IndexMap;
use std::time::Instant;
use uuid::Uuid;

/// An `ignore`-strategy key whose target already had a matching triple,
/// per spec §4.4: informational, not fatal — the `ignore` statement for
/// it still runs (and has no effect, since the triple is already present).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub key: String,
    pub triple: Triple,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub graph: String,
    pub applied: usize,
    pub statements: usize,
    pub conflicts: Vec<Conflict>,
    pub tx_id: String,
    pub duration_ms: u64,
    pub audit_id: Option<String>,
}

/// Runs [`crate::planner::plan`] against a live [`RdfClient`], per spec
/// §4.4's state machine `Planned → Executing → (Succeeded | RolledBack |
/// Failed)`.
pub struct TransactionExecutor<'a> {
    client: &'a dyn RdfClient,
    ns: String,
    graph_template: String,
    /// Step 3's "implementation-configurable" pre-execution snapshot.
    snapshot_before_replace: bool,
    snapshot_format: String,
}

impl<'a> TransactionExecutor<'a> {
    pub fn new(
        client: &'a dyn RdfClient,
        ns: impl Into<String>,
        graph_template: impl Into<String>,
        snapshot_before_replace: bool,
        snapshot_format: impl Into<String>,
    ) -> Self {
        Self {
            client,
            ns: ns.into(),
            graph_template: graph_template.into(),
            snapshot_before_replace,
            snapshot_format: snapshot_format.into(),
        }
    }

    async fn triple_exists(&self, graph_iri: &str, triple: &Triple, trace_id: Option<&str>) -> Result<bool, AclError> {
        let empty = IndexMap::new();
        let (s, p, o) = triple.as_terms();
        let s = format_term(&s, &empty)?;
        let p = format_term(&p, &empty)?;
        let o = format_term(&o, &empty)?;
        let graph = format_term(&Term::iri(graph_iri), &empty)?;
        let query = format!("SELECT * WHERE {{ GRAPH {graph} {{ {s} {p} {o} }} }} LIMIT 1");
        let resp = self.client.select(&query, None, trace_id).await?;
        Ok(!resp.bindings.is_empty())
    }

    /// `upsert(request, trace_id, actor?)`, per spec §4.4.
    pub async fn upsert(
        &self,
        request: &UpsertRequest,
        trace_id: Option<&str>,
        actor: Option<&str>,
    ) -> Result<UpsertOutcome, AclError> {
        let started = Instant::now();
        let tx_id = Uuid::new_v4().to_string();

        let plan = crate::planner::plan(request, &self.ns, &self.graph_template)?;
        tracing::debug!(tx_id = %tx_id, graph = %plan.graph_iri, statements = plan.statements.len(), "upsert planned");

        let mut conflicts = Vec::new();
        for stmt in &plan.statements {
            if stmt.strategy != MergeStrategy::Ignore {
                continue;
            }
            for triple in &stmt.triples {
                if self.triple_exists(&plan.graph_iri, triple, trace_id).await? {
                    conflicts.push(Conflict { key: stmt.key.clone(), triple: triple.clone() });
                }
            }
        }

        let snapshot_iri = if self.snapshot_before_replace && plan.statements.iter().any(|s| s.requires_snapshot) {
            let manager = NamedGraphManager::new(self.client, self.snapshot_format.clone());
            Some(manager.snapshot(&plan.graph_iri, trace_id).await?)
        } else {
            None
        };

        tracing::debug!(tx_id = %tx_id, "upsert executing");
        let mut applied = 0usize;
        for stmt in &plan.statements {
            if let Err(err) = self.client.update(&stmt.sparql, None, trace_id).await {
                tracing::warn!(tx_id = %tx_id, error = %err, "upsert statement failed, attempting rollback");
                if let Some(snapshot) = &snapshot_iri {
                    let manager = NamedGraphManager::new(self.client, self.snapshot_format.clone());
                    let restored = manager.clear(&plan.graph_iri, trace_id).await.is_ok()
                        && manager.merge(snapshot, &plan.graph_iri, trace_id).await.is_ok();
                    if restored {
                        tracing::info!(tx_id = %tx_id, snapshot = %snapshot, "rolled back from snapshot");
                    } else {
                        tracing::error!(tx_id = %tx_id, snapshot = %snapshot, "rollback failed, graph left in partial state");
                    }
                }
                return Err(AclError::Client(err));
            }
            applied += 1;
        }

        tracing::debug!(tx_id = %tx_id, applied, "upsert succeeded");
        Ok(UpsertOutcome {
            graph: plan.graph_iri,
            applied,
            statements: plan.statements.len(),
            conflicts,
            tx_id: tx_id.clone(),
            duration_ms: started.elapsed().as_millis() as u64,
            audit_id: actor.map(|a| format!("{a}:{tx_id}")),
        })
    }
}
