//! End-to-end coverage over an in-memory store: builder → planner →
//! transactional executor → named-graph management → projection →
//! batch operator → graph formatting, the way a host application would
//! chain these operations per spec §4.

use indexmap::IndexMap;
use sparql_acl::executor::{
    BatchOperator, BatchTemplate, ClearOutcome, NamedGraphManager, ProjectionConfig,
    ProjectionSource, TransactionExecutor,
};
use sparql_acl::model::clear::ClearCondition;
use sparql_acl::model::term::{ObjectValue, Subject, Triple};
use sparql_acl::{
    build_select, GraphFormat, GraphFormatter, GraphRef, MemoryRdfClient, ObjectType, QueryDsl,
    RdfClient, UpsertRequest,
};
use sparql_acl::model::upsert::{MergeStrategy, UpsertKey};
use sparql_acl::config::ProjectionProfile;

const GRAPH_TEMPLATE: &str = "urn:{ns}:{model}:{version}:{env}";

fn triple(s: &str, p: &str, o: &str) -> Triple {
    Triple::new(Subject::Iri(s.to_string()), p, ObjectValue::Literal(o.to_string()))
}

#[tokio::test]
async fn upsert_then_select_through_the_query_builder() {
    let client = MemoryRdfClient::new().unwrap();
    let executor = TransactionExecutor::new(&client, "acme", GRAPH_TEMPLATE, false, "{graph}:snapshot:{timestamp}");

    let request = UpsertRequest {
        graph: GraphRef::named("http://ex/people"),
        triples: vec![triple(
            "http://ex/alice",
            "http://www.w3.org/2000/01/rdf-schema#label",
            "Alice",
        )],
        upsert_key: UpsertKey::SP,
        custom_key_fields: vec![],
        merge_strategy: MergeStrategy::Replace,
        provenance: Some("integration-test".to_string()),
    };
    let outcome = executor.upsert(&request, Some("trace-upsert"), Some("tester")).await.unwrap();
    assert_eq!(outcome.applied, 1);
    assert!(outcome.conflicts.is_empty());

    let dsl = QueryDsl::default();
    let query = build_select(&dsl, Some("http://ex/people")).unwrap();
    let resp = client.select(&query, None, None).await.unwrap();
    assert_eq!(resp.bindings.len(), 1);
    let row = &resp.bindings[0];
    assert_eq!(row.get("o").unwrap().value, "Alice");
}

#[tokio::test]
async fn upsert_snapshot_then_conditional_clear_round_trip() {
    let client = MemoryRdfClient::new().unwrap();
    let executor = TransactionExecutor::new(&client, "acme", GRAPH_TEMPLATE, true, "{graph}:snapshot:{timestamp}");

    let request = UpsertRequest {
        graph: GraphRef::named("http://ex/people"),
        triples: vec![
            triple("http://ex/alice", "http://ex/status", "legacy"),
            triple("http://ex/bob", "http://ex/status", "legacy"),
        ],
        upsert_key: UpsertKey::S,
        custom_key_fields: vec![],
        merge_strategy: MergeStrategy::Append,
        provenance: None,
    };
    executor.upsert(&request, None, None).await.unwrap();

    // A replace on one of the two subjects should snapshot the graph
    // first, since `snapshot_before_replace` is enabled above.
    let replace = UpsertRequest {
        graph: GraphRef::named("http://ex/people"),
        triples: vec![triple("http://ex/alice", "http://ex/status", "active")],
        upsert_key: UpsertKey::SP,
        custom_key_fields: vec![],
        merge_strategy: MergeStrategy::Replace,
        provenance: None,
    };
    let outcome = executor.upsert(&replace, None, None).await.unwrap();
    assert_eq!(outcome.applied, 1);
    assert_eq!(
        client.triple_count(),
        4,
        "two replaced triples in the live graph, plus an untouched two-triple snapshot copy"
    );

    let manager = NamedGraphManager::new(&client, "{graph}:snapshot:{timestamp}");
    let condition = ClearCondition {
        predicate_whitelist: vec!["http://ex/status".to_string()],
        object_type: Some(ObjectType::Literal),
        ..Default::default()
    };
    let outcome = manager
        .conditional_clear("http://ex/people", &condition, false, 10, Some("trace-clear"))
        .await
        .unwrap();
    let ClearOutcome::Executed(result) = outcome else {
        panic!("expected an executed clear, got a dry run");
    };
    assert_eq!(result.deleted_count, 2);
}

#[tokio::test]
async fn project_a_graph_then_pass_turtle_through_the_formatter() {
    let client = MemoryRdfClient::new().unwrap();
    client
        .update(
            "INSERT DATA { GRAPH <http://ex/org> { \
                <http://ex/alice> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://ex/Person> . \
                <http://ex/alice> <http://ex/manages> <http://ex/bob> . \
                <http://ex/bob> <http://www.w3.org/2000/01/rdf-schema#label> \"Bob\" . \
            } }",
            None,
            None,
        )
        .await
        .unwrap();

    let service = sparql_acl::executor::ProjectionService::new(&client, "acme", GRAPH_TEMPLATE);
    let profile = ProjectionProfile {
        limit: 100,
        include_literals: false,
        directed: true,
        edge_predicates: vec!["http://ex/manages".to_string()],
    };
    let result = service
        .project(
            ProjectionSource::Graph(&GraphRef::named("http://ex/org")),
            &profile,
            ProjectionConfig::default(),
            Some("trace-project"),
        )
        .await
        .unwrap();
    assert_eq!(result.stats.edge_count, 1);
    assert!(result.nodes.iter().any(|n| n.id == "http://ex/alice"));

    let formatted = GraphFormatter::format_graph(
        "@prefix ex: <http://ex/> . ex:alice ex:manages ex:bob .",
        GraphFormat::Turtle,
        None,
        &sparql_acl::sparql::formatter::UnavailableJsonLdSerializer,
    )
    .unwrap();
    match formatted {
        sparql_acl::sparql::formatter::FormattedGraph::Turtle(turtle) => {
            assert!(turtle.contains("manages"));
        }
        _ => panic!("expected a turtle passthrough"),
    }
}

#[tokio::test]
async fn batch_operator_inserts_then_dry_run_leaves_store_untouched() {
    let client = MemoryRdfClient::new().unwrap();
    let operator = BatchOperator::new(&client, 2, 1);

    let mut rows = Vec::new();
    for i in 0..5 {
        let mut b = IndexMap::new();
        b.insert("id".to_string(), format!("<http://ex/item{i}>"));
        b.insert("label".to_string(), format!("\"item {i}\""));
        rows.push(b);
    }
    let template = BatchTemplate {
        pattern: "{?id} <http://www.w3.org/2000/01/rdf-schema#label> {?label} .".to_string(),
        bindings: rows,
    };

    let outcome = operator
        .apply_template(&template, "http://ex/items", Some("trace-batch"), false)
        .await
        .unwrap();
    assert_eq!(outcome.total, 5);
    assert_eq!(outcome.success, 5);
    assert_eq!(outcome.failed, 0);
    assert_eq!(client.triple_count(), 5);

    let dry_run = operator
        .apply_template(&template, "http://ex/items", None, true)
        .await
        .unwrap();
    assert_eq!(dry_run.success, 5);
    assert_eq!(client.triple_count(), 5, "dry run must not re-insert");
}
