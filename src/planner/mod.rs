//! The upsert planner, per spec §4.3: turns a batch of triples plus a
//! merge strategy and key discipline into an ordered, content-addressable
//! [`UpsertPlan`]. Pure — no I/O.

pub mod hash;

use crate::error::PlanError;
use crate::model::term::{GraphRef, ObjectValue, Subject, Triple};
use crate::model::upsert::{MergeStrategy, UpsertKey, UpsertPlan, UpsertRequest, UpsertStatement};
use crate::sparql::sanitizer::format_term;
use indexmap::IndexMap;

fn subject_term(s: &Subject) -> String {
    match s {
        Subject::Iri(iri) => format!("<{iri}>"),
        Subject::Blank(label) => format!("_:{label}"),
    }
}

fn object_term(o: &ObjectValue, lang: Option<&str>, dtype: Option<&str>) -> String {
    match o {
        ObjectValue::Iri(iri) => format!("<{iri}>"),
        ObjectValue::Blank(label) => format!("_:{label}"),
        ObjectValue::Literal(value) => {
            let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
            match (lang, dtype) {
                (Some(lang), _) => format!("\"{escaped}\"@{lang}"),
                (None, Some(dtype)) => format!("\"{escaped}\"^^<{dtype}>"),
                (None, None) => format!("\"{escaped}\""),
            }
        }
    }
}

fn render_triple(t: &Triple) -> String {
    format!(
        "{} <{}> {} .",
        subject_term(&t.s),
        t.p,
        object_term(&t.o, t.lang.as_deref(), t.dtype.as_deref())
    )
}

fn normalize_field(field: &str) -> Option<&'static str> {
    match field {
        "s" | "subject" => Some("s"),
        "p" | "predicate" => Some("p"),
        "o" | "object" => Some("o"),
        _ => None,
    }
}

/// Extracts the group key for one triple under the given discipline, per
/// spec §4.3 step 2.
fn group_key(
    triple: &Triple,
    upsert_key: UpsertKey,
    custom_key_fields: &[String],
) -> Result<String, PlanError> {
    match upsert_key {
        UpsertKey::S => Ok(subject_term(&triple.s)),
        UpsertKey::SP => Ok(format!("{}|{}", subject_term(&triple.s), triple.p)),
        UpsertKey::Custom => {
            if custom_key_fields.is_empty() {
                return Err(PlanError::InvalidKey(
                    "custom key discipline requires at least one key field".to_string(),
                ));
            }
            let mut parts = Vec::with_capacity(custom_key_fields.len());
            for field in custom_key_fields {
                let part = match normalize_field(field) {
                    Some("s") => subject_term(&triple.s),
                    Some("p") => triple.p.clone(),
                    Some("o") => object_term(&triple.o, triple.lang.as_deref(), triple.dtype.as_deref()),
                    _ => {
                        return Err(PlanError::InvalidKey(format!(
                            "unknown custom key field: {field}"
                        )))
                    }
                };
                parts.push(part);
            }
            Ok(parts.join("|"))
        }
    }
}

/// A human-readable key label for diagnostics, independent of the
/// SPARQL-syntax-shaped `group_key` above.
fn key_label(triple: &Triple, upsert_key: UpsertKey, custom_key_fields: &[String]) -> String {
    match upsert_key {
        UpsertKey::S => subject_term(&triple.s),
        UpsertKey::SP => format!("{}|{}", subject_term(&triple.s), triple.p),
        UpsertKey::Custom => custom_key_fields.join(","),
    }
}

/// Renders the WHERE-position of the key-matching pattern: key positions
/// are the group's fixed values; every other position is a fresh
/// variable, so `replace` removes all prior triples sharing the key
/// regardless of their other content.
fn key_matching_pattern(
    representative: &Triple,
    upsert_key: UpsertKey,
    custom_key_fields: &[String],
) -> String {
    let is_key = |position: &str| -> bool {
        match upsert_key {
            UpsertKey::S => position == "s",
            UpsertKey::SP => position == "s" || position == "p",
            UpsertKey::Custom => custom_key_fields
                .iter()
                .any(|f| normalize_field(f) == Some(position)),
        }
    };

    let s = if is_key("s") {
        subject_term(&representative.s)
    } else {
        "?__s".to_string()
    };
    let p = if is_key("p") {
        format!("<{}>", representative.p)
    } else {
        "?__p".to_string()
    };
    let o = if is_key("o") {
        object_term(
            &representative.o,
            representative.lang.as_deref(),
            representative.dtype.as_deref(),
        )
    } else {
        "?__o".to_string()
    };
    format!("{s} {p} {o} .")
}

fn render_replace(graph_iri: &str, key: &str, triples: &[Triple], upsert_key: UpsertKey, custom_key_fields: &[String]) -> UpsertStatement {
    let pattern = key_matching_pattern(&triples[0], upsert_key, custom_key_fields);
    let insert_block: String = triples.iter().map(|t| format!("    {}\n", render_triple(t))).collect();
    let sparql = format!(
        "DELETE {{ GRAPH <{graph_iri}> {{ {pattern} }} }}\nINSERT {{ GRAPH <{graph_iri}> {{\n{insert_block}  }} }}\nWHERE {{ GRAPH <{graph_iri}> {{ {pattern} }} }}\n"
    );
    UpsertStatement {
        sparql,
        key: key.to_string(),
        strategy: MergeStrategy::Replace,
        triples: triples.to_vec(),
        requires_snapshot: true,
    }
}

fn render_ignore(graph_iri: &str, key: &str, triples: &[Triple]) -> Vec<UpsertStatement> {
    triples
        .iter()
        .map(|t| {
            let rendered = render_triple(t);
            let sparql = format!(
                "INSERT {{ GRAPH <{graph_iri}> {{ {rendered} }} }}\nWHERE {{ FILTER NOT EXISTS {{ GRAPH <{graph_iri}> {{ {rendered} }} }} }}\n"
            );
            UpsertStatement {
                sparql,
                key: key.to_string(),
                strategy: MergeStrategy::Ignore,
                triples: vec![t.clone()],
                requires_snapshot: false,
            }
        })
        .collect()
}

fn render_append(graph_iri: &str, key: &str, triples: &[Triple]) -> UpsertStatement {
    let insert_block: String = triples.iter().map(|t| format!("    {}\n", render_triple(t))).collect();
    let sparql = format!("INSERT DATA {{ GRAPH <{graph_iri}> {{\n{insert_block}  }} }}\n");
    UpsertStatement {
        sparql,
        key: key.to_string(),
        strategy: MergeStrategy::Append,
        triples: triples.to_vec(),
        requires_snapshot: false,
    }
}

/// `plan(request) → UpsertPlan`, per spec §4.3.
pub fn plan(request: &UpsertRequest, ns: &str, graph_template: &str) -> Result<UpsertPlan, PlanError> {
    let graph_iri = request.graph.resolve(ns, graph_template);

    // Also verify the resolved graph IRI and every triple term are
    // syntactically valid, routing through the sanitizer per spec §4.1.
    format_term(&crate::model::term::Term::iri(&graph_iri), &IndexMap::new())?;
    for triple in &request.triples {
        let (s, p, o) = triple.as_terms();
        format_term(&s, &IndexMap::new())?;
        format_term(&p, &IndexMap::new())?;
        format_term(&o, &IndexMap::new())?;
    }

    let mut groups: IndexMap<String, Vec<Triple>> = IndexMap::new();
    for triple in &request.triples {
        let key = group_key(triple, request.upsert_key, &request.custom_key_fields)?;
        groups.entry(key).or_default().push(triple.clone());
    }

    let mut statements = Vec::new();
    for triples in groups.values() {
        match request.merge_strategy {
            MergeStrategy::Replace => statements.push(render_replace(
                &graph_iri,
                &key_label(&triples[0], request.upsert_key, &request.custom_key_fields),
                triples,
                request.upsert_key,
                &request.custom_key_fields,
            )),
            MergeStrategy::Ignore => statements.extend(render_ignore(
                &graph_iri,
                &key_label(&triples[0], request.upsert_key, &request.custom_key_fields),
                triples,
            )),
            MergeStrategy::Append => statements.push(render_append(
                &graph_iri,
                &key_label(&triples[0], request.upsert_key, &request.custom_key_fields),
                triples,
            )),
        }
    }

    let request_hash = hash::request_hash(
        &graph_iri,
        request.merge_strategy,
        request.upsert_key,
        &request.triples,
    );

    Ok(UpsertPlan {
        graph_iri,
        statements,
        request_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::term::ObjectValue;

    fn triple(s: &str, p: &str, o: &str) -> Triple {
        Triple::new(Subject::Iri(s.to_string()), p, ObjectValue::Literal(o.to_string()))
    }

    #[test]
    fn s3_replace_groups_by_s_plus_p_and_emits_one_statement() {
        let request = UpsertRequest {
            graph: GraphRef::named("http://ex/g"),
            triples: vec![
                triple("http://ex/e1", "http://www.w3.org/2000/01/rdf-schema#label", "A"),
                triple("http://ex/e1", "http://www.w3.org/2000/01/rdf-schema#label", "B"),
            ],
            upsert_key: UpsertKey::SP,
            custom_key_fields: vec![],
            merge_strategy: MergeStrategy::Replace,
            provenance: None,
        };
        let result = plan(&request, "acme", "urn:{ns}:{model}:{version}:{env}").unwrap();
        assert_eq!(result.statements.len(), 1);
        let stmt = &result.statements[0];
        assert!(stmt.sparql.contains("DELETE {"));
        assert!(stmt.sparql.contains("INSERT {"));
        assert!(stmt.requires_snapshot);
        assert_eq!(stmt.triples.len(), 2);
    }

    #[test]
    fn ignore_emits_one_statement_per_triple() {
        let request = UpsertRequest {
            graph: GraphRef::named("http://ex/g"),
            triples: vec![
                triple("http://ex/e1", "http://ex/p", "A"),
                triple("http://ex/e2", "http://ex/p", "B"),
            ],
            upsert_key: UpsertKey::S,
            custom_key_fields: vec![],
            merge_strategy: MergeStrategy::Ignore,
            provenance: None,
        };
        let result = plan(&request, "acme", "urn:{ns}:{model}:{version}:{env}").unwrap();
        assert_eq!(result.statements.len(), 2);
        assert!(result.statements.iter().all(|s| s.sparql.contains("FILTER NOT EXISTS")));
        assert!(!result.statements.iter().any(|s| s.requires_snapshot));
    }

    #[test]
    fn append_emits_one_insert_data_per_group() {
        let request = UpsertRequest {
            graph: GraphRef::named("http://ex/g"),
            triples: vec![
                triple("http://ex/e1", "http://ex/p", "A"),
                triple("http://ex/e1", "http://ex/p", "B"),
            ],
            upsert_key: UpsertKey::SP,
            custom_key_fields: vec![],
            merge_strategy: MergeStrategy::Append,
            provenance: None,
        };
        let result = plan(&request, "acme", "urn:{ns}:{model}:{version}:{env}").unwrap();
        assert_eq!(result.statements.len(), 1);
        assert!(result.statements[0].sparql.starts_with("INSERT DATA"));
        assert!(!result.statements[0].sparql.contains("DELETE"));
    }

    #[test]
    fn request_hash_is_stable_across_equivalent_requests() {
        let request = UpsertRequest {
            graph: GraphRef::named("http://ex/g"),
            triples: vec![triple("http://ex/e1", "http://ex/p", "A")],
            upsert_key: UpsertKey::S,
            custom_key_fields: vec![],
            merge_strategy: MergeStrategy::Append,
            provenance: None,
        };
        let a = plan(&request, "acme", "urn:{ns}:{model}:{version}:{env}").unwrap();
        let b = plan(&request, "acme", "urn:{ns}:{model}:{version}:{env}").unwrap();
        assert_eq!(a.request_hash, b.request_hash);
    }

    #[test]
    fn custom_key_with_unknown_field_fails() {
        let request = UpsertRequest {
            graph: GraphRef::named("http://ex/g"),
            triples: vec![triple("http://ex/e1", "http://ex/p", "A")],
            upsert_key: UpsertKey::Custom,
            custom_key_fields: vec!["nonsense".to_string()],
            merge_strategy: MergeStrategy::Append,
            provenance: None,
        };
        assert!(matches!(
            plan(&request, "acme", "urn:{ns}:{model}:{version}:{env}"),
            Err(PlanError::InvalidKey(_))
        ));
    }
}
