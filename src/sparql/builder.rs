//! DSL → SPARQL compiler, per spec §4.2. Pure functions: given a
//! [`QueryDsl`] (and an optional target graph), produce a complete query
//! string. Every value that crosses into query text goes through
//! [`crate::sparql::sanitizer`].

use super::cursor::{CursorValue, CursorValueType};
use super::sanitizer::{escape_literal, format_term, validate_prefix};
use crate::error::SanitizeError;
use crate::model::dsl::{CursorPage, Filter, FilterOperator, FilterValue, QueryDsl, QueryType};
use crate::model::term::Term;
use indexmap::IndexMap;

const BUILTIN_PREFIXES: &[(&str, &str)] = &[
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("prov", "http://www.w3.org/ns/prov#"),
    ("sf", "urn:sf:"),
];

/// Merges the built-in prefix set with `dsl.prefixes`, validating every
/// custom prefix name and failing with `InvalidPrefix`/`DuplicatePrefix`
/// on a malformed name or a redeclaration with a different IRI, per spec
/// §4.2 step 1.
fn merge_prefixes(dsl: &QueryDsl) -> Result<IndexMap<String, String>, SanitizeError> {
    let mut merged: IndexMap<String, String> = BUILTIN_PREFIXES
        .iter()
        .map(|(p, iri)| (p.to_string(), iri.to_string()))
        .collect();

    for (prefix, iri) in &dsl.prefixes {
        if !validate_prefix(prefix) {
            return Err(SanitizeError::InvalidPrefix(prefix.clone()));
        }
        match merged.get(prefix) {
            Some(existing) if existing != iri => {
                return Err(SanitizeError::DuplicatePrefix(prefix.clone()));
            }
            Some(_) => {}
            None => {
                merged.insert(prefix.clone(), iri.clone());
            }
        }
    }
    Ok(merged)
}

fn render_prefixes(prefixes: &IndexMap<String, String>) -> String {
    prefixes
        .iter()
        .map(|(p, iri)| format!("PREFIX {p}: <{iri}>\n"))
        .collect()
}

/// Turns a filter/time-window field name into a legal SPARQL variable: an
/// existing `?var`/`$var` is used as-is (assumed bound elsewhere, e.g. by
/// `expand`); anything else (a predicate CURIE or IRI) becomes
/// `?{sanitized field}`, with non-identifier characters replaced by `_`.
fn field_to_var(field: &str) -> String {
    if field.starts_with('?') || field.starts_with('$') {
        return format!("?{}", field.trim_start_matches(['?', '$']));
    }
    let sanitized: String = field
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("?{sanitized}")
}

/// Emits a binding triple `?s <field> ?var .` for a predicate-shaped
/// filter field, so the filter variable is defined. No-op for fields that
/// already name a bound variable.
fn field_binding(
    field: &str,
    var: &str,
    prefixes: &IndexMap<String, String>,
) -> Result<Option<String>, SanitizeError> {
    if field.starts_with('?') || field.starts_with('$') {
        return Ok(None);
    }
    let pred = format_term(&Term::iri(field), prefixes)?;
    Ok(Some(format!("?s {pred} {var} .\n")))
}

fn render_filter(
    filter: &Filter,
    var: &str,
    prefixes: &IndexMap<String, String>,
) -> Result<String, SanitizeError> {
    let render_value = |t: &Term| -> Result<String, SanitizeError> {
        Ok(format_term(t, prefixes)?.to_string())
    };
    Ok(match (&filter.operator, &filter.value) {
        (FilterOperator::Eq, FilterValue::Single(v)) => format!("FILTER({var} = {})", render_value(v)?),
        (FilterOperator::Ne, FilterValue::Single(v)) => format!("FILTER({var} != {})", render_value(v)?),
        (FilterOperator::Lt, FilterValue::Single(v)) => format!("FILTER({var} < {})", render_value(v)?),
        (FilterOperator::Lte, FilterValue::Single(v)) => format!("FILTER({var} <= {})", render_value(v)?),
        (FilterOperator::Gt, FilterValue::Single(v)) => format!("FILTER({var} > {})", render_value(v)?),
        (FilterOperator::Gte, FilterValue::Single(v)) => format!("FILTER({var} >= {})", render_value(v)?),
        (FilterOperator::In, FilterValue::List(values)) => {
            let rendered: Result<Vec<String>, SanitizeError> = values.iter().map(render_value).collect();
            format!("FILTER({var} IN ({}))", rendered?.join(", "))
        }
        (FilterOperator::Range, FilterValue::Range { gte, lte }) => {
            let mut clauses = Vec::new();
            if let Some(gte) = gte {
                clauses.push(format!("{var} >= {}", render_value(gte)?));
            }
            if let Some(lte) = lte {
                clauses.push(format!("{var} <= {}", render_value(lte)?));
            }
            format!("FILTER({})", clauses.join(" && "))
        }
        (FilterOperator::Contains, FilterValue::Text(text)) => {
            format!("FILTER(CONTAINS(STR({var}), {}))", escape_literal(text, None)?)
        }
        (FilterOperator::Regex, FilterValue::Text(pattern)) => {
            format!("FILTER(REGEX(STR({var}), {}))", escape_literal(pattern, None)?)
        }
        (FilterOperator::Exists, _) => format!("FILTER(BOUND({var}))"),
        (FilterOperator::IsNull, _) => format!("FILTER(!BOUND({var}))"),
        (op, val) => {
            return Err(SanitizeError::ConstraintViolation(format!(
                "operator {op:?} is incompatible with value shape {val:?}"
            )))
        }
    })
}

/// Renders the base graph pattern for `dsl.type`, per spec §4.2 step 3.
/// `participants`, when non-empty, restricts the subject to the given
/// IRIs for `event`-typed queries — the source spec leaves the exact
/// binding shape unspecified; this treats participants as candidate
/// subjects (see DESIGN.md).
fn render_base_pattern(dsl: &QueryDsl, prefixes: &IndexMap<String, String>) -> Result<String, SanitizeError> {
    let mut body = String::from("?s ?p ?o .\n");
    match dsl.query_type_or_raw() {
        QueryType::Relation => {
            body.push_str("FILTER(isIRI(?o))\n");
        }
        QueryType::Event if !dsl.participants.is_empty() => {
            let rendered: Result<Vec<String>, SanitizeError> = dsl
                .participants
                .iter()
                .map(|p| Ok(format_term(&Term::iri(p), prefixes)?.to_string()))
                .collect();
            body.push_str(&format!("FILTER(?s IN ({}))\n", rendered?.join(", ")));
        }
        _ => {}
    }
    Ok(body)
}

/// Renders `OPTIONAL { ?s <pred> ?exp0 }` for each `dsl.expand` entry, per
/// spec §4.2.
fn render_expand(dsl: &QueryDsl, prefixes: &IndexMap<String, String>) -> Result<String, SanitizeError> {
    let mut out = String::new();
    for (i, pred) in dsl.expand.iter().enumerate() {
        let pred_fragment = format_term(&Term::iri(pred), prefixes)?;
        out.push_str(&format!("OPTIONAL {{ ?s {pred_fragment} ?exp{i} }}\n"));
    }
    Ok(out)
}

/// Renders every `dsl.filters` entry, prefixing each predicate-shaped
/// filter with the binding triple that defines its variable.
fn render_filters(dsl: &QueryDsl, prefixes: &IndexMap<String, String>) -> Result<(String, String), SanitizeError> {
    let mut bindings = String::new();
    let mut filters = String::new();
    for filter in &dsl.filters {
        let var = field_to_var(&filter.field);
        if let Some(binding) = field_binding(&filter.field, &var, prefixes)? {
            bindings.push_str(&binding);
        }
        filters.push_str(&render_filter(filter, &var, prefixes)?);
        filters.push('\n');
    }
    Ok((bindings, filters))
}

fn render_time_window(dsl: &QueryDsl) -> Result<String, SanitizeError> {
    match &dsl.time_window {
        None => Ok(String::new()),
        Some(window) => {
            let from = escape_literal(&window.from.to_rfc3339(), Some("http://www.w3.org/2001/XMLSchema#dateTime"))?;
            let to = escape_literal(&window.to.to_rfc3339(), Some("http://www.w3.org/2001/XMLSchema#dateTime"))?;
            Ok(format!("FILTER(?t >= {from} && ?t <= {to})\n"))
        }
    }
}

/// Builds the full `WHERE { ... }` body (without the surrounding braces),
/// optionally wrapped in `GRAPH <g> { ... }`.
fn render_where_body(
    dsl: &QueryDsl,
    graph: Option<&str>,
    prefixes: &IndexMap<String, String>,
) -> Result<String, SanitizeError> {
    let (filter_bindings, filter_clauses) = render_filters(dsl, prefixes)?;
    let mut inner = String::new();
    inner.push_str(&filter_bindings);
    inner.push_str(&render_base_pattern(dsl, prefixes)?);
    inner.push_str(&render_expand(dsl, prefixes)?);
    inner.push_str(&filter_clauses);
    inner.push_str(&render_time_window(dsl)?);

    Ok(match graph {
        Some(g) => {
            let g = format_term(&Term::iri(g), prefixes)?;
            format!("GRAPH {g} {{\n{inner}}}\n")
        }
        None => inner,
    })
}

fn render_select_head(dsl: &QueryDsl) -> String {
    if dsl.aggregations.is_empty() {
        return "SELECT *".to_string();
    }
    let mut parts: Vec<String> = dsl
        .aggregations
        .iter()
        .map(|agg| {
            let distinct = if agg.distinct { "DISTINCT " } else { "" };
            let separator = agg
                .separator
                .as_ref()
                .map(|s| format!("; SEPARATOR=\"{}\"", s.replace('"', "\\\"")))
                .unwrap_or_default();
            format!(
                "({}({distinct}{}{separator}) AS ?{})",
                agg.function.as_sparql(),
                agg.variable,
                agg.alias_or_default()
            )
        })
        .collect();
    parts.extend(dsl.group_by.iter().cloned());
    format!("SELECT {}", parts.join(" "))
}

fn render_group_having(dsl: &QueryDsl) -> String {
    let mut out = String::new();
    if !dsl.group_by.is_empty() {
        out.push_str(&format!("GROUP BY {}\n", dsl.group_by.join(" ")));
    }
    if !dsl.having.is_empty() {
        out.push_str(&format!("HAVING({})\n", dsl.having.join(" && ")));
    }
    out
}

fn render_tail(dsl: &QueryDsl) -> String {
    let mut out = String::new();
    if let Some(sort) = &dsl.sort {
        let dir = match sort.direction {
            crate::model::dsl::SortDirection::Asc => "ASC",
            crate::model::dsl::SortDirection::Desc => "DESC",
        };
        out.push_str(&format!("ORDER BY {dir}({})\n", sort.variable));
    }
    if let Some(page) = &dsl.page {
        out.push_str(&format!("LIMIT {}\n", page.size));
        if page.offset > 0 {
            out.push_str(&format!("OFFSET {}\n", page.offset));
        }
    }
    out
}

/// `build_select(dsl, graph?)`, per spec §4.2.
pub fn build_select(dsl: &QueryDsl, graph: Option<&str>) -> Result<String, SanitizeError> {
    dsl.validate()?;
    let prefixes = merge_prefixes(dsl)?;
    let mut query = render_prefixes(&prefixes);
    query.push('\n');
    query.push_str(&render_select_head(dsl));
    query.push('\n');
    query.push_str("WHERE {\n");
    query.push_str(&render_where_body(dsl, graph, &prefixes)?);
    query.push_str("}\n");
    query.push_str(&render_group_having(dsl));
    query.push_str(&render_tail(dsl));
    Ok(query)
}

/// `build_construct(dsl, graph?)`, per spec §4.2: a generic, DSL-driven
/// CONSTRUCT over the same body `build_select` would emit.
pub fn build_construct(dsl: &QueryDsl, graph: Option<&str>) -> Result<String, SanitizeError> {
    dsl.validate()?;
    let prefixes = merge_prefixes(dsl)?;
    let mut query = render_prefixes(&prefixes);
    query.push('\n');
    query.push_str("CONSTRUCT {\n  ?s ?p ?o .\n}\n");
    query.push_str("WHERE {\n");
    query.push_str(&render_where_body(dsl, graph, &prefixes)?);
    query.push_str("}\n");
    query.push_str(&render_tail(dsl));
    Ok(query)
}

/// `build_select_with_cursor(dsl, cursor_page, sort_key)`, per spec §4.2:
/// a cursor-stable pagination query. Requests `size + 1` rows so the
/// caller can detect `has_more` by discarding the extra row.
pub fn build_select_with_cursor(
    dsl: &QueryDsl,
    cursor_page: &CursorPage,
    sort_key: Option<&str>,
) -> Result<String, SanitizeError> {
    dsl.validate()?;
    let prefixes = merge_prefixes(dsl)?;
    let sort_key = sort_key.unwrap_or("?s");

    let mut query = render_prefixes(&prefixes);
    query.push('\n');
    query.push_str(&format!("SELECT DISTINCT {sort_key}\n"));
    query.push_str("WHERE {\n");

    let (filter_bindings, filter_clauses) = render_filters(dsl, &prefixes)?;
    let mut inner = String::new();
    inner.push_str(&filter_bindings);
    inner.push_str(&render_base_pattern(dsl, &prefixes)?);
    inner.push_str(&filter_clauses);
    inner.push_str(&render_time_window(dsl)?);

    if let Some(cursor) = &cursor_page.cursor {
        let decoded = super::cursor::decode_cursor(cursor).map_err(|_| {
            SanitizeError::ConstraintViolation("invalid pagination cursor".to_string())
        })?;
        inner.push_str(&render_cursor_filter(sort_key, &decoded)?);
    }
    query.push_str(&inner);
    query.push_str("}\n");
    query.push_str(&format!("ORDER BY {sort_key}\n"));
    query.push_str(&format!("LIMIT {}\n", cursor_page.size + 1));
    Ok(query)
}

fn render_cursor_filter(sort_key: &str, cursor: &CursorValue) -> Result<String, SanitizeError> {
    let escaped = escape_literal(&cursor.value, None)?;
    Ok(match cursor.value_type {
        CursorValueType::Uri => format!("FILTER(STR({sort_key}) > {escaped})\n"),
        CursorValueType::Literal => format!("FILTER({sort_key} > {escaped})\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::dsl::{Aggregation, AggregateFunction, Page};

    fn raw_dsl_with_contains_filter() -> QueryDsl {
        QueryDsl {
            query_type: Some(QueryType::Raw),
            filters: vec![Filter::new(
                "rdfs:label",
                FilterOperator::Contains,
                FilterValue::Text("demo".to_string()),
            )],
            page: Some(Page { size: 5, offset: 0 }),
            ..Default::default()
        }
    }

    #[test]
    fn s1_select_contains_filter_and_limit() {
        let dsl = raw_dsl_with_contains_filter();
        let query = build_select(&dsl, Some("http://ex/g")).unwrap();
        assert!(query.contains("GRAPH <http://ex/g> {"));
        assert!(query.contains("?s ?p ?o .\nFILTER(CONTAINS(STR(?rdfs_label), \"demo\"))"));
        assert!(query.contains("LIMIT 5"));
    }

    #[test]
    fn s2_aggregation_head_and_no_order_by() {
        let dsl = QueryDsl {
            aggregations: vec![Aggregation {
                function: AggregateFunction::Count,
                variable: "?s".to_string(),
                alias: Some("count".to_string()),
                distinct: false,
                separator: None,
            }],
            group_by: vec!["?type".to_string()],
            ..Default::default()
        };
        let query = build_select(&dsl, None).unwrap();
        assert!(query.contains("SELECT (COUNT(?s) AS ?count) ?type"));
        assert!(query.contains("GROUP BY ?type"));
        assert!(!query.contains("ORDER BY"));
    }

    #[test]
    fn build_select_is_deterministic() {
        let dsl = raw_dsl_with_contains_filter();
        assert_eq!(
            build_select(&dsl, Some("http://ex/g")).unwrap(),
            build_select(&dsl, Some("http://ex/g")).unwrap()
        );
    }

    #[test]
    fn duplicate_prefix_with_different_iri_fails() {
        let mut dsl = QueryDsl::default();
        dsl.prefixes.insert("rdfs".to_string(), "http://example.org/not-rdfs#".to_string());
        assert!(matches!(
            build_select(&dsl, None),
            Err(SanitizeError::DuplicatePrefix(_))
        ));
    }

    #[test]
    fn cursor_query_uses_discriminated_filter() {
        let dsl = QueryDsl::default();
        let cursor = super::super::cursor::encode_cursor(&CursorValue::uri("http://ex/e012")).unwrap();
        let page = CursorPage { cursor: Some(cursor), size: 2 };
        let query = build_select_with_cursor(&dsl, &page, None).unwrap();
        assert!(query.contains("SELECT DISTINCT ?s"));
        assert!(query.contains("FILTER(STR(?s) > \"http://ex/e012\")"));
        assert!(query.contains("LIMIT 3"));
    }

    #[test]
    fn cursor_query_without_cursor_has_no_filter() {
        let dsl = QueryDsl::default();
        let page = CursorPage { cursor: None, size: 2 };
        let query = build_select_with_cursor(&dsl, &page, None).unwrap();
        assert!(!query.contains("FILTER"));
    }
}
