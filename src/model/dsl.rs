//! The domain-specific query model the builder compiles to SPARQL: filters,
//! aggregations, and the top-level [`QueryDSL`], per spec §3.

use super::term::Term;
use crate::error::SanitizeError;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Range,
    Contains,
    Regex,
    Exists,
    IsNull,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Single(Term),
    List(Vec<Term>),
    Range { gte: Option<Term>, lte: Option<Term> },
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl Filter {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    #[serde(rename = "GROUP_CONCAT")]
    GroupConcat,
}

impl AggregateFunction {
    pub fn as_sparql(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::GroupConcat => "GROUP_CONCAT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub function: AggregateFunction,
    /// Variable being aggregated, e.g. `?s`.
    pub variable: String,
    pub alias: Option<String>,
    #[serde(default)]
    pub distinct: bool,
    /// Only meaningful for `GROUP_CONCAT`.
    pub separator: Option<String>,
}

impl Aggregation {
    /// The alias this aggregation binds to: the explicit `alias` if given,
    /// else `?{function}_{variable}` with the leading `?` stripped from
    /// `variable`.
    pub fn alias_or_default(&self) -> String {
        self.alias.clone().unwrap_or_else(|| {
            format!(
                "{}_{}",
                self.function.as_sparql().to_lowercase(),
                self.variable.trim_start_matches(['?', '$'])
            )
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Entity,
    Relation,
    Event,
    Raw,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub size: u64,
    #[serde(default)]
    pub offset: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub variable: String,
    pub direction: SortDirection,
}

/// The top-level query description the builder compiles, per spec §3.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryDsl {
    #[serde(rename = "type")]
    pub query_type: Option<QueryType>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub expand: Vec<String>,
    pub time_window: Option<TimeWindow>,
    #[serde(default)]
    pub participants: Vec<String>,
    pub page: Option<Page>,
    pub sort: Option<Sort>,
    #[serde(default)]
    pub prefixes: IndexMap<String, String>,
    #[serde(default)]
    pub aggregations: Vec<Aggregation>,
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default)]
    pub having: Vec<String>,
}

impl QueryDsl {
    pub fn query_type_or_raw(&self) -> QueryType {
        self.query_type.unwrap_or(QueryType::Raw)
    }

    /// Validates the DSL-level invariants from spec §3: when aggregations
    /// are present, every non-aggregated selected variable must appear in
    /// `group_by`, and `having` may only reference aggregate aliases or
    /// group variables.
    pub fn validate(&self) -> Result<(), SanitizeError> {
        if self.aggregations.is_empty() {
            return Ok(());
        }

        let group_vars: std::collections::HashSet<&str> =
            self.group_by.iter().map(String::as_str).collect();
        let agg_aliases: std::collections::HashSet<String> = self
            .aggregations
            .iter()
            .map(Aggregation::alias_or_default)
            .collect();

        for having in &self.having {
            let references_known = group_vars.iter().any(|g| having.contains(g))
                || agg_aliases.iter().any(|a| having.contains(a.as_str()));
            if !references_known {
                return Err(SanitizeError::ConstraintViolation(format!(
                    "HAVING clause '{having}' references neither a group variable nor an aggregate alias"
                )));
            }
        }

        Ok(())
    }
}

/// An opaque, stateless pagination continuation token, per spec §3/§6.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPage {
    pub cursor: Option<String>,
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregation_default_alias() {
        let agg = Aggregation {
            function: AggregateFunction::Count,
            variable: "?s".to_string(),
            alias: None,
            distinct: false,
            separator: None,
        };
        assert_eq!(agg.alias_or_default(), "count_s");
    }

    #[test]
    fn validate_rejects_having_on_unknown_var() {
        let dsl = QueryDsl {
            aggregations: vec![Aggregation {
                function: AggregateFunction::Count,
                variable: "?s".to_string(),
                alias: Some("count".to_string()),
                distinct: false,
                separator: None,
            }],
            group_by: vec!["?type".to_string()],
            having: vec!["?unrelated > 5".to_string()],
            ..Default::default()
        };
        assert!(dsl.validate().is_err());
    }

    #[test]
    fn validate_accepts_having_on_alias() {
        let dsl = QueryDsl {
            aggregations: vec![Aggregation {
                function: AggregateFunction::Count,
                variable: "?s".to_string(),
                alias: Some("count".to_string()),
                distinct: false,
                separator: None,
            }],
            group_by: vec!["?type".to_string()],
            having: vec!["?count > 5".to_string()],
            ..Default::default()
        };
        assert!(dsl.validate().is_ok());
    }
}
