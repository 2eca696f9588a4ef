//! The value types every other module is built from: [`Term`] (the
//! generic SPARQL value — variable, IRI, or literal), [`Triple`] (concrete
//! RDF data written by the upsert planner), and [`GraphRef`] (a named
//! graph, referenced either directly or resolved from a model/version/env
//! template per spec §3).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A SPARQL value: a variable reference, an absolute IRI, or a literal.
///
/// `Term` is the *generic* value type used in filters, DSL fields, and
/// anywhere a value needs rendering through
/// [`crate::sparql::sanitizer::format_term`]. Concrete triple data uses the
/// narrower [`Subject`]/[`ObjectValue`] types below, which cannot
/// accidentally hold a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Term {
    /// A SPARQL variable, e.g. `?s`. The stored string includes the `?`.
    Variable(String),
    /// An absolute IRI or a CURIE (`prefix:local`), expanded at render time.
    Iri(String),
    /// A literal value, optionally tagged with a language or a datatype.
    Literal(LiteralValue),
}

impl Term {
    pub fn var(name: impl Into<String>) -> Self {
        let mut name = name.into();
        if !name.starts_with('?') && !name.starts_with('$') {
            name.insert(0, '?');
        }
        Term::Variable(name)
    }

    pub fn iri(value: impl Into<String>) -> Self {
        Term::Iri(value.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal(LiteralValue {
            value: value.into(),
            lang: None,
            dtype: None,
        })
    }

    pub fn literal_lang(value: impl Into<String>, lang: impl Into<String>) -> Self {
        Term::Literal(LiteralValue {
            value: value.into(),
            lang: Some(lang.into()),
            dtype: None,
        })
    }

    pub fn literal_typed(value: impl Into<String>, dtype: impl Into<String>) -> Self {
        Term::Literal(LiteralValue {
            value: value.into(),
            lang: None,
            dtype: Some(dtype.into()),
        })
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteralValue {
    pub value: String,
    pub lang: Option<String>,
    pub dtype: Option<String>,
}

/// The subject position of a concrete [`Triple`]: IRI or blank node, never
/// a literal or a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Subject {
    Iri(String),
    Blank(String),
}

/// The object position of a concrete [`Triple`]: IRI, blank node, or a
/// plain string value whose language/datatype (if any) lives on the
/// triple itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectValue {
    Iri(String),
    Blank(String),
    Literal(String),
}

/// One unit of RDF data, per spec §3: `{s, p, o, lang?, dtype?}`. `lang`
/// and `dtype` only apply when `o` is a literal, and are mutually
/// exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triple {
    pub s: Subject,
    /// Predicate: always an IRI.
    pub p: String,
    pub o: ObjectValue,
    pub lang: Option<String>,
    pub dtype: Option<String>,
}

impl Triple {
    pub fn new(s: Subject, p: impl Into<String>, o: ObjectValue) -> Self {
        Self {
            s,
            p: p.into(),
            o,
            lang: None,
            dtype: None,
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self.dtype = None;
        self
    }

    pub fn with_dtype(mut self, dtype: impl Into<String>) -> Self {
        self.dtype = Some(dtype.into());
        self.lang = None;
        self
    }

    /// True iff `lang`/`dtype` are only set on a literal object and are
    /// mutually exclusive, per spec §3.
    pub fn is_well_formed(&self) -> bool {
        if self.lang.is_some() && self.dtype.is_some() {
            return false;
        }
        if !matches!(self.o, ObjectValue::Literal(_)) && (self.lang.is_some() || self.dtype.is_some())
        {
            return false;
        }
        true
    }

    /// Render `s`/`p`/`o` as the generic [`Term`] values the sanitizer and
    /// builder operate on.
    pub fn as_terms(&self) -> (Term, Term, Term) {
        let s = match &self.s {
            Subject::Iri(iri) => Term::Iri(iri.clone()),
            Subject::Blank(label) => Term::Iri(format!("_:{label}")),
        };
        let p = Term::Iri(self.p.clone());
        let o = match &self.o {
            ObjectValue::Iri(iri) => Term::Iri(iri.clone()),
            ObjectValue::Blank(label) => Term::Iri(format!("_:{label}")),
            ObjectValue::Literal(value) => Term::Literal(LiteralValue {
                value: value.clone(),
                lang: self.lang.clone(),
                dtype: self.dtype.clone(),
            }),
        };
        (s, p, o)
    }
}

/// A reference to a named graph: either a fully-resolved name, or the
/// pieces needed to derive one from [`crate::config::GraphNamingConfig`]'s
/// template, per spec §3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GraphRef {
    Named { name: String },
    Templated {
        model: String,
        version: String,
        env: String,
        scenario_id: Option<String>,
    },
}

impl GraphRef {
    pub fn named(name: impl Into<String>) -> Self {
        GraphRef::Named { name: name.into() }
    }

    /// Resolve to a canonical graph IRI. For `Templated` refs, `ns` and the
    /// template string come from [`crate::config::GraphNamingConfig`]; the
    /// default template is `urn:{ns}:{model}:{version}:{env}[:{scenario_id}]`.
    pub fn resolve(&self, ns: &str, template: &str) -> String {
        match self {
            GraphRef::Named { name } => name.clone(),
            GraphRef::Templated {
                model,
                version,
                env,
                scenario_id,
            } => {
                let mut fields: HashMap<&str, String> = HashMap::new();
                fields.insert("ns", ns.to_string());
                fields.insert("model", model.clone());
                fields.insert("version", version.clone());
                fields.insert("env", env.clone());
                let mut resolved = substitute(template, &fields);
                if let Some(scenario) = scenario_id {
                    resolved.push(':');
                    resolved.push_str(scenario);
                }
                resolved
            }
        }
    }
}

fn substitute(template: &str, fields: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '{' {
            let mut key = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                key.push(c);
            }
            if let Some(value) = fields.get(key.as_str()) {
                out.push_str(value);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triple_lang_dtype_mutually_exclusive() {
        let triple = Triple::new(
            Subject::Iri("http://ex/s".into()),
            "http://ex/p",
            ObjectValue::Literal("hi".into()),
        )
        .with_lang("en")
        .with_dtype("http://www.w3.org/2001/XMLSchema#string");
        // with_dtype clears lang
        assert!(triple.lang.is_none());
        assert!(triple.is_well_formed());
    }

    #[test]
    fn lang_on_non_literal_is_malformed() {
        let mut triple = Triple::new(
            Subject::Iri("http://ex/s".into()),
            "http://ex/p",
            ObjectValue::Iri("http://ex/o".into()),
        );
        triple.lang = Some("en".to_string());
        assert!(!triple.is_well_formed());
    }

    #[test]
    fn graph_ref_resolves_template_with_scenario() {
        let g = GraphRef::Templated {
            model: "churn".to_string(),
            version: "v3".to_string(),
            env: "prod".to_string(),
            scenario_id: Some("s42".to_string()),
        };
        let resolved = g.resolve("acme", "urn:{ns}:{model}:{version}:{env}");
        assert_eq!(resolved, "urn:acme:churn:v3:prod:s42");
    }

    #[test]
    fn graph_ref_named_passthrough() {
        let g = GraphRef::named("urn:acme:fixed-graph");
        assert_eq!(g.resolve("acme", "ignored"), "urn:acme:fixed-graph");
    }
}
