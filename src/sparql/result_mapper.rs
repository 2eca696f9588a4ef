//! Typed binding mapping, per spec §4.9: turns the raw W3C SPARQL JSON
//! Results bindings into a value typed by its XSD datatype where one is
//! present, preserving the original string otherwise.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One binding value as returned by the SPARQL 1.1 JSON Results format:
/// `{"type": "uri"|"literal"|"bnode", "value": "...", "datatype"?, "xml:lang"?}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawBinding {
    #[serde(rename = "type")]
    pub binding_type: String,
    pub value: String,
    pub datatype: Option<String>,
    #[serde(rename = "xml:lang")]
    pub lang: Option<String>,
}

/// A parsed value for one variable of one solution row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
}

/// The mapped view of one raw binding, per spec §4.9:
/// `{value, raw, type, datatype?, lang?}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedBinding {
    pub value: TypedValue,
    pub raw: String,
    #[serde(rename = "type")]
    pub binding_type: String,
    pub datatype: Option<String>,
    pub lang: Option<String>,
}

const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

/// Casts `raw.value` according to `raw.datatype` when it names a known
/// XSD numeric, boolean, or dateTime type; otherwise preserves the raw
/// string unchanged.
fn cast(raw: &RawBinding) -> TypedValue {
    let Some(dtype) = &raw.datatype else {
        return TypedValue::String(raw.value.clone());
    };
    match dtype.strip_prefix(XSD) {
        Some("integer") | Some("int") | Some("long") | Some("short") => raw
            .value
            .parse::<i64>()
            .map(TypedValue::Integer)
            .unwrap_or_else(|_| TypedValue::String(raw.value.clone())),
        Some("decimal") | Some("double") | Some("float") => raw
            .value
            .parse::<f64>()
            .map(TypedValue::Float)
            .unwrap_or_else(|_| TypedValue::String(raw.value.clone())),
        Some("boolean") => raw
            .value
            .parse::<bool>()
            .map(TypedValue::Boolean)
            .unwrap_or_else(|_| TypedValue::String(raw.value.clone())),
        Some("dateTime") => DateTime::parse_from_rfc3339(&raw.value)
            .map(|dt| TypedValue::DateTime(dt.with_timezone(&Utc)))
            .unwrap_or_else(|_| TypedValue::String(raw.value.clone())),
        _ => TypedValue::String(raw.value.clone()),
    }
}

/// `ResultMapper.map_bindings(vars, bindings)`, per spec §4.9: for each
/// variable in each row, casts the binding and records the
/// {value, raw, type, datatype?, lang?} view.
pub struct ResultMapper;

impl ResultMapper {
    pub fn map_bindings(
        vars: &[String],
        bindings: &[HashMap<String, RawBinding>],
    ) -> Vec<HashMap<String, MappedBinding>> {
        bindings
            .iter()
            .map(|row| {
                vars.iter()
                    .filter_map(|var| {
                        let raw = row.get(var)?;
                        Some((
                            var.clone(),
                            MappedBinding {
                                value: cast(raw),
                                raw: raw.value.clone(),
                                binding_type: raw.binding_type.clone(),
                                datatype: raw.datatype.clone(),
                                lang: raw.lang.clone(),
                            },
                        ))
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(binding_type: &str, value: &str, datatype: Option<&str>) -> RawBinding {
        RawBinding {
            binding_type: binding_type.to_string(),
            value: value.to_string(),
            datatype: datatype.map(str::to_string),
            lang: None,
        }
    }

    #[test]
    fn casts_xsd_integer() {
        let raw = binding("literal", "42", Some("http://www.w3.org/2001/XMLSchema#integer"));
        assert_eq!(cast(&raw), TypedValue::Integer(42));
    }

    #[test]
    fn casts_xsd_boolean() {
        let raw = binding("literal", "true", Some("http://www.w3.org/2001/XMLSchema#boolean"));
        assert_eq!(cast(&raw), TypedValue::Boolean(true));
    }

    #[test]
    fn preserves_raw_string_without_datatype() {
        let raw = binding("uri", "http://ex/a", None);
        assert_eq!(cast(&raw), TypedValue::String("http://ex/a".to_string()));
    }

    #[test]
    fn map_bindings_skips_unbound_vars() {
        let mut row = HashMap::new();
        row.insert("s".to_string(), binding("uri", "http://ex/a", None));
        let vars = vec!["s".to_string(), "o".to_string()];
        let mapped = ResultMapper::map_bindings(&vars, &[row]);
        assert_eq!(mapped[0].len(), 1);
        assert!(mapped[0].contains_key("s"));
    }
}
