//! Content-addressable hashing for [`crate::model::UpsertPlan`], per spec
//! §3/§4.3: a stable digest over `(graph_iri, strategy, key_discipline,
//! sorted canonical triples)`.

use crate::model::term::{ObjectValue, Subject, Triple};
use crate::model::upsert::{MergeStrategy, UpsertKey};
use sha2::{Digest, Sha256};

fn canonical_subject(s: &Subject) -> String {
    match s {
        Subject::Iri(iri) => format!("iri:{iri}"),
        Subject::Blank(label) => format!("blank:{label}"),
    }
}

fn canonical_object(o: &ObjectValue) -> String {
    match o {
        ObjectValue::Iri(iri) => format!("iri:{iri}"),
        ObjectValue::Blank(label) => format!("blank:{label}"),
        ObjectValue::Literal(value) => format!("literal:{value}"),
    }
}

/// A deterministic, order-independent textual form of one triple: used
/// both to sort triples canonically and as the hash input per triple.
pub fn canonical_triple(t: &Triple) -> String {
    format!(
        "{}\u{1}{}\u{1}{}\u{1}{}\u{1}{}",
        canonical_subject(&t.s),
        t.p,
        canonical_object(&t.o),
        t.lang.as_deref().unwrap_or(""),
        t.dtype.as_deref().unwrap_or(""),
    )
}

fn strategy_label(strategy: MergeStrategy) -> &'static str {
    match strategy {
        MergeStrategy::Replace => "replace",
        MergeStrategy::Ignore => "ignore",
        MergeStrategy::Append => "append",
    }
}

fn key_label(key: UpsertKey) -> &'static str {
    match key {
        UpsertKey::S => "s",
        UpsertKey::SP => "s+p",
        UpsertKey::Custom => "custom",
    }
}

/// Computes `request_hash`: identical `(graph_iri, strategy, key, triples)`
/// inputs (in any triple order) always produce the same digest.
pub fn request_hash(
    graph_iri: &str,
    strategy: MergeStrategy,
    key: UpsertKey,
    triples: &[Triple],
) -> String {
    let mut canonical: Vec<String> = triples.iter().map(canonical_triple).collect();
    canonical.sort();

    let mut hasher = Sha256::new();
    hasher.update(graph_iri.as_bytes());
    hasher.update(b"\0");
    hasher.update(strategy_label(strategy).as_bytes());
    hasher.update(b"\0");
    hasher.update(key_label(key).as_bytes());
    hasher.update(b"\0");
    for triple in &canonical {
        hasher.update(triple.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::term::ObjectValue;

    fn triple(s: &str, p: &str, o: &str) -> Triple {
        Triple::new(Subject::Iri(s.to_string()), p, ObjectValue::Iri(o.to_string()))
    }

    #[test]
    fn hash_is_order_independent() {
        let a = [triple("http://ex/1", "http://ex/p", "http://ex/2"), triple("http://ex/3", "http://ex/p", "http://ex/4")];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(
            request_hash("http://ex/g", MergeStrategy::Append, UpsertKey::S, &a),
            request_hash("http://ex/g", MergeStrategy::Append, UpsertKey::S, &b)
        );
    }

    #[test]
    fn hash_changes_with_strategy() {
        let triples = [triple("http://ex/1", "http://ex/p", "http://ex/2")];
        let replace = request_hash("http://ex/g", MergeStrategy::Replace, UpsertKey::S, &triples);
        let ignore = request_hash("http://ex/g", MergeStrategy::Ignore, UpsertKey::S, &triples);
        assert_ne!(replace, ignore);
    }
}
