//! Opaque pagination cursors, per spec §3/§6: `base64url(JSON({"value":
//! string, "type": "uri"|"literal"}))` with stable key order.

use crate::error::CursorError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorValueType {
    Uri,
    Literal,
}

/// The decoded contents of a [`crate::model::CursorPage`]'s `cursor`
/// field: the last-seen sort-key value and whether it was an IRI or a
/// literal, so the builder knows whether to quote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorValue {
    pub value: String,
    #[serde(rename = "type")]
    pub value_type: CursorValueType,
}

impl CursorValue {
    pub fn uri(value: impl Into<String>) -> Self {
        CursorValue {
            value: value.into(),
            value_type: CursorValueType::Uri,
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        CursorValue {
            value: value.into(),
            value_type: CursorValueType::Literal,
        }
    }
}

/// Encodes a cursor value. Field declaration order (`value` then `type`)
/// gives a stable key order, satisfying the "canonical JSON" requirement
/// without a separate canonicalization pass.
pub fn encode_cursor(value: &CursorValue) -> Result<String, CursorError> {
    let json = serde_json::to_vec(value).map_err(|_| CursorError::InvalidCursor)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

pub fn decode_cursor(cursor: &str) -> Result<CursorValue, CursorError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| CursorError::InvalidCursor)?;
    serde_json::from_slice(&bytes).map_err(|_| CursorError::InvalidCursor)
}
