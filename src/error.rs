//! Error taxonomy for the SPARQL anti-corruption layer.
//!
//! Every component boundary (sanitizer, builder, planner, executor, clear
//! engine, projection, batch operator, HTTP client) gets its own `thiserror`
//! enum scoped to what can actually go wrong there. [`AclError`] aggregates
//! them for callers that want a single error type, and [`ErrorInfo`] gives
//! the `{kind, message, http_status_hint, retryable, trace_id}` view callers
//! need to decide whether a failed request is safe to re-invoke.

use thiserror::Error;

/// Errors raised by [`crate::sparql::sanitizer`] and the query builder.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("invalid IRI: {0}")]
    InvalidIri(String),

    #[error("invalid literal: {0}")]
    InvalidLiteral(String),

    #[error("invalid prefix name: {0}")]
    InvalidPrefix(String),

    #[error("prefix '{0}' redeclared with a different IRI")]
    DuplicatePrefix(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Errors raised while decoding an opaque pagination cursor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CursorError {
    #[error("invalid cursor encoding")]
    InvalidCursor,
}

/// Errors raised by [`crate::planner`] while turning an upsert request into
/// a plan.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error(transparent)]
    Sanitize(#[from] SanitizeError),

    #[error("could not extract upsert key: {0}")]
    InvalidKey(String),

    #[error("unknown merge strategy: {0}")]
    UnknownStrategy(String),
}

/// Errors raised by the conditional-clear engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClearError {
    #[error(transparent)]
    Sanitize(#[from] SanitizeError),

    #[error("estimated deletes {estimated} exceed ceiling {ceiling}")]
    DeleteCeilingExceeded { estimated: u64, ceiling: u64 },

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Errors raised by graph projection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    #[error(transparent)]
    Sanitize(#[from] SanitizeError),

    #[error("requested limit {requested} exceeds profile limit {profile}")]
    LimitExceedsProfile { requested: u64, profile: u64 },

    #[error("unknown projection profile: {0}")]
    UnknownProfile(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Errors surfaced by the resilient HTTP client (and its test double).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("store query error: {0}")]
    FusekiQueryError(String),

    #[error("store connection error: {0}")]
    FusekiConnectError(String),

    #[error("circuit breaker open for '{0}'")]
    FusekiCircuitOpen(String),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("operation cancelled")]
    Cancelled,
}

impl ClientError {
    /// Maps an HTTP status code to the corresponding error kind, per
    /// spec §4.8's response-mapping table.
    pub fn from_status(status: u16, body_snippet: impl Into<String>) -> Self {
        match status {
            400 => ClientError::BadRequest(body_snippet.into()),
            401 => ClientError::Unauthenticated,
            403 => ClientError::Forbidden,
            404 => ClientError::NotFound,
            _ => ClientError::FusekiQueryError(format!(
                "status {status}: {}",
                body_snippet.into()
            )),
        }
    }

    /// Whether a request that failed with this error is safe to retry
    /// verbatim (same inputs) per spec §4.8's retry policy.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::FusekiQueryError(_)
                | ClientError::FusekiConnectError(_)
                | ClientError::Timeout(_)
        )
    }

    pub fn http_status_hint(&self) -> Option<u16> {
        match self {
            ClientError::BadRequest(_) => Some(400),
            ClientError::Unauthenticated => Some(401),
            ClientError::Forbidden => Some(403),
            ClientError::NotFound => Some(404),
            _ => None,
        }
    }
}

/// The crate-wide error type. Most public APIs return a narrower,
/// component-scoped error; `AclError` exists for callers that want to
/// handle everything uniformly (e.g. at an application boundary).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AclError {
    #[error(transparent)]
    Sanitize(#[from] SanitizeError),

    #[error(transparent)]
    Cursor(#[from] CursorError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Clear(#[from] ClearError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

/// User-visible error summary required by spec §7: every error carries
/// `{kind, message, http_status_hint, retryable, trace_id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub kind: &'static str,
    pub message: String,
    pub http_status_hint: Option<u16>,
    pub retryable: bool,
    pub trace_id: Option<String>,
}

impl AclError {
    /// Build the `ErrorInfo` view of this error. `trace_id` is threaded in
    /// by the caller since the error types themselves don't carry request
    /// context.
    pub fn info(&self, trace_id: Option<String>) -> ErrorInfo {
        let (kind, http_status_hint, retryable) = match self {
            AclError::Sanitize(SanitizeError::InvalidIri(_)) => ("InvalidIri", None, false),
            AclError::Sanitize(SanitizeError::InvalidLiteral(_)) => ("InvalidLiteral", None, false),
            AclError::Sanitize(SanitizeError::InvalidPrefix(_))
            | AclError::Sanitize(SanitizeError::DuplicatePrefix(_)) => {
                ("InvalidPrefix", None, false)
            }
            AclError::Sanitize(SanitizeError::ConstraintViolation(_)) => {
                ("ConstraintViolation", None, false)
            }
            AclError::Cursor(_) => ("InvalidCursor", None, false),
            AclError::Plan(PlanError::Sanitize(_)) => ("InvalidIri", None, false),
            AclError::Plan(PlanError::InvalidKey(_)) => ("InvalidKey", None, false),
            AclError::Plan(PlanError::UnknownStrategy(_)) => ("UnknownStrategy", None, false),
            AclError::Clear(ClearError::Sanitize(_)) => ("InvalidIri", None, false),
            AclError::Clear(ClearError::DeleteCeilingExceeded { .. }) => {
                ("DeleteCeilingExceeded", None, false)
            }
            AclError::Clear(ClearError::Client(inner)) => {
                return inner.clone().into_info(trace_id);
            }
            AclError::Projection(ProjectionError::Sanitize(_)) => ("InvalidIri", None, false),
            AclError::Projection(ProjectionError::LimitExceedsProfile { .. }) => {
                ("LimitExceedsProfile", None, false)
            }
            AclError::Projection(ProjectionError::UnknownProfile(_)) => {
                ("UnknownAlgorithm", None, false)
            }
            AclError::Projection(ProjectionError::Client(inner)) => {
                return inner.clone().into_info(trace_id);
            }
            AclError::Client(inner) => return inner.clone().into_info(trace_id),
            AclError::InvalidConfig(_) => ("InvalidConfig", None, false),
            AclError::Unexpected(_) => ("Unexpected", None, false),
        };
        ErrorInfo {
            kind,
            message: self.to_string(),
            http_status_hint,
            retryable,
            trace_id,
        }
    }
}

impl ClientError {
    fn into_info(self, trace_id: Option<String>) -> ErrorInfo {
        let kind = match &self {
            ClientError::BadRequest(_) => "BadRequest",
            ClientError::Unauthenticated => "Unauthenticated",
            ClientError::Forbidden => "Forbidden",
            ClientError::NotFound => "NotFound",
            ClientError::FusekiQueryError(_) => "FusekiQueryError",
            ClientError::FusekiConnectError(_) => "FusekiConnectError",
            ClientError::FusekiCircuitOpen(_) => "FusekiCircuitOpen",
            ClientError::Timeout(_) => "FusekiQueryError",
            ClientError::Cancelled => "Cancelled",
        };
        ErrorInfo {
            kind,
            http_status_hint: self.http_status_hint(),
            retryable: self.is_retryable(),
            message: self.to_string(),
            trace_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_spec_table() {
        assert_eq!(
            ClientError::from_status(400, "bad"),
            ClientError::BadRequest("bad".to_string())
        );
        assert_eq!(ClientError::from_status(401, ""), ClientError::Unauthenticated);
        assert_eq!(ClientError::from_status(403, ""), ClientError::Forbidden);
        assert_eq!(ClientError::from_status(404, ""), ClientError::NotFound);
        assert!(matches!(
            ClientError::from_status(503, "down"),
            ClientError::FusekiQueryError(_)
        ));
    }

    #[test]
    fn retryable_errors_are_flagged() {
        assert!(ClientError::FusekiConnectError("x".into()).is_retryable());
        assert!(!ClientError::BadRequest("x".into()).is_retryable());
        assert!(!ClientError::FusekiCircuitOpen("rdf".into()).is_retryable());
    }

    #[test]
    fn error_info_carries_trace_id() {
        let err = AclError::Client(ClientError::NotFound);
        let info = err.info(Some("trace-1".to_string()));
        assert_eq!(info.kind, "NotFound");
        assert_eq!(info.http_status_hint, Some(404));
        assert_eq!(info.trace_id.as_deref(), Some("trace-1"));
    }
}
