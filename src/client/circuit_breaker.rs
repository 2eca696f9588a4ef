//! The circuit breaker guarding calls to the RDF store, per spec §4.8:
//! `Closed → Open(since) → HalfOpen → {Closed | Open(since)}`, mutated
//! under a single mutex per spec §5's shared-mutable-state note.

use crate::config::CircuitBreakerConfig;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: State,
    consecutive_failures: u32,
    opened_at: Option<DateTime<Utc>>,
}

/// Whether the circuit breaker will currently admit a call, and — when it
/// won't — what the caller should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Rejected,
}

/// A named circuit breaker instance. `name` identifies the guarded
/// resource in logs and in [`crate::error::ClientError::FusekiCircuitOpen`].
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: State::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call before attempting the operation. `Rejected` means fail fast
    /// with `FusekiCircuitOpen` without contacting the server.
    pub fn admit(&self) -> Admission {
        let mut inner = self.inner.lock();
        match inner.state {
            State::Closed => Admission::Allowed,
            State::HalfOpen => Admission::Allowed,
            State::Open => {
                let opened_at = inner.opened_at.expect("Open state always carries opened_at");
                let elapsed = Utc::now().signed_duration_since(opened_at);
                let recovery = chrono::Duration::from_std(self.config.recovery_timeout)
                    .unwrap_or(chrono::Duration::zero());
                if elapsed >= recovery {
                    tracing::debug!(breaker = %self.name, "circuit breaker entering half-open probe");
                    inner.state = State::HalfOpen;
                    Admission::Allowed
                } else {
                    Admission::Rejected
                }
            }
        }
    }

    /// Record a failed attempt. `is_timeout` distinguishes a timeout from
    /// an HTTP 5xx/transport error, for `record_timeout_only` configs.
    pub fn record_failure(&self, is_timeout: bool) {
        if self.config.record_timeout_only && !is_timeout {
            return;
        }
        let mut inner = self.inner.lock();
        match inner.state {
            State::HalfOpen => {
                tracing::warn!(breaker = %self.name, "probe failed, reopening circuit breaker");
                inner.state = State::Open;
                inner.opened_at = Some(Utc::now());
            }
            State::Closed | State::Open => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    tracing::warn!(
                        breaker = %self.name,
                        failures = inner.consecutive_failures,
                        "circuit breaker opening"
                    );
                    inner.state = State::Open;
                    inner.opened_at = Some(Utc::now());
                }
            }
        }
    }

    /// Record a successful attempt: closes the breaker from `HalfOpen`,
    /// resets the failure counter from `Closed`.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state != State::Closed {
            tracing::debug!(breaker = %self.name, "circuit breaker closing");
        }
        inner.state = State::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    #[cfg(test)]
    fn is_open(&self) -> bool {
        matches!(self.inner.lock().state, State::Open)
    }
}
