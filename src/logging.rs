//! Structured logging setup.
//!
//! Log *shipping* (OpenTelemetry export, file rotation) is the host
//! application's concern — spec §1 names logging itself an external
//! collaborator. This module only wires `tracing-subscriber` so the
//! crate's own `debug!`/`warn!`/`error!` instrumentation (in the HTTP
//! client, circuit breaker and retry loop) has somewhere to go during
//! development and in tests.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format for the default subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Initialize a process-wide `tracing` subscriber. Safe to call more than
/// once; subsequent calls are no-ops.
pub fn init_tracing(format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    let _ = match format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
    };
}
