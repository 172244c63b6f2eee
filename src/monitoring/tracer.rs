/*!
 * Structured Tracing
 * Subscriber setup for the scheduler's `tracing` events
 *
 * Features:
 * - `EnvFilter` driven by RUST_LOG (default: info)
 * - JSON output for parsing, compact output for humans
 * - One span per hosted kernel thread so events carry the thread they ran on
 */

use tracing::{info, span, Level, Span};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::core::types::ThreadId;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - KSCHED_TRACE_JSON: Enable JSON output (default: false)
///
/// Returns `false` if a global subscriber was already installed; calling
/// this more than once is harmless.
pub fn init_tracing() -> bool {
    let use_json = std::env::var("KSCHED_TRACE_JSON")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    init_tracing_with(use_json)
}

/// Same as `init_tracing` with the output format chosen by the caller
pub fn init_tracing_with(use_json: bool) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::NONE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "Structured tracing initialized");
    }
    installed
}

/// Span covering everything a hosted kernel thread does
pub fn thread_span(thread: ThreadId, name: &str) -> Span {
    span!(Level::INFO, "kthread", thread = %thread, name = name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_init_is_idempotent() {
        init_tracing_with(false);
        assert!(!init_tracing_with(true), "second install must be refused");
        assert!(!init_tracing());
    }

    #[test]
    fn test_thread_span_metadata() {
        let span = thread_span(ThreadId::new(3), "worker");
        if let Some(meta) = span.metadata() {
            assert_eq!(meta.name(), "kthread");
        }
    }
}
