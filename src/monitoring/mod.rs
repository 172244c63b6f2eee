/*!
 * Monitoring
 * Structured logging setup and per-thread tracing spans
 */

mod tracer;

pub use tracer::{init_tracing, init_tracing_with, thread_span};
