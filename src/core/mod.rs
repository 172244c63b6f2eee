/*!
 * Core Module
 * Fundamental scheduler types, configuration and error handling
 */

#[macro_use]
pub mod assert;
pub mod config;
pub mod errors;
pub mod limits;
pub mod types;

// Re-export for convenience
pub use config::SchedConfig;
pub use errors::*;
pub use types::*;
