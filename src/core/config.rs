/*!
 * Scheduler Configuration
 *
 * Runtime configuration for arena sizing and the hosted machine
 */

use super::errors::ConfigError;
use super::limits::{
    DEFAULT_HOST_STACK_SIZE, DEFAULT_MAX_QUEUES, DEFAULT_MAX_THREADS, MAX_QUEUES_CEILING,
    MAX_THREADS_CEILING, MIN_HOST_STACK_SIZE,
};
use serde::{Deserialize, Serialize};

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedConfig {
    /// Cap on live thread records
    pub max_threads: usize,
    /// Cap on live collaborator wait queues
    pub max_queues: usize,
    /// Stack size for OS threads backing hosted kernel threads
    pub host_stack_size: usize,
    /// Emit JSON from `init_tracing` instead of the compact format
    pub trace_json: bool,
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self {
            max_threads: DEFAULT_MAX_THREADS,
            max_queues: DEFAULT_MAX_QUEUES,
            host_stack_size: DEFAULT_HOST_STACK_SIZE,
            trace_json: false,
        }
    }
}

impl SchedConfig {
    /// Small arenas, useful for exercising the limit paths
    pub const fn compact() -> Self {
        Self {
            max_threads: 16,
            max_queues: 16,
            host_stack_size: DEFAULT_HOST_STACK_SIZE,
            trace_json: false,
        }
    }

    /// Load overrides from the environment on top of the defaults
    ///
    /// Environment variables:
    /// - KSCHED_MAX_THREADS
    /// - KSCHED_MAX_QUEUES
    /// - KSCHED_STACK_SIZE
    /// - KSCHED_TRACE_JSON (1/0/true/false)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an injectable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("KSCHED_MAX_THREADS") {
            config.max_threads = parse_usize("KSCHED_MAX_THREADS", &raw)?;
        }
        if let Some(raw) = lookup("KSCHED_MAX_QUEUES") {
            config.max_queues = parse_usize("KSCHED_MAX_QUEUES", &raw)?;
        }
        if let Some(raw) = lookup("KSCHED_STACK_SIZE") {
            config.host_stack_size = parse_usize("KSCHED_STACK_SIZE", &raw)?;
        }
        if let Some(raw) = lookup("KSCHED_TRACE_JSON") {
            config.trace_json = parse_bool("KSCHED_TRACE_JSON", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check every field against its allowed range
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("max_threads", self.max_threads, 1, MAX_THREADS_CEILING)?;
        check_range("max_queues", self.max_queues, 1, MAX_QUEUES_CEILING)?;
        check_range(
            "host_stack_size",
            self.host_stack_size,
            MIN_HOST_STACK_SIZE,
            usize::MAX,
        )?;
        Ok(())
    }
}

fn parse_usize(key: &'static str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        })
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}

fn check_range(key: &'static str, value: usize, min: usize, max: usize) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            key,
            value,
            min,
            max,
        });
    }
    Ok(())
}
