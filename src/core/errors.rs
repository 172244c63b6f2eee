/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::limits::EINTR;
use super::types::{QueueId, ThreadId};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Common result type for scheduler operations
pub type SchedResult<T> = Result<T, SchedError>;

/// Recoverable scheduler errors
///
/// Invariant violations are not represented here; those are fatal
/// assertions (see `kassert!`).
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SchedError {
    #[error("Sleep interrupted: thread {0} was cancelled")]
    #[diagnostic(
        code(sched::interrupted),
        help("Abandon the wait and unwind; the waiting thread has been cancelled.")
    )]
    Interrupted(ThreadId),

    #[error("Thread limit reached ({0} live threads)")]
    #[diagnostic(
        code(sched::thread_limit),
        help("Release exited threads or raise max_threads.")
    )]
    ThreadLimit(usize),

    #[error("Wait queue limit reached ({0} live queues)")]
    #[diagnostic(
        code(sched::queue_limit),
        help("Destroy unused wait queues or raise max_queues.")
    )]
    QueueLimit(usize),

    #[error("Failed to spawn host thread: {0}")]
    #[diagnostic(
        code(sched::spawn_failed),
        help("The host OS refused to create a backing thread. Check stack size and process limits.")
    )]
    Spawn(String),
}

impl SchedError {
    /// Whether this is the cancellation condition surfaced by cancellable sleeps
    #[inline]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, SchedError::Interrupted(_))
    }

    /// Negative-errno style code for collaborators that speak errno
    pub fn errno(&self) -> Option<i32> {
        match self {
            SchedError::Interrupted(_) => Some(-EINTR),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SchedError {
    fn from(err: std::io::Error) -> Self {
        SchedError::Spawn(err.to_string())
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    #[diagnostic(
        code(config::invalid_value),
        help("Expected an unsigned integer or a boolean (1/0/true/false).")
    )]
    InvalidValue { key: &'static str, value: String },

    #[error("{key} out of range: {value} (allowed {min}..={max})")]
    #[diagnostic(code(config::out_of_range))]
    OutOfRange {
        key: &'static str,
        value: usize,
        min: usize,
        max: usize,
    },
}

/// A failed structural check of the run queue / wait queue / thread arena
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum InvariantViolation {
    #[error("Thread {thread} has wait channel {channel:?} but linked={linked}")]
    #[diagnostic(code(sched::invariant::channel_link))]
    ChannelLinkMismatch {
        thread: ThreadId,
        channel: Option<QueueId>,
        linked: bool,
    },

    #[error("Thread {thread} in state {state} is on no queue and is not current")]
    #[diagnostic(
        code(sched::invariant::lost_thread),
        help("This thread can never run again.")
    )]
    LostThread { thread: ThreadId, state: String },

    #[error("Thread {thread} is reachable from {queue} but its wait channel is {channel:?}")]
    #[diagnostic(code(sched::invariant::wrong_queue))]
    WrongQueue {
        thread: ThreadId,
        queue: QueueId,
        channel: Option<QueueId>,
    },

    #[error("Queue {queue} reports size {reported} but links {actual} threads")]
    #[diagnostic(code(sched::invariant::size))]
    SizeMismatch {
        queue: QueueId,
        reported: usize,
        actual: usize,
    },

    #[error("Current thread {thread} is in state {state}")]
    #[diagnostic(code(sched::invariant::current))]
    BadCurrent { thread: ThreadId, state: String },
}
