/*!
 * Thread State Machine
 * Legal thread states and the transitions the scheduler core performs
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scheduling state of a thread
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadState {
    /// Admitted but never scheduled
    NoState,
    /// On the run queue, or currently executing
    Runnable,
    /// Blocked on a wait queue; only a wakeup resumes it
    Sleep,
    /// Blocked on a wait queue; a cancel also resumes it
    SleepCancellable,
    /// Terminal
    Exited,
}

impl ThreadState {
    #[inline(always)]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoState => "no_state",
            Self::Runnable => "runnable",
            Self::Sleep => "sleep",
            Self::SleepCancellable => "sleep_cancellable",
            Self::Exited => "exited",
        }
    }

    #[inline(always)]
    pub const fn is_sleeping(&self) -> bool {
        matches!(self, Self::Sleep | Self::SleepCancellable)
    }

    /// States in which the thread may legitimately sit on no queue
    #[inline(always)]
    pub const fn is_unqueued_state(&self) -> bool {
        matches!(self, Self::NoState | Self::Exited)
    }

    /// Whether the scheduler core ever moves a thread from `self` to `next`
    pub const fn can_transition_to(&self, next: ThreadState) -> bool {
        use ThreadState::*;
        matches!(
            (*self, next),
            (NoState, Runnable)
                | (Runnable, Runnable)
                | (Runnable, Sleep)
                | (Runnable, SleepCancellable)
                | (Runnable, Exited)
                | (Sleep, Runnable)
                | (SleepCancellable, Runnable)
        )
    }
}

impl Default for ThreadState {
    fn default() -> Self {
        Self::NoState
    }
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
