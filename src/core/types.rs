/*!
 * Core Types
 * Handle types shared across the scheduler core
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque thread identity
///
/// Issued by the thread table; never reused for the lifetime of a scheduler,
/// so a stale handle can never alias a newer thread.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ThreadId(u32);

impl ThreadId {
    #[inline(always)]
    pub(crate) const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw numeric value (diagnostics only)
    #[inline(always)]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Opaque wait queue handle
///
/// Collaborators (locks, devices, condition-like primitives) embed one of
/// these wherever they need a blocking point.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QueueId(u32);

impl QueueId {
    /// Reserved for the run queue, never handed out by `queue_init`
    pub const RUN_QUEUE: QueueId = QueueId(0);

    #[inline(always)]
    pub(crate) const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline(always)]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    #[inline(always)]
    pub const fn is_run_queue(&self) -> bool {
        self.0 == Self::RUN_QUEUE.0
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_run_queue() {
            f.write_str("runq")
        } else {
            write!(f, "q{}", self.0)
        }
    }
}

/// Interrupt priority level
///
/// Raising the level masks every interrupt class at or below it. The scheduler
/// only ever uses the two extremes.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ipl(u8);

impl Ipl {
    /// Nothing masked
    pub const LOW: Ipl = Ipl(0);
    /// Everything masked
    pub const HIGH: Ipl = Ipl(u8::MAX);

    #[inline(always)]
    pub const fn new(level: u8) -> Self {
        Self(level)
    }

    #[inline(always)]
    pub const fn level(&self) -> u8 {
        self.0
    }

    #[inline(always)]
    pub const fn is_masked(&self) -> bool {
        self.0 != Self::LOW.0
    }
}

impl Default for Ipl {
    fn default() -> Self {
        Self::LOW
    }
}

impl fmt::Display for Ipl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::LOW => f.write_str("low"),
            Self::HIGH => f.write_str("high"),
            Self(level) => write!(f, "{}", level),
        }
    }
}

/// Inline-allocated name used for thread records
pub type ThreadName = smartstring::alias::String;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_queue_reserved() {
        assert!(QueueId::RUN_QUEUE.is_run_queue());
        assert!(!QueueId::new(1).is_run_queue());
        assert_eq!(QueueId::RUN_QUEUE.to_string(), "runq");
        assert_eq!(QueueId::new(7).to_string(), "q7");
    }

    #[test]
    fn test_ipl_ordering() {
        assert!(Ipl::HIGH > Ipl::LOW);
        assert!(Ipl::HIGH.is_masked());
        assert!(!Ipl::LOW.is_masked());
        assert_eq!(Ipl::default(), Ipl::LOW);
    }
}
