/*!
 * Scheduler Introspection
 *
 * Consistent point-in-time view of every thread and queue, taken inside one
 * critical section, plus a structural self-check of the queue links.
 */

use super::{SchedState, Scheduler, SchedulerStats};
use crate::core::errors::InvariantViolation;
use crate::core::types::{QueueId, ThreadId};
use crate::queue::WaitQueue;
use crate::thread::ThreadState;
use serde::Serialize;
use std::fmt;

/// One thread as seen by the scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadInfo {
    pub id: ThreadId,
    pub name: String,
    pub state: ThreadState,
    pub cancelled: bool,
    pub wait_channel: Option<QueueId>,
    pub dispatches: u64,
}

/// One collaborator wait queue and its waiters, oldest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueInfo {
    pub id: QueueId,
    pub waiters: Vec<ThreadId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerSnapshot {
    pub current: Option<ThreadId>,
    /// Runnable threads, next to run first
    pub run_queue: Vec<ThreadId>,
    pub threads: Vec<ThreadInfo>,
    pub queues: Vec<QueueInfo>,
    pub stats: SchedulerStats,
}

impl SchedulerSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn thread(&self, id: ThreadId) -> Option<&ThreadInfo> {
        self.threads.iter().find(|t| t.id == id)
    }
}

impl fmt::Display for SchedulerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.current {
            Some(current) => writeln!(f, "current: {}", current)?,
            None => writeln!(f, "current: none")?,
        }

        write!(f, "runq:")?;
        for id in &self.run_queue {
            write!(f, " {}", id)?;
        }
        writeln!(f)?;

        for queue in &self.queues {
            write!(f, "{}:", queue.id)?;
            for id in &queue.waiters {
                write!(f, " {}", id)?;
            }
            writeln!(f)?;
        }

        for t in &self.threads {
            write!(f, "  {:>5} {:<16} {:<18}", t.id.to_string(), t.name, t.state.as_str())?;
            if let Some(channel) = t.wait_channel {
                write!(f, " on {}", channel)?;
            }
            if t.cancelled {
                write!(f, " cancelled")?;
            }
            writeln!(f, " dispatches={}", t.dispatches)?;
        }

        write!(
            f,
            "dispatches={} switches={} idle={} sleeps={} wakeups={} cancels={}",
            self.stats.dispatches,
            self.stats.context_switches,
            self.stats.idle_waits,
            self.stats.sleeps,
            self.stats.wakeups,
            self.stats.cancellations
        )
    }
}

impl SchedState {
    fn snapshot(&self) -> (Option<ThreadId>, Vec<ThreadId>, Vec<ThreadInfo>, Vec<QueueInfo>) {
        let threads = self
            .threads
            .iter()
            .map(|r| ThreadInfo {
                id: r.id(),
                name: r.name().to_string(),
                state: r.state(),
                cancelled: r.is_cancelled(),
                wait_channel: r.wait_channel(),
                dispatches: r.dispatches(),
            })
            .collect();

        let mut queues: Vec<QueueInfo> = self
            .queues
            .values()
            .map(|q| QueueInfo {
                id: q.id(),
                waiters: q.iter(&self.threads).collect(),
            })
            .collect();
        queues.sort_by_key(|q| q.id);

        let run_queue = self.run_queue.iter(&self.threads).collect();
        (self.current, run_queue, threads, queues)
    }

    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for record in self.threads.iter() {
            let thread = record.id();
            if record.wait_channel().is_some() != record.is_linked() {
                return Err(InvariantViolation::ChannelLinkMismatch {
                    thread,
                    channel: record.wait_channel(),
                    linked: record.is_linked(),
                });
            }

            let queued_state = !record.state().is_unqueued_state();
            if queued_state && record.wait_channel().is_none() && self.current != Some(thread) {
                return Err(InvariantViolation::LostThread {
                    thread,
                    state: record.state().to_string(),
                });
            }
        }

        self.check_queue(&self.run_queue)?;
        for queue in self.queues.values() {
            self.check_queue(queue)?;
        }

        if let Some(current) = self.current {
            let state = self.threads.get(current).map(|r| r.state());
            if matches!(state, None | Some(ThreadState::NoState)) {
                return Err(InvariantViolation::BadCurrent {
                    thread: current,
                    state: state.map_or_else(|| "missing".to_string(), |s| s.to_string()),
                });
            }
        }
        Ok(())
    }

    /// Walk `queue` oldest first and compare against its size counter
    fn check_queue(&self, queue: &WaitQueue) -> Result<(), InvariantViolation> {
        let mut actual = 0;
        for thread in queue.iter(&self.threads) {
            actual += 1;
            // More members than threads exist means the links form a cycle
            if actual > self.threads.len() {
                break;
            }

            let channel = self.threads.get(thread).and_then(|r| r.wait_channel());
            if channel != Some(queue.id()) {
                return Err(InvariantViolation::WrongQueue {
                    thread,
                    queue: queue.id(),
                    channel,
                });
            }
        }

        if actual != queue.len() {
            return Err(InvariantViolation::SizeMismatch {
                queue: queue.id(),
                reported: queue.len(),
                actual,
            });
        }
        Ok(())
    }
}

impl Scheduler {
    /// Capture every thread and queue under one critical section
    pub fn snapshot(&self) -> SchedulerSnapshot {
        let (current, run_queue, threads, queues) = self.critical(|state| state.snapshot());
        SchedulerSnapshot {
            current,
            run_queue,
            threads,
            queues,
            stats: self.stats(),
        }
    }

    /// Verify queue links, wait channels and sizes agree with each other
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        self.critical(|state| state.check_invariants())
    }
}
