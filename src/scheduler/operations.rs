/*!
 * Scheduler Core Operations
 * Sleep, wakeup, broadcast, cancel and make-runnable
 */

use super::Scheduler;
use crate::core::errors::{SchedError, SchedResult};
use crate::core::types::{QueueId, ThreadId};
use crate::platform::IplGuard;
use crate::thread::ThreadState;
use tracing::debug;

impl Scheduler {
    /// Block the calling thread on `queue` until a wakeup or broadcast
    /// selects it
    pub fn sleep_on(&self, queue: QueueId) {
        self.block_current(queue, ThreadState::Sleep);
    }

    /// Like `sleep_on`, but `cancel` may end the sleep early
    ///
    /// Returns `SchedError::Interrupted` if the thread finds itself cancelled
    /// once resumed. The flag is only consulted after resumption, never before
    /// going to sleep.
    pub fn cancellable_sleep_on(&self, queue: QueueId) -> SchedResult<()> {
        let thread = self.block_current(queue, ThreadState::SleepCancellable);

        let cancelled = self.critical(|state| state.threads.record(thread).cancelled);
        if cancelled {
            debug!(thread = %thread, queue = %queue, "cancellable sleep interrupted");
            return Err(SchedError::Interrupted(thread));
        }
        Ok(())
    }

    /// Enqueue the calling thread on `queue` in `sleep_state` and yield
    ///
    /// Interrupts stay masked from the enqueue through the dispatch so no
    /// handler observes the thread half-asleep.
    fn block_current(&self, queue: QueueId, sleep_state: ThreadState) -> ThreadId {
        let _ipl = IplGuard::raise(&*self.interrupts);

        let thread = self.critical(|state| {
            kassert!(!queue.is_run_queue(), "sleeping on the run queue");
            let thread = state.current_thread();
            let (wait_queue, threads) = state.queue_and_threads(queue);

            let record = threads.record_mut(thread);
            kassert!(
                record.state == ThreadState::Runnable,
                "thread {} sleeping from state {}",
                thread,
                record.state
            );
            record.state = sleep_state;
            wait_queue.enqueue(threads, thread);

            debug!(
                thread = %thread,
                queue = %queue,
                state = %sleep_state,
                waiters = wait_queue.len(),
                "thread sleeping"
            );
            thread
        });
        self.stats.inc_sleeps();

        self.switch();
        thread
    }

    /// Wake the oldest waiter on `queue`
    ///
    /// Returns the thread moved to the run queue, or `None` if nobody was
    /// waiting. Never affects the caller's own state.
    pub fn wakeup_on(&self, queue: QueueId) -> Option<ThreadId> {
        let woken = self.critical(|state| state.wakeup_one(queue));

        if let Some(thread) = woken {
            self.stats.add_wakeups(1);
            debug!(thread = %thread, queue = %queue, "thread woken");
        }
        woken
    }

    /// Wake every waiter on `queue`, oldest first
    ///
    /// Returns how many threads were woken.
    pub fn broadcast_on(&self, queue: QueueId) -> usize {
        let woken = self.critical(|state| {
            let mut woken = 0;
            while state.wakeup_one(queue).is_some() {
                woken += 1;
            }
            woken
        });

        self.stats.add_wakeups(woken as u64);
        debug!(queue = %queue, woken, "broadcast");
        woken
    }

    /// Flag `thread` as cancelled
    ///
    /// A cancellable sleeper is pulled off its wait queue and made runnable
    /// immediately. A plain sleeper stays where it is until its own wakeup.
    pub fn cancel(&self, thread: ThreadId) {
        let forced = self.critical(|state| {
            let record = state.threads.record_mut(thread);
            kassert!(
                !record.state.is_unqueued_state(),
                "cancelling thread {} in state {}",
                thread,
                record.state
            );
            record.cancelled = true;

            if record.state != ThreadState::SleepCancellable {
                return false;
            }
            let Some(channel) = record.wait_channel else {
                kassert!(false, "cancellable sleeper {} is on no queue", thread);
                return false;
            };

            let (wait_queue, threads) = state.queue_and_threads(channel);
            wait_queue.remove(threads, thread);
            state.make_runnable(thread);
            true
        });

        self.stats.inc_cancellations(forced);
        debug!(thread = %thread, forced, "thread cancelled");
    }

    /// Mark `thread` runnable and append it to the run queue
    ///
    /// Safe to call from interrupt handlers.
    pub fn make_runnable(&self, thread: ThreadId) {
        self.critical(|state| state.make_runnable(thread));
        debug!(thread = %thread, "thread runnable");
    }
}
