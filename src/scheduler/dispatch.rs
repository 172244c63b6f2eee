/*!
 * Dispatch Loop
 *
 * Selects the oldest runnable thread and transfers the processor to it.
 *
 * When the run queue is empty every thread is waiting on something that only
 * an interrupt can deliver, so the loop steps out of its critical section:
 * unmask, halt until an interrupt has been handled, remask, look again.
 * Busy-polling with interrupts masked would deadlock the processor.
 */

use super::Scheduler;
use crate::core::types::Ipl;
use crate::platform::IplGuard;
use crate::thread::ThreadState;
use tracing::{info, trace};

impl Scheduler {
    /// Give the processor to the oldest runnable thread
    ///
    /// Returns once the calling thread is selected again. If the caller has
    /// exited, its context is retired and this only returns to let the
    /// backing host thread unwind.
    pub(crate) fn switch(&self) {
        let ipl = IplGuard::raise(&*self.interrupts);
        let mut state = self.state.lock();

        let next = loop {
            if let Some(next) = state.dequeue_runnable() {
                break next;
            }

            drop(state);
            self.interrupts.set_ipl(Ipl::LOW);
            self.stats.inc_idle_waits();
            trace!("run queue empty, waiting for interrupt");
            self.interrupts.wait();
            self.interrupts.set_ipl(Ipl::HIGH);
            state = self.state.lock();
        };

        let prev = state.current_thread();
        let prev_state = state.threads.record(prev).state;
        state.current = Some(next);
        state.threads.record_mut(next).dispatches += 1;
        drop(state);

        self.stats.inc_dispatches();
        trace!(from = %prev, to = %next, "dispatch");

        if prev == next {
            return;
        }
        self.stats.inc_context_switches();

        if prev_state == ThreadState::Exited {
            // The retired context never resumes, so its saved level must not be
            // written back over whatever `next` is running at.
            std::mem::forget(ipl);
            self.context.retire(prev, next);
        } else {
            self.context.switch(prev, next);
        }
    }

    /// Move the calling thread to the back of the run queue and dispatch
    pub fn yield_now(&self) {
        let _ipl = IplGuard::raise(&*self.interrupts);
        self.critical(|state| {
            let thread = state.current_thread();
            state.make_runnable(thread);
        });
        self.switch();
    }

    /// Terminate the calling thread and dispatch away for the last time
    pub fn exit_current(&self) {
        let thread = self.critical(|state| {
            let thread = state.current_thread();
            let record = state.threads.record_mut(thread);
            kassert!(
                record.state == ThreadState::Runnable && !record.is_linked(),
                "thread {} exiting from state {} (linked={})",
                thread,
                record.state,
                record.is_linked()
            );
            record.state = ThreadState::Exited;
            thread
        });

        info!(thread = %thread, "thread exited");
        self.switch();
    }
}
