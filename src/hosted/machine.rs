/*!
 * Hosted Machine
 *
 * Runs the scheduler on real OS threads: a single simulated processor, one
 * backing OS thread per kernel thread, baton-passing context transfer and
 * simulated device interrupts.
 */

use super::context::HostContext;
use super::interrupts::HostInterrupts;
use crate::core::config::SchedConfig;
use crate::core::errors::SchedResult;
use crate::core::limits::BOOT_THREAD_NAME;
use crate::core::types::{Ipl, ThreadId};
use crate::monitoring::thread_span;
use crate::platform::InterruptController;
use crate::scheduler::Scheduler;
use crate::thread::ThreadState;
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};

/// Handle for raising interrupts from outside the machine
///
/// Cheap to clone and safe to move to "device" OS threads. Handlers are
/// dropped unrun if the machine is gone by delivery time.
#[derive(Clone)]
pub struct InterruptLine {
    interrupts: Arc<HostInterrupts>,
    scheduler: Weak<Scheduler>,
}

impl InterruptLine {
    /// Queue `handler` to run on the processor at its next interrupt wait
    pub fn raise<F>(&self, handler: F)
    where
        F: FnOnce(&Scheduler) + Send + 'static,
    {
        let scheduler = self.scheduler.clone();
        self.interrupts.raise(move || {
            if let Some(scheduler) = scheduler.upgrade() {
                handler(&scheduler);
            }
        });
    }
}

struct HostThread {
    id: ThreadId,
    handle: JoinHandle<()>,
}

pub struct HostMachine {
    scheduler: Arc<Scheduler>,
    context: Arc<HostContext>,
    interrupts: Arc<HostInterrupts>,
    boot: ThreadId,
    threads: Mutex<Vec<HostThread>>,
}

impl HostMachine {
    /// Start a machine and adopt the calling OS thread as its boot thread
    pub fn boot(config: SchedConfig) -> SchedResult<Self> {
        let context = Arc::new(HostContext::new());
        let interrupts = Arc::new(HostInterrupts::new());
        let scheduler = Arc::new(Scheduler::new(
            config,
            interrupts.clone(),
            context.clone(),
        ));

        let boot = scheduler.bootstrap(BOOT_THREAD_NAME)?;
        context.adopt(boot);

        info!(boot = %boot, "hosted machine booted");
        Ok(Self {
            scheduler,
            context,
            interrupts,
            boot,
            threads: Mutex::new(Vec::new()),
        })
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn boot_thread(&self) -> ThreadId {
        self.boot
    }

    pub fn interrupt_line(&self) -> InterruptLine {
        InterruptLine {
            interrupts: self.interrupts.clone(),
            scheduler: Arc::downgrade(&self.scheduler),
        }
    }

    /// Shorthand for `interrupt_line().raise(handler)`
    pub fn raise_interrupt<F>(&self, handler: F)
    where
        F: FnOnce(&Scheduler) + Send + 'static,
    {
        self.interrupt_line().raise(handler);
    }

    /// Create a kernel thread that runs `body` and then exits
    ///
    /// The thread is appended to the run queue; it first executes when the
    /// dispatch loop selects it, starting with interrupts unmasked. A panic in
    /// `body` still exits the thread, so the processor moves on.
    pub fn spawn<F>(&self, name: &str, body: F) -> SchedResult<ThreadId>
    where
        F: FnOnce(&Arc<Scheduler>) + Send + 'static,
    {
        let thread = self.scheduler.register(name)?;

        let scheduler = self.scheduler.clone();
        let context = self.context.clone();
        let label = name.to_string();
        let spawned = thread::Builder::new()
            .name(name.to_string())
            .stack_size(self.scheduler.config().host_stack_size)
            .spawn(move || {
                let _span = thread_span(thread, &label).entered();
                context.wait_for_turn(thread);
                scheduler.interrupts().set_ipl(Ipl::LOW);
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&scheduler)));
                if outcome.is_err() {
                    error!(thread = %thread, "kernel thread panicked, retiring it");
                }
                scheduler.exit_current();
                // Surface the panic to `shutdown` once the processor is handed on
                if let Err(payload) = outcome {
                    panic::resume_unwind(payload);
                }
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                self.scheduler.release(thread);
                return Err(err.into());
            }
        };

        self.threads.lock().push(HostThread { id: thread, handle });
        self.scheduler.make_runnable(thread);

        info!(thread = %thread, name, "kernel thread spawned");
        Ok(thread)
    }

    /// Kernel threads spawned and not yet reaped
    pub fn live_threads(&self) -> usize {
        self.threads.lock().len()
    }

    /// Join the backing OS threads of every exited kernel thread
    ///
    /// Threads that have not exited are left parked and their records kept;
    /// they can never run again once the machine is dropped. Returns the
    /// number of threads joined.
    pub fn shutdown(self) -> usize {
        let threads = std::mem::take(&mut *self.threads.lock());
        let mut joined = 0;

        for HostThread { id, handle } in threads {
            match self.scheduler.state_of(id) {
                Some(ThreadState::Exited) => {
                    if handle.join().is_err() {
                        warn!(thread = %id, "backing thread panicked");
                    }
                    self.scheduler.release(id);
                    joined += 1;
                }
                state => {
                    warn!(thread = %id, state = ?state, "thread still live at shutdown");
                }
            }
        }

        info!(joined, delivered = self.interrupts.delivered(), "hosted machine shut down");
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_spawned_thread_runs_on_yield() {
        let machine = HostMachine::boot(SchedConfig::default()).unwrap();
        let ran = Arc::new(AtomicUsize::new(0));

        let ran_clone = ran.clone();
        let t = machine
            .spawn("worker", move |_| {
                ran_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 0, "spawn only makes it runnable");

        machine.scheduler().yield_now();

        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(machine.scheduler().state_of(t), Some(ThreadState::Exited));
        assert_eq!(machine.scheduler().current(), Some(machine.boot_thread()));
        assert_eq!(machine.shutdown(), 1);
    }

    #[test]
    fn test_panicking_body_still_exits() {
        let machine = HostMachine::boot(SchedConfig::default()).unwrap();
        let t = machine
            .spawn("bad", |_| panic!("body failed"))
            .unwrap();

        machine.scheduler().yield_now();

        assert_eq!(machine.scheduler().state_of(t), Some(ThreadState::Exited));
        assert_eq!(machine.scheduler().current(), Some(machine.boot_thread()));
        assert_eq!(machine.shutdown(), 1);
    }

    #[test]
    fn test_interrupt_wakes_idle_processor() {
        let machine = HostMachine::boot(SchedConfig::default()).unwrap();
        let sched = machine.scheduler().clone();
        let q = sched.queue_init().unwrap();

        let line = machine.interrupt_line();
        let device = thread::spawn(move || {
            thread::sleep(std::time::Duration::from_millis(10));
            line.raise(move |sched| {
                sched.wakeup_on(q);
            });
        });

        sched.sleep_on(q);
        device.join().unwrap();

        assert_eq!(sched.current(), Some(machine.boot_thread()));
        assert!(sched.stats().idle_waits >= 1);
        assert_eq!(machine.shutdown(), 0);
    }
}
