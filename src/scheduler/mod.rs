/*!
 * Thread Scheduler
 *
 * Strict-FIFO, single-processor scheduler core: one run queue, any number
 * of collaborator wait queues, and the sleep/wakeup/cancel operations that
 * move threads between them.
 *
 * # Critical Sections
 *
 * Every read or write of queue membership, thread state or the current-thread
 * reference happens with interrupts masked (`IplGuard`) and the state mutex
 * held, in that order. The mutex is the host-level stand-in for "only one of
 * {current thread, interrupt handler} runs at a time"; it is never held
 * across a context transfer or an interrupt wait.
 */

use crate::core::config::SchedConfig;
use crate::core::errors::{SchedError, SchedResult};
use crate::core::types::{QueueId, ThreadId};
use crate::platform::{ContextSwitch, InterruptController, IplGuard};
use crate::queue::WaitQueue;
use crate::thread::{ThreadState, ThreadTable};
use ahash::AHashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

mod atomic_stats;
mod dispatch;
mod operations;
mod snapshot;

pub use atomic_stats::SchedulerStats;
pub use snapshot::{QueueInfo, SchedulerSnapshot, ThreadInfo};

use atomic_stats::AtomicSchedulerStats;

/// Everything guarded by the critical section
pub(crate) struct SchedState {
    threads: ThreadTable,
    run_queue: WaitQueue,
    queues: AHashMap<QueueId, WaitQueue>,
    next_queue: u32,
    current: Option<ThreadId>,
}

impl SchedState {
    fn new() -> Self {
        Self {
            threads: ThreadTable::new(),
            run_queue: WaitQueue::new(QueueId::RUN_QUEUE),
            queues: AHashMap::new(),
            next_queue: QueueId::RUN_QUEUE.as_u32() + 1,
            current: None,
        }
    }

    /// The thread on whose behalf the running code executes
    #[inline]
    fn current_thread(&self) -> ThreadId {
        match self.current {
            Some(thread) => thread,
            None => no_current_thread(),
        }
    }

    fn queue(&self, id: QueueId) -> &WaitQueue {
        if id.is_run_queue() {
            return &self.run_queue;
        }
        match self.queues.get(&id) {
            Some(queue) => queue,
            None => unknown_queue(id),
        }
    }

    /// Split borrow of a queue and the arena its links point into
    fn queue_and_threads(&mut self, id: QueueId) -> (&mut WaitQueue, &mut ThreadTable) {
        let queue = if id.is_run_queue() {
            &mut self.run_queue
        } else {
            match self.queues.get_mut(&id) {
                Some(queue) => queue,
                None => unknown_queue(id),
            }
        };
        (queue, &mut self.threads)
    }

    /// Mark `thread` runnable and append it to the run queue
    fn make_runnable(&mut self, thread: ThreadId) {
        let record = self.threads.record_mut(thread);
        kassert!(
            record.state.can_transition_to(ThreadState::Runnable),
            "thread {} in state {} made runnable",
            thread,
            record.state
        );
        record.state = ThreadState::Runnable;
        self.run_queue.enqueue(&mut self.threads, thread);
    }

    fn dequeue_runnable(&mut self) -> Option<ThreadId> {
        self.run_queue.dequeue(&mut self.threads)
    }

    /// Dequeue the oldest waiter of `queue` and make it runnable
    fn wakeup_one(&mut self, queue: QueueId) -> Option<ThreadId> {
        kassert!(self.current.is_some(), "wakeup with no current thread");
        let (wait_queue, threads) = self.queue_and_threads(queue);
        let thread = wait_queue.dequeue(threads)?;
        kassert!(
            threads.record(thread).state.is_sleeping(),
            "thread {} woken from {} in state {}",
            thread,
            queue,
            threads.record(thread).state
        );
        self.make_runnable(thread);
        Some(thread)
    }
}

/// Strict-FIFO single-processor scheduler
///
/// # Performance
/// - Statistics are lock-free atomics, readable without entering the critical section
pub struct Scheduler {
    state: Mutex<SchedState>,
    interrupts: Arc<dyn InterruptController>,
    context: Arc<dyn ContextSwitch>,
    stats: AtomicSchedulerStats,
    config: SchedConfig,
}

impl Scheduler {
    /// Create a scheduler over the given platform primitives
    ///
    /// The run queue starts empty and no thread is current; call `bootstrap`
    /// from the initial context before anything that acts on the calling
    /// thread.
    pub fn new(
        config: SchedConfig,
        interrupts: Arc<dyn InterruptController>,
        context: Arc<dyn ContextSwitch>,
    ) -> Self {
        info!(
            interrupts = interrupts.name(),
            context = context.name(),
            max_threads = config.max_threads,
            max_queues = config.max_queues,
            "Scheduler initialized"
        );

        Self {
            state: Mutex::new(SchedState::new()),
            interrupts,
            context,
            stats: AtomicSchedulerStats::new(),
            config,
        }
    }

    /// Run `f` with interrupts masked and the state locked
    ///
    /// Never suspend inside `f`.
    #[inline]
    pub(crate) fn critical<R>(&self, f: impl FnOnce(&mut SchedState) -> R) -> R {
        let _ipl = IplGuard::raise(&*self.interrupts);
        let mut state = self.state.lock();
        f(&mut state)
    }

    pub fn config(&self) -> &SchedConfig {
        &self.config
    }

    pub fn interrupts(&self) -> &Arc<dyn InterruptController> {
        &self.interrupts
    }

    // =========================================================================
    // Thread registry
    // =========================================================================

    /// Admit a thread record in `NoState`
    pub fn register(&self, name: &str) -> SchedResult<ThreadId> {
        let max_threads = self.config.max_threads;
        let thread = self.critical(|state| {
            let live = state.threads.len();
            if live >= max_threads {
                return Err(SchedError::ThreadLimit(live));
            }
            state
                .threads
                .insert(name)
                .ok_or(SchedError::ThreadLimit(live))
        })?;

        debug!(thread = %thread, name, "thread registered");
        Ok(thread)
    }

    /// Adopt the calling context as the first current thread
    ///
    /// Must happen exactly once, before any operation that acts on "the
    /// calling thread".
    pub fn bootstrap(&self, name: &str) -> SchedResult<ThreadId> {
        let thread = self.register(name)?;
        self.critical(|state| {
            kassert!(
                state.current.is_none(),
                "bootstrap with {:?} already current",
                state.current
            );
            state.threads.record_mut(thread).state = ThreadState::Runnable;
            state.current = Some(thread);
        });

        info!(thread = %thread, name, "bootstrap thread is now current");
        Ok(thread)
    }

    /// Drop the record of a thread that never ran or has exited
    pub fn release(&self, thread: ThreadId) {
        self.critical(|state| {
            let record = state.threads.record(thread);
            kassert!(
                record.state.is_unqueued_state(),
                "releasing thread {} in state {}",
                thread,
                record.state
            );
            kassert!(!record.is_linked(), "releasing queued thread {}", thread);
            kassert!(
                state.current != Some(thread),
                "releasing the current thread {}",
                thread
            );
            state.threads.remove(thread);
        });

        debug!(thread = %thread, "thread released");
    }

    /// Currently executing thread
    pub fn current(&self) -> Option<ThreadId> {
        self.critical(|state| state.current)
    }

    pub fn state_of(&self, thread: ThreadId) -> Option<ThreadState> {
        self.critical(|state| state.threads.get(thread).map(|r| r.state()))
    }

    pub fn is_cancelled(&self, thread: ThreadId) -> Option<bool> {
        self.critical(|state| state.threads.get(thread).map(|r| r.is_cancelled()))
    }

    pub fn wait_channel_of(&self, thread: ThreadId) -> Option<QueueId> {
        self.critical(|state| state.threads.get(thread).and_then(|r| r.wait_channel()))
    }

    pub fn thread_count(&self) -> usize {
        self.critical(|state| state.threads.len())
    }

    // =========================================================================
    // Wait queue registry
    // =========================================================================

    /// Create an empty wait queue for a collaborator
    pub fn queue_init(&self) -> SchedResult<QueueId> {
        let max_queues = self.config.max_queues;
        let queue = self.critical(|state| {
            if state.queues.len() >= max_queues {
                return Err(SchedError::QueueLimit(state.queues.len()));
            }
            let id = QueueId::new(state.next_queue);
            state.next_queue = match state.next_queue.checked_add(1) {
                Some(next) => next,
                None => return Err(SchedError::QueueLimit(state.queues.len())),
            };
            state.queues.insert(id, WaitQueue::new(id));
            Ok(id)
        })?;

        debug!(queue = %queue, "wait queue created");
        Ok(queue)
    }

    /// Destroy a collaborator wait queue; it must be empty
    pub fn queue_destroy(&self, queue: QueueId) {
        self.critical(|state| {
            kassert!(!queue.is_run_queue(), "destroying the run queue");
            let len = state.queue(queue).len();
            kassert!(len == 0, "destroying {} with {} waiters", queue, len);
            state.queues.remove(&queue);
        });

        debug!(queue = %queue, "wait queue destroyed");
    }

    pub fn queue_is_empty(&self, queue: QueueId) -> bool {
        self.critical(|state| state.queue(queue).is_empty())
    }

    pub fn queue_len(&self, queue: QueueId) -> usize {
        self.critical(|state| state.queue(queue).len())
    }

    /// Waiters of `queue`, oldest first
    pub fn queue_waiters(&self, queue: QueueId) -> Vec<ThreadId> {
        self.critical(|state| state.queue(queue).iter(&state.threads).collect())
    }

    /// Runnable threads not currently executing, oldest first
    pub fn run_queue(&self) -> Vec<ThreadId> {
        self.queue_waiters(QueueId::RUN_QUEUE)
    }

    pub fn run_queue_len(&self) -> usize {
        self.queue_len(QueueId::RUN_QUEUE)
    }

    /// Lock-free statistics snapshot
    pub fn stats(&self) -> SchedulerStats {
        self.stats.snapshot()
    }
}

#[cold]
#[inline(never)]
fn no_current_thread() -> ! {
    kassert!(false, "no current thread");
    unreachable!()
}

#[cold]
#[inline(never)]
fn unknown_queue(id: QueueId) -> ! {
    kassert!(false, "wait queue {} does not exist", id);
    unreachable!()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{RecordingContext, ScriptedInterrupts};

    fn scheduler(config: SchedConfig) -> Scheduler {
        Scheduler::new(
            config,
            Arc::new(ScriptedInterrupts::new()),
            Arc::new(RecordingContext::new()),
        )
    }

    #[test]
    fn test_register_and_limit() {
        let sched = scheduler(SchedConfig {
            max_threads: 2,
            ..SchedConfig::default()
        });

        let a = sched.register("a").unwrap();
        sched.register("b").unwrap();
        assert_eq!(sched.register("c"), Err(SchedError::ThreadLimit(2)));

        assert_eq!(sched.state_of(a), Some(ThreadState::NoState));
        sched.release(a);
        assert_eq!(sched.state_of(a), None);
        assert!(sched.register("c").is_ok());
    }

    #[test]
    fn test_bootstrap_sets_current() {
        let sched = scheduler(SchedConfig::default());
        assert_eq!(sched.current(), None);

        let boot = sched.bootstrap("boot").unwrap();
        assert_eq!(sched.current(), Some(boot));
        assert_eq!(sched.state_of(boot), Some(ThreadState::Runnable));
        assert_eq!(sched.wait_channel_of(boot), None);
    }

    #[test]
    #[should_panic(expected = "already current")]
    fn test_double_bootstrap_is_fatal() {
        let sched = scheduler(SchedConfig::default());
        sched.bootstrap("boot").unwrap();
        sched.bootstrap("again").unwrap();
    }

    #[test]
    fn test_queue_registry() {
        let sched = scheduler(SchedConfig {
            max_queues: 2,
            ..SchedConfig::default()
        });

        let q1 = sched.queue_init().unwrap();
        let q2 = sched.queue_init().unwrap();
        assert_ne!(q1, q2);
        assert!(!q1.is_run_queue());
        assert_eq!(sched.queue_init(), Err(SchedError::QueueLimit(2)));

        assert!(sched.queue_is_empty(q1));
        sched.queue_destroy(q1);
        let q3 = sched.queue_init().unwrap();
        assert_ne!(q3, q1, "queue ids are never reused");
    }

    #[test]
    fn test_exhausted_queue_ids_never_wrap_to_run_queue() {
        let sched = scheduler(SchedConfig::default());
        sched.state.lock().next_queue = u32::MAX;

        assert_eq!(sched.queue_init(), Err(SchedError::QueueLimit(0)));
        assert_eq!(sched.queue_init(), Err(SchedError::QueueLimit(0)));
        assert_eq!(sched.state.lock().queues.len(), 0);
    }

    #[test]
    #[should_panic(expected = "does not exist")]
    fn test_destroyed_queue_is_unusable() {
        let sched = scheduler(SchedConfig::default());
        let q = sched.queue_init().unwrap();
        sched.queue_destroy(q);
        sched.queue_is_empty(q);
    }

    #[test]
    #[should_panic(expected = "releasing the current thread")]
    fn test_release_current_is_fatal() {
        let sched = scheduler(SchedConfig::default());
        let boot = sched.bootstrap("boot").unwrap();
        // Mark it exited without dispatching so only the current check trips
        sched.critical(|state| state.threads.record_mut(boot).state = ThreadState::Exited);
        sched.release(boot);
    }
}
