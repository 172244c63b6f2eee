/*!
 * Kernel Scheduler Library
 * Strict-FIFO single-processor thread scheduler with sleep/wakeup wait queues
 *
 * # Architecture
 *
 * - `core`: handle types, limits, configuration, errors, `kassert!`
 * - `thread`: thread states and the thread arena
 * - `queue`: intrusive FIFO wait queues over the arena
 * - `platform`: interrupt-masking and context-transfer seams
 * - `scheduler`: run queue, dispatch loop and sleep/wakeup/cancel
 * - `hosted`: OS-thread-backed platform for running kernel threads on a host
 * - `monitoring`: tracing subscriber setup
 */

#[macro_use]
pub mod core;
pub mod hosted;
pub mod monitoring;
pub mod platform;
pub mod queue;
pub mod scheduler;
pub mod thread;

#[doc(hidden)]
pub use tracing as __tracing;

// Re-exports
pub use crate::core::{
    ConfigError, InvariantViolation, Ipl, QueueId, SchedConfig, SchedError, SchedResult,
    ThreadId,
};
pub use hosted::{HostMachine, InterruptLine};
pub use monitoring::init_tracing;
pub use platform::{ContextSwitch, InterruptController, IplGuard};
pub use scheduler::{QueueInfo, Scheduler, SchedulerSnapshot, SchedulerStats, ThreadInfo};
pub use thread::ThreadState;
