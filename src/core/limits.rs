/*!
 * System Limits and Constants
 *
 * Defaults for the scheduler's arenas and the hosted machine.
 */

// =============================================================================
// ARENA LIMITS
// =============================================================================

/// Default cap on live thread records
pub const DEFAULT_MAX_THREADS: usize = 1024;

/// Default cap on live collaborator wait queues (run queue not counted)
pub const DEFAULT_MAX_QUEUES: usize = 4096;

/// Hard ceiling accepted by config validation
pub const MAX_THREADS_CEILING: usize = 65_536;

/// Hard ceiling accepted by config validation
pub const MAX_QUEUES_CEILING: usize = 1 << 20;

// =============================================================================
// HOSTED MACHINE
// =============================================================================

/// Stack size for OS threads backing hosted kernel threads (256KB)
pub const DEFAULT_HOST_STACK_SIZE: usize = 256 * 1024;

/// Smallest stack accepted by config validation (16KB)
pub const MIN_HOST_STACK_SIZE: usize = 16 * 1024;

/// Name given to the thread adopted by `HostMachine::boot`
pub const BOOT_THREAD_NAME: &str = "boot";

// =============================================================================
// ERRNO
// =============================================================================

/// [LINUX-COMPAT] Interrupted system call
pub const EINTR: i32 = 4;
