/*!
 * Platform Traits
 *
 * The two primitives the scheduler consumes from its surroundings: interrupt
 * masking and context transfer. Implementations must be:
 * - **Thread-safe**: interrupt handlers may call in from another host thread
 * - **Non-reentrant on the scheduler**: never call back into the scheduler
 *   from inside `switch`/`retire`
 */

use crate::core::types::{Ipl, ThreadId};

/// Interrupt priority level control
pub trait InterruptController: Send + Sync {
    /// Current interrupt priority level
    fn ipl(&self) -> Ipl;

    /// Set the interrupt priority level, returning the previous one
    fn set_ipl(&self, ipl: Ipl) -> Ipl;

    /// Block the processor until the next interrupt has been handled
    ///
    /// Only valid with interrupts unmasked (`Ipl::LOW`); otherwise no
    /// interrupt can ever arrive.
    fn wait(&self);

    /// Strategy name for debugging
    fn name(&self) -> &'static str;
}

/// Processor context transfer
pub trait ContextSwitch: Send + Sync {
    /// Save `from`, resume `to`
    ///
    /// Returns when `from` is next resumed by some later transfer.
    fn switch(&self, from: ThreadId, to: ThreadId);

    /// Resume `to` without saving `from`, which never runs again
    fn retire(&self, from: ThreadId, to: ThreadId);

    /// Strategy name for debugging
    fn name(&self) -> &'static str;
}
