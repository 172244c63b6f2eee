/*!
 * Platform Collaborators
 *
 * Interrupt masking and context transfer, consumed by the scheduler as
 * opaque primitives.
 *
 * # Architecture
 *
 * - `traits`: the `InterruptController` and `ContextSwitch` seams
 * - `guard`: `IplGuard`, the RAII form of the interrupt-masking discipline
 * - `recording`: deterministic single-thread doubles
 *
 * The hosted implementations backed by real OS threads live in `crate::hosted`.
 */

mod guard;
pub mod recording;
mod traits;

// Re-export public API
pub use guard::IplGuard;
pub use recording::{RecordingContext, ScriptedInterrupts, Transfer, TransferKind};
pub use traits::{ContextSwitch, InterruptController};
