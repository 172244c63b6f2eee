/*!
 * Hosted Platform
 *
 * Platform collaborators backed by real OS threads, so kernel threads built
 * on the scheduler can run as an ordinary host process.
 *
 * # Architecture
 *
 * - `context`: `HostContext`, baton-passing context transfer
 * - `interrupts`: `HostInterrupts`, interrupts raised anywhere and delivered
 *   only while the processor idles
 * - `machine`: `HostMachine`, wiring both to a `Scheduler`
 */

mod context;
mod interrupts;
mod machine;

pub use context::HostContext;
pub use interrupts::{HostInterrupts, InterruptHandler};
pub use machine::{HostMachine, InterruptLine};
