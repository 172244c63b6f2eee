/*!
 * Thread Module
 * Thread records, the arena that owns them, and the state machine
 */

mod state;
mod table;

pub use state::ThreadState;
pub(crate) use table::QueueLink;
pub use table::{ThreadRecord, ThreadTable};
