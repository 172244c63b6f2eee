/*!
 * Wait Queues
 *
 * The fundamental blocking point. The run queue is one instance; every
 * collaborator that needs to block threads embeds the `QueueId` of another.
 */

mod wait_queue;

pub use wait_queue::{Iter, WaitQueue};
