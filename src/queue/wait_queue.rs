/*!
 * Wait Queue
 *
 * FIFO of blocked threads built as an intrusive doubly linked list over the
 * thread table. Insertion happens at the head and removal at the tail, so the
 * oldest enqueued thread always leaves first.
 *
 * # Design: Links in the Arena
 *
 * The queue itself only stores `head`, `tail` and a size counter. Each
 * thread record carries its own `prev`/`next` link and a back-reference to
 * the queue holding it (`wait_channel`). This keeps:
 * - O(1) enqueue, dequeue and targeted removal (cancellation)
 * - No allocation per enqueue
 * - No cyclic references: links are plain ids into the arena
 *
 * Every method takes the thread table explicitly; callers must hold the
 * scheduler's critical section.
 */

use crate::core::types::{QueueId, ThreadId};
use crate::thread::{QueueLink, ThreadTable};
use tracing::trace;

/// FIFO of thread ids plus a size counter
#[derive(Debug)]
pub struct WaitQueue {
    id: QueueId,
    head: Option<ThreadId>,
    tail: Option<ThreadId>,
    size: usize,
}

impl WaitQueue {
    /// Create an empty queue
    pub(crate) fn new(id: QueueId) -> Self {
        Self {
            id,
            head: None,
            tail: None,
            size: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> QueueId {
        self.id
    }

    /// O(1)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Link `thread` in at the head
    ///
    /// Fatal if the thread already has a wait channel: a thread cannot sit on
    /// two queues.
    pub(crate) fn enqueue(&mut self, threads: &mut ThreadTable, thread: ThreadId) {
        let record = threads.record_mut(thread);
        kassert!(
            record.wait_channel.is_none(),
            "thread {} enqueued on {} while already on {:?}",
            thread,
            self.id,
            record.wait_channel
        );
        kassert!(record.link.is_none(), "thread {} has a stale queue link", thread);

        record.link = Some(QueueLink {
            prev: None,
            next: self.head,
        });
        record.wait_channel = Some(self.id);

        match self.head {
            Some(old_head) => link_mut(threads, old_head).prev = Some(thread),
            None => self.tail = Some(thread),
        }
        self.head = Some(thread);
        self.size += 1;

        trace!(thread = %thread, queue = %self.id, size = self.size, "enqueued");
    }

    /// Unlink and return the oldest thread, or `None` when empty
    pub(crate) fn dequeue(&mut self, threads: &mut ThreadTable) -> Option<ThreadId> {
        let thread = self.tail?;
        let record = threads.record_mut(thread);
        let Some(link) = record.link.take() else {
            broken_link(thread)
        };
        record.wait_channel = None;

        self.tail = link.prev;
        match link.prev {
            Some(prev) => link_mut(threads, prev).next = None,
            None => self.head = None,
        }
        self.size -= 1;

        trace!(thread = %thread, queue = %self.id, size = self.size, "dequeued");
        Some(thread)
    }

    /// Unlink `thread` from wherever it sits in this queue
    ///
    /// Fatal if the thread is not linked, or is linked into another queue.
    pub(crate) fn remove(&mut self, threads: &mut ThreadTable, thread: ThreadId) {
        let record = threads.record_mut(thread);
        kassert!(
            record.link.is_some(),
            "thread {} removed from {} but is not linked into any queue",
            thread,
            self.id
        );
        kassert!(
            record.wait_channel == Some(self.id),
            "thread {} removed from {} but its wait channel is {:?}",
            thread,
            self.id,
            record.wait_channel
        );

        let Some(link) = record.link.take() else {
            broken_link(thread)
        };
        record.wait_channel = None;

        match link.prev {
            Some(prev) => link_mut(threads, prev).next = link.next,
            None => self.head = link.next,
        }
        match link.next {
            Some(next) => link_mut(threads, next).prev = link.prev,
            None => self.tail = link.prev,
        }
        self.size -= 1;

        trace!(thread = %thread, queue = %self.id, size = self.size, "removed");
    }

    /// Peek at the thread the next `dequeue` would return
    #[inline]
    pub fn oldest(&self) -> Option<ThreadId> {
        self.tail
    }

    /// Members, oldest first
    pub fn iter<'a>(&self, threads: &'a ThreadTable) -> Iter<'a> {
        Iter {
            threads,
            cursor: self.tail,
        }
    }
}

/// Oldest-first walk over a queue's members
pub struct Iter<'a> {
    threads: &'a ThreadTable,
    cursor: Option<ThreadId>,
}

impl Iterator for Iter<'_> {
    type Item = ThreadId;

    fn next(&mut self) -> Option<ThreadId> {
        let current = self.cursor?;
        self.cursor = self
            .threads
            .get(current)
            .and_then(|record| record.link)
            .and_then(|link| link.prev);
        Some(current)
    }
}

#[inline]
fn link_mut(threads: &mut ThreadTable, thread: ThreadId) -> &mut QueueLink {
    let record = threads.record_mut(thread);
    match record.link.as_mut() {
        Some(link) => link,
        None => broken_link(thread),
    }
}

#[cold]
#[inline(never)]
fn broken_link(thread: ThreadId) -> ! {
    kassert!(false, "queued thread {} has no queue link", thread);
    unreachable!()
}
