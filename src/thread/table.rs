/*!
 * Thread Table
 *
 * Arena of thread records indexed by `ThreadId`. The intrusive queue
 * membership link lives inside each record as a pair of neighbouring ids,
 * so queues never own threads and no record holds a reference to another.
 */

use super::state::ThreadState;
use crate::core::types::{QueueId, ThreadId, ThreadName};
use ahash::AHashMap;

/// Position of a thread inside some queue's sequence
///
/// `prev` points toward the head (newer), `next` toward the tail (older).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct QueueLink {
    pub prev: Option<ThreadId>,
    pub next: Option<ThreadId>,
}

/// Scheduler-visible part of a thread
#[derive(Debug, Clone)]
pub struct ThreadRecord {
    id: ThreadId,
    name: ThreadName,
    pub(crate) state: ThreadState,
    pub(crate) cancelled: bool,
    pub(crate) wait_channel: Option<QueueId>,
    pub(crate) link: Option<QueueLink>,
    pub(crate) dispatches: u64,
}

impl ThreadRecord {
    fn new(id: ThreadId, name: &str) -> Self {
        Self {
            id,
            name: name.into(),
            state: ThreadState::NoState,
            cancelled: false,
            wait_channel: None,
            link: None,
            dispatches: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> ThreadId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn state(&self) -> ThreadState {
        self.state
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    #[inline]
    pub fn wait_channel(&self) -> Option<QueueId> {
        self.wait_channel
    }

    /// Whether the membership link is part of some queue's sequence
    #[inline]
    pub fn is_linked(&self) -> bool {
        self.link.is_some()
    }

    #[inline]
    pub fn dispatches(&self) -> u64 {
        self.dispatches
    }
}

/// Arena of thread records
#[derive(Debug, Default)]
pub struct ThreadTable {
    records: AHashMap<ThreadId, ThreadRecord>,
    next_id: u32,
}

impl ThreadTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a new record in `NoState`
    ///
    /// Returns `None` once the id space is spent; ids are never reused.
    pub(crate) fn insert(&mut self, name: &str) -> Option<ThreadId> {
        let id = ThreadId::new(self.next_id);
        self.next_id = self.next_id.checked_add(1)?;
        self.records.insert(id, ThreadRecord::new(id, name));
        Some(id)
    }

    pub(crate) fn remove(&mut self, id: ThreadId) -> Option<ThreadRecord> {
        self.records.remove(&id)
    }

    #[inline]
    pub fn get(&self, id: ThreadId) -> Option<&ThreadRecord> {
        self.records.get(&id)
    }

    /// Look up a record that must exist
    #[inline]
    pub(crate) fn record(&self, id: ThreadId) -> &ThreadRecord {
        match self.records.get(&id) {
            Some(record) => record,
            None => unknown_thread(id),
        }
    }

    #[inline]
    pub(crate) fn record_mut(&mut self, id: ThreadId) -> &mut ThreadRecord {
        match self.records.get_mut(&id) {
            Some(record) => record,
            None => unknown_thread(id),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records sorted by id
    pub fn iter(&self) -> impl Iterator<Item = &ThreadRecord> {
        let mut records: Vec<&ThreadRecord> = self.records.values().collect();
        records.sort_by_key(|r| r.id);
        records.into_iter()
    }
}

#[cold]
#[inline(never)]
fn unknown_thread(id: ThreadId) -> ! {
    kassert!(false, "thread {} is not in the thread table", id);
    unreachable!()
}
