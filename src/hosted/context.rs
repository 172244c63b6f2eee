/*!
 * Baton-Passing Context Switch
 *
 * Each kernel thread is backed by its own OS thread. Exactly one of them holds
 * the baton and executes; every other backing thread is parked on the
 * condition variable until the baton names it.
 */

use crate::core::types::ThreadId;
use crate::platform::ContextSwitch;
use parking_lot::{Condvar, Mutex};
use tracing::trace;

/// Context transfer between OS-thread-backed kernel threads
pub struct HostContext {
    baton: Mutex<Option<ThreadId>>,
    turn: Condvar,
}

impl HostContext {
    pub fn new() -> Self {
        Self {
            baton: Mutex::new(None),
            turn: Condvar::new(),
        }
    }

    /// Hand the baton to the calling OS thread without a transfer
    ///
    /// Used once, for the thread that boots the machine.
    pub fn adopt(&self, thread: ThreadId) {
        let mut baton = self.baton.lock();
        kassert!(baton.is_none(), "baton already held by {:?}", *baton);
        *baton = Some(thread);
    }

    /// Park until `thread` is handed the baton
    pub fn wait_for_turn(&self, thread: ThreadId) {
        let mut baton = self.baton.lock();
        while *baton != Some(thread) {
            self.turn.wait(&mut baton);
        }
    }

    /// Thread currently holding the baton
    pub fn holder(&self) -> Option<ThreadId> {
        *self.baton.lock()
    }

    fn hand_to(&self, from: ThreadId, to: ThreadId) -> parking_lot::MutexGuard<'_, Option<ThreadId>> {
        let mut baton = self.baton.lock();
        kassert!(
            *baton == Some(from),
            "{} transferring the processor while {:?} holds it",
            from,
            *baton
        );
        *baton = Some(to);
        self.turn.notify_all();
        baton
    }
}

impl Default for HostContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextSwitch for HostContext {
    fn switch(&self, from: ThreadId, to: ThreadId) {
        trace!(from = %from, to = %to, "passing baton");
        let mut baton = self.hand_to(from, to);
        while *baton != Some(from) {
            self.turn.wait(&mut baton);
        }
    }

    fn retire(&self, from: ThreadId, to: ThreadId) {
        trace!(from = %from, to = %to, "passing baton for the last time");
        drop(self.hand_to(from, to));
    }

    fn name(&self) -> &'static str {
        "host-baton"
    }
}
