/*!
 * Recording Doubles
 *
 * Deterministic platform implementations for driving the scheduler from a
 * single host thread. Context transfers are recorded and return immediately,
 * as if the saved thread had already been resumed; interrupt waits run
 * scripted handlers instead of blocking.
 */

use super::traits::{ContextSwitch, InterruptController};
use crate::core::types::{Ipl, ThreadId};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// Scripted interrupt handler
pub type ScriptedHandler = Box<dyn FnOnce() + Send>;

/// Interrupt controller whose `wait` replays scripted handlers
///
/// `wait` with an empty script panics: on a real processor it would halt
/// forever.
pub struct ScriptedInterrupts {
    ipl: AtomicU8,
    script: Mutex<VecDeque<ScriptedHandler>>,
    waits: AtomicUsize,
    ipl_changes: AtomicUsize,
}

impl ScriptedInterrupts {
    pub fn new() -> Self {
        Self {
            ipl: AtomicU8::new(Ipl::LOW.level()),
            script: Mutex::new(VecDeque::new()),
            waits: AtomicUsize::new(0),
            ipl_changes: AtomicUsize::new(0),
        }
    }

    /// Queue a handler for a future `wait`
    pub fn push_handler<F>(&self, handler: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.script.lock().push_back(Box::new(handler));
    }

    /// Number of times the processor blocked waiting for an interrupt
    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::Relaxed)
    }

    /// Number of `set_ipl` calls observed
    pub fn ipl_changes(&self) -> usize {
        self.ipl_changes.load(Ordering::Relaxed)
    }

    /// Handlers not yet delivered
    pub fn pending(&self) -> usize {
        self.script.lock().len()
    }
}

impl Default for ScriptedInterrupts {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptController for ScriptedInterrupts {
    fn ipl(&self) -> Ipl {
        Ipl::new(self.ipl.load(Ordering::Acquire))
    }

    fn set_ipl(&self, ipl: Ipl) -> Ipl {
        self.ipl_changes.fetch_add(1, Ordering::Relaxed);
        Ipl::new(self.ipl.swap(ipl.level(), Ordering::AcqRel))
    }

    fn wait(&self) {
        kassert!(
            self.ipl() == Ipl::LOW,
            "waiting for an interrupt with ipl {}",
            self.ipl()
        );
        self.waits.fetch_add(1, Ordering::Relaxed);

        // Lock released before the handler runs: handlers call back into the scheduler
        let handler = self.script.lock().pop_front();
        match handler {
            Some(handler) => handler(),
            None => panic!("processor halted with no interrupt scripted: it would wait forever"),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Kind of a recorded transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Switch,
    Retire,
}

/// One recorded context transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub from: ThreadId,
    pub to: ThreadId,
    pub kind: TransferKind,
}

/// Context switch that only records what it was asked to do
#[derive(Default)]
pub struct RecordingContext {
    transfers: Mutex<Vec<Transfer>>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every transfer so far, in order
    pub fn transfers(&self) -> Vec<Transfer> {
        self.transfers.lock().clone()
    }

    /// Most recent transfer
    pub fn last(&self) -> Option<Transfer> {
        self.transfers.lock().last().copied()
    }

    pub fn len(&self) -> usize {
        self.transfers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.lock().is_empty()
    }

    fn record(&self, from: ThreadId, to: ThreadId, kind: TransferKind) {
        self.transfers.lock().push(Transfer { from, to, kind });
    }
}

impl ContextSwitch for RecordingContext {
    fn switch(&self, from: ThreadId, to: ThreadId) {
        self.record(from, to, TransferKind::Switch);
    }

    fn retire(&self, from: ThreadId, to: ThreadId) {
        self.record(from, to, TransferKind::Retire);
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
