/*!
 * Simulated Interrupt Controller
 *
 * Interrupts are raised from any OS thread but only delivered on the
 * processor while it is idle in `wait` with interrupts unmasked. Handlers
 * therefore never observe the scheduler mid-operation.
 */

use crate::core::types::Ipl;
use crate::platform::InterruptController;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use tracing::trace;

/// Interrupt handler queued by `raise`
pub type InterruptHandler = Box<dyn FnOnce() + Send>;

pub struct HostInterrupts {
    ipl: AtomicU8,
    pending: Mutex<VecDeque<InterruptHandler>>,
    arrived: Condvar,
    delivered: AtomicU64,
}

impl HostInterrupts {
    pub fn new() -> Self {
        Self {
            ipl: AtomicU8::new(Ipl::LOW.level()),
            pending: Mutex::new(VecDeque::new()),
            arrived: Condvar::new(),
            delivered: AtomicU64::new(0),
        }
    }

    /// Queue `handler` for delivery at the processor's next interrupt wait
    pub fn raise<F>(&self, handler: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut pending = self.pending.lock();
        pending.push_back(Box::new(handler));
        trace!(pending = pending.len(), "interrupt raised");
        self.arrived.notify_one();
    }

    /// Interrupts raised but not yet handled
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Interrupts handled so far
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}

impl Default for HostInterrupts {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptController for HostInterrupts {
    fn ipl(&self) -> Ipl {
        Ipl::new(self.ipl.load(Ordering::Acquire))
    }

    fn set_ipl(&self, ipl: Ipl) -> Ipl {
        Ipl::new(self.ipl.swap(ipl.level(), Ordering::AcqRel))
    }

    fn wait(&self) {
        kassert!(
            self.ipl() == Ipl::LOW,
            "waiting for an interrupt with ipl {}",
            self.ipl()
        );

        let handlers: Vec<InterruptHandler> = {
            let mut pending = self.pending.lock();
            while pending.is_empty() {
                self.arrived.wait(&mut pending);
            }
            pending.drain(..).collect()
        };

        // Handlers re-enter the scheduler, so the queue lock is already released
        for handler in handlers {
            handler();
            self.delivered.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn name(&self) -> &'static str {
        "host-simulated"
    }
}
