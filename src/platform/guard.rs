/*!
 * IPL Guard
 *
 * RAII critical section: masks every interrupt on creation and restores the
 * previous level when dropped, on every exit path.
 */

use super::traits::InterruptController;
use crate::core::types::Ipl;

/// Interrupts masked for the guard's lifetime
#[must_use = "interrupts are unmasked again as soon as the guard is dropped"]
pub struct IplGuard<'a> {
    controller: &'a dyn InterruptController,
    saved: Ipl,
}

impl<'a> IplGuard<'a> {
    /// Raise to `Ipl::HIGH`, remembering the current level
    #[inline]
    pub fn raise(controller: &'a dyn InterruptController) -> Self {
        let saved = controller.set_ipl(Ipl::HIGH);
        Self { controller, saved }
    }

    /// Level restored on drop
    #[inline]
    pub fn saved(&self) -> Ipl {
        self.saved
    }
}

impl Drop for IplGuard<'_> {
    fn drop(&mut self) {
        self.controller.set_ipl(self.saved);
    }
}
