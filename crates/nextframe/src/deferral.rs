//! Cancellable double-frame deferral.
//!
//! [`run_in_next_frame`] runs an action after two successive frame ticks:
//! the first tick lets work already queued for the upcoming frame (layout
//! reads/writes triggered by the current synchronous turn) settle, and the
//! action fires inside the second tick's dispatch. The returned
//! [`DeferralHandle`] cancels the action at any point before it fires.
//!
//! # Invariants
//!
//! 1. At most one tick registration is live per deferral at any time; the
//!    second registration replaces the first in the shared slot.
//! 2. `cancel` is idempotent: before the second tick fires it prevents the
//!    action from ever running; afterwards it is a no-op. This holds even
//!    when the cancel runs from inside frame-callback dispatch, ahead of a
//!    chain callback the host has already drained from its queue.
//! 3. The handle is retired when the second tick begins firing, so
//!    cancel-after-fire stays a no-op even if the action panicked.

use std::cell::Cell;
use std::rc::Rc;

use crate::clock::{FrameClock, TickToken};

/// Cancellation handle for a pending [`run_in_next_frame`] action.
///
/// Single-use: once the action has fired or the handle has been cancelled,
/// further `cancel` calls do nothing.
pub struct DeferralHandle {
    clock: Rc<dyn FrameClock>,
    slot: Rc<Cell<Option<TickToken>>>,
}

impl DeferralHandle {
    /// Cancel the deferred action if it has not fired yet.
    pub fn cancel(&self) {
        if let Some(token) = self.slot.take() {
            tracing::trace!(?token, "deferral.cancel");
            self.clock.cancel(token);
        }
    }

    /// Whether the action is still waiting to fire.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl std::fmt::Debug for DeferralHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferralHandle")
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// Schedule `action` to run after exactly two successive frame ticks.
///
/// Returns a [`DeferralHandle`] that cancels the action while it is pending.
/// The slot holding the live [`TickToken`] is shared between the tick chain
/// and the handle: requesting the second tick replaces the first token,
/// implicitly retiring it.
pub fn run_in_next_frame(
    clock: Rc<dyn FrameClock>,
    action: impl FnOnce() + 'static,
) -> DeferralHandle {
    let slot: Rc<Cell<Option<TickToken>>> = Rc::new(Cell::new(None));

    let chain_slot = Rc::clone(&slot);
    let chain_clock = Rc::clone(&clock);
    let first = clock.request(Box::new(move || {
        // The slot is filled in the same synchronous turn as `request`, so
        // finding it empty here means a cancel ran earlier in this very
        // dispatch batch, after the host had already drained our token.
        if chain_slot.get().is_none() {
            return;
        }
        let fire_slot = Rc::clone(&chain_slot);
        let second = chain_clock.request(Box::new(move || {
            // Taking the token retires the handle before the action runs,
            // so a cancel issued from inside `action`, or after `action`
            // panics, is a no-op. An already-empty slot means a cancel ran
            // ahead of us in this batch; the action must not fire.
            if fire_slot.take().is_none() {
                return;
            }
            action();
        }));
        chain_slot.set(Some(second));
    }));
    slot.set(Some(first));
    tracing::trace!(token = ?first, "deferral.schedule");

    DeferralHandle { clock, slot }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::clock::ManualClock;

    fn counter() -> (Rc<Cell<u32>>, impl FnOnce() + 'static) {
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        (count, move || c.set(c.get() + 1))
    }

    #[test]
    fn fires_after_exactly_two_ticks() {
        let clock = ManualClock::new();
        let (count, action) = counter();
        let handle = run_in_next_frame(clock.clone(), action);

        assert!(handle.is_pending());
        clock.tick();
        assert_eq!(count.get(), 0, "must not fire on the first tick");
        assert!(handle.is_pending());

        clock.tick();
        assert_eq!(count.get(), 1);
        assert!(!handle.is_pending());

        // No residual registrations.
        clock.tick();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn cancel_before_first_tick() {
        let clock = ManualClock::new();
        let (count, action) = counter();
        let handle = run_in_next_frame(clock.clone(), action);

        handle.cancel();
        clock.tick();
        clock.tick();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn cancel_between_ticks() {
        let clock = ManualClock::new();
        let (count, action) = counter();
        let handle = run_in_next_frame(clock.clone(), action);

        clock.tick();
        handle.cancel();
        clock.tick();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn cancel_after_fire_is_noop() {
        let clock = ManualClock::new();
        let (count, action) = counter();
        let handle = run_in_next_frame(clock.clone(), action);

        clock.tick();
        clock.tick();
        assert_eq!(count.get(), 1);

        handle.cancel();
        handle.cancel();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn cancel_from_batch_ahead_of_the_first_tick_callback() {
        let clock = ManualClock::new();
        let (count, action) = counter();
        let handle_slot: Rc<RefCell<Option<DeferralHandle>>> = Rc::new(RefCell::new(None));

        // Runs in the same tick as the deferral's first callback, but ahead
        // of it; the host has already drained both from its queue.
        let slot = Rc::clone(&handle_slot);
        clock.request(Box::new(move || {
            if let Some(handle) = slot.borrow().as_ref() {
                handle.cancel();
            }
        }));
        *handle_slot.borrow_mut() = Some(run_in_next_frame(clock.clone(), action));

        clock.tick();
        clock.tick();
        clock.tick();
        assert_eq!(count.get(), 0, "cancel issued before the action fired must prevent it");
    }

    #[test]
    fn cancel_from_batch_ahead_of_the_second_tick_callback() {
        let clock = ManualClock::new();
        let (count, action) = counter();
        let handle_slot: Rc<RefCell<Option<DeferralHandle>>> = Rc::new(RefCell::new(None));

        // First tick: queue a canceller ahead of the deferral's second-tick
        // callback.
        let slot = Rc::clone(&handle_slot);
        let canceller_clock = Rc::clone(&clock);
        clock.request(Box::new(move || {
            canceller_clock.request(Box::new(move || {
                if let Some(handle) = slot.borrow().as_ref() {
                    handle.cancel();
                }
            }));
        }));
        *handle_slot.borrow_mut() = Some(run_in_next_frame(clock.clone(), action));

        clock.tick();
        clock.tick();
        clock.tick();
        assert_eq!(count.get(), 0, "cancel issued before the action fired must prevent it");
    }

    #[test]
    fn independent_deferrals_do_not_interfere() {
        let clock = ManualClock::new();
        let (count_a, action_a) = counter();
        let (count_b, action_b) = counter();

        let handle_a = run_in_next_frame(clock.clone(), action_a);
        let _handle_b = run_in_next_frame(clock.clone(), action_b);

        handle_a.cancel();
        clock.tick();
        clock.tick();

        assert_eq!(count_a.get(), 0);
        assert_eq!(count_b.get(), 1);
    }
}
