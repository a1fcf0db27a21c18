//! Call coalescing onto the frame clock.
//!
//! [`CoalescingScheduler`] wraps a target callback so that any burst of
//! calls landing within one scheduling window produces exactly one target
//! invocation, using the arguments of the last call. The window spans two
//! frame ticks (see [`run_in_next_frame`](crate::deferral::run_in_next_frame));
//! after it fires or is cancelled the scheduler is idle again and the next
//! call opens an independent window.
//!
//! # Invariants
//!
//! 1. At most one deferral is live per scheduler at any time; a window is
//!    open if and only if the deferral handle is present.
//! 2. Last-write-wins: the target fires with the arguments of the temporally
//!    last `invoke`; intermediate argument sets are discarded.
//! 3. At-most-once firing per window.
//! 4. The window is reset on every exit path from the firing step, including
//!    a panicking target, so the scheduler can never wedge with a window
//!    that will never fire.
//!
//! # Failure Modes
//!
//! A panicking target propagates through the frame dispatch to the host's
//! error surface; it is not caught or retried here. Invariant 4 still holds.

use std::cell::RefCell;
use std::rc::Rc;

use crate::clock::FrameClock;
use crate::deferral::{DeferralHandle, run_in_next_frame};

/// Per-scheduler window state.
struct Window<A> {
    /// Arguments of the most recent `invoke`; overwritten on every call
    /// while the window is open.
    latest: Option<A>,
    /// Handle for the open window, if any. `Some` iff a window is open.
    deferral: Option<DeferralHandle>,
}

/// Clears the window's deferral when dropped.
///
/// Armed around the firing step so the reset runs whether the target
/// returns or panics.
struct WindowReset<'a, A>(&'a Rc<RefCell<Window<A>>>);

impl<A> Drop for WindowReset<'_, A> {
    fn drop(&mut self) {
        self.0.borrow_mut().deferral = None;
    }
}

/// A coalescing, cancellable, repeatedly-invokable wrapper around a callback.
///
/// Generic over one argument value `A`; callbacks taking several arguments
/// use a tuple. Cloning is cheap and shares the same window, so a clone's
/// `invoke` merges into the original's open window.
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use nextframe::{CoalescingScheduler, ManualClock};
///
/// let clock = ManualClock::new();
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&seen);
/// let sched = CoalescingScheduler::new(clock.clone(), move |v: u32| {
///     sink.borrow_mut().push(v);
/// });
///
/// sched.invoke(1);
/// sched.invoke(2);
/// sched.invoke(3);
/// clock.tick();
/// clock.tick();
/// assert_eq!(*seen.borrow(), vec![3]);
/// ```
pub struct CoalescingScheduler<A> {
    clock: Rc<dyn FrameClock>,
    target: Rc<dyn Fn(A)>,
    window: Rc<RefCell<Window<A>>>,
}

impl<A> Clone for CoalescingScheduler<A> {
    fn clone(&self) -> Self {
        Self {
            clock: Rc::clone(&self.clock),
            target: Rc::clone(&self.target),
            window: Rc::clone(&self.window),
        }
    }
}

impl<A> std::fmt::Debug for CoalescingScheduler<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoalescingScheduler")
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl<A: 'static> CoalescingScheduler<A> {
    /// Wrap `target` in a new, idle scheduler.
    ///
    /// Each call yields fully independent state; schedulers never share
    /// windows unless cloned from one another.
    pub fn new(clock: Rc<dyn FrameClock>, target: impl Fn(A) + 'static) -> Self {
        Self {
            clock,
            target: Rc::new(target),
            window: Rc::new(RefCell::new(Window {
                latest: None,
                deferral: None,
            })),
        }
    }

    /// Record `args` as the latest arguments and open a scheduling window if
    /// none is open.
    ///
    /// While a window is open, further calls only overwrite the recorded
    /// arguments; the target fires once, two ticks after the window-opening
    /// call, with whatever was recorded last. The window reset happens after
    /// the target returns, so an `invoke` issued from inside the target
    /// merges into the closing window rather than opening a new one.
    pub fn invoke(&self, args: A) {
        let mut window = self.window.borrow_mut();
        window.latest = Some(args);
        if window.deferral.is_some() {
            tracing::trace!("coalesce.merge");
            return;
        }

        let target = Rc::clone(&self.target);
        let fire_window = Rc::clone(&self.window);
        let handle = run_in_next_frame(Rc::clone(&self.clock), move || {
            let args = fire_window.borrow_mut().latest.take();
            let _reset = WindowReset(&fire_window);
            tracing::trace!("coalesce.fire");
            if let Some(args) = args {
                (target)(args);
            }
        });
        window.deferral = Some(handle);
        tracing::trace!("coalesce.open");
    }
}

// `cancel` and `is_pending` stay free of the `'static` bound so they are
// callable from `Debug` and drop paths over any `A`.
impl<A> CoalescingScheduler<A> {
    /// Cancel the open window, discarding the recorded arguments.
    ///
    /// Calling while idle is a no-op. A subsequent `invoke` opens a fresh
    /// window.
    pub fn cancel(&self) {
        let mut window = self.window.borrow_mut();
        if let Some(handle) = window.deferral.take() {
            handle.cancel();
            window.latest = None;
            tracing::trace!("coalesce.cancel");
        }
    }

    /// Whether a scheduling window is currently open.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.window.borrow().deferral.is_some()
    }
}
