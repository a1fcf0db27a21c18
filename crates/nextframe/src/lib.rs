#![forbid(unsafe_code)]

//! Frame-aligned callback coalescing for high-frequency event handlers.
//!
//! High-frequency events (resize, scroll, pointer moves) often drive
//! handlers whose intermediate invocations are wasted work: only the latest
//! arguments matter by the time the UI repaints. This crate merges such
//! bursts into a single execution aligned to the host's rendering-refresh
//! cycle:
//!
//! - [`run_in_next_frame`]: run an action after two successive frame ticks,
//!   with a cancellation handle. The extra tick lets work already queued for
//!   the very next frame settle before the action runs.
//! - [`CoalescingScheduler`]: wrap a callback so that any burst of calls
//!   within one open window fires the callback exactly once, with the
//!   arguments of the last call.
//! - [`HandlerBinding`]: component-lifecycle adapter that memoizes one
//!   wrapper per `(callback identity, disabled)` pair and cancels pending
//!   work when the handler is replaced or torn down.
//!
//! # Architecture
//!
//! All state is single-threaded `Rc`/`RefCell`; nothing here is `Send`.
//! The host's frame primitive is consumed through the [`FrameClock`] trait,
//! never an ambient global, so a step-controlled [`ManualClock`] can stand
//! in for the real rendering loop in tests and headless hosts.
//!
//! # Invariants
//!
//! 1. A scheduler holds at most one live deferral; a window is open iff the
//!    deferral is present.
//! 2. One target invocation per window, with the last call's arguments.
//! 3. Cancellation is synchronous and idempotent; cancelling while idle or
//!    after firing is a no-op.
//! 4. The window resets on every exit path from the firing step, including
//!    a panicking target; a scheduler can never wedge.
//! 5. If the host never ticks, pending actions wait indefinitely; that is an
//!    accepted property of a rendering-aligned primitive, not an error.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use nextframe::{CoalescingScheduler, ManualClock};
//!
//! let clock = ManualClock::new();
//! let latest = Rc::new(Cell::new(0));
//! let sink = Rc::clone(&latest);
//! let on_resize = CoalescingScheduler::new(clock.clone(), move |w| sink.set(w));
//!
//! // A burst of resize events within one frame...
//! on_resize.invoke(800);
//! on_resize.invoke(810);
//! on_resize.invoke(820);
//!
//! // ...collapses to one execution, two ticks later.
//! clock.tick();
//! clock.tick();
//! assert_eq!(latest.get(), 820);
//! ```

pub mod binding;
pub mod clock;
pub mod coalesce;
pub mod deferral;

pub use binding::{BoundHandler, HandlerBinding};
pub use clock::{FrameClock, ManualClock, TickToken};
pub use coalesce::CoalescingScheduler;
pub use deferral::{DeferralHandle, run_in_next_frame};
