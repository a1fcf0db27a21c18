//! Frame-tick clock abstraction.
//!
//! The host platform's rendering-callback queue is consumed through the
//! [`FrameClock`] trait so schedulers never touch an ambient global. Real
//! hosts adapt their frame primitive behind this trait; tests (and headless
//! hosts) drive [`ManualClock`] step by step.
//!
//! # Invariants
//!
//! 1. `request` never invokes the callback synchronously; callbacks run only
//!    when the host fires a tick.
//! 2. Within one tick, callbacks fire in registration order.
//! 3. `cancel` with an unknown, already-fired, or already-cancelled token is
//!    a no-op.

use std::cell::RefCell;
use std::rc::Rc;

/// Opaque identifier for one registered frame callback.
///
/// Tokens are single-use: once the callback has fired or been cancelled, the
/// token is dead and further [`FrameClock::cancel`] calls with it do nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickToken(u64);

/// Host frame-tick primitive: register a callback for the next rendering
/// frame, or cancel a registration.
///
/// Implementations are single-threaded and cooperative. This crate never
/// defines or polyfills a real platform clock; it only depends on one being
/// supplied.
pub trait FrameClock {
    /// Register `callback` to run on the next frame tick.
    ///
    /// Must not invoke `callback` from inside `request` itself.
    fn request(&self, callback: Box<dyn FnOnce()>) -> TickToken;

    /// Deregister a previously requested callback.
    ///
    /// Dead tokens (fired, cancelled, or never issued) are ignored.
    fn cancel(&self, token: TickToken);
}

/// A deterministic, step-driven [`FrameClock`].
///
/// Each [`tick`](ManualClock::tick) call fires exactly the callbacks
/// registered before the call, in registration order. Callbacks registered
/// *while* a tick is firing land in the next tick, matching the semantics of
/// a rendering-callback queue.
///
/// Constructed as `Rc<ManualClock>` so it coerces to `Rc<dyn FrameClock>`
/// where schedulers expect one.
pub struct ManualClock {
    inner: RefCell<Inner>,
}

#[derive(Default)]
struct Inner {
    next_token: u64,
    queue: Vec<(TickToken, Box<dyn FnOnce()>)>,
}

impl ManualClock {
    /// Create a clock with an empty queue.
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            inner: RefCell::new(Inner::default()),
        })
    }

    /// Fire one frame tick.
    ///
    /// Runs every callback registered before this call, in registration
    /// order. If a callback panics, the rest of its batch is dropped.
    pub fn tick(&self) {
        let batch = std::mem::take(&mut self.inner.borrow_mut().queue);
        tracing::trace!(batch = batch.len(), "clock.tick");
        for (_, callback) in batch {
            callback();
        }
    }

    /// Number of callbacks waiting for the next tick.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.borrow().queue.len()
    }
}

impl FrameClock for ManualClock {
    fn request(&self, callback: Box<dyn FnOnce()>) -> TickToken {
        let mut inner = self.inner.borrow_mut();
        let token = TickToken(inner.next_token);
        inner.next_token += 1;
        inner.queue.push((token, callback));
        token
    }

    fn cancel(&self, token: TickToken) {
        self.inner.borrow_mut().queue.retain(|(t, _)| *t != token);
    }
}

impl std::fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualClock")
            .field("pending", &self.pending())
            .finish()
    }
}
