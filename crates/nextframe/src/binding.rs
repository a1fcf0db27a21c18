//! Event-handler binding that conditionally interposes a coalescing
//! scheduler.
//!
//! [`HandlerBinding`] is the component-lifecycle adapter: it memoizes one
//! resolved handler per `(callback identity, disabled)` pair, the way a UI
//! framework's dependency-tracked memoization would. When `disabled` is true
//! the raw callback passes through untouched; otherwise calls route through
//! a [`CoalescingScheduler`].
//!
//! Replacing a handler (identity or flag changed) cancels the outgoing
//! wrapper's pending window, as does dropping the binding, so a torn-down
//! component never leaves a deferred callback behind.

use std::cell::RefCell;
use std::rc::Rc;

use crate::clock::FrameClock;
use crate::coalesce::CoalescingScheduler;

/// A resolved event handler: either the raw callback or a coalescing
/// wrapper around it.
pub enum BoundHandler<A> {
    /// Coalescing disabled; every call reaches the callback immediately.
    Direct(Rc<dyn Fn(A)>),
    /// Calls within one window merge into a single frame-aligned execution.
    Coalesced(CoalescingScheduler<A>),
}

impl<A: 'static> BoundHandler<A> {
    /// Dispatch one event through the handler.
    pub fn call(&self, args: A) {
        match self {
            Self::Direct(callback) => callback(args),
            Self::Coalesced(scheduler) => scheduler.invoke(args),
        }
    }
}

impl<A> BoundHandler<A> {
    /// Cancel a pending window, if any. No-op for direct handlers.
    ///
    /// Free of the `'static` bound so the binding's drop path can call it.
    pub fn cancel(&self) {
        if let Self::Coalesced(scheduler) = self {
            scheduler.cancel();
        }
    }
}

impl<A> Clone for BoundHandler<A> {
    fn clone(&self) -> Self {
        match self {
            Self::Direct(callback) => Self::Direct(Rc::clone(callback)),
            Self::Coalesced(scheduler) => Self::Coalesced(scheduler.clone()),
        }
    }
}

impl<A> std::fmt::Debug for BoundHandler<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct(_) => f.write_str("BoundHandler::Direct"),
            Self::Coalesced(scheduler) => {
                f.debug_tuple("BoundHandler::Coalesced").field(scheduler).finish()
            }
        }
    }
}

struct Entry<A> {
    callback: Rc<dyn Fn(A)>,
    disabled: bool,
    handler: BoundHandler<A>,
}

/// Memoizing holder for one event handler slot.
///
/// `resolve` rebuilds the handler only when the callback identity
/// (`Rc::ptr_eq`) or the `disabled` flag changes; otherwise it returns a
/// clone of the cached handler, preserving any open window.
pub struct HandlerBinding<A> {
    clock: Rc<dyn FrameClock>,
    current: RefCell<Option<Entry<A>>>,
}

impl<A: 'static> HandlerBinding<A> {
    /// Create an empty binding over `clock`.
    #[must_use]
    pub fn new(clock: Rc<dyn FrameClock>) -> Self {
        Self {
            clock,
            current: RefCell::new(None),
        }
    }

    /// Resolve the handler for `(callback, disabled)`.
    ///
    /// On a cache miss the previous handler's pending window is cancelled
    /// before the replacement is built.
    pub fn resolve(&self, callback: Rc<dyn Fn(A)>, disabled: bool) -> BoundHandler<A> {
        let mut current = self.current.borrow_mut();
        if let Some(entry) = current.as_ref()
            && Rc::ptr_eq(&entry.callback, &callback)
            && entry.disabled == disabled
        {
            return entry.handler.clone();
        }

        if let Some(previous) = current.take() {
            tracing::trace!(disabled, "binding.replace");
            previous.handler.cancel();
        }

        let handler = if disabled {
            BoundHandler::Direct(Rc::clone(&callback))
        } else {
            let target = Rc::clone(&callback);
            BoundHandler::Coalesced(CoalescingScheduler::new(
                Rc::clone(&self.clock),
                move |args| target(args),
            ))
        };
        *current = Some(Entry {
            callback,
            disabled,
            handler: handler.clone(),
        });
        handler
    }
}

impl<A> Drop for HandlerBinding<A> {
    fn drop(&mut self) {
        if let Some(entry) = self.current.borrow_mut().take() {
            entry.handler.cancel();
        }
    }
}

impl<A> std::fmt::Debug for HandlerBinding<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("bound", &self.current.borrow().is_some())
            .finish()
    }
}
