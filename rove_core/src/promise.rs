//! Promise combinators built on the scheduler's deferred-callback primitive.
//!
//! A [`Promise`] is a single-assignment future: Pending with an ordered
//! continuation list, or Resolved. It transitions exactly once; resolving a
//! resolved promise is an invalid-state error, never silently ignored, so
//! sequencing bugs surface early.
//!
//! Promises are the non-blocking way to express multi-tick behavior
//! sequences: `then` for continuation/chaining, [`Promise::all`] for fan-in,
//! [`Promise::timeout`] for delay, [`Promise::immediate`] for pre-resolved
//! values. All continuation execution is synchronous and happens either at
//! registration (already resolved) or at the moment of resolution, in
//! registration order.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use thiserror::Error;
use tracing::error;

use crate::scheduler::{Scheduler, SchedulerError};

/// Promise state errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PromiseError {
    /// The promise was already resolved; a second resolution is a
    /// sequencing bug in the caller.
    #[error("promise already resolved")]
    AlreadyResolved,
}

enum State {
    /// Continuations awaiting resolution, in registration order.
    Pending(Vec<Box<dyn FnOnce()>>),
    Resolved,
}

/// Single-assignment cooperative future.
///
/// Cheap clone: clones share one state cell, so any holder may register
/// continuations and the owner may resolve.
#[derive(Clone)]
pub struct Promise {
    state: Rc<RefCell<State>>,
}

impl Promise {
    /// Create an unresolved promise, resolved later by its owner.
    pub fn pending() -> Self {
        Self {
            state: Rc::new(RefCell::new(State::Pending(Vec::new()))),
        }
    }

    /// Create a promise already in the Resolved state.
    pub fn immediate() -> Self {
        Self {
            state: Rc::new(RefCell::new(State::Resolved)),
        }
    }

    /// True once the promise has resolved.
    pub fn is_resolved(&self) -> bool {
        matches!(*self.state.borrow(), State::Resolved)
    }

    /// Transition Pending → Resolved and run all registered continuations
    /// in registration order.
    ///
    /// Continuations run outside the state borrow, so they may freely
    /// register further continuations on this (now resolved) promise.
    ///
    /// # Errors
    /// [`PromiseError::AlreadyResolved`] on a second resolution.
    pub fn resolve(&self) -> Result<(), PromiseError> {
        let continuations = {
            let mut state = self.state.borrow_mut();
            match &mut *state {
                State::Resolved => return Err(PromiseError::AlreadyResolved),
                State::Pending(continuations) => {
                    let drained = std::mem::take(continuations);
                    *state = State::Resolved;
                    drained
                }
            }
        };
        for continuation in continuations {
            continuation();
        }
        Ok(())
    }

    /// Register a continuation.
    ///
    /// If the promise is already resolved, the continuation runs immediately
    /// and synchronously; otherwise it runs exactly once at resolution, after
    /// all continuations registered before it.
    pub fn then(&self, continuation: impl FnOnce() + 'static) {
        {
            let mut state = self.state.borrow_mut();
            if let State::Pending(continuations) = &mut *state {
                continuations.push(Box::new(continuation));
                return;
            }
        }
        continuation();
    }

    /// Chaining form: returns a promise that resolves exactly when the
    /// promise produced by `produce` (invoked only after `self` resolves)
    /// itself resolves.
    ///
    /// If `self` is already resolved, `produce` runs now and its promise is
    /// returned directly, with no extra indirection.
    pub fn then_promise(&self, produce: impl FnOnce() -> Promise + 'static) -> Promise {
        if self.is_resolved() {
            return produce();
        }
        let derived = Promise::pending();
        let output = derived.clone();
        self.then(move || {
            let produced = produce();
            produced.then(move || derived.resolve_for_combinator());
        });
        output
    }

    /// Promise that resolves once `seconds` of scheduler time have elapsed.
    ///
    /// # Errors
    /// [`SchedulerError::InvalidDelay`] for negative or non-finite delays.
    pub fn timeout(scheduler: &Scheduler, seconds: f64) -> Result<Promise, SchedulerError> {
        let promise = Promise::pending();
        let resolving = promise.clone();
        scheduler.set_timeout(
            move || {
                resolving.resolve()?;
                Ok(())
            },
            seconds,
        )?;
        Ok(promise)
    }

    /// Fan-in: resolves exactly once, exactly when every input has resolved,
    /// independent of resolution order. Zero inputs resolve immediately.
    ///
    /// Each input contributes through a single continuation, so one input
    /// can never double-count.
    pub fn all(promises: impl IntoIterator<Item = Promise>) -> Promise {
        let promises: Vec<Promise> = promises.into_iter().collect();
        let output = Promise::pending();
        if promises.is_empty() {
            output.resolve_for_combinator();
            return output;
        }
        let remaining = Rc::new(Cell::new(promises.len()));
        for promise in &promises {
            let remaining = remaining.clone();
            let output = output.clone();
            promise.then(move || {
                remaining.set(remaining.get() - 1);
                if remaining.get() == 0 {
                    output.resolve_for_combinator();
                }
            });
        }
        output
    }

    /// Resolve a combinator-owned promise. The combinator wiring guarantees
    /// a single resolution; a failure here is a library bug, so it is logged
    /// rather than propagated into a continuation that cannot return it.
    fn resolve_for_combinator(&self) {
        if let Err(e) = self.resolve() {
            error!(error = %e, "combinator promise resolved twice");
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
