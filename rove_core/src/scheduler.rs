//! Tick-driven cooperative scheduler.
//!
//! Owns the authoritative notion of time, the pending set of deferred
//! callbacks, and the registry of periodic components. One [`Scheduler`]
//! exists per process; it is a cheap-clone handle (`Rc<RefCell<_>>`) passed
//! to every component constructor rather than ambient global state, which
//! keeps it testable in isolation and pins all mutation to one thread.
//!
//! ## Tick Pass
//!
//! [`Scheduler::tick`] advances time by `dt`, then:
//! 1. Dispatches every deferred callback whose deadline is now due, earliest
//!    deadline first, FIFO among equal deadlines. Each callback is removed
//!    from the pending set before it runs, so an action that re-arms itself
//!    via [`Scheduler::set_timeout`] lands in the next pass.
//! 2. Ticks every registered component in registration order.
//!
//! Failures in either phase are logged, recorded in the returned
//! [`TickReport`], and never halt the rest of the pass.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;
use tracing::error;

use crate::component::{BoxError, ScheduledComponent};

/// Fallible arity-zero action run once its deadline elapses.
pub type DeferredAction = Box<dyn FnOnce() -> Result<(), BoxError>>;

// ─── Error Type ─────────────────────────────────────────────────────

/// Scheduling errors.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SchedulerError {
    /// Timeout delay was negative or non-finite. Rejecting it here keeps the
    /// invariant that no pending deadline is ever earlier than current time.
    #[error("invalid timeout delay {delay}: must be finite and non-negative")]
    InvalidDelay {
        /// The offending delay [s].
        delay: f64,
    },

    /// Tick step was negative or non-finite; time must be monotonic.
    #[error("invalid tick step {dt}: must be finite and non-negative")]
    InvalidStep {
        /// The offending step [s].
        dt: f64,
    },

    /// A component's cell was already borrowed when its tick came due.
    #[error("component busy: tick re-entered while already borrowed")]
    ComponentBusy,

    /// A component's cell was still borrowed when its deferred cleanup ran.
    #[error("component busy: cleanup deferred but cell still borrowed")]
    CleanupBusy,
}

// ─── Identifiers ────────────────────────────────────────────────────

/// Handle to a pending deferred callback, usable with
/// [`Scheduler::cancel_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeoutId(u64);

/// Handle to a registered periodic component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(u64);

// ─── Tick Report & Stats ────────────────────────────────────────────

/// Failure recorded during one tick pass.
#[derive(Debug)]
pub enum TickFailure {
    /// The pass was rejected outright: non-monotonic or non-finite step.
    InvalidStep {
        /// The offending step [s].
        dt: f64,
    },
    /// A deferred callback returned an error.
    Deferred {
        /// Handle of the failed callback.
        id: TimeoutId,
        /// The error it returned.
        error: BoxError,
    },
    /// A component tick returned an error or could not be entered.
    Component {
        /// Handle of the failed component.
        id: ComponentId,
        /// The error it returned.
        error: BoxError,
    },
}

/// Outcome of one tick pass.
///
/// Every failure path in the pass is observable here (and via
/// `tracing::error!`); nothing vanishes silently.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Deferred callbacks dispatched this pass.
    pub callbacks_fired: usize,
    /// Components ticked this pass.
    pub components_ticked: usize,
    /// Per-entry failures, in dispatch order.
    pub failures: Vec<TickFailure>,
}

impl TickReport {
    /// True when the pass completed without any failure.
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// O(1) cumulative scheduler counters, updated every pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerStats {
    /// Tick passes executed.
    pub ticks: u64,
    /// Deferred callbacks fired.
    pub callbacks_fired: u64,
    /// Component ticks executed.
    pub component_ticks: u64,
    /// Failures recorded across all passes.
    pub failures: u64,
}

impl SchedulerStats {
    #[inline]
    fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.callbacks_fired += report.callbacks_fired as u64;
        self.component_ticks += report.components_ticked as u64;
        self.failures += report.failures.len() as u64;
    }
}

// ─── Scheduler ──────────────────────────────────────────────────────

struct Deferred {
    /// Doubles as the FIFO tie-break among equal deadlines.
    id: u64,
    /// Absolute scheduler time at which the action becomes due [s].
    deadline: f64,
    action: DeferredAction,
}

struct Inner {
    /// Current scheduler time [s]. Monotonically non-decreasing.
    now: f64,
    /// Source for both timeout and component handles.
    next_id: u64,
    /// Pending deferred callbacks, insertion order.
    pending: Vec<Deferred>,
    /// Registered components, registration order.
    components: Vec<(ComponentId, Rc<RefCell<dyn ScheduledComponent>>)>,
    stats: SchedulerStats,
}

/// Cheap-clone handle to the process-wide cooperative scheduler.
///
/// `!Send` by construction: the pending set and registry are mutated only
/// from the owning thread, matching the single-threaded cooperative model.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<RefCell<Inner>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Create a scheduler with time at zero and empty queue/registry.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                now: 0.0,
                next_id: 0,
                pending: Vec::new(),
                components: Vec::new(),
                stats: SchedulerStats::default(),
            })),
        }
    }

    /// Current scheduler time [s].
    pub fn now(&self) -> f64 {
        self.inner.borrow().now
    }

    /// Cumulative counters across all passes.
    pub fn stats(&self) -> SchedulerStats {
        self.inner.borrow().stats
    }

    /// Number of deferred callbacks not yet fired or cancelled.
    pub fn pending_timeouts(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// Number of registered components.
    pub fn component_count(&self) -> usize {
        self.inner.borrow().components.len()
    }

    // ── Deferred callbacks ──

    /// Schedule `action` to run once, no sooner than `delay_s` seconds of
    /// scheduler time from now.
    ///
    /// `delay_s = 0.0` means "during the next tick pass", never
    /// synchronously in the caller's context.
    ///
    /// # Errors
    /// [`SchedulerError::InvalidDelay`] for negative or non-finite delays;
    /// a deadline in the past would violate the dispatch invariant, so it is
    /// rejected at scheduling time rather than dropped later.
    pub fn set_timeout<F>(&self, action: F, delay_s: f64) -> Result<TimeoutId, SchedulerError>
    where
        F: FnOnce() -> Result<(), BoxError> + 'static,
    {
        if !delay_s.is_finite() || delay_s < 0.0 {
            return Err(SchedulerError::InvalidDelay { delay: delay_s });
        }
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        let deadline = inner.now + delay_s;
        inner.pending.push(Deferred {
            id,
            deadline,
            action: Box::new(action),
        });
        Ok(TimeoutId(id))
    }

    /// Cancel a pending deferred callback.
    ///
    /// Returns `true` if the callback was still pending and is now removed;
    /// `false` if it already fired, was already cancelled, or is unknown.
    pub fn cancel_timeout(&self, id: TimeoutId) -> bool {
        let mut inner = self.inner.borrow_mut();
        match inner.pending.iter().position(|d| d.id == id.0) {
            Some(pos) => {
                inner.pending.remove(pos);
                true
            }
            None => false,
        }
    }

    // ── Component registry ──

    /// Add a periodic component to the registry; it is ticked every pass
    /// until [`Scheduler::unregister`].
    ///
    /// Idempotent by pointer identity: registering the same cell again
    /// returns the existing handle without duplicating ticks.
    pub fn register(&self, component: Rc<RefCell<dyn ScheduledComponent>>) -> ComponentId {
        let mut inner = self.inner.borrow_mut();
        // Compare data addresses, not fat pointers: vtable identity is not
        // stable across coercion sites.
        let addr = Rc::as_ptr(&component).cast::<()>();
        if let Some((id, _)) = inner
            .components
            .iter()
            .find(|(_, existing)| std::ptr::eq(Rc::as_ptr(existing).cast::<()>(), addr))
        {
            return *id;
        }
        let id = ComponentId(inner.next_id);
        inner.next_id += 1;
        inner.components.push((id, component));
        id
    }

    /// Remove a component from the registry and run its `cleanup()` exactly
    /// once. No tick follows. Returns `false` for an unknown handle.
    ///
    /// When called from inside the component's own `tick` (self-removal),
    /// the cell is still borrowed, so cleanup runs at the start of the next
    /// pass instead — still after removal, still exactly once.
    pub fn unregister(&self, id: ComponentId) -> bool {
        let component = {
            let mut inner = self.inner.borrow_mut();
            match inner.components.iter().position(|(cid, _)| *cid == id) {
                Some(pos) => inner.components.remove(pos).1,
                None => return false,
            }
        };
        match component.try_borrow_mut() {
            Ok(mut c) => c.cleanup(),
            Err(_) => {
                let deferred = component.clone();
                let scheduled = self.set_timeout(
                    move || {
                        let mut c = deferred
                            .try_borrow_mut()
                            .map_err(|_| SchedulerError::CleanupBusy)?;
                        c.cleanup();
                        Ok(())
                    },
                    0.0,
                );
                // Zero delay cannot be rejected, but never drop a cleanup
                // silently.
                if let Err(e) = scheduled {
                    error!(component = id.0, error = %e, "failed to defer cleanup");
                }
            }
        }
        true
    }

    // ── Tick pass ──

    /// Advance scheduler time by `dt` seconds and run one pass: due deferred
    /// callbacks first (deadline order, FIFO on ties), then every registered
    /// component in registration order.
    pub fn tick(&self, dt: f64) -> TickReport {
        let mut report = TickReport::default();

        if !dt.is_finite() || dt < 0.0 {
            error!(dt, "tick rejected: step must be finite and non-negative");
            report.failures.push(TickFailure::InvalidStep { dt });
            self.inner.borrow_mut().stats.record(&report);
            return report;
        }

        // Phase 1: advance time and drain due callbacks. The borrow is
        // released before any action runs so actions can re-enter the
        // scheduler (set_timeout, register, ...); anything they schedule is
        // due next pass at the earliest.
        let due = {
            let mut inner = self.inner.borrow_mut();
            inner.now += dt;
            let now = inner.now;
            let mut due = Vec::new();
            let mut i = 0;
            while i < inner.pending.len() {
                if inner.pending[i].deadline <= now {
                    due.push(inner.pending.remove(i));
                } else {
                    i += 1;
                }
            }
            due.sort_by(|a, b| a.deadline.total_cmp(&b.deadline).then(a.id.cmp(&b.id)));
            due
        };

        for deferred in due {
            report.callbacks_fired += 1;
            if let Err(e) = (deferred.action)() {
                error!(timeout = deferred.id, error = %e, "deferred callback failed");
                report.failures.push(TickFailure::Deferred {
                    id: TimeoutId(deferred.id),
                    error: e,
                });
            }
        }

        // Phase 2: component ticks. Snapshot the roster so components may
        // register/unregister mid-pass; entries removed earlier in this pass
        // are skipped.
        let roster: Vec<(ComponentId, Rc<RefCell<dyn ScheduledComponent>>)> = {
            let inner = self.inner.borrow();
            inner
                .components
                .iter()
                .map(|(id, c)| (*id, c.clone()))
                .collect()
        };

        for (id, component) in roster {
            if !self.is_registered(id) {
                continue;
            }
            match component.try_borrow_mut() {
                Ok(mut c) => {
                    report.components_ticked += 1;
                    if let Err(e) = c.tick(dt) {
                        error!(component = id.0, error = %e, "component tick failed");
                        report.failures.push(TickFailure::Component { id, error: e });
                    }
                }
                Err(_) => {
                    error!(component = id.0, "component cell busy, tick skipped");
                    report.failures.push(TickFailure::Component {
                        id,
                        error: Box::new(SchedulerError::ComponentBusy),
                    });
                }
            }
        }

        self.inner.borrow_mut().stats.record(&report);
        report
    }

    /// Tear down on shutdown: drop every pending callback unfired and
    /// unregister every component, running each `cleanup()` once.
    ///
    /// The scheduler remains usable afterwards, just empty.
    pub fn shutdown(&self) {
        let components = {
            let mut inner = self.inner.borrow_mut();
            inner.pending.clear();
            std::mem::take(&mut inner.components)
        };
        for (id, component) in components {
            match component.try_borrow_mut() {
                Ok(mut c) => c.cleanup(),
                Err(_) => {
                    error!(component = id.0, "component busy during shutdown, cleanup skipped");
                }
            }
        }
    }

    fn is_registered(&self, id: ComponentId) -> bool {
        self.inner
            .borrow()
            .components
            .iter()
            .any(|(cid, _)| *cid == id)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
