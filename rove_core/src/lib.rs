//! # ROVE Core
//!
//! Cooperative real-time execution core: a tick-driven scheduler that
//! advances every active control loop and resolves deferred work, plus a
//! promise-style combinator library built entirely on the scheduler's
//! deferred-callback primitive.
//!
//! ## Execution Model
//!
//! Single-threaded and cooperative. The surrounding real-time loop calls
//! [`Scheduler::tick`] once per control period; each pass first fires every
//! deferred callback whose deadline has elapsed (earliest deadline first,
//! FIFO on ties), then ticks every registered [`ScheduledComponent`] in
//! registration order. Nothing blocks: waiting for a future event is
//! expressed by registering a continuation ([`Promise::then`]) or a deferred
//! callback ([`Scheduler::set_timeout`]), never by spinning or sleeping.
//!
//! ## Failure Isolation
//!
//! A failing deferred callback or component tick is logged, recorded in the
//! pass's [`TickReport`], and never prevents the remaining queue and
//! registry entries from running.

pub mod component;
pub mod promise;
pub mod scheduler;

pub use component::{BoxError, ScheduledComponent};
pub use promise::{Promise, PromiseError};
pub use scheduler::{
    ComponentId, Scheduler, SchedulerError, SchedulerStats, TickFailure, TickReport, TimeoutId,
};
