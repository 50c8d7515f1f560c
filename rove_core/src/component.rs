//! Periodic component contract.
//!
//! A [`ScheduledComponent`] is an entity ticked on every scheduler pass
//! until unregistered. Components are registered explicitly (see
//! [`crate::Scheduler::register`]) and removed explicitly; `cleanup()` runs
//! at most once, only after removal, and no tick follows it.

/// Boxed error for tick/callback failure paths.
///
/// Components and deferred actions come from different subsystems with
/// different error types; the scheduler only needs to report them, so the
/// seam is type-erased.
pub type BoxError = Box<dyn std::error::Error>;

/// Contract for an entity driven by the scheduler every pass.
///
/// # Lifecycle
///
/// 1. `register()` - added to the registry, ticked from the next pass
/// 2. `tick()` - called once per pass with the elapsed time
/// 3. `cleanup()` - called exactly once after unregistration
pub trait ScheduledComponent {
    /// Advance this component by `dt` seconds of scheduler time.
    ///
    /// Must not block. Errors are isolated per component: a failure here is
    /// reported in the pass's [`crate::TickReport`] and does not stop other
    /// components from ticking.
    fn tick(&mut self, dt: f64) -> Result<(), BoxError>;

    /// Release resources after unregistration. No tick follows this call.
    fn cleanup(&mut self) {}
}
