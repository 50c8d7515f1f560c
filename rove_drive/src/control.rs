//! Pluggable feedback controllers for the velocity loop.
//!
//! The motor component owns orchestration, direction bookkeeping, and the
//! safety clamp; the feedback law lives behind [`FeedbackController`].
//! Controllers carry tuning state, so they are cloned on attach — no two
//! motors may alias one instance.

use rove_common::config::PdConfig;

/// Stateful map from (velocity error, elapsed time) to a voltage command.
pub trait FeedbackController {
    /// Compute the voltage command for `error` [rev/s] over `dt` [s].
    ///
    /// `dt <= 0` yields `0.0` and leaves internal state untouched.
    fn solve(&mut self, error: f64, dt: f64) -> f64;

    /// Clear internal state (integrators, previous error).
    fn reset(&mut self);

    /// Clone into an owned boxed instance. Attachment goes through this so
    /// tuning state is never shared across motors.
    fn box_clone(&self) -> Box<dyn FeedbackController>;
}

impl Clone for Box<dyn FeedbackController> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Proportional-derivative velocity controller.
///
/// Derivative acts on the error signal; the first solve after construction
/// or [`reset`](FeedbackController::reset) has no derivative contribution
/// (no previous sample to difference against).
#[derive(Debug, Clone)]
pub struct PdController {
    /// Proportional gain [V per rev/s].
    kp: f64,
    /// Derivative gain (0 = disabled).
    kd: f64,
    /// Error from the previous solve.
    prev_error: Option<f64>,
}

impl PdController {
    /// Create a PD controller with the given gains.
    pub fn new(kp: f64, kd: f64) -> Self {
        Self {
            kp,
            kd,
            prev_error: None,
        }
    }

    /// Build from configuration gains.
    pub fn from_config(config: &PdConfig) -> Self {
        Self::new(config.kp, config.kd)
    }
}

impl FeedbackController for PdController {
    fn solve(&mut self, error: f64, dt: f64) -> f64 {
        if dt <= 0.0 {
            return 0.0;
        }

        let p_term = self.kp * error;

        let d_term = if self.kd != 0.0 {
            match self.prev_error {
                Some(prev) => self.kd * (error - prev) / dt,
                None => 0.0,
            }
        } else {
            0.0
        };

        self.prev_error = Some(error);
        p_term + d_term
    }

    fn reset(&mut self) {
        self.prev_error = None;
    }

    fn box_clone(&self) -> Box<dyn FeedbackController> {
        Box::new(self.clone())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
