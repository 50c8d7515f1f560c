//! # ROVE Drive
//!
//! Closed-loop motor control on top of the ROVE execution core.
//!
//! - [`motor`] - the generic scheduled motor component: deferred hardware
//!   init, voltage-direct and velocity-controlled modes, direction
//!   bookkeeping, and the voltage safety clamp
//! - [`control`] - the pluggable feedback-controller seam and a PD
//!   implementation
//! - [`sim`] - a software motor backend for development and tests

pub mod control;
pub mod motor;
pub mod sim;

pub use control::{FeedbackController, PdController};
pub use motor::{Motor, MotorError};
pub use sim::{SimPlant, SimulatedMotor};
