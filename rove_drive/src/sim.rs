//! Software motor backend for development and tests.
//!
//! [`SimulatedMotor`] emulates a voltage-driven motor with first-order
//! velocity dynamics; [`SimPlant`] is the scheduled component that advances
//! the physics every pass, standing in for the real world.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use rove_common::hal::{HalError, MotorDriver};
use rove_core::{BoxError, ScheduledComponent};

#[derive(Debug)]
struct SimState {
    /// Steady-state velocity per volt [rev/s per V].
    velocity_per_volt: f64,
    /// First-order response time constant [s] (0 = instantaneous).
    time_constant_s: f64,
    commanded_volts: f64,
    velocity: f64,
    position: f64,
    current_limit_amps: Option<u32>,
}

/// Simulated motor controller + encoder.
///
/// Cheap clone sharing one state cell, so the motor component can own one
/// handle while the test or demo keeps another to advance and inspect the
/// physics.
#[derive(Debug, Clone)]
pub struct SimulatedMotor {
    state: Rc<RefCell<SimState>>,
}

impl SimulatedMotor {
    /// Create a simulated motor with the given steady-state gain and
    /// response time constant.
    pub fn new(velocity_per_volt: f64, time_constant_s: f64) -> Self {
        Self {
            state: Rc::new(RefCell::new(SimState {
                velocity_per_volt,
                time_constant_s,
                commanded_volts: 0.0,
                velocity: 0.0,
                position: 0.0,
                current_limit_amps: None,
            })),
        }
    }

    /// Advance the physics by `dt` seconds: velocity lags toward the
    /// commanded steady state, position integrates velocity.
    pub fn advance(&self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        let mut state = self.state.borrow_mut();
        let steady = state.commanded_volts * state.velocity_per_volt;
        let alpha = if state.time_constant_s > 0.0 {
            dt / (state.time_constant_s + dt)
        } else {
            1.0
        };
        state.velocity += alpha * (steady - state.velocity);
        let velocity = state.velocity;
        state.position += velocity * dt;
        trace!(
            volts = state.commanded_volts,
            velocity = state.velocity,
            position = state.position,
            "sim step"
        );
    }

    /// Last commanded voltage [V].
    pub fn commanded_volts(&self) -> f64 {
        self.state.borrow().commanded_volts
    }

    /// Configured current limit, if init has run.
    pub fn current_limit(&self) -> Option<u32> {
        self.state.borrow().current_limit_amps
    }

    /// Force the simulated encoder position [rev].
    pub fn set_position(&self, position: f64) {
        self.state.borrow_mut().position = position;
    }
}

impl MotorDriver for SimulatedMotor {
    fn raw_position(&mut self) -> Result<f64, HalError> {
        Ok(self.state.borrow().position)
    }

    fn raw_velocity(&mut self) -> Result<f64, HalError> {
        Ok(self.state.borrow().velocity)
    }

    fn write_voltage(&mut self, volts: f64) -> Result<(), HalError> {
        self.state.borrow_mut().commanded_volts = volts;
        Ok(())
    }

    fn set_current_limit(&mut self, amps: u32) -> Result<(), HalError> {
        self.state.borrow_mut().current_limit_amps = Some(amps);
        Ok(())
    }
}

/// Scheduled component advancing a set of simulated motors every pass.
pub struct SimPlant {
    motors: Vec<SimulatedMotor>,
}

impl SimPlant {
    /// Create a plant over the given simulated motors.
    pub fn new(motors: Vec<SimulatedMotor>) -> Self {
        Self { motors }
    }
}

impl ScheduledComponent for SimPlant {
    fn tick(&mut self, dt: f64) -> Result<(), BoxError> {
        for motor in &self.motors {
            motor.advance(dt);
        }
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
