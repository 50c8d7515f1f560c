//! Generic closed-loop motor component.
//!
//! A [`Motor`] wraps an injected [`MotorDriver`] backend and registers
//! itself with the scheduler at construction. Its lifecycle is a documented
//! state-machine step: it starts Uninitialized, and a zero-delay deferred
//! callback — one tick later, after the controller hardware has come up —
//! configures current limiting and zeroes the encoder, making it Ready.
//!
//! While Ready the motor is in exactly one of two modes each tick:
//! voltage-direct (no velocity target; the last commanded voltage holds) or
//! velocity-controlled (a target is set; the attached feedback controller
//! recomputes the voltage every tick). Every voltage that reaches the
//! driver passes through the safety clamp.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use thiserror::Error;
use tracing::{debug, error, warn};

use rove_common::config::MotorConfig;
use rove_common::consts::{DEFAULT_CURRENT_LIMIT_AMPS, NOMINAL_VOLTAGE};
use rove_common::hal::{HalError, MotorDriver};
use rove_common::math::{clamp_abs, direction_factor};
use rove_core::{BoxError, ScheduledComponent, Scheduler};

use crate::control::{FeedbackController, PdController};

/// Motor operation errors.
#[derive(Debug, Error)]
pub enum MotorError {
    /// Velocity control requested before a feedback controller was attached.
    /// Caller error: reported, not retried.
    #[error("no feedback controller attached: velocity control unavailable")]
    NoController,

    /// The motor cell was unexpectedly borrowed when the deferred init
    /// callback fired.
    #[error("motor cell busy during deferred init")]
    InitBusy,

    /// Hardware I/O failure from the driver backend.
    #[error(transparent)]
    Hal(#[from] HalError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitState {
    /// Constructed; hardware not yet touched.
    Uninitialized,
    /// Current limit configured and encoder zeroed.
    Ready,
}

/// Closed-loop motor driven by the scheduler every tick.
pub struct Motor<D: MotorDriver> {
    name: String,
    driver: D,
    /// Direction inversion, fixed at construction.
    reversed: bool,
    /// Owned feedback controller; always a clone, never an alias.
    controller: Option<Box<dyn FeedbackController>>,
    /// Direction-adjusted velocity target [rev/s]. `None` = voltage-direct.
    target_velocity: Option<f64>,
    /// Voltage safety ceiling [V].
    max_voltage: f64,
    /// Current limit applied during deferred init [A].
    current_limit_amps: u32,
    /// Encoder reading captured at the last reference reset [rev].
    encoder_zero: f64,
    init: InitState,
}

impl<D: MotorDriver + 'static> Motor<D> {
    /// Construct a motor, register it with the scheduler, and schedule its
    /// one-tick-deferred hardware init.
    pub fn spawn(
        scheduler: &Scheduler,
        name: impl Into<String>,
        driver: D,
        reversed: bool,
    ) -> Rc<RefCell<Self>> {
        Self::spawn_with_limits(
            scheduler,
            name,
            driver,
            reversed,
            NOMINAL_VOLTAGE,
            DEFAULT_CURRENT_LIMIT_AMPS,
        )
    }

    /// [`Motor::spawn`] with explicit safety ceiling and current limit.
    pub fn spawn_with_limits(
        scheduler: &Scheduler,
        name: impl Into<String>,
        driver: D,
        reversed: bool,
        max_voltage: f64,
        current_limit_amps: u32,
    ) -> Rc<RefCell<Self>> {
        let motor = Rc::new(RefCell::new(Self {
            name: name.into(),
            driver,
            reversed,
            controller: None,
            target_velocity: None,
            max_voltage: max_voltage.abs(),
            current_limit_amps,
            encoder_zero: 0.0,
            init: InitState::Uninitialized,
        }));
        scheduler.register(motor.clone());

        // Init runs one tick after construction, once the controller
        // hardware has had a pass to come up. Deferred callbacks fire before
        // component ticks, so the motor is Ready before its first tick.
        let weak = Rc::downgrade(&motor);
        let scheduled = scheduler.set_timeout(move || Self::deferred_init(&weak), 0.0);
        if let Err(e) = scheduled {
            error!(error = %e, "failed to schedule motor init");
        }
        motor
    }

    /// Construct from configuration: limits and direction from the entry,
    /// plus an attached PD controller built from its gains.
    pub fn spawn_from_config(
        scheduler: &Scheduler,
        config: &MotorConfig,
        driver: D,
    ) -> Rc<RefCell<Self>> {
        let motor = Self::spawn_with_limits(
            scheduler,
            config.name.clone(),
            driver,
            config.reversed,
            config.max_voltage,
            config.current_limit_amps,
        );
        motor
            .borrow_mut()
            .attach_controller(&PdController::from_config(&config.pd));
        motor
    }

    fn deferred_init(weak: &Weak<RefCell<Self>>) -> Result<(), BoxError> {
        let Some(motor) = weak.upgrade() else {
            // Motor dropped before its init fired; nothing to configure.
            return Ok(());
        };
        let mut motor = motor.try_borrow_mut().map_err(|_| MotorError::InitBusy)?;
        let amps = motor.current_limit_amps;
        motor.driver.set_current_limit(amps)?;
        motor.reset_encoder_reference()?;
        motor.init = InitState::Ready;
        debug!(motor = %motor.name, "motor ready");
        Ok(())
    }

    /// Motor name (diagnostics).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once deferred init has configured the hardware.
    pub fn is_ready(&self) -> bool {
        self.init == InitState::Ready
    }

    /// Attach a feedback controller, storing an owned clone so later
    /// mutation of the caller's instance cannot affect this motor.
    pub fn attach_controller(&mut self, controller: &dyn FeedbackController) {
        self.controller = Some(controller.box_clone());
    }

    /// Enter velocity-controlled mode with a target in rev/s.
    ///
    /// # Errors
    /// [`MotorError::NoController`] if no feedback controller is attached.
    pub fn set_velocity(&mut self, velocity: f64) -> Result<(), MotorError> {
        if self.controller.is_none() {
            return Err(MotorError::NoController);
        }
        self.target_velocity = Some(direction_factor(self.reversed) * velocity);
        Ok(())
    }

    /// Enter voltage-direct mode: clears any velocity target,
    /// direction-adjusts, clamps to the safety ceiling, and writes out.
    pub fn set_voltage(&mut self, volts: f64) -> Result<(), MotorError> {
        self.target_velocity = None;
        let volts = clamp_abs(direction_factor(self.reversed) * volts, self.max_voltage);
        self.driver.write_voltage(volts)?;
        Ok(())
    }

    /// Voltage command as a percentage (−100..100) of nominal voltage.
    pub fn set_percent_voltage(&mut self, percent: f64) -> Result<(), MotorError> {
        self.set_voltage(percent * (NOMINAL_VOLTAGE / 100.0))
    }

    /// Stop the motor: zero voltage, voltage-direct mode.
    pub fn stop(&mut self) -> Result<(), MotorError> {
        self.set_voltage(0.0)
    }

    /// Update the safety ceiling used by every subsequent clamp.
    pub fn set_max_voltage(&mut self, limit: f64) {
        self.max_voltage = limit.abs();
    }

    /// Current safety ceiling [V].
    pub fn max_voltage(&self) -> f64 {
        self.max_voltage
    }

    /// Capture the current raw encoder reading as the new zero reference.
    pub fn reset_encoder_reference(&mut self) -> Result<(), MotorError> {
        self.encoder_zero = self.driver.raw_position()?;
        Ok(())
    }

    /// Revolutions since the last reference reset, direction-adjusted.
    pub fn revolutions(&mut self) -> Result<f64, MotorError> {
        let raw = self.driver.raw_position()?;
        Ok(direction_factor(self.reversed) * (raw - self.encoder_zero))
    }

    /// Degrees rotated since the last reference reset.
    pub fn degrees(&mut self) -> Result<f64, MotorError> {
        Ok(self.revolutions()? * 360.0)
    }

    /// Radians rotated since the last reference reset.
    pub fn radians(&mut self) -> Result<f64, MotorError> {
        Ok(self.revolutions()? * std::f64::consts::TAU)
    }

    /// Shaft velocity [rev/s], direction-adjusted.
    pub fn velocity(&mut self) -> Result<f64, MotorError> {
        Ok(direction_factor(self.reversed) * self.driver.raw_velocity()?)
    }

    fn control_tick(&mut self, dt: f64) -> Result<(), MotorError> {
        // Voltage-direct mode: last commanded voltage holds.
        let Some(target) = self.target_velocity else {
            return Ok(());
        };
        let Some(controller) = self.controller.as_mut() else {
            // set_velocity requires a controller, so a target without one is
            // unreachable; tolerate it as voltage-direct.
            return Ok(());
        };
        // Target was direction-adjusted at set_velocity; compare against the
        // raw reading so both live in the device frame.
        let error = target - self.driver.raw_velocity()?;
        let volts = clamp_abs(controller.solve(error, dt), self.max_voltage);
        self.driver.write_voltage(volts)?;
        Ok(())
    }
}

impl<D: MotorDriver + 'static> ScheduledComponent for Motor<D> {
    fn tick(&mut self, dt: f64) -> Result<(), BoxError> {
        if self.init == InitState::Uninitialized {
            return Ok(());
        }
        self.control_tick(dt)?;
        Ok(())
    }

    fn cleanup(&mut self) {
        // Best-effort safe stop; nothing drives this motor afterwards.
        if let Err(e) = self.stop() {
            warn!(motor = %self.name, error = %e, "failed to zero voltage on cleanup");
        }
    }
}
