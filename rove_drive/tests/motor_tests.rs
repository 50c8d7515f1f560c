//! Integration tests for the closed-loop motor component.
//!
//! Drive the motor the way the surrounding program does: spawn against the
//! scheduler, let deferred init fire, command voltage/velocity, and inspect
//! what reaches the (mock) hardware.

use std::cell::RefCell;
use std::rc::Rc;

use rove_common::hal::{HalError, MotorDriver};
use rove_core::Scheduler;
use rove_drive::{Motor, PdController};

const DT: f64 = 0.02; // 20 ms control period

/// Mock driver recording every hardware interaction.
#[derive(Debug, Default)]
struct MockState {
    position: f64,
    velocity: f64,
    voltage_writes: Vec<f64>,
    current_limit: Option<u32>,
    fail_writes: bool,
}

#[derive(Debug, Clone, Default)]
struct MockDriver {
    state: Rc<RefCell<MockState>>,
}

impl MockDriver {
    fn new() -> (Self, Rc<RefCell<MockState>>) {
        let driver = Self::default();
        let state = driver.state.clone();
        (driver, state)
    }
}

impl MotorDriver for MockDriver {
    fn raw_position(&mut self) -> Result<f64, HalError> {
        Ok(self.state.borrow().position)
    }

    fn raw_velocity(&mut self) -> Result<f64, HalError> {
        Ok(self.state.borrow().velocity)
    }

    fn write_voltage(&mut self, volts: f64) -> Result<(), HalError> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(HalError::VoltageWrite("bus offline".into()));
        }
        state.voltage_writes.push(volts);
        Ok(())
    }

    fn set_current_limit(&mut self, amps: u32) -> Result<(), HalError> {
        self.state.borrow_mut().current_limit = Some(amps);
        Ok(())
    }
}

#[test]
fn deferred_init_runs_on_first_pass() {
    let sched = Scheduler::new();
    let (driver, state) = MockDriver::new();
    state.borrow_mut().position = 3.5;
    let motor = Motor::spawn(&sched, "m", driver, false);

    // Construction must not touch hardware.
    assert!(!motor.borrow().is_ready());
    assert_eq!(state.borrow().current_limit, None);

    sched.tick(DT);
    assert!(motor.borrow().is_ready());
    assert_eq!(state.borrow().current_limit, Some(40));
    // Encoder zeroed at init: reads are relative to the captured offset.
    assert_eq!(motor.borrow_mut().revolutions().unwrap(), 0.0);
}

#[test]
fn velocity_control_needs_a_controller() {
    let sched = Scheduler::new();
    let (driver, _) = MockDriver::new();
    let motor = Motor::spawn(&sched, "m", driver, false);
    sched.tick(DT);

    assert!(motor.borrow_mut().set_velocity(2.0).is_err());

    motor.borrow_mut().attach_controller(&PdController::new(0.5, 0.0));
    assert!(motor.borrow_mut().set_velocity(2.0).is_ok());
}

#[test]
fn velocity_loop_end_to_end() {
    let sched = Scheduler::new();
    let (driver, state) = MockDriver::new();
    let motor = Motor::spawn(&sched, "m", driver, false);

    sched.tick(DT); // init fires: current limit set, encoder zeroed
    assert_eq!(state.borrow().current_limit, Some(40));

    motor.borrow_mut().attach_controller(&PdController::new(0.5, 0.0));
    motor.borrow_mut().set_velocity(2.0).unwrap();
    assert!(state.borrow().voltage_writes.is_empty());

    // measured velocity 0 -> error 2.0 -> kp * 2.0 = 1.0 V, under the ceiling
    sched.tick(DT);
    assert_eq!(state.borrow().voltage_writes.as_slice(), &[1.0]);

    // Voltage is recomputed every tick while the target holds.
    sched.tick(DT);
    assert_eq!(state.borrow().voltage_writes.len(), 2);
}

#[test]
fn direction_inversion_flips_command_sign() {
    let run = |reversed: bool, target: f64| -> f64 {
        let sched = Scheduler::new();
        let (driver, state) = MockDriver::new();
        let motor = Motor::spawn(&sched, "m", driver, reversed);
        sched.tick(DT);
        motor.borrow_mut().attach_controller(&PdController::new(0.5, 0.0));
        motor.borrow_mut().set_velocity(target).unwrap();
        sched.tick(DT);
        let writes = state.borrow().voltage_writes.clone();
        assert_eq!(writes.len(), 1);
        writes[0]
    };

    let inverted = run(true, 5.0);
    let mirrored = run(false, -5.0);
    assert_eq!(inverted, mirrored);
    assert_eq!(inverted, -run(false, 5.0));
}

#[test]
fn safety_ceiling_clamps_every_write() {
    let sched = Scheduler::new();
    let (driver, state) = MockDriver::new();
    let motor = Motor::spawn(&sched, "m", driver, false);
    sched.tick(DT);

    motor.borrow_mut().set_max_voltage(6.0);
    motor.borrow_mut().set_voltage(11.0).unwrap();
    motor.borrow_mut().set_voltage(-11.0).unwrap();
    motor.borrow_mut().set_voltage(3.0).unwrap();
    assert_eq!(state.borrow().voltage_writes.as_slice(), &[6.0, -6.0, 3.0]);

    // The velocity loop clamps too.
    motor.borrow_mut().attach_controller(&PdController::new(100.0, 0.0));
    motor.borrow_mut().set_velocity(50.0).unwrap();
    sched.tick(DT);
    assert_eq!(*state.borrow().voltage_writes.last().unwrap(), 6.0);
}

#[test]
fn set_voltage_clears_velocity_target() {
    let sched = Scheduler::new();
    let (driver, state) = MockDriver::new();
    let motor = Motor::spawn(&sched, "m", driver, false);
    sched.tick(DT);

    motor.borrow_mut().attach_controller(&PdController::new(0.5, 0.0));
    motor.borrow_mut().set_velocity(2.0).unwrap();
    sched.tick(DT);
    let writes_after_controlled_tick = state.borrow().voltage_writes.len();

    motor.borrow_mut().set_voltage(1.5).unwrap();
    sched.tick(DT);
    sched.tick(DT);
    // Voltage-direct: the single direct write, no per-tick recompute.
    assert_eq!(
        state.borrow().voltage_writes.len(),
        writes_after_controlled_tick + 1
    );
    assert_eq!(*state.borrow().voltage_writes.last().unwrap(), 1.5);
}

#[test]
fn percent_voltage_maps_to_nominal_fraction() {
    let sched = Scheduler::new();
    let (driver, state) = MockDriver::new();
    let motor = Motor::spawn(&sched, "m", driver, false);
    sched.tick(DT);

    motor.borrow_mut().set_percent_voltage(50.0).unwrap();
    motor.borrow_mut().set_percent_voltage(-25.0).unwrap();
    assert_eq!(state.borrow().voltage_writes.as_slice(), &[6.0, -3.0]);
}

#[test]
fn position_readers_respect_offset_and_inversion() {
    let sched = Scheduler::new();
    let (driver, state) = MockDriver::new();
    let motor = Motor::spawn(&sched, "m", driver, true);
    state.borrow_mut().position = 10.0;
    sched.tick(DT); // init captures 10.0 as the zero reference

    state.borrow_mut().position = 12.5;
    let mut m = motor.borrow_mut();
    assert_eq!(m.revolutions().unwrap(), -2.5);
    assert_eq!(m.degrees().unwrap(), -900.0);
    assert!((m.radians().unwrap() + 2.5 * std::f64::consts::TAU).abs() < 1e-12);

    m.reset_encoder_reference().unwrap();
    assert_eq!(m.revolutions().unwrap(), 0.0);
}

#[test]
fn hardware_write_failure_is_isolated_per_component() {
    let sched = Scheduler::new();
    let (bad_driver, bad_state) = MockDriver::new();
    let (good_driver, good_state) = MockDriver::new();

    let bad = Motor::spawn(&sched, "bad", bad_driver, false);
    let good = Motor::spawn(&sched, "good", good_driver, false);
    sched.tick(DT);

    bad.borrow_mut().attach_controller(&PdController::new(0.5, 0.0));
    good.borrow_mut().attach_controller(&PdController::new(0.5, 0.0));
    bad.borrow_mut().set_velocity(2.0).unwrap();
    good.borrow_mut().set_velocity(2.0).unwrap();
    bad_state.borrow_mut().fail_writes = true;

    let report = sched.tick(DT);
    // The faulting motor is reported; the healthy one still wrote.
    assert_eq!(report.failures.len(), 1);
    assert_eq!(good_state.borrow().voltage_writes.len(), 1);
    assert_eq!(sched.stats().failures, 1);
}

#[test]
fn unregistration_stops_the_motor() {
    let sched = Scheduler::new();
    let (driver, state) = MockDriver::new();
    let motor = Motor::spawn(&sched, "m", driver, false);
    let id = sched.register(motor.clone()); // idempotent: same handle
    sched.tick(DT);

    motor.borrow_mut().set_voltage(5.0).unwrap();
    assert!(sched.unregister(id));
    // Cleanup wrote a final zero.
    assert_eq!(*state.borrow().voltage_writes.last().unwrap(), 0.0);

    let writes = state.borrow().voltage_writes.len();
    sched.tick(DT);
    assert_eq!(state.borrow().voltage_writes.len(), writes);
}
