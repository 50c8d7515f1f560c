//! Hardware driver boundary.
//!
//! This module defines:
//! - `MotorDriver` trait - the four-operation contract a motor controller
//!   backend must supply (sensor reads, voltage write, current limiting)
//! - `HalError` enum - error types for hardware operations
//!
//! Backends are injected into the motor component rather than inherited,
//! enabling pluggable hardware (vendor CAN controllers, simulation, mocks).

use thiserror::Error;

/// Error types for hardware operations.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// Sensor read failed (encoder position or velocity).
    #[error("Sensor read failed: {0}")]
    SensorRead(String),

    /// Voltage write to the motor controller failed.
    #[error("Voltage write failed: {0}")]
    VoltageWrite(String),

    /// Current-limit configuration was rejected by the controller.
    #[error("Current limit configuration failed: {0}")]
    CurrentLimit(String),

    /// Hardware communication error (bus timeout, device offline).
    #[error("Hardware communication error: {0}")]
    Communication(String),
}

/// Contract a motor-controller backend must supply.
///
/// All readings are in raw device frame: no direction inversion and no
/// encoder zero offset applied. The motor component owns that bookkeeping.
///
/// # Lifecycle
///
/// 1. `set_current_limit()` - called once during deferred motor init
/// 2. `raw_position()` / `raw_velocity()` - read every controlled tick
/// 3. `write_voltage()` - commanded output, already clamped by the caller
pub trait MotorDriver {
    /// Raw encoder position [revolutions] since power-on.
    fn raw_position(&mut self) -> Result<f64, HalError>;

    /// Raw shaft velocity [revolutions/s].
    fn raw_velocity(&mut self) -> Result<f64, HalError>;

    /// Apply `volts` to the motor output stage.
    ///
    /// Callers clamp to the safety ceiling before writing; the driver may
    /// still reject the write (bus fault, device offline).
    fn write_voltage(&mut self, volts: f64) -> Result<(), HalError>;

    /// Configure the controller's current limit [A].
    fn set_current_limit(&mut self, amps: u32) -> Result<(), HalError>;
}
