//! # ROVE Common Library
//!
//! Shared leaf crate for the ROVE workspace: math primitives used by the
//! control path, the hardware driver boundary consumed by the motor
//! component, TOML configuration loading, and platform constants.
//!
//! # Module Structure
//!
//! - [`math`] - Clamp and direction-sign primitives
//! - [`hal`] - `MotorDriver` trait and `HalError`
//! - [`config`] - TOML drive configuration with validation
//! - [`consts`] - Platform constants (nominal voltage, current limit)

pub mod config;
pub mod consts;
pub mod hal;
pub mod math;
