//! Platform constants shared across the workspace.

/// Nominal bus voltage [V]. Default safety ceiling for every motor and the
/// reference for percent-voltage commands.
pub const NOMINAL_VOLTAGE: f64 = 12.0;

/// Default motor current limit [A], applied during deferred motor init.
pub const DEFAULT_CURRENT_LIMIT_AMPS: u32 = 40;

/// Nominal control period [s] of the surrounding real-time loop.
pub const DEFAULT_TICK_PERIOD_S: f64 = 0.02;
