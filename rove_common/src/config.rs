//! TOML configuration loader with validation.
//!
//! Loads a [`DriveConfig`] describing the control period and the motors the
//! program drives. Load is two-phase: parse, then `validate()` with one
//! message per violated rule.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::consts::{DEFAULT_CURRENT_LIMIT_AMPS, DEFAULT_TICK_PERIOD_S, NOMINAL_VOLTAGE};

// ─── Error Type ─────────────────────────────────────────────────────

/// Configuration loading/validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("config I/O error: {0}")]
    Io(String),

    /// TOML parse error.
    #[error("config parse error: {0}")]
    Parse(String),

    /// Parameter validation error.
    #[error("config validation: {0}")]
    Validation(String),
}

// ─── Config Types ───────────────────────────────────────────────────

/// Top-level drive configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    /// Control loop parameters.
    #[serde(default)]
    pub control: ControlConfig,
    /// One entry per motor.
    #[serde(default, rename = "motor")]
    pub motors: Vec<MotorConfig>,
}

/// Control loop parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    /// Tick period of the surrounding real-time loop [s].
    #[serde(default = "default_period")]
    pub period_s: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            period_s: DEFAULT_TICK_PERIOD_S,
        }
    }
}

/// Per-motor configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MotorConfig {
    /// Unique motor name (diagnostics and logging).
    pub name: String,
    /// Direction inversion flag, fixed for the life of the motor.
    #[serde(default)]
    pub reversed: bool,
    /// Voltage safety ceiling [V].
    #[serde(default = "default_max_voltage")]
    pub max_voltage: f64,
    /// Controller current limit [A], applied during deferred init.
    #[serde(default = "default_current_limit")]
    pub current_limit_amps: u32,
    /// Velocity feedback gains.
    pub pd: PdConfig,
}

/// Proportional-derivative gains for the velocity loop.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PdConfig {
    /// Proportional gain [V per rev/s of error].
    pub kp: f64,
    /// Derivative gain (0 = disabled).
    #[serde(default)]
    pub kd: f64,
}

fn default_period() -> f64 {
    DEFAULT_TICK_PERIOD_S
}

fn default_max_voltage() -> f64 {
    NOMINAL_VOLTAGE
}

fn default_current_limit() -> u32 {
    DEFAULT_CURRENT_LIMIT_AMPS
}

// ─── Validation ─────────────────────────────────────────────────────

impl DriveConfig {
    /// Validate all parameter bounds and cross-entry rules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.control.period_s.is_finite() || self.control.period_s <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "control.period_s must be finite and positive, got {}",
                self.control.period_s
            )));
        }

        for motor in &self.motors {
            if motor.name.is_empty() {
                return Err(ConfigError::Validation("motor name must not be empty".into()));
            }
            if !motor.max_voltage.is_finite()
                || motor.max_voltage <= 0.0
                || motor.max_voltage > NOMINAL_VOLTAGE
            {
                return Err(ConfigError::Validation(format!(
                    "motor '{}': max_voltage must be in (0, {NOMINAL_VOLTAGE}], got {}",
                    motor.name, motor.max_voltage
                )));
            }
            if motor.current_limit_amps == 0 {
                return Err(ConfigError::Validation(format!(
                    "motor '{}': current_limit_amps must be non-zero",
                    motor.name
                )));
            }
            for (label, gain) in [("kp", motor.pd.kp), ("kd", motor.pd.kd)] {
                if !gain.is_finite() || gain < 0.0 {
                    return Err(ConfigError::Validation(format!(
                        "motor '{}': pd.{label} must be finite and non-negative, got {gain}",
                        motor.name
                    )));
                }
            }
        }

        // Name uniqueness across entries.
        for (i, a) in self.motors.iter().enumerate() {
            if self.motors[i + 1..].iter().any(|b| b.name == a.name) {
                return Err(ConfigError::Validation(format!(
                    "duplicate motor name '{}'",
                    a.name
                )));
            }
        }

        Ok(())
    }
}

// ─── Loading ────────────────────────────────────────────────────────

/// Load and validate a drive configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<DriveConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("failed to read {}: {e}", path.display())))?;
    parse_config(&text)
}

/// Parse and validate a drive configuration from TOML text.
pub fn parse_config(text: &str) -> Result<DriveConfig, ConfigError> {
    let config: DriveConfig =
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const GOOD: &str = r#"
        [control]
        period_s = 0.02

        [[motor]]
        name = "left_drive"
        reversed = true
        max_voltage = 10.0
        current_limit_amps = 35
        pd = { kp = 0.5, kd = 0.01 }

        [[motor]]
        name = "right_drive"
        pd = { kp = 0.5 }
    "#;

    #[test]
    fn parses_full_config() {
        let config = parse_config(GOOD).unwrap();
        assert_eq!(config.control.period_s, 0.02);
        assert_eq!(config.motors.len(), 2);
        assert!(config.motors[0].reversed);
        assert_eq!(config.motors[0].max_voltage, 10.0);
        assert_eq!(config.motors[0].current_limit_amps, 35);
        assert_eq!(config.motors[1].pd.kd, 0.0);
    }

    #[test]
    fn defaults_apply() {
        let config = parse_config(
            r#"
            [[motor]]
            name = "m"
            pd = { kp = 1.0 }
            "#,
        )
        .unwrap();
        assert_eq!(config.control.period_s, DEFAULT_TICK_PERIOD_S);
        assert_eq!(config.motors[0].max_voltage, NOMINAL_VOLTAGE);
        assert_eq!(config.motors[0].current_limit_amps, DEFAULT_CURRENT_LIMIT_AMPS);
        assert!(!config.motors[0].reversed);
    }

    #[test]
    fn rejects_non_positive_period() {
        let err = parse_config("[control]\nperiod_s = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_excessive_max_voltage() {
        let err = parse_config(
            r#"
            [[motor]]
            name = "m"
            max_voltage = 13.0
            pd = { kp = 1.0 }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_negative_gain() {
        let err = parse_config(
            r#"
            [[motor]]
            name = "m"
            pd = { kp = -1.0 }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = parse_config(
            r#"
            [[motor]]
            name = "m"
            pd = { kp = 1.0 }

            [[motor]]
            name = "m"
            pd = { kp = 2.0 }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = parse_config("not toml at all [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(GOOD.as_bytes()).unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.motors.len(), 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/rove.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
