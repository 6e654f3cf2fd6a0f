//! Prelude module for common re-exports.
//!
//! ```rust
//! use motor_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};

// ─── Motor ──────────────────────────────────────────────────────────
pub use crate::motor::config::{MotorConfig, MotorType, UpdateMode};
pub use crate::motor::error::MotorError;
pub use crate::motor::types::{
    Edge, PhaseCurrentSample, PhaseCurrents, PwmOutput, RawPhaseCurrents, SensorFault,
    Temperatures, TimerEvent,
};
