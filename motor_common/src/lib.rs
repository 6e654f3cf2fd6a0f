//! Motor Common Library
//!
//! Shared types for the motor current-control core: the sticky fault
//! bitmask, the persistent motor parameters, the values exchanged with the
//! power stage, and TOML configuration loading.
//!
//! # Module Structure
//!
//! - [`motor`] - Fault flags, motor parameters and power-stage I/O types
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Defaults and calibration constants
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use motor_common::motor::config::MotorConfig;
//! use motor_common::motor::error::MotorError;
//!
//! let config = MotorConfig::default();
//! assert!(config.validate().is_ok());
//! assert!(MotorError::default().is_empty());
//! ```

pub mod config;
pub mod consts;
pub mod motor;
pub mod prelude;
