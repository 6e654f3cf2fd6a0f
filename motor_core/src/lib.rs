//! # Motor Core
//!
//! Real-time current control for one motor of a brushless drive. Each PWM
//! control cycle samples the phase currents, runs field-oriented current
//! control (or one of the calibration measurements) and writes the next
//! switching timings, while the background context arms, disarms and
//! reconfigures the motor through lock-free shared state.
//!
//! ## Module Structure
//!
//! - [`control`] - Filters, transforms, PI current controller, control laws
//! - [`calibration`] - Resistance, inductance and rotor measurement
//! - [`limiter`] - Thermal derating and the effective current limit
//! - [`safety`] - Arm/disarm state word and the arm guard
//! - [`timing`] - Timer period derivation, edge scheduling, latency log
//! - [`motor`] - The motor object tying everything together
//! - [`fields`] - Dotted-path access to configuration and diagnostics
//! - [`hal`] - Power-stage interface
//! - [`sim`] - Simulated power stage and motor plant
//!
//! ## RT Discipline
//!
//! Nothing called from [`motor::Motor::on_timer_update`] or
//! [`motor::Motor::control_loop`] allocates or blocks. Fault reporting from
//! the timer context is a single atomic OR into the error word.

pub mod calibration;
pub mod control;
pub mod fields;
pub mod hal;
pub mod limiter;
pub mod motor;
pub mod safety;
pub mod sim;
pub mod timing;
