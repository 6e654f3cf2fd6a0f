//! PWM timer synchronization and cycle timing.
//!
//! # Modules
//!
//! - [`period`] - Switching frequency → timer period and control period
//! - [`sync`] - Update-event bookkeeping and half-cycle edge scheduling
//! - [`log`] - Checkpoint timestamps, deadline detection, latency history

pub mod log;
pub mod period;
pub mod sync;
