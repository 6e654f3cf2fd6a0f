//! Current control law.
//!
//! - [`transforms`] - Clarke/Park transforms and space-vector modulation.
//! - [`pi`] - dq current PI with shared vector saturation.
//! - [`filters`] - First-order smoothing filters.
//! - [`foc`] - Per-cycle field-oriented current/voltage control.
//! - [`law`] - Closed set of control laws and their dispatch.

pub mod filters;
pub mod foc;
pub mod law;
pub mod pi;
pub mod transforms;
