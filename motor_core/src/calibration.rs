//! Electrical self-identification.
//!
//! - [`resistance`] - DC test: integral voltage ramp to a test current.
//! - [`inductance`] - AC test: square-wave excitation, slope per segment.
//! - [`rotor`] - Induction-motor rotor identification from a current step.
//! - [`engine`] - Sequencing of the tests and commit of the results.
//!
//! Each estimator is driven once per control cycle with the latest current
//! measurement and answers with the stationary-frame voltage to apply next,
//! or with its final estimate.

pub mod engine;
pub mod inductance;
pub mod resistance;
pub mod rotor;

/// One estimator step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement<T> {
    /// Keep exciting the motor with this alpha/beta voltage [V].
    Drive { v_alpha: f32, v_beta: f32 },
    /// Measurement complete.
    Done(T),
}
