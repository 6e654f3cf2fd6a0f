//! Closed set of control laws that may own the PWM outputs.
//!
//! A law is installed in the timer context before the armed word is
//! published, so the word only ever names a law whose state is ready. The
//! published tag is a [`LawKind`]; zero means disarmed.

use core::f32::consts::TAU;

use motor_common::consts::{PWM_TEST_FREQUENCY_HZ, PWM_TEST_MODULATION};
use motor_common::motor::config::MotorConfig;
use motor_common::motor::error::MotorError;
use motor_common::motor::types::PhaseCurrentSample;

use super::foc::{CurrentControl, FocInputs, foc_step};
use super::transforms::{clarke, svm, volts_per_modulation};
use crate::calibration::Measurement;
use crate::calibration::inductance::InductanceEstimator;
use crate::calibration::resistance::ResistanceEstimator;
use crate::calibration::rotor::{RotorEstimate, RotorEstimator};

// ─── Public Law Selection ───────────────────────────────────────────

/// Control law requested by `arm`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlLaw {
    /// Field-oriented current/voltage control.
    Foc,
    /// DC resistance test on the alpha axis.
    ResistanceMeasurement { test_current: f32, max_voltage: f32 },
    /// Square-wave inductance test on the alpha axis.
    InductanceMeasurement { voltage: f32, resistance: f32 },
    /// Induction-motor rotor identification step.
    RotorMeasurement {
        test_current: f32,
        resistance: f32,
        inductance: f32,
        bandwidth: f32,
    },
    /// Rotating fixed-magnitude modulation vector, open loop.
    PwmTest { duration_s: f32 },
}

impl ControlLaw {
    pub const fn kind(&self) -> LawKind {
        match self {
            Self::Foc => LawKind::Foc,
            Self::ResistanceMeasurement { .. } => LawKind::ResistanceMeasurement,
            Self::InductanceMeasurement { .. } => LawKind::InductanceMeasurement,
            Self::RotorMeasurement { .. } => LawKind::RotorMeasurement,
            Self::PwmTest { .. } => LawKind::PwmTest,
        }
    }

    /// Parameters are usable. FOC preconditions are checked by the arm logic.
    pub fn parameters_valid(&self) -> bool {
        let positive = |x: f32| x.is_finite() && x > 0.0;
        match *self {
            Self::Foc => true,
            Self::ResistanceMeasurement {
                test_current,
                max_voltage,
            } => positive(test_current) && positive(max_voltage),
            Self::InductanceMeasurement {
                voltage,
                resistance,
            } => positive(voltage) && resistance.is_finite() && resistance >= 0.0,
            Self::RotorMeasurement {
                test_current,
                resistance,
                inductance,
                bandwidth,
            } => {
                positive(test_current)
                    && positive(resistance)
                    && positive(inductance)
                    && positive(bandwidth)
            }
            Self::PwmTest { duration_s } => positive(duration_s),
        }
    }
}

/// Tag stored in the armed word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LawKind {
    Foc = 1,
    ResistanceMeasurement = 2,
    InductanceMeasurement = 3,
    RotorMeasurement = 4,
    PwmTest = 5,
}

impl LawKind {
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Foc),
            2 => Some(Self::ResistanceMeasurement),
            3 => Some(Self::InductanceMeasurement),
            4 => Some(Self::RotorMeasurement),
            5 => Some(Self::PwmTest),
            _ => None,
        }
    }
}

/// Result a finished law leaves behind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LawOutcome {
    Resistance(f32),
    Inductance(f32),
    Rotor(RotorEstimate),
    PwmTestDone,
}

/// What the timer context does after one law step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LawStep {
    /// Latch these timings for the next PWM update edge.
    Continue([f32; 3]),
    /// Law completed normally; disarm.
    Finished(LawOutcome),
    /// Law failed; raise and disarm.
    Failed(MotorError),
}

// ─── Installed Law State ────────────────────────────────────────────

/// Per-cycle inputs shared by all laws.
#[derive(Debug, Clone, Copy)]
pub struct LawInputs<'a> {
    pub config: &'a MotorConfig,
    pub sample: PhaseCurrentSample,
    pub vbus: f32,
    pub now_us: u32,
    pub dt: f32,
    pub current_limit: f32,
}

#[derive(Debug, Clone)]
pub struct PwmTest {
    duration: f32,
    elapsed: f32,
}

/// Law context owned by the timer context.
#[derive(Debug, Clone)]
pub enum LawState {
    Idle,
    Foc,
    Resistance(ResistanceEstimator),
    Inductance(InductanceEstimator),
    Rotor(RotorEstimator),
    PwmTest(PwmTest),
}

impl LawState {
    /// Fresh state for `law`.
    pub fn install(law: &ControlLaw) -> Self {
        match *law {
            ControlLaw::Foc => Self::Foc,
            ControlLaw::ResistanceMeasurement {
                test_current,
                max_voltage,
            } => Self::Resistance(ResistanceEstimator::new(test_current, max_voltage)),
            ControlLaw::InductanceMeasurement {
                voltage,
                resistance,
            } => Self::Inductance(InductanceEstimator::new(voltage, resistance)),
            ControlLaw::RotorMeasurement {
                test_current,
                resistance,
                inductance,
                bandwidth,
            } => Self::Rotor(RotorEstimator::new(
                test_current,
                resistance,
                inductance,
                bandwidth,
            )),
            ControlLaw::PwmTest { duration_s } => Self::PwmTest(PwmTest {
                duration: duration_s,
                elapsed: 0.0,
            }),
        }
    }

    pub fn kind(&self) -> Option<LawKind> {
        match self {
            Self::Idle => None,
            Self::Foc => Some(LawKind::Foc),
            Self::Resistance(_) => Some(LawKind::ResistanceMeasurement),
            Self::Inductance(_) => Some(LawKind::InductanceMeasurement),
            Self::Rotor(_) => Some(LawKind::RotorMeasurement),
            Self::PwmTest(_) => Some(LawKind::PwmTest),
        }
    }

    /// Run one cycle of the installed law.
    pub fn step(&mut self, cc: &mut CurrentControl, input: &LawInputs<'_>) -> LawStep {
        let (i_alpha, i_beta) = clarke(input.sample.currents);
        let vbus = input.vbus;
        match self {
            Self::Idle => LawStep::Failed(MotorError::CONTROLLER_FAILED),
            Self::Foc => {
                let foc = FocInputs {
                    sample: input.sample,
                    vbus,
                    now_us: input.now_us,
                    dt: input.dt,
                    current_limit: input.current_limit,
                };
                match foc_step(cc, input.config, &foc) {
                    Ok(timings) => LawStep::Continue(timings),
                    Err(e) => LawStep::Failed(e),
                }
            }
            Self::Resistance(est) => {
                drive(est.step(i_alpha, input.dt), vbus, LawOutcome::Resistance)
            }
            Self::Inductance(est) => {
                drive(est.step(i_alpha, input.dt), vbus, LawOutcome::Inductance)
            }
            Self::Rotor(est) => drive(
                est.step(i_alpha, i_beta, vbus, input.dt),
                vbus,
                LawOutcome::Rotor,
            ),
            Self::PwmTest(test) => {
                if test.elapsed >= test.duration {
                    return LawStep::Finished(LawOutcome::PwmTestDone);
                }
                let angle = TAU * PWM_TEST_FREQUENCY_HZ * test.elapsed;
                test.elapsed += input.dt;
                let (s, c) = angle.sin_cos();
                match svm(PWM_TEST_MODULATION * c, PWM_TEST_MODULATION * s) {
                    Some(t) => LawStep::Continue(t),
                    None => LawStep::Failed(MotorError::MODULATION_MAGNITUDE),
                }
            }
        }
    }
}

/// Convert an estimator step into a law step.
fn drive<T>(
    step: Result<Measurement<T>, MotorError>,
    vbus: f32,
    done: impl FnOnce(T) -> LawOutcome,
) -> LawStep {
    match step {
        Ok(Measurement::Done(value)) => LawStep::Finished(done(value)),
        Ok(Measurement::Drive { v_alpha, v_beta }) => {
            match voltage_timings(v_alpha, v_beta, vbus) {
                Ok(t) => LawStep::Continue(t),
                Err(e) => LawStep::Failed(e),
            }
        }
        Err(e) => LawStep::Failed(e),
    }
}

/// Stationary-frame voltage → phase timings.
pub fn voltage_timings(v_alpha: f32, v_beta: f32, vbus: f32) -> Result<[f32; 3], MotorError> {
    if !(vbus > 0.0) {
        return Err(MotorError::MODULATION_MAGNITUDE);
    }
    let v = volts_per_modulation(vbus);
    svm(v_alpha / v, v_beta / v).ok_or(MotorError::MODULATION_MAGNITUDE)
}

// ─── Tests ──────────────────────────────────────────────────────────
