//! Calibration sequencing.
//!
//! The engine is a small state machine: it decides which measurement law to
//! arm next and, once every measurement has succeeded, hands back the full
//! result to commit. It never touches the motor parameters itself, so a
//! failure anywhere leaves them exactly as they were.
//!
//! ```text
//! Resistance → Inductance → [Rotor (induction, not yet async-calibrated)] → Commit
//! Gimbal: Commit immediately (parameters are entered, not measured)
//! ```

use motor_common::motor::config::{MotorConfig, MotorType};
use motor_common::motor::error::MotorError;

use super::rotor::RotorEstimate;
use crate::control::law::{ControlLaw, LawOutcome};

/// Measurement currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStage {
    Resistance,
    Inductance,
    Rotor,
}

/// Everything a successful calibration commits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationResult {
    pub phase_resistance: f32,
    pub phase_inductance: f32,
    pub rotor: Option<RotorEstimate>,
}

/// Next action for the motor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineStep {
    Arm(ControlLaw),
    Commit(CalibrationResult),
}

#[derive(Debug, Clone)]
pub struct CalibrationEngine {
    stage: CalibrationStage,
    test_current: f32,
    max_voltage: f32,
    bandwidth: f32,
    measure_rotor: bool,
    resistance: f32,
    inductance: f32,
}

impl CalibrationEngine {
    /// Plan a calibration run.
    ///
    /// The test current is the configured calibration current, bounded by the
    /// effective current limit. Returns `None` as engine when nothing needs
    /// to be measured.
    pub fn start(
        config: &MotorConfig,
        current_limit: f32,
    ) -> Result<(Option<Self>, EngineStep), MotorError> {
        if config.motor_type == MotorType::Gimbal {
            return Ok((
                None,
                EngineStep::Commit(CalibrationResult {
                    phase_resistance: config.phase_resistance,
                    phase_inductance: config.phase_inductance,
                    rotor: None,
                }),
            ));
        }

        let test_current = config.calibration_current.min(current_limit);
        if !(test_current > 0.0) {
            return Err(MotorError::FAILED_TO_ARM);
        }

        let engine = Self {
            stage: CalibrationStage::Resistance,
            test_current,
            max_voltage: config.resistance_calib_max_voltage,
            bandwidth: config.current_control_bandwidth,
            measure_rotor: config.motor_type == MotorType::Acim && !config.async_calibrated,
            resistance: 0.0,
            inductance: 0.0,
        };
        let law = ControlLaw::ResistanceMeasurement {
            test_current,
            max_voltage: engine.max_voltage,
        };
        Ok((Some(engine), EngineStep::Arm(law)))
    }

    pub fn stage(&self) -> CalibrationStage {
        self.stage
    }

    pub fn test_current(&self) -> f32 {
        self.test_current
    }

    /// Feed the outcome of the law that just finished.
    pub fn advance(&mut self, outcome: LawOutcome) -> Result<EngineStep, MotorError> {
        match (self.stage, outcome) {
            (CalibrationStage::Resistance, LawOutcome::Resistance(r)) => {
                self.resistance = r;
                self.stage = CalibrationStage::Inductance;
                Ok(EngineStep::Arm(ControlLaw::InductanceMeasurement {
                    voltage: self.max_voltage,
                    resistance: r,
                }))
            }
            (CalibrationStage::Inductance, LawOutcome::Inductance(l)) => {
                self.inductance = l;
                if self.measure_rotor {
                    self.stage = CalibrationStage::Rotor;
                    Ok(EngineStep::Arm(ControlLaw::RotorMeasurement {
                        test_current: self.test_current,
                        resistance: self.resistance,
                        inductance: l,
                        bandwidth: self.bandwidth,
                    }))
                } else {
                    Ok(EngineStep::Commit(self.result(None)))
                }
            }
            (CalibrationStage::Rotor, LawOutcome::Rotor(rotor)) => {
                Ok(EngineStep::Commit(self.result(Some(rotor))))
            }
            _ => Err(MotorError::CONTROLLER_FAILED),
        }
    }

    fn result(&self, rotor: Option<RotorEstimate>) -> CalibrationResult {
        CalibrationResult {
            phase_resistance: self.resistance,
            phase_inductance: self.inductance,
            rotor,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
