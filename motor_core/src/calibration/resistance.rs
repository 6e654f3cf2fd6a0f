//! Phase resistance measurement.
//!
//! An integral controller ramps the alpha-axis voltage until the alpha
//! current equals the test current. After the settle duration the
//! resistance is the ratio of the two. A ramp that needs more than the
//! configured maximum voltage means the resistance is out of range (or the
//! phase is open).

use motor_common::consts::{RESISTANCE_CALIB_DURATION_S, RESISTANCE_CALIB_KI};
use motor_common::motor::error::MotorError;

use super::Measurement;

#[derive(Debug, Clone)]
pub struct ResistanceEstimator {
    test_current: f32,
    max_voltage: f32,
    duration: f32,
    test_voltage: f32,
    elapsed: f32,
}

impl ResistanceEstimator {
    pub fn new(test_current: f32, max_voltage: f32) -> Self {
        Self {
            test_current,
            max_voltage,
            duration: RESISTANCE_CALIB_DURATION_S,
            test_voltage: 0.0,
            elapsed: 0.0,
        }
    }

    /// Override the settle duration [s].
    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = duration;
        self
    }

    /// Voltage currently applied on the alpha axis [V].
    pub fn test_voltage(&self) -> f32 {
        self.test_voltage
    }

    pub fn step(&mut self, i_alpha: f32, dt: f32) -> Result<Measurement<f32>, MotorError> {
        if self.elapsed >= self.duration {
            return self.resistance().map(Measurement::Done);
        }

        self.test_voltage += RESISTANCE_CALIB_KI * dt * (self.test_current - i_alpha);
        if !(self.test_voltage.abs() <= self.max_voltage) {
            return Err(MotorError::PHASE_RESISTANCE_OUT_OF_RANGE);
        }
        self.elapsed += dt;

        Ok(Measurement::Drive {
            v_alpha: self.test_voltage,
            v_beta: 0.0,
        })
    }

    fn resistance(&self) -> Result<f32, MotorError> {
        let r = self.test_voltage / self.test_current;
        if r.is_finite() && r > 0.0 {
            Ok(r)
        } else {
            Err(MotorError::PHASE_RESISTANCE_OUT_OF_RANGE)
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
