//! Phase inductance measurement.
//!
//! A ±V square wave is applied on the alpha axis, each polarity held for
//! [`INDUCTANCE_CALIB_HOLD_CYCLES`] control cycles. Because the voltage
//! decided in one cycle reaches the motor half a period later, the sample
//! interval right after a polarity change sees a mix of both polarities and
//! is skipped. Every sample interval with a single polarity gives one slope
//! estimate
//!
//! ```text
//! L = (v - R·ī) · T / Δi
//! ```
//!
//! and the result is the mean over all segments. Positive and negative
//! segments alternate, so a slowly varying offset voltage cancels.

use motor_common::consts::{
    INDUCTANCE_CALIB_DURATION_S, INDUCTANCE_CALIB_HOLD_CYCLES, INDUCTANCE_MAX_H, INDUCTANCE_MIN_H,
};
use motor_common::motor::error::MotorError;

use super::Measurement;

#[derive(Debug, Clone)]
pub struct InductanceEstimator {
    voltage: f32,
    resistance: f32,
    duration: f32,
    hold_cycles: u32,
    cycle: u32,
    elapsed: f32,
    last_current: Option<f32>,
    /// Output of the previous two cycles, newest first.
    prev_outputs: [Option<f32>; 2],
    sum_inductance: f64,
    segments: u32,
}

impl InductanceEstimator {
    pub fn new(voltage: f32, resistance: f32) -> Self {
        Self {
            voltage: voltage.abs(),
            resistance,
            duration: INDUCTANCE_CALIB_DURATION_S,
            hold_cycles: INDUCTANCE_CALIB_HOLD_CYCLES.max(2),
            cycle: 0,
            elapsed: 0.0,
            last_current: None,
            prev_outputs: [None, None],
            sum_inductance: 0.0,
            segments: 0,
        }
    }

    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = duration;
        self
    }

    /// Number of single-polarity segments evaluated so far.
    pub fn segments(&self) -> u32 {
        self.segments
    }

    pub fn step(&mut self, i_alpha: f32, dt: f32) -> Result<Measurement<f32>, MotorError> {
        if let (Some(last), [Some(v1), Some(v2)]) = (self.last_current, self.prev_outputs) {
            let di = i_alpha - last;
            if v1 == v2 && di != 0.0 {
                let i_mean = 0.5 * (i_alpha + last);
                let l = (v1 - self.resistance * i_mean) * dt / di;
                self.sum_inductance += f64::from(l);
                self.segments += 1;
            }
        }
        self.last_current = Some(i_alpha);

        if self.elapsed >= self.duration {
            return self.inductance().map(Measurement::Done);
        }

        let v = if (self.cycle / self.hold_cycles) % 2 == 0 {
            self.voltage
        } else {
            -self.voltage
        };
        self.prev_outputs = [Some(v), self.prev_outputs[0]];
        self.cycle += 1;
        self.elapsed += dt;

        Ok(Measurement::Drive {
            v_alpha: v,
            v_beta: 0.0,
        })
    }

    fn inductance(&self) -> Result<f32, MotorError> {
        if self.segments == 0 {
            return Err(MotorError::PHASE_INDUCTANCE_OUT_OF_RANGE);
        }
        let l = (self.sum_inductance / f64::from(self.segments)) as f32;
        if (INDUCTANCE_MIN_H..=INDUCTANCE_MAX_H).contains(&l) {
            Ok(l)
        } else {
            Err(MotorError::PHASE_INDUCTANCE_OUT_OF_RANGE)
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
