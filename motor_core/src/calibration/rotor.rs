//! Induction-motor rotor identification.
//!
//! With stator resistance `R` and transient inductance `Lσ` known, a
//! current-controlled step on the alpha axis magnetizes the rotor. In the
//! inverse-Γ model the excess voltage `e = v − R·i` integrates to the
//! stator flux, so the rotor flux estimate is
//!
//! ```text
//! ψ(t) = ∫e dt − Lσ·i(t)
//! ```
//!
//! At the end of the step `LM = ψ(T)/i(T)`, and integrating the rotor
//! equation `dψ/dt = RR·(i − ψ/LM)` over the step gives
//! `RR = ψ(T) / ∫(i − ψ/LM) dt`, independent of how fast the current loop
//! reached the test current.

use motor_common::consts::{LINEAR_MODULATION_LIMIT, ROTOR_CALIB_DURATION_S};
use motor_common::motor::error::MotorError;

use super::Measurement;
use crate::control::pi::{CurrentGains, DqIntegrator, pi_integrate, pi_voltage};
use crate::control::transforms::{limit_vector, volts_per_modulation};

/// Rotor parameters in the inverse-Γ model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotorEstimate {
    /// Magnetizing inductance LM [H].
    pub magnetizing_inductance: f32,
    /// Referred rotor resistance RR [Ω].
    pub rotor_resistance: f32,
    /// Rotor time constant LM/RR [s].
    pub rotor_time_constant: f32,
}

/// Rotor parameters in the T model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TModel {
    pub mutual_inductance: f32,
    pub rotor_inductance: f32,
    pub rotor_resistance: f32,
}

impl RotorEstimate {
    /// Convert to the T model assuming equal stator and rotor leakage.
    pub fn to_t_model(&self, transient_inductance: f32) -> TModel {
        let lm = self.magnetizing_inductance;
        let lr = lm + 0.5 * transient_inductance;
        let ratio = lr / lm;
        TModel {
            mutual_inductance: lm,
            rotor_inductance: lr,
            rotor_resistance: self.rotor_resistance * ratio * ratio,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RotorEstimator {
    test_current: f32,
    resistance: f32,
    inductance: f32,
    gains: CurrentGains,
    integrator: DqIntegrator,
    duration: f32,
    elapsed: f32,
    last_voltage: f32,
    last_current: f32,
    stator_flux: f64,
    current_integral: f64,
    flux_integral: f64,
}

impl RotorEstimator {
    pub fn new(test_current: f32, resistance: f32, inductance: f32, bandwidth: f32) -> Self {
        Self {
            test_current,
            resistance,
            inductance,
            gains: CurrentGains::from_motor(bandwidth, resistance, inductance),
            integrator: DqIntegrator::default(),
            duration: ROTOR_CALIB_DURATION_S,
            elapsed: 0.0,
            last_voltage: 0.0,
            last_current: 0.0,
            stator_flux: 0.0,
            current_integral: 0.0,
            flux_integral: 0.0,
        }
    }

    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = duration;
        self
    }

    pub fn step(
        &mut self,
        i_alpha: f32,
        i_beta: f32,
        vbus: f32,
        dt: f32,
    ) -> Result<Measurement<RotorEstimate>, MotorError> {
        let dt64 = f64::from(dt);
        let i = f64::from(i_alpha);
        let e = f64::from(self.last_voltage) - f64::from(self.resistance) * i;
        self.stator_flux += e * dt64;
        let rotor_flux = self.stator_flux - f64::from(self.inductance) * i;
        self.current_integral += i * dt64;
        self.flux_integral += rotor_flux * dt64;
        self.last_current = i_alpha;

        if self.elapsed >= self.duration {
            return self.estimate().map(Measurement::Done);
        }

        let err_d = self.test_current - i_alpha;
        let err_q = -i_beta;
        let (vd, vq) = pi_voltage(&self.integrator, &self.gains, err_d, err_q, 0.0, 0.0);
        let v_max = LINEAR_MODULATION_LIMIT * volts_per_modulation(vbus);
        let (vd, vq, saturated) = limit_vector(vd, vq, v_max);
        pi_integrate(&mut self.integrator, &self.gains, err_d, err_q, dt, saturated);

        self.last_voltage = vd;
        self.elapsed += dt;
        Ok(Measurement::Drive {
            v_alpha: vd,
            v_beta: vq,
        })
    }

    fn estimate(&self) -> Result<RotorEstimate, MotorError> {
        let i_end = f64::from(self.last_current);
        if !(i_end > 0.5 * f64::from(self.test_current)) {
            return Err(MotorError::PHASE_RESISTANCE_OUT_OF_RANGE);
        }
        let flux_end = self.stator_flux - f64::from(self.inductance) * i_end;
        let lm = flux_end / i_end;
        if !(lm.is_finite() && lm > 0.0) {
            return Err(MotorError::PHASE_INDUCTANCE_OUT_OF_RANGE);
        }
        let rr = flux_end / (self.current_integral - self.flux_integral / lm);
        if !(rr.is_finite() && rr > 0.0) {
            return Err(MotorError::PHASE_RESISTANCE_OUT_OF_RANGE);
        }
        Ok(RotorEstimate {
            magnetizing_inductance: lm as f32,
            rotor_resistance: rr as f32,
            rotor_time_constant: (lm / rr) as f32,
        })
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
