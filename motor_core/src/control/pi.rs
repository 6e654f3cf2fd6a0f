//! dq current PI controller with shared vector saturation.
//!
//! Both axes share one voltage vector limit. While the vector is clamped the
//! integrators decay instead of integrating (anti-windup); otherwise they
//! integrate the current error. The output stage is split from the
//! integrator update so the caller can apply further limits (bus current)
//! before deciding whether the cycle was saturated.

use motor_common::consts::INTEGRATOR_DECAY;

/// PI gains derived from the motor model.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CurrentGains {
    /// Proportional gain [V/A].
    pub p_gain: f32,
    /// Integral gain [V/(A·s)].
    pub i_gain: f32,
}

impl CurrentGains {
    /// Pole-zero cancellation design: `p = bandwidth · L`, `i = (R/L) · p`.
    ///
    /// Returns zero gains if the inductance is not positive.
    pub fn from_motor(bandwidth: f32, resistance: f32, inductance: f32) -> Self {
        if !(inductance > 0.0) || !bandwidth.is_finite() {
            return Self::default();
        }
        let p_gain = bandwidth * inductance;
        Self {
            p_gain,
            i_gain: (resistance / inductance) * p_gain,
        }
    }
}

/// Integrator state of both axes [V].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DqIntegrator {
    pub d: f32,
    pub q: f32,
}

impl DqIntegrator {
    /// Reset both integrators to zero.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Unsaturated PI voltage for both axes: feedforward + integral + P·error.
#[inline]
pub fn pi_voltage(
    integ: &DqIntegrator,
    gains: &CurrentGains,
    err_d: f32,
    err_q: f32,
    ff_d: f32,
    ff_q: f32,
) -> (f32, f32) {
    (
        ff_d + integ.d + gains.p_gain * err_d,
        ff_q + integ.q + gains.p_gain * err_q,
    )
}

/// Advance the integrators after the output stage decided saturation.
#[inline]
pub fn pi_integrate(
    integ: &mut DqIntegrator,
    gains: &CurrentGains,
    err_d: f32,
    err_q: f32,
    dt: f32,
    saturated: bool,
) {
    if saturated {
        integ.d *= INTEGRATOR_DECAY;
        integ.q *= INTEGRATOR_DECAY;
    } else {
        integ.d += err_d * gains.i_gain * dt;
        integ.q += err_q * gains.i_gain * dt;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
