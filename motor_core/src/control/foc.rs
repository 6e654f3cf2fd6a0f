//! Field-oriented current/voltage control, one cycle at a time.
//!
//! Pipeline per cycle:
//! 1. Reject an expired setpoint.
//! 2. Clarke + Park of the measured currents at the (extrapolated) phase.
//! 3. PI per axis in current mode, or the Vd/Vq setpoints in voltage mode.
//! 4. Shared vector clamp to the linear modulation range.
//! 5. Bus current estimate, hard bounds and soft-limit scaling.
//! 6. Inverse Park at the PWM phase and space-vector modulation.

use motor_common::consts::{DEFAULT_CMD_TIMEOUT_US, LINEAR_MODULATION_LIMIT};
use motor_common::motor::config::{MotorConfig, MotorType};
use motor_common::motor::error::MotorError;
use motor_common::motor::types::PhaseCurrentSample;

use super::filters::ExpFilter;
use super::pi::{CurrentGains, DqIntegrator, pi_integrate, pi_voltage};
use super::transforms::{clarke, inverse_park, limit_vector, park, svm, volts_per_modulation};

/// Controller state owned by the timer context.
///
/// Integrators are reset on every arm and on every toggle of
/// `enable_current_control`.
#[derive(Debug, Clone, Default)]
pub struct CurrentControl {
    pub gains: CurrentGains,
    /// Current mode (true) or voltage mode (false).
    pub enable_current_control: bool,
    /// Electrical angle at `cmd_timestamp_us` [rad].
    pub phase: f32,
    /// Electrical velocity [rad/s].
    pub phase_vel: f32,
    pub id_setpoint: f32,
    pub iq_setpoint: f32,
    /// Voltage command (voltage mode) or feedforward (current mode) [V].
    pub vd_setpoint: f32,
    pub vq_setpoint: f32,
    pub cmd_timeout_us: u32,
    pub cmd_timestamp_us: u32,
    pub integrator: DqIntegrator,
    pub final_v_d: f32,
    pub final_v_q: f32,
    pub final_v_alpha: f32,
    pub final_v_beta: f32,
    /// Estimated DC bus current [A].
    pub ibus: f32,
    /// Reported (report-filtered) measured currents [A].
    pub id_measured: f32,
    pub iq_measured: f32,
    /// Largest current the sense amplifiers can measure [A].
    pub max_allowed_current: f32,
    id_filter: ExpFilter,
    iq_filter: ExpFilter,
    id_report: ExpFilter,
    iq_report: ExpFilter,
}

impl CurrentControl {
    pub fn new() -> Self {
        Self {
            enable_current_control: true,
            cmd_timeout_us: DEFAULT_CMD_TIMEOUT_US,
            ..Default::default()
        }
    }

    /// Reset integrators and measurement filters.
    pub fn reset(&mut self) {
        self.integrator.reset();
        self.id_filter.reset();
        self.iq_filter.reset();
        self.id_report.reset();
        self.iq_report.reset();
    }
}

/// Per-cycle inputs of the FOC law.
#[derive(Debug, Clone, Copy)]
pub struct FocInputs {
    pub sample: PhaseCurrentSample,
    /// Filtered bus voltage [V].
    pub vbus: f32,
    pub now_us: u32,
    /// Control period [s].
    pub dt: f32,
    /// Effective current limit [A].
    pub current_limit: f32,
}

/// Run one FOC cycle. Returns the phase timings.
pub fn foc_step(
    cc: &mut CurrentControl,
    config: &MotorConfig,
    input: &FocInputs,
) -> Result<[f32; 3], MotorError> {
    let elapsed_us = input.now_us.wrapping_sub(cc.cmd_timestamp_us);
    if elapsed_us > cc.cmd_timeout_us {
        return Err(MotorError::FOC_CMD_TIMEOUT);
    }
    if !(input.vbus > 0.0) {
        return Err(MotorError::MODULATION_MAGNITUDE);
    }

    let phase = cc.phase + cc.phase_vel * (elapsed_us as f32 * 1e-6);
    let pwm_phase = phase + 1.5 * input.dt * cc.phase_vel + config.phase_delay;

    // ── Measurement ─────────────────────────────────────────
    let (i_alpha, i_beta) = clarke(input.sample.currents);
    let (id_raw, iq_raw) = park(i_alpha, i_beta, phase);
    let id = cc.id_filter.update(id_raw, config.i_measured_tau, input.dt);
    let iq = cc.iq_filter.update(iq_raw, config.i_measured_tau, input.dt);
    cc.id_measured = cc
        .id_report
        .update(id_raw, config.i_measured_report_filter_tau, input.dt);
    cc.iq_measured = cc
        .iq_report
        .update(iq_raw, config.i_measured_report_filter_tau, input.dt);

    // ── Voltage command ─────────────────────────────────────
    let v_per_mod = volts_per_modulation(input.vbus);
    let (vd, vq, errors) = if cc.enable_current_control {
        let (id_sp, iq_sp, _) = limit_vector(cc.id_setpoint, cc.iq_setpoint, input.current_limit);
        let err_d = id_sp - id;
        let err_q = iq_sp - iq;
        let (vd, vq) = pi_voltage(
            &cc.integrator,
            &cc.gains,
            err_d,
            err_q,
            cc.vd_setpoint,
            cc.vq_setpoint,
        );
        (vd, vq, Some((err_d, err_q)))
    } else if config.motor_type == MotorType::Gimbal {
        let (vd, vq, _) = limit_vector(cc.vd_setpoint, cc.vq_setpoint, config.current_lim);
        (vd, vq, None)
    } else {
        (cc.vd_setpoint, cc.vq_setpoint, None)
    };

    let (mut mod_d, mut mod_q, mut saturated) =
        limit_vector(vd / v_per_mod, vq / v_per_mod, LINEAR_MODULATION_LIMIT);

    // ── Bus current ─────────────────────────────────────────
    let mut ibus = mod_d * id + mod_q * iq;
    if ibus < config.i_bus_hard_min || ibus > config.i_bus_hard_max {
        return Err(MotorError::I_BUS_OUT_OF_RANGE);
    }
    if ibus > config.i_bus_soft_max && ibus > 0.0 {
        let k = config.i_bus_soft_max.max(0.0) / ibus;
        mod_d *= k;
        mod_q *= k;
        ibus = config.i_bus_soft_max.max(0.0);
        saturated = true;
    }

    match errors {
        Some((err_d, err_q)) => {
            pi_integrate(&mut cc.integrator, &cc.gains, err_d, err_q, input.dt, saturated)
        }
        None => cc.integrator.reset(),
    }

    // ── Output ──────────────────────────────────────────────
    let (mod_alpha, mod_beta) = inverse_park(mod_d, mod_q, pwm_phase);
    cc.ibus = ibus;
    cc.final_v_d = mod_d * v_per_mod;
    cc.final_v_q = mod_q * v_per_mod;
    cc.final_v_alpha = mod_alpha * v_per_mod;
    cc.final_v_beta = mod_beta * v_per_mod;

    svm(mod_alpha, mod_beta).ok_or(MotorError::MODULATION_MAGNITUDE)
}

// ─── Tests ──────────────────────────────────────────────────────────
