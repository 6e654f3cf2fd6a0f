//! Field accessor table.
//!
//! Every configuration field and the diagnostic values of a motor are
//! addressed by a dotted path (`config.current_lim`, `timing.max_latency`,
//! ...). Reads are pure. Writes go through the same rules as the typed API:
//!
//! | Path                                   | Write side effect                  |
//! |----------------------------------------|------------------------------------|
//! | `config.*`                             | refused while armed; validated     |
//! | `config.pre_calibrated`                | gains recomputed, calibrated flag  |
//! | `config.phase_resistance` / `_inductance` / `current_control_bandwidth` | gains recomputed |
//! | `config.switching_frequency` / `control_frequency_divider` / `current_sample_mode` | period recomputed |
//! | `error`                                | writing 0 acknowledges all faults  |
//! | `current_control.cmd_timeout_us`       | none                               |
//!
//! Enumerations travel as their numeric codes. Optional overrides read as
//! NaN when unset; writing NaN (or a non-positive bus voltage) unsets them.

use std::fmt;

use motor_common::motor::config::{MotorConfig, MotorType, UpdateMode};
use thiserror::Error;
use tracing::info;

use crate::hal::MotorHardware;
use crate::motor::Motor;

/// Value of one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Float(f32),
    Uint(u32),
    Int(i32),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
        }
    }
}

/// Field access errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("Unknown field: {0}")]
    Unknown(String),

    #[error("Field is read-only: {0}")]
    ReadOnly(String),

    #[error("Configuration cannot change while armed")]
    Armed,

    #[error("Field {path} expects {expected}, got {got:?}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        got: FieldValue,
    },

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Every readable path.
pub const FIELD_NAMES: &[&str] = &[
    "error",
    "is_armed",
    "is_calibrated",
    "armed_law",
    "effective_current_limit",
    "vbus_voltage",
    "dc_offset.a",
    "dc_offset.b",
    "dc_offset.c",
    "current_control.p_gain",
    "current_control.i_gain",
    "current_control.enable_current_control",
    "current_control.id_setpoint",
    "current_control.iq_setpoint",
    "current_control.vd_setpoint",
    "current_control.vq_setpoint",
    "current_control.cmd_timeout_us",
    "current_control.id_measured",
    "current_control.iq_measured",
    "current_control.ibus",
    "current_control.final_v_d",
    "current_control.final_v_q",
    "current_control.final_v_alpha",
    "current_control.final_v_beta",
    "current_control.max_allowed_current",
    "thermal.inverter_temperature",
    "thermal.motor_temperature",
    "thermal.inverter_fraction",
    "thermal.motor_fraction",
    "timing.period",
    "timing.cycle_count",
    "timing.max_latency",
    "timing.deadline_misses",
    "config.pre_calibrated",
    "config.async_calibrated",
    "config.pole_pairs",
    "config.calibration_current",
    "config.resistance_calib_max_voltage",
    "config.phase_inductance",
    "config.phase_resistance",
    "config.rotor_inductance",
    "config.rotor_resistance",
    "config.mutual_inductance",
    "config.direction",
    "config.motor_type",
    "config.current_lim",
    "config.requested_current_range",
    "config.current_control_bandwidth",
    "config.inverter_temp_limit_lower",
    "config.inverter_temp_limit_upper",
    "config.motor_temp_limit_lower",
    "config.motor_temp_limit_upper",
    "config.phase_delay",
    "config.i_bus_hard_min",
    "config.i_bus_hard_max",
    "config.i_bus_soft_max",
    "config.max_leak_current",
    "config.switching_frequency",
    "config.control_frequency_divider",
    "config.vbus_voltage_override",
    "config.motor_temp_override",
    "config.dc_bus_undervoltage_trip_level",
    "config.dc_bus_overvoltage_trip_level",
    "config.calib_tau",
    "config.i_measured_tau",
    "config.i_measured_report_filter_tau",
    "config.inv_temp_tau",
    "config.motor_temp_tau",
    "config.vbus_voltage_tau",
    "config.current_sample_mode",
    "config.pwm_update_mode",
    "config.current_dc_calib_mode",
];

// ─── Read ───────────────────────────────────────────────────────────

pub fn read_field<H: MotorHardware>(motor: &Motor<H>, path: &str) -> Result<FieldValue, FieldError> {
    use FieldValue::{Bool, Float, Uint};

    if let Some(key) = path.strip_prefix("config.") {
        return read_config(motor.config(), key).ok_or_else(|| FieldError::Unknown(path.to_string()));
    }
    let cc = motor.current_control();
    let thermal = motor.limiter();
    let timing = motor.timing_log();
    let value = match path {
        "error" => Uint(motor.error().bits()),
        "is_armed" => Bool(motor.is_armed()),
        "is_calibrated" => Bool(motor.is_calibrated()),
        "armed_law" => Uint(motor.armed_law().map_or(0, |k| k as u32)),
        "effective_current_limit" => Float(motor.effective_current_limit()),
        "vbus_voltage" => Float(motor.vbus_voltage()),
        "dc_offset.a" => Float(motor.dc_offset().a),
        "dc_offset.b" => Float(motor.dc_offset().b),
        "dc_offset.c" => Float(motor.dc_offset().c),
        "current_control.p_gain" => Float(cc.gains.p_gain),
        "current_control.i_gain" => Float(cc.gains.i_gain),
        "current_control.enable_current_control" => Bool(cc.enable_current_control),
        "current_control.id_setpoint" => Float(cc.id_setpoint),
        "current_control.iq_setpoint" => Float(cc.iq_setpoint),
        "current_control.vd_setpoint" => Float(cc.vd_setpoint),
        "current_control.vq_setpoint" => Float(cc.vq_setpoint),
        "current_control.cmd_timeout_us" => Uint(cc.cmd_timeout_us),
        "current_control.id_measured" => Float(cc.id_measured),
        "current_control.iq_measured" => Float(cc.iq_measured),
        "current_control.ibus" => Float(cc.ibus),
        "current_control.final_v_d" => Float(cc.final_v_d),
        "current_control.final_v_q" => Float(cc.final_v_q),
        "current_control.final_v_alpha" => Float(cc.final_v_alpha),
        "current_control.final_v_beta" => Float(cc.final_v_beta),
        "current_control.max_allowed_current" => Float(cc.max_allowed_current),
        "thermal.inverter_temperature" => Float(thermal.inverter_temperature().unwrap_or(f32::NAN)),
        "thermal.motor_temperature" => Float(thermal.motor_temperature().unwrap_or(f32::NAN)),
        "thermal.inverter_fraction" => Float(thermal.inverter_fraction()),
        "thermal.motor_fraction" => Float(thermal.motor_fraction()),
        "timing.period" => Uint(motor.timer_sync().period()),
        "timing.cycle_count" => Uint(saturate(timing.cycle_count)),
        "timing.max_latency" => Uint(timing.max_latency),
        "timing.deadline_misses" => Uint(saturate(timing.deadline_misses)),
        _ => return Err(FieldError::Unknown(path.to_string())),
    };
    Ok(value)
}

fn saturate(v: u64) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

fn read_config(c: &MotorConfig, key: &str) -> Option<FieldValue> {
    use FieldValue::{Bool, Float, Int, Uint};

    let value = match key {
        "pre_calibrated" => Bool(c.pre_calibrated),
        "async_calibrated" => Bool(c.async_calibrated),
        "pole_pairs" => Uint(c.pole_pairs),
        "calibration_current" => Float(c.calibration_current),
        "resistance_calib_max_voltage" => Float(c.resistance_calib_max_voltage),
        "phase_inductance" => Float(c.phase_inductance),
        "phase_resistance" => Float(c.phase_resistance),
        "rotor_inductance" => Float(c.rotor_inductance),
        "rotor_resistance" => Float(c.rotor_resistance),
        "mutual_inductance" => Float(c.mutual_inductance),
        "direction" => Int(c.direction),
        "motor_type" => Uint(c.motor_type.code()),
        "current_lim" => Float(c.current_lim),
        "requested_current_range" => Float(c.requested_current_range),
        "current_control_bandwidth" => Float(c.current_control_bandwidth),
        "inverter_temp_limit_lower" => Float(c.inverter_temp_limit_lower),
        "inverter_temp_limit_upper" => Float(c.inverter_temp_limit_upper),
        "motor_temp_limit_lower" => Float(c.motor_temp_limit_lower),
        "motor_temp_limit_upper" => Float(c.motor_temp_limit_upper),
        "phase_delay" => Float(c.phase_delay),
        "i_bus_hard_min" => Float(c.i_bus_hard_min),
        "i_bus_hard_max" => Float(c.i_bus_hard_max),
        "i_bus_soft_max" => Float(c.i_bus_soft_max),
        "max_leak_current" => Float(c.max_leak_current),
        "switching_frequency" => Float(c.switching_frequency),
        "control_frequency_divider" => Uint(c.control_frequency_divider),
        "vbus_voltage_override" => Float(c.vbus_voltage_override.unwrap_or(f32::NAN)),
        "motor_temp_override" => Float(c.motor_temp_override.unwrap_or(f32::NAN)),
        "dc_bus_undervoltage_trip_level" => Float(c.dc_bus_undervoltage_trip_level),
        "dc_bus_overvoltage_trip_level" => Float(c.dc_bus_overvoltage_trip_level),
        "calib_tau" => Float(c.calib_tau),
        "i_measured_tau" => Float(c.i_measured_tau),
        "i_measured_report_filter_tau" => Float(c.i_measured_report_filter_tau),
        "inv_temp_tau" => Float(c.inv_temp_tau),
        "motor_temp_tau" => Float(c.motor_temp_tau),
        "vbus_voltage_tau" => Float(c.vbus_voltage_tau),
        "current_sample_mode" => Uint(c.current_sample_mode.code()),
        "pwm_update_mode" => Uint(c.pwm_update_mode.code()),
        "current_dc_calib_mode" => Uint(c.current_dc_calib_mode.code()),
        _ => return None,
    };
    Some(value)
}

// ─── Write ──────────────────────────────────────────────────────────

/// Follow-up work after a configuration write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SideEffect {
    None,
    Gains,
    PreCalibrated(bool),
    Frequency,
}

pub fn write_field<H: MotorHardware>(
    motor: &mut Motor<H>,
    path: &str,
    value: FieldValue,
) -> Result<(), FieldError> {
    if let Some(key) = path.strip_prefix("config.") {
        return write_config(motor, key, path, value);
    }
    match path {
        "error" => {
            if as_uint(path, value)? != 0 {
                return Err(FieldError::InvalidValue(
                    "only 0 acknowledges errors".to_string(),
                ));
            }
            if motor.clear_errors() {
                Ok(())
            } else {
                Err(FieldError::Armed)
            }
        }
        "current_control.cmd_timeout_us" => {
            motor.current_control_mut().cmd_timeout_us = as_uint(path, value)?;
            Ok(())
        }
        _ if read_field(motor, path).is_ok() => Err(FieldError::ReadOnly(path.to_string())),
        _ => Err(FieldError::Unknown(path.to_string())),
    }
}

fn write_config<H: MotorHardware>(
    motor: &mut Motor<H>,
    key: &str,
    path: &str,
    value: FieldValue,
) -> Result<(), FieldError> {
    if motor.is_armed() {
        return Err(FieldError::Armed);
    }
    let mut config = motor.config().clone();
    let effect = set_config(&mut config, key, path, value)?;
    config.validate().map_err(FieldError::InvalidValue)?;
    match motor.config_mut() {
        Some(c) => *c = config,
        None => return Err(FieldError::Armed),
    }
    info!("{} = {}", path, value);

    match effect {
        SideEffect::None => {}
        SideEffect::Gains => motor.update_current_controller_gains(),
        SideEffect::PreCalibrated(v) => {
            motor.set_pre_calibrated(v);
        }
        // An unrealizable setting latches INVALID_FREQ_SETTING.
        SideEffect::Frequency => {
            motor.update_switching_frequency();
        }
    }
    Ok(())
}

fn set_config(
    c: &mut MotorConfig,
    key: &str,
    path: &str,
    value: FieldValue,
) -> Result<SideEffect, FieldError> {
    let f = |v| as_float(path, v);
    let mut effect = SideEffect::None;
    match key {
        "pre_calibrated" => {
            c.pre_calibrated = as_bool(path, value)?;
            effect = SideEffect::PreCalibrated(c.pre_calibrated);
        }
        "async_calibrated" => c.async_calibrated = as_bool(path, value)?,
        "pole_pairs" => c.pole_pairs = as_uint(path, value)?,
        "calibration_current" => c.calibration_current = f(value)?,
        "resistance_calib_max_voltage" => c.resistance_calib_max_voltage = f(value)?,
        "phase_inductance" => {
            c.phase_inductance = f(value)?;
            effect = SideEffect::Gains;
        }
        "phase_resistance" => {
            c.phase_resistance = f(value)?;
            effect = SideEffect::Gains;
        }
        "current_control_bandwidth" => {
            c.current_control_bandwidth = f(value)?;
            effect = SideEffect::Gains;
        }
        "rotor_inductance" => c.rotor_inductance = f(value)?,
        "rotor_resistance" => c.rotor_resistance = f(value)?,
        "mutual_inductance" => c.mutual_inductance = f(value)?,
        "direction" => c.direction = as_int(path, value)?,
        "motor_type" => {
            let code = as_uint(path, value)?;
            c.motor_type = MotorType::from_code(code)
                .ok_or_else(|| FieldError::InvalidValue(format!("unknown motor type {code}")))?;
        }
        "current_lim" => c.current_lim = f(value)?,
        "requested_current_range" => c.requested_current_range = f(value)?,
        "inverter_temp_limit_lower" => c.inverter_temp_limit_lower = f(value)?,
        "inverter_temp_limit_upper" => c.inverter_temp_limit_upper = f(value)?,
        "motor_temp_limit_lower" => c.motor_temp_limit_lower = f(value)?,
        "motor_temp_limit_upper" => c.motor_temp_limit_upper = f(value)?,
        "phase_delay" => c.phase_delay = f(value)?,
        "i_bus_hard_min" => c.i_bus_hard_min = f(value)?,
        "i_bus_hard_max" => c.i_bus_hard_max = f(value)?,
        "i_bus_soft_max" => c.i_bus_soft_max = f(value)?,
        "max_leak_current" => c.max_leak_current = f(value)?,
        "switching_frequency" => {
            c.switching_frequency = f(value)?;
            effect = SideEffect::Frequency;
        }
        "control_frequency_divider" => {
            c.control_frequency_divider = as_uint(path, value)?;
            effect = SideEffect::Frequency;
        }
        "vbus_voltage_override" => {
            let v = f(value)?;
            c.vbus_voltage_override = (v > 0.0).then_some(v);
        }
        "motor_temp_override" => {
            let t = f(value)?;
            c.motor_temp_override = (!t.is_nan()).then_some(t);
        }
        "dc_bus_undervoltage_trip_level" => c.dc_bus_undervoltage_trip_level = f(value)?,
        "dc_bus_overvoltage_trip_level" => c.dc_bus_overvoltage_trip_level = f(value)?,
        "calib_tau" => c.calib_tau = f(value)?,
        "i_measured_tau" => c.i_measured_tau = f(value)?,
        "i_measured_report_filter_tau" => c.i_measured_report_filter_tau = f(value)?,
        "inv_temp_tau" => c.inv_temp_tau = f(value)?,
        "motor_temp_tau" => c.motor_temp_tau = f(value)?,
        "vbus_voltage_tau" => c.vbus_voltage_tau = f(value)?,
        "current_sample_mode" => {
            c.current_sample_mode = as_mode(path, value)?;
            effect = SideEffect::Frequency;
        }
        "pwm_update_mode" => c.pwm_update_mode = as_mode(path, value)?,
        "current_dc_calib_mode" => c.current_dc_calib_mode = as_mode(path, value)?,
        _ => return Err(FieldError::Unknown(path.to_string())),
    }
    Ok(effect)
}

// ─── Coercion ───────────────────────────────────────────────────────

fn mismatch(path: &str, expected: &'static str, got: FieldValue) -> FieldError {
    FieldError::TypeMismatch {
        path: path.to_string(),
        expected,
        got,
    }
}

fn as_bool(path: &str, v: FieldValue) -> Result<bool, FieldError> {
    match v {
        FieldValue::Bool(b) => Ok(b),
        other => Err(mismatch(path, "bool", other)),
    }
}

fn as_float(path: &str, v: FieldValue) -> Result<f32, FieldError> {
    match v {
        FieldValue::Float(x) => Ok(x),
        other => Err(mismatch(path, "float", other)),
    }
}

fn as_uint(path: &str, v: FieldValue) -> Result<u32, FieldError> {
    match v {
        FieldValue::Uint(x) => Ok(x),
        other => Err(mismatch(path, "uint", other)),
    }
}

fn as_int(path: &str, v: FieldValue) -> Result<i32, FieldError> {
    match v {
        FieldValue::Int(x) => Ok(x),
        other => Err(mismatch(path, "int", other)),
    }
}

fn as_mode(path: &str, v: FieldValue) -> Result<UpdateMode, FieldError> {
    let code = as_uint(path, v)?;
    UpdateMode::from_code(code)
        .ok_or_else(|| FieldError::InvalidValue(format!("unknown update mode {code}")))
}

// ─── Tests ──────────────────────────────────────────────────────────
