//! Persistent motor parameters.
//!
//! [`MotorConfig`] is everything that survives a reboot: electrical
//! parameters (measured or entered), limits, filter time constants and the
//! PWM edge schedule. Every field has a default so a TOML file only needs
//! the values that differ.
//!
//! # TOML Example
//!
//! ```toml
//! [motor]
//! motor_type = "high_current"
//! pole_pairs = 7
//! current_lim = 20.0
//! calibration_current = 10.0
//! current_sample_mode = "on_bottom"
//! ```

use serde::{Deserialize, Serialize};

use super::types::Edge;
use crate::consts::{DEFAULT_CONTROL_FREQUENCY_DIVIDER, DEFAULT_SWITCHING_FREQUENCY_HZ};

// ─── Enums ──────────────────────────────────────────────────────────

/// Motor construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MotorType {
    /// Low-impedance PMSM driven in current control.
    #[default]
    HighCurrent,
    /// High-impedance gimbal motor driven in voltage control.
    Gimbal,
    /// Induction motor.
    Acim,
}

impl MotorType {
    /// Numeric code used by the field table.
    pub const fn code(self) -> u32 {
        match self {
            Self::HighCurrent => 0,
            Self::Gimbal => 2,
            Self::Acim => 3,
        }
    }

    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::HighCurrent),
            2 => Some(Self::Gimbal),
            3 => Some(Self::Acim),
            _ => None,
        }
    }
}

/// Which carrier edges an action is scheduled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    None,
    OnBottom,
    OnTop,
    OnBoth,
}

impl UpdateMode {
    /// Returns true if the action runs on `edge`.
    #[inline]
    pub const fn matches(self, edge: Edge) -> bool {
        matches!(
            (self, edge),
            (Self::OnBoth, _) | (Self::OnBottom, Edge::Bottom) | (Self::OnTop, Edge::Top)
        )
    }

    /// Runs on exactly one edge per PWM period.
    #[inline]
    pub const fn is_single_edge(self) -> bool {
        matches!(self, Self::OnBottom | Self::OnTop)
    }

    pub const fn code(self) -> u32 {
        match self {
            Self::None => 0,
            Self::OnBottom => 1,
            Self::OnTop => 2,
            Self::OnBoth => 3,
        }
    }

    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::OnBottom),
            2 => Some(Self::OnTop),
            3 => Some(Self::OnBoth),
            _ => None,
        }
    }
}

// ─── MotorConfig ────────────────────────────────────────────────────

/// Persistent motor parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorConfig {
    /// Electrical parameters are valid without running calibration.
    pub pre_calibrated: bool,
    /// Rotor parameters of an induction motor are valid.
    pub async_calibrated: bool,
    pub pole_pairs: u32,
    /// Test current for resistance/inductance measurement [A].
    pub calibration_current: f32,
    /// Maximum excitation voltage during calibration [V].
    pub resistance_calib_max_voltage: f32,
    /// Phase (transient) inductance [H].
    pub phase_inductance: f32,
    /// Phase resistance [Ω].
    pub phase_resistance: f32,
    /// Rotor self inductance, induction motors [H].
    pub rotor_inductance: f32,
    /// Rotor resistance, induction motors [Ω].
    pub rotor_resistance: f32,
    /// Mutual (magnetizing) inductance, induction motors [H].
    pub mutual_inductance: f32,
    /// Electrical direction: -1, 0 (unknown) or 1.
    pub direction: i32,
    pub motor_type: MotorType,
    /// Current limit [A]. Voltage limit [V] for gimbal motors.
    pub current_lim: f32,
    /// Current range requested from the sense amplifiers [A].
    pub requested_current_range: f32,
    /// Current loop bandwidth [rad/s].
    pub current_control_bandwidth: f32,
    /// Inverter derating starts here [°C].
    pub inverter_temp_limit_lower: f32,
    /// Inverter current limit reaches zero here [°C].
    pub inverter_temp_limit_upper: f32,
    /// Motor derating starts here [°C].
    pub motor_temp_limit_lower: f32,
    /// Motor current limit reaches zero here [°C].
    pub motor_temp_limit_upper: f32,
    /// Extra electrical angle added to the PWM phase [rad].
    pub phase_delay: f32,
    /// Estimated bus current hard lower bound [A].
    pub i_bus_hard_min: f32,
    /// Estimated bus current hard upper bound [A].
    pub i_bus_hard_max: f32,
    /// Estimated bus current soft upper bound [A]; output is scaled above it.
    pub i_bus_soft_max: f32,
    /// Maximum |a + b + c| with three sensors [A].
    pub max_leak_current: f32,
    /// PWM switching frequency [Hz].
    pub switching_frequency: f32,
    /// Timer update events per control cycle.
    pub control_frequency_divider: u32,
    /// Fixed bus voltage used instead of the sensor [V].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vbus_voltage_override: Option<f32>,
    /// Fixed motor temperature used instead of the sensors [°C].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motor_temp_override: Option<f32>,
    pub dc_bus_undervoltage_trip_level: f32,
    pub dc_bus_overvoltage_trip_level: f32,
    /// DC offset calibration filter time constant [s].
    pub calib_tau: f32,
    /// Measured Id/Iq filter used by the controller [s] (0 = off).
    pub i_measured_tau: f32,
    /// Measured Id/Iq filter for reported values [s] (0 = off).
    pub i_measured_report_filter_tau: f32,
    pub inv_temp_tau: f32,
    pub motor_temp_tau: f32,
    pub vbus_voltage_tau: f32,
    pub current_sample_mode: UpdateMode,
    pub pwm_update_mode: UpdateMode,
    pub current_dc_calib_mode: UpdateMode,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            pre_calibrated: false,
            async_calibrated: false,
            pole_pairs: 7,
            calibration_current: 10.0,
            resistance_calib_max_voltage: 2.0,
            phase_inductance: 0.0,
            phase_resistance: 0.0,
            rotor_inductance: 0.0,
            rotor_resistance: 0.0,
            mutual_inductance: 0.0,
            direction: 0,
            motor_type: MotorType::HighCurrent,
            current_lim: 10.0,
            requested_current_range: 60.0,
            current_control_bandwidth: 1000.0,
            inverter_temp_limit_lower: 100.0,
            inverter_temp_limit_upper: 120.0,
            motor_temp_limit_lower: 100.0,
            motor_temp_limit_upper: 120.0,
            phase_delay: 0.0,
            i_bus_hard_min: f32::NEG_INFINITY,
            i_bus_hard_max: f32::INFINITY,
            i_bus_soft_max: f32::INFINITY,
            max_leak_current: f32::INFINITY,
            switching_frequency: DEFAULT_SWITCHING_FREQUENCY_HZ,
            control_frequency_divider: DEFAULT_CONTROL_FREQUENCY_DIVIDER,
            vbus_voltage_override: None,
            motor_temp_override: None,
            dc_bus_undervoltage_trip_level: 8.0,
            dc_bus_overvoltage_trip_level: 56.0,
            calib_tau: 0.2,
            i_measured_tau: 0.0,
            i_measured_report_filter_tau: 0.0,
            inv_temp_tau: 0.01,
            motor_temp_tau: 0.01,
            vbus_voltage_tau: 0.01,
            current_sample_mode: UpdateMode::OnBottom,
            pwm_update_mode: UpdateMode::OnTop,
            current_dc_calib_mode: UpdateMode::OnTop,
        }
    }
}

impl MotorConfig {
    /// Validate parameter ranges.
    ///
    /// Timer feasibility of the frequency settings is checked separately when
    /// the period is derived, because it depends on the timer clock.
    pub fn validate(&self) -> Result<(), String> {
        if self.pole_pairs == 0 {
            return Err("pole_pairs must be > 0".to_string());
        }
        if !matches!(self.direction, -1..=1) {
            return Err(format!("direction must be -1, 0 or 1, got {}", self.direction));
        }
        if !(self.calibration_current > 0.0) {
            return Err("calibration_current must be > 0".to_string());
        }
        if !(self.resistance_calib_max_voltage > 0.0) {
            return Err("resistance_calib_max_voltage must be > 0".to_string());
        }
        if !(self.current_lim >= 0.0) {
            return Err("current_lim must be >= 0".to_string());
        }
        if !(self.current_control_bandwidth > 0.0) {
            return Err("current_control_bandwidth must be > 0".to_string());
        }
        if self.phase_resistance < 0.0 || self.phase_inductance < 0.0 {
            return Err("phase_resistance and phase_inductance must be >= 0".to_string());
        }
        if self.pre_calibrated && !(self.phase_resistance > 0.0 && self.phase_inductance > 0.0) {
            return Err(
                "pre_calibrated requires phase_resistance and phase_inductance > 0".to_string(),
            );
        }
        if !(self.inverter_temp_limit_lower < self.inverter_temp_limit_upper) {
            return Err(format!(
                "inverter_temp_limit_lower ({}) must be < inverter_temp_limit_upper ({})",
                self.inverter_temp_limit_lower, self.inverter_temp_limit_upper
            ));
        }
        if !(self.motor_temp_limit_lower < self.motor_temp_limit_upper) {
            return Err(format!(
                "motor_temp_limit_lower ({}) must be < motor_temp_limit_upper ({})",
                self.motor_temp_limit_lower, self.motor_temp_limit_upper
            ));
        }
        if self.i_bus_hard_min > self.i_bus_hard_max {
            return Err("i_bus_hard_min must be <= i_bus_hard_max".to_string());
        }
        if self.dc_bus_undervoltage_trip_level >= self.dc_bus_overvoltage_trip_level {
            return Err("dc_bus_undervoltage_trip_level must be below the over-voltage level".to_string());
        }
        let taus = [
            ("calib_tau", self.calib_tau),
            ("i_measured_tau", self.i_measured_tau),
            ("i_measured_report_filter_tau", self.i_measured_report_filter_tau),
            ("inv_temp_tau", self.inv_temp_tau),
            ("motor_temp_tau", self.motor_temp_tau),
            ("vbus_voltage_tau", self.vbus_voltage_tau),
        ];
        for (name, tau) in taus {
            if !(tau >= 0.0) {
                return Err(format!("{name} must be >= 0"));
            }
        }
        Ok(())
    }
}
