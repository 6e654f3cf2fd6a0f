//! Thermal / current limiter.
//!
//! Temperatures are filtered, then each source derates the configured
//! current limit linearly between its lower and upper temperature:
//!
//! ```text
//! fraction = 1                              T ≤ lower
//!          = (upper − T) / (upper − lower)  lower < T < upper
//!          = 0  + over-temperature fault     T ≥ upper
//! ```
//!
//! The inverter uses its hottest leg, the motor its hottest sensor (or the
//! configured override). Missing sensors never derate. A non-finite reading
//! is treated as over temperature and never reaches the filter.

use motor_common::motor::config::MotorConfig;
use motor_common::motor::error::MotorError;
use motor_common::motor::types::Temperatures;

use crate::control::filters::ExpFilter;

/// Linear derating fraction in `[0, 1]`.
#[inline]
pub fn derate(temperature: f32, lower: f32, upper: f32) -> f32 {
    if temperature >= upper {
        0.0
    } else if temperature <= lower {
        1.0
    } else {
        (upper - temperature) / (upper - lower)
    }
}

/// Filtered temperatures and their current-limit fractions.
#[derive(Debug, Clone, Default)]
pub struct ThermalLimiter {
    inverter: [ExpFilter; 3],
    motor: [ExpFilter; 3],
    inverter_max: Option<f32>,
    motor_max: Option<f32>,
    inverter_fraction: f32,
    motor_fraction: f32,
}

impl ThermalLimiter {
    pub fn new() -> Self {
        Self {
            inverter_fraction: 1.0,
            motor_fraction: 1.0,
            ..Default::default()
        }
    }

    /// Hottest filtered inverter leg [°C].
    pub fn inverter_temperature(&self) -> Option<f32> {
        self.inverter_max
    }

    /// Hottest filtered motor sensor, or the override [°C].
    pub fn motor_temperature(&self) -> Option<f32> {
        self.motor_max
    }

    pub fn inverter_fraction(&self) -> f32 {
        self.inverter_fraction
    }

    pub fn motor_fraction(&self) -> f32 {
        self.motor_fraction
    }

    /// Feed one set of readings. Returns the over-temperature flags to raise
    /// (empty when none); both flags may be returned together.
    pub fn update(&mut self, temps: &Temperatures, config: &MotorConfig, dt: f32) -> MotorError {
        let (inverter_max, inverter_invalid) =
            filter_max(&mut self.inverter, &temps.inverter, config.inv_temp_tau, dt);
        let (motor_max, motor_invalid) = match config.motor_temp_override {
            Some(t) if t.is_finite() => (Some(t), false),
            Some(_) => (None, true),
            None => filter_max(&mut self.motor, &temps.motor, config.motor_temp_tau, dt),
        };
        self.inverter_max = inverter_max;
        self.motor_max = motor_max;

        let mut faults = MotorError::empty();
        self.inverter_fraction = match inverter_max {
            _ if inverter_invalid => 0.0,
            Some(t) => derate(t, config.inverter_temp_limit_lower, config.inverter_temp_limit_upper),
            None => 1.0,
        };
        if inverter_invalid || inverter_max.is_some_and(|t| t >= config.inverter_temp_limit_upper) {
            faults |= MotorError::INVERTER_OVER_TEMP;
        }
        self.motor_fraction = match motor_max {
            _ if motor_invalid => 0.0,
            Some(t) => derate(t, config.motor_temp_limit_lower, config.motor_temp_limit_upper),
            None => 1.0,
        };
        if motor_invalid || motor_max.is_some_and(|t| t >= config.motor_temp_limit_upper) {
            faults |= MotorError::MOTOR_OVER_TEMP;
        }
        faults
    }

    /// Current bound imposed by temperature on `base` [A].
    #[inline]
    pub fn thermal_limit(&self, base: f32) -> f32 {
        base * self.inverter_fraction.min(self.motor_fraction)
    }
}

/// Filtered maximum over the present sensors, and whether any present
/// sensor returned a non-finite reading.
fn filter_max(
    filters: &mut [ExpFilter; 3],
    readings: &[Option<f32>; 3],
    tau: f32,
    dt: f32,
) -> (Option<f32>, bool) {
    let mut max: Option<f32> = None;
    let mut invalid = false;
    for (f, reading) in filters.iter_mut().zip(readings) {
        match *reading {
            Some(t) if t.is_finite() => {
                let filtered = f.update(t, tau, dt);
                max = Some(max.map_or(filtered, |m| m.max(filtered)));
            }
            Some(_) => invalid = true,
            None => {}
        }
    }
    (max, invalid)
}

/// Current limit in force this cycle:
/// `min(current_lim, max_allowed_current, thermal bounds)`.
#[inline]
pub fn effective_current_limit(
    config: &MotorConfig,
    max_allowed_current: f32,
    limiter: &ThermalLimiter,
) -> f32 {
    config
        .current_lim
        .min(max_allowed_current)
        .min(limiter.thermal_limit(config.current_lim))
        .max(0.0)
}

// ─── Tests ──────────────────────────────────────────────────────────
