//! Timer period derivation.
//!
//! The carrier is center aligned: one PWM period is two timer update events
//! (Bottom and Top), each `period` timer ticks apart.
//!
//! ```text
//! period     = round(timer_freq / (2 · f_sw))
//! control_dt = divider · period / timer_freq
//! ```

use motor_common::consts::{MAX_TIMER_PERIOD, MIN_TIMER_PERIOD};
use motor_common::motor::config::{MotorConfig, UpdateMode};
use motor_common::motor::error::MotorError;

/// Derived timer settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PwmTiming {
    /// Timer ticks per half PWM period.
    pub period: u32,
    /// Control cycle period [s].
    pub control_dt: f32,
}

/// Validate the frequency settings of `config` against a timer running at
/// `timer_frequency` Hz.
pub fn derive_timing(timer_frequency: f32, config: &MotorConfig) -> Result<PwmTiming, MotorError> {
    let f_sw = config.switching_frequency;
    let divider = config.control_frequency_divider;
    if !(f_sw.is_finite() && f_sw > 0.0) || !(timer_frequency > 0.0) {
        return Err(MotorError::INVALID_FREQ_SETTING);
    }
    if divider == 0 || config.current_sample_mode == UpdateMode::None {
        return Err(MotorError::INVALID_FREQ_SETTING);
    }
    // A single sampling edge only comes round every other update event.
    if config.current_sample_mode.is_single_edge() && divider % 2 != 0 {
        return Err(MotorError::INVALID_FREQ_SETTING);
    }

    let period = (f64::from(timer_frequency) / (2.0 * f64::from(f_sw))).round();
    if !(f64::from(MIN_TIMER_PERIOD)..=f64::from(MAX_TIMER_PERIOD)).contains(&period) {
        return Err(MotorError::INVALID_FREQ_SETTING);
    }
    let period = period as u32;
    Ok(PwmTiming {
        period,
        control_dt: (f64::from(divider) * f64::from(period) / f64::from(timer_frequency)) as f32,
    })
}

// ─── Tests ──────────────────────────────────────────────────────────
