//! Defaults and calibration constants shared by the motor crates.

// ─── PWM / Timer ────────────────────────────────────────────────────

/// Default PWM switching frequency [Hz].
pub const DEFAULT_SWITCHING_FREQUENCY_HZ: f32 = 24_000.0;

/// Default number of timer update events (half PWM periods) per control cycle.
pub const DEFAULT_CONTROL_FREQUENCY_DIVIDER: u32 = 2;

/// Smallest timer auto-reload value accepted for a PWM half period.
pub const MIN_TIMER_PERIOD: u32 = 128;

/// Largest timer auto-reload value (16-bit timer).
pub const MAX_TIMER_PERIOD: u32 = u16::MAX as u32;

// ─── Current Control ────────────────────────────────────────────────

/// Default FOC command expiry [µs].
pub const DEFAULT_CMD_TIMEOUT_US: u32 = 5_000;

/// Largest modulation vector magnitude inside the linear SVM range
/// (80 % of √3/2).
pub const LINEAR_MODULATION_LIMIT: f32 = 0.8 * 0.866_025_4;

/// Integrator decay applied per cycle while the modulation vector is clamped.
pub const INTEGRATOR_DECAY: f32 = 0.99;

// ─── Calibration ────────────────────────────────────────────────────

/// Duration of the DC resistance measurement [s].
pub const RESISTANCE_CALIB_DURATION_S: f32 = 3.0;

/// Integral gain of the resistance measurement voltage ramp [(V/s)/A].
pub const RESISTANCE_CALIB_KI: f32 = 10.0;

/// Duration of the inductance square-wave excitation [s].
pub const INDUCTANCE_CALIB_DURATION_S: f32 = 0.25;

/// Control cycles each square-wave polarity is held.
pub const INDUCTANCE_CALIB_HOLD_CYCLES: u32 = 2;

/// Lowest plausible phase inductance [H].
pub const INDUCTANCE_MIN_H: f32 = 2e-6;

/// Highest plausible phase inductance [H].
pub const INDUCTANCE_MAX_H: f32 = 4000e-6;

/// Duration of the induction-motor rotor identification step [s].
pub const ROTOR_CALIB_DURATION_S: f32 = 1.0;

// ─── PWM Test ───────────────────────────────────────────────────────

/// Modulation magnitude of the rotating PWM test vector.
pub const PWM_TEST_MODULATION: f32 = 0.2;

/// Rotation frequency of the PWM test vector [Hz].
pub const PWM_TEST_FREQUENCY_HZ: f32 = 2.0;
