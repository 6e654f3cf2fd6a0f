//! Power-stage interface.
//!
//! The control core reaches the inverter, its sensors and its timer only
//! through [`MotorHardware`]. A board support package implements it on real
//! hardware; [`crate::sim::SimulatedDrive`] implements it against a motor
//! model.
//!
//! # Event Model
//!
//! The timer fires one update event per half PWM period. On hardware the
//! event is an interrupt; here the owner of the [`crate::motor::Motor`]
//! pumps [`MotorHardware::wait_timer_event`] and hands each event to
//! `on_timer_update`.
//!
//! # Timing Contracts
//!
//! | Operation               | Context     | Constraint               |
//! |-------------------------|-------------|--------------------------|
//! | `start_timer()`         | background  | once, before arming      |
//! | `wait_timer_event()`    | timer       | one half PWM period      |
//! | `sample_phase_currents` | timer       | **HARD**, no blocking    |
//! | `apply_pwm()`           | timer       | **HARD**, no blocking    |
//! | `write_period()`        | timer       | preloaded, next edge     |

use motor_common::motor::types::{PwmOutput, RawPhaseCurrents, SensorFault, Temperatures, TimerEvent};

pub trait MotorHardware {
    /// Timer input clock [Hz].
    fn timer_frequency(&self) -> f32;

    /// Start the center-aligned carrier with `period` ticks per half period,
    /// shifted by `offset` ticks against the reference timer.
    fn start_timer(&mut self, period: u32, offset: u32);

    /// Program a new period and offset, effective from the next update.
    fn write_period(&mut self, period: u32, offset: u32);

    /// Block until the next update event. `None` when the timer is stopped.
    fn wait_timer_event(&mut self) -> Option<TimerEvent>;

    /// Configure the current-sense amplifiers for at least `requested` A.
    ///
    /// Returns the range actually available [A].
    fn set_current_range(&mut self, requested: f32) -> f32;

    /// Raw phase currents converted at the last update event.
    fn sample_phase_currents(&mut self) -> Result<RawPhaseCurrents, SensorFault>;

    /// DC bus voltage [V]. `None` when the sensor delivers nothing.
    fn read_bus_voltage(&mut self) -> Option<f32>;

    fn read_temperatures(&mut self) -> Temperatures;

    /// Gate driver reports a fault.
    fn gate_driver_fault(&mut self) -> bool;

    /// Set the gate outputs from the next PWM update edge.
    fn apply_pwm(&mut self, output: PwmOutput);

    /// Free-running tick counter (timer clock).
    fn ticks(&self) -> u32;

    /// Free-running microsecond clock.
    fn now_us(&self) -> u32;
}
