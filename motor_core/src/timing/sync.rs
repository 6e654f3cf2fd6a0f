//! Timer update-event bookkeeping.
//!
//! Each update event is classified by edge and checked for continuity (the
//! counting direction must alternate). A target period written by any
//! context is committed here, together with the inter-axis phase offset, so
//! the timer registers only ever change from the update handler.

use core::sync::atomic::{AtomicU32, Ordering};

use motor_common::consts::{MAX_TIMER_PERIOD, MIN_TIMER_PERIOD};
use motor_common::motor::config::MotorConfig;
use motor_common::motor::error::MotorError;
use motor_common::motor::types::{Edge, TimerEvent};

/// Work scheduled on one update event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateActions {
    /// Sample the phase currents and start a control cycle.
    pub sample: bool,
    /// Feed the DC offset calibration filter.
    pub dc_calib: bool,
    /// Write the latched timings to the compare registers.
    pub update_pwm: bool,
    /// New `(period, offset)` to program.
    pub period_commit: Option<(u32, u32)>,
}

#[derive(Debug, Clone, Default)]
pub struct TimerSync {
    started: bool,
    period: u32,
    sync_delay: u32,
    last_counting_down: Option<bool>,
    events: u64,
    half_cycles: u32,
}

impl TimerSync {
    pub fn new(sync_delay: u32) -> Self {
        Self {
            sync_delay,
            ..Default::default()
        }
    }

    /// Accept update events from now on.
    pub fn start(&mut self, period: u32) {
        self.started = true;
        self.period = period;
        self.last_counting_down = None;
        self.events = 0;
        // Sample on the first matching edge.
        self.half_cycles = u32::MAX;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Update events are arriving.
    pub fn is_running(&self) -> bool {
        self.started && self.events > 0
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn events(&self) -> u64 {
        self.events
    }

    /// Phase offset of this timer against the reference timer [ticks].
    pub fn offset(&self) -> u32 {
        if self.period == 0 {
            0
        } else {
            // Never larger than `sync_delay`, so it fits back into u32.
            (u64::from(self.sync_delay) % (2 * u64::from(self.period))) as u32
        }
    }

    /// Classify one update event.
    ///
    /// A missed event is reported as an error, but the event itself is still
    /// accounted so the next one is judged against it. A target period the
    /// timer cannot realize is rejected with `INVALID_FREQ_SETTING`.
    pub fn on_update(
        &mut self,
        event: TimerEvent,
        target_period: &AtomicU32,
        config: &MotorConfig,
    ) -> Result<UpdateActions, MotorError> {
        if !self.started {
            return Err(MotorError::UNEXPECTED_TIMER_CALLBACK);
        }
        let missed = self.last_counting_down == Some(event.counting_down);
        self.last_counting_down = Some(event.counting_down);
        self.events += 1;
        self.half_cycles = self.half_cycles.saturating_add(1);
        if missed {
            return Err(MotorError::TIMER_UPDATE_MISSED);
        }

        let edge = event.edge();
        let mut actions = UpdateActions::default();

        // Registers preload, so a new period takes effect from the next edge.
        if edge == Edge::Bottom {
            let target = target_period.load(Ordering::Acquire);
            if target != 0 && target != self.period {
                if !(MIN_TIMER_PERIOD..=MAX_TIMER_PERIOD).contains(&target) {
                    // Drop the request so it is reported once; the live period stays.
                    let _ = target_period.compare_exchange(
                        target,
                        0,
                        Ordering::AcqRel,
                        Ordering::Relaxed,
                    );
                    return Err(MotorError::INVALID_FREQ_SETTING);
                }
                self.period = target;
                actions.period_commit = Some((target, self.offset()));
            }
        }

        if config.current_sample_mode.matches(edge)
            && self.half_cycles >= config.control_frequency_divider
        {
            actions.sample = true;
            self.half_cycles = 0;
        }
        actions.dc_calib = config.current_dc_calib_mode.matches(edge);
        actions.update_pwm = config.pwm_update_mode.matches(edge);
        Ok(actions)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
