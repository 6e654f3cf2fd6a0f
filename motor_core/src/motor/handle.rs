//! Background-context view of a motor.
//!
//! Only touches the atomics in [`Shared`]. A disarm through the handle takes
//! effect at the next PWM update edge, where the timer context sees the
//! cleared armed word and floats the outputs.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use motor_common::motor::error::MotorError;
use static_assertions::assert_impl_all;
use tracing::{info, warn};

use super::Shared;
use crate::control::law::LawKind;
use crate::safety::state::ArmState;

#[derive(Debug, Clone)]
pub struct MotorHandle {
    shared: Arc<Shared>,
}

assert_impl_all!(MotorHandle: Send, Sync);

impl MotorHandle {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    pub fn state(&self) -> ArmState {
        self.shared.safety.state()
    }

    pub fn is_armed(&self) -> bool {
        self.shared.safety.is_armed()
    }

    pub fn armed_law(&self) -> Option<LawKind> {
        self.shared.safety.armed_law()
    }

    pub fn is_calibrated(&self) -> bool {
        self.shared.safety.is_calibrated()
    }

    pub fn error(&self) -> MotorError {
        self.shared.safety.errors()
    }

    /// Returns whether the motor was armed.
    pub fn disarm(&self) -> bool {
        let was_armed = self.shared.safety.disarm();
        if was_armed {
            info!("Disarm requested");
        }
        was_armed
    }

    /// Latch `error`; disarms unless benign.
    pub fn set_error(&self, error: MotorError) {
        let new = error.difference(self.error());
        self.shared.safety.raise(error);
        if !new.is_empty() {
            warn!("Motor fault latched: {}", new);
        }
    }

    /// Acknowledge all faults. Refused while armed.
    pub fn clear_errors(&self) -> bool {
        self.shared.safety.clear_errors()
    }

    /// Request a timer period, committed at the next Bottom update.
    pub fn set_target_period(&self, period: u32) {
        self.shared.target_period.store(period, Ordering::Release);
    }

    pub fn target_period(&self) -> u32 {
        self.shared.target_period.load(Ordering::Acquire)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
