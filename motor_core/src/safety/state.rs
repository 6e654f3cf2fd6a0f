//! Shared arm/error/calibration state.
//!
//! Read and written from both the timer context and the background context
//! without locks:
//!
//! - `law`: 0 = disarmed, otherwise the [`LawKind`] tag of the armed law.
//!   Armed flag and law live in one byte, so no reader can observe an armed
//!   motor without a law or a law without the armed flag.
//! - `errors`: sticky bitmask, only ever OR-ed into except by
//!   [`SafetyState::clear_errors`] while disarmed.
//! - `calibrated`: electrical parameters are valid for FOC.

use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

use motor_common::motor::error::MotorError;
use static_assertions::assert_impl_all;

use crate::control::law::LawKind;

const DISARMED: u8 = 0;

/// Observable arm state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmState {
    Disarmed { calibrated: bool },
    Armed(LawKind),
}

#[derive(Debug)]
pub struct SafetyState {
    law: AtomicU8,
    calibrated: AtomicBool,
    errors: AtomicU32,
}

assert_impl_all!(SafetyState: Send, Sync);

impl SafetyState {
    /// Disarmed, no faults.
    pub const fn new(calibrated: bool) -> Self {
        Self {
            law: AtomicU8::new(DISARMED),
            calibrated: AtomicBool::new(calibrated),
            errors: AtomicU32::new(0),
        }
    }

    pub fn state(&self) -> ArmState {
        match self.armed_law() {
            Some(law) => ArmState::Armed(law),
            None => ArmState::Disarmed {
                calibrated: self.is_calibrated(),
            },
        }
    }

    #[inline]
    pub fn armed_law(&self) -> Option<LawKind> {
        LawKind::from_u8(self.law.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.law.load(Ordering::Acquire) != DISARMED
    }

    /// Publish `law` as armed. Fails if already armed.
    ///
    /// The law's context must be fully installed before this is called.
    pub fn publish_armed(&self, law: LawKind) -> bool {
        self.law
            .compare_exchange(DISARMED, law as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Clear law and armed flag in one step. Returns whether it was armed.
    pub fn disarm(&self) -> bool {
        self.law.swap(DISARMED, Ordering::AcqRel) != DISARMED
    }

    /// OR `error` into the bitmask and disarm unless every flag is benign.
    ///
    /// Returns whether the call disarmed an armed motor.
    pub fn raise(&self, error: MotorError) -> bool {
        self.errors.fetch_or(error.bits(), Ordering::AcqRel);
        if error.requires_disarm() {
            self.disarm()
        } else {
            false
        }
    }

    #[inline]
    pub fn errors(&self) -> MotorError {
        MotorError::from_bits_retain(self.errors.load(Ordering::Acquire))
    }

    /// Acknowledge all faults. Refused while armed.
    pub fn clear_errors(&self) -> bool {
        if self.is_armed() {
            return false;
        }
        self.errors.store(0, Ordering::Release);
        true
    }

    #[inline]
    pub fn is_calibrated(&self) -> bool {
        self.calibrated.load(Ordering::Acquire)
    }

    pub fn set_calibrated(&self, calibrated: bool) {
        self.calibrated.store(calibrated, Ordering::Release);
    }
}

impl Default for SafetyState {
    fn default() -> Self {
        Self::new(false)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
