//! Arm guard evaluation.
//!
//! Pure decision over a snapshot of the motor: whether a law may take over
//! the outputs, and which flags to raise when it may not. Publishing the
//! armed word is left to the caller.

use motor_common::motor::error::MotorError;

use crate::control::law::{ControlLaw, LawKind};

/// Snapshot evaluated by [`evaluate_arm`].
#[derive(Debug, Clone, Copy)]
pub struct ArmRequest {
    pub law: ControlLaw,
    pub already_armed: bool,
    pub errors: MotorError,
    /// Timer update events are being processed.
    pub timer_running: bool,
    pub calibrated: bool,
}

/// Outcome of an arm request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmDecision {
    Accept,
    /// Refused; `raise` is OR-ed into the error word (may be empty).
    Reject {
        raise: MotorError,
        reason: &'static str,
    },
}

pub fn evaluate_arm(req: &ArmRequest) -> ArmDecision {
    if req.already_armed {
        // The running law keeps the outputs; nothing is latched.
        return ArmDecision::Reject {
            raise: MotorError::empty(),
            reason: "already armed",
        };
    }
    if !req.errors.is_empty() {
        return ArmDecision::Reject {
            raise: MotorError::FAILED_TO_ARM,
            reason: "errors pending",
        };
    }
    if !req.timer_running {
        return ArmDecision::Reject {
            raise: MotorError::FAILED_TO_ARM,
            reason: "timer not producing update events",
        };
    }
    if !req.law.parameters_valid() {
        return ArmDecision::Reject {
            raise: MotorError::FAILED_TO_ARM,
            reason: "invalid law parameters",
        };
    }
    if req.law.kind() == LawKind::Foc && !req.calibrated {
        return ArmDecision::Reject {
            raise: MotorError::NOT_CALIBRATED | MotorError::FAILED_TO_ARM,
            reason: "motor not calibrated",
        };
    }
    ArmDecision::Accept
}

// ─── Tests ──────────────────────────────────────────────────────────
