//! Sticky motor fault bitmask.
//!
//! Faults are state, not control flow: every detector ORs its bit into the
//! motor's error word and the arm/disarm logic reacts to the word as a whole.
//! Bits stay set until acknowledged while disarmed.

use bitflags::bitflags;
use static_assertions::const_assert_eq;
use std::fmt;

bitflags! {
    /// Motor fault flags.
    ///
    /// HARD flags (→ refuse re-arm until cleared): ADC_FAILED, DRV_FAULT,
    /// CONTROL_DEADLINE_MISSED, CURRENT_SENSOR_DEAD, V_BUS_SENSOR_DEAD.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MotorError: u32 {
        /// Measured phase resistance outside the plausible range.
        const PHASE_RESISTANCE_OUT_OF_RANGE = 0x0000_0001;
        /// Measured phase inductance outside the plausible range.
        const PHASE_INDUCTANCE_OUT_OF_RANGE = 0x0000_0002;
        /// Current ADC conversion failed. **HARD**.
        const ADC_FAILED                    = 0x0000_0004;
        /// Gate driver reported a fault. **HARD**.
        const DRV_FAULT                     = 0x0000_0008;
        /// Control loop did not finish before the next cycle. **HARD**.
        const CONTROL_DEADLINE_MISSED       = 0x0000_0010;
        /// Motor type has no control law.
        const NOT_IMPLEMENTED_MOTOR_TYPE    = 0x0000_0020;
        /// Brake current outside the allowed range.
        const BRAKE_CURRENT_OUT_OF_RANGE    = 0x0000_0040;
        /// Requested voltage vector cannot be realized by the bus.
        const MODULATION_MAGNITUDE          = 0x0000_0080;
        /// Brake resistor dead-time violated.
        const BRAKE_DEADTIME_VIOLATION      = 0x0000_0100;
        /// Timer update event arrived before updates were started.
        const UNEXPECTED_TIMER_CALLBACK     = 0x0000_0200;
        /// Current sensor reported saturation.
        const CURRENT_SENSE_SATURATION      = 0x0000_0400;
        /// Inverter temperature reached the upper limit.
        const INVERTER_OVER_TEMP            = 0x0000_0800;
        /// Current sensor reported a fault.
        const CURRENT_SENSOR                = 0x0000_1000;
        /// Brake resistor not armed.
        const BRAKE_RESISTOR_DISARMED       = 0x0000_2000;
        /// FOC requested on an uncalibrated motor.
        const NOT_CALIBRATED                = 0x0000_4000;
        /// Current sensor produces no data. **HARD**.
        const CURRENT_SENSOR_DEAD           = 0x0000_8000;
        /// Bus voltage sensor produces no data. **HARD**.
        const V_BUS_SENSOR_DEAD             = 0x0001_0000;
        /// Current measurement too noisy to calibrate.
        const TOO_NOISY                     = 0x0002_0000;
        /// Estimated DC bus current outside the hard limits.
        const I_BUS_OUT_OF_RANGE            = 0x0004_0000;
        /// Timer counting direction did not alternate between updates.
        const TIMER_UPDATE_MISSED           = 0x0008_0000;
        /// Controller signalled an internal failure.
        const CONTROLLER_FAILED             = 0x0010_0000;
        /// Bus voltage below the under-voltage trip level.
        const DC_BUS_UNDER_VOLTAGE          = 0x0020_0000;
        /// Bus voltage above the over-voltage trip level.
        const DC_BUS_OVER_VOLTAGE           = 0x0040_0000;
        /// Arm request refused.
        const FAILED_TO_ARM                 = 0x0080_0000;
        /// FOC law produced no output in time.
        const FOC_TIMEOUT                   = 0x0100_0000;
        /// Sum of the three phase currents above the leak limit.
        const LEAK_CURRENT_TOO_HIGH         = 0x0200_0000;
        /// Motor temperature reached the upper limit.
        const MOTOR_OVER_TEMP               = 0x0400_0000;
        /// Switching frequency / divider combination not realizable.
        const INVALID_FREQ_SETTING          = 0x0800_0000;
        /// FOC setpoint was not refreshed before it expired.
        const FOC_CMD_TIMEOUT               = 0x1000_0000;
    }
}

const_assert_eq!(core::mem::size_of::<MotorError>(), 4);

impl MotorError {
    /// Mask of all HARD flags (hardware or schedule broken).
    pub const HARD_MASK: Self = Self::from_bits_truncate(
        Self::ADC_FAILED.bits()
            | Self::DRV_FAULT.bits()
            | Self::CONTROL_DEADLINE_MISSED.bits()
            | Self::CURRENT_SENSOR_DEAD.bits()
            | Self::V_BUS_SENSOR_DEAD.bits(),
    );

    /// Flags that are recorded without disarming. Currently none.
    pub const BENIGN_MASK: Self = Self::empty();

    /// Returns true if any HARD flag is set.
    #[inline]
    pub const fn has_hard(self) -> bool {
        self.intersects(Self::HARD_MASK)
    }

    /// Returns true if raising these flags must disarm the motor.
    #[inline]
    pub const fn requires_disarm(self) -> bool {
        !self.difference(Self::BENIGN_MASK).is_empty()
    }
}

impl Default for MotorError {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for MotorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        for (i, (name, _)) in self.iter_names().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}

impl std::error::Error for MotorError {}

// ─── Tests ──────────────────────────────────────────────────────────
