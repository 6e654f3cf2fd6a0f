//! Values exchanged between the control core and the power stage.

use super::error::MotorError;

// ─── Timer ──────────────────────────────────────────────────────────

/// Edge of the center-aligned PWM carrier at which an update event fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Counter reached zero and starts counting up.
    Bottom,
    /// Counter reached the period and starts counting down.
    Top,
}

impl Edge {
    #[inline]
    pub const fn from_counting_down(counting_down: bool) -> Self {
        if counting_down { Self::Top } else { Self::Bottom }
    }
}

/// One timer update event as delivered by the power stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEvent {
    /// Counter direction after the update.
    pub counting_down: bool,
}

impl TimerEvent {
    #[inline]
    pub const fn edge(self) -> Edge {
        Edge::from_counting_down(self.counting_down)
    }
}

// ─── Phase Currents ─────────────────────────────────────────────────

/// Three phase quantities [A].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseCurrents {
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl PhaseCurrents {
    pub const ZERO: Self = Self {
        a: 0.0,
        b: 0.0,
        c: 0.0,
    };

    #[inline]
    pub const fn new(a: f32, b: f32, c: f32) -> Self {
        Self { a, b, c }
    }
}

/// Raw shunt readings as converted by the ADC, before offset removal.
///
/// Boards with two sensors leave `a` empty; the missing phase is
/// reconstructed from the other two.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawPhaseCurrents {
    pub a: Option<f32>,
    pub b: f32,
    pub c: f32,
    /// Any channel hit the amplifier rails.
    pub saturated: bool,
}

impl RawPhaseCurrents {
    /// Readings as an offset triple (DC calibration input).
    #[inline]
    pub fn as_offsets(&self) -> PhaseCurrents {
        PhaseCurrents::new(self.a.unwrap_or(0.0), self.b, self.c)
    }

    /// Remove the DC offsets and reconstruct the missing phase.
    pub fn into_sample(self, dc_offset: PhaseCurrents) -> PhaseCurrentSample {
        let b = self.b - dc_offset.b;
        let c = self.c - dc_offset.c;
        match self.a {
            Some(raw_a) => {
                let a = raw_a - dc_offset.a;
                PhaseCurrentSample {
                    currents: PhaseCurrents::new(a, b, c),
                    dc_offset,
                    three_sensors: true,
                    leak: a + b + c,
                    saturated: self.saturated,
                }
            }
            None => PhaseCurrentSample {
                currents: PhaseCurrents::new(-(b + c), b, c),
                dc_offset,
                three_sensors: false,
                leak: 0.0,
                saturated: self.saturated,
            },
        }
    }
}

/// Offset-corrected phase currents for one control cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseCurrentSample {
    pub currents: PhaseCurrents,
    /// Offsets that were subtracted.
    pub dc_offset: PhaseCurrents,
    pub three_sensors: bool,
    /// a + b + c; always zero with two sensors.
    pub leak: f32,
    pub saturated: bool,
}

/// Current sensing failure reported instead of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorFault {
    /// Conversion did not complete.
    AdcFailed,
    /// Sensor delivers no data.
    SensorDead,
    /// Sensor flagged an internal fault.
    Fault,
}

impl From<SensorFault> for MotorError {
    fn from(fault: SensorFault) -> Self {
        match fault {
            SensorFault::AdcFailed => MotorError::ADC_FAILED,
            SensorFault::SensorDead => MotorError::CURRENT_SENSOR_DEAD,
            SensorFault::Fault => MotorError::CURRENT_SENSOR,
        }
    }
}

// ─── Outputs ────────────────────────────────────────────────────────

/// Gate output requested for the next PWM update edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PwmOutput {
    /// All switches off.
    Floating,
    /// High-side on-time fractions for phases A, B, C.
    Timings([f32; 3]),
}

/// Latest thermistor readings [°C]. `None` marks a missing sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Temperatures {
    /// One sensor per inverter leg.
    pub inverter: [Option<f32>; 3],
    /// Up to three motor winding sensors.
    pub motor: [Option<f32>; 3],
}
