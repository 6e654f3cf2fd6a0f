//! Simulated power stage.
//!
//! [`SimulatedDrive`] implements [`MotorHardware`] against a locked-rotor
//! motor model, advancing the plant by one half PWM period per update
//! event:
//!
//! - PMSM: `L·di/dt = v − R·i` per stationary axis, solved exactly.
//! - Induction motor (inverse-Γ model, `rotor` set):
//!   `Lσ·di/dt = v − Rs·i − RR·(i − ψ/LM)`, `dψ/dt = RR·(i − ψ/LM)`,
//!   integrated with midpoint substeps.
//!
//! With floating outputs the current collapses to zero and only the rotor
//! flux decays. The shunts read the bare DC offset on Top updates, where the
//! zero vector is active, and current plus offset on Bottom updates.

use motor_common::motor::types::{
    Edge, PhaseCurrents, PwmOutput, RawPhaseCurrents, SensorFault, Temperatures, TimerEvent,
};
use serde::{Deserialize, Serialize};

use crate::control::transforms::{clarke, inverse_clarke};
use crate::hal::MotorHardware;

const RK_SUBSTEPS: usize = 8;

/// Induction-motor rotor branch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotorParams {
    /// Magnetizing inductance LM [H].
    pub magnetizing_inductance: f32,
    /// Referred rotor resistance RR [Ω].
    pub rotor_resistance: f32,
}

/// Simulated motor and inverter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantParams {
    /// Timer input clock [Hz].
    pub timer_frequency: f32,
    /// Largest range the sense amplifiers support [A].
    pub max_current_range: f32,
    pub bus_voltage: f32,
    /// Stator resistance [Ω].
    pub phase_resistance: f32,
    /// Phase inductance; transient inductance Lσ for induction motors [H].
    pub phase_inductance: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotor: Option<RotorParams>,
    /// Shunt offsets for phases A, B, C [A].
    pub dc_offset: [f32; 3],
    /// Phase A has a shunt.
    pub three_sensors: bool,
    /// Inverter leg temperature [°C].
    pub inverter_temperature: f32,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            timer_frequency: 144e6,
            max_current_range: 60.0,
            bus_voltage: 24.0,
            phase_resistance: 0.1,
            phase_inductance: 50e-6,
            rotor: None,
            dc_offset: [0.02, -0.015, 0.01],
            three_sensors: true,
            inverter_temperature: 25.0,
        }
    }
}

impl PlantParams {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.timer_frequency > 0.0) {
            return Err("timer_frequency must be > 0".to_string());
        }
        if !(self.phase_resistance > 0.0 && self.phase_inductance > 0.0) {
            return Err("phase_resistance and phase_inductance must be > 0".to_string());
        }
        if let Some(rotor) = self.rotor {
            if !(rotor.magnetizing_inductance > 0.0 && rotor.rotor_resistance > 0.0) {
                return Err("rotor parameters must be > 0".to_string());
            }
        }
        Ok(())
    }
}

/// Locked-rotor drive simulation with fault injection.
#[derive(Debug, Clone)]
pub struct SimulatedDrive {
    params: PlantParams,
    // Plant state, stationary frame.
    i: [f64; 2],
    psi: [f64; 2],
    output: PwmOutput,
    // Timer state.
    running: bool,
    period: u32,
    pending_period: Option<u32>,
    offset: u32,
    counting_down: bool,
    last_edge: Edge,
    time_s: f64,
    events: u64,
    // Sensors and injected faults.
    current_range: f32,
    bus_voltage: Option<f32>,
    temperatures: Temperatures,
    drv_fault: bool,
    sensor_fault: Option<SensorFault>,
    leak: f32,
    skip_next_event: bool,
    clock_offset_us: u32,
}

impl SimulatedDrive {
    pub fn new(params: PlantParams) -> Self {
        let t = params.inverter_temperature;
        Self {
            bus_voltage: Some(params.bus_voltage),
            temperatures: Temperatures {
                inverter: [Some(t); 3],
                motor: [None; 3],
            },
            current_range: params.max_current_range,
            params,
            i: [0.0; 2],
            psi: [0.0; 2],
            output: PwmOutput::Floating,
            running: false,
            period: 0,
            pending_period: None,
            offset: 0,
            counting_down: false,
            last_edge: Edge::Bottom,
            time_s: 0.0,
            events: 0,
            drv_fault: false,
            sensor_fault: None,
            leak: 0.0,
            skip_next_event: false,
            clock_offset_us: 0,
        }
    }

    pub fn params(&self) -> &PlantParams {
        &self.params
    }

    // ─── Observation ────────────────────────────────────────────────

    /// True stationary-frame current [A].
    pub fn current(&self) -> (f32, f32) {
        (self.i[0] as f32, self.i[1] as f32)
    }

    /// Rotor flux, induction motors [Wb].
    pub fn rotor_flux(&self) -> (f32, f32) {
        (self.psi[0] as f32, self.psi[1] as f32)
    }

    /// Gate output currently applied.
    pub fn output(&self) -> PwmOutput {
        self.output
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn events(&self) -> u64 {
        self.events
    }

    pub fn elapsed_s(&self) -> f64 {
        self.time_s
    }

    // ─── Fault Injection ────────────────────────────────────────────

    /// `None` makes the bus voltage sensor dead.
    pub fn set_bus_voltage(&mut self, v: Option<f32>) {
        self.bus_voltage = v;
    }

    pub fn set_temperatures(&mut self, temps: Temperatures) {
        self.temperatures = temps;
    }

    pub fn set_gate_driver_fault(&mut self, fault: bool) {
        self.drv_fault = fault;
    }

    pub fn set_sensor_fault(&mut self, fault: Option<SensorFault>) {
        self.sensor_fault = fault;
    }

    /// Extra current reported on phase A outside the zero vector [A].
    pub fn set_leak_current(&mut self, leak: f32) {
        self.leak = leak;
    }

    /// Lose the next update event.
    pub fn skip_event(&mut self) {
        self.skip_next_event = true;
    }

    /// Advance the microsecond clock without running the timer.
    pub fn advance_clock_us(&mut self, us: u32) {
        self.clock_offset_us = self.clock_offset_us.wrapping_add(us);
    }

    pub fn stop_timer(&mut self) {
        self.running = false;
    }

    // ─── Plant ──────────────────────────────────────────────────────

    fn applied_voltage(&self) -> Option<(f64, f64)> {
        match self.output {
            PwmOutput::Floating => None,
            PwmOutput::Timings([a, b, c]) => {
                let v = self.params.bus_voltage;
                let (alpha, beta) = clarke(PhaseCurrents::new(a * v, b * v, c * v));
                Some((f64::from(alpha), f64::from(beta)))
            }
        }
    }

    fn advance_plant(&mut self, h: f64) {
        let r = f64::from(self.params.phase_resistance);
        let l = f64::from(self.params.phase_inductance);
        let Some((v_alpha, v_beta)) = self.applied_voltage() else {
            self.i = [0.0; 2];
            if let Some(rotor) = self.params.rotor {
                let decay =
                    (-f64::from(rotor.rotor_resistance) / f64::from(rotor.magnetizing_inductance) * h)
                        .exp();
                self.psi = [self.psi[0] * decay, self.psi[1] * decay];
            }
            return;
        };
        let v = [v_alpha, v_beta];

        match self.params.rotor {
            None => {
                let decay = (-r / l * h).exp();
                for axis in 0..2 {
                    let steady = v[axis] / r;
                    self.i[axis] = steady + (self.i[axis] - steady) * decay;
                }
            }
            Some(rotor) => {
                let lm = f64::from(rotor.magnetizing_inductance);
                let rr = f64::from(rotor.rotor_resistance);
                let step = h / RK_SUBSTEPS as f64;
                let di = |v: f64, i: f64, psi: f64| (v - r * i - rr * (i - psi / lm)) / l;
                let dpsi = |i: f64, psi: f64| rr * (i - psi / lm);
                for axis in 0..2 {
                    let (mut i, mut psi) = (self.i[axis], self.psi[axis]);
                    for _ in 0..RK_SUBSTEPS {
                        let mid_i = i + 0.5 * step * di(v[axis], i, psi);
                        let mid_psi = psi + 0.5 * step * dpsi(i, psi);
                        i += step * di(v[axis], mid_i, mid_psi);
                        psi += step * dpsi(mid_i, mid_psi);
                    }
                    self.i[axis] = i;
                    self.psi[axis] = psi;
                }
            }
        }
    }

    fn half_period_s(&self) -> f64 {
        f64::from(self.period) / f64::from(self.params.timer_frequency)
    }
}

impl MotorHardware for SimulatedDrive {
    fn timer_frequency(&self) -> f32 {
        self.params.timer_frequency
    }

    fn start_timer(&mut self, period: u32, offset: u32) {
        self.period = period;
        self.offset = offset;
        self.running = true;
        self.counting_down = false;
    }

    fn write_period(&mut self, period: u32, offset: u32) {
        self.pending_period = Some(period);
        self.offset = offset;
    }

    fn wait_timer_event(&mut self) -> Option<TimerEvent> {
        if !self.running {
            return None;
        }
        let skips = if self.skip_next_event { 2 } else { 1 };
        self.skip_next_event = false;
        for _ in 0..skips {
            let h = self.half_period_s();
            self.advance_plant(h);
            self.time_s += h;
            self.counting_down = !self.counting_down;
            if let Some(p) = self.pending_period.take() {
                self.period = p;
            }
        }
        self.events += 1;
        let event = TimerEvent {
            counting_down: self.counting_down,
        };
        self.last_edge = event.edge();
        Some(event)
    }

    fn set_current_range(&mut self, requested: f32) -> f32 {
        self.current_range = requested.min(self.params.max_current_range);
        self.current_range
    }

    fn sample_phase_currents(&mut self) -> Result<RawPhaseCurrents, SensorFault> {
        if let Some(fault) = self.sensor_fault {
            return Err(fault);
        }
        let [oa, ob, oc] = self.params.dc_offset;
        let (p, leak) = if self.last_edge == Edge::Top {
            (PhaseCurrents::ZERO, 0.0)
        } else {
            (inverse_clarke(self.i[0] as f32, self.i[1] as f32), self.leak)
        };
        let a = p.a + leak;
        let range = self.current_range;
        let saturated = [a, p.b, p.c].iter().any(|x| x.abs() > range);
        Ok(RawPhaseCurrents {
            a: self.params.three_sensors.then_some(a + oa),
            b: p.b + ob,
            c: p.c + oc,
            saturated,
        })
    }

    fn read_bus_voltage(&mut self) -> Option<f32> {
        self.bus_voltage
    }

    fn read_temperatures(&mut self) -> Temperatures {
        self.temperatures
    }

    fn gate_driver_fault(&mut self) -> bool {
        self.drv_fault
    }

    fn apply_pwm(&mut self, output: PwmOutput) {
        self.output = output;
    }

    fn ticks(&self) -> u32 {
        (self.time_s * f64::from(self.params.timer_frequency)) as u64 as u32
    }

    fn now_us(&self) -> u32 {
        ((self.time_s * 1e6) as u64 as u32).wrapping_add(self.clock_offset_us)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
