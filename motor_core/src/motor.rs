//! Per-axis motor.
//!
//! [`Motor`] owns the hardware handle and everything the timer context
//! mutates: controller state, timer bookkeeping, timing log, thermal state
//! and the installed control law. The pieces the background context may
//! touch concurrently (arm/law word, error word, calibrated flag, target
//! period) live in [`Shared`], reachable through a cloneable
//! [`handle::MotorHandle`].
//!
//! ## Cycle
//!
//! ```text
//! update event ─┬─ period commit (Bottom)
//!               ├─ PWM edge:    write latched timings (Floating if disarmed)
//!               ├─ DC edge:     feed offset filter
//!               └─ sample edge: begin cycle, sample currents
//! control_loop ── bus/thermal/sensor checks → law step → latch timings → CtrlDone
//! ```
//!
//! Timings computed in one cycle are written at the next PWM edge, half a
//! period after the sample they were computed from.

pub mod handle;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use motor_common::consts::DEFAULT_CMD_TIMEOUT_US;
use motor_common::motor::config::{MotorConfig, MotorType};
use motor_common::motor::error::MotorError;
use motor_common::motor::types::{PhaseCurrentSample, PhaseCurrents, PwmOutput, TimerEvent};
use tracing::{debug, error, info, warn};

use crate::calibration::engine::{CalibrationEngine, CalibrationResult, EngineStep};
use crate::control::filters::{ExpFilter, ExpFilter3};
use crate::control::foc::CurrentControl;
use crate::control::law::{ControlLaw, LawInputs, LawKind, LawOutcome, LawState, LawStep};
use crate::control::pi::CurrentGains;
use crate::hal::MotorHardware;
use crate::limiter::{self, ThermalLimiter};
use crate::safety::arm::{ArmDecision, ArmRequest, evaluate_arm};
use crate::safety::state::SafetyState;
use crate::timing::log::{Checkpoint, TimingLog};
use crate::timing::period::derive_timing;
use crate::timing::sync::TimerSync;

use handle::MotorHandle;

/// Cross-context state of one axis.
#[derive(Debug, Default)]
pub struct Shared {
    pub safety: SafetyState,
    /// Period requested for the next commit; 0 = none.
    pub target_period: AtomicU32,
}

/// Setpoint written by `foc_update`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocCommand {
    pub id: f32,
    pub iq: f32,
    /// Voltage command in voltage mode, feedforward in current mode [V].
    pub vd: f32,
    pub vq: f32,
    /// Electrical angle at the time of the command [rad].
    pub phase: f32,
    /// Electrical velocity [rad/s].
    pub phase_vel: f32,
    pub voltage_mode: bool,
    /// Time after which the setpoint counts as stale [µs].
    pub expiry_us: u32,
}

impl Default for FocCommand {
    fn default() -> Self {
        Self {
            id: 0.0,
            iq: 0.0,
            vd: 0.0,
            vq: 0.0,
            phase: 0.0,
            phase_vel: 0.0,
            voltage_mode: false,
            expiry_us: DEFAULT_CMD_TIMEOUT_US,
        }
    }
}

impl FocCommand {
    pub fn current(id: f32, iq: f32, phase: f32, phase_vel: f32) -> Self {
        Self {
            id,
            iq,
            phase,
            phase_vel,
            ..Default::default()
        }
    }

    pub fn voltage(vd: f32, vq: f32, phase: f32, phase_vel: f32) -> Self {
        Self {
            vd,
            vq,
            phase,
            phase_vel,
            voltage_mode: true,
            ..Default::default()
        }
    }

    pub fn with_expiry(mut self, expiry_us: u32) -> Self {
        self.expiry_us = expiry_us;
        self
    }
}

/// Progress of a calibration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStatus {
    Running,
    Done,
}

pub struct Motor<H: MotorHardware> {
    hw: H,
    config: MotorConfig,
    shared: Arc<Shared>,
    cc: CurrentControl,
    sync: TimerSync,
    timing: TimingLog,
    limiter: ThermalLimiter,
    dc_offset: ExpFilter3,
    vbus: ExpFilter,
    pending_sample: Option<Result<PhaseCurrentSample, MotorError>>,
    law: LawState,
    latched: Option<[f32; 3]>,
    outcome: Option<LawOutcome>,
    calibration: Option<CalibrationEngine>,
    timer_frequency: f32,
    timer_sync_delay: u32,
}

impl<H: MotorHardware> Motor<H> {
    pub fn new(hw: H, config: MotorConfig) -> Self {
        let shared = Arc::new(Shared {
            safety: SafetyState::new(config.pre_calibrated),
            target_period: AtomicU32::new(0),
        });
        let timer_frequency = hw.timer_frequency();
        let mut motor = Self {
            hw,
            config,
            shared,
            cc: CurrentControl::new(),
            sync: TimerSync::new(0),
            timing: TimingLog::new(),
            limiter: ThermalLimiter::new(),
            dc_offset: ExpFilter3::default(),
            vbus: ExpFilter::new(),
            pending_sample: None,
            law: LawState::Idle,
            latched: None,
            outcome: None,
            calibration: None,
            timer_frequency,
            timer_sync_delay: 0,
        };
        motor.update_current_controller_gains();
        motor
    }

    /// Delay of this axis' timer against the reference timer [ticks].
    pub fn with_timer_sync_delay(mut self, delay: u32) -> Self {
        self.timer_sync_delay = delay;
        self
    }

    /// Configure the sense amplifiers and start the PWM timer.
    ///
    /// Outputs stay floating until a law is armed.
    pub fn init(&mut self) -> Result<(), MotorError> {
        let timing = match derive_timing(self.timer_frequency, &self.config) {
            Ok(t) => t,
            Err(e) => {
                self.set_error(e);
                return Err(e);
            }
        };
        self.cc.max_allowed_current = self
            .hw
            .set_current_range(self.config.requested_current_range);
        self.update_current_controller_gains();

        self.hw.apply_pwm(PwmOutput::Floating);
        self.sync = TimerSync::new(self.timer_sync_delay);
        self.sync.start(timing.period);
        self.hw.start_timer(timing.period, self.sync.offset());
        info!(
            "Motor initialized: period {} ticks, control dt {:.2} µs, current range {:.1} A",
            timing.period,
            timing.control_dt * 1e6,
            self.cc.max_allowed_current
        );
        Ok(())
    }

    // ─── Accessors ──────────────────────────────────────────────────

    pub fn handle(&self) -> MotorHandle {
        MotorHandle::new(Arc::clone(&self.shared))
    }

    pub fn config(&self) -> &MotorConfig {
        &self.config
    }

    /// Mutable configuration; `None` while armed.
    ///
    /// Call [`Motor::apply_config`] after changing electrical or frequency
    /// parameters.
    pub fn config_mut(&mut self) -> Option<&mut MotorConfig> {
        if self.is_armed() {
            None
        } else {
            Some(&mut self.config)
        }
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    pub fn current_control(&self) -> &CurrentControl {
        &self.cc
    }

    pub(crate) fn current_control_mut(&mut self) -> &mut CurrentControl {
        &mut self.cc
    }

    pub fn timing_log(&self) -> &TimingLog {
        &self.timing
    }

    pub fn timer_sync(&self) -> &TimerSync {
        &self.sync
    }

    pub fn limiter(&self) -> &ThermalLimiter {
        &self.limiter
    }

    /// Filtered bus voltage [V].
    pub fn vbus_voltage(&self) -> f32 {
        self.vbus.value()
    }

    /// Current DC offset estimate [A].
    pub fn dc_offset(&self) -> PhaseCurrents {
        let [a, b, c] = self.dc_offset.values();
        PhaseCurrents::new(a, b, c)
    }

    /// Control cycle period at the live timer period [s].
    pub fn control_dt(&self) -> f32 {
        self.config.control_frequency_divider as f32 * self.sync.period() as f32
            / self.timer_frequency
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

    /// Result left by the last law that finished normally.
    pub fn last_outcome(&self) -> Option<LawOutcome> {
        self.outcome
    }

    pub fn effective_current_limit(&self) -> f32 {
        limiter::effective_current_limit(&self.config, self.cc.max_allowed_current, &self.limiter)
    }

    // ─── Arm / Disarm ───────────────────────────────────────────────

    /// Hand the outputs to `law`.
    ///
    /// The law state is installed and the integrators cleared before the
    /// armed word is published.
    pub fn arm(&mut self, law: ControlLaw) -> Result<(), MotorError> {
        let request = ArmRequest {
            law,
            already_armed: self.is_armed(),
            errors: self.error(),
            timer_running: self.sync.is_running(),
            calibrated: self.is_calibrated(),
        };
        if let ArmDecision::Reject { raise, reason } = evaluate_arm(&request) {
            warn!("Arm {:?} refused: {}", law.kind(), reason);
            if raise.is_empty() {
                return Err(MotorError::FAILED_TO_ARM);
            }
            self.set_error(raise);
            return Err(raise);
        }

        self.law = LawState::install(&law);
        self.cc.reset();
        self.cc.cmd_timestamp_us = self.hw.now_us();
        self.latched = None;
        self.outcome = None;
        if !self.shared.safety.publish_armed(law.kind()) {
            return Err(MotorError::FAILED_TO_ARM);
        }
        // A fault raised through a handle between the check and the publish.
        if !self.error().is_empty() {
            self.shared.safety.disarm();
            self.float_outputs();
            return Err(MotorError::FAILED_TO_ARM);
        }
        info!("Armed: {:?}", law.kind());
        Ok(())
    }

    /// Arm field-oriented control. Requires a calibrated motor.
    pub fn arm_foc(&mut self) -> Result<(), MotorError> {
        self.arm(ControlLaw::Foc)
    }

    /// Float the outputs. Returns whether the motor was armed.
    pub fn disarm(&mut self) -> bool {
        let was_armed = self.shared.safety.disarm();
        self.float_outputs();
        if was_armed {
            info!("Disarmed");
        }
        was_armed
    }

    /// Latch `error` and disarm.
    pub fn set_error(&mut self, error: MotorError) {
        let new = error.difference(self.error());
        self.shared.safety.raise(error);
        if error.requires_disarm() {
            self.float_outputs();
        }
        if new.has_hard() {
            error!("Motor fault latched: {}", new);
        } else if !new.is_empty() {
            warn!("Motor fault latched: {}", new);
        }
    }

    /// Acknowledge all faults. Refused while armed.
    pub fn clear_errors(&mut self) -> bool {
        let cleared = self.shared.safety.clear_errors();
        if cleared {
            info!("Motor errors cleared");
        }
        cleared
    }

    fn float_outputs(&mut self) {
        self.latched = None;
        self.law = LawState::Idle;
        self.hw.apply_pwm(PwmOutput::Floating);
    }

    // ─── Setpoints and Parameters ───────────────────────────────────

    /// Refresh the FOC setpoint, its timestamp and its expiry.
    ///
    /// Gimbal motors always run in voltage mode; a current command is taken
    /// as volts there. Toggling the mode resets the integrators.
    pub fn foc_update(&mut self, cmd: FocCommand) {
        let gimbal = self.config.motor_type == MotorType::Gimbal;
        let (voltage_mode, vd, vq) = if gimbal && !cmd.voltage_mode {
            (true, cmd.id, cmd.iq)
        } else {
            (cmd.voltage_mode, cmd.vd, cmd.vq)
        };
        let current_mode = !voltage_mode;
        if current_mode != self.cc.enable_current_control {
            self.cc.integrator.reset();
            self.cc.enable_current_control = current_mode;
        }
        self.cc.id_setpoint = cmd.id;
        self.cc.iq_setpoint = cmd.iq;
        self.cc.vd_setpoint = vd;
        self.cc.vq_setpoint = vq;
        self.cc.phase = cmd.phase;
        self.cc.phase_vel = cmd.phase_vel;
        self.cc.cmd_timestamp_us = self.hw.now_us();
        self.cc.cmd_timeout_us = cmd.expiry_us;
    }

    /// Recompute the PI gains from bandwidth, resistance and inductance.
    pub fn update_current_controller_gains(&mut self) {
        self.cc.gains = CurrentGains::from_motor(
            self.config.current_control_bandwidth,
            self.config.phase_resistance,
            self.config.phase_inductance,
        );
    }

    /// Take `config.pre_calibrated` and mirror it into the calibrated flag.
    ///
    /// Refused while armed.
    pub fn set_pre_calibrated(&mut self, pre_calibrated: bool) -> bool {
        if self.is_armed() {
            return false;
        }
        self.config.pre_calibrated = pre_calibrated;
        self.update_current_controller_gains();
        self.shared.safety.set_calibrated(pre_calibrated);
        true
    }

    /// Derive the timer period from the configured switching frequency and
    /// request it for the next commit.
    pub fn update_switching_frequency(&mut self) -> bool {
        match derive_timing(self.timer_frequency, &self.config) {
            Ok(timing) => {
                self.shared.target_period.store(timing.period, Ordering::Release);
                info!(
                    "Switching frequency {:.0} Hz requested: period {} ticks",
                    self.config.switching_frequency, timing.period
                );
                true
            }
            Err(e) => {
                self.set_error(e);
                false
            }
        }
    }

    /// Re-derive everything computed from the configuration.
    pub fn apply_config(&mut self) -> bool {
        self.update_current_controller_gains();
        self.update_switching_frequency()
    }

    // ─── Timer Context ──────────────────────────────────────────────

    /// Timer update handler.
    pub fn on_timer_update(&mut self, event: TimerEvent) {
        let ticks = self.hw.ticks();
        let actions = match self
            .sync
            .on_update(event, &self.shared.target_period, &self.config)
        {
            Ok(actions) => actions,
            Err(e) => {
                self.set_error(e);
                return;
            }
        };

        if let Some((period, offset)) = actions.period_commit {
            self.hw.write_period(period, offset);
            debug!("Timer period committed: {} ticks, offset {}", period, offset);
        }

        if actions.update_pwm {
            let output = match (self.is_armed(), self.latched) {
                (true, Some(timings)) => PwmOutput::Timings(timings),
                _ => PwmOutput::Floating,
            };
            self.hw.apply_pwm(output);
        }

        if actions.sample {
            if let Err(e) = self.timing.begin_cycle(ticks) {
                self.set_error(e);
            }
        }
        if !(actions.sample || actions.dc_calib) {
            return;
        }

        let raw = self.hw.sample_phase_currents();
        if actions.sample {
            self.timing.record(Checkpoint::CurrentMeas, self.hw.ticks());
        }
        match raw {
            Ok(raw) => {
                if actions.dc_calib {
                    let o = raw.as_offsets();
                    let dt = self.dc_calib_dt();
                    self.dc_offset.update([o.a, o.b, o.c], self.config.calib_tau, dt);
                    self.timing.record(Checkpoint::DcCal, self.hw.ticks());
                }
                if actions.sample {
                    self.pending_sample = Some(Ok(raw.into_sample(self.dc_offset())));
                }
            }
            Err(fault) => {
                if actions.sample {
                    self.pending_sample = Some(Err(fault.into()));
                } else {
                    self.set_error(fault.into());
                }
            }
        }
    }

    fn dc_calib_dt(&self) -> f32 {
        let half_period = self.sync.period() as f32 / self.timer_frequency;
        if self.config.current_dc_calib_mode.is_single_edge() {
            2.0 * half_period
        } else {
            half_period
        }
    }

    /// Control loop for the sample taken at the last sampling edge.
    ///
    /// Returns false when no sample was pending.
    pub fn control_loop(&mut self) -> bool {
        let Some(sample) = self.pending_sample.take() else {
            return false;
        };
        let dt = self.control_dt();
        let mut faults = MotorError::empty();

        // A non-finite reading counts as a dead sensor.
        let reading = match self.config.vbus_voltage_override {
            Some(v) => Some(v),
            None => self.hw.read_bus_voltage(),
        }
        .filter(|v| v.is_finite());
        let vbus = match reading {
            Some(v) => self.vbus.update(v, self.config.vbus_voltage_tau, dt),
            None => {
                faults |= MotorError::V_BUS_SENSOR_DEAD;
                0.0
            }
        };
        if reading.is_some() {
            if vbus < self.config.dc_bus_undervoltage_trip_level {
                faults |= MotorError::DC_BUS_UNDER_VOLTAGE;
            } else if vbus > self.config.dc_bus_overvoltage_trip_level {
                faults |= MotorError::DC_BUS_OVER_VOLTAGE;
            }
        }

        let temps = self.hw.read_temperatures();
        faults |= self.limiter.update(&temps, &self.config, dt);
        if self.hw.gate_driver_fault() {
            faults |= MotorError::DRV_FAULT;
        }

        let sample = match sample {
            Ok(s) => {
                if s.saturated {
                    faults |= MotorError::CURRENT_SENSE_SATURATION;
                }
                if s.three_sensors && s.leak.abs() > self.config.max_leak_current {
                    faults |= MotorError::LEAK_CURRENT_TOO_HIGH;
                }
                Some(s)
            }
            Err(e) => {
                faults |= e;
                None
            }
        };

        if !faults.is_empty() {
            self.set_error(faults);
        }

        match (self.armed_law(), sample) {
            (Some(kind), Some(sample)) => self.step_law(kind, sample, vbus, dt),
            _ => self.latched = None,
        }

        self.timing.end_cycle(self.hw.ticks());
        true
    }

    fn step_law(&mut self, kind: LawKind, sample: PhaseCurrentSample, vbus: f32, dt: f32) {
        if self.law.kind() != Some(kind) {
            self.set_error(MotorError::CONTROLLER_FAILED);
            return;
        }
        let input = LawInputs {
            config: &self.config,
            sample,
            vbus,
            now_us: self.hw.now_us(),
            dt,
            current_limit: limiter::effective_current_limit(
                &self.config,
                self.cc.max_allowed_current,
                &self.limiter,
            ),
        };
        match self.law.step(&mut self.cc, &input) {
            LawStep::Continue(timings) => self.latched = Some(timings),
            LawStep::Finished(outcome) => {
                self.outcome = Some(outcome);
                self.shared.safety.disarm();
                self.float_outputs();
                debug!("{:?} finished: {:?}", kind, outcome);
            }
            LawStep::Failed(e) => self.set_error(e),
        }
    }

    /// Pump update events until one control cycle ran.
    ///
    /// Returns false when the timer stopped delivering events.
    pub fn run_cycle(&mut self) -> bool {
        let max_events = 2 * self.config.control_frequency_divider.max(1) + 1;
        for _ in 0..max_events {
            let Some(event) = self.hw.wait_timer_event() else {
                return false;
            };
            self.on_timer_update(event);
            if self.control_loop() {
                return true;
            }
        }
        true
    }

    /// Make sure at least one update event was seen, so arming can check
    /// the timer.
    fn ensure_running(&mut self) {
        if !self.sync.is_running() {
            self.run_cycle();
        }
    }

    // ─── Calibration ────────────────────────────────────────────────

    /// Begin measuring the electrical parameters.
    pub fn start_calibration(&mut self) -> Result<(), MotorError> {
        let limit = self.effective_current_limit();
        let (engine, step) = match CalibrationEngine::start(&self.config, limit) {
            Ok(started) => started,
            Err(e) => {
                self.set_error(e);
                return Err(e);
            }
        };
        info!("Calibration started ({:?})", self.config.motor_type);
        match step {
            EngineStep::Arm(law) => {
                self.calibration = engine;
                if let Err(e) = self.arm(law) {
                    self.calibration = None;
                    return Err(e);
                }
            }
            EngineStep::Commit(result) => self.commit_calibration(result),
        }
        Ok(())
    }

    /// Advance a running calibration after its current law stopped.
    pub fn poll_calibration(&mut self) -> Result<CalibrationStatus, MotorError> {
        if self.calibration.is_none() {
            return Ok(CalibrationStatus::Done);
        }
        if self.is_armed() {
            return Ok(CalibrationStatus::Running);
        }
        let Some(mut engine) = self.calibration.take() else {
            return Ok(CalibrationStatus::Done);
        };

        let Some(outcome) = self.outcome.take() else {
            // Disarmed by a fault or from outside.
            let errors = self.error();
            let cause = if errors.is_empty() {
                MotorError::CONTROLLER_FAILED
            } else {
                errors
            };
            warn!("Calibration aborted in {:?}: {}", engine.stage(), cause);
            return Err(cause);
        };

        match engine.advance(outcome) {
            Ok(EngineStep::Arm(law)) => {
                self.calibration = Some(engine);
                if let Err(e) = self.arm(law) {
                    self.calibration = None;
                    return Err(e);
                }
                Ok(CalibrationStatus::Running)
            }
            Ok(EngineStep::Commit(result)) => {
                self.commit_calibration(result);
                Ok(CalibrationStatus::Done)
            }
            Err(e) => {
                self.set_error(e);
                Err(e)
            }
        }
    }

    /// Calibrate, pumping the timer until finished.
    pub fn run_calibration(&mut self) -> Result<(), MotorError> {
        self.ensure_running();
        self.start_calibration()?;
        loop {
            if self.poll_calibration()? == CalibrationStatus::Done {
                return Ok(());
            }
            if !self.run_cycle() {
                self.calibration = None;
                self.disarm();
                return Err(MotorError::CONTROLLER_FAILED);
            }
        }
    }

    fn commit_calibration(&mut self, result: CalibrationResult) {
        self.config.phase_resistance = result.phase_resistance;
        self.config.phase_inductance = result.phase_inductance;
        if let Some(rotor) = result.rotor {
            let t = rotor.to_t_model(result.phase_inductance);
            self.config.mutual_inductance = t.mutual_inductance;
            self.config.rotor_inductance = t.rotor_inductance;
            self.config.rotor_resistance = t.rotor_resistance;
            self.config.async_calibrated = true;
            info!(
                "Rotor identified: Lm {:.3} mH, Lr {:.3} mH, Rr {:.4} Ω",
                t.mutual_inductance * 1e3,
                t.rotor_inductance * 1e3,
                t.rotor_resistance
            );
        }
        self.update_current_controller_gains();
        self.shared.safety.set_calibrated(true);
        info!(
            "Calibration committed: R {:.4} Ω, L {:.2} µH",
            result.phase_resistance,
            result.phase_inductance * 1e6
        );
    }

    // ─── PWM Test ───────────────────────────────────────────────────

    /// Drive a rotating open-loop modulation vector for `duration_s`.
    pub fn pwm_test(&mut self, duration_s: f32) -> Result<(), MotorError> {
        self.ensure_running();
        self.arm(ControlLaw::PwmTest { duration_s })?;
        while self.is_armed() {
            if !self.run_cycle() {
                self.disarm();
                return Err(MotorError::CONTROLLER_FAILED);
            }
        }
        match self.outcome.take() {
            Some(LawOutcome::PwmTestDone) => Ok(()),
            _ => {
                let errors = self.error();
                Err(if errors.is_empty() {
                    MotorError::CONTROLLER_FAILED
                } else {
                    errors
                })
            }
        }
    }
}
