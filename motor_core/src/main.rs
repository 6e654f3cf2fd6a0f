//! # Motor Core Simulator
//!
//! Runs the current-control core against the simulated power stage:
//! initialize the timer, calibrate (unless the configuration is
//! pre-calibrated), then hold a FOC current setpoint for a number of
//! control cycles and report the tracking and timing statistics.

use clap::Parser;
use motor_common::config::{ConfigError, ConfigLoader, SharedConfig};
use motor_common::motor::config::MotorConfig;
use motor_common::motor::error::MotorError;
use motor_core::fields::{FieldValue, read_field};
use motor_core::motor::{FocCommand, Motor};
use motor_core::sim::{PlantParams, SimulatedDrive};
use serde::Deserialize;
use std::path::PathBuf;
use std::process;
use thiserror::Error;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Motor Core simulated current-control run
#[derive(Parser, Debug)]
#[command(name = "motor_core")]
#[command(version)]
#[command(about = "Run the FOC current-control core against a simulated motor")]
struct Args {
    /// Path to the simulation configuration TOML.
    #[arg(default_value = "config/sim.toml")]
    config: PathBuf,

    /// Override the number of FOC cycles to run.
    #[arg(long)]
    cycles: Option<u32>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

/// What the simulated run does after calibration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RunConfig {
    /// FOC control cycles to run.
    foc_cycles: u32,
    /// d-axis current setpoint [A].
    id_setpoint: f32,
    /// q-axis current setpoint [A].
    iq_setpoint: f32,
    /// Offset of the timer against the reference timer [ticks].
    timer_sync_delay: u32,
    /// Run the open-loop PWM test for this long before FOC [s] (0 = skip).
    pwm_test_s: f32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            foc_cycles: 2_400,
            id_setpoint: 0.0,
            iq_setpoint: 5.0,
            timer_sync_delay: 0,
            pwm_test_s: 0.0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SimConfig {
    shared: SharedConfig,
    #[serde(default)]
    motor: MotorConfig,
    #[serde(default)]
    plant: PlantParams,
    #[serde(default)]
    run: RunConfig,
}

impl SimConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.motor.validate().map_err(ConfigError::ValidationError)?;
        self.plant.validate().map_err(ConfigError::ValidationError)?;
        if self.run.foc_cycles == 0 {
            return Err(ConfigError::ValidationError(
                "run.foc_cycles must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{stage} failed: {error}")]
    Motor {
        stage: &'static str,
        error: MotorError,
    },

    #[error("Timer stopped after {0} cycles")]
    TimerStopped(u32),
}

fn motor_err(stage: &'static str) -> impl FnOnce(MotorError) -> SimError {
    move |error| SimError::Motor { stage, error }
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("Motor Core v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Simulation complete");
}

fn run(args: &Args) -> Result<(), SimError> {
    let config = SimConfig::load(&args.config)?;
    config.validate()?;
    let cycles = args.cycles.unwrap_or(config.run.foc_cycles);
    info!(
        "Config OK: axis={}, motor={:?}, fsw={} Hz, divider={}",
        config.shared.axis_name,
        config.motor.motor_type,
        config.motor.switching_frequency,
        config.motor.control_frequency_divider
    );

    let drive = SimulatedDrive::new(config.plant.clone());
    let mut motor = Motor::new(drive, config.motor.clone())
        .with_timer_sync_delay(config.run.timer_sync_delay);
    motor.init().map_err(motor_err("Init"))?;

    if !motor.is_calibrated() {
        motor.run_calibration().map_err(motor_err("Calibration"))?;
    }
    info!(
        "Motor model: R {:.4} Ω, L {:.2} µH, Kp {:.4}, Ki {:.2}",
        motor.config().phase_resistance,
        motor.config().phase_inductance * 1e6,
        motor.current_control().gains.p_gain,
        motor.current_control().gains.i_gain
    );

    if config.run.pwm_test_s > 0.0 {
        motor
            .pwm_test(config.run.pwm_test_s)
            .map_err(motor_err("PWM test"))?;
        info!("PWM test passed");
    }

    let command = FocCommand::current(config.run.id_setpoint, config.run.iq_setpoint, 0.0, 0.0);
    motor.foc_update(command);
    motor.arm_foc().map_err(motor_err("Arm"))?;

    for cycle in 0..cycles {
        motor.foc_update(command);
        if !motor.run_cycle() {
            motor.disarm();
            return Err(SimError::TimerStopped(cycle));
        }
        if !motor.is_armed() {
            return Err(SimError::Motor {
                stage: "FOC",
                error: motor.error(),
            });
        }
    }
    motor.disarm();

    let cc = motor.current_control();
    info!(
        "Tracking: Id {:.3} A (sp {:.3}), Iq {:.3} A (sp {:.3}), Vd {:.3} V, Vq {:.3} V",
        cc.id_measured,
        cc.id_setpoint,
        cc.iq_measured,
        cc.iq_setpoint,
        cc.final_v_d,
        cc.final_v_q
    );
    let log = motor.timing_log();
    info!(
        "Timing: {} cycles, max latency {} ticks, last {:?} ticks, {} deadline misses",
        log.cycle_count,
        log.max_latency,
        log.last_latency(),
        log.deadline_misses
    );
    if let Ok(FieldValue::Float(limit)) = read_field(&motor, "effective_current_limit") {
        info!("Effective current limit: {:.2} A", limit);
    }
    let errors = motor.error();
    if !errors.is_empty() {
        warn!("Errors latched at exit: {}", errors);
    }
    Ok(())
}

fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
