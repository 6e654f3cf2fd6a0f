//! Integration test: electrical parameter calibration against the plant.
//!
//! Validates the full measurement sequence:
//! 1. Resistance by DC current regulation
//! 2. Inductance by square-wave excitation
//! 3. Rotor identification for induction motors
//! 4. Commit of all results only when every stage succeeded

use motor_common::motor::config::{MotorConfig, MotorType};
use motor_common::motor::error::MotorError;
use motor_common::motor::types::PwmOutput;
use motor_core::control::pi::CurrentGains;
use motor_core::motor::{CalibrationStatus, FocCommand};
use motor_core::sim::{PlantParams, RotorParams};

use super::{run_cycles, running_motor};

fn within(actual: f32, expected: f32, tolerance: f32) -> bool {
    (actual - expected).abs() <= tolerance * expected.abs()
}

// ── PMSM ────────────────────────────────────────────────────────────

#[test]
fn measures_resistance_and_inductance() {
    let mut motor = running_motor(PlantParams::default(), MotorConfig::default());
    assert!(!motor.is_calibrated());

    motor.run_calibration().unwrap();
    let config = motor.config();
    assert!(
        within(config.phase_resistance, 0.1, 0.05),
        "R {}",
        config.phase_resistance
    );
    assert!(
        within(config.phase_inductance, 50e-6, 0.05),
        "L {}",
        config.phase_inductance
    );
    assert!(motor.is_calibrated());
    assert!(!motor.is_armed());
    assert!(motor.error().is_empty());
    assert_eq!(motor.hardware().output(), PwmOutput::Floating);
    assert_eq!(
        motor.current_control().gains,
        CurrentGains::from_motor(1000.0, config.phase_resistance, config.phase_inductance)
    );
}

#[test]
fn calibrated_motor_arms_foc() {
    let mut motor = running_motor(PlantParams::default(), MotorConfig::default());
    motor.run_calibration().unwrap();
    motor.foc_update(FocCommand::current(0.0, 3.0, 0.0, 0.0));
    assert!(motor.arm_foc().is_ok());
}

#[test]
fn excessive_voltage_fails_resistance() {
    // 10 A through 0.5 Ω needs 5 V, above the 2 V calibration ceiling.
    let plant = PlantParams {
        phase_resistance: 0.5,
        ..Default::default()
    };
    let mut motor = running_motor(plant, MotorConfig::default());
    let err = motor.run_calibration().unwrap_err();
    assert!(err.contains(MotorError::PHASE_RESISTANCE_OUT_OF_RANGE));
    assert!(motor.error().contains(MotorError::PHASE_RESISTANCE_OUT_OF_RANGE));
    assert!(!motor.is_calibrated());
    assert!(!motor.is_armed());
    assert_eq!(motor.config().phase_resistance, 0.0);
    assert_eq!(motor.config().phase_inductance, 0.0);
}

#[test]
fn lower_calibration_current_fits_high_resistance() {
    let plant = PlantParams {
        phase_resistance: 0.5,
        ..Default::default()
    };
    let config = MotorConfig {
        calibration_current: 2.0,
        ..Default::default()
    };
    let mut motor = running_motor(plant, config);
    motor.run_calibration().unwrap();
    assert!(within(motor.config().phase_resistance, 0.5, 0.05));
}

#[test]
fn test_current_bounded_by_current_limit() {
    let config = MotorConfig {
        calibration_current: 30.0,
        current_lim: 8.0,
        ..Default::default()
    };
    let mut motor = running_motor(PlantParams::default(), config);
    motor.start_calibration().unwrap();
    run_cycles(&mut motor, 24_000);
    let (i_alpha, _) = motor.hardware().current();
    assert!((i_alpha - 8.0).abs() < 0.2, "i_alpha {i_alpha}");
}

#[test]
fn external_disarm_aborts_calibration() {
    let mut motor = running_motor(PlantParams::default(), MotorConfig::default());
    motor.start_calibration().unwrap();
    run_cycles(&mut motor, 100);
    assert_eq!(motor.poll_calibration(), Ok(CalibrationStatus::Running));

    assert!(motor.handle().disarm());
    run_cycles(&mut motor, 1);
    assert_eq!(
        motor.poll_calibration(),
        Err(MotorError::CONTROLLER_FAILED)
    );
    assert!(!motor.is_calibrated());
    assert_eq!(motor.config().phase_resistance, 0.0);
    // Nothing left to run.
    assert_eq!(motor.poll_calibration(), Ok(CalibrationStatus::Done));
}

#[test]
fn fault_during_calibration_reports_it() {
    let mut motor = running_motor(PlantParams::default(), MotorConfig::default());
    motor.start_calibration().unwrap();
    run_cycles(&mut motor, 100);
    motor.hardware_mut().set_gate_driver_fault(true);
    run_cycles(&mut motor, 1);
    let err = motor.poll_calibration().unwrap_err();
    assert!(err.contains(MotorError::DRV_FAULT));
    assert!(!motor.is_calibrated());
}

#[test]
fn pre_calibrated_skips_measurement() {
    let mut motor = running_motor(PlantParams::default(), MotorConfig::default());
    {
        let config = motor.config_mut().unwrap();
        config.phase_resistance = 0.1;
        config.phase_inductance = 50e-6;
    }
    assert!(motor.set_pre_calibrated(true));
    assert!(motor.is_calibrated());
    assert!(motor.config().pre_calibrated);
    assert!(motor.current_control().gains.p_gain > 0.0);
}

#[test]
fn pre_calibrated_refused_while_armed() {
    let mut motor = running_motor(PlantParams::default(), MotorConfig::default());
    motor.start_calibration().unwrap();
    assert!(motor.is_armed());
    assert!(!motor.set_pre_calibrated(true));
    assert!(!motor.is_calibrated());
}

// ── Gimbal ──────────────────────────────────────────────────────────

#[test]
fn gimbal_commits_entered_parameters() {
    let config = MotorConfig {
        motor_type: MotorType::Gimbal,
        phase_resistance: 5.0,
        phase_inductance: 1e-3,
        ..Default::default()
    };
    let mut motor = running_motor(PlantParams::default(), config);
    motor.start_calibration().unwrap();
    assert!(!motor.is_armed());
    assert!(motor.is_calibrated());
    assert_eq!(motor.config().phase_resistance, 5.0);
}

// ── Induction Motor ─────────────────────────────────────────────────

#[test]
fn identifies_induction_motor_rotor() {
    let plant = PlantParams {
        phase_resistance: 0.1,
        phase_inductance: 200e-6,
        rotor: Some(RotorParams {
            magnetizing_inductance: 5e-3,
            rotor_resistance: 0.5,
        }),
        ..Default::default()
    };
    let config = MotorConfig {
        motor_type: MotorType::Acim,
        calibration_current: 5.0,
        ..Default::default()
    };
    let mut motor = running_motor(plant, config);
    motor.run_calibration().unwrap();

    let config = motor.config();
    assert!(
        within(config.phase_resistance, 0.1, 0.05),
        "Rs {}",
        config.phase_resistance
    );
    assert!(
        within(config.phase_inductance, 200e-6, 0.10),
        "Lσ {}",
        config.phase_inductance
    );
    assert!(
        within(config.mutual_inductance, 5e-3, 0.10),
        "Lm {}",
        config.mutual_inductance
    );
    // T model with equal leakage: Lr = Lm + Lσ/2, Rr = RR·(Lr/Lm)².
    assert!(config.rotor_inductance > config.mutual_inductance);
    let ratio = config.rotor_inductance / config.mutual_inductance;
    assert!(
        within(config.rotor_resistance / (ratio * ratio), 0.5, 0.15),
        "Rr {}",
        config.rotor_resistance
    );
    assert!(config.async_calibrated);
    assert!(motor.is_calibrated());
}

#[test]
fn async_calibrated_skips_rotor_stage() {
    let plant = PlantParams {
        phase_resistance: 0.1,
        phase_inductance: 200e-6,
        rotor: Some(RotorParams {
            magnetizing_inductance: 5e-3,
            rotor_resistance: 0.5,
        }),
        ..Default::default()
    };
    let config = MotorConfig {
        motor_type: MotorType::Acim,
        calibration_current: 5.0,
        async_calibrated: true,
        mutual_inductance: 4e-3,
        ..Default::default()
    };
    let mut motor = running_motor(plant, config);
    motor.start_calibration().unwrap();
    // Resistance, then inductance, no rotor stage.
    let mut stages = Vec::new();
    loop {
        match motor.poll_calibration().unwrap() {
            CalibrationStatus::Done => break,
            CalibrationStatus::Running => {
                if let Some(kind) = motor.armed_law() {
                    if stages.last() != Some(&kind) {
                        stages.push(kind);
                    }
                }
                assert!(motor.run_cycle());
            }
        }
    }
    assert_eq!(stages.len(), 2);
    assert_eq!(motor.config().mutual_inductance, 4e-3);
}
