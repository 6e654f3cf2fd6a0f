//! Integration test: arming, fault-driven disarm and recovery.

use std::thread;

use motor_common::motor::config::MotorConfig;
use motor_common::motor::error::MotorError;
use motor_common::motor::types::{PwmOutput, SensorFault};
use motor_core::control::law::LawKind;
use motor_core::motor::{FocCommand, Motor};
use motor_core::safety::state::ArmState;
use motor_core::sim::{PlantParams, SimulatedDrive};

use super::{calibrated_config, run_cycles, running_motor};

fn armed_foc() -> Motor<SimulatedDrive> {
    let mut motor = running_motor(PlantParams::default(), calibrated_config());
    motor.foc_update(FocCommand::current(0.0, 2.0, 0.0, 0.0));
    motor.arm_foc().expect("arm");
    motor
}

/// Run with a fresh setpoint every cycle, stopping early on disarm.
fn drive(motor: &mut Motor<SimulatedDrive>, cmd: FocCommand, cycles: u32) {
    for _ in 0..cycles {
        motor.foc_update(cmd);
        assert!(motor.run_cycle());
        if !motor.is_armed() {
            return;
        }
    }
}

// ── Guard ───────────────────────────────────────────────────────────

#[test]
fn foc_refused_until_calibrated() {
    let mut motor = running_motor(PlantParams::default(), MotorConfig::default());
    let err = motor.arm_foc().unwrap_err();
    assert!(err.contains(MotorError::NOT_CALIBRATED | MotorError::FAILED_TO_ARM));
    assert!(!motor.is_armed());
    assert!(motor.error().contains(MotorError::NOT_CALIBRATED));
}

#[test]
fn arm_refused_before_first_update_event() {
    let mut motor = Motor::new(SimulatedDrive::new(PlantParams::default()), calibrated_config());
    motor.init().unwrap();
    assert_eq!(motor.arm_foc(), Err(MotorError::FAILED_TO_ARM));
    assert!(motor.error().contains(MotorError::FAILED_TO_ARM));
}

#[test]
fn double_arm_refused_without_latching() {
    let mut motor = armed_foc();
    assert_eq!(motor.arm_foc(), Err(MotorError::FAILED_TO_ARM));
    assert!(motor.is_armed());
    assert!(motor.error().is_empty());
    assert_eq!(motor.armed_law(), Some(LawKind::Foc));
}

#[test]
fn pending_errors_block_arm_until_cleared() {
    let mut motor = running_motor(PlantParams::default(), calibrated_config());
    motor.hardware_mut().set_gate_driver_fault(true);
    run_cycles(&mut motor, 1);
    assert!(motor.error().contains(MotorError::DRV_FAULT));

    motor.hardware_mut().set_gate_driver_fault(false);
    assert_eq!(motor.arm_foc(), Err(MotorError::FAILED_TO_ARM));
    assert!(motor.clear_errors());
    assert!(motor.error().is_empty());
    motor.foc_update(FocCommand::current(0.0, 1.0, 0.0, 0.0));
    assert!(motor.arm_foc().is_ok());
}

#[test]
fn errors_not_cleared_while_armed() {
    let mut motor = armed_foc();
    motor.handle().set_error(MotorError::CURRENT_SENSE_SATURATION);
    // The fault disarmed the motor, so now clearing works.
    assert!(!motor.is_armed());
    assert!(motor.clear_errors());

    motor.foc_update(FocCommand::current(0.0, 1.0, 0.0, 0.0));
    motor.arm_foc().unwrap();
    assert!(!motor.clear_errors());
}

// ── Fault → Disarm ──────────────────────────────────────────────────

#[test]
fn gate_driver_fault_disarms_immediately() {
    let mut motor = armed_foc();
    run_cycles(&mut motor, 5);
    assert!(matches!(motor.hardware().output(), PwmOutput::Timings(_)));

    motor.hardware_mut().set_gate_driver_fault(true);
    run_cycles(&mut motor, 1);
    assert!(!motor.is_armed());
    assert!(motor.error().contains(MotorError::DRV_FAULT));
    assert_eq!(motor.hardware().output(), PwmOutput::Floating);
}

#[test]
fn adc_failure_disarms() {
    let mut motor = armed_foc();
    motor.hardware_mut().set_sensor_fault(Some(SensorFault::AdcFailed));
    run_cycles(&mut motor, 1);
    assert!(!motor.is_armed());
    assert!(motor.error().contains(MotorError::ADC_FAILED));
    assert!(motor.error().has_hard());
}

#[test]
fn dead_bus_sensor_disarms() {
    let mut motor = armed_foc();
    motor.hardware_mut().set_bus_voltage(None);
    run_cycles(&mut motor, 1);
    assert!(!motor.is_armed());
    assert!(motor.error().contains(MotorError::V_BUS_SENSOR_DEAD));
}

#[test]
fn non_finite_bus_reading_counts_as_dead_sensor() {
    let mut motor = armed_foc();
    motor.hardware_mut().set_bus_voltage(Some(f32::NAN));
    run_cycles(&mut motor, 1);
    assert!(!motor.is_armed());
    assert!(motor.error().contains(MotorError::V_BUS_SENSOR_DEAD));
}

#[test]
fn bus_undervoltage_trips_after_filter() {
    let mut motor = armed_foc();
    motor.hardware_mut().set_bus_voltage(Some(5.0));
    drive(&mut motor, FocCommand::current(0.0, 2.0, 0.0, 0.0), 2_000);
    assert!(!motor.is_armed());
    assert!(motor.error().contains(MotorError::DC_BUS_UNDER_VOLTAGE));
    assert!(motor.vbus_voltage() < 8.0);
}

#[test]
fn leak_current_trips_with_three_sensors() {
    let config = MotorConfig {
        max_leak_current: 1.0,
        ..calibrated_config()
    };
    let mut motor = running_motor(PlantParams::default(), config);
    motor.foc_update(FocCommand::current(0.0, 2.0, 0.0, 0.0));
    motor.arm_foc().unwrap();
    motor.hardware_mut().set_leak_current(2.0);
    run_cycles(&mut motor, 1);
    assert!(!motor.is_armed());
    assert!(motor.error().contains(MotorError::LEAK_CURRENT_TOO_HIGH));
}

#[test]
fn leak_ignored_with_two_sensors() {
    let plant = PlantParams {
        three_sensors: false,
        ..Default::default()
    };
    let config = MotorConfig {
        max_leak_current: 1.0,
        ..calibrated_config()
    };
    let mut motor = running_motor(plant, config);
    motor.foc_update(FocCommand::current(0.0, 2.0, 0.0, 0.0));
    motor.arm_foc().unwrap();
    motor.hardware_mut().set_leak_current(2.0);
    drive(&mut motor, FocCommand::current(0.0, 2.0, 0.0, 0.0), 50);
    assert!(motor.is_armed());
    assert!(motor.error().is_empty());
}

#[test]
fn current_sense_saturation_disarms() {
    let plant = PlantParams {
        max_current_range: 5.0,
        ..Default::default()
    };
    let mut motor = running_motor(plant, calibrated_config());
    assert_eq!(motor.current_control().max_allowed_current, 5.0);
    let cmd = FocCommand::voltage(0.0, 1.0, 0.0, 0.0);
    motor.foc_update(cmd);
    motor.arm_foc().unwrap();
    drive(&mut motor, cmd, 2_000);
    assert!(!motor.is_armed());
    assert!(motor.error().contains(MotorError::CURRENT_SENSE_SATURATION));
}

// ── Disarm ──────────────────────────────────────────────────────────

#[test]
fn disarm_is_idempotent() {
    let mut motor = armed_foc();
    run_cycles(&mut motor, 3);
    assert!(motor.disarm());
    assert!(!motor.disarm());
    assert_eq!(motor.hardware().output(), PwmOutput::Floating);
    assert!(motor.error().is_empty());
    assert_eq!(
        motor.handle().state(),
        ArmState::Disarmed { calibrated: true }
    );
}

#[test]
fn handle_disarm_from_other_thread_floats_at_next_edge() {
    let mut motor = armed_foc();
    run_cycles(&mut motor, 3);
    let handle = motor.handle();
    thread::spawn(move || assert!(handle.disarm()))
        .join()
        .unwrap();
    assert!(!motor.is_armed());
    run_cycles(&mut motor, 1);
    assert_eq!(motor.hardware().output(), PwmOutput::Floating);
}

#[test]
fn rearm_starts_with_clean_integrators() {
    let mut motor = armed_foc();
    drive(&mut motor, FocCommand::current(0.0, 5.0, 0.0, 0.0), 200);
    assert!(motor.current_control().integrator.q.abs() > 0.0);

    motor.disarm();
    motor.foc_update(FocCommand::current(0.0, 5.0, 0.0, 0.0));
    motor.arm_foc().unwrap();
    assert_eq!(motor.current_control().integrator.d, 0.0);
    assert_eq!(motor.current_control().integrator.q, 0.0);
}
