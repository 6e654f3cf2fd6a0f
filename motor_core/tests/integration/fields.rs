//! Integration test: field access against a running motor.

use motor_common::motor::config::MotorConfig;
use motor_common::motor::error::MotorError;
use motor_core::fields::{FIELD_NAMES, FieldError, FieldValue, read_field, write_field};
use motor_core::motor::FocCommand;
use motor_core::sim::PlantParams;

use super::{calibrated_config, run_cycles, running_motor};

#[test]
fn all_fields_readable_while_running() {
    let mut motor = running_motor(PlantParams::default(), calibrated_config());
    motor.foc_update(FocCommand::current(0.0, 2.0, 0.0, 0.0));
    motor.arm_foc().unwrap();
    run_cycles(&mut motor, 5);
    for path in FIELD_NAMES {
        assert!(read_field(&motor, path).is_ok(), "{path}");
    }
    assert_eq!(read_field(&motor, "is_armed"), Ok(FieldValue::Bool(true)));
    assert_eq!(read_field(&motor, "armed_law"), Ok(FieldValue::Uint(1)));
    assert_eq!(read_field(&motor, "timing.period"), Ok(FieldValue::Uint(3000)));
}

#[test]
fn config_writes_refused_while_armed() {
    let mut motor = running_motor(PlantParams::default(), calibrated_config());
    motor.foc_update(FocCommand::current(0.0, 2.0, 0.0, 0.0));
    motor.arm_foc().unwrap();
    assert_eq!(
        write_field(&mut motor, "config.current_lim", FieldValue::Float(5.0)),
        Err(FieldError::Armed)
    );
    assert_eq!(motor.config().current_lim, 10.0);
}

#[test]
fn command_timeout_writable_while_armed() {
    let mut motor = running_motor(PlantParams::default(), calibrated_config());
    motor.foc_update(FocCommand::current(0.0, 2.0, 0.0, 0.0));
    motor.arm_foc().unwrap();
    write_field(
        &mut motor,
        "current_control.cmd_timeout_us",
        FieldValue::Uint(100_000),
    )
    .unwrap();
    run_cycles(&mut motor, 200);
    assert!(motor.is_armed());
}

#[test]
fn writing_zero_error_acknowledges_faults() {
    let mut motor = running_motor(PlantParams::default(), calibrated_config());
    motor.handle().set_error(MotorError::DRV_FAULT);
    assert_eq!(
        read_field(&motor, "error"),
        Ok(FieldValue::Uint(MotorError::DRV_FAULT.bits()))
    );
    assert!(matches!(
        write_field(&mut motor, "error", FieldValue::Uint(1)),
        Err(FieldError::InvalidValue(_))
    ));
    write_field(&mut motor, "error", FieldValue::Uint(0)).unwrap();
    assert!(motor.error().is_empty());
}

#[test]
fn switching_frequency_write_retimes_carrier() {
    let mut motor = running_motor(PlantParams::default(), calibrated_config());
    write_field(
        &mut motor,
        "config.switching_frequency",
        FieldValue::Float(20_000.0),
    )
    .unwrap();
    run_cycles(&mut motor, 2);
    assert_eq!(read_field(&motor, "timing.period"), Ok(FieldValue::Uint(3600)));
    assert!(motor.error().is_empty());
}

#[test]
fn unrealizable_frequency_write_latches_fault() {
    let mut motor = running_motor(PlantParams::default(), calibrated_config());
    write_field(
        &mut motor,
        "config.switching_frequency",
        FieldValue::Float(1_000.0),
    )
    .unwrap();
    assert!(motor.error().contains(MotorError::INVALID_FREQ_SETTING));
    run_cycles(&mut motor, 2);
    assert_eq!(motor.timer_sync().period(), 3000);
}

#[test]
fn pre_calibrated_write_enables_foc() {
    let mut motor = running_motor(PlantParams::default(), MotorConfig::default());
    // Needs R and L first.
    assert!(matches!(
        write_field(&mut motor, "config.pre_calibrated", FieldValue::Bool(true)),
        Err(FieldError::InvalidValue(_))
    ));
    write_field(&mut motor, "config.phase_resistance", FieldValue::Float(0.1)).unwrap();
    write_field(&mut motor, "config.phase_inductance", FieldValue::Float(50e-6)).unwrap();
    write_field(&mut motor, "config.pre_calibrated", FieldValue::Bool(true)).unwrap();
    assert_eq!(read_field(&motor, "is_calibrated"), Ok(FieldValue::Bool(true)));

    motor.foc_update(FocCommand::current(0.0, 1.0, 0.0, 0.0));
    assert!(motor.arm_foc().is_ok());
}

#[test]
fn thermal_diagnostics_reflect_limiter() {
    let config = MotorConfig {
        motor_temp_override: Some(110.0),
        ..calibrated_config()
    };
    let motor = running_motor(PlantParams::default(), config);
    assert_eq!(
        read_field(&motor, "thermal.motor_temperature"),
        Ok(FieldValue::Float(110.0))
    );
    assert_eq!(
        read_field(&motor, "thermal.motor_fraction"),
        Ok(FieldValue::Float(0.5))
    );
    assert_eq!(
        read_field(&motor, "effective_current_limit"),
        Ok(FieldValue::Float(5.0))
    );
}
