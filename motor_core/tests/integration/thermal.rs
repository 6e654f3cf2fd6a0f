//! Integration test: thermal derating and over-temperature trips.

use motor_common::motor::config::MotorConfig;
use motor_common::motor::error::MotorError;
use motor_common::motor::types::Temperatures;
use motor_core::motor::{FocCommand, Motor};
use motor_core::sim::{PlantParams, SimulatedDrive};

use super::{CYCLES_PER_S, calibrated_config, run_cycles, running_motor};

fn inverter_at(t: f32) -> Temperatures {
    Temperatures {
        inverter: [Some(t), Some(t - 5.0), Some(t - 10.0)],
        motor: [None; 3],
    }
}

/// Motor whose first temperature reading is `temps`.
fn motor_with(config: MotorConfig, temps: Temperatures) -> Motor<SimulatedDrive> {
    let mut motor = Motor::new(SimulatedDrive::new(PlantParams::default()), config);
    motor.hardware_mut().set_temperatures(temps);
    motor.init().expect("init");
    assert!(motor.run_cycle());
    motor
}

fn hold(motor: &mut Motor<SimulatedDrive>, cmd: FocCommand, cycles: u32) {
    motor.foc_update(cmd);
    motor.arm_foc().expect("arm");
    for _ in 0..cycles {
        motor.foc_update(cmd);
        assert!(motor.run_cycle());
        if !motor.is_armed() {
            return;
        }
    }
}

#[test]
fn cool_inverter_does_not_derate() {
    let mut motor = running_motor(PlantParams::default(), calibrated_config());
    run_cycles(&mut motor, 10);
    assert_eq!(motor.limiter().inverter_temperature(), Some(25.0));
    assert_eq!(motor.limiter().motor_temperature(), None);
    assert_eq!(motor.effective_current_limit(), 10.0);
}

#[test]
fn missing_sensors_never_derate() {
    let mut motor = motor_with(calibrated_config(), Temperatures::default());
    run_cycles(&mut motor, 10);
    assert_eq!(motor.limiter().inverter_temperature(), None);
    assert_eq!(motor.limiter().inverter_fraction(), 1.0);
    assert_eq!(motor.effective_current_limit(), 10.0);
}

#[test]
fn hottest_inverter_leg_derates_linearly() {
    // First reading primes the filters.
    let motor = motor_with(calibrated_config(), inverter_at(110.0));
    assert_eq!(motor.limiter().inverter_temperature(), Some(110.0));
    assert!((motor.limiter().inverter_fraction() - 0.5).abs() < 1e-6);
    assert!((motor.effective_current_limit() - 5.0).abs() < 1e-5);
    assert!(motor.error().is_empty());
}

#[test]
fn motor_temperature_override_derates() {
    let config = MotorConfig {
        motor_temp_override: Some(115.0),
        ..calibrated_config()
    };
    let motor = running_motor(PlantParams::default(), config);
    assert_eq!(motor.limiter().motor_temperature(), Some(115.0));
    assert!((motor.effective_current_limit() - 2.5).abs() < 1e-5);
}

#[test]
fn lower_of_both_bounds_wins() {
    let config = MotorConfig {
        motor_temp_override: Some(105.0),
        ..calibrated_config()
    };
    let motor = motor_with(config, inverter_at(110.0));
    // Inverter 0.5, motor 0.75.
    assert!((motor.effective_current_limit() - 5.0).abs() < 1e-5);
}

#[test]
fn foc_current_follows_thermal_limit() {
    let mut motor = motor_with(calibrated_config(), inverter_at(110.0));
    hold(&mut motor, FocCommand::current(0.0, 10.0, 0.0, 0.0), CYCLES_PER_S / 10);
    assert!(motor.is_armed());
    let iq = motor.current_control().iq_measured;
    assert!((iq - 5.0).abs() < 0.1, "iq {iq}");
}

#[test]
fn inverter_over_temperature_disarms() {
    let mut motor = running_motor(PlantParams::default(), calibrated_config());
    hold(&mut motor, FocCommand::current(0.0, 2.0, 0.0, 0.0), 10);
    motor.hardware_mut().set_temperatures(inverter_at(125.0));
    // Filtered reading climbs from 25 °C towards 125 °C.
    hold_until_disarmed(&mut motor, CYCLES_PER_S);
    assert!(motor.error().contains(MotorError::INVERTER_OVER_TEMP));
    assert!(!motor.error().contains(MotorError::MOTOR_OVER_TEMP));
    assert_eq!(motor.limiter().inverter_fraction(), 0.0);
}

#[test]
fn both_over_temperatures_raised_together() {
    let config = MotorConfig {
        motor_temp_override: Some(130.0),
        ..calibrated_config()
    };
    let motor = motor_with(config, inverter_at(130.0));
    assert!(
        motor
            .error()
            .contains(MotorError::INVERTER_OVER_TEMP | MotorError::MOTOR_OVER_TEMP)
    );
    assert_eq!(motor.effective_current_limit(), 0.0);
}

#[test]
fn unreadable_leg_disarms_and_later_heat_is_seen() {
    let mut motor = running_motor(PlantParams::default(), calibrated_config());
    hold(&mut motor, FocCommand::current(0.0, 2.0, 0.0, 0.0), 10);
    let leg_a = |t: f32| Temperatures {
        inverter: [Some(t), Some(25.0), Some(25.0)],
        motor: [None; 3],
    };

    motor.hardware_mut().set_temperatures(leg_a(f32::NAN));
    hold_until_disarmed(&mut motor, 2);
    assert!(motor.error().contains(MotorError::INVERTER_OVER_TEMP));
    assert_eq!(motor.effective_current_limit(), 0.0);

    // Same leg now reads hot: its filter must still track it.
    motor.hardware_mut().set_temperatures(leg_a(150.0));
    assert!(motor.clear_errors());
    run_cycles(&mut motor, CYCLES_PER_S / 10);
    let t = motor.limiter().inverter_temperature().unwrap();
    assert!(t > 140.0, "inverter {t}");
    assert!(motor.error().contains(MotorError::INVERTER_OVER_TEMP));
    assert_eq!(motor.effective_current_limit(), 0.0);
    motor.foc_update(FocCommand::current(0.0, 2.0, 0.0, 0.0));
    assert!(motor.arm_foc().is_err());
}

fn hold_until_disarmed(motor: &mut Motor<SimulatedDrive>, max_cycles: u32) {
    let cmd = FocCommand::current(0.0, 2.0, 0.0, 0.0);
    for _ in 0..max_cycles {
        motor.foc_update(cmd);
        assert!(motor.run_cycle());
        if !motor.is_armed() {
            return;
        }
    }
    panic!("still armed after {max_cycles} cycles");
}
