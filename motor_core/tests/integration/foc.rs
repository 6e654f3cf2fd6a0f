//! Integration test: closed-loop current control on the simulated plant.

use motor_common::consts::DEFAULT_CMD_TIMEOUT_US;
use motor_common::motor::config::{MotorConfig, MotorType};
use motor_common::motor::error::MotorError;
use motor_common::motor::types::PwmOutput;
use motor_core::control::pi::CurrentGains;
use motor_core::motor::{FocCommand, Motor};
use motor_core::sim::{PlantParams, SimulatedDrive};

use super::{CYCLES_PER_S, calibrated_config, run_cycles, running_motor};

/// Arm FOC and hold `cmd` for `cycles`, refreshing it every cycle.
fn hold(motor: &mut Motor<SimulatedDrive>, cmd: FocCommand, cycles: u32) {
    motor.foc_update(cmd);
    if !motor.is_armed() {
        motor.arm_foc().expect("arm");
    }
    for _ in 0..cycles {
        motor.foc_update(cmd);
        assert!(motor.run_cycle());
        if !motor.is_armed() {
            return;
        }
    }
}

#[test]
fn tracks_q_axis_current() {
    let mut motor = running_motor(PlantParams::default(), calibrated_config());
    hold(&mut motor, FocCommand::current(0.0, 5.0, 0.0, 0.0), CYCLES_PER_S / 10);
    assert!(motor.is_armed());
    let cc = motor.current_control();
    assert!((cc.iq_measured - 5.0).abs() < 0.1, "iq {}", cc.iq_measured);
    assert!(cc.id_measured.abs() < 0.1, "id {}", cc.id_measured);

    // Phase 0: q lies on beta.
    let (i_alpha, i_beta) = motor.hardware().current();
    assert!(i_alpha.abs() < 0.1);
    assert!((i_beta - 5.0).abs() < 0.1);
    // Steady state: V ≈ R·I.
    assert!((cc.final_v_q - 0.5).abs() < 0.05, "vq {}", cc.final_v_q);
}

#[test]
fn gains_follow_motor_model() {
    let motor = running_motor(PlantParams::default(), calibrated_config());
    assert_eq!(
        motor.current_control().gains,
        CurrentGains::from_motor(1000.0, 0.1, 50e-6)
    );
}

#[test]
fn setpoint_clamped_to_current_limit() {
    let mut motor = running_motor(PlantParams::default(), calibrated_config());
    hold(&mut motor, FocCommand::current(0.0, 30.0, 0.0, 0.0), CYCLES_PER_S / 10);
    assert!(motor.is_armed());
    assert_eq!(motor.effective_current_limit(), 10.0);
    let iq = motor.current_control().iq_measured;
    assert!((iq - 10.0).abs() < 0.2, "iq {iq}");
}

#[test]
fn voltage_vector_clamped_to_linear_range() {
    // 2 Ω at 10 A needs 20 V, more than the 24 V bus can modulate linearly.
    let plant = PlantParams {
        phase_resistance: 2.0,
        phase_inductance: 1e-3,
        ..Default::default()
    };
    let config = MotorConfig {
        phase_resistance: 2.0,
        phase_inductance: 1e-3,
        ..calibrated_config()
    };
    let mut motor = running_motor(plant, config);
    hold(&mut motor, FocCommand::current(0.0, 10.0, 0.0, 0.0), CYCLES_PER_S / 10);
    assert!(motor.is_armed());
    assert!(motor.error().is_empty());

    let cc = motor.current_control();
    let v_max = 0.8 * 0.866_025_4 * 24.0 * 2.0 / 3.0;
    let v = cc.final_v_d.hypot(cc.final_v_q);
    assert!((v - v_max).abs() < 0.05, "|v| {v}, limit {v_max}");
    assert!(cc.iq_measured < 10.0);
    // Anti-windup keeps the integrator near the clamp instead of running away.
    assert!(cc.integrator.q.abs() < 2.0 * v_max);
}

#[test]
fn stale_setpoint_times_out() {
    let mut motor = running_motor(PlantParams::default(), calibrated_config());
    motor.foc_update(FocCommand::current(0.0, 2.0, 0.0, 0.0));
    motor.arm_foc().unwrap();
    // 5 ms timeout is 120 cycles.
    for _ in 0..200 {
        assert!(motor.run_cycle());
    }
    assert!(!motor.is_armed());
    assert!(motor.error().contains(MotorError::FOC_CMD_TIMEOUT));
    assert_eq!(motor.hardware().output(), PwmOutput::Floating);
}

#[test]
fn short_command_expiry_times_out_early() {
    let mut motor = running_motor(PlantParams::default(), calibrated_config());
    // 1 ms is 24 cycles, well inside the default 5 ms.
    motor.foc_update(FocCommand::current(0.0, 2.0, 0.0, 0.0).with_expiry(1_000));
    assert_eq!(motor.current_control().cmd_timeout_us, 1_000);
    motor.arm_foc().unwrap();
    run_cycles(&mut motor, 40);
    assert!(!motor.is_armed());
    assert!(motor.error().contains(MotorError::FOC_CMD_TIMEOUT));
}

#[test]
fn each_command_carries_its_own_expiry() {
    let mut motor = running_motor(PlantParams::default(), calibrated_config());
    motor.foc_update(FocCommand::current(0.0, 2.0, 0.0, 0.0).with_expiry(1_000));
    motor.foc_update(FocCommand::current(0.0, 2.0, 0.0, 0.0));
    assert_eq!(motor.current_control().cmd_timeout_us, DEFAULT_CMD_TIMEOUT_US);
    motor.arm_foc().unwrap();
    run_cycles(&mut motor, 40);
    assert!(motor.is_armed());
    assert!(motor.error().is_empty());
}

#[test]
fn refreshed_setpoint_keeps_running() {
    let mut motor = running_motor(PlantParams::default(), calibrated_config());
    hold(&mut motor, FocCommand::current(0.0, 2.0, 0.0, 0.0), 500);
    assert!(motor.is_armed());
    assert!(motor.error().is_empty());
}

#[test]
fn clock_jump_expires_setpoint() {
    let mut motor = running_motor(PlantParams::default(), calibrated_config());
    hold(&mut motor, FocCommand::current(0.0, 2.0, 0.0, 0.0), 10);
    motor.hardware_mut().advance_clock_us(10_000);
    run_cycles(&mut motor, 1);
    assert!(motor.error().contains(MotorError::FOC_CMD_TIMEOUT));
}

#[test]
fn bus_current_hard_limit() {
    let config = MotorConfig {
        i_bus_hard_max: 0.05,
        ..calibrated_config()
    };
    let mut motor = running_motor(PlantParams::default(), config);
    hold(&mut motor, FocCommand::current(0.0, 5.0, 0.0, 0.0), CYCLES_PER_S / 10);
    assert!(!motor.is_armed());
    assert!(motor.error().contains(MotorError::I_BUS_OUT_OF_RANGE));
}

#[test]
fn voltage_mode_applies_setpoint() {
    let mut motor = running_motor(PlantParams::default(), calibrated_config());
    hold(&mut motor, FocCommand::voltage(0.0, 0.3, 0.0, 0.0), CYCLES_PER_S / 20);
    assert!(motor.is_armed());
    let cc = motor.current_control();
    assert!(!cc.enable_current_control);
    assert!((cc.final_v_q - 0.3).abs() < 1e-4);
    assert!((cc.iq_measured - 3.0).abs() < 0.1, "iq {}", cc.iq_measured);
}

#[test]
fn gimbal_takes_current_command_as_volts() {
    let plant = PlantParams {
        phase_resistance: 5.0,
        phase_inductance: 1e-3,
        ..Default::default()
    };
    let config = MotorConfig {
        motor_type: MotorType::Gimbal,
        current_lim: 3.0,
        ..Default::default()
    };
    let mut motor = running_motor(plant, config);
    motor.run_calibration().unwrap();
    assert!(motor.is_calibrated());

    hold(&mut motor, FocCommand::current(0.0, 2.0, 0.0, 0.0), CYCLES_PER_S / 20);
    assert!(motor.is_armed());
    let cc = motor.current_control();
    assert!((cc.final_v_q - 2.0).abs() < 1e-4);

    // Voltage limit for gimbals is current_lim.
    hold(&mut motor, FocCommand::current(0.0, 8.0, 0.0, 0.0), 10);
    assert!((motor.current_control().final_v_q - 3.0).abs() < 1e-4);
}

#[test]
fn mode_switch_resets_integrator() {
    let mut motor = running_motor(PlantParams::default(), calibrated_config());
    hold(&mut motor, FocCommand::current(0.0, 5.0, 0.0, 0.0), 200);
    assert!(motor.current_control().integrator.q != 0.0);
    motor.foc_update(FocCommand::voltage(0.0, 0.1, 0.0, 0.0));
    assert_eq!(motor.current_control().integrator.q, 0.0);
}

#[test]
fn pwm_test_completes_and_floats() {
    let mut motor = running_motor(PlantParams::default(), MotorConfig::default());
    motor.pwm_test(0.05).unwrap();
    assert!(!motor.is_armed());
    assert_eq!(motor.hardware().output(), PwmOutput::Floating);
    assert!(motor.error().is_empty());
}
