use motor_common::motor::config::MotorConfig;
use motor_core::motor::Motor;
use motor_core::sim::{PlantParams, SimulatedDrive};

mod arm_disarm;
mod calibration;
mod config_files;
mod fields;
mod foc;
mod thermal;

/// Control cycles per second at the default schedule.
pub const CYCLES_PER_S: u32 = 24_000;

/// Config that skips calibration for the default plant.
pub fn calibrated_config() -> MotorConfig {
    MotorConfig {
        pre_calibrated: true,
        phase_resistance: 0.1,
        phase_inductance: 50e-6,
        ..Default::default()
    }
}

/// Initialized motor whose timer has delivered its first cycle.
pub fn running_motor(plant: PlantParams, config: MotorConfig) -> Motor<SimulatedDrive> {
    let mut motor = Motor::new(SimulatedDrive::new(plant), config);
    motor.init().expect("init");
    assert!(motor.run_cycle());
    motor
}

pub fn run_cycles(motor: &mut Motor<SimulatedDrive>, n: u32) {
    for _ in 0..n {
        assert!(motor.run_cycle(), "timer stopped");
    }
}
