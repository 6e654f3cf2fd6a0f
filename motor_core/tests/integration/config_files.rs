//! Integration test: shipped simulation configs and calibration persistence.

use std::io::Write;
use std::path::PathBuf;

use motor_common::config::{ConfigLoader, SharedConfig};
use motor_common::motor::config::{MotorConfig, MotorType};
use motor_core::sim::PlantParams;
use serde::Deserialize;
use tempfile::NamedTempFile;

use super::running_motor;

#[derive(Debug, Deserialize)]
struct SimFile {
    shared: SharedConfig,
    #[serde(default)]
    motor: MotorConfig,
    #[serde(default)]
    plant: PlantParams,
}

fn shipped(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("config")
        .join(name)
}

#[test]
fn shipped_configs_are_valid() {
    for name in ["sim.toml", "acim.toml"] {
        let file = SimFile::load(&shipped(name)).unwrap();
        file.shared.validate().unwrap();
        file.motor.validate().unwrap();
        file.plant.validate().unwrap();
    }
    let acim = SimFile::load(&shipped("acim.toml")).unwrap();
    assert_eq!(acim.motor.motor_type, MotorType::Acim);
    assert!(acim.plant.rotor.is_some());
}

#[test]
fn calibration_result_survives_reload() {
    let mut motor = running_motor(PlantParams::default(), MotorConfig::default());
    motor.run_calibration().unwrap();
    let mut saved = motor.config().clone();
    saved.pre_calibrated = true;

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(toml::to_string(&saved).unwrap().as_bytes())
        .unwrap();
    let loaded = MotorConfig::load(file.path()).unwrap();
    assert_eq!(loaded, saved);
    assert!(loaded.validate().is_ok());

    // A fresh motor from the persisted parameters needs no calibration.
    let fresh = running_motor(PlantParams::default(), loaded);
    assert!(fresh.is_calibrated());
    assert_eq!(fresh.current_control().gains, motor.current_control().gains);
}
