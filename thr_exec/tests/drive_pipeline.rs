//! # Drive pipeline tests
//!
//! Exercise the thruster driver end to end, from parameter file to the bytes
//! written on the bus.

use embedded_hal::blocking::i2c;

use thr_lib::cycle_archive::{CycleArchive, CycleRecord};
use thr_lib::thr_driver::{
    BusHandle, ConfigError, CycleFailure, DriveError, OperatingVoltage, Params, ThrusterDriver,
    NEUTRAL_SIGNAL,
};
use util::script_interpreter::{ForceScript, PendingForces};

/// Two thrusters in wiring order with a linear 1500 + 100 * kgf calibration.
const TWO_THRUSTERS: &str = r#"
    device_address = 0x21
    operating_voltage_v = 16.0
    num_channels = 2
    mapping = [0, 1]
    direction = [1, 1]
    pwm_offset = [0, 0]
    pwm_min = [1100, 1100]
    pwm_max = [1900, 1900]

    [coeffs.16]
    LEFT = [100.0, 1500.0]
    RIGHT = [100.0, 1500.0]
"#;

/// Bus recording every write and its address.
#[derive(Default)]
struct RecordingBus {
    writes: Vec<(u8, Vec<u8>)>,
}

impl i2c::Write for RecordingBus {
    type Error = std::io::Error;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.writes.push((address, bytes.to_vec()));
        Ok(())
    }
}

fn two_thrusters() -> Params {
    util::params::from_str(TWO_THRUSTERS).unwrap()
}

fn connected(params: &Params) -> ThrusterDriver<RecordingBus> {
    ThrusterDriver::new(params, BusHandle::Connected(RecordingBus::default())).unwrap()
}

#[test]
fn test_end_to_end_frame() {
    let mut driver = connected(&two_thrusters());
    assert_eq!(driver.voltage(), OperatingVoltage::V16);

    let signals = driver.drive(&[2.0, -2.0]).unwrap();

    // 1500 + 100 * (2.0 / 9.80665) and 1500 - 100 * (2.0 / 9.80665), truncated
    assert_eq!(signals, vec![1520, 1479]);

    let writes = &driver.bus().unwrap().writes;
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0], (0x21, vec![0x00, 0x05, 0xF0, 0x05, 0xC7]));
}

#[test]
fn test_output_length_matches_channels() {
    let mut params = Params::default();
    params.coeffs = two_thrusters().coeffs;
    let mut driver = connected(&params);

    for forces in [[0.0; 8], [1.0; 8], [-250.0; 8]].iter() {
        assert_eq!(driver.drive(forces).unwrap().len(), 8);
    }

    // One frame per cycle, command byte plus two bytes per channel
    let writes = &driver.bus().unwrap().writes;
    assert_eq!(writes.len(), 3);
    assert!(writes.iter().all(|(_, frame)| frame.len() == 17));
}

#[test]
fn test_mismatched_input_never_writes() {
    let mut driver = connected(&two_thrusters());

    for forces in [vec![], vec![1.0], vec![1.0, 2.0, 3.0]].iter() {
        match driver.drive(forces) {
            Err(DriveError::InvalidInput { expected: 2, found }) => assert_eq!(found, forces.len()),
            r => panic!("Expected InvalidInput, got {:?}", r),
        }
    }

    assert!(driver.bus().unwrap().writes.is_empty());
    assert_eq!(driver.frames_sent(), 0);
}

#[test]
fn test_zero_force_is_neutral_after_offset() {
    let mut params = two_thrusters();
    params.pwm_offset = vec![35, -60];
    let mut driver = connected(&params);

    assert_eq!(driver.stop().unwrap(), vec![NEUTRAL_SIGNAL, NEUTRAL_SIGNAL]);

    // Narrowed bounds still apply to the neutral signal
    params.pwm_min = vec![1100, 1510];
    let mut driver = connected(&params);

    assert_eq!(driver.stop().unwrap(), vec![NEUTRAL_SIGNAL, 1510]);
    assert_eq!(driver.last_report().signal_limited, vec![false, true]);
}

#[test]
fn test_unavailable_bus_keeps_computing() {
    let driver: Result<ThrusterDriver<RecordingBus>, _> =
        ThrusterDriver::new(&two_thrusters(), BusHandle::Unavailable);
    let mut driver = driver.unwrap();

    for _ in 0..5 {
        let err = driver.drive(&[2.0, -2.0]).unwrap_err();
        assert!(err.is_bus_unavailable());
        assert_eq!(err.signals(), Some(&vec![1520, 1479]));
        assert_eq!(driver.last_report().failure, Some(CycleFailure::BusUnavailable));
    }

    assert_eq!(driver.frames_sent(), 0);
}

#[test]
fn test_configuration_errors() {
    let mut params = two_thrusters();
    params.mapping = vec![1, 1];
    assert_eq!(
        ThrusterDriver::new(&params, BusHandle::<RecordingBus>::Unavailable).err(),
        Some(ConfigError::MappingNotBijective(vec![1, 1]))
    );

    let mut params = two_thrusters();
    params.pwm_min = vec![1100, 1901];
    assert_eq!(
        ThrusterDriver::new(&params, BusHandle::<RecordingBus>::Unavailable).err(),
        Some(ConfigError::MinAboveMax { channel: 1, min: 1901, max: 1900 })
    );

    // 18.9 V uses the 18 V calibration, which doesn't exist
    let mut params = two_thrusters();
    params.operating_voltage_v = 18.9;
    assert!(matches!(
        ThrusterDriver::new(&params, BusHandle::<RecordingBus>::Unavailable).err(),
        Some(ConfigError::MissingCoefficients { voltage: OperatingVoltage::V18, .. })
    ));
}

#[test]
fn test_scripted_cycles_are_archived() {
    let mut driver = connected(&two_thrusters());

    let mut script = ForceScript::parse(
        "0.0: [0.0, 0.0];\n\
         0.1: [2.0, -2.0];\n\
         0.2: [500.0, -500.0];\n"
    ).unwrap();

    let path = std::env::temp_dir()
        .join("thr_drive_pipeline_test")
        .join("cycles.csv");
    let mut arch = CycleArchive::create(&path, driver.num_channels()).unwrap();

    let mut forces = vec![0.0; 2];
    let mut elapsed_s = 0.0;

    loop {
        match script.get_pending(elapsed_s) {
            PendingForces::Some(f) => forces = f,
            PendingForces::None => (),
            PendingForces::EndOfScript => break,
        }

        let result = driver.drive(&forces);
        arch.record(CycleRecord::from_drive(elapsed_s, &forces, &result, &driver)).unwrap();

        elapsed_s += 0.1;
    }

    assert_eq!(driver.frames_sent(), 3);
    assert_eq!(driver.last_report().signal_limited, vec![true, true]);

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[1], "0,0,0,1500,1500,false,false,true,");
    assert_eq!(lines[2], "0.1,2,-2,1520,1479,false,false,true,");
    assert_eq!(lines[3], "0.2,500,-500,1900,1100,true,true,true,");
}

#[test]
fn test_failed_cycles_are_archived() {
    let mut driver: ThrusterDriver<RecordingBus> =
        ThrusterDriver::new(&two_thrusters(), BusHandle::Unavailable).unwrap();

    let path = std::env::temp_dir()
        .join("thr_drive_pipeline_test")
        .join("failed_cycles.csv");
    let mut arch = CycleArchive::create(&path, driver.num_channels()).unwrap();

    for (time_s, forces) in [(0.0, vec![2.0, -2.0]), (0.05, vec![1.0])].iter() {
        let result = driver.drive(forces);
        arch.record(CycleRecord::from_drive(*time_s, forces, &result, &driver)).unwrap();
    }

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with(",frame_sent,failure"));
    assert_eq!(lines[1], "0,2,-2,1520,1479,false,false,false,BusUnavailable");
    assert_eq!(lines[2], "0.05,1,,,,,,false,InvalidInput");
}

#[test]
fn test_deployed_params() {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("..");

    let params: Params = util::params::load_from_path(root.join("params").join("thr_exec.toml"))
        .unwrap();
    params.are_valid().unwrap();

    // Every calibration on the vehicle should be usable
    for (volts, coeffs) in params.coeffs.iter() {
        assert!(coeffs.positive_is_monotonic(5.0, 100), "{} V is not monotonic", volts);
    }

    let script = ForceScript::new(root.join("scripts").join("thr_sweep.txt")).unwrap();
    assert_eq!(script.num_channels(), params.num_channels);

    let mut driver = connected(&params);
    assert_eq!(driver.stop().unwrap(), vec![NEUTRAL_SIGNAL; 8]);
}
