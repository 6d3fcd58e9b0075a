use std::{fs::File, io::Write, sync::atomic::Ordering};

use avaspec_core::{read_all_scans, ScanReader};
use avaspec_recorder::{
    load_meas_config, open_for_recording, open_spectrometer, RecorderConfig, RecorderError,
    RecordingPipeline,
};
use avaspec_types::MeasConfig;
use tempfile::NamedTempFile;

fn sim_config(serial: Option<&str>) -> RecorderConfig {
    RecorderConfig {
        serial: serial.map(str::to_string),
        integration_ms: 3.0,
        max_scans: Some(4),
        duration_secs: Some(5),
        stats_interval_secs: 60,
        ..RecorderConfig::default()
    }
}

#[test]
fn test_open_spectrometer_by_serial() {
    let spec = open_spectrometer(&sim_config(Some("1203077U1"))).unwrap();
    assert_eq!(spec.serial(), "1203077U1");
    assert_eq!(spec.num_pixels(), 256);
}

#[test]
fn test_open_unknown_serial() {
    let err = open_spectrometer(&sim_config(Some("0000000X0")))
        .err()
        .unwrap();
    assert!(matches!(err, RecorderError::DeviceNotFound(ref s) if s == "0000000X0"));
}

#[test]
fn test_bad_recording_config_rejected_before_device_lookup() {
    // Серийный номер не существует: ошибка конфигурации должна прийти раньше
    let config = RecorderConfig {
        channel_capacity: 0,
        ..sim_config(Some("0000000X0"))
    };
    let err = open_for_recording(&config).err().unwrap();
    assert!(matches!(err, RecorderError::Config(_)), "{err:?}");

    let spec = open_for_recording(&sim_config(Some("1102185U1"))).unwrap();
    assert_eq!(spec.num_pixels(), 2048);
}

#[test]
fn test_record_nir_device_from_json_config() {
    let output = NamedTempFile::new().unwrap();
    let mut meas_file = NamedTempFile::new().unwrap();

    let meas = MeasConfig {
        start_pixel: 10,
        stop_pixel: 249,
        integration_time: 4.0,
        nr_averages: 2,
        ..MeasConfig::default()
    };
    meas_file
        .write_all(serde_json::to_string(&meas).unwrap().as_bytes())
        .unwrap();

    let config = RecorderConfig {
        meas: Some(load_meas_config(meas_file.path()).unwrap()),
        output_path: output.path().to_path_buf(),
        ..sim_config(Some("1203077U1"))
    };

    let spec = open_spectrometer(&config).unwrap();
    let (pipeline, metrics) = RecordingPipeline::new(config);
    pipeline.run(spec).unwrap();

    let mut reader = ScanReader::new(File::open(output.path()).unwrap()).unwrap();
    let scans = read_all_scans(&mut reader).unwrap();

    let header = reader.header();
    assert_eq!(header.serial, "1203077U1");
    assert_eq!((header.start_pixel, header.stop_pixel), (10, 249));
    assert_eq!(header.nr_averages, 2);
    assert_eq!(header.scan_count, 4);
    assert!(header.timestamp_end >= header.timestamp_start);

    // NIR256: длины волн растут от ~900 нм
    let wl = reader.wavelengths();
    assert_eq!(wl.len(), 240);
    assert!(wl[0] > 900.0 && wl.windows(2).all(|w| w[1] > w[0]));

    assert_eq!(scans.len(), 4);
    assert!(scans.iter().all(|s| s.saturated.iter().all(|n| *n <= 2)));
    assert_eq!(metrics.scans_written.load(Ordering::Relaxed), 4);
}
