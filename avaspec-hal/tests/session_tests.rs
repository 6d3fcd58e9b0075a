#![cfg(feature = "sim")]

use std::time::{Duration, Instant};

use avaspec_core::ConfigImage;
use avaspec_hal::{Avs, SimDevice, SimulatedDriver, Spectrometer};
use avaspec_types::{
    AvsStatus, InitPort, SdCard, SensorType, SpectrumType, TimeStamp, MAX_PIXEL_VALUE,
};
use tempfile::NamedTempFile;

// ===========================================================================
// Helpers
// ===========================================================================

fn open_sim() -> Avs {
    let driver = SimulatedDriver::empty()
        .with_device(SimDevice::avaspec_2048("1102185U1"))
        .with_device(SimDevice::new(
            "0904113U1",
            "AvaSpec-3648",
            SensorType::Tcd1304,
            3648,
            [177.0, 0.247, -8.0e-6, 0.0, 0.0],
        ))
        .with_seed(42);
    Avs::open(Box::new(driver), InitPort::Usb).unwrap()
}

fn wait_scan(spec: &Spectrometer) {
    let deadline = Instant::now() + Duration::from_secs(3);
    while !spec.poll_scan().unwrap() {
        assert!(Instant::now() < deadline, "scan timed out");
        std::thread::sleep(Duration::from_millis(1));
    }
}

// ===========================================================================
// Измерения
// ===========================================================================

#[test]
fn test_expose_full_detector() {
    let avs = open_sim();
    let mut spec = avs.activate_serial("0904113U1").unwrap();

    let scope = spec.expose(4.0).unwrap();
    assert_eq!(scope.values.len(), 3648);
    assert!(scope
        .values
        .iter()
        .all(|v| (0.0..=MAX_PIXEL_VALUE as f64).contains(v)));

    let lambda = spec.lambda().unwrap();
    assert_eq!(lambda.len(), 3648);
}

#[test]
fn test_continuous_measurement_time_labels() {
    let avs = open_sim();
    let mut spec = avs.activate_serial("1102185U1").unwrap();

    let mut meas = spec.default_meas_config();
    meas.integration_time = 15.0;
    spec.prepare(&meas).unwrap();
    spec.measure(-1).unwrap();

    let mut labels = Vec::new();
    for _ in 0..3 {
        wait_scan(&spec);
        labels.push(spec.scope_data().unwrap().time_label);
    }
    spec.stop_measure().unwrap();

    assert!(labels.windows(2).all(|w| w[1] >= w[0]), "{labels:?}");
    assert!(!spec.is_measuring());
}

#[test]
fn test_expose_while_measuring_is_pending() {
    let avs = open_sim();
    let mut spec = avs.activate_first().unwrap();

    let mut meas = spec.default_meas_config();
    meas.integration_time = 500.0;
    spec.prepare(&meas).unwrap();
    spec.measure(-1).unwrap();

    assert!(spec
        .expose(1.0)
        .unwrap_err()
        .is(AvsStatus::OperationPending));
}

// ===========================================================================
// Параметры прибора
// ===========================================================================

#[test]
fn test_config_backup_and_restore() {
    let tmp = NamedTempFile::new().unwrap();
    let avs = open_sim();
    let mut spec = avs.activate_serial("1102185U1").unwrap();

    let original = spec.parameter().unwrap();
    ConfigImage::new(spec.serial(), original.clone())
        .save(tmp.path())
        .unwrap();

    let mut changed = original.clone();
    changed.user_friendly_id = "scratch".into();
    spec.set_parameter(&changed).unwrap();
    assert_eq!(spec.parameter().unwrap().user_friendly_id, "scratch");

    let image = ConfigImage::load(tmp.path()).unwrap();
    assert_eq!(image.serial, "1102185U1");
    spec.set_parameter(&image.config).unwrap();
    assert_eq!(spec.parameter().unwrap(), original);
}

#[test]
fn test_set_parameter_changes_pixel_count() {
    let avs = open_sim();
    let mut spec = avs.activate_serial("1102185U1").unwrap();
    spec.prepare(&spec.default_meas_config()).unwrap();

    let mut cfg = spec.parameter().unwrap();
    cfg.detector.nr_pixels = 1024;
    spec.set_parameter(&cfg).unwrap();

    assert_eq!(spec.num_pixels(), 1024);
    assert!(spec.prepared().is_none());
    assert_eq!(spec.default_meas_config().stop_pixel, 1023);
}

// ===========================================================================
// SD карта
// ===========================================================================

#[test]
fn test_sd_card_download() {
    let avs = open_sim();
    let mut spec = avs.activate_serial("1102185U1").unwrap();

    spec.set_directory("LAB").unwrap();
    spec.save_spectra_to_sd_card(&SdCard {
        enable: true,
        spectrum_type: SpectrumType::Dark.as_u8(),
        file_root_name: "DARK".into(),
        timestamp: TimeStamp::from_ymd_hms(2024, 3, 14, 9, 26, 52).unwrap(),
    })
    .unwrap();

    let mut meas = spec.default_meas_config();
    meas.integration_time = 2.0;
    spec.prepare(&meas).unwrap();
    spec.measure(2).unwrap();

    let deadline = Instant::now() + Duration::from_secs(3);
    while spec.sd_files().count() < 2 {
        assert!(Instant::now() < deadline, "spectra not saved");
        spec.poll_scan().unwrap();
        std::thread::sleep(Duration::from_millis(1));
    }

    let files: Vec<String> = spec.sd_files().map(Result::unwrap).collect();
    assert_eq!(files, vec!["DARK00.DRK", "DARK01.DRK"]);

    let data = spec.download("DARK01.DRK").unwrap();
    assert_eq!(data.len(), 16 + 2048 * 8);
    assert_eq!(&data[2..4], &2047u16.to_le_bytes());

    for name in &files {
        spec.delete_file(name).unwrap();
    }
    assert_eq!(spec.sd_files().count(), 0);
    spec.delete_directory("LAB").unwrap();
}

// ===========================================================================
// Жизненный цикл
// ===========================================================================

#[test]
fn test_spectrometer_outlives_session_handle() {
    let spec = {
        let avs = open_sim();
        avs.activate_first().unwrap()
    };

    // Библиотека закрывается только после освобождения прибора
    assert_eq!(spec.num_pixels(), 2048);
    assert!(spec.version_info().unwrap().dll.starts_with("sim-"));
}
