use std::fs::{self, File};

use avaspec_core::{
    crc32_checksum, read_all_scans, ConfigImage, RecordingHeader, ScanReader, ScanRecord,
    ScanWriter, Wire, IMAGE_HEADER_SIZE, RECORDING_HEADER_SIZE,
};
use avaspec_types::{
    AvsError, AvsIdentity, DeviceConfig, DeviceStatus, MeasConfig, SensorType, TimeStamp,
    DEVICE_CONFIG_SIZE, IDENTITY_SIZE, USER_ID_LEN,
};
use tempfile::NamedTempFile;

// ===========================================================================
// Helpers: детерминированные тест-данные
// ===========================================================================

/// Детерминированный заголовок (timestamp_start фиксирован, не Now).
fn deterministic_header(pixels: u16) -> RecordingHeader {
    let mut meas = MeasConfig::for_pixels(pixels);
    meas.integration_time = 20.0;
    meas.nr_averages = 5;

    let mut h = RecordingHeader::new("1102185U1", &meas);
    h.timestamp_start = 1_704_067_200; // 2024-01-01 00:00:00 UTC
    h
}

/// Детерминированный скан: гауссов пик на пилообразном фоне.
fn deterministic_scan(
    index: u32,
    pixels: usize,
) -> ScanRecord {
    let values = (0..pixels)
        .map(|i| {
            let x = i as f64 - pixels as f64 / 2.0;
            1000.0 + (i % 16) as f64 + 30_000.0 * (-x * x / 50.0).exp()
        })
        .collect();
    let saturated = (0..pixels).map(|i| (i == pixels / 2) as u8).collect();
    ScanRecord::new(
        index * 2,
        1_704_067_200_000_000_000 + index as u64 * 20_000_000,
        values,
        saturated,
    )
}

fn linear_wavelengths(pixels: usize) -> Vec<f64> {
    (0..pixels).map(|i| 350.0 + i as f64 * 0.25).collect()
}

fn calibrated_config() -> DeviceConfig {
    let mut cfg = DeviceConfig::default();
    cfg.user_friendly_id = "AvaSpec-2048".into();
    cfg.detector.sensor_type = SensorType::Ilx554;
    cfg.detector.nr_pixels = 2048;
    cfg.detector.fit = [175.3, 0.5, -1.2e-5, 0.0, 0.0];
    cfg.detector.defective_pixels[0] = 17;
    cfg.stand_alone.nmsr = -1;
    cfg.stand_alone.sd_card.file_root_name = "RUN".into();
    cfg.stand_alone.sd_card.timestamp = TimeStamp::from_ymd_hms(2024, 1, 1, 12, 0, 0).unwrap();
    for (i, v) in cfg.spectrum_correct.spectrum_correct.iter_mut().enumerate() {
        *v = 1.0 + i as f32 * 1e-4;
    }
    cfg
}

// ===========================================================================
// Файлы записи
// ===========================================================================

#[test]
fn test_recording_file_round_trip() {
    let tmp = NamedTempFile::new().unwrap();
    let pixels = 512;

    let mut writer = ScanWriter::new(
        File::create(tmp.path()).unwrap(),
        deterministic_header(pixels as u16),
        &linear_wavelengths(pixels),
    )
    .unwrap();

    for i in 0..20 {
        writer.write_scan(&deterministic_scan(i, pixels)).unwrap();
    }
    let expected_bytes = writer.bytes_written();
    let header = writer.finish().unwrap();

    assert_eq!(header.scan_count, 20);
    assert!(header.timestamp_end >= header.timestamp_start);
    assert_eq!(fs::metadata(tmp.path()).unwrap().len(), expected_bytes);

    let mut reader = ScanReader::new(File::open(tmp.path()).unwrap()).unwrap();
    assert_eq!(reader.header().serial, "1102185U1");
    assert_eq!(reader.header().integration_time, 20.0);
    assert_eq!(reader.header().nr_averages, 5);
    assert_eq!(reader.wavelengths()[4], 351.0);

    let scans = read_all_scans(&mut reader).unwrap();
    assert_eq!(scans.len(), 20);
    assert_eq!(scans[19], deterministic_scan(19, pixels));
    assert_eq!(scans[0].saturated_pixels(), 1);
    reader.validate_totals().unwrap();
}

#[test]
fn test_recording_survives_corruption_in_file() {
    let tmp = NamedTempFile::new().unwrap();
    let pixels = 64;

    {
        let mut writer = ScanWriter::new(
            File::create(tmp.path()).unwrap(),
            deterministic_header(pixels as u16),
            &linear_wavelengths(pixels),
        )
        .unwrap();
        for i in 0..4 {
            writer.write_scan(&deterministic_scan(i, pixels)).unwrap();
        }
        writer.finish().unwrap();
    }

    // Портим значения третьего скана
    let mut raw = fs::read(tmp.path()).unwrap();
    let block_len = deterministic_scan(0, pixels).serialize().unwrap().len();
    let wl_len = 4 + pixels * 8 + 4;
    let third = RECORDING_HEADER_SIZE + wl_len + 2 * block_len;
    raw[third + 40] ^= 0xA5;
    fs::write(tmp.path(), &raw).unwrap();

    let mut reader = ScanReader::new(File::open(tmp.path()).unwrap()).unwrap();
    let labels: Vec<u32> = read_all_scans(&mut reader)
        .unwrap()
        .iter()
        .map(|s| s.time_label)
        .collect();

    assert_eq!(labels, vec![0, 2, 6]);
    assert_eq!(reader.stats().scans_corrupted, 1);
    assert!(reader.validate_totals().is_err());
}

#[test]
fn test_recording_rejects_foreign_file() {
    let tmp = NamedTempFile::new().unwrap();
    fs::write(tmp.path(), vec![0u8; 256]).unwrap();

    let result = ScanReader::new(File::open(tmp.path()).unwrap());
    assert!(matches!(result, Err(AvsError::InvalidMagic(_))));
}

// ===========================================================================
// Образы конфигурации
// ===========================================================================

#[test]
fn test_config_image_file_round_trip() {
    let tmp = NamedTempFile::new().unwrap();
    let image = ConfigImage::new("1102185U1", calibrated_config());

    image.save(tmp.path()).unwrap();
    let loaded = ConfigImage::load(tmp.path()).unwrap();

    assert_eq!(loaded, image);
    assert_eq!(loaded.config.detector.sensor_type, SensorType::Ilx554);
    assert_eq!(
        loaded.config.stand_alone.sd_card.timestamp.to_string(),
        "2024-01-01 12:00:00"
    );
}

#[test]
fn test_config_image_payload_matches_codec() {
    let cfg = calibrated_config();
    let image = ConfigImage::new("X", cfg.clone()).to_bytes().unwrap();
    let payload = cfg.to_bytes().unwrap();

    assert_eq!(payload.len(), DEVICE_CONFIG_SIZE);
    assert_eq!(&image[image.len() - DEVICE_CONFIG_SIZE..], payload.as_slice());
}

#[test]
fn test_config_image_truncated_file() {
    let tmp = NamedTempFile::new().unwrap();
    let bytes = ConfigImage::new("X", calibrated_config()).to_bytes().unwrap();
    fs::write(tmp.path(), &bytes[..bytes.len() - 1]).unwrap();

    assert!(matches!(
        ConfigImage::load(tmp.path()),
        Err(AvsError::Truncated { .. })
    ));
}

// ===========================================================================
// Буферы прибора байт в байт
// ===========================================================================

/// Буфер конфигурации, какой может прислать прибор: имя в Latin-1,
/// мусор после NUL в `UserFriendlyId` и в корне имени файла SD.
fn device_config_bytes() -> Vec<u8> {
    let mut raw = calibrated_config().to_bytes().unwrap();

    let id = &mut raw[4..4 + USER_ID_LEN];
    id.fill(0);
    id[..40].fill(0xE9);
    id[41..48].copy_from_slice(b"garbage");

    let root = raw
        .windows(6)
        .position(|w| w == b"RUN\0\0\0")
        .unwrap();
    raw[root + 3..root + 6].copy_from_slice(&[0, 0xFF, b'x']);
    raw
}

#[test]
fn test_device_config_bytes_survive_decode_encode() {
    let raw = device_config_bytes();
    let cfg = DeviceConfig::from_bytes(&raw).unwrap();

    assert_eq!(cfg.user_friendly_id.to_text(), "é".repeat(40));
    assert_eq!(cfg.stand_alone.sd_card.file_root_name, "RUN");
    assert_eq!(cfg.to_bytes().unwrap(), raw);
}

#[test]
fn test_identity_bytes_survive_decode_encode() {
    let mut raw = vec![0u8; IDENTITY_SIZE];
    raw[..6].copy_from_slice(b"AB\0zz\x01");
    raw[10..13].copy_from_slice(&[b'L', 0xE4, b'b']);
    raw[20] = b'!';
    raw[IDENTITY_SIZE - 1] = 9;

    let id = AvsIdentity::from_bytes(&raw).unwrap();
    assert_eq!(id.serial_number, "AB");
    assert_eq!(id.user_friendly_name.to_text(), "Läb");
    assert_eq!(id.status, DeviceStatus::Unknown(9));
    assert_eq!(id.to_bytes().unwrap(), raw);
}

#[test]
fn test_config_image_bytes_survive_decode_encode() {
    let payload = device_config_bytes();
    let mut raw = ConfigImage::new("1102185U1", calibrated_config())
        .to_bytes()
        .unwrap();
    raw[8..18].copy_from_slice(b"1102185\0\xC5q");
    raw[22..26].copy_from_slice(&crc32_checksum(&payload).to_le_bytes());
    raw.truncate(IMAGE_HEADER_SIZE);
    raw.extend_from_slice(&payload);

    let image = ConfigImage::from_bytes(&raw).unwrap();
    assert_eq!(image.serial, "1102185");
    assert_eq!(image.to_bytes().unwrap(), raw);
}
