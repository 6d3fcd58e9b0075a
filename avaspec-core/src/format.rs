//! Упакованное представление структур AS5216.
//!
//! Все поля пишутся подряд, без выравнивания, в порядке little-endian
//! (`#pragma pack(1)` на x86). Результат побайтно совпадает со структурами
//! `avaspec-sys`.

use avaspec_types::{
    AvsError, AvsIdentity, AvsResult, ControlSettings, DarkCorrection, Detector, DeviceConfig,
    DeviceStatus, Irradiance, MeasConfig, ProcessControl, SdCard, SensorType, Smoothing,
    SpectrumCalibration, SpectrumCorrection, StandAlone, TecControl, TempSensor, TimeStamp,
    Trigger, AVS_SERIAL_LEN, CONTROL_SETTINGS_SIZE, DARK_CORRECTION_SIZE, DETECTOR_SIZE,
    DEVICE_CONFIG_SIZE, IDENTITY_SIZE, IRRADIANCE_SIZE, MAX_NR_PIXELS, MAX_TEMP_SENSORS,
    MEAS_CONFIG_SIZE, PROCESS_CONTROL_SIZE, ROOT_NAME_LEN, SD_CARD_SIZE, SETTINGS_RESERVED_LEN,
    SMOOTHING_SIZE, SPECTRUM_CALIBRATION_SIZE, SPECTRUM_CORRECTION_SIZE, STAND_ALONE_SIZE,
    TEC_CONTROL_SIZE, TEMP_SENSOR_SIZE, TIME_STAMP_SIZE, TRIGGER_SIZE, USER_ID_LEN,
};
use crc32fast::Hasher;

use crate::binary::{WireReader, WireWriter};

/// Структура с фиксированным упакованным представлением.
pub trait Wire: Sized {
    /// Размер в байтах
    const SIZE: usize;

    fn encode(
        &self,
        w: &mut WireWriter,
    ) -> AvsResult<()>;

    fn decode(r: &mut WireReader<'_>) -> AvsResult<Self>;

    /// Сериализация ровно в `SIZE` байт.
    fn to_bytes(&self) -> AvsResult<Vec<u8>> {
        let mut w = WireWriter::with_capacity(Self::SIZE);
        self.encode(&mut w)?;

        if w.len() != Self::SIZE {
            return Err(AvsError::format_violation(format!(
                "encoded {} bytes, structure is {}",
                w.len(),
                Self::SIZE
            )));
        }

        Ok(w.into_inner())
    }

    /// Десериализация из буфера длиной ровно `SIZE` байт.
    fn from_bytes(buf: &[u8]) -> AvsResult<Self> {
        if buf.len() < Self::SIZE {
            return Err(AvsError::Truncated {
                needed: Self::SIZE,
                found: buf.len(),
            });
        }

        if buf.len() > Self::SIZE {
            return Err(AvsError::format_violation(format!(
                "buffer is {} bytes, structure is {}",
                buf.len(),
                Self::SIZE
            )));
        }

        let mut r = WireReader::new(buf);
        Self::decode(&mut r)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Параметры измерения
////////////////////////////////////////////////////////////////////////////////

impl Wire for ControlSettings {
    const SIZE: usize = CONTROL_SETTINGS_SIZE;

    fn encode(
        &self,
        w: &mut WireWriter,
    ) -> AvsResult<()> {
        w.u16(self.strobe_control)?;
        w.u32(self.laser_delay)?;
        w.u32(self.laser_width)?;
        w.f32(self.laser_wavelength)?;
        w.u16(self.store_to_ram)
    }

    fn decode(r: &mut WireReader<'_>) -> AvsResult<Self> {
        Ok(Self {
            strobe_control: r.u16()?,
            laser_delay: r.u32()?,
            laser_width: r.u32()?,
            laser_wavelength: r.f32()?,
            store_to_ram: r.u16()?,
        })
    }
}

impl Wire for DarkCorrection {
    const SIZE: usize = DARK_CORRECTION_SIZE;

    fn encode(
        &self,
        w: &mut WireWriter,
    ) -> AvsResult<()> {
        w.u8(self.enable)?;
        w.u8(self.forget_percentage)
    }

    fn decode(r: &mut WireReader<'_>) -> AvsResult<Self> {
        Ok(Self {
            enable: r.u8()?,
            forget_percentage: r.u8()?,
        })
    }
}

impl Wire for Smoothing {
    const SIZE: usize = SMOOTHING_SIZE;

    fn encode(
        &self,
        w: &mut WireWriter,
    ) -> AvsResult<()> {
        w.u16(self.smooth_pix)?;
        w.u8(self.smooth_model)
    }

    fn decode(r: &mut WireReader<'_>) -> AvsResult<Self> {
        Ok(Self {
            smooth_pix: r.u16()?,
            smooth_model: r.u8()?,
        })
    }
}

impl Wire for Trigger {
    const SIZE: usize = TRIGGER_SIZE;

    fn encode(
        &self,
        w: &mut WireWriter,
    ) -> AvsResult<()> {
        w.u8(self.mode)?;
        w.u8(self.source)?;
        w.u8(self.source_type)
    }

    fn decode(r: &mut WireReader<'_>) -> AvsResult<Self> {
        Ok(Self {
            mode: r.u8()?,
            source: r.u8()?,
            source_type: r.u8()?,
        })
    }
}

impl Wire for MeasConfig {
    const SIZE: usize = MEAS_CONFIG_SIZE;

    fn encode(
        &self,
        w: &mut WireWriter,
    ) -> AvsResult<()> {
        w.u16(self.start_pixel)?;
        w.u16(self.stop_pixel)?;
        w.f32(self.integration_time)?;
        w.u32(self.integration_delay)?;
        w.u32(self.nr_averages)?;
        self.cor_dyn_dark.encode(w)?;
        self.smoothing.encode(w)?;
        w.u8(self.saturation_detection)?;
        self.trigger.encode(w)?;
        self.control.encode(w)
    }

    fn decode(r: &mut WireReader<'_>) -> AvsResult<Self> {
        Ok(Self {
            start_pixel: r.u16()?,
            stop_pixel: r.u16()?,
            integration_time: r.f32()?,
            integration_delay: r.u32()?,
            nr_averages: r.u32()?,
            cor_dyn_dark: DarkCorrection::decode(r)?,
            smoothing: Smoothing::decode(r)?,
            saturation_detection: r.u8()?,
            trigger: Trigger::decode(r)?,
            control: ControlSettings::decode(r)?,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////
// Калибровки
////////////////////////////////////////////////////////////////////////////////

impl Wire for Detector {
    const SIZE: usize = DETECTOR_SIZE;

    fn encode(
        &self,
        w: &mut WireWriter,
    ) -> AvsResult<()> {
        w.u8(self.sensor_type.as_u8())?;
        w.u16(self.nr_pixels)?;
        w.f32_slice(&self.fit)?;
        w.bool(self.nl_enable)?;
        w.f64_slice(&self.nl_correct)?;
        w.f64(self.low_nl_counts)?;
        w.f64(self.high_nl_counts)?;
        w.f32_slice(&self.gain)?;
        w.f32(self.reserved)?;
        w.f32_slice(&self.offset)?;
        w.f32(self.ext_offset)?;
        w.u16_slice(&self.defective_pixels)
    }

    fn decode(r: &mut WireReader<'_>) -> AvsResult<Self> {
        Ok(Self {
            sensor_type: SensorType::from_u8(r.u8()?),
            nr_pixels: r.u16()?,
            fit: r.f32_array()?,
            nl_enable: r.bool()?,
            nl_correct: r.f64_array()?,
            low_nl_counts: r.f64()?,
            high_nl_counts: r.f64()?,
            gain: r.f32_array()?,
            reserved: r.f32()?,
            offset: r.f32_array()?,
            ext_offset: r.f32()?,
            defective_pixels: r.u16_array()?,
        })
    }
}

impl Wire for SpectrumCalibration {
    const SIZE: usize = SPECTRUM_CALIBRATION_SIZE;

    fn encode(
        &self,
        w: &mut WireWriter,
    ) -> AvsResult<()> {
        check_table("calib_convers", &self.calib_convers)?;
        self.smoothing.encode(w)?;
        w.f32(self.cal_int_time)?;
        w.f32_slice(&self.calib_convers)
    }

    fn decode(r: &mut WireReader<'_>) -> AvsResult<Self> {
        Ok(Self {
            smoothing: Smoothing::decode(r)?,
            cal_int_time: r.f32()?,
            calib_convers: r.f32_vec(MAX_NR_PIXELS)?,
        })
    }
}

impl Wire for Irradiance {
    const SIZE: usize = IRRADIANCE_SIZE;

    fn encode(
        &self,
        w: &mut WireWriter,
    ) -> AvsResult<()> {
        self.intensity_calib.encode(w)?;
        w.u8(self.calibration_type)?;
        w.u32(self.fiber_diameter)
    }

    fn decode(r: &mut WireReader<'_>) -> AvsResult<Self> {
        Ok(Self {
            intensity_calib: SpectrumCalibration::decode(r)?,
            calibration_type: r.u8()?,
            fiber_diameter: r.u32()?,
        })
    }
}

impl Wire for SpectrumCorrection {
    const SIZE: usize = SPECTRUM_CORRECTION_SIZE;

    fn encode(
        &self,
        w: &mut WireWriter,
    ) -> AvsResult<()> {
        check_table("spectrum_correct", &self.spectrum_correct)?;
        w.f32_slice(&self.spectrum_correct)
    }

    fn decode(r: &mut WireReader<'_>) -> AvsResult<Self> {
        Ok(Self {
            spectrum_correct: r.f32_vec(MAX_NR_PIXELS)?,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////
// Автономный режим и SD карта
////////////////////////////////////////////////////////////////////////////////

impl Wire for TimeStamp {
    const SIZE: usize = TIME_STAMP_SIZE;

    fn encode(
        &self,
        w: &mut WireWriter,
    ) -> AvsResult<()> {
        w.u16(self.date)?;
        w.u16(self.time)
    }

    fn decode(r: &mut WireReader<'_>) -> AvsResult<Self> {
        Ok(Self {
            date: r.u16()?,
            time: r.u16()?,
        })
    }
}

impl Wire for SdCard {
    const SIZE: usize = SD_CARD_SIZE;

    fn encode(
        &self,
        w: &mut WireWriter,
    ) -> AvsResult<()> {
        w.bool(self.enable)?;
        w.u8(self.spectrum_type)?;
        w.fixed_raw(&self.file_root_name, ROOT_NAME_LEN)?;
        self.timestamp.encode(w)
    }

    fn decode(r: &mut WireReader<'_>) -> AvsResult<Self> {
        Ok(Self {
            enable: r.bool()?,
            spectrum_type: r.u8()?,
            file_root_name: r.fixed_raw(ROOT_NAME_LEN)?,
            timestamp: TimeStamp::decode(r)?,
        })
    }
}

impl Wire for StandAlone {
    const SIZE: usize = STAND_ALONE_SIZE;

    fn encode(
        &self,
        w: &mut WireWriter,
    ) -> AvsResult<()> {
        w.bool(self.enable)?;
        self.meas.encode(w)?;
        w.i16(self.nmsr)?;
        self.sd_card.encode(w)
    }

    fn decode(r: &mut WireReader<'_>) -> AvsResult<Self> {
        Ok(Self {
            enable: r.bool()?,
            meas: MeasConfig::decode(r)?,
            nmsr: r.i16()?,
            sd_card: SdCard::decode(r)?,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////
// Температура и контроль процесса
////////////////////////////////////////////////////////////////////////////////

impl Wire for TempSensor {
    const SIZE: usize = TEMP_SENSOR_SIZE;

    fn encode(
        &self,
        w: &mut WireWriter,
    ) -> AvsResult<()> {
        w.f32_slice(&self.fit)
    }

    fn decode(r: &mut WireReader<'_>) -> AvsResult<Self> {
        Ok(Self {
            fit: r.f32_array()?,
        })
    }
}

impl Wire for TecControl {
    const SIZE: usize = TEC_CONTROL_SIZE;

    fn encode(
        &self,
        w: &mut WireWriter,
    ) -> AvsResult<()> {
        w.bool(self.enable)?;
        w.f32(self.setpoint)?;
        w.f32_slice(&self.fit)
    }

    fn decode(r: &mut WireReader<'_>) -> AvsResult<Self> {
        Ok(Self {
            enable: r.bool()?,
            setpoint: r.f32()?,
            fit: r.f32_array()?,
        })
    }
}

impl Wire for ProcessControl {
    const SIZE: usize = PROCESS_CONTROL_SIZE;

    fn encode(
        &self,
        w: &mut WireWriter,
    ) -> AvsResult<()> {
        w.f32_slice(&self.analog_low)?;
        w.f32_slice(&self.analog_high)?;
        w.f32_slice(&self.digital_low)?;
        w.f32_slice(&self.digital_high)
    }

    fn decode(r: &mut WireReader<'_>) -> AvsResult<Self> {
        Ok(Self {
            analog_low: r.f32_array()?,
            analog_high: r.f32_array()?,
            digital_low: r.f32_array()?,
            digital_high: r.f32_array()?,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////
// Конфигурация прибора и идентификация
////////////////////////////////////////////////////////////////////////////////

impl Wire for DeviceConfig {
    const SIZE: usize = DEVICE_CONFIG_SIZE;

    fn encode(
        &self,
        w: &mut WireWriter,
    ) -> AvsResult<()> {
        self.validate_layout()?;

        w.u16(self.len)?;
        w.u16(self.config_version)?;
        w.fixed_raw(&self.user_friendly_id, USER_ID_LEN)?;
        self.detector.encode(w)?;
        self.irradiance.encode(w)?;
        self.reflectance.encode(w)?;
        self.spectrum_correct.encode(w)?;
        self.stand_alone.encode(w)?;
        for sensor in &self.temperature {
            sensor.encode(w)?;
        }
        self.tec_control.encode(w)?;
        self.process_control.encode(w)?;
        w.bytes(&self.reserved)
    }

    fn decode(r: &mut WireReader<'_>) -> AvsResult<Self> {
        let len = r.u16()?;
        let config_version = r.u16()?;
        let user_friendly_id = r.fixed_raw(USER_ID_LEN)?;
        let detector = Detector::decode(r)?;
        let irradiance = Irradiance::decode(r)?;
        let reflectance = SpectrumCalibration::decode(r)?;
        let spectrum_correct = SpectrumCorrection::decode(r)?;
        let stand_alone = StandAlone::decode(r)?;

        let mut temperature = [TempSensor::default(); MAX_TEMP_SENSORS];
        for sensor in temperature.iter_mut() {
            *sensor = TempSensor::decode(r)?;
        }

        Ok(Self {
            len,
            config_version,
            user_friendly_id,
            detector,
            irradiance,
            reflectance,
            spectrum_correct,
            stand_alone,
            temperature,
            tec_control: TecControl::decode(r)?,
            process_control: ProcessControl::decode(r)?,
            reserved: r.bytes(SETTINGS_RESERVED_LEN)?,
        })
    }
}

impl Wire for AvsIdentity {
    const SIZE: usize = IDENTITY_SIZE;

    fn encode(
        &self,
        w: &mut WireWriter,
    ) -> AvsResult<()> {
        w.fixed_raw(&self.serial_number, AVS_SERIAL_LEN)?;
        w.fixed_raw(&self.user_friendly_name, USER_ID_LEN)?;
        w.u8(self.status.as_u8())
    }

    fn decode(r: &mut WireReader<'_>) -> AvsResult<Self> {
        Ok(Self {
            serial_number: r.fixed_raw(AVS_SERIAL_LEN)?,
            user_friendly_name: r.fixed_raw(USER_ID_LEN)?,
            status: DeviceStatus::from_u8(r.u8()?),
        })
    }
}

/// Декодирует список идентификаций, записанных подряд.
pub fn decode_identity_list(buf: &[u8]) -> AvsResult<Vec<AvsIdentity>> {
    if buf.len() % IDENTITY_SIZE != 0 {
        return Err(AvsError::format_violation(format!(
            "identity list of {} bytes is not a multiple of {IDENTITY_SIZE}",
            buf.len()
        )));
    }

    buf.chunks_exact(IDENTITY_SIZE)
        .map(AvsIdentity::from_bytes)
        .collect()
}

/// CRC32 (IEEE 802.3 / crc32fast)
pub fn crc32_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

fn check_table(
    name: &str,
    table: &[f32],
) -> AvsResult<()> {
    if table.len() != MAX_NR_PIXELS {
        return Err(AvsError::format_violation(format!(
            "{name} has {} entries, expected {MAX_NR_PIXELS}",
            table.len()
        )));
    }
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use avaspec_types::{AvsStatus, SW_TRIGGER_MODE};

    use super::*;

    fn sample_meas() -> MeasConfig {
        MeasConfig {
            start_pixel: 10,
            stop_pixel: 2037,
            integration_time: 12.5,
            integration_delay: 3,
            nr_averages: 4,
            cor_dyn_dark: DarkCorrection {
                enable: 1,
                forget_percentage: 75,
            },
            smoothing: Smoothing {
                smooth_pix: 3,
                smooth_model: 0,
            },
            saturation_detection: 1,
            trigger: Trigger {
                mode: SW_TRIGGER_MODE,
                source: 0,
                source_type: 0,
            },
            control: ControlSettings {
                strobe_control: 2,
                laser_delay: 100,
                laser_width: 200,
                laser_wavelength: 785.0,
                store_to_ram: 0,
            },
        }
    }

    #[test]
    fn test_encoded_sizes() {
        assert_eq!(sample_meas().to_bytes().unwrap().len(), 41);
        assert_eq!(Detector::default().to_bytes().unwrap().len(), 188);
        assert_eq!(SdCard::default().to_bytes().unwrap().len(), 12);
        assert_eq!(StandAlone::default().to_bytes().unwrap().len(), 56);
        assert_eq!(TecControl::default().to_bytes().unwrap().len(), 13);
        assert_eq!(ProcessControl::default().to_bytes().unwrap().len(), 96);
        assert_eq!(AvsIdentity::new("1102185U1").to_bytes().unwrap().len(), 75);
        assert_eq!(DeviceConfig::default().to_bytes().unwrap().len(), 63_484);
    }

    #[test]
    fn test_meas_config_byte_layout() {
        let bytes = sample_meas().to_bytes().unwrap();

        assert_eq!(&bytes[0..2], &[10, 0], "start_pixel");
        assert_eq!(&bytes[2..4], &2037u16.to_le_bytes(), "stop_pixel");
        assert_eq!(&bytes[4..8], &12.5f32.to_le_bytes(), "integration_time");
        assert_eq!(&bytes[12..16], &4u32.to_le_bytes(), "nr_averages");
        assert_eq!(bytes[16], 1, "dyn dark enable");
        assert_eq!(bytes[17], 75, "forget percentage");
        assert_eq!(bytes[21], 1, "saturation detection");
        assert_eq!(&bytes[25..27], &2u16.to_le_bytes(), "strobe control");

        assert_eq!(MeasConfig::from_bytes(&bytes).unwrap(), sample_meas());
    }

    #[test]
    fn test_identity_layout() {
        let id = AvsIdentity {
            serial_number: "1102185U1".into(),
            user_friendly_name: "lab".into(),
            status: DeviceStatus::Available,
        };
        let bytes = id.to_bytes().unwrap();

        assert_eq!(&bytes[..9], b"1102185U1");
        assert_eq!(bytes[9], 0);
        assert_eq!(&bytes[10..13], b"lab");
        assert_eq!(bytes[74], 1);
        assert_eq!(AvsIdentity::from_bytes(&bytes).unwrap(), id);
    }

    #[test]
    fn test_identity_latin1_name_and_unknown_status() {
        let mut raw = vec![0u8; IDENTITY_SIZE];
        raw[..9].copy_from_slice(b"1102185U1");
        raw[10..50].fill(0xE9);
        raw[74] = 9;

        let id = AvsIdentity::from_bytes(&raw).unwrap();
        assert_eq!(id.user_friendly_name.to_text().chars().count(), 40);
        assert_eq!(id.status, DeviceStatus::Unknown(9));
        assert_eq!(id.to_bytes().unwrap(), raw);
    }

    #[test]
    fn test_identity_list() {
        let mut buf = AvsIdentity::new("A").to_bytes().unwrap();
        buf.extend(AvsIdentity::new("B").to_bytes().unwrap());

        let list = decode_identity_list(&buf).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].serial_number, "B");

        assert!(decode_identity_list(&buf[..100]).is_err());
    }

    #[test]
    fn test_long_serial_rejected() {
        let id = AvsIdentity::new("12345678901");
        assert!(matches!(id.to_bytes(), Err(AvsError::FormatViolation(_))));
    }

    #[test]
    fn test_truncated_decode() {
        let bytes = sample_meas().to_bytes().unwrap();
        match MeasConfig::from_bytes(&bytes[..40]) {
            Err(AvsError::Truncated { needed, found }) => {
                assert_eq!(needed, 41);
                assert_eq!(found, 40);
            }
            other => panic!("unexpected: {other:?}"),
        }

        let mut long = bytes.clone();
        long.push(0);
        assert!(matches!(
            MeasConfig::from_bytes(&long),
            Err(AvsError::FormatViolation(_))
        ));
    }

    #[test]
    fn test_device_config_keeps_reserved_bytes() {
        let mut cfg = DeviceConfig::default();
        cfg.user_friendly_id = "bench-2".into();
        cfg.detector.sensor_type = SensorType::Hams9201;
        cfg.detector.nr_pixels = 256;
        cfg.detector.fit = [900.0, 3.1, -0.001, 0.0, 0.0];
        cfg.reflectance.calib_convers[4095] = 1.5;
        cfg.stand_alone.meas = sample_meas();
        cfg.stand_alone.sd_card.file_root_name = "ROOT".into();
        cfg.reserved[0] = 0xAA;
        cfg.reserved[SETTINGS_RESERVED_LEN - 1] = 0x55;

        let bytes = cfg.to_bytes().unwrap();
        assert_eq!(bytes[bytes.len() - 1], 0x55);

        let back = DeviceConfig::from_bytes(&bytes).unwrap();
        assert_eq!(back, cfg);
        assert_eq!(back.detector.sensor_type, SensorType::Hams9201);
    }

    #[test]
    fn test_device_config_bad_table_rejected() {
        let mut cfg = DeviceConfig::default();
        cfg.spectrum_correct.spectrum_correct.truncate(10);
        let err = cfg.to_bytes().unwrap_err();
        assert!(!err.is(AvsStatus::InvalidSize));
        assert!(err.to_string().contains("spectrum_correct"));
    }

    #[test]
    fn test_nonzero_bool_decodes_true() {
        let mut bytes = TecControl::default().to_bytes().unwrap();
        bytes[0] = 0x7F;
        assert!(TecControl::from_bytes(&bytes).unwrap().enable);
    }
}
