//! Конфигурация прибора (`DeviceConfigType`) и вложенные структуры.
//!
//! Таблицы на `MAX_NR_PIXELS` значений хранятся в `Vec`, их длина
//! проверяется кодеком при сериализации ([`DeviceConfig::validate_layout`]).

use serde::{Deserialize, Serialize};

use crate::{
    consts::{
        MAX_NR_PIXELS, MAX_TEMP_SENSORS, MAX_VIDEO_CHANNELS, NR_ANALOG_LIMITS, NR_DAC_POL_COEF,
        NR_DEFECTIVE_PIXELS, NR_DIGITAL_LIMITS, NR_NONLIN_POL_COEF, NR_TEMP_POL_COEF,
        NR_WAVELEN_POL_COEF,
    },
    layout::{DEVICE_CONFIG_SIZE, SETTINGS_RESERVED_LEN},
    AvsError, AvsResult, AvsStatus, FixedStr, MeasConfig, SensorType,
};

/// Калибровка детектора (`DetectorType`, 188 байт).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detector {
    pub sensor_type: SensorType,
    pub nr_pixels: u16,
    /// Полином пиксель -> длина волны
    pub fit: [f32; NR_WAVELEN_POL_COEF],
    pub nl_enable: bool,
    /// Полином коррекции нелинейности
    pub nl_correct: [f64; NR_NONLIN_POL_COEF],
    pub low_nl_counts: f64,
    pub high_nl_counts: f64,
    pub gain: [f32; MAX_VIDEO_CHANNELS],
    pub reserved: f32,
    pub offset: [f32; MAX_VIDEO_CHANNELS],
    pub ext_offset: f32,
    pub defective_pixels: [u16; NR_DEFECTIVE_PIXELS],
}

/// Калибровочная кривая спектра (`SpectrumCalibrationType`, 16391 байт).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumCalibration {
    pub smoothing: crate::Smoothing,
    pub cal_int_time: f32,
    /// `MAX_NR_PIXELS` коэффициентов
    pub calib_convers: Vec<f32>,
}

/// Калибровка освещённости (`IrradianceType`, 16396 байт).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Irradiance {
    pub intensity_calib: SpectrumCalibration,
    pub calibration_type: u8,
    pub fiber_diameter: u32,
}

/// Поправочная кривая (`SpectrumCorrectionType`, 16384 байт).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumCorrection {
    /// `MAX_NR_PIXELS` коэффициентов
    pub spectrum_correct: Vec<f32>,
}

/// Дата и время файла в формате FAT (`TimeStampType`, 4 байта).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeStamp {
    pub date: u16,
    pub time: u16,
}

/// Тип спектра, сохраняемого на SD карту. Определяет расширение файла.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SpectrumType {
    Dark = 0,
    Reference = 1,
    Normal = 2,
}

/// Запись спектров на SD карту (`SDCardType`, 12 байт).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdCard {
    pub enable: bool,
    pub spectrum_type: u8,
    /// Корень имени файла, до 6 символов
    pub file_root_name: FixedStr,
    pub timestamp: TimeStamp,
}

/// Автономный режим (`StandAloneType`, 56 байт).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandAlone {
    pub enable: bool,
    pub meas: MeasConfig,
    pub nmsr: i16,
    pub sd_card: SdCard,
}

/// Полином термодатчика (`TempSensorType`, 20 байт).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TempSensor {
    pub fit: [f32; NR_TEMP_POL_COEF],
}

/// Термоэлектрический охладитель (`TecControlType`, 13 байт).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TecControl {
    pub enable: bool,
    /// Уставка, °C
    pub setpoint: f32,
    pub fit: [f32; NR_DAC_POL_COEF],
}

/// Пределы контроля процесса (`ProcessControlType`, 96 байт).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessControl {
    pub analog_low: [f32; NR_ANALOG_LIMITS],
    pub analog_high: [f32; NR_ANALOG_LIMITS],
    pub digital_low: [f32; NR_DIGITAL_LIMITS],
    pub digital_high: [f32; NR_DIGITAL_LIMITS],
}

/// Полный блок параметров прибора (`DeviceConfigType`, 62 КиБ - 4 байта).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub len: u16,
    pub config_version: u16,
    pub user_friendly_id: FixedStr,
    pub detector: Detector,
    pub irradiance: Irradiance,
    pub reflectance: SpectrumCalibration,
    pub spectrum_correct: SpectrumCorrection,
    pub stand_alone: StandAlone,
    pub temperature: [TempSensor; MAX_TEMP_SENSORS],
    pub tec_control: TecControl,
    pub process_control: ProcessControl,
    #[serde(skip, default = "reserved_region")]
    pub reserved: Vec<u8>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Detector {
    /// Проверка DeviceData, аналогичная проверке `AVS_SetParameter`.
    pub fn check(&self) -> AvsResult<()> {
        if self.nr_pixels == 0 || self.nr_pixels as usize > MAX_NR_PIXELS {
            return Err(AvsError::status(AvsStatus::InvalidParameterNrPixels));
        }

        if self.gain.iter().any(|g| !g.is_finite() || *g <= 0.0) {
            return Err(AvsError::status(AvsStatus::InvalidParameterAdcGain));
        }

        if self.offset.iter().any(|o| !o.is_finite()) || !self.ext_offset.is_finite() {
            return Err(AvsError::status(AvsStatus::InvalidParameterAdcOffset));
        }

        Ok(())
    }
}

impl Default for Detector {
    fn default() -> Self {
        Self {
            sensor_type: SensorType::Unknown(0),
            nr_pixels: 0,
            fit: [0.0; NR_WAVELEN_POL_COEF],
            nl_enable: false,
            nl_correct: [0.0; NR_NONLIN_POL_COEF],
            low_nl_counts: 0.0,
            high_nl_counts: 0.0,
            gain: [1.0; MAX_VIDEO_CHANNELS],
            reserved: 0.0,
            offset: [0.0; MAX_VIDEO_CHANNELS],
            ext_offset: 0.0,
            defective_pixels: [0; NR_DEFECTIVE_PIXELS],
        }
    }
}

impl Default for SpectrumCalibration {
    fn default() -> Self {
        Self {
            smoothing: crate::Smoothing::default(),
            cal_int_time: 0.0,
            calib_convers: vec![0.0; MAX_NR_PIXELS],
        }
    }
}

impl Default for Irradiance {
    fn default() -> Self {
        Self {
            intensity_calib: SpectrumCalibration::default(),
            calibration_type: 0,
            fiber_diameter: 0,
        }
    }
}

impl Default for SpectrumCorrection {
    fn default() -> Self {
        Self {
            spectrum_correct: vec![0.0; MAX_NR_PIXELS],
        }
    }
}

impl Default for StandAlone {
    fn default() -> Self {
        Self {
            enable: false,
            meas: MeasConfig::default(),
            nmsr: 0,
            sd_card: SdCard::default(),
        }
    }
}

impl TimeStamp {
    /// Упаковывает дату/время в формат FAT. Год от 1980 до 2107.
    pub fn from_ymd_hms(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> AvsResult<Self> {
        if !(1980..=2107).contains(&year)
            || !(1..=12).contains(&month)
            || !(1..=31).contains(&day)
            || hour > 23
            || minute > 59
            || second > 59
        {
            return Err(AvsError::format_violation(format!(
                "timestamp out of FAT range: {year}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
            )));
        }

        let date = ((year - 1980) << 9) | ((month as u16) << 5) | day as u16;
        let time = ((hour as u16) << 11) | ((minute as u16) << 5) | (second as u16 / 2);

        Ok(Self { date, time })
    }

    /// (год, месяц, день)
    pub fn ymd(&self) -> (u16, u8, u8) {
        (
            1980 + (self.date >> 9),
            ((self.date >> 5) & 0x0F) as u8,
            (self.date & 0x1F) as u8,
        )
    }

    /// (час, минута, секунда); секунды с шагом 2
    pub fn hms(&self) -> (u8, u8, u8) {
        (
            (self.time >> 11) as u8,
            ((self.time >> 5) & 0x3F) as u8,
            ((self.time & 0x1F) * 2) as u8,
        )
    }
}

impl std::fmt::Display for TimeStamp {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let (y, mo, d) = self.ymd();
        let (h, mi, s) = self.hms();
        write!(f, "{y:04}-{mo:02}-{d:02} {h:02}:{mi:02}:{s:02}")
    }
}

impl SpectrumType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(SpectrumType::Dark),
            1 => Some(SpectrumType::Reference),
            2 => Some(SpectrumType::Normal),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Расширение файла на SD карте.
    pub fn extension(&self) -> &'static str {
        match self {
            SpectrumType::Dark => "drk",
            SpectrumType::Reference => "ref",
            SpectrumType::Normal => "roh",
        }
    }
}

impl SdCard {
    pub fn spectrum_kind(&self) -> Option<SpectrumType> {
        SpectrumType::from_u8(self.spectrum_type)
    }
}

impl DeviceConfig {
    /// Проверяет, что таблицы и резерв имеют фиксированную длину.
    pub fn validate_layout(&self) -> AvsResult<()> {
        let tables = [
            (
                "irradiance.calib_convers",
                self.irradiance.intensity_calib.calib_convers.len(),
            ),
            ("reflectance.calib_convers", self.reflectance.calib_convers.len()),
            (
                "spectrum_correct",
                self.spectrum_correct.spectrum_correct.len(),
            ),
        ];

        for (name, len) in tables {
            if len != MAX_NR_PIXELS {
                return Err(AvsError::format_violation(format!(
                    "{name} has {len} entries, expected {MAX_NR_PIXELS}"
                )));
            }
        }

        if self.reserved.len() != SETTINGS_RESERVED_LEN {
            return Err(AvsError::format_violation(format!(
                "reserved region is {} bytes, expected {SETTINGS_RESERVED_LEN}",
                self.reserved.len()
            )));
        }

        Ok(())
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            len: DEVICE_CONFIG_SIZE as u16,
            config_version: 0,
            user_friendly_id: FixedStr::default(),
            detector: Detector::default(),
            irradiance: Irradiance::default(),
            reflectance: SpectrumCalibration::default(),
            spectrum_correct: SpectrumCorrection::default(),
            stand_alone: StandAlone::default(),
            temperature: [TempSensor::default(); MAX_TEMP_SENSORS],
            tec_control: TecControl::default(),
            process_control: ProcessControl::default(),
            reserved: reserved_region(),
        }
    }
}

fn reserved_region() -> Vec<u8> {
    vec![0u8; SETTINGS_RESERVED_LEN]
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
