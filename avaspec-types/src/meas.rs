//! Параметры измерения (`MeasConfigType` и вложенные структуры).

use serde::{Deserialize, Serialize};

use crate::{
    consts::{
        MAX_INTEGRATION_TIME, MAX_LASER_WIDTH, MAX_TRIGGER_MODE, MAX_TRIGGER_SOURCE,
        MAX_TRIGGER_SOURCE_TYPE, SAT_ENABLE_DET, SAT_PEAK_INVERSION, SW_TRIGGER_MODE,
    },
    AvsError, AvsResult, AvsStatus,
};

/// Управление стробом и лазером (`ControlSettingsType`, 16 байт).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlSettings {
    pub strobe_control: u16,
    pub laser_delay: u32,
    pub laser_width: u32,
    pub laser_wavelength: f32,
    pub store_to_ram: u16,
}

/// Динамическая коррекция темнового сигнала (`DarkCorrectionType`, 2 байта).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DarkCorrection {
    pub enable: u8,
    pub forget_percentage: u8,
}

/// Сглаживание (`SmoothingType`, 3 байта).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Smoothing {
    pub smooth_pix: u16,
    pub smooth_model: u8,
}

/// Запуск измерения (`TriggerType`, 3 байта).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub mode: u8,
    pub source: u8,
    pub source_type: u8,
}

/// Конфигурация одного измерения (`MeasConfigType`, 41 байт).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasConfig {
    pub start_pixel: u16,
    pub stop_pixel: u16,
    /// Время интегрирования, мс
    pub integration_time: f32,
    /// Задержка интегрирования, такты FPGA
    pub integration_delay: u32,
    pub nr_averages: u32,
    pub cor_dyn_dark: DarkCorrection,
    pub smoothing: Smoothing,
    pub saturation_detection: u8,
    pub trigger: Trigger,
    pub control: ControlSettings,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl MeasConfig {
    /// Конфигурация на весь детектор из `num_pixels` пикселей.
    pub fn for_pixels(num_pixels: u16) -> Self {
        Self {
            stop_pixel: num_pixels.saturating_sub(1),
            ..Self::default()
        }
    }

    /// Кол-во пикселей в выбранном диапазоне.
    pub fn pixel_count(&self) -> usize {
        if self.stop_pixel < self.start_pixel {
            0
        } else {
            (self.stop_pixel - self.start_pixel) as usize + 1
        }
    }

    /// Запуск по внешнему (аппаратному) триггеру.
    pub fn is_hardware_triggered(&self) -> bool {
        self.trigger.mode != SW_TRIGGER_MODE
    }

    /// Проверка параметров до отправки в прибор.
    ///
    /// Коды ошибок совпадают с теми, что вернула бы `AVS_PrepareMeasure`.
    pub fn validate(
        &self,
        num_pixels: u16,
    ) -> AvsResult<()> {
        if self.start_pixel > self.stop_pixel || self.stop_pixel >= num_pixels {
            return Err(AvsError::status(AvsStatus::InvalidPixelRange));
        }

        if !self.integration_time.is_finite()
            || self.integration_time <= 0.0
            || self.integration_time > MAX_INTEGRATION_TIME as f32
        {
            return Err(AvsError::status(AvsStatus::InvalidIntTime));
        }

        if self.nr_averages == 0 {
            return Err(AvsError::status(AvsStatus::InvalidParameter));
        }

        if self.trigger.mode > MAX_TRIGGER_MODE
            || self.trigger.source > MAX_TRIGGER_SOURCE
            || self.trigger.source_type > MAX_TRIGGER_SOURCE_TYPE
        {
            return Err(AvsError::status(AvsStatus::InvalidParameter));
        }

        if self.saturation_detection > SAT_PEAK_INVERSION {
            return Err(AvsError::status(AvsStatus::InvalidParameter));
        }

        if self.cor_dyn_dark.enable != 0 && self.cor_dyn_dark.forget_percentage > 100 {
            return Err(AvsError::status(AvsStatus::InvalidMeasparamDyndark));
        }

        if self.control.laser_width > MAX_LASER_WIDTH {
            return Err(AvsError::status(AvsStatus::InvalidParameter));
        }

        Ok(())
    }
}

impl Default for MeasConfig {
    fn default() -> Self {
        Self {
            start_pixel: 0,
            stop_pixel: 0,
            integration_time: 500.0,
            integration_delay: 0,
            nr_averages: 1,
            cor_dyn_dark: DarkCorrection::default(),
            smoothing: Smoothing {
                smooth_pix: 2,
                smooth_model: 0,
            },
            saturation_detection: SAT_ENABLE_DET,
            trigger: Trigger::default(),
            control: ControlSettings::default(),
        }
    }
}

/// Спектр, полученный `AVS_GetScopeData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeData {
    /// Метка времени последнего пикселя (такты по 10 мс от старта прибора)
    pub time_label: u32,
    /// Значения пикселей выбранного диапазона
    pub values: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> MeasConfig {
        MeasConfig::for_pixels(2048)
    }

    #[test]
    fn test_default_matches_reference_setup() {
        let cfg = MeasConfig::default();
        assert_eq!(cfg.integration_time, 500.0);
        assert_eq!(cfg.nr_averages, 1);
        assert_eq!(cfg.smoothing.smooth_pix, 2);
        assert_eq!(cfg.saturation_detection, SAT_ENABLE_DET);
        assert!(!cfg.is_hardware_triggered());
    }

    #[test]
    fn test_for_pixels_covers_detector() {
        let cfg = valid();
        assert_eq!(cfg.start_pixel, 0);
        assert_eq!(cfg.stop_pixel, 2047);
        assert_eq!(cfg.pixel_count(), 2048);
        cfg.validate(2048).unwrap();
    }

    #[test]
    fn test_invalid_pixel_range() {
        let mut cfg = valid();
        cfg.stop_pixel = 2048;
        assert!(cfg.validate(2048).unwrap_err().is(AvsStatus::InvalidPixelRange));

        cfg.start_pixel = 100;
        cfg.stop_pixel = 50;
        assert!(cfg.validate(2048).unwrap_err().is(AvsStatus::InvalidPixelRange));
        assert_eq!(cfg.pixel_count(), 0);
    }

    #[test]
    fn test_invalid_integration_time() {
        let mut cfg = valid();
        cfg.integration_time = 0.0;
        assert!(cfg.validate(2048).unwrap_err().is(AvsStatus::InvalidIntTime));

        cfg.integration_time = MAX_INTEGRATION_TIME as f32 + 1.0;
        assert!(cfg.validate(2048).unwrap_err().is(AvsStatus::InvalidIntTime));

        cfg.integration_time = f32::NAN;
        assert!(cfg.validate(2048).unwrap_err().is(AvsStatus::InvalidIntTime));
    }

    #[test]
    fn test_invalid_averages_and_trigger() {
        let mut cfg = valid();
        cfg.nr_averages = 0;
        assert!(cfg.validate(2048).unwrap_err().is(AvsStatus::InvalidParameter));

        let mut cfg = valid();
        cfg.trigger.mode = 2;
        assert!(cfg.validate(2048).unwrap_err().is(AvsStatus::InvalidParameter));
    }

    #[test]
    fn test_invalid_dyn_dark() {
        let mut cfg = valid();
        cfg.cor_dyn_dark = DarkCorrection {
            enable: 1,
            forget_percentage: 150,
        };
        assert!(cfg
            .validate(2048)
            .unwrap_err()
            .is(AvsStatus::InvalidMeasparamDyndark));
    }

    #[test]
    fn test_meas_config_json() {
        let cfg = valid();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: MeasConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
