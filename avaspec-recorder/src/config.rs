use std::path::{Path, PathBuf};

use avaspec_hal::DriverKind;
use avaspec_types::{InitPort, MeasConfig};

use crate::{RecorderError, RecorderResult};

/// Полная конфигурация сессии записи.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Бэкенд драйвера
    pub driver: DriverKind,
    /// Порт для `AVS_Init`
    pub port: InitPort,
    /// Серийный номер прибора (None = первый доступный)
    pub serial: Option<String>,
    /// Полная конфигурация измерения (None = весь детектор)
    pub meas: Option<MeasConfig>,
    /// Время интегрирования, мс (если `meas` не задан)
    pub integration_ms: f32,
    /// Кол-во усреднений (если `meas` не задан)
    pub nr_averages: u32,
    /// Путь к выходному .avsr файлу
    pub output_path: PathBuf,
    /// Ограничение по времени (None = до Ctrl+C)
    pub duration_secs: Option<u64>,
    /// Ограничение по кол-ву сканов
    pub max_scans: Option<u64>,
    /// Ёмкость канала между захватом и записью (сканов)
    pub channel_capacity: usize,
    /// Интервал вывода статистики (секунды)
    pub stats_interval_secs: u64,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl RecorderConfig {
    /// Конфигурация измерения для детектора из `num_pixels` пикселей.
    pub fn meas_for(
        &self,
        num_pixels: u16,
    ) -> MeasConfig {
        match self.meas {
            Some(meas) => meas,
            None => MeasConfig {
                integration_time: self.integration_ms,
                nr_averages: self.nr_averages,
                ..MeasConfig::for_pixels(num_pixels)
            },
        }
    }

    /// Проверяет ограничения, не зависящие от прибора.
    pub fn validate(&self) -> RecorderResult<()> {
        if self.channel_capacity == 0 {
            return Err(RecorderError::Config(
                "channel capacity must be at least 1".to_string(),
            ));
        }

        if self.max_scans == Some(0) {
            return Err(RecorderError::Config(
                "scan limit must be at least 1".to_string(),
            ));
        }

        if self.meas.is_none() && (self.integration_ms <= 0.0 || !self.integration_ms.is_finite())
        {
            return Err(RecorderError::Config(format!(
                "invalid integration time {} ms",
                self.integration_ms
            )));
        }

        Ok(())
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::Simulated,
            port: InitPort::Usb,
            serial: None,
            meas: None,
            integration_ms: 10.0,
            nr_averages: 1,
            output_path: PathBuf::from("recording.avsr"),
            duration_secs: None,
            max_scans: None,
            channel_capacity: 64,
            stats_interval_secs: 5,
        }
    }
}

/// Парсит время интегрирования в миллисекунды.
///
/// Поддерживает суффиксы: `s`, `ms`, `us` (регистронезависимо).
/// Без суффикса число трактуется как миллисекунды.
///
/// # Примеры
/// ```
/// use avaspec_recorder::config::parse_integration_ms;
/// assert_eq!(parse_integration_ms("500ms").unwrap(), 500.0);
/// assert_eq!(parse_integration_ms("1.5s").unwrap(), 1_500.0);
/// assert_eq!(parse_integration_ms("250us").unwrap(), 0.25);
/// assert_eq!(parse_integration_ms("20").unwrap(), 20.0);
/// ```
pub fn parse_integration_ms(s: &str) -> Result<f32, String> {
    let s = s.trim();
    let lower = s.to_lowercase();

    let (num_str, mult) = if let Some(v) = lower.strip_suffix("ms") {
        (v.trim(), 1.0_f64)
    } else if let Some(v) = lower
        .strip_suffix("us")
        .or_else(|| lower.strip_suffix("µs"))
    {
        (v.trim(), 0.001_f64)
    } else if let Some(v) = lower.strip_suffix('s') {
        (v.trim(), 1_000.0_f64)
    } else {
        (lower.as_str(), 1.0_f64)
    };

    let n: f64 = num_str
        .parse()
        .map_err(|e| format!("Invalid integration time '{s}': {e}"))?;

    let ms = n * mult;
    if !ms.is_finite() || ms <= 0.0 {
        return Err(format!("Integration time must be positive, got '{s}'"));
    }

    Ok(ms as f32)
}

/// Загружает конфигурацию измерения из JSON файла.
pub fn load_meas_config<P: AsRef<Path>>(path: P) -> RecorderResult<MeasConfig> {
    let text = std::fs::read_to_string(path.as_ref())?;

    serde_json::from_str(&text).map_err(|e| {
        RecorderError::Config(format!(
            "{}: {e}",
            path.as_ref().display()
        ))
    })
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
