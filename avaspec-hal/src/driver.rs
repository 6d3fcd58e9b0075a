//! Типизированный интерфейс к библиотеке AS5216.
//!
//! Каждый метод [`AvsDriver`] соответствует одной экспортируемой функции
//! `as5216.h`. Реализации: [`SimulatedDriver`](crate::SimulatedDriver) и
//! `As5216Driver` (фича `as5216`).

use avaspec_types::{
    AvsError, AvsHandle, AvsIdentity, AvsResult, DeviceConfig, InitPort, MeasConfig, ScopeData,
    SdCard, VersionInfo,
};

/// Драйвер спектрометров AvaSpec.
///
/// Библиотека производителя глобальна для процесса, поэтому все вызовы
/// идут через `&mut self`, а сессии разделяют драйвер под одним мьютексом.
pub trait AvsDriver: Send {
    /// Имя бэкенда для логов
    fn name(&self) -> &'static str;

    /// `AVS_Init`: открывает порт(ы), возвращает кол-во найденных приборов.
    fn init(
        &mut self,
        port: InitPort,
    ) -> AvsResult<usize>;

    /// `AVS_Done`: закрывает соединения и освобождает ресурсы.
    fn done(&mut self) -> AvsResult<()>;

    /// `AVS_GetNrOfDevices`: повторный опрос подключённых приборов.
    fn nr_of_devices(&mut self) -> AvsResult<usize>;

    /// `AVS_GetList`: идентификация всех подключённых приборов.
    fn list(&mut self) -> AvsResult<Vec<AvsIdentity>>;

    fn activate(
        &mut self,
        identity: &AvsIdentity,
    ) -> AvsResult<AvsHandle>;

    fn deactivate(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<()>;

    /// Хэндл уже активированного прибора по серийному номеру.
    fn handle_from_serial(
        &mut self,
        serial: &str,
    ) -> AvsResult<AvsHandle>;

    fn prepare_measure(
        &mut self,
        handle: AvsHandle,
        meas: &MeasConfig,
    ) -> AvsResult<()>;

    /// Запуск `nmsr` измерений, `-1` - непрерывно до `stop_measure`.
    fn measure(
        &mut self,
        handle: AvsHandle,
        nmsr: i16,
    ) -> AvsResult<()>;

    /// `true`, если готов новый спектр.
    fn poll_scan(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<bool>;

    fn stop_measure(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<()>;

    /// Длина волны каждого пикселя детектора, нм.
    fn lambda(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<Vec<f64>>;

    fn num_pixels(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<u16>;

    /// Последний спектр для подготовленного диапазона пикселей.
    fn scope_data(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<ScopeData>;

    /// Для каждого пикселя: сколько из NrAverages сканов было в насыщении.
    fn saturated_pixels(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<Vec<u8>>;

    fn analog_in(
        &mut self,
        handle: AvsHandle,
        id: u8,
    ) -> AvsResult<f32>;

    fn digital_in(
        &mut self,
        handle: AvsHandle,
        id: u8,
    ) -> AvsResult<u8>;

    /// Аналоговый выход, 0..=3.3 В.
    fn set_analog_out(
        &mut self,
        handle: AvsHandle,
        port: u8,
        volts: f32,
    ) -> AvsResult<()>;

    fn set_digital_out(
        &mut self,
        handle: AvsHandle,
        port: u8,
        state: u8,
    ) -> AvsResult<()>;

    /// ШИМ выход: частота 500..=300000 Гц, скважность в процентах.
    fn set_pwm_out(
        &mut self,
        handle: AvsHandle,
        port: u8,
        freq_hz: u32,
        duty_percent: u8,
    ) -> AvsResult<()>;

    fn version_info(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<VersionInfo>;

    /// Полный блок параметров прибора (62 КиБ).
    fn parameter(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<DeviceConfig>;

    fn set_parameter(
        &mut self,
        handle: AvsHandle,
        config: &DeviceConfig,
    ) -> AvsResult<()>;

    fn set_sync_mode(
        &mut self,
        handle: AvsHandle,
        enable: bool,
    ) -> AvsResult<()>;

    fn set_prescan_mode(
        &mut self,
        handle: AvsHandle,
        prescan: bool,
    ) -> AvsResult<()>;

    fn use_high_res_adc(
        &mut self,
        handle: AvsHandle,
        enable: bool,
    ) -> AvsResult<()>;

    /// Режим чувствительности NIR детекторов.
    fn set_sensitivity_mode(
        &mut self,
        handle: AvsHandle,
        mode: u32,
    ) -> AvsResult<()>;

    /// Включает или выключает сохранение следующих спектров на SD карту.
    fn save_spectra_to_sd_card(
        &mut self,
        handle: AvsHandle,
        sd: &SdCard,
    ) -> AvsResult<()>;

    fn file_size(
        &mut self,
        handle: AvsHandle,
        name: &str,
    ) -> AvsResult<u32>;

    /// Читает `size` байт файла с SD карты.
    fn read_file(
        &mut self,
        handle: AvsHandle,
        name: &str,
        size: u32,
    ) -> AvsResult<Vec<u8>>;

    /// Первый файл текущего каталога, `None` если каталог пуст.
    fn first_file(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<Option<String>>;

    fn next_file(
        &mut self,
        handle: AvsHandle,
        prev: &str,
    ) -> AvsResult<Option<String>>;

    fn delete_file(
        &mut self,
        handle: AvsHandle,
        name: &str,
    ) -> AvsResult<()>;

    fn first_directory(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<Option<String>>;

    fn next_directory(
        &mut self,
        handle: AvsHandle,
        prev: &str,
    ) -> AvsResult<Option<String>>;

    fn delete_directory(
        &mut self,
        handle: AvsHandle,
        name: &str,
    ) -> AvsResult<()>;

    /// Выбирает текущий каталог SD карты. Пустое имя - корень.
    fn set_directory(
        &mut self,
        handle: AvsHandle,
        name: &str,
    ) -> AvsResult<()>;
}

/// Бэкенд драйвера.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    /// Встроенный симулятор
    Simulated,
    /// Библиотека производителя
    As5216,
}

impl std::str::FromStr for DriverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sim" | "simulated" => Ok(DriverKind::Simulated),
            "as5216" | "avaspec" | "vendor" => Ok(DriverKind::As5216),
            _ => Err(format!("Unknown driver '{s}'. Use: sim, as5216")),
        }
    }
}

impl std::fmt::Display for DriverKind {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            DriverKind::Simulated => write!(f, "sim"),
            DriverKind::As5216 => write!(f, "as5216"),
        }
    }
}

/// Создаёт драйвер нужного типа.
pub fn create_driver(kind: DriverKind) -> AvsResult<Box<dyn AvsDriver>> {
    match kind {
        DriverKind::Simulated => {
            #[cfg(feature = "sim")]
            {
                Ok(Box::new(crate::SimulatedDriver::new()))
            }
            #[cfg(not(feature = "sim"))]
            Err(AvsError::OperationFailed(
                "Compiled without simulator. Rebuild with: cargo build --features sim".to_string(),
            ))
        }
        DriverKind::As5216 => {
            #[cfg(feature = "as5216")]
            {
                Ok(Box::new(crate::As5216Driver::new()))
            }
            #[cfg(not(feature = "as5216"))]
            Err(AvsError::OperationFailed(
                "Compiled without AS5216 library support. \
                 Rebuild with: cargo build --features as5216"
                    .to_string(),
            ))
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
