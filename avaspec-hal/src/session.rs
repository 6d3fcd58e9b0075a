//! Сессии библиотеки и приборов.
//!
//! [`Avs`] держит инициализированную библиотеку, [`Spectrometer`] -
//! активированный прибор. Оба освобождают ресурсы в `Drop`: прибор
//! останавливает измерение и деактивируется, библиотека вызывает `done`
//! после того, как отпущен последний прибор.

use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use avaspec_types::{
    AvsError, AvsHandle, AvsIdentity, AvsResult, AvsStatus, DeviceConfig, DeviceStatus,
    InitPort, MeasConfig, ScopeData, SdCard, VersionInfo,
};
use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::AvsDriver;

/// Интервал опроса `poll_scan` в [`Spectrometer::acquire`]
pub const POLL_INTERVAL: Duration = Duration::from_millis(5);
/// Запас к длительности скана перед ошибкой `ERR_TIMEOUT`
pub const EXPOSE_MARGIN: Duration = Duration::from_secs(5);

/// Инициализированная библиотека, общая для всех приборов.
struct Library {
    driver: Mutex<Box<dyn AvsDriver>>,
    name: &'static str,
}

/// Сессия библиотеки AS5216.
pub struct Avs {
    lib: Arc<Library>,
    port: InitPort,
    device_count: usize,
}

/// Активированный спектрометр.
pub struct Spectrometer {
    lib: Arc<Library>,
    handle: AvsHandle,
    identity: AvsIdentity,
    /// Серийный номер как текст
    serial: String,
    num_pixels: u16,
    prepared: Option<MeasConfig>,
    measuring: bool,
}

/// Что перечислять на SD карте.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdEntryKind {
    File,
    Directory,
}

/// Итератор по файлам или каталогам SD карты.
pub struct SdListing<'a> {
    spec: &'a Spectrometer,
    kind: SdEntryKind,
    prev: Option<String>,
    finished: bool,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Library {
    fn call<T>(
        &self,
        f: impl FnOnce(&mut dyn AvsDriver) -> AvsResult<T>,
    ) -> AvsResult<T> {
        let mut driver = self.driver.lock();
        f(&mut **driver)
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        debug!("{}: closing library", self.name);
        if let Err(e) = self.driver.get_mut().done() {
            warn!("{}: done failed: {e}", self.name);
        }
    }
}

impl Avs {
    /// Инициализирует библиотеку на порту `port`.
    pub fn open(
        driver: Box<dyn AvsDriver>,
        port: InitPort,
    ) -> AvsResult<Self> {
        let name = driver.name();
        let lib = Arc::new(Library {
            driver: Mutex::new(driver),
            name,
        });

        let device_count = lib.call(|d| d.init(port))?;
        info!("{name}: initialised on {port}, {device_count} device(s) attached");

        Ok(Self {
            lib,
            port,
            device_count,
        })
    }

    pub fn driver_name(&self) -> &'static str {
        self.lib.name
    }

    pub fn port(&self) -> InitPort {
        self.port
    }

    /// Кол-во приборов, найденных при инициализации.
    pub fn device_count(&self) -> usize {
        self.device_count
    }

    /// Повторный опрос подключённых приборов.
    pub fn rescan(&mut self) -> AvsResult<usize> {
        self.device_count = self.lib.call(|d| d.nr_of_devices())?;
        Ok(self.device_count)
    }

    pub fn devices(&self) -> AvsResult<Vec<AvsIdentity>> {
        self.lib.call(|d| d.list())
    }

    pub fn activate(
        &self,
        identity: &AvsIdentity,
    ) -> AvsResult<Spectrometer> {
        let handle = self.lib.call(|d| d.activate(identity))?;
        let num_pixels = match self.lib.call(|d| d.num_pixels(handle)) {
            Ok(n) => n,
            Err(e) => {
                let _ = self.lib.call(|d| d.deactivate(handle));
                return Err(e);
            }
        };

        info!(
            "Activated {} ({}) as {handle}, {num_pixels} pixels",
            identity.serial_number, identity.user_friendly_name
        );

        Ok(Spectrometer {
            lib: self.lib.clone(),
            handle,
            identity: identity.clone(),
            serial: identity.serial_number.to_text(),
            num_pixels,
            prepared: None,
            measuring: false,
        })
    }

    /// Активирует прибор по серийному номеру.
    pub fn activate_serial(
        &self,
        serial: &str,
    ) -> AvsResult<Spectrometer> {
        let identity = self
            .devices()?
            .into_iter()
            .find(|id| id.serial_number == serial)
            .ok_or(AvsError::status(AvsStatus::DeviceNotFound))?;
        self.activate(&identity)
    }

    /// Активирует первый свободный прибор.
    pub fn activate_first(&self) -> AvsResult<Spectrometer> {
        let identity = self
            .devices()?
            .into_iter()
            .find(|id| id.status == DeviceStatus::Available)
            .ok_or(AvsError::status(AvsStatus::DeviceNotFound))?;
        self.activate(&identity)
    }
}

impl Spectrometer {
    fn call<T>(
        &self,
        f: impl FnOnce(&mut dyn AvsDriver, AvsHandle) -> AvsResult<T>,
    ) -> AvsResult<T> {
        let handle = self.handle;
        self.lib.call(|d| f(d, handle))
    }

    pub fn handle(&self) -> AvsHandle {
        self.handle
    }

    pub fn identity(&self) -> &AvsIdentity {
        &self.identity
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Кол-во пикселей детектора (запрошено при активации).
    pub fn num_pixels(&self) -> u16 {
        self.num_pixels
    }

    /// Последняя успешно подготовленная конфигурация.
    pub fn prepared(&self) -> Option<&MeasConfig> {
        self.prepared.as_ref()
    }

    pub fn is_measuring(&self) -> bool {
        self.measuring
    }

    /// Конфигурация по умолчанию на весь детектор.
    pub fn default_meas_config(&self) -> MeasConfig {
        MeasConfig::for_pixels(self.num_pixels)
    }

    /// Проверяет конфигурацию и передаёт её прибору.
    pub fn prepare(
        &mut self,
        meas: &MeasConfig,
    ) -> AvsResult<()> {
        meas.validate(self.num_pixels)?;
        self.call(|d, h| d.prepare_measure(h, meas))?;
        self.prepared = Some(*meas);
        Ok(())
    }

    /// Запускает `nmsr` измерений (`-1` - непрерывно).
    pub fn measure(
        &mut self,
        nmsr: i16,
    ) -> AvsResult<()> {
        self.call(|d, h| d.measure(h, nmsr))?;
        self.measuring = true;
        Ok(())
    }

    pub fn poll_scan(&self) -> AvsResult<bool> {
        self.call(|d, h| d.poll_scan(h))
    }

    pub fn stop_measure(&mut self) -> AvsResult<()> {
        self.call(|d, h| d.stop_measure(h))?;
        self.measuring = false;
        Ok(())
    }

    pub fn lambda(&self) -> AvsResult<Vec<f64>> {
        self.call(|d, h| d.lambda(h))
    }

    /// Длины волн подготовленного диапазона пикселей.
    pub fn prepared_lambda(&self) -> AvsResult<Vec<f64>> {
        let meas = self.prepared.ok_or(AvsError::status(AvsStatus::InvalidState))?;
        let lambda = self.lambda()?;
        let range = meas.start_pixel as usize..=meas.stop_pixel as usize;
        lambda
            .get(range)
            .map(<[f64]>::to_vec)
            .ok_or(AvsError::status(AvsStatus::InvalidPixelRange))
    }

    pub fn scope_data(&self) -> AvsResult<ScopeData> {
        self.call(|d, h| d.scope_data(h))
    }

    pub fn saturated_pixels(&self) -> AvsResult<Vec<u8>> {
        self.call(|d, h| d.saturated_pixels(h))
    }

    pub fn analog_in(
        &self,
        id: u8,
    ) -> AvsResult<f32> {
        self.call(|d, h| d.analog_in(h, id))
    }

    pub fn digital_in(
        &self,
        id: u8,
    ) -> AvsResult<u8> {
        self.call(|d, h| d.digital_in(h, id))
    }

    pub fn set_analog_out(
        &self,
        port: u8,
        volts: f32,
    ) -> AvsResult<()> {
        self.call(|d, h| d.set_analog_out(h, port, volts))
    }

    pub fn set_digital_out(
        &self,
        port: u8,
        state: u8,
    ) -> AvsResult<()> {
        self.call(|d, h| d.set_digital_out(h, port, state))
    }

    pub fn set_pwm_out(
        &self,
        port: u8,
        freq_hz: u32,
        duty_percent: u8,
    ) -> AvsResult<()> {
        self.call(|d, h| d.set_pwm_out(h, port, freq_hz, duty_percent))
    }

    pub fn version_info(&self) -> AvsResult<VersionInfo> {
        self.call(|d, h| d.version_info(h))
    }

    pub fn parameter(&self) -> AvsResult<DeviceConfig> {
        self.call(|d, h| d.parameter(h))
    }

    /// Записывает блок параметров и перечитывает число пикселей.
    pub fn set_parameter(
        &mut self,
        config: &DeviceConfig,
    ) -> AvsResult<()> {
        self.call(|d, h| d.set_parameter(h, config))?;
        let pixels = self.call(|d, h| d.num_pixels(h))?;
        if pixels != self.num_pixels {
            self.prepared = None;
            self.num_pixels = pixels;
        }
        Ok(())
    }

    pub fn set_sync_mode(
        &self,
        enable: bool,
    ) -> AvsResult<()> {
        self.call(|d, h| d.set_sync_mode(h, enable))
    }

    pub fn set_prescan_mode(
        &self,
        prescan: bool,
    ) -> AvsResult<()> {
        self.call(|d, h| d.set_prescan_mode(h, prescan))
    }

    pub fn use_high_res_adc(
        &self,
        enable: bool,
    ) -> AvsResult<()> {
        self.call(|d, h| d.use_high_res_adc(h, enable))
    }

    pub fn set_sensitivity_mode(
        &self,
        mode: u32,
    ) -> AvsResult<()> {
        self.call(|d, h| d.set_sensitivity_mode(h, mode))
    }

    pub fn save_spectra_to_sd_card(
        &self,
        sd: &SdCard,
    ) -> AvsResult<()> {
        self.call(|d, h| d.save_spectra_to_sd_card(h, sd))
    }

    pub fn file_size(
        &self,
        name: &str,
    ) -> AvsResult<u32> {
        self.call(|d, h| d.file_size(h, name))
    }

    pub fn read_file(
        &self,
        name: &str,
        size: u32,
    ) -> AvsResult<Vec<u8>> {
        self.call(|d, h| d.read_file(h, name, size))
    }

    /// Скачивает файл целиком.
    pub fn download(
        &self,
        name: &str,
    ) -> AvsResult<Vec<u8>> {
        let size = self.file_size(name)?;
        let data = self.read_file(name, size)?;
        debug!("Downloaded {name}: {} bytes", data.len());
        Ok(data)
    }

    pub fn first_file(&self) -> AvsResult<Option<String>> {
        self.call(|d, h| d.first_file(h))
    }

    pub fn next_file(
        &self,
        prev: &str,
    ) -> AvsResult<Option<String>> {
        self.call(|d, h| d.next_file(h, prev))
    }

    pub fn delete_file(
        &self,
        name: &str,
    ) -> AvsResult<()> {
        self.call(|d, h| d.delete_file(h, name))
    }

    pub fn first_directory(&self) -> AvsResult<Option<String>> {
        self.call(|d, h| d.first_directory(h))
    }

    pub fn next_directory(
        &self,
        prev: &str,
    ) -> AvsResult<Option<String>> {
        self.call(|d, h| d.next_directory(h, prev))
    }

    pub fn delete_directory(
        &self,
        name: &str,
    ) -> AvsResult<()> {
        self.call(|d, h| d.delete_directory(h, name))
    }

    pub fn set_directory(
        &self,
        name: &str,
    ) -> AvsResult<()> {
        self.call(|d, h| d.set_directory(h, name))
    }

    /// Файлы текущего каталога SD карты.
    pub fn sd_files(&self) -> SdListing<'_> {
        SdListing::new(self, SdEntryKind::File)
    }

    /// Каталоги SD карты.
    pub fn sd_directories(&self) -> SdListing<'_> {
        SdListing::new(self, SdEntryKind::Directory)
    }

    /// Одно измерение с конфигурацией `meas`.
    ///
    /// Готовит прибор, запускает один скан, опрашивает готовность до
    /// истечения срока, останавливает измерение и забирает спектр.
    pub fn acquire(
        &mut self,
        meas: &MeasConfig,
    ) -> AvsResult<ScopeData> {
        self.prepare(meas)?;
        self.measure(1)?;

        let scan_ms = meas.integration_time as f64 * meas.nr_averages.max(1) as f64;
        let deadline = Instant::now() + Duration::from_secs_f64(scan_ms / 1_000.0) + EXPOSE_MARGIN;

        loop {
            match self.poll_scan() {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => {
                    let _ = self.stop_measure();
                    return Err(e);
                }
            }

            if Instant::now() >= deadline {
                warn!("{}: no scan after {scan_ms} ms, giving up", self.serial());
                let _ = self.stop_measure();
                return Err(AvsError::status(AvsStatus::Timeout));
            }
            thread::sleep(POLL_INTERVAL);
        }

        self.stop_measure()?;
        self.scope_data()
    }

    /// Одно измерение с временем интегрирования `integration_ms`.
    ///
    /// Остальные параметры берутся из последней подготовленной
    /// конфигурации или из [`default_meas_config`](Self::default_meas_config).
    pub fn expose(
        &mut self,
        integration_ms: f32,
    ) -> AvsResult<ScopeData> {
        let mut meas = self
            .prepared
            .unwrap_or_else(|| self.default_meas_config());
        meas.integration_time = integration_ms;
        self.acquire(&meas)
    }
}

impl Drop for Spectrometer {
    fn drop(&mut self) {
        if self.measuring {
            if let Err(e) = self.call(|d, h| d.stop_measure(h)) {
                warn!("{}: stop on release failed: {e}", self.serial);
            }
        }

        if let Err(e) = self.call(|d, h| d.deactivate(h)) {
            warn!("{}: deactivate failed: {e}", self.serial);
        } else {
            debug!("Deactivated {} ({})", self.serial, self.handle);
        }
    }
}

impl<'a> SdListing<'a> {
    fn new(
        spec: &'a Spectrometer,
        kind: SdEntryKind,
    ) -> Self {
        Self {
            spec,
            kind,
            prev: None,
            finished: false,
        }
    }
}

impl Iterator for SdListing<'_> {
    type Item = AvsResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let result = match (self.kind, self.prev.as_deref()) {
            (SdEntryKind::File, None) => self.spec.first_file(),
            (SdEntryKind::File, Some(prev)) => self.spec.next_file(prev),
            (SdEntryKind::Directory, None) => self.spec.first_directory(),
            (SdEntryKind::Directory, Some(prev)) => self.spec.next_directory(prev),
        };

        match result {
            Ok(Some(name)) => {
                self.prev = Some(name.clone());
                Some(Ok(name))
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use crate::{SimDevice, SimulatedDriver};

    fn open() -> Avs {
        Avs::open(Box::new(SimulatedDriver::new()), InitPort::Usb).unwrap()
    }

    #[test]
    fn test_open_counts_devices() {
        let mut avs = open();
        assert_eq!(avs.device_count(), 2);
        assert_eq!(avs.rescan().unwrap(), 2);
        assert_eq!(avs.driver_name(), "simulated");
    }

    #[test]
    fn test_activate_first_skips_busy() {
        let driver = SimulatedDriver::empty()
            .with_device(SimDevice::avaspec_2048("BUSY").in_use_by_other())
            .with_device(SimDevice::avaspec_nir256("FREE"));
        let avs = Avs::open(Box::new(driver), InitPort::Auto).unwrap();

        let spec = avs.activate_first().unwrap();
        assert_eq!(spec.serial(), "FREE");
        assert_eq!(spec.num_pixels(), 256);
    }

    #[test]
    fn test_activate_unknown_serial() {
        let avs = open();
        assert!(avs
            .activate_serial("NOPE")
            .err()
            .unwrap()
            .is(AvsStatus::DeviceNotFound));
    }

    #[test]
    fn test_drop_deactivates() {
        let avs = open();
        {
            let _spec = avs.activate_serial("1102185U1").unwrap();
            let list = avs.devices().unwrap();
            assert_eq!(list[0].status, DeviceStatus::InUseByApplication);
        }
        let list = avs.devices().unwrap();
        assert_eq!(list[0].status, DeviceStatus::Available);
    }

    #[test]
    fn test_prepare_validates_client_side() {
        let avs = open();
        let mut spec = avs.activate_serial("1203077U1").unwrap();

        let mut meas = spec.default_meas_config();
        assert_eq!(meas.stop_pixel, 255);
        meas.stop_pixel = 256;
        assert!(spec
            .prepare(&meas)
            .unwrap_err()
            .is(AvsStatus::InvalidPixelRange));
        assert!(spec.prepared().is_none());
    }

    #[test]
    fn test_expose_returns_prepared_range() {
        let avs = open();
        let mut spec = avs.activate_serial("1102185U1").unwrap();

        let mut meas = spec.default_meas_config();
        meas.start_pixel = 10;
        meas.stop_pixel = 409;
        meas.integration_time = 3.0;
        spec.prepare(&meas).unwrap();

        let scope = spec.expose(2.0).unwrap();
        assert_eq!(scope.values.len(), 400);
        assert_eq!(spec.prepared().unwrap().integration_time, 2.0);
        assert!(!spec.is_measuring());
        assert_eq!(spec.prepared_lambda().unwrap().len(), 400);
    }

    #[test]
    fn test_sd_listing_iterators() {
        let avs = open();
        let spec = avs.activate_first().unwrap();

        assert_eq!(spec.sd_directories().count(), 0);
        spec.set_directory("B").unwrap();
        spec.set_directory("A").unwrap();

        let dirs: Vec<String> = spec.sd_directories().map(Result::unwrap).collect();
        assert_eq!(dirs, vec!["A", "B"]);
        assert_eq!(spec.sd_files().count(), 0);
    }
}
