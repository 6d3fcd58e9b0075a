// Симулятор повторяет правила состояний и коды ошибок библиотеки AS5216,
// так что сессии, рекордер и CLI работают без прибора.
// Спектр синтетический: линии ртутно-аргоновой лампы поверх темнового
// сигнала, шум из SmallRng с фиксированным seed.
// Время сканов реальное: integration_time * nr_averages.

use std::{
    collections::BTreeMap,
    time::{Duration, Instant},
};

use avaspec_core::WireWriter;
use avaspec_types::{
    AvsError, AvsHandle, AvsIdentity, AvsResult, AvsStatus, DeviceConfig, DeviceStatus,
    InitPort, MeasConfig, ScopeData, SdCard, SensorType, SpectrumType, VersionInfo,
    MAX_PIXEL_VALUE, ROOT_NAME_LEN, SAT_DISABLE_DET, SAT_PEAK_INVERSION, TIME_LABEL_TICK_MS,
    USER_ID_LEN,
};
use log::{debug, info};
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::AvsDriver;

/// Кол-во аналоговых входов. Входы 2 и 3 замкнуты на аналоговые выходы 0 и 1.
pub const SIM_ANALOG_INPUTS: u8 = 8;
/// Кол-во цифровых входов. Вход N замкнут на цифровой выход N.
pub const SIM_DIGITAL_INPUTS: u8 = 3;
/// Кол-во цифровых выходов
pub const SIM_DIGITAL_OUTPUTS: u8 = 10;
/// Кол-во аналоговых выходов
pub const SIM_ANALOG_OUTPUTS: u8 = 2;
/// Цифровые выходы с поддержкой ШИМ
pub const SIM_PWM_PORTS: [u8; 6] = [1, 2, 3, 5, 6, 7];

/// Верхний предел аналогового выхода, В
pub const MAX_ANALOG_OUT_VOLTS: f32 = 3.3;
/// Диапазон частот ШИМ, Гц
pub const PWM_FREQ_RANGE: std::ops::RangeInclusive<u32> = 500..=300_000;

/// Темновой уровень, отсчёты АЦП
const DARK_LEVEL: f64 = 1_200.0;
/// Предел сканов, догоняемых за один опрос при записи на SD карту
const MAX_CATCH_UP_SCANS: u64 = 100;
/// Полуширина линий, нм
const LINE_SIGMA_NM: f64 = 0.7;
/// Линии Hg-Ar лампы: (длина волны нм, отсчётов за мс)
const EMISSION_LINES: [(f64, f64); 13] = [
    (253.65, 600.0),
    (296.73, 180.0),
    (313.16, 300.0),
    (334.15, 80.0),
    (365.02, 450.0),
    (404.66, 380.0),
    (435.83, 1_100.0),
    (546.07, 1_400.0),
    (576.96, 220.0),
    (579.07, 240.0),
    (696.54, 150.0),
    (763.51, 260.0),
    (811.53, 200.0),
];

/// Описание прибора, подключённого к симулятору.
#[derive(Debug, Clone)]
pub struct SimDevice {
    serial: String,
    config: DeviceConfig,
    in_use_by_other: bool,
    fpga_version: String,
    firmware_version: String,
}

/// Драйвер-симулятор библиотеки AS5216.
pub struct SimulatedDriver {
    initialised: bool,
    devices: Vec<DeviceState>,
    next_handle: i64,
    epoch: Instant,
    rng: SmallRng,
}

/// Состояние одного прибора.
struct DeviceState {
    spec: SimDevice,
    handle: Option<AvsHandle>,
    prepared: Option<MeasConfig>,
    run: Option<MeasureRun>,
    last_scan: Option<Scan>,
    scan_ready: bool,
    analog_out: [f32; SIM_ANALOG_OUTPUTS as usize],
    digital_out: [u8; SIM_DIGITAL_OUTPUTS as usize],
    pwm: BTreeMap<u8, (u32, u8)>,
    sync_mode: bool,
    prescan: bool,
    high_res_adc: bool,
    sensitivity_mode: u32,
    sd: SimSdCard,
}

/// Запущенное измерение.
struct MeasureRun {
    /// `None` - непрерывно
    total: Option<u32>,
    started: Instant,
    period: Duration,
    delivered: u32,
}

struct Scan {
    time_label: u32,
    values: Vec<f64>,
    saturated: Vec<u8>,
}

/// SD карта в памяти: каталог -> (файл -> содержимое). Корень - "".
#[derive(Default)]
struct SimSdCard {
    dirs: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    current: String,
    saving: Option<SdCard>,
    counter: u32,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl SimDevice {
    /// Прибор с детектором `sensor` на `pixels` пикселей и полиномом длин волн `fit`.
    pub fn new(
        serial: &str,
        name: &str,
        sensor: SensorType,
        pixels: u16,
        fit: [f32; 5],
    ) -> Self {
        let mut config = DeviceConfig::default();
        config.user_friendly_id = name.chars().take(USER_ID_LEN).collect::<String>().into();
        config.config_version = 1;
        config.detector.sensor_type = sensor;
        config.detector.nr_pixels = pixels;
        config.detector.fit = fit;
        config.stand_alone.meas = MeasConfig::for_pixels(pixels);

        Self {
            serial: serial.to_string(),
            config,
            in_use_by_other: false,
            fpga_version: "005.000.0000".to_string(),
            firmware_version: "000.036.000.000".to_string(),
        }
    }

    /// AvaSpec-2048: ILX554, 2048 пикселей, 200..1100 нм.
    pub fn avaspec_2048(serial: &str) -> Self {
        Self::new(
            serial,
            "AvaSpec-2048",
            SensorType::Ilx554,
            2048,
            [175.3, 0.4623, -1.9e-5, 0.0, 0.0],
        )
    }

    /// AvaSpec-NIR256: HAMS9201, 256 пикселей, 900..1750 нм.
    pub fn avaspec_nir256(serial: &str) -> Self {
        Self::new(
            serial,
            "AvaSpec-NIR256",
            SensorType::Hams9201,
            256,
            [896.2, 3.43, -1.1e-3, 0.0, 0.0],
        )
    }

    /// Прибор занят другим приложением.
    pub fn in_use_by_other(mut self) -> Self {
        self.in_use_by_other = true;
        self
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    fn identity(
        &self,
        status: DeviceStatus,
    ) -> AvsIdentity {
        AvsIdentity {
            serial_number: self.serial.as_str().into(),
            user_friendly_name: self.config.user_friendly_id.clone(),
            status,
        }
    }
}

impl SimulatedDriver {
    /// Симулятор с двумя приборами: AvaSpec-2048 и AvaSpec-NIR256.
    pub fn new() -> Self {
        Self::empty()
            .with_device(SimDevice::avaspec_2048("1102185U1"))
            .with_device(SimDevice::avaspec_nir256("1203077U1"))
    }

    /// Симулятор без приборов.
    pub fn empty() -> Self {
        Self {
            initialised: false,
            devices: Vec::new(),
            next_handle: 1,
            epoch: Instant::now(),
            rng: SmallRng::seed_from_u64(0x5216),
        }
    }

    pub fn with_device(
        mut self,
        device: SimDevice,
    ) -> Self {
        self.devices.push(DeviceState::new(device));
        self
    }

    /// Фиксирует seed генератора шума.
    pub fn with_seed(
        mut self,
        seed: u64,
    ) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    fn ensure_init(&self) -> AvsResult<()> {
        if !self.initialised {
            return Err(AvsError::status(AvsStatus::DllInitialisation));
        }
        Ok(())
    }

    fn device_index(
        &self,
        handle: AvsHandle,
    ) -> AvsResult<usize> {
        self.ensure_init()?;
        self.devices
            .iter()
            .position(|d| d.handle == Some(handle))
            .ok_or(AvsError::status(AvsStatus::InvalidDeviceId))
    }

    fn device(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<&mut DeviceState> {
        let idx = self.device_index(handle)?;
        Ok(&mut self.devices[idx])
    }

    /// Продвигает измерение прибора до текущего момента.
    fn advance(
        &mut self,
        idx: usize,
    ) -> AvsResult<()> {
        let now = Instant::now();
        let epoch = self.epoch;

        let dev = &mut self.devices[idx];
        let Some(run) = dev.run.as_mut() else {
            return Ok(());
        };

        let period_ns = run.period.as_nanos().max(1);
        let mut due = (now.duration_since(run.started).as_nanos() / period_ns) as u64;
        if let Some(total) = run.total {
            due = due.min(total as u64);
        }

        if due <= run.delivered as u64 {
            return Ok(());
        }

        let missed = due - run.delivered as u64;
        let (started, period) = (run.started, run.period);
        run.delivered = due as u32;
        let finished = run.total.is_some_and(|t| run.delivered >= t);

        // На SD карту прибор пишет каждый скан, хосту достаётся последний
        let generate = if dev.sd.saving.is_some() {
            missed.min(MAX_CATCH_UP_SCANS)
        } else {
            1
        };

        let meas = dev.prepared.ok_or(AvsError::status(AvsStatus::InvalidState))?;
        let gain = if dev.sensitivity_mode != 0 { 2.0 } else { 1.0 };

        // Метка каждого скана - момент окончания его экспозиции
        for n in (due - generate + 1)..=due {
            let done_at = started + period * n as u32;
            let time_label =
                (done_at.duration_since(epoch).as_millis() / TIME_LABEL_TICK_MS as u128) as u32;
            let (values, saturated) = synthesize(
                &dev.spec.config,
                &meas,
                dev.high_res_adc,
                gain,
                &mut self.rng,
            );
            let scan = Scan {
                time_label,
                values,
                saturated,
            };
            dev.store_on_sd_card(&meas, &scan)?;
            dev.last_scan = Some(scan);
        }
        dev.scan_ready = true;

        if finished {
            debug!("sim {}: measurement finished", dev.spec.serial);
            dev.run = None;
        }

        Ok(())
    }
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceState {
    fn new(spec: SimDevice) -> Self {
        Self {
            spec,
            handle: None,
            prepared: None,
            run: None,
            last_scan: None,
            scan_ready: false,
            analog_out: [0.0; SIM_ANALOG_OUTPUTS as usize],
            digital_out: [0; SIM_DIGITAL_OUTPUTS as usize],
            pwm: BTreeMap::new(),
            sync_mode: false,
            prescan: true,
            high_res_adc: true,
            sensitivity_mode: 0,
            sd: SimSdCard::new(),
        }
    }

    fn status(&self) -> DeviceStatus {
        if self.spec.in_use_by_other {
            DeviceStatus::InUseByOther
        } else if self.handle.is_some() {
            DeviceStatus::InUseByApplication
        } else {
            DeviceStatus::Available
        }
    }

    fn num_pixels(&self) -> u16 {
        self.spec.config.detector.nr_pixels
    }

    fn ensure_idle(&self) -> AvsResult<()> {
        if self.run.is_some() {
            return Err(AvsError::status(AvsStatus::OperationPending));
        }
        Ok(())
    }

    fn reset_measurement(&mut self) {
        self.run = None;
        self.scan_ready = false;
    }

    fn store_on_sd_card(
        &mut self,
        meas: &MeasConfig,
        scan: &Scan,
    ) -> AvsResult<()> {
        let Some(sd) = self.sd.saving.clone() else {
            return Ok(());
        };
        let Some(kind) = sd.spectrum_kind() else {
            return Ok(());
        };

        let name = format!(
            "{}{:02}.{}",
            sd.file_root_name.to_text().to_uppercase(),
            self.sd.counter % 100,
            kind.extension().to_uppercase()
        );
        self.sd.counter += 1;

        let mut w = WireWriter::with_capacity(16 + scan.values.len() * 8);
        w.u16(meas.start_pixel)?;
        w.u16(meas.stop_pixel)?;
        w.f32(meas.integration_time)?;
        w.u32(scan.time_label)?;
        w.u16(sd.timestamp.date)?;
        w.u16(sd.timestamp.time)?;
        w.f64_slice(&scan.values)?;

        let current = self.sd.current.clone();
        self.sd
            .dirs
            .entry(current)
            .or_default()
            .insert(name, w.into_inner());

        Ok(())
    }
}

impl SimSdCard {
    fn new() -> Self {
        let mut sd = Self::default();
        sd.dirs.insert(String::new(), BTreeMap::new());
        sd
    }

    fn files(&self) -> AvsResult<&BTreeMap<String, Vec<u8>>> {
        self.dirs
            .get(&self.current)
            .ok_or(AvsError::status(AvsStatus::InvalidState))
    }

    fn first_after<'a, I>(
        names: I,
        prev: Option<&str>,
    ) -> Option<String>
    where
        I: Iterator<Item = &'a String>,
    {
        let prev = prev.map(|p| p.to_uppercase());
        names
            .filter(|n| !n.is_empty())
            .find(|n| prev.as_ref().is_none_or(|p| n.as_str() > p.as_str()))
            .cloned()
    }
}

/// Генерирует один скан: усреднённые значения и счётчики насыщения.
fn synthesize(
    config: &DeviceConfig,
    meas: &MeasConfig,
    high_res_adc: bool,
    gain: f64,
    rng: &mut SmallRng,
) -> (Vec<f64>, Vec<u8>) {
    let full_scale = if high_res_adc {
        MAX_PIXEL_VALUE as f64
    } else {
        (MAX_PIXEL_VALUE / 4) as f64
    };
    let adc_gain = if high_res_adc { 1.0 } else { 0.25 };
    let averages = meas.nr_averages.max(1);
    let integration = meas.integration_time as f64;

    let mut values = Vec::with_capacity(meas.pixel_count());
    let mut saturated = Vec::with_capacity(meas.pixel_count());

    for pixel in meas.start_pixel..=meas.stop_pixel {
        let nm = wavelength(&config.detector.fit, pixel);
        let signal: f64 = EMISSION_LINES
            .iter()
            .map(|(center, rate)| {
                let dx = (nm - center) / LINE_SIGMA_NM;
                gain * rate * integration * (-0.5 * dx * dx).exp()
            })
            .sum();
        let mean = (DARK_LEVEL + signal) * adc_gain;

        let mut sum = 0.0;
        let mut hits = 0u32;
        for _ in 0..averages {
            let sigma = mean.sqrt().max(2.0);
            let raw = mean + sigma * (rng.gen::<f64>() - 0.5) * 3.4;
            if raw > full_scale {
                hits += 1;
            }
            sum += raw.clamp(0.0, full_scale);
        }

        values.push(sum / averages as f64);
        saturated.push(hits.min(u8::MAX as u32) as u8);
    }

    (values, saturated)
}

/// Длина волны пикселя по полиному детектора.
fn wavelength(
    fit: &[f32; 5],
    pixel: u16,
) -> f64 {
    let x = pixel as f64;
    fit.iter().rev().fold(0.0, |acc, c| acc * x + *c as f64)
}

/// Проверяет имя файла или каталога SD карты.
fn check_sd_name(
    name: &str,
    max_len: usize,
) -> AvsResult<String> {
    if name.is_empty() || name.len() > max_len || name.contains(['/', '\\', '\0']) {
        return Err(AvsError::status(AvsStatus::InvalidParameter));
    }
    Ok(name.to_uppercase())
}

////////////////////////////////////////////////////////////////////////////////
// AvsDriver
////////////////////////////////////////////////////////////////////////////////

impl AvsDriver for SimulatedDriver {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn init(
        &mut self,
        port: InitPort,
    ) -> AvsResult<usize> {
        if !self.initialised {
            info!("sim: library initialised on {port}, {} device(s)", self.devices.len());
            self.initialised = true;
        }
        Ok(self.devices.len())
    }

    fn done(&mut self) -> AvsResult<()> {
        for dev in &mut self.devices {
            dev.reset_measurement();
            dev.handle = None;
        }
        self.initialised = false;
        Ok(())
    }

    fn nr_of_devices(&mut self) -> AvsResult<usize> {
        self.ensure_init()?;
        Ok(self.devices.len())
    }

    fn list(&mut self) -> AvsResult<Vec<AvsIdentity>> {
        self.ensure_init()?;
        Ok(self
            .devices
            .iter()
            .map(|d| d.spec.identity(d.status()))
            .collect())
    }

    fn activate(
        &mut self,
        identity: &AvsIdentity,
    ) -> AvsResult<AvsHandle> {
        self.ensure_init()?;

        let next = self.next_handle;
        let dev = self
            .devices
            .iter_mut()
            .find(|d| identity.serial_number == d.spec.serial)
            .ok_or_else(|| {
                AvsError::InvalidHandle(format!("no device {}", identity.serial_number))
            })?;

        if dev.spec.in_use_by_other {
            return Err(AvsError::InvalidHandle(format!(
                "{} is in use by another application",
                identity.serial_number
            )));
        }

        if let Some(handle) = dev.handle {
            return Ok(handle);
        }

        let handle = AvsHandle(next);
        dev.handle = Some(handle);
        self.next_handle += 1;
        debug!("sim: activated {} as {handle}", identity.serial_number);
        Ok(handle)
    }

    fn deactivate(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<()> {
        let idx = self
            .device_index(handle)
            .map_err(|_| AvsError::OperationFailed(format!("deactivate {handle}")))?;

        let dev = &mut self.devices[idx];
        dev.reset_measurement();
        dev.prepared = None;
        dev.handle = None;
        Ok(())
    }

    fn handle_from_serial(
        &mut self,
        serial: &str,
    ) -> AvsResult<AvsHandle> {
        self.ensure_init()?;
        self.devices
            .iter()
            .find(|d| d.spec.serial == serial)
            .and_then(|d| d.handle)
            .ok_or_else(|| AvsError::InvalidHandle(format!("{serial} is not activated")))
    }

    fn prepare_measure(
        &mut self,
        handle: AvsHandle,
        meas: &MeasConfig,
    ) -> AvsResult<()> {
        let dev = self.device(handle)?;
        dev.ensure_idle()?;
        meas.validate(dev.num_pixels())?;

        if meas.saturation_detection == SAT_PEAK_INVERSION && meas.nr_averages > 1 {
            return Err(AvsError::status(AvsStatus::InvalidMeasparamAvgSat2));
        }

        if meas.control.store_to_ram > 0 && meas.nr_averages > 1 {
            return Err(AvsError::status(AvsStatus::InvalidMeasparamAvgRam));
        }

        if meas.control.store_to_ram > 0 && dev.sync_mode {
            return Err(AvsError::status(AvsStatus::InvalidMeasparamSyncRam));
        }

        dev.prepared = Some(*meas);
        dev.scan_ready = false;
        Ok(())
    }

    fn measure(
        &mut self,
        handle: AvsHandle,
        nmsr: i16,
    ) -> AvsResult<()> {
        let dev = self.device(handle)?;
        dev.ensure_idle()?;

        let Some(meas) = dev.prepared else {
            return Err(AvsError::status(AvsStatus::InvalidState));
        };

        let total = match nmsr {
            -1 => None,
            n if n > 0 => Some(n as u32),
            _ => return Err(AvsError::status(AvsStatus::InvalidParameter)),
        };

        let period_ms = meas.integration_time as f64 * meas.nr_averages.max(1) as f64;
        let period = Duration::from_secs_f64(period_ms / 1_000.0);

        // TCD1304 в режиме prescan отбрасывает первый скан
        let mut started = Instant::now();
        if dev.prescan && dev.spec.config.detector.sensor_type == SensorType::Tcd1304 {
            started += period;
        }

        dev.run = Some(MeasureRun {
            total,
            started,
            period,
            delivered: 0,
        });
        dev.scan_ready = false;
        Ok(())
    }

    fn poll_scan(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<bool> {
        let idx = self.device_index(handle)?;
        self.advance(idx)?;
        Ok(self.devices[idx].scan_ready)
    }

    fn stop_measure(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<()> {
        let dev = self.device(handle)?;
        dev.run = None;
        Ok(())
    }

    fn lambda(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<Vec<f64>> {
        let dev = self.device(handle)?;
        let fit = dev.spec.config.detector.fit;
        Ok((0..dev.num_pixels()).map(|p| wavelength(&fit, p)).collect())
    }

    fn num_pixels(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<u16> {
        Ok(self.device(handle)?.num_pixels())
    }

    fn scope_data(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<ScopeData> {
        let idx = self.device_index(handle)?;
        self.advance(idx)?;

        let dev = &mut self.devices[idx];
        let scan = dev
            .last_scan
            .as_ref()
            .ok_or(AvsError::status(AvsStatus::InvalidMeasData))?;
        dev.scan_ready = false;

        Ok(ScopeData {
            time_label: scan.time_label,
            values: scan.values.clone(),
        })
    }

    fn saturated_pixels(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<Vec<u8>> {
        let dev = self.device(handle)?;
        let detection = dev
            .prepared
            .map(|m| m.saturation_detection)
            .unwrap_or(SAT_DISABLE_DET);

        if detection == SAT_DISABLE_DET {
            return Err(AvsError::status(AvsStatus::InvalidState));
        }

        dev.last_scan
            .as_ref()
            .map(|s| s.saturated.clone())
            .ok_or(AvsError::status(AvsStatus::InvalidMeasData))
    }

    fn analog_in(
        &mut self,
        handle: AvsHandle,
        id: u8,
    ) -> AvsResult<f32> {
        let dev = self.device(handle)?;
        if id >= SIM_ANALOG_INPUTS {
            return Err(AvsError::status(AvsStatus::InvalidParameter));
        }

        // 0/1: термисторы, 4: опорное 2.5 В, 6: питание USB 5 В
        let volts = match id {
            0 => 1.234,
            1 => 1.187,
            2 => dev.analog_out[0],
            3 => dev.analog_out[1],
            4 => 2.5,
            6 => 5.0,
            7 => 1.8,
            _ => 0.0,
        };
        Ok(volts)
    }

    fn digital_in(
        &mut self,
        handle: AvsHandle,
        id: u8,
    ) -> AvsResult<u8> {
        let dev = self.device(handle)?;
        if id >= SIM_DIGITAL_INPUTS {
            return Err(AvsError::status(AvsStatus::InvalidParameter));
        }
        Ok(dev.digital_out[id as usize])
    }

    fn set_analog_out(
        &mut self,
        handle: AvsHandle,
        port: u8,
        volts: f32,
    ) -> AvsResult<()> {
        let dev = self.device(handle)?;
        if port >= SIM_ANALOG_OUTPUTS || !(0.0..=MAX_ANALOG_OUT_VOLTS).contains(&volts) {
            return Err(AvsError::status(AvsStatus::InvalidParameter));
        }
        dev.analog_out[port as usize] = volts;
        Ok(())
    }

    fn set_digital_out(
        &mut self,
        handle: AvsHandle,
        port: u8,
        state: u8,
    ) -> AvsResult<()> {
        let dev = self.device(handle)?;
        if port >= SIM_DIGITAL_OUTPUTS || state > 1 {
            return Err(AvsError::status(AvsStatus::InvalidParameter));
        }
        dev.pwm.remove(&port);
        dev.digital_out[port as usize] = state;
        Ok(())
    }

    fn set_pwm_out(
        &mut self,
        handle: AvsHandle,
        port: u8,
        freq_hz: u32,
        duty_percent: u8,
    ) -> AvsResult<()> {
        let dev = self.device(handle)?;
        if !SIM_PWM_PORTS.contains(&port)
            || !PWM_FREQ_RANGE.contains(&freq_hz)
            || duty_percent > 100
        {
            return Err(AvsError::status(AvsStatus::InvalidParameter));
        }
        dev.pwm.insert(port, (freq_hz, duty_percent));
        Ok(())
    }

    fn version_info(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<VersionInfo> {
        let dev = self.device(handle)?;
        Ok(VersionInfo {
            fpga: dev.spec.fpga_version.clone(),
            firmware: dev.spec.firmware_version.clone(),
            dll: format!("sim-{}", env!("CARGO_PKG_VERSION")),
        })
    }

    fn parameter(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<DeviceConfig> {
        Ok(self.device(handle)?.spec.config.clone())
    }

    fn set_parameter(
        &mut self,
        handle: AvsHandle,
        config: &DeviceConfig,
    ) -> AvsResult<()> {
        let dev = self.device(handle)?;
        dev.ensure_idle()?;
        config.validate_layout()?;
        config.detector.check()?;

        if config.len as usize != avaspec_types::DEVICE_CONFIG_SIZE {
            return Err(AvsError::status(AvsStatus::InvalidSize));
        }

        if config.detector.nr_pixels != dev.num_pixels() {
            dev.prepared = None;
        }
        dev.spec.config = config.clone();
        Ok(())
    }

    fn set_sync_mode(
        &mut self,
        handle: AvsHandle,
        enable: bool,
    ) -> AvsResult<()> {
        self.device(handle)?.sync_mode = enable;
        Ok(())
    }

    fn set_prescan_mode(
        &mut self,
        handle: AvsHandle,
        prescan: bool,
    ) -> AvsResult<()> {
        let dev = self.device(handle)?;
        dev.ensure_idle()?;
        dev.prescan = prescan;
        Ok(())
    }

    fn use_high_res_adc(
        &mut self,
        handle: AvsHandle,
        enable: bool,
    ) -> AvsResult<()> {
        let dev = self.device(handle)?;
        dev.ensure_idle()?;
        dev.high_res_adc = enable;
        Ok(())
    }

    fn set_sensitivity_mode(
        &mut self,
        handle: AvsHandle,
        mode: u32,
    ) -> AvsResult<()> {
        let dev = self.device(handle)?;
        if !dev.spec.config.detector.sensor_type.supports_sensitivity_mode() {
            return Err(AvsError::status(AvsStatus::NotSupportedBySensorType));
        }
        // 0 - малошумящий режим, любое другое значение - высокая чувствительность
        dev.sensitivity_mode = mode;
        Ok(())
    }

    fn save_spectra_to_sd_card(
        &mut self,
        handle: AvsHandle,
        sd: &SdCard,
    ) -> AvsResult<()> {
        let dev = self.device(handle)?;
        if !sd.enable {
            dev.sd.saving = None;
            return Ok(());
        }

        if SpectrumType::from_u8(sd.spectrum_type).is_none() {
            return Err(AvsError::status(AvsStatus::InvalidParameter));
        }
        check_sd_name(&sd.file_root_name.to_text(), ROOT_NAME_LEN)?;

        dev.sd.saving = Some(sd.clone());
        dev.sd.counter = 0;
        Ok(())
    }

    fn file_size(
        &mut self,
        handle: AvsHandle,
        name: &str,
    ) -> AvsResult<u32> {
        let dev = self.device(handle)?;
        dev.sd
            .files()?
            .get(&name.to_uppercase())
            .map(|data| data.len() as u32)
            .ok_or(AvsError::status(AvsStatus::InvalidParameter))
    }

    fn read_file(
        &mut self,
        handle: AvsHandle,
        name: &str,
        size: u32,
    ) -> AvsResult<Vec<u8>> {
        let dev = self.device(handle)?;
        let data = dev
            .sd
            .files()?
            .get(&name.to_uppercase())
            .ok_or(AvsError::status(AvsStatus::InvalidParameter))?;

        if (size as usize) < data.len() {
            return Err(AvsError::status(AvsStatus::InvalidSize));
        }
        Ok(data.clone())
    }

    fn first_file(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<Option<String>> {
        let dev = self.device(handle)?;
        Ok(SimSdCard::first_after(dev.sd.files()?.keys(), None))
    }

    fn next_file(
        &mut self,
        handle: AvsHandle,
        prev: &str,
    ) -> AvsResult<Option<String>> {
        let dev = self.device(handle)?;
        Ok(SimSdCard::first_after(dev.sd.files()?.keys(), Some(prev)))
    }

    fn delete_file(
        &mut self,
        handle: AvsHandle,
        name: &str,
    ) -> AvsResult<()> {
        let dev = self.device(handle)?;
        let current = dev.sd.current.clone();
        dev.sd
            .dirs
            .get_mut(&current)
            .and_then(|files| files.remove(&name.to_uppercase()))
            .map(|_| ())
            .ok_or(AvsError::status(AvsStatus::InvalidParameter))
    }

    fn first_directory(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<Option<String>> {
        let dev = self.device(handle)?;
        Ok(SimSdCard::first_after(dev.sd.dirs.keys(), None))
    }

    fn next_directory(
        &mut self,
        handle: AvsHandle,
        prev: &str,
    ) -> AvsResult<Option<String>> {
        let dev = self.device(handle)?;
        Ok(SimSdCard::first_after(dev.sd.dirs.keys(), Some(prev)))
    }

    fn delete_directory(
        &mut self,
        handle: AvsHandle,
        name: &str,
    ) -> AvsResult<()> {
        let dev = self.device(handle)?;
        let name = check_sd_name(name, ROOT_NAME_LEN)?;

        match dev.sd.dirs.get(&name) {
            None => Err(AvsError::status(AvsStatus::InvalidParameter)),
            Some(files) if !files.is_empty() => Err(AvsError::status(AvsStatus::InvalidState)),
            Some(_) => {
                dev.sd.dirs.remove(&name);
                if dev.sd.current == name {
                    dev.sd.current.clear();
                }
                Ok(())
            }
        }
    }

    fn set_directory(
        &mut self,
        handle: AvsHandle,
        name: &str,
    ) -> AvsResult<()> {
        let dev = self.device(handle)?;
        if name.is_empty() {
            dev.sd.current.clear();
            return Ok(());
        }

        let name = check_sd_name(name, ROOT_NAME_LEN)?;
        dev.sd.dirs.entry(name.clone()).or_default();
        dev.sd.current = name;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use avaspec_types::TimeStamp;

    use super::*;

    fn active(driver: &mut SimulatedDriver) -> AvsHandle {
        driver.init(InitPort::Usb).unwrap();
        let list = driver.list().unwrap();
        driver.activate(&list[0]).unwrap()
    }

    fn fast_meas(pixels: u16) -> MeasConfig {
        let mut meas = MeasConfig::for_pixels(pixels);
        meas.integration_time = 2.0;
        meas
    }

    fn wait_scan(
        driver: &mut SimulatedDriver,
        handle: AvsHandle,
    ) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !driver.poll_scan(handle).unwrap() {
            assert!(Instant::now() < deadline, "scan timed out");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_requires_init() {
        let mut driver = SimulatedDriver::new();
        assert!(driver
            .list()
            .unwrap_err()
            .is(AvsStatus::DllInitialisation));
        assert_eq!(driver.init(InitPort::Auto).unwrap(), 2);
        assert_eq!(driver.nr_of_devices().unwrap(), 2);
    }

    #[test]
    fn test_list_reports_status() {
        let mut driver = SimulatedDriver::empty()
            .with_device(SimDevice::avaspec_2048("A1"))
            .with_device(SimDevice::avaspec_2048("B2").in_use_by_other());
        let handle = active(&mut driver);

        let list = driver.list().unwrap();
        assert_eq!(list[0].status, DeviceStatus::InUseByApplication);
        assert_eq!(list[1].status, DeviceStatus::InUseByOther);
        assert_eq!(list[0].user_friendly_name, "AvaSpec-2048");

        assert!(matches!(
            driver.activate(&list[1]),
            Err(AvsError::InvalidHandle(_))
        ));
        assert_eq!(driver.handle_from_serial("A1").unwrap(), handle);
        assert!(driver.handle_from_serial("B2").is_err());
    }

    #[test]
    fn test_unknown_handle() {
        let mut driver = SimulatedDriver::new();
        driver.init(InitPort::Usb).unwrap();
        assert!(driver
            .num_pixels(AvsHandle(77))
            .unwrap_err()
            .is(AvsStatus::InvalidDeviceId));
        assert!(matches!(
            driver.deactivate(AvsHandle(77)),
            Err(AvsError::OperationFailed(_))
        ));
    }

    #[test]
    fn test_measure_requires_prepare() {
        let mut driver = SimulatedDriver::new();
        let h = active(&mut driver);
        assert!(driver.measure(h, 1).unwrap_err().is(AvsStatus::InvalidState));
    }

    #[test]
    fn test_prepare_validation() {
        let mut driver = SimulatedDriver::new();
        let h = active(&mut driver);

        let mut meas = fast_meas(2048);
        meas.stop_pixel = 2048;
        assert!(driver
            .prepare_measure(h, &meas)
            .unwrap_err()
            .is(AvsStatus::InvalidPixelRange));

        let mut meas = fast_meas(2048);
        meas.integration_time = 0.0;
        assert!(driver
            .prepare_measure(h, &meas)
            .unwrap_err()
            .is(AvsStatus::InvalidIntTime));

        let mut meas = fast_meas(2048);
        meas.saturation_detection = SAT_PEAK_INVERSION;
        meas.nr_averages = 4;
        assert!(driver
            .prepare_measure(h, &meas)
            .unwrap_err()
            .is(AvsStatus::InvalidMeasparamAvgSat2));
    }

    #[test]
    fn test_single_scan() {
        let mut driver = SimulatedDriver::new();
        let h = active(&mut driver);

        let mut meas = fast_meas(2048);
        meas.start_pixel = 100;
        meas.stop_pixel = 299;
        driver.prepare_measure(h, &meas).unwrap();
        driver.measure(h, 1).unwrap();
        wait_scan(&mut driver, h);

        let scope = driver.scope_data(h).unwrap();
        assert_eq!(scope.values.len(), 200);
        assert!(scope.values.iter().all(|v| *v >= 0.0 && *v <= MAX_PIXEL_VALUE as f64));
        assert!(!driver.poll_scan(h).unwrap(), "scan consumed");

        // Счётное измерение закончилось, можно готовить новое
        driver.prepare_measure(h, &meas).unwrap();
    }

    #[test]
    fn test_pending_measurement() {
        let mut driver = SimulatedDriver::new();
        let h = active(&mut driver);

        let mut meas = fast_meas(2048);
        meas.integration_time = 1_000.0;
        driver.prepare_measure(h, &meas).unwrap();
        driver.measure(h, -1).unwrap();

        assert!(driver.measure(h, 1).unwrap_err().is(AvsStatus::OperationPending));
        assert!(driver
            .prepare_measure(h, &meas)
            .unwrap_err()
            .is(AvsStatus::OperationPending));

        driver.stop_measure(h).unwrap();
        driver.measure(h, 2).unwrap();
        driver.stop_measure(h).unwrap();
    }

    #[test]
    fn test_saturation_bounded_by_averages() {
        let mut driver = SimulatedDriver::new();
        let h = active(&mut driver);

        let mut meas = fast_meas(2048);
        meas.integration_time = 60.0;
        meas.nr_averages = 3;
        driver.prepare_measure(h, &meas).unwrap();
        driver.measure(h, 1).unwrap();
        wait_scan(&mut driver, h);

        let scope = driver.scope_data(h).unwrap();
        let saturated = driver.saturated_pixels(h).unwrap();
        assert_eq!(saturated.len(), scope.values.len());
        assert!(saturated.iter().all(|s| *s <= 3));
        assert!(saturated.iter().any(|s| *s > 0), "546 nm line saturates");
    }

    #[test]
    fn test_lambda_follows_fit() {
        let mut driver = SimulatedDriver::new();
        let h = active(&mut driver);

        let lambda = driver.lambda(h).unwrap();
        assert_eq!(lambda.len(), 2048);
        assert!((lambda[0] - 175.3).abs() < 1e-3);
        assert!(lambda.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_io_ranges() {
        let mut driver = SimulatedDriver::new();
        let h = active(&mut driver);

        driver.set_analog_out(h, 0, 3.3).unwrap();
        assert!(driver.set_analog_out(h, 0, 3.4).is_err());
        assert!(driver.set_analog_out(h, 2, 1.0).is_err());

        driver.set_digital_out(h, 9, 1).unwrap();
        assert!(driver.set_digital_out(h, 10, 1).is_err());

        assert!((driver.analog_in(h, 2).unwrap() - 3.3).abs() < 1e-6);
        assert_eq!(driver.digital_in(h, 1).unwrap(), 0);
        driver.set_digital_out(h, 1, 1).unwrap();
        assert_eq!(driver.digital_in(h, 1).unwrap(), 1);

        driver.set_pwm_out(h, 1, 500, 50).unwrap();
        assert!(driver.set_pwm_out(h, 1, 499, 50).is_err());
        assert!(driver.set_pwm_out(h, 1, 300_001, 50).is_err());
        assert!(driver.set_pwm_out(h, 4, 1_000, 50).is_err());
        assert!(driver.set_pwm_out(h, 2, 1_000, 101).is_err());

        assert!((driver.analog_in(h, 4).unwrap() - 2.5).abs() < 1e-6);
        assert!(driver.analog_in(h, 8).is_err());
        assert!(driver.digital_in(h, 3).is_err());
    }

    #[test]
    fn test_sensitivity_mode_only_nir() {
        let mut driver = SimulatedDriver::new();
        driver.init(InitPort::Usb).unwrap();
        let list = driver.list().unwrap();
        let vis = driver.activate(&list[0]).unwrap();
        let nir = driver.activate(&list[1]).unwrap();

        assert!(driver
            .set_sensitivity_mode(vis, 1)
            .unwrap_err()
            .is(AvsStatus::NotSupportedBySensorType));
        driver.set_sensitivity_mode(nir, 1).unwrap();

        driver.set_sensitivity_mode(nir, 2).unwrap();
        assert_eq!(driver.devices[1].sensitivity_mode, 2);
        driver.set_sensitivity_mode(nir, 0).unwrap();
        assert_eq!(driver.devices[1].sensitivity_mode, 0);
    }

    #[test]
    fn test_sd_card_catch_up_scans_have_increasing_time_labels() {
        let mut driver = SimulatedDriver::new();
        let h = active(&mut driver);

        let sd = SdCard {
            enable: true,
            spectrum_type: SpectrumType::Dark.as_u8(),
            file_root_name: "cu".into(),
            timestamp: TimeStamp::from_ymd_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        };
        driver.save_spectra_to_sd_card(h, &sd).unwrap();

        let mut meas = MeasConfig::for_pixels(2048);
        meas.integration_time = 25.0;
        driver.prepare_measure(h, &meas).unwrap();
        driver.measure(h, 3).unwrap();

        // Все три скана догоняются за один опрос
        std::thread::sleep(Duration::from_millis(120));
        assert!(driver.poll_scan(h).unwrap());

        let labels: Vec<u32> = ["CU00.DRK", "CU01.DRK", "CU02.DRK"]
            .iter()
            .map(|name| {
                let size = driver.file_size(h, name).unwrap();
                let raw = driver.read_file(h, name, size).unwrap();
                u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]])
            })
            .collect();

        assert!(labels.windows(2).all(|w| w[1] > w[0]), "{labels:?}");
        assert_eq!(driver.scope_data(h).unwrap().time_label, labels[2]);
    }

    #[test]
    fn test_set_parameter_checks_detector() {
        let mut driver = SimulatedDriver::new();
        let h = active(&mut driver);

        let mut cfg = driver.parameter(h).unwrap();
        cfg.detector.nr_pixels = 0;
        assert!(driver
            .set_parameter(h, &cfg)
            .unwrap_err()
            .is(AvsStatus::InvalidParameterNrPixels));

        let mut cfg = driver.parameter(h).unwrap();
        cfg.user_friendly_id = "bench-1".into();
        driver.set_parameter(h, &cfg).unwrap();
        assert_eq!(driver.list().unwrap()[0].user_friendly_name, "bench-1");
    }

    #[test]
    fn test_sd_card_spectra_and_listing() {
        let mut driver = SimulatedDriver::new();
        let h = active(&mut driver);

        driver.set_directory(h, "run1").unwrap();
        let sd = SdCard {
            enable: true,
            spectrum_type: SpectrumType::Normal.as_u8(),
            file_root_name: "spec".into(),
            timestamp: TimeStamp::from_ymd_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        };
        driver.save_spectra_to_sd_card(h, &sd).unwrap();

        driver.prepare_measure(h, &fast_meas(2048)).unwrap();
        driver.measure(h, 1).unwrap();
        wait_scan(&mut driver, h);

        assert_eq!(driver.first_file(h).unwrap().as_deref(), Some("SPEC00.ROH"));
        assert_eq!(driver.next_file(h, "SPEC00.ROH").unwrap(), None);

        let size = driver.file_size(h, "spec00.roh").unwrap();
        assert_eq!(size as usize, 16 + 2048 * 8);
        assert_eq!(driver.read_file(h, "SPEC00.ROH", size).unwrap().len(), size as usize);

        assert_eq!(driver.first_directory(h).unwrap().as_deref(), Some("RUN1"));
        assert_eq!(driver.next_directory(h, "RUN1").unwrap(), None);
        assert!(driver
            .delete_directory(h, "RUN1")
            .unwrap_err()
            .is(AvsStatus::InvalidState));

        driver.delete_file(h, "SPEC00.ROH").unwrap();
        driver.delete_directory(h, "RUN1").unwrap();
        assert_eq!(driver.first_directory(h).unwrap(), None);
    }

    #[test]
    fn test_done_releases_handles() {
        let mut driver = SimulatedDriver::new();
        let h = active(&mut driver);
        driver.done().unwrap();

        assert!(driver
            .num_pixels(h)
            .unwrap_err()
            .is(AvsStatus::DllInitialisation));
    }
}
