use std::{
    fs::File,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use avaspec_core::{RecordingHeader, ScanRecord, ScanWriter};
use avaspec_hal::{create_driver, Avs, Spectrometer, POLL_INTERVAL};
use avaspec_types::{AvsStatus, SAT_DISABLE_DET};
use crossbeam_channel::{RecvTimeoutError, Sender, TrySendError};
use log::{debug, info, warn};

use crate::{metrics::RecorderMetrics, RecorderConfig, RecorderError, RecorderResult};

/// Оркестрирует сессию записи.
pub struct RecordingPipeline {
    config: RecorderConfig,
    metrics: Arc<RecorderMetrics>,
    stop_flag: Arc<AtomicBool>,
}

/// Открывает библиотеку и активирует прибор из конфигурации.
pub fn open_spectrometer(config: &RecorderConfig) -> RecorderResult<Spectrometer> {
    let driver = create_driver(config.driver)?;
    let avs = Avs::open(driver, config.port)?;

    info!(
        "{} driver on {}: {} device(s)",
        avs.driver_name(),
        avs.port(),
        avs.device_count()
    );

    let spectrometer = match &config.serial {
        Some(serial) => avs.activate_serial(serial).map_err(|e| {
            if e.is(AvsStatus::DeviceNotFound) {
                RecorderError::DeviceNotFound(serial.clone())
            } else {
                e.into()
            }
        })?,
        None => avs.activate_first()?,
    };

    Ok(spectrometer)
}

/// Проверяет параметры записи и только затем открывает прибор.
pub fn open_for_recording(config: &RecorderConfig) -> RecorderResult<Spectrometer> {
    config.validate()?;
    open_spectrometer(config)
}

impl RecordingPipeline {
    /// Создаёт пайплайн. Возвращает также shared-ссылку на метрики.
    pub fn new(config: RecorderConfig) -> (Self, Arc<RecorderMetrics>) {
        let metrics = RecorderMetrics::new();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let p = Self {
            config,
            metrics: metrics.clone(),
            stop_flag,
        };

        (p, metrics)
    }

    /// Флаг остановки. Устанавливает в `true` для graceful shutdown.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    /// Запускает запись. Блокируется до завершения.
    ///
    /// Прибор уходит в поток захвата и освобождается по его завершении.
    pub fn run(
        self,
        mut spectrometer: Spectrometer,
    ) -> RecorderResult<()> {
        self.config.validate()?;

        let meas = self.config.meas_for(spectrometer.num_pixels());
        spectrometer.prepare(&meas)?;
        let wavelengths = spectrometer.prepared_lambda()?;

        info!(
            "Starting recording: {} pixels {}..={}, {} ms x {}",
            spectrometer.serial(),
            meas.start_pixel,
            meas.stop_pixel,
            meas.integration_time,
            meas.nr_averages
        );

        info!(
            "Output: {:?}, duration: {:?}, scans: {:?}",
            self.config.output_path, self.config.duration_secs, self.config.max_scans
        );

        let header = RecordingHeader::new(spectrometer.serial(), &meas);
        let file = File::create(&self.config.output_path)?;
        let writer = ScanWriter::new(file, header, &wavelengths)?;

        let (tx, rx) = crossbeam_channel::bounded::<ScanRecord>(self.config.channel_capacity);
        let stop_flag = self.stop_flag.clone();
        let stop_flag_capture = stop_flag.clone();
        let metrics_capture = self.metrics.clone();
        let with_saturation = meas.saturation_detection != SAT_DISABLE_DET;

        // Захват
        let capture_handle = std::thread::spawn(move || {
            let result = capture_loop(
                &mut spectrometer,
                with_saturation,
                tx,
                &metrics_capture,
                &stop_flag_capture,
            );

            if let Err(ref e) = result {
                warn!("Capture thread error: {e}");
            }

            if spectrometer.is_measuring() {
                if let Err(e) = spectrometer.stop_measure() {
                    warn!("Failed to stop measurement: {e}");
                }
            }

            result
        });

        // Цикл записи (текущий поток)
        let writer_result = self.writer_loop(writer, rx);

        stop_flag.store(true, Ordering::Relaxed);

        let capture_result = match capture_handle.join() {
            Ok(r) => r,
            Err(_) => Err(RecorderError::Pipeline(
                "capture thread panicked".to_string(),
            )),
        };

        writer_result.and(capture_result)
    }

    fn writer_loop(
        &self,
        mut writer: ScanWriter<File>,
        rx: crossbeam_channel::Receiver<ScanRecord>,
    ) -> RecorderResult<()> {
        let cfg = &self.config;
        let metrics = &self.metrics;

        metrics
            .bytes_written
            .fetch_add(writer.bytes_written(), Ordering::Relaxed);

        let recv_timeout = Duration::from_millis(100);
        let stats_interval = Duration::from_secs(cfg.stats_interval_secs);

        let session_start = Instant::now();
        let mut last_stats = Instant::now();

        loop {
            if let Some(dur) = cfg.duration_secs {
                if session_start.elapsed().as_secs() >= dur {
                    info!("Duration limit reached ({dur}s). Finalizing...");
                    break;
                }
            }

            if let Some(max) = cfg.max_scans {
                if writer.scan_count() >= max {
                    info!("Scan limit reached ({max}). Finalizing...");
                    break;
                }
            }

            if self.stop_flag.load(Ordering::Relaxed) {
                info!("Stop signal received. Finalizing...");
                break;
            }

            let scan = match rx.recv_timeout(recv_timeout) {
                Ok(s) => s,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    info!("Capture channel closed. Finalizing...");
                    break;
                }
            };

            match writer.write_scan(&scan) {
                Ok(n) => {
                    metrics.scans_written.fetch_add(1, Ordering::Relaxed);
                    metrics
                        .bytes_written
                        .fetch_add(n as u64, Ordering::Relaxed);
                }
                Err(e) => {
                    metrics.write_errors.fetch_add(1, Ordering::Relaxed);
                    warn!("Write error: {e}");
                }
            }

            if last_stats.elapsed() >= stats_interval {
                self.log_progress(&session_start);
                last_stats = Instant::now();
            }
        }

        // Перезаписываем заголовок с итоговым кол-вом сканов
        let header = writer.finish()?;

        info!(
            "File finalized: {:?} ({} scans)",
            cfg.output_path, header.scan_count
        );
        Ok(())
    }

    fn log_progress(
        &self,
        start: &Instant,
    ) {
        let m = &self.metrics;

        info!(
            "[ {:.0}s ] scans={} written={} dropped={} ({:.2}%) saturated={} rate={:.1}Hz",
            start.elapsed().as_secs_f64(),
            m.scans_acquired.load(Ordering::Relaxed),
            m.scans_written.load(Ordering::Relaxed),
            m.scans_dropped.load(Ordering::Relaxed),
            m.drop_rate_pct(),
            m.saturated_scans.load(Ordering::Relaxed),
            m.scan_rate_hz(start),
        );
    }
}

/// Непрерывное измерение: опрос прибора и отправка сканов в канал.
///
/// При переполнении канала скан отбрасывается и учитывается в метриках.
fn capture_loop(
    spectrometer: &mut Spectrometer,
    with_saturation: bool,
    tx: Sender<ScanRecord>,
    metrics: &RecorderMetrics,
    stop_flag: &AtomicBool,
) -> RecorderResult<()> {
    spectrometer.measure(-1)?;

    while !stop_flag.load(Ordering::Relaxed) {
        if !spectrometer.poll_scan()? {
            std::thread::sleep(POLL_INTERVAL);
            continue;
        }

        let scope = spectrometer.scope_data()?;
        let saturated = if with_saturation {
            spectrometer.saturated_pixels()?
        } else {
            Vec::new()
        };

        let scan = ScanRecord::from_scope(scope, saturated);
        metrics.scans_acquired.fetch_add(1, Ordering::Relaxed);

        if scan.is_saturated() {
            metrics.saturated_scans.fetch_add(1, Ordering::Relaxed);
        }

        match tx.try_send(scan) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                metrics.scans_dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("Writer gone, stopping capture");
                break;
            }
        }
    }

    spectrometer.stop_measure()?;
    Ok(())
}
