//! `avaspec`: управление спектрометрами AvaSpec из командной строки.
//!
//! - `list`: приборы, найденные библиотекой
//! - `info`: версии и калибровка прибора
//! - `measure`: одно измерение (текст или JSON)
//! - `record`: непрерывная запись в `.avsr` файл
//! - `config`: просмотр, резервная копия и восстановление параметров
//! - `sd`: файлы и каталоги SD карты
//! - `io`: аналоговые, цифровые и ШИМ порты
//! - `mode`: режимы синхронизации, prescan, АЦП и чувствительности

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use avaspec_core::ConfigImage;
use avaspec_hal::{create_driver, Avs, DriverKind, Spectrometer};
use avaspec_recorder::{
    load_meas_config, open_for_recording, open_spectrometer, parse_integration_ms,
    RecorderConfig, RecorderError, RecorderResult, RecordingPipeline,
};
use avaspec_types::{InitPort, MeasConfig, ScopeData};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "avaspec",
    version = env!("CARGO_PKG_VERSION"),
    about = "Control AvaSpec AS5216 spectrometers",
    long_about = None,
)]
struct Cli {
    /// Драйвер: sim, as5216
    #[arg(long, global = true, default_value = "sim")]
    driver: String,
    /// Порт: auto, usb, com1..com4
    #[arg(short, long, global = true, default_value = "usb")]
    port: String,
    /// Серийный номер прибора (по умолчанию первый свободный)
    #[arg(short, long, global = true)]
    serial: Option<String>,
    /// Тихий режим (только ошибки)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Список подключённых приборов
    List,

    /// Версии и калибровка прибора
    Info,

    /// Одно измерение
    Measure {
        /// Время интегрирования (500ms, 1.5s, 250us)
        #[arg(short, long, default_value = "100ms")]
        integration: String,
        /// Кол-во усреднений
        #[arg(short, long, default_value = "1")]
        averages: u32,
        /// Конфигурация измерения в JSON (заменяет --integration/--averages)
        #[arg(long)]
        meas: Option<PathBuf>,
        /// Вывод в JSON
        #[arg(long)]
        json: bool,
    },

    /// Непрерывная запись спектров в файл
    Record {
        /// Путь к выходному файлу
        #[arg(short, long, default_value = "recording.avsr")]
        output: PathBuf,
        /// Время интегрирования (500ms, 1.5s, 250us)
        #[arg(short, long, default_value = "10ms")]
        integration: String,
        /// Кол-во усреднений
        #[arg(short, long, default_value = "1")]
        averages: u32,
        /// Конфигурация измерения в JSON
        #[arg(long)]
        meas: Option<PathBuf>,
        /// Ограничение записи (секунды). По умолчанию: до Ctrl+C
        #[arg(short, long)]
        duration: Option<u64>,
        /// Ограничение по кол-ву сканов
        #[arg(short = 'n', long)]
        max_scans: Option<u64>,
        /// Ёмкость канала захват -> запись (сканов)
        #[arg(long, default_value = "64")]
        channel_capacity: usize,
        /// Интервал вывода статистики (секунды)
        #[arg(long, default_value = "5")]
        stats_interval: u64,
    },

    /// Параметры прибора
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// SD карта
    Sd {
        #[command(subcommand)]
        action: SdAction,
    },

    /// Порты ввода-вывода
    Io {
        #[command(subcommand)]
        action: IoAction,
    },

    /// Режимы работы прибора
    Mode {
        #[command(subcommand)]
        action: ModeAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Показать основные параметры
    Show {
        /// Полный блок параметров в JSON
        #[arg(long)]
        json: bool,
    },
    /// Сохранить параметры в файл
    Backup { path: PathBuf },
    /// Записать параметры из файла в прибор
    Restore {
        path: PathBuf,
        /// Разрешить восстановление с другого прибора
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SdAction {
    /// Файлы текущего каталога
    Ls,
    /// Каталоги
    Dirs,
    /// Сменить каталог (пустое имя - корень)
    Cd {
        #[arg(default_value = "")]
        dir: String,
    },
    /// Скачать файл
    Get {
        name: String,
        /// Куда сохранить (по умолчанию имя файла)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Удалить файл
    Rm { name: String },
    /// Удалить пустой каталог
    Rmdir { name: String },
}

#[derive(Subcommand, Debug)]
enum IoAction {
    /// Аналоговый вход
    Ain { id: u8 },
    /// Цифровой вход
    Din { id: u8 },
    /// Аналоговый выход, вольты
    Aout { port: u8, volts: f32 },
    /// Цифровой выход, 0 или 1
    Dout { port: u8, state: u8 },
    /// ШИМ выход
    Pwm {
        port: u8,
        /// Частота, Гц
        freq: u32,
        /// Скважность, %
        duty: u8,
    },
}

#[derive(Subcommand, Debug)]
enum ModeAction {
    /// Синхронизация ведущий/ведомый
    Sync {
        #[arg(value_parser = parse_switch)]
        enable: bool,
    },
    /// Prescan режим (TCD1304)
    Prescan {
        #[arg(value_parser = parse_switch)]
        enable: bool,
    },
    /// 16-битный АЦП
    Highres {
        #[arg(value_parser = parse_switch)]
        enable: bool,
    },
    /// Режим чувствительности NIR детектора
    Sensitivity { mode: u32 },
}

/// Спектр для вывода `measure --json`.
#[derive(Serialize)]
struct SpectrumOutput<'a> {
    serial: &'a str,
    integration_ms: f32,
    nr_averages: u32,
    time_label: u32,
    wavelengths: &'a [f64],
    values: &'a [f64],
}

fn parse_switch(s: &str) -> Result<bool, String> {
    match s.to_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok(true),
        "off" | "false" | "0" | "no" => Ok(false),
        _ => Err(format!("Expected on/off, got '{s}'")),
    }
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.quiet { "error" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_target(false)
        .format_timestamp_secs()
        .init();

    if let Err(e) = run(cli) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> RecorderResult<()> {
    let base = RecorderConfig {
        driver: cli.driver.parse::<DriverKind>().map_err(RecorderError::Config)?,
        port: cli.port.parse::<InitPort>().map_err(RecorderError::Config)?,
        serial: cli.serial.clone(),
        ..RecorderConfig::default()
    };

    match cli.command {
        Command::List => list(&base),
        Command::Info => info_cmd(&open_spectrometer(&base)?),
        Command::Measure {
            integration,
            averages,
            meas,
            json,
        } => {
            let mut spec = open_spectrometer(&base)?;
            let meas = meas_from_args(&spec, &integration, averages, meas)?;
            measure(&mut spec, &meas, json)
        }
        Command::Record {
            output,
            integration,
            averages,
            meas,
            duration,
            max_scans,
            channel_capacity,
            stats_interval,
        } => {
            let config = RecorderConfig {
                meas: meas.map(load_meas_config).transpose()?,
                integration_ms: parse_integration_ms(&integration).map_err(RecorderError::Config)?,
                nr_averages: averages,
                output_path: output,
                duration_secs: duration,
                max_scans,
                channel_capacity,
                stats_interval_secs: stats_interval,
                ..base
            };
            record(config)
        }
        Command::Config { action } => config_cmd(&mut open_spectrometer(&base)?, action),
        Command::Sd { action } => sd_cmd(&open_spectrometer(&base)?, action),
        Command::Io { action } => io_cmd(&open_spectrometer(&base)?, action),
        Command::Mode { action } => mode_cmd(&open_spectrometer(&base)?, action),
    }
}

fn meas_from_args(
    spec: &Spectrometer,
    integration: &str,
    averages: u32,
    path: Option<PathBuf>,
) -> RecorderResult<MeasConfig> {
    if let Some(path) = path {
        return load_meas_config(path);
    }

    Ok(MeasConfig {
        integration_time: parse_integration_ms(integration).map_err(RecorderError::Config)?,
        nr_averages: averages,
        ..spec.default_meas_config()
    })
}

fn list(base: &RecorderConfig) -> RecorderResult<()> {
    let avs = Avs::open(create_driver(base.driver)?, base.port)?;
    let devices = avs.devices()?;

    if devices.is_empty() {
        warn!("No spectrometers found on {}", base.port);
        return Ok(());
    }

    for id in devices {
        println!(
            "{:<12} {:<24} {}",
            id.serial_number, id.user_friendly_name, id.status
        );
    }
    Ok(())
}

fn info_cmd(spec: &Spectrometer) -> RecorderResult<()> {
    let version = spec.version_info()?;
    let config = spec.parameter()?;
    let det = &config.detector;

    println!("Serial        : {}", spec.serial());
    println!("Name          : {}", config.user_friendly_id);
    println!("Sensor        : {}", det.sensor_type.name());
    println!("Pixels        : {}", det.nr_pixels);
    println!("Wavelength fit: {:?}", det.fit);
    println!("FPGA          : {}", version.fpga);
    println!("Firmware      : {}", version.firmware);
    println!("Library       : {}", version.dll);

    let lambda = spec.lambda()?;
    if let (Some(first), Some(last)) = (lambda.first(), lambda.last()) {
        println!("Range         : {first:.2} .. {last:.2} nm");
    }
    Ok(())
}

fn measure(
    spec: &mut Spectrometer,
    meas: &MeasConfig,
    json: bool,
) -> RecorderResult<()> {
    let scope: ScopeData = spec.acquire(meas)?;
    let wavelengths = spec.prepared_lambda()?;

    if json {
        let out = SpectrumOutput {
            serial: spec.serial(),
            integration_ms: meas.integration_time,
            nr_averages: meas.nr_averages,
            time_label: scope.time_label,
            wavelengths: &wavelengths,
            values: &scope.values,
        };
        let text = serde_json::to_string_pretty(&out)
            .map_err(|e| RecorderError::Pipeline(e.to_string()))?;
        println!("{text}");
    } else {
        for (nm, v) in wavelengths.iter().zip(&scope.values) {
            println!("{nm:.3}\t{v:.1}");
        }
    }
    Ok(())
}

fn record(config: RecorderConfig) -> RecorderResult<()> {
    let spectrometer = open_for_recording(&config)?;
    let output = config.output_path.clone();

    let (pipeline, metrics) = RecordingPipeline::new(config);
    let stop_flag: Arc<AtomicBool> = pipeline.stop_flag();
    let stop_ctrlc = stop_flag.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        if stop_ctrlc.swap(true, Ordering::SeqCst) {
            // Второй Ctrl+C - принудительный выход
            warn!("Force exit");
            std::process::exit(130);
        }
        warn!("Ctrl+C received, finalizing file...");
    }) {
        warn!("Failed to set Ctrl+C handler: {e}");
    }

    let session_start = Instant::now();
    pipeline.run(spectrometer)?;

    let summary = metrics.summary(&session_start);
    info!("\n{summary}");

    if summary.scans_dropped > 0 {
        warn!(
            "⚠ {} scans dropped ({:.2}% loss). Consider: larger --channel-capacity or more averages",
            summary.scans_dropped, summary.drop_rate_pct
        );
    }

    if summary.write_errors > 0 {
        return Err(RecorderError::Pipeline(format!(
            "{} write errors occurred. Check disk space and I/O.",
            summary.write_errors
        )));
    }

    info!("✓ Recording complete: {output:?}");
    Ok(())
}

fn config_cmd(
    spec: &mut Spectrometer,
    action: ConfigAction,
) -> RecorderResult<()> {
    match action {
        ConfigAction::Show { json } => {
            let config = spec.parameter()?;
            if json {
                let text = serde_json::to_string_pretty(&config)
                    .map_err(|e| RecorderError::Pipeline(e.to_string()))?;
                println!("{text}");
            } else {
                println!("Config version: {}", config.config_version);
                println!("Name          : {}", config.user_friendly_id);
                println!("Sensor        : {}", config.detector.sensor_type.name());
                println!("Pixels        : {}", config.detector.nr_pixels);
                println!("Stand-alone   : {}", config.stand_alone.enable);
                println!("TEC           : {}", config.tec_control.enable);
            }
        }
        ConfigAction::Backup { path } => {
            ConfigImage::new(spec.serial(), spec.parameter()?).save(&path)?;
            info!("Configuration of {} saved to {path:?}", spec.serial());
        }
        ConfigAction::Restore { path, force } => {
            let image = ConfigImage::load(&path)?;
            if image.serial != spec.identity().serial_number && !force {
                return Err(RecorderError::Config(format!(
                    "{path:?} was taken from {}, not {}. Use --force to restore anyway",
                    image.serial,
                    spec.serial()
                )));
            }
            spec.set_parameter(&image.config)?;
            info!("Configuration restored to {} from {path:?}", spec.serial());
        }
    }
    Ok(())
}

fn sd_cmd(
    spec: &Spectrometer,
    action: SdAction,
) -> RecorderResult<()> {
    match action {
        SdAction::Ls => {
            for name in spec.sd_files() {
                let name = name?;
                let size = spec.file_size(&name)?;
                println!("{name:<14} {size:>10}");
            }
        }
        SdAction::Dirs => {
            for name in spec.sd_directories() {
                println!("{}", name?);
            }
        }
        SdAction::Cd { dir } => spec.set_directory(&dir)?,
        SdAction::Get { name, output } => {
            let data = spec.download(&name)?;
            let path = output.unwrap_or_else(|| PathBuf::from(&name));
            std::fs::write(&path, &data)?;
            info!("{name}: {} bytes -> {path:?}", data.len());
        }
        SdAction::Rm { name } => spec.delete_file(&name)?,
        SdAction::Rmdir { name } => spec.delete_directory(&name)?,
    }
    Ok(())
}

fn io_cmd(
    spec: &Spectrometer,
    action: IoAction,
) -> RecorderResult<()> {
    match action {
        IoAction::Ain { id } => println!("{:.3} V", spec.analog_in(id)?),
        IoAction::Din { id } => println!("{}", spec.digital_in(id)?),
        IoAction::Aout { port, volts } => spec.set_analog_out(port, volts)?,
        IoAction::Dout { port, state } => spec.set_digital_out(port, state)?,
        IoAction::Pwm { port, freq, duty } => spec.set_pwm_out(port, freq, duty)?,
    }
    Ok(())
}

fn mode_cmd(
    spec: &Spectrometer,
    action: ModeAction,
) -> RecorderResult<()> {
    match action {
        ModeAction::Sync { enable } => spec.set_sync_mode(enable)?,
        ModeAction::Prescan { enable } => spec.set_prescan_mode(enable)?,
        ModeAction::Highres { enable } => spec.use_high_res_adc(enable)?,
        ModeAction::Sensitivity { mode } => spec.set_sensitivity_mode(mode)?,
    }
    Ok(())
}
