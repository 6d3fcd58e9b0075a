//! Байт-точный кодек структур AS5216
//!
//! Упакованное little-endian представление всех структур заголовка
//! библиотеки AS5216, образы конфигурации прибора и файлы записи спектров.
//!
//! # Быстрый старт
//!
//! ```no_run
//! use avaspec_core::{ConfigImage, Wire};
//! use avaspec_types::{DeviceConfig, MeasConfig};
//!
//! let meas = MeasConfig::for_pixels(2048);
//! assert_eq!(meas.to_bytes()?.len(), 41);
//!
//! let image = ConfigImage::new("1102185U1", DeviceConfig::default());
//! image.save("backup.avsc")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod binary;
pub mod format;
pub mod image;
pub mod recording;

pub use binary::*;
pub use format::*;
pub use image::*;
pub use recording::*;

/// Версия библиотеки.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        assert_eq!(RECORDING_VERSION, 1);
        assert_eq!(RECORDING_HEADER_SIZE, 128);
        assert_eq!(IMAGE_HEADER_SIZE, 32);
    }
}
