use avaspec_types::AvsError;
use thiserror::Error;

pub type RecorderResult<T> = std::result::Result<T, RecorderError>;

#[derive(Debug, Error)]
pub enum RecorderError {
    /// Прибор с указанным серийным номером не подключён
    #[error("Spectrometer not found: {0}")]
    DeviceNotFound(String),

    /// Ошибка библиотеки или прибора
    #[error("Spectrometer error: {0}")]
    Avs(#[from] AvsError),

    /// Ошибка ввода-вывода
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Некорректная конфигурация записи
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Ошибка пайплайна (inter-thread)
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}
