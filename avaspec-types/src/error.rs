use thiserror::Error;

use crate::AvsStatus;

/// Результат для операций AvaSpec
pub type AvsResult<T> = std::result::Result<T, AvsError>;

/// Типы ошибок интерфейса AvaSpec.
#[derive(Debug, Error)]
pub enum AvsError {
    /// Библиотека или прибор вернули известный код ошибки
    #[error("Device error: {0}")]
    Device(AvsStatus),

    /// Отрицательный код, которого нет в заголовке
    #[error("Unknown error code: {0}")]
    UnknownCode(i32),

    /// `AVS_Activate`/`AVS_GetHandleFromSerial` вернули INVALID_AVS_HANDLE_VALUE
    #[error("Invalid device handle: {0}")]
    InvalidHandle(String),

    /// Функция сообщила о неудаче без кода (bool результат)
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// Буфер короче, чем требует структура
    #[error("Truncated data: needed {needed} bytes, found {found}")]
    Truncated { needed: usize, found: usize },

    /// Неправильное магическое число файла
    #[error("Invalid magic: {0}")]
    InvalidMagic(String),

    /// Несовместимая версия формата файла
    #[error("Unsupported version: found {found}, expected {expected}")]
    UnsupportedVersion { found: u8, expected: u8 },

    /// Несовпадение CRC32 (ожидалось/найдено)
    #[error("CRC mismatch: expected {expected:08x}, found {found:08x}")]
    CrcMismatch { expected: u32, found: u32 },

    /// Нарушение фиксированной раскладки структуры или формата файла
    #[error("Format violation: {0}")]
    FormatViolation(String),

    /// Ошибки ввода/вывода (автоконвертируются из std::io::Error)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AvsError {
    /// Ошибка по известному коду.
    pub fn status(status: AvsStatus) -> Self {
        Self::Device(status)
    }

    /// Ошибка по сырому отрицательному коду.
    pub fn from_code(code: i32) -> Self {
        match AvsStatus::from_code(code) {
            Some(status) => Self::Device(status),
            None => Self::UnknownCode(code),
        }
    }

    pub fn format_violation<S: Into<String>>(s: S) -> Self {
        Self::FormatViolation(s.into())
    }

    pub fn invalid_magic<S: Into<String>>(s: S) -> Self {
        Self::InvalidMagic(s.into())
    }

    /// Код библиотеки, если ошибка пришла от неё.
    pub fn code(&self) -> Option<i32> {
        match self {
            AvsError::Device(s) => Some(s.code()),
            AvsError::UnknownCode(c) => Some(*c),
            _ => None,
        }
    }

    /// `true`, если ошибка соответствует данному коду.
    pub fn is(
        &self,
        status: AvsStatus,
    ) -> bool {
        matches!(self, AvsError::Device(s) if *s == status)
    }
}

/// Проверяет код возврата: неотрицательные значения (успех или счётчик)
/// проходят как есть, отрицательные превращаются в ошибку.
pub fn check(code: i32) -> AvsResult<i32> {
    if code >= 0 {
        Ok(code)
    } else {
        Err(AvsError::from_code(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_passes_counts() {
        assert_eq!(check(0).unwrap(), 0);
        assert_eq!(check(3).unwrap(), 3);
    }

    #[test]
    fn test_check_maps_known_codes() {
        let err = check(-6).unwrap_err();
        assert!(err.is(AvsStatus::Timeout));
        assert_eq!(err.code(), Some(-6));
        assert!(err.to_string().contains("ERR_TIMEOUT"));
    }

    #[test]
    fn test_check_keeps_unknown_codes() {
        let err = check(-55).unwrap_err();
        assert!(matches!(err, AvsError::UnknownCode(-55)));
        assert_eq!(err.code(), Some(-55));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err: AvsError = io.into();
        assert!(err.code().is_none());
        assert!(err.to_string().starts_with("I/O error"));
    }
}
