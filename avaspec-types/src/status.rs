use serde::{Deserialize, Serialize};

/// Группа, к которой относится код ошибки библиотеки.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Общие ошибки (-1..=-21)
    General,
    /// Проверка DeviceData при `AVS_SetParameter` (-100..=-102)
    DeviceData,
    /// Проверка параметров `AVS_PrepareMeasure` (-110..=-116)
    MeasParam,
    /// Проверка `AVS_SetSensitivityMode` (-120..=-122)
    Sensitivity,
}

/// Отрицательные коды возврата библиотеки AS5216.
///
/// Значения стабильны: они приходят из прибора и библиотеки как есть.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum AvsStatus {
    InvalidParameter = -1,
    OperationNotSupported = -2,
    DeviceNotFound = -3,
    InvalidDeviceId = -4,
    OperationPending = -5,
    Timeout = -6,
    InvalidPassword = -7,
    InvalidMeasData = -8,
    InvalidSize = -9,
    InvalidPixelRange = -10,
    InvalidIntTime = -11,
    InvalidCombination = -12,
    InvalidConfiguration = -13,
    NoMeasBufferAvail = -14,
    Unknown = -15,
    Communication = -16,
    NoSpectraInRam = -17,
    InvalidDllVersion = -18,
    NoMemory = -19,
    DllInitialisation = -20,
    InvalidState = -21,

    InvalidParameterNrPixels = -100,
    InvalidParameterAdcGain = -101,
    InvalidParameterAdcOffset = -102,

    InvalidMeasparamAvgSat2 = -110,
    InvalidMeasparamAvgRam = -111,
    InvalidMeasparamSyncRam = -112,
    InvalidMeasparamLevelRam = -113,
    InvalidMeasparamSat2Ram = -114,
    InvalidMeasparamFwverRam = -115,
    InvalidMeasparamDyndark = -116,

    NotSupportedBySensorType = -120,
    NotSupportedByFwVer = -121,
    NotSupportedByFpgaVer = -122,
}

/// Код успешного завершения.
pub const ERR_SUCCESS: i32 = 0;

impl AvsStatus {
    /// Все коды в порядке объявления.
    pub const ALL: [AvsStatus; 34] = [
        AvsStatus::InvalidParameter,
        AvsStatus::OperationNotSupported,
        AvsStatus::DeviceNotFound,
        AvsStatus::InvalidDeviceId,
        AvsStatus::OperationPending,
        AvsStatus::Timeout,
        AvsStatus::InvalidPassword,
        AvsStatus::InvalidMeasData,
        AvsStatus::InvalidSize,
        AvsStatus::InvalidPixelRange,
        AvsStatus::InvalidIntTime,
        AvsStatus::InvalidCombination,
        AvsStatus::InvalidConfiguration,
        AvsStatus::NoMeasBufferAvail,
        AvsStatus::Unknown,
        AvsStatus::Communication,
        AvsStatus::NoSpectraInRam,
        AvsStatus::InvalidDllVersion,
        AvsStatus::NoMemory,
        AvsStatus::DllInitialisation,
        AvsStatus::InvalidState,
        AvsStatus::InvalidParameterNrPixels,
        AvsStatus::InvalidParameterAdcGain,
        AvsStatus::InvalidParameterAdcOffset,
        AvsStatus::InvalidMeasparamAvgSat2,
        AvsStatus::InvalidMeasparamAvgRam,
        AvsStatus::InvalidMeasparamSyncRam,
        AvsStatus::InvalidMeasparamLevelRam,
        AvsStatus::InvalidMeasparamSat2Ram,
        AvsStatus::InvalidMeasparamFwverRam,
        AvsStatus::InvalidMeasparamDyndark,
        AvsStatus::NotSupportedBySensorType,
        AvsStatus::NotSupportedByFwVer,
        AvsStatus::NotSupportedByFpgaVer,
    ];

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.code() == code)
    }

    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Имя кода в написании заголовка (`ERR_TIMEOUT` и т.п.).
    pub fn name(&self) -> &'static str {
        match self {
            AvsStatus::InvalidParameter => "ERR_INVALID_PARAMETER",
            AvsStatus::OperationNotSupported => "ERR_OPERATION_NOT_SUPPORTED",
            AvsStatus::DeviceNotFound => "ERR_DEVICE_NOT_FOUND",
            AvsStatus::InvalidDeviceId => "ERR_INVALID_DEVICE_ID",
            AvsStatus::OperationPending => "ERR_OPERATION_PENDING",
            AvsStatus::Timeout => "ERR_TIMEOUT",
            AvsStatus::InvalidPassword => "ERR_INVALID_PASSWORD",
            AvsStatus::InvalidMeasData => "ERR_INVALID_MEAS_DATA",
            AvsStatus::InvalidSize => "ERR_INVALID_SIZE",
            AvsStatus::InvalidPixelRange => "ERR_INVALID_PIXEL_RANGE",
            AvsStatus::InvalidIntTime => "ERR_INVALID_INT_TIME",
            AvsStatus::InvalidCombination => "ERR_INVALID_COMBINATION",
            AvsStatus::InvalidConfiguration => "ERR_INVALID_CONFIGURATION",
            AvsStatus::NoMeasBufferAvail => "ERR_NO_MEAS_BUFFER_AVAIL",
            AvsStatus::Unknown => "ERR_UNKNOWN",
            AvsStatus::Communication => "ERR_COMMUNICATION",
            AvsStatus::NoSpectraInRam => "ERR_NO_SPECTRA_IN_RAM",
            AvsStatus::InvalidDllVersion => "ERR_INVALID_DLL_VERSION",
            AvsStatus::NoMemory => "ERR_NO_MEMORY",
            AvsStatus::DllInitialisation => "ERR_DLL_INITIALISATION",
            AvsStatus::InvalidState => "ERR_INVALID_STATE",
            AvsStatus::InvalidParameterNrPixels => "ERR_INVALID_PARAMETER_NR_PIXELS",
            AvsStatus::InvalidParameterAdcGain => "ERR_INVALID_PARAMETER_ADC_GAIN",
            AvsStatus::InvalidParameterAdcOffset => "ERR_INVALID_PARAMETER_ADC_OFFSET",
            AvsStatus::InvalidMeasparamAvgSat2 => "ERR_INVALID_MEASPARAM_AVG_SAT2",
            AvsStatus::InvalidMeasparamAvgRam => "ERR_INVALID_MEASPARAM_AVG_RAM",
            AvsStatus::InvalidMeasparamSyncRam => "ERR_INVALID_MEASPARAM_SYNC_RAM",
            AvsStatus::InvalidMeasparamLevelRam => "ERR_INVALID_MEASPARAM_LEVEL_RAM",
            AvsStatus::InvalidMeasparamSat2Ram => "ERR_INVALID_MEASPARAM_SAT2_RAM",
            AvsStatus::InvalidMeasparamFwverRam => "ERR_INVALID_MEASPARAM_FWVER_RAM",
            AvsStatus::InvalidMeasparamDyndark => "ERR_INVALID_MEASPARAM_DYNDARK",
            AvsStatus::NotSupportedBySensorType => "ERR_NOT_SUPPORTED_BY_SENSOR_TYPE",
            AvsStatus::NotSupportedByFwVer => "ERR_NOT_SUPPORTED_BY_FW_VER",
            AvsStatus::NotSupportedByFpgaVer => "ERR_NOT_SUPPORTED_BY_FPGA_VER",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.code() {
            -102..=-100 => ErrorCategory::DeviceData,
            -116..=-110 => ErrorCategory::MeasParam,
            -122..=-120 => ErrorCategory::Sensitivity,
            _ => ErrorCategory::General,
        }
    }
}

impl std::fmt::Display for AvsStatus {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let codes: HashSet<i32> = AvsStatus::ALL.iter().map(|s| s.code()).collect();
        assert_eq!(codes.len(), AvsStatus::ALL.len());
        assert!(!codes.contains(&ERR_SUCCESS));
    }

    #[test]
    fn test_from_code_round_trip() {
        for s in AvsStatus::ALL {
            assert_eq!(AvsStatus::from_code(s.code()), Some(s));
        }
        assert_eq!(AvsStatus::from_code(0), None);
        assert_eq!(AvsStatus::from_code(-99), None);
    }

    #[test]
    fn test_stable_values() {
        assert_eq!(AvsStatus::InvalidParameter.code(), -1);
        assert_eq!(AvsStatus::InvalidSize.code(), -9);
        assert_eq!(AvsStatus::InvalidState.code(), -21);
        assert_eq!(AvsStatus::InvalidParameterNrPixels.code(), -100);
        assert_eq!(AvsStatus::InvalidMeasparamDyndark.code(), -116);
        assert_eq!(AvsStatus::NotSupportedByFpgaVer.code(), -122);
    }

    #[test]
    fn test_categories() {
        assert_eq!(AvsStatus::Timeout.category(), ErrorCategory::General);
        assert_eq!(
            AvsStatus::InvalidParameterAdcGain.category(),
            ErrorCategory::DeviceData
        );
        assert_eq!(
            AvsStatus::InvalidMeasparamAvgRam.category(),
            ErrorCategory::MeasParam
        );
        assert_eq!(
            AvsStatus::NotSupportedBySensorType.category(),
            ErrorCategory::Sensitivity
        );
    }

    #[test]
    fn test_display_uses_header_name() {
        assert_eq!(AvsStatus::Timeout.to_string(), "ERR_TIMEOUT (-6)");
    }
}
