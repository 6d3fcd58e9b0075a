use serde::{Deserialize, Serialize};

use crate::{consts::INVALID_AVS_HANDLE_VALUE, FixedStr};

/// Состояние прибора в списке `AVS_GetList` (`DEVICE_STATUS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceStatus {
    /// 0 или байт вне перечисления, хранится как есть
    Unknown(u8),
    Available,
    InUseByApplication,
    InUseByOther,
}

impl DeviceStatus {
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => DeviceStatus::Available,
            2 => DeviceStatus::InUseByApplication,
            3 => DeviceStatus::InUseByOther,
            other => DeviceStatus::Unknown(other),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            DeviceStatus::Unknown(v) => *v,
            DeviceStatus::Available => 1,
            DeviceStatus::InUseByApplication => 2,
            DeviceStatus::InUseByOther => 3,
        }
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            DeviceStatus::Unknown(0) => write!(f, "unknown"),
            DeviceStatus::Unknown(v) => write!(f, "unknown ({v})"),
            DeviceStatus::Available => write!(f, "available"),
            DeviceStatus::InUseByApplication => write!(f, "in use (this application)"),
            DeviceStatus::InUseByOther => write!(f, "in use (other application)"),
        }
    }
}

/// Идентификация прибора (`AvsIdentityType`, 75 байт).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvsIdentity {
    /// Серийный номер (до 10 символов)
    pub serial_number: FixedStr,
    /// Пользовательское имя (до 64 символов)
    pub user_friendly_name: FixedStr,
    pub status: DeviceStatus,
}

impl AvsIdentity {
    pub fn new<S: Into<FixedStr>>(serial_number: S) -> Self {
        Self {
            serial_number: serial_number.into(),
            user_friendly_name: FixedStr::default(),
            status: DeviceStatus::Unknown(0),
        }
    }
}

/// Хэндл активированного прибора.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvsHandle(pub i64);

impl AvsHandle {
    pub const INVALID: AvsHandle = AvsHandle(INVALID_AVS_HANDLE_VALUE);

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    pub fn raw(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for AvsHandle {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Версии FPGA, прошивки и библиотеки (`AVS_GetVersionInfo`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub fpga: String,
    pub firmware: String,
    pub dll: String,
}

/// Выбор порта при `AVS_Init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitPort {
    /// -1: библиотека сама ищет порт
    Auto,
    /// 0: USB
    Usb,
    /// 1..=4: COM порт
    Com(u8),
}

impl InitPort {
    pub fn as_raw(&self) -> i16 {
        match self {
            InitPort::Auto => -1,
            InitPort::Usb => 0,
            InitPort::Com(n) => *n as i16,
        }
    }
}

impl std::str::FromStr for InitPort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "auto" | "-1" => Ok(InitPort::Auto),
            "usb" | "0" => Ok(InitPort::Usb),
            _ => {
                let n = lower.strip_prefix("com").unwrap_or(&lower);
                match n.parse::<u8>() {
                    Ok(n @ 1..=4) => Ok(InitPort::Com(n)),
                    _ => Err(format!("Unknown port '{s}'. Use: auto, usb, com1..com4")),
                }
            }
        }
    }
}

impl std::fmt::Display for InitPort {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            InitPort::Auto => write!(f, "auto"),
            InitPort::Usb => write!(f, "usb"),
            InitPort::Com(n) => write!(f, "com{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_status_round_trip() {
        for v in 0..4u8 {
            assert_eq!(DeviceStatus::from_u8(v).as_u8(), v);
        }
        assert_eq!(DeviceStatus::from_u8(0), DeviceStatus::Unknown(0));
        assert_eq!(DeviceStatus::from_u8(9), DeviceStatus::Unknown(9));
        assert_eq!(DeviceStatus::from_u8(9).as_u8(), 9);
        assert_eq!(DeviceStatus::from_u8(9).to_string(), "unknown (9)");
    }

    #[test]
    fn test_invalid_handle() {
        assert!(!AvsHandle(1000).is_valid());
        assert!(AvsHandle(1).is_valid());
    }

    #[test]
    fn test_init_port_parse() {
        assert_eq!("auto".parse::<InitPort>().unwrap(), InitPort::Auto);
        assert_eq!("USB".parse::<InitPort>().unwrap(), InitPort::Usb);
        assert_eq!("com3".parse::<InitPort>().unwrap(), InitPort::Com(3));
        assert_eq!("2".parse::<InitPort>().unwrap(), InitPort::Com(2));
        assert!("com5".parse::<InitPort>().is_err());
        assert_eq!(InitPort::Com(4).as_raw(), 4);
        assert_eq!(InitPort::Auto.as_raw(), -1);
    }
}
