use serde::{Deserialize, Serialize};

/// Тип детектора спектрометра (`SENS_TYPE`).
///
/// Байт, не описанный в заголовке, сохраняется в [`SensorType::Unknown`],
/// чтобы конфигурация прибора читалась и записывалась без потерь.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorType {
    Hams8378_256,
    Hams8378_1024,
    Ilx554,
    Hams9201,
    Tcd1304,
    Tsl1301,
    Tsl1401,
    Hams8378_512,
    Hams9840,
    Ilx511,
    Hams10420_2048x64,
    Hams11071_2048x64,
    Hams7031_1024x122,
    Hams7031_1024x58,
    Hams11071_2048x16,
    Hams11155,
    Su256Lsb,
    Su512Ldb,
    /// Значение вне перечисления (в т.ч. 0 у ненастроенного прибора)
    Unknown(u8),
}

impl SensorType {
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => SensorType::Hams8378_256,
            2 => SensorType::Hams8378_1024,
            3 => SensorType::Ilx554,
            4 => SensorType::Hams9201,
            5 => SensorType::Tcd1304,
            6 => SensorType::Tsl1301,
            7 => SensorType::Tsl1401,
            8 => SensorType::Hams8378_512,
            9 => SensorType::Hams9840,
            10 => SensorType::Ilx511,
            11 => SensorType::Hams10420_2048x64,
            12 => SensorType::Hams11071_2048x64,
            13 => SensorType::Hams7031_1024x122,
            14 => SensorType::Hams7031_1024x58,
            15 => SensorType::Hams11071_2048x16,
            16 => SensorType::Hams11155,
            17 => SensorType::Su256Lsb,
            18 => SensorType::Su512Ldb,
            other => SensorType::Unknown(other),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            SensorType::Hams8378_256 => 1,
            SensorType::Hams8378_1024 => 2,
            SensorType::Ilx554 => 3,
            SensorType::Hams9201 => 4,
            SensorType::Tcd1304 => 5,
            SensorType::Tsl1301 => 6,
            SensorType::Tsl1401 => 7,
            SensorType::Hams8378_512 => 8,
            SensorType::Hams9840 => 9,
            SensorType::Ilx511 => 10,
            SensorType::Hams10420_2048x64 => 11,
            SensorType::Hams11071_2048x64 => 12,
            SensorType::Hams7031_1024x122 => 13,
            SensorType::Hams7031_1024x58 => 14,
            SensorType::Hams11071_2048x16 => 15,
            SensorType::Hams11155 => 16,
            SensorType::Su256Lsb => 17,
            SensorType::Su512Ldb => 18,
            SensorType::Unknown(v) => *v,
        }
    }

    /// Имя в написании заголовка (`SENS_TCD1304`).
    pub fn name(&self) -> String {
        let s = match self {
            SensorType::Hams8378_256 => "SENS_HAMS8378_256",
            SensorType::Hams8378_1024 => "SENS_HAMS8378_1024",
            SensorType::Ilx554 => "SENS_ILX554",
            SensorType::Hams9201 => "SENS_HAMS9201",
            SensorType::Tcd1304 => "SENS_TCD1304",
            SensorType::Tsl1301 => "SENS_TSL1301",
            SensorType::Tsl1401 => "SENS_TSL1401",
            SensorType::Hams8378_512 => "SENS_HAMS8378_512",
            SensorType::Hams9840 => "SENS_HAMS9840",
            SensorType::Ilx511 => "SENS_ILX511",
            SensorType::Hams10420_2048x64 => "SENS_HAMS10420_2048X64",
            SensorType::Hams11071_2048x64 => "SENS_HAMS11071_2048X64",
            SensorType::Hams7031_1024x122 => "SENS_HAMS7031_1024X122",
            SensorType::Hams7031_1024x58 => "SENS_HAMS7031_1024X58",
            SensorType::Hams11071_2048x16 => "SENS_HAMS11071_2048X16",
            SensorType::Hams11155 => "SENS_HAMS11155",
            SensorType::Su256Lsb => "SENS_SU256LSB",
            SensorType::Su512Ldb => "SENS_SU512LDB",
            SensorType::Unknown(v) => return format!("UNKNOWN({v})"),
        };
        s.to_string()
    }

    /// NIR детекторы, для которых прибор поддерживает переключение
    /// чувствительности (`AVS_SetSensitivityMode`).
    pub fn supports_sensitivity_mode(&self) -> bool {
        matches!(
            self,
            SensorType::Hams9201 | SensorType::Su256Lsb | SensorType::Su512Ldb
        )
    }
}

impl std::fmt::Display for SensorType {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}
