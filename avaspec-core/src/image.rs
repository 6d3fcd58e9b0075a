//! Образ конфигурации прибора (`.avsc`).
//!
//! Резервная копия `DeviceConfigType`, снятая с конкретного прибора:
//!
//! ```text
//! [0..4)    magic "AVSC"
//! [4]       версия формата
//! [5..8)    резерв
//! [8..18)   серийный номер источника (char[10])
//! [18..22)  длина полезной нагрузки, LE
//! [22..26)  CRC32 полезной нагрузки, LE
//! [26..32)  резерв
//! [32..)    DeviceConfigType, 63484 байта
//! ```

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use avaspec_types::{
    AvsError, AvsResult, DeviceConfig, FixedStr, AVS_SERIAL_LEN, DEVICE_CONFIG_SIZE,
};

use crate::{
    binary::{WireReader, WireWriter},
    format::{crc32_checksum, Wire},
};

/// Магическое число образа конфигурации: b"AVSC"
pub const IMAGE_MAGIC: [u8; 4] = *b"AVSC";

/// Текущая версия формата образа
pub const IMAGE_VERSION: u8 = 1;

/// Размер заголовка образа
pub const IMAGE_HEADER_SIZE: usize = 32;

/// Конфигурация прибора вместе с серийным номером источника.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigImage {
    pub serial: FixedStr,
    pub config: DeviceConfig,
}

impl ConfigImage {
    pub fn new<S: Into<FixedStr>>(
        serial: S,
        config: DeviceConfig,
    ) -> Self {
        Self {
            serial: serial.into(),
            config,
        }
    }

    /// Полный образ: заголовок и упакованная конфигурация.
    pub fn to_bytes(&self) -> AvsResult<Vec<u8>> {
        let payload = self.config.to_bytes()?;

        let mut w = WireWriter::with_capacity(IMAGE_HEADER_SIZE + payload.len());
        w.bytes(&IMAGE_MAGIC)?;
        w.u8(IMAGE_VERSION)?;
        w.bytes(&[0u8; 3])?;
        w.fixed_raw(&self.serial, AVS_SERIAL_LEN)?;
        w.u32(payload.len() as u32)?;
        w.u32(crc32_checksum(&payload))?;
        w.bytes(&[0u8; 6])?;
        w.bytes(&payload)?;

        Ok(w.into_inner())
    }

    /// Разбор и проверка образа (magic, версия, длина, CRC).
    pub fn from_bytes(buf: &[u8]) -> AvsResult<Self> {
        if buf.len() < IMAGE_HEADER_SIZE {
            return Err(AvsError::Truncated {
                needed: IMAGE_HEADER_SIZE,
                found: buf.len(),
            });
        }

        let mut r = WireReader::new(&buf[..IMAGE_HEADER_SIZE]);

        if r.bytes(4)? != IMAGE_MAGIC {
            return Err(AvsError::invalid_magic("Invalid AVSC magic number"));
        }

        let version = r.u8()?;
        if version != IMAGE_VERSION {
            return Err(AvsError::UnsupportedVersion {
                found: version,
                expected: IMAGE_VERSION,
            });
        }

        r.bytes(3)?;
        let serial = r.fixed_raw(AVS_SERIAL_LEN)?;
        let payload_len = r.u32()? as usize;
        let stored_crc = r.u32()?;

        if payload_len != DEVICE_CONFIG_SIZE {
            return Err(AvsError::format_violation(format!(
                "image payload is {payload_len} bytes, expected {DEVICE_CONFIG_SIZE}"
            )));
        }

        let payload = &buf[IMAGE_HEADER_SIZE..];
        if payload.len() < payload_len {
            return Err(AvsError::Truncated {
                needed: IMAGE_HEADER_SIZE + payload_len,
                found: buf.len(),
            });
        }
        let payload = &payload[..payload_len];

        let calculated_crc = crc32_checksum(payload);
        if stored_crc != calculated_crc {
            return Err(AvsError::CrcMismatch {
                expected: calculated_crc,
                found: stored_crc,
            });
        }

        Ok(Self {
            serial,
            config: DeviceConfig::from_bytes(payload)?,
        })
    }

    pub fn write_to<W: Write>(
        &self,
        inner: W,
    ) -> AvsResult<()> {
        let mut writer = BufWriter::new(inner);
        writer.write_all(&self.to_bytes()?)?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_from<R: Read>(inner: R) -> AvsResult<Self> {
        let mut reader = BufReader::new(inner);
        let mut buf = Vec::with_capacity(IMAGE_HEADER_SIZE + DEVICE_CONFIG_SIZE);
        reader.read_to_end(&mut buf)?;
        Self::from_bytes(&buf)
    }

    /// Сохраняет образ в файл.
    pub fn save<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> AvsResult<()> {
        self.write_to(File::create(path)?)
    }

    /// Загружает образ из файла.
    pub fn load<P: AsRef<Path>>(path: P) -> AvsResult<Self> {
        Self::read_from(File::open(path)?)
    }
}
