//! Файл записи спектров (`.avsr`).
//!
//! Структура файла:
//!
//! ```text
//! заголовок, 128 байт
//! таблица длин волн: u32 count, count × f64, CRC32
//! блок скана × N:    u32 content_size, content, CRC32(content)
//! ```
//!
//! Содержимое блока: `time_label u32`, `timestamp_ns u64`,
//! `value_count u32`, `saturation_count u32`, значения `f64`, счётчики
//! насыщения `u8`. Все числа little-endian.

use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};

use avaspec_types::{AvsError, AvsResult, MeasConfig, ScopeData, AVS_SERIAL_LEN};

use crate::{
    binary::{WireReader, WireWriter},
    format::crc32_checksum,
};

/// Магическое число файла записи: b"AVSR"
pub const RECORDING_MAGIC: [u8; 4] = *b"AVSR";

/// Текущая версия формата записи
pub const RECORDING_VERSION: u8 = 1;

/// Размер фиксированного заголовка (128 байт)
pub const RECORDING_HEADER_SIZE: usize = 128;

/// Служебные байты блока: размер, поля содержимого и CRC
pub const SCAN_BLOCK_OVERHEAD: usize = 4 + 20 + 4;

/// Максимальный размер содержимого блока (64 КиБ)
pub const MAX_SCAN_CONTENT_SIZE: usize = 64 * 1024;

/// Область заголовка, покрытая CRC
const HEADER_CRC_OFFSET: usize = 56;

/// Заголовок файла записи.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingHeader {
    pub version: u8,
    /// Серийный номер прибора
    pub serial: String,
    pub start_pixel: u16,
    pub stop_pixel: u16,
    /// Время интегрирования, мс
    pub integration_time: f32,
    pub nr_averages: u32,
    /// Время начала записи (Unix timestamp, секунды)
    pub timestamp_start: u64,
    /// Время окончания записи (0 если запись продолжается)
    pub timestamp_end: u64,
    /// Кол-во сканов в файле
    pub scan_count: u64,
}

/// Один скан: данные `AVS_GetScopeData` и `AVS_GetSaturatedPixels`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRecord {
    /// Метка времени прибора, такты по 10 мс
    pub time_label: u32,
    /// Время получения на хосте, нс от Unix epoch
    pub timestamp_ns: u64,
    pub values: Vec<f64>,
    /// Пусто, если насыщение не запрашивалось
    pub saturated: Vec<u8>,
}

/// Потоковый писатель файлов записи.
pub struct ScanWriter<W: Write + Seek> {
    writer: BufWriter<W>,
    header: RecordingHeader,
    scan_count: u64,
    bytes_written: u64,
}

/// Потоковый читатель файлов записи.
pub struct ScanReader<R: Read> {
    reader: BufReader<R>,
    header: RecordingHeader,
    wavelengths: Vec<f64>,
    read_buf: Vec<u8>,
    leftover: Vec<u8>,
    stats: ReadStats,
    resyncing: bool,
    eof: bool,
}

/// Статистика, накопленная [`ScanReader`] в процессе чтения.
#[derive(Debug, Default, Clone)]
pub struct ReadStats {
    /// Успешно прочитанных сканов.
    pub scans_ok: u64,
    /// Повреждённых сканов (CRC, размер, несовпадение числа пикселей).
    pub scans_corrupted: u64,
    /// Всего обработано байт блоков.
    pub bytes_processed: u64,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl RecordingHeader {
    /// Заголовок для записи с прибора `serial` с параметрами `meas`.
    pub fn new<S: Into<String>>(
        serial: S,
        meas: &MeasConfig,
    ) -> Self {
        Self {
            version: RECORDING_VERSION,
            serial: serial.into(),
            start_pixel: meas.start_pixel,
            stop_pixel: meas.stop_pixel,
            integration_time: meas.integration_time,
            nr_averages: meas.nr_averages,
            timestamp_start: current_unix_secs(),
            timestamp_end: 0,
            scan_count: 0,
        }
    }

    /// Кол-во пикселей в каждом скане.
    pub fn pixel_count(&self) -> usize {
        if self.stop_pixel < self.start_pixel {
            0
        } else {
            (self.stop_pixel - self.start_pixel) as usize + 1
        }
    }

    /// Сериализация заголовка в 128 байт
    pub fn serialize(&self) -> AvsResult<[u8; RECORDING_HEADER_SIZE]> {
        let mut w = WireWriter::with_capacity(RECORDING_HEADER_SIZE);

        w.bytes(&RECORDING_MAGIC)?;
        w.u8(self.version)?;
        w.bytes(&[0u8; 3])?;
        w.fixed_str(&self.serial, AVS_SERIAL_LEN)?;
        w.u16(self.start_pixel)?;
        w.u16(self.stop_pixel)?;
        w.f32(self.integration_time)?;
        w.u32(self.nr_averages)?;
        w.bytes(&[0u8; 2])?;
        w.u64(self.timestamp_start)?;
        w.u64(self.timestamp_end)?;
        w.u64(self.scan_count)?;

        let mut buf = [0u8; RECORDING_HEADER_SIZE];
        let head = w.into_inner();
        buf[..HEADER_CRC_OFFSET].copy_from_slice(&head);

        // [56..60) CRC, [60..128) резерв
        let crc = crc32_checksum(&buf[..HEADER_CRC_OFFSET]);
        buf[HEADER_CRC_OFFSET..HEADER_CRC_OFFSET + 4].copy_from_slice(&crc.to_le_bytes());

        Ok(buf)
    }

    /// Десериализация заголовка из 128 байт
    pub fn deserialize(buf: &[u8; RECORDING_HEADER_SIZE]) -> AvsResult<Self> {
        let mut r = WireReader::new(buf);

        if r.bytes(4)? != RECORDING_MAGIC {
            return Err(AvsError::invalid_magic("Invalid AVSR magic number"));
        }

        let version = r.u8()?;
        if version != RECORDING_VERSION {
            return Err(AvsError::UnsupportedVersion {
                found: version,
                expected: RECORDING_VERSION,
            });
        }

        r.bytes(3)?;
        let serial = r.fixed_str(AVS_SERIAL_LEN)?;
        let start_pixel = r.u16()?;
        let stop_pixel = r.u16()?;
        let integration_time = r.f32()?;
        let nr_averages = r.u32()?;
        r.bytes(2)?;
        let timestamp_start = r.u64()?;
        let timestamp_end = r.u64()?;
        let scan_count = r.u64()?;
        let stored_crc = r.u32()?;

        let calculated_crc = crc32_checksum(&buf[..HEADER_CRC_OFFSET]);
        if stored_crc != calculated_crc {
            return Err(AvsError::CrcMismatch {
                expected: calculated_crc,
                found: stored_crc,
            });
        }

        Ok(Self {
            version,
            serial,
            start_pixel,
            stop_pixel,
            integration_time,
            nr_averages,
            timestamp_start,
            timestamp_end,
            scan_count,
        })
    }
}

impl ScanRecord {
    pub fn new(
        time_label: u32,
        timestamp_ns: u64,
        values: Vec<f64>,
        saturated: Vec<u8>,
    ) -> Self {
        Self {
            time_label,
            timestamp_ns,
            values,
            saturated,
        }
    }

    /// Скан из данных прибора с текущим временем хоста.
    pub fn from_scope(
        scope: ScopeData,
        saturated: Vec<u8>,
    ) -> Self {
        Self::new(scope.time_label, current_unix_nanos(), scope.values, saturated)
    }

    /// Кол-во пикселей, насыщенных хотя бы в одном усреднении.
    pub fn saturated_pixels(&self) -> usize {
        self.saturated.iter().filter(|s| **s > 0).count()
    }

    pub fn is_saturated(&self) -> bool {
        self.saturated.iter().any(|s| *s > 0)
    }

    /// Сериализует блок в байты с CRC.
    pub fn serialize(&self) -> AvsResult<Vec<u8>> {
        if !self.saturated.is_empty() && self.saturated.len() != self.values.len() {
            return Err(AvsError::format_violation(format!(
                "saturation table has {} entries for {} pixels",
                self.saturated.len(),
                self.values.len()
            )));
        }

        let content_size = 20 + self.values.len() * 8 + self.saturated.len();
        if content_size > MAX_SCAN_CONTENT_SIZE {
            return Err(AvsError::format_violation(format!(
                "scan block of {content_size} bytes exceeds {MAX_SCAN_CONTENT_SIZE}"
            )));
        }

        let mut w = WireWriter::with_capacity(content_size + 8);
        w.u32(content_size as u32)?;
        w.u32(self.time_label)?;
        w.u64(self.timestamp_ns)?;
        w.u32(self.values.len() as u32)?;
        w.u32(self.saturated.len() as u32)?;
        w.f64_slice(&self.values)?;
        w.bytes(&self.saturated)?;

        let mut buf = w.into_inner();
        let crc = crc32_checksum(&buf[4..]);
        buf.extend_from_slice(&crc.to_le_bytes());

        Ok(buf)
    }

    /// Десериализует блок из начала `buf`, возвращая его и длину в байтах.
    pub fn deserialize(buf: &[u8]) -> AvsResult<(Self, usize)> {
        let mut r = WireReader::new(buf);
        let content_size = r.u32()? as usize;

        if !(20..=MAX_SCAN_CONTENT_SIZE).contains(&content_size) {
            return Err(AvsError::format_violation(format!(
                "implausible scan block size {content_size}"
            )));
        }

        let total = 4 + content_size + 4;
        if buf.len() < total {
            return Err(AvsError::Truncated {
                needed: total,
                found: buf.len(),
            });
        }

        let content = &buf[4..4 + content_size];
        let stored_crc = u32::from_le_bytes([
            buf[4 + content_size],
            buf[4 + content_size + 1],
            buf[4 + content_size + 2],
            buf[4 + content_size + 3],
        ]);
        let calculated_crc = crc32_checksum(content);

        if stored_crc != calculated_crc {
            return Err(AvsError::CrcMismatch {
                expected: calculated_crc,
                found: stored_crc,
            });
        }

        let mut r = WireReader::new(content);
        let time_label = r.u32()?;
        let timestamp_ns = r.u64()?;
        let value_count = r.u32()? as usize;
        let saturation_count = r.u32()? as usize;

        if 20 + value_count * 8 + saturation_count != content_size {
            return Err(AvsError::format_violation(format!(
                "scan block counts {value_count}/{saturation_count} disagree with size {content_size}"
            )));
        }

        let values = r.f64_vec(value_count)?;
        let saturated = r.bytes(saturation_count)?;

        Ok((
            Self {
                time_label,
                timestamp_ns,
                values,
                saturated,
            },
            total,
        ))
    }
}

impl<W: Write + Seek> ScanWriter<W> {
    /// Создаёт писатель и сразу записывает заголовок и таблицу длин волн.
    pub fn new(
        inner: W,
        header: RecordingHeader,
        wavelengths: &[f64],
    ) -> AvsResult<Self> {
        if wavelengths.len() != header.pixel_count() {
            return Err(AvsError::format_violation(format!(
                "{} wavelengths for {} pixels",
                wavelengths.len(),
                header.pixel_count()
            )));
        }

        let mut writer = BufWriter::new(inner);
        writer.write_all(&header.serialize()?)?;

        let section = encode_wavelengths(wavelengths)?;
        writer.write_all(&section)?;

        Ok(Self {
            writer,
            header,
            scan_count: 0,
            bytes_written: (RECORDING_HEADER_SIZE + section.len()) as u64,
        })
    }

    /// Записывает один скан. Возвращает размер блока в байтах.
    pub fn write_scan(
        &mut self,
        scan: &ScanRecord,
    ) -> AvsResult<usize> {
        if scan.values.len() != self.header.pixel_count() {
            return Err(AvsError::format_violation(format!(
                "scan has {} values, recording expects {}",
                scan.values.len(),
                self.header.pixel_count()
            )));
        }

        let block = scan.serialize()?;
        self.writer.write_all(&block)?;
        self.scan_count += 1;
        self.bytes_written += block.len() as u64;

        Ok(block.len())
    }

    /// Завершает запись: сбрасывает буфер и перезаписывает заголовок.
    pub fn finish(mut self) -> AvsResult<RecordingHeader> {
        self.writer.flush()?;
        self.header.scan_count = self.scan_count;
        self.header.timestamp_end = current_unix_secs();

        let mut inner = self
            .writer
            .into_inner()
            .map_err(|e| AvsError::Io(e.into_error()))?;

        inner.seek(SeekFrom::Start(0))?;
        inner.write_all(&self.header.serialize()?)?;
        inner.seek(SeekFrom::End(0))?;
        inner.flush()?;

        Ok(self.header)
    }

    /// Кол-во записанных сканов (до вызова [`finish`](Self::finish)).
    pub fn scan_count(&self) -> u64 {
        self.scan_count
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn header(&self) -> &RecordingHeader {
        &self.header
    }
}

impl<R: Read> ScanReader<R> {
    /// Создаёт читатель, проверяя заголовок и таблицу длин волн.
    pub fn new(inner: R) -> AvsResult<Self> {
        let mut reader = BufReader::new(inner);
        let mut hdr_buf = [0u8; RECORDING_HEADER_SIZE];

        reader.read_exact(&mut hdr_buf)?;
        let header = RecordingHeader::deserialize(&hdr_buf)?;
        let wavelengths = read_wavelengths(&mut reader)?;

        if wavelengths.len() != header.pixel_count() {
            return Err(AvsError::format_violation(format!(
                "{} wavelengths for {} pixels",
                wavelengths.len(),
                header.pixel_count()
            )));
        }

        Ok(Self {
            reader,
            header,
            wavelengths,
            read_buf: vec![0u8; 256 * 1024],
            leftover: Vec::new(),
            stats: ReadStats::default(),
            resyncing: false,
            eof: false,
        })
    }

    /// Возвращает следующий скан или `None` на EOF.
    ///
    /// Повреждённые блоки пропускаются и учитываются в [`ReadStats`].
    pub fn next_scan(&mut self) -> Option<AvsResult<ScanRecord>> {
        loop {
            if self.leftover.len() >= SCAN_BLOCK_OVERHEAD {
                match ScanRecord::deserialize(&self.leftover) {
                    Ok((scan, bytes_read)) => {
                        self.leftover.drain(..bytes_read);
                        self.resyncing = false;

                        if scan.values.len() != self.header.pixel_count() {
                            self.stats.scans_corrupted += 1;
                            continue;
                        }

                        self.stats.scans_ok += 1;
                        self.stats.bytes_processed += bytes_read as u64;
                        return Some(Ok(scan));
                    }

                    Err(AvsError::Truncated { .. }) if !self.eof => {
                        // Данных не хватает, дочитываем
                    }

                    Err(AvsError::CrcMismatch { .. }) => {
                        // Размер блока прочитан корректно, пропускаем его целиком
                        let size = block_size(&self.leftover);
                        self.leftover.drain(..size);
                        self.stats.scans_corrupted += 1;
                        self.resyncing = false;
                        continue;
                    }

                    Err(_) => {
                        self.skip_byte();
                        continue;
                    }
                }
            }

            if self.eof {
                if !self.leftover.is_empty() && !self.resyncing {
                    self.stats.scans_corrupted += 1;
                }
                self.leftover.clear();
                return None;
            }

            match self.reader.read(&mut self.read_buf) {
                Ok(0) => {
                    self.eof = true;
                    if self.leftover.is_empty() {
                        return None;
                    }
                }
                Ok(n) => {
                    self.leftover.extend_from_slice(&self.read_buf[..n]);
                }
                Err(e) => return Some(Err(AvsError::Io(e))),
            }
        }
    }

    /// Проверяет, что `header.scan_count` совпадает с прочитанным.
    pub fn validate_totals(&self) -> AvsResult<()> {
        let expected = self.header.scan_count;

        if expected == 0 {
            return Ok(());
        }

        if self.stats.scans_ok != expected {
            return Err(AvsError::format_violation(format!(
                "scan_count mismatch: header={}, recovered={}",
                expected, self.stats.scans_ok,
            )));
        }

        Ok(())
    }

    pub fn header(&self) -> &RecordingHeader {
        &self.header
    }

    /// Длины волн пикселей записи, нм.
    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    pub fn stats(&self) -> &ReadStats {
        &self.stats
    }

    fn skip_byte(&mut self) {
        if !self.resyncing {
            self.stats.scans_corrupted += 1;
            self.resyncing = true;
        }
        self.leftover.drain(..1);
    }
}

impl<R: Read> Iterator for ScanReader<R> {
    type Item = AvsResult<ScanRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_scan()
    }
}

/// Читает все сканы. Повреждённые блоки пропускаются.
pub fn read_all_scans<R: Read>(reader: &mut ScanReader<R>) -> AvsResult<Vec<ScanRecord>> {
    let mut scans = Vec::new();
    while let Some(result) = reader.next_scan() {
        scans.push(result?);
    }
    Ok(scans)
}

fn encode_wavelengths(wavelengths: &[f64]) -> AvsResult<Vec<u8>> {
    let mut w = WireWriter::with_capacity(8 + wavelengths.len() * 8);
    w.u32(wavelengths.len() as u32)?;
    w.f64_slice(wavelengths)?;

    let mut buf = w.into_inner();
    let crc = crc32_checksum(&buf);
    buf.extend_from_slice(&crc.to_le_bytes());
    Ok(buf)
}

fn read_wavelengths<R: Read>(reader: &mut R) -> AvsResult<Vec<f64>> {
    let mut count_buf = [0u8; 4];
    reader.read_exact(&mut count_buf)?;
    let count = u32::from_le_bytes(count_buf) as usize;

    if count > MAX_SCAN_CONTENT_SIZE / 8 {
        return Err(AvsError::format_violation(format!(
            "implausible wavelength count {count}"
        )));
    }

    let mut section = vec![0u8; 4 + count * 8 + 4];
    section[..4].copy_from_slice(&count_buf);
    reader.read_exact(&mut section[4..])?;

    let body = &section[..4 + count * 8];
    let mut r = WireReader::new(&section[body.len()..]);
    let stored_crc = r.u32()?;
    let calculated_crc = crc32_checksum(body);

    if stored_crc != calculated_crc {
        return Err(AvsError::CrcMismatch {
            expected: calculated_crc,
            found: stored_crc,
        });
    }

    WireReader::new(&body[4..]).f64_vec(count)
}

fn block_size(buf: &[u8]) -> usize {
    let content_size = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    (4 + content_size + 4).min(buf.len())
}

fn current_unix_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn current_unix_nanos() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn make_header(pixels: u16) -> RecordingHeader {
        RecordingHeader::new("1102185U1", &MeasConfig::for_pixels(pixels))
    }

    fn make_scan(
        label: u32,
        pixels: usize,
    ) -> ScanRecord {
        let values = (0..pixels).map(|i| (i as f64) * 1.5 + label as f64).collect();
        ScanRecord::new(label, label as u64 * 10_000_000, values, vec![0; pixels])
    }

    fn wavelengths(pixels: usize) -> Vec<f64> {
        (0..pixels).map(|i| 200.0 + i as f64 * 0.5).collect()
    }

    fn raw_file(
        pixels: u16,
        blocks: &[Vec<u8>],
    ) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&make_header(pixels).serialize().unwrap());
        raw.extend(encode_wavelengths(&wavelengths(pixels as usize)).unwrap());
        for b in blocks {
            raw.extend_from_slice(b);
        }
        raw
    }

    #[test]
    fn test_header_round_trip() {
        let mut header = make_header(2048);
        header.scan_count = 42;
        header.timestamp_end = header.timestamp_start + 10;

        let bytes = header.serialize().unwrap();
        assert_eq!(&bytes[0..4], b"AVSR", "magic");
        assert_eq!(bytes[4], RECORDING_VERSION, "version");
        assert_eq!(&bytes[8..17], b"1102185U1", "serial");

        let back = RecordingHeader::deserialize(&bytes).unwrap();
        assert_eq!(back, header);
        assert_eq!(back.pixel_count(), 2048);
    }

    #[test]
    fn test_header_corrupted_crc() {
        let mut bytes = make_header(256).serialize().unwrap();
        bytes[20] ^= 0xFF;

        let result = RecordingHeader::deserialize(&bytes);
        assert!(result.unwrap_err().to_string().contains("CRC"));
    }

    #[test]
    fn test_scan_block_layout() {
        let scan = make_scan(7, 4);
        let bytes = scan.serialize().unwrap();

        assert_eq!(bytes.len(), SCAN_BLOCK_OVERHEAD + 4 * 8 + 4);
        assert_eq!(&bytes[0..4], &(20u32 + 32 + 4).to_le_bytes(), "content_size");
        assert_eq!(&bytes[4..8], &7u32.to_le_bytes(), "time_label");

        let (back, used) = ScanRecord::deserialize(&bytes).unwrap();
        assert_eq!(back, scan);
        assert_eq!(used, bytes.len());
    }

    #[test]
    fn test_scan_saturation_mismatch_rejected() {
        let scan = ScanRecord::new(0, 0, vec![1.0; 4], vec![0; 3]);
        assert!(scan.serialize().is_err());
    }

    #[test]
    fn test_saturated_pixels() {
        let scan = ScanRecord::new(0, 0, vec![1.0; 4], vec![0, 2, 0, 1]);
        assert_eq!(scan.saturated_pixels(), 2);
        assert!(scan.is_saturated());
        assert!(!make_scan(0, 4).is_saturated());
    }

    #[test]
    fn test_writer_reader_round_trip() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut w = ScanWriter::new(&mut buf, make_header(16), &wavelengths(16)).unwrap();
            for i in 0..5 {
                w.write_scan(&make_scan(i, 16)).unwrap();
            }
            assert_eq!(w.scan_count(), 5);

            // finish поглощает писатель и перезаписывает заголовок
            let header = w.finish().unwrap();
            assert_eq!(header.scan_count, 5);
        }

        let mut reader = ScanReader::new(Cursor::new(buf.into_inner())).unwrap();
        assert_eq!(reader.header().scan_count, 5);
        assert_eq!(reader.wavelengths(), wavelengths(16).as_slice());

        let scans = read_all_scans(&mut reader).unwrap();
        assert_eq!(scans.len(), 5);
        assert_eq!(scans[3], make_scan(3, 16));
        reader.validate_totals().unwrap();
    }

    #[test]
    fn test_writer_rejects_wrong_pixel_count() {
        let mut writer =
            ScanWriter::new(Cursor::new(Vec::new()), make_header(8), &wavelengths(8)).unwrap();
        assert!(writer.write_scan(&make_scan(0, 9)).is_err());

        assert!(ScanWriter::new(Cursor::new(Vec::new()), make_header(8), &wavelengths(7)).is_err());
    }

    #[test]
    fn test_corrupted_block_skipped() {
        let b1 = make_scan(1, 8).serialize().unwrap();
        let mut b2 = make_scan(2, 8).serialize().unwrap();
        let b3 = make_scan(3, 8).serialize().unwrap();

        // Портим значение во втором блоке
        b2[30] ^= 0xFF;

        let mut reader = ScanReader::new(Cursor::new(raw_file(8, &[b1, b2, b3]))).unwrap();
        let labels: Vec<u32> = reader
            .by_ref()
            .filter_map(|r| r.ok())
            .map(|s| s.time_label)
            .collect();

        assert_eq!(labels, vec![1, 3]);
        assert_eq!(reader.stats().scans_ok, 2);
        assert_eq!(reader.stats().scans_corrupted, 1);
    }

    #[test]
    fn test_truncated_tail_counted() {
        let b1 = make_scan(1, 8).serialize().unwrap();
        let b2 = make_scan(2, 8).serialize().unwrap();
        let cut = b2[..b2.len() - 10].to_vec();

        let mut reader = ScanReader::new(Cursor::new(raw_file(8, &[b1, cut]))).unwrap();
        let scans = read_all_scans(&mut reader).unwrap();

        assert_eq!(scans.len(), 1);
        assert_eq!(reader.stats().scans_corrupted, 1);
    }

    #[test]
    fn test_wavelength_section_crc() {
        let mut raw = raw_file(8, &[]);
        raw[RECORDING_HEADER_SIZE + 10] ^= 0xFF;

        assert!(matches!(
            ScanReader::new(Cursor::new(raw)),
            Err(AvsError::CrcMismatch { .. })
        ));
    }
}
