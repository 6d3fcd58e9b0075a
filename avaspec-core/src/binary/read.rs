use std::io::{Cursor, Read};

use avaspec_types::{AvsError, AvsResult, FixedStr};
use byteorder::{LittleEndian, ReadBytesExt};

/// Последовательное чтение упакованной little-endian структуры.
pub struct WireReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(buf),
        }
    }

    /// Текущее смещение от начала буфера.
    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    /// Сколько байт осталось непрочитанными.
    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    pub fn u8(&mut self) -> AvsResult<u8> {
        self.ensure(1)?;
        Ok(self.cursor.read_u8()?)
    }

    pub fn bool(&mut self) -> AvsResult<bool> {
        Ok(self.u8()? != 0)
    }

    pub fn u16(&mut self) -> AvsResult<u16> {
        self.ensure(2)?;
        Ok(self.cursor.read_u16::<LittleEndian>()?)
    }

    pub fn i16(&mut self) -> AvsResult<i16> {
        self.ensure(2)?;
        Ok(self.cursor.read_i16::<LittleEndian>()?)
    }

    pub fn u32(&mut self) -> AvsResult<u32> {
        self.ensure(4)?;
        Ok(self.cursor.read_u32::<LittleEndian>()?)
    }

    pub fn u64(&mut self) -> AvsResult<u64> {
        self.ensure(8)?;
        Ok(self.cursor.read_u64::<LittleEndian>()?)
    }

    pub fn f32(&mut self) -> AvsResult<f32> {
        self.ensure(4)?;
        Ok(self.cursor.read_f32::<LittleEndian>()?)
    }

    pub fn f64(&mut self) -> AvsResult<f64> {
        self.ensure(8)?;
        Ok(self.cursor.read_f64::<LittleEndian>()?)
    }

    pub fn f32_array<const N: usize>(&mut self) -> AvsResult<[f32; N]> {
        let mut out = [0f32; N];
        for v in out.iter_mut() {
            *v = self.f32()?;
        }
        Ok(out)
    }

    pub fn f64_array<const N: usize>(&mut self) -> AvsResult<[f64; N]> {
        let mut out = [0f64; N];
        for v in out.iter_mut() {
            *v = self.f64()?;
        }
        Ok(out)
    }

    pub fn u16_array<const N: usize>(&mut self) -> AvsResult<[u16; N]> {
        let mut out = [0u16; N];
        for v in out.iter_mut() {
            *v = self.u16()?;
        }
        Ok(out)
    }

    /// Таблица из `n` значений f32.
    pub fn f32_vec(
        &mut self,
        n: usize,
    ) -> AvsResult<Vec<f32>> {
        self.ensure(n * 4)?;
        let mut out = vec![0f32; n];
        self.cursor.read_f32_into::<LittleEndian>(&mut out)?;
        Ok(out)
    }

    /// Таблица из `n` значений f64.
    pub fn f64_vec(
        &mut self,
        n: usize,
    ) -> AvsResult<Vec<f64>> {
        self.ensure(n * 8)?;
        let mut out = vec![0f64; n];
        self.cursor.read_f64_into::<LittleEndian>(&mut out)?;
        Ok(out)
    }

    pub fn bytes(
        &mut self,
        n: usize,
    ) -> AvsResult<Vec<u8>> {
        self.ensure(n)?;
        let mut out = vec![0u8; n];
        self.cursor.read_exact(&mut out)?;
        Ok(out)
    }

    /// Строка фиксированной длины `n`, дополненная нулями.
    pub fn fixed_str(
        &mut self,
        n: usize,
    ) -> AvsResult<String> {
        let raw = self.bytes(n)?;
        Ok(decode_fixed_str(&raw))
    }

    /// Поле `char[n]` прибора без потери байтов.
    pub fn fixed_raw(
        &mut self,
        n: usize,
    ) -> AvsResult<FixedStr> {
        let raw = self.bytes(n)?;
        Ok(FixedStr::from_raw(&raw))
    }

    fn ensure(
        &self,
        n: usize,
    ) -> AvsResult<()> {
        if self.remaining() < n {
            return Err(AvsError::Truncated {
                needed: self.position() + n,
                found: self.cursor.get_ref().len(),
            });
        }
        Ok(())
    }
}

/// Текст до первого NUL (или весь буфер).
pub fn decode_fixed_str(raw: &[u8]) -> String {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_little_endian() {
        let buf = [0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
        let mut r = WireReader::new(&buf);
        assert_eq!(r.u16().unwrap(), 0x1234);
        assert_eq!(r.u32().unwrap(), 0x1234_5678);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_truncated_read() {
        let buf = [0x01, 0x02, 0x03];
        let mut r = WireReader::new(&buf);
        r.u8().unwrap();
        match r.u32() {
            Err(AvsError::Truncated { needed, found }) => {
                assert_eq!(needed, 5);
                assert_eq!(found, 3);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_fixed_str_stops_at_nul() {
        let buf = *b"AB12\0\0\0xyz";
        let mut r = WireReader::new(&buf);
        assert_eq!(r.fixed_str(10).unwrap(), "AB12");
        assert_eq!(decode_fixed_str(b"FULL"), "FULL");
    }

    #[test]
    fn test_fixed_raw_keeps_tail() {
        let buf = *b"AB12\0\0\0xyz";
        let mut r = WireReader::new(&buf);
        let field = r.fixed_raw(10).unwrap();
        assert_eq!(field, "AB12");
        assert_eq!(field.raw(), &buf);
    }
}
