use avaspec_types::{AvsError, AvsResult, FixedStr};
use byteorder::{LittleEndian, WriteBytesExt};

/// Последовательная запись упакованной little-endian структуры.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn u8(
        &mut self,
        v: u8,
    ) -> AvsResult<()> {
        self.buf.write_u8(v)?;
        Ok(())
    }

    pub fn bool(
        &mut self,
        v: bool,
    ) -> AvsResult<()> {
        self.u8(v as u8)
    }

    pub fn u16(
        &mut self,
        v: u16,
    ) -> AvsResult<()> {
        self.buf.write_u16::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn i16(
        &mut self,
        v: i16,
    ) -> AvsResult<()> {
        self.buf.write_i16::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn u32(
        &mut self,
        v: u32,
    ) -> AvsResult<()> {
        self.buf.write_u32::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn u64(
        &mut self,
        v: u64,
    ) -> AvsResult<()> {
        self.buf.write_u64::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn f32(
        &mut self,
        v: f32,
    ) -> AvsResult<()> {
        self.buf.write_f32::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn f64(
        &mut self,
        v: f64,
    ) -> AvsResult<()> {
        self.buf.write_f64::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn f32_slice(
        &mut self,
        vals: &[f32],
    ) -> AvsResult<()> {
        for v in vals {
            self.f32(*v)?;
        }
        Ok(())
    }

    pub fn f64_slice(
        &mut self,
        vals: &[f64],
    ) -> AvsResult<()> {
        for v in vals {
            self.f64(*v)?;
        }
        Ok(())
    }

    pub fn u16_slice(
        &mut self,
        vals: &[u16],
    ) -> AvsResult<()> {
        for v in vals {
            self.u16(*v)?;
        }
        Ok(())
    }

    pub fn bytes(
        &mut self,
        data: &[u8],
    ) -> AvsResult<()> {
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Строка фиксированной длины `n`, дополненная нулями.
    pub fn fixed_str(
        &mut self,
        s: &str,
        n: usize,
    ) -> AvsResult<()> {
        let raw = encode_fixed_str(s, n)?;
        self.bytes(&raw)
    }

    /// Поле `char[n]` из исходных байтов, дополненных нулями до `n`.
    pub fn fixed_raw(
        &mut self,
        field: &FixedStr,
        n: usize,
    ) -> AvsResult<()> {
        let raw = encode_fixed_raw(field, n)?;
        self.bytes(&raw)
    }
}

/// Кодирует поле `char[n]` байт в байт. Ошибка, если значимые байты не
/// помещаются в `n`.
pub fn encode_fixed_raw(
    field: &FixedStr,
    n: usize,
) -> AvsResult<Vec<u8>> {
    let len = field.encoded_len();
    if len > n {
        return Err(AvsError::format_violation(format!(
            "text '{field}' is {len} bytes, field holds {n}"
        )));
    }

    let mut raw = vec![0u8; n];
    raw[..len].copy_from_slice(&field.raw()[..len]);
    Ok(raw)
}

/// Кодирует `s` в буфер из `n` байт с NUL-дополнением.
pub fn encode_fixed_str(
    s: &str,
    n: usize,
) -> AvsResult<Vec<u8>> {
    let bytes = s.as_bytes();

    if bytes.len() > n {
        return Err(AvsError::format_violation(format!(
            "text '{s}' is {} bytes, field holds {n}",
            bytes.len()
        )));
    }

    if bytes.contains(&0) {
        return Err(AvsError::format_violation(format!(
            "text '{}' contains NUL",
            s.escape_debug()
        )));
    }

    let mut raw = vec![0u8; n];
    raw[..bytes.len()].copy_from_slice(bytes);
    Ok(raw)
}
