use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Содержимое поля `char[N]` прибора.
///
/// Хранит байты как есть, включая NUL и всё, что лежит после него, поэтому
/// запись обратно в прибор даёт тот же буфер. Текст для вывода строится из
/// байтов до первого NUL: UTF-8, если он корректен, иначе Latin-1.
#[derive(Clone, Default)]
pub struct FixedStr {
    raw: Vec<u8>,
}

impl FixedStr {
    pub fn from_raw(raw: &[u8]) -> Self {
        Self { raw: raw.to_vec() }
    }

    /// Байты поля в том виде, в каком они пришли от прибора.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Значимая длина: хвостовые нули не считаются.
    pub fn encoded_len(&self) -> usize {
        self.raw.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1)
    }

    /// Байты до первого NUL.
    pub fn text_bytes(&self) -> &[u8] {
        let end = self
            .raw
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(self.raw.len());
        &self.raw[..end]
    }

    pub fn to_text(&self) -> String {
        let bytes = self.text_bytes();
        match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => bytes.iter().map(|b| char::from(*b)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text_bytes().is_empty()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Преобразования и сравнение
////////////////////////////////////////////////////////////////////////////////

impl From<&str> for FixedStr {
    fn from(s: &str) -> Self {
        Self {
            raw: s.as_bytes().to_vec(),
        }
    }
}

impl From<String> for FixedStr {
    fn from(s: String) -> Self {
        Self {
            raw: s.into_bytes(),
        }
    }
}

impl From<&String> for FixedStr {
    fn from(s: &String) -> Self {
        Self::from(s.as_str())
    }
}

// Хвостовые нули совпадают с дополнением поля до N байт.
impl PartialEq for FixedStr {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.raw[..self.encoded_len()] == other.raw[..other.encoded_len()]
    }
}

impl Eq for FixedStr {}

impl std::hash::Hash for FixedStr {
    fn hash<H: std::hash::Hasher>(
        &self,
        state: &mut H,
    ) {
        self.raw[..self.encoded_len()].hash(state);
    }
}

impl PartialEq<str> for FixedStr {
    fn eq(
        &self,
        other: &str,
    ) -> bool {
        self.to_text() == other
    }
}

impl PartialEq<&str> for FixedStr {
    fn eq(
        &self,
        other: &&str,
    ) -> bool {
        self.to_text() == *other
    }
}

impl PartialEq<String> for FixedStr {
    fn eq(
        &self,
        other: &String,
    ) -> bool {
        self.to_text() == *other
    }
}

impl fmt::Display for FixedStr {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.pad(&self.to_text())
    }
}

impl fmt::Debug for FixedStr {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.encoded_len() == self.text_bytes().len() {
            fmt::Debug::fmt(&self.to_text(), f)
        } else {
            write!(f, "{:?} {:02x?}", self.to_text(), &self.raw[..self.encoded_len()])
        }
    }
}

impl Serialize for FixedStr {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_text())
    }
}

impl<'de> Deserialize<'de> for FixedStr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(FixedStr::from)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin1_name_kept_as_bytes() {
        let name = FixedStr::from_raw(&[0xE9; 40]);
        assert_eq!(name.raw().len(), 40);
        assert_eq!(name.to_text(), "é".repeat(40));
        assert_eq!(name.encoded_len(), 40);
    }

    #[test]
    fn test_bytes_after_nul_are_kept() {
        let mut raw = b"AB\0garbage".to_vec();
        raw.resize(64, 0);
        let id = FixedStr::from_raw(&raw);

        assert_eq!(id, "AB");
        assert_eq!(id.text_bytes(), b"AB");
        assert_eq!(id.encoded_len(), 10);
        assert_ne!(id, FixedStr::from("AB"));
    }

    #[test]
    fn test_trailing_padding_ignored_in_eq() {
        let padded = FixedStr::from_raw(b"1102185U1\0");
        assert_eq!(padded, FixedStr::from("1102185U1"));
        assert_eq!(format!("[{padded:<12}]"), "[1102185U1   ]");
    }

    #[test]
    fn test_json_uses_text() {
        let id = FixedStr::from("lab-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"lab-1\"");
        let back: FixedStr = serde_json::from_str("\"lab-1\"").unwrap();
        assert_eq!(back, id);
    }
}
