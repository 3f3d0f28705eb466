use bytes::{Buf, BufMut, BytesMut};

use crate::codec::{decode_latin1, encode_latin1};
use crate::error::Result;

/// Mutable out-buffer passed by reference to the peer.
///
/// The backing storage always carries one extra terminator element at the
/// end; it is pushed verbatim and never counted by [`XeprBuf::len`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XeprBuf {
    data: BytesMut,
    terminator: usize,
}

impl XeprBuf {
    /// Zero-filled byte buffer with room for `len` bytes plus terminator.
    pub fn new(len: usize) -> Self {
        Self::zeroed(len, 1)
    }

    fn zeroed(payload: usize, terminator: usize) -> Self {
        let mut data = BytesMut::with_capacity(payload + terminator);
        data.resize(payload + terminator, 0);
        Self { data, terminator }
    }

    /// Byte buffer preset with `preset`, sized to fit it exactly.
    pub fn from_bytes(preset: &[u8]) -> Self {
        let mut buf = Self::new(preset.len());
        buf.set_bytes(preset);
        buf
    }

    /// Byte buffer holding `text` in ISO-8859-1.
    pub fn from_text(text: &str) -> Result<Self> {
        Ok(Self::from_bytes(&encode_latin1(text)?))
    }

    /// Buffer of 32-bit integers (parameter index vectors).
    pub fn from_i32s(values: &[i32]) -> Self {
        let mut data = BytesMut::with_capacity((values.len() + 1) * 4);
        for v in values {
            data.put_i32_le(*v);
        }
        data.put_i32_le(0);
        Self {
            data,
            terminator: 4,
        }
    }

    /// Buffer of doubles (dataset rows).
    pub fn from_f64s(values: &[f64]) -> Self {
        let mut data = BytesMut::with_capacity(values.len() * 8 + 1);
        for v in values {
            data.put_f64_le(*v);
        }
        data.put_u8(0);
        Self {
            data,
            terminator: 1,
        }
    }

    /// Payload length in bytes, terminator excluded.
    pub fn len(&self) -> usize {
        self.data.len() - self.terminator
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Full storage length, terminator included.
    pub fn raw_len(&self) -> usize {
        self.data.len()
    }

    /// Full storage, terminator included.
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Bytes up to (not including) the first null byte.
    pub fn bytes(&self) -> &[u8] {
        let end = self
            .data
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(self.data.len());
        &self.data[..end]
    }

    /// Contents decoded as ISO-8859-1 text, truncated at the first null.
    pub fn text(&self) -> String {
        decode_latin1(self.bytes())
    }

    /// Copy `value` to the front and null-terminate it, truncating to fit.
    pub fn set_bytes(&mut self, value: &[u8]) {
        let n = value.len().min(self.len());
        self.data[..n].copy_from_slice(&value[..n]);
        self.data[n] = 0;
    }

    pub fn set_text(&mut self, text: &str) -> Result<()> {
        self.set_bytes(&encode_latin1(text)?);
        Ok(())
    }

    /// Overwrite the storage in place with contents returned by the peer.
    pub fn overwrite(&mut self, contents: &[u8]) {
        let n = contents.len().min(self.data.len());
        self.data[..n].copy_from_slice(&contents[..n]);
    }

    /// Read `count` little-endian doubles from the front of the buffer.
    pub fn to_f64s(&self, count: usize) -> Vec<f64> {
        let available = self.data.len() / 8;
        let mut cursor = &self.data[..count.min(available) * 8];
        let mut out = Vec::with_capacity(count);
        while cursor.has_remaining() {
            out.push(cursor.get_f64_le());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_reserves_terminator() {
        let buf = XeprBuf::new(16);
        assert_eq!(buf.len(), 16);
        assert_eq!(buf.raw_len(), 17);
        assert!(buf.bytes().is_empty());
    }

    #[test]
    fn text_truncates_at_first_null() {
        let mut buf = XeprBuf::new(8);
        buf.overwrite(b"abc\0def");
        assert_eq!(buf.text(), "abc");
    }

    #[test]
    fn set_text_truncates_to_capacity() {
        let mut buf = XeprBuf::new(3);
        buf.set_text("abcdef").unwrap();
        assert_eq!(buf.text(), "abc");
        assert_eq!(buf.as_raw()[3], 0);
    }

    #[test]
    fn latin1_text_roundtrip() {
        let buf = XeprBuf::from_text("Gauß µT").unwrap();
        assert_eq!(buf.len(), 7);
        assert_eq!(buf.text(), "Gauß µT");
    }

    #[test]
    fn index_buffer_layout() {
        let buf = XeprBuf::from_i32s(&[3, 7]);
        assert_eq!(buf.raw_len(), 12);
        assert_eq!(&buf.as_raw()[..4], &3i32.to_le_bytes());
        assert_eq!(&buf.as_raw()[8..], &[0, 0, 0, 0]);
    }

    #[test]
    fn doubles_roundtrip_through_storage() {
        let buf = XeprBuf::from_f64s(&[1.5, -2.25, 1e-9]);
        assert_eq!(buf.raw_len(), 25);
        assert_eq!(buf.to_f64s(3), vec![1.5, -2.25, 1e-9]);
    }

    #[test]
    fn overwrite_never_grows_storage() {
        let mut buf = XeprBuf::new(2);
        buf.overwrite(b"toolong");
        assert_eq!(buf.as_raw(), b"too");
    }
}
