use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::buffer::XeprBuf;
use crate::error::{CodecError, Result};
use crate::tags::StackType;
use crate::value::{Handle, StackValue};

/// Size of the scratch area the peer writes a popped value into.
pub const POP_BUFFER_LEN: usize = 255;

/// Encode a value into its wire tag and bytes.
///
/// Wire layout per tag:
/// ```text
/// pointer  i32 LE        double  f64 LE       long   i64 LE
/// bool     u8 (0 or 1)   float   f32 LE       int    i32 LE
/// char     u8            short   i16 LE
/// string   ISO-8859-1 bytes + 0x00
/// buffer   raw storage, terminator included
/// ```
pub fn encode(value: &StackValue) -> Result<(StackType, Bytes)> {
    let mut dst = BytesMut::new();
    match value {
        StackValue::Nil => return Err(CodecError::UnsupportedType("nil")),
        StackValue::Pointer(h) => dst.put_i32_le(h.raw()),
        StackValue::Bool(v) => dst.put_u8(u8::from(*v)),
        StackValue::Double(v) => dst.put_f64_le(*v),
        StackValue::Float(v) => dst.put_f32_le(*v),
        StackValue::Long(v) => dst.put_i64_le(*v),
        StackValue::Int(v) => dst.put_i32_le(*v),
        StackValue::Short(v) => dst.put_i16_le(*v),
        StackValue::Char(v) => dst.put_u8(*v),
        StackValue::Str(s) => {
            dst.put_slice(&encode_latin1(s)?);
            dst.put_u8(0);
        }
        StackValue::Buffer(buf) => dst.put_slice(buf.as_raw()),
    }
    let tag = value.stack_type();
    trace!(%tag, len = dst.len(), "encoded stack value");
    Ok((tag, dst.freeze()))
}

/// Decode a popped value from its wire tag and bytes.
pub fn decode(tag: i32, data: &[u8]) -> Result<StackValue> {
    let ty = StackType::from_ordinal(tag).ok_or(CodecError::UnknownTag(tag))?;
    if let Some(needed) = ty.fixed_width() {
        if data.len() < needed {
            return Err(CodecError::ShortData {
                tag: ty.name(),
                needed,
                got: data.len(),
            });
        }
    }

    let mut src = data;
    let value = match ty {
        StackType::Nil => StackValue::Nil,
        StackType::Pointer => StackValue::Pointer(Handle(src.get_i32_le())),
        StackType::Bool => StackValue::Bool(src.get_u8() != 0),
        StackType::Double => StackValue::Double(src.get_f64_le()),
        StackType::Float => StackValue::Float(src.get_f32_le()),
        StackType::Long => StackValue::Long(src.get_i64_le()),
        StackType::Int => StackValue::Int(src.get_i32_le()),
        StackType::Short => StackValue::Short(src.get_i16_le()),
        StackType::Char => StackValue::Char(src.get_u8()),
        StackType::String => StackValue::Str(decode_latin1(until_null(data))),
        StackType::Buffer => {
            let payload = data.strip_suffix(&[0]).unwrap_or(data);
            StackValue::Buffer(XeprBuf::from_bytes(payload))
        }
    };
    Ok(value)
}

/// Encode text as ISO-8859-1 (one byte per character).
pub fn encode_latin1(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .enumerate()
        .map(|(offset, ch)| u8::try_from(u32::from(ch)).map_err(|_| CodecError::Unencodable { ch, offset }))
        .collect()
}

/// Decode ISO-8859-1 bytes; every byte maps to exactly one character.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

fn until_null(data: &[u8]) -> &[u8] {
    match data.iter().position(|b| *b == 0) {
        Some(end) => &data[..end],
        None => data,
    }
}
