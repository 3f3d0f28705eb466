use std::fmt;

use serde::{Serialize, Serializer};

use crate::buffer::XeprBuf;
use crate::tags::StackType;

/// Opaque peer-side handle (datasets, experiments, the NIL constant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Handle(pub i32);

impl Handle {
    /// The null handle the peer returns when an object does not exist.
    pub const NULL: Handle = Handle(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<handle {:#x}>", self.0)
    }
}

/// A value that can be pushed onto or popped from the operand stack.
#[derive(Debug, Clone, PartialEq)]
pub enum StackValue {
    Nil,
    Pointer(Handle),
    Bool(bool),
    Double(f64),
    Float(f32),
    Long(i64),
    Int(i32),
    Short(i16),
    Char(u8),
    Str(String),
    /// Mutable out-buffer; its contents are refreshed after the call.
    Buffer(XeprBuf),
}

impl StackValue {
    /// Wire tag for this value.
    pub fn stack_type(&self) -> StackType {
        match self {
            StackValue::Nil => StackType::Nil,
            StackValue::Pointer(_) => StackType::Pointer,
            StackValue::Bool(_) => StackType::Bool,
            StackValue::Double(_) => StackType::Double,
            StackValue::Float(_) => StackType::Float,
            StackValue::Long(_) => StackType::Long,
            StackValue::Int(_) => StackType::Int,
            StackValue::Short(_) => StackType::Short,
            StackValue::Char(_) => StackType::Char,
            StackValue::Str(_) => StackType::String,
            StackValue::Buffer(_) => StackType::Buffer,
        }
    }

    /// Classify a textual argument into the narrowest wire category.
    ///
    /// Booleans are tried before integers and integers before floating
    /// point, so `"true"` never becomes `1` and `"3"` never becomes `3.0`.
    pub fn infer(text: &str) -> StackValue {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            return StackValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return StackValue::Bool(false);
        }
        if let Ok(v) = trimmed.parse::<i32>() {
            return StackValue::Int(v);
        }
        if let Ok(v) = trimmed.parse::<i64>() {
            return StackValue::Long(v);
        }
        if let Ok(v) = trimmed.parse::<f64>() {
            return StackValue::Double(v);
        }
        StackValue::Str(text.to_string())
    }

    pub fn is_buffer(&self) -> bool {
        matches!(self, StackValue::Buffer(_))
    }

    pub fn as_buffer(&self) -> Option<&XeprBuf> {
        match self {
            StackValue::Buffer(buf) => Some(buf),
            _ => None,
        }
    }

    pub fn as_buffer_mut(&mut self) -> Option<&mut XeprBuf> {
        match self {
            StackValue::Buffer(buf) => Some(buf),
            _ => None,
        }
    }

    pub fn into_buffer(self) -> Option<XeprBuf> {
        match self {
            StackValue::Buffer(buf) => Some(buf),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<Handle> {
        match self {
            StackValue::Pointer(h) => Some(*h),
            _ => None,
        }
    }

    /// Integral view of any integer-like value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StackValue::Bool(v) => Some(i64::from(*v)),
            StackValue::Long(v) => Some(*v),
            StackValue::Int(v) => Some(i64::from(*v)),
            StackValue::Short(v) => Some(i64::from(*v)),
            StackValue::Char(v) => Some(i64::from(*v)),
            StackValue::Pointer(h) => Some(i64::from(h.0)),
            _ => None,
        }
    }

    /// Floating point view of any numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StackValue::Double(v) => Some(*v),
            StackValue::Float(v) => Some(f64::from(*v)),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StackValue::Bool(v) => Some(*v),
            other => other.as_i64().map(|v| v != 0),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StackValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            StackValue::Str(s) => Some(s),
            StackValue::Buffer(buf) => Some(buf.text()),
            _ => None,
        }
    }
}

impl fmt::Display for StackValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackValue::Nil => f.write_str("nil"),
            StackValue::Pointer(h) => write!(f, "{h}"),
            StackValue::Bool(v) => write!(f, "{v}"),
            StackValue::Double(v) => write!(f, "{v}"),
            StackValue::Float(v) => write!(f, "{v}"),
            StackValue::Long(v) => write!(f, "{v}"),
            StackValue::Int(v) => write!(f, "{v}"),
            StackValue::Short(v) => write!(f, "{v}"),
            StackValue::Char(v) => write!(f, "{}", char::from(*v)),
            StackValue::Str(s) => f.write_str(s),
            StackValue::Buffer(buf) => f.write_str(&buf.text()),
        }
    }
}

impl Serialize for StackValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StackValue::Nil => serializer.serialize_unit(),
            StackValue::Pointer(h) => serializer.serialize_i32(h.0),
            StackValue::Bool(v) => serializer.serialize_bool(*v),
            StackValue::Double(v) => serializer.serialize_f64(*v),
            StackValue::Float(v) => serializer.serialize_f32(*v),
            StackValue::Long(v) => serializer.serialize_i64(*v),
            StackValue::Int(v) => serializer.serialize_i32(*v),
            StackValue::Short(v) => serializer.serialize_i16(*v),
            StackValue::Char(v) => serializer.serialize_char(char::from(*v)),
            StackValue::Str(s) => serializer.serialize_str(s),
            StackValue::Buffer(buf) => serializer.serialize_str(&buf.text()),
        }
    }
}

impl From<bool> for StackValue {
    fn from(v: bool) -> Self {
        StackValue::Bool(v)
    }
}

impl From<i16> for StackValue {
    fn from(v: i16) -> Self {
        StackValue::Short(v)
    }
}

impl From<i32> for StackValue {
    fn from(v: i32) -> Self {
        StackValue::Int(v)
    }
}

impl From<i64> for StackValue {
    fn from(v: i64) -> Self {
        StackValue::Long(v)
    }
}

impl From<usize> for StackValue {
    fn from(v: usize) -> Self {
        match i32::try_from(v) {
            Ok(v) => StackValue::Int(v),
            Err(_) => StackValue::Long(v as i64),
        }
    }
}

impl From<f32> for StackValue {
    fn from(v: f32) -> Self {
        StackValue::Float(v)
    }
}

impl From<f64> for StackValue {
    fn from(v: f64) -> Self {
        StackValue::Double(v)
    }
}

impl From<&str> for StackValue {
    fn from(v: &str) -> Self {
        StackValue::Str(v.to_string())
    }
}

impl From<String> for StackValue {
    fn from(v: String) -> Self {
        StackValue::Str(v)
    }
}

impl From<Handle> for StackValue {
    fn from(v: Handle) -> Self {
        StackValue::Pointer(v)
    }
}

impl From<XeprBuf> for StackValue {
    fn from(v: XeprBuf) -> Self {
        StackValue::Buffer(v)
    }
}
