//! Stack tag ordinals.
//!
//! The ordinal of each variant is the integer the peer reads from and
//! writes to the operand stack. The order is part of the wire contract.

use serde::Serialize;

/// Wire category of a stack value.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StackType {
    Nil = 0,
    Pointer = 1,
    Bool = 2,
    Double = 3,
    Float = 4,
    Long = 5,
    Int = 6,
    Short = 7,
    Char = 8,
    String = 9,
    Buffer = 10,
}

/// All tags, indexed by ordinal.
pub const STACK_TYPES: [StackType; 11] = [
    StackType::Nil,
    StackType::Pointer,
    StackType::Bool,
    StackType::Double,
    StackType::Float,
    StackType::Long,
    StackType::Int,
    StackType::Short,
    StackType::Char,
    StackType::String,
    StackType::Buffer,
];

impl StackType {
    /// Look up a tag by its wire ordinal.
    pub fn from_ordinal(ordinal: i32) -> Option<Self> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|idx| STACK_TYPES.get(idx).copied())
    }

    /// The wire ordinal of this tag.
    pub fn ordinal(self) -> i32 {
        self as i32
    }

    /// Fixed byte width, or `None` for variable-length tags.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            StackType::Nil => Some(0),
            StackType::Pointer => Some(4),
            StackType::Bool => Some(1),
            StackType::Double => Some(8),
            StackType::Float => Some(4),
            StackType::Long => Some(8),
            StackType::Int => Some(4),
            StackType::Short => Some(2),
            StackType::Char => Some(1),
            StackType::String | StackType::Buffer => None,
        }
    }

    /// Human-readable tag name.
    pub fn name(self) -> &'static str {
        match self {
            StackType::Nil => "nil",
            StackType::Pointer => "pointer",
            StackType::Bool => "bool",
            StackType::Double => "double",
            StackType::Float => "float",
            StackType::Long => "long",
            StackType::Int => "int",
            StackType::Short => "short",
            StackType::Char => "char",
            StackType::String => "string",
            StackType::Buffer => "buffer",
        }
    }
}

impl std::fmt::Display for StackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
