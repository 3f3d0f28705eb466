/// Errors that can occur while encoding or decoding stack values.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The peer returned a tag outside the shared ordinal table.
    #[error("unknown stack tag {0}")]
    UnknownTag(i32),

    /// The value has no wire representation.
    #[error("unsupported type for transport: {0}")]
    UnsupportedType(&'static str),

    /// A string contains characters outside ISO-8859-1.
    #[error("character {ch:?} at offset {offset} cannot be encoded as ISO-8859-1")]
    Unencodable { ch: char, offset: usize },

    /// The raw bytes are shorter than the fixed width of the tag.
    #[error("{tag} value needs {needed} bytes, got {got}")]
    ShortData {
        tag: &'static str,
        needed: usize,
        got: usize,
    },
}

pub type Result<T> = std::result::Result<T, CodecError>;
