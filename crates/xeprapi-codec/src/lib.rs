//! Tagged value codec for the Xepr API operand stack.
//!
//! Every argument and every return value crossing the transport travels as
//! a `(tag, bytes)` pair:
//! - the tag is an ordinal from a fixed table shared with the peer
//! - the bytes are the fixed-width little-endian encoding of the value,
//!   or a null-terminated ISO-8859-1 string, or a raw buffer
//!
//! Changing the ordinal table breaks compatibility with the peer.

pub mod buffer;
pub mod codec;
pub mod error;
pub mod tags;
pub mod value;

pub use buffer::XeprBuf;
pub use codec::{decode, decode_latin1, encode, encode_latin1, POP_BUFFER_LEN};
pub use error::{CodecError, Result};
pub use tags::StackType;
pub use value::{Handle, StackValue};
