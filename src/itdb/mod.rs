//! Database chunk codec
//!
//! The byte-level half of the crate: cursor, tags, string sub-records,
//! the recursive-descent reader, and the two-pass writer. The model in
//! [`crate::model`] is what these produce and consume.

pub mod cursor;
pub mod error;
pub mod hash;
pub mod reader;
pub mod strings;
pub mod tags;
pub mod writer;

pub use error::{DecodeError, DecodeWarning, EncodeError, OutOfRange};
pub use hash::DatabaseHash;
pub use reader::{decode, DecodeOutput};
pub use tags::{ChunkPath, ChunkTag, SectionKind};
pub use writer::{encode, encode_with};
