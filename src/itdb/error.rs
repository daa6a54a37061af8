//! Codec error taxonomy
//!
//! Fatal errors abort the whole decode or encode call and carry the offset
//! and chunk path where they occurred. Non-fatal conditions accumulate as
//! [`DecodeWarning`]s returned alongside the successful result, so callers
//! can decide whether a best-effort parse is good enough to proceed with.

use super::tags::ChunkPath;
use thiserror::Error;

/// A bounds violation raised by the byte cursor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("access of {len} byte(s) at offset {offset} runs past the {buffer_len}-byte buffer")]
pub struct OutOfRange {
    pub offset: usize,
    pub len: usize,
    pub buffer_len: usize,
}

/// Fatal decode failures. No partial tree is returned.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("out of range at {path}: {source}")]
    OutOfRange {
        path: ChunkPath,
        #[source]
        source: OutOfRange,
    },

    #[error("expected {expected} chunk at offset {offset}, found {found} (at {path})")]
    BadMagic {
        expected: &'static str,
        found: String,
        offset: usize,
        path: ChunkPath,
    },

    /// An unrecognized chunk without a usable total length cannot be
    /// skipped; guessing an extent would misalign the rest of the parse.
    #[error("unknown chunk {found} at offset {offset} declares no usable total length (at {path})")]
    UnknownUnsizedChunk {
        found: String,
        offset: usize,
        path: ChunkPath,
    },
}

/// Fatal encode failures.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("out of range while emitting {path}: {source}")]
    OutOfRange {
        path: ChunkPath,
        #[source]
        source: OutOfRange,
    },

    /// A chunk's stored header is shorter than the common envelope, so its
    /// length and count fields cannot be patched.
    #[error("header of {path} is only {len} byte(s), too short to patch")]
    HeaderTooShort { path: ChunkPath, len: usize },
}

/// Non-fatal conditions observed during a decode.
#[derive(Debug, Clone, Error)]
pub enum DecodeWarning {
    /// Payload bytes were not valid text under the declared encoding; the
    /// text was decoded with replacement characters and the original bytes
    /// are kept for re-emission.
    #[error("data object type {object_type} at {path} is not valid {encoding}; decoded lossily")]
    StringDecodeDegraded {
        path: ChunkPath,
        object_type: u32,
        encoding: &'static str,
    },

    /// A sized chunk's declared length disagrees with the span of its
    /// header plus children. The declared length wins for realignment.
    #[error("{path} declares {declared} byte(s) but header and children span {computed}")]
    LengthInconsistency {
        path: ChunkPath,
        declared: u32,
        computed: u32,
    },

    /// A chunk was preserved as opaque bytes instead of being decoded,
    /// either because its magic is not modeled or because its contents
    /// failed to parse.
    #[error("chunk {magic} at {path} preserved as {len} raw byte(s): {reason}")]
    RawChunkPreserved {
        path: ChunkPath,
        magic: String,
        len: usize,
        reason: String,
    },
}
