//! Database-integrity hash region
//!
//! Databases with a format version at or above [`HASH_VERSION_THRESHOLD`]
//! reserve a 20-byte region in the root header that firmware checks before
//! accepting the file. The exact algorithm varies by device generation and
//! is keyed to per-device material, so it is modeled as a pluggable
//! capability: the writer zeroes the region, hands the finished buffer to a
//! [`DatabaseHash`] implementation, and patches the digest back in. When no
//! implementation is supplied the stored bytes are preserved verbatim.

/// Lowest format version whose header carries the hash region.
pub const HASH_VERSION_THRESHOLD: u32 = 0x19;

/// Byte offset of the hash region within the database header.
pub const HASH_REGION_OFFSET: usize = 88;

/// Byte length of the hash region.
pub const HASH_REGION_LEN: usize = 20;

/// Computes the integrity digest over a fully emitted database buffer.
///
/// The buffer passed to `compute` has the hash region already zeroed, so
/// implementations hash the exact bytes the firmware will see.
pub trait DatabaseHash {
    fn compute(&self, bytes: &[u8]) -> [u8; HASH_REGION_LEN];
}
