//! iTunesDB codec
//!
//! Parses the hierarchical, length-prefixed database format portable
//! players use for track, playlist, and album metadata; rebuilds a
//! byte-compatible file from a modified tree; and reports field-level
//! divergence between two serialized databases.

pub mod device;
pub mod diff;
pub mod itdb;
pub mod model;
pub mod validation;

pub use diff::{diff, Divergence};
pub use itdb::{decode, encode, encode_with, DecodeOutput};
pub use model::Database;
