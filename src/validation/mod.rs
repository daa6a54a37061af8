//! Validation utilities
//!
//! Round-trip checks using the codec's own differ as the oracle.

mod roundtrip;

pub use roundtrip::{verify_file, verify_roundtrip};
