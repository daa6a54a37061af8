//! Structural comparison of serialized databases
//!
//! The regression oracle for the writer: walks two buffers in lockstep and
//! reports every field-level mismatch with its chunk path and byte offset,
//! realigning on declared lengths after each divergence so one corruption
//! does not hide the rest.

mod differ;

pub use differ::{diff, Divergence};
