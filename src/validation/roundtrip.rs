//! Round-trip validation
//!
//! Decodes a database, re-encodes the unmodified tree, and compares the
//! result against the original bytes with the structural differ. Device
//! firmware rejects files whose lengths, counts, or hash fields are even
//! slightly wrong, so this is the check to run before trusting the writer
//! with a library you care about.

use crate::diff::diff;
use crate::itdb::reader::decode;
use crate::itdb::writer::encode;
use anyhow::{Context, Result};
use std::path::Path;

/// Divergences logged individually before giving up on a failed check.
const MAX_LOGGED_DIVERGENCES: usize = 20;

/// Verify that an in-memory database buffer survives a decode/encode
/// cycle byte for byte.
pub fn verify_roundtrip(bytes: &[u8]) -> Result<()> {
    log::info!("Validating round trip of {} byte database", bytes.len());

    let out = decode(bytes).context("Failed to decode database")?;
    for warning in &out.warnings {
        log::warn!("Decode warning: {warning}");
    }
    log::info!(
        "Decoded: format version 0x{:02x}, {} section(s), {} track(s), {} playlist(s)",
        out.database.format_version(),
        out.database.section_count(),
        out.database.tracks().count(),
        out.database.playlists().count()
    );

    let rebuilt = encode(&out.database).context("Failed to re-encode database")?;

    if rebuilt == bytes {
        log::info!("✅ Round trip is byte-identical");
        return Ok(());
    }

    let report = diff(bytes, &rebuilt);
    log::error!("❌ Re-encoded database diverges in {} place(s)", report.len());
    for d in report.iter().take(MAX_LOGGED_DIVERGENCES) {
        log::error!(
            "  {} at offset {}: {} expected {}, got {}",
            d.path,
            d.offset,
            d.field,
            d.expected,
            d.actual
        );
    }
    if report.len() > MAX_LOGGED_DIVERGENCES {
        log::error!("  ... and {} more", report.len() - MAX_LOGGED_DIVERGENCES);
    }
    anyhow::bail!("round trip diverges in {} place(s)", report.len())
}

/// Verify the round trip of a database file on disk.
pub fn verify_file(path: &Path) -> Result<()> {
    log::info!("Validating database file: {:?}", path);
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read database: {:?}", path))?;
    verify_roundtrip(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Database, Section, TrackItem, TrackList};

    #[test]
    fn test_verify_roundtrip_passes_on_clean_database() {
        let mut db = Database::new();
        let mut tracks = TrackList::new();
        let mut track = TrackItem::new(1);
        track.set_title("Test Song");
        tracks.push(track);
        db.add_section(Section::tracks(tracks));

        let bytes = encode(&db).unwrap();
        assert!(verify_roundtrip(&bytes).is_ok());
    }

    #[test]
    fn test_verify_roundtrip_rejects_garbage() {
        assert!(verify_roundtrip(&[0u8; 64]).is_err());
    }
}
