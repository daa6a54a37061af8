//! Device-side file handling
//!
//! Locating the database under a mount point and replacing it atomically.
//! The codec itself never touches the filesystem; this module is the
//! collaborator that owns file I/O.

use crate::itdb::reader::{decode, DecodeOutput};
use crate::itdb::writer::encode;
use crate::model::Database;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Path components of the database below the mount point. FAT-formatted
/// players are case-insensitive, so matching must be too.
const DB_COMPONENTS: [&str; 3] = ["iPod_Control", "iTunes", "iTunesDB"];

/// Locate the database file under a mounted device.
pub fn locate_database(mount: &Path) -> Result<PathBuf> {
    log::debug!("Searching for database under {:?}", mount);

    let found = WalkDir::new(mount)
        .max_depth(DB_COMPONENTS.len())
        .into_iter()
        .filter_map(|entry| entry.ok())
        .find(|entry| {
            entry.file_type().is_file() && path_matches(entry.path().strip_prefix(mount).ok())
        })
        .map(|entry| entry.into_path());

    found.with_context(|| {
        format!(
            "No database found under {:?} (expected {})",
            mount,
            DB_COMPONENTS.join("/")
        )
    })
}

fn path_matches(relative: Option<&Path>) -> bool {
    let Some(relative) = relative else {
        return false;
    };
    let components: Vec<&str> = relative
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();
    components.len() == DB_COMPONENTS.len()
        && components
            .iter()
            .zip(DB_COMPONENTS.iter())
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
}

/// Read and decode a database file.
pub fn load_database(path: &Path) -> Result<DecodeOutput> {
    log::info!("Loading database: {:?}", path);
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read database: {:?}", path))?;
    log::info!("Read {} bytes", bytes.len());

    let out = decode(&bytes).with_context(|| format!("Failed to decode database: {:?}", path))?;
    for warning in &out.warnings {
        log::warn!("Decode warning: {warning}");
    }
    Ok(out)
}

/// Encode a database tree and atomically replace the destination file.
///
/// The complete buffer is written to a temporary file in the destination
/// directory and persisted over the target in one rename, so a crash mid
/// write leaves either the old database or the new one, never a truncated
/// file the device would reject.
pub fn save_database(db: &Database, path: &Path) -> Result<()> {
    let bytes = encode(db).context("Failed to encode database")?;
    log::info!("Writing {} bytes to {:?}", bytes.len(), path);

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = match dir {
        Some(dir) => tempfile::NamedTempFile::new_in(dir),
        None => tempfile::NamedTempFile::new(),
    }
    .context("Failed to create temporary database file")?;

    use std::io::Write;
    tmp.write_all(&bytes)
        .context("Failed to write temporary database file")?;
    tmp.flush()?;
    tmp.persist(path)
        .with_context(|| format!("Failed to replace database: {:?}", path))?;

    log::info!("Database replaced");
    Ok(())
}
