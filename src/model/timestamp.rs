//! Mac-epoch timestamp conversion
//!
//! Timestamp fields in the database count seconds since 1904-01-01 UTC,
//! the classic Mac epoch. Zero means "never set".

use chrono::{DateTime, TimeZone, Utc};

/// Seconds between 1904-01-01 and the Unix epoch.
const MAC_TO_UNIX_OFFSET: i64 = 2_082_844_800;

/// Convert a UTC time to an on-disk timestamp, saturating at the field's
/// range instead of wrapping.
pub fn from_datetime(time: DateTime<Utc>) -> u32 {
    let mac = time.timestamp().saturating_add(MAC_TO_UNIX_OFFSET);
    mac.clamp(0, u32::MAX as i64) as u32
}

/// Convert an on-disk timestamp back to UTC. Zero is "never set".
pub fn to_datetime(raw: u32) -> Option<DateTime<Utc>> {
    if raw == 0 {
        return None;
    }
    Utc.timestamp_opt(raw as i64 - MAC_TO_UNIX_OFFSET, 0).single()
}

/// The current time as an on-disk timestamp.
pub fn now() -> u32 {
    from_datetime(Utc::now())
}
