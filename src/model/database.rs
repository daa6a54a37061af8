//! Database root and section containers

use super::{
    header_template, header_u16, header_u32, header_u64, put_header_u32, put_header_u64,
    AlbumList, Child, PlaylistItem, PlaylistList, TrackItem, TrackList,
};
use crate::itdb::hash::{HASH_REGION_LEN, HASH_REGION_OFFSET, HASH_VERSION_THRESHOLD};
use crate::itdb::tags::{SectionKind, DATABASE_MAGIC, SECTION_MAGIC};

/// Default header length for the database root chunk.
pub(crate) const DATABASE_HEADER_LEN: usize = 0xF4;
/// Default header length for section chunks.
pub(crate) const SECTION_HEADER_LEN: usize = 0x60;

const FORMAT_VERSION_OFFSET: usize = 16;
const DATABASE_ID_OFFSET: usize = 24;
const PLATFORM_OFFSET: usize = 32;
const LANGUAGE_OFFSET: usize = 46;
const LIBRARY_PERSISTENT_ID_OFFSET: usize = 72;

const SECTION_TYPE_OFFSET: usize = 12;

/// Format version written into newly synthesized databases.
const DEFAULT_FORMAT_VERSION: u32 = HASH_VERSION_THRESHOLD;

/// The root of a decoded database: header fields plus ordered sections.
#[derive(Debug, Clone, PartialEq)]
pub struct Database {
    header: Vec<u8>,
    pub sections: Vec<Child<Section>>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    /// Create an empty database with a current-format header.
    pub fn new() -> Database {
        let mut header = header_template(DATABASE_MAGIC, DATABASE_HEADER_LEN);
        // The word after the envelope is always 1 in shipped databases.
        put_header_u32(&mut header, 12, 1);
        put_header_u32(&mut header, FORMAT_VERSION_OFFSET, DEFAULT_FORMAT_VERSION);
        Database {
            header,
            sections: Vec::new(),
        }
    }

    pub(crate) fn from_parts(header: Vec<u8>, sections: Vec<Child<Section>>) -> Database {
        Database { header, sections }
    }

    pub(crate) fn header_bytes(&self) -> &[u8] {
        &self.header
    }

    /// True when the header physically contains the given field and, for
    /// version-gated regions, the format version is new enough for it.
    fn gated(&self, offset: usize, len: usize) -> bool {
        offset + len <= self.header.len() && self.format_version() >= HASH_VERSION_THRESHOLD
    }

    pub fn format_version(&self) -> u32 {
        header_u32(&self.header, FORMAT_VERSION_OFFSET)
    }

    pub fn set_format_version(&mut self, version: u32) {
        put_header_u32(&mut self.header, FORMAT_VERSION_OFFSET, version);
    }

    pub fn database_id(&self) -> u64 {
        header_u64(&self.header, DATABASE_ID_OFFSET)
    }

    pub fn set_database_id(&mut self, id: u64) {
        put_header_u64(&mut self.header, DATABASE_ID_OFFSET, id);
    }

    pub fn platform(&self) -> u16 {
        header_u16(&self.header, PLATFORM_OFFSET)
    }

    /// Language / hash-scheme code, absent below the gating version.
    pub fn language(&self) -> Option<u16> {
        self.gated(LANGUAGE_OFFSET, 2)
            .then(|| header_u16(&self.header, LANGUAGE_OFFSET))
    }

    pub fn library_persistent_id(&self) -> Option<u64> {
        self.gated(LIBRARY_PERSISTENT_ID_OFFSET, 8)
            .then(|| header_u64(&self.header, LIBRARY_PERSISTENT_ID_OFFSET))
    }

    pub fn set_library_persistent_id(&mut self, id: u64) {
        put_header_u64(&mut self.header, LIBRARY_PERSISTENT_ID_OFFSET, id);
    }

    /// The stored integrity hash region, absent below the gating version.
    pub fn hash_region(&self) -> Option<&[u8]> {
        self.gated(HASH_REGION_OFFSET, HASH_REGION_LEN)
            .then(|| &self.header[HASH_REGION_OFFSET..HASH_REGION_OFFSET + HASH_REGION_LEN])
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn add_section(&mut self, section: Section) {
        self.sections.push(Child::Item(section));
    }

    fn section_bodies(&self) -> impl Iterator<Item = &SectionBody> {
        self.sections.iter().filter_map(Child::item).map(|s| &s.body)
    }

    /// The first tracks section's list, if one exists.
    pub fn track_list(&self) -> Option<&TrackList> {
        self.section_bodies().find_map(|body| match body {
            SectionBody::Tracks(list) => Some(list),
            _ => None,
        })
    }

    pub fn track_list_mut(&mut self) -> Option<&mut TrackList> {
        self.sections
            .iter_mut()
            .filter_map(Child::item_mut)
            .find_map(|section| match &mut section.body {
                SectionBody::Tracks(list) => Some(list),
                _ => None,
            })
    }

    /// The first plain playlists section's list, if one exists.
    pub fn playlist_list(&self) -> Option<&PlaylistList> {
        self.sections
            .iter()
            .filter_map(Child::item)
            .find_map(|section| match (&section.body, section.kind()) {
                (SectionBody::Playlists(list), Some(SectionKind::Playlists)) => Some(list),
                _ => None,
            })
    }

    /// The first albums section's list, if one exists.
    pub fn album_list(&self) -> Option<&AlbumList> {
        self.section_bodies().find_map(|body| match body {
            SectionBody::Albums(list) => Some(list),
            _ => None,
        })
    }

    /// All decodable tracks across every tracks section.
    pub fn tracks(&self) -> impl Iterator<Item = &TrackItem> {
        self.section_bodies().flat_map(|body| {
            let list = match body {
                SectionBody::Tracks(list) => Some(list),
                _ => None,
            };
            list.into_iter().flat_map(|list| list.tracks())
        })
    }

    /// All decodable playlists across playlist-shaped sections, including
    /// podcast and smart playlist sections.
    pub fn playlists(&self) -> impl Iterator<Item = &PlaylistItem> {
        self.section_bodies().flat_map(|body| {
            let list = match body {
                SectionBody::Playlists(list) => Some(list),
                _ => None,
            };
            list.into_iter().flat_map(|list| list.playlists())
        })
    }

    /// The master playlist: the first entry of the first playlist list.
    pub fn master_playlist(&self) -> Option<&PlaylistItem> {
        self.playlists().next().filter(|p| p.is_master())
    }
}

/// Payload of a section: exactly one list of the matching flavor, or the
/// verbatim bytes of a section kind this codec does not model.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody {
    Tracks(TrackList),
    /// Shared by playlist, podcast, and smart playlist sections; the
    /// section type field tells them apart.
    Playlists(PlaylistList),
    Albums(AlbumList),
    Raw(Vec<u8>),
}

/// A typed section container ("mhsd") inside the database.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    header: Vec<u8>,
    pub body: SectionBody,
}

impl Section {
    fn with_kind(kind: SectionKind, body: SectionBody) -> Section {
        let mut header = header_template(SECTION_MAGIC, SECTION_HEADER_LEN);
        put_header_u32(&mut header, SECTION_TYPE_OFFSET, kind.as_raw());
        Section { header, body }
    }

    pub fn tracks(list: TrackList) -> Section {
        Section::with_kind(SectionKind::Tracks, SectionBody::Tracks(list))
    }

    pub fn playlists(list: PlaylistList) -> Section {
        Section::with_kind(SectionKind::Playlists, SectionBody::Playlists(list))
    }

    pub fn podcasts(list: PlaylistList) -> Section {
        Section::with_kind(SectionKind::Podcasts, SectionBody::Playlists(list))
    }

    pub fn smart_playlists(list: PlaylistList) -> Section {
        Section::with_kind(SectionKind::SmartPlaylists, SectionBody::Playlists(list))
    }

    pub fn albums(list: AlbumList) -> Section {
        Section::with_kind(SectionKind::Albums, SectionBody::Albums(list))
    }

    pub(crate) fn from_parts(header: Vec<u8>, body: SectionBody) -> Section {
        Section { header, body }
    }

    pub(crate) fn header_bytes(&self) -> &[u8] {
        &self.header
    }

    /// The raw section type discriminant.
    pub fn kind_raw(&self) -> u32 {
        header_u32(&self.header, SECTION_TYPE_OFFSET)
    }

    pub fn kind(&self) -> Option<SectionKind> {
        SectionKind::from_raw(self.kind_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_database_header() {
        let db = Database::new();
        assert_eq!(db.format_version(), DEFAULT_FORMAT_VERSION);
        assert_eq!(db.section_count(), 0);
        assert_eq!(db.database_id(), 0);
        // A fresh header is new enough to carry the gated regions.
        assert!(db.language().is_some());
        assert_eq!(db.hash_region().unwrap(), &[0u8; HASH_REGION_LEN]);
    }

    #[test]
    fn test_version_gating() {
        let mut db = Database::new();
        db.set_format_version(0x10);
        assert!(db.language().is_none());
        assert!(db.library_persistent_id().is_none());
        assert!(db.hash_region().is_none());

        db.set_format_version(HASH_VERSION_THRESHOLD);
        assert!(db.hash_region().is_some());
    }

    #[test]
    fn test_section_lookup() {
        let mut db = Database::new();
        let mut tracks = TrackList::new();
        tracks.push(TrackItem::new(1));
        db.add_section(Section::tracks(tracks));

        let mut playlists = PlaylistList::new();
        playlists.push(PlaylistItem::new_master("Library", 7));
        db.add_section(Section::playlists(playlists));

        assert_eq!(db.section_count(), 2);
        assert_eq!(db.track_list().unwrap().len(), 1);
        assert_eq!(db.tracks().count(), 1);
        assert_eq!(db.master_playlist().unwrap().name(), Some("Library"));

        // Podcast sections share the playlist shape but are not the plain
        // playlists section.
        let mut casts = PlaylistList::new();
        casts.push(PlaylistItem::new("Casts", 8));
        db.add_section(Section::podcasts(casts));
        assert_eq!(db.playlist_list().unwrap().len(), 1);
        assert_eq!(db.playlists().count(), 2);
    }

    #[test]
    fn test_section_kinds() {
        let section = Section::smart_playlists(PlaylistList::new());
        assert_eq!(section.kind_raw(), 5);
        assert_eq!(section.kind(), Some(SectionKind::SmartPlaylists));
    }
}
