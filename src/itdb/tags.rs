//! Chunk tag definitions and header layout constants

use std::fmt;

/// Database root chunk ("mhbd")
pub const DATABASE_MAGIC: [u8; 4] = *b"mhbd";
/// Section container chunk ("mhsd")
pub const SECTION_MAGIC: [u8; 4] = *b"mhsd";
/// Track list chunk ("mhlt")
pub const TRACK_LIST_MAGIC: [u8; 4] = *b"mhlt";
/// Playlist list chunk ("mhlp"), shared by podcast and smart playlist sections
pub const PLAYLIST_LIST_MAGIC: [u8; 4] = *b"mhlp";
/// Album list chunk ("mhla")
pub const ALBUM_LIST_MAGIC: [u8; 4] = *b"mhla";
/// Track item chunk ("mhit")
pub const TRACK_MAGIC: [u8; 4] = *b"mhit";
/// Playlist item chunk ("mhyp")
pub const PLAYLIST_MAGIC: [u8; 4] = *b"mhyp";
/// Playlist membership entry chunk ("mhip")
pub const MEMBER_MAGIC: [u8; 4] = *b"mhip";
/// Album item chunk ("mhia")
pub const ALBUM_MAGIC: [u8; 4] = *b"mhia";
/// Data object chunk ("mhod")
pub const OBJECT_MAGIC: [u8; 4] = *b"mhod";

/// Closed enumeration of every chunk kind the codec models.
///
/// Anything outside this set is handled through the raw-chunk fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkTag {
    Database,
    Section,
    TrackList,
    PlaylistList,
    AlbumList,
    Track,
    Playlist,
    Member,
    Album,
    DataObject,
}

impl ChunkTag {
    /// Look up a tag from its on-disk magic bytes.
    pub fn from_magic(magic: [u8; 4]) -> Option<ChunkTag> {
        match magic {
            DATABASE_MAGIC => Some(ChunkTag::Database),
            SECTION_MAGIC => Some(ChunkTag::Section),
            TRACK_LIST_MAGIC => Some(ChunkTag::TrackList),
            PLAYLIST_LIST_MAGIC => Some(ChunkTag::PlaylistList),
            ALBUM_LIST_MAGIC => Some(ChunkTag::AlbumList),
            TRACK_MAGIC => Some(ChunkTag::Track),
            PLAYLIST_MAGIC => Some(ChunkTag::Playlist),
            MEMBER_MAGIC => Some(ChunkTag::Member),
            ALBUM_MAGIC => Some(ChunkTag::Album),
            OBJECT_MAGIC => Some(ChunkTag::DataObject),
            _ => None,
        }
    }

    /// The on-disk magic bytes for this tag.
    pub fn magic(self) -> [u8; 4] {
        match self {
            ChunkTag::Database => DATABASE_MAGIC,
            ChunkTag::Section => SECTION_MAGIC,
            ChunkTag::TrackList => TRACK_LIST_MAGIC,
            ChunkTag::PlaylistList => PLAYLIST_LIST_MAGIC,
            ChunkTag::AlbumList => ALBUM_LIST_MAGIC,
            ChunkTag::Track => TRACK_MAGIC,
            ChunkTag::Playlist => PLAYLIST_MAGIC,
            ChunkTag::Member => MEMBER_MAGIC,
            ChunkTag::Album => ALBUM_MAGIC,
            ChunkTag::DataObject => OBJECT_MAGIC,
        }
    }

    /// True for list chunks: they carry a child count at offset 8 and no
    /// total length. Their extent is the sum of their children's extents.
    ///
    /// Every other chunk is "sized": offset 8 holds a total length covering
    /// header, payload, and children, and a traversal advances by exactly
    /// that many bytes. Mixing up the two rules misparses everything after
    /// the first list, so traversal code must branch on this predicate and
    /// never assume either rule universally.
    pub fn is_list(self) -> bool {
        matches!(
            self,
            ChunkTag::TrackList | ChunkTag::PlaylistList | ChunkTag::AlbumList
        )
    }

    /// True for chunks that carry a total length at offset 8.
    pub fn is_sized(self) -> bool {
        !self.is_list()
    }

    /// The canonical four-character name ("mhbd", "mhit", ...).
    pub fn name(self) -> &'static str {
        match self {
            ChunkTag::Database => "mhbd",
            ChunkTag::Section => "mhsd",
            ChunkTag::TrackList => "mhlt",
            ChunkTag::PlaylistList => "mhlp",
            ChunkTag::AlbumList => "mhla",
            ChunkTag::Track => "mhit",
            ChunkTag::Playlist => "mhyp",
            ChunkTag::Member => "mhip",
            ChunkTag::Album => "mhia",
            ChunkTag::DataObject => "mhod",
        }
    }
}

/// Printable label for arbitrary magic bytes, escaping non-ASCII as hex.
pub fn magic_label(magic: [u8; 4]) -> String {
    if magic.iter().all(|b| b.is_ascii_graphic()) {
        String::from_utf8_lossy(&magic).into_owned()
    } else {
        format!(
            "0x{:02x}{:02x}{:02x}{:02x}",
            magic[0], magic[1], magic[2], magic[3]
        )
    }
}

/// Section type discriminants stored at offset 12 of an "mhsd" chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Tracks,
    Playlists,
    Podcasts,
    Albums,
    SmartPlaylists,
}

impl SectionKind {
    pub fn from_raw(raw: u32) -> Option<SectionKind> {
        match raw {
            1 => Some(SectionKind::Tracks),
            2 => Some(SectionKind::Playlists),
            3 => Some(SectionKind::Podcasts),
            4 => Some(SectionKind::Albums),
            5 => Some(SectionKind::SmartPlaylists),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            SectionKind::Tracks => 1,
            SectionKind::Playlists => 2,
            SectionKind::Podcasts => 3,
            SectionKind::Albums => 4,
            SectionKind::SmartPlaylists => 5,
        }
    }

    /// The list magic this section is expected to wrap.
    pub fn list_magic(self) -> [u8; 4] {
        match self {
            SectionKind::Tracks => TRACK_LIST_MAGIC,
            SectionKind::Albums => ALBUM_LIST_MAGIC,
            // Podcast and smart playlist sections reuse the playlist list
            // shape and are told apart by flags on the items themselves.
            SectionKind::Playlists | SectionKind::Podcasts | SectionKind::SmartPlaylists => {
                PLAYLIST_LIST_MAGIC
            }
        }
    }
}

/// One step of a chunk path: a magic tag plus the child index at that level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSegment {
    pub magic: [u8; 4],
    pub index: usize,
}

/// Location of a chunk within the tree, e.g. `mhbd[0]/mhsd[0]/mhlt[0]/mhit[2]`.
///
/// Attached to fatal decode errors, warnings, and divergence reports so a
/// caller can tell exactly which record a problem belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkPath(Vec<PathSegment>);

impl ChunkPath {
    pub fn root() -> ChunkPath {
        ChunkPath(Vec::new())
    }

    pub fn push(&mut self, magic: [u8; 4], index: usize) {
        self.0.push(PathSegment { magic, index });
    }

    pub fn pop(&mut self) {
        self.0.pop();
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ChunkPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(root)");
        }
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}[{}]", magic_label(seg.magic), seg.index)?;
        }
        Ok(())
    }
}
