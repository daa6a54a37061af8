//! Track items and the track list

use super::dataobject::is_string_type;
use super::{
    header_template, header_u32, header_u64, put_header_u32, put_header_u64, Child, DataObject,
    ObjectType, LIST_HEADER_LEN,
};
use crate::itdb::tags::{TRACK_LIST_MAGIC, TRACK_MAGIC};

/// Default header length for track item chunks.
pub(crate) const TRACK_HEADER_LEN: usize = 0x248;

const TRACK_ID_OFFSET: usize = 16;
const PERSISTENT_ID_OFFSET: usize = 0x70;
const MEDIA_TYPE_OFFSET: usize = 0xD0;

/// A single track record with its attached data objects.
///
/// Only the handful of fields collaborators actually edit are exposed by
/// name; the rest of the fixed-layout header rides along untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackItem {
    header: Vec<u8>,
    pub data_objects: Vec<Child<DataObject>>,
}

impl TrackItem {
    /// Create a blank track with the given library-local id.
    pub fn new(track_id: u32) -> TrackItem {
        let mut header = header_template(TRACK_MAGIC, TRACK_HEADER_LEN);
        put_header_u32(&mut header, TRACK_ID_OFFSET, track_id);
        TrackItem {
            header,
            data_objects: Vec::new(),
        }
    }

    pub(crate) fn from_parts(header: Vec<u8>, data_objects: Vec<Child<DataObject>>) -> TrackItem {
        TrackItem {
            header,
            data_objects,
        }
    }

    pub(crate) fn header_bytes(&self) -> &[u8] {
        &self.header
    }

    pub fn track_id(&self) -> u32 {
        header_u32(&self.header, TRACK_ID_OFFSET)
    }

    pub fn set_track_id(&mut self, id: u32) {
        put_header_u32(&mut self.header, TRACK_ID_OFFSET, id);
    }

    pub fn persistent_id(&self) -> u64 {
        header_u64(&self.header, PERSISTENT_ID_OFFSET)
    }

    pub fn set_persistent_id(&mut self, id: u64) {
        put_header_u64(&mut self.header, PERSISTENT_ID_OFFSET, id);
    }

    /// Derive and set the persistent id from a stable identity string,
    /// typically the track's on-device location.
    pub fn assign_persistent_id(&mut self, identity: &str) {
        let digest = md5::compute(identity.as_bytes());
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&digest.0[..8]);
        self.set_persistent_id(u64::from_le_bytes(raw));
    }

    pub fn media_type(&self) -> u32 {
        header_u32(&self.header, MEDIA_TYPE_OFFSET)
    }

    pub fn set_media_type(&mut self, media_type: u32) {
        put_header_u32(&mut self.header, MEDIA_TYPE_OFFSET, media_type);
    }

    /// The first string object of the given type.
    pub fn string(&self, kind: ObjectType) -> Option<&str> {
        self.data_objects
            .iter()
            .filter_map(Child::item)
            .find(|obj| obj.object_type() == kind.as_raw())
            .and_then(DataObject::text)
    }

    /// Set (or append) the string object of the given type.
    ///
    /// Appending keeps existing object order intact; order is semantically
    /// significant and must survive a rewrite.
    pub fn set_string(&mut self, kind: ObjectType, text: &str) {
        debug_assert!(is_string_type(kind.as_raw()));
        for child in &mut self.data_objects {
            if let Child::Item(obj) = child {
                if obj.object_type() == kind.as_raw() {
                    obj.set_text(text);
                    return;
                }
            }
        }
        self.data_objects
            .push(Child::Item(DataObject::new_text(kind, text)));
    }

    pub fn title(&self) -> Option<&str> {
        self.string(ObjectType::Title)
    }

    pub fn set_title(&mut self, title: &str) {
        self.set_string(ObjectType::Title, title);
    }

    pub fn artist(&self) -> Option<&str> {
        self.string(ObjectType::Artist)
    }

    pub fn set_artist(&mut self, artist: &str) {
        self.set_string(ObjectType::Artist, artist);
    }

    pub fn album(&self) -> Option<&str> {
        self.string(ObjectType::Album)
    }

    pub fn set_album(&mut self, album: &str) {
        self.set_string(ObjectType::Album, album);
    }

    pub fn location(&self) -> Option<&str> {
        self.string(ObjectType::Location)
    }

    pub fn set_location(&mut self, location: &str) {
        self.set_string(ObjectType::Location, location);
    }
}

/// The ordered track list ("mhlt") of a tracks section.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackList {
    header: Vec<u8>,
    pub items: Vec<Child<TrackItem>>,
}

impl Default for TrackList {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackList {
    pub fn new() -> TrackList {
        TrackList {
            header: header_template(TRACK_LIST_MAGIC, LIST_HEADER_LEN),
            items: Vec::new(),
        }
    }

    pub(crate) fn from_parts(header: Vec<u8>, items: Vec<Child<TrackItem>>) -> TrackList {
        TrackList { header, items }
    }

    pub(crate) fn header_bytes(&self) -> &[u8] {
        &self.header
    }

    pub fn push(&mut self, track: TrackItem) {
        self.items.push(Child::Item(track));
    }

    pub fn tracks(&self) -> impl Iterator<Item = &TrackItem> {
        self.items.iter().filter_map(Child::item)
    }

    pub fn tracks_mut(&mut self) -> impl Iterator<Item = &mut TrackItem> {
        self.items.iter_mut().filter_map(Child::item_mut)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
