//! Album items and the album list

use super::{header_template, Child, DataObject, ObjectType, LIST_HEADER_LEN};
use crate::itdb::tags::{ALBUM_LIST_MAGIC, ALBUM_MAGIC};

/// Default header length for album item chunks.
pub(crate) const ALBUM_HEADER_LEN: usize = 0x58;

/// One album record. Albums are mostly string objects (title and artist);
/// the numeric header fields are device bookkeeping and ride along as read.
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumItem {
    header: Vec<u8>,
    pub data_objects: Vec<Child<DataObject>>,
}

impl AlbumItem {
    pub fn new(title: &str, artist: &str) -> AlbumItem {
        let mut album = AlbumItem {
            header: header_template(ALBUM_MAGIC, ALBUM_HEADER_LEN),
            data_objects: Vec::new(),
        };
        album
            .data_objects
            .push(Child::Item(DataObject::new_text(ObjectType::Title, title)));
        album.data_objects.push(Child::Item(DataObject::new_text(
            ObjectType::AlbumArtist,
            artist,
        )));
        album
    }

    pub(crate) fn from_parts(header: Vec<u8>, data_objects: Vec<Child<DataObject>>) -> AlbumItem {
        AlbumItem {
            header,
            data_objects,
        }
    }

    pub(crate) fn header_bytes(&self) -> &[u8] {
        &self.header
    }

    fn string(&self, kind: ObjectType) -> Option<&str> {
        self.data_objects
            .iter()
            .filter_map(Child::item)
            .find(|obj| obj.object_type() == kind.as_raw())
            .and_then(DataObject::text)
    }

    pub fn title(&self) -> Option<&str> {
        self.string(ObjectType::Title)
    }

    pub fn artist(&self) -> Option<&str> {
        self.string(ObjectType::AlbumArtist)
    }
}

/// The ordered album list ("mhla") of an albums section.
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumList {
    header: Vec<u8>,
    pub items: Vec<Child<AlbumItem>>,
}

impl Default for AlbumList {
    fn default() -> Self {
        Self::new()
    }
}

impl AlbumList {
    pub fn new() -> AlbumList {
        AlbumList {
            header: header_template(ALBUM_LIST_MAGIC, LIST_HEADER_LEN),
            items: Vec::new(),
        }
    }

    pub(crate) fn from_parts(header: Vec<u8>, items: Vec<Child<AlbumItem>>) -> AlbumList {
        AlbumList { header, items }
    }

    pub(crate) fn header_bytes(&self) -> &[u8] {
        &self.header
    }

    pub fn push(&mut self, album: AlbumItem) {
        self.items.push(Child::Item(album));
    }

    pub fn albums(&self) -> impl Iterator<Item = &AlbumItem> {
        self.items.iter().filter_map(Child::item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
