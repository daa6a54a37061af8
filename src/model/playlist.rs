//! Playlist items, membership entries, and the playlist list

use super::{
    header_template, header_u16, header_u32, header_u64, header_u8, put_header_u16,
    put_header_u32, put_header_u64, put_header_u8, timestamp, Child, DataObject, ObjectType,
    LIST_HEADER_LEN,
};
use crate::itdb::tags::{MEMBER_MAGIC, PLAYLIST_LIST_MAGIC, PLAYLIST_MAGIC};

/// Default header length for playlist item chunks.
pub(crate) const PLAYLIST_HEADER_LEN: usize = 0x6C;
/// Default header length for membership entry chunks.
pub(crate) const MEMBER_HEADER_LEN: usize = 0x4C;

const HIDDEN_OFFSET: usize = 0x14;
const TIMESTAMP_OFFSET: usize = 0x18;
const PLAYLIST_ID_OFFSET: usize = 0x1C;
const PODCAST_FLAG_OFFSET: usize = 0x2A;
const SORT_ORDER_OFFSET: usize = 0x2C;
const PLAYLIST_TYPE_OFFSET: usize = 0x30;

const MEMBER_TRACK_ID_OFFSET: usize = 24;
const MEMBER_TIMESTAMP_OFFSET: usize = 28;

/// The master playlist carries type 1 and is hidden from the menu; every
/// user playlist is type 0 and visible.
const PLAYLIST_TYPE_MASTER: u8 = 1;

/// A playlist record: its own data objects plus one membership entry per
/// referenced track, in play order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistItem {
    header: Vec<u8>,
    pub data_objects: Vec<Child<DataObject>>,
    pub members: Vec<Child<MemberEntry>>,
}

impl PlaylistItem {
    /// Create an empty visible playlist.
    pub fn new(name: &str, playlist_id: u64) -> PlaylistItem {
        let mut header = header_template(PLAYLIST_MAGIC, PLAYLIST_HEADER_LEN);
        put_header_u64(&mut header, PLAYLIST_ID_OFFSET, playlist_id);
        put_header_u32(&mut header, TIMESTAMP_OFFSET, timestamp::now());
        let mut playlist = PlaylistItem {
            header,
            data_objects: Vec::new(),
            members: Vec::new(),
        };
        playlist.set_name(name);
        playlist
    }

    /// Create the hidden master playlist that enumerates the whole library.
    ///
    /// Firmware treats the first playlist item as the master/default list,
    /// so this belongs at the front of the playlist list.
    pub fn new_master(name: &str, playlist_id: u64) -> PlaylistItem {
        let mut playlist = PlaylistItem::new(name, playlist_id);
        put_header_u32(&mut playlist.header, HIDDEN_OFFSET, 1);
        put_header_u8(
            &mut playlist.header,
            PLAYLIST_TYPE_OFFSET,
            PLAYLIST_TYPE_MASTER,
        );
        playlist
    }

    pub(crate) fn from_parts(
        header: Vec<u8>,
        data_objects: Vec<Child<DataObject>>,
        members: Vec<Child<MemberEntry>>,
    ) -> PlaylistItem {
        PlaylistItem {
            header,
            data_objects,
            members,
        }
    }

    pub(crate) fn header_bytes(&self) -> &[u8] {
        &self.header
    }

    pub fn playlist_id(&self) -> u64 {
        header_u64(&self.header, PLAYLIST_ID_OFFSET)
    }

    pub fn set_playlist_id(&mut self, id: u64) {
        put_header_u64(&mut self.header, PLAYLIST_ID_OFFSET, id);
    }

    pub fn is_hidden(&self) -> bool {
        header_u32(&self.header, HIDDEN_OFFSET) != 0
    }

    pub fn timestamp(&self) -> u32 {
        header_u32(&self.header, TIMESTAMP_OFFSET)
    }

    pub fn is_master(&self) -> bool {
        header_u8(&self.header, PLAYLIST_TYPE_OFFSET) == PLAYLIST_TYPE_MASTER
    }

    pub fn is_podcast(&self) -> bool {
        header_u16(&self.header, PODCAST_FLAG_OFFSET) != 0
    }

    pub fn set_podcast(&mut self, podcast: bool) {
        put_header_u16(
            &mut self.header,
            PODCAST_FLAG_OFFSET,
            if podcast { 1 } else { 0 },
        );
    }

    pub fn sort_order(&self) -> u32 {
        header_u32(&self.header, SORT_ORDER_OFFSET)
    }

    pub fn set_sort_order(&mut self, order: u32) {
        put_header_u32(&mut self.header, SORT_ORDER_OFFSET, order);
    }

    pub fn name(&self) -> Option<&str> {
        self.data_objects
            .iter()
            .filter_map(Child::item)
            .find(|obj| obj.object_type() == ObjectType::Title.as_raw())
            .and_then(DataObject::text)
    }

    pub fn set_name(&mut self, name: &str) {
        for child in &mut self.data_objects {
            if let Child::Item(obj) = child {
                if obj.object_type() == ObjectType::Title.as_raw() {
                    obj.set_text(name);
                    return;
                }
            }
        }
        self.data_objects
            .push(Child::Item(DataObject::new_text(ObjectType::Title, name)));
    }

    /// Append a membership entry for the given track at the end of the
    /// play order.
    pub fn add_member(&mut self, track_id: u32) {
        let position = self.members.len() as u32 + 1;
        self.members
            .push(Child::Item(MemberEntry::new(track_id, position)));
    }

    /// Track ids of the decodable membership entries, in play order.
    pub fn member_track_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.members
            .iter()
            .filter_map(Child::item)
            .map(MemberEntry::track_id)
    }
}

/// One playlist membership entry ("mhip") referencing a track.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberEntry {
    header: Vec<u8>,
    pub data_objects: Vec<Child<DataObject>>,
}

impl MemberEntry {
    pub fn new(track_id: u32, position: u32) -> MemberEntry {
        let mut header = header_template(MEMBER_MAGIC, MEMBER_HEADER_LEN);
        put_header_u32(&mut header, MEMBER_TRACK_ID_OFFSET, track_id);
        put_header_u32(&mut header, MEMBER_TIMESTAMP_OFFSET, timestamp::now());
        MemberEntry {
            header,
            data_objects: vec![Child::Item(position_object(position))],
        }
    }

    pub(crate) fn from_parts(
        header: Vec<u8>,
        data_objects: Vec<Child<DataObject>>,
    ) -> MemberEntry {
        MemberEntry {
            header,
            data_objects,
        }
    }

    pub(crate) fn header_bytes(&self) -> &[u8] {
        &self.header
    }

    pub fn track_id(&self) -> u32 {
        header_u32(&self.header, MEMBER_TRACK_ID_OFFSET)
    }

    pub fn set_track_id(&mut self, id: u32) {
        put_header_u32(&mut self.header, MEMBER_TRACK_ID_OFFSET, id);
    }

    pub fn timestamp(&self) -> u32 {
        header_u32(&self.header, MEMBER_TIMESTAMP_OFFSET)
    }
}

/// Play-order object attached to each membership entry: the 1-based
/// position followed by four reserved words.
fn position_object(position: u32) -> DataObject {
    let mut body = Vec::with_capacity(20);
    body.extend_from_slice(&position.to_le_bytes());
    body.extend_from_slice(&[0u8; 16]);
    DataObject::new_binary(ObjectType::PlaylistOrder.as_raw(), body)
}

/// The ordered playlist list ("mhlp") of a playlist, podcast, or smart
/// playlist section.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistList {
    header: Vec<u8>,
    pub items: Vec<Child<PlaylistItem>>,
}

impl Default for PlaylistList {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaylistList {
    pub fn new() -> PlaylistList {
        PlaylistList {
            header: header_template(PLAYLIST_LIST_MAGIC, LIST_HEADER_LEN),
            items: Vec::new(),
        }
    }

    pub(crate) fn from_parts(header: Vec<u8>, items: Vec<Child<PlaylistItem>>) -> PlaylistList {
        PlaylistList { header, items }
    }

    pub(crate) fn header_bytes(&self) -> &[u8] {
        &self.header
    }

    pub fn push(&mut self, playlist: PlaylistItem) {
        self.items.push(Child::Item(playlist));
    }

    pub fn playlists(&self) -> impl Iterator<Item = &PlaylistItem> {
        self.items.iter().filter_map(Child::item)
    }

    pub fn playlists_mut(&mut self) -> impl Iterator<Item = &mut PlaylistItem> {
        self.items.iter_mut().filter_map(Child::item_mut)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
