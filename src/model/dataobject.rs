//! Data objects: typed metadata units attached to items

use super::{header_template, header_u32, put_header_u32};
use crate::itdb::strings::{self, ENCODING_UTF16};

/// Default header length for data object chunks.
pub(crate) const OBJECT_HEADER_LEN: usize = 0x18;

const OBJECT_TYPE_OFFSET: usize = 12;

/// Well-known data object types.
///
/// The on-disk field is open-ended; values outside this set are carried
/// through as opaque payloads rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ObjectType {
    Title = 1,
    Location = 2,
    Album = 3,
    Artist = 4,
    Genre = 5,
    FileType = 6,
    EqSetting = 7,
    Comment = 8,
    Category = 9,
    Composer = 12,
    Grouping = 13,
    Description = 14,
    PodcastEnclosureUrl = 15,
    PodcastRssUrl = 16,
    ChapterData = 17,
    Subtitle = 18,
    Show = 19,
    Episode = 20,
    Network = 21,
    AlbumArtist = 22,
    SortArtist = 23,
    Keywords = 24,
    SortTitle = 27,
    SortAlbum = 28,
    SortAlbumArtist = 29,
    SortComposer = 30,
    SortShow = 31,
    SmartPlaylistPref = 50,
    SmartPlaylistRules = 51,
    LibraryPlaylistIndex = 52,
    PlaylistOrder = 100,
}

impl ObjectType {
    pub fn from_raw(raw: u32) -> Option<ObjectType> {
        use ObjectType::*;
        Some(match raw {
            1 => Title,
            2 => Location,
            3 => Album,
            4 => Artist,
            5 => Genre,
            6 => FileType,
            7 => EqSetting,
            8 => Comment,
            9 => Category,
            12 => Composer,
            13 => Grouping,
            14 => Description,
            15 => PodcastEnclosureUrl,
            16 => PodcastRssUrl,
            17 => ChapterData,
            18 => Subtitle,
            19 => Show,
            20 => Episode,
            21 => Network,
            22 => AlbumArtist,
            23 => SortArtist,
            24 => Keywords,
            27 => SortTitle,
            28 => SortAlbum,
            29 => SortAlbumArtist,
            30 => SortComposer,
            31 => SortShow,
            50 => SmartPlaylistPref,
            51 => SmartPlaylistRules,
            52 => LibraryPlaylistIndex,
            100 => PlaylistOrder,
            _ => return None,
        })
    }

    pub fn as_raw(self) -> u32 {
        self as u32
    }
}

/// True when the type's payload is the string sub-record.
///
/// Podcast URL types (15, 16) store plain UTF-8 with no sub-header and
/// chapter data (17) is binary, so all three stay opaque along with the
/// smart playlist blobs and everything unrecognized.
pub fn is_string_type(raw: u32) -> bool {
    matches!(raw, 1..=14 | 18..=31)
}

/// A decoded string sub-record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringValue {
    /// Encoding code: 2 selects UTF-8, anything else UTF-16LE.
    pub encoding: u32,
    pub text: String,
    /// The two reserved words of the sub-header, carried through as read.
    pub reserved: [u32; 2],
    /// True when the payload was not valid under the declared encoding and
    /// replacement characters were substituted.
    pub degraded: bool,
    /// Original body bytes, kept whenever the decode was imperfect so the
    /// writer can re-emit them verbatim.
    pub(crate) raw_body: Option<Vec<u8>>,
    /// Slack bytes between the payload end and the chunk end.
    pub(crate) trailing: Vec<u8>,
}

impl StringValue {
    pub fn new(text: &str) -> StringValue {
        StringValue {
            encoding: ENCODING_UTF16,
            text: text.to_string(),
            reserved: [0, 0],
            degraded: false,
            raw_body: None,
            trailing: Vec::new(),
        }
    }

    /// The payload byte length this value will occupy when encoded.
    pub fn payload_len(&self) -> usize {
        strings::encode_payload(self.encoding, &self.text).len()
    }
}

/// Payload of a data object chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectPayload {
    /// A string sub-record.
    Text(StringValue),
    /// Opaque body bytes after the header, emitted verbatim.
    Binary(Vec<u8>),
}

/// A typed metadata unit ("mhod") attached to a track, playlist, album, or
/// playlist membership entry.
#[derive(Debug, Clone, PartialEq)]
pub struct DataObject {
    header: Vec<u8>,
    pub payload: ObjectPayload,
}

impl DataObject {
    /// Create a string object of the given type, encoded as UTF-16LE.
    pub fn new_text(kind: ObjectType, text: &str) -> DataObject {
        let mut header = header_template(crate::itdb::tags::OBJECT_MAGIC, OBJECT_HEADER_LEN);
        put_header_u32(&mut header, OBJECT_TYPE_OFFSET, kind.as_raw());
        DataObject {
            header,
            payload: ObjectPayload::Text(StringValue::new(text)),
        }
    }

    /// Create a binary object with an opaque body.
    pub fn new_binary(object_type: u32, body: Vec<u8>) -> DataObject {
        let mut header = header_template(crate::itdb::tags::OBJECT_MAGIC, OBJECT_HEADER_LEN);
        put_header_u32(&mut header, OBJECT_TYPE_OFFSET, object_type);
        DataObject {
            header,
            payload: ObjectPayload::Binary(body),
        }
    }

    pub(crate) fn from_parts(header: Vec<u8>, payload: ObjectPayload) -> DataObject {
        DataObject { header, payload }
    }

    pub(crate) fn header_bytes(&self) -> &[u8] {
        &self.header
    }

    /// The raw object type discriminant.
    pub fn object_type(&self) -> u32 {
        header_u32(&self.header, OBJECT_TYPE_OFFSET)
    }

    /// The object type, when it is one the codec knows by name.
    pub fn object_kind(&self) -> Option<ObjectType> {
        ObjectType::from_raw(self.object_type())
    }

    /// Decoded text, for string objects.
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            ObjectPayload::Text(value) => Some(&value.text),
            ObjectPayload::Binary(_) => None,
        }
    }

    /// Replace the text of a string object, dropping any degraded bytes.
    ///
    /// The existing encoding code is kept; a binary payload becomes a fresh
    /// UTF-16LE string record.
    pub fn set_text(&mut self, text: &str) {
        match &mut self.payload {
            ObjectPayload::Text(value) => {
                value.text = text.to_string();
                value.degraded = false;
                value.raw_body = None;
                value.trailing.clear();
            }
            ObjectPayload::Binary(_) => {
                self.payload = ObjectPayload::Text(StringValue::new(text));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_type_classification() {
        assert!(is_string_type(ObjectType::Title.as_raw()));
        assert!(is_string_type(ObjectType::SortShow.as_raw()));
        assert!(is_string_type(ObjectType::Description.as_raw()));

        assert!(!is_string_type(ObjectType::PodcastEnclosureUrl.as_raw()));
        assert!(!is_string_type(ObjectType::ChapterData.as_raw()));
        assert!(!is_string_type(ObjectType::SmartPlaylistRules.as_raw()));
        assert!(!is_string_type(ObjectType::PlaylistOrder.as_raw()));
        assert!(!is_string_type(0));
        assert!(!is_string_type(9999));
    }

    #[test]
    fn test_new_text_object() {
        let obj = DataObject::new_text(ObjectType::Title, "Test Song");
        assert_eq!(obj.object_type(), 1);
        assert_eq!(obj.object_kind(), Some(ObjectType::Title));
        assert_eq!(obj.text(), Some("Test Song"));
        assert_eq!(obj.header_bytes().len(), OBJECT_HEADER_LEN);
        assert_eq!(&obj.header_bytes()[0..4], b"mhod");
    }

    #[test]
    fn test_set_text_clears_degraded_state() {
        let mut obj = DataObject::new_text(ObjectType::Artist, "Old");
        if let ObjectPayload::Text(value) = &mut obj.payload {
            value.degraded = true;
            value.raw_body = Some(vec![1, 2, 3]);
        }
        obj.set_text("New Artist");
        match &obj.payload {
            ObjectPayload::Text(value) => {
                assert_eq!(value.text, "New Artist");
                assert!(!value.degraded);
                assert!(value.raw_body.is_none());
            }
            ObjectPayload::Binary(_) => panic!("expected text payload"),
        }
    }

    #[test]
    fn test_unknown_type_is_preserved_not_rejected() {
        let obj = DataObject::new_binary(0x7777, vec![0xde, 0xad]);
        assert_eq!(obj.object_type(), 0x7777);
        assert_eq!(obj.object_kind(), None);
        assert_eq!(obj.text(), None);
    }
}
