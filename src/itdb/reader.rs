//! Recursive-descent decoder
//!
//! Turns a database buffer into a model tree. The walk is keyed on each
//! chunk's magic tag and obeys the length/count discrimination rule from
//! [`ChunkTag::is_list`]: sized chunks advance the parse position by their
//! declared total length, list chunks by the sum of their decoded children.
//!
//! Fatal errors abort with the offset and chunk path; everything
//! recoverable (unknown chunks with usable lengths, undecodable data
//! objects, length mismatches) is preserved as raw bytes and surfaced in
//! the warnings list so the tree still re-encodes byte-for-byte.

use super::cursor::Cursor;
use super::error::{DecodeError, DecodeWarning, OutOfRange};
use super::strings::{self, STRING_SUBHEADER_LEN};
use super::tags::{
    magic_label, ChunkPath, ChunkTag, SectionKind, ALBUM_MAGIC, DATABASE_MAGIC, MEMBER_MAGIC,
    OBJECT_MAGIC, PLAYLIST_MAGIC, SECTION_MAGIC, TRACK_MAGIC,
};
use crate::model::{
    header_u32, AlbumItem, AlbumList, Child, DataObject, Database, MemberEntry, ObjectPayload,
    PlaylistItem, PlaylistList, RawChunk, Section, SectionBody, StringValue, TrackItem, TrackList,
};

/// Smallest header that can hold the common chunk envelope.
const MIN_HEADER_LEN: usize = 12;

/// A successfully decoded database plus any non-fatal observations.
#[derive(Debug)]
pub struct DecodeOutput {
    pub database: Database,
    pub warnings: Vec<DecodeWarning>,
}

/// Decode a complete database buffer into a model tree.
pub fn decode(buf: &[u8]) -> Result<DecodeOutput, DecodeError> {
    let mut reader = Reader {
        cur: Cursor::new(buf),
        warnings: Vec::new(),
        path: ChunkPath::root(),
    };
    let database = reader.read_database()?;
    Ok(DecodeOutput {
        database,
        warnings: reader.warnings,
    })
}

struct Reader<'a> {
    cur: Cursor<'a>,
    warnings: Vec<DecodeWarning>,
    path: ChunkPath,
}

impl<'a> Reader<'a> {
    fn oob(&self, source: OutOfRange) -> DecodeError {
        DecodeError::OutOfRange {
            path: self.path.clone(),
            source,
        }
    }

    fn u32_at(&self, offset: usize) -> Result<u32, DecodeError> {
        self.cur.read_u32_at(offset).map_err(|e| self.oob(e))
    }

    fn magic_at(&self, offset: usize) -> Result<[u8; 4], DecodeError> {
        self.cur.read_magic_at(offset).map_err(|e| self.oob(e))
    }

    fn warn(&mut self, warning: DecodeWarning) {
        self.warnings.push(warning);
    }

    /// Read a chunk's full header bytes as declared by its header length.
    fn read_header(&self, offset: usize) -> Result<Vec<u8>, DecodeError> {
        let header_len = self.u32_at(offset + 4)? as usize;
        if header_len < MIN_HEADER_LEN {
            return Err(self.oob(OutOfRange {
                offset,
                len: MIN_HEADER_LEN,
                buffer_len: header_len,
            }));
        }
        let bytes = self
            .cur
            .read_bytes_at(offset, header_len)
            .map_err(|e| self.oob(e))?;
        Ok(bytes.to_vec())
    }

    /// Validate a sized chunk's declared total length against its header
    /// and enclosing extent. Overrunning the buffer is fatal; overrunning
    /// only the parent's extent is recorded and the declared length wins.
    fn sized_extent(
        &mut self,
        offset: usize,
        header_len: usize,
        end: usize,
    ) -> Result<usize, DecodeError> {
        let total = self.u32_at(offset + 8)? as usize;
        if total < header_len {
            return Err(self.oob(OutOfRange {
                offset,
                len: header_len,
                buffer_len: total,
            }));
        }
        if offset + total > self.cur.len() {
            return Err(self.oob(OutOfRange {
                offset,
                len: total,
                buffer_len: self.cur.len(),
            }));
        }
        if offset + total > end {
            self.warn(DecodeWarning::LengthInconsistency {
                path: self.path.clone(),
                declared: total as u32,
                computed: (end - offset) as u32,
            });
        }
        Ok(total)
    }

    fn read_database(&mut self) -> Result<Database, DecodeError> {
        let magic = self.magic_at(0)?;
        if magic != DATABASE_MAGIC {
            return Err(DecodeError::BadMagic {
                expected: "mhbd",
                found: magic_label(magic),
                offset: 0,
                path: self.path.clone(),
            });
        }

        self.path.push(DATABASE_MAGIC, 0);
        let header = self.read_header(0)?;
        let total = self.sized_extent(0, header.len(), self.cur.len())?;
        if total != self.cur.len() {
            self.warn(DecodeWarning::LengthInconsistency {
                path: self.path.clone(),
                declared: total as u32,
                computed: self.cur.len() as u32,
            });
        }

        let section_count = header_u32(&header, 20);
        let end = total.min(self.cur.len());
        // Capacity hints are clamped: counts are untrusted input.
        let mut sections = Vec::with_capacity((section_count as usize).min(64));
        let mut offset = header.len();
        for index in 0..section_count as usize {
            let (child, consumed) = self.read_section(offset, end, index)?;
            sections.push(child);
            offset += consumed;
        }
        if offset != total {
            self.warn(DecodeWarning::LengthInconsistency {
                path: self.path.clone(),
                declared: total as u32,
                computed: offset as u32,
            });
        }

        self.path.pop();
        Ok(Database::from_parts(header, sections))
    }

    fn read_section(
        &mut self,
        offset: usize,
        end: usize,
        index: usize,
    ) -> Result<(Child<Section>, usize), DecodeError> {
        let magic = self.magic_at(offset)?;
        if magic != SECTION_MAGIC {
            return self.read_raw_fallback(offset, end, index, "mhsd");
        }

        self.path.push(SECTION_MAGIC, index);
        let header = self.read_header(offset)?;
        let total = self.sized_extent(offset, header.len(), end)?;

        let body_start = offset + header.len();
        let body_end = offset + total;
        let kind = SectionKind::from_raw(header_u32(&header, 12));

        let body = match kind {
            Some(kind) if body_start + 4 <= body_end => {
                let list_magic = self.magic_at(body_start)?;
                if list_magic == kind.list_magic() {
                    let (body, consumed) = self.read_section_list(kind, body_start, body_end)?;
                    if header.len() + consumed != total {
                        self.warn(DecodeWarning::LengthInconsistency {
                            path: self.path.clone(),
                            declared: total as u32,
                            computed: (header.len() + consumed) as u32,
                        });
                    }
                    body
                } else {
                    self.preserve_section_body(body_start, body_end, "unexpected list magic")?
                }
            }
            Some(_) => self.preserve_section_body(body_start, body_end, "section body truncated")?,
            None => self.preserve_section_body(body_start, body_end, "unmodeled section type")?,
        };

        self.path.pop();
        Ok((Child::Item(Section::from_parts(header, body)), total))
    }

    fn preserve_section_body(
        &mut self,
        start: usize,
        end: usize,
        reason: &str,
    ) -> Result<SectionBody, DecodeError> {
        let bytes = self
            .cur
            .read_bytes_at(start, end.saturating_sub(start))
            .map_err(|e| self.oob(e))?
            .to_vec();
        let magic = bytes
            .get(0..4)
            .map(|b| magic_label([b[0], b[1], b[2], b[3]]))
            .unwrap_or_else(|| "(empty)".to_string());
        self.warn(DecodeWarning::RawChunkPreserved {
            path: self.path.clone(),
            magic,
            len: bytes.len(),
            reason: reason.to_string(),
        });
        Ok(SectionBody::Raw(bytes))
    }

    fn read_section_list(
        &mut self,
        kind: SectionKind,
        start: usize,
        end: usize,
    ) -> Result<(SectionBody, usize), DecodeError> {
        match kind {
            SectionKind::Tracks => {
                let (list, consumed) = self.read_track_list(start, end)?;
                Ok((SectionBody::Tracks(list), consumed))
            }
            SectionKind::Playlists | SectionKind::Podcasts | SectionKind::SmartPlaylists => {
                let (list, consumed) = self.read_playlist_list(start, end)?;
                Ok((SectionBody::Playlists(list), consumed))
            }
            SectionKind::Albums => {
                let (list, consumed) = self.read_album_list(start, end)?;
                Ok((SectionBody::Albums(list), consumed))
            }
        }
    }

    /// Shared list walk: read the count-bearing header, then `count`
    /// children, advancing by each child's consumed extent.
    fn read_list<T>(
        &mut self,
        start: usize,
        end: usize,
        child_magic: [u8; 4],
        child_name: &'static str,
        read_child: fn(&mut Self, usize, usize, usize) -> Result<(T, usize), DecodeError>,
    ) -> Result<(Vec<u8>, Vec<Child<T>>, usize), DecodeError> {
        let list_magic = self.magic_at(start)?;
        self.path.push(list_magic, 0);
        let header = self.read_header(start)?;
        let count = header_u32(&header, 8) as usize;

        let mut children = Vec::with_capacity(count.min(1024));
        let mut offset = start + header.len();
        for index in 0..count {
            let magic = self.magic_at(offset)?;
            if magic == child_magic {
                let (item, consumed) = read_child(self, offset, end, index)?;
                children.push(Child::Item(item));
                offset += consumed;
            } else {
                let (child, consumed) = self.read_raw_fallback(offset, end, index, child_name)?;
                children.push(child);
                offset += consumed;
            }
        }

        self.path.pop();
        Ok((header, children, offset - start))
    }

    fn read_track_list(
        &mut self,
        start: usize,
        end: usize,
    ) -> Result<(TrackList, usize), DecodeError> {
        let (header, items, consumed) =
            self.read_list(start, end, TRACK_MAGIC, "mhit", Self::read_track)?;
        Ok((TrackList::from_parts(header, items), consumed))
    }

    fn read_playlist_list(
        &mut self,
        start: usize,
        end: usize,
    ) -> Result<(PlaylistList, usize), DecodeError> {
        let (header, items, consumed) =
            self.read_list(start, end, PLAYLIST_MAGIC, "mhyp", Self::read_playlist)?;
        Ok((PlaylistList::from_parts(header, items), consumed))
    }

    fn read_album_list(
        &mut self,
        start: usize,
        end: usize,
    ) -> Result<(AlbumList, usize), DecodeError> {
        let (header, items, consumed) =
            self.read_list(start, end, ALBUM_MAGIC, "mhia", Self::read_album)?;
        Ok((AlbumList::from_parts(header, items), consumed))
    }

    fn read_track(
        &mut self,
        offset: usize,
        end: usize,
        index: usize,
    ) -> Result<(TrackItem, usize), DecodeError> {
        self.path.push(TRACK_MAGIC, index);
        let header = self.read_header(offset)?;
        let total = self.sized_extent(offset, header.len(), end)?;
        let count = header_u32(&header, 12) as usize;

        let (objects, consumed) =
            self.read_data_objects(offset + header.len(), offset + total, count)?;
        self.check_children_span(header.len(), consumed, total);

        self.path.pop();
        Ok((TrackItem::from_parts(header, objects), total))
    }

    fn read_playlist(
        &mut self,
        offset: usize,
        end: usize,
        index: usize,
    ) -> Result<(PlaylistItem, usize), DecodeError> {
        self.path.push(PLAYLIST_MAGIC, index);
        let header = self.read_header(offset)?;
        let total = self.sized_extent(offset, header.len(), end)?;
        let object_count = header_u32(&header, 0x0C) as usize;
        let member_count = header_u32(&header, 0x10) as usize;

        let chunk_end = offset + total;
        let (objects, consumed) =
            self.read_data_objects(offset + header.len(), chunk_end, object_count)?;

        let mut members = Vec::with_capacity(member_count.min(1024));
        let mut member_offset = offset + header.len() + consumed;
        for member_index in 0..member_count {
            let magic = self.magic_at(member_offset)?;
            if magic == MEMBER_MAGIC {
                let (member, member_consumed) =
                    self.read_member(member_offset, chunk_end, member_index)?;
                members.push(Child::Item(member));
                member_offset += member_consumed;
            } else {
                let (child, member_consumed) =
                    self.read_raw_fallback(member_offset, chunk_end, member_index, "mhip")?;
                members.push(child);
                member_offset += member_consumed;
            }
        }
        self.check_children_span(0, member_offset - offset, total);

        self.path.pop();
        Ok((PlaylistItem::from_parts(header, objects, members), total))
    }

    fn read_member(
        &mut self,
        offset: usize,
        end: usize,
        index: usize,
    ) -> Result<(MemberEntry, usize), DecodeError> {
        self.path.push(MEMBER_MAGIC, index);
        let header = self.read_header(offset)?;
        let total = self.sized_extent(offset, header.len(), end)?;
        let count = header_u32(&header, 12) as usize;

        let (objects, consumed) =
            self.read_data_objects(offset + header.len(), offset + total, count)?;
        self.check_children_span(header.len(), consumed, total);

        self.path.pop();
        Ok((MemberEntry::from_parts(header, objects), total))
    }

    fn read_album(
        &mut self,
        offset: usize,
        end: usize,
        index: usize,
    ) -> Result<(AlbumItem, usize), DecodeError> {
        self.path.push(ALBUM_MAGIC, index);
        let header = self.read_header(offset)?;
        let total = self.sized_extent(offset, header.len(), end)?;
        let count = header_u32(&header, 12) as usize;

        let (objects, consumed) =
            self.read_data_objects(offset + header.len(), offset + total, count)?;
        self.check_children_span(header.len(), consumed, total);

        self.path.pop();
        Ok((AlbumItem::from_parts(header, objects), total))
    }

    fn check_children_span(&mut self, header_len: usize, consumed: usize, total: usize) {
        if header_len + consumed != total {
            self.warn(DecodeWarning::LengthInconsistency {
                path: self.path.clone(),
                declared: total as u32,
                computed: (header_len + consumed) as u32,
            });
        }
    }

    fn read_data_objects(
        &mut self,
        start: usize,
        end: usize,
        count: usize,
    ) -> Result<(Vec<Child<DataObject>>, usize), DecodeError> {
        let mut objects = Vec::with_capacity(count.min(256));
        let mut offset = start;
        for index in 0..count {
            let magic = self.magic_at(offset)?;
            if magic == OBJECT_MAGIC {
                let (child, consumed) = self.read_data_object(offset, end, index)?;
                objects.push(child);
                offset += consumed;
            } else {
                let (child, consumed) = self.read_raw_fallback(offset, end, index, "mhod")?;
                objects.push(child);
                offset += consumed;
            }
        }
        Ok((objects, offset - start))
    }

    fn read_data_object(
        &mut self,
        offset: usize,
        end: usize,
        index: usize,
    ) -> Result<(Child<DataObject>, usize), DecodeError> {
        self.path.push(OBJECT_MAGIC, index);
        let header = self.read_header(offset)?;
        let total = self.sized_extent(offset, header.len(), end)?;
        let object_type = header_u32(&header, 12);

        let body = self
            .cur
            .read_bytes_at(offset + header.len(), total - header.len())
            .map_err(|e| self.oob(e))?;

        let child = if crate::model::is_string_type(object_type) {
            match self.decode_string_body(object_type, body) {
                Some(value) => Child::Item(DataObject::from_parts(
                    header,
                    ObjectPayload::Text(value),
                )),
                None => {
                    // Keep the whole object opaque; the surrounding
                    // structure still parses and re-encodes exactly.
                    let bytes = self
                        .cur
                        .read_bytes_at(offset, total)
                        .map_err(|e| self.oob(e))?
                        .to_vec();
                    self.warn(DecodeWarning::RawChunkPreserved {
                        path: self.path.clone(),
                        magic: "mhod".to_string(),
                        len: bytes.len(),
                        reason: format!("string sub-record of type {object_type} is malformed"),
                    });
                    Child::Raw(RawChunk::new(bytes))
                }
            }
        } else {
            Child::Item(DataObject::from_parts(
                header,
                ObjectPayload::Binary(body.to_vec()),
            ))
        };

        self.path.pop();
        Ok((child, total))
    }

    /// Decode the string sub-record of a data object body. `None` means the
    /// record is structurally unusable and the object should stay raw.
    fn decode_string_body(&mut self, object_type: u32, body: &[u8]) -> Option<StringValue> {
        if body.len() < STRING_SUBHEADER_LEN {
            return None;
        }
        let encoding = header_u32(body, 0);
        let payload_len = header_u32(body, 4) as usize;
        let reserved = [header_u32(body, 8), header_u32(body, 12)];
        if STRING_SUBHEADER_LEN + payload_len > body.len() {
            return None;
        }

        let payload = &body[STRING_SUBHEADER_LEN..STRING_SUBHEADER_LEN + payload_len];
        let trailing = &body[STRING_SUBHEADER_LEN + payload_len..];
        let (text, degraded) = strings::decode_payload(encoding, payload);
        if degraded {
            self.warn(DecodeWarning::StringDecodeDegraded {
                path: self.path.clone(),
                object_type,
                encoding: strings::encoding_name(encoding),
            });
        }
        Some(StringValue {
            encoding,
            text,
            reserved,
            degraded,
            raw_body: degraded.then(|| body.to_vec()),
            trailing: if degraded {
                Vec::new()
            } else {
                trailing.to_vec()
            },
        })
    }

    /// Fallback for a child whose magic is not the expected one.
    ///
    /// Known sized chunks in the wrong position and unknown chunks with a
    /// plausible self-declared total length are preserved raw; a known
    /// list tag out of place is a fatal bad magic, and an unknown chunk
    /// without a usable length is fatal since skipping it would be a guess.
    fn read_raw_fallback<T>(
        &mut self,
        offset: usize,
        end: usize,
        index: usize,
        expected: &'static str,
    ) -> Result<(Child<T>, usize), DecodeError> {
        let magic = self.magic_at(offset)?;
        let known_list = matches!(ChunkTag::from_magic(magic), Some(tag) if tag.is_list());
        if known_list {
            return Err(DecodeError::BadMagic {
                expected,
                found: magic_label(magic),
                offset,
                path: self.path.clone(),
            });
        }

        let header_len = self.u32_at(offset + 4)? as usize;
        let total = self.u32_at(offset + 8)? as usize;
        let plausible =
            header_len >= MIN_HEADER_LEN && total >= header_len && offset + total <= end;
        if !plausible {
            return Err(DecodeError::UnknownUnsizedChunk {
                found: magic_label(magic),
                offset,
                path: self.path.clone(),
            });
        }

        self.path.push(magic, index);
        let bytes = self
            .cur
            .read_bytes_at(offset, total)
            .map_err(|e| self.oob(e))?
            .to_vec();
        self.warn(DecodeWarning::RawChunkPreserved {
            path: self.path.clone(),
            magic: magic_label(magic),
            len: bytes.len(),
            reason: format!("expected {expected}"),
        });
        self.path.pop();
        Ok((Child::Raw(RawChunk::new(bytes)), total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_u32(buf: &mut [u8], offset: usize, v: u32) {
        buf[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
    }

    /// A header with magic, header length, and the word at offset 8.
    fn header(magic: &[u8; 4], header_len: u32, word8: u32) -> Vec<u8> {
        let mut h = vec![0u8; header_len as usize];
        h[0..4].copy_from_slice(magic);
        put_u32(&mut h, 4, header_len);
        put_u32(&mut h, 8, word8);
        h
    }

    /// A string data object with a 24-byte header.
    fn string_object(object_type: u32, encoding: u32, payload: &[u8]) -> Vec<u8> {
        let total = 24 + 16 + payload.len();
        let mut chunk = header(b"mhod", 24, total as u32);
        put_u32(&mut chunk, 12, object_type);
        chunk.resize(24, 0);
        let mut sub = vec![0u8; 16];
        put_u32(&mut sub, 0, encoding);
        put_u32(&mut sub, 4, payload.len() as u32);
        chunk.extend_from_slice(&sub);
        chunk.extend_from_slice(payload);
        chunk
    }

    fn utf16(text: &str) -> Vec<u8> {
        strings::encode_utf16le(text)
    }

    /// Minimal database: one tracks section, one track, one title object.
    fn minimal_database() -> Vec<u8> {
        let title = string_object(1, 1, &utf16("Test Song"));

        let mut track = header(b"mhit", 24, (24 + title.len()) as u32);
        put_u32(&mut track, 12, 1); // data object count
        put_u32(&mut track, 16, 77); // track id
        track.extend_from_slice(&title);

        let mut list = header(b"mhlt", 12, 1);
        list.extend_from_slice(&track);

        let mut section = header(b"mhsd", 16, (16 + list.len()) as u32);
        put_u32(&mut section, 12, 1); // tracks
        section.extend_from_slice(&list);

        let mut db = header(b"mhbd", 48, (48 + section.len()) as u32);
        put_u32(&mut db, 16, 0x10); // format version, below the hash gate
        put_u32(&mut db, 20, 1); // section count
        db.extend_from_slice(&section);
        db
    }

    #[test]
    fn test_decode_minimal_database() {
        let buf = minimal_database();
        let out = decode(&buf).unwrap();
        assert!(out.warnings.is_empty(), "warnings: {:?}", out.warnings);

        let db = out.database;
        assert_eq!(db.format_version(), 0x10);
        assert_eq!(db.section_count(), 1);
        let track = db.tracks().next().unwrap();
        assert_eq!(track.track_id(), 77);
        assert_eq!(track.title(), Some("Test Song"));
    }

    #[test]
    fn test_root_bad_magic_is_fatal() {
        let mut buf = minimal_database();
        buf[0..4].copy_from_slice(b"zzzz");
        match decode(&buf) {
            Err(DecodeError::BadMagic {
                expected, found, ..
            }) => {
                assert_eq!(expected, "mhbd");
                assert_eq!(found, "zzzz");
            }
            other => panic!("expected BadMagic, got {other:?}"),
        }
    }

    #[test]
    fn test_truncated_buffer_is_fatal() {
        let buf = minimal_database();
        let truncated = &buf[..buf.len() - 10];
        assert!(matches!(
            decode(truncated),
            Err(DecodeError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_unknown_sized_chunk_is_preserved() {
        // Replace the section's magic with an unknown tag; its declared
        // total length still covers the same extent.
        let mut buf = minimal_database();
        buf[48..52].copy_from_slice(b"mhzz");
        let out = decode(&buf).unwrap();

        assert_eq!(out.database.section_count(), 1);
        let raw = match &out.database.sections[0] {
            Child::Raw(raw) => raw,
            other => panic!("expected raw child, got {other:?}"),
        };
        assert_eq!(raw.magic(), Some(*b"mhzz"));
        assert_eq!(raw.bytes, buf[48..].to_vec());
        assert!(out
            .warnings
            .iter()
            .any(|w| matches!(w, DecodeWarning::RawChunkPreserved { .. })));
    }

    #[test]
    fn test_unknown_unsized_chunk_is_fatal() {
        // Zero the unknown chunk's total length: no safe way to skip it.
        let mut buf = minimal_database();
        buf[48..52].copy_from_slice(b"mhzz");
        put_u32(&mut buf, 48 + 8, 0);
        match decode(&buf) {
            Err(DecodeError::UnknownUnsizedChunk { found, offset, .. }) => {
                assert_eq!(found, "mhzz");
                assert_eq!(offset, 48);
            }
            other => panic!("expected UnknownUnsizedChunk, got {other:?}"),
        }
    }

    #[test]
    fn test_list_tag_out_of_place_is_fatal() {
        // A list chunk where a section belongs has no total length, so it
        // cannot be demoted to raw bytes.
        let mut buf = minimal_database();
        buf[48..52].copy_from_slice(b"mhlt");
        assert!(matches!(decode(&buf), Err(DecodeError::BadMagic { .. })));
    }

    #[test]
    fn test_overlong_string_payload_demotes_object() {
        let mut buf = minimal_database();
        // The title object's declared payload length now overruns its
        // chunk; offsets: section at 48 (+16), list (+12), track (+24).
        let object_offset = 48 + 16 + 12 + 24;
        put_u32(&mut buf, object_offset + 24 + 4, 9999);

        let out = decode(&buf).unwrap();
        let track = out.database.tracks().next().unwrap();
        assert_eq!(track.title(), None);
        assert_eq!(track.data_objects.len(), 1);
        assert!(track.data_objects[0].is_raw());
        assert!(out.warnings.iter().any(
            |w| matches!(w, DecodeWarning::RawChunkPreserved { reason, .. } if reason.contains("malformed"))
        ));
    }

    #[test]
    fn test_degraded_string_keeps_text_and_warns() {
        // Odd payload length cannot be valid UTF-16LE.
        let mut title = string_object(1, 1, &[0x54, 0x00, 0x65]);
        let title_len = title.len() as u32;

        let mut track = header(b"mhit", 24, 24 + title_len);
        put_u32(&mut track, 12, 1);
        track.append(&mut title);

        let mut list = header(b"mhlt", 12, 1);
        list.extend_from_slice(&track);
        let mut section = header(b"mhsd", 16, (16 + list.len()) as u32);
        put_u32(&mut section, 12, 1);
        section.extend_from_slice(&list);
        let mut db = header(b"mhbd", 48, (48 + section.len()) as u32);
        put_u32(&mut db, 20, 1);
        db.extend_from_slice(&section);

        let out = decode(&db).unwrap();
        let track = out.database.tracks().next().unwrap();
        assert_eq!(track.title(), Some("T"));
        assert!(out
            .warnings
            .iter()
            .any(|w| matches!(w, DecodeWarning::StringDecodeDegraded { .. })));
    }

    #[test]
    fn test_length_inconsistency_is_a_warning_not_an_abort() {
        let mut buf = minimal_database();
        // Claim the database is 4 bytes longer than its children span.
        let declared = u32::from_le_bytes(buf[8..12].try_into().unwrap());
        put_u32(&mut buf, 8, declared + 4);
        buf.extend_from_slice(&[0, 0, 0, 0]);

        let out = decode(&buf).unwrap();
        assert_eq!(out.database.tracks().count(), 1);
        assert!(out
            .warnings
            .iter()
            .any(|w| matches!(w, DecodeWarning::LengthInconsistency { .. })));
    }
}
