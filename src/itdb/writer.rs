//! Two-pass serializer
//!
//! Pass one walks the tree bottom-up computing every chunk's extent; pass
//! two emits top-down into a buffer pre-sized from those extents, patching
//! every length and count field from the tree itself. Stored header bytes
//! are copied through otherwise untouched, and raw chunks are emitted
//! verbatim, so decoding an unmodified buffer and re-encoding it
//! reproduces the input byte for byte.
//!
//! The only field ever regenerated rather than copied is the integrity
//! hash region, and only when the caller supplies a [`DatabaseHash`]; a
//! stale digest is never silently carried forward in that case.

use super::cursor::CursorMut;
use super::error::EncodeError;
use super::hash::{DatabaseHash, HASH_REGION_LEN, HASH_REGION_OFFSET, HASH_VERSION_THRESHOLD};
use super::strings::{self, STRING_SUBHEADER_LEN};
use super::tags::{ChunkPath, DATABASE_MAGIC, OBJECT_MAGIC};
use crate::model::{
    is_string_type, put_header_u16, put_header_u32, AlbumItem, AlbumList, Child, DataObject,
    Database, MemberEntry, ObjectPayload, PlaylistItem, PlaylistList, RawChunk, Section,
    SectionBody, TrackItem, TrackList,
};

/// Serialize a database tree, preserving any stored hash region verbatim.
pub fn encode(db: &Database) -> Result<Vec<u8>, EncodeError> {
    encode_with(db, None)
}

/// Serialize a database tree, regenerating the integrity hash region with
/// the supplied implementation when the format version carries one.
pub fn encode_with(
    db: &Database,
    hasher: Option<&dyn DatabaseHash>,
) -> Result<Vec<u8>, EncodeError> {
    let total = database_len(db);
    let mut out = vec![0u8; total];
    {
        let mut emitter = Emitter {
            cur: CursorMut::new(&mut out),
            path: ChunkPath::root(),
        };
        emitter.database(db, total)?;
    }

    if let Some(hasher) = hasher {
        let gated = db.format_version() >= HASH_VERSION_THRESHOLD
            && db.header_bytes().len() >= HASH_REGION_OFFSET + HASH_REGION_LEN;
        if gated {
            let region = HASH_REGION_OFFSET..HASH_REGION_OFFSET + HASH_REGION_LEN;
            out[region.clone()].fill(0);
            let digest = hasher.compute(&out);
            out[region].copy_from_slice(&digest);
        }
    }

    Ok(out)
}

// --- size pass -------------------------------------------------------------

fn child_len<T>(child: &Child<T>, item_len: fn(&T) -> usize) -> usize {
    match child {
        Child::Item(item) => item_len(item),
        Child::Raw(raw) => raw.len(),
    }
}

fn object_len(obj: &DataObject) -> usize {
    let body = match &obj.payload {
        ObjectPayload::Text(value) => match &value.raw_body {
            Some(raw) => raw.len(),
            None => STRING_SUBHEADER_LEN + value.payload_len() + value.trailing.len(),
        },
        ObjectPayload::Binary(body) => body.len(),
    };
    obj.header_bytes().len() + body
}

fn objects_len(objects: &[Child<DataObject>]) -> usize {
    objects.iter().map(|c| child_len(c, object_len)).sum()
}

fn track_len(track: &TrackItem) -> usize {
    track.header_bytes().len() + objects_len(&track.data_objects)
}

fn member_len(member: &MemberEntry) -> usize {
    member.header_bytes().len() + objects_len(&member.data_objects)
}

fn playlist_len(playlist: &PlaylistItem) -> usize {
    playlist.header_bytes().len()
        + objects_len(&playlist.data_objects)
        + playlist
            .members
            .iter()
            .map(|c| child_len(c, member_len))
            .sum::<usize>()
}

fn album_len(album: &AlbumItem) -> usize {
    album.header_bytes().len() + objects_len(&album.data_objects)
}

fn track_list_len(list: &TrackList) -> usize {
    list.header_bytes().len()
        + list
            .items
            .iter()
            .map(|c| child_len(c, track_len))
            .sum::<usize>()
}

fn playlist_list_len(list: &PlaylistList) -> usize {
    list.header_bytes().len()
        + list
            .items
            .iter()
            .map(|c| child_len(c, playlist_len))
            .sum::<usize>()
}

fn album_list_len(list: &AlbumList) -> usize {
    list.header_bytes().len()
        + list
            .items
            .iter()
            .map(|c| child_len(c, album_len))
            .sum::<usize>()
}

fn section_len(section: &Section) -> usize {
    let body = match &section.body {
        SectionBody::Tracks(list) => track_list_len(list),
        SectionBody::Playlists(list) => playlist_list_len(list),
        SectionBody::Albums(list) => album_list_len(list),
        SectionBody::Raw(bytes) => bytes.len(),
    };
    section.header_bytes().len() + body
}

fn database_len(db: &Database) -> usize {
    db.header_bytes().len()
        + db.sections
            .iter()
            .map(|c| child_len(c, section_len))
            .sum::<usize>()
}

/// String-typed objects counted for a playlist's dedicated count field.
/// Demoted objects that are still recognizable string data objects keep
/// counting, so the field round-trips on best-effort parses.
fn string_object_count(objects: &[Child<DataObject>]) -> u16 {
    objects
        .iter()
        .filter(|child| match child {
            Child::Item(obj) => is_string_type(obj.object_type()),
            Child::Raw(raw) => {
                raw.magic() == Some(OBJECT_MAGIC)
                    && raw
                        .bytes
                        .get(12..16)
                        .map(|b| is_string_type(u32::from_le_bytes([b[0], b[1], b[2], b[3]])))
                        .unwrap_or(false)
            }
        })
        .count() as u16
}

// --- emit pass -------------------------------------------------------------

struct Emitter<'a> {
    cur: CursorMut<'a>,
    path: ChunkPath,
}

impl<'a> Emitter<'a> {
    fn bytes(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.cur.write_bytes(bytes).map_err(|e| EncodeError::OutOfRange {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Clone a stored header for patching, rejecting ones too short to
    /// hold the envelope.
    fn patchable(&self, header: &[u8]) -> Result<Vec<u8>, EncodeError> {
        if header.len() < 12 {
            return Err(EncodeError::HeaderTooShort {
                path: self.path.clone(),
                len: header.len(),
            });
        }
        Ok(header.to_vec())
    }

    fn raw(&mut self, raw: &RawChunk, index: usize) -> Result<(), EncodeError> {
        self.path.push(raw.magic().unwrap_or(*b"????"), index);
        self.bytes(&raw.bytes)?;
        self.path.pop();
        Ok(())
    }

    fn database(&mut self, db: &Database, total: usize) -> Result<(), EncodeError> {
        self.path.push(DATABASE_MAGIC, 0);
        let mut header = self.patchable(db.header_bytes())?;
        put_header_u32(&mut header, 8, total as u32);
        put_header_u32(&mut header, 20, db.sections.len() as u32);
        self.bytes(&header)?;

        for (index, child) in db.sections.iter().enumerate() {
            match child {
                Child::Item(section) => self.section(section, index)?,
                Child::Raw(raw) => self.raw(raw, index)?,
            }
        }
        self.path.pop();
        Ok(())
    }

    fn section(&mut self, section: &Section, index: usize) -> Result<(), EncodeError> {
        self.path.push(
            section.header_bytes().get(0..4).map_or(*b"mhsd", |b| {
                [b[0], b[1], b[2], b[3]]
            }),
            index,
        );
        let mut header = self.patchable(section.header_bytes())?;
        put_header_u32(&mut header, 8, section_len(section) as u32);
        self.bytes(&header)?;

        match &section.body {
            SectionBody::Tracks(list) => self.track_list(list)?,
            SectionBody::Playlists(list) => self.playlist_list(list)?,
            SectionBody::Albums(list) => self.album_list(list)?,
            SectionBody::Raw(bytes) => self.bytes(bytes)?,
        }
        self.path.pop();
        Ok(())
    }

    fn list_header(&mut self, header: &[u8], count: usize) -> Result<(), EncodeError> {
        let mut header = self.patchable(header)?;
        put_header_u32(&mut header, 8, count as u32);
        self.bytes(&header)
    }

    fn track_list(&mut self, list: &TrackList) -> Result<(), EncodeError> {
        self.path.push(*b"mhlt", 0);
        self.list_header(list.header_bytes(), list.items.len())?;
        for (index, child) in list.items.iter().enumerate() {
            match child {
                Child::Item(track) => self.track(track, index)?,
                Child::Raw(raw) => self.raw(raw, index)?,
            }
        }
        self.path.pop();
        Ok(())
    }

    fn playlist_list(&mut self, list: &PlaylistList) -> Result<(), EncodeError> {
        self.path.push(*b"mhlp", 0);
        self.list_header(list.header_bytes(), list.items.len())?;
        for (index, child) in list.items.iter().enumerate() {
            match child {
                Child::Item(playlist) => self.playlist(playlist, index)?,
                Child::Raw(raw) => self.raw(raw, index)?,
            }
        }
        self.path.pop();
        Ok(())
    }

    fn album_list(&mut self, list: &AlbumList) -> Result<(), EncodeError> {
        self.path.push(*b"mhla", 0);
        self.list_header(list.header_bytes(), list.items.len())?;
        for (index, child) in list.items.iter().enumerate() {
            match child {
                Child::Item(album) => self.album(album, index)?,
                Child::Raw(raw) => self.raw(raw, index)?,
            }
        }
        self.path.pop();
        Ok(())
    }

    fn objects(&mut self, objects: &[Child<DataObject>]) -> Result<(), EncodeError> {
        for (index, child) in objects.iter().enumerate() {
            match child {
                Child::Item(obj) => self.object(obj, index)?,
                Child::Raw(raw) => self.raw(raw, index)?,
            }
        }
        Ok(())
    }

    fn track(&mut self, track: &TrackItem, index: usize) -> Result<(), EncodeError> {
        self.path.push(*b"mhit", index);
        let mut header = self.patchable(track.header_bytes())?;
        put_header_u32(&mut header, 8, track_len(track) as u32);
        put_header_u32(&mut header, 12, track.data_objects.len() as u32);
        self.bytes(&header)?;
        self.objects(&track.data_objects)?;
        self.path.pop();
        Ok(())
    }

    fn playlist(&mut self, playlist: &PlaylistItem, index: usize) -> Result<(), EncodeError> {
        self.path.push(*b"mhyp", index);
        let mut header = self.patchable(playlist.header_bytes())?;
        put_header_u32(&mut header, 8, playlist_len(playlist) as u32);
        put_header_u32(&mut header, 0x0C, playlist.data_objects.len() as u32);
        put_header_u32(&mut header, 0x10, playlist.members.len() as u32);
        put_header_u16(
            &mut header,
            0x28,
            string_object_count(&playlist.data_objects),
        );
        self.bytes(&header)?;
        self.objects(&playlist.data_objects)?;
        for (member_index, child) in playlist.members.iter().enumerate() {
            match child {
                Child::Item(member) => self.member(member, member_index)?,
                Child::Raw(raw) => self.raw(raw, member_index)?,
            }
        }
        self.path.pop();
        Ok(())
    }

    fn member(&mut self, member: &MemberEntry, index: usize) -> Result<(), EncodeError> {
        self.path.push(*b"mhip", index);
        let mut header = self.patchable(member.header_bytes())?;
        put_header_u32(&mut header, 8, member_len(member) as u32);
        put_header_u32(&mut header, 12, member.data_objects.len() as u32);
        self.bytes(&header)?;
        self.objects(&member.data_objects)?;
        self.path.pop();
        Ok(())
    }

    fn album(&mut self, album: &AlbumItem, index: usize) -> Result<(), EncodeError> {
        self.path.push(*b"mhia", index);
        let mut header = self.patchable(album.header_bytes())?;
        put_header_u32(&mut header, 8, album_len(album) as u32);
        put_header_u32(&mut header, 12, album.data_objects.len() as u32);
        self.bytes(&header)?;
        self.objects(&album.data_objects)?;
        self.path.pop();
        Ok(())
    }

    fn object(&mut self, obj: &DataObject, index: usize) -> Result<(), EncodeError> {
        self.path.push(OBJECT_MAGIC, index);
        let mut header = self.patchable(obj.header_bytes())?;
        put_header_u32(&mut header, 8, object_len(obj) as u32);
        self.bytes(&header)?;

        match &obj.payload {
            ObjectPayload::Text(value) => match &value.raw_body {
                // Imperfect decodes re-emit their original body exactly.
                Some(raw) => self.bytes(raw)?,
                None => {
                    let payload = strings::encode_payload(value.encoding, &value.text);
                    let mut sub = [0u8; STRING_SUBHEADER_LEN];
                    sub[0..4].copy_from_slice(&value.encoding.to_le_bytes());
                    sub[4..8].copy_from_slice(&(payload.len() as u32).to_le_bytes());
                    sub[8..12].copy_from_slice(&value.reserved[0].to_le_bytes());
                    sub[12..16].copy_from_slice(&value.reserved[1].to_le_bytes());
                    self.bytes(&sub)?;
                    self.bytes(&payload)?;
                    self.bytes(&value.trailing)?;
                }
            },
            ObjectPayload::Binary(body) => self.bytes(body)?,
        }
        self.path.pop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itdb::reader::decode;

    fn sample_database() -> Database {
        let mut db = Database::new();
        db.set_database_id(0x0123456789abcdef);

        let mut tracks = TrackList::new();
        let mut track = TrackItem::new(1);
        track.set_title("Test Song");
        track.set_artist("Test Artist");
        track.set_album("Test Album");
        track.assign_persistent_id(":iPod_Control:Music:F00:song.mp3");
        tracks.push(track);
        db.add_section(Section::tracks(tracks));

        let mut playlists = PlaylistList::new();
        let mut master = PlaylistItem::new_master("Library", 0x100);
        master.add_member(1);
        playlists.push(master);
        let mut mix = PlaylistItem::new("Mix", 0x101);
        mix.add_member(1);
        playlists.push(mix);
        db.add_section(Section::playlists(playlists));

        let mut albums = AlbumList::new();
        albums.push(AlbumItem::new("Test Album", "Test Artist"));
        db.add_section(Section::albums(albums));

        db
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let db = sample_database();
        let bytes = encode(&db).unwrap();

        let out = decode(&bytes).unwrap();
        assert!(out.warnings.is_empty(), "warnings: {:?}", out.warnings);
        assert_eq!(out.database.tracks().count(), 1);
        let track = out.database.tracks().next().unwrap();
        assert_eq!(track.title(), Some("Test Song"));
        assert_eq!(track.artist(), Some("Test Artist"));
        assert_eq!(out.database.master_playlist().unwrap().name(), Some("Library"));

        // Decoding then re-encoding an unmodified tree is byte-identical.
        let again = encode(&out.database).unwrap();
        assert_eq!(bytes, again);
    }

    #[test]
    fn test_length_and_count_fields_recomputed() {
        let db = sample_database();
        let bytes = encode(&db).unwrap();

        // Root total length covers the whole buffer.
        let total = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        assert_eq!(total as usize, bytes.len());
        // Section count was patched from the tree.
        let sections = u32::from_le_bytes(bytes[20..24].try_into().unwrap());
        assert_eq!(sections, 3);

        // Every sized chunk satisfies the length invariant when re-read.
        let out = decode(&bytes).unwrap();
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_mutation_changes_only_expected_fields() {
        let db = sample_database();
        let bytes = encode(&db).unwrap();

        let mut decoded = decode(&bytes).unwrap().database;
        decoded
            .track_list_mut()
            .unwrap()
            .tracks_mut()
            .next()
            .unwrap()
            .set_track_id(99);
        let mutated = encode(&decoded).unwrap();

        assert_eq!(bytes.len(), mutated.len());
        let re = decode(&mutated).unwrap().database;
        assert_eq!(re.tracks().next().unwrap().track_id(), 99);
        assert_eq!(re.tracks().next().unwrap().title(), Some("Test Song"));
    }

    #[test]
    fn test_raw_section_round_trips_verbatim() {
        let mut db = sample_database();
        // A synthetic unknown chunk with a valid self-declared length.
        let mut unknown = Vec::new();
        unknown.extend_from_slice(b"mhzz");
        unknown.extend_from_slice(&16u32.to_le_bytes());
        unknown.extend_from_slice(&20u32.to_le_bytes());
        unknown.extend_from_slice(&0xfeedu32.to_le_bytes());
        unknown.extend_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd]);
        db.sections.push(Child::Raw(RawChunk::new(unknown.clone())));

        let bytes = encode(&db).unwrap();
        let out = decode(&bytes).unwrap();
        let raw = out
            .database
            .sections
            .iter()
            .find_map(|child| match child {
                Child::Raw(raw) => Some(raw),
                Child::Item(_) => None,
            })
            .unwrap();
        assert_eq!(raw.bytes, unknown);

        let again = encode(&out.database).unwrap();
        assert_eq!(bytes, again);
    }

    #[test]
    fn test_string_object_count_field() {
        let db = sample_database();
        let bytes = encode(&db).unwrap();
        let decoded = decode(&bytes).unwrap().database;

        // Each playlist has exactly one string object (its title); the
        // play-order objects are binary and must not count.
        for playlist in decoded.playlists() {
            assert_eq!(string_object_count(&playlist.data_objects), 1);
        }
    }

    #[test]
    fn test_hash_regeneration_is_pluggable() {
        struct FixedHash;
        impl DatabaseHash for FixedHash {
            fn compute(&self, bytes: &[u8]) -> [u8; HASH_REGION_LEN] {
                // Digest the buffer so the test notices if the region is
                // hashed before being zeroed.
                let digest = md5::compute(bytes);
                let mut out = [0u8; HASH_REGION_LEN];
                out[..16].copy_from_slice(&digest.0);
                out
            }
        }

        let db = sample_database();
        let plain = encode(&db).unwrap();
        let hashed = encode_with(&db, Some(&FixedHash)).unwrap();

        assert_eq!(plain.len(), hashed.len());
        // Only the hash region differs.
        let region = HASH_REGION_OFFSET..HASH_REGION_OFFSET + HASH_REGION_LEN;
        assert_eq!(plain[..region.start], hashed[..region.start]);
        assert_eq!(plain[region.end..], hashed[region.end..]);
        assert_ne!(plain[region.clone()], hashed[region.clone()]);

        // The digest matches a recomputation over the zeroed buffer.
        let mut zeroed = hashed.clone();
        zeroed[region.clone()].fill(0);
        let expect = FixedHash.compute(&zeroed);
        assert_eq!(&hashed[region], &expect);

        // Re-decoding the hashed buffer yields the same tree apart from
        // the regenerated region.
        let re = decode(&hashed).unwrap().database;
        assert_eq!(re.tracks().next().unwrap().title(), Some("Test Song"));
        assert_eq!(re.hash_region().unwrap(), &expect);
    }

    #[test]
    fn test_below_threshold_version_has_no_hash_region() {
        struct Never;
        impl DatabaseHash for Never {
            fn compute(&self, _bytes: &[u8]) -> [u8; HASH_REGION_LEN] {
                panic!("hash must not be computed below the version gate");
            }
        }

        let mut db = sample_database();
        db.set_format_version(0x10);
        let bytes = encode_with(&db, Some(&Never)).unwrap();
        assert!(decode(&bytes).is_ok());
    }
}
