use itunesdb_codec::itdb::{decode, encode};
use itunesdb_codec::model::{
    AlbumItem, AlbumList, Child, Database, PlaylistItem, PlaylistList, RawChunk, Section,
    TrackItem, TrackList,
};
use itunesdb_codec::{device, diff, validation};
use tempfile::TempDir;

/// Create a small but fully populated test database: tracks, playlists
/// (with a master), podcasts, albums, and smart playlists.
fn create_test_database() -> Database {
    let mut db = Database::new();
    db.set_database_id(0xfeedface00c0ffee);
    db.set_library_persistent_id(0x1122334455667788);

    let mut tracks = TrackList::new();

    let mut track1 = TrackItem::new(1);
    track1.set_title("Test Song");
    track1.set_artist("Test Artist");
    track1.set_album("Test Album");
    track1.set_location(":iPod_Control:Music:F00:test1.mp3");
    track1.assign_persistent_id(":iPod_Control:Music:F00:test1.mp3");
    track1.set_media_type(1);
    tracks.push(track1);

    let mut track2 = TrackItem::new(2);
    track2.set_title("Déjà Vu");
    track2.set_artist("Test Artist");
    track2.set_album("Test Album");
    track2.set_location(":iPod_Control:Music:F01:test2.mp3");
    track2.assign_persistent_id(":iPod_Control:Music:F01:test2.mp3");
    tracks.push(track2);

    db.add_section(Section::tracks(tracks));

    let mut playlists = PlaylistList::new();
    let mut master = PlaylistItem::new_master("Library", 0x1000);
    master.add_member(1);
    master.add_member(2);
    playlists.push(master);
    let mut mix = PlaylistItem::new("Road Trip", 0x1001);
    mix.add_member(2);
    mix.add_member(1);
    playlists.push(mix);
    db.add_section(Section::playlists(playlists));

    let mut podcasts = PlaylistList::new();
    let mut casts = PlaylistItem::new("Podcasts", 0x1002);
    casts.set_podcast(true);
    podcasts.push(casts);
    db.add_section(Section::podcasts(podcasts));

    let mut albums = AlbumList::new();
    albums.push(AlbumItem::new("Test Album", "Test Artist"));
    db.add_section(Section::albums(albums));

    let mut smart = PlaylistList::new();
    smart.push(PlaylistItem::new("Recently Added", 0x1003));
    db.add_section(Section::smart_playlists(smart));

    db
}

#[test]
fn test_title_scenario() {
    // One tracks section, one track, one UTF-16LE title.
    let mut db = Database::new();
    let mut tracks = TrackList::new();
    let mut track = TrackItem::new(1);
    track.set_title("Test Song");
    tracks.push(track);
    db.add_section(Section::tracks(tracks));

    let bytes = encode(&db).unwrap();
    let out = decode(&bytes).unwrap();
    assert!(out.warnings.is_empty());
    assert_eq!(out.database.tracks().next().unwrap().title(), Some("Test Song"));

    // Re-encoding the unmodified tree reproduces the bytes exactly.
    assert_eq!(encode(&out.database).unwrap(), bytes);
}

#[test]
fn test_full_database_round_trip() {
    let db = create_test_database();
    let bytes = encode(&db).unwrap();

    let out = decode(&bytes).unwrap();
    assert!(out.warnings.is_empty(), "warnings: {:?}", out.warnings);

    let decoded = &out.database;
    assert_eq!(decoded.section_count(), 5);
    assert_eq!(decoded.tracks().count(), 2);
    assert_eq!(decoded.playlists().count(), 4);
    assert_eq!(decoded.database_id(), 0xfeedface00c0ffee);
    assert_eq!(decoded.library_persistent_id(), Some(0x1122334455667788));

    // Accented titles survive the UTF-16 payload.
    let titles: Vec<_> = decoded.tracks().filter_map(TrackItem::title).collect();
    assert_eq!(titles, vec!["Test Song", "Déjà Vu"]);

    // The first playlist entry is the master playlist.
    let master = decoded.master_playlist().unwrap();
    assert!(master.is_hidden());
    assert_eq!(master.member_track_ids().collect::<Vec<_>>(), vec![1, 2]);

    // Membership order is insertion order, not track order.
    let mix = decoded
        .playlists()
        .find(|p| p.name() == Some("Road Trip"))
        .unwrap();
    assert_eq!(mix.member_track_ids().collect::<Vec<_>>(), vec![2, 1]);

    let podcasts = decoded
        .playlists()
        .find(|p| p.name() == Some("Podcasts"))
        .unwrap();
    assert!(podcasts.is_podcast());

    let albums = decoded.album_list().unwrap();
    assert_eq!(albums.albums().next().unwrap().title(), Some("Test Album"));

    // Byte-identical round trip, twice over.
    let second = encode(decoded).unwrap();
    assert_eq!(bytes, second);
    let third = encode(&decode(&second).unwrap().database).unwrap();
    assert_eq!(second, third);
}

#[test]
fn test_unknown_chunk_round_trips_byte_identical() {
    let mut db = create_test_database();

    // A synthetic chunk of an unrecognized kind with a valid
    // self-declared total length.
    let mut unknown = Vec::new();
    unknown.extend_from_slice(b"mhzz");
    unknown.extend_from_slice(&12u32.to_le_bytes());
    unknown.extend_from_slice(&28u32.to_le_bytes());
    unknown.extend_from_slice(&[0x5a; 16]);
    db.sections.push(Child::Raw(RawChunk::new(unknown.clone())));

    let bytes = encode(&db).unwrap();
    let out = decode(&bytes).unwrap();

    // The decoder flags the chunk but keeps it, and re-encoding
    // reproduces the buffer exactly.
    assert!(!out.warnings.is_empty());
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
    assert_eq!(encode(&out.database).unwrap(), bytes);
}

#[test]
fn test_differ_reports_single_track_id_change() {
    let db = create_test_database();
    let bytes = encode(&db).unwrap();

    let mut mutated = decode(&bytes).unwrap().database;
    for track in mutated.track_list_mut().unwrap().tracks_mut() {
        if track.track_id() == 2 {
            track.set_track_id(42);
        }
    }
    let changed = encode(&mutated).unwrap();

    let report = diff(&bytes, &changed);
    assert_eq!(report.len(), 1, "report: {report:?}");
    assert!(report[0].path.contains("mhit[1]"), "path: {}", report[0].path);
    assert_eq!(report[0].field, "track_id");
    assert_eq!(report[0].expected, "2");
    assert_eq!(report[0].actual, "42");
}

#[test]
fn test_mutated_database_survives_roundtrip() {
    let db = create_test_database();
    let bytes = encode(&db).unwrap();

    // Mutate through the model API: rename a track and grow a playlist.
    let mut decoded = decode(&bytes).unwrap().database;
    decoded
        .track_list_mut()
        .unwrap()
        .tracks_mut()
        .next()
        .unwrap()
        .set_title("A Much Longer Title Than Before");
    let rebuilt = encode(&decoded).unwrap();

    assert_ne!(bytes.len(), rebuilt.len());
    let again = decode(&rebuilt).unwrap();
    assert!(again.warnings.is_empty(), "warnings: {:?}", again.warnings);
    assert_eq!(
        again.database.tracks().next().unwrap().title(),
        Some("A Much Longer Title Than Before")
    );
    assert!(validation::verify_roundtrip(&rebuilt).is_ok());
}

#[test]
fn test_atomic_save_and_reload() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let control = temp_dir.path().join("iPod_Control").join("iTunes");
    std::fs::create_dir_all(&control).unwrap();
    let db_path = control.join("iTunesDB");

    let db = create_test_database();
    device::save_database(&db, &db_path).unwrap();

    // The file is discoverable the way a device mount is scanned.
    let located = device::locate_database(temp_dir.path()).unwrap();
    assert_eq!(located, db_path);

    let reloaded = device::load_database(&located).unwrap();
    assert!(reloaded.warnings.is_empty());
    assert_eq!(reloaded.database.tracks().count(), 2);

    // Saving over the existing file keeps it loadable.
    device::save_database(&reloaded.database, &db_path).unwrap();
    assert!(validation::verify_file(&db_path).is_ok());
}
