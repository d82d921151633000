//! Saved playlists of songs, each song remembering a tempo and meter.

use std::path::Path;

use log::debug;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::StoreError;
use crate::tempo::Tempo;
use crate::time_signature::TimeSignature;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Song {
    pub name: String,
    pub tempo: Tempo,
    pub time_signature: TimeSignature,
}

impl Song {
    pub fn new(name: impl Into<String>, tempo: Tempo, time_signature: TimeSignature) -> Self {
        Self {
            name: name.into(),
            tempo,
            time_signature,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Playlist {
    pub name: String,
    pub songs: Vec<Song>,
}

/// Where playlists live. The engine only ever sees the [`Song`]s.
pub trait PlaylistStore {
    fn create_playlist(&self, name: &str) -> Result<(), StoreError>;
    fn list_playlists(&self) -> Result<Vec<String>, StoreError>;
    fn delete_playlist(&self, name: &str) -> Result<(), StoreError>;
    fn add_song(&self, playlist: &str, song: &Song) -> Result<(), StoreError>;
    fn songs(&self, playlist: &str) -> Result<Vec<Song>, StoreError>;
    fn find_song(&self, playlist: &str, song: &str) -> Result<Song, StoreError>;
    fn remove_song(&self, playlist: &str, song: &str) -> Result<(), StoreError>;

    fn playlist(&self, name: &str) -> Result<Playlist, StoreError> {
        Ok(Playlist {
            name: name.to_string(),
            songs: self.songs(name)?,
        })
    }
}

/// SQLite-backed playlist store.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        debug!("opened playlist database {}", path.as_ref().display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS playlists (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS songs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                playlist_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                bpm INTEGER NOT NULL,
                time_signature TEXT NOT NULL,
                FOREIGN KEY (playlist_id) REFERENCES playlists(id) ON DELETE CASCADE,
                UNIQUE(playlist_id, name)
            );
            "#,
        )?;
        Ok(Self { conn })
    }

    fn playlist_id(&self, name: &str) -> Result<i64, StoreError> {
        self.conn
            .query_row(
                "SELECT id FROM playlists WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("playlist {:?}", name)))
    }

    fn row_to_song(name: String, bpm: i64, signature: String) -> Result<Song, StoreError> {
        // Anything outside u32 is out of range anyway; saturate so it is reported as such.
        let bpm = u32::try_from(bpm).unwrap_or(if bpm < 0 { 0 } else { u32::MAX });
        Ok(Song {
            name,
            tempo: Tempo::new(bpm)?,
            time_signature: signature.parse()?,
        })
    }
}

impl PlaylistStore for SqliteStore {
    fn create_playlist(&self, name: &str) -> Result<(), StoreError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO playlists (name) VALUES (?1)",
            params![name],
        )?;
        if inserted == 0 {
            return Err(StoreError::AlreadyExists(format!("playlist {:?}", name)));
        }
        Ok(())
    }

    fn list_playlists(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT name FROM playlists ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn delete_playlist(&self, name: &str) -> Result<(), StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM playlists WHERE name = ?1", params![name])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("playlist {:?}", name)));
        }
        Ok(())
    }

    fn add_song(&self, playlist: &str, song: &Song) -> Result<(), StoreError> {
        let playlist_id = self.playlist_id(playlist)?;
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO songs (playlist_id, name, bpm, time_signature)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                playlist_id,
                song.name,
                song.tempo.bpm(),
                song.time_signature.to_string(),
            ],
        )?;
        if inserted == 0 {
            return Err(StoreError::AlreadyExists(format!(
                "song {:?} in playlist {:?}",
                song.name, playlist
            )));
        }
        Ok(())
    }

    fn songs(&self, playlist: &str) -> Result<Vec<Song>, StoreError> {
        let playlist_id = self.playlist_id(playlist)?;
        let mut stmt = self.conn.prepare(
            "SELECT name, bpm, time_signature FROM songs WHERE playlist_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![playlist_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?, row.get::<_, String>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(name, bpm, signature)| Self::row_to_song(name, bpm, signature))
            .collect()
    }

    fn find_song(&self, playlist: &str, song: &str) -> Result<Song, StoreError> {
        let playlist_id = self.playlist_id(playlist)?;
        let row = self
            .conn
            .query_row(
                "SELECT name, bpm, time_signature FROM songs WHERE playlist_id = ?1 AND name = ?2",
                params![playlist_id, song],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?, row.get::<_, String>(2)?)),
            )
            .optional()?;

        match row {
            Some((name, bpm, signature)) => Self::row_to_song(name, bpm, signature),
            None => Err(StoreError::NotFound(format!(
                "song {:?} in playlist {:?}",
                song, playlist
            ))),
        }
    }

    fn remove_song(&self, playlist: &str, song: &str) -> Result<(), StoreError> {
        let playlist_id = self.playlist_id(playlist)?;
        let deleted = self.conn.execute(
            "DELETE FROM songs WHERE playlist_id = ?1 AND name = ?2",
            params![playlist_id, song],
        )?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!(
                "song {:?} in playlist {:?}",
                song, playlist
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetronomeError;

    fn song(name: &str, bpm: u32, sig: TimeSignature) -> Song {
        Song::new(name, Tempo::new(bpm).unwrap(), sig)
    }

    #[test]
    fn test_create_and_list_playlists() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_playlist("Rehearsal").unwrap();
        store.create_playlist("Gig").unwrap();
        assert_eq!(store.list_playlists().unwrap(), vec!["Gig", "Rehearsal"]);
    }

    #[test]
    fn test_duplicate_playlist() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_playlist("Gig").unwrap();
        assert!(matches!(
            store.create_playlist("Gig"),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_songs_keep_insertion_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_playlist("Gig").unwrap();
        store.add_song("Gig", &song("Opener", 140, TimeSignature::FourFour)).unwrap();
        store.add_song("Gig", &song("Ballad", 72, TimeSignature::SixEight)).unwrap();

        let playlist = store.playlist("Gig").unwrap();
        assert_eq!(playlist.songs.len(), 2);
        assert_eq!(playlist.songs[0].name, "Opener");
        assert_eq!(playlist.songs[1], song("Ballad", 72, TimeSignature::SixEight));
    }

    #[test]
    fn test_find_and_remove_song() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_playlist("Gig").unwrap();
        store.add_song("Gig", &song("Waltz", 90, TimeSignature::ThreeFour)).unwrap();

        assert_eq!(store.find_song("Gig", "Waltz").unwrap().tempo.bpm(), 90);
        store.remove_song("Gig", "Waltz").unwrap();
        assert!(matches!(store.find_song("Gig", "Waltz"), Err(StoreError::NotFound(_))));
        assert!(matches!(store.remove_song("Gig", "Waltz"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_same_song_name_in_different_playlists() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_playlist("A").unwrap();
        store.create_playlist("B").unwrap();
        store.add_song("A", &song("Intro", 100, TimeSignature::FourFour)).unwrap();
        store.add_song("B", &song("Intro", 120, TimeSignature::FiveFour)).unwrap();
        assert!(matches!(
            store.add_song("A", &song("Intro", 110, TimeSignature::FourFour)),
            Err(StoreError::AlreadyExists(_))
        ));

        assert_eq!(store.find_song("B", "Intro").unwrap().tempo.bpm(), 120);
    }

    #[test]
    fn test_delete_playlist_cascades() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_playlist("Gig").unwrap();
        store.add_song("Gig", &song("Opener", 140, TimeSignature::FourFour)).unwrap();
        store.delete_playlist("Gig").unwrap();

        let orphans: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM songs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
        assert!(matches!(store.songs("Gig"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_unknown_playlist() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(matches!(
            store.add_song("Nope", &song("X", 100, TimeSignature::FourFour)),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(store.delete_playlist("Nope"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_corrupt_row_is_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_playlist("Gig").unwrap();
        store
            .conn
            .execute(
                "INSERT INTO songs (playlist_id, name, bpm, time_signature) VALUES (1, 'Bad', 500, '4/4')",
                [],
            )
            .unwrap();
        assert!(matches!(store.songs("Gig"), Err(StoreError::InvalidSong(_))));
    }

    #[test]
    fn test_negative_bpm_row_is_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_playlist("Gig").unwrap();
        store
            .conn
            .execute(
                "INSERT INTO songs (playlist_id, name, bpm, time_signature) VALUES (1, 'Backwards', -5, '4/4')",
                [],
            )
            .unwrap();

        assert!(matches!(
            store.songs("Gig"),
            Err(StoreError::InvalidSong(MetronomeError::OutOfRange { bpm: 0, .. }))
        ));
        assert!(matches!(
            store.find_song("Gig", "Backwards"),
            Err(StoreError::InvalidSong(MetronomeError::OutOfRange { bpm: 0, .. }))
        ));
    }

    #[test]
    fn test_oversized_bpm_row_is_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_playlist("Gig").unwrap();
        store
            .conn
            .execute(
                "INSERT INTO songs (playlist_id, name, bpm, time_signature) VALUES (1, 'Huge', 5000000000, '4/4')",
                [],
            )
            .unwrap();

        assert!(matches!(
            store.find_song("Gig", "Huge"),
            Err(StoreError::InvalidSong(MetronomeError::OutOfRange { bpm: u32::MAX, .. }))
        ));
    }
}
