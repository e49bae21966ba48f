use std::thread;
use std::time::Duration;

use rusqlite::params;
use tracing::warn;

use crate::fingerprint::HashRow;

use super::{IndexStore, SongRecord, StoreError, map_sql_error};

/// Backoff schedule between store retries under lock contention.
const RETRY_BACKOFF: [Duration; 2] = [Duration::from_millis(100), Duration::from_millis(200)];

impl IndexStore {
    /// Atomically persist a song's metadata row and all of its hash rows.
    ///
    /// The whole write happens in one transaction: either every row lands or
    /// none do. When the database is locked, the write is retried up to
    /// three times with backoff before giving up with [`StoreError::Busy`].
    pub fn store_song(&self, rows: &[HashRow], song: &SongRecord) -> Result<(), StoreError> {
        let attempts = RETRY_BACKOFF.len() + 1;
        for attempt in 0..attempts {
            match self.store_song_once(rows, song) {
                Ok(()) => return Ok(()),
                Err(StoreError::Busy) if attempt < RETRY_BACKOFF.len() => {
                    warn!(
                        song_id = %song.song_id,
                        attempt = attempt + 1,
                        "Store busy, backing off before retry"
                    );
                    thread::sleep(RETRY_BACKOFF[attempt]);
                }
                Err(err) => return Err(err),
            }
        }
        Err(StoreError::Busy)
    }

    fn store_song_once(&self, rows: &[HashRow], song: &SongRecord) -> Result<(), StoreError> {
        let tx = self
            .connection
            .unchecked_transaction()
            .map_err(map_sql_error)?;
        tx.prepare_cached(
            "INSERT OR REPLACE INTO songs (song_id, artist, album, title)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .map_err(map_sql_error)?
        .execute(params![
            song.song_id,
            field_or_unknown(&song.artist),
            field_or_unknown(&song.album),
            field_or_unknown(&song.title),
        ])
        .map_err(map_sql_error)?;

        {
            let mut insert = tx
                .prepare_cached("INSERT INTO hashes (hash, offset, song_id) VALUES (?1, ?2, ?3)")
                .map_err(map_sql_error)?;
            for row in rows {
                insert
                    .execute(params![row.hash as i64, row.time_offset as f64, song.song_id])
                    .map_err(map_sql_error)?;
            }
        }
        tx.commit().map_err(map_sql_error)?;
        Ok(())
    }

    /// Flush the write-ahead journal into the main database file.
    pub fn checkpoint(&self) -> Result<(), StoreError> {
        self.connection
            .execute_batch("PRAGMA wal_checkpoint(FULL)")
            .map_err(map_sql_error)?;
        Ok(())
    }
}

fn field_or_unknown(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() { "Unknown" } else { trimmed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_rows() -> Vec<HashRow> {
        (0..10)
            .map(|i| HashRow {
                hash: 0xAB_0000_0000 + i,
                time_offset: i as f32 * 0.5,
            })
            .collect()
    }

    fn sample_song(id: &str) -> SongRecord {
        SongRecord {
            song_id: id.to_string(),
            artist: "Artist".into(),
            album: "Album".into(),
            title: "Title".into(),
        }
    }

    #[test]
    fn store_song_persists_all_rows_atomically() {
        let dir = tempdir().unwrap();
        let store = IndexStore::open(dir.path().join("index.db")).unwrap();
        store.store_song(&sample_rows(), &sample_song("aa11")).unwrap();

        let (songs, hashes) = store.counts().unwrap();
        assert_eq!(songs, 1);
        assert_eq!(hashes, 10);
    }

    #[test]
    fn empty_fields_store_as_unknown() {
        let dir = tempdir().unwrap();
        let store = IndexStore::open(dir.path().join("index.db")).unwrap();
        let song = SongRecord {
            song_id: "bb22".into(),
            artist: "  ".into(),
            album: String::new(),
            title: "Kept".into(),
        };
        store.store_song(&sample_rows(), &song).unwrap();

        let loaded = store.get_song("bb22").unwrap().unwrap();
        assert_eq!(loaded.artist, "Unknown");
        assert_eq!(loaded.album, "Unknown");
        assert_eq!(loaded.title, "Kept");
    }

    #[test]
    fn reregistering_replaces_the_metadata_row() {
        let dir = tempdir().unwrap();
        let store = IndexStore::open(dir.path().join("index.db")).unwrap();
        store.store_song(&sample_rows(), &sample_song("cc33")).unwrap();
        let mut updated = sample_song("cc33");
        updated.title = "Retitled".into();
        store.store_song(&[], &updated).unwrap();

        let (songs, _) = store.counts().unwrap();
        assert_eq!(songs, 1);
        assert_eq!(store.get_song("cc33").unwrap().unwrap().title, "Retitled");
    }

    #[test]
    fn wide_hashes_round_trip_through_the_integer_column() {
        let dir = tempdir().unwrap();
        let store = IndexStore::open(dir.path().join("index.db")).unwrap();
        let top_bit = HashRow {
            hash: 0xFF_FFFF_FFFF,
            time_offset: 1.5,
        };
        store.store_song(&[top_bit], &sample_song("dd44")).unwrap();

        let rows = vec![HashRow {
            hash: 0xFF_FFFF_FFFF,
            time_offset: 9.0,
        }];
        let matches = store.lookup(&rows, 1).unwrap();
        let offsets = matches.get("dd44").unwrap();
        assert_eq!(offsets.len(), 1);
        assert!((offsets[0].0 - 1.5).abs() < 1e-6);
        assert!((offsets[0].1 - 9.0).abs() < 1e-6);
    }

    #[test]
    fn checkpoint_succeeds_after_writes() {
        let dir = tempdir().unwrap();
        let store = IndexStore::open(dir.path().join("index.db")).unwrap();
        store.store_song(&sample_rows(), &sample_song("ee55")).unwrap();
        store.checkpoint().unwrap();
    }
}
