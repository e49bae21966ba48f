use std::collections::HashMap;
use std::path::Path;

use rusqlite::OptionalExtension;

use crate::fingerprint::{HashRow, song_id};

use super::{IndexStore, SongRecord, StoreError, map_sql_error};

/// Chunk size for `WHERE hash IN (...)` queries, kept safely below SQLite's
/// default bound-parameter limit.
const LOOKUP_CHUNK: usize = 500;

/// Matched offsets for one candidate song: `(db_offset, query_offset)`.
pub type MatchOffsets = Vec<(f32, f32)>;

impl IndexStore {
    /// True when a song with the path's id is already registered.
    pub fn contains_song(&self, path: &Path) -> Result<bool, StoreError> {
        self.contains_song_id(&song_id(path))
    }

    /// True when the given id has a metadata row.
    pub fn contains_song_id(&self, id: &str) -> Result<bool, StoreError> {
        let found: Option<i64> = self
            .connection
            .prepare_cached("SELECT 1 FROM songs WHERE song_id = ?1 LIMIT 1")
            .map_err(map_sql_error)?
            .query_row([id], |row| row.get(0))
            .optional()
            .map_err(map_sql_error)?;
        Ok(found.is_some())
    }

    /// Load the metadata row for a song id.
    pub fn get_song(&self, id: &str) -> Result<Option<SongRecord>, StoreError> {
        self.connection
            .prepare_cached("SELECT artist, album, title FROM songs WHERE song_id = ?1")
            .map_err(map_sql_error)?
            .query_row([id], |row| {
                Ok(SongRecord {
                    song_id: id.to_string(),
                    artist: row.get(0)?,
                    album: row.get(1)?,
                    title: row.get(2)?,
                })
            })
            .optional()
            .map_err(map_sql_error)
    }

    /// Batched inverted-index lookup.
    ///
    /// For every stored row whose hash appears in `query_rows`, the pair
    /// `(db_offset, query_offset)` is appended to that song's bucket.
    /// Buckets with fewer than `min_matches` entries are dropped.
    pub fn lookup(
        &self,
        query_rows: &[HashRow],
        min_matches: usize,
    ) -> Result<HashMap<String, MatchOffsets>, StoreError> {
        let mut buckets: HashMap<String, MatchOffsets> = HashMap::new();
        if query_rows.is_empty() {
            return Ok(buckets);
        }

        let mut query_offsets: HashMap<i64, f32> = HashMap::with_capacity(query_rows.len());
        for row in query_rows {
            query_offsets.insert(row.hash as i64, row.time_offset);
        }
        let keys: Vec<i64> = query_offsets.keys().copied().collect();

        for chunk in keys.chunks(LOOKUP_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(",");
            let sql = format!(
                "SELECT hash, offset, song_id FROM hashes WHERE hash IN ({placeholders})"
            );
            let mut stmt = self.connection.prepare(&sql).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(chunk.iter()), |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .map_err(map_sql_error)?;
            for row in rows {
                let (hash, db_offset, song) = row.map_err(map_sql_error)?;
                if let Some(query_offset) = query_offsets.get(&hash) {
                    buckets
                        .entry(song)
                        .or_default()
                        .push((db_offset as f32, *query_offset));
                }
            }
        }

        buckets.retain(|_, offsets| offsets.len() >= min_matches);
        Ok(buckets)
    }

    /// Number of registered songs and stored hash rows.
    pub fn counts(&self) -> Result<(u64, u64), StoreError> {
        let songs: i64 = self
            .connection
            .query_row("SELECT COUNT(*) FROM songs", [], |row| row.get(0))
            .map_err(map_sql_error)?;
        let hashes: i64 = self
            .connection
            .query_row("SELECT COUNT(*) FROM hashes", [], |row| row.get(0))
            .map_err(map_sql_error)?;
        Ok((songs.max(0) as u64, hashes.max(0) as u64))
    }
}
