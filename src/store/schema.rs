use rusqlite::Connection;

use super::StoreError;

/// Create the inverted-index tables and the hash lookup index.
///
/// The hash column is a 64-bit INTEGER: wide enough for both the 40-bit and
/// the legacy 30-bit pair hashes.
pub(super) fn apply_schema(connection: &Connection) -> Result<(), StoreError> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS hashes (
            hash INTEGER NOT NULL,
            offset REAL NOT NULL,
            song_id TEXT NOT NULL
         );
         CREATE TABLE IF NOT EXISTS songs (
            song_id TEXT PRIMARY KEY,
            artist TEXT NOT NULL,
            album TEXT NOT NULL,
            title TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_hashes_hash ON hashes (hash);",
    )?;
    Ok(())
}
