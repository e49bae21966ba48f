use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::audio::{AudioFormat, is_supported_audio};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::fingerprint::{fingerprint_file, song_id};
use crate::ingest::{read_tags, run_pipeline};
use crate::recognize::{Candidate, rank_candidates};
use crate::store::{IndexStore, SongRecord, StoreError};

/// Outcome of registering a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResult {
    /// True when every file succeeded (or was already registered).
    pub ok: bool,
    /// Hash rows inserted by this call.
    pub hashes_inserted: u64,
}

/// Outcome of a recognition query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizeResult {
    /// Metadata of the best-scoring song, or `None` when nothing aligned.
    pub song: Option<SongRecord>,
    /// Alignment score of the winner (0 when there is no match).
    pub score: u32,
    /// Raw matched pairs for the winner.
    pub match_count: usize,
    /// Every surviving candidate, best first.
    pub candidates: Vec<Candidate>,
    /// Wall-clock time spent on the query.
    pub recognition_ms: u64,
}

/// Index size counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub songs: u64,
    pub hashes: u64,
}

/// Facade over the full fingerprinting engine.
///
/// All writes serialize on one writer lock; reads open their own read-only
/// connections and are safe to run concurrently. The engine itself is
/// `Sync` and can be shared across threads by reference.
pub struct Engine {
    config: EngineConfig,
    db_path: PathBuf,
    writer: Mutex<IndexStore>,
}

impl Engine {
    /// Open (or create) the index at `db_path` with the given tuning.
    pub fn open(db_path: impl Into<PathBuf>, config: EngineConfig) -> Result<Self, EngineError> {
        let db_path = db_path.into();
        let writer = IndexStore::open(&db_path)?;
        info!(db = %db_path.display(), profile = %config.profile, "Engine opened");
        Ok(Self {
            config,
            db_path,
            writer: Mutex::new(writer),
        })
    }

    /// Open with default tuning overlaid by environment variables.
    pub fn open_with_env(db_path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        Self::open(db_path, EngineConfig::from_env())
    }

    /// Fingerprint one file and persist it with its tag metadata.
    ///
    /// Registering an already-registered file succeeds without writing
    /// anything, so repeated calls never grow the stored hash set.
    pub fn register(&self, file: &Path) -> Result<RegisterResult, EngineError> {
        if !file.exists() {
            return Err(EngineError::NotFound(file.to_path_buf()));
        }
        if !is_supported_audio(file) {
            return Err(EngineError::UnsupportedFormat(file.to_path_buf()));
        }

        let id = song_id(file);
        if self.reader()?.contains_song_id(&id)? {
            info!(file = %file.display(), "Already registered");
            return Ok(RegisterResult {
                ok: true,
                hashes_inserted: 0,
            });
        }

        let rows = fingerprint_file(file, &self.config).map_err(EngineError::from_decode)?;
        if rows.is_empty() {
            return Err(EngineError::EmptyFingerprint(file.to_path_buf()));
        }

        let tags = read_tags(file);
        let song = SongRecord {
            song_id: id,
            artist: tags.artist,
            album: tags.album,
            title: tags.title,
        };
        let store = self.lock_writer()?;
        match store.store_song(&rows, &song) {
            Ok(()) => {}
            Err(StoreError::Busy) => return Err(EngineError::StoreConflict(StoreError::Busy)),
            Err(err) => return Err(err.into()),
        }
        info!(
            file = %file.display(),
            title = %song.title,
            hashes = rows.len(),
            "Registered"
        );
        Ok(RegisterResult {
            ok: true,
            hashes_inserted: rows.len() as u64,
        })
    }

    /// Register every supported file under `dir` across `workers` threads.
    ///
    /// Per-file failures are logged and skipped; `ok` is true only when no
    /// file failed.
    pub fn register_dir(&self, dir: &Path, workers: usize) -> Result<RegisterResult, EngineError> {
        if !dir.exists() {
            return Err(EngineError::NotFound(dir.to_path_buf()));
        }
        let outcome = run_pipeline(dir, workers, &self.config, &self.writer, &self.db_path)
            .map_err(|err| EngineError::Internal(format!("directory walk failed: {err}")))?;
        Ok(RegisterResult {
            ok: outcome.all_success,
            hashes_inserted: outcome.hashes_inserted,
        })
    }

    /// Fingerprint a query clip and return the best-aligned registered song.
    ///
    /// Finding no match is a successful query with `song: None`; decode
    /// failures and empty fingerprints are errors.
    pub fn recognize(&self, file: &Path) -> Result<RecognizeResult, EngineError> {
        let started = Instant::now();
        if !file.exists() {
            return Err(EngineError::NotFound(file.to_path_buf()));
        }
        if !AudioFormat::from_path(file).is_some_and(AudioFormat::query_supported) {
            return Err(EngineError::UnsupportedFormat(file.to_path_buf()));
        }

        let rows = fingerprint_file(file, &self.config).map_err(EngineError::from_decode)?;
        if rows.is_empty() {
            return Err(EngineError::EmptyFingerprint(file.to_path_buf()));
        }

        let reader = self.reader()?;
        let matches = reader.lookup(&rows, self.config.match_threshold)?;
        let candidates = rank_candidates(&matches, self.config.hist_bin_s);

        let winner = candidates.first().filter(|best| best.score > 0).cloned();
        let (song, score, match_count) = match winner {
            Some(best) => (
                reader.get_song(&best.song_id)?,
                best.score,
                best.match_count,
            ),
            None => (None, 0, 0),
        };
        let recognition_ms = started.elapsed().as_millis() as u64;
        match &song {
            Some(record) => info!(
                title = %record.title,
                score,
                matches = match_count,
                recognition_ms,
                "Match found"
            ),
            None => info!(recognition_ms, "No match found"),
        }
        Ok(RecognizeResult {
            song,
            score,
            match_count,
            candidates,
            recognition_ms,
        })
    }

    /// Real row counts from the index.
    pub fn stats(&self) -> Result<IndexStats, EngineError> {
        let (songs, hashes) = self.reader()?.counts()?;
        Ok(IndexStats { songs, hashes })
    }

    /// Flush the journal and release the database.
    pub fn close(self) -> Result<(), EngineError> {
        let store = self.lock_writer()?;
        store.checkpoint()?;
        Ok(())
    }

    /// True when the extension (with or without a file name in front) is
    /// accepted for registration.
    pub fn supported_extension(name: &str) -> bool {
        is_supported_audio(Path::new(name))
    }

    /// The tuning this engine runs with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn reader(&self) -> Result<IndexStore, EngineError> {
        Ok(IndexStore::open_read_only(&self.db_path)?)
    }

    fn lock_writer(&self) -> Result<std::sync::MutexGuard<'_, IndexStore>, EngineError> {
        self.writer
            .lock()
            .map_err(|_| EngineError::Internal("writer lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_extensions_cover_the_registration_set() {
        for name in ["a.wav", "b.MP3", "c.flac", "d.m4a"] {
            assert!(Engine::supported_extension(name), "{name}");
        }
        assert!(!Engine::supported_extension("e.ogg"));
        assert!(!Engine::supported_extension("f"));
    }
}
