use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;

use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::fingerprint::{fingerprint_file, song_id};
use crate::store::{IndexStore, SongRecord};

use super::{collect_supported_files, read_tags};

/// Aggregate result of one directory ingest.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IngestOutcome {
    /// True only if every file either registered or was already present.
    pub(crate) all_success: bool,
    /// Supported files found under the directory.
    pub(crate) files_seen: usize,
    /// Files newly registered by this run.
    pub(crate) registered: usize,
    /// Hash rows inserted by this run.
    pub(crate) hashes_inserted: u64,
}

/// Register every supported file under `dir` using `workers` threads.
///
/// The file list is split into contiguous shards, one per worker. Workers
/// fingerprint lock-free and take the writer lock only around `store_song`;
/// per-file failures are logged and never cross file boundaries. The journal
/// is checkpointed once all workers finish.
pub(crate) fn run(
    dir: &Path,
    workers: usize,
    config: &EngineConfig,
    writer: &Mutex<IndexStore>,
    db_path: &Path,
) -> Result<IngestOutcome, std::io::Error> {
    let files = collect_supported_files(dir)?;
    if files.is_empty() {
        info!(dir = %dir.display(), "No supported audio files to register");
        return Ok(IngestOutcome {
            all_success: true,
            files_seen: 0,
            registered: 0,
            hashes_inserted: 0,
        });
    }

    let workers = workers.clamp(1, files.len());
    let all_success = AtomicBool::new(true);
    let registered = AtomicUsize::new(0);
    let hashes_inserted = AtomicU64::new(0);

    let per_worker = files.len() / workers;
    let remainder = files.len() % workers;

    thread::scope(|scope| {
        let mut start = 0usize;
        for i in 0..workers {
            let end = start + per_worker + usize::from(i < remainder);
            let shard = &files[start..end];
            start = end;
            let all_success = &all_success;
            let registered = &registered;
            let hashes_inserted = &hashes_inserted;
            scope.spawn(move || {
                let reader = match IndexStore::open_read_only(db_path) {
                    Ok(reader) => Some(reader),
                    Err(err) => {
                        warn!(error = %err, "Worker falling back to locked duplicate checks");
                        None
                    }
                };
                for file in shard {
                    match register_one(file, config, writer, reader.as_ref()) {
                        Ok(Some(count)) => {
                            registered.fetch_add(1, Ordering::Relaxed);
                            hashes_inserted.fetch_add(count, Ordering::Relaxed);
                        }
                        Ok(None) => {}
                        Err(reason) => {
                            warn!(file = %file.display(), reason, "Skipping file after error");
                            all_success.store(false, Ordering::Relaxed);
                        }
                    }
                }
            });
        }
    });

    let outcome = IngestOutcome {
        all_success: all_success.load(Ordering::Relaxed),
        files_seen: files.len(),
        registered: registered.load(Ordering::Relaxed),
        hashes_inserted: hashes_inserted.load(Ordering::Relaxed),
    };
    match writer.lock() {
        Ok(store) => {
            if let Err(err) = store.checkpoint() {
                warn!(error = %err, "Checkpoint after ingest failed");
            }
        }
        Err(_) => warn!("Writer lock poisoned, skipping checkpoint"),
    }
    info!(
        files = outcome.files_seen,
        registered = outcome.registered,
        hashes = outcome.hashes_inserted,
        "Directory ingest finished"
    );
    Ok(outcome)
}

/// Register a single file. `Ok(Some(n))` means `n` hash rows were inserted,
/// `Ok(None)` means the file was already registered.
fn register_one(
    file: &Path,
    config: &EngineConfig,
    writer: &Mutex<IndexStore>,
    reader: Option<&IndexStore>,
) -> Result<Option<u64>, String> {
    let id = song_id(file);
    let already = match reader {
        Some(reader) => reader
            .contains_song_id(&id)
            .map_err(|err| err.to_string())?,
        None => {
            let store = writer.lock().map_err(|_| "writer lock poisoned")?;
            store.contains_song_id(&id).map_err(|err| err.to_string())?
        }
    };
    if already {
        info!(file = %file.display(), "Already registered, skipping");
        return Ok(None);
    }

    let rows = fingerprint_file(file, config).map_err(|err| err.to_string())?;
    if rows.is_empty() {
        return Err("no fingerprints generated".to_string());
    }

    let tags = read_tags(file);
    let song = SongRecord {
        song_id: id,
        artist: tags.artist,
        album: tags.album,
        title: tags.title,
    };

    let store = writer.lock().map_err(|_| "writer lock poisoned")?;
    store
        .store_song(&rows, &song)
        .map_err(|err| err.to_string())?;
    info!(
        file = %file.display(),
        title = %song.title,
        hashes = rows.len(),
        "Registered"
    );
    Ok(Some(rows.len() as u64))
}
