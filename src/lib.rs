//! Landmark-hash audio fingerprinting and recognition.
//!
//! The pipeline: decode to mono at a canonical rate, compute a windowed
//! power spectrogram, pick robust constellation peaks, hash anchor/target
//! peak pairs, and store the hashes in a persistent inverted index. Queries
//! run the same chain and score candidates by how tightly their database
//! and query time offsets align.

/// Decoding, downmixing, and resampling of audio files.
pub mod audio;
/// Engine tuning parameters.
pub mod config;
/// Engine facade: register, recognize, stats.
pub mod engine;
/// Error taxonomy for engine operations.
pub mod error;
/// Peak-pair hashing and per-file fingerprinting.
pub mod fingerprint;
/// Batch directory registration.
pub mod ingest;
/// Tracing subscriber setup for the CLI.
pub mod logging;
/// Constellation peak pickers.
pub mod peaks;
/// Alignment-histogram scoring of lookup results.
pub mod recognize;
/// Short-time Fourier transform.
pub mod spectrogram;
/// Persistent hash index and song metadata.
pub mod store;

pub use config::{EngineConfig, FingerprintProfile};
pub use engine::{Engine, IndexStats, RecognizeResult, RegisterResult};
pub use error::EngineError;
pub use store::SongRecord;
