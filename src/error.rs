use std::path::PathBuf;

use thiserror::Error;

use crate::audio::DecodeError;
use crate::store::StoreError;

/// Errors surfaced by the engine facade.
///
/// A query that simply finds no match is not an error; `recognize` reports
/// that through an empty result instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The given path does not exist on disk.
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    /// The file extension is not in the supported set.
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(PathBuf),
    /// The decoder could not produce samples from the file.
    #[error("Failed to decode {path}: {reason}")]
    Decode {
        /// File that failed to decode.
        path: PathBuf,
        /// Decoder-reported cause.
        reason: String,
    },
    /// Fingerprinting produced zero hash rows (too short, silent, or all
    /// peaks filtered out).
    #[error("No fingerprints generated for {0}")]
    EmptyFingerprint(PathBuf),
    /// The store kept rejecting the write after all retries.
    #[error("Store rejected writes after retries: {0}")]
    StoreConflict(StoreError),
    /// Database query failed.
    #[error("Database error: {0}")]
    Store(#[from] StoreError),
    /// Anything else that should never happen in normal operation.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub(crate) fn from_decode(err: DecodeError) -> Self {
        match err {
            DecodeError::NotFound(path) => Self::NotFound(path),
            DecodeError::UnsupportedFormat(path) => Self::UnsupportedFormat(path),
            DecodeError::Malformed { path, reason } => Self::Decode { path, reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn decode_errors_map_onto_the_engine_taxonomy() {
        let path = Path::new("clip.ogg").to_path_buf();
        let err = EngineError::from_decode(DecodeError::UnsupportedFormat(path.clone()));
        assert!(matches!(err, EngineError::UnsupportedFormat(p) if p == path));

        let err = EngineError::from_decode(DecodeError::Malformed {
            path: path.clone(),
            reason: "truncated stream".into(),
        });
        assert!(matches!(err, EngineError::Decode { .. }));
    }
}
