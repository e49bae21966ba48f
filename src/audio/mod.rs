use std::path::{Path, PathBuf};

use thiserror::Error;

mod decode;
mod downmix;
mod resample;

pub use decode::decode;
pub(crate) use downmix::downmix_to_mono;
pub(crate) use resample::resample_linear;

/// Extensions accepted for registration (lowercase, without dots).
pub const SUPPORTED_AUDIO_EXTENSIONS: [&str; 4] = ["wav", "mp3", "flac", "m4a"];

/// Finite mono signal at a known sample rate, samples in `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Mono samples.
    pub samples: Vec<f32>,
    /// Sample rate the buffer was produced at.
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Duration of the buffer in seconds.
    pub fn duration_seconds(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate.max(1) as f32
    }
}

/// Container format, chosen by file extension (case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
    M4a,
}

impl AudioFormat {
    /// Resolve the format from a path's extension, if supported.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|ext| ext.to_str())?;
        match ext.to_ascii_lowercase().as_str() {
            "wav" => Some(Self::Wav),
            "mp3" => Some(Self::Mp3),
            "flac" => Some(Self::Flac),
            "m4a" => Some(Self::M4a),
            _ => None,
        }
    }

    /// Extension hint handed to the decoder probe.
    pub(crate) fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Flac => "flac",
            Self::M4a => "m4a",
        }
    }

    /// True when the format is accepted as recognizer input.
    ///
    /// m4a files can be registered but not queried.
    pub fn query_supported(self) -> bool {
        !matches!(self, Self::M4a)
    }
}

/// Return true if the path has an extension accepted for registration.
pub fn is_supported_audio(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    SUPPORTED_AUDIO_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}

/// Errors produced while turning a file into an [`AudioBuffer`].
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The path does not exist.
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    /// The extension is not in the supported set.
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(PathBuf),
    /// The file exists but could not be decoded.
    #[error("Failed to decode {path}: {reason}")]
    Malformed {
        /// File that failed to decode.
        path: PathBuf,
        /// Decoder-reported cause.
        reason: String,
    },
}
