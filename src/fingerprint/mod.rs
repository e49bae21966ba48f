use std::collections::HashSet;
use std::path::Path;

use crate::audio::{AudioBuffer, DecodeError, decode};
use crate::config::{EngineConfig, FingerprintProfile};
use crate::peaks::Peak;

mod chunked;

pub(crate) use chunked::collect_peaks;

/// One landmark hash: the pair hash plus the anchor's time in the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HashRow {
    /// Pair hash; the wide variant uses 40 bits, the compact one 30.
    pub hash: u64,
    /// Anchor peak time in seconds from the start of the source.
    pub time_offset: f32,
}

/// Stable identifier for a source file: the first 16 hex characters of the
/// blake3 digest of its canonicalized path.
///
/// Registration, duplicate checks, and metadata rows all go through this one
/// function so the id never diverges between them.
pub fn song_id(path: &Path) -> String {
    let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let digest = blake3::hash(canonical.to_string_lossy().as_bytes());
    digest.to_hex().as_str()[..16].to_string()
}

/// Decode a file and produce its deduplicated hash rows.
pub fn fingerprint_file(path: &Path, config: &EngineConfig) -> Result<Vec<HashRow>, DecodeError> {
    let buffer = decode(path, config.sample_rate)?;
    Ok(fingerprint_buffer(&buffer, config))
}

/// Produce deduplicated hash rows for an already-decoded buffer.
pub fn fingerprint_buffer(buffer: &AudioBuffer, config: &EngineConfig) -> Vec<HashRow> {
    let peaks = collect_peaks(buffer, config);
    hash_peaks(&peaks, config)
}

/// Pair every anchor peak with its target zone and hash the pairs.
///
/// `peaks` must be time-ascending (the pickers emit them that way). Within
/// one source, rows with a hash value that already appeared are dropped, so
/// the earliest anchor wins.
pub fn hash_peaks(peaks: &[Peak], config: &EngineConfig) -> Vec<HashRow> {
    let mut rows = Vec::new();
    let mut seen: HashSet<u64> = HashSet::new();
    let mut targets: Vec<&Peak> = Vec::new();

    for (idx, anchor) in peaks.iter().enumerate() {
        collect_target_zone(anchor, idx, peaks, config, &mut targets);
        for target in &targets {
            let hash = match config.profile {
                FingerprintProfile::Standard => pair_hash_compact(anchor, target),
                FingerprintProfile::Enhanced => pair_hash_wide(anchor, target),
            };
            if seen.insert(hash) {
                rows.push(HashRow {
                    hash,
                    time_offset: anchor.time,
                });
            }
        }
    }
    rows
}

/// Fill `out` with the anchor's target zone: peaks in the forward time
/// window whose frequency sits within `target_f / 2` of the anchor's.
///
/// The enhanced profile keeps only the `target_zone_points` loudest targets.
fn collect_target_zone<'a>(
    anchor: &Peak,
    anchor_idx: usize,
    peaks: &'a [Peak],
    config: &EngineConfig,
    out: &mut Vec<&'a Peak>,
) {
    out.clear();
    let t_min = anchor.time + config.target_start;
    let t_max = t_min + config.target_t;
    let f_min = anchor.frequency - config.target_f / 2.0;
    let f_max = anchor.frequency + config.target_f / 2.0;

    for candidate in &peaks[anchor_idx + 1..] {
        if candidate.time > t_max {
            break;
        }
        if candidate.time < t_min {
            continue;
        }
        if candidate.frequency >= f_min && candidate.frequency <= f_max {
            out.push(candidate);
        }
    }

    if config.profile == FingerprintProfile::Enhanced && out.len() > config.target_zone_points {
        out.sort_unstable_by(|a, b| {
            b.amplitude
                .total_cmp(&a.amplitude)
                .then_with(|| (a.freq_idx, a.time_idx).cmp(&(b.freq_idx, b.time_idx)))
        });
        out.truncate(config.target_zone_points);
    }
}

/// 40-bit pair hash: 14 bits per frequency at 0.1 Hz resolution and 12 bits
/// of time delta at 0.1 ms resolution.
fn pair_hash_wide(anchor: &Peak, target: &Peak) -> u64 {
    let f1 = (anchor.frequency as f64 * 10.0) as u64 & 0x3FFF;
    let f2 = (target.frequency as f64 * 10.0) as u64 & 0x3FFF;
    let dt = ((target.time as f64 - anchor.time as f64) * 10_000.0) as u64 & 0xFFF;
    ((f1 << 26) | (f2 << 12) | dt) & 0xFF_FFFF_FFFF
}

/// Legacy 30-bit pair hash: 10 bits per field, frequencies at 0.01 Hz
/// steps truncated hard and time delta in milliseconds.
fn pair_hash_compact(anchor: &Peak, target: &Peak) -> u64 {
    let f1 = (anchor.frequency as f64 * 100.0) as u64 & 0x3FF;
    let f2 = (target.frequency as f64 * 100.0) as u64 & 0x3FF;
    let dt = ((target.time as f64 - anchor.time as f64) * 1_000.0) as u64 & 0x3FF;
    (f1 << 20) | (f2 << 10) | dt
}
