use std::sync::mpsc::channel;
use std::thread;

use tracing::warn;

use crate::audio::AudioBuffer;
use crate::config::{EngineConfig, FingerprintProfile};
use crate::peaks::{Peak, find_peaks, find_peaks_enhanced};
use crate::spectrogram::SpectrogramEngine;

/// Buffers longer than this are split across worker threads.
const PARALLEL_THRESHOLD_S: f32 = 60.0;
/// Overlap added to each side of a chunk so boundary peaks are not lost.
const CHUNK_OVERLAP_S: f32 = 2.0;
/// Merged peaks closer than this in time and frequency to an accepted peak
/// are treated as duplicates from the overlap regions.
const DEDUP_TIME_S: f32 = 0.1;
const DEDUP_FREQ_HZ: f32 = 50.0;

/// Extract constellation peaks for a whole buffer.
///
/// Short buffers run on the calling thread. Long ones are cut into
/// hop-aligned chunks with overlap, processed in parallel (one spectrogram
/// engine per thread), shifted to absolute frame indices, and merged with
/// boundary deduplication.
pub(crate) fn collect_peaks(buffer: &AudioBuffer, config: &EngineConfig) -> Vec<Peak> {
    let workers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    if buffer.duration_seconds() <= PARALLEL_THRESHOLD_S || workers <= 1 {
        return peaks_for_slice(&buffer.samples, config);
    }
    collect_peaks_chunked(buffer, config, workers)
}

fn peaks_for_slice(samples: &[f32], config: &EngineConfig) -> Vec<Peak> {
    let mut engine = SpectrogramEngine::new(config.sample_rate, config.fft_window_s);
    let spec = engine.compute(samples);
    match config.profile {
        FingerprintProfile::Standard => find_peaks(&spec),
        FingerprintProfile::Enhanced => find_peaks_enhanced(&spec, config),
    }
}

fn collect_peaks_chunked(buffer: &AudioBuffer, config: &EngineConfig, workers: usize) -> Vec<Peak> {
    let hop = config.hop_len();
    let total = buffer.samples.len();
    let overlap = align_to_hop((CHUNK_OVERLAP_S * config.sample_rate as f32) as usize, hop);
    let hop_s = hop as f32 / config.sample_rate as f32;

    // Chunk boundaries snap to hop multiples so every frame in a chunk sits
    // on the same global frame grid as a single-pass spectrogram.
    let mut bounds = Vec::with_capacity(workers + 1);
    for i in 0..=workers {
        bounds.push(align_to_hop(i * total / workers, hop));
    }
    bounds[workers] = total;

    let (tx, rx) = channel();
    thread::scope(|scope| {
        for i in 0..workers {
            let core_start = bounds[i];
            let core_end = bounds[i + 1];
            if core_start >= core_end {
                continue;
            }
            let ext_start = core_start.saturating_sub(overlap);
            let ext_end = (core_end + overlap).min(total);
            let samples = &buffer.samples[ext_start..ext_end];
            let tx = tx.clone();
            scope.spawn(move || {
                let offset_frames = ext_start / hop;
                let mut peaks = peaks_for_slice(samples, config);
                for peak in &mut peaks {
                    peak.time_idx += offset_frames;
                    peak.time = peak.time_idx as f32 * hop_s;
                }
                if tx.send(peaks).is_err() {
                    warn!("Chunk result receiver dropped");
                }
            });
        }
        drop(tx);
    });

    let mut merged: Vec<Peak> = Vec::new();
    while let Ok(mut peaks) = rx.recv() {
        merged.append(&mut peaks);
    }
    merged.sort_unstable_by(|a, b| (a.time_idx, a.freq_idx).cmp(&(b.time_idx, b.freq_idx)));
    dedup_merged(merged)
}

fn align_to_hop(value: usize, hop: usize) -> usize {
    value / hop * hop
}

/// Drop peaks that duplicate an already-accepted peak from an overlapping
/// chunk: within `DEDUP_TIME_S` in time and `DEDUP_FREQ_HZ` in frequency.
fn dedup_merged(peaks: Vec<Peak>) -> Vec<Peak> {
    let mut accepted: Vec<Peak> = Vec::with_capacity(peaks.len());
    for candidate in peaks {
        let duplicate = accepted
            .iter()
            .rev()
            .take_while(|kept| candidate.time - kept.time <= DEDUP_TIME_S)
            .any(|kept| (kept.frequency - candidate.frequency).abs() <= DEDUP_FREQ_HZ);
        if !duplicate {
            accepted.push(candidate);
        }
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peaks::test_peak;
    use std::f32::consts::PI;

    #[test]
    fn alignment_rounds_down_to_hop_multiples() {
        assert_eq!(align_to_hop(1000, 507), 507);
        assert_eq!(align_to_hop(507, 507), 507);
        assert_eq!(align_to_hop(506, 507), 0);
    }

    #[test]
    fn dedup_drops_near_coincident_peaks() {
        let mut a = test_peak(100, 50, 1.0);
        a.time = 1.0;
        a.frequency = 1_000.0;
        let mut b = test_peak(101, 52, 0.9);
        b.time = 1.05;
        b.frequency = 1_030.0;
        let mut c = test_peak(150, 52, 0.9);
        c.time = 1.05;
        c.frequency = 3_000.0;
        let kept = dedup_merged(vec![a, b, c]);
        assert_eq!(kept.len(), 2);
        assert!((kept[1].frequency - 3_000.0).abs() < 1e-3);
    }

    #[test]
    fn dedup_keeps_peaks_outside_the_time_window() {
        let mut a = test_peak(100, 50, 1.0);
        a.time = 1.0;
        a.frequency = 1_000.0;
        let mut b = test_peak(100, 60, 0.9);
        b.time = 1.5;
        b.frequency = 1_000.0;
        assert_eq!(dedup_merged(vec![a, b]).len(), 2);
    }

    #[test]
    fn chunked_and_single_pass_agree_on_a_long_tone_stack() {
        let config = EngineConfig::default();
        let sr = config.sample_rate;
        // 70 s of three steady tones forces the chunked path.
        let samples: Vec<f32> = (0..(70 * sr) as usize)
            .map(|i| {
                let t = i as f32 / sr as f32;
                0.3 * (2.0 * PI * 440.0 * t).sin()
                    + 0.3 * (2.0 * PI * 1_250.0 * t).sin()
                    + 0.3 * (2.0 * PI * 3_330.0 * t).sin()
            })
            .collect();
        let buffer = AudioBuffer {
            samples,
            sample_rate: sr,
        };

        let single = peaks_for_slice(&buffer.samples, &config);
        let chunked = collect_peaks_chunked(&buffer, &config, 4);

        assert!(!chunked.is_empty());
        // Peak times are on the global frame grid.
        let hop_s = config.hop_len() as f32 / sr as f32;
        for peak in chunked.iter().take(20) {
            assert!((peak.time - peak.time_idx as f32 * hop_s).abs() < 1e-5);
        }
        // The tone frequencies recovered by both paths match.
        let freqs = |peaks: &[Peak]| {
            let mut fs: Vec<i64> = peaks.iter().map(|p| p.frequency as i64).collect();
            fs.sort_unstable();
            fs.dedup();
            fs
        };
        assert_eq!(freqs(&single), freqs(&chunked));
    }
}
