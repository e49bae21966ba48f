use std::collections::BTreeMap;

use crate::config::EngineConfig;
use crate::spectrogram::Spectrogram;

use super::{Peak, by_amplitude_desc, by_time};

/// Band-limited picker with neighbor-ratio and rate filtering.
///
/// Only cells between `min_hz` and `max_hz` are considered; the threshold is
/// three times the in-band mean. A candidate must dominate its clamped
/// `peak_box` neighborhood and be at least `min_amp_ratio` times louder than
/// the neighborhood average. Survivors are rate-limited per time window and
/// capped at `F * T * point_efficiency / peak_box^2`, returned in time order.
pub fn find_peaks_enhanced(spec: &Spectrogram, config: &EngineConfig) -> Vec<Peak> {
    let bins = spec.num_bins();
    let frames = spec.num_frames();
    if bins == 0 || frames == 0 {
        return Vec::new();
    }

    let band: Vec<usize> = (0..bins)
        .filter(|&f| spec.freqs[f] >= config.min_hz && spec.freqs[f] <= config.max_hz)
        .collect();
    if band.is_empty() {
        return Vec::new();
    }

    let mut sum = 0.0_f64;
    for &f in &band {
        for t in 0..frames {
            sum += spec.power_at(f, t) as f64;
        }
    }
    let threshold = (3.0 * sum / (band.len() * frames) as f64) as f32;

    let half = (config.peak_box / 2).max(1);
    let mut candidates = Vec::new();
    for &f in &band {
        for t in 0..frames {
            let center = spec.power_at(f, t);
            if center <= threshold {
                continue;
            }
            let Some(neighbor_mean) = box_stats(spec, f, t, half) else {
                continue;
            };
            if neighbor_mean > 0.0 && center / neighbor_mean < config.min_amp_ratio {
                continue;
            }
            candidates.push(Peak {
                freq_idx: f,
                time_idx: t,
                frequency: spec.freqs[f],
                time: spec.times[t],
                amplitude: center,
            });
        }
    }

    let mut peaks = rate_limit(candidates, config.max_peaks_per_second);

    peaks.sort_unstable_by(by_amplitude_desc);
    let cap = ((bins * frames) as f64 * config.point_efficiency as f64
        / (config.peak_box * config.peak_box) as f64) as usize;
    peaks.truncate(cap);
    peaks.sort_unstable_by(by_time);
    peaks
}

/// Mean of the in-bounds neighbors when the center dominates the box,
/// `None` when some neighbor is louder.
fn box_stats(spec: &Spectrogram, f: usize, t: usize, half: usize) -> Option<f32> {
    let center = spec.power_at(f, t);
    let f_lo = f.saturating_sub(half);
    let f_hi = (f + half).min(spec.num_bins() - 1);
    let t_lo = t.saturating_sub(half);
    let t_hi = (t + half).min(spec.num_frames() - 1);

    let mut sum = 0.0_f64;
    let mut count = 0usize;
    for nf in f_lo..=f_hi {
        for nt in t_lo..=t_hi {
            if (nf, nt) == (f, t) {
                continue;
            }
            let value = spec.power_at(nf, nt);
            if value > center {
                return None;
            }
            sum += value as f64;
            count += 1;
        }
    }
    if count == 0 {
        return Some(0.0);
    }
    Some((sum / count as f64) as f32)
}

/// Keep at most `per_window` peaks (loudest first) in each time window of
/// `1 / per_window` seconds.
fn rate_limit(candidates: Vec<Peak>, per_window: usize) -> Vec<Peak> {
    if per_window == 0 {
        return Vec::new();
    }
    let mut windows: BTreeMap<i64, Vec<Peak>> = BTreeMap::new();
    for peak in candidates {
        let window = (peak.time as f64 * per_window as f64).floor() as i64;
        windows.entry(window).or_default().push(peak);
    }
    let mut kept = Vec::new();
    for (_, mut bucket) in windows {
        bucket.sort_unstable_by(by_amplitude_desc);
        bucket.truncate(per_window);
        kept.append(&mut bucket);
    }
    kept
}
