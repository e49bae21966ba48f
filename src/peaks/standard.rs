use crate::spectrogram::Spectrogram;

use super::{Peak, by_amplitude_desc, by_time};

const PEAK_BOX: usize = 15;
const POINT_EFFICIENCY: f64 = 0.8;

/// Global-mean threshold picker.
///
/// A cell is a peak when it exceeds twice the global mean power and no cell
/// in its surrounding box is louder (ties are allowed). Only cells whose box
/// fits entirely inside the matrix are considered. The loudest
/// `F * T * POINT_EFFICIENCY / PEAK_BOX^2` survivors are kept, returned in
/// time order.
pub fn find_peaks(spec: &Spectrogram) -> Vec<Peak> {
    let bins = spec.num_bins();
    let frames = spec.num_frames();
    let half = PEAK_BOX / 2;
    if bins <= PEAK_BOX || frames <= PEAK_BOX {
        return Vec::new();
    }

    let mut sum = 0.0_f64;
    for f in 0..bins {
        for t in 0..frames {
            sum += spec.power_at(f, t) as f64;
        }
    }
    let threshold = (2.0 * sum / (bins * frames) as f64) as f32;

    let mut peaks = Vec::new();
    for f in half..bins - half {
        for t in half..frames - half {
            let center = spec.power_at(f, t);
            if center > threshold && dominates_box(spec, f, t, half) {
                peaks.push(Peak {
                    freq_idx: f,
                    time_idx: t,
                    frequency: spec.freqs[f],
                    time: spec.times[t],
                    amplitude: center,
                });
            }
        }
    }

    peaks.sort_unstable_by(by_amplitude_desc);
    let cap = ((bins * frames) as f64 * POINT_EFFICIENCY / (PEAK_BOX * PEAK_BOX) as f64) as usize;
    peaks.truncate(cap);
    peaks.sort_unstable_by(by_time);
    peaks
}

fn dominates_box(spec: &Spectrogram, f: usize, t: usize, half: usize) -> bool {
    let center = spec.power_at(f, t);
    for nf in f - half..=f + half {
        for nt in t - half..=t + half {
            if (nf, nt) != (f, t) && spec.power_at(nf, nt) > center {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix_with_spikes(bins: usize, frames: usize, spikes: &[(usize, usize, f32)]) -> Spectrogram {
        let mut power = vec![0.01_f32; bins * frames];
        for &(f, t, amp) in spikes {
            power[f * frames + t] = amp;
        }
        let freqs = (0..bins).map(|f| f as f32 * 21.75).collect();
        let times = (0..frames).map(|t| t as f32 * 0.023).collect();
        Spectrogram::new(freqs, times, power)
    }

    #[test]
    fn isolated_spikes_become_peaks() {
        let spec = matrix_with_spikes(64, 64, &[(20, 20, 50.0), (40, 45, 30.0)]);
        let peaks = find_peaks(&spec);
        assert_eq!(peaks.len(), 2);
        assert_eq!((peaks[0].freq_idx, peaks[0].time_idx), (20, 20));
        assert_eq!((peaks[1].freq_idx, peaks[1].time_idx), (40, 45));
    }

    #[test]
    fn quieter_cell_inside_a_louder_box_is_suppressed() {
        // Both spikes fit in one 15x15 box; only the louder survives.
        let spec = matrix_with_spikes(64, 64, &[(30, 30, 50.0), (33, 33, 20.0)]);
        let peaks = find_peaks(&spec);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].freq_idx, 30);
    }

    #[test]
    fn cells_below_twice_the_mean_are_ignored() {
        // A flat matrix has mean == every cell, so nothing clears 2x mean.
        let spec = matrix_with_spikes(64, 64, &[]);
        assert!(find_peaks(&spec).is_empty());
    }

    #[test]
    fn matrices_smaller_than_the_box_produce_no_peaks() {
        let spec = matrix_with_spikes(10, 10, &[(5, 5, 100.0)]);
        assert!(find_peaks(&spec).is_empty());
    }

    #[test]
    fn output_is_time_ordered() {
        let spec = matrix_with_spikes(80, 80, &[(60, 10, 5.0), (20, 50, 80.0), (40, 30, 40.0)]);
        let peaks = find_peaks(&spec);
        let times: Vec<usize> = peaks.iter().map(|p| p.time_idx).collect();
        let mut sorted = times.clone();
        sorted.sort_unstable();
        assert_eq!(times, sorted);
    }
}
