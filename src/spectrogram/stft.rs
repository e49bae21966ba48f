use std::f32::consts::PI;
use std::sync::Arc;

use realfft::{RealFftPlanner, RealToComplex, num_complex::Complex};

use super::Spectrogram;

/// Short-time Fourier transform engine for one worker thread.
///
/// Owns its FFT plan and scratch buffers; instances are cheap enough to
/// create per thread and are never shared across threads.
pub struct SpectrogramEngine {
    sample_rate: u32,
    fft_len: usize,
    hop_len: usize,
    window: Vec<f32>,
    fft: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
}

impl SpectrogramEngine {
    /// Plan an engine for the given rate and window length in seconds.
    pub fn new(sample_rate: u32, window_s: f32) -> Self {
        let fft_len = ((sample_rate as f32 * window_s) as usize).max(2);
        let hop_len = (fft_len / 2).max(1);
        let fft = RealFftPlanner::<f32>::new().plan_fft_forward(fft_len);
        let input = fft.make_input_vec();
        let spectrum = fft.make_output_vec();
        Self {
            sample_rate,
            fft_len,
            hop_len,
            window: hamming_window(fft_len),
            fft,
            input,
            spectrum,
        }
    }

    /// Windowed power spectrogram of `samples`.
    ///
    /// Frames advance by half a window; the final frame is zero-padded when
    /// it overruns the buffer. Inputs shorter than one hop produce an empty
    /// matrix.
    pub fn compute(&mut self, samples: &[f32]) -> Spectrogram {
        let num_bins = self.fft_len / 2 + 1;
        let num_frames = samples.len().saturating_sub(self.fft_len - self.hop_len) / self.hop_len;

        let freq_step = self.sample_rate as f32 / self.fft_len as f32;
        let freqs: Vec<f32> = (0..num_bins).map(|f| f as f32 * freq_step).collect();
        let time_step = self.hop_len as f32 / self.sample_rate as f32;
        let times: Vec<f32> = (0..num_frames).map(|t| t as f32 * time_step).collect();

        let mut power = vec![0.0_f32; num_bins * num_frames];
        for frame in 0..num_frames {
            let start = frame * self.hop_len;
            let available = (samples.len() - start).min(self.fft_len);
            for (i, cell) in self.input.iter_mut().enumerate() {
                let sample = if i < available { samples[start + i] } else { 0.0 };
                *cell = sample * self.window[i];
            }
            if self.fft.process(&mut self.input, &mut self.spectrum).is_err() {
                // Buffer lengths are fixed at construction; a failure here
                // would be a planner bug. Leave the frame as silence.
                continue;
            }
            for (bin, value) in self.spectrum.iter().enumerate() {
                power[bin * num_frames + frame] = value.norm_sqr();
            }
        }

        Spectrogram::new(freqs, times, power)
    }

    /// Window length in samples.
    pub fn fft_len(&self) -> usize {
        self.fft_len
    }

    /// Hop between frames in samples.
    pub fn hop_len(&self) -> usize {
        self.hop_len
    }
}

fn hamming_window(length: usize) -> Vec<f32> {
    if length <= 1 {
        return vec![1.0_f32; length.max(1)];
    }
    let factor = 2.0 * PI / (length - 1) as f32;
    (0..length)
        .map(|i| 0.54 - 0.46 * (factor * i as f32).cos())
        .collect()
}
