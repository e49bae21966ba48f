//! Synthetic audio fixtures for engine tests.

use std::f64::consts::PI;
use std::path::Path;

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Write mono or interleaved samples to a 32-bit float WAV file.
pub fn write_test_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create wav parent dirs");
    }
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav writer");
    for &sample in samples {
        writer.write_sample(sample).expect("write wav sample");
    }
    writer.finalize().expect("finalize wav");
}

/// Linear sine sweep from `f0` to `f1` Hz.
pub fn sine_sweep(duration_s: f32, f0: f32, f1: f32, sample_rate: u32) -> Vec<f32> {
    let total = (duration_s * sample_rate as f32) as usize;
    let rate = (f1 - f0) as f64 / duration_s as f64;
    (0..total)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            let phase = 2.0 * PI * (f0 as f64 * t + 0.5 * rate * t * t);
            (0.6 * phase.sin()) as f32
        })
        .collect()
}

/// Seeded white noise in `[-0.5, 0.5]`.
pub fn noise(duration_s: f32, seed: u64, sample_rate: u32) -> Vec<f32> {
    let total = (duration_s * sample_rate as f32) as usize;
    let mut rng = StdRng::seed_from_u64(seed);
    (0..total).map(|_| rng.gen_range(-0.5_f32..0.5)).collect()
}

/// Duplicate mono samples into interleaved stereo.
pub fn to_stereo(samples: &[f32]) -> Vec<f32> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        out.push(sample);
        out.push(sample);
    }
    out
}
