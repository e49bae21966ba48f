/// Linear-interpolation resampler.
///
/// For each output index `i` the source position is `i * ratio` with
/// `ratio = input_rate / output_rate`; the output sample interpolates the
/// two samples straddling that position.
pub(crate) fn resample_linear(samples: &[f32], input_rate: u32, output_rate: u32) -> Vec<f32> {
    let input_rate = input_rate.max(1);
    let output_rate = output_rate.max(1);
    if samples.is_empty() || input_rate == output_rate {
        return samples.to_vec();
    }

    let ratio = input_rate as f64 / output_rate as f64;
    let out_len = (samples.len() as f64 / ratio) as usize;
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let pos = i as f64 * ratio;
        let idx = pos as usize;
        if idx + 1 < samples.len() {
            let frac = (pos - idx as f64) as f32;
            out.push(samples[idx] * (1.0 - frac) + samples[idx + 1] * frac);
        } else if idx < samples.len() {
            out.push(samples[idx]);
        } else {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_rates_pass_through_unchanged() {
        let input = vec![0.0_f32, 0.5, 1.0];
        assert_eq!(resample_linear(&input, 22_050, 22_050), input);
    }

    #[test]
    fn downsampling_halves_the_length() {
        let input: Vec<f32> = (0..100).map(|i| i as f32 / 100.0).collect();
        let out = resample_linear(&input, 44_100, 22_050);
        assert_eq!(out.len(), 50);
        // A ramp stays a ramp under linear interpolation.
        assert!((out[10] - input[20]).abs() < 1e-6);
    }

    #[test]
    fn upsampling_interpolates_between_neighbors() {
        let input = vec![0.0_f32, 1.0];
        let out = resample_linear(&input, 1, 2);
        assert_eq!(out.len(), 4);
        assert!((out[0] - 0.0).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(resample_linear(&[], 48_000, 22_050).is_empty());
    }
}
