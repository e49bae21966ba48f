//! Engine tuning knobs.
//!
//! Defaults reproduce the production fingerprinting parameters. Every field
//! can be overridden through an environment variable of the same name via
//! [`EngineConfig::from_env`]; unparseable values are logged and ignored.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which fingerprinting variant the engine runs.
///
/// The picker and the pair hash are selected together: registering with one
/// variant and querying with the other would never produce matching hashes,
/// so the choice is a single engine-wide flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FingerprintProfile {
    /// Global-mean threshold picker with the compact 30-bit pair hash.
    Standard,
    /// Band-limited picker with the wide 40-bit pair hash.
    Enhanced,
}

impl fmt::Display for FingerprintProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.write_str("standard"),
            Self::Enhanced => f.write_str("enhanced"),
        }
    }
}

/// Tuning parameters for the full decode -> hash -> match chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Target mono sample rate in Hz.
    pub sample_rate: u32,
    /// FFT window length in seconds.
    pub fft_window_s: f32,
    /// Peak neighborhood side length in cells (enhanced picker).
    pub peak_box: usize,
    /// Fraction of candidate cells retained as peaks (enhanced picker).
    pub point_efficiency: f32,
    /// Lower edge of the valid frequency band in Hz (enhanced picker).
    pub min_hz: f32,
    /// Upper edge of the valid frequency band in Hz (enhanced picker).
    pub max_hz: f32,
    /// Minimum center-to-neighbor-mean power ratio for a peak to survive.
    pub min_amp_ratio: f32,
    /// Temporal cap on accepted peaks.
    pub max_peaks_per_second: usize,
    /// Gap between an anchor and the start of its target zone, in seconds.
    pub target_start: f32,
    /// Duration of the target zone in seconds.
    pub target_t: f32,
    /// Height of the target zone in Hz, centered on the anchor frequency.
    pub target_f: f32,
    /// Maximum target peaks paired with one anchor.
    pub target_zone_points: usize,
    /// Minimum per-song match count for a lookup bucket to survive.
    pub match_threshold: usize,
    /// Alignment histogram bin width in seconds.
    pub hist_bin_s: f32,
    /// Fingerprinting variant used for both ingest and query.
    pub profile: FingerprintProfile,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22_050,
            fft_window_s: 0.046,
            peak_box: 20,
            point_efficiency: 0.3,
            min_hz: 300.0,
            max_hz: 8_000.0,
            min_amp_ratio: 4.0,
            max_peaks_per_second: 15,
            target_start: 0.02,
            target_t: 0.5,
            target_f: 500.0,
            target_zone_points: 5,
            match_threshold: 5,
            hist_bin_s: 0.5,
            profile: FingerprintProfile::Enhanced,
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with any recognized environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        read_env("SAMPLE_RATE", &mut config.sample_rate);
        read_env("FFT_WINDOW_S", &mut config.fft_window_s);
        read_env("PEAK_BOX", &mut config.peak_box);
        read_env("POINT_EFFICIENCY", &mut config.point_efficiency);
        read_env("MIN_HZ", &mut config.min_hz);
        read_env("MAX_HZ", &mut config.max_hz);
        read_env("MIN_AMP_RATIO", &mut config.min_amp_ratio);
        read_env("MAX_PEAKS_PER_SECOND", &mut config.max_peaks_per_second);
        read_env("TARGET_START", &mut config.target_start);
        read_env("TARGET_T", &mut config.target_t);
        read_env("TARGET_F", &mut config.target_f);
        read_env("TARGET_ZONE_POINTS", &mut config.target_zone_points);
        read_env("MATCH_THRESHOLD", &mut config.match_threshold);
        read_env("HIST_BIN_S", &mut config.hist_bin_s);
        config
    }

    /// FFT window length in samples.
    pub fn fft_len(&self) -> usize {
        ((self.sample_rate as f32 * self.fft_window_s) as usize).max(2)
    }

    /// Hop between successive frames in samples (half the window).
    pub fn hop_len(&self) -> usize {
        (self.fft_len() / 2).max(1)
    }
}

fn read_env<T: std::str::FromStr>(name: &str, slot: &mut T) {
    let Ok(raw) = std::env::var(name) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => warn!(name, value = %raw, "Ignoring unparseable tuning override"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_just_over_a_thousand_samples() {
        let config = EngineConfig::default();
        assert_eq!(config.fft_len(), 1014);
        assert_eq!(config.hop_len(), 507);
    }

    #[test]
    fn env_overrides_apply_and_bad_values_are_ignored() {
        unsafe {
            std::env::set_var("MATCH_THRESHOLD", "9");
            std::env::set_var("TARGET_F", "not-a-number");
        }
        let config = EngineConfig::from_env();
        assert_eq!(config.match_threshold, 9);
        assert_eq!(config.target_f, 500.0);
        unsafe {
            std::env::remove_var("MATCH_THRESHOLD");
            std::env::remove_var("TARGET_F");
        }
    }
}
