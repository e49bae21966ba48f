//! Alignment scoring for candidate songs.
//!
//! A genuine match produces many hash pairs whose `db_offset - query_offset`
//! difference is essentially constant, so the histogram of those deltas has
//! one dominant bin. Collisions and noise scatter uniformly and never build
//! a tall bin.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::store::MatchOffsets;

/// One scored candidate from a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Candidate song id.
    pub song_id: String,
    /// Height of the tallest alignment-histogram bin.
    pub score: u32,
    /// Total matched hash pairs for this song.
    pub match_count: usize,
}

/// Tallest bin of the offset-delta histogram with bins of `bin_s` seconds.
pub fn histogram_score(offsets: &[(f32, f32)], bin_s: f32) -> u32 {
    if offsets.is_empty() || bin_s <= 0.0 {
        return 0;
    }
    let mut histogram: BTreeMap<i64, u32> = BTreeMap::new();
    for (db_offset, query_offset) in offsets {
        let delta = (db_offset - query_offset) as f64;
        let bin = (delta / bin_s as f64).floor() as i64;
        *histogram.entry(bin).or_insert(0) += 1;
    }
    histogram.values().copied().max().unwrap_or(0)
}

/// Score every candidate and rank them: score descending, then match count
/// descending, then song id ascending so the order is total.
pub fn rank_candidates(matches: &HashMap<String, MatchOffsets>, bin_s: f32) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = matches
        .iter()
        .map(|(song_id, offsets)| Candidate {
            song_id: song_id.clone(),
            score: histogram_score(offsets, bin_s),
            match_count: offsets.len(),
        })
        .collect();
    candidates.sort_unstable_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.match_count.cmp(&a.match_count))
            .then_with(|| a.song_id.cmp(&b.song_id))
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_offsets_pile_into_one_bin() {
        // All deltas sit near 5.0 s.
        let offsets: Vec<(f32, f32)> = (0..10)
            .map(|i| (5.1 + i as f32, 0.08 + i as f32))
            .collect();
        assert_eq!(histogram_score(&offsets, 0.5), 10);
    }

    #[test]
    fn scattered_offsets_score_low() {
        let offsets: Vec<(f32, f32)> = (0..10).map(|i| (i as f32 * 3.0, 0.0)).collect();
        assert_eq!(histogram_score(&offsets, 0.5), 1);
    }

    #[test]
    fn negative_deltas_bin_correctly() {
        // Query clip starts before the stored offset window: deltas < 0.
        let offsets = vec![(1.0, 3.1), (1.2, 3.3), (1.4, 3.5)];
        assert_eq!(histogram_score(&offsets, 0.5), 3);
    }

    #[test]
    fn score_is_monotone_under_adding_aligned_pairs() {
        let mut offsets = vec![(5.1_f32, 0.05_f32), (6.1, 1.05)];
        let mut last = histogram_score(&offsets, 0.5);
        for i in 0..5 {
            // Each new pair shares the dominant delta of ~5.05 s.
            offsets.push((7.0 + i as f32, 1.95 + i as f32));
            let score = histogram_score(&offsets, 0.5);
            assert!(score >= last);
            last = score;
        }
        assert_eq!(last, 7);
    }

    #[test]
    fn empty_offsets_score_zero() {
        assert_eq!(histogram_score(&[], 0.5), 0);
    }

    #[test]
    fn ranking_breaks_ties_on_match_count_then_id() {
        let mut matches: HashMap<String, MatchOffsets> = HashMap::new();
        // Both score 2; "bbb" has more raw matches.
        matches.insert("aaa".into(), vec![(1.0, 0.9), (1.1, 1.0)]);
        matches.insert(
            "bbb".into(),
            vec![(1.0, 0.9), (1.1, 1.0), (9.0, 1.0)],
        );
        // Same score and count as "aaa": id decides.
        matches.insert("aab".into(), vec![(1.0, 0.9), (1.1, 1.0)]);

        let ranked = rank_candidates(&matches, 0.5);
        assert_eq!(ranked[0].song_id, "bbb");
        assert_eq!(ranked[1].song_id, "aaa");
        assert_eq!(ranked[2].song_id, "aab");
    }
}
