//! Candidate scoring against the taste profile and session context.
//!
//! Every candidate gets six sub-scores on a roughly 0–100 scale (penalties go
//! negative) which are combined as a fixed weighted sum:
//!
//! ```text
//! total = 0.30 * artist_similarity
//!       + 0.20 * genre_similarity
//!       + 0.25 * mood_compatibility
//!       + 0.10 * novelty_bonus
//!       + 0.10 * repetition_penalty
//!       + 0.05 * popularity_signal
//! ```

use crate::context::SessionContext;
use crate::profile::TasteProfile;
use crate::track::Track;
use log::trace;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Weights of the six sub-scores. The defaults sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub artist_similarity: f64,
    pub genre_similarity: f64,
    pub mood_compatibility: f64,
    pub novelty_bonus: f64,
    pub repetition_penalty: f64,
    pub popularity_signal: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            artist_similarity: 0.30,
            genre_similarity: 0.20,
            mood_compatibility: 0.25,
            novelty_bonus: 0.10,
            repetition_penalty: 0.10,
            popularity_signal: 0.05,
        }
    }
}

/// Per-candidate scoring result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub total: f64,
    pub artist_similarity: f64,
    pub genre_similarity: f64,
    pub mood_compatibility: f64,
    pub novelty_bonus: f64,
    pub repetition_penalty: f64,
    pub popularity_signal: f64,
}

/// Tracks the last few queue entries are checked against for artist repeats.
const ARTIST_REPEAT_DEPTH: usize = 3;

/// Scores one candidate. Pure: reads the profile and context, changes nothing.
#[must_use]
pub fn score_track(
    candidate: &Track,
    profile: &TasteProfile,
    context: &SessionContext,
    weights: &ScoringWeights,
) -> ScoreBreakdown {
    let artist = candidate.artist_name.as_str();
    let same_artist = context.current_artist() == Some(artist);
    let affinity = profile.artist_affinity(artist);

    let artist_similarity = if same_artist {
        80.0
    } else if profile.is_favorite(artist) {
        90.0 + affinity
    } else {
        affinity / profile.max_artist_score() * 70.0
    };

    let genre_similarity = match candidate.genre.as_deref() {
        None => 50.0,
        Some(genre) => profile.genre_affinity(genre) / profile.max_genre_score() * 100.0,
    };

    let mood_compatibility = if context.skip_count > 3 {
        if profile.is_favorite(artist) {
            90.0
        } else {
            40.0
        }
    } else if context.repeat_count > 0 {
        if same_artist {
            95.0
        } else {
            60.0
        }
    } else {
        70.0
    };

    let openness = profile.discovery_openness();
    let novelty_bonus = if affinity == 0.0 {
        openness * 100.0
    } else if affinity < 3.0 {
        openness * 50.0
    } else {
        10.0
    };

    // Recently played is checked first, so a track in both sets gets -80.
    let repetition_penalty = if profile.recently_played().contains(&candidate.id) {
        -80.0
    } else if profile.recently_skipped().contains(&candidate.id) {
        -100.0
    } else if context.artist_in_last(artist, ARTIST_REPEAT_DEPTH) {
        -40.0
    } else {
        0.0
    };

    let popularity_signal = popularity(candidate.view_count.unwrap_or(0));

    let total = artist_similarity * weights.artist_similarity
        + genre_similarity * weights.genre_similarity
        + mood_compatibility * weights.mood_compatibility
        + novelty_bonus * weights.novelty_bonus
        + repetition_penalty * weights.repetition_penalty
        + popularity_signal * weights.popularity_signal;

    trace!(
        "Scored `{}' by `{}': {:.2} (artist {:.1}, genre {:.1}, mood {:.1}, novelty {:.1}, repeat {:.1}, pop {:.1})",
        candidate.id,
        artist,
        total,
        artist_similarity,
        genre_similarity,
        mood_compatibility,
        novelty_bonus,
        repetition_penalty,
        popularity_signal
    );

    ScoreBreakdown {
        total,
        artist_similarity,
        genre_similarity,
        mood_compatibility,
        novelty_bonus,
        repetition_penalty,
        popularity_signal,
    }
}

const fn popularity(views: u64) -> f64 {
    match views {
        v if v > 10_000_000 => 20.0,
        v if v > 1_000_000 => 15.0,
        v if v > 100_000 => 10.0,
        _ => 5.0,
    }
}

/// Lazily scores a slice of candidates.
#[must_use = "Iterator should be consumed to calculate scores"]
pub fn batch_score<'a>(
    candidates: &'a [Track],
    profile: &'a TasteProfile,
    context: &'a SessionContext,
    weights: &'a ScoringWeights,
) -> impl Iterator<Item = (&'a Track, ScoreBreakdown)> + 'a {
    candidates
        .iter()
        .map(move |track| (track, score_track(track, profile, context, weights)))
}

/// Scores and sorts candidates, highest total first.
///
/// The sort is stable: equal totals keep the order the caller supplied.
#[must_use]
pub fn rank_candidates<'a>(
    candidates: &'a [Track],
    profile: &'a TasteProfile,
    context: &'a SessionContext,
    weights: &'a ScoringWeights,
) -> Vec<(&'a Track, ScoreBreakdown)> {
    let mut ranked: Vec<_> = batch_score(candidates, profile, context, weights).collect();
    ranked.sort_by(|(_, a), (_, b)| b.total.partial_cmp(&a.total).unwrap_or(Ordering::Equal));
    ranked
}

/// Summary statistics over a batch of scores.
pub mod statistics {
    use super::ScoreBreakdown;

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct ScoreStatistics {
        pub mean: f64,
        pub min: f64,
        pub max: f64,
        pub count: usize,
    }

    /// Returns `None` for an empty batch.
    #[must_use]
    pub fn summarize<'a>(
        scores: impl IntoIterator<Item = &'a ScoreBreakdown>,
    ) -> Option<ScoreStatistics> {
        let totals: Vec<f64> = scores.into_iter().map(|s| s.total).collect();
        if totals.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let mean = totals.iter().sum::<f64>() / totals.len() as f64;
        Some(ScoreStatistics {
            mean,
            min: totals.iter().copied().fold(f64::INFINITY, f64::min),
            max: totals.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            count: totals.len(),
        })
    }
}
