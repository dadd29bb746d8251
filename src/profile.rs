//! # Taste Profile
//!
//! Per-artist and per-genre affinity, bounded recency sets, the favorite artist
//! list and the discovery openness parameter. The profile is only mutated
//! through [`TasteProfile::apply`], which the engine calls once per recorded
//! event.
//!
//! ## Update Rules
//!
//! | Action        | Artist delta                                  | Genre delta         |
//! |---------------|-----------------------------------------------|---------------------|
//! | `full_listen` | +3                                            | +2 × completion     |
//! | `like`        | +5                                            | +2 × completion     |
//! | `replay`      | +4                                            | +2 × completion     |
//! | `skip`        | −2 below 30% completion, −0.5 otherwise       | −1                  |
//! | `play`        | +1.5 × completion                             | +2 × completion     |
//!
//! Both affinities are floor-clamped at zero and have no upper bound.

use crate::config::EngineConfig;
use crate::track::{Action, ListeningEvent};
use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};

/// More skips than this inside the skip window lowers openness.
const HEAVY_SKIP_COUNT: usize = 5;
/// Fewer skips than this inside the skip window raises openness.
const LIGHT_SKIP_COUNT: usize = 2;
/// Completion below which a skip counts as an early bail-out.
const EARLY_SKIP_RATIO: f64 = 0.3;

/// Long-lived preference state for one listener.
///
/// Maps and sets are insertion ordered so that ranking ties resolve the same
/// way on every run.
#[derive(Debug, Clone, PartialEq)]
pub struct TasteProfile {
    pub(crate) artist_affinity: IndexMap<String, f64>,
    pub(crate) genre_affinity: IndexMap<String, f64>,
    pub(crate) recently_played: IndexSet<String>,
    pub(crate) recently_skipped: IndexSet<String>,
    pub(crate) favorite_artists: Vec<String>,
    pub(crate) discovery_openness: f64,
    pub(crate) last_updated: DateTime<Utc>,
}

impl TasteProfile {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            artist_affinity: IndexMap::new(),
            genre_affinity: IndexMap::new(),
            recently_played: IndexSet::new(),
            recently_skipped: IndexSet::new(),
            favorite_artists: Vec::new(),
            discovery_openness: config.openness_initial,
            last_updated: Utc::now(),
        }
    }

    /// Applies one event to the profile.
    ///
    /// `recent_skips` is the number of skips among the last
    /// `config.skip_window` history entries, this event included.
    pub fn apply(&mut self, event: &ListeningEvent, recent_skips: usize, config: &EngineConfig) {
        let ratio = event.completion_ratio();

        let artist_delta = match event.action {
            Action::FullListen => 3.0,
            Action::Like => 5.0,
            Action::Replay => 4.0,
            Action::Skip if ratio < EARLY_SKIP_RATIO => -2.0,
            Action::Skip => -0.5,
            Action::Play => ratio * 1.5,
        };
        let artist_score = bump(&mut self.artist_affinity, &event.artist_name, artist_delta);
        trace!(
            "Artist `{}' {:+.2} -> {:.2}",
            event.artist_name,
            artist_delta,
            artist_score
        );

        if event.action == Action::Skip {
            insert_bounded(
                &mut self.recently_skipped,
                &event.track_id,
                config.recent_skipped_capacity,
            );
        }

        if let Some(genre) = event.genre.as_deref() {
            let genre_delta = match event.action {
                Action::Skip => -1.0,
                _ => ratio * 2.0,
            };
            bump(&mut self.genre_affinity, genre, genre_delta);
        }

        insert_bounded(
            &mut self.recently_played,
            &event.track_id,
            config.recent_played_capacity,
        );

        self.refresh_favorites(config.favorites_count);
        self.adjust_openness(recent_skips, config);
        self.last_updated = Utc::now();

        debug!(
            "Recorded {} for `{}' (openness {:.2}, {} favorites)",
            event.action,
            event.track_id,
            self.discovery_openness,
            self.favorite_artists.len()
        );
    }

    /// Recomputes the favorite list as the top `count` artists by affinity.
    ///
    /// The sort is stable, so equal scores keep insertion order.
    pub(crate) fn refresh_favorites(&mut self, count: usize) {
        let mut ranked: Vec<(&String, f64)> = self
            .artist_affinity
            .iter()
            .map(|(name, &score)| (name, score))
            .collect();
        ranked.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        self.favorite_artists = ranked
            .into_iter()
            .take(count)
            .map(|(name, _)| name.clone())
            .collect();
    }

    /// Replaces both recency sets, keeping the newest entries within capacity.
    pub(crate) fn restore_recency(
        &mut self,
        played: Vec<String>,
        skipped: Vec<String>,
        config: &EngineConfig,
    ) {
        self.recently_played.clear();
        for id in &played {
            insert_bounded(&mut self.recently_played, id, config.recent_played_capacity);
        }
        self.recently_skipped.clear();
        for id in &skipped {
            insert_bounded(&mut self.recently_skipped, id, config.recent_skipped_capacity);
        }
    }

    fn adjust_openness(&mut self, recent_skips: usize, config: &EngineConfig) {
        if recent_skips > HEAVY_SKIP_COUNT {
            self.discovery_openness =
                (self.discovery_openness - config.openness_step).max(config.openness_min);
        } else if recent_skips < LIGHT_SKIP_COUNT {
            self.discovery_openness =
                (self.discovery_openness + config.openness_step).min(config.openness_max);
        }
    }

    /// Affinity for `artist`, zero when never seen.
    #[must_use]
    pub fn artist_affinity(&self, artist: &str) -> f64 {
        self.artist_affinity.get(artist).copied().unwrap_or(0.0)
    }

    /// Affinity for `genre`, zero when never seen.
    #[must_use]
    pub fn genre_affinity(&self, genre: &str) -> f64 {
        self.genre_affinity.get(genre).copied().unwrap_or(0.0)
    }

    pub fn artist_scores(&self) -> &IndexMap<String, f64> {
        &self.artist_affinity
    }

    pub fn genre_scores(&self) -> &IndexMap<String, f64> {
        &self.genre_affinity
    }

    /// Highest artist affinity, never below one.
    #[must_use]
    pub fn max_artist_score(&self) -> f64 {
        self.artist_affinity.values().copied().fold(1.0, f64::max)
    }

    /// Highest genre affinity, never below one.
    #[must_use]
    pub fn max_genre_score(&self) -> f64 {
        self.genre_affinity.values().copied().fold(1.0, f64::max)
    }

    pub fn favorite_artists(&self) -> &[String] {
        &self.favorite_artists
    }

    #[must_use]
    pub fn is_favorite(&self, artist: &str) -> bool {
        self.favorite_artists.iter().any(|name| name == artist)
    }

    /// Whether an artist belongs in the familiar bucket when blending.
    #[must_use]
    pub fn is_familiar(&self, artist: &str) -> bool {
        self.is_favorite(artist) || self.artist_affinity(artist) > 3.0
    }

    pub fn recently_played(&self) -> &IndexSet<String> {
        &self.recently_played
    }

    pub fn recently_skipped(&self) -> &IndexSet<String> {
        &self.recently_skipped
    }

    #[must_use]
    pub fn discovery_openness(&self) -> f64 {
        self.discovery_openness
    }

    #[must_use]
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }
}

/// Adds `delta` to the entry for `key`, clamping at zero. Returns the new score.
fn bump(map: &mut IndexMap<String, f64>, key: &str, delta: f64) -> f64 {
    let entry = map.entry(key.to_string()).or_insert(0.0);
    *entry = (*entry + delta).max(0.0);
    *entry
}

/// Inserts into a FIFO-bounded set. Re-inserting an existing member keeps its
/// original position.
fn insert_bounded(set: &mut IndexSet<String>, key: &str, capacity: usize) {
    set.insert(key.to_string());
    while set.len() > capacity {
        set.shift_remove_index(0);
    }
}
