//! # Recommendation Engine
//!
//! Owns one [`TasteProfile`] and the rolling listening history for a playback
//! session. The caller constructs it, feeds it [`ListeningEvent`]s as playback
//! transitions happen, and asks it to pick the next few tracks out of a pool of
//! candidates it fetched itself.
//!
//! ## Blending
//!
//! Ranked candidates are split into a *familiar* bucket (favorite artists or
//! artist affinity above 3) and a *discovery* bucket. With openness `o` and a
//! request for `n` tracks, `ceil(n * (1 - o))` come from the familiar bucket
//! and the rest from discovery. Buckets that run short are backfilled from the
//! overall ranking.
//!
//! ## Persistence
//!
//! [`RecommendationEngine::export_profile`] produces a JSON blob the caller can
//! store wherever it likes. Import parses and validates the whole blob before
//! touching any state, so a rejected blob leaves the engine unchanged. Import
//! replaces the four long-lived profile fields only; recency sets and history
//! belong to the session.
//!
//! Callers that persist across process restarts (the CLI does) carry the
//! session half separately through [`RecommendationEngine::session_state`] and
//! [`RecommendationEngine::restore_session`].

use crate::config::EngineConfig;
use crate::context::SessionContext;
use crate::profile::TasteProfile;
use crate::scoring::{self, ScoreBreakdown};
use crate::strategy::Strategy;
use crate::track::{Action, ListeningEvent, Track};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Version tag written into exported blobs.
pub const EXPORT_VERSION: u32 = 1;

/// Familiar/discovery taste engine for one session.
#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    config: EngineConfig,
    profile: TasteProfile,
    history: VecDeque<ListeningEvent>,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendationEngine {
    /// Engine with the reference policy.
    pub fn new() -> Self {
        Self::from_valid(EngineConfig::default())
    }

    /// Engine with a custom policy.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails [`EngineConfig::validate`].
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate().context("Rejected engine config")?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: EngineConfig) -> Self {
        Self {
            profile: TasteProfile::new(&config),
            history: VecDeque::with_capacity(config.history_window + 1),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn profile(&self) -> &TasteProfile {
        &self.profile
    }

    #[cfg(test)]
    pub(crate) fn profile_mut(&mut self) -> &mut TasteProfile {
        &mut self.profile
    }

    /// Rolling history, oldest first.
    pub fn history(&self) -> &VecDeque<ListeningEvent> {
        &self.history
    }

    /// Records a playback transition and updates the profile.
    ///
    /// Never fails: missing genre or durations simply skip the updates that
    /// depend on them.
    pub fn record_event(&mut self, event: ListeningEvent) {
        self.history.push_back(event);
        while self.history.len() > self.config.history_window {
            self.history.pop_front();
        }

        let recent_skips = self.recent_skip_count();
        if let Some(event) = self.history.back() {
            self.profile.apply(event, recent_skips, &self.config);
        }
    }

    /// Skips among the last `skip_window` history entries.
    #[must_use]
    pub fn recent_skip_count(&self) -> usize {
        self.history
            .iter()
            .rev()
            .take(self.config.skip_window)
            .filter(|e| e.action == Action::Skip)
            .count()
    }

    /// Skip rate over the skip window.
    ///
    /// Always divides by the full window length, so a short history reads as
    /// a low skip rate.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn skip_rate(&self) -> f64 {
        self.recent_skip_count() as f64 / self.config.skip_window as f64
    }

    /// Scores a single candidate against the current profile.
    #[must_use]
    pub fn score(&self, candidate: &Track, context: &SessionContext) -> ScoreBreakdown {
        scoring::score_track(candidate, &self.profile, context, &self.config.weights)
    }

    /// Picks up to `count` tracks from `candidates` in queue order.
    #[must_use]
    pub fn recommend(
        &self,
        candidates: &[Track],
        context: &SessionContext,
        count: usize,
    ) -> Vec<Track> {
        self.recommend_scored(candidates, context, count)
            .into_iter()
            .map(|(track, _)| track)
            .collect()
    }

    /// Like [`Self::recommend`], keeping each pick's score breakdown.
    #[must_use]
    pub fn recommend_scored(
        &self,
        candidates: &[Track],
        context: &SessionContext,
        count: usize,
    ) -> Vec<(Track, ScoreBreakdown)> {
        if count == 0 || candidates.is_empty() {
            return Vec::new();
        }

        let ranked =
            scoring::rank_candidates(candidates, &self.profile, context, &self.config.weights);
        let (familiar, discovery): (Vec<_>, Vec<_>) = ranked
            .iter()
            .partition(|(track, _)| self.profile.is_familiar(&track.artist_name));

        let (target_familiar, target_discovery) = self.blend_targets(count);
        debug!(
            "Recommending {count} of {} candidates: {} familiar available (target {target_familiar}), {} discovery available (target {target_discovery})",
            candidates.len(),
            familiar.len(),
            discovery.len()
        );

        let mut seen: HashSet<&str> = HashSet::with_capacity(count);
        let mut picks: Vec<(Track, ScoreBreakdown)> = Vec::with_capacity(count);

        take_ranked(familiar, target_familiar, &mut seen, &mut picks);
        take_ranked(discovery, target_discovery, &mut seen, &mut picks);

        if picks.len() < count {
            let shortfall = count - picks.len();
            take_ranked(&ranked, shortfall, &mut seen, &mut picks);
            debug!("Backfilled up to {shortfall} picks from the overall ranking");
        }

        picks
    }

    /// Familiar and discovery counts for a request of `count` tracks.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn blend_targets(&self, count: usize) -> (usize, usize) {
        let openness = self.profile.discovery_openness();
        let familiar = ((count as f64) * (1.0 - openness)).ceil().max(0.0) as usize;
        let familiar = familiar.min(count);
        (familiar, count - familiar)
    }

    /// Advisory search strategy for the caller's next candidate fetch.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        Strategy::select(self.skip_rate(), self.profile.discovery_openness())
    }

    /// Serializes the profile and the most recent history to a JSON blob.
    #[must_use]
    pub fn export_profile(&self) -> String {
        let snapshot = ProfileSnapshot::capture(self);
        let blob = serde_json::to_string(&snapshot);
        debug_assert!(blob.is_ok(), "profile export failed: {blob:?}");
        blob.unwrap_or_else(|e| {
            warn!("Profile export failed: {e}");
            String::new()
        })
    }

    /// Replaces artist affinity, genre affinity, favorites and openness from
    /// an exported blob, atomically.
    ///
    /// Recency sets and the rolling history are left as they are.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob is not valid JSON, has an unsupported
    /// version, or carries out-of-range values. State is untouched on error.
    pub fn try_import_profile(&mut self, blob: &str) -> Result<()> {
        let snapshot: ProfileSnapshot =
            serde_json::from_str(blob).context("Profile blob is not valid JSON")?;
        snapshot.validate(&self.config)?;

        debug!(
            "Imported profile with {} artists, {} genres",
            snapshot.artist_affinity.len(),
            snapshot.genre_affinity.len()
        );
        let profile = &mut self.profile;
        profile.artist_affinity = snapshot.artist_affinity.into_iter().collect();
        profile.genre_affinity = snapshot.genre_affinity.into_iter().collect();
        profile.favorite_artists = snapshot.favorite_artists;
        profile.discovery_openness = snapshot.discovery_openness;
        profile.last_updated = Utc::now();
        Ok(())
    }

    /// Replaces the profile from an exported blob, logging instead of failing.
    pub fn import_profile(&mut self, blob: &str) {
        if let Err(e) = self.try_import_profile(blob) {
            warn!("Ignoring profile import: {e:#}");
        }
    }

    /// Recency sets and rolling history, for callers that outlive a process.
    #[must_use]
    pub fn session_state(&self) -> SessionState {
        SessionState {
            recently_played: self.profile.recently_played.iter().cloned().collect(),
            recently_skipped: self.profile.recently_skipped.iter().cloned().collect(),
            history: self.history.iter().cloned().collect(),
        }
    }

    /// Restores state saved by [`Self::session_state`].
    ///
    /// Entries beyond the configured capacities are dropped oldest first.
    /// Profile affinities are not touched.
    pub fn restore_session(&mut self, state: SessionState) {
        self.profile
            .restore_recency(state.recently_played, state.recently_skipped, &self.config);
        self.history = state.history.into();
        while self.history.len() > self.config.history_window {
            self.history.pop_front();
        }
        debug!(
            "Restored session with {} history events, {} played, {} skipped",
            self.history.len(),
            self.profile.recently_played.len(),
            self.profile.recently_skipped.len()
        );
    }

    /// Back to a fresh profile and empty history.
    pub fn reset(&mut self) {
        self.profile = TasteProfile::new(&self.config);
        self.history.clear();
        debug!("Engine reset");
    }
}

/// Session half of the engine state, never part of the exported profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionState {
    /// Oldest first.
    pub recently_played: Vec<String>,
    /// Oldest first.
    pub recently_skipped: Vec<String>,
    pub history: Vec<ListeningEvent>,
}

/// Wire shape of an exported profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileSnapshot {
    version: u32,
    artist_affinity: Vec<(String, f64)>,
    genre_affinity: Vec<(String, f64)>,
    favorite_artists: Vec<String>,
    discovery_openness: f64,
    #[serde(default)]
    history: Vec<ListeningEvent>,
    #[serde(default = "Utc::now")]
    exported_at: DateTime<Utc>,
}

impl ProfileSnapshot {
    fn capture(engine: &RecommendationEngine) -> Self {
        let profile = &engine.profile;
        let skip = engine
            .history
            .len()
            .saturating_sub(engine.config.export_history);
        Self {
            version: EXPORT_VERSION,
            artist_affinity: entries(profile.artist_scores()),
            genre_affinity: entries(profile.genre_scores()),
            favorite_artists: profile.favorite_artists().to_vec(),
            discovery_openness: profile.discovery_openness(),
            history: engine.history.iter().skip(skip).cloned().collect(),
            exported_at: Utc::now(),
        }
    }

    fn validate(&self, config: &EngineConfig) -> Result<()> {
        if self.version != EXPORT_VERSION {
            anyhow::bail!("Unsupported profile version {}", self.version);
        }
        let bad = self
            .artist_affinity
            .iter()
            .chain(&self.genre_affinity)
            .find(|(_, score)| !score.is_finite() || *score < 0.0);
        if let Some((name, score)) = bad {
            anyhow::bail!("Affinity for `{name}' out of range: {score}");
        }
        if !(config.openness_min..=config.openness_max).contains(&self.discovery_openness) {
            anyhow::bail!(
                "Discovery openness {} outside [{}, {}]",
                self.discovery_openness,
                config.openness_min,
                config.openness_max
            );
        }
        Ok(())
    }
}

/// Moves up to `limit` not-yet-seen tracks from a ranked bucket into `picks`.
fn take_ranked<'a>(
    bucket: impl IntoIterator<Item = &'a (&'a Track, ScoreBreakdown)>,
    limit: usize,
    seen: &mut HashSet<&'a str>,
    picks: &mut Vec<(Track, ScoreBreakdown)>,
) {
    let mut taken = 0;
    for &(track, breakdown) in bucket {
        if taken >= limit {
            break;
        }
        if seen.insert(track.id.as_str()) {
            picks.push((track.clone(), breakdown));
            taken += 1;
        }
    }
}

fn entries(map: &indexmap::IndexMap<String, f64>) -> Vec<(String, f64)> {
    map.iter().map(|(k, &v)| (k.clone(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn event(track: &str, artist: &str, action: Action) -> ListeningEvent {
        ListeningEvent::new(&Track::new(track, artist), action)
    }

    /// Profile with `familiar` artists at affinity 10 and openness 0.3.
    fn seeded_engine(familiar: &[&str]) -> RecommendationEngine {
        let mut engine = RecommendationEngine::new();
        let profile = engine.profile_mut();
        for artist in familiar {
            profile.artist_affinity.insert((*artist).to_string(), 10.0);
        }
        profile.refresh_favorites(10);
        engine
    }

    #[test]
    fn test_like_on_new_artist() {
        let mut engine = RecommendationEngine::new();
        engine.record_event(event("t1", "Artist X", Action::Like));

        assert_relative_eq!(engine.profile().artist_affinity("Artist X"), 5.0);
        assert_eq!(engine.profile().favorite_artists(), ["Artist X".to_string()]);
    }

    #[test]
    fn test_history_keeps_newest_fifty() {
        let mut engine = RecommendationEngine::new();
        for i in 0..60 {
            engine.record_event(event(&format!("t{i}"), "A", Action::Play));
        }
        assert_eq!(engine.history().len(), 50);
        assert_eq!(engine.history().front().unwrap().track_id, "t10");
        assert_eq!(engine.history().back().unwrap().track_id, "t59");
    }

    #[test]
    fn test_six_skips_lower_openness_and_focus() {
        let mut engine = RecommendationEngine::new();
        for i in 0..5 {
            engine.record_event(event(&format!("s{i}"), "A", Action::Skip));
        }
        let before = engine.profile().discovery_openness();
        engine.record_event(event("s5", "A", Action::Skip));

        assert_relative_eq!(engine.profile().discovery_openness(), before - 0.05);
        assert_relative_eq!(engine.skip_rate(), 0.6);
        assert_eq!(engine.strategy(), Strategy::FocusMode);
    }

    #[test]
    fn test_skip_rate_divides_by_full_window() {
        let mut engine = RecommendationEngine::new();
        engine.record_event(event("s", "A", Action::Skip));
        assert_relative_eq!(engine.skip_rate(), 0.1);
    }

    #[test]
    fn test_strategy_discovery_and_balanced() {
        let mut engine = RecommendationEngine::new();
        assert_eq!(engine.strategy(), Strategy::Balanced);

        engine.record_event(event("a", "A", Action::Play));
        engine.record_event(event("b", "A", Action::Play));
        // Two calm events push openness from 0.3 to 0.4, a third past it.
        assert_eq!(engine.strategy(), Strategy::Balanced);
        engine.record_event(event("c", "A", Action::Play));
        assert_eq!(engine.strategy(), Strategy::DiscoveryMode);
    }

    #[test]
    fn test_blend_targets_at_default_openness() {
        let engine = RecommendationEngine::new();
        assert_eq!(engine.blend_targets(10), (7, 3));
        assert_eq!(engine.blend_targets(3), (3, 0));
        assert_eq!(engine.blend_targets(0), (0, 0));
    }

    #[test]
    fn test_blend_ratio_selection() {
        let familiar_artists: Vec<String> = (0..8).map(|i| format!("Fam {i}")).collect();
        let refs: Vec<&str> = familiar_artists.iter().map(String::as_str).collect();
        let engine = seeded_engine(&refs);

        let mut candidates: Vec<Track> = familiar_artists
            .iter()
            .enumerate()
            .map(|(i, a)| Track::new(format!("f{i}"), a.as_str()))
            .collect();
        candidates.extend((0..5).map(|i| Track::new(format!("d{i}"), format!("New {i}"))));

        let picks = engine.recommend(&candidates, &SessionContext::default(), 10);
        assert_eq!(picks.len(), 10);

        let familiar = picks
            .iter()
            .filter(|t| engine.profile().is_familiar(&t.artist_name))
            .count();
        assert_eq!(familiar, 7);
        assert_eq!(picks.len() - familiar, 3);
        // Familiar picks precede discovery picks.
        assert!(picks[..7].iter().all(|t| t.id.starts_with('f')));
    }

    #[test]
    fn test_backfill_when_bucket_runs_short() {
        let engine = seeded_engine(&["Fam"]);
        let candidates = vec![
            Track::new("f0", "Fam"),
            Track::new("d0", "New 0"),
            Track::new("d1", "New 1"),
            Track::new("d2", "New 2"),
        ];
        let picks = engine.recommend(&candidates, &SessionContext::default(), 4);
        assert_eq!(picks.len(), 4);
        assert_eq!(picks[0].id, "f0");
    }

    #[test]
    fn test_recommend_never_duplicates() {
        let engine = seeded_engine(&["Fam"]);
        let candidates = vec![
            Track::new("same", "Fam"),
            Track::new("same", "Fam"),
            Track::new("other", "New"),
        ];
        let picks = engine.recommend(&candidates, &SessionContext::default(), 5);
        let ids: HashSet<&str> = picks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), picks.len());
        assert_eq!(picks.len(), 2);
    }

    #[test]
    fn test_empty_pool_and_zero_count() {
        let engine = RecommendationEngine::new();
        assert!(engine.recommend(&[], &SessionContext::default(), 3).is_empty());
        let candidates = vec![Track::new("a", "A")];
        assert!(engine.recommend(&candidates, &SessionContext::default(), 0).is_empty());
    }

    #[test]
    fn test_recently_played_sinks_in_ranking() {
        let mut engine = RecommendationEngine::new();
        engine.record_event(event("heard", "A", Action::Play));
        let candidates = vec![Track::new("heard", "A"), Track::new("fresh", "A")];
        let picks = engine.recommend(&candidates, &SessionContext::default(), 1);
        assert_eq!(picks[0].id, "fresh");
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut engine = RecommendationEngine::new();
        for i in 0..30 {
            let track = Track::new(format!("t{i}"), format!("Artist {}", i % 4))
                .with_genre(if i % 2 == 0 { "jazz" } else { "soul" });
            let action = match i % 5 {
                0 => Action::Skip,
                1 => Action::Like,
                2 => Action::Play,
                3 => Action::Replay,
                _ => Action::FullListen,
            };
            engine.record_event(ListeningEvent::new(&track, action).with_durations(70.0, 210.0));
        }
        let blob = engine.export_profile();

        let mut restored = RecommendationEngine::new();
        restored.import_profile(&blob);

        assert_eq!(restored.profile().artist_scores(), engine.profile().artist_scores());
        assert_eq!(restored.profile().genre_scores(), engine.profile().genre_scores());
        assert_eq!(
            restored.profile().favorite_artists(),
            engine.profile().favorite_artists()
        );
        assert_eq!(
            restored.profile().discovery_openness(),
            engine.profile().discovery_openness()
        );
        assert!(restored.history().is_empty());
        assert!(restored.profile().recently_played().is_empty());
    }

    #[test]
    fn test_export_carries_recent_history() {
        let mut engine = RecommendationEngine::new();
        for i in 0..30 {
            engine.record_event(event(&format!("t{i}"), "A", Action::Play));
        }
        let snapshot: ProfileSnapshot = serde_json::from_str(&engine.export_profile()).unwrap();
        assert_eq!(snapshot.history.len(), 20);
        assert_eq!(snapshot.history.first().unwrap().track_id, "t10");
    }

    #[test]
    fn test_import_leaves_session_state_alone() {
        let donor = seeded_engine(&["Donor"]);
        let blob = donor.export_profile();

        let mut engine = RecommendationEngine::new();
        for i in 0..30 {
            engine.record_event(event(&format!("p{i}"), "A", Action::Play));
        }
        engine.record_event(event("bad", "B", Action::Skip));
        let session = engine.session_state();

        engine.try_import_profile(&blob).unwrap();

        assert_eq!(engine.session_state(), session);
        assert_eq!(engine.profile().recently_played().len(), 20);
        assert!(engine.profile().recently_skipped().contains("bad"));
        assert_eq!(engine.history().len(), 31);
        assert_eq!(engine.profile().favorite_artists(), ["Donor"]);
        assert_eq!(engine.profile().artist_affinity("A"), 0.0);
    }

    #[test]
    fn test_session_state_restores_repetition_penalty() {
        let mut engine = RecommendationEngine::new();
        engine.record_event(event("bad", "Band", Action::Skip));
        engine.record_event(event("ok", "Band", Action::FullListen));

        let mut restored = RecommendationEngine::new();
        restored.import_profile(&engine.export_profile());
        restored.restore_session(engine.session_state());

        let pool = vec![Track::new("bad", "Band"), Track::new("good", "Band")];
        let picks = restored.recommend_scored(&pool, &SessionContext::default(), 2);
        assert_eq!(picks[0].0.id, "good");
        assert_relative_eq!(picks[1].1.repetition_penalty, -80.0);
        assert_eq!(restored.history(), engine.history());
        assert_eq!(restored.strategy(), engine.strategy());
    }

    #[test]
    fn test_restore_session_respects_history_window() {
        let mut engine = RecommendationEngine::new();
        let state = SessionState {
            history: (0..70).map(|i| event(&format!("t{i}"), "A", Action::Play)).collect(),
            ..SessionState::default()
        };
        engine.restore_session(state);
        assert_eq!(engine.history().len(), 50);
        assert_eq!(engine.history().front().unwrap().track_id, "t20");
    }

    #[test]
    fn test_with_config_rejects_invalid_policy() {
        let zero_window = EngineConfig {
            history_window: 0,
            ..EngineConfig::default()
        };
        assert!(RecommendationEngine::with_config(zero_window).is_err());

        let negative_step = EngineConfig {
            openness_step: -0.05,
            ..EngineConfig::default()
        };
        assert!(RecommendationEngine::with_config(negative_step).is_err());

        let mut engine = RecommendationEngine::with_config(EngineConfig {
            history_window: 1,
            ..EngineConfig::default()
        })
        .unwrap();
        engine.record_event(event("t", "A", Action::Like));
        assert_eq!(engine.history().len(), 1);
        assert_relative_eq!(engine.profile().artist_affinity("A"), 5.0);
    }

    #[test]
    fn test_corrupt_import_leaves_state_untouched() {
        let mut engine = RecommendationEngine::new();
        engine.record_event(event("t", "Keep", Action::Like));
        let before = engine.profile().clone();

        engine.import_profile("{ not json");
        assert_eq!(engine.profile(), &before);

        let bad_openness = r#"{"version":1,"artistAffinity":[["X",1.0]],"genreAffinity":[],"favoriteArtists":["X"],"discoveryOpenness":0.9}"#;
        assert!(engine.try_import_profile(bad_openness).is_err());
        assert_eq!(engine.profile(), &before);

        let negative = r#"{"version":1,"artistAffinity":[["X",-1.0]],"genreAffinity":[],"favoriteArtists":["X"],"discoveryOpenness":0.3}"#;
        assert!(engine.try_import_profile(negative).is_err());
        assert_eq!(engine.profile().artist_affinity("Keep"), 5.0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut engine = RecommendationEngine::new();
        engine.record_event(event("t", "A", Action::Like));
        engine.reset();
        assert!(engine.history().is_empty());
        assert!(engine.profile().artist_scores().is_empty());
        assert!(engine.profile().favorite_artists().is_empty());
        assert_relative_eq!(engine.profile().discovery_openness(), 0.3);
    }
}
