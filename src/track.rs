//! # Track and Listening Event Types
//!
//! Plain data handed to the engine by the caller. A [`Track`] comes from the
//! upstream search backend; a [`ListeningEvent`] is built by the caller after
//! every playback transition it observes on the transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A candidate (or current) track as supplied by the search backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub artist_name: String,
    #[serde(default)]
    pub genre: Option<String>,
    /// View count reported by the video backend, used for the popularity signal.
    #[serde(default)]
    pub view_count: Option<u64>,
}

impl Track {
    pub fn new(id: impl Into<String>, artist_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            artist_name: artist_name.into(),
            genre: None,
            view_count: None,
        }
    }

    #[must_use]
    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    #[must_use]
    pub fn with_views(mut self, views: u64) -> Self {
        self.view_count = Some(views);
        self
    }
}

/// What the listener did with a track.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Play,
    Skip,
    Replay,
    Like,
    FullListen,
}

impl Action {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Skip => "skip",
            Self::Replay => "replay",
            Self::Like => "like",
            Self::FullListen => "full_listen",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "play" => Ok(Self::Play),
            "skip" => Ok(Self::Skip),
            "replay" => Ok(Self::Replay),
            "like" => Ok(Self::Like),
            "full_listen" | "fulllisten" => Ok(Self::FullListen),
            other => Err(anyhow::anyhow!(
                "Unknown action: {other}. Use play, skip, replay, like or full_listen"
            )),
        }
    }
}

/// One observed playback transition. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListeningEvent {
    pub track_id: String,
    pub artist_name: String,
    #[serde(default)]
    pub genre: Option<String>,
    pub action: Action,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub listen_duration_seconds: Option<f64>,
    #[serde(default)]
    pub track_duration_seconds: Option<f64>,
}

impl ListeningEvent {
    /// Event for `track` stamped with the current time.
    pub fn new(track: &Track, action: Action) -> Self {
        Self {
            track_id: track.id.clone(),
            artist_name: track.artist_name.clone(),
            genre: track.genre.clone(),
            action,
            timestamp: Utc::now(),
            listen_duration_seconds: None,
            track_duration_seconds: None,
        }
    }

    #[must_use]
    pub fn with_durations(mut self, listened: f64, total: f64) -> Self {
        self.listen_duration_seconds = Some(listened);
        self.track_duration_seconds = Some(total);
        self
    }

    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Fraction of the track that was heard.
    ///
    /// Falls back to full credit (`1.0`) when either duration is missing or the
    /// track duration is zero. The result is not clamped: a listen that ran
    /// past the reported duration yields a ratio above one.
    #[must_use]
    pub fn completion_ratio(&self) -> f64 {
        match (self.listen_duration_seconds, self.track_duration_seconds) {
            (Some(listened), Some(total)) if total != 0.0 => {
                let ratio = listened / total;
                if ratio.is_finite() {
                    ratio
                } else {
                    1.0
                }
            }
            _ => 1.0,
        }
    }
}
