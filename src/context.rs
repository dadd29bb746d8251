//! Session context supplied by the caller alongside a candidate pool.

use crate::track::Track;
use chrono::{Local, Timelike};
use serde::{Deserialize, Serialize};

/// Coarse local time bucket.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    #[default]
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    #[must_use]
    pub const fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            17..=21 => Self::Evening,
            _ => Self::Night,
        }
    }

    #[must_use]
    pub fn now() -> Self {
        Self::from_hour(Local::now().hour())
    }
}

/// Snapshot of the playback session at the moment recommendations are asked for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionContext {
    pub current_track: Option<Track>,
    pub queue: Vec<Track>,
    /// Last tracks played from the queue, oldest first, at most ten.
    pub recent_queue_tail: Vec<Track>,
    pub time_of_day: TimeOfDay,
    /// Skips so far in this session.
    pub skip_count: u32,
    /// Replays so far in this session.
    pub repeat_count: u32,
    pub is_shuffled: bool,
}

impl SessionContext {
    /// Maximum tracks retained in [`SessionContext::recent_queue_tail`].
    pub const TAIL_LEN: usize = 10;

    #[must_use]
    pub fn with_current(mut self, track: Track) -> Self {
        self.current_track = Some(track);
        self
    }

    /// Sets the queue tail, keeping only the newest [`Self::TAIL_LEN`] tracks.
    #[must_use]
    pub fn with_tail(mut self, mut tail: Vec<Track>) -> Self {
        if tail.len() > Self::TAIL_LEN {
            tail.drain(..tail.len() - Self::TAIL_LEN);
        }
        self.recent_queue_tail = tail;
        self
    }

    /// Artist of the current track, if one is playing.
    pub fn current_artist(&self) -> Option<&str> {
        self.current_track.as_ref().map(|t| t.artist_name.as_str())
    }

    /// Whether `artist` appears among the last `n` tracks of the tail.
    #[must_use]
    pub fn artist_in_last(&self, artist: &str, n: usize) -> bool {
        self.recent_queue_tail
            .iter()
            .rev()
            .take(n)
            .any(|t| t.artist_name == artist)
    }
}
