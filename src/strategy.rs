//! Advisory search strategy derived from recent listening behaviour.
//!
//! The engine never searches; the caller turns a [`Strategy`] into an upstream
//! query with [`Strategy::search_query`] and feeds the results back as
//! candidates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Skip rate above which the listener is steered back to the familiar.
pub const FOCUS_SKIP_RATE: f64 = 0.5;
/// Openness above which new artists are sought out.
pub const DISCOVERY_OPENNESS: f64 = 0.4;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Listener is skipping a lot: stick to what they know.
    FocusMode,
    /// Listener is receptive: look for adjacent artists.
    DiscoveryMode,
    Balanced,
}

impl Strategy {
    /// Picks a strategy from the skip rate and current openness.
    #[must_use]
    pub fn select(skip_rate: f64, openness: f64) -> Self {
        if skip_rate > FOCUS_SKIP_RATE {
            Self::FocusMode
        } else if openness > DISCOVERY_OPENNESS {
            Self::DiscoveryMode
        } else {
            Self::Balanced
        }
    }

    /// Upstream search query seeded with `artist`.
    #[must_use]
    pub fn search_query(self, artist: &str) -> String {
        match self {
            Self::FocusMode => format!("{artist} best songs"),
            Self::DiscoveryMode => format!("similar to {artist} new artists"),
            Self::Balanced => format!("{artist} radio"),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FocusMode => "focus_mode",
            Self::DiscoveryMode => "discovery_mode",
            Self::Balanced => "balanced",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_thresholds() {
        assert_eq!(Strategy::select(0.6, 0.5), Strategy::FocusMode);
        assert_eq!(Strategy::select(0.5, 0.45), Strategy::DiscoveryMode);
        assert_eq!(Strategy::select(0.2, 0.4), Strategy::Balanced);
        assert_eq!(Strategy::select(0.0, 0.3), Strategy::Balanced);
    }

    #[test]
    fn test_search_queries() {
        assert_eq!(Strategy::FocusMode.search_query("Nina"), "Nina best songs");
        assert_eq!(
            Strategy::DiscoveryMode.search_query("Nina"),
            "similar to Nina new artists"
        );
        assert_eq!(Strategy::Balanced.search_query("Nina"), "Nina radio");
    }

    #[test]
    fn test_display_matches_serde() {
        let json = serde_json::to_string(&Strategy::DiscoveryMode).unwrap();
        assert_eq!(json, format!("\"{}\"", Strategy::DiscoveryMode));
    }
}
