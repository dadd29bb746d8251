//! # Command-Line Interface Module
//!
//! Clap definitions for the `autoqueue` binary. The binary plays the part of
//! a playback client: it loads a user's stored profile, feeds it events or
//! candidate pools, and saves it back.
//!
//! ## Examples
//!
//! ```bash
//! autoqueue record dQw4w9WgXcQ "Rick Astley" like --genre pop
//! autoqueue recommend candidates.json --count 5 --verbose
//! autoqueue strategy --artist "Rick Astley"
//! ```

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "autoqueue")]
#[command(about = "Taste-profile scoring engine for automatic queue replenishment")]
#[command(version)]
pub struct Args {
    /// Profile owner
    #[arg(long, short, global = true, default_value = "default", env = "AUTOQUEUE_USER")]
    pub user: String,

    /// Profile store location (defaults to the platform data directory)
    #[arg(long, global = true, env = "AUTOQUEUE_STORE")]
    pub store: Option<PathBuf>,

    /// Engine config JSON (defaults to `engine.json` in the data directory)
    #[arg(long, global = true, env = "AUTOQUEUE_CONFIG")]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record a playback transition
    ///
    /// Updates artist and genre affinity, recency sets and discovery
    /// openness, then saves the profile.
    Record {
        /// Track identifier from the video backend
        track_id: String,

        /// Artist name
        artist: String,

        /// One of: play, skip, replay, like, full_listen
        action: String,

        /// Genre of the track, if known
        #[arg(long)]
        genre: Option<String>,

        /// Seconds actually listened
        #[arg(long)]
        listened: Option<f64>,

        /// Track length in seconds
        #[arg(long)]
        duration: Option<f64>,

        /// When it happened (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Pick the next tracks from a candidate pool
    ///
    /// Reads a JSON array of tracks (`id`, `artistName`, optional `genre`
    /// and `viewCount`) and prints the picks in queue order.
    Recommend {
        /// Candidate pool JSON file
        candidates: PathBuf,

        /// Session context JSON file
        #[arg(long)]
        context: Option<PathBuf>,

        /// Number of tracks to pick
        #[arg(long, short = 'n', default_value = "3")]
        count: usize,

        /// Print the score breakdown for every pick
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show the advisory search strategy
    Strategy {
        /// Seed artist; prints the matching upstream search query
        #[arg(long)]
        artist: Option<String>,
    },

    /// Show favorites, top genres and openness
    Profile,

    /// Write the exported profile blob
    Export {
        /// Output file (stdout when omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Replace the profile from an exported blob
    Import {
        /// Blob file
        path: PathBuf,
    },

    /// Forget everything learned for this user
    Reset,

    /// List users with a stored profile
    Users,

    /// Generate shell completions
    ///
    /// Usage: autoqueue completion bash > ~/.local/share/bash-completion/completions/autoqueue
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}
