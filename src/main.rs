//! # autoqueue
//!
//! Command-line front end for the taste-profile engine. Each invocation loads
//! the user's profile from the SQLite store, runs one command, and saves the
//! profile back when it changed.
//!
//! ## Usage
//!
//! ```bash
//! # Tell the engine what happened
//! autoqueue record abc123 "Nina Simone" full_listen --genre jazz
//! autoqueue record def456 "Some Band" skip --listened 12 --duration 240
//!
//! # Ask for the next three tracks out of a candidate pool
//! autoqueue recommend pool.json --context session.json -n 3
//!
//! # Which upstream query should the caller run next?
//! autoqueue strategy --artist "Nina Simone"
//! ```

use anyhow::{Context, Result};
use autoqueue::cli::{self, Args, Command};
use autoqueue::completion;
use autoqueue::config::{self, RuntimeConfig};
use autoqueue::scoring::statistics;
use autoqueue::{
    Action, ListeningEvent, ProfileStore, RecommendationEngine, SessionContext, TimeOfDay, Track,
};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use std::fs;
use std::path::Path;

/// Initializes logging, parses arguments and routes the command.
///
/// Logging is controlled via `RUST_LOG`:
/// - `RUST_LOG=debug autoqueue recommend pool.json`
/// - `RUST_LOG=autoqueue::scoring=trace autoqueue recommend pool.json`
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    if let Command::Completion { shell } = args.command {
        let mut cmd = Args::command();
        completion::generate_completions(completion::shell_to_completion_shell(shell), &mut cmd);
        return Ok(());
    }

    let runtime = RuntimeConfig::resolve(args.store.clone(), args.config.clone())?;
    debug!("Runtime paths: {runtime:?}");
    let engine_config = config::load_engine_config(&runtime.config_path)?;
    let store = ProfileStore::open(&runtime.store_path)?;
    let mut engine =
        store.load_engine(&args.user, RecommendationEngine::with_config(engine_config)?)?;

    match args.command {
        Command::Record {
            track_id,
            artist,
            action,
            genre,
            listened,
            duration,
            at,
        } => {
            let action: Action = action.parse()?;
            let mut track = Track::new(track_id, artist);
            track.genre = genre;
            let mut event = ListeningEvent::new(&track, action);
            event.listen_duration_seconds = listened;
            event.track_duration_seconds = duration;
            if let Some(timestamp) = at {
                event = event.at(timestamp);
            }

            info!("Recording {action} for `{}' by `{}'", track.id, track.artist_name);
            engine.record_event(event);
            store.save_engine(&args.user, &engine)?;

            let profile = engine.profile();
            println!(
                "{}: affinity {:.2}, openness {:.2}",
                track.artist_name,
                profile.artist_affinity(&track.artist_name),
                profile.discovery_openness()
            );
        }
        Command::Recommend {
            candidates,
            context,
            count,
            verbose,
        } => {
            let pool: Vec<Track> = read_json(&candidates)?;
            let context: SessionContext = match context {
                Some(path) => read_json(&path)?,
                None => SessionContext {
                    time_of_day: TimeOfDay::now(),
                    ..SessionContext::default()
                },
            };

            let picks = engine.recommend_scored(&pool, &context, count);
            if picks.is_empty() {
                println!("No recommendations: candidate pool is empty");
            }
            for (i, (track, breakdown)) in picks.iter().enumerate() {
                println!(
                    "{:>2}. {} - {} ({:.2})",
                    i + 1,
                    track.artist_name,
                    track.id,
                    breakdown.total
                );
                if verbose {
                    println!(
                        "      artist {:.1} | genre {:.1} | mood {:.1} | novelty {:.1} | repeat {:.1} | popularity {:.1}",
                        breakdown.artist_similarity,
                        breakdown.genre_similarity,
                        breakdown.mood_compatibility,
                        breakdown.novelty_bonus,
                        breakdown.repetition_penalty,
                        breakdown.popularity_signal
                    );
                }
            }
            if verbose {
                if let Some(stats) = statistics::summarize(picks.iter().map(|(_, b)| b)) {
                    println!(
                        "Picked {} of {}: mean {:.2}, min {:.2}, max {:.2}",
                        stats.count,
                        pool.len(),
                        stats.mean,
                        stats.min,
                        stats.max
                    );
                }
            }
        }
        Command::Strategy { artist } => {
            let strategy = engine.strategy();
            println!("{strategy}");
            if let Some(artist) = artist {
                println!("{}", strategy.search_query(&artist));
            }
        }
        Command::Profile => {
            let profile = engine.profile();
            println!("User: {}", args.user);
            println!("Discovery openness: {:.2}", profile.discovery_openness());
            println!("Events in history: {}", engine.history().len());
            println!("Favorite artists:");
            for (i, artist) in profile.favorite_artists().iter().enumerate() {
                println!("  {:>2}. {artist} ({:.2})", i + 1, profile.artist_affinity(artist));
            }
            let mut genres: Vec<(&String, &f64)> = profile.genre_scores().iter().collect();
            genres.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
            println!("Top genres:");
            for (genre, score) in genres.into_iter().take(5) {
                println!("      {genre} ({score:.2})");
            }
        }
        Command::Export { output } => {
            let blob = engine.export_profile();
            match output {
                Some(path) => {
                    fs::write(&path, &blob)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Exported profile to {}", path.display());
                }
                None => println!("{blob}"),
            }
        }
        Command::Import { path } => {
            let blob = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            engine
                .try_import_profile(&blob)
                .with_context(|| format!("Rejected profile blob {}", path.display()))?;
            store.save_engine(&args.user, &engine)?;
            println!("Imported profile for {}", args.user);
        }
        Command::Reset => {
            engine.reset();
            store.delete(&args.user)?;
            println!("Profile for {} reset", args.user);
        }
        Command::Users => {
            for user in store.users()? {
                println!("{user}");
            }
        }
        // Handled before the store is opened.
        Command::Completion { .. } => {}
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not valid JSON", path.display()))
}
