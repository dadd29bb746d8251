//! Taste-profile engine that picks tracks for automatic queue replenishment.
//!
//! Core modules:
//! - [`engine`] - Event recording, ranking, familiar/discovery blending, export
//! - [`profile`] - Artist/genre affinity and recency state
//! - [`scoring`] - Six-part weighted candidate scorer
//! - [`strategy`] - Advisory search strategy for the caller
//!
//! ### Supporting Modules
//!
//! - [`track`] / [`context`] - Data handed in by the caller
//! - [`config`] - Engine policy constants and data directory management
//! - [`store`] - SQLite persistence of exported profiles
//! - [`cli`] / [`completion`] - Command-line interface definitions
//!
//! ## Quick Start Example
//!
//! ```
//! use autoqueue::{Action, ListeningEvent, RecommendationEngine, SessionContext, Track};
//!
//! let mut engine = RecommendationEngine::new();
//!
//! let heard = Track::new("abc", "Nina Simone").with_genre("jazz");
//! engine.record_event(ListeningEvent::new(&heard, Action::Like));
//!
//! let candidates = vec![
//!     Track::new("def", "Nina Simone").with_genre("jazz"),
//!     Track::new("ghi", "Someone New").with_views(2_000_000),
//! ];
//! let context = SessionContext::default().with_current(heard);
//! let next = engine.recommend(&candidates, &context, 2);
//! assert_eq!(next.len(), 2);
//!
//! let blob = engine.export_profile();
//! let mut restored = RecommendationEngine::new();
//! restored.import_profile(&blob);
//! assert_eq!(restored.profile().favorite_artists(), ["Nina Simone"]);
//! ```
//!
//! ## Execution Model
//!
//! Everything is synchronous and single-owner: one engine per playback
//! session, called from one thread. The engine does no I/O; fetching the
//! candidate pool and storing the exported blob are the caller's job.
//!
//! ## Error Handling
//!
//! Engine operations never fail. Malformed events fall back to permissive
//! defaults, an empty pool yields an empty pick list, and a bad import blob is
//! logged and ignored. Fallible helpers around the engine (config files, the
//! profile store, strict import) return `anyhow::Result`.

pub mod cli;
pub mod completion;
pub mod config;
pub mod context;
pub mod engine;
pub mod profile;
pub mod scoring;
pub mod store;
pub mod strategy;
pub mod track;

pub use config::EngineConfig;
pub use context::{SessionContext, TimeOfDay};
pub use engine::{RecommendationEngine, SessionState};
pub use profile::TasteProfile;
pub use scoring::{ScoreBreakdown, ScoringWeights};
pub use store::ProfileStore;
pub use strategy::Strategy;
pub use track::{Action, ListeningEvent, Track};
