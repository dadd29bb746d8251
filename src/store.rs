//! # Profile Store
//!
//! SQLite persistence for exported profile blobs, one row per user. This is a
//! caller-side convenience: the engine only ever sees the blob string.
//!
//! The blob carries long-lived taste only. Recency sets and the rolling
//! history live in a second table so that repetition penalties and the skip
//! rate survive between CLI runs.
//!
//! ## Schema
//!
//! ```sql
//! CREATE TABLE profiles (
//!     user       TEXT PRIMARY KEY,
//!     blob       TEXT NOT NULL,
//!     updated_at TEXT NOT NULL
//! );
//! CREATE TABLE sessions (
//!     user       TEXT PRIMARY KEY,
//!     state      TEXT NOT NULL,
//!     updated_at TEXT NOT NULL
//! );
//! ```

use crate::engine::{RecommendationEngine, SessionState};
use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Handle on the profile database.
#[derive(Debug)]
pub struct ProfileStore {
    conn: Connection,
}

impl ProfileStore {
    /// Opens (or creates) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema cannot
    /// be created.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open profile store at {}", path.display()))?;
        Self::init(conn)
    }

    /// Store backed by an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot allocate the database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory store")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS profiles (
                user       TEXT PRIMARY KEY,
                blob       TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create profiles table")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                user       TEXT PRIMARY KEY,
                state      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create sessions table")?;
        Ok(Self { conn })
    }

    /// Stored blob for `user`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error on a database failure.
    pub fn load(&self, user: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT blob FROM profiles WHERE user = ?1",
                params![user],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to load profile for `{user}'"))
    }

    /// Inserts or replaces the blob for `user`.
    ///
    /// # Errors
    ///
    /// Returns an error on a database failure.
    pub fn save(&self, user: &str, blob: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO profiles (user, blob, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user) DO UPDATE SET blob = excluded.blob, updated_at = excluded.updated_at",
                params![user, blob, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("Failed to save profile for `{user}'"))?;
        debug!("Saved {} byte profile for `{user}'", blob.len());
        Ok(())
    }

    /// Stored session state for `user`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error on a database failure.
    pub fn load_session(&self, user: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT state FROM sessions WHERE user = ?1",
                params![user],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to load session for `{user}'"))
    }

    /// Inserts or replaces the session state for `user`.
    ///
    /// # Errors
    ///
    /// Returns an error on a database failure.
    pub fn save_session(&self, user: &str, state: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sessions (user, state, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user) DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at",
                params![user, state, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("Failed to save session for `{user}'"))?;
        Ok(())
    }

    /// Removes both rows for `user`. Returns whether a profile existed.
    ///
    /// # Errors
    ///
    /// Returns an error on a database failure.
    pub fn delete(&self, user: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM profiles WHERE user = ?1", params![user])
            .with_context(|| format!("Failed to delete profile for `{user}'"))?;
        self.conn
            .execute("DELETE FROM sessions WHERE user = ?1", params![user])
            .with_context(|| format!("Failed to delete session for `{user}'"))?;
        Ok(removed > 0)
    }

    /// All users with a stored profile, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns an error on a database failure.
    pub fn users(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT user FROM profiles ORDER BY user")
            .context("Invalid SQL statement when listing profiles")?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .context("Cannot query profiles")?;

        let mut users = Vec::new();
        for user in rows {
            users.push(user.context("Queried profile row failed")?);
        }
        Ok(users)
    }

    /// Engine restored from the stored blob and session state for `user`, or
    /// a fresh one.
    ///
    /// A corrupt blob or session row is logged and ignored, matching
    /// [`RecommendationEngine::import_profile`].
    ///
    /// # Errors
    ///
    /// Returns an error on a database failure.
    pub fn load_engine(
        &self,
        user: &str,
        mut engine: RecommendationEngine,
    ) -> Result<RecommendationEngine> {
        match self.load(user)? {
            Some(blob) => {
                engine.import_profile(&blob);
                info!("Loaded profile for `{user}'");
            }
            None => info!("No stored profile for `{user}', starting fresh"),
        }
        if let Some(state) = self.load_session(user)? {
            match serde_json::from_str::<SessionState>(&state) {
                Ok(state) => engine.restore_session(state),
                Err(e) => warn!("Ignoring stored session for `{user}': {e}"),
            }
        }
        Ok(engine)
    }

    /// Exports `engine` and saves it under `user`, session state included.
    ///
    /// # Errors
    ///
    /// Returns an error on a database failure or if the session state cannot
    /// be serialized.
    pub fn save_engine(&self, user: &str, engine: &RecommendationEngine) -> Result<()> {
        self.save(user, &engine.export_profile())?;
        let state = serde_json::to_string(&engine.session_state())
            .context("Failed to serialize session state")?;
        self.save_session(user, &state)
    }
}
