//! SQLite persistence layer.
//!
//! Stores all durable estate state so the estate survives restarts.
//! Uses a simple key-value `config` table for the estate snapshot (JSON)
//! and an append-only `event_log` table for committed notifications.
//! A snapshot and the events that produced it are written in one
//! transaction.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use testament_core::{
    Clock, Estate, EstateError, EstateEvent, EstateState, EventRecord, Principal,
};
use thiserror::Error;

const STATE_KEY: &str = "estate_state";
const SCHEMA_VERSION_KEY: &str = "schema_version";
const SCHEMA_VERSION: &str = "1";

/// Errors from store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Estate already initialized")]
    AlreadyInitialized,

    #[error("Estate not initialized")]
    NotInitialized,

    #[error("Stored estate rejected: {0}")]
    InvalidSnapshot(#[source] EstateError),
}

pub struct EstateStore {
    conn: Connection,
}

impl EstateStore {
    /// Open (or create) the database at `path` and run migrations.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        // WAL mode for better concurrent read performance
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS config (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS event_log (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                kind      TEXT NOT NULL,
                payload   TEXT NOT NULL
            );
            ",
        )?;
        config_set(&conn, SCHEMA_VERSION_KEY, SCHEMA_VERSION)?;
        Ok(Self { conn })
    }

    pub fn is_initialized(&self) -> Result<bool, StoreError> {
        Ok(config_get(&self.conn, STATE_KEY)?.is_some())
    }

    /// One-time `initializeEstate`: seeds `owner` and persists the fresh state.
    pub fn initialize(&mut self, owner: Principal) -> Result<EstateState, StoreError> {
        if self.is_initialized()? {
            return Err(StoreError::AlreadyInitialized);
        }
        let state = EstateState::new(owner);
        self.commit(&state, &[])?;
        log::info!("Initialized estate for owner {}", owner.short());
        Ok(state)
    }

    /// Load and validate the stored snapshot.
    pub fn load_state(&self) -> Result<EstateState, StoreError> {
        let json = config_get(&self.conn, STATE_KEY)?.ok_or(StoreError::NotInitialized)?;
        let state: EstateState = serde_json::from_str(&json)?;
        state.validate().map_err(StoreError::InvalidSnapshot)?;
        Ok(state)
    }

    /// Load the estate and attach `clock`.
    pub fn load_estate<C: Clock>(&self, clock: C) -> Result<Estate<C>, StoreError> {
        Estate::from_state(self.load_state()?, clock).map_err(StoreError::InvalidSnapshot)
    }

    /// Write a snapshot and its events atomically.
    pub fn commit(&mut self, state: &EstateState, events: &[EventRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_string(state)?;
        let tx = self.conn.transaction()?;
        config_set(&tx, STATE_KEY, &json)?;
        for record in events {
            tx.execute(
                "INSERT INTO event_log (timestamp, kind, payload) VALUES (?1, ?2, ?3)",
                params![
                    record.timestamp as i64,
                    record.event.kind(),
                    serde_json::to_string(&record.event)?
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Persist the estate's state with its pending events.
    ///
    /// Events are drained only once the commit succeeds; on failure they
    /// stay pending for the next attempt. Returns the number written.
    pub fn persist<C: Clock>(&mut self, estate: &mut Estate<C>) -> Result<usize, StoreError> {
        self.commit(estate.state(), estate.events())?;
        let written = estate.drain_events().len();
        log::debug!("Persisted estate with {} new event(s)", written);
        Ok(written)
    }

    /// Most recent events, newest first.
    pub fn recent_events(&self, limit: usize) -> Result<Vec<EventRecord>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT timestamp, payload FROM event_log ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (timestamp, payload) = row?;
            let event: EstateEvent = serde_json::from_str(&payload)?;
            records.push(EventRecord {
                timestamp: timestamp as u64,
                event,
            });
        }
        Ok(records)
    }

    pub fn event_count(&self) -> Result<u64, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM event_log", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

// ============================================================================
// Config helpers (key-value)
// ============================================================================

fn config_get(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

fn config_set(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO config (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}
