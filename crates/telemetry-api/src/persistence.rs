use std::fmt;
use std::path::Path;
use std::sync::Arc;

use contracts::{Event, PersistedState};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::PersistenceError;

const CURRENT_SLOT: &str = "current";

/// Where the orchestrator writes its state. `load` hands back the raw
/// payload so the caller decides how to treat a document it cannot parse.
pub trait SnapshotSink: Send + fmt::Debug {
    fn save(&mut self, state: &PersistedState) -> Result<(), PersistenceError>;

    fn load(&mut self) -> Result<Option<String>, PersistenceError>;
}

#[derive(Debug)]
pub struct SqliteSnapshotStore {
    conn: Connection,
}

impl SqliteSnapshotStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, PersistenceError> {
        let mut store = Self { conn };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    /// Newest first.
    pub fn load_events(&self, limit: usize) -> Result<Vec<Event>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            "SELECT payload_json
             FROM events
             ORDER BY timestamp_ms DESC, rowid DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(
            params![i64::try_from(limit).unwrap_or(i64::MAX)],
            |row| row.get::<_, String>(0),
        )?;

        let mut events = Vec::new();
        for row in rows {
            let payload = row?;
            events.push(serde_json::from_str::<Event>(&payload)?);
        }
        Ok(events)
    }

    pub fn event_count(&self) -> Result<u64, PersistenceError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn configure(&mut self) -> Result<(), PersistenceError> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(())
    }

    fn migrate(&mut self) -> Result<(), PersistenceError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS snapshots (
                slot TEXT PRIMARY KEY,
                schema_version TEXT NOT NULL,
                seed TEXT NOT NULL,
                payload_json TEXT NOT NULL,
                saved_at_ms INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS events (
                event_id TEXT PRIMARY KEY,
                timestamp_ms INTEGER NOT NULL,
                kind TEXT NOT NULL,
                payload_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp_ms);
            ",
        )?;

        self.conn.execute(
            "INSERT OR IGNORE INTO schema_migrations(version, name) VALUES(1, 'initial_v1')",
            [],
        )?;
        Ok(())
    }
}

impl SnapshotSink for SqliteSnapshotStore {
    fn save(&mut self, state: &PersistedState) -> Result<(), PersistenceError> {
        let payload_json = serde_json::to_string(state)?;
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO snapshots (slot, schema_version, seed, payload_json, saved_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(slot) DO UPDATE SET
                schema_version = excluded.schema_version,
                seed = excluded.seed,
                payload_json = excluded.payload_json,
                saved_at_ms = excluded.saved_at_ms",
            params![
                CURRENT_SLOT,
                state.schema_version.as_str(),
                state.seed.to_string(),
                payload_json,
                state.saved_at_ms,
            ],
        )?;

        // Oldest first so rowid order matches timeline order within a millisecond.
        for event in state.events.iter().rev() {
            let event_json = serde_json::to_string(event)?;
            tx.execute(
                "INSERT OR IGNORE INTO events (event_id, timestamp_ms, kind, payload_json)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    event.id.as_str(),
                    event.timestamp_ms,
                    event.kind.name(),
                    event_json
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn load(&mut self) -> Result<Option<String>, PersistenceError> {
        let payload = self
            .conn
            .query_row(
                "SELECT payload_json FROM snapshots WHERE slot = ?1",
                params![CURRENT_SLOT],
                |row| row.get(0),
            )
            .optional()?;
        Ok(payload)
    }
}

#[derive(Debug, Default)]
struct MemorySlot {
    payload: Option<String>,
    save_count: usize,
}

/// In-process sink. Clones share one slot, so a host or test can keep a
/// handle after giving the store to an orchestrator.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    slot: Arc<Mutex<MemorySlot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load a raw payload, valid or not, for the next `load`.
    pub fn with_payload(raw: impl Into<String>) -> Self {
        let store = Self::default();
        store.slot.lock().payload = Some(raw.into());
        store
    }

    pub fn last_payload(&self) -> Option<String> {
        self.slot.lock().payload.clone()
    }

    pub fn last_state(&self) -> Option<PersistedState> {
        let payload = self.last_payload()?;
        serde_json::from_str(&payload).ok()
    }

    pub fn save_count(&self) -> usize {
        self.slot.lock().save_count
    }
}

impl SnapshotSink for MemorySnapshotStore {
    fn save(&mut self, state: &PersistedState) -> Result<(), PersistenceError> {
        let payload = serde_json::to_string(state)?;
        let mut slot = self.slot.lock();
        slot.payload = Some(payload);
        slot.save_count += 1;
        Ok(())
    }

    fn load(&mut self) -> Result<Option<String>, PersistenceError> {
        Ok(self.slot.lock().payload.clone())
    }
}
