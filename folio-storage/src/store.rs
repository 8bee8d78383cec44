//! The local store: one SQLite connection shared behind a mutex.

use crate::error::{StorageError, StorageResult};
use crate::record::{Collection, Record};
use crate::state::LocalState;
use folio_types::{
    Annotation, Book, Checkpoint, CheckpointInfo, LexiconRule, ReadingHistoryEntry,
    ReadingListEntry, SyncLogEntry, TtsPosition,
};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Schema version stamped into `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Persistent per-device state backed by SQLite.
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
}

impl LocalStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        debug!("Opened local store at {}", path.display());
        Self::with_connection(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Lock)
    }

    /// Runs `f` inside one SQLite transaction spanning every collection.
    ///
    /// Commits when `f` returns `Ok`; any error rolls the whole batch back.
    pub fn transaction<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Tx<'_>) -> StorageResult<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let value = f(&Tx { conn: &*tx })?;
        tx.commit()?;
        Ok(value)
    }

    // ── Record collections ───────────────────────────────────────

    /// Returns every record of a collection in insertion order.
    pub fn get_all<R: Record>(&self) -> StorageResult<Vec<R>> {
        self.transaction(|tx| tx.get_all::<R>())
    }

    /// Returns the record stored under `key`, if any.
    pub fn get<R: Record>(&self, key: &str) -> StorageResult<Option<R>> {
        self.transaction(|tx| tx.get::<R>(key))
    }

    /// Inserts or replaces a record.
    pub fn put<R: Record>(&self, record: &R) -> StorageResult<()> {
        self.transaction(|tx| tx.put(record))
    }

    /// Deletes a record. Returns true if it existed.
    pub fn delete<R: Record>(&self, key: &str) -> StorageResult<bool> {
        self.transaction(|tx| tx.delete::<R>(key))
    }

    /// Removes every record of a collection.
    pub fn clear<R: Record>(&self) -> StorageResult<usize> {
        self.transaction(|tx| tx.clear::<R>())
    }

    /// Reads every syncable collection in one consistent transaction.
    pub fn load_state(&self) -> StorageResult<LocalState> {
        self.transaction(|tx| {
            Ok(LocalState {
                books: tx.get_all::<Book>()?,
                history: tx.get_all::<ReadingHistoryEntry>()?,
                annotations: tx.get_all::<Annotation>()?,
                lexicon: tx.get_all::<LexiconRule>()?,
                reading_list: tx.get_all::<ReadingListEntry>()?,
                tts_positions: tx.get_all::<TtsPosition>()?,
            })
        })
    }

    // ── Book files ───────────────────────────────────────────────

    /// Stores the file content of a book.
    pub fn put_file(&self, book_id: &str, content: &[u8]) -> StorageResult<()> {
        self.transaction(|tx| tx.put_file(book_id, content))
    }

    pub fn get_file(&self, book_id: &str) -> StorageResult<Option<Vec<u8>>> {
        self.transaction(|tx| tx.get_file(book_id))
    }

    pub fn has_file(&self, book_id: &str) -> StorageResult<bool> {
        self.transaction(|tx| tx.has_file(book_id))
    }

    pub fn delete_file(&self, book_id: &str) -> StorageResult<bool> {
        self.transaction(|tx| tx.delete_file(book_id))
    }

    // ── Sync log ─────────────────────────────────────────────────

    /// Appends an entry to the sync log and returns its id.
    pub fn append_sync_log(&self, entry: &SyncLogEntry) -> StorageResult<i64> {
        self.transaction(|tx| tx.append_sync_log(entry))
    }

    /// Loads up to `limit` sync log entries, newest first.
    pub fn sync_log(&self, limit: usize) -> StorageResult<Vec<SyncLogEntry>> {
        self.transaction(|tx| tx.sync_log(limit))
    }

    /// Returns the total number of sync log entries.
    pub fn sync_log_count(&self) -> StorageResult<usize> {
        self.transaction(|tx| tx.sync_log_count())
    }

    // ── Checkpoints ──────────────────────────────────────────────

    /// Stores a checkpoint, replacing any with the same timestamp.
    pub fn put_checkpoint(&self, checkpoint: &Checkpoint) -> StorageResult<()> {
        self.transaction(|tx| tx.put_checkpoint(checkpoint))
    }

    pub fn get_checkpoint(&self, timestamp: i64) -> StorageResult<Option<Checkpoint>> {
        self.transaction(|tx| tx.get_checkpoint(timestamp))
    }

    /// Lists checkpoints oldest first, without their payloads.
    pub fn list_checkpoints(&self) -> StorageResult<Vec<CheckpointInfo>> {
        self.transaction(|tx| tx.list_checkpoints())
    }

    pub fn delete_checkpoint(&self, timestamp: i64) -> StorageResult<bool> {
        self.transaction(|tx| tx.delete_checkpoint(timestamp))
    }

    /// Timestamp of the newest stored checkpoint.
    pub fn latest_checkpoint_timestamp(&self) -> StorageResult<Option<i64>> {
        self.transaction(|tx| tx.latest_checkpoint_timestamp())
    }
}

fn init_schema(conn: &Connection) -> StorageResult<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version > SCHEMA_VERSION {
        return Err(StorageError::Migration(format!(
            "store schema v{version} is newer than supported v{SCHEMA_VERSION}"
        )));
    }

    for collection in Collection::ALL {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                key TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                blob BLOB
            );",
            collection.table()
        ))?;
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS files (
            book_id TEXT PRIMARY KEY,
            content BLOB NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sync_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            type TEXT NOT NULL,
            status TEXT NOT NULL,
            details TEXT,
            device_id TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS checkpoints (
            timestamp INTEGER PRIMARY KEY,
            data TEXT NOT NULL,
            reason TEXT NOT NULL,
            size_bytes INTEGER NOT NULL
        );
        ",
    )?;

    if version < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        info!("Initialized local store schema v{}", SCHEMA_VERSION);
    }
    Ok(())
}

/// Operations available inside [`LocalStore::transaction`].
pub struct Tx<'conn> {
    conn: &'conn Connection,
}

impl Tx<'_> {
    pub fn get_all<R: Record>(&self) -> StorageResult<Vec<R>> {
        let sql = format!(
            "SELECT data, blob FROM {} ORDER BY rowid",
            R::COLLECTION.table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<Vec<u8>>>(1)?))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (data, blob) = row?;
            records.push(decode::<R>(&data, blob)?);
        }
        Ok(records)
    }

    pub fn get<R: Record>(&self, key: &str) -> StorageResult<Option<R>> {
        let sql = format!(
            "SELECT data, blob FROM {} WHERE key = ?1",
            R::COLLECTION.table()
        );
        let row = self
            .conn
            .query_row(&sql, params![key], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<Vec<u8>>>(1)?))
            })
            .optional()?;
        row.map(|(data, blob)| decode::<R>(&data, blob)).transpose()
    }

    /// Upserts a record. An existing row keeps its position in
    /// [`get_all`](Self::get_all) order.
    pub fn put<R: Record>(&self, record: &R) -> StorageResult<()> {
        let mut record = record.clone();
        let blob = record.take_blob();
        let data = serde_json::to_string(&record)?;
        let sql = format!(
            "INSERT INTO {} (key, data, blob) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET data = excluded.data, blob = excluded.blob",
            R::COLLECTION.table()
        );
        self.conn.execute(&sql, params![record.key(), data, blob])?;
        Ok(())
    }

    pub fn delete<R: Record>(&self, key: &str) -> StorageResult<bool> {
        let sql = format!("DELETE FROM {} WHERE key = ?1", R::COLLECTION.table());
        Ok(self.conn.execute(&sql, params![key])? > 0)
    }

    pub fn clear<R: Record>(&self) -> StorageResult<usize> {
        let sql = format!("DELETE FROM {}", R::COLLECTION.table());
        Ok(self.conn.execute(&sql, [])?)
    }

    // ── Book files ───────────────────────────────────────────────

    pub fn put_file(&self, book_id: &str, content: &[u8]) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO files (book_id, content) VALUES (?1, ?2)",
            params![book_id, content],
        )?;
        Ok(())
    }

    pub fn get_file(&self, book_id: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self
            .conn
            .query_row(
                "SELECT content FROM files WHERE book_id = ?1",
                params![book_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn has_file(&self, book_id: &str) -> StorageResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM files WHERE book_id = ?1",
            params![book_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn delete_file(&self, book_id: &str) -> StorageResult<bool> {
        Ok(self
            .conn
            .execute("DELETE FROM files WHERE book_id = ?1", params![book_id])?
            > 0)
    }

    // ── Sync log ─────────────────────────────────────────────────

    pub fn append_sync_log(&self, entry: &SyncLogEntry) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO sync_log (timestamp, type, status, details, device_id) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.timestamp,
                entry.kind.as_str(),
                entry.status.as_str(),
                entry.details,
                entry.device_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn sync_log(&self, limit: usize) -> StorageResult<Vec<SyncLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, type, status, details, device_id FROM sync_log ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, timestamp, kind, status, details, device_id) = row?;
            entries.push(SyncLogEntry {
                id: Some(id),
                timestamp,
                kind: kind
                    .parse()
                    .map_err(|e| StorageError::InvalidData(format!("{e}")))?,
                status: status
                    .parse()
                    .map_err(|e| StorageError::InvalidData(format!("{e}")))?,
                details,
                device_id,
            });
        }
        Ok(entries)
    }

    pub fn sync_log_count(&self) -> StorageResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sync_log", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ── Checkpoints ──────────────────────────────────────────────

    pub fn put_checkpoint(&self, checkpoint: &Checkpoint) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO checkpoints (timestamp, data, reason, size_bytes) VALUES (?1, ?2, ?3, ?4)",
            params![
                checkpoint.timestamp,
                checkpoint.data,
                checkpoint.reason,
                checkpoint.size_bytes as i64,
            ],
        )?;
        Ok(())
    }

    pub fn get_checkpoint(&self, timestamp: i64) -> StorageResult<Option<Checkpoint>> {
        Ok(self
            .conn
            .query_row(
                "SELECT timestamp, data, reason, size_bytes FROM checkpoints WHERE timestamp = ?1",
                params![timestamp],
                |row| {
                    Ok(Checkpoint {
                        timestamp: row.get(0)?,
                        data: row.get(1)?,
                        reason: row.get(2)?,
                        size_bytes: row.get::<_, i64>(3)? as u64,
                    })
                },
            )
            .optional()?)
    }

    pub fn list_checkpoints(&self) -> StorageResult<Vec<CheckpointInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT timestamp, reason, size_bytes FROM checkpoints ORDER BY timestamp ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CheckpointInfo {
                timestamp: row.get(0)?,
                reason: row.get(1)?,
                size_bytes: row.get::<_, i64>(2)? as u64,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn delete_checkpoint(&self, timestamp: i64) -> StorageResult<bool> {
        Ok(self.conn.execute(
            "DELETE FROM checkpoints WHERE timestamp = ?1",
            params![timestamp],
        )? > 0)
    }

    pub fn latest_checkpoint_timestamp(&self) -> StorageResult<Option<i64>> {
        Ok(self
            .conn
            .query_row("SELECT MAX(timestamp) FROM checkpoints", [], |row| {
                row.get::<_, Option<i64>>(0)
            })?)
    }
}

fn decode<R: Record>(data: &str, blob: Option<Vec<u8>>) -> StorageResult<R> {
    let mut record: R = serde_json::from_str(data)?;
    if blob.is_some() {
        record.set_blob(blob);
    }
    Ok(record)
}
