//! SQLite storage layer for Folio.
//!
//! Holds the per-device state the sync engine reconciles and the checkpoint
//! service snapshots.
//!
//! # Architecture
//!
//! - Each syncable collection is its own table of `(key, data, blob)` rows:
//!   `data` is the record's JSON without binary fields, `blob` carries the
//!   one binary field a record may own (a book cover).
//! - Every operation runs inside a SQLite transaction; [`LocalStore::transaction`]
//!   exposes multi-collection atomic writes.
//! - The sync log, checkpoints and book file contents have dedicated tables.
//! - The schema version is stamped in `PRAGMA user_version`.

mod error;
mod record;
mod state;
mod store;

pub use error::{StorageError, StorageResult};
pub use record::{Collection, Record};
pub use state::LocalState;
pub use store::{LocalStore, SCHEMA_VERSION, Tx};
