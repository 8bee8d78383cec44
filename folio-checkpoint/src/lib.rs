//! Local checkpoints for Folio.
//!
//! A checkpoint is a JSON snapshot of the books, reading history,
//! annotations and lexicon, taken before risky operations (a sync that
//! rewrites local state, a bulk import) so the user can roll back.
//! Cover images are left out to keep snapshots small; a restore re-attaches
//! whatever covers the live store still holds.

mod error;
mod service;

pub use error::{CheckpointError, CheckpointResult};
pub use service::{CheckpointPayload, CheckpointService, DEFAULT_RETENTION};
