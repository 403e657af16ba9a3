//! Record Store
//!
//! Durable, ordered log of history records persisted as a single serialized
//! blob under one key. The in-memory sequence is authoritative for the running
//! process; every mutation schedules a full rewrite of the blob through a
//! single-writer queue so writes land in mutation order and never overlap.

mod backend;
mod id;
mod log;
mod record;
mod store;
mod writer;

pub use backend::{FileStore, KeyValueStore, MemoryStore};
pub use id::{IdGenerator, MAX_ID_ATTEMPTS};
pub use log::RecordLog;
pub use record::{Record, RecordId, RecordOrigin};
pub use store::RecordStore;
pub use writer::PersistTicket;

use thiserror::Error;

/// Default storage key for the record log
pub const DEFAULT_STORE_KEY: &str = "records";

/// Storage errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("I/O error for key '{key}': {reason}")]
    Io { key: String, reason: String },
    #[error("Stored blob for key '{key}' is not well-formed: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
    #[error("Record id {0} already exists")]
    DuplicateId(RecordId),
    #[error("Persistence writer has shut down")]
    WriterClosed,
    #[error("Writes to '{0}' are held: the stored log could not be read or set aside")]
    WritesHeld(String),
}
