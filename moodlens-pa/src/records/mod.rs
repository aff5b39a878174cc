//! Saved record persistence

pub mod store;

pub use store::{RecordPatch, RecordStore, SavedRecord, SqliteRecordStore, Visibility};
