// SQLite-backed bookmark persistence
// Knows nothing about repositories; snapshots are opaque JSON documents

pub mod store;

pub use store::{BookmarkStore, StoreError, StoredBookmark};
