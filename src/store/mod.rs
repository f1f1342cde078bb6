//! Keyed record store
//!
//! One [`Record`] per key, created lazily at discovery and merged into by
//! every handler that learns something about that key. Readers take a
//! [`KeyedRecordStore::snapshot`] once the crawl is quiescent.

mod keyed;
mod record;

pub use keyed::{KeyedRecordStore, RecordHandle, StoreError, StoreResult};
pub use record::{Direction, Field, Horizon, Record, RecordStatus};
