use crate::state::TaskFailure;
use crate::store::record::{Field, Record};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Errors from the record store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No record has been created for the key
    #[error("no record for key '{key}'")]
    NotFound { key: String },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Mapping key -> exactly one [`Record`]
///
/// A single mutex guards the whole map. Every operation holds it only for
/// the duration of one map access, never across an await point.
#[derive(Debug, Default)]
pub struct KeyedRecordStore {
    records: Mutex<HashMap<String, Record>>,
}

/// Access to one existing record in a store
#[derive(Debug, Clone, Copy)]
pub struct RecordHandle<'a> {
    store: &'a KeyedRecordStore,
    key: &'a str,
    created: bool,
}

impl<'a> RecordHandle<'a> {
    pub fn key(&self) -> &str {
        self.key
    }

    /// True if this call created the record
    pub fn was_created(&self) -> bool {
        self.created
    }

    /// Merges fields into the record behind this handle
    pub fn merge(&self, fields: impl IntoIterator<Item = Field>) -> StoreResult<()> {
        self.store.merge_fields(self.key, fields)
    }

    /// Copy of the record's current state
    pub fn snapshot(&self) -> StoreResult<Record> {
        self.store.get(self.key)
    }
}

impl KeyedRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Record>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the record for `key`, creating an empty one if needed
    ///
    /// Calling this again for the same key never resets fields that are
    /// already set.
    pub fn get_or_create<'a>(&'a self, key: &'a str) -> RecordHandle<'a> {
        let mut records = self.lock();
        let created = !records.contains_key(key);
        if created {
            records.insert(key.to_string(), Record::new(key));
        }

        RecordHandle {
            store: self,
            key,
            created,
        }
    }

    /// Returns a copy of the record for `key`
    pub fn get(&self, key: &str) -> StoreResult<Record> {
        self.lock()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })
    }

    /// Applies `fields` to the existing record for `key`, last write wins
    ///
    /// Never creates a record; a missing key is [`StoreError::NotFound`]
    /// and nothing is written.
    pub fn merge_fields(
        &self,
        key: &str,
        fields: impl IntoIterator<Item = Field>,
    ) -> StoreResult<()> {
        let mut records = self.lock();
        let record = records.get_mut(key).ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })?;

        for field in fields {
            record.apply(field);
        }
        Ok(())
    }

    /// Attaches a task failure to the existing record for `key`
    pub fn record_failure(&self, key: &str, failure: TaskFailure) -> StoreResult<()> {
        let mut records = self.lock();
        let record = records.get_mut(key).ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })?;

        record.push_issue(failure);
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// All records, sorted by key
    pub fn snapshot(&self) -> Vec<Record> {
        let mut records: Vec<Record> = self.lock().values().cloned().collect();
        records.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        records
    }
}
