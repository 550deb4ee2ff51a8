//! In-memory implementation of `MemoryBackend`.
//!
//! Entries live in a `BTreeMap` behind a `Mutex`, so `list` is naturally
//! sorted and the backend can be shared across threads.

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use tracing::debug;

use atrian_contracts::{
    error::AtrianResult,
    memory::{Metadata, StoredEntry},
};
use atrian_core::traits::MemoryBackend;

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    entries: Mutex<BTreeMap<String, StoredEntry>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, StoredEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MemoryBackend for InMemoryBackend {
    fn store(&self, key: &str, value: &serde_json::Value, metadata: &Metadata) -> AtrianResult<()> {
        self.lock().insert(
            key.to_string(),
            StoredEntry {
                value: value.clone(),
                metadata: metadata.clone(),
            },
        );
        debug!(key = %key, "stored entry");
        Ok(())
    }

    fn retrieve(&self, key: &str) -> AtrianResult<Option<StoredEntry>> {
        Ok(self.lock().get(key).cloned())
    }

    fn list(&self, prefix: &str) -> AtrianResult<Vec<String>> {
        Ok(self
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn delete(&self, key: &str) -> AtrianResult<bool> {
        Ok(self.lock().remove(key).is_some())
    }

    fn clear(&self, prefix: &str) -> AtrianResult<usize> {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        Ok(before - entries.len())
    }
}
