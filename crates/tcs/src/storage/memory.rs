//! In-memory storage implementation
//!
//! Used for tests and for sessions that should not leave history behind.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::LogStorage;

/// In-memory implementation of LogStorage
#[derive(Default)]
pub struct InMemoryLogStorage {
    slots: RwLock<HashMap<String, String>>,
}

impl InMemoryLogStorage {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with `value` already under `key`
    pub fn with_value(key: &str, value: impl Into<String>) -> Self {
        let store = Self::new();
        store
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.into());
        store
    }
}

impl LogStorage for InMemoryLogStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.remove(key);
        Ok(())
    }
}
