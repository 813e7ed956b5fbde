//! Storage trait definitions

use anyhow::Result;

/// Trait for durable key-value slots
///
/// Values are opaque strings (serialized JSON in practice). A write
/// replaces the whole slot.
pub trait LogStorage: Send + Sync {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Drop the slot under `key`; a missing slot is not an error
    fn remove(&self, key: &str) -> Result<()>;
}
