//! Durable key-value storage for client-side state
//!
//! The sync audit log is persisted as a single serialized slot. The
//! trait-based design allows swapping between in-memory and file-backed
//! storage implementations.

mod file;
mod memory;
mod traits;

pub use file::FileLogStorage;
pub use memory::InMemoryLogStorage;
pub use traits::LogStorage;
