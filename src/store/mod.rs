//! Local persistence tier.
//!
//! - `KeyValueStore` is the device-local store (SQLite on disk, or memory)
//! - `LocalCache` reads and writes whole collection snapshots on top of it
//! - The cached document is always fully replaced, never patched

mod local;
mod memory;
mod sqlite;
mod traits;

pub use local::LocalCache;
pub use memory::MemoryStore;
pub use sqlite::{data_dir, SqliteStore};
pub use traits::KeyValueStore;
