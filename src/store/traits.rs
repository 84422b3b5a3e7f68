//! Key-value storage backing the local cache tier.

use crate::error::Result;

/// A device-local persistent key-value store.
///
/// Values are whole documents; there is no partial update. Implementations
/// must make `set_many` all-or-nothing so the snapshot and its companion
/// timestamp never disagree.
pub trait KeyValueStore: Send + Sync {
  /// Read a value, `None` if the key was never written.
  fn get(&self, key: &str) -> Result<Option<String>>;

  /// Overwrite a single value.
  fn set(&self, key: &str, value: &str) -> Result<()>;

  /// Overwrite several values together.
  fn set_many(&self, entries: &[(&str, &str)]) -> Result<()>;

  /// Delete a value. Deleting a missing key is not an error.
  fn remove(&self, key: &str) -> Result<()>;
}
