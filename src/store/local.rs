//! Snapshot-level view of the local key-value store.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use super::traits::KeyValueStore;
use crate::collection::Item;
use crate::error::{Error, Result};
use crate::snapshot::CollectionSnapshot;

/// Key holding the whole collection document
pub const COLLECTION_KEY: &str = "collection";
/// Key holding the same timestamp as the document, for quick comparison
pub const LAST_UPDATED_KEY: &str = "collection_last_updated";
/// Key holding the repository write token set through the CLI
pub const GITHUB_TOKEN_KEY: &str = "github_token";

/// Shapes found under `COLLECTION_KEY`. Early versions stored a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCollection {
  Legacy(Vec<Item>),
  Document(CollectionSnapshot),
}

/// Local cache tier: always written first, read as the fallback.
#[derive(Clone)]
pub struct LocalCache {
  store: Arc<dyn KeyValueStore>,
}

impl LocalCache {
  pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
    Self { store }
  }

  /// Read the cached snapshot, `None` if nothing was ever saved.
  ///
  /// A document without its own timestamp takes the companion key's value.
  pub fn read_snapshot(&self) -> Result<Option<CollectionSnapshot>> {
    let raw = match self.store.get(COLLECTION_KEY)? {
      Some(raw) => raw,
      None => return Ok(None),
    };

    let mut snapshot = match serde_json::from_str::<StoredCollection>(&raw)? {
      StoredCollection::Legacy(cards) => {
        let mut snapshot = CollectionSnapshot::empty();
        snapshot.total_cards = cards.len();
        snapshot.total_value = crate::snapshot::total_value(&cards);
        snapshot.cards = cards;
        snapshot
      }
      StoredCollection::Document(snapshot) => snapshot,
    };

    if snapshot.last_updated.is_none() {
      snapshot.last_updated = self.last_updated()?;
    }
    Ok(Some(snapshot))
  }

  /// Overwrite the cached document and its companion timestamp together.
  pub fn write_snapshot(&self, snapshot: &CollectionSnapshot) -> Result<()> {
    let document = serde_json::to_string(snapshot)?;
    match snapshot.last_updated {
      Some(stamp) => {
        let stamp = stamp.to_rfc3339();
        self
          .store
          .set_many(&[(COLLECTION_KEY, &document), (LAST_UPDATED_KEY, &stamp)])
      }
      None => self.store.set(COLLECTION_KEY, &document),
    }
  }

  /// Timestamp of the last local write.
  pub fn last_updated(&self) -> Result<Option<DateTime<Utc>>> {
    match self.store.get(LAST_UPDATED_KEY)? {
      Some(raw) => DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .map_err(|e| Error::Malformed(format!("last-updated stamp '{}': {}", raw, e))),
      None => Ok(None),
    }
  }

  /// Stored repository token. Kept in plain text, as earlier versions did.
  pub fn credential(&self) -> Result<Option<String>> {
    Ok(
      self
        .store
        .get(GITHUB_TOKEN_KEY)?
        .filter(|token| !token.is_empty()),
    )
  }

  pub fn set_credential(&self, token: &str) -> Result<()> {
    self.store.set(GITHUB_TOKEN_KEY, token)
  }

  pub fn clear_credential(&self) -> Result<()> {
    self.store.remove(GITHUB_TOKEN_KEY)
  }
}
