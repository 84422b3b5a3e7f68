//! Whole-document form of the collection as stored in every tier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collection::Item;

pub const SNAPSHOT_VERSION: &str = "1.0";

/// The collection plus metadata. Always written as one complete document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSnapshot {
  #[serde(default)]
  pub cards: Vec<Item>,
  /// Sole ordering key for reconciliation
  #[serde(default)]
  pub last_updated: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
  #[serde(default)]
  pub total_cards: usize,
  #[serde(default)]
  pub total_value: f64,
}

impl CollectionSnapshot {
  pub fn new(cards: Vec<Item>, last_updated: DateTime<Utc>) -> Self {
    Self {
      total_cards: cards.len(),
      total_value: total_value(&cards),
      cards,
      last_updated: Some(last_updated),
      version: Some(SNAPSHOT_VERSION.to_string()),
    }
  }

  /// What the remote returns when the file does not exist yet.
  pub fn empty() -> Self {
    Self {
      cards: Vec::new(),
      last_updated: None,
      version: None,
      total_cards: 0,
      total_value: 0.0,
    }
  }

  pub fn has_cards(&self) -> bool {
    !self.cards.is_empty()
  }
}

/// Sum of purchase prices across every item, sold ones included.
pub fn total_value(cards: &[Item]) -> f64 {
  cards.iter().map(|card| card.price).sum()
}
