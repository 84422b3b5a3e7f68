//! The card collection and its item lifecycle.
//!
//! - Items are added with a freshly generated id and edited in place
//! - Marking an item sold keeps its previous category for later restoration
//! - Duplicates drop id, status and sale data

mod filter;
mod item;
mod stats;

pub use filter::{distinct_sets, ItemFilter, View};
pub use item::{Category, Item, ItemId, ItemStatus};
pub use stats::CollectionStats;

use chrono::Local;
use tracing::error;

use crate::error::{Error, Result};

const SEED_JSON: &str = include_str!("../../data/seed.json");

/// Example collection shown when neither the remote nor the local cache has data.
pub fn seed() -> Vec<Item> {
  serde_json::from_str(SEED_JSON).unwrap_or_else(|e| {
    error!("Bundled seed collection is malformed: {}", e);
    Vec::new()
  })
}

/// Ordered list of items. Order is insertion order and is preserved in every tier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
  items: Vec<Item>,
}

impl Collection {
  pub fn new(items: Vec<Item>) -> Self {
    Self { items }
  }

  pub fn items(&self) -> &[Item] {
    &self.items
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn get(&self, id: &str) -> Option<&Item> {
    self.items.iter().find(|item| item.id.matches(id))
  }

  /// Append an item under a new id, returning that id.
  pub fn add(&mut self, mut item: Item) -> ItemId {
    item.id = self.fresh_id();
    let id = item.id.clone();
    self.items.push(item);
    id
  }

  /// Append every item under new ids.
  pub fn append(&mut self, items: Vec<Item>) {
    for item in items {
      self.add(item);
    }
  }

  /// Replace the whole collection, assigning new ids.
  pub fn replace(&mut self, items: Vec<Item>) {
    self.items.clear();
    self.append(items);
  }

  /// Replace the stored item that has the same id.
  pub fn update(&mut self, item: Item) -> Result<()> {
    let slot = self
      .items
      .iter_mut()
      .find(|existing| existing.id == item.id)
      .ok_or_else(|| Error::ItemNotFound(item.id.to_string()))?;
    *slot = item;
    Ok(())
  }

  pub fn remove(&mut self, id: &str) -> Result<Item> {
    let index = self
      .items
      .iter()
      .position(|item| item.id.matches(id))
      .ok_or_else(|| Error::ItemNotFound(id.to_string()))?;
    Ok(self.items.remove(index))
  }

  /// Clone an item as a new active entry.
  pub fn duplicate(&mut self, id: &str) -> Result<ItemId> {
    let source = self
      .get(id)
      .ok_or_else(|| Error::ItemNotFound(id.to_string()))?;

    let mut copy = source.clone();
    copy.status = None;
    copy.sale_price = None;
    copy.sale_date = None;
    if let Some(original) = copy.original_category.take() {
      copy.category = original;
    }
    copy.notes = Some(match copy.notes.as_deref() {
      Some(notes) if !notes.is_empty() => format!("{} (Duplicate)", notes),
      _ => "Duplicate".to_string(),
    });

    Ok(self.add(copy))
  }

  /// Move an item into sales history. `price` is left as the purchase price.
  pub fn mark_sold(&mut self, id: &str, sale_price: f64, sale_date: Option<String>) -> Result<()> {
    let item = self
      .items
      .iter_mut()
      .find(|item| item.id.matches(id))
      .ok_or_else(|| Error::ItemNotFound(id.to_string()))?;

    if item.is_sold() {
      return Err(Error::AlreadySold(id.to_string()));
    }

    item.status = Some(ItemStatus::Sold);
    item.sale_price = Some(sale_price);
    item.sale_date =
      Some(sale_date.unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string()));
    item.original_category = Some(item.category);
    item.category = Category::Sold;
    Ok(())
  }

  /// Generated ids can collide when many items are added within one millisecond.
  fn fresh_id(&self) -> ItemId {
    loop {
      let id = ItemId::generate();
      if !self.items.iter().any(|item| item.id == id) {
        return id;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn test_collection() -> (Collection, ItemId) {
    let mut collection = Collection::default();
    let mut card = Item::new("Charizard", "Base Set", Category::Graded);
    card.price = 450.0;
    card.notes = Some("Centered".to_string());
    let id = collection.add(card);
    collection.add(Item::new("Booster Box", "Jungle", Category::Sealed));
    (collection, id)
  }

  #[test]
  fn test_seed_parses() {
    let seed = seed();
    assert_eq!(seed.len(), 8);
    assert!(seed.iter().all(|item| !item.is_sold()));
  }

  #[test]
  fn test_add_assigns_unique_ids() {
    let mut collection = Collection::default();
    for _ in 0..200 {
      collection.add(Item::new("Pikachu", "Base Set", Category::Ungraded));
    }
    let mut ids: Vec<String> = collection.items().iter().map(|i| i.id.to_string()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 200);
  }

  #[test]
  fn test_mark_sold() {
    let (mut collection, id) = test_collection();
    collection
      .mark_sold(&id.to_string(), 600.0, Some("2024-03-01".to_string()))
      .unwrap();

    let item = collection.get(&id.to_string()).unwrap();
    assert!(item.is_sold());
    assert_eq!(item.price, 450.0);
    assert_eq!(item.sale_price, Some(600.0));
    assert_eq!(item.sale_date.as_deref(), Some("2024-03-01"));
    assert_eq!(item.original_category, Some(Category::Graded));
    assert_eq!(item.category, Category::Sold);

    for category in Category::ACTIVE {
      let filter = ItemFilter {
        view: View::Category(category),
        ..Default::default()
      };
      assert!(filter.apply(collection.items()).iter().all(|i| i.id != id));
    }
    let sold = ItemFilter {
      view: View::Sold,
      ..Default::default()
    };
    assert_eq!(sold.apply(collection.items()).len(), 1);
  }

  #[test]
  fn test_mark_sold_twice_is_rejected() {
    let (mut collection, id) = test_collection();
    collection.mark_sold(&id.to_string(), 1.0, None).unwrap();
    let err = collection.mark_sold(&id.to_string(), 2.0, None).unwrap_err();
    assert!(matches!(err, Error::AlreadySold(_)));
  }

  #[test]
  fn test_duplicate_restores_original_category() {
    let (mut collection, id) = test_collection();
    collection.mark_sold(&id.to_string(), 600.0, None).unwrap();

    let copy_id = collection.duplicate(&id.to_string()).unwrap();
    assert_ne!(copy_id, id);

    let copy = collection.get(&copy_id.to_string()).unwrap();
    assert_eq!(copy.category, Category::Graded);
    assert_eq!(copy.status, None);
    assert_eq!(copy.sale_price, None);
    assert_eq!(copy.sale_date, None);
    assert_eq!(copy.original_category, None);
    assert_eq!(copy.price, 450.0);
    assert_eq!(copy.notes.as_deref(), Some("Centered (Duplicate)"));
    assert_eq!(collection.len(), 3);
  }

  #[test]
  fn test_update_preserves_id() {
    let (mut collection, id) = test_collection();
    let mut edited = collection.get(&id.to_string()).unwrap().clone();
    edited.condition = "PSA 10".to_string();
    collection.update(edited).unwrap();
    assert_eq!(collection.get(&id.to_string()).unwrap().condition, "PSA 10");
    assert_eq!(collection.len(), 2);
  }

  #[test]
  fn test_remove_unknown_id() {
    let (mut collection, _) = test_collection();
    assert!(matches!(
      collection.remove("42"),
      Err(Error::ItemNotFound(_))
    ));
    assert_eq!(collection.len(), 2);
  }
}
