use super::item::{Category, Item};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Which slice of the collection to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
  /// Every item that has not been sold
  #[default]
  Active,
  /// Unsold items of one category
  Category(Category),
  /// Sales history
  Sold,
}

impl View {
  fn includes(&self, item: &Item) -> bool {
    match self {
      View::Active => !item.is_sold(),
      View::Category(category) => item.category == *category && !item.is_sold(),
      View::Sold => item.is_sold(),
    }
  }
}

impl FromStr for View {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "all" | "active" => Ok(View::Active),
      "sold" => Ok(View::Sold),
      other => other.parse::<Category>().map(View::Category),
    }
  }
}

/// View plus free-text search and exact set match
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
  pub view: View,
  pub search: Option<String>,
  pub set: Option<String>,
}

impl ItemFilter {
  pub fn matches(&self, item: &Item) -> bool {
    if !self.view.includes(item) {
      return false;
    }

    if let Some(term) = self.search.as_deref().filter(|t| !t.is_empty()) {
      let term = term.to_lowercase();
      let hit = item.name.to_lowercase().contains(&term)
        || item.set.to_lowercase().contains(&term)
        || item
          .card_number
          .as_deref()
          .is_some_and(|n| n.to_lowercase().contains(&term));
      if !hit {
        return false;
      }
    }

    match self.set.as_deref().filter(|s| !s.is_empty()) {
      Some(set) => item.set == set,
      None => true,
    }
  }

  pub fn apply<'a>(&self, items: &'a [Item]) -> Vec<&'a Item> {
    items.iter().filter(|item| self.matches(item)).collect()
  }
}

/// Sorted set names present in the collection
pub fn distinct_sets(items: &[Item]) -> Vec<String> {
  let sets: BTreeSet<&str> = items
    .iter()
    .map(|item| item.set.as_str())
    .filter(|set| !set.is_empty())
    .collect();
  sets.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::collection::ItemStatus;

  fn test_items() -> Vec<Item> {
    let mut charizard = Item::new("Charizard", "Base Set", Category::Ungraded);
    charizard.card_number = Some("4/102".to_string());

    let mut pikachu = Item::new("Pikachu", "Jungle", Category::Graded);
    pikachu.card_number = Some("60/64".to_string());

    let box_ = Item::new("Booster Box", "Fossil", Category::Sealed);

    let mut sold = Item::new("Blastoise", "Base Set", Category::Sold);
    sold.status = Some(ItemStatus::Sold);
    sold.original_category = Some(Category::Ungraded);

    vec![charizard, pikachu, box_, sold]
  }

  #[test]
  fn test_active_view_hides_sold() {
    let items = test_items();
    let filtered = ItemFilter::default().apply(&items);
    assert_eq!(filtered.len(), 3);
    assert!(filtered.iter().all(|i| !i.is_sold()));
  }

  #[test]
  fn test_category_view() {
    let items = test_items();
    let filter = ItemFilter {
      view: View::Category(Category::Ungraded),
      ..Default::default()
    };
    let filtered = filter.apply(&items);
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].name, "Charizard");
  }

  #[test]
  fn test_sold_view() {
    let items = test_items();
    let filter = ItemFilter {
      view: View::Sold,
      ..Default::default()
    };
    let filtered = filter.apply(&items);
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].name, "Blastoise");
  }

  #[test]
  fn test_search_is_case_insensitive_across_fields() {
    let items = test_items();

    let by_name = ItemFilter {
      search: Some("CHARI".to_string()),
      ..Default::default()
    };
    assert_eq!(by_name.apply(&items).len(), 1);

    let by_set = ItemFilter {
      search: Some("fossil".to_string()),
      ..Default::default()
    };
    assert_eq!(by_set.apply(&items)[0].name, "Booster Box");

    let by_number = ItemFilter {
      search: Some("60/".to_string()),
      ..Default::default()
    };
    assert_eq!(by_number.apply(&items)[0].name, "Pikachu");
  }

  #[test]
  fn test_set_filter_is_exact() {
    let items = test_items();
    let filter = ItemFilter {
      set: Some("Base".to_string()),
      ..Default::default()
    };
    assert!(filter.apply(&items).is_empty());

    let filter = ItemFilter {
      set: Some("Base Set".to_string()),
      ..Default::default()
    };
    assert_eq!(filter.apply(&items).len(), 1);
  }

  #[test]
  fn test_distinct_sets_sorted() {
    let items = test_items();
    assert_eq!(distinct_sets(&items), vec!["Base Set", "Fossil", "Jungle"]);
  }

  #[test]
  fn test_view_parse() {
    assert_eq!("all".parse::<View>(), Ok(View::Active));
    assert_eq!("sold".parse::<View>(), Ok(View::Sold));
    assert_eq!(
      "sealed".parse::<View>(),
      Ok(View::Category(Category::Sealed))
    );
    assert!("foils".parse::<View>().is_err());
  }
}
